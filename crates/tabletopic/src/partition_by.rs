// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Partition-by declarations.
//!
//! A declaration is a comma separated list of tokens, optionally wrapped in
//! `[...]`:
//!
//! ```text
//! [bucket(page_url, 5), hour(timestamp), region]
//! ```
//!
//! A bare column name partitions by identity. `year`, `month`, `day` and
//! `hour` take a column name; `bucket` and `truncate` take a column name and
//! a positive integer.

use crate::spec::{PartitionSpec, Schema, Transform, TransformDescriptor};
use crate::{Error, ErrorKind, Result};

/// Splits a declaration into its raw tokens, in declared order.
///
/// Commas nested in parentheses belong to their token. Whitespace around
/// tokens and empty tokens are ignored.
pub fn parse_partition_by(declaration: &str) -> Result<Vec<String>> {
    let mut body = declaration.trim();
    if let Some(inner) = body.strip_prefix('[') {
        body = inner.strip_suffix(']').ok_or_else(|| {
            Error::new(
                ErrorKind::MalformedTransformArgs,
                format!("Unclosed '[' in partition declaration {declaration:?}"),
            )
        })?;
    }

    let mut tokens = vec![];
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    Error::new(
                        ErrorKind::MalformedTransformArgs,
                        format!("Unbalanced ')' in partition declaration {declaration:?}"),
                    )
                })?;
            }
            ',' if depth == 0 => {
                push_token(&mut tokens, &body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::new(
            ErrorKind::MalformedTransformArgs,
            format!("Unclosed '(' in partition declaration {declaration:?}"),
        ));
    }
    push_token(&mut tokens, &body[start..]);

    Ok(tokens)
}

fn push_token(tokens: &mut Vec<String>, token: &str) {
    let token = token.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
}

/// Parses one token into a [`TransformDescriptor`].
///
/// # Errors
/// - [`ErrorKind::UnsupportedTransform`] if the transform name is unknown.
/// - [`ErrorKind::MalformedTransformArgs`] if the arguments don't match the
///   transform.
pub fn parse_transform_token(token: &str) -> Result<TransformDescriptor> {
    let token = token.trim();
    let Some(open) = token.find('(') else {
        if token.is_empty() || token.contains(')') {
            return Err(malformed(token, "expected a column name"));
        }
        return Ok(TransformDescriptor::identity(token));
    };

    let name = token[..open].trim();
    let args = token[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| malformed(token, "expected ')' at the end"))?;

    let transform = match name {
        "year" => Transform::Year,
        "month" => Transform::Month,
        "day" => Transform::Day,
        "hour" => Transform::Hour,
        "bucket" | "truncate" => {
            let (field, width) = parse_field_and_width(token, args)?;
            let transform = if name == "bucket" {
                Transform::Bucket(width)
            } else {
                Transform::Truncate(width)
            };
            return Ok(TransformDescriptor::new(field, transform));
        }
        _ => {
            return Err(Error::new(
                ErrorKind::UnsupportedTransform,
                format!("Unsupported transform: {token}"),
            ))
        }
    };

    let field = parse_field_name(token, args)?;
    Ok(TransformDescriptor::new(field, transform))
}

fn parse_field_name<'a>(token: &str, arg: &'a str) -> Result<&'a str> {
    let field = arg.trim();
    if field.is_empty() || field.contains([',', '(', ')']) {
        return Err(malformed(token, "expected exactly one column name"));
    }
    Ok(field)
}

fn parse_field_and_width<'a>(token: &str, args: &'a str) -> Result<(&'a str, u32)> {
    let (field, width) = args
        .split_once(',')
        .ok_or_else(|| malformed(token, "expected a column name and a width"))?;
    let field = parse_field_name(token, field)?;
    let width = width.trim();
    let width: u32 = width.parse().map_err(|e| {
        malformed(token, &format!("width {width:?} is not a positive integer")).with_source(e)
    })?;
    if width == 0 || i32::try_from(width).is_err() {
        return Err(malformed(token, "width must be between 1 and 2147483647"));
    }
    Ok((field, width))
}

fn malformed(token: &str, reason: &str) -> Error {
    Error::new(
        ErrorKind::MalformedTransformArgs,
        format!("Malformed partition transform {token:?}: {reason}"),
    )
}

/// Parses a whole declaration into descriptors, in declared order.
pub fn parse_partition_by_descriptors(declaration: &str) -> Result<Vec<TransformDescriptor>> {
    parse_partition_by(declaration)?
        .iter()
        .map(|token| parse_transform_token(token))
        .collect()
}

/// Builds the initial partition spec of a table from declared descriptors.
///
/// Fields follow the declared order. An empty declaration builds the
/// unpartitioned spec.
///
/// # Errors
/// - [`ErrorKind::UnknownSourceField`] if a column is not in `schema`.
/// - [`ErrorKind::DataInvalid`] if a transform doesn't accept its column's
///   type, or two descriptors collide.
pub fn build_partition_spec(
    descriptors: &[TransformDescriptor],
    schema: &Schema,
) -> Result<PartitionSpec> {
    if descriptors.is_empty() {
        return Ok(PartitionSpec::unpartitioned());
    }

    let mut builder = PartitionSpec::builder(schema);
    for descriptor in descriptors {
        builder = builder.add_partition_field(descriptor.source_name(), descriptor.transform())?;
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::schema::tests::clickstream_schema;

    #[test]
    fn test_tokens_keep_nested_commas() {
        assert_eq!(
            vec!["bucket(page_url, 5)", "hour(timestamp)", "region"],
            parse_partition_by("[bucket(page_url, 5), hour(timestamp), region]").unwrap()
        );
        assert_eq!(
            vec!["region"],
            parse_partition_by("  region , ,").unwrap()
        );
        assert!(parse_partition_by("").unwrap().is_empty());
        assert!(parse_partition_by("[]").unwrap().is_empty());
    }

    #[test]
    fn test_unbalanced_declarations() {
        for declaration in ["[region", "bucket(page_url, 5", "region)", "hour(timestamp))"] {
            let err = parse_partition_by(declaration).unwrap_err();
            assert_eq!(
                ErrorKind::MalformedTransformArgs,
                err.kind(),
                "{declaration}"
            );
        }
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!(
            TransformDescriptor::identity("region"),
            parse_transform_token("region").unwrap()
        );
        assert_eq!(
            TransformDescriptor::new("timestamp", Transform::Year),
            parse_transform_token("year(timestamp)").unwrap()
        );
        assert_eq!(
            TransformDescriptor::new("timestamp", Transform::Month),
            parse_transform_token("month( timestamp )").unwrap()
        );
        assert_eq!(
            TransformDescriptor::new("timestamp", Transform::Day),
            parse_transform_token("day(timestamp)").unwrap()
        );
        assert_eq!(
            TransformDescriptor::new("page_url", Transform::Bucket(5)),
            parse_transform_token("bucket(page_url,5)").unwrap()
        );
        assert_eq!(
            TransformDescriptor::new("page_url", Transform::Truncate(16)),
            parse_transform_token("truncate(page_url, 16)").unwrap()
        );
    }

    #[test]
    fn test_malformed_args() {
        for token in [
            "bucket(page_url)",
            "bucket(page_url, )",
            "bucket(page_url, x)",
            "bucket(page_url, 0)",
            "bucket(page_url, -3)",
            "bucket(page_url, 3000000000)",
            "truncate(page_url, 2147483648)",
            "truncate(, 4)",
            "hour()",
            "hour(a, b)",
        ] {
            let err = parse_transform_token(token).unwrap_err();
            assert_eq!(ErrorKind::MalformedTransformArgs, err.kind(), "{token}");
        }
    }

    #[test]
    fn test_unsupported_transform() {
        let err = parse_transform_token("weeks(timestamp)").unwrap_err();
        assert_eq!(ErrorKind::UnsupportedTransform, err.kind());
        assert!(err.message().contains("weeks(timestamp)"));

        let err = parse_transform_token("Hour(timestamp)").unwrap_err();
        assert_eq!(ErrorKind::UnsupportedTransform, err.kind());
    }

    #[test]
    fn test_build_follows_declared_order() {
        let schema = clickstream_schema();
        let descriptors =
            parse_partition_by_descriptors("hour(timestamp), region, bucket(page_url, 5)")
                .unwrap();
        let spec = build_partition_spec(&descriptors, &schema).unwrap();

        let fields: Vec<_> = spec
            .fields()
            .iter()
            .map(|f| (f.source_id, f.name.as_str(), f.transform))
            .collect();
        assert_eq!(
            vec![
                (3, "timestamp_hour", Transform::Hour),
                (4, "region", Transform::Identity),
                (2, "page_url_bucket", Transform::Bucket(5)),
            ],
            fields
        );
    }

    #[test]
    fn test_build_empty_is_unpartitioned() {
        let spec = build_partition_spec(&[], &clickstream_schema()).unwrap();
        assert!(spec.is_unpartitioned());
    }

    #[test]
    fn test_build_unknown_source_field() {
        let descriptors = parse_partition_by_descriptors("bucket(missing, 5)").unwrap();
        let err = build_partition_spec(&descriptors, &clickstream_schema()).unwrap_err();
        assert_eq!(ErrorKind::UnknownSourceField, err.kind());
    }

    #[test]
    fn test_build_duplicate_descriptor() {
        let descriptors = parse_partition_by_descriptors("region, region").unwrap();
        let err = build_partition_spec(&descriptors, &clickstream_schema()).unwrap_err();
        assert_eq!(ErrorKind::DataInvalid, err.kind());
    }
}
