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

//! Transform function used to compute partition values.

use crate::spec::{Literal, Transform};
use crate::{Error, ErrorKind, Result};

mod bucket;
mod identity;
mod temporal;
mod truncate;

/// TransformFunction is a trait that defines the interface for all transform functions.
pub trait TransformFunction: Send + Sync {
    /// transform_literal will take an input literal and transform it into a new literal.
    ///
    /// Implementations check the input type and fail with
    /// [`ErrorKind::DataInvalid`] on a type the transform does not accept.
    fn transform_literal(&self, input: &Literal) -> Result<Option<Literal>>;
}

/// BoxedTransformFunction is a boxed trait object of TransformFunction.
pub type BoxedTransformFunction = Box<dyn TransformFunction>;

/// create_transform_function creates a boxed trait object of TransformFunction from a Transform.
pub fn create_transform_function(transform: &Transform) -> Result<BoxedTransformFunction> {
    match transform {
        Transform::Identity => Ok(Box::new(identity::Identity {})),
        Transform::Year => Ok(Box::new(temporal::Year {})),
        Transform::Month => Ok(Box::new(temporal::Month {})),
        Transform::Day => Ok(Box::new(temporal::Day {})),
        Transform::Hour => Ok(Box::new(temporal::Hour {})),
        Transform::Bucket(mod_n) => Ok(Box::new(bucket::Bucket::new(*mod_n)?)),
        Transform::Truncate(width) => Ok(Box::new(truncate::Truncate::new(*width)?)),
    }
}

fn unsupported_input(transform: &str, input: &Literal) -> Error {
    Error::new(
        ErrorKind::DataInvalid,
        format!("Unsupported value for {transform} transform: {input:?}"),
    )
}

/// Renders a partition value the way it appears in partition paths, e.g.
/// `2024-03-05-10` for an hour value. Null renders as `null`.
pub fn to_human_string(transform: &Transform, value: Option<&Literal>) -> String {
    let Some(value) = value else {
        return "null".to_string();
    };

    match (transform, value) {
        (Transform::Year, Literal::Int(v)) => temporal::human_year(*v),
        (Transform::Month, Literal::Int(v)) => temporal::human_month(*v),
        (Transform::Day, Literal::Int(v)) => temporal::human_day(*v),
        (Transform::Hour, Literal::Int(v)) => temporal::human_hour(*v),
        (_, Literal::String(s)) => escape_path_segment(s),
        (_, v) => escape_path_segment(&v.to_string()),
    }
}

/// Percent-encodes every byte that is not safe in a path segment.
fn escape_path_segment(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b':' => {
                escaped.push(b as char)
            }
            _ => escaped.push_str(&format!("%{b:02X}")),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_null_in_null_out_everywhere() {
        for transform in [
            Transform::Identity,
            Transform::Bucket(4),
            Transform::Truncate(3),
            Transform::Year,
            Transform::Month,
            Transform::Day,
            Transform::Hour,
        ] {
            assert_eq!("null", to_human_string(&transform, None));
            assert!(create_transform_function(&transform).is_ok());
        }
    }

    #[test]
    fn test_human_string() {
        assert_eq!("2024", to_human_string(&Transform::Year, Some(&Literal::int(54))));
        assert_eq!(
            "2024-03",
            to_human_string(&Transform::Month, Some(&Literal::int(54 * 12 + 2)))
        );
        assert_eq!(
            "2017-11-16",
            to_human_string(&Transform::Day, Some(&Literal::int(17486)))
        );
        assert_eq!(
            "2017-11-16-22",
            to_human_string(&Transform::Hour, Some(&Literal::int(17486 * 24 + 22)))
        );
        assert_eq!("3", to_human_string(&Transform::Bucket(5), Some(&Literal::int(3))));
        assert_eq!(
            "a%2Fb%20c",
            to_human_string(&Transform::Identity, Some(&Literal::string("a/b c")))
        );
    }

    #[test]
    fn test_zero_width_rejected() {
        assert!(create_transform_function(&Transform::Bucket(0)).is_err());
        assert!(create_transform_function(&Transform::Truncate(0)).is_err());
    }
}
