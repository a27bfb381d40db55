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

//! Partition transforms.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::spec::PrimitiveType;
use crate::{Error, ErrorKind, Result};

/// How a partition field derives its value from a source column.
///
/// A null source value always yields a null partition value.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Transform {
    /// Keeps the source value and its type.
    Identity,
    /// `(murmur3_x86_32(v, seed 0) & i32::MAX) % N`, typed `int`.
    ///
    /// Applies to integers, decimals, temporal types, strings, uuids and
    /// binaries. Integers hash their 8 byte little endian `long` form so `int`
    /// and `long` columns agree.
    Bucket(u32),
    /// Cuts the value down to width `W`, keeping the source type.
    ///
    /// Numbers round towards negative infinity to a multiple of `W`
    /// (`W=10`: `-1` becomes `-10`). Strings keep their first `W` code points
    /// and binaries their first `W` bytes.
    Truncate(u32),
    /// Whole years since 1970.
    Year,
    /// Whole months since 1970-01.
    Month,
    /// Whole days since 1970-01-01.
    Day,
    /// Whole hours since the epoch; timestamps only.
    Hour,
}

impl Transform {
    /// Type of the partition value for a source of `input_type`.
    pub fn result_type(&self, input_type: &PrimitiveType) -> Result<PrimitiveType> {
        let invalid = || {
            Error::new(
                ErrorKind::DataInvalid,
                format!("{input_type} is not a valid input type of {self} transform"),
            )
        };

        if let Transform::Bucket(width) | Transform::Truncate(width) = self {
            if *width == 0 || i32::try_from(*width).is_err() {
                return Err(Error::new(
                    ErrorKind::MalformedTransformArgs,
                    format!("{self} width must be between 1 and {}", i32::MAX),
                ));
            }
        }

        match self {
            Transform::Identity => Ok(*input_type),
            Transform::Bucket(_) => match input_type {
                PrimitiveType::Int
                | PrimitiveType::Long
                | PrimitiveType::Decimal { .. }
                | PrimitiveType::Date
                | PrimitiveType::Time
                | PrimitiveType::Timestamp
                | PrimitiveType::Timestamptz
                | PrimitiveType::String
                | PrimitiveType::Uuid
                | PrimitiveType::Binary => Ok(PrimitiveType::Int),
                _ => Err(invalid()),
            },
            Transform::Truncate(_) => match input_type {
                PrimitiveType::Int
                | PrimitiveType::Long
                | PrimitiveType::String
                | PrimitiveType::Binary
                | PrimitiveType::Decimal { .. } => Ok(*input_type),
                _ => Err(invalid()),
            },
            Transform::Year | Transform::Month | Transform::Day => match input_type {
                PrimitiveType::Timestamp | PrimitiveType::Timestamptz | PrimitiveType::Date => {
                    Ok(PrimitiveType::Int)
                }
                _ => Err(invalid()),
            },
            Transform::Hour => match input_type {
                PrimitiveType::Timestamp | PrimitiveType::Timestamptz => Ok(PrimitiveType::Int),
                _ => Err(invalid()),
            },
        }
    }

    /// Key under which two transforms on one column count as redundant; all
    /// time granularities share one key.
    pub fn dedup_name(&self) -> String {
        match self {
            Transform::Year | Transform::Month | Transform::Day | Transform::Hour => {
                "time".to_string()
            }
            _ => format!("{self}"),
        }
    }

    /// Default partition field name for this transform applied to `source_name`.
    pub fn partition_field_name(&self, source_name: &str) -> String {
        match self {
            Transform::Identity => source_name.to_string(),
            Transform::Bucket(_) => format!("{source_name}_bucket"),
            Transform::Truncate(_) => format!("{source_name}_trunc"),
            Transform::Year => format!("{source_name}_year"),
            Transform::Month => format!("{source_name}_month"),
            Transform::Day => format!("{source_name}_day"),
            Transform::Hour => format!("{source_name}_hour"),
        }
    }
}

impl Display for Transform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Transform::Identity => write!(f, "identity"),
            Transform::Year => write!(f, "year"),
            Transform::Month => write!(f, "month"),
            Transform::Day => write!(f, "day"),
            Transform::Hour => write!(f, "hour"),
            Transform::Bucket(length) => write!(f, "bucket[{length}]"),
            Transform::Truncate(width) => write!(f, "truncate[{width}]"),
        }
    }
}

impl FromStr for Transform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse_arg = |v: &str, prefix: &str| -> Result<u32> {
            v.strip_prefix(prefix)
                .unwrap_or(v)
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse()
                .map_err(|err| {
                    Error::new(
                        ErrorKind::DataInvalid,
                        format!("transform {prefix} type {v:?} is invalid"),
                    )
                    .with_source(err)
                })
        };

        let t = match s {
            "identity" => Transform::Identity,
            "year" => Transform::Year,
            "month" => Transform::Month,
            "day" => Transform::Day,
            "hour" => Transform::Hour,
            v if v.starts_with("bucket") => Transform::Bucket(parse_arg(v, "bucket")?),
            v if v.starts_with("truncate") => Transform::Truncate(parse_arg(v, "truncate")?),
            v => {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("transform {v:?} is invalid"),
                ))
            }
        };

        Ok(t)
    }
}

impl Serialize for Transform {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(format!("{self}").as_str())
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(<D::Error as serde::de::Error>::custom)
    }
}

/// A parsed partition-by token: a transform bound to a source column by name.
///
/// Two descriptors are equivalent iff they name the same column with the
/// same transform, including the bucket count or truncate width.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct TransformDescriptor {
    source_name: String,
    transform: Transform,
}

impl TransformDescriptor {
    /// Creates a descriptor.
    pub fn new(source_name: impl Into<String>, transform: Transform) -> Self {
        Self {
            source_name: source_name.into(),
            transform,
        }
    }

    /// Creates an identity descriptor.
    pub fn identity(source_name: impl Into<String>) -> Self {
        Self::new(source_name, Transform::Identity)
    }

    /// Name of the source column.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Transform applied to the source column.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// The numeric argument of `bucket` and `truncate`, absent otherwise.
    pub fn arg(&self) -> Option<u32> {
        match self.transform {
            Transform::Bucket(n) | Transform::Truncate(n) => Some(n),
            _ => None,
        }
    }
}

impl Display for TransformDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.transform {
            Transform::Identity => write!(f, "{}", self.source_name),
            Transform::Bucket(n) => write!(f, "bucket({}, {n})", self.source_name),
            Transform::Truncate(w) => write!(f, "truncate({}, {w})", self.source_name),
            t => write!(f, "{t}({})", self.source_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_transform_serde_roundtrip_names() {
        for (name, transform) in [
            ("identity", Transform::Identity),
            ("bucket[16]", Transform::Bucket(16)),
            ("truncate[4]", Transform::Truncate(4)),
            ("year", Transform::Year),
            ("month", Transform::Month),
            ("day", Transform::Day),
            ("hour", Transform::Hour),
        ] {
            assert_eq!(transform, name.parse::<Transform>().unwrap());
            assert_eq!(
                format!("\"{name}\""),
                serde_json::to_string(&transform).unwrap()
            );
        }
        assert!("void".parse::<Transform>().is_err());
        assert!("bucket[x]".parse::<Transform>().is_err());
    }

    #[test]
    fn test_result_type() {
        assert_eq!(
            PrimitiveType::Int,
            Transform::Bucket(8).result_type(&PrimitiveType::String).unwrap()
        );
        assert_eq!(
            PrimitiveType::String,
            Transform::Truncate(3).result_type(&PrimitiveType::String).unwrap()
        );
        assert_eq!(
            PrimitiveType::Int,
            Transform::Day.result_type(&PrimitiveType::Date).unwrap()
        );
        assert!(Transform::Hour.result_type(&PrimitiveType::Date).is_err());
        assert!(Transform::Bucket(2).result_type(&PrimitiveType::Double).is_err());
        assert!(Transform::Truncate(2).result_type(&PrimitiveType::Boolean).is_err());
    }

    #[test]
    fn test_result_type_rejects_width_outside_i32() {
        for transform in [
            Transform::Bucket(0),
            Transform::Bucket(3_000_000_000),
            Transform::Truncate(2_147_483_648),
        ] {
            let err = transform.result_type(&PrimitiveType::Long).unwrap_err();
            assert_eq!(ErrorKind::MalformedTransformArgs, err.kind(), "{transform}");
        }
        assert!(Transform::Bucket(i32::MAX as u32)
            .result_type(&PrimitiveType::Long)
            .is_ok());
    }

    #[test]
    fn test_descriptor_equivalence() {
        let a = TransformDescriptor::new("x", Transform::Bucket(4));
        let b = TransformDescriptor::new("x", Transform::Bucket(4));
        let c = TransformDescriptor::new("x", Transform::Bucket(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(Some(8), c.arg());
        assert_eq!(None, TransformDescriptor::identity("x").arg());
        assert_eq!("bucket(x, 8)", c.to_string());
        assert_eq!("hour(ts)", TransformDescriptor::new("ts", Transform::Hour).to_string());
    }

    #[test]
    fn test_partition_field_name() {
        assert_eq!("page_url", Transform::Identity.partition_field_name("page_url"));
        assert_eq!("page_url_bucket", Transform::Bucket(5).partition_field_name("page_url"));
        assert_eq!("ts_hour", Transform::Hour.partition_field_name("ts"));
    }
}
