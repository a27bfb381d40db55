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

//! Typed column values and the partition tuple.

use std::fmt::{Display, Formatter};
use std::ops::Index;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use ordered_float::OrderedFloat;
use serde_json::{Number, Value as JsonValue};
use uuid::Uuid;

use super::PrimitiveType;
use crate::{Error, ErrorKind, Result};

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Converts days since the unix epoch to a calendar date.
pub(crate) fn date_from_days(days: i32) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// A single non-null column value.
///
/// Temporal values use the Iceberg physical representation: dates are days
/// from 1970-01-01, times are microseconds from midnight and timestamps are
/// microseconds from the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Literal {
    /// True or False
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit IEEE 754 floating point
    Float(OrderedFloat<f32>),
    /// 64-bit IEEE 754 floating point
    Double(OrderedFloat<f64>),
    /// Unscaled value of a fixed point decimal
    Decimal(i128),
    /// Days from 1970-01-01
    Date(i32),
    /// Microseconds from midnight
    Time(i64),
    /// Microseconds from 1970-01-01T00:00:00, no timezone
    Timestamp(i64),
    /// Microseconds from 1970-01-01T00:00:00Z
    Timestamptz(i64),
    /// UTF-8 string
    String(String),
    /// Universally unique identifier
    Uuid(Uuid),
    /// Arbitrary-length byte array
    Binary(Vec<u8>),
}

impl Literal {
    /// Creates a boolean value.
    pub fn bool<T: Into<bool>>(t: T) -> Self {
        Self::Boolean(t.into())
    }

    /// Creates an int value.
    pub fn int<T: Into<i32>>(t: T) -> Self {
        Self::Int(t.into())
    }

    /// Creates a long value.
    pub fn long<T: Into<i64>>(t: T) -> Self {
        Self::Long(t.into())
    }

    /// Creates a float value.
    pub fn float<T: Into<f32>>(t: T) -> Self {
        Self::Float(OrderedFloat(t.into()))
    }

    /// Creates a double value.
    pub fn double<T: Into<f64>>(t: T) -> Self {
        Self::Double(OrderedFloat(t.into()))
    }

    /// Creates a decimal value from its unscaled representation.
    pub fn decimal(unscaled: i128) -> Self {
        Self::Decimal(unscaled)
    }

    /// Creates a string value.
    pub fn string<S: ToString>(s: S) -> Self {
        Self::String(s.to_string())
    }

    /// Creates a uuid value.
    pub fn uuid(uuid: Uuid) -> Self {
        Self::Uuid(uuid)
    }

    /// Creates a binary value.
    pub fn binary<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        Self::Binary(iter.into_iter().collect())
    }

    /// Creates a date value from days since the unix epoch.
    pub fn date(days: i32) -> Self {
        Self::Date(days)
    }

    /// Creates a date value from year, month and day.
    pub fn date_from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("{year}-{month}-{day} is not a valid date"),
            )
        })?;
        Ok(Self::Date(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE))
    }

    /// Creates a time value from microseconds since midnight.
    pub fn time_micros(micros: i64) -> Self {
        Self::Time(micros)
    }

    /// Creates a timestamp value from microseconds since the unix epoch.
    pub fn timestamp(micros: i64) -> Self {
        Self::Timestamp(micros)
    }

    /// Creates a timestamp with timezone value from microseconds since the unix epoch.
    pub fn timestamptz(micros: i64) -> Self {
        Self::Timestamptz(micros)
    }

    /// Creates a timestamp with timezone value from a utc datetime.
    pub fn timestamptz_from_datetime(dt: DateTime<Utc>) -> Self {
        Self::Timestamptz(dt.timestamp_micros())
    }

    /// Creates a timestamp with timezone value from an RFC 3339 string.
    pub fn timestamptz_from_str(s: &str) -> Result<Self> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            Error::new(ErrorKind::DataInvalid, format!("Can't parse timestamp {s}"))
                .with_source(e)
        })?;
        Ok(Self::Timestamptz(dt.timestamp_micros()))
    }

    /// Whether this value can be stored in a column of type `ty`.
    pub fn is_compatible_with(&self, ty: &PrimitiveType) -> bool {
        matches!(
            (self, ty),
            (Literal::Boolean(_), PrimitiveType::Boolean)
                | (Literal::Int(_), PrimitiveType::Int)
                | (Literal::Long(_), PrimitiveType::Long)
                | (Literal::Float(_), PrimitiveType::Float)
                | (Literal::Double(_), PrimitiveType::Double)
                | (Literal::Decimal(_), PrimitiveType::Decimal { .. })
                | (Literal::Date(_), PrimitiveType::Date)
                | (Literal::Time(_), PrimitiveType::Time)
                | (Literal::Timestamp(_), PrimitiveType::Timestamp)
                | (Literal::Timestamptz(_), PrimitiveType::Timestamptz)
                | (Literal::String(_), PrimitiveType::String)
                | (Literal::Uuid(_), PrimitiveType::Uuid)
                | (Literal::Binary(_), PrimitiveType::Binary)
        )
    }

    /// Encodes the value as json. Decimals are written as their unscaled
    /// integer in a string so no precision is lost.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Literal::Boolean(v) => JsonValue::Bool(*v),
            Literal::Int(v) => JsonValue::Number((*v).into()),
            Literal::Long(v) => JsonValue::Number((*v).into()),
            Literal::Float(v) => Number::from_f64(v.0 as f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Literal::Double(v) => Number::from_f64(v.0)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Literal::Decimal(v) => JsonValue::String(v.to_string()),
            Literal::Date(v) => JsonValue::Number((*v).into()),
            Literal::Time(v) => JsonValue::Number((*v).into()),
            Literal::Timestamp(v) => JsonValue::Number((*v).into()),
            Literal::Timestamptz(v) => JsonValue::Number((*v).into()),
            Literal::String(v) => JsonValue::String(v.clone()),
            Literal::Uuid(v) => JsonValue::String(v.to_string()),
            Literal::Binary(v) => JsonValue::Array(v.iter().map(|b| (*b).into()).collect()),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Boolean(v) => write!(f, "{v}"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Long(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Double(v) => write!(f, "{v}"),
            Literal::Decimal(v) => write!(f, "{v}"),
            Literal::Date(v) => match date_from_days(*v) {
                Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
                None => write!(f, "{v}"),
            },
            Literal::Time(v) => {
                let secs = v.div_euclid(1_000_000) as u32;
                let nanos = (v.rem_euclid(1_000_000) * 1_000) as u32;
                match NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos) {
                    Some(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
                    None => write!(f, "{v}"),
                }
            }
            Literal::Timestamp(v) => match DateTime::from_timestamp_micros(*v) {
                Some(dt) => write!(f, "{}", dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f")),
                None => write!(f, "{v}"),
            },
            Literal::Timestamptz(v) => match DateTime::from_timestamp_micros(*v) {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.fZ")),
                None => write!(f, "{v}"),
            },
            Literal::String(v) => write!(f, "{v}"),
            Literal::Uuid(v) => write!(f, "{v}"),
            Literal::Binary(v) => {
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// The partition struct stores the tuple of partition values for each file.
/// Its layout follows the fields of the partition spec it was computed with;
/// a `None` slot is a null partition value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Struct {
    /// Vector to store the field values
    fields: Vec<Option<Literal>>,
}

impl Struct {
    /// Create a empty struct.
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create a iterator to read the field in order of field_value.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Option<&Literal>> {
        self.fields.iter().map(|field| field.as_ref())
    }

    /// returns true if the field at position `index` is null
    pub fn is_null_at_index(&self, index: usize) -> bool {
        self.fields[index].is_none()
    }

    /// Return fields in the struct.
    pub fn fields(&self) -> &[Option<Literal>] {
        &self.fields
    }

    /// Number of values in the tuple.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the tuple is empty, which is the key of unpartitioned data.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Index<usize> for Struct {
    type Output = Option<Literal>;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.fields[idx]
    }
}

impl IntoIterator for Struct {
    type Item = Option<Literal>;

    type IntoIter = std::vec::IntoIter<Option<Literal>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<Option<Literal>> for Struct {
    fn from_iter<I: IntoIterator<Item = Option<Literal>>>(iter: I) -> Self {
        Struct {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Display for Struct {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match field {
                Some(v) => write!(f, "{v}")?,
                None => write!(f, "null")?,
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_date_from_ymd() {
        assert_eq!(Literal::Date(0), Literal::date_from_ymd(1970, 1, 1).unwrap());
        assert_eq!(Literal::Date(17486), Literal::date_from_ymd(2017, 11, 16).unwrap());
        assert_eq!(Literal::Date(-1), Literal::date_from_ymd(1969, 12, 31).unwrap());
        assert!(Literal::date_from_ymd(2017, 2, 30).is_err());
    }

    #[test]
    fn test_timestamptz_from_str() {
        let ts = Literal::timestamptz_from_str("2017-11-16T14:31:08-08:00").unwrap();
        assert_eq!(Literal::Timestamptz(1510871468000000), ts);
        assert_eq!("2017-11-16T22:31:08Z", ts.to_string());
    }

    #[test]
    fn test_display() {
        assert_eq!("2017-11-16", Literal::Date(17486).to_string());
        assert_eq!("22:31:08", Literal::Time(81068000000).to_string());
        assert_eq!("00ff10", Literal::binary([0x00, 0xff, 0x10]).to_string());
        let key = Struct::from_iter([Some(Literal::int(3)), None]);
        assert_eq!("[3, null]", key.to_string());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(JsonValue::from(42), Literal::long(42).to_json());
        assert_eq!(
            JsonValue::String("-12345678901234567890".to_string()),
            Literal::decimal(-12345678901234567890).to_json()
        );
        assert_eq!(JsonValue::from("abc"), Literal::string("abc").to_json());
    }

    #[test]
    fn test_compatibility() {
        assert!(Literal::int(1).is_compatible_with(&PrimitiveType::Int));
        assert!(!Literal::int(1).is_compatible_with(&PrimitiveType::Long));
        assert!(Literal::decimal(1).is_compatible_with(&PrimitiveType::Decimal {
            precision: 9,
            scale: 2
        }));
    }
}
