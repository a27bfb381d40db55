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

use super::{unsupported_input, TransformFunction};
use crate::spec::Literal;
use crate::{Error, ErrorKind, Result};

#[derive(Debug)]
pub struct Bucket {
    mod_n: i32,
}

impl Bucket {
    pub fn new(mod_n: u32) -> Result<Self> {
        let mod_n = i32::try_from(mod_n)?;
        if mod_n <= 0 {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Bucket count must be positive, got {mod_n}"),
            ));
        }
        Ok(Self { mod_n })
    }
}

impl Bucket {
    /// When switch the hash function, we only need to change this function.
    fn hash_bytes(mut v: &[u8]) -> Result<i32> {
        Ok(murmur3::murmur3_32(&mut v, 0)? as i32)
    }

    fn hash_int(v: i32) -> Result<i32> {
        Self::hash_long(v as i64)
    }

    fn hash_long(v: i64) -> Result<i32> {
        Self::hash_bytes(v.to_le_bytes().as_slice())
    }

    /// v is days from unix epoch
    fn hash_date(v: i32) -> Result<i32> {
        Self::hash_int(v)
    }

    /// v is microseconds from midnight
    fn hash_time(v: i64) -> Result<i32> {
        Self::hash_long(v)
    }

    /// v is microseconds from unix epoch
    fn hash_timestamp(v: i64) -> Result<i32> {
        Self::hash_long(v)
    }

    fn hash_str(s: &str) -> Result<i32> {
        Self::hash_bytes(s.as_bytes())
    }

    /// Decimal values are hashed using the minimum number of bytes required to hold the unscaled value as a two’s complement big-endian
    fn hash_decimal(v: i128) -> Result<i32> {
        let bytes = v.to_be_bytes();
        let sign_byte = if v < 0 { 0xFF } else { 0x00 };
        // Keep one sign byte in front of the first significant byte.
        let start = bytes
            .iter()
            .position(|&b| b != sign_byte)
            .map_or(bytes.len() - 1, |idx| {
                if idx > 0 && (bytes[idx] & 0x80) != (sign_byte & 0x80) {
                    idx - 1
                } else {
                    idx
                }
            });
        Self::hash_bytes(&bytes[start..])
    }

    /// def bucket_N(x) = (murmur3_x86_32_hash(x) & Integer.MAX_VALUE) % N
    fn bucket_n(&self, v: i32) -> i32 {
        (v & i32::MAX) % self.mod_n
    }
}

impl TransformFunction for Bucket {
    fn transform_literal(&self, input: &Literal) -> Result<Option<Literal>> {
        let hash = match input {
            Literal::Int(v) => Self::hash_int(*v)?,
            Literal::Long(v) => Self::hash_long(*v)?,
            Literal::Decimal(v) => Self::hash_decimal(*v)?,
            Literal::Date(v) => Self::hash_date(*v)?,
            Literal::Time(v) => Self::hash_time(*v)?,
            Literal::Timestamp(v) | Literal::Timestamptz(v) => Self::hash_timestamp(*v)?,
            Literal::String(v) => Self::hash_str(v)?,
            Literal::Uuid(v) => Self::hash_bytes(v.as_bytes())?,
            Literal::Binary(v) => Self::hash_bytes(v)?,
            _ => return Err(unsupported_input("bucket", input)),
        };
        Ok(Some(Literal::int(self.bucket_n(hash))))
    }
}

#[cfg(test)]
mod test {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_hash() {
        // test int
        assert_eq!(Bucket::hash_int(34).unwrap(), 2017239379);
        // test long
        assert_eq!(Bucket::hash_long(34).unwrap(), 2017239379);
        // test decimal
        assert_eq!(Bucket::hash_decimal(1420).unwrap(), -500754589);
        // test date
        let date = NaiveDate::from_ymd_opt(2017, 11, 16).unwrap();
        assert_eq!(
            Bucket::hash_date(
                date.signed_duration_since(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
                    .num_days() as i32
            )
            .unwrap(),
            -653330422
        );
        // test time
        let time = NaiveTime::from_hms_opt(22, 31, 8).unwrap();
        assert_eq!(
            Bucket::hash_time(
                time.signed_duration_since(NaiveTime::from_hms_opt(0, 0, 0).unwrap())
                    .num_microseconds()
                    .unwrap()
            )
            .unwrap(),
            -662762989
        );
        // test timestamp
        let timestamp =
            NaiveDateTime::parse_from_str("2017-11-16 22:31:08", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(
            Bucket::hash_timestamp(timestamp.and_utc().timestamp_micros()).unwrap(),
            -2047944441
        );
        // test timestamp with tz
        let timestamp = DateTime::parse_from_rfc3339("2017-11-16T14:31:08-08:00").unwrap();
        assert_eq!(
            Bucket::hash_timestamp(timestamp.timestamp_micros()).unwrap(),
            -2047944441
        );
        // test str
        assert_eq!(Bucket::hash_str("iceberg").unwrap(), 1210000089);
        // test uuid
        assert_eq!(
            Bucket::hash_bytes(
                [
                    0xF7, 0x9C, 0x3E, 0x09, 0x67, 0x7C, 0x4B, 0xBD, 0xA4, 0x79, 0x3F, 0x34, 0x9C,
                    0xB7, 0x85, 0xE7
                ]
                .as_ref()
            )
            .unwrap(),
            1488055340
        );
        // test fixed and binary
        assert_eq!(
            Bucket::hash_bytes([0x00, 0x01, 0x02, 0x03].as_ref()).unwrap(),
            -188683207
        );
    }

    #[test]
    fn test_decimal_minimal_bytes() {
        // 1420 = 0x058C, no sign byte needed
        assert_eq!(
            Bucket::hash_decimal(1420).unwrap(),
            Bucket::hash_bytes(&[0x05, 0x8C]).unwrap()
        );
        // 128 = 0x0080 needs a leading zero byte to stay positive
        assert_eq!(
            Bucket::hash_decimal(128).unwrap(),
            Bucket::hash_bytes(&[0x00, 0x80]).unwrap()
        );
        assert_eq!(
            Bucket::hash_decimal(-1).unwrap(),
            Bucket::hash_bytes(&[0xFF]).unwrap()
        );
        assert_eq!(
            Bucket::hash_decimal(0).unwrap(),
            Bucket::hash_bytes(&[0x00]).unwrap()
        );
    }

    #[test]
    fn test_bucket_literal() {
        let bucket = Bucket::new(100).unwrap();
        assert_eq!(
            Some(Literal::int(79)),
            bucket.transform_literal(&Literal::int(34)).unwrap()
        );
        assert_eq!(
            Some(Literal::int(89)),
            bucket.transform_literal(&Literal::string("iceberg")).unwrap()
        );
        let uuid = Uuid::parse_str("f79c3e09-677c-4bbd-a479-3f349cb785e7").unwrap();
        assert_eq!(
            Some(Literal::int(40)),
            bucket.transform_literal(&Literal::uuid(uuid)).unwrap()
        );
        assert!(bucket.transform_literal(&Literal::bool(true)).is_err());
        assert!(bucket.transform_literal(&Literal::double(1.0)).is_err());
    }

    #[test]
    fn test_bucket_is_stable() {
        let bucket = Bucket::new(5).unwrap();
        let first = bucket
            .transform_literal(&Literal::string("https://example.com/a"))
            .unwrap();
        let second = bucket
            .transform_literal(&Literal::string("https://example.com/a"))
            .unwrap();
        assert_eq!(first, second);
        let Some(Literal::Int(v)) = first else {
            panic!("bucket must produce an int");
        };
        assert!((0..5).contains(&v));
    }
}
