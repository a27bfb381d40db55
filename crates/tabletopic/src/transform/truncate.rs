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
pub struct Truncate {
    width: u32,
}

impl Truncate {
    pub fn new(width: u32) -> Result<Self> {
        if width == 0 {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "Truncate width must be positive",
            ));
        }
        Ok(Self { width })
    }

    #[inline]
    fn truncate_str(s: &str, width: usize) -> &str {
        match s.char_indices().nth(width) {
            None => s,
            Some((idx, _)) => &s[..idx],
        }
    }

    // Wraps near MIN, as Iceberg's `v - (((v % W) + W) % W)` does on fixed
    // width integers.
    #[inline]
    fn truncate_i32(v: i32, width: i32) -> i32 {
        v.wrapping_sub(v.rem_euclid(width))
    }

    #[inline]
    fn truncate_i64(v: i64, width: i64) -> i64 {
        v.wrapping_sub(v.rem_euclid(width))
    }

    #[inline]
    fn truncate_decimal_i128(v: i128, width: i128) -> i128 {
        v.wrapping_sub(v.rem_euclid(width))
    }
}

impl TransformFunction for Truncate {
    fn transform_literal(&self, input: &Literal) -> Result<Option<Literal>> {
        match input {
            Literal::Int(v) => {
                let width: i32 = self.width.try_into().map_err(|_| {
                    Error::new(
                        ErrorKind::DataInvalid,
                        "width is failed to convert to i32 when truncate int",
                    )
                })?;
                Ok(Some(Literal::Int(Self::truncate_i32(*v, width))))
            }
            Literal::Long(v) => Ok(Some(Literal::Long(Self::truncate_i64(
                *v,
                self.width as i64,
            )))),
            Literal::Decimal(v) => Ok(Some(Literal::Decimal(Self::truncate_decimal_i128(
                *v,
                self.width as i128,
            )))),
            Literal::String(v) => Ok(Some(Literal::String(
                Self::truncate_str(v, self.width as usize).to_string(),
            ))),
            Literal::Binary(v) => Ok(Some(Literal::Binary(
                v.iter().take(self.width as usize).copied().collect(),
            ))),
            _ => Err(unsupported_input("truncate", input)),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_truncate_simple() {
        // test truncate int
        let input = Literal::int(1);
        let res = Truncate::new(10).unwrap().transform_literal(&input).unwrap();
        assert_eq!(Some(Literal::int(0)), res);

        let input = Literal::int(-1);
        let res = Truncate::new(10).unwrap().transform_literal(&input).unwrap();
        assert_eq!(Some(Literal::int(-10)), res);

        // test truncate long
        let input = Literal::long(1);
        let res = Truncate::new(10).unwrap().transform_literal(&input).unwrap();
        assert_eq!(Some(Literal::long(0)), res);

        let input = Literal::long(-1);
        let res = Truncate::new(10).unwrap().transform_literal(&input).unwrap();
        assert_eq!(Some(Literal::long(-10)), res);

        // test decimal
        let input = Literal::decimal(1065);
        let res = Truncate::new(50).unwrap().transform_literal(&input).unwrap();
        assert_eq!(Some(Literal::decimal(1050)), res);

        let input = Literal::decimal(-1065);
        let res = Truncate::new(50).unwrap().transform_literal(&input).unwrap();
        assert_eq!(Some(Literal::decimal(-1100)), res);
    }

    #[test]
    fn test_truncate_min_values_wrap() {
        let truncate = Truncate::new(3).unwrap();
        assert_eq!(
            Some(Literal::int(i32::MAX)),
            truncate.transform_literal(&Literal::int(i32::MIN)).unwrap()
        );
        assert_eq!(
            Some(Literal::long(i64::MAX)),
            truncate.transform_literal(&Literal::long(i64::MIN)).unwrap()
        );
        assert_eq!(
            Some(Literal::decimal(i128::MAX)),
            truncate.transform_literal(&Literal::decimal(i128::MIN)).unwrap()
        );

        // No remainder, nothing to subtract.
        let truncate = Truncate::new(2).unwrap();
        assert_eq!(
            Some(Literal::int(i32::MIN)),
            truncate.transform_literal(&Literal::int(i32::MIN)).unwrap()
        );
        assert_eq!(
            Some(Literal::long(i64::MIN)),
            truncate.transform_literal(&Literal::long(i64::MIN)).unwrap()
        );
    }

    #[test]
    fn test_string_truncate() {
        let test1 = "イロハニホヘト";
        let test1_2_expected = "イロ";
        assert_eq!(Truncate::truncate_str(test1, 2), test1_2_expected);

        let test1_3_expected = "イロハ";
        assert_eq!(Truncate::truncate_str(test1, 3), test1_3_expected);

        let test2 = "щщаεはчωいにπάほхεろへσκζ";
        let test2_7_expected = "щщаεはчω";
        assert_eq!(Truncate::truncate_str(test2, 7), test2_7_expected);

        let test3 = "\u{FFFF}\u{FFFF}";
        assert_eq!(Truncate::truncate_str(test3, 2), test3);

        let test4 = "\u{10000}\u{10000}";
        let test4_1_expected = "\u{10000}";
        assert_eq!(Truncate::truncate_str(test4, 1), test4_1_expected);
    }

    #[test]
    fn test_literal_string_and_binary() {
        let truncate = Truncate::new(3).unwrap();
        assert_eq!(
            Some(Literal::string("htt")),
            truncate
                .transform_literal(&Literal::string("https://example.com"))
                .unwrap()
        );
        assert_eq!(
            Some(Literal::string("ab")),
            truncate.transform_literal(&Literal::string("ab")).unwrap()
        );
        assert_eq!(
            Some(Literal::binary(vec![1, 2, 3])),
            truncate
                .transform_literal(&Literal::binary(vec![1, 2, 3, 4]))
                .unwrap()
        );
        assert!(truncate.transform_literal(&Literal::bool(false)).is_err());
    }
}
