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

use chrono::{DateTime, Datelike, NaiveDate};

use super::{unsupported_input, TransformFunction};
use crate::spec::{date_from_days, Literal};
use crate::{Error, ErrorKind, Result};

/// Year of unix epoch.
const UNIX_EPOCH_YEAR: i32 = 1970;
/// One hour in micros.
const MICROS_PER_HOUR: i64 = 3_600_000_000;
/// One day in micros.
const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

fn timestamp_to_date(timestamp: i64, transform: &str) -> Result<NaiveDate> {
    Ok(DateTime::from_timestamp_micros(timestamp)
        .ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("Fail to convert timestamp to date in {transform} transform"),
            )
        })?
        .date_naive())
}

fn days_to_date(days: i32, transform: &str) -> Result<NaiveDate> {
    date_from_days(days).ok_or_else(|| {
        Error::new(
            ErrorKind::DataInvalid,
            format!("Fail to convert days {days} to date in {transform} transform"),
        )
    })
}

fn months_since_epoch(date: NaiveDate) -> i32 {
    (date.year() - UNIX_EPOCH_YEAR) * 12 + date.month0() as i32
}

/// Extract a date or timestamp year, as years from 1970
#[derive(Debug)]
pub struct Year;

impl TransformFunction for Year {
    fn transform_literal(&self, input: &Literal) -> Result<Option<Literal>> {
        let date = match input {
            Literal::Date(v) => days_to_date(*v, "year")?,
            Literal::Timestamp(v) | Literal::Timestamptz(v) => timestamp_to_date(*v, "year")?,
            _ => return Err(unsupported_input("year", input)),
        };
        Ok(Some(Literal::int(date.year() - UNIX_EPOCH_YEAR)))
    }
}

/// Extract a date or timestamp month, as months from 1970-01-01
#[derive(Debug)]
pub struct Month;

impl TransformFunction for Month {
    fn transform_literal(&self, input: &Literal) -> Result<Option<Literal>> {
        let date = match input {
            Literal::Date(v) => days_to_date(*v, "month")?,
            Literal::Timestamp(v) | Literal::Timestamptz(v) => timestamp_to_date(*v, "month")?,
            _ => return Err(unsupported_input("month", input)),
        };
        Ok(Some(Literal::int(months_since_epoch(date))))
    }
}

/// Extract a date or timestamp day, as days from 1970-01-01
#[derive(Debug)]
pub struct Day;

impl Day {
    #[inline]
    fn day_timestamp_micro(v: i64) -> Result<i32> {
        Ok(i32::try_from(v.div_euclid(MICROS_PER_DAY))?)
    }
}

impl TransformFunction for Day {
    fn transform_literal(&self, input: &Literal) -> Result<Option<Literal>> {
        let val = match input {
            Literal::Date(v) => *v,
            Literal::Timestamp(v) | Literal::Timestamptz(v) => Self::day_timestamp_micro(*v)?,
            _ => return Err(unsupported_input("day", input)),
        };
        Ok(Some(Literal::int(val)))
    }
}

/// Extract a timestamp hour, as hours from 1970-01-01 00:00:00
#[derive(Debug)]
pub struct Hour;

impl Hour {
    #[inline]
    fn hour_timestamp_micro(v: i64) -> Result<i32> {
        Ok(i32::try_from(v.div_euclid(MICROS_PER_HOUR))?)
    }
}

impl TransformFunction for Hour {
    fn transform_literal(&self, input: &Literal) -> Result<Option<Literal>> {
        let val = match input {
            Literal::Timestamp(v) | Literal::Timestamptz(v) => Self::hour_timestamp_micro(*v)?,
            _ => return Err(unsupported_input("hour", input)),
        };
        Ok(Some(Literal::int(val)))
    }
}

pub(super) fn human_year(years: i32) -> String {
    format!("{:04}", UNIX_EPOCH_YEAR + years)
}

pub(super) fn human_month(months: i32) -> String {
    format!(
        "{:04}-{:02}",
        UNIX_EPOCH_YEAR + months.div_euclid(12),
        months.rem_euclid(12) + 1
    )
}

pub(super) fn human_day(days: i32) -> String {
    Literal::date(days).to_string()
}

pub(super) fn human_hour(hours: i32) -> String {
    format!(
        "{}-{:02}",
        human_day(hours.div_euclid(24)),
        hours.rem_euclid(24)
    )
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ts(s: &str) -> Literal {
        Literal::timestamptz_from_str(s).unwrap()
    }

    #[test]
    fn test_year() {
        assert_eq!(
            Some(Literal::int(47)),
            Year.transform_literal(&ts("2017-11-16T22:31:08Z")).unwrap()
        );
        assert_eq!(
            Some(Literal::int(-1)),
            Year.transform_literal(&ts("1969-12-31T23:59:59Z")).unwrap()
        );
        assert_eq!(
            Some(Literal::int(47)),
            Year.transform_literal(&Literal::date(17486)).unwrap()
        );
    }

    #[test]
    fn test_month() {
        assert_eq!(
            Some(Literal::int(47 * 12 + 10)),
            Month.transform_literal(&ts("2017-11-16T22:31:08Z")).unwrap()
        );
        assert_eq!(
            Some(Literal::int(-1)),
            Month.transform_literal(&ts("1969-12-31T23:59:59Z")).unwrap()
        );
        assert_eq!(
            Some(Literal::int(0)),
            Month.transform_literal(&Literal::date(0)).unwrap()
        );
    }

    #[test]
    fn test_day() {
        assert_eq!(
            Some(Literal::int(17486)),
            Day.transform_literal(&ts("2017-11-16T22:31:08Z")).unwrap()
        );
        assert_eq!(
            Some(Literal::int(-1)),
            Day.transform_literal(&ts("1969-12-31T23:59:59Z")).unwrap()
        );
        assert_eq!(
            Some(Literal::int(17486)),
            Day.transform_literal(&Literal::date(17486)).unwrap()
        );
    }

    #[test]
    fn test_hour() {
        assert_eq!(
            Some(Literal::int(17486 * 24 + 22)),
            Hour.transform_literal(&ts("2017-11-16T22:31:08Z")).unwrap()
        );
        assert_eq!(
            Some(Literal::int(-1)),
            Hour.transform_literal(&ts("1969-12-31T23:59:59Z")).unwrap()
        );
        assert!(Hour.transform_literal(&Literal::date(1)).is_err());
        assert!(Hour.transform_literal(&Literal::long(1)).is_err());
    }

    #[test]
    fn test_human_pre_epoch() {
        assert_eq!("1969", human_year(-1));
        assert_eq!("1969-12", human_month(-1));
        assert_eq!("1969-12-31", human_day(-1));
        assert_eq!("1969-12-31-23", human_hour(-1));
    }
}
