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

//! Change records handed to the write path.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::spec::{Literal, Schema};
use crate::{Error, ErrorKind, Result};

/// Change kind attached to each record by the upsert classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// A new row.
    #[serde(rename = "I")]
    Insert,
    /// A new version of an existing row.
    #[serde(rename = "U")]
    Update,
    /// Removal of an existing row.
    #[serde(rename = "D")]
    Delete,
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "I" => Ok(Operation::Insert),
            "U" => Ok(Operation::Update),
            "D" => Ok(Operation::Delete),
            _ => Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Unknown record operation: {s}"),
            )),
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Insert => write!(f, "I"),
            Operation::Update => write!(f, "U"),
            Operation::Delete => write!(f, "D"),
        }
    }
}

/// One change record. Values are addressed by schema field id; a field
/// without a value is null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    operation: Operation,
    values: BTreeMap<i32, Literal>,
}

#[derive(Serialize)]
struct RecordLine {
    op: Operation,
    values: BTreeMap<i32, JsonValue>,
}

impl Record {
    /// Creates a record with all fields null.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            values: BTreeMap::new(),
        }
    }

    /// Builds a record from `(column name, value)` pairs, checking each value
    /// against the column type in `schema`.
    pub fn from_named<'a>(
        operation: Operation,
        schema: &Schema,
        values: impl IntoIterator<Item = (&'a str, Literal)>,
    ) -> Result<Self> {
        let mut record = Self::new(operation);
        for (name, value) in values {
            let field = schema.field_by_name(name).ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!("Record column {name} is not in the table schema"),
                )
            })?;
            if !value.is_compatible_with(&field.field_type) {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!(
                        "Value {value} is not compatible with column {name} of type {}",
                        field.field_type
                    ),
                ));
            }
            record.values.insert(field.id, value);
        }
        Ok(record)
    }

    /// Sets the value of `field_id`.
    pub fn with_value(mut self, field_id: i32, value: Literal) -> Self {
        self.values.insert(field_id, value);
        self
    }

    /// The change kind of this record.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The value of `field_id`, or `None` if it is null.
    pub fn get(&self, field_id: i32) -> Option<&Literal> {
        self.values.get(&field_id)
    }

    /// Encodes the record as one json line, trailing newline included.
    ///
    /// Null fields are omitted.
    pub fn to_json_line(&self) -> Result<Vec<u8>> {
        let line = RecordLine {
            op: self.operation,
            values: self
                .values
                .iter()
                .map(|(id, value)| (*id, value.to_json()))
                .collect(),
        };
        let mut buf = serde_json::to_vec(&line)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::schema::tests::clickstream_schema;

    #[test]
    fn test_operation_from_str() {
        assert_eq!(Operation::Insert, "I".parse().unwrap());
        assert_eq!(Operation::Update, "U".parse().unwrap());
        assert_eq!(Operation::Delete, "D".parse().unwrap());
        assert_eq!(
            ErrorKind::DataInvalid,
            "X".parse::<Operation>().unwrap_err().kind()
        );
    }

    #[test]
    fn test_from_named() {
        let schema = clickstream_schema();
        let record = Record::from_named(Operation::Insert, &schema, [
            ("id", Literal::long(7)),
            ("page_url", Literal::string("/home")),
        ])
        .unwrap();

        assert_eq!(Some(&Literal::long(7)), record.get(1));
        assert_eq!(Some(&Literal::string("/home")), record.get(2));
        assert_eq!(None, record.get(3));
    }

    #[test]
    fn test_from_named_rejects_bad_values() {
        let schema = clickstream_schema();
        let err = Record::from_named(Operation::Insert, &schema, [("id", Literal::string("7"))])
            .unwrap_err();
        assert_eq!(ErrorKind::DataInvalid, err.kind());

        let err = Record::from_named(Operation::Insert, &schema, [("nope", Literal::long(1))])
            .unwrap_err();
        assert_eq!(ErrorKind::DataInvalid, err.kind());
    }

    #[test]
    fn test_json_line() {
        let record = Record::new(Operation::Update)
            .with_value(2, Literal::string("/a"))
            .with_value(1, Literal::long(3));
        assert_eq!(
            "{\"op\":\"U\",\"values\":{\"1\":3,\"2\":\"/a\"}}\n",
            String::from_utf8(record.to_json_line().unwrap()).unwrap()
        );
    }
}
