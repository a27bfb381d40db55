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

//! Data types of table columns.

use std::fmt;
use std::sync::Arc;

use serde_derive::{Deserialize, Serialize};

/// Column types a table topic can carry. Nested types are not supported;
/// records are flat maps from field id to value.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// True or false.
    Boolean,
    /// Signed, 32 bits.
    Int,
    /// Signed, 64 bits.
    Long,
    /// Single precision IEEE 754.
    Float,
    /// Double precision IEEE 754.
    Double,
    /// Unscaled value with a fixed number of fractional digits.
    Decimal {
        /// Total digits.
        precision: u32,
        /// Fractional digits.
        scale: u32,
    },
    /// Days since the unix epoch.
    Date,
    /// Microseconds since midnight.
    Time,
    /// Local microseconds since the unix epoch.
    Timestamp,
    /// Microseconds since the unix epoch, UTC.
    Timestamptz,
    /// UTF-8 text.
    String,
    /// 128-bit identifier.
    Uuid,
    /// Raw bytes.
    Binary,
}

impl PrimitiveType {
    fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal { .. } => "decimal",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Timestamptz => "timestamptz",
            Self::String => "string",
            Self::Uuid => "uuid",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Shared handle to a schema column.
pub type NestedFieldRef = Arc<NestedField>;

/// A column of a table schema. Each column has an integer id that is unique in
/// the table schema and stays stable across renames.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NestedField {
    /// Stable column id, referenced by partition fields as their source.
    pub id: i32,
    /// Column name as declared in partition declarations.
    pub name: String,
    /// Whether records must carry a value.
    pub required: bool,
    /// Value type.
    #[serde(rename = "type")]
    pub field_type: PrimitiveType,
    /// Free form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl NestedField {
    fn new(id: i32, name: impl ToString, required: bool, field_type: PrimitiveType) -> Self {
        Self {
            id,
            name: name.to_string(),
            required,
            field_type,
            doc: None,
        }
    }

    /// Column that every record must fill.
    pub fn required(id: i32, name: impl ToString, field_type: PrimitiveType) -> Self {
        Self::new(id, name, true, field_type)
    }

    /// Nullable column.
    pub fn optional(id: i32, name: impl ToString, field_type: PrimitiveType) -> Self {
        Self::new(id, name, false, field_type)
    }

    /// Attaches a description.
    pub fn with_doc(mut self, doc: impl ToString) -> Self {
        self.doc = Some(doc.to_string());
        self
    }
}

impl fmt::Display for NestedField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let requirement = if self.required { "required" } else { "optional" };
        write!(f, "{}: {}: {requirement} {}", self.id, self.name, self.field_type)
    }
}
