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

//! Column layout of a topic's table.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};

use super::{NestedField, NestedFieldRef};
use crate::error::Result;
use crate::{ensure_data_valid, Error, ErrorKind};

/// Identifies one version of a table's schema.
pub type SchemaId = i32;
/// Shared [`Schema`].
pub type SchemaRef = Arc<Schema>;
/// Id of the first schema a table is created with.
pub const DEFAULT_SCHEMA_ID: SchemaId = 0;

/// Defines schema of a table: an ordered list of columns, each bound to a
/// stable field id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SchemaSerde", into = "SchemaSerde")]
pub struct Schema {
    schema_id: SchemaId,
    fields: Vec<NestedFieldRef>,
    identifier_field_ids: HashSet<i32>,

    id_to_field: HashMap<i32, NestedFieldRef>,
    name_to_id: HashMap<String, i32>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.schema_id == other.schema_id
            && self.identifier_field_ids == other.identifier_field_ids
    }
}

impl Eq for Schema {}

/// Collects columns and validates them into a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema_id: i32,
    fields: Vec<NestedFieldRef>,
    identifier_field_ids: HashSet<i32>,
}

impl SchemaBuilder {
    /// Appends columns, keeping their order.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = NestedFieldRef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Version id of the resulting schema.
    pub fn with_schema_id(mut self, schema_id: i32) -> Self {
        self.schema_id = schema_id;
        self
    }

    /// Marks columns as the row identity; they must be required.
    pub fn with_identifier_field_ids(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.identifier_field_ids.extend(ids);
        self
    }

    /// Fails on duplicate ids or names and on unknown or optional identifier columns.
    pub fn build(self) -> Result<Schema> {
        let mut id_to_field = HashMap::with_capacity(self.fields.len());
        let mut name_to_id = HashMap::with_capacity(self.fields.len());

        for field in &self.fields {
            if id_to_field.insert(field.id, field.clone()).is_some() {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("column id {} is used twice", field.id),
                ));
            }
            if name_to_id.insert(field.name.clone(), field.id).is_some() {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("column name {} is used twice", field.name),
                ));
            }
        }

        for id in &self.identifier_field_ids {
            let field = id_to_field.get(id).ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!("identifier column {id} is not in the schema"),
                )
            })?;
            ensure_data_valid!(
                field.required,
                "identifier column {} must be required",
                field.name
            );
        }

        Ok(Schema {
            schema_id: self.schema_id,
            fields: self.fields,
            identifier_field_ids: self.identifier_field_ids,
            id_to_field,
            name_to_id,
        })
    }
}

impl Schema {
    /// Empty builder with schema id 0.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Builder seeded with every column of this schema.
    pub fn into_builder(self) -> SchemaBuilder {
        SchemaBuilder {
            schema_id: self.schema_id,
            fields: self.fields,
            identifier_field_ids: self.identifier_field_ids,
        }
    }

    /// Column with `field_id`.
    pub fn field_by_id(&self, field_id: i32) -> Option<&NestedFieldRef> {
        self.id_to_field.get(&field_id)
    }

    /// Column called `field_name`, matched case sensitively.
    pub fn field_by_name(&self, field_name: &str) -> Option<&NestedFieldRef> {
        self.name_to_id
            .get(field_name)
            .and_then(|id| self.field_by_id(*id))
    }

    /// Version id.
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    /// All columns in declared order.
    pub fn fields(&self) -> &[NestedFieldRef] {
        &self.fields
    }

    /// Columns forming the row identity, in no particular order.
    pub fn identifier_field_ids(&self) -> impl ExactSizeIterator<Item = i32> + '_ {
        self.identifier_field_ids.iter().copied()
    }

    /// Id of the column called `name`.
    pub fn field_id_by_name(&self, name: &str) -> Option<i32> {
        self.name_to_id.get(name).copied()
    }

    /// Name of the column with `field_id`.
    pub fn name_by_field_id(&self, field_id: i32) -> Option<&str> {
        self.id_to_field.get(&field_id).map(|f| f.name.as_str())
    }

    /// Highest field id used by this schema.
    pub fn highest_field_id(&self) -> i32 {
        self.fields.iter().map(|f| f.id).max().unwrap_or(0)
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "table {{")?;
        for field in &self.fields {
            writeln!(f, "  {field}")?;
        }
        writeln!(f, "}}")
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SchemaSerde {
    schema_id: SchemaId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    identifier_field_ids: Vec<i32>,
    fields: Vec<NestedField>,
}

impl From<Schema> for SchemaSerde {
    fn from(schema: Schema) -> Self {
        SchemaSerde {
            schema_id: schema.schema_id,
            identifier_field_ids: schema.identifier_field_ids.into_iter().sorted().collect(),
            fields: schema
                .fields
                .into_iter()
                .map(Arc::unwrap_or_clone)
                .collect(),
        }
    }
}

impl TryFrom<SchemaSerde> for Schema {
    type Error = Error;

    fn try_from(value: SchemaSerde) -> Result<Self> {
        Schema::builder()
            .with_schema_id(value.schema_id)
            .with_identifier_field_ids(value.identifier_field_ids)
            .with_fields(value.fields.into_iter().map(Arc::new))
            .build()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::PrimitiveType;

    /// Clickstream schema shared by tests across the crate.
    pub(crate) fn clickstream_schema() -> Schema {
        Schema::builder()
            .with_schema_id(1)
            .with_identifier_field_ids(vec![1])
            .with_fields(vec![
                NestedField::required(1, "id", PrimitiveType::Long).into(),
                NestedField::optional(2, "page_url", PrimitiveType::String).into(),
                NestedField::optional(3, "timestamp", PrimitiveType::Timestamptz).into(),
                NestedField::optional(4, "region", PrimitiveType::String).into(),
                NestedField::optional(5, "visits", PrimitiveType::Int).into(),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookup_by_name_and_id() {
        let schema = clickstream_schema();
        assert_eq!(Some(2), schema.field_id_by_name("page_url"));
        assert_eq!(Some("timestamp"), schema.name_by_field_id(3));
        assert_eq!(
            PrimitiveType::Int,
            schema.field_by_name("visits").unwrap().field_type
        );
        assert!(schema.field_by_name("Page_Url").is_none());
        assert_eq!(5, schema.highest_field_id());
    }

    #[test]
    fn test_duplicate_field_id_rejected() {
        let err = Schema::builder()
            .with_fields(vec![
                NestedField::required(1, "a", PrimitiveType::Int).into(),
                NestedField::required(1, "b", PrimitiveType::Int).into(),
            ])
            .build()
            .unwrap_err();
        assert_eq!(ErrorKind::DataInvalid, err.kind());
    }

    #[test]
    fn test_optional_identifier_rejected() {
        let result = Schema::builder()
            .with_identifier_field_ids(vec![2])
            .with_fields(vec![
                NestedField::required(1, "a", PrimitiveType::Int).into(),
                NestedField::optional(2, "b", PrimitiveType::Int).into(),
            ])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_serde() {
        let schema = clickstream_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, parsed);
    }
}
