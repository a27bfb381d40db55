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

/*!
 * Partitioning
*/
use std::collections::HashSet;
use std::sync::Arc;

use serde_derive::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{NestedField, Schema, Struct, Transform};
use crate::transform::to_human_string;
use crate::{Error, ErrorKind, Result};

/// Reference to [`PartitionSpec`].
pub type PartitionSpecRef = Arc<PartitionSpec>;

/// Spec id of the unpartitioned spec every table starts with.
pub const UNPARTITIONED_SPEC_ID: i32 = 0;
/// Partition field ids are assigned starting after this value.
pub const UNPARTITIONED_LAST_ASSIGNED_ID: i32 = 999;

/// Partition fields capture the transform from table data to partition values.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, TypedBuilder)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionField {
    /// A source column id from the table’s schema
    pub source_id: i32,
    /// A partition field id that is used to identify a partition field and
    /// is unique across all partition specs of a table.
    pub field_id: i32,
    /// A partition name.
    #[builder(setter(into))]
    pub name: String,
    /// A transform that is applied to the source column to produce a partition value.
    pub transform: Transform,
}

///  Partition spec that defines how to produce a tuple of partition values from a record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionSpec {
    spec_id: i32,
    fields: Vec<PartitionField>,
}

impl PartitionSpec {
    /// Create a partition spec builder bound to `schema`.
    pub fn builder(schema: &Schema) -> PartitionSpecBuilder<'_> {
        PartitionSpecBuilder::new(schema)
    }

    /// The spec with no fields.
    pub fn unpartitioned() -> Self {
        Self {
            spec_id: UNPARTITIONED_SPEC_ID,
            fields: vec![],
        }
    }

    /// Identifier for PartitionSpec
    pub fn spec_id(&self) -> i32 {
        self.spec_id
    }

    /// Details of the partition spec
    pub fn fields(&self) -> &[PartitionField] {
        &self.fields
    }

    /// Returns if the partition spec is unpartitioned.
    pub fn is_unpartitioned(&self) -> bool {
        self.fields.is_empty()
    }

    /// Highest partition field id in this spec, if any.
    pub fn highest_field_id(&self) -> Option<i32> {
        self.fields.iter().map(|f| f.field_id).max()
    }

    /// Returns a copy of this spec with another spec id.
    pub fn with_spec_id(self, spec_id: i32) -> Self {
        Self { spec_id, ..self }
    }

    /// Returns true if both specs have the same fields, ignoring spec ids.
    pub fn is_compatible_with(&self, other: &PartitionSpec) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().zip(other.fields.iter()).all(|(a, b)| {
                a.source_id == b.source_id && a.transform == b.transform && a.name == b.name
            })
    }

    /// Returns the partition type of this partition spec.
    pub fn partition_type(&self, schema: &Schema) -> Result<Vec<NestedField>> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for partition_field in &self.fields {
            let field = schema
                .field_by_id(partition_field.source_id)
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::DataInvalid,
                        format!(
                            "No column with source column id {} in schema {}",
                            partition_field.source_id,
                            schema.schema_id()
                        ),
                    )
                })?;
            let res_type = partition_field.transform.result_type(&field.field_type)?;
            fields.push(NestedField::optional(
                partition_field.field_id,
                &partition_field.name,
                res_type,
            ));
        }
        Ok(fields)
    }

    /// Renders a partition tuple as a relative path, e.g.
    /// `page_url_bucket=3/timestamp_hour=2024-03-05-10`.
    pub fn partition_to_path(&self, partition: &Struct) -> String {
        self.fields
            .iter()
            .zip(partition.iter())
            .map(|(field, value)| {
                format!("{}={}", field.name, to_human_string(&field.transform, value))
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Builds a [`PartitionSpec`] against a schema, checking that source columns
/// exist, transforms accept their types and partition fields don't collide.
#[derive(Debug)]
pub struct PartitionSpecBuilder<'a> {
    schema: &'a Schema,
    spec_id: i32,
    last_assigned_field_id: i32,
    fields: Vec<PartitionField>,
}

impl<'a> PartitionSpecBuilder<'a> {
    fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            spec_id: UNPARTITIONED_SPEC_ID,
            last_assigned_field_id: UNPARTITIONED_LAST_ASSIGNED_ID,
            fields: vec![],
        }
    }

    /// Sets the spec id.
    pub fn with_spec_id(mut self, spec_id: i32) -> Self {
        self.spec_id = spec_id;
        self
    }

    /// New partition fields get ids after `last_assigned_field_id`.
    pub fn with_last_assigned_field_id(mut self, last_assigned_field_id: i32) -> Self {
        self.last_assigned_field_id = last_assigned_field_id;
        self
    }

    /// Adds a new partition field on the column named `source_name`, named
    /// by [`Transform::partition_field_name`].
    pub fn add_partition_field(self, source_name: &str, transform: Transform) -> Result<Self> {
        let name = transform.partition_field_name(source_name);
        self.add_named_partition_field(source_name, name, transform)
    }

    /// Adds a new partition field on the column named `source_name`.
    pub fn add_named_partition_field(
        mut self,
        source_name: &str,
        name: impl Into<String>,
        transform: Transform,
    ) -> Result<Self> {
        let source_id = self
            .schema
            .field_id_by_name(source_name)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::UnknownSourceField,
                    format!("Cannot find source column {source_name:?} in schema"),
                )
            })?;
        self.last_assigned_field_id += 1;
        let field = PartitionField {
            source_id,
            field_id: self.last_assigned_field_id,
            name: name.into(),
            transform,
        };
        self.check_and_push(field, true)?;
        Ok(self)
    }

    /// Carries a field of an earlier spec over, keeping its id and name.
    pub fn add_existing_field(mut self, field: PartitionField) -> Result<Self> {
        self.last_assigned_field_id = self.last_assigned_field_id.max(field.field_id);
        self.check_and_push(field, false)?;
        Ok(self)
    }

    /// Returns true if a field with `name` was already added.
    pub fn contains_name(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    fn check_and_push(&mut self, field: PartitionField, is_new: bool) -> Result<()> {
        let source = self.schema.field_by_id(field.source_id).ok_or_else(|| {
            Error::new(
                ErrorKind::UnknownSourceField,
                format!("Cannot find source column with id {}", field.source_id),
            )
        })?;
        field.transform.result_type(&source.field_type)?;

        if self.contains_name(&field.name) {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Cannot use partition name more than once: {}", field.name),
            ));
        }
        if is_new && field.transform != Transform::Identity {
            if let Some(other) = self
                .schema
                .field_by_name(&field.name)
                .filter(|f| f.id != field.source_id)
            {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!(
                        "Partition name {} conflicts with schema column {}",
                        field.name, other.id
                    ),
                ));
            }
        }
        let dedup = field.transform.dedup_name();
        if let Some(existing) = self
            .fields
            .iter()
            .find(|f| f.source_id == field.source_id && f.transform.dedup_name() == dedup)
        {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Cannot add redundant partition {} for source {}, conflicts with {}",
                    field.name, source.name, existing.name
                ),
            ));
        }

        self.fields.push(field);
        Ok(())
    }

    /// Returns the id of the last partition field id assigned so far.
    pub fn last_assigned_field_id(&self) -> i32 {
        self.last_assigned_field_id
    }

    /// Builds the spec.
    pub fn build(self) -> PartitionSpec {
        debug_assert!(
            self.fields.iter().map(|f| f.field_id).collect::<HashSet<_>>().len()
                == self.fields.len()
        );
        PartitionSpec {
            spec_id: self.spec_id,
            fields: self.fields,
        }
    }
}
