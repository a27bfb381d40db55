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

//! Defines the table metadata the write path reads and evolves: the current
//! schema, every partition spec the table ever had and the default spec
//! writers route records with.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    PartitionSpec, PartitionSpecRef, Schema, SchemaId, SchemaRef, UNPARTITIONED_LAST_ASSIGNED_ID,
};
use crate::{Error, ErrorKind, Result};

/// Shared [`TableMetadata`] snapshot.
pub type TableMetadataRef = Arc<TableMetadata>;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Snapshot of everything the write path needs to know about a topic's table.
///
/// Only [`TableMetadataBuilder`] produces values, so the default spec is always
/// registered and valid against the current schema.
pub struct TableMetadata {
    /// Changes when the table is dropped and recreated under the same name.
    pub(crate) table_uuid: Uuid,
    /// Root under which data files are written.
    pub(crate) location: String,
    /// Unix millis of the last metadata change.
    pub(crate) last_updated_ms: i64,
    pub(crate) current_schema: SchemaRef,
    /// Every spec ever committed, by id.
    pub(crate) partition_specs: HashMap<i32, PartitionSpecRef>,
    /// Spec new data files are partitioned by.
    pub(crate) default_spec_id: i32,
    /// Highest partition field id handed out by any spec.
    pub(crate) last_partition_id: i32,
    pub(crate) properties: HashMap<String, String>,
}

impl TableMetadata {
    /// Starts a modification of this snapshot.
    #[must_use]
    pub fn into_builder(self) -> TableMetadataBuilder {
        TableMetadataBuilder {
            metadata: self,
            last_added_spec_id: None,
        }
    }

    /// Table uuid.
    #[inline]
    pub fn uuid(&self) -> Uuid {
        self.table_uuid
    }

    /// Root location as configured; may end with a slash.
    #[inline]
    pub fn location(&self) -> &str {
        self.location.as_str()
    }

    /// Unix millis of the last change.
    #[inline]
    pub fn last_updated_ms(&self) -> i64 {
        self.last_updated_ms
    }

    /// Schema new records are validated against.
    #[inline]
    pub fn current_schema(&self) -> &SchemaRef {
        &self.current_schema
    }

    /// Version id of [`Self::current_schema`].
    #[inline]
    pub fn current_schema_id(&self) -> SchemaId {
        self.current_schema.schema_id()
    }

    /// Every committed spec, in no particular order.
    #[inline]
    pub fn partition_specs_iter(&self) -> impl ExactSizeIterator<Item = &PartitionSpecRef> {
        self.partition_specs.values()
    }

    /// Committed spec with `spec_id`.
    #[inline]
    pub fn partition_spec_by_id(&self, spec_id: i32) -> Option<&PartitionSpecRef> {
        self.partition_specs.get(&spec_id)
    }

    /// Spec new data files are partitioned by.
    #[inline]
    pub fn default_partition_spec(&self) -> &PartitionSpecRef {
        // Builder guarantees the default spec is registered.
        &self.partition_specs[&self.default_spec_id]
    }

    /// Id of [`Self::default_partition_spec`].
    #[inline]
    pub fn default_partition_spec_id(&self) -> i32 {
        self.default_spec_id
    }

    /// Highest partition field id handed out so far, or 999 if none.
    #[inline]
    pub fn last_partition_id(&self) -> i32 {
        self.last_partition_id
    }

    /// Table properties, including the `tabletopic.*` writer settings.
    #[inline]
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }
}

/// Applies validated changes to a [`TableMetadata`] snapshot.
#[derive(Debug, Clone)]
pub struct TableMetadataBuilder {
    metadata: TableMetadata,
    last_added_spec_id: Option<i32>,
}

impl TableMetadataBuilder {
    /// Spec id meaning "the spec added earlier through this builder".
    pub const LAST_ADDED: i32 = -1;

    /// Create table metadata for a new table. The table starts with `spec`
    /// as its default partition spec; field ids of `spec` are kept.
    pub fn new(
        schema: Schema,
        spec: PartitionSpec,
        location: impl Into<String>,
        properties: HashMap<String, String>,
    ) -> Result<Self> {
        spec.partition_type(&schema)?;
        let spec = spec.with_spec_id(0);
        let last_partition_id = spec
            .highest_field_id()
            .unwrap_or(UNPARTITIONED_LAST_ASSIGNED_ID);

        Ok(Self {
            metadata: TableMetadata {
                table_uuid: Uuid::new_v4(),
                location: location.into(),
                last_updated_ms: Utc::now().timestamp_millis(),
                current_schema: Arc::new(schema),
                partition_specs: HashMap::from([(0, Arc::new(spec))]),
                default_spec_id: 0,
                last_partition_id,
                properties,
            },
            last_added_spec_id: None,
        })
    }

    /// Overrides the generated uuid.
    pub fn assign_uuid(mut self, uuid: Uuid) -> Self {
        self.metadata.table_uuid = uuid;
        self
    }

    /// Replace the current schema.
    ///
    /// Existing partition specs are kept even if their source columns are
    /// gone; writers evolve the default spec on their next batch.
    pub fn set_current_schema(mut self, schema: Schema) -> Self {
        self.metadata.current_schema = Arc::new(schema);
        self
    }

    /// Registers `spec` under a provider-assigned id.
    ///
    /// The spec is checked against the current schema. If a compatible spec
    /// exists, its id is reused; otherwise the spec gets the next free id.
    pub fn add_partition_spec(mut self, spec: PartitionSpec) -> Result<Self> {
        spec.partition_type(&self.metadata.current_schema)?;

        let new_spec_id = self.reuse_or_create_new_spec_id(&spec);
        self.last_added_spec_id = Some(new_spec_id);
        if self.metadata.partition_specs.contains_key(&new_spec_id) {
            return Ok(self);
        }

        let highest_field_id = spec
            .highest_field_id()
            .unwrap_or(UNPARTITIONED_LAST_ASSIGNED_ID);
        self.metadata
            .partition_specs
            .insert(new_spec_id, Arc::new(spec.with_spec_id(new_spec_id)));
        self.metadata.last_partition_id =
            std::cmp::max(self.metadata.last_partition_id, highest_field_id);

        Ok(self)
    }

    /// Routes new data files to `spec_id`, which may be [`Self::LAST_ADDED`].
    ///
    /// Fails when `spec_id` is not registered.
    pub fn set_default_partition_spec(mut self, mut spec_id: i32) -> Result<Self> {
        if spec_id == Self::LAST_ADDED {
            spec_id = self.last_added_spec_id.ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    "no spec was added before selecting the last added one as default",
                )
            })?;
        }

        if !self.metadata.partition_specs.contains_key(&spec_id) {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("spec {spec_id} is not registered"),
            ));
        }
        self.metadata.default_spec_id = spec_id;

        Ok(self)
    }

    /// Finishes the change and stamps the update time.
    pub fn build(mut self) -> Result<TableMetadata> {
        self.metadata
            .partition_specs
            .get(&self.metadata.default_spec_id)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!(
                        "Default partition spec {} is not registered",
                        self.metadata.default_spec_id
                    ),
                )
            })?;

        self.metadata.last_updated_ms = Utc::now().timestamp_millis();
        Ok(self.metadata)
    }

    fn reuse_or_create_new_spec_id(&self, new_spec: &PartitionSpec) -> i32 {
        self.metadata
            .partition_specs
            .iter()
            .find_map(|(id, spec)| spec.is_compatible_with(new_spec).then_some(*id))
            .unwrap_or_else(|| {
                self.metadata
                    .partition_specs
                    .keys()
                    .max()
                    .map_or(0, |max| max + 1)
            })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::schema::tests::clickstream_schema;
    use crate::spec::Transform;

    fn unpartitioned_metadata() -> TableMetadata {
        TableMetadataBuilder::new(
            clickstream_schema(),
            PartitionSpec::unpartitioned(),
            "memory://warehouse/clicks",
            HashMap::new(),
        )
        .unwrap()
        .build()
        .unwrap()
    }

    #[test]
    fn test_new_table_is_unpartitioned() {
        let metadata = unpartitioned_metadata();
        assert_eq!(0, metadata.default_partition_spec_id());
        assert!(metadata.default_partition_spec().is_unpartitioned());
        assert_eq!(UNPARTITIONED_LAST_ASSIGNED_ID, metadata.last_partition_id());
        assert_eq!("memory://warehouse/clicks", metadata.location());
    }

    #[test]
    fn test_add_and_set_default_spec() {
        let metadata = unpartitioned_metadata();
        let schema = metadata.current_schema().clone();
        let spec = PartitionSpec::builder(&schema)
            .add_partition_field("page_url", Transform::Bucket(5))
            .unwrap()
            .build();

        let metadata = metadata
            .into_builder()
            .add_partition_spec(spec.clone())
            .unwrap()
            .set_default_partition_spec(TableMetadataBuilder::LAST_ADDED)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(1, metadata.default_partition_spec_id());
        assert_eq!(1000, metadata.last_partition_id());
        assert_eq!(2, metadata.partition_specs_iter().len());

        // Re-adding a compatible spec reuses its id.
        let metadata = metadata
            .into_builder()
            .add_partition_spec(PartitionSpec::unpartitioned())
            .unwrap()
            .set_default_partition_spec(TableMetadataBuilder::LAST_ADDED)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(0, metadata.default_partition_spec_id());
        assert_eq!(2, metadata.partition_specs_iter().len());
        assert_eq!(1000, metadata.last_partition_id());
    }

    #[test]
    fn test_set_unknown_default_spec() {
        let err = unpartitioned_metadata()
            .into_builder()
            .set_default_partition_spec(7)
            .unwrap_err();
        assert_eq!(ErrorKind::DataInvalid, err.kind());

        let err = unpartitioned_metadata()
            .into_builder()
            .set_default_partition_spec(TableMetadataBuilder::LAST_ADDED)
            .unwrap_err();
        assert_eq!(ErrorKind::DataInvalid, err.kind());
    }
}
