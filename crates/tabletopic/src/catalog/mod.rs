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

//! Catalog API of the write path: where table metadata is loaded from and
//! partition spec changes are committed to.

mod memory;

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::mem::take;

use async_trait::async_trait;
pub use memory::MemoryCatalog;
use serde_derive::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::spec::{PartitionSpec, Schema, SchemaId, TableMetadata, TableMetadataBuilder};
use crate::table::Table;
use crate::{Error, ErrorKind, Result};

/// The provider of table metadata and partition spec commits.
///
/// Implementations must apply a [`TableCommit`] atomically: either every
/// requirement holds and every update is applied, or nothing changes and a
/// retryable [`ErrorKind::SpecCommitConflict`] is returned.
#[async_trait]
pub trait PartitionSpecProvider: Debug + Sync + Send {
    /// Current metadata of `ident`, or [`ErrorKind::TableNotFound`].
    async fn load_table(&self, ident: &TableIdent) -> Result<Table>;

    /// Registers a table backing a new topic.
    async fn create_table(&self, creation: TableCreation) -> Result<Table>;

    /// Atomically checks the commit's requirements and applies its updates.
    async fn update_table(&self, commit: TableCommit) -> Result<Table>;
}

/// Dotted name of a topic's table, e.g. `topics.clicks`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdent {
    /// Parent levels, outermost first.
    pub namespace: Vec<String>,
    /// Last level.
    pub name: String,
}

impl TableIdent {
    /// Identifier from its parts.
    pub fn new(namespace: Vec<String>, name: String) -> Self {
        Self { namespace, name }
    }

    /// Parent levels.
    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    /// Last level.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Splits `parts` into namespace and name; the last part is the name.
    pub fn from_strs(parts: impl IntoIterator<Item = impl ToString>) -> Result<Self> {
        let mut namespace: Vec<String> = parts.into_iter().map(|p| p.to_string()).collect();
        match namespace.pop() {
            Some(name) => Ok(Self { namespace, name }),
            None => Err(Error::new(
                ErrorKind::DataInvalid,
                "table identifier needs at least one part",
            )),
        }
    }
}

impl Display for TableIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace.join("."), self.name)
        }
    }
}

/// Request to register a table with a provider.
#[derive(Debug, TypedBuilder)]
pub struct TableCreation {
    /// Last identifier level; the namespace comes from the caller.
    #[builder(setter(into))]
    pub name: String,
    /// Root location; providers derive one from their warehouse when absent.
    #[builder(default, setter(strip_option(fallback = location_opt), into))]
    pub location: Option<String>,
    /// Initial schema.
    pub schema: Schema,
    /// The partition spec of the table, unpartitioned if `None`.
    #[builder(default, setter(strip_option(fallback = partition_spec_opt)))]
    pub partition_spec: Option<PartitionSpec>,
    /// Initial table properties, including the `tabletopic.*` settings.
    #[builder(default)]
    pub properties: HashMap<String, String>,
}

/// Guarded set of metadata changes for one table.
#[derive(Debug, TypedBuilder)]
pub struct TableCommit {
    ident: TableIdent,
    /// Checked against the provider's current metadata before any update runs.
    requirements: Vec<TableRequirement>,
    updates: Vec<TableUpdate>,
}

impl TableCommit {
    /// Target table.
    pub fn identifier(&self) -> &TableIdent {
        &self.ident
    }

    /// Moves the requirements out, leaving none behind.
    pub fn take_requirements(&mut self) -> Vec<TableRequirement> {
        take(&mut self.requirements)
    }

    /// Moves the updates out, leaving none behind.
    pub fn take_updates(&mut self) -> Vec<TableUpdate> {
        take(&mut self.updates)
    }

    /// Applies this commit to `table`, checking every requirement first.
    pub fn apply(mut self, table: Table) -> Result<Table> {
        for requirement in self.take_requirements() {
            requirement.check(Some(table.metadata()))?;
        }

        let mut metadata_builder = table.metadata().clone().into_builder();
        for update in self.take_updates() {
            metadata_builder = update.apply(metadata_builder)?;
        }

        Ok(table.with_metadata(metadata_builder.build()?))
    }
}

/// Precondition on the metadata a commit was planned against.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum TableRequirement {
    /// No table may be registered under the identifier.
    #[serde(rename = "assert-create")]
    NotExist,
    /// The table was not dropped and recreated in between.
    #[serde(rename = "assert-table-uuid")]
    UuidMatch {
        /// Uuid observed when planning.
        uuid: Uuid,
    },
    /// No schema change landed in between.
    #[serde(rename = "assert-current-schema-id")]
    CurrentSchemaIdMatch {
        /// Schema id observed when planning.
        #[serde(rename = "current-schema-id")]
        current_schema_id: SchemaId,
    },
    /// No other commit handed out partition field ids in between.
    #[serde(rename = "assert-last-assigned-partition-id")]
    LastAssignedPartitionIdMatch {
        /// Highest field id observed when planning.
        #[serde(rename = "last-assigned-partition-id")]
        last_assigned_partition_id: i32,
    },
    /// No other spec became the default in between.
    #[serde(rename = "assert-default-spec-id")]
    DefaultSpecIdMatch {
        /// Default spec id observed when planning.
        #[serde(rename = "default-spec-id")]
        default_spec_id: i32,
    },
}

/// Metadata change carried by a [`TableCommit`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum TableUpdate {
    /// Registers a spec; an existing equivalent spec is reused.
    AddSpec {
        /// Spec whose id is reassigned by the provider.
        spec: PartitionSpec,
    },
    /// Routes new data files to the given spec.
    #[serde(rename_all = "kebab-case")]
    SetDefaultSpec {
        /// Partition spec id to set as the default spec. -1 means the last
        /// spec added in the same commit.
        spec_id: i32,
    },
}

impl TableUpdate {
    /// Replays the change onto `builder`.
    pub fn apply(self, builder: TableMetadataBuilder) -> Result<TableMetadataBuilder> {
        match self {
            TableUpdate::AddSpec { spec } => builder.add_partition_spec(spec),
            TableUpdate::SetDefaultSpec { spec_id } => builder.set_default_partition_spec(spec_id),
        }
    }
}

impl TableRequirement {
    /// Fails with a retryable [`ErrorKind::SpecCommitConflict`] when
    /// `metadata` moved away from what the requirement captured. `None`
    /// stands for a table that is not registered.
    pub fn check(&self, metadata: Option<&TableMetadata>) -> Result<()> {
        let Some(metadata) = metadata else {
            return match self {
                TableRequirement::NotExist => Ok(()),
                _ => Err(Error::new(
                    ErrorKind::TableNotFound,
                    "table is not registered",
                )),
            };
        };

        let conflict = |message: &str, expected: String, found: String| {
            Err(Error::new(ErrorKind::SpecCommitConflict, message)
                .with_context("expected", expected)
                .with_context("found", found))
        };

        match self {
            TableRequirement::NotExist => Err(Error::new(
                ErrorKind::TableAlreadyExists,
                format!("table {} is already registered", metadata.uuid()),
            )),
            TableRequirement::UuidMatch { uuid } if &metadata.uuid() != uuid => conflict(
                "table was replaced concurrently",
                uuid.to_string(),
                metadata.uuid().to_string(),
            ),
            TableRequirement::CurrentSchemaIdMatch { current_schema_id }
                if metadata.current_schema_id() != *current_schema_id =>
            {
                conflict(
                    "schema changed concurrently",
                    current_schema_id.to_string(),
                    metadata.current_schema_id().to_string(),
                )
            }
            TableRequirement::DefaultSpecIdMatch { default_spec_id }
                if metadata.default_partition_spec_id() != *default_spec_id =>
            {
                conflict(
                    "default spec changed concurrently",
                    default_spec_id.to_string(),
                    metadata.default_partition_spec_id().to_string(),
                )
            }
            TableRequirement::LastAssignedPartitionIdMatch {
                last_assigned_partition_id,
            } if metadata.last_partition_id() != *last_assigned_partition_id => conflict(
                "partition field ids were assigned concurrently",
                last_assigned_partition_id.to_string(),
                metadata.last_partition_id().to_string(),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::schema::tests::clickstream_schema;
    use crate::spec::Transform;

    fn metadata() -> TableMetadata {
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
    fn test_table_ident() {
        let ident = TableIdent::from_strs(["topics", "clicks"]).unwrap();
        assert_eq!(vec!["topics".to_string()], ident.namespace());
        assert_eq!("clicks", ident.name());
        assert_eq!("topics.clicks", ident.to_string());
        assert!(TableIdent::from_strs(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_requirements_met() {
        let metadata = metadata();
        for requirement in [
            TableRequirement::UuidMatch {
                uuid: metadata.uuid(),
            },
            TableRequirement::CurrentSchemaIdMatch {
                current_schema_id: 1,
            },
            TableRequirement::DefaultSpecIdMatch { default_spec_id: 0 },
            TableRequirement::LastAssignedPartitionIdMatch {
                last_assigned_partition_id: 999,
            },
        ] {
            requirement.check(Some(&metadata)).unwrap();
        }
        TableRequirement::NotExist.check(None).unwrap();
    }

    #[test]
    fn test_requirement_mismatch_is_retryable_conflict() {
        let metadata = metadata();
        let err = TableRequirement::DefaultSpecIdMatch { default_spec_id: 3 }
            .check(Some(&metadata))
            .unwrap_err();
        assert_eq!(ErrorKind::SpecCommitConflict, err.kind());
        assert!(err.retryable());

        let err = TableRequirement::UuidMatch {
            uuid: Uuid::new_v4(),
        }
        .check(Some(&metadata))
        .unwrap_err();
        assert_eq!(ErrorKind::SpecCommitConflict, err.kind());

        let err = TableRequirement::NotExist.check(Some(&metadata)).unwrap_err();
        assert_eq!(ErrorKind::TableAlreadyExists, err.kind());
        assert!(!err.retryable());
    }

    #[test]
    fn test_update_serde() {
        let schema = clickstream_schema();
        let spec = PartitionSpec::builder(&schema)
            .add_partition_field("page_url", Transform::Bucket(5))
            .unwrap()
            .build();
        let update = TableUpdate::AddSpec { spec };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"action\":\"add-spec\""));
        assert_eq!(update, serde_json::from_str::<TableUpdate>(&json).unwrap());

        let json = serde_json::to_value(TableUpdate::SetDefaultSpec { spec_id: -1 }).unwrap();
        assert_eq!(
            serde_json::json!({"action": "set-default-spec", "spec-id": -1}),
            json
        );
    }
}
