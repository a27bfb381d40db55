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

use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::{TableRequirement, TableUpdate};
use crate::evolution::plan_spec_evolution;
use crate::spec::{TableMetadataBuilder, TransformDescriptor};
use crate::table::Table;
use crate::transaction::{ActionCommit, TransactionAction};
use crate::Result;

/// Transaction action that makes the table's default partition spec match
/// declared transform descriptors.
///
/// The diff is computed in `commit`, against whatever table the transaction
/// loaded for the current attempt. If nothing differs the action produces no
/// updates.
#[derive(Debug, Default)]
pub struct UpdatePartitionSpecAction {
    descriptors: Vec<TransformDescriptor>,
}

impl UpdatePartitionSpecAction {
    /// Creates a new [`UpdatePartitionSpecAction`] with no descriptors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the desired descriptors, in declared order.
    pub fn set_descriptors(mut self, descriptors: Vec<TransformDescriptor>) -> Self {
        self.descriptors = descriptors;
        self
    }
}

#[async_trait]
impl TransactionAction for UpdatePartitionSpecAction {
    async fn commit(self: Arc<Self>, table: &Table) -> Result<ActionCommit> {
        let metadata = table.metadata();
        let Some(spec) = plan_spec_evolution(&self.descriptors, metadata)? else {
            return Ok(ActionCommit::default());
        };

        let updates = vec![
            TableUpdate::AddSpec { spec },
            TableUpdate::SetDefaultSpec {
                spec_id: TableMetadataBuilder::LAST_ADDED,
            },
        ];
        let requirements = vec![
            TableRequirement::UuidMatch {
                uuid: metadata.uuid(),
            },
            TableRequirement::CurrentSchemaIdMatch {
                current_schema_id: metadata.current_schema_id(),
            },
            TableRequirement::DefaultSpecIdMatch {
                default_spec_id: metadata.default_partition_spec_id(),
            },
            TableRequirement::LastAssignedPartitionIdMatch {
                last_assigned_partition_id: metadata.last_partition_id(),
            },
        ];

        Ok(ActionCommit::new(updates, requirements))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::TableIdent;
    use crate::spec::schema::tests::clickstream_schema;
    use crate::spec::{PartitionSpec, Transform};

    fn unpartitioned_table() -> Table {
        let metadata = TableMetadataBuilder::new(
            clickstream_schema(),
            PartitionSpec::unpartitioned(),
            "memory://warehouse/clicks",
            HashMap::new(),
        )
        .unwrap()
        .build()
        .unwrap();
        Table::builder()
            .identifier(TableIdent::from_strs(["clicks"]).unwrap())
            .metadata(metadata)
            .build()
    }

    #[tokio::test]
    async fn test_update_partition_spec_commit() {
        let table = unpartitioned_table();
        let action = UpdatePartitionSpecAction::new().set_descriptors(vec![
            TransformDescriptor::new("page_url", Transform::Bucket(5)),
        ]);

        let mut action_commit = Arc::new(action).commit(&table).await.unwrap();
        let updates = action_commit.take_updates();
        let requirements = action_commit.take_requirements();

        assert_eq!(2, updates.len());
        let TableUpdate::AddSpec { spec } = &updates[0] else {
            panic!("first update must add a spec");
        };
        assert_eq!(1, spec.fields().len());
        assert_eq!(Transform::Bucket(5), spec.fields()[0].transform);
        assert_eq!(
            TableUpdate::SetDefaultSpec {
                spec_id: TableMetadataBuilder::LAST_ADDED
            },
            updates[1]
        );
        assert!(requirements.contains(&TableRequirement::DefaultSpecIdMatch { default_spec_id: 0 }));
        assert!(requirements.contains(&TableRequirement::LastAssignedPartitionIdMatch {
            last_assigned_partition_id: 999
        }));
    }

    #[tokio::test]
    async fn test_update_partition_spec_noop() {
        let table = unpartitioned_table();
        let mut action_commit = Arc::new(UpdatePartitionSpecAction::new())
            .commit(&table)
            .await
            .unwrap();
        assert!(action_commit.take_updates().is_empty());
        assert!(action_commit.take_requirements().is_empty());
    }
}
