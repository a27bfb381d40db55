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

//! Optimistic metadata changes to a topic's table.
//!
//! A transaction is committed optimistically: each attempt reloads the table,
//! lets every action recompute its updates against it, and hands the
//! resulting [`TableCommit`] to the provider. Attempts that fail with a
//! retryable error are retried with exponential backoff.

mod action;
mod update_partition_spec;

use action::BoxedTransactionAction;
pub use action::*;
use backon::{ExponentialBuilder, RetryableWithContext};
pub use update_partition_spec::UpdatePartitionSpecAction;

use crate::catalog::{PartitionSpecProvider, TableCommit, TableRequirement, TableUpdate};
use crate::error::Result;
use crate::table::Table;

/// Ordered set of actions committed together against one table.
#[derive(Clone)]
pub struct Transaction {
    table: Table,
    actions: Vec<BoxedTransactionAction>,
}

impl Transaction {
    /// Transaction planned against `table`; the table is reloaded on commit.
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            actions: vec![],
        }
    }

    /// Creates an action that moves the default partition spec to the
    /// declared descriptors.
    pub fn update_partition_spec(&self) -> UpdatePartitionSpecAction {
        UpdatePartitionSpecAction::new()
    }

    /// Commits every action, retrying conflicts with `backoff`.
    ///
    /// Returns the table as committed, or as last loaded if no action had
    /// anything to change.
    pub async fn commit(
        self,
        provider: &dyn PartitionSpecProvider,
        backoff: ExponentialBuilder,
    ) -> Result<Table> {
        if self.actions.is_empty() {
            return Ok(self.table);
        }

        let tx = self;

        (|mut tx: Transaction| async {
            let result = tx.do_commit(provider).await;
            (tx, result)
        })
        .retry(backoff)
        .sleep(tokio::time::sleep)
        .context(tx)
        .when(|e| e.retryable())
        .await
        .1
    }

    /// One optimistic attempt: plan every action against a fresh load and
    /// submit whatever they produced as a single guarded commit.
    async fn do_commit(&mut self, provider: &dyn PartitionSpecProvider) -> Result<Table> {
        self.table = provider.load_table(self.table.identifier()).await?;

        // Later actions plan against the effect of earlier ones.
        let mut staged = self.table.clone();
        let mut updates: Vec<TableUpdate> = Vec::new();
        let mut requirements: Vec<TableRequirement> = Vec::new();

        for action in &self.actions {
            let mut planned = action.clone().commit(&staged).await?;
            let action_updates = planned.take_updates();
            if action_updates.is_empty() {
                continue;
            }
            let action_requirements = planned.take_requirements();

            staged = TableCommit::builder()
                .ident(staged.identifier().clone())
                .requirements(action_requirements.clone())
                .updates(action_updates.clone())
                .build()
                .apply(staged)?;
            updates.extend(action_updates);
            requirements.extend(action_requirements);
        }

        if updates.is_empty() {
            return Ok(self.table.clone());
        }

        let commit = TableCommit::builder()
            .ident(self.table.identifier().clone())
            .updates(updates)
            .requirements(requirements)
            .build();
        provider.update_table(commit).await
    }
}
