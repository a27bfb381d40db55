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

use std::mem::take;
use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::{TableRequirement, TableUpdate};
use crate::table::Table;
use crate::transaction::Transaction;
use crate::Result;

pub(crate) type BoxedTransactionAction = Arc<dyn TransactionAction>;

/// One metadata change staged in a [`Transaction`].
///
/// An action is re-run on every commit attempt, against the table as
/// reloaded for that attempt, so a change computed from stale metadata is
/// never committed.
#[async_trait]
pub(crate) trait TransactionAction: Sync + Send {
    /// Computes the updates this action makes to `table`, plus the
    /// requirements that must still hold when they are committed.
    async fn commit(self: Arc<Self>, table: &Table) -> Result<ActionCommit>;
}

/// Stages an action in a transaction.
pub trait ApplyTransactionAction {
    /// Adds this action to `tx`.
    fn apply(self, tx: Transaction) -> Result<Transaction>;
}

impl<T: TransactionAction + 'static> ApplyTransactionAction for T {
    fn apply(self, mut tx: Transaction) -> Result<Transaction> {
        tx.actions.push(Arc::new(self));
        Ok(tx)
    }
}

/// Updates and requirements produced by one action for one commit attempt.
///
/// An action with nothing to change returns an empty commit.
#[derive(Debug, Default)]
pub struct ActionCommit {
    updates: Vec<TableUpdate>,
    requirements: Vec<TableRequirement>,
}

impl ActionCommit {
    /// Creates an action commit.
    pub fn new(updates: Vec<TableUpdate>, requirements: Vec<TableRequirement>) -> Self {
        Self {
            updates,
            requirements,
        }
    }

    /// Takes the updates, leaving none behind.
    pub fn take_updates(&mut self) -> Vec<TableUpdate> {
        take(&mut self.updates)
    }

    /// Takes the requirements, leaving none behind.
    pub fn take_requirements(&mut self) -> Vec<TableRequirement> {
        take(&mut self.requirements)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_take_leaves_action_commit_empty() {
        let updates = vec![TableUpdate::SetDefaultSpec { spec_id: 3 }];
        let requirements = vec![TableRequirement::DefaultSpecIdMatch { default_spec_id: 2 }];
        let mut staged = ActionCommit::new(updates.clone(), requirements.clone());

        assert_eq!(updates, staged.take_updates());
        assert_eq!(requirements, staged.take_requirements());
        assert!(staged.take_updates().is_empty());
        assert!(staged.take_requirements().is_empty());
    }
}
