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

//! Stream ownership checks run before a new output file is opened.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{Error, ErrorKind, Result};

/// Asks the surrounding broker whether this writer still owns the output
/// stream it is about to open.
#[async_trait]
pub trait OpenStreamChecker: Debug + Send + Sync {
    /// Returns `Ok(false)` when the writer has been fenced and must stop
    /// producing files.
    async fn check(&self, topic_id: Uuid, partition: i32, stream_id: i64, epoch: i64)
        -> Result<bool>;
}

/// A checker that allows every open.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOpenStreamChecker;

#[async_trait]
impl OpenStreamChecker for NoopOpenStreamChecker {
    async fn check(&self, _: Uuid, _: i32, _: i64, _: i64) -> Result<bool> {
        Ok(true)
    }
}

/// Identity of the output stream a writer claims to own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamOwnership {
    /// Topic the records come from.
    pub topic_id: Uuid,
    /// Topic partition assigned to this writer.
    pub partition: i32,
    /// Output stream backing the partition.
    pub stream_id: i64,
    /// Leadership epoch the writer was started with.
    pub epoch: i64,
}

impl StreamOwnership {
    /// Creates a new ownership claim.
    pub fn new(topic_id: Uuid, partition: i32, stream_id: i64, epoch: i64) -> Self {
        Self {
            topic_id,
            partition,
            stream_id,
            epoch,
        }
    }
}

/// Pairs a checker with the ownership claim it validates.
#[derive(Debug, Clone)]
pub struct FencingGuard {
    checker: Arc<dyn OpenStreamChecker>,
    ownership: StreamOwnership,
}

impl FencingGuard {
    /// Creates a guard for `ownership`.
    pub fn new(checker: Arc<dyn OpenStreamChecker>, ownership: StreamOwnership) -> Self {
        Self { checker, ownership }
    }

    /// The claim this guard validates.
    pub fn ownership(&self) -> &StreamOwnership {
        &self.ownership
    }

    /// Fails with [`ErrorKind::FencingRejected`] unless the claim still holds.
    ///
    /// Errors raised by the checker itself are propagated unchanged.
    pub async fn ensure_open_allowed(&self) -> Result<()> {
        let StreamOwnership {
            topic_id,
            partition,
            stream_id,
            epoch,
        } = self.ownership;
        if self
            .checker
            .check(topic_id, partition, stream_id, epoch)
            .await?
        {
            return Ok(());
        }
        Err(
            Error::new(ErrorKind::FencingRejected, "Writer no longer owns the output stream")
                .with_context("topic_id", topic_id.to_string())
                .with_context("partition", partition.to_string())
                .with_context("stream_id", stream_id.to_string())
                .with_context("epoch", epoch.to_string()),
        )
    }
}
