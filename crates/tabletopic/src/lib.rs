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

//! Partitioning and fanout write engine for table topics.
//!
//! A table topic materializes the change records of a topic partition into
//! an Apache Iceberg style table. This crate owns the part of that path that
//! decides where records land:
//!
//! - [`partition_by`] parses a `partition.by` declaration and builds the
//!   initial partition spec of a table.
//! - [`evolution`] keeps a live table's partition spec in line with the
//!   declaration, committing through a [`catalog::PartitionSpecProvider`]
//!   with optimistic concurrency.
//! - [`writer`] computes partition keys and fans records out to rolling,
//!   partition-local files.
//! - [`engine`] ties these together into batches.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use tabletopic::catalog::{MemoryCatalog, TableIdent};
//! # use tabletopic::engine::TableTopicWriter;
//! # use tabletopic::fencing::{FencingGuard, NoopOpenStreamChecker, StreamOwnership};
//! # use tabletopic::spec::TableTopicConfig;
//! # use tabletopic::writer::file_writer::LocalFileSink;
//! # use tabletopic::writer::Record;
//! # async fn run(catalog: Arc<MemoryCatalog>, records: Vec<Record>) -> tabletopic::Result<()> {
//! let mut writer = TableTopicWriter::new(
//!     catalog,
//!     TableIdent::from_strs(["clicks"])?,
//!     TableTopicConfig::default(),
//!     Arc::new(LocalFileSink::new()),
//!     FencingGuard::new(
//!         Arc::new(NoopOpenStreamChecker),
//!         StreamOwnership::new(uuid::Uuid::nil(), 0, 1, 1),
//!     ),
//! );
//! let mut batch = writer.start_batch().await?;
//! for record in &records {
//!     batch.write(record).await?;
//! }
//! let manifest = batch.finish().await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

mod error;
pub use error::{Error, ErrorKind, Result};

pub mod catalog;
pub use catalog::{
    PartitionSpecProvider, TableCommit, TableCreation, TableIdent, TableRequirement, TableUpdate,
};

pub mod table;

pub mod spec;
pub mod transaction;
pub mod transform;

pub mod engine;
pub mod evolution;
pub mod fencing;
pub mod partition_by;
pub mod writer;
