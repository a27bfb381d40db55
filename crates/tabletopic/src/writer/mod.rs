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

//! The write path: records are routed to a partition by a
//! [`RecordPartitioner`], then appended to partition-local files opened from
//! a [`FileSink`].
//!
//! The writers are layered:
//! 1. A [`FileAppender`] owns one output file.
//! 2. A [`RollingFileWriter`](file_writer::RollingFileWriter) owns the
//!    appender of one partition and replaces it when the target size is
//!    reached.
//! 3. A [`FanoutWriter`](partitioning::FanoutWriter) keeps one rolling writer
//!    per partition key and collects the finished files of a batch into a
//!    [`FinishedFileManifest`].

pub mod file_writer;
mod manifest;
mod partitioner;
pub mod partitioning;
mod record;

use async_trait::async_trait;
pub use manifest::{FinishedFileManifest, ManifestEntry};
pub use partitioner::SpecPartitioner;
pub use record::{Operation, Record};

use crate::spec::{PartitionSpecRef, Struct};
use crate::Result;

/// Computes the partition key of a record against one partition spec.
pub trait RecordPartitioner: Send + Sync {
    /// The spec keys are computed against.
    fn spec(&self) -> &PartitionSpecRef;

    /// Returns the partition tuple of `record`, one value per spec field.
    fn partition(&self, record: &Record) -> Result<Struct>;
}

/// The current state of an open file.
pub trait CurrentFileStatus {
    /// Get the current file path.
    fn current_file_path(&self) -> &str;
    /// Get the current file row number.
    fn current_row_num(&self) -> u64;
    /// Get the current file written size.
    fn current_written_size(&self) -> u64;
}

/// Opens output files.
#[async_trait]
pub trait FileSink: std::fmt::Debug + Send + Sync {
    /// Opens a new file that becomes visible at `location` once finalized.
    async fn open(&self, location: &str) -> Result<Box<dyn FileAppender>>;
}

/// One open output file.
///
/// A file is either finalized, which publishes it, or aborted, which
/// discards everything written to it. Dropping an appender without doing
/// either discards it too.
#[async_trait]
pub trait FileAppender: CurrentFileStatus + Send {
    /// Appends one record, returning the number of bytes written.
    async fn append(&mut self, record: &Record) -> Result<u64>;

    /// Closes and publishes the file.
    async fn finalize(self: Box<Self>) -> Result<FinalizedFile>;

    /// Closes the file without publishing it.
    async fn abort(self: Box<Self>) -> Result<()>;
}

/// A file that has been finalized by its appender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedFile {
    /// Location the file was published at.
    pub path: String,
    /// Number of records in the file.
    pub record_count: u64,
    /// Size of the file.
    pub file_size_in_bytes: u64,
}
