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

//! This module provides the `FanoutWriter` implementation.

use std::collections::HashMap;
use std::mem::take;

use tracing::{debug, error, warn};

use crate::spec::{PartitionSpecRef, Struct};
use crate::writer::file_writer::location_generator::{
    DefaultFileNameGenerator, DefaultLocationGenerator, FileNameGenerator, LocationGenerator,
};
use crate::writer::file_writer::{RollingFileWriter, RollingFileWriterBuilder};
use crate::writer::{FinalizedFile, FinishedFileManifest, ManifestEntry, Record, RecordPartitioner};
use crate::{Error, ErrorKind, Result};

/// A writer that keeps one rolling file writer open per partition key, so
/// records can arrive in any partition order.
///
/// All keys are computed against the partition spec of the partitioner the
/// writer was created with; a spec change only takes effect in a new writer.
///
/// The first error returned by [`FanoutWriter::write`] discards every open
/// file and leaves the writer unusable: later writes and
/// [`FanoutWriter::finish`] fail with [`ErrorKind::PreconditionFailed`].
pub struct FanoutWriter<
    L: LocationGenerator = DefaultLocationGenerator,
    F: FileNameGenerator = DefaultFileNameGenerator,
> {
    partitioner: Box<dyn RecordPartitioner>,
    builder: RollingFileWriterBuilder<L, F>,
    // In order of first appearance of each key.
    writers: Vec<(Struct, RollingFileWriter<L, F>)>,
    index: HashMap<Struct, usize>,
    manifest: FinishedFileManifest,
    failed: bool,
}

impl<L: LocationGenerator, F: FileNameGenerator> FanoutWriter<L, F> {
    /// Create a new `FanoutWriter`.
    pub fn new(
        partitioner: Box<dyn RecordPartitioner>,
        builder: RollingFileWriterBuilder<L, F>,
    ) -> Self {
        Self {
            partitioner,
            builder,
            writers: vec![],
            index: HashMap::new(),
            manifest: FinishedFileManifest::default(),
            failed: false,
        }
    }

    /// The partition spec records are routed by.
    pub fn spec(&self) -> &PartitionSpecRef {
        self.partitioner.spec()
    }

    /// Number of partitions that currently have an open file.
    pub fn open_partitions(&self) -> usize {
        self.writers.iter().filter(|(_, w)| w.is_open()).count()
    }

    /// Routes `record` to the file of its partition.
    pub async fn write(&mut self, record: &Record) -> Result<()> {
        self.ensure_usable()?;
        match self.write_inner(record).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fail(&e).await;
                Err(e)
            }
        }
    }

    async fn write_inner(&mut self, record: &Record) -> Result<()> {
        let partition = self.partitioner.partition(record)?;
        let idx = match self.index.get(&partition) {
            Some(idx) => *idx,
            None => {
                let path = self.partitioner.spec().partition_to_path(&partition);
                self.writers
                    .push((partition.clone(), self.builder.build(path)));
                self.index.insert(partition, self.writers.len() - 1);
                self.writers.len() - 1
            }
        };

        let spec_id = self.partitioner.spec().spec_id();
        let (partition, writer) = &mut self.writers[idx];
        if let Some(file) = writer.write(record).await? {
            self.manifest.push(entry(partition.clone(), spec_id, file));
        }
        Ok(())
    }

    /// Finalizes every open file and returns the files written by this
    /// writer, in the order they were finalized.
    ///
    /// If a file fails to finalize, the files not yet finalized are
    /// discarded and the error is returned.
    pub async fn finish(mut self) -> Result<FinishedFileManifest> {
        self.ensure_usable()?;

        let spec_id = self.partitioner.spec().spec_id();
        let mut writers = take(&mut self.writers).into_iter();
        while let Some((partition, writer)) = writers.next() {
            match writer.close().await {
                Ok(Some(file)) => self.manifest.push(entry(partition, spec_id, file)),
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "failed to finalize data file, aborting batch");
                    for (_, writer) in writers {
                        discard(writer).await;
                    }
                    return Err(e);
                }
            }
        }

        debug!(
            files = self.manifest.len(),
            records = self.manifest.total_record_count(),
            spec_id,
            "finished batch"
        );
        Ok(take(&mut self.manifest))
    }

    /// Discards every open file. Files already finalized by a rollover are
    /// left in place but never reported.
    pub async fn abort(mut self) -> Result<()> {
        let mut result = Ok(());
        for (_, writer) in take(&mut self.writers) {
            if let Err(e) = writer.abort().await {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.failed {
            return Err(Error::new(
                ErrorKind::PreconditionFailed,
                "Writer was aborted by an earlier failure",
            ));
        }
        Ok(())
    }

    async fn fail(&mut self, cause: &Error) {
        error!(error = %cause, "write failed, aborting batch");
        self.failed = true;
        self.index.clear();
        for (_, writer) in take(&mut self.writers) {
            discard(writer).await;
        }
    }
}

fn entry(partition: Struct, spec_id: i32, file: FinalizedFile) -> ManifestEntry {
    ManifestEntry {
        path: file.path,
        partition,
        spec_id,
        record_count: file.record_count,
        file_size_in_bytes: file.file_size_in_bytes,
    }
}

async fn discard<L: LocationGenerator, F: FileNameGenerator>(writer: RollingFileWriter<L, F>) {
    if let Err(e) = writer.abort().await {
        warn!(error = %e, "failed to discard data file");
    }
}
