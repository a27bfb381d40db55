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

use tracing::{debug, warn};

use super::location_generator::{
    DefaultFileNameGenerator, DefaultLocationGenerator, FileNameGenerator, LocationGenerator,
};
use crate::fencing::FencingGuard;
use crate::writer::{FileAppender, FileSink, FinalizedFile, Record};
use crate::{Error, ErrorKind, Result};

/// Builder for [`RollingFileWriter`].
#[derive(Clone, Debug)]
pub struct RollingFileWriterBuilder<
    L: LocationGenerator = DefaultLocationGenerator,
    F: FileNameGenerator = DefaultFileNameGenerator,
> {
    sink: Arc<dyn FileSink>,
    location_generator: L,
    file_name_generator: F,
    fencing: FencingGuard,
    target_file_size: u64,
}

impl<L: LocationGenerator, F: FileNameGenerator> RollingFileWriterBuilder<L, F> {
    /// Creates a new `RollingFileWriterBuilder`.
    ///
    /// # Arguments
    ///
    /// * `sink` - Opens the underlying files
    /// * `location_generator` - Places files under their partition directory
    /// * `file_name_generator` - Names each new file
    /// * `fencing` - Checked before every file is opened
    /// * `target_file_size` - Size in bytes after which a file is finalized
    pub fn new(
        sink: Arc<dyn FileSink>,
        location_generator: L,
        file_name_generator: F,
        fencing: FencingGuard,
        target_file_size: u64,
    ) -> Self {
        Self {
            sink,
            location_generator,
            file_name_generator,
            fencing,
            target_file_size,
        }
    }

    /// Size in bytes after which a file is finalized.
    pub fn target_file_size(&self) -> u64 {
        self.target_file_size
    }

    /// Builds a writer whose files go under `partition_path`.
    pub fn build(&self, partition_path: impl Into<String>) -> RollingFileWriter<L, F> {
        RollingFileWriter {
            inner: None,
            builder: self.clone(),
            partition_path: partition_path.into(),
        }
    }
}

/// Writes the records of one partition, replacing its file with a new one
/// each time the current file reaches the target size.
///
/// A file is finalized before the next one is opened, so concatenating the
/// files in finalize order gives the records in write order.
pub struct RollingFileWriter<
    L: LocationGenerator = DefaultLocationGenerator,
    F: FileNameGenerator = DefaultFileNameGenerator,
> {
    inner: Option<Box<dyn FileAppender>>,
    builder: RollingFileWriterBuilder<L, F>,
    partition_path: String,
}

impl<L: LocationGenerator, F: FileNameGenerator> RollingFileWriter<L, F> {
    async fn open(&self) -> Result<Box<dyn FileAppender>> {
        self.builder.fencing.ensure_open_allowed().await?;

        let location = self.builder.location_generator.generate_location(
            &self.partition_path,
            &self.builder.file_name_generator.generate_file_name(),
        );
        debug!(%location, partition = %self.partition_path, "opening data file");
        self.builder.sink.open(&location).await
    }

    /// Whether a file is currently open.
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Determines if the current file has reached the target size.
    pub fn should_roll(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|w| w.current_written_size() >= self.builder.target_file_size)
    }

    /// Appends `record`, opening a file first if none is open.
    ///
    /// Returns the finalized file when this record made the current file
    /// reach the target size. On failure the current file is discarded.
    pub async fn write(&mut self, record: &Record) -> Result<Option<FinalizedFile>> {
        if self.inner.is_none() {
            self.inner = Some(self.open().await?);
        }

        let Some(writer) = self.inner.as_mut() else {
            return Err(Error::new(
                ErrorKind::Unexpected,
                "Writer is not initialized!",
            ));
        };
        if let Err(e) = writer.append(record).await {
            self.discard_current().await;
            return Err(e);
        }

        if self.should_roll() {
            if let Some(writer) = self.inner.take() {
                debug!(
                    location = writer.current_file_path(),
                    bytes = writer.current_written_size(),
                    "rolling data file"
                );
                return writer.finalize().await.map(Some);
            }
        }
        Ok(None)
    }

    /// Finalizes the current file, if any.
    pub async fn close(mut self) -> Result<Option<FinalizedFile>> {
        match self.inner.take() {
            Some(writer) => writer.finalize().await.map(Some),
            None => Ok(None),
        }
    }

    /// Discards the current file, if any.
    pub async fn abort(mut self) -> Result<()> {
        match self.inner.take() {
            Some(writer) => writer.abort().await,
            None => Ok(()),
        }
    }

    async fn discard_current(&mut self) {
        if let Some(writer) = self.inner.take() {
            let location = writer.current_file_path().to_string();
            if let Err(e) = writer.abort().await {
                warn!(%location, error = %e, "failed to discard data file");
            }
        }
    }
}
