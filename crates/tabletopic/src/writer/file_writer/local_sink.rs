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

//! Json-lines files on the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::writer::{CurrentFileStatus, FileAppender, FileSink, FinalizedFile, Record};
use crate::{Error, ErrorKind, Result};

const IN_PROGRESS_SUFFIX: &str = ".inprogress";

/// Writes json-lines files to the local filesystem.
///
/// Locations are filesystem paths, optionally prefixed with `file://`; any
/// other scheme is rejected with [`ErrorKind::FeatureUnsupported`].
/// Records go to `<path>.inprogress` until the file is finalized, when it is
/// renamed to `<path>`.
#[derive(Debug, Default, Clone)]
pub struct LocalFileSink;

impl LocalFileSink {
    /// Creates a new sink.
    pub fn new() -> Self {
        Self
    }
}

fn write_failure(message: &str, path: &Path, source: std::io::Error) -> Error {
    Error::new(ErrorKind::FileWriteFailure, message)
        .with_context("path", path.display().to_string())
        .with_source(source)
}

fn remove_in_progress(path: &Path, result: std::io::Result<()>) {
    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), error = %e, "failed to remove unfinished data file");
        }
        _ => {}
    }
}

fn finalize_failure(message: &str, path: &Path, source: std::io::Error) -> Error {
    Error::new(ErrorKind::FileFinalizeFailure, message)
        .with_context("path", path.display().to_string())
        .with_source(source)
}

#[async_trait]
impl FileSink for LocalFileSink {
    async fn open(&self, location: &str) -> Result<Box<dyn FileAppender>> {
        let path = match location.strip_prefix("file://") {
            Some(path) => path,
            None if location.contains("://") => {
                return Err(Error::new(
                    ErrorKind::FeatureUnsupported,
                    "Local file sink only writes file:// locations",
                )
                .with_context("location", location));
            }
            None => location,
        };
        let final_path = PathBuf::from(path);
        let mut in_progress = final_path.clone().into_os_string();
        in_progress.push(IN_PROGRESS_SUFFIX);
        let in_progress = PathBuf::from(in_progress);

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failure("Failed to create data directory", parent, e))?;
        }
        let file = File::create(&in_progress)
            .await
            .map_err(|e| write_failure("Failed to create data file", &in_progress, e))?;
        debug!(path = %in_progress.display(), "opened data file");

        Ok(Box::new(LocalFileAppender {
            location: location.to_string(),
            final_path,
            in_progress,
            writer: Some(BufWriter::new(file)),
            record_count: 0,
            written_size: 0,
        }))
    }
}

struct LocalFileAppender {
    location: String,
    final_path: PathBuf,
    in_progress: PathBuf,
    // `None` once the file was finalized or aborted.
    writer: Option<BufWriter<File>>,
    record_count: u64,
    written_size: u64,
}

impl LocalFileAppender {
    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or_else(|| {
            Error::new(ErrorKind::Unexpected, "Data file is already closed")
                .with_context("path", self.location.clone())
        })
    }
}

impl CurrentFileStatus for LocalFileAppender {
    fn current_file_path(&self) -> &str {
        &self.location
    }

    fn current_row_num(&self) -> u64 {
        self.record_count
    }

    fn current_written_size(&self) -> u64 {
        self.written_size
    }
}

#[async_trait]
impl FileAppender for LocalFileAppender {
    async fn append(&mut self, record: &Record) -> Result<u64> {
        let line = record.to_json_line()?;
        let in_progress = self.in_progress.clone();
        self.writer()?
            .write_all(&line)
            .await
            .map_err(|e| write_failure("Failed to append record", &in_progress, e))?;
        self.record_count += 1;
        self.written_size += line.len() as u64;
        Ok(line.len() as u64)
    }

    async fn finalize(mut self: Box<Self>) -> Result<FinalizedFile> {
        let mut writer = self.writer.take().ok_or_else(|| {
            Error::new(ErrorKind::Unexpected, "Data file is already closed")
                .with_context("path", self.location.clone())
        })?;

        let closed = async {
            writer.flush().await?;
            writer.get_mut().sync_all().await?;
            drop(writer);
            fs::rename(&self.in_progress, &self.final_path).await
        }
        .await;
        if let Err(e) = closed {
            remove_in_progress(&self.in_progress, fs::remove_file(&self.in_progress).await);
            return Err(finalize_failure(
                "Failed to finalize data file",
                &self.final_path,
                e,
            ));
        }

        debug!(
            path = %self.final_path.display(),
            records = self.record_count,
            bytes = self.written_size,
            "finalized data file"
        );
        Ok(FinalizedFile {
            path: self.location.clone(),
            record_count: self.record_count,
            file_size_in_bytes: self.written_size,
        })
    }

    async fn abort(mut self: Box<Self>) -> Result<()> {
        drop(self.writer.take());
        match fs::remove_file(&self.in_progress).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(write_failure("Failed to discard data file", &self.in_progress, e)),
        }
        debug!(path = %self.in_progress.display(), "discarded data file");
        Ok(())
    }
}

impl Drop for LocalFileAppender {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            remove_in_progress(&self.in_progress, std::fs::remove_file(&self.in_progress));
        }
    }
}
