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

//! In-memory file sink.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::lock::Mutex;

use crate::writer::{CurrentFileStatus, FileAppender, FileSink, FinalizedFile, Record};
use crate::{Error, ErrorKind, Result};

/// Keeps finalized files in memory. Clones share the same files.
#[derive(Debug, Clone)]
pub struct MemoryFileSink {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes_under: Option<String>,
    fail_finalize_under: Option<String>,
}

impl MemoryFileSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            fail_writes_under: None,
            fail_finalize_under: None,
        }
    }

    /// Makes every append to a location containing `fragment` fail.
    pub fn fail_writes_under(mut self, fragment: impl Into<String>) -> Self {
        self.fail_writes_under = Some(fragment.into());
        self
    }

    /// Makes finalizing a location containing `fragment` fail; the file is
    /// discarded.
    pub fn fail_finalize_under(mut self, fragment: impl Into<String>) -> Self {
        self.fail_finalize_under = Some(fragment.into());
        self
    }

    /// Locations of all finalized files, sorted.
    pub async fn locations(&self) -> Vec<String> {
        let mut locations = self.files.lock().await.keys().cloned().collect::<Vec<_>>();
        locations.sort();
        locations
    }

    /// Content of a finalized file.
    pub async fn read(&self, location: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(location).cloned()
    }
}

impl Default for MemoryFileSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSink for MemoryFileSink {
    async fn open(&self, location: &str) -> Result<Box<dyn FileAppender>> {
        let files = self.files.lock().await;
        if files.contains_key(location) {
            return Err(Error::new(
                ErrorKind::FileWriteFailure,
                format!("File {location} already exists"),
            ));
        }
        let matches = |fragment: &Option<String>| {
            fragment
                .as_deref()
                .is_some_and(|fragment| location.contains(fragment))
        };

        Ok(Box::new(MemoryFileAppender {
            files: self.files.clone(),
            location: location.to_string(),
            buffer: vec![],
            record_count: 0,
            fail_writes: matches(&self.fail_writes_under),
            fail_finalize: matches(&self.fail_finalize_under),
        }))
    }
}

struct MemoryFileAppender {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    location: String,
    buffer: Vec<u8>,
    record_count: u64,
    fail_writes: bool,
    fail_finalize: bool,
}

impl CurrentFileStatus for MemoryFileAppender {
    fn current_file_path(&self) -> &str {
        &self.location
    }

    fn current_row_num(&self) -> u64 {
        self.record_count
    }

    fn current_written_size(&self) -> u64 {
        self.buffer.len() as u64
    }
}

#[async_trait]
impl FileAppender for MemoryFileAppender {
    async fn append(&mut self, record: &Record) -> Result<u64> {
        if self.fail_writes {
            return Err(Error::new(ErrorKind::FileWriteFailure, "Injected write failure")
                .with_context("path", self.location.clone()));
        }
        let line = record.to_json_line()?;
        self.buffer.extend_from_slice(&line);
        self.record_count += 1;
        Ok(line.len() as u64)
    }

    async fn finalize(self: Box<Self>) -> Result<FinalizedFile> {
        if self.fail_finalize {
            return Err(
                Error::new(ErrorKind::FileFinalizeFailure, "Injected finalize failure")
                    .with_context("path", self.location),
            );
        }
        let file = FinalizedFile {
            path: self.location.clone(),
            record_count: self.record_count,
            file_size_in_bytes: self.buffer.len() as u64,
        };
        self.files.lock().await.insert(self.location, self.buffer);
        Ok(file)
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::Literal;
    use crate::writer::Operation;

    #[tokio::test]
    async fn test_only_finalized_files_are_visible() {
        let sink = MemoryFileSink::new();
        let record = Record::new(Operation::Insert).with_value(1, Literal::long(1));

        let mut kept = sink.open("memory://t/a.jsonl").await.unwrap();
        kept.append(&record).await.unwrap();
        let mut dropped = sink.open("memory://t/b.jsonl").await.unwrap();
        dropped.append(&record).await.unwrap();

        kept.finalize().await.unwrap();
        dropped.abort().await.unwrap();

        assert_eq!(vec!["memory://t/a.jsonl".to_string()], sink.locations().await);
        assert_eq!(
            b"{\"op\":\"I\",\"values\":{\"1\":1}}\n".to_vec(),
            sink.read("memory://t/a.jsonl").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let sink = MemoryFileSink::new().fail_writes_under("region=eu");
        let record = Record::new(Operation::Insert);

        let mut ok = sink.open("memory://t/region=us/a.jsonl").await.unwrap();
        ok.append(&record).await.unwrap();
        let mut failing = sink.open("memory://t/region=eu/a.jsonl").await.unwrap();
        assert_eq!(
            ErrorKind::FileWriteFailure,
            failing.append(&record).await.unwrap_err().kind()
        );
    }

    #[tokio::test]
    async fn test_injected_finalize_failure_discards_file() {
        let sink = MemoryFileSink::new().fail_finalize_under("region=eu");
        let record = Record::new(Operation::Insert);

        let mut failing = sink.open("memory://t/region=eu/a.jsonl").await.unwrap();
        failing.append(&record).await.unwrap();
        assert_eq!(
            ErrorKind::FileFinalizeFailure,
            failing.finalize().await.unwrap_err().kind()
        );
        assert!(sink.locations().await.is_empty());
    }
}
