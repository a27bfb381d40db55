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

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};

use itertools::Itertools;

/// Shorthand for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// ErrorKind is all kinds of Error of the table topic write path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A `bucket` or `truncate` declaration is missing its width, or the width
    /// is not a positive integer.
    MalformedTransformArgs,

    /// The transform name in a partition-by token is not recognized.
    UnsupportedTransform,

    /// A declared source column does not exist in the table schema when
    /// building an initial partition spec.
    UnknownSourceField,

    /// A partition spec commit lost against a concurrent writer.
    ///
    /// Errors of this kind are created retryable; the evolver re-reads the
    /// table and recomputes its diff before trying again.
    SpecCommitConflict,

    /// Appending to an open data file failed. The file is discarded.
    FileWriteFailure,

    /// Closing or finalizing a data file failed. The file is discarded.
    FileFinalizeFailure,

    /// The stream ownership check refused to let this writer open a file.
    FencingRejected,

    /// Data or metadata handed to the engine is invalid.
    DataInvalid,

    /// The operation was rejected because the system is not in a state required for the operation’s execution.
    PreconditionFailed,

    /// Feature is not supported.
    FeatureUnsupported,

    /// Table does not exist.
    TableNotFound,

    /// Table already exists at creation.
    TableAlreadyExists,

    /// Anything not covered above; surfaced as is.
    Unexpected,
}

impl ErrorKind {
    /// Name of the kind, as it appears in rendered errors.
    pub fn into_static(self) -> &'static str {
        self.into()
    }
}

impl From<ErrorKind> for &'static str {
    fn from(kind: ErrorKind) -> &'static str {
        use ErrorKind::*;
        match kind {
            MalformedTransformArgs => "MalformedTransformArgs",
            UnsupportedTransform => "UnsupportedTransform",
            UnknownSourceField => "UnknownSourceField",
            SpecCommitConflict => "SpecCommitConflict",
            FileWriteFailure => "FileWriteFailure",
            FileFinalizeFailure => "FileFinalizeFailure",
            FencingRejected => "FencingRejected",
            DataInvalid => "DataInvalid",
            PreconditionFailed => "PreconditionFailed",
            FeatureUnsupported => "FeatureUnsupported",
            TableNotFound => "TableNotFound",
            TableAlreadyExists => "TableAlreadyExists",
            Unexpected => "Unexpected",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.into_static())
    }
}

/// Error returned by every fallible operation of the write path.
///
/// `Display` renders a single line suitable for log fields:
///
/// ```shell
/// FileWriteFailure, context: { path: /table/data/a.jsonl } => failed to append record, source: disk full
/// ```
///
/// `Debug` spreads the same information over several lines and appends the
/// backtrace when one was captured. `{:#?}` falls back to the derived struct
/// layout.
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
    backtrace: Backtrace,
    retryable: bool,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.context.is_empty() {
            let pairs = self
                .context
                .iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .join(", ");
            write!(f, ", context: {{ {pairs} }}")?;
        }
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        match &self.source {
            Some(source) => write!(f, ", source: {source}"),
            None => Ok(()),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("Error")
                .field("kind", &self.kind)
                .field("message", &self.message)
                .field("context", &self.context)
                .field("source", &self.source)
                .field("backtrace", &self.backtrace)
                .field("retryable", &self.retryable)
                .finish();
        }

        if self.message.is_empty() {
            writeln!(f, "{}", self.kind)?;
        } else {
            writeln!(f, "{} => {}", self.kind, self.message)?;
        }
        if !self.context.is_empty() {
            writeln!(f, "\nContext:")?;
            for (key, value) in &self.context {
                writeln!(f, "   {key}: {value}")?;
            }
        }
        if let Some(source) = &self.source {
            writeln!(f, "\nSource: {source:#}")?;
        }
        if let BacktraceStatus::Captured = self.backtrace.status() {
            writeln!(f, "\nBacktrace:\n{}", self.backtrace)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|source| source.as_ref())
    }
}

impl Error {
    /// Builds an error of `kind`.
    ///
    /// Spec commit conflicts start out retryable so the evolution retry loop
    /// picks them up; every other kind starts out terminal.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            source: None,
            // No-op unless RUST_BACKTRACE / RUST_LIB_BACKTRACE is set.
            backtrace: Backtrace::capture(),
            retryable: kind == ErrorKind::SpecCommitConflict,
        }
    }

    /// Overrides whether callers may retry the failed operation.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attaches a `key: value` pair, e.g. the table or file the failure concerns.
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Records the underlying cause. Setting it twice is a bug.
    pub fn with_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "error source already set");
        self.source = Some(src.into());
        self
    }

    #[cfg(test)]
    fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = backtrace;
        self
    }

    /// Backtrace captured at construction; empty when capture is disabled.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// What went wrong.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether repeating the operation may succeed.
    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// Human readable description, without context or source.
    pub fn message(&self) -> &str {
        &self.message
    }
}

macro_rules! define_from_err {
    ($source: path, $error_kind: path, $msg: expr) => {
        impl From<$source> for crate::error::Error {
            fn from(v: $source) -> Self {
                Self::new($error_kind, $msg).with_source(v)
            }
        }
    };
}

define_from_err!(
    std::num::ParseIntError,
    ErrorKind::DataInvalid,
    "invalid integer literal"
);
define_from_err!(
    std::num::TryFromIntError,
    ErrorKind::DataInvalid,
    "integer out of range"
);
define_from_err!(
    serde_json::Error,
    ErrorKind::DataInvalid,
    "malformed json"
);
define_from_err!(std::io::Error, ErrorKind::Unexpected, "io failure");

/// Returns a [`ErrorKind::DataInvalid`] error from the enclosing function
/// unless `$cond` holds.
///
/// ```ignore
/// ensure_data_valid!(width > 0, "bucket width must be positive, got {}", width);
/// ```
#[macro_export]
macro_rules! ensure_data_valid {
    ($cond: expr, $fmt: literal, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::error::Error::new($crate::error::ErrorKind::DataInvalid, format!($fmt, $($arg)*)))
        }
    };
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;

    use super::*;

    fn generate_error_with_backtrace_disabled() -> Error {
        Error::new(ErrorKind::FileWriteFailure, "failed to append record")
            .with_context("path", "/table/data/a.jsonl")
            .with_context("partition", "[1]")
            .with_source(anyhow!("disk full"))
            .with_backtrace(Backtrace::disabled())
    }

    #[test]
    fn test_error_display_without_backtrace() {
        let s = format!("{}", generate_error_with_backtrace_disabled());
        assert_eq!(
            s,
            r#"FileWriteFailure, context: { path: /table/data/a.jsonl, partition: [1] } => failed to append record, source: disk full"#
        )
    }

    #[test]
    fn test_error_debug_without_backtrace() {
        let s = format!("{:?}", generate_error_with_backtrace_disabled());
        assert_eq!(
            s,
            r#"FileWriteFailure => failed to append record

Context:
   path: /table/data/a.jsonl
   partition: [1]

Source: disk full
"#
        )
    }

    #[test]
    fn test_commit_conflict_is_retryable() {
        let conflict = Error::new(ErrorKind::SpecCommitConflict, "default spec id changed");
        assert!(conflict.retryable());

        let fenced = Error::new(ErrorKind::FencingRejected, "stream fenced");
        assert!(!fenced.retryable());
        assert!(fenced.with_retryable(true).retryable());
    }
}
