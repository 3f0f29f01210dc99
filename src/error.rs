/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the backend format codecs (load/save I/O or parse failure).
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse '{path}' as {format}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
    #[error("failed to serialize tree value as {format}: {message}")]
    Encode { format: &'static str, message: String },
}

/// Errors returned by `Source::open`. A `None`-returning open (per the spec's
/// "open(...) -> Source | absent") is represented as `Ok(None)`; this enum is
/// reserved for cases the core treats as hard failures rather than "absent".
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("no backends registered")]
    BackendMissing,
    #[error(transparent)]
    BackendFailure(#[from] BackendError),
    #[error("absolute path '{0}' cannot be opened as a system-directory source")]
    AbsoluteSystemPath(PathBuf),
}
