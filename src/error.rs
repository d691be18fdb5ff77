// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Error taxonomy shared by the registry, dispatcher and I/O layers.
// Author: Lukas Bower

//! Errors surfaced by registry and region operations.

/// Failure modes reported by metalcore entry points.
///
/// Every entry point validates its inputs before touching shared state, so an
/// error always means nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A record is not registered with this registry, is already registered,
    /// or an argument is otherwise unusable.
    #[error("invalid argument")]
    InvalidArgument,
    /// The event or task table has no free identifier left.
    #[error("registry table exhausted")]
    ResourceExhausted,
    /// The requested offset lies beyond the end of the region.
    #[error("offset beyond region bounds")]
    OutOfRange,
    /// The region's operation table does not provide the requested operation.
    #[error("operation not supported by region")]
    Unsupported,
    /// A poll loop gave up before its condition became ready.
    #[error("timed out waiting for poll condition")]
    Timeout,
}

impl Error {
    /// Negative errno equivalent, for callers that speak status codes.
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument => -22,
            Self::ResourceExhausted => -11,
            Self::OutOfRange => -34,
            Self::Unsupported => -95,
            Self::Timeout => -62,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Collapse a transfer result into "length or negative status".
#[must_use]
pub fn transfer_status(result: Result<usize>) -> isize {
    match result {
        Ok(len) => isize::try_from(len).unwrap_or(isize::MAX),
        Err(err) => err.errno() as isize,
    }
}
