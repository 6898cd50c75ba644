// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Error types for the reconciliation pipeline.
//!
//! Only [`PipelineError`] ever reaches the caller of a batch. Extraction
//! service faults ([`ServiceError`]) are converted into rejections at the
//! unit boundary and never abort a batch.

use thiserror::Error;

/// Batch-level errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A submitted document could not be parsed as a paginated PDF.
    #[error("malformed document '{filename}': {reason}")]
    MalformedDocument { filename: String, reason: String },

    /// The stamped bundle could not be assembled.
    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// The exception report could not be rendered.
    #[error("render error: {0}")]
    Render(String),

    /// The ledger file could not be written.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// An artifact could not be persisted.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-level failures of the extraction service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No response within the configured timeout
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Non-success HTTP status
    #[error("service returned status {status}")]
    Status { status: u16, body: String },

    /// Connection or protocol failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Success status but no text payload
    #[error("empty response")]
    EmptyResponse,
}

/// Extraction work queue errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// A unit slot was completed twice
    #[error("unit {0} already completed")]
    DuplicateUnit(usize),
}
