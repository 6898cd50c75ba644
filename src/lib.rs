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

//! # Ticket Ledger
//!
//! This library turns batches of scanned expense receipts into balanced
//! double-entry ledger records.
//!
//! ## Core Components
//!
//! - [`segmenter`]: splits multi-page submissions into one unit per page
//! - [`ExtractionAdapter`]: asks an [`ExtractionService`] for entry proposals
//! - [`entry::normalize`]: numbers accepted units `T1`, `T2`, ... and cleans their lines
//! - [`BalanceReconciler`]: enforces debit = credit, repairing the bank leg
//! - [`ExceptionLog`]: rejections and alerts in processing order
//! - [`artifact`]: ledger import file, stamped bundle and exception report
//! - [`Pipeline`]: the batch controller returning a [`BatchResult`]
//!
//! ## Example
//!
//! ```
//! use ticket_ledger::{AccountCode, BalanceReconciler, EntryCandidate, Reference};
//! use ticket_ledger::entry::normalize;
//! use rust_decimal_macros::dec;
//!
//! let candidates = vec![
//!     EntryCandidate {
//!         account: "6251".into(),
//!         debit: Some(dec!(25.00)),
//!         ..Default::default()
//!     },
//!     EntryCandidate {
//!         account: "512".into(),
//!         credit: Some(dec!(20.00)),
//!         ..Default::default()
//!     },
//! ];
//! let mut group = normalize(candidates, Reference(1), "toll.pdf", "FCB");
//!
//! let reconciler = BalanceReconciler::new(AccountCode::normalized("512"));
//! let alert = reconciler.reconcile(&mut group);
//!
//! assert!(alert.is_some());
//! assert_eq!(group.total_credit(), dec!(25.00));
//! ```

pub mod alert;
pub mod anthropic;
pub mod artifact;
mod base;
pub mod config;
mod document;
pub mod entry;
pub mod error;
pub mod extraction;
pub mod instructions;
pub mod pdf;
pub mod pipeline;
pub mod reconcile;
pub mod segmenter;
pub mod unit_queue;

pub use alert::{Alert, ExceptionLog, Rejection, RejectionReason};
pub use anthropic::AnthropicClient;
pub use artifact::{Artifact, ArtifactKind, ArtifactLocation, ArtifactSink, DirectorySink, MemorySink};
pub use base::{AccountCode, Reference, ReferenceCounter};
pub use config::{PipelineConfig, ServiceConfig};
pub use document::{DocumentUnit, SubmittedDocument, UnitOrigin, page_filename};
pub use entry::{EntryCandidate, EntryGroup, LedgerEntry};
pub use error::{PipelineError, QueueError, ServiceError};
pub use extraction::{
    ExtractionAdapter, ExtractionProposal, ExtractionRequest, ExtractionService, Extractor,
};
pub use pipeline::{BatchResult, OutputFiles, Pipeline, PipelineState, Summary, UnitDetail};
pub use reconcile::BalanceReconciler;
pub use unit_queue::ExtractionQueue;
