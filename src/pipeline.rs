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

//! Batch controller.
//!
//! The [`Pipeline`] drives one batch through segmentation, extraction,
//! numbering, reconciliation and assembly, and returns a [`BatchResult`].
//!
//! # States
//!
//! `Idle -> Segmenting -> ProcessingUnits -> Assembling -> Done`
//!
//! A malformed submission moves the pipeline from `Segmenting` to `Failed`
//! and aborts the batch. Failures of a single unit never leave
//! `ProcessingUnits`: they become rejections or alerts. An artifact that
//! cannot be built or stored moves `Assembling` to `Failed`, after the
//! artifacts already stored for the run have been discarded.

use crate::alert::{Alert, ExceptionLog, RejectionReason};
use crate::artifact::{self, ArtifactKind, ArtifactLocation, ArtifactSink, AssemblyInput};
use crate::base::{Reference, ReferenceCounter};
use crate::config::PipelineConfig;
use crate::document::{DocumentUnit, SubmittedDocument};
use crate::entry::{EntryCandidate, LedgerEntry, money, normalize};
use crate::error::PipelineError;
use crate::extraction::{ExtractionProposal, Extractor};
use crate::pdf;
use crate::reconcile::{BalanceReconciler, control_passes};
use crate::segmenter;
use crate::unit_queue;
use chrono::{Local, NaiveDateTime};
use lopdf::Document;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Segmenting,
    ProcessingUnits,
    Assembling,
    Done,
    Failed,
}

/// Where each generated artifact was stored. Absent kinds had no content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<ArtifactLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamped_bundle: Option<ArtifactLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_report: Option<ArtifactLocation>,
}

/// Outcome of one unit, in segmentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UnitDetail {
    Accepted {
        filename: String,
        reference: Reference,
        entries: Vec<LedgerEntry>,
    },
    Rejected {
        filename: String,
        reason: RejectionReason,
    },
}

impl UnitDetail {
    pub fn filename(&self) -> &str {
        match self {
            Self::Accepted { filename, .. } | Self::Rejected { filename, .. } => filename,
        }
    }

    pub fn reference(&self) -> Option<Reference> {
        match self {
            Self::Accepted { reference, .. } => Some(*reference),
            Self::Rejected { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub balanced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub output_files: OutputFiles,
    pub results_detail: Vec<UnitDetail>,
    pub summary: Summary,
    /// Every alert of the batch, in the order it was raised.
    pub alerts: Vec<Alert>,
}

/// Working state of one run. Dropped once the result is returned.
#[derive(Default)]
struct Batch {
    counter: ReferenceCounter,
    log: ExceptionLog,
    entries: Vec<LedgerEntry>,
    stamped: Vec<Document>,
    details: Vec<UnitDetail>,
}

/// Reconciliation pipeline over an extraction backend `E` and an artifact
/// store `S`.
///
/// # Example
///
/// ```
/// use ticket_ledger::{
///     DocumentUnit, ExtractionProposal, Extractor, MemorySink, Pipeline, PipelineConfig,
///     PipelineState,
/// };
///
/// struct NothingUsable;
///
/// impl Extractor for NothingUsable {
///     fn extract(&self, _unit: &DocumentUnit) -> ExtractionProposal {
///         ExtractionProposal::Unusable(ticket_ledger::RejectionReason::ServiceError)
///     }
/// }
///
/// let mut pipeline = Pipeline::new(PipelineConfig::default(), NothingUsable, MemorySink::new());
/// let result = pipeline.run(Vec::new()).unwrap();
///
/// assert_eq!(pipeline.state(), PipelineState::Done);
/// assert_eq!(result.summary.total, 0);
/// assert!(result.summary.balanced);
/// ```
pub struct Pipeline<E, S> {
    config: PipelineConfig,
    reconciler: BalanceReconciler,
    extractor: E,
    sink: S,
    state: PipelineState,
}

impl<E: Extractor, S: ArtifactSink> Pipeline<E, S> {
    pub fn new(config: PipelineConfig, extractor: E, sink: S) -> Self {
        let reconciler = BalanceReconciler::new(config.bank_account.clone());
        Self {
            config,
            reconciler,
            extractor,
            sink,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs one batch, naming artifacts after the current local time.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::MalformedDocument`] if a submission cannot be
    ///   segmented. No artifact is produced.
    /// - Any other variant if an artifact cannot be built or stored.
    pub fn run(&mut self, documents: Vec<SubmittedDocument>) -> Result<BatchResult, PipelineError> {
        self.run_at(documents, Local::now().naive_local())
    }

    /// Runs one batch started at `started`.
    pub fn run_at(
        &mut self,
        documents: Vec<SubmittedDocument>,
        started: NaiveDateTime,
    ) -> Result<BatchResult, PipelineError> {
        self.state = PipelineState::Idle;

        self.transition(PipelineState::Segmenting);
        let units = match segmenter::segment_batch(documents) {
            Ok(units) => units,
            Err(e) => {
                warn!(error = %e, "batch aborted");
                self.transition(PipelineState::Failed);
                return Err(e);
            }
        };

        self.transition(PipelineState::ProcessingUnits);
        let proposals = unit_queue::extract_all(&self.extractor, &units, self.config.workers);
        let mut batch = Batch::default();
        for (unit, proposal) in units.iter().zip(proposals) {
            self.process_unit(&mut batch, unit, proposal);
        }

        self.transition(PipelineState::Assembling);
        let output_files = match self.assemble(&mut batch, started) {
            Ok(output_files) => output_files,
            Err(e) => {
                warn!(error = %e, "assembly failed");
                self.transition(PipelineState::Failed);
                return Err(e);
            }
        };

        let summary = summarize(units.len(), &batch);
        info!(
            total = summary.total,
            accepted = summary.accepted,
            rejected = summary.rejected,
            total_debit = %summary.total_debit,
            total_credit = %summary.total_credit,
            balanced = summary.balanced,
            "batch complete"
        );
        self.transition(PipelineState::Done);

        Ok(BatchResult {
            output_files,
            results_detail: batch.details,
            summary,
            alerts: batch.log.alerts().to_vec(),
        })
    }

    fn transition(&mut self, next: PipelineState) {
        info!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    fn process_unit(&self, batch: &mut Batch, unit: &DocumentUnit, proposal: ExtractionProposal) {
        let proposal = match proposal {
            ExtractionProposal::Usable(candidates)
                if !candidates.iter().all(EntryCandidate::amounts_in_range) =>
            {
                warn!(filename = unit.filename(), "proposed amount out of range");
                ExtractionProposal::Unusable(RejectionReason::InvalidResponse)
            }
            proposal => proposal,
        };
        match proposal {
            ExtractionProposal::Unusable(reason) => {
                warn!(filename = unit.filename(), %reason, "unit rejected");
                batch.log.reject(unit.filename(), reason.clone());
                batch.details.push(UnitDetail::Rejected {
                    filename: unit.filename().to_string(),
                    reason,
                });
            }
            ExtractionProposal::Usable(candidates) => {
                self.accept_unit(batch, unit, candidates);
            }
        }
    }

    fn accept_unit(&self, batch: &mut Batch, unit: &DocumentUnit, candidates: Vec<EntryCandidate>) {
        let reference = batch.counter.next_reference();
        let mut group = normalize(candidates, reference, unit.filename(), &self.config.journal);
        debug!(%reference, filename = unit.filename(), lines = group.entries.len(), "unit accepted");

        if let Some(alert) = self.reconciler.reconcile(&mut group) {
            batch.log.record(alert);
        }

        match stamped_copy(unit.bytes()) {
            Ok(doc) => batch.stamped.push(doc),
            Err(e) => {
                warn!(%reference, filename = unit.filename(), error = %e, "stamp failed");
                batch.log.record(Alert::StampFailed {
                    reference,
                    filename: unit.filename().to_string(),
                    reason: e.to_string(),
                });
            }
        }

        batch.entries.extend(group.entries.iter().cloned());
        batch.details.push(UnitDetail::Accepted {
            filename: group.filename,
            reference,
            entries: group.entries,
        });
    }

    fn assemble(
        &mut self,
        batch: &mut Batch,
        started: NaiveDateTime,
    ) -> Result<OutputFiles, PipelineError> {
        let timestamp = started.format("%Y%m%d_%H%M%S").to_string();
        let processed_at = started.format("%d/%m/%Y %H:%M").to_string();

        let artifacts = artifact::assemble(AssemblyInput {
            entries: &batch.entries,
            alerts: batch.log.alerts(),
            stamped: std::mem::take(&mut batch.stamped),
            rejections: batch.log.rejections(),
            timestamp: &timestamp,
            processed_at: &processed_at,
        })?;

        let mut stored: Vec<(ArtifactKind, ArtifactLocation)> = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            match self.sink.store(artifact) {
                Ok(location) => {
                    debug!(name = %location.name, path = %location.path.display(), "artifact stored");
                    stored.push((artifact.kind, location));
                }
                Err(e) => {
                    self.discard_stored(&stored);
                    return Err(e.into());
                }
            }
        }

        let mut output_files = OutputFiles::default();
        for (kind, location) in stored {
            let slot = match kind {
                ArtifactKind::Ledger => &mut output_files.ledger,
                ArtifactKind::StampedBundle => &mut output_files.stamped_bundle,
                ArtifactKind::ExceptionReport => &mut output_files.exception_report,
            };
            *slot = Some(location);
        }
        Ok(output_files)
    }

    /// Removes the artifacts of a run whose persistence failed halfway.
    fn discard_stored(&mut self, stored: &[(ArtifactKind, ArtifactLocation)]) {
        for (_, location) in stored {
            if let Err(e) = self.sink.discard(location) {
                warn!(name = %location.name, error = %e, "could not discard stored artifact");
            }
        }
    }
}

fn stamped_copy(bytes: &[u8]) -> Result<Document, lopdf::Error> {
    let mut doc = pdf::load(bytes)?;
    pdf::stamp(&mut doc)?;
    Ok(doc)
}

fn summarize(total: usize, batch: &Batch) -> Summary {
    let total_debit: Decimal = batch.entries.iter().map(|e| e.debit).sum();
    let total_credit: Decimal = batch.entries.iter().map(|e| e.credit).sum();
    let rejected = batch.log.rejections().len();
    Summary {
        total,
        accepted: total - rejected,
        rejected,
        total_debit: money(total_debit),
        total_credit: money(total_credit),
        balanced: control_passes(total_debit, total_credit),
    }
}
