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

//! Thread-safe extraction work queue with an ordered result arena.
//!
//! Extraction calls are network-bound and may run concurrently, but
//! references and alerts must follow segmentation order. Workers pull unit
//! indices from a [`SegQueue`] and drop their proposals into a [`DashMap`]
//! keyed by that index; the controller then reads the arena back strictly in
//! index order.

use crate::alert::RejectionReason;
use crate::document::DocumentUnit;
use crate::error::QueueError;
use crate::extraction::{ExtractionProposal, Extractor};
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::warn;

/// Pending unit indices plus the proposals completed so far.
#[derive(Debug)]
pub struct ExtractionQueue {
    /// Indices of units still waiting for extraction, FIFO.
    pending: SegQueue<usize>,

    /// Completed proposals indexed by unit position.
    proposals: DashMap<usize, ExtractionProposal>,

    len: usize,
}

impl ExtractionQueue {
    /// Creates a queue holding indices `0..len`.
    pub fn new(len: usize) -> Self {
        let pending = SegQueue::new();
        for index in 0..len {
            pending.push(index);
        }
        Self {
            pending,
            proposals: DashMap::with_capacity(len),
            len,
        }
    }

    /// Takes the next unit index to extract.
    pub fn pop(&self) -> Option<usize> {
        self.pending.pop()
    }

    /// Stores the proposal of unit `index`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::DuplicateUnit`] if that unit already has one.
    pub fn complete(&self, index: usize, proposal: ExtractionProposal) -> Result<(), QueueError> {
        // Use entry API for atomic check-and-insert
        match self.proposals.entry(index) {
            Entry::Occupied(_) => Err(QueueError::DuplicateUnit(index)),
            Entry::Vacant(entry) => {
                entry.insert(proposal);
                Ok(())
            }
        }
    }

    /// Proposals in unit order. A unit that never completed (its worker
    /// died) reads as a service error.
    pub fn into_ordered(self) -> Vec<ExtractionProposal> {
        (0..self.len)
            .map(|index| {
                self.proposals
                    .remove(&index)
                    .map(|(_, proposal)| proposal)
                    .unwrap_or(ExtractionProposal::Unusable(RejectionReason::ServiceError))
            })
            .collect()
    }
}

/// Extracts every unit with up to `workers` concurrent calls and returns the
/// proposals in unit order.
pub fn extract_all<E: Extractor>(
    extractor: &E,
    units: &[DocumentUnit],
    workers: usize,
) -> Vec<ExtractionProposal> {
    if workers <= 1 || units.len() <= 1 {
        return units.iter().map(|unit| extractor.extract(unit)).collect();
    }

    let queue = ExtractionQueue::new(units.len());
    let outcome = crossbeam::scope(|scope| {
        for _ in 0..workers.min(units.len()) {
            scope.spawn(|_| {
                while let Some(index) = queue.pop() {
                    let proposal = extractor.extract(&units[index]);
                    if let Err(e) = queue.complete(index, proposal) {
                        warn!(error = %e, "dropping extraction result");
                    }
                }
            });
        }
    });
    if outcome.is_err() {
        warn!("an extraction worker panicked, its units are treated as service errors");
    }
    queue.into_ordered()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryCandidate;
    use std::thread;
    use std::time::Duration;

    /// Answers with the unit's filename as the label, slower for earlier
    /// units so completions arrive out of order.
    struct EchoExtractor;

    impl Extractor for EchoExtractor {
        fn extract(&self, unit: &DocumentUnit) -> ExtractionProposal {
            let page = unit.origin().map_or(0, |o| o.page);
            thread::sleep(Duration::from_millis((10 - page.min(10)) as u64 * 3));
            ExtractionProposal::Usable(vec![EntryCandidate {
                label: unit.filename().to_string(),
                ..EntryCandidate::default()
            }])
        }
    }

    fn units(n: usize) -> Vec<DocumentUnit> {
        (1..=n)
            .map(|page| DocumentUnit::page_of("batch.pdf", page, Vec::new()))
            .collect()
    }

    fn labels(proposals: &[ExtractionProposal]) -> Vec<String> {
        proposals
            .iter()
            .map(|p| match p {
                ExtractionProposal::Usable(entries) => entries[0].label.clone(),
                ExtractionProposal::Unusable(reason) => reason.to_string(),
            })
            .collect()
    }

    #[test]
    fn duplicate_completion_is_rejected() {
        let queue = ExtractionQueue::new(1);
        let proposal = ExtractionProposal::Unusable(RejectionReason::InvalidResponse);
        queue.complete(0, proposal.clone()).unwrap();
        assert_eq!(
            queue.complete(0, proposal),
            Err(QueueError::DuplicateUnit(0))
        );
    }

    #[test]
    fn missing_slot_reads_as_service_error() {
        let queue = ExtractionQueue::new(2);
        queue
            .complete(1, ExtractionProposal::Usable(Vec::new()))
            .unwrap();

        let ordered = queue.into_ordered();
        assert_eq!(
            ordered[0],
            ExtractionProposal::Unusable(RejectionReason::ServiceError)
        );
        assert_eq!(ordered[1], ExtractionProposal::Usable(Vec::new()));
    }

    #[test]
    fn pop_is_fifo() {
        let queue = ExtractionQueue::new(3);
        assert_eq!(queue.pop(), Some(0));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn concurrent_extraction_keeps_unit_order() {
        let units = units(8);
        let sequential = extract_all(&EchoExtractor, &units, 1);
        let concurrent = extract_all(&EchoExtractor, &units, 4);

        assert_eq!(labels(&sequential), labels(&concurrent));
        assert_eq!(labels(&concurrent)[0], "batch_page1.pdf");
        assert_eq!(labels(&concurrent)[7], "batch_page8.pdf");
    }
}
