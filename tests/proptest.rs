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


//! Property-based tests for numbering, normalization and reconciliation.
//!
//! These tests verify invariants that should hold for any extraction
//! proposal the upstream service could return.

mod common;

use common::{FilenameExtractor, text_pdf, usable_payload};
use proptest::prelude::*;
use rust_decimal::Decimal;
use ticket_ledger::entry::{amount_in_range, normalize};
use ticket_ledger::extraction::parse_proposal;
use ticket_ledger::reconcile::within_tolerance;
use ticket_ledger::{
    AccountCode, BalanceReconciler, EntryCandidate, ExtractionProposal, MemorySink, Pipeline,
    PipelineConfig, PipelineState, Reference, RejectionReason, SubmittedDocument, UnitDetail,
};

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate an amount between 0.00 and 10000.00.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..=1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_account() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["6251", "62560000", "44566", "6064", "625"])
}

/// A non-bank line with an amount on either or both sides.
fn arb_line() -> impl Strategy<Value = EntryCandidate> {
    (arb_account(), arb_amount(), arb_amount(), any::<bool>()).prop_map(
        |(account, debit, credit, two_sided)| EntryCandidate {
            date: "12/03/2025".to_string(),
            account: account.to_string(),
            label: "Receipt".to_string(),
            debit: Some(debit),
            credit: two_sided.then_some(credit),
            ..Default::default()
        },
    )
}

/// Amounts up to `Decimal`'s limits, on both sides of the accepted bound.
fn arb_extreme_amount() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        Just(Decimal::MAX),
        Just(Decimal::MIN),
        (any::<i64>(), 0u32..=4).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale)),
    ]
}

fn bank_line(credit: Decimal) -> EntryCandidate {
    EntryCandidate {
        date: "12/03/2025".to_string(),
        account: "512".to_string(),
        label: "Receipt".to_string(),
        credit: Some(credit),
        ..Default::default()
    }
}

// =============================================================================
// Normalization and Reconciliation Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Normalized lines carry one non-negative side and keep their net.
    #[test]
    fn normalized_lines_are_one_sided(lines in prop::collection::vec(arb_line(), 1..8)) {
        let nets: Vec<Decimal> = lines
            .iter()
            .map(|line| line.debit.unwrap_or_default() - line.credit.unwrap_or_default())
            .collect();

        let group = normalize(lines, Reference(1), "r.pdf", "FCB");

        for (entry, net) in group.entries.iter().zip(nets) {
            prop_assert!(entry.debit >= Decimal::ZERO && entry.credit >= Decimal::ZERO);
            prop_assert!(entry.debit.is_zero() || entry.credit.is_zero());
            prop_assert_eq!(entry.net(), net);
            prop_assert_eq!(entry.account.as_str().len(), AccountCode::WIDTH);
        }
    }

    /// A group with a bank line always balances after reconciliation, and
    /// only the bank line is touched.
    #[test]
    fn bank_line_absorbs_any_imbalance(
        lines in prop::collection::vec(arb_line(), 1..8),
        paid in arb_amount(),
    ) {
        let mut candidates = lines;
        candidates.push(bank_line(paid));
        let mut group = normalize(candidates, Reference(7), "r.pdf", "FCB");
        let before = group.clone();

        let alert = BalanceReconciler::default().reconcile(&mut group);

        prop_assert!(within_tolerance(group.total_debit(), group.total_credit()));
        prop_assert_eq!(
            alert.is_some(),
            !within_tolerance(before.total_debit(), before.total_credit())
        );
        let last = group.entries.len() - 1;
        prop_assert_eq!(&group.entries[..last], &before.entries[..last]);
    }

    /// Without a bank line the group is flagged but left as extracted.
    #[test]
    fn no_bank_line_is_flagged_not_changed(lines in prop::collection::vec(arb_line(), 1..8)) {
        let mut group = normalize(lines, Reference(1), "r.pdf", "FCB");
        let before = group.clone();

        let alert = BalanceReconciler::default().reconcile(&mut group);

        prop_assert_eq!(&group, &before);
        prop_assert_eq!(
            alert.is_some(),
            !within_tolerance(group.total_debit(), group.total_credit())
        );
    }
}

// =============================================================================
// Numbering Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// References are T1..Tn over accepted units only, in unit order.
    #[test]
    fn references_are_gap_free(usable in prop::collection::vec(any::<bool>(), 0..6)) {
        let mut extractor = FilenameExtractor::new();
        let mut documents = Vec::new();
        for (i, ok) in usable.iter().enumerate() {
            let name = format!("r{i}.pdf");
            let proposal = if *ok {
                ExtractionProposal::Usable(vec![bank_line(Decimal::ZERO)])
            } else {
                ExtractionProposal::Unusable(RejectionReason::unusable(None))
            };
            extractor = extractor.answer(&name, proposal, 0);
            documents.push(SubmittedDocument::new(name, text_pdf(&["receipt"])));
        }
        let mut pipeline = Pipeline::new(PipelineConfig::default(), extractor, MemorySink::new());

        let result = pipeline.run(documents).unwrap();

        let references: Vec<Reference> = result
            .results_detail
            .iter()
            .filter_map(|detail| detail.reference())
            .collect();
        let expected: Vec<Reference> = (1..=references.len() as u32).map(Reference).collect();
        prop_assert_eq!(references, expected);
        prop_assert_eq!(result.summary.accepted, usable.iter().filter(|ok| **ok).count());
        prop_assert_eq!(result.summary.total, usable.len());
    }
}

// =============================================================================
// Extreme Amount Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A payload is usable exactly when every amount is within bounds.
    #[test]
    fn extreme_payload_amounts_are_refused(
        amounts in prop::collection::vec((arb_extreme_amount(), arb_extreme_amount()), 1..5),
    ) {
        let text: Vec<(String, String)> = amounts
            .iter()
            .map(|(debit, credit)| (debit.to_string(), credit.to_string()))
            .collect();
        let lines: Vec<(&str, &str, &str)> = text
            .iter()
            .map(|(debit, credit)| ("6251", debit.as_str(), credit.as_str()))
            .collect();
        let in_range = amounts
            .iter()
            .all(|(debit, credit)| amount_in_range(*debit) && amount_in_range(*credit));

        let proposal = parse_proposal(&usable_payload(&lines));

        if in_range {
            prop_assert!(matches!(proposal, ExtractionProposal::Usable(_)));
        } else {
            prop_assert_eq!(
                proposal,
                ExtractionProposal::Unusable(RejectionReason::InvalidResponse)
            );
        }
    }

    /// Extreme amounts never abort a batch; out-of-range receipts are
    /// rejected and draw no reference.
    #[test]
    fn extreme_amounts_never_abort_the_batch(
        amounts in prop::collection::vec((arb_extreme_amount(), arb_extreme_amount()), 1..5),
    ) {
        let in_range = amounts
            .iter()
            .all(|(debit, credit)| amount_in_range(*debit) && amount_in_range(*credit));
        let mut lines: Vec<EntryCandidate> = amounts
            .into_iter()
            .map(|(debit, credit)| EntryCandidate {
                date: "12/03/2025".to_string(),
                account: "6251".to_string(),
                label: "Receipt".to_string(),
                debit: Some(debit),
                credit: Some(credit),
                ..Default::default()
            })
            .collect();
        lines.push(bank_line(Decimal::ZERO));
        let extractor = FilenameExtractor::new()
            .answer("extreme.pdf", ExtractionProposal::Usable(lines), 0)
            .answer(
                "plain.pdf",
                ExtractionProposal::Usable(vec![bank_line(Decimal::ZERO)]),
                0,
            );
        let documents = vec![
            SubmittedDocument::new("extreme.pdf", text_pdf(&["extreme"])),
            SubmittedDocument::new("plain.pdf", text_pdf(&["plain"])),
        ];
        let mut pipeline = Pipeline::new(PipelineConfig::default(), extractor, MemorySink::new());

        let result = pipeline.run(documents).unwrap();

        prop_assert_eq!(pipeline.state(), PipelineState::Done);
        prop_assert_eq!(result.summary.total, 2);
        if in_range {
            prop_assert_eq!(result.results_detail[0].reference(), Some(Reference(1)));
            prop_assert_eq!(result.results_detail[1].reference(), Some(Reference(2)));
        } else {
            let rejected = matches!(
                &result.results_detail[0],
                UnitDetail::Rejected { reason: RejectionReason::InvalidResponse, .. }
            );
            prop_assert!(rejected);
            prop_assert_eq!(result.results_detail[1].reference(), Some(Reference(1)));
        }
    }
}
