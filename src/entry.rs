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

//! Ledger entries and their normalization from extraction candidates.
//!
//! Candidates come from an untrusted extraction step. Normalization gives
//! each accepted unit its reference, rounds every amount to 2 decimal places
//! and puts every line in ledger shape (non-negative amounts, at most one
//! non-zero side) without changing the line's net.

use crate::base::{AccountCode, Reference};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Currency precision of every ledger amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest absolute amount a line may carry. Keeps every netting and total
/// well inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000_000);

/// Whether `|amount| <= MAX_AMOUNT`.
pub fn amount_in_range(amount: Decimal) -> bool {
    amount.abs() <= MAX_AMOUNT
}

/// Rounds to 2 decimal places and fixes the scale, so `10` renders `10.00`.
pub fn money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp(MONEY_SCALE);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// One proposed bookkeeping line, as decoded from the extraction payload.
///
/// Missing amounts are `None`; any reference the service proposed has
/// already been discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryCandidate {
    pub date: String,
    pub journal: String,
    pub account: String,
    pub label: String,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

impl EntryCandidate {
    /// Both amounts, when present, are within `MAX_AMOUNT`.
    pub fn amounts_in_range(&self) -> bool {
        [self.debit, self.credit]
            .into_iter()
            .flatten()
            .all(amount_in_range)
    }
}

/// One bookkeeping line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// `DD/MM/YYYY`, as read from the receipt.
    pub date: String,
    pub reference: Reference,
    pub journal: String,
    pub account: AccountCode,
    pub label: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl LedgerEntry {
    /// `debit - credit`.
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }

    /// Replaces both sides so the line carries `net` on a single side.
    pub(crate) fn set_net(&mut self, net: Decimal) {
        let (debit, credit) = split_net(net);
        self.debit = debit;
        self.credit = credit;
    }
}

/// All lines of one accepted receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryGroup {
    pub reference: Reference,
    /// Unit the receipt was read from.
    pub filename: String,
    pub entries: Vec<LedgerEntry>,
}

impl EntryGroup {
    pub fn total_debit(&self) -> Decimal {
        self.entries.iter().map(|e| e.debit).sum()
    }

    pub fn total_credit(&self) -> Decimal {
        self.entries.iter().map(|e| e.credit).sum()
    }
}

/// Builds the entry group of one accepted unit.
///
/// `default_journal` fills in lines that came without a journal code.
pub fn normalize(
    candidates: Vec<EntryCandidate>,
    reference: Reference,
    filename: &str,
    default_journal: &str,
) -> EntryGroup {
    let entries = candidates
        .into_iter()
        .map(|candidate| {
            let debit = money(candidate.debit.unwrap_or(Decimal::ZERO));
            let credit = money(candidate.credit.unwrap_or(Decimal::ZERO));
            let (debit, credit) = split_net(debit - credit);
            let journal = match candidate.journal.trim() {
                "" => default_journal.to_string(),
                journal => journal.to_string(),
            };
            LedgerEntry {
                date: candidate.date.trim().to_string(),
                reference,
                journal,
                account: AccountCode::normalized(&candidate.account),
                label: candidate.label.trim().to_string(),
                debit,
                credit,
            }
        })
        .collect();

    EntryGroup {
        reference,
        filename: filename.to_string(),
        entries,
    }
}

/// Puts a line's net on the debit side when positive, the credit side when
/// negative.
fn split_net(net: Decimal) -> (Decimal, Decimal) {
    let zero = money(Decimal::ZERO);
    if net >= Decimal::ZERO {
        (money(net), zero)
    } else {
        (zero, money(-net))
    }
}
