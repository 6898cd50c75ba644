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

//! Balance reconciliation of entry groups.
//!
//! Every group must satisfy `|sum(debit) - sum(credit)| <= 0.01`. The
//! extraction step is not trusted to get this right, so the check is always
//! re-derived here. An unbalanced group is repaired by adjusting its bank
//! (payment) line:
//!
//! ```text
//!  balanced ──────────────────────────────► kept as-is, no alert
//!  unbalanced ──bank line present──► bank line net := debits - credits
//!                                    of the other lines, alert (repaired)
//!             └─no bank line───────► kept unbalanced, alert (not repaired)
//! ```
//!
//! When the bank line is the group's only credit line the adjustment is
//! exactly "bank credit := total debit". Only the first bank line of the
//! group is touched, and a repair never reaches into another group.

use crate::alert::Alert;
use crate::base::AccountCode;
use crate::entry::EntryGroup;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

/// Largest debit/credit gap a group may carry and still count as balanced.
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

/// Payment account of the expense card, credited by every receipt.
pub const DEFAULT_BANK_ACCOUNT: &str = "51200000";

/// Group-level balance check: the gap is at most one cent.
pub fn within_tolerance(total_debit: Decimal, total_credit: Decimal) -> bool {
    (total_debit - total_credit).abs() <= BALANCE_TOLERANCE
}

/// Ledger-level control: the gap is strictly below one cent.
pub fn control_passes(total_debit: Decimal, total_credit: Decimal) -> bool {
    (total_debit - total_credit).abs() < BALANCE_TOLERANCE
}

/// Verifies and repairs the balance of entry groups.
#[derive(Debug, Clone)]
pub struct BalanceReconciler {
    bank_account: AccountCode,
}

impl BalanceReconciler {
    pub fn new(bank_account: AccountCode) -> Self {
        Self { bank_account }
    }

    pub fn bank_account(&self) -> &AccountCode {
        &self.bank_account
    }

    /// Checks `group` and repairs it in place when unbalanced.
    ///
    /// Returns the alert describing the imbalance, or `None` when the group
    /// was already within tolerance. The alert carries the totals as they were
    /// before any repair.
    pub fn reconcile(&self, group: &mut EntryGroup) -> Option<Alert> {
        let total_debit = group.total_debit();
        let total_credit = group.total_credit();
        if within_tolerance(total_debit, total_credit) {
            return None;
        }

        let bank_index = group
            .entries
            .iter()
            .position(|entry| entry.account == self.bank_account);

        let repaired = match bank_index {
            Some(index) => {
                let others_net: Decimal = group
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, entry)| entry.net())
                    .sum();
                // The bank line must carry the opposite of everything else.
                group.entries[index].set_net(-others_net);
                debug_assert!(
                    within_tolerance(group.total_debit(), group.total_credit()),
                    "Invariant violated: group {} still unbalanced after repair",
                    group.reference
                );
                true
            }
            None => false,
        };

        warn!(
            reference = %group.reference,
            filename = %group.filename,
            %total_debit,
            %total_credit,
            repaired,
            "unbalanced entry group"
        );

        Some(Alert::Imbalance {
            reference: group.reference,
            filename: group.filename.clone(),
            total_debit,
            total_credit,
            repaired,
        })
    }
}

impl Default for BalanceReconciler {
    fn default() -> Self {
        Self::new(AccountCode::normalized(DEFAULT_BANK_ACCOUNT))
    }
}
