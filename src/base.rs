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

//! Core identifier types for receipt references and ledger accounts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential receipt reference, rendered as `T<k>`.
///
/// Every entry of one accepted receipt shares the same reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(pub u32);

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl Serialize for Reference {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// General ledger account code, 8 characters in the French chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AccountCode(pub String);

impl AccountCode {
    pub const WIDTH: usize = 8;

    /// Builds an account code, right-padding short numeric codes with zeros.
    ///
    /// `6251` becomes `62510000`. Codes containing anything other than ASCII
    /// digits, and codes already at or above the width, are kept as given.
    pub fn normalized(raw: &str) -> Self {
        let code = raw.trim();
        if !code.is_empty()
            && code.len() < Self::WIDTH
            && code.bytes().all(|b| b.is_ascii_digit())
        {
            Self(format!("{code:0<width$}", width = Self::WIDTH))
        } else {
            Self(code.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic source of receipt references for one batch run.
///
/// Starts at `T1` and advances once per accepted unit only.
#[derive(Debug)]
pub struct ReferenceCounter {
    next: u32,
}

impl ReferenceCounter {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Draws the next reference.
    pub fn next_reference(&mut self) -> Reference {
        let reference = Reference(self.next);
        self.next += 1;
        reference
    }

    /// Number of references drawn so far.
    pub fn issued(&self) -> u32 {
        self.next - 1
    }
}

impl Default for ReferenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_displays_with_t_prefix() {
        assert_eq!(Reference(1).to_string(), "T1");
        assert_eq!(Reference(42).to_string(), "T42");
    }

    #[test]
    fn reference_serializes_as_string() {
        assert_eq!(serde_json::to_string(&Reference(7)).unwrap(), "\"T7\"");
    }

    #[test]
    fn counter_starts_at_one_without_gaps() {
        let mut counter = ReferenceCounter::new();
        assert_eq!(counter.issued(), 0);
        assert_eq!(counter.next_reference(), Reference(1));
        assert_eq!(counter.next_reference(), Reference(2));
        assert_eq!(counter.next_reference(), Reference(3));
        assert_eq!(counter.issued(), 3);
    }

    #[test]
    fn short_numeric_account_is_padded() {
        assert_eq!(AccountCode::normalized("6251").as_str(), "62510000");
        assert_eq!(AccountCode::normalized(" 512 ").as_str(), "51200000");
    }

    #[test]
    fn full_or_alphanumeric_account_is_kept() {
        assert_eq!(AccountCode::normalized("44566000").as_str(), "44566000");
        assert_eq!(AccountCode::normalized("401ACME").as_str(), "401ACME");
        assert_eq!(AccountCode::normalized("").as_str(), "");
    }
}
