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

//! Pipeline and extraction service settings.

use crate::base::AccountCode;
use crate::instructions::DEFAULT_INSTRUCTIONS;
use crate::reconcile::DEFAULT_BANK_ACCOUNT;
use std::fmt;

pub const DEFAULT_JOURNAL: &str = "FCB";
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Knobs of the reconciliation pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Payment leg adjusted when a receipt does not balance.
    pub bank_account: AccountCode,
    /// Journal code given to lines that came without one.
    pub journal: String,
    /// Concurrent extraction calls. 1 means strictly sequential.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bank_account: AccountCode::normalized(DEFAULT_BANK_ACCOUNT),
            journal: DEFAULT_JOURNAL.to_string(),
            workers: 1,
        }
    }
}

/// Connection settings of the extraction service.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Accounting rules and output schema sent as the system prompt.
    pub instructions: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}
