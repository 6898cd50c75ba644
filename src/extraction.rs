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

//! Extraction adapter: the narrow contract in front of the document-AI
//! service.
//!
//! The service is an untrusted oracle. Whatever it returns is decoded
//! defensively: transport faults become a `service error` rejection,
//! anything that does not decode becomes an `invalid response` rejection,
//! and nothing the service says is ever allowed to abort a batch.

use crate::alert::RejectionReason;
use crate::document::DocumentUnit;
use crate::entry::{EntryCandidate, amount_in_range};
use crate::error::ServiceError;
use crate::pdf;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, warn};

/// Embedded text longer than this (in characters) is sent as text rather
/// than as the PDF itself.
pub const DEFAULT_TEXT_THRESHOLD: usize = 50;

/// What the adapter sends for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionRequest<'a> {
    /// Machine-readable text embedded in the unit.
    Text(&'a str),
    /// The unit's PDF bytes.
    Document(&'a [u8]),
}

/// The external extraction capability: one request in, raw text out.
pub trait ExtractionService: Send + Sync {
    fn complete(&self, request: &ExtractionRequest<'_>) -> Result<String, ServiceError>;
}

/// The adapter's verdict on one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionProposal {
    Usable(Vec<EntryCandidate>),
    Unusable(RejectionReason),
}

/// `extract(unit) -> proposal`, the only thing the pipeline knows about
/// extraction.
pub trait Extractor: Send + Sync {
    fn extract(&self, unit: &DocumentUnit) -> ExtractionProposal;
}

/// Wraps an [`ExtractionService`] behind the [`Extractor`] contract.
#[derive(Debug)]
pub struct ExtractionAdapter<S> {
    service: S,
    text_threshold: usize,
}

impl<S: ExtractionService> ExtractionAdapter<S> {
    pub fn new(service: S) -> Self {
        Self::with_text_threshold(service, DEFAULT_TEXT_THRESHOLD)
    }

    pub fn with_text_threshold(service: S, text_threshold: usize) -> Self {
        Self {
            service,
            text_threshold,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}

impl<S: ExtractionService> Extractor for ExtractionAdapter<S> {
    fn extract(&self, unit: &DocumentUnit) -> ExtractionProposal {
        let text = pdf::embedded_text(unit.bytes());
        let text = text.trim();
        let request = if text.chars().count() > self.text_threshold {
            ExtractionRequest::Text(text)
        } else {
            ExtractionRequest::Document(unit.bytes())
        };
        debug!(
            filename = unit.filename(),
            text_request = matches!(request, ExtractionRequest::Text(_)),
            "requesting extraction"
        );

        match self.service.complete(&request) {
            Ok(raw) => parse_proposal(&raw),
            Err(e) => {
                warn!(filename = unit.filename(), error = %e, "extraction service failed");
                ExtractionProposal::Unusable(RejectionReason::ServiceError)
            }
        }
    }
}

/// Decodes a raw service answer into a proposal.
///
/// Surrounding code fences are stripped first. Anything that fails to
/// decode is an `invalid response` rejection.
pub fn parse_proposal(raw: &str) -> ExtractionProposal {
    let payload = match serde_json::from_str::<Payload>(strip_fences(raw)) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "undecodable extraction payload");
            return ExtractionProposal::Unusable(RejectionReason::InvalidResponse);
        }
    };

    if payload.exploitable.unwrap_or(false) {
        ExtractionProposal::Usable(
            payload
                .ecritures
                .unwrap_or_default()
                .into_iter()
                .map(RawEntry::into_candidate)
                .collect(),
        )
    } else {
        ExtractionProposal::Unusable(RejectionReason::unusable(payload.raison_non_exploitable))
    }
}

/// Returns the body of the first fenced block, or the trimmed text when
/// there is no fence. A JSON object already standing before the first fence
/// is returned as is, so a lone closing fence is dropped.
///
/// ```
/// use ticket_ledger::extraction::strip_fences;
///
/// assert_eq!(strip_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_fences("{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_fences("  {\"a\": 1} "), "{\"a\": 1}");
/// ```
pub fn strip_fences(raw: &str) -> &str {
    let Some(start) = raw.find("```") else {
        return raw.trim();
    };
    let before = raw[..start].trim();
    if before.starts_with('{') {
        return before;
    }
    let after_fence = &raw[start + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of the line.
    let body = match after_fence.find('\n') {
        Some(newline) => &after_fence[newline + 1..],
        None => after_fence.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Wire payload: `{exploitable, raison_non_exploitable, ecritures: [...]}`.
#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    exploitable: Option<bool>,
    #[serde(default)]
    raison_non_exploitable: Option<String>,
    #[serde(default)]
    ecritures: Option<Vec<RawEntry>>,
}

/// Wire entry. The service's `reference` is ignored on purpose: references
/// are assigned by the pipeline.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    journal: String,
    #[serde(default, deserialize_with = "lenient_text")]
    compte: String,
    #[serde(default, deserialize_with = "lenient_text")]
    libelle: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    debit: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_amount")]
    credit: Option<Decimal>,
}

impl RawEntry {
    fn into_candidate(self) -> EntryCandidate {
        EntryCandidate {
            date: self.date,
            journal: self.journal,
            account: self.compte,
            label: self.libelle,
            debit: self.debit,
            credit: self.credit,
        }
    }
}

/// Accepts a string, a number or null.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(de::Error::custom(format!("expected text, found {other}"))),
    }
}

/// Accepts a number, a numeric string (`12.50`, `12,50`, `12,50 €`), or
/// null/blank for "no amount". Amounts beyond `MAX_AMOUNT` are refused.
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Decimal>, D::Error> {
    let amount = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => parse_amount(&n.to_string())
            .or_else(|| n.as_f64().and_then(Decimal::from_f64))
            .ok_or_else(|| <D::Error as de::Error>::custom(format!("invalid amount {n}")))?,
        Some(Value::String(s)) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '€')
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            parse_amount(&cleaned)
                .ok_or_else(|| <D::Error as de::Error>::custom(format!("invalid amount {s:?}")))?
        }
        Some(other) => return Err(de::Error::custom(format!("expected amount, found {other}"))),
    };
    if !amount_in_range(amount) {
        return Err(de::Error::custom(format!("amount {amount} out of range")));
    }
    Ok(Some(amount))
}

fn parse_amount(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
