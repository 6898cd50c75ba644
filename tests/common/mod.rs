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


//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use lopdf::{Document, Object, Stream, dictionary};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use ticket_ledger::{
    DocumentUnit, ExtractionProposal, ExtractionRequest, ExtractionService, Extractor,
    RejectionReason, ServiceError,
};

/// Builds a PDF with one Helvetica text line per page.
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Raw service answer for a usable receipt with one line per
/// `(account, debit, credit)`.
pub fn usable_payload(lines: &[(&str, &str, &str)]) -> String {
    let entries: Vec<serde_json::Value> = lines
        .iter()
        .map(|(account, debit, credit)| {
            serde_json::json!({
                "date": "12/03/2025",
                "journal": "FCB",
                "compte": account,
                "libelle": "Vinci - Toll",
                "debit": debit,
                "credit": credit,
            })
        })
        .collect();
    format!(
        "```json\n{}\n```",
        serde_json::json!({ "exploitable": true, "ecritures": entries })
    )
}

pub fn unusable_payload(reason: &str) -> String {
    serde_json::json!({ "exploitable": false, "raison_non_exploitable": reason }).to_string()
}

/// Answers calls in order. Only meaningful with one worker.
pub struct SequenceService {
    answers: Mutex<VecDeque<Result<String, ServiceError>>>,
    calls: Mutex<usize>,
}

impl SequenceService {
    pub fn new(answers: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ExtractionService for SequenceService {
    fn complete(&self, _request: &ExtractionRequest<'_>) -> Result<String, ServiceError> {
        *self.calls.lock().unwrap() += 1;
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ServiceError::EmptyResponse))
    }
}

/// Answers by unit filename after an optional per-unit delay, so completion
/// order can differ from unit order.
pub struct FilenameExtractor {
    answers: HashMap<String, (ExtractionProposal, Duration)>,
}

impl FilenameExtractor {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
        }
    }

    pub fn answer(mut self, filename: &str, proposal: ExtractionProposal, delay_ms: u64) -> Self {
        self.answers.insert(
            filename.to_string(),
            (proposal, Duration::from_millis(delay_ms)),
        );
        self
    }
}

impl Extractor for FilenameExtractor {
    fn extract(&self, unit: &DocumentUnit) -> ExtractionProposal {
        match self.answers.get(unit.filename()) {
            Some((proposal, delay)) => {
                thread::sleep(*delay);
                proposal.clone()
            }
            None => ExtractionProposal::Unusable(RejectionReason::unusable(None)),
        }
    }
}
