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

//! Splits submissions into processable units.
//!
//! A single-page submission becomes one unit carrying the original bytes
//! untouched. An N-page submission becomes N units, one per page, named
//! `<stem>_page<k>.<ext>` in page order. Anything that does not parse as a
//! paginated PDF is a [`PipelineError::MalformedDocument`], which aborts the
//! batch.

use crate::document::{DocumentUnit, SubmittedDocument};
use crate::error::PipelineError;
use crate::pdf;
use tracing::debug;

/// Segments one submission into units.
///
/// # Errors
///
/// [`PipelineError::MalformedDocument`] if the bytes are not a PDF, a page
/// cannot be re-serialized, or the document has no pages.
pub fn segment(document: SubmittedDocument) -> Result<Vec<DocumentUnit>, PipelineError> {
    let malformed = |reason: String| PipelineError::MalformedDocument {
        filename: document.filename.clone(),
        reason,
    };

    let doc = pdf::load(&document.bytes).map_err(|e| malformed(e.to_string()))?;
    let pages = pdf::page_count(&doc);
    debug!(filename = %document.filename, pages, "segmenting submission");

    match pages {
        0 => Err(malformed("document has no pages".to_string())),
        1 => Ok(vec![DocumentUnit::whole(document)]),
        _ => (1..=pages)
            .map(|page| {
                let bytes = pdf::extract_page(&doc, page as u32)
                    .map_err(|e| malformed(format!("page {page}: {e}")))?;
                Ok(DocumentUnit::page_of(&document.filename, page, bytes))
            })
            .collect(),
    }
}

/// Segments every submission of a batch, preserving submission order.
pub fn segment_batch(
    documents: Vec<SubmittedDocument>,
) -> Result<Vec<DocumentUnit>, PipelineError> {
    let mut units = Vec::new();
    for document in documents {
        units.extend(segment(document)?);
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::text_pdf;

    #[test]
    fn single_page_is_returned_unchanged() {
        let bytes = text_pdf(&["only page"]);
        let units = segment(SubmittedDocument::new("ticket.pdf", bytes.clone())).unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].filename(), "ticket.pdf");
        assert_eq!(units[0].bytes(), bytes.as_slice());
        assert!(units[0].origin().is_none());
    }

    #[test]
    fn multi_page_is_split_in_order() {
        let bytes = text_pdf(&["a", "b", "c"]);
        let units = segment(SubmittedDocument::new("scan.pdf", bytes)).unwrap();

        let names: Vec<&str> = units.iter().map(|u| u.filename()).collect();
        assert_eq!(
            names,
            vec!["scan_page1.pdf", "scan_page2.pdf", "scan_page3.pdf"]
        );
        for (i, unit) in units.iter().enumerate() {
            let doc = pdf::load(unit.bytes()).unwrap();
            assert_eq!(pdf::page_count(&doc), 1);
            assert_eq!(unit.origin().unwrap().page, i + 1);
            assert_eq!(unit.origin().unwrap().parent, "scan.pdf");
        }
    }

    #[test]
    fn garbage_is_malformed() {
        let result = segment(SubmittedDocument::new("notes.txt", b"hello".to_vec()));
        match result {
            Err(PipelineError::MalformedDocument { filename, .. }) => {
                assert_eq!(filename, "notes.txt")
            }
            other => panic!("expected MalformedDocument, got {other:?}"),
        }
    }

    #[test]
    fn batch_keeps_submission_order() {
        let units = segment_batch(vec![
            SubmittedDocument::new("b.pdf", text_pdf(&["1", "2"])),
            SubmittedDocument::new("a.pdf", text_pdf(&["3"])),
        ])
        .unwrap();

        let names: Vec<&str> = units.iter().map(|u| u.filename()).collect();
        assert_eq!(names, vec!["b_page1.pdf", "b_page2.pdf", "a.pdf"]);
    }

    #[test]
    fn empty_batch_has_no_units() {
        assert!(segment_batch(Vec::new()).unwrap().is_empty());
    }
}
