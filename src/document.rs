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

//! Submitted documents and the processable units derived from them.

use std::path::Path;

/// One document as received at the pipeline boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl SubmittedDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Where a split unit came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOrigin {
    /// Filename of the submission the page was split from.
    pub parent: String,
    /// 1-based page index within the submission.
    pub page: usize,
}

/// One independently processable page or document.
///
/// Units are created by the segmenter and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUnit {
    filename: String,
    bytes: Vec<u8>,
    origin: Option<UnitOrigin>,
}

impl DocumentUnit {
    /// A unit standing for a whole single-page submission.
    pub fn whole(document: SubmittedDocument) -> Self {
        Self {
            filename: document.filename,
            bytes: document.bytes,
            origin: None,
        }
    }

    /// A unit holding page `page` of `parent`.
    pub fn page_of(parent: &str, page: usize, bytes: Vec<u8>) -> Self {
        Self {
            filename: page_filename(parent, page),
            bytes,
            origin: Some(UnitOrigin {
                parent: parent.to_string(),
                page,
            }),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn origin(&self) -> Option<&UnitOrigin> {
        self.origin.as_ref()
    }
}

/// Names page `page` of `filename` as `<stem>_page<page>.<ext>`.
///
/// Submissions without an extension keep the `pdf` one.
pub fn page_filename(filename: &str, page: usize) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("pdf");
    format!("{stem}_page{page}.{ext}")
}
