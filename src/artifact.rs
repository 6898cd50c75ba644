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

//! Output artifacts: the ledger import file, the stamped receipt bundle and
//! the exception report.
//!
//! Each artifact is produced only when it has content, and is handed to an
//! [`ArtifactSink`] as an opaque byte stream with a timestamp-qualified name.

use crate::alert::{Alert, Rejection};
use crate::entry::{LedgerEntry, money};
use crate::error::PipelineError;
use crate::pdf;
use crate::reconcile::control_passes;
use csv::WriterBuilder;
use lopdf::Document;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Column headers of the ledger import file.
pub const LEDGER_HEADERS: [&str; 7] = [
    "Date",
    "Reference",
    "Journal",
    "Account",
    "Label",
    "Debit",
    "Credit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Ledger,
    StampedBundle,
    ExceptionReport,
}

impl ArtifactKind {
    /// File name for a run started at `timestamp` (`YYYYMMDD_HHMMSS`).
    pub fn file_name(self, timestamp: &str) -> String {
        match self {
            Self::Ledger => format!("ledger_import_{timestamp}.csv"),
            Self::StampedBundle => format!("processed_receipts_{timestamp}.pdf"),
            Self::ExceptionReport => format!("unusable_receipts_{timestamp}.pdf"),
        }
    }
}

/// A generated output, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Where a persisted artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLocation {
    pub name: String,
    pub path: PathBuf,
}

/// Persistence collaborator for generated artifacts.
pub trait ArtifactSink {
    fn store(&mut self, artifact: &Artifact) -> std::io::Result<ArtifactLocation>;

    /// Removes an artifact this sink stored earlier in the same run.
    fn discard(&mut self, location: &ArtifactLocation) -> std::io::Result<()>;
}

/// Writes artifacts into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for DirectorySink {
    fn store(&mut self, artifact: &Artifact) -> std::io::Result<ArtifactLocation> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(&artifact.name);
        fs::write(&path, &artifact.bytes)?;
        Ok(ArtifactLocation {
            name: artifact.name.clone(),
            path,
        })
    }

    fn discard(&mut self, location: &ArtifactLocation) -> std::io::Result<()> {
        fs::remove_file(&location.path)
    }
}

/// Keeps artifacts in memory. Locations are the bare artifact names.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub stored: Vec<Artifact>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.stored.iter().find(|artifact| artifact.kind == kind)
    }
}

impl ArtifactSink for MemorySink {
    fn store(&mut self, artifact: &Artifact) -> std::io::Result<ArtifactLocation> {
        self.stored.push(artifact.clone());
        Ok(ArtifactLocation {
            name: artifact.name.clone(),
            path: PathBuf::from(&artifact.name),
        })
    }

    fn discard(&mut self, location: &ArtifactLocation) -> std::io::Result<()> {
        self.stored.retain(|artifact| artifact.name != location.name);
        Ok(())
    }
}

/// Everything the assembler needs from a finished batch.
#[derive(Debug)]
pub struct AssemblyInput<'a> {
    pub entries: &'a [LedgerEntry],
    pub alerts: &'a [Alert],
    pub stamped: Vec<Document>,
    pub rejections: &'a [Rejection],
    /// `YYYYMMDD_HHMMSS`, qualifies every artifact name.
    pub timestamp: &'a str,
    /// Human-readable processing date printed on the exception report.
    pub processed_at: &'a str,
}

/// Builds every artifact that has content, in ledger, bundle, report order.
///
/// # Errors
///
/// Returns a [`PipelineError`] if one of the artifacts cannot be serialized.
pub fn assemble(input: AssemblyInput<'_>) -> Result<Vec<Artifact>, PipelineError> {
    let mut artifacts = Vec::new();

    if !input.entries.is_empty() {
        let mut bytes = Vec::new();
        write_ledger(input.entries, input.alerts, &mut bytes)?;
        artifacts.push(artifact(ArtifactKind::Ledger, input.timestamp, bytes));
    }

    if !input.stamped.is_empty() {
        let mut bundle = pdf::merge(input.stamped)?;
        let bytes = pdf::save(&mut bundle)?;
        artifacts.push(artifact(ArtifactKind::StampedBundle, input.timestamp, bytes));
    }

    if !input.rejections.is_empty() {
        let bytes = render_exception_report(input.rejections, input.processed_at)?;
        artifacts.push(artifact(ArtifactKind::ExceptionReport, input.timestamp, bytes));
    }

    Ok(artifacts)
}

fn artifact(kind: ArtifactKind, timestamp: &str, bytes: Vec<u8>) -> Artifact {
    Artifact {
        kind,
        name: kind.file_name(timestamp),
        bytes,
    }
}

/// Writes the ledger import file.
///
/// # CSV Format
///
/// ```csv
/// Date,Reference,Journal,Account,Label,Debit,Credit
/// 12/03/2025,T1,FCB,62510000,Vinci - Toll,10.00,0.00
/// 12/03/2025,T1,FCB,51200000,Vinci - Toll,0.00,10.00
/// ,,,,,,
/// ,,,CONTROL,OK - balanced,10.00,10.00
/// ```
///
/// followed, when there are alerts, by an empty row, an `ALERTS` row and one
/// row per alert.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_ledger<W: Write>(
    entries: &[LedgerEntry],
    alerts: &[Alert],
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new().flexible(true).from_writer(writer);
    let blank = [""; LEDGER_HEADERS.len()];

    wtr.write_record(LEDGER_HEADERS)?;

    let mut total_debit = Decimal::ZERO;
    let mut total_credit = Decimal::ZERO;
    for entry in entries {
        total_debit += entry.debit;
        total_credit += entry.credit;
        let reference = entry.reference.to_string();
        let debit = money(entry.debit).to_string();
        let credit = money(entry.credit).to_string();
        wtr.write_record([
            entry.date.as_str(),
            reference.as_str(),
            entry.journal.as_str(),
            entry.account.as_str(),
            entry.label.as_str(),
            debit.as_str(),
            credit.as_str(),
        ])?;
    }

    let status = if control_passes(total_debit, total_credit) {
        "OK - balanced"
    } else {
        "ERROR - unbalanced"
    };
    let debit = money(total_debit).to_string();
    let credit = money(total_credit).to_string();
    wtr.write_record(blank)?;
    wtr.write_record(["", "", "", "CONTROL", status, debit.as_str(), credit.as_str()])?;

    if !alerts.is_empty() {
        wtr.write_record(blank)?;
        wtr.write_record(["ALERTS"])?;
        for alert in alerts {
            wtr.write_record([alert.to_string()])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Page geometry of the exception report, in millimetres.
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 18.0;
const REASON_COLUMN: f32 = 106.0;
const BOTTOM_MARGIN: f32 = 28.0;
const ROW_HEIGHT: f32 = 6.35;

/// Renders the A4 list of unusable receipts.
pub fn render_exception_report(
    rejections: &[Rejection],
    processed_at: &str,
) -> Result<Vec<u8>, PipelineError> {
    let (doc, page1, layer1) = PdfDocument::new(
        "Unusable receipts",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PipelineError::Render(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| PipelineError::Render(format!("PDF font error: {e}")))?;

    let mut layer = doc.get_page(page1).get_layer(layer1);
    let mut y = PAGE_HEIGHT - 21.0;

    layer.use_text("Unusable receipts", 18.0, Mm(LEFT), Mm(y), &bold);
    y -= 9.0;
    layer.use_text(
        format!("Processing date: {processed_at}"),
        11.0,
        Mm(LEFT),
        Mm(y),
        &font,
    );
    y -= 9.0;
    layer.use_text(
        "The following documents could not be used for bookkeeping.",
        10.0,
        Mm(LEFT),
        Mm(y),
        &font,
    );
    y -= 5.0;
    layer.use_text(
        "Please provide compliant receipts (detailed invoice with net amount, VAT and total).",
        10.0,
        Mm(LEFT),
        Mm(y),
        &font,
    );

    y -= 14.0;
    layer.use_text("File", 11.0, Mm(LEFT), Mm(y), &bold);
    layer.use_text("Reason", 11.0, Mm(REASON_COLUMN), Mm(y), &bold);
    y -= 8.0;

    for rejection in rejections {
        if y < BOTTOM_MARGIN {
            let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            y = PAGE_HEIGHT - 21.0;
        }
        layer.use_text(truncate(&rejection.filename, 35), 10.0, Mm(LEFT), Mm(y), &font);
        layer.use_text(
            truncate(&rejection.reason.to_string(), 50),
            10.0,
            Mm(REASON_COLUMN),
            Mm(y),
            &font,
        );
        y -= ROW_HEIGHT;
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| PipelineError::Render(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| PipelineError::Render(format!("PDF buffer error: {e}")))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
