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


use clap::Parser;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use ticket_ledger::config::{
    DEFAULT_API_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use ticket_ledger::extraction::DEFAULT_TEXT_THRESHOLD;
use ticket_ledger::{
    AnthropicClient, DirectorySink, ExtractionAdapter, Pipeline, PipelineConfig, ServiceConfig,
    SubmittedDocument,
};
use tracing_subscriber::EnvFilter;

/// Default `tracing` filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "ticket_ledger=info";

/// Ticket Ledger - Turn scanned expense receipts into ledger records
///
/// Splits each PDF into one receipt per page, extracts balanced double-entry
/// lines for every receipt and writes the ledger import file, the stamped
/// receipt bundle and the list of unusable receipts to the output directory.
/// The batch result is printed to stdout as JSON.
#[derive(Parser, Debug)]
#[command(name = "ticket-ledger")]
#[command(about = "Reconciles scanned expense receipts into ledger entries", long_about = None)]
struct Args {
    /// PDF submissions, processed in the given order
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,

    /// Directory receiving the generated artifacts
    #[arg(long, env = "TICKET_LEDGER_OUTPUT_DIR", default_value = "outputs")]
    output_dir: PathBuf,

    /// Key of the extraction service
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Messages endpoint of the extraction service
    #[arg(long, env = "ANTHROPIC_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Model used for extraction
    #[arg(long, env = "TICKET_LEDGER_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Per-request timeout; a unit that times out is rejected
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Concurrent extraction calls
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Embedded text length above which a receipt is sent as text instead of as a PDF
    #[arg(long, default_value_t = DEFAULT_TEXT_THRESHOLD)]
    text_threshold: usize,

    /// Alternative accounting instructions for the extraction service
    #[arg(long, value_name = "FILE")]
    rules_file: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let documents = match load_documents(&args.files) {
        Ok(documents) => documents,
        Err(e) => {
            eprintln!("Error reading input: {}", e);
            process::exit(1);
        }
    };

    let service_config = match service_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error reading rules file: {}", e);
            process::exit(1);
        }
    };

    let client = match AnthropicClient::new(service_config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error creating extraction client: {}", e);
            process::exit(1);
        }
    };

    let config = PipelineConfig {
        workers: args.workers,
        ..PipelineConfig::default()
    };
    let adapter = ExtractionAdapter::with_text_threshold(client, args.text_threshold);
    let mut pipeline = Pipeline::new(config, adapter, DirectorySink::new(&args.output_dir));

    let result = match pipeline.run(documents) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error processing batch: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_json(&result, io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Reads every submission, keeping only the file name of each path.
fn load_documents(paths: &[PathBuf]) -> io::Result<Vec<SubmittedDocument>> {
    paths
        .iter()
        .map(|path| {
            let bytes = fs::read(path).map_err(|e| {
                io::Error::new(e.kind(), format!("'{}': {}", path.display(), e))
            })?;
            Ok(SubmittedDocument::new(file_name(path), bytes))
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn service_config(args: &Args) -> io::Result<ServiceConfig> {
    let mut config = ServiceConfig {
        api_url: args.api_url.clone(),
        api_key: args.api_key.clone(),
        model: args.model.clone(),
        max_tokens: args.max_tokens,
        timeout_secs: args.timeout_secs,
        ..ServiceConfig::default()
    };
    if let Some(path) = &args.rules_file {
        config.instructions = fs::read_to_string(path)?;
    }
    Ok(config)
}

/// Writes `value` as pretty JSON followed by a newline.
fn write_json<T: Serialize, W: Write>(value: &T, mut writer: W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()
}
