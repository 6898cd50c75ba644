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

//! Anthropic Messages API backend for the extraction service.

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::extraction::{ExtractionRequest, ExtractionService};
use crate::instructions::{DOCUMENT_PROMPT, TEXT_PROMPT};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const API_VERSION: &str = "2023-06-01";

/// Blocking HTTP client for the Messages endpoint.
#[derive(Debug)]
pub struct AnthropicClient {
    config: ServiceConfig,
    client: reqwest::blocking::Client,
}

impl AnthropicClient {
    /// # Errors
    ///
    /// [`ServiceError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn body(&self, request: &ExtractionRequest<'_>) -> MessagesRequest<'_> {
        let content = match request {
            ExtractionRequest::Text(text) => vec![ContentBlock::Text {
                text: format!("{TEXT_PROMPT}\n\n{text}"),
            }],
            ExtractionRequest::Document(bytes) => vec![
                ContentBlock::Document {
                    source: DocumentSource {
                        kind: "base64",
                        media_type: "application/pdf",
                        data: STANDARD.encode(bytes),
                    },
                },
                ContentBlock::Text {
                    text: DOCUMENT_PROMPT.to_string(),
                },
            ],
        };
        MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: &self.config.instructions,
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Document { source: DocumentSource },
}

#[derive(Serialize)]
struct DocumentSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ExtractionService for AnthropicClient {
    fn complete(&self, request: &ExtractionRequest<'_>) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(request))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(self.config.timeout_secs)
                } else {
                    ServiceError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(self.config.timeout_secs)
            } else {
                ServiceError::Transport(e.to_string())
            }
        })?;

        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or(ServiceError::EmptyResponse)
    }
}
