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

//! Alerts and the per-batch exception log.
//!
//! The log is append-only and keeps processing order. It holds two views:
//! every [`Alert`] (rejections, balance repairs, stamping failures) for the
//! ledger artifact, and the [`Rejection`] list alone for the exception report.

use crate::base::Reference;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

/// Why a unit produced no ledger entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// Transport failure, timeout or non-success status from the service.
    ServiceError,
    /// The service answered with something that is not a valid payload.
    InvalidResponse,
    /// The service judged the document unusable, with its stated reason.
    Unusable(String),
}

impl RejectionReason {
    pub const DEFAULT_UNUSABLE: &'static str = "unusable document";

    /// The service's own reason, or the default one when it gave none.
    pub fn unusable(reason: Option<String>) -> Self {
        match reason {
            Some(reason) if !reason.trim().is_empty() => Self::Unusable(reason.trim().to_string()),
            _ => Self::Unusable(Self::DEFAULT_UNUSABLE.to_string()),
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceError => f.write_str("service error"),
            Self::InvalidResponse => f.write_str("invalid response"),
            Self::Unusable(reason) => f.write_str(reason),
        }
    }
}

impl Serialize for RejectionReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A rejected unit, as listed in the exception report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub filename: String,
    pub reason: RejectionReason,
}

/// One reportable anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Rejected {
        filename: String,
        reason: RejectionReason,
    },
    /// A group failed the balance check. `repaired` is false when it had no
    /// bank line to adjust and was kept unbalanced.
    Imbalance {
        reference: Reference,
        filename: String,
        total_debit: Decimal,
        total_credit: Decimal,
        repaired: bool,
    },
    StampFailed {
        reference: Reference,
        filename: String,
        reason: String,
    },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { filename, reason } => write!(f, "!! {filename}: {reason}"),
            Self::Imbalance {
                reference,
                filename,
                total_debit,
                total_credit,
                repaired,
            } => {
                write!(
                    f,
                    "{reference} ({filename}): imbalance detected ({:.2} != {:.2})",
                    total_debit, total_credit
                )?;
                if !repaired {
                    f.write_str(", no bank line to adjust")?;
                }
                Ok(())
            }
            Self::StampFailed {
                reference,
                filename,
                reason,
            } => write!(f, "{reference} ({filename}): stamp failed: {reason}"),
        }
    }
}

impl Serialize for Alert {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Append-only record of every alert and rejection of a batch.
#[derive(Debug, Default)]
pub struct ExceptionLog {
    alerts: Vec<Alert>,
    rejections: Vec<Rejection>,
}

impl ExceptionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rejected unit in both the alert list and the rejection list.
    pub fn reject(&mut self, filename: &str, reason: RejectionReason) {
        self.alerts.push(Alert::Rejected {
            filename: filename.to_string(),
            reason: reason.clone(),
        });
        self.rejections.push(Rejection {
            filename: filename.to_string(),
            reason,
        });
    }

    pub fn record(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejection_reason_display() {
        assert_eq!(RejectionReason::ServiceError.to_string(), "service error");
        assert_eq!(RejectionReason::InvalidResponse.to_string(), "invalid response");
        assert_eq!(
            RejectionReason::Unusable("illisible".to_string()).to_string(),
            "illisible"
        );
    }

    #[test]
    fn unusable_without_reason_uses_default() {
        assert_eq!(
            RejectionReason::unusable(None),
            RejectionReason::Unusable("unusable document".to_string())
        );
        assert_eq!(
            RejectionReason::unusable(Some("  ".to_string())),
            RejectionReason::Unusable("unusable document".to_string())
        );
    }

    #[test]
    fn alert_display_messages() {
        let rejected = Alert::Rejected {
            filename: "scan_page2.pdf".to_string(),
            reason: RejectionReason::InvalidResponse,
        };
        assert_eq!(rejected.to_string(), "!! scan_page2.pdf: invalid response");

        let repaired = Alert::Imbalance {
            reference: Reference(2),
            filename: "b.pdf".to_string(),
            total_debit: dec!(25.00),
            total_credit: dec!(20.00),
            repaired: true,
        };
        assert_eq!(
            repaired.to_string(),
            "T2 (b.pdf): imbalance detected (25.00 != 20.00)"
        );

        let unrepaired = Alert::Imbalance {
            reference: Reference(3),
            filename: "c.pdf".to_string(),
            total_debit: dec!(25),
            total_credit: dec!(20),
            repaired: false,
        };
        assert_eq!(
            unrepaired.to_string(),
            "T3 (c.pdf): imbalance detected (25.00 != 20.00), no bank line to adjust"
        );
    }

    #[test]
    fn log_keeps_order_and_splits_rejections() {
        let mut log = ExceptionLog::new();
        log.reject("a.pdf", RejectionReason::ServiceError);
        log.record(Alert::StampFailed {
            reference: Reference(1),
            filename: "b.pdf".to_string(),
            reason: "bad xref".to_string(),
        });
        log.reject("c.pdf", RejectionReason::unusable(Some("illisible".to_string())));

        assert_eq!(log.alerts().len(), 3);
        assert_eq!(log.rejections().len(), 2);
        assert_eq!(log.rejections()[0].filename, "a.pdf");
        assert_eq!(log.rejections()[1].filename, "c.pdf");
        assert!(log.alerts()[2].to_string().starts_with("!! c.pdf"));
    }
}
