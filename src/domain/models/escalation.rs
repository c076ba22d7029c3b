//! Escalation domain model — `escalation_metadata` satellite.
//!
//! Optional: may be absent on open escalations that were created as a plain
//! bead (e.g. via `POST escalations`) before the caller attaches severity
//! detail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationMetadata {
    pub bead_id: String,
    pub severity: Severity,
    pub category: Option<String>,
    pub acknowledged: bool,
    pub re_escalation_count: u32,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Parameters for `POST escalations`.
#[derive(Debug, Clone)]
pub struct NewEscalation {
    pub title: String,
    pub body: Option<String>,
    pub priority: Option<super::bead::Priority>,
    pub metadata: Option<serde_json::Value>,
}
