//! Mail domain model — messages modeled as `type=message` beads.

/// Parameters for `SendMail`.
#[derive(Debug, Clone)]
pub struct NewMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A delivered message, as returned by `CheckMail`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MailMessage {
    pub bead_id: String,
    pub from: Option<String>,
    pub subject: String,
    pub body: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Witness liveness-probe mail subject.
pub const GUPP_CHECK_SUBJECT: &str = "GUPP_CHECK";
