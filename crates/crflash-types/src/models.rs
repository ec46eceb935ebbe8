use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Report lifecycle: a report is created as `Draft` and moves to `Submitted`
/// exactly once. There is no transition back; edits after submission are
/// allowed but audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Submitted,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ReportStatus::Draft),
            "submitted" => Some(ReportStatus::Submitted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// A flash meeting report. Content fields are nullable: the form saves
/// drafts incrementally. Rich-text fields carry HTML from the client-side
/// editor and are opaque to the server; dates are opaque strings too.
/// Timestamps are RFC 3339 text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub status: ReportStatus,
    pub gt_commission: Option<String>,
    pub meeting_date: Option<String>,
    pub agenda: Option<String>,
    pub meeting_vibe: Option<i64>,
    pub rules_respect: Option<i64>,
    pub discussed_topics: Option<String>,
    pub progress_and_agreements: Option<String>,
    pub issues_and_disagreements: Option<String>,
    pub topics_for_next_meeting: Option<String>,
    pub network_communication: Option<String>,
    pub next_meeting_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One audit record for an edit to a submitted report. `changes` maps
/// camelCase field names to `{old, new}` pairs captured against the
/// pre-update state. Entries are append-only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub report_id: Uuid,
    pub editor_id: Uuid,
    pub editor_name: Option<String>,
    pub changes: serde_json::Map<String, serde_json::Value>,
    pub edited_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Commission {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Manager {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
