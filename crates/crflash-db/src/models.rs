/// Database row types — these map directly to SQLite rows.
/// Distinct from the crflash-types API models to keep the DB layer
/// independent; columns are snake_case, timestamps are RFC 3339 text.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct ReportRow {
    pub id: String,
    pub author_id: String,
    /// Display name from the LEFT JOIN against users; None if the author
    /// account no longer exists.
    pub author_name: Option<String>,
    pub status: String,
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

pub struct HistoryRow {
    pub id: String,
    pub report_id: String,
    pub editor_id: String,
    pub editor_name: Option<String>,
    /// JSON object text: field name -> { old, new }.
    pub changes: String,
    pub edited_at: String,
}

pub struct CommissionRow {
    pub id: String,
    pub name: String,
}

pub struct ManagerRow {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Column assignments for a partial report update. `None` fields are left
/// untouched; `updated_at` is passed separately because it is set on every
/// update.
#[derive(Default)]
pub struct ReportUpdate {
    pub status: Option<String>,
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
}
