use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ReportStatus, Role, User};

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the login endpoint.
/// Canonical definition lives here in crflash-types so both sides agree on
/// the payload shape. The lifecycle core treats verified claims as the
/// caller's identity and never looks past these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// -- Reports --

/// Create input. There is deliberately no author field: the author is always
/// the verified caller. Unknown keys (an echoed author id included) are
/// ignored, not rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
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

/// Partial update: `None` means "field absent, leave it untouched".
/// Clearing a stored value to NULL is not expressible here; the form always
/// sends strings. `status` may be carried by the form's save-and-resubmit
/// path; it is applied but never diffed into history.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    pub status: Option<ReportStatus>,
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

// -- Reference data --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommissionRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerRequest {
    pub name: String,
    pub email: String,
}
