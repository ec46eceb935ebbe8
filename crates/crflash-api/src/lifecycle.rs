//! Report lifecycle core: ownership checks, the draft→submitted state
//! machine, and the field-level diff audit recorded when a submitted report
//! is edited.
//!
//! Every operation takes the database handle and the caller's verified
//! claims explicitly; there is no ambient session or client singleton.
//! Concurrent edits are last-write-wins: the diff is computed against the
//! state read at the start of the call, without a version token, so two
//! interleaved updates can double-count or miss a change. Known and
//! accepted; statements themselves are serialized behind the connection
//! lock.

use anyhow::anyhow;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crflash_db::models::{ReportRow, ReportUpdate};
use crflash_db::Database;
use crflash_types::api::{Claims, CreateReportRequest, ReportPatch};
use crflash_types::models::{HistoryEntry, Report, ReportStatus, Role};

use crate::error::ApiError;

/// Create a new draft. The author is always the caller; the input carries
/// no author field.
pub fn create(db: &Database, caller: &Claims, req: CreateReportRequest) -> Result<Report, ApiError> {
    validate_rating("meetingVibe", req.meeting_vibe)?;
    validate_rating("rulesRespect", req.rules_respect)?;

    let now = now_rfc3339();
    let row = ReportRow {
        id: Uuid::new_v4().to_string(),
        author_id: caller.sub.to_string(),
        author_name: Some(caller.name.clone()),
        status: ReportStatus::Draft.as_str().to_string(),
        gt_commission: req.gt_commission,
        meeting_date: req.meeting_date,
        agenda: req.agenda,
        meeting_vibe: req.meeting_vibe,
        rules_respect: req.rules_respect,
        discussed_topics: req.discussed_topics,
        progress_and_agreements: req.progress_and_agreements,
        issues_and_disagreements: req.issues_and_disagreements,
        topics_for_next_meeting: req.topics_for_next_meeting,
        network_communication: req.network_communication,
        next_meeting_date: req.next_meeting_date,
        created_at: now.clone(),
        updated_at: now,
    };

    db.insert_report(&row)?;
    report_from_row(row)
}

pub fn read(db: &Database, caller: &Claims, id: Uuid) -> Result<Report, ApiError> {
    let row = fetch_authorized(db, caller, id)?;
    report_from_row(row)
}

/// Partial update. When the report is already submitted, the differing
/// fields are written to the history log first, so `old` values reflect
/// the pre-update state.
pub fn update(
    db: &Database,
    caller: &Claims,
    id: Uuid,
    patch: ReportPatch,
) -> Result<Report, ApiError> {
    validate_rating("meetingVibe", patch.meeting_vibe)?;
    validate_rating("rulesRespect", patch.rules_respect)?;

    let existing = fetch_authorized(db, caller, id)?;
    let status = parse_status(&existing)?;

    if status == ReportStatus::Submitted {
        let changes = compute_changes(&existing, &patch);
        if !changes.is_empty() {
            let changes_json = serde_json::to_string(&changes)
                .map_err(|e| ApiError::Upstream(anyhow!("serializing changes: {}", e)))?;
            db.insert_history(
                &Uuid::new_v4().to_string(),
                &existing.id,
                &caller.sub.to_string(),
                &changes_json,
                &now_rfc3339(),
            )?;
        }
    }

    // The form's save path may carry a status; submission is one-way, so a
    // submitted report never drops back to draft through a patch.
    let status_update = patch
        .status
        .filter(|s| *s == ReportStatus::Submitted)
        .map(|s| s.as_str().to_string());

    let up = ReportUpdate {
        status: status_update,
        gt_commission: patch.gt_commission,
        meeting_date: patch.meeting_date,
        agenda: patch.agenda,
        meeting_vibe: patch.meeting_vibe,
        rules_respect: patch.rules_respect,
        discussed_topics: patch.discussed_topics,
        progress_and_agreements: patch.progress_and_agreements,
        issues_and_disagreements: patch.issues_and_disagreements,
        topics_for_next_meeting: patch.topics_for_next_meeting,
        network_communication: patch.network_communication,
        next_meeting_date: patch.next_meeting_date,
    };
    db.update_report(&existing.id, &up, &now_rfc3339())?;

    let row = db
        .get_report(&existing.id)?
        .ok_or(ApiError::NotFound("report"))?;
    report_from_row(row)
}

/// One-way transition to `submitted`. Idempotent: re-submitting only
/// re-stamps `updatedAt`.
pub fn submit(db: &Database, caller: &Claims, id: Uuid) -> Result<Report, ApiError> {
    let existing = fetch_authorized(db, caller, id)?;

    let up = ReportUpdate {
        status: Some(ReportStatus::Submitted.as_str().to_string()),
        ..Default::default()
    };
    db.update_report(&existing.id, &up, &now_rfc3339())?;

    let row = db
        .get_report(&existing.id)?
        .ok_or(ApiError::NotFound("report"))?;
    report_from_row(row)
}

/// Audit trail for a report, newest edit first, annotated with editor
/// display names.
pub fn history(db: &Database, caller: &Claims, id: Uuid) -> Result<Vec<HistoryEntry>, ApiError> {
    let existing = fetch_authorized(db, caller, id)?;

    let rows = db.history_for_report(&existing.id)?;
    rows.into_iter()
        .map(|row| {
            let changes: Map<String, Value> = serde_json::from_str(&row.changes)
                .map_err(|e| ApiError::Upstream(anyhow!("corrupt changes on {}: {}", row.id, e)))?;
            Ok(HistoryEntry {
                id: parse_uuid(&row.id)?,
                report_id: parse_uuid(&row.report_id)?,
                editor_id: parse_uuid(&row.editor_id)?,
                editor_name: row.editor_name,
                changes,
                edited_at: row.edited_at,
            })
        })
        .collect()
}

/// Admins see everything; managers only their own reports. Newest update
/// first.
pub fn list(db: &Database, caller: &Claims) -> Result<Vec<Report>, ApiError> {
    let author = (caller.role != Role::Admin).then(|| caller.sub.to_string());
    let rows = db.list_reports(author.as_deref())?;
    rows.into_iter().map(report_from_row).collect()
}

fn fetch_authorized(db: &Database, caller: &Claims, id: Uuid) -> Result<ReportRow, ApiError> {
    let row = db
        .get_report(&id.to_string())?
        .ok_or(ApiError::NotFound("report"))?;

    if caller.role != Role::Admin && row.author_id != caller.sub.to_string() {
        return Err(ApiError::Forbidden);
    }

    Ok(row)
}

/// Record `{field: {old, new}}` when the patch carries a value that differs
/// from the stored one. Absent patch fields never diff.
fn diff_field<T>(changes: &mut Map<String, Value>, key: &str, old: &Option<T>, new: &Option<T>)
where
    T: PartialEq + serde::Serialize,
{
    if let Some(n) = new {
        if old.as_ref() != Some(n) {
            changes.insert(key.to_string(), json!({ "old": old, "new": n }));
        }
    }
}

fn compute_changes(existing: &ReportRow, patch: &ReportPatch) -> Map<String, Value> {
    let mut changes = Map::new();
    diff_field(&mut changes, "gtCommission", &existing.gt_commission, &patch.gt_commission);
    diff_field(&mut changes, "meetingDate", &existing.meeting_date, &patch.meeting_date);
    diff_field(&mut changes, "agenda", &existing.agenda, &patch.agenda);
    diff_field(&mut changes, "meetingVibe", &existing.meeting_vibe, &patch.meeting_vibe);
    diff_field(&mut changes, "rulesRespect", &existing.rules_respect, &patch.rules_respect);
    diff_field(&mut changes, "discussedTopics", &existing.discussed_topics, &patch.discussed_topics);
    diff_field(
        &mut changes,
        "progressAndAgreements",
        &existing.progress_and_agreements,
        &patch.progress_and_agreements,
    );
    diff_field(
        &mut changes,
        "issuesAndDisagreements",
        &existing.issues_and_disagreements,
        &patch.issues_and_disagreements,
    );
    diff_field(
        &mut changes,
        "topicsForNextMeeting",
        &existing.topics_for_next_meeting,
        &patch.topics_for_next_meeting,
    );
    diff_field(
        &mut changes,
        "networkCommunication",
        &existing.network_communication,
        &patch.network_communication,
    );
    diff_field(&mut changes, "nextMeetingDate", &existing.next_meeting_date, &patch.next_meeting_date);
    changes
}

fn validate_rating(field: &str, value: Option<i64>) -> Result<(), ApiError> {
    match value {
        Some(v) if !(1..=5).contains(&v) => Err(ApiError::Validation(format!(
            "{field} must be between 1 and 5"
        ))),
        _ => Ok(()),
    }
}

/// RFC 3339 with fixed microsecond width, so lexicographic order on the
/// stored text equals chronological order.
fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse()
        .map_err(|_| ApiError::Upstream(anyhow!("corrupt uuid in store: {}", s)))
}

fn parse_status(row: &ReportRow) -> Result<ReportStatus, ApiError> {
    ReportStatus::parse(&row.status)
        .ok_or_else(|| ApiError::Upstream(anyhow!("corrupt status on {}: {}", row.id, row.status)))
}

fn report_from_row(row: ReportRow) -> Result<Report, ApiError> {
    let status = parse_status(&row)?;
    Ok(Report {
        id: parse_uuid(&row.id)?,
        author_id: parse_uuid(&row.author_id)?,
        author_name: row.author_name,
        status,
        gt_commission: row.gt_commission,
        meeting_date: row.meeting_date,
        agenda: row.agenda,
        meeting_vibe: row.meeting_vibe,
        rules_respect: row.rules_respect,
        discussed_topics: row.discussed_topics,
        progress_and_agreements: row.progress_and_agreements,
        issues_and_disagreements: row.issues_and_disagreements,
        topics_for_next_meeting: row.topics_for_next_meeting,
        network_communication: row.network_communication,
        next_meeting_date: row.next_meeting_date,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    /// Register an account and return the claims a verified token would
    /// carry for it.
    fn signup(db: &Database, name: &str, role: Role) -> Claims {
        let id = Uuid::new_v4();
        let email = format!("{}@example.org", name.to_lowercase().replace(' ', "."));
        db.create_user(&id.to_string(), name, &email, "hash", role.as_str())
            .unwrap();
        Claims {
            sub: id,
            name: name.to_string(),
            email,
            role,
            exp: 0,
        }
    }

    fn sample_request() -> CreateReportRequest {
        CreateReportRequest {
            gt_commission: Some("GT Sante".into()),
            meeting_date: Some("2026-01-15".into()),
            meeting_vibe: Some(4),
            rules_respect: Some(5),
            agenda: Some("<p>Reunion mensuelle</p>".into()),
            ..Default::default()
        }
    }

    #[test]
    fn create_starts_as_draft_owned_by_caller() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);

        let report = create(&db, &marie, sample_request()).unwrap();

        assert_eq!(report.status, ReportStatus::Draft);
        assert_eq!(report.author_id, marie.sub);
        assert_eq!(report.author_name.as_deref(), Some("Marie Dupont"));
        assert_eq!(report.meeting_vibe, Some(4));
        assert_eq!(report.created_at, report.updated_at);
    }

    #[test]
    fn draft_edits_leave_no_history() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let report = create(&db, &marie, sample_request()).unwrap();

        for vibe in [1, 2, 3] {
            let patch = ReportPatch {
                meeting_vibe: Some(vibe),
                ..Default::default()
            };
            update(&db, &marie, report.id, patch).unwrap();
        }

        assert!(history(&db, &marie, report.id).unwrap().is_empty());
        let stored = read(&db, &marie, report.id).unwrap();
        assert_eq!(stored.meeting_vibe, Some(3));
        // Untouched fields survive the partial updates.
        assert_eq!(stored.gt_commission.as_deref(), Some("GT Sante"));
    }

    #[test]
    fn submitted_edit_records_field_diff() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let report = create(&db, &marie, sample_request()).unwrap();

        submit(&db, &marie, report.id).unwrap();
        let patch = ReportPatch {
            meeting_vibe: Some(5),
            ..Default::default()
        };
        let updated = update(&db, &marie, report.id, patch).unwrap();
        assert_eq!(updated.meeting_vibe, Some(5));

        let entries = history(&db, &marie, report.id).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.report_id, report.id);
        assert_eq!(entry.editor_id, marie.sub);
        assert_eq!(entry.editor_name.as_deref(), Some("Marie Dupont"));
        assert_eq!(entry.changes.len(), 1);
        assert_eq!(entry.changes["meetingVibe"], json!({ "old": 4, "new": 5 }));
    }

    #[test]
    fn diff_contains_exactly_the_changed_fields() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let report = create(&db, &marie, sample_request()).unwrap();
        submit(&db, &marie, report.id).unwrap();

        let patch = ReportPatch {
            // same value as stored: must not appear in the diff
            gt_commission: Some("GT Sante".into()),
            agenda: Some("<p>Ordre du jour revise</p>".into()),
            rules_respect: Some(3),
            ..Default::default()
        };
        update(&db, &marie, report.id, patch).unwrap();

        let entries = history(&db, &marie, report.id).unwrap();
        assert_eq!(entries.len(), 1);
        let changes = &entries[0].changes;
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes["agenda"],
            json!({ "old": "<p>Reunion mensuelle</p>", "new": "<p>Ordre du jour revise</p>" })
        );
        assert_eq!(changes["rulesRespect"], json!({ "old": 5, "new": 3 }));
    }

    #[test]
    fn identical_patch_refreshes_timestamp_without_history() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let report = create(&db, &marie, sample_request()).unwrap();
        submit(&db, &marie, report.id).unwrap();
        let before = read(&db, &marie, report.id).unwrap();

        sleep(Duration::from_millis(2));
        let patch = ReportPatch {
            meeting_vibe: Some(4),
            gt_commission: Some("GT Sante".into()),
            ..Default::default()
        };
        let after = update(&db, &marie, report.id, patch).unwrap();

        assert!(history(&db, &marie, report.id).unwrap().is_empty());
        assert_ne!(after.updated_at, before.updated_at);
    }

    #[test]
    fn submit_is_idempotent() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let report = create(&db, &marie, sample_request()).unwrap();

        let first = submit(&db, &marie, report.id).unwrap();
        assert_eq!(first.status, ReportStatus::Submitted);

        sleep(Duration::from_millis(2));
        let second = submit(&db, &marie, report.id).unwrap();
        assert_eq!(second.status, ReportStatus::Submitted);
        assert_ne!(second.updated_at, first.updated_at);
        assert!(history(&db, &marie, report.id).unwrap().is_empty());
    }

    #[test]
    fn patch_cannot_revert_submission() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let report = create(&db, &marie, sample_request()).unwrap();
        submit(&db, &marie, report.id).unwrap();

        let patch = ReportPatch {
            status: Some(ReportStatus::Draft),
            ..Default::default()
        };
        let after = update(&db, &marie, report.id, patch).unwrap();
        assert_eq!(after.status, ReportStatus::Submitted);
    }

    #[test]
    fn patch_status_can_submit_a_draft() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let report = create(&db, &marie, sample_request()).unwrap();

        let patch = ReportPatch {
            status: Some(ReportStatus::Submitted),
            ..Default::default()
        };
        let after = update(&db, &marie, report.id, patch).unwrap();
        assert_eq!(after.status, ReportStatus::Submitted);
        // The edit happened while the report was still a draft: no audit.
        assert!(history(&db, &marie, report.id).unwrap().is_empty());
    }

    #[test]
    fn non_owner_manager_is_forbidden() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let jean = signup(&db, "Jean Martin", Role::Manager);
        let report = create(&db, &marie, sample_request()).unwrap();

        assert!(matches!(read(&db, &jean, report.id), Err(ApiError::Forbidden)));
        assert!(matches!(
            update(&db, &jean, report.id, ReportPatch::default()),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(submit(&db, &jean, report.id), Err(ApiError::Forbidden)));
        assert!(matches!(history(&db, &jean, report.id), Err(ApiError::Forbidden)));
    }

    #[test]
    fn admin_overrides_ownership() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let admin = signup(&db, "Admin Principal", Role::Admin);
        let report = create(&db, &marie, sample_request()).unwrap();

        read(&db, &admin, report.id).unwrap();
        submit(&db, &admin, report.id).unwrap();
        let patch = ReportPatch {
            agenda: Some("<p>Corrige par l'admin</p>".into()),
            ..Default::default()
        };
        update(&db, &admin, report.id, patch).unwrap();

        let entries = history(&db, &admin, report.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].editor_id, admin.sub);
    }

    #[test]
    fn missing_report_is_not_found() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let id = Uuid::new_v4();

        assert!(matches!(read(&db, &marie, id), Err(ApiError::NotFound("report"))));
        assert!(matches!(
            update(&db, &marie, id, ReportPatch::default()),
            Err(ApiError::NotFound("report"))
        ));
        assert!(matches!(submit(&db, &marie, id), Err(ApiError::NotFound("report"))));
        assert!(matches!(history(&db, &marie, id), Err(ApiError::NotFound("report"))));
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);

        let req = CreateReportRequest {
            meeting_vibe: Some(6),
            ..Default::default()
        };
        assert!(matches!(create(&db, &marie, req), Err(ApiError::Validation(_))));

        let report = create(&db, &marie, sample_request()).unwrap();
        let patch = ReportPatch {
            rules_respect: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            update(&db, &marie, report.id, patch),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn list_scopes_to_author_and_orders_by_update() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let jean = signup(&db, "Jean Martin", Role::Manager);
        let admin = signup(&db, "Admin Principal", Role::Admin);

        let first = create(&db, &marie, sample_request()).unwrap();
        sleep(Duration::from_millis(2));
        let second = create(&db, &marie, sample_request()).unwrap();
        sleep(Duration::from_millis(2));
        create(&db, &jean, sample_request()).unwrap();

        let jeans = list(&db, &jean).unwrap();
        assert_eq!(jeans.len(), 1);
        assert_eq!(jeans[0].author_name.as_deref(), Some("Jean Martin"));

        let maries = list(&db, &marie).unwrap();
        assert_eq!(maries.len(), 2);
        assert_eq!(maries[0].id, second.id);

        // Touching the older report moves it to the front.
        sleep(Duration::from_millis(2));
        let patch = ReportPatch {
            agenda: Some("<p>Mis a jour</p>".into()),
            ..Default::default()
        };
        update(&db, &marie, first.id, patch).unwrap();
        let maries = list(&db, &marie).unwrap();
        assert_eq!(maries[0].id, first.id);

        assert_eq!(list(&db, &admin).unwrap().len(), 3);
    }

    #[test]
    fn history_is_newest_first_with_editor_names() {
        let db = test_db();
        let marie = signup(&db, "Marie Dupont", Role::Manager);
        let admin = signup(&db, "Admin Principal", Role::Admin);
        let report = create(&db, &marie, sample_request()).unwrap();
        submit(&db, &marie, report.id).unwrap();

        let patch = ReportPatch {
            meeting_vibe: Some(5),
            ..Default::default()
        };
        update(&db, &marie, report.id, patch).unwrap();
        sleep(Duration::from_millis(2));
        let patch = ReportPatch {
            meeting_vibe: Some(2),
            ..Default::default()
        };
        update(&db, &admin, report.id, patch).unwrap();

        let entries = history(&db, &marie, report.id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].editor_name.as_deref(), Some("Admin Principal"));
        assert_eq!(entries[0].changes["meetingVibe"], json!({ "old": 5, "new": 2 }));
        assert_eq!(entries[1].editor_name.as_deref(), Some("Marie Dupont"));
        assert!(entries[0].edited_at > entries[1].edited_at);
    }
}
