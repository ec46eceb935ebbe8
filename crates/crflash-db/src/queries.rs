use crate::models::{CommissionRow, HistoryRow, ManagerRow, ReportRow, ReportUpdate, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

const REPORT_COLUMNS: &str = "r.id, r.author_id, u.name, r.status, r.gt_commission, r.meeting_date,
     r.agenda, r.meeting_vibe, r.rules_respect, r.discussed_topics,
     r.progress_and_agreements, r.issues_and_disagreements,
     r.topics_for_next_meeting, r.network_communication, r.next_meeting_date,
     r.created_at, r.updated_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, email, password_hash, role],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn user_count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    // -- Reports --

    pub fn insert_report(&self, report: &ReportRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (
                     id, author_id, status, gt_commission, meeting_date, agenda,
                     meeting_vibe, rules_respect, discussed_topics,
                     progress_and_agreements, issues_and_disagreements,
                     topics_for_next_meeting, network_communication,
                     next_meeting_date, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                rusqlite::params![
                    report.id,
                    report.author_id,
                    report.status,
                    report.gt_commission,
                    report.meeting_date,
                    report.agenda,
                    report.meeting_vibe,
                    report.rules_respect,
                    report.discussed_topics,
                    report.progress_and_agreements,
                    report.issues_and_disagreements,
                    report.topics_for_next_meeting,
                    report.network_communication,
                    report.next_meeting_date,
                    report.created_at,
                    report.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_report(&self, id: &str) -> Result<Option<ReportRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REPORT_COLUMNS}
                 FROM reports r
                 LEFT JOIN users u ON r.author_id = u.id
                 WHERE r.id = ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], report_from_row).optional()?;
            Ok(row)
        })
    }

    /// All reports, or one author's, newest update first. The JOIN fetches
    /// the author display name in a single query (eliminates N+1).
    pub fn list_reports(&self, author_id: Option<&str>) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let rows = match author_id {
                Some(author) => {
                    let sql = format!(
                        "SELECT {REPORT_COLUMNS}
                         FROM reports r
                         LEFT JOIN users u ON r.author_id = u.id
                         WHERE r.author_id = ?1
                         ORDER BY r.updated_at DESC"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    stmt.query_map([author], report_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let sql = format!(
                        "SELECT {REPORT_COLUMNS}
                         FROM reports r
                         LEFT JOIN users u ON r.author_id = u.id
                         ORDER BY r.updated_at DESC"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    stmt.query_map([], report_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    /// Partial update: only the `Some` assignments are written, plus
    /// `updated_at` which is stamped on every call. The SET clause is built
    /// dynamically the same way the IN-list placeholders are elsewhere.
    pub fn update_report(&self, id: &str, up: &ReportUpdate, updated_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

            if let Some(v) = &up.status {
                sets.push("status = ?");
                params.push(v);
            }
            if let Some(v) = &up.gt_commission {
                sets.push("gt_commission = ?");
                params.push(v);
            }
            if let Some(v) = &up.meeting_date {
                sets.push("meeting_date = ?");
                params.push(v);
            }
            if let Some(v) = &up.agenda {
                sets.push("agenda = ?");
                params.push(v);
            }
            if let Some(v) = &up.meeting_vibe {
                sets.push("meeting_vibe = ?");
                params.push(v);
            }
            if let Some(v) = &up.rules_respect {
                sets.push("rules_respect = ?");
                params.push(v);
            }
            if let Some(v) = &up.discussed_topics {
                sets.push("discussed_topics = ?");
                params.push(v);
            }
            if let Some(v) = &up.progress_and_agreements {
                sets.push("progress_and_agreements = ?");
                params.push(v);
            }
            if let Some(v) = &up.issues_and_disagreements {
                sets.push("issues_and_disagreements = ?");
                params.push(v);
            }
            if let Some(v) = &up.topics_for_next_meeting {
                sets.push("topics_for_next_meeting = ?");
                params.push(v);
            }
            if let Some(v) = &up.network_communication {
                sets.push("network_communication = ?");
                params.push(v);
            }
            if let Some(v) = &up.next_meeting_date {
                sets.push("next_meeting_date = ?");
                params.push(v);
            }

            sets.push("updated_at = ?");
            params.push(&updated_at);
            params.push(&id);

            let sql = format!("UPDATE reports SET {} WHERE id = ?", sets.join(", "));
            conn.execute(&sql, params.as_slice())?;
            Ok(())
        })
    }

    // -- History --

    pub fn insert_history(
        &self,
        id: &str,
        report_id: &str,
        editor_id: &str,
        changes_json: &str,
        edited_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO report_history (id, report_id, editor_id, changes, edited_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, report_id, editor_id, changes_json, edited_at],
            )?;
            Ok(())
        })
    }

    pub fn history_for_report(&self, report_id: &str) -> Result<Vec<HistoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT h.id, h.report_id, h.editor_id, u.name, h.changes, h.edited_at
                 FROM report_history h
                 LEFT JOIN users u ON h.editor_id = u.id
                 WHERE h.report_id = ?1
                 ORDER BY h.edited_at DESC",
            )?;

            let rows = stmt
                .query_map([report_id], |row| {
                    Ok(HistoryRow {
                        id: row.get(0)?,
                        report_id: row.get(1)?,
                        editor_id: row.get(2)?,
                        editor_name: row.get(3)?,
                        changes: row.get(4)?,
                        edited_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Commissions --

    pub fn list_commissions(&self) -> Result<Vec<CommissionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM gt_commissions ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CommissionRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_commission(&self, id: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO gt_commissions (id, name) VALUES (?1, ?2)",
                rusqlite::params![id, name],
            )?;
            Ok(())
        })
    }

    /// Returns false when no row matched the id.
    pub fn update_commission(&self, id: &str, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE gt_commissions SET name = ?2 WHERE id = ?1",
                rusqlite::params![id, name],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_commission(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM gt_commissions WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Managers directory --

    pub fn list_managers(&self) -> Result<Vec<ManagerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, email FROM managers ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ManagerRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_manager(&self, id: &str, name: &str, email: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO managers (id, name, email) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, name, email],
            )?;
            Ok(())
        })
    }

    pub fn update_manager(&self, id: &str, name: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE managers SET name = ?2, email = ?3 WHERE id = ?1",
                rusqlite::params![id, name, email],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_manager(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM managers WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is one of our own literals, never caller input
    let sql = format!(
        "SELECT id, name, email, password, role, created_at FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn report_from_row(row: &rusqlite::Row) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row.get(2)?,
        status: row.get(3)?,
        gt_commission: row.get(4)?,
        meeting_date: row.get(5)?,
        agenda: row.get(6)?,
        meeting_vibe: row.get(7)?,
        rules_respect: row.get(8)?,
        discussed_topics: row.get(9)?,
        progress_and_agreements: row.get(10)?,
        issues_and_disagreements: row.get(11)?,
        topics_for_next_meeting: row.get(12)?,
        network_communication: row.get(13)?,
        next_meeting_date: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn user_roundtrip() {
        let db = test_db();
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, "Marie Dupont", "marie@example.org", "hash", "manager")
            .unwrap();

        let by_email = db.get_user_by_email("marie@example.org").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.role, "manager");

        let by_id = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(by_id.email, "marie@example.org");

        assert!(db.get_user_by_email("nobody@example.org").unwrap().is_none());
        assert_eq!(db.user_count().unwrap(), 1);
    }

    #[test]
    fn commission_crud() {
        let db = test_db();
        let seeded = db.list_commissions().unwrap().len();

        let id = Uuid::new_v4().to_string();
        db.insert_commission(&id, "GT Culture").unwrap();
        assert_eq!(db.list_commissions().unwrap().len(), seeded + 1);

        assert!(db.update_commission(&id, "GT Culture et Sport").unwrap());
        assert!(!db.update_commission("missing", "x").unwrap());

        assert!(db.delete_commission(&id).unwrap());
        assert!(!db.delete_commission(&id).unwrap());
    }

    #[test]
    fn manager_crud() {
        let db = test_db();
        let id = Uuid::new_v4().to_string();
        db.insert_manager(&id, "Sophie Bernard", "sophie@example.org")
            .unwrap();

        let listed = db.list_managers().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].email, "sophie@example.org");

        assert!(db.update_manager(&id, "Sophie B.", "sb@example.org").unwrap());
        assert!(db.delete_manager(&id).unwrap());
        assert!(!db.delete_manager(&id).unwrap());
    }

    #[test]
    fn migrations_seed_commissions_once() {
        let db = test_db();
        let first = db.list_commissions().unwrap().len();
        assert!(first >= 6);
        // Re-running migrations must not duplicate the seed rows.
        db.with_conn(|conn| crate::migrations::run(conn)).unwrap();
        assert_eq!(db.list_commissions().unwrap().len(), first);
    }
}
