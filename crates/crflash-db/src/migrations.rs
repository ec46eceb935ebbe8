use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'manager',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS reports (
            id                        TEXT PRIMARY KEY,
            author_id                 TEXT NOT NULL REFERENCES users(id),
            status                    TEXT NOT NULL DEFAULT 'draft',
            gt_commission             TEXT,
            meeting_date              TEXT,
            agenda                    TEXT,
            meeting_vibe              INTEGER,
            rules_respect             INTEGER,
            discussed_topics          TEXT,
            progress_and_agreements   TEXT,
            issues_and_disagreements  TEXT,
            topics_for_next_meeting   TEXT,
            network_communication     TEXT,
            next_meeting_date         TEXT,
            created_at                TEXT NOT NULL,
            updated_at                TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reports_author
            ON reports(author_id, updated_at);

        -- Append-only audit log; rows are never updated or deleted.
        CREATE TABLE IF NOT EXISTS report_history (
            id          TEXT PRIMARY KEY,
            report_id   TEXT NOT NULL REFERENCES reports(id),
            editor_id   TEXT NOT NULL REFERENCES users(id),
            changes     TEXT NOT NULL,
            edited_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_history_report
            ON report_history(report_id, edited_at);

        CREATE TABLE IF NOT EXISTS gt_commissions (
            id    TEXT PRIMARY KEY,
            name  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS managers (
            id     TEXT PRIMARY KEY,
            name   TEXT NOT NULL,
            email  TEXT NOT NULL
        );

        -- Seed the default commission list
        INSERT OR IGNORE INTO gt_commissions (id, name) VALUES
            ('00000000-0000-0000-0000-000000000001', 'GT Inclusion'),
            ('00000000-0000-0000-0000-000000000002', 'GT Habitat'),
            ('00000000-0000-0000-0000-000000000003', 'GT Emploi'),
            ('00000000-0000-0000-0000-000000000004', 'Commission Finances'),
            ('00000000-0000-0000-0000-000000000005', 'Commission Education'),
            ('00000000-0000-0000-0000-000000000006', 'GT Sante');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
