use crate::Database;
use crate::models::{ClearedRows, MessageRow, SubmissionRow};
use anyhow::Result;
use rusqlite::Connection;

/// Stored timestamp layout. Fixed width, so string order is time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

impl Database {
    // -- Submissions --

    /// Append a submission. `created_at` is assigned under the write lock and
    /// never goes backwards relative to the previously stored row.
    pub fn insert_submission(
        &self,
        id: &str,
        name: Option<&str>,
        message: &str,
        wallet: Option<&str>,
    ) -> Result<SubmissionRow> {
        self.with_conn_mut(|conn| {
            let created_at = next_timestamp(conn, "submissions")?;
            conn.execute(
                "INSERT INTO submissions (id, name, message, wallet, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, message, wallet, created_at],
            )?;
            Ok(SubmissionRow {
                id: id.to_string(),
                name: name.map(str::to_string),
                message: message.to_string(),
                wallet: wallet.map(str::to_string),
                created_at,
            })
        })
    }

    pub fn recent_submissions(&self, limit: u32) -> Result<Vec<SubmissionRow>> {
        self.with_conn(|conn| query_recent_submissions(conn, limit))
    }

    /// Total rows across `submissions` and the legacy `messages` table.
    pub fn count_all(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let submissions: i64 =
                conn.query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?;
            let messages: i64 =
                conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok((submissions.max(0) + messages.max(0)) as u64)
        })
    }

    // -- Legacy messages --

    pub fn insert_legacy_message(&self, id: &str, text: &str) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let created_at = next_timestamp(conn, "messages")?;
            conn.execute(
                "INSERT INTO messages (id, text, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, text, created_at],
            )?;
            Ok(MessageRow {
                id: id.to_string(),
                text: text.to_string(),
                created_at,
            })
        })
    }

    // -- Administration --

    /// Delete every row from both tables in one transaction.
    /// Not reachable from the HTTP surface.
    pub fn clear_all(&self) -> Result<ClearedRows> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let submissions = tx.execute("DELETE FROM submissions", [])?;
            let messages = tx.execute("DELETE FROM messages", [])?;
            tx.commit()?;
            Ok(ClearedRows {
                submissions,
                messages,
            })
        })
    }
}

fn query_recent_submissions(conn: &Connection, limit: u32) -> Result<Vec<SubmissionRow>> {
    // rowid breaks ties between rows stamped within the same microsecond
    let mut stmt = conn.prepare(
        "SELECT id, name, message, wallet, created_at
         FROM submissions
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(SubmissionRow {
                id: row.get(0)?,
                name: row.get(1)?,
                message: row.get(2)?,
                wallet: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Current time, clamped to the newest `created_at` already in `table`.
fn next_timestamp(conn: &Connection, table: &str) -> Result<String> {
    let now = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
    let latest: Option<String> = conn.query_row(
        &format!("SELECT MAX(created_at) FROM {}", table),
        [],
        |row| row.get(0),
    )?;

    Ok(match latest {
        Some(latest) if latest > now => latest,
        _ => now,
    })
}
