/// Database row types — these map directly to SQLite rows.
/// Distinct from wall-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct SubmissionRow {
    pub id: String,
    pub name: Option<String>,
    pub message: String,
    pub wallet: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub created_at: String,
}

/// Rows removed by `Database::clear_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearedRows {
    pub submissions: usize,
    pub messages: usize,
}
