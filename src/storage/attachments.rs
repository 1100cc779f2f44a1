use rusqlite::{params, Connection, Result};

use super::models::{Attachment, AttachmentKind};

/// Stores a file reference for a task. A file already attached is ignored.
///
/// Returns true when a new row was written.
pub fn add_attachment(conn: &Connection, task_id: i64, file_id: &str, kind: AttachmentKind) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO task_attachments (task_id, file_id, kind) VALUES (?1, ?2, ?3)",
        params![task_id, file_id, kind.as_ref()],
    )?;
    Ok(affected > 0)
}

/// Attachments of a task in the order they were added.
pub fn get_attachments(conn: &Connection, task_id: i64) -> Result<Vec<Attachment>> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, file_id, kind FROM task_attachments WHERE task_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([task_id], Attachment::from_row)?;
    rows.collect()
}
