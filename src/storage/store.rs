use anyhow::Result;
use chrono::Utc;

use super::db;
use super::session_data::{CumulativeResult, SessionResult};

/// Save a session record and, once enough sessions exist, a fresh
/// cumulative summary. Returns the new summary if one was written.
pub fn save_session(session: &SessionResult) -> Result<Option<CumulativeResult>> {
    let conn = db::open_db()?;
    db::save_session_result(&conn, session)?;

    let sessions = db::list_session_results(&conn)?;
    let cumulative = CumulativeResult::from_sessions(&sessions, Utc::now());
    if let Some(ref c) = cumulative {
        db::save_cumulative(&conn, c)?;
        tracing::info!(grade = %c.overall_grade, "cumulative result updated");
    }
    Ok(cumulative)
}

pub fn load_session(session_id: &str) -> Result<SessionResult> {
    let conn = db::open_db()?;
    db::load_session_result(&conn, session_id)
}

/// All stored sessions, oldest first.
pub fn list_sessions() -> Result<Vec<SessionResult>> {
    let conn = db::open_db()?;
    db::list_session_results(&conn)
}

pub fn latest_cumulative() -> Result<Option<CumulativeResult>> {
    let conn = db::open_db()?;
    db::latest_cumulative(&conn)
}
