use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use super::session_data::{CumulativeResult, SessionResult};

/// Open (or create) the SQLite database at the configured path.
pub fn open_db() -> Result<Connection> {
    let path = crate::paths::db_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let conn = Connection::open(&path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .context("Failed to set database pragmas")?;

    init_schema(&conn)?;
    Ok(conn)
}

/// Create tables if they don't exist. Idempotent.
///
/// Records are stored as JSON blobs; the indexed columns exist only for
/// lookup and ordering.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS session_results (
            id INTEGER PRIMARY KEY,
            session_id TEXT NOT NULL UNIQUE,
            completed_at TEXT NOT NULL,
            data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_session_results_completed
            ON session_results(completed_at);

        CREATE TABLE IF NOT EXISTS cumulative_results (
            id INTEGER PRIMARY KEY,
            computed_at TEXT NOT NULL,
            data TEXT NOT NULL
        );",
    )
    .context("Failed to initialize database schema")?;

    Ok(())
}

/// Insert or replace a session record, keyed by its session id.
pub fn save_session_result(conn: &Connection, session: &SessionResult) -> Result<()> {
    let json = serde_json::to_string(session).context("Failed to serialize session result")?;

    conn.execute(
        "INSERT INTO session_results (session_id, completed_at, data)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(session_id) DO UPDATE SET
            completed_at = ?2,
            data = ?3",
        rusqlite::params![session.session_id, session.completed_at.to_rfc3339(), json],
    )
    .with_context(|| format!("Failed to save session {}", session.session_id))?;

    tracing::debug!(session_id = %session.session_id, "session result saved");
    Ok(())
}

pub fn load_session_result(conn: &Connection, session_id: &str) -> Result<SessionResult> {
    let json: String = conn
        .query_row(
            "SELECT data FROM session_results WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )
        .with_context(|| format!("No session found with id: {session_id}"))?;

    serde_json::from_str(&json).with_context(|| format!("Failed to parse session {session_id}"))
}

/// All session records, oldest first.
pub fn list_session_results(conn: &Connection) -> Result<Vec<SessionResult>> {
    let mut stmt = conn
        .prepare("SELECT session_id, data FROM session_results ORDER BY completed_at, id")
        .context("Failed to prepare list query")?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .context("Failed to list sessions")?;

    let mut sessions = Vec::new();
    for row in rows {
        let (session_id, json) = row.context("Failed to read session row")?;
        let session = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse session {session_id}"))?;
        sessions.push(session);
    }

    Ok(sessions)
}

pub fn count_session_results(conn: &Connection) -> Result<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM session_results", [], |row| row.get(0))
        .context("Failed to count sessions")?;
    Ok(count.max(0) as usize)
}

pub fn save_cumulative(conn: &Connection, cumulative: &CumulativeResult) -> Result<()> {
    let json = serde_json::to_string(cumulative).context("Failed to serialize cumulative result")?;

    conn.execute(
        "INSERT INTO cumulative_results (computed_at, data) VALUES (?1, ?2)",
        rusqlite::params![cumulative.computed_at.to_rfc3339(), json],
    )
    .context("Failed to save cumulative result")?;

    Ok(())
}

/// The most recently stored cumulative result, if any.
pub fn latest_cumulative(conn: &Connection) -> Result<Option<CumulativeResult>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT data FROM cumulative_results ORDER BY computed_at DESC, id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query cumulative results")?;

    match json {
        Some(j) => {
            let val = serde_json::from_str(&j).context("Failed to parse cumulative result")?;
            Ok(Some(val))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Grade;
    use crate::storage::session_data::NoteResult;
    use chrono::{DateTime, Duration, Utc};

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-15T18:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn sample_session(id: &str, day: i64, score: f64) -> SessionResult {
        SessionResult::from_notes(
            id.into(),
            "G3".into(),
            vec![NoteResult {
                degree: 3,
                solfege: "mi".into(),
                target_freq: 246.94,
                detected_freq: 247.5,
                accuracy: score,
                score,
                grade: Grade::from_score(score),
                direction_correct: true,
            }],
            start() + Duration::days(day),
            300.0,
        )
    }

    #[test]
    fn schema_creation_idempotent() {
        let conn = test_db();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn roundtrip_save_load() {
        let conn = test_db();
        let session = sample_session("2026-01-15-G3", 0, 82.0);

        save_session_result(&conn, &session).unwrap();
        let loaded = load_session_result(&conn, "2026-01-15-G3").unwrap();

        assert_eq!(loaded, session);
        assert_eq!(loaded.note_results[0].solfege, "mi");
    }

    #[test]
    fn load_nonexistent_session() {
        let conn = test_db();
        assert!(load_session_result(&conn, "missing").is_err());
    }

    #[test]
    fn list_sessions_sorted_by_completion() {
        let conn = test_db();

        // Insert out of order
        for (id, day) in [("c", 3), ("a", 1), ("b", 2)] {
            save_session_result(&conn, &sample_session(id, day, 70.0)).unwrap();
        }

        let ids: Vec<String> = list_session_results(&conn)
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(count_session_results(&conn).unwrap(), 3);
    }

    #[test]
    fn upsert_overwrites_same_id() {
        let conn = test_db();
        save_session_result(&conn, &sample_session("s", 0, 50.0)).unwrap();
        save_session_result(&conn, &sample_session("s", 0, 95.0)).unwrap();

        let loaded = load_session_result(&conn, "s").unwrap();
        assert!((loaded.accuracy - 95.0).abs() < 1e-9);
        assert_eq!(count_session_results(&conn).unwrap(), 1);
    }

    #[test]
    fn latest_cumulative_roundtrip() {
        let conn = test_db();
        assert!(latest_cumulative(&conn).unwrap().is_none());

        let sessions: Vec<SessionResult> = (0..8)
            .map(|i| sample_session(&format!("s{i}"), i, 80.0 + i as f64))
            .collect();
        let first = CumulativeResult::from_sessions(&sessions, start()).unwrap();
        save_cumulative(&conn, &first).unwrap();

        let later = CumulativeResult::from_sessions(&sessions, start() + Duration::hours(1)).unwrap();
        save_cumulative(&conn, &later).unwrap();

        let loaded = latest_cumulative(&conn).unwrap().unwrap();
        assert_eq!(loaded, later);
        assert_eq!(loaded.session_count, 8);
    }

    #[test]
    fn file_backed_database() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("intervo.db");

        {
            let conn = Connection::open(&path).unwrap();
            init_schema(&conn).unwrap();
            save_session_result(&conn, &sample_session("persisted", 0, 88.0)).unwrap();
        }

        let conn = Connection::open(&path).unwrap();
        init_schema(&conn).unwrap();
        let loaded = load_session_result(&conn, "persisted").unwrap();
        assert_eq!(loaded.base_note, "G3");
    }
}
