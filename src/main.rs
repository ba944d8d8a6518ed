mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use console::style;

use cli::{Cli, Command};
use intervo::config::{self, AppConfig};
use intervo::paths;
use intervo::report;
use intervo::scale::{self, MajorScale};
use intervo::scoring::{AttemptInput, ScoringEngine, TrainingSession};
use intervo::storage::{store, CumulativeResult, SessionResult};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .init();

    let config = config::load_config()?;

    match cli.command {
        Command::Score {
            base,
            target,
            detected,
            response_ms,
            volume,
            json,
        } => {
            let mut engine = ScoringEngine::new(&config)?;
            let input = AttemptInput::new(parse_pitch(&base)?, parse_pitch(&target)?, detected)
                .with_response_time(response_ms)
                .with_volume(volume);
            let result = engine.analyze(&input);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                report::print_score_result(&result);
            }
            Ok(())
        }

        Command::Session {
            base,
            sung,
            response_ms,
            volume,
            save,
            json,
        } => run_session(&config, &base, &sung, response_ms, volume, save, json),

        Command::Sessions { json } => {
            let sessions = store::list_sessions()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else {
                report::print_session_list(&sessions);
            }
            Ok(())
        }

        Command::Overall { json } => {
            let sessions = store::list_sessions()?;
            let cumulative = match store::latest_cumulative()? {
                Some(c) => Some(c),
                None => CumulativeResult::from_sessions(&sessions, Utc::now()),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&cumulative)?);
            } else {
                report::print_cumulative(cumulative.as_ref(), sessions.len());
            }
            Ok(())
        }

        Command::Intervals => {
            report::print_intervals();
            Ok(())
        }

        Command::Paths => {
            println!("Config: {}", paths::config_file().display());
            println!("Data:   {}", paths::data_dir().display());
            println!("DB:     {}", paths::db_path().display());
            Ok(())
        }
    }
}

fn run_session(
    config: &AppConfig,
    base: &str,
    sung: &[f64],
    response_ms: f64,
    volume: f64,
    save: bool,
    json: bool,
) -> Result<()> {
    let scale = MajorScale::new(parse_pitch(base)?)?;
    let mut engine = ScoringEngine::new(config)?;
    let mut session = TrainingSession::new(scale);

    for &freq in sung {
        let Some(degree) = session.next_degree() else {
            tracing::warn!("ignoring extra frequencies past do'");
            break;
        };
        let result = session.sing(&mut engine, freq, response_ms, volume)?;
        if !result.is_ok() {
            anyhow::bail!(
                "{} ({}) could not be scored: {}",
                degree.solfege,
                freq,
                result.feedback.primary
            );
        }
    }

    let record = session
        .finish(Utc::now())
        .context("Provide one frequency per degree, do through do'")?;

    let cumulative = if save {
        store::save_session(&record)?
    } else {
        None
    };

    if json {
        let doc = session_json(&record, save.then_some(cumulative.as_ref()))?;
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    report::print_session(&record);
    println!();
    report::print_mastery(engine.interval_classifier());

    if save {
        println!();
        println!("Saved session {}", style(&record.session_id).green());
        if let Some(c) = &cumulative {
            report::print_cumulative(Some(c), c.session_count);
        }
    }

    Ok(())
}

/// The single JSON document printed for `session --json`. A saved session
/// carries the refreshed cumulative record alongside it.
fn session_json(
    record: &SessionResult,
    saved: Option<Option<&CumulativeResult>>,
) -> Result<serde_json::Value> {
    Ok(match saved {
        Some(cumulative) => serde_json::json!({ "session": record, "cumulative": cumulative }),
        None => serde_json::to_value(record)?,
    })
}

/// Accept either a frequency in Hz or a note name.
fn parse_pitch(value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(hz) => Ok(hz),
        Err(_) => scale::parse_note(value).with_context(|| format!("Invalid pitch: {value}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intervo::scoring::Grade;

    fn record() -> SessionResult {
        SessionResult {
            session_id: "20260301T100000.000-C4".into(),
            base_note: "C4".into(),
            grade: Grade::A,
            accuracy: 91.0,
            note_results: Vec::new(),
            completed_at: Utc::now(),
            duration_secs: 60.0,
        }
    }

    #[test]
    fn unsaved_session_json_is_the_record() {
        let doc = session_json(&record(), None).unwrap();
        assert_eq!(doc["baseNote"], "C4");
        assert!(doc.get("session").is_none());
    }

    #[test]
    fn saved_session_json_is_one_document() {
        let doc = session_json(&record(), Some(None)).unwrap();
        assert_eq!(doc["session"]["baseNote"], "C4");
        assert!(doc["cumulative"].is_null());

        let text = serde_json::to_string_pretty(&doc).unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn pitch_accepts_hz_or_note() {
        assert_eq!(parse_pitch("440").unwrap(), 440.0);
        assert!((parse_pitch("A4").unwrap() - 440.0).abs() < 1e-9);
        assert!(parse_pitch("H9").is_err());
    }
}
