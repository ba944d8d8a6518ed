use console::style;

use super::attempt::styled_grade;
use crate::analysis::{IntervalClassifier, IntervalType};
use crate::storage::session_data::{CumulativeResult, SessionResult, CUMULATIVE_WINDOW};

/// Per-degree table for one completed session.
pub fn print_session(session: &SessionResult) {
    println!("{}", style("=== Session ===").bold());
    println!();
    println!(
        "  Base: {}   Grade: {}   Accuracy: {:.1}   Time: {:.0}s",
        style(&session.base_note).cyan(),
        styled_grade(session.grade),
        session.accuracy,
        session.duration_secs
    );
    println!();
    println!(
        "  {:>3} {:6} {:>9} {:>9} {:>7} {:>6}  {}",
        "#", "Note", "Target", "Sung", "Score", "Grade", "Dir"
    );
    for note in &session.note_results {
        let direction = if note.direction_correct {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "  {:>3} {:6} {:>7.2}Hz {:>7.2}Hz {:>7.1} {:>6}  {}",
            note.degree,
            note.solfege,
            note.target_freq,
            note.detected_freq,
            note.score,
            note.grade.as_str(),
            direction
        );
    }
}

pub fn print_session_list(sessions: &[SessionResult]) {
    if sessions.is_empty() {
        println!("No sessions recorded yet.");
        return;
    }
    println!("{}", style("=== Sessions ===").bold());
    println!();
    for session in sessions {
        println!(
            "  {}  {:5} {:>5.1}  {}  {}",
            session.completed_at.format("%Y-%m-%d %H:%M"),
            session.base_note,
            session.accuracy,
            styled_grade(session.grade),
            style(&session.session_id).dim()
        );
    }
}

pub fn print_cumulative(cumulative: Option<&CumulativeResult>, session_count: usize) {
    let Some(c) = cumulative else {
        println!(
            "Overall grade unlocks after {} sessions ({} of {} so far).",
            CUMULATIVE_WINDOW,
            session_count.min(CUMULATIVE_WINDOW),
            CUMULATIVE_WINDOW
        );
        return;
    };

    println!("{}", style("=== Overall ===").bold());
    println!();
    println!(
        "  Grade: {}   Accuracy: {:.1}   Play time: {:.1} min   (last {} sessions)",
        styled_grade(c.overall_grade),
        c.overall_accuracy,
        c.total_play_time / 60.0,
        c.session_count
    );
}

/// Reference table of every interval the classifier knows.
pub fn print_intervals() {
    println!("{}", style("=== Intervals ===").bold());
    println!();
    println!(
        "  {:>3} {:4} {:16} {:>10}  {}",
        "st", "", "Name", "Importance", "Often confused with"
    );
    for interval in IntervalType::ALL {
        let confusions: Vec<&str> = interval
            .confused_with()
            .iter()
            .map(|i| i.short_name())
            .collect();
        println!(
            "  {:>3} {:4} {:16} {:>10.1}  {}",
            interval.semitones(),
            interval.short_name(),
            interval.label(),
            interval.importance(),
            style(confusions.join(", ")).dim()
        );
    }
}

/// Running mastery for every interval sung so far, weakest called out last.
pub fn print_mastery(classifier: &IntervalClassifier) {
    let report = classifier.mastery_report();
    if report.is_empty() {
        return;
    }
    println!("{}", style("=== Interval mastery ===").bold());
    println!();
    println!(
        "  {:4} {:>8} {:>8} {:>6}  {:14} {}",
        "", "Attempts", "Average", "Best", "Level", "Trend"
    );
    for (interval, snap) in &report {
        println!(
            "  {:4} {:>8} {:>8.1} {:>6.1}  {:14} {}",
            interval.short_name(),
            snap.attempts,
            snap.average_accuracy,
            snap.best_accuracy,
            snap.level.label(),
            style(snap.trend.label()).dim()
        );
    }

    let weakest: Vec<&str> = classifier
        .weakest(2)
        .into_iter()
        .map(|i| i.label())
        .collect();
    println!();
    println!("  Focus next on: {}", style(weakest.join(", ")).yellow());
}
