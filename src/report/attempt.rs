use console::style;

use crate::analysis::consistency::Priority;
use crate::scoring::{Component, Grade, ScoreResult, ScoreStatus};

/// Print one scored attempt: total, components, then the feedback block.
pub fn print_score_result(result: &ScoreResult) {
    if let ScoreStatus::Error { kind, message } = &result.status {
        println!(
            "{} {}",
            style("Could not score attempt:").red().bold(),
            message
        );
        println!("  {}", style(format!("({kind:?})")).dim());
        println!("  {}", result.feedback.next_step);
        return;
    }

    let score = &result.score;
    println!("{}", style("=== Attempt ===").bold());
    println!();
    println!(
        "  Score: {:>5.1}   Grade: {}   Level: {}",
        score.total,
        styled_grade(score.grade),
        result.performance.level.label()
    );

    let interval = &result.breakdown.interval;
    if let (Some(target), Some(detected)) = (interval.target_interval, interval.detected_interval) {
        println!(
            "  Target: {}   Sung: {}   ({:+.0} cents)",
            style(target.label()).cyan(),
            style(detected.label()).cyan(),
            interval.cents_error
        );
    }
    if result.breakdown.correction_applied {
        println!(
            "  {}",
            style(format!(
                "Octave-corrected to {:.2} Hz",
                result.breakdown.scored_freq
            ))
            .dim()
        );
    }
    if score.volume_multiplier != 1.0 {
        println!(
            "  {}",
            style(format!("Volume multiplier ×{:.2}", score.volume_multiplier)).dim()
        );
    }
    println!();

    println!("{}", style("  Components").bold());
    for component in Component::ALL {
        print_component(component, score.components.get(component));
    }
    println!();

    let feedback = &result.feedback;
    println!("  {}", style(&feedback.primary).bold());
    for detail in &feedback.details {
        println!("    {}", detail.message);
    }
    if !feedback.recommendations.is_empty() {
        println!();
        println!("{}", style("  Recommendations").bold());
        for rec in &feedback.recommendations {
            let marker = match rec.priority {
                Priority::High => style("!").red().bold(),
                Priority::Medium => style("•").yellow(),
                Priority::Low => style("·").dim(),
            };
            println!("    {} {}", marker, rec.message);
        }
    }
    for achievement in &result.new_achievements {
        println!("  {} {}", style("★").yellow(), achievement.label());
    }
    println!();
    println!("  {}", style(&feedback.encouragement).green());
    println!("  {}", feedback.next_step);
}

/// Component line with a simple bar; colored by the strength/weakness bands.
fn print_component(component: Component, value: f64) {
    let filled = (value / 10.0).round().clamp(0.0, 10.0) as usize;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled));
    let bar = if value >= 85.0 {
        style(bar).green()
    } else if value < 60.0 {
        style(bar).red()
    } else {
        style(bar).yellow()
    };
    println!("    {:20} {} {:>5.1}", component.label(), bar, value);
}

pub fn styled_grade(grade: Grade) -> String {
    let text = grade.as_str();
    match grade {
        Grade::S | Grade::APlus | Grade::A => style(text).green().bold().to_string(),
        Grade::BPlus | Grade::B => style(text).cyan().to_string(),
        Grade::CPlus | Grade::C => style(text).yellow().to_string(),
        Grade::DPlus | Grade::D | Grade::F => style(text).red().to_string(),
    }
}
