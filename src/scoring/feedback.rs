use super::grade::PerformanceLevel;
use super::result::{Aspect, AspectFeedback, AttemptBreakdown, Component, Feedback, PerformanceEvaluation};
use super::session::Achievement;
use crate::analysis::consistency::{Priority, Recommendation, RecommendationKind};
use crate::analysis::Trend;

/// Assemble the feedback block for one scored attempt.
pub fn compose(
    breakdown: &AttemptBreakdown,
    performance: &PerformanceEvaluation,
    new_achievements: &[Achievement],
) -> Feedback {
    let details = vec![
        AspectFeedback {
            aspect: Aspect::Interval,
            message: breakdown.interval.feedback.clone(),
        },
        AspectFeedback {
            aspect: Aspect::Direction,
            message: breakdown.direction.feedback.clone(),
        },
        AspectFeedback {
            aspect: Aspect::Consistency,
            message: breakdown.consistency.feedback.clone(),
        },
        AspectFeedback {
            aspect: Aspect::Speed,
            message: breakdown.speed.feedback.clone(),
        },
    ];

    let mut recommendations = breakdown.consistency.recommendations.clone();
    if let Some(&weakest) = performance.weaknesses.first() {
        recommendations.push(weakness_recommendation(weakest));
    }
    recommendations.sort_by_key(|r| r.priority);

    Feedback {
        primary: primary_message(performance.level).to_string(),
        details,
        recommendations,
        encouragement: encouragement(performance, new_achievements),
        next_step: next_step(performance),
    }
}

fn primary_message(level: PerformanceLevel) -> &'static str {
    match level {
        PerformanceLevel::Excellent => "Outstanding! That note was right on target.",
        PerformanceLevel::Good => "Nice singing. You're close to the mark.",
        PerformanceLevel::Fair => "Getting there. The note was in the neighborhood.",
        PerformanceLevel::NeedsImprovement => "That one drifted. Listen to the reference again and retry.",
        PerformanceLevel::Poor => "That note missed the target. Take it slowly and try again.",
    }
}

fn weakness_recommendation(component: Component) -> Recommendation {
    let (priority, message) = match component {
        Component::PitchAccuracy => (
            Priority::High,
            "Sing along with the reference tone first, then try the interval on your own.",
        ),
        Component::RecognitionSpeed => (
            Priority::Low,
            "Hum the scale up to the target in your head before singing to answer faster.",
        ),
        Component::IntervalMastery => (
            Priority::Medium,
            "Spend a few rounds on this interval alone until it feels familiar.",
        ),
        Component::DirectionAccuracy => (
            Priority::High,
            "Decide whether the note goes up or down before you sing it.",
        ),
        Component::Consistency => (
            Priority::Medium,
            "Aim for the same pitch every time; slow, steady attempts beat fast guesses.",
        ),
    };
    Recommendation::new(RecommendationKind::TargetedPractice, priority, message)
}

fn encouragement(performance: &PerformanceEvaluation, new_achievements: &[Achievement]) -> String {
    if let Some(latest) = new_achievements.last() {
        return format!("Achievement unlocked: {}!", latest.label());
    }
    if performance.improvement_trend == Trend::Improving {
        return "You're improving with every attempt.".into();
    }
    match performance.level {
        PerformanceLevel::Excellent | PerformanceLevel::Good => "Great work, keep the streak going.".into(),
        _ => "Every attempt trains your ear. Keep at it.".into(),
    }
}

fn next_step(performance: &PerformanceEvaluation) -> String {
    match performance.weaknesses.first() {
        Some(component) => format!("Next: focus on your {}.", component.label()),
        None if performance.level == PerformanceLevel::Excellent => {
            "Next: try a new base note or a wider interval.".into()
        }
        None => "Next: repeat this scale degree until it scores above 85.".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation(level: PerformanceLevel, weaknesses: Vec<Component>) -> PerformanceEvaluation {
        PerformanceEvaluation {
            level,
            strengths: Vec::new(),
            weaknesses,
            improvement_trend: Trend::Stable,
        }
    }

    #[test]
    fn details_cover_every_aspect() {
        let feedback = compose(
            &AttemptBreakdown::default(),
            &evaluation(PerformanceLevel::Good, Vec::new()),
            &[],
        );
        let aspects: Vec<Aspect> = feedback.details.iter().map(|d| d.aspect).collect();
        assert_eq!(
            aspects,
            vec![Aspect::Interval, Aspect::Direction, Aspect::Consistency, Aspect::Speed]
        );
    }

    #[test]
    fn weakness_adds_targeted_recommendation() {
        let feedback = compose(
            &AttemptBreakdown::default(),
            &evaluation(PerformanceLevel::Poor, vec![Component::DirectionAccuracy]),
            &[],
        );
        assert_eq!(feedback.recommendations.len(), 1);
        assert_eq!(feedback.recommendations[0].kind, RecommendationKind::TargetedPractice);
        assert!(feedback.next_step.contains("direction accuracy"));
    }

    #[test]
    fn achievement_drives_encouragement() {
        let feedback = compose(
            &AttemptBreakdown::default(),
            &evaluation(PerformanceLevel::Excellent, Vec::new()),
            &[Achievement::HighScore],
        );
        assert!(feedback.encouragement.contains("Sharp ear"));
        assert!(feedback.next_step.contains("new base note"));
    }

    #[test]
    fn primary_message_follows_level() {
        assert!(primary_message(PerformanceLevel::Excellent).starts_with("Outstanding"));
        assert!(primary_message(PerformanceLevel::Poor).contains("missed"));
    }
}
