use serde::Serialize;

use super::analytics::AnalyticsSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PerformanceBand {
    Excellent,
    Good,
    Satisfactory,
    NeedsImprovement,
}

impl PerformanceBand {
    pub(crate) fn from_percentage(average_percentage: f64) -> Self {
        if average_percentage >= 80.0 {
            Self::Excellent
        } else if average_percentage >= 60.0 {
            Self::Good
        } else if average_percentage >= 40.0 {
            Self::Satisfactory
        } else {
            Self::NeedsImprovement
        }
    }

    fn closing_sentence(self) -> &'static str {
        match self {
            Self::Excellent => {
                "Overall, the student demonstrates excellent understanding of the material and consistently performs at a high level."
            }
            Self::Good => {
                "The student shows good understanding of most concepts but could benefit from additional practice in some areas."
            }
            Self::Satisfactory => {
                "The student demonstrates basic understanding but needs more support to fully grasp key concepts."
            }
            Self::NeedsImprovement => {
                "The student requires significant additional support and practice to improve understanding of fundamental concepts."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TrendDirection {
    Improving,
    Variable,
}

/// Direction between the first and last graded attempt. `None` with fewer than two.
pub(crate) fn trend_direction(summary: &AnalyticsSummary) -> Option<TrendDirection> {
    let (first, last) = match summary.improvement_trend.as_slice() {
        [first, .., last] => (first, last),
        _ => return None,
    };

    Some(if last.percentage > first.percentage {
        TrendDirection::Improving
    } else {
        TrendDirection::Variable
    })
}

pub(crate) fn narrative(student_name: &str, summary: &AnalyticsSummary) -> String {
    if summary.graded_submissions == 0 {
        return format!("{student_name} has no graded exams yet.");
    }

    let noun = if summary.total_exams == 1 { "exam" } else { "exams" };
    let mut text = format!(
        "{student_name} has completed {} {noun} with an average score of {:.1}%. ",
        summary.total_exams, summary.average_percentage
    );

    if let (Some(direction), [first, .., last]) =
        (trend_direction(summary), summary.improvement_trend.as_slice())
    {
        let sentence = match direction {
            TrendDirection::Improving => format!(
                "There is a positive trend in performance, with scores improving from {:.1}% to {:.1}%. ",
                first.percentage, last.percentage
            ),
            TrendDirection::Variable => format!(
                "There has been some variability in performance, with scores changing from {:.1}% to {:.1}%. ",
                first.percentage, last.percentage
            ),
        };
        text.push_str(&sentence);
    }

    text.push_str(PerformanceBand::from_percentage(summary.average_percentage).closing_sentence());
    text
}
