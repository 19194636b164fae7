use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, PrimitiveDateTime};

use crate::core::config::ScoringPolicy;
use crate::core::time::format_date;
use crate::repositories::submissions::ScoredRow;

/// One submission as seen by the aggregation. `score` is `None` until graded.
#[derive(Debug, Clone)]
pub(crate) struct ScoredSubmission {
    pub(crate) exam_id: String,
    pub(crate) exam_name: String,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

impl From<ScoredRow> for ScoredSubmission {
    fn from(row: ScoredRow) -> Self {
        Self {
            exam_id: row.exam_id,
            exam_name: row.exam_title,
            score: row.score,
            total_points: row.total_points,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnalyticsSummary {
    pub(crate) total_submissions: usize,
    pub(crate) graded_submissions: usize,
    pub(crate) total_exams: usize,
    pub(crate) average_score: f64,
    pub(crate) average_percentage: f64,
    pub(crate) highest_score: f64,
    pub(crate) lowest_score: f64,
    pub(crate) highest_percentage: f64,
    pub(crate) lowest_percentage: f64,
    pub(crate) passing_percentage: f64,
    pub(crate) passing_rate: f64,
    pub(crate) score_distribution: Vec<DistributionBucket>,
    pub(crate) improvement_trend: Vec<TrendPoint>,
    pub(crate) exam_performance: Vec<ExamPerformance>,
    pub(crate) strengths_weaknesses: Vec<NamedScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DistributionBucket {
    pub(crate) range: String,
    pub(crate) count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TrendPoint {
    pub(crate) exam_number: usize,
    pub(crate) exam_name: String,
    pub(crate) date: String,
    pub(crate) percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ExamPerformance {
    pub(crate) exam_id: String,
    pub(crate) exam_name: String,
    pub(crate) graded_submissions: usize,
    pub(crate) average_score: f64,
    pub(crate) average_percentage: f64,
    pub(crate) passing_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct NamedScore {
    pub(crate) name: String,
    pub(crate) score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ActivityPoint {
    pub(crate) date: String,
    pub(crate) count: i64,
}

pub(crate) fn percentage(score: f64, total_points: f64) -> f64 {
    if total_points <= 0.0 {
        return 0.0;
    }
    score / total_points * 100.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

struct Graded<'a> {
    source: &'a ScoredSubmission,
    score: f64,
    percentage: f64,
}

pub(crate) fn summarize(submissions: &[ScoredSubmission], policy: &ScoringPolicy) -> AnalyticsSummary {
    let mut graded: Vec<Graded<'_>> = submissions
        .iter()
        .filter_map(|submission| {
            submission.score.map(|score| Graded {
                source: submission,
                score,
                percentage: percentage(score, submission.total_points),
            })
        })
        .collect();
    graded.sort_by(|a, b| a.source.created_at.cmp(&b.source.created_at));

    let mut exam_ids: Vec<&str> = submissions.iter().map(|s| s.exam_id.as_str()).collect();
    exam_ids.sort_unstable();
    exam_ids.dedup();

    let all: Vec<&Graded<'_>> = graded.iter().collect();

    let mut counts = vec![0usize; policy.bucket_count()];
    for item in &graded {
        counts[policy.bucket_index(item.percentage)] += 1;
    }
    let score_distribution = policy
        .bucket_labels()
        .into_iter()
        .zip(counts)
        .map(|(range, count)| DistributionBucket { range, count })
        .collect();

    let improvement_trend = graded
        .iter()
        .enumerate()
        .map(|(index, item)| TrendPoint {
            exam_number: index + 1,
            exam_name: item.source.exam_name.clone(),
            date: format_date(item.source.created_at.date()),
            percentage: round2(item.percentage),
        })
        .collect();

    let exam_performance = exam_performance(submissions, &graded, policy);
    let strengths_weaknesses = exam_performance
        .iter()
        .filter(|exam| exam.graded_submissions > 0)
        .map(|exam| NamedScore { name: exam.exam_name.clone(), score: exam.average_percentage })
        .collect();

    AnalyticsSummary {
        total_submissions: submissions.len(),
        graded_submissions: graded.len(),
        total_exams: exam_ids.len(),
        average_score: round2(mean(graded.iter().map(|item| item.score))),
        average_percentage: round2(mean(graded.iter().map(|item| item.percentage))),
        highest_score: extreme(graded.iter().map(|item| item.score), f64::max),
        lowest_score: extreme(graded.iter().map(|item| item.score), f64::min),
        highest_percentage: extreme(graded.iter().map(|item| item.percentage), f64::max),
        lowest_percentage: extreme(graded.iter().map(|item| item.percentage), f64::min),
        passing_percentage: policy.passing_percentage(),
        passing_rate: passing_rate(&all, policy),
        score_distribution,
        improvement_trend,
        exam_performance,
        strengths_weaknesses,
    }
}

fn extreme(values: impl Iterator<Item = f64>, pick: fn(f64, f64) -> f64) -> f64 {
    values.reduce(pick).map(round2).unwrap_or(0.0)
}

fn passing_rate(items: &[&Graded<'_>], policy: &ScoringPolicy) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let passed = items.iter().filter(|item| policy.is_passing(item.percentage)).count();
    round2(passed as f64 / items.len() as f64 * 100.0)
}

fn exam_performance(
    submissions: &[ScoredSubmission],
    graded: &[Graded<'_>],
    policy: &ScoringPolicy,
) -> Vec<ExamPerformance> {
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut per_exam: HashMap<&str, Vec<&Graded<'_>>> = HashMap::new();

    for submission in submissions {
        if !per_exam.contains_key(submission.exam_id.as_str()) {
            order.push((submission.exam_id.as_str(), submission.exam_name.as_str()));
            per_exam.insert(submission.exam_id.as_str(), Vec::new());
        }
    }
    for item in graded {
        if let Some(bucket) = per_exam.get_mut(item.source.exam_id.as_str()) {
            bucket.push(item);
        }
    }

    let mut performance: Vec<ExamPerformance> = order
        .into_iter()
        .map(|(exam_id, exam_name)| {
            let items = per_exam.get(exam_id).map(Vec::as_slice).unwrap_or_default();
            ExamPerformance {
                exam_id: exam_id.to_string(),
                exam_name: exam_name.to_string(),
                graded_submissions: items.len(),
                average_score: round2(mean(items.iter().map(|item| item.score))),
                average_percentage: round2(mean(items.iter().map(|item| item.percentage))),
                passing_rate: passing_rate(items, policy),
            }
        })
        .collect();

    performance.sort_by(|a, b| {
        b.average_percentage
            .total_cmp(&a.average_percentage)
            .then_with(|| a.exam_name.cmp(&b.exam_name))
    });
    performance
}

/// Graded counts per day for the `days` days ending on `today`, oldest first.
/// Days without grading activity are reported as zero.
pub(crate) fn grading_activity(counts: &[(Date, i64)], today: Date, days: u32) -> Vec<ActivityPoint> {
    let by_day: HashMap<Date, i64> = counts.iter().copied().collect();

    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub(Duration::days(i64::from(offset))))
        .map(|day| ActivityPoint {
            date: format_date(day),
            count: by_day.get(&day).copied().unwrap_or(0),
        })
        .collect()
}
