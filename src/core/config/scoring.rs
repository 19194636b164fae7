use thiserror::Error;

pub(crate) const DEFAULT_PASSING_PERCENTAGE: f64 = 60.0;
pub(crate) const DEFAULT_BUCKET_BOUNDS: [f64; 4] = [25.0, 50.0, 75.0, 100.0];

/// Passing threshold and score-distribution buckets shared by every analytics view.
///
/// Both are expressed in percent of the submission's total points, so exams with
/// different totals aggregate on the same scale. Bucket bounds are inclusive upper
/// bounds: a percentage lands in the first bucket whose bound it does not exceed,
/// and anything above the last bound lands in the last bucket.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoringPolicy {
    passing_percentage: f64,
    bucket_bounds: Vec<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum PolicyError {
    #[error("passing percentage must be within 0..=100, got {0}")]
    PassingOutOfRange(f64),
    #[error("at least one score bucket is required")]
    NoBuckets,
    #[error("bucket bounds must be positive and strictly increasing")]
    UnorderedBounds,
    #[error("last bucket bound must be 100, got {0}")]
    OpenEnded(f64),
}

impl ScoringPolicy {
    pub(crate) fn new(passing_percentage: f64, bucket_bounds: Vec<f64>) -> Result<Self, PolicyError> {
        if !(0.0..=100.0).contains(&passing_percentage) {
            return Err(PolicyError::PassingOutOfRange(passing_percentage));
        }

        let Some(last) = bucket_bounds.last().copied() else {
            return Err(PolicyError::NoBuckets);
        };

        let mut previous = 0.0;
        for bound in &bucket_bounds {
            if !bound.is_finite() || *bound <= previous {
                return Err(PolicyError::UnorderedBounds);
            }
            previous = *bound;
        }

        if (last - 100.0).abs() > f64::EPSILON {
            return Err(PolicyError::OpenEnded(last));
        }

        Ok(Self { passing_percentage, bucket_bounds })
    }

    pub(crate) fn passing_percentage(&self) -> f64 {
        self.passing_percentage
    }

    pub(crate) fn is_passing(&self, percentage: f64) -> bool {
        percentage >= self.passing_percentage
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.bucket_bounds.len()
    }

    pub(crate) fn bucket_index(&self, percentage: f64) -> usize {
        self.bucket_bounds
            .iter()
            .position(|bound| percentage <= *bound)
            .unwrap_or(self.bucket_bounds.len() - 1)
    }

    pub(crate) fn bucket_labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.bucket_bounds.len());
        let mut lower: Option<f64> = None;

        for bound in &self.bucket_bounds {
            // Whole-number bounds read as "26-50%"; anything finer needs an open lower end.
            let label = match lower {
                None => format!("0-{bound}%"),
                Some(previous) if previous.fract() == 0.0 => {
                    format!("{}-{bound}%", previous + 1.0)
                }
                Some(previous) => format!(">{previous}-{bound}%"),
            };
            labels.push(label);
            lower = Some(*bound);
        }

        labels
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            passing_percentage: DEFAULT_PASSING_PERCENTAGE,
            bucket_bounds: DEFAULT_BUCKET_BOUNDS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels_use_quartiles() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.bucket_labels(), vec!["0-25%", "26-50%", "51-75%", "76-100%"]);
    }

    #[test]
    fn fractional_bounds_label_the_open_lower_end() {
        let policy = ScoringPolicy::new(60.0, vec![33.3, 66.6, 100.0]).expect("policy");
        assert_eq!(policy.bucket_labels(), vec!["0-33.3%", ">33.3-66.6%", ">66.6-100%"]);

        let labels = policy.bucket_labels();
        assert_eq!(labels[policy.bucket_index(33.5)], ">33.3-66.6%");
        assert_eq!(labels[policy.bucket_index(33.3)], "0-33.3%");
    }

    #[test]
    fn bucket_index_uses_inclusive_upper_bounds() {
        let policy = ScoringPolicy::new(60.0, vec![20.0, 50.0, 80.0, 100.0]).expect("policy");

        assert_eq!(policy.bucket_index(0.0), 0);
        assert_eq!(policy.bucket_index(20.0), 0);
        assert_eq!(policy.bucket_index(20.5), 1);
        assert_eq!(policy.bucket_index(50.0), 1);
        assert_eq!(policy.bucket_index(70.0), 2);
        assert_eq!(policy.bucket_index(100.0), 3);
        assert_eq!(policy.bucket_index(130.0), 3);
    }

    #[test]
    fn passing_is_inclusive() {
        let policy = ScoringPolicy::default();
        assert!(policy.is_passing(60.0));
        assert!(!policy.is_passing(59.99));
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert_eq!(ScoringPolicy::new(60.0, vec![]), Err(PolicyError::NoBuckets));
        assert_eq!(
            ScoringPolicy::new(60.0, vec![50.0, 40.0, 100.0]),
            Err(PolicyError::UnorderedBounds)
        );
        assert_eq!(ScoringPolicy::new(60.0, vec![25.0, 90.0]), Err(PolicyError::OpenEnded(90.0)));
        assert_eq!(
            ScoringPolicy::new(120.0, vec![100.0]),
            Err(PolicyError::PassingOutOfRange(120.0))
        );
    }
}
