use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserRole {
    Teacher,
    Student,
}

impl UserRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }
}

/// How rigorously the scoring service marks an answer. Persisted as SMALLINT 1..=4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub(crate) enum StrictnessLevel {
    ContentFocus,
    #[default]
    Standard,
    Strict,
    Academic,
}

impl StrictnessLevel {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::ContentFocus => "Content Focus",
            Self::Standard => "Standard",
            Self::Strict => "Strict",
            Self::Academic => "Academic",
        }
    }

    pub(crate) fn description(self) -> &'static str {
        match self {
            Self::ContentFocus => {
                "Focus solely on content and understanding. Ignore spelling, grammar, and formatting issues."
            }
            Self::Standard => {
                "Balance between content and presentation. Minor errors have small impact."
            }
            Self::Strict => "Thorough evaluation of both content and presentation.",
            Self::Academic => {
                "Rigorous academic standard with high expectations for precision."
            }
        }
    }

    pub(crate) fn rules(self) -> &'static [&'static str] {
        match self {
            Self::ContentFocus => &[
                "Evaluate ONLY the core concepts and ideas",
                "COMPLETELY IGNORE all spelling mistakes",
                "COMPLETELY IGNORE all grammatical errors",
                "COMPLETELY IGNORE all formatting issues",
                "Give full credit for correct concepts even if poorly expressed",
                "If the core understanding is demonstrated, award full points",
                "Do not deduct points for any presentation issues",
            ],
            Self::Standard => &[
                "Focus primarily on content accuracy (90% of score)",
                "Only deduct for spelling/grammar if it obscures meaning",
                "Consider clarity of expression but prioritize understanding",
                "Minor presentation issues should not affect score",
                "Be generous with partial credit",
            ],
            Self::Strict => &[
                "Evaluate content accuracy rigorously",
                "Consider spelling of technical terms",
                "Consider grammar that affects clarity",
                "Expect proper formatting",
                "Deduct points for unclear explanations",
            ],
            Self::Academic => &[
                "Demand complete and precise answers",
                "Require perfect spelling of technical terms",
                "Require proper grammar and punctuation",
                "Expect perfect formatting and structure",
                "Expect precise use of scientific notation/units",
                "Deduct points for any technical inaccuracies",
                "Require professional academic writing standards",
            ],
        }
    }
}

impl TryFrom<i16> for StrictnessLevel {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::ContentFocus),
            2 => Ok(Self::Standard),
            3 => Ok(Self::Strict),
            4 => Ok(Self::Academic),
            other => Err(format!("strictness_level must be between 1 and 4, got {other}")),
        }
    }
}

impl From<StrictnessLevel> for i16 {
    fn from(value: StrictnessLevel) -> Self {
        match value {
            StrictnessLevel::ContentFocus => 1,
            StrictnessLevel::Standard => 2,
            StrictnessLevel::Strict => 3,
            StrictnessLevel::Academic => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StrictnessLevel;

    #[test]
    fn strictness_roundtrips_through_smallint() {
        for raw in 1..=4_i16 {
            let level = StrictnessLevel::try_from(raw).expect("level");
            assert_eq!(i16::from(level), raw);
        }
        assert!(StrictnessLevel::try_from(0).is_err());
        assert!(StrictnessLevel::try_from(5).is_err());
    }

    #[test]
    fn strictness_deserializes_from_number() {
        let level: StrictnessLevel = serde_json::from_str("3").expect("level");
        assert_eq!(level, StrictnessLevel::Strict);
        assert!(serde_json::from_str::<StrictnessLevel>("7").is_err());
    }
}
