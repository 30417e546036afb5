//! Test corpus model, polarity classification and corpus loading

pub mod sampler;

pub use sampler::{group, sample, InterventionGroup};

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Whether a case expects the service to accept or reject the claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl FromStr for Polarity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Polarity::Positive),
            "negative" => Ok(Polarity::Negative),
            other => Err(CoreError::Parse(format!("Unknown polarity '{}'", other))),
        }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Positive => write!(f, "positive"),
            Polarity::Negative => write!(f, "negative"),
        }
    }
}

/// Intent a result is judged against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestIntent {
    Positive,
    Negative,
    Build,
    Complex,
}

impl From<Polarity> for TestIntent {
    fn from(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Positive => TestIntent::Positive,
            Polarity::Negative => TestIntent::Negative,
        }
    }
}

impl FromStr for TestIntent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(TestIntent::Positive),
            "negative" => Ok(TestIntent::Negative),
            "build" => Ok(TestIntent::Build),
            "complex" => Ok(TestIntent::Complex),
            other => Err(CoreError::Parse(format!("Unknown test intent '{}'", other))),
        }
    }
}

impl std::fmt::Display for TestIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestIntent::Positive => write!(f, "positive"),
            TestIntent::Negative => write!(f, "negative"),
            TestIntent::Build => write!(f, "build"),
            TestIntent::Complex => write!(f, "complex"),
        }
    }
}

/// A scripted test case. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,

    #[serde(default, alias = "interventionId")]
    pub intervention_id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub polarity: Option<Polarity>,

    /// Overrides the polarity-derived intent (e.g. `build`, `complex`)
    #[serde(default, deserialize_with = "lenient")]
    pub intent: Option<TestIntent>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Opaque claim submission document
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Identity in the result store, when the case has been saved there
    #[serde(default, alias = "persistedId")]
    pub persisted_id: Option<u64>,
}

impl TestCase {
    pub fn polarity_class(&self) -> PolarityClass {
        PolarityClass::of(self)
    }

    /// Intent used for classification. Cases with no polarity run as positive.
    pub fn intent(&self) -> TestIntent {
        if let Some(intent) = self.intent {
            return intent;
        }
        self.polarity_class()
            .polarity()
            .map(TestIntent::from)
            .unwrap_or(TestIntent::Positive)
    }

    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// How a case's polarity was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolarityClass {
    /// Read from the explicit `polarity` field
    Explicit(Polarity),
    /// Guessed from the free-text description
    Inferred(Polarity),
    Unclassified,
}

impl PolarityClass {
    pub fn of(case: &TestCase) -> Self {
        if let Some(polarity) = case.polarity {
            return PolarityClass::Explicit(polarity);
        }

        let description = case
            .description
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        if description.contains("positive") {
            PolarityClass::Inferred(Polarity::Positive)
        } else if description.contains("negative") {
            PolarityClass::Inferred(Polarity::Negative)
        } else {
            PolarityClass::Unclassified
        }
    }

    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            PolarityClass::Explicit(p) | PolarityClass::Inferred(p) => Some(*p),
            PolarityClass::Unclassified => None,
        }
    }
}

/// Unrecognised values become `None` instead of failing the whole corpus.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Parse a corpus from a JSON array of test cases
pub fn parse_corpus(json: &str) -> CoreResult<Vec<TestCase>> {
    serde_json::from_str(json).map_err(|e| CoreError::Parse(format!("Invalid corpus: {}", e)))
}

/// Load a corpus file
pub fn load_corpus(path: &Path) -> CoreResult<Vec<TestCase>> {
    let json = std::fs::read_to_string(path)?;
    let cases = parse_corpus(&json)?;
    tracing::info!("Loaded {} test cases from {}", cases.len(), path.display());
    Ok(cases)
}
