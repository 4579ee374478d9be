//! How a validator checked an inference claim.
//!
//! The engine never inspects the method; it is recorded with each result so
//! auditors can see what a verdict was based on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationMethod {
    /// Re-ran the model and compared outputs byte for byte.
    ExactMatch,
    /// Compared embeddings against a similarity threshold.
    SimilarityThreshold,
    /// Sampled the model repeatedly and tested the claimed output's likelihood.
    StatisticalResampling,
    /// Judged whether the output is a coherent answer to the input.
    SemanticCoherence,
    Other(String),
}

impl VerificationMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::SimilarityThreshold => "similarity_threshold",
            Self::StatisticalResampling => "statistical_resampling",
            Self::SemanticCoherence => "semantic_coherence",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "exact_match" => Self::ExactMatch,
            "similarity_threshold" => Self::SimilarityThreshold,
            "statistical_resampling" => Self::StatisticalResampling,
            "semantic_coherence" => Self::SemanticCoherence,
            other => Self::Other(other.to_string()),
        })
    }
}
