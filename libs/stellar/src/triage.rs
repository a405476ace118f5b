//! Threat triage scoring
//!
//! A triage configuration maps Stellar predicates to numeric risk scores. Each
//! rule is evaluated independently against an event; the scores of the rules
//! that match are combined by an [`Aggregator`].

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::resolver::VariableResolver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregator {
    #[default]
    Max,
    Min,
    Sum,
    Mean,
    /// Mean of the strictly positive scores only
    PositiveMean,
}

impl Aggregator {
    /// Combine matched scores; an empty input is 0.
    pub fn aggregate(&self, scores: &[f64]) -> f64 {
        if scores.is_empty() {
            return 0.0;
        }
        match self {
            Aggregator::Max => scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregator::Min => scores.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregator::Sum => scores.iter().sum(),
            Aggregator::Mean => scores.iter().sum::<f64>() / scores.len() as f64,
            Aggregator::PositiveMean => {
                let positive: Vec<f64> = scores.iter().copied().filter(|s| *s > 0.0).collect();
                if positive.is_empty() {
                    0.0
                } else {
                    positive.iter().sum::<f64>() / positive.len() as f64
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageConfig {
    /// Stellar predicate → score
    #[serde(default)]
    pub risk_level_rules: BTreeMap<String, f64>,
    #[serde(default)]
    pub aggregator: Aggregator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub rule: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatScore {
    pub score: f64,
    pub aggregator: Aggregator,
    pub matched: Vec<RuleMatch>,
}

impl TriageConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(format!("triage configuration: {e}")))
    }

    /// Reject the configuration if any rule fails to parse, calls an unknown
    /// function or carries a non-finite score.
    pub fn validate(&self, engine: &Engine) -> Result<()> {
        for (rule, score) in &self.risk_level_rules {
            if !score.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "triage rule '{rule}' has a non-finite score"
                )));
            }
            engine.validate(rule)?;
        }
        Ok(())
    }

    /// Score an event. A rule that fails to evaluate is logged and treated as
    /// a non-match.
    pub fn score(&self, engine: &Engine, resolver: &dyn VariableResolver) -> ThreatScore {
        let mut matched = Vec::new();
        for (rule, score) in &self.risk_level_rules {
            match engine.run_predicate(rule, resolver) {
                Ok(true) => matched.push(RuleMatch {
                    rule: rule.clone(),
                    score: *score,
                }),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(rule = %rule, error = %e, "Triage rule failed; treating as non-match");
                }
            }
        }

        let scores: Vec<f64> = matched.iter().map(|m| m.score).collect();
        ThreatScore {
            score: self.aggregator.aggregate(&scores),
            aggregator: self.aggregator,
            matched,
        }
    }
}
