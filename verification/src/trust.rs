//! Bounded per-agent trust scores.

use poi_types::Principal;
use std::collections::HashMap;

/// Scores live in `[0, max_score]`. Agents never seen read as `initial_score`.
#[derive(Debug, Clone)]
pub struct TrustScores {
    scores: HashMap<Principal, u64>,
    initial_score: u64,
    max_score: u64,
}

impl TrustScores {
    pub fn new(initial_score: u64, max_score: u64) -> Self {
        Self {
            scores: HashMap::new(),
            initial_score: initial_score.min(max_score),
            max_score,
        }
    }

    pub fn from_scores(
        initial_score: u64,
        max_score: u64,
        scores: impl IntoIterator<Item = (Principal, u64)>,
    ) -> Self {
        let mut trust = Self::new(initial_score, max_score);
        trust.scores = scores
            .into_iter()
            .map(|(agent, score)| (agent, score.min(max_score)))
            .collect();
        trust
    }

    pub fn get_score(&self, agent: &Principal) -> u64 {
        self.scores.get(agent).copied().unwrap_or(self.initial_score)
    }

    /// Raise the agent's score, capped at the maximum. Returns the new score.
    pub fn reward(&mut self, agent: &Principal, increment: u64) -> u64 {
        let score = self
            .get_score(agent)
            .saturating_add(increment)
            .min(self.max_score);
        self.scores.insert(agent.clone(), score);
        score
    }

    /// Lower the agent's score, floored at zero. Returns the new score.
    pub fn penalize(&mut self, agent: &Principal, decrement: u64) -> u64 {
        let score = self.get_score(agent).saturating_sub(decrement);
        self.scores.insert(agent.clone(), score);
        score
    }

    pub fn max_score(&self) -> u64 {
        self.max_score
    }

    pub fn scores(&self) -> impl Iterator<Item = (&Principal, u64)> {
        self.scores.iter().map(|(agent, score)| (agent, *score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_agent_reads_initial() {
        let trust = TrustScores::new(500, 1000);
        assert_eq!(trust.get_score(&Principal::new("a")), 500);
    }

    #[test]
    fn reward_caps_and_penalize_floors() {
        let mut trust = TrustScores::new(500, 1000);
        let agent = Principal::new("a");
        for _ in 0..100 {
            trust.reward(&agent, 10);
        }
        assert_eq!(trust.get_score(&agent), 1000);
        for _ in 0..100 {
            trust.penalize(&agent, 20);
        }
        assert_eq!(trust.get_score(&agent), 0);
    }

    #[test]
    fn restored_scores_are_clamped() {
        let trust = TrustScores::from_scores(500, 1000, [(Principal::new("a"), 5_000)]);
        assert_eq!(trust.get_score(&Principal::new("a")), 1000);
    }
}
