//! Loading strategy selection by request size

use serde::{Deserialize, Serialize};

use crate::config::StrategyThresholds;

/// How much work is done before returning to the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStrategy {
    /// Load everything synchronously
    Immediate,
    /// Load the top slice synchronously, background the rest
    PriorityFirst,
    /// Load a single requested item
    OnDemand,
    /// Load a small top slice, background the (large) rest
    Background,
}

impl std::fmt::Display for LoadingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoadingStrategy::Immediate => "immediate",
            LoadingStrategy::PriorityFirst => "priority_first",
            LoadingStrategy::OnDemand => "on_demand",
            LoadingStrategy::Background => "background",
        };
        f.write_str(name)
    }
}

impl StrategyThresholds {
    /// Strategy for a request of `item_count` items under these thresholds
    pub fn select(&self, item_count: usize) -> LoadingStrategy {
        if item_count <= self.immediate_max {
            LoadingStrategy::Immediate
        } else if item_count <= self.priority_first_max {
            LoadingStrategy::PriorityFirst
        } else {
            LoadingStrategy::Background
        }
    }
}

/// Strategy for `item_count` items with the default thresholds
///
/// Up to 5 items load immediately, 6 to 20 priority-first, anything larger in
/// the background. Never returns [`LoadingStrategy::OnDemand`]; that one is
/// only chosen explicitly.
pub fn select_strategy(item_count: usize) -> LoadingStrategy {
    StrategyThresholds::default().select(item_count)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_boundaries() {
        assert_eq!(select_strategy(0), LoadingStrategy::Immediate);
        assert_eq!(select_strategy(5), LoadingStrategy::Immediate);
        assert_eq!(select_strategy(6), LoadingStrategy::PriorityFirst);
        assert_eq!(select_strategy(20), LoadingStrategy::PriorityFirst);
        assert_eq!(select_strategy(21), LoadingStrategy::Background);
        assert_eq!(select_strategy(500), LoadingStrategy::Background);
    }

    #[test]
    fn custom_thresholds() {
        let thresholds = StrategyThresholds {
            immediate_max: 1,
            priority_first_max: 3,
            background_immediate_count: 1,
        };
        assert_eq!(thresholds.select(1), LoadingStrategy::Immediate);
        assert_eq!(thresholds.select(2), LoadingStrategy::PriorityFirst);
        assert_eq!(thresholds.select(4), LoadingStrategy::Background);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&LoadingStrategy::PriorityFirst).unwrap(),
            "\"priority_first\""
        );
        let parsed: LoadingStrategy = serde_json::from_str("\"on_demand\"").unwrap();
        assert_eq!(parsed, LoadingStrategy::OnDemand);
        assert_eq!(LoadingStrategy::Background.to_string(), "background");
    }
}
