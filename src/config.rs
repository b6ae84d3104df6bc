use serde::{Deserialize, Serialize};

use crate::error::QuizError;

/// The category grid is laid out for at most 16 buttons.
pub const DEFAULT_MAX_GROUPS: usize = 16;
pub const DEFAULT_DATA_URL: &str = "data.txt";
pub const DEFAULT_FEEDBACK_DELAY_MS: u32 = 1000;
pub const DEFAULT_REPLAY_PROMPT_DELAY_MS: u32 = 1500;

/// What happens once every group has been shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Refill the pool and keep going; the host gets a one-time notice.
    #[default]
    Continue,
    /// Show the final score and ask whether to play again.
    AskToReplay,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    pub max_groups: Option<usize>,
    pub data_url: String,
    pub feedback_delay_ms: u32,
    pub replay_prompt_delay_ms: u32,
    pub cycle_policy: CyclePolicy,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_groups: Some(DEFAULT_MAX_GROUPS),
            data_url: DEFAULT_DATA_URL.to_string(),
            feedback_delay_ms: DEFAULT_FEEDBACK_DELAY_MS,
            replay_prompt_delay_ms: DEFAULT_REPLAY_PROMPT_DELAY_MS,
            cycle_policy: CyclePolicy::Continue,
        }
    }
}

impl QuizConfig {
    /// Parse a (possibly partial) JSON object; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, QuizError> {
        serde_json::from_str(json).map_err(|e| QuizError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(QuizConfig::from_json("{}").unwrap(), QuizConfig::default());
    }

    #[test]
    fn partial_override() {
        let cfg = QuizConfig::from_json(
            r#"{"max_groups": null, "cycle_policy": "ask_to_replay", "feedback_delay_ms": 250}"#,
        )
        .unwrap();
        assert_eq!(cfg.max_groups, None);
        assert_eq!(cfg.cycle_policy, CyclePolicy::AskToReplay);
        assert_eq!(cfg.feedback_delay_ms, 250);
        assert_eq!(cfg.data_url, "data.txt");
    }

    #[test]
    fn malformed_json_is_invalid_config() {
        let err = QuizConfig::from_json("{max_groups:").unwrap_err();
        assert!(matches!(err, QuizError::InvalidConfig(_)));
    }
}
