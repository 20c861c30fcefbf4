use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ROUNDS: usize = 1024;
pub const DEFAULT_MAX_FLOW_STEPS: usize = 4096;

/// Engine tuning. `None` disables the corresponding cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixpoint rounds allowed per `propagate` call.
    pub max_rounds: Option<usize>,
    /// Edges one path may follow during a single flow phase.
    pub max_flow_steps: Option<usize>,
    /// Indicate the start nodes of autostart flows when a session is created.
    pub autostart: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rounds: Some(DEFAULT_MAX_ROUNDS),
            max_flow_steps: Some(DEFAULT_MAX_FLOW_STEPS),
            autostart: true,
        }
    }
}
