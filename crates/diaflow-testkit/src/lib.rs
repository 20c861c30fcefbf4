//! Test utilities for exercising the flow engine with deterministic fixtures.
//!
//! - `fixtures`: builders for flow definitions, a recording host action and logging setup
//! - `TestSession`: an engine plus one in-memory session, driven fact by fact

pub mod fixtures;
mod session;

pub use fixtures::{FlowBuilder, RecordingAction, flow_set, init_logging, trigger};
pub use session::TestSession;
