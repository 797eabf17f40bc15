//! Conductor System
//!
//! Plan construction, step dispatch and session history.

pub mod executor;
pub mod memory;
pub mod planner;
pub mod types;

pub use executor::ToolDispatcher;
pub use memory::{HistoryEntry, InMemorySessionStore, SessionMemory, SessionStore};
pub use planner::{ParamSource, PlanStrategy, Planner, ToolStepStrategy};
pub use types::{Plan, PlanStep};
