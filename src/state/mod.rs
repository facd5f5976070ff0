//! State module for tracking keyword tasks
//!
//! # Components
//!
//! - `TaskStatus`: Lifecycle state of a keyword task (pending, running, success, failed)
//! - `Task`: One keyword's scheduling record
//! - `TaskStore`: Lock-guarded task table and result sets shared by callers and workers

mod task_state;
mod task_store;

// Re-export main types
pub use task_state::{Task, TaskStatus};
pub use task_store::{EnqueueOutcome, TaskStore};
