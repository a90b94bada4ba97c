//! # Argo Submit Engine
//!
//! The submit-and-await protocol for Argo workflows: create a workflow,
//! subscribe to changes on exactly that workflow, and stop at the first
//! event carrying a finish timestamp. Scheduling, retries and dependency
//! evaluation all happen in the Argo controller; nothing here interprets the
//! submitted graph.
//!
//! ## Usage
//!
//! ```ignore
//! use argo_submit_api::ConnectionSettings;
//! use argo_submit_engine::{ExampleWorkflow, connect, submit_and_await, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT};
//!
//! let api = connect(&ConnectionSettings::default(), DEFAULT_NAMESPACE)?;
//! let (identity, outcome) = submit_and_await(&api, &ExampleWorkflow::Steps.build(), DEFAULT_TIMEOUT).await?;
//! ```
//!
//! ## Architecture
//!
//! - **`orchestrator`**: traits for the create call and the change stream,
//!   implemented for the Kubernetes client
//! - **`watcher`**: `submit`, `await_completion` and their outcomes
//! - **`catalog`**: the example DAG and steps workflows

pub mod catalog;
pub mod orchestrator;
pub mod watcher;

pub use catalog::{ExampleWorkflow, dag_example, retry_step_example, steps_example};
pub use orchestrator::{WorkflowOrchestrator, WorkflowSubscription};
pub use watcher::{
    CompletionOutcome, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT, WatchOptions, WatcherError, await_completion, connect, submit, submit_and_await,
};
