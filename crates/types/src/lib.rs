//! Shared type definitions for the Argo submit examples.
//!
//! The models mirror the `argoproj.io/v1alpha1` `Workflow` custom resource as
//! it travels over the Kubernetes API: the authored spec, the status written
//! back by the controller, and the envelope used by watch streams.

pub mod names;
pub mod status;
pub mod watch;
pub mod workflow;

pub use names::{InvalidResourceName, field_selector_for, is_valid_resource_name};
pub use status::{TerminalStatus, WorkflowPhase, WorkflowProgress, WorkflowStatus};
pub use watch::{ApiStatus, WatchEvent, WatchEventType};
pub use workflow::{
    Arguments, Backoff, Container, DagTask, DagTemplate, Inputs, IntOrString, ObjectMeta, ParallelSteps, Parameter, RetryPolicy,
    RetryStrategy, SubmittedWorkflow, Template, Workflow, WorkflowSpec, WorkflowStep,
};

/// API group served by the Argo workflow controller.
pub const ARGO_GROUP: &str = "argoproj.io";
/// API version of the `Workflow` resource.
pub const ARGO_VERSION: &str = "v1alpha1";
/// Plural resource name used in REST paths.
pub const WORKFLOW_RESOURCE: &str = "workflows";
/// Kind written into every submitted manifest.
pub const WORKFLOW_KIND: &str = "Workflow";
