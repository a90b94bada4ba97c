//! Seams between the submit/await protocol and the orchestration API.
//!
//! The protocol only needs a create call and a filtered change stream. Both
//! are expressed as traits so the watcher can run against the real
//! Kubernetes client or an in-memory fake.

use std::time::Duration;

use argo_submit_api::{ApiError, WatchStream, WorkflowsApi};
use argo_submit_types::{SubmittedWorkflow, WatchEvent, Workflow};
use async_trait::async_trait;

/// Creates workflows and opens change subscriptions on them.
#[async_trait]
pub trait WorkflowOrchestrator: Send + Sync {
    /// Namespace new workflows are created in.
    fn namespace(&self) -> &str;

    /// Submit a workflow; returns the object as stored by the server.
    async fn create(&self, workflow: &Workflow) -> Result<Workflow, ApiError>;

    /// Open a subscription delivering change events for `identity` only.
    /// The server may end it once `timeout` has elapsed.
    async fn subscribe(&self, identity: &SubmittedWorkflow, timeout: Duration) -> Result<Box<dyn WorkflowSubscription>, ApiError>;
}

/// A live change stream.
#[async_trait]
pub trait WorkflowSubscription: Send {
    /// Next event in delivery order; `None` once the stream has ended.
    async fn next_event(&mut self) -> Option<Result<WatchEvent, ApiError>>;

    /// Release the server-side session.
    fn close(&mut self);
}

#[async_trait]
impl WorkflowOrchestrator for WorkflowsApi {
    fn namespace(&self) -> &str {
        WorkflowsApi::namespace(self)
    }

    async fn create(&self, workflow: &Workflow) -> Result<Workflow, ApiError> {
        WorkflowsApi::create(self, workflow).await
    }

    async fn subscribe(&self, identity: &SubmittedWorkflow, timeout: Duration) -> Result<Box<dyn WorkflowSubscription>, ApiError> {
        let stream = if identity.namespace == WorkflowsApi::namespace(self) {
            self.watch(&identity.name, timeout).await?
        } else {
            self.in_namespace(&identity.namespace).watch(&identity.name, timeout).await?
        };
        Ok(Box::new(stream))
    }
}

#[async_trait]
impl WorkflowSubscription for WatchStream {
    async fn next_event(&mut self) -> Option<Result<WatchEvent, ApiError>> {
        WatchStream::next_event(self).await
    }

    fn close(&mut self) {
        WatchStream::close(self)
    }
}
