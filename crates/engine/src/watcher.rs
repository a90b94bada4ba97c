//! Submit a workflow, then wait for it to finish.
//!
//! [`submit`] issues the create call. [`await_completion`] opens a
//! subscription scoped to the submitted workflow, consumes events in delivery
//! order and stops at the first one carrying a finish timestamp. Every way
//! out of the wait is reported as a [`CompletionOutcome`]; only setup and
//! submission problems are errors.

use std::time::Duration;

use argo_submit_api::{ApiError, ClusterClient, ConnectionSettings, WorkflowsApi};
use argo_submit_types::{
    InvalidResourceName, SubmittedWorkflow, TerminalStatus, WatchEventType, Workflow, WorkflowProgress, is_valid_resource_name,
};
use thiserror::Error;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::orchestrator::{WorkflowOrchestrator, WorkflowSubscription};

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "argo";
/// How long to wait for a submitted workflow to finish.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Fatal failures; nothing is retried.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("error building cluster configuration: {0}")]
    SetupFailure(#[source] ApiError),
    #[error("error creating argo workflow: {0}")]
    SubmissionFailure(#[source] ApiError),
}

/// Where to submit and how long to wait.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub namespace: String,
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// How a wait for completion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// A finishing event arrived. The phase is reported as-is.
    Finished(TerminalStatus),
    /// The deadline passed without a finishing event.
    TimedOut { waited: Duration },
    /// The server ended the stream early without a finishing event.
    StreamClosed,
    /// The workflow was deleted before it finished.
    Deleted,
    /// The subscription could not be opened or broke mid-stream.
    StreamFailed { reason: String },
}

impl CompletionOutcome {
    pub fn terminal_status(&self) -> Option<&TerminalStatus> {
        match self {
            Self::Finished(status) => Some(status),
            _ => None,
        }
    }
}

/// Resolve the connection and build a namespaced workflow client.
pub fn connect(settings: &ConnectionSettings, namespace: &str) -> Result<WorkflowsApi, WatcherError> {
    let config = settings.resolve().map_err(|err| WatcherError::SetupFailure(err.into()))?;
    let client = ClusterClient::new(&config).map_err(WatcherError::SetupFailure)?;
    Ok(WorkflowsApi::new(client, namespace))
}

/// Create `workflow` and return its server-assigned identity.
///
/// The returned name is checked to be a valid resource name, so it can be
/// used verbatim in a field selector.
pub async fn submit(orchestrator: &dyn WorkflowOrchestrator, workflow: &Workflow) -> Result<SubmittedWorkflow, WatcherError> {
    let created = orchestrator
        .create(workflow)
        .await
        .map_err(WatcherError::SubmissionFailure)?;

    let name = created.name().unwrap_or_default();
    if !is_valid_resource_name(name) {
        return Err(WatcherError::SubmissionFailure(ApiError::InvalidName(InvalidResourceName {
            name: name.to_string(),
            reason: "server returned a workflow without a usable name",
        })));
    }
    let namespace = created
        .metadata
        .namespace
        .clone()
        .filter(|namespace| !namespace.is_empty())
        .unwrap_or_else(|| orchestrator.namespace().to_string());

    Ok(SubmittedWorkflow {
        name: name.to_string(),
        namespace,
    })
}

/// Block until `identity` finishes, the deadline passes, or the stream ends.
///
/// The subscription is closed exactly once on every path, including when
/// this future is dropped before completing.
pub async fn await_completion(orchestrator: &dyn WorkflowOrchestrator, identity: &SubmittedWorkflow, timeout: Duration) -> CompletionOutcome {
    let started = Instant::now();
    let deadline = started + timeout;

    let subscription = match timeout_at(deadline, orchestrator.subscribe(identity, timeout)).await {
        Ok(Ok(subscription)) => subscription,
        Ok(Err(err)) => {
            warn!(workflow = %identity, error = %err, "failed to open workflow watch");
            return CompletionOutcome::StreamFailed { reason: err.to_string() };
        }
        Err(_) => return CompletionOutcome::TimedOut { waited: started.elapsed() },
    };
    let mut subscription = SubscriptionGuard::new(subscription);

    let outcome = match timeout_at(deadline, subscription.first_terminal(identity)).await {
        Ok(WatchEnd::Finished(status)) => CompletionOutcome::Finished(status),
        Ok(WatchEnd::Deleted) => CompletionOutcome::Deleted,
        Ok(WatchEnd::Failed(reason)) => CompletionOutcome::StreamFailed { reason },
        Ok(WatchEnd::Exhausted) if Instant::now() >= deadline => CompletionOutcome::TimedOut { waited: started.elapsed() },
        Ok(WatchEnd::Exhausted) => CompletionOutcome::StreamClosed,
        Err(_) => CompletionOutcome::TimedOut { waited: started.elapsed() },
    };
    subscription.close();
    outcome
}

/// Submit, log the assigned name, then wait for completion.
pub async fn submit_and_await(
    orchestrator: &dyn WorkflowOrchestrator,
    workflow: &Workflow,
    timeout: Duration,
) -> Result<(SubmittedWorkflow, CompletionOutcome), WatcherError> {
    let identity = submit(orchestrator, workflow).await?;
    info!("Workflow {} submitted", identity.name);
    let outcome = await_completion(orchestrator, &identity, timeout).await;
    Ok((identity, outcome))
}

enum WatchEnd {
    Finished(TerminalStatus),
    Deleted,
    Failed(String),
    Exhausted,
}

/// Owns a subscription and closes it once, on [`SubscriptionGuard::close`] or on drop.
struct SubscriptionGuard {
    inner: Option<Box<dyn WorkflowSubscription>>,
}

impl SubscriptionGuard {
    fn new(inner: Box<dyn WorkflowSubscription>) -> Self {
        Self { inner: Some(inner) }
    }

    fn close(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.close();
        }
    }

    async fn first_terminal(&mut self, identity: &SubmittedWorkflow) -> WatchEnd {
        let Some(subscription) = self.inner.as_mut() else {
            return WatchEnd::Exhausted;
        };
        while let Some(event) = subscription.next_event().await {
            let event = match event {
                Ok(event) => event,
                Err(ApiError::Decode(err)) => {
                    warn!(error = %err, "skipping undecodable watch line");
                    continue;
                }
                Err(err) => return WatchEnd::Failed(err.to_string()),
            };

            match event.event_type {
                WatchEventType::Error => {
                    let reason = event
                        .error_status()
                        .map(|status| status.to_string())
                        .unwrap_or_else(|| format!("watch error: {}", event.object));
                    return WatchEnd::Failed(reason);
                }
                WatchEventType::Bookmark => continue,
                _ => {}
            }

            let progress: WorkflowProgress = match serde_json::from_value(event.object) {
                Ok(progress) => progress,
                Err(err) => {
                    debug!(error = %err, "skipping event that is not a workflow");
                    continue;
                }
            };
            if progress.name() != Some(identity.name.as_str()) {
                debug!(name = ?progress.name(), expected = %identity.name, "skipping event for another workflow");
                continue;
            }
            if let Some(status) = progress.terminal_status() {
                return WatchEnd::Finished(status);
            }
            if event.event_type == WatchEventType::Deleted {
                return WatchEnd::Deleted;
            }
            debug!(
                workflow = %identity,
                phase = ?progress.status.phase,
                "workflow not finished yet"
            );
        }
        WatchEnd::Exhausted
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.close();
    }
}
