//! Namespaced access to the `workflows.argoproj.io` resource.

use std::time::Duration;

use argo_submit_types::{ARGO_GROUP, ARGO_VERSION, WORKFLOW_RESOURCE, Workflow, field_selector_for};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Method;
use tracing::debug;

use crate::{
    ApiError, ClusterClient,
    client::ensure_success,
    watch::WatchStream,
};

/// Upper bound for a create call. The watch is long-lived and carries no request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Workflow client scoped to one namespace.
#[derive(Debug, Clone)]
pub struct WorkflowsApi {
    client: ClusterClient,
    namespace: String,
    request_timeout: Duration,
}

impl WorkflowsApi {
    pub fn new(client: ClusterClient, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Same client, different namespace.
    pub fn in_namespace(&self, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..self.clone()
        }
    }

    /// `/apis/argoproj.io/v1alpha1/namespaces/{ns}/workflows`
    pub fn collection_path(&self) -> String {
        format!(
            "/apis/{}/{}/namespaces/{}/{}",
            ARGO_GROUP, ARGO_VERSION, self.namespace, WORKFLOW_RESOURCE
        )
    }

    /// Create a workflow and return the object as stored by the server.
    pub async fn create(&self, workflow: &Workflow) -> Result<Workflow, ApiError> {
        let response = self
            .client
            .request(Method::POST, &self.collection_path())
            .timeout(self.request_timeout)
            .json(workflow)
            .send()
            .await?;
        let body = ensure_success(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Open a watch on the single workflow called `name`.
    ///
    /// The server ends the stream after `timeout` (rounded up to whole
    /// seconds). The name must be a valid resource name so that it can be
    /// used verbatim in the field selector.
    pub async fn watch(&self, name: &str, timeout: Duration) -> Result<WatchStream, ApiError> {
        let field_selector = field_selector_for(name)?;
        let timeout_seconds = timeout_seconds(timeout).to_string();
        debug!(namespace = %self.namespace, %field_selector, %timeout_seconds, "opening workflow watch");

        let response = self
            .client
            .request(Method::GET, &self.collection_path())
            .query(&[
                ("watch", "true"),
                ("fieldSelector", field_selector.as_str()),
                ("timeoutSeconds", timeout_seconds.as_str()),
            ])
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(ApiError::from)
            .boxed();
        Ok(WatchStream::from_chunks(body))
    }
}

fn timeout_seconds(timeout: Duration) -> u64 {
    let whole = timeout.as_secs();
    if timeout.subsec_nanos() > 0 { whole + 1 } else { whole.max(1) }
}
