//! Kubernetes API client for Argo workflows.
//!
//! This crate provides the two calls the submit examples need, plus the
//! plumbing around them:
//!
//! - Resolving a cluster connection from a kubeconfig, a master URL or the
//!   in-cluster service account ([`ConnectionSettings`])
//! - Building an HTTP client with the resolved credentials and TLS material
//!   ([`ClusterClient`])
//! - Creating a workflow and watching a single workflow by name
//!   ([`WorkflowsApi`])
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use argo_submit_api::{ClusterClient, ConnectionSettings, WorkflowsApi};
//!
//! let config = ConnectionSettings::new(None, Some("http://127.0.0.1:8001".into())).resolve()?;
//! let api = WorkflowsApi::new(ClusterClient::new(&config)?, "argo");
//! let created = api.create(&workflow).await?;
//! let mut watch = api.watch(created.name().unwrap_or_default(), Duration::from_secs(180)).await?;
//! while let Some(event) = watch.next_event().await {
//!     println!("{:?}", event?.event_type);
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod kubeconfig;
pub mod watch;
pub mod workflows;

pub use client::ClusterClient;
pub use config::{Auth, ClusterConfig, ConfigError, ConnectionSettings, TlsSettings};
pub use error::ApiError;
pub use watch::{LineDecoder, WatchStream};
pub use workflows::WorkflowsApi;
