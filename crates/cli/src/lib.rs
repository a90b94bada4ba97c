//! Shared entry point for the example binaries.
//!
//! Every binary parses the same flags, builds its example workflow, submits
//! it and waits for it to finish. Setup and submission failures end the
//! process with a logged cause; a wait that ends without a finished workflow
//! is reported with a warning and a non-zero exit.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use argo_submit_api::ConnectionSettings;
use argo_submit_engine::{CompletionOutcome, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT, ExampleWorkflow, WatchOptions, connect, submit_and_await};
use argo_submit_types::{SubmittedWorkflow, Workflow};
use clap::{CommandFactory, FromArgMatches, Parser};
use tracing::{error, warn};

/// Flags accepted by every example binary.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct ExampleArgs {
    /// Path to a kubeconfig. Only required if out-of-cluster.
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// The address of the Kubernetes API server. Overrides any value in kubeconfig. Only required if out-of-cluster.
    #[arg(long, value_name = "URL")]
    pub master: Option<String>,

    /// Namespace the workflow runs in.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Seconds to wait for the workflow to finish.
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Print the workflow manifest as YAML instead of submitting it.
    #[arg(long)]
    pub dry_run: bool,
}

impl ExampleArgs {
    /// Parse the process arguments, naming the command after the example.
    pub fn parse_for(example: ExampleWorkflow) -> Self {
        let matches = Self::command()
            .name(example.name())
            .about(about(example))
            .get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::new(self.kubeconfig.clone(), self.master.clone())
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            namespace: self.namespace.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

fn about(example: ExampleWorkflow) -> &'static str {
    match example {
        ExampleWorkflow::Dag => "Submit a diamond-shaped DAG workflow with retries and wait for it to finish",
        ExampleWorkflow::Steps => "Submit a two-stage steps workflow and wait for it to finish",
        ExampleWorkflow::RetryStep => "Submit a steps workflow whose flaky steps retry with backoff, and wait for it to finish",
    }
}

pub fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run one example to completion and map the result to an exit code.
pub async fn run_main(example: ExampleWorkflow, args: ExampleArgs) -> ExitCode {
    match run_example(example, &args).await {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

pub async fn run_example(example: ExampleWorkflow, args: &ExampleArgs) -> Result<ExitCode> {
    let workflow = example.build();
    if args.dry_run {
        print!("{}", render_manifest(&workflow)?);
        return Ok(ExitCode::SUCCESS);
    }

    let options = args.watch_options();
    let api = connect(&args.connection_settings(), &options.namespace)?;
    let (identity, outcome) = submit_and_await(&api, &workflow, options.timeout)
        .await
        .with_context(|| format!("submitting the {} example to namespace '{}'", example.name(), options.namespace))?;

    let report = Report::new(&identity, &outcome);
    if report.finished {
        println!("{}", report.line);
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("{}", report.line);
        Ok(ExitCode::FAILURE)
    }
}

pub fn render_manifest(workflow: &Workflow) -> Result<String> {
    serde_yaml::to_string(workflow).context("render workflow manifest")
}

/// One-line description of how the wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub finished: bool,
    pub line: String,
}

impl Report {
    pub fn new(identity: &SubmittedWorkflow, outcome: &CompletionOutcome) -> Self {
        let (finished, line) = match outcome {
            CompletionOutcome::Finished(status) => (true, status.to_string()),
            CompletionOutcome::TimedOut { waited } => (
                false,
                format!("Workflow {} did not finish within {}s", identity.name, waited.as_secs()),
            ),
            CompletionOutcome::StreamClosed => (false, format!("Watch on workflow {} closed before it finished", identity.name)),
            CompletionOutcome::Deleted => (false, format!("Workflow {} was deleted before it finished", identity.name)),
            CompletionOutcome::StreamFailed { reason } => (
                false,
                format!("Watch on workflow {} failed before it finished: {}", identity.name, reason),
            ),
        };
        Self { finished, line }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_submit_types::{TerminalStatus, WorkflowPhase};

    fn identity() -> SubmittedWorkflow {
        SubmittedWorkflow {
            name: "hello-word-x7k2p".into(),
            namespace: "argo".into(),
        }
    }

    #[test]
    fn command_definition_is_valid() {
        ExampleArgs::command().debug_assert();
    }

    #[test]
    fn defaults_are_argo_namespace_and_three_minutes() {
        let args = ExampleArgs::try_parse_from(["steps"]).unwrap();
        assert!(args.kubeconfig.is_none());
        assert!(args.master.is_none());
        assert!(!args.dry_run);
        let options = args.watch_options();
        assert_eq!(options.namespace, "argo");
        assert_eq!(options.timeout, Duration::from_secs(180));
    }

    #[test]
    fn flags_flow_into_connection_settings() {
        let args = ExampleArgs::try_parse_from([
            "dag",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--master",
            "https://10.0.0.1:6443",
            "--namespace",
            "workflows",
            "--timeout",
            "30",
        ])
        .unwrap();
        let settings = args.connection_settings();
        assert_eq!(settings.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(settings.master_url.as_deref(), Some("https://10.0.0.1:6443"));
        assert_eq!(args.watch_options().namespace, "workflows");
        assert_eq!(args.watch_options().timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(ExampleArgs::try_parse_from(["dag", "--timeout", "0"]).is_err());
    }

    #[test]
    fn manifest_renders_as_argo_yaml() {
        let yaml = render_manifest(&ExampleWorkflow::Dag.build()).unwrap();
        assert!(yaml.contains("apiVersion: argoproj.io/v1alpha1"));
        assert!(yaml.contains("generateName: dag-example"));
        assert!(yaml.contains("E && F"));
    }

    #[test]
    fn finished_report_prints_status_line() {
        let status = TerminalStatus {
            name: "hello-word-x7k2p".into(),
            phase: Some(WorkflowPhase::Succeeded),
            finished_at: "2024-05-01T10:03:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap(),
            message: None,
        };
        let report = Report::new(&identity(), &CompletionOutcome::Finished(status));
        assert!(report.finished);
        assert_eq!(
            report.line,
            "Workflow hello-word-x7k2p Succeeded at 2024-05-01 10:03:00 UTC. Message: ."
        );
    }

    #[test]
    fn non_terminal_outcomes_are_distinguishable() {
        let outcomes = [
            CompletionOutcome::TimedOut {
                waited: Duration::from_secs(180),
            },
            CompletionOutcome::StreamClosed,
            CompletionOutcome::Deleted,
            CompletionOutcome::StreamFailed { reason: "Expired".into() },
        ];
        let lines: Vec<String> = outcomes
            .iter()
            .map(|outcome| Report::new(&identity(), outcome))
            .inspect(|report| assert!(!report.finished))
            .map(|report| report.line)
            .collect();

        assert_eq!(lines[0], "Workflow hello-word-x7k2p did not finish within 180s");
        let unique: std::collections::HashSet<&String> = lines.iter().collect();
        assert_eq!(unique.len(), lines.len());
    }
}
