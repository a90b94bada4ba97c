//! Example workflows submitted by the binaries.
//!
//! Each constructor returns a manifest with `generateName` set, so every
//! submission gets a fresh server-assigned name. The `{{inputs.parameters.*}}`
//! placeholders are left for the controller to substitute.

use argo_submit_types::{
    Arguments, Backoff, Container, DagTask, DagTemplate, Inputs, ParallelSteps, Parameter, RetryPolicy, RetryStrategy, Template, Workflow,
    WorkflowSpec, WorkflowStep,
};

/// Script that exits non-zero two times out of three.
pub const FLAKY_SCRIPT: &str = "import random; import sys; exit_code = random.choice([0, 1, 1]);  print(exit_code);sys.exit(exit_code)";
/// Script that exits non-zero three times out of four.
pub const FLAKIER_SCRIPT: &str =
    "import random; import sys; exit_code = random.choice([0, 1, 1, 1]);  print(exit_code);sys.exit(exit_code)";

const WHALESAY_IMAGE: &str = "docker/whalesay:latest";
const PYTHON_IMAGE: &str = "python:alpine3.6";

/// Which example a binary submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleWorkflow {
    Dag,
    Steps,
    RetryStep,
}

impl ExampleWorkflow {
    pub fn build(self) -> Workflow {
        match self {
            Self::Dag => dag_example(),
            Self::Steps => steps_example(),
            Self::RetryStep => retry_step_example(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dag => "dag",
            Self::Steps => "steps",
            Self::RetryStep => "retry-step",
        }
    }
}

/// Retry up to five times regardless of failure type, backing off 2s, 4s, 8s... capped at one minute.
fn retry_always() -> RetryStrategy {
    RetryStrategy {
        limit: Some("5".into()),
        retry_policy: Some(RetryPolicy::Always),
        backoff: Some(Backoff {
            duration: Some("2s".into()),
            factor: Some("2".into()),
            max_duration: Some("1m".into()),
        }),
    }
}

fn container(image: &str, command: &[&str], parameter: &str) -> Container {
    Container {
        image: image.to_string(),
        command: command.iter().map(|part| part.to_string()).collect(),
        args: vec![format!("{{{{inputs.parameters.{}}}}}", parameter)],
    }
}

fn step(name: &str, template: &str, parameter: &str, value: &str) -> WorkflowStep {
    WorkflowStep {
        name: name.to_string(),
        template: template.to_string(),
        arguments: Some(Arguments::parameter(parameter, value)),
    }
}

/// Diamond-shaped DAG of eight tasks sharing one retrying `echo` template.
///
/// ```text
///        A
///      / | \
///     B  C  D
///     |  |  |
///     E  F  |
///      \ /  |
///       G   |
///        \ /
///         H
/// ```
pub fn dag_example() -> Workflow {
    let echo = Template {
        name: "echo".into(),
        inputs: Some(Inputs {
            parameters: vec![Parameter::declared("message")],
        }),
        container: Some(container(WHALESAY_IMAGE, &["cowsay"], "message")),
        retry_strategy: Some(retry_always()),
        ..Template::default()
    };

    let edges: [(&str, Option<&str>); 8] = [
        ("A", None),
        ("B", Some("A")),
        ("C", Some("A")),
        ("D", Some("A")),
        ("E", Some("B")),
        ("F", Some("C")),
        ("G", Some("E && F")),
        ("H", Some("G && D")),
    ];
    let tasks = edges
        .into_iter()
        .map(|(name, depends)| DagTask {
            name: name.to_string(),
            template: "echo".into(),
            arguments: Some(Arguments::parameter("message", FLAKY_SCRIPT)),
            depends: depends.map(str::to_string),
        })
        .collect();

    let dag = Template {
        name: "dag-example".into(),
        dag: Some(DagTemplate { tasks, fail_fast: None }),
        ..Template::default()
    };

    Workflow::with_generate_name("dag-example", WorkflowSpec {
        entrypoint: "dag-example".into(),
        templates: vec![echo, dag],
        ..WorkflowSpec::default()
    })
}

/// Two step groups: five greetings in parallel, then one more.
pub fn steps_example() -> Workflow {
    let whalesay = Template {
        name: "whalesay".into(),
        inputs: Some(Inputs {
            parameters: vec![Parameter::declared("message")],
        }),
        container: Some(container(WHALESAY_IMAGE, &["cowsay"], "message")),
        ..Template::default()
    };

    let first_group = [
        ("Step-1", "Hello-A"),
        ("Step-1A", "Hello-AA"),
        ("Step-1AA", "Hello-AAA"),
        ("Step-1AAA", "Hello-AAAA"),
        ("Step-1AAAA", "Hello-AAAAA"),
    ]
    .into_iter()
    .map(|(name, message)| step(name, "whalesay", "message", message))
    .collect::<Vec<_>>();
    let second_group = vec![step("Step-2", "whalesay", "message", "Hello-B")];

    let step_by_step = Template {
        name: "step-by-step".into(),
        steps: vec![ParallelSteps::from(first_group), ParallelSteps::from(second_group)],
        ..Template::default()
    };

    Workflow::with_generate_name("hello-word-", WorkflowSpec {
        entrypoint: "step-by-step".into(),
        templates: vec![whalesay, step_by_step],
        ..WorkflowSpec::default()
    })
}

/// One group of two flaky Python steps, each retried with backoff.
pub fn retry_step_example() -> Workflow {
    let retry_backoff = Template {
        name: "retry-backoff".into(),
        inputs: Some(Inputs {
            parameters: vec![Parameter::with_value("cmd", FLAKIER_SCRIPT)],
        }),
        container: Some(container(PYTHON_IMAGE, &["python", "-c"], "cmd")),
        retry_strategy: Some(retry_always()),
        ..Template::default()
    };

    let step_by_step = Template {
        name: "step-by-step".into(),
        steps: vec![ParallelSteps::from(vec![
            step("Step-1", "retry-backoff", "cmd", FLAKIER_SCRIPT),
            step("Step-1A", "retry-backoff", "cmd", FLAKIER_SCRIPT),
        ])],
        ..Template::default()
    };

    Workflow::with_generate_name("retry-backoff", WorkflowSpec {
        entrypoint: "step-by-step".into(),
        templates: vec![retry_backoff, step_by_step],
        ..WorkflowSpec::default()
    })
}
