use std::process::ExitCode;

use argo_submit::{ExampleArgs, init_tracing, run_main};
use argo_submit_engine::ExampleWorkflow;

#[tokio::main]
async fn main() -> ExitCode {
    let args = ExampleArgs::parse_for(ExampleWorkflow::RetryStep);
    init_tracing();
    run_main(ExampleWorkflow::RetryStep, args).await
}
