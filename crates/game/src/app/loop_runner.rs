use std::process::ExitCode;

use engine::{run_app, AppError};
use tracing::error;

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_app(app.config, app.scene) {
        let event = failure_event(&err);
        error!(error = %err, "{event}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn failure_event(error: &AppError) -> &'static str {
    if error.is_runtime() {
        "event_loop_failed"
    } else {
        "startup_failed"
    }
}
