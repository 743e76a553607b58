use std::process::ExitCode;

mod app {
    pub(crate) mod bootstrap;
    pub(crate) mod gameplay;
    pub(crate) mod loop_runner;
}

fn main() -> ExitCode {
    match app::bootstrap::build_app() {
        Ok(wiring) => app::loop_runner::run(wiring),
        Err(error) => {
            tracing::error!(error = %error, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
