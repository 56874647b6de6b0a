use std::process::ExitCode;

use budget_core::settings::Settings;
use pc_budget::{bootstrap, pipeline};

fn main() -> ExitCode {
    let settings = Settings::load();

    if let Err(err) = bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref()) {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }

    tracing::info!("PC Budget Calculator v{} starting", env!("CARGO_PKG_VERSION"));

    match pipeline::run(&settings) {
        Ok(summary) => {
            tracing::info!(
                "Done: {} models from {}, {} warnings",
                summary.models,
                summary.input.display(),
                summary.warning_count
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!("run failed: {err:?}");
            eprintln!("error: {err:#}");
            ExitCode::from(pipeline::exit_code(&err))
        }
    }
}
