use std::process::ExitCode;

use clap::Parser;

use budget_core::settings::TemplateSettings;
use budget_report::template::write_template;
use pc_budget::{bootstrap, pipeline};

fn main() -> ExitCode {
    let settings = TemplateSettings::parse();

    if let Err(err) = bootstrap::setup_logging(&settings.log_level, None) {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }

    match write_template(&settings.output, settings.with_examples, settings.force) {
        Ok(()) => {
            println!("✓ Template created: {}", settings.output.display());
            if !settings.with_examples {
                println!("  Fill in PC models, unit prices and monthly quantities, then run pc-budget.");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let err = anyhow::Error::from(err);
            eprintln!("error: {err:#}");
            ExitCode::from(pipeline::exit_code(&err))
        }
    }
}
