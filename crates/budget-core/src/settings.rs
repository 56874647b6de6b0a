use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Default input workbook, the file `pc-budget-template` creates.
pub const DEFAULT_INPUT: &str = "PC_Budget_Monthly_Template.xlsx";

/// Default output workbook.
pub const DEFAULT_OUTPUT: &str = "PC_Budget_Results.xlsx";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// How results are printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables.
    Table,
    /// The full result as pretty-printed JSON.
    Json,
}

/// Monthly PC rental budget calculator
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pc-budget",
    about = "Compute monthly and annual PC rental budgets from a rental/returning workbook",
    version
)]
pub struct Settings {
    /// Input workbook (first sheet: rental PCs, second sheet: returning PCs)
    #[arg(env = "PC_BUDGET_INPUT")]
    pub input: Option<PathBuf>,

    /// Output workbook, overwritten if it exists
    #[arg(long, env = "PC_BUDGET_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// JSON file with extra header aliases
    #[arg(long, env = "PC_BUDGET_ALIASES")]
    pub aliases: Option<PathBuf>,

    /// Console output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Disable coloured console output
    #[arg(long)]
    pub no_color: bool,

    /// Console colour theme
    #[arg(long, env = "PC_BUDGET_THEME", default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, env = "PC_BUDGET_LOG", default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Also append log output to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and resolve derived values.
    pub fn load() -> Self {
        Self::resolve(Self::parse())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list.
    pub fn load_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args).map(Self::resolve)
    }

    /// `--debug` overrides the log level; `NO_COLOR` disables colour.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            settings.no_color = true;
        }
        settings
    }
}

// ── TemplateSettings (CLI) ─────────────────────────────────────────────────────

/// Write a blank PC budget input workbook
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pc-budget-template",
    about = "Write a blank PC budget input workbook with the expected headers",
    version
)]
pub struct TemplateSettings {
    /// Path of the workbook to create
    #[arg(default_value = DEFAULT_INPUT)]
    pub output: PathBuf,

    /// Fill the template with sample models and quantities
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite the file if it already exists
    #[arg(long)]
    pub force: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::try_parse_from(["pc-budget"]).expect("parse");

        assert_eq!(settings.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(settings.format, OutputFormat::Table);
        assert!(!settings.no_color);
        assert!(!settings.debug);
        assert!(settings.log_file.is_none());
        assert_eq!(settings.theme, "auto");
    }

    #[test]
    fn test_settings_explicit_values() {
        let settings = Settings::try_parse_from([
            "pc-budget",
            "budget.xlsx",
            "--output",
            "out.xlsx",
            "--aliases",
            "aliases.json",
            "--format",
            "json",
            "--no-color",
            "--log-level",
            "INFO",
            "--log-file",
            "run.log",
        ])
        .expect("parse");

        assert_eq!(settings.input, Some(PathBuf::from("budget.xlsx")));
        assert_eq!(settings.output, PathBuf::from("out.xlsx"));
        assert_eq!(settings.aliases, Some(PathBuf::from("aliases.json")));
        assert_eq!(settings.format, OutputFormat::Json);
        assert!(settings.no_color);
        assert_eq!(settings.log_level, "INFO");
        assert_eq!(settings.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let settings =
            Settings::load_from(["pc-budget", "--debug", "--log-level", "ERROR"]).expect("parse");
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(Settings::try_parse_from(["pc-budget", "--log-level", "LOUD"]).is_err());
    }

    #[test]
    fn test_theme_choices() {
        let settings = Settings::try_parse_from(["pc-budget", "--theme", "classic"]).expect("parse");
        assert_eq!(settings.theme, "classic");
        assert!(Settings::try_parse_from(["pc-budget", "--theme", "neon"]).is_err());
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(Settings::try_parse_from(["pc-budget", "--format", "csv"]).is_err());
    }

    #[test]
    fn test_template_settings_defaults() {
        let settings = TemplateSettings::try_parse_from(["pc-budget-template"]).expect("parse");
        assert_eq!(settings.output, PathBuf::from(DEFAULT_INPUT));
        assert!(!settings.with_examples);
        assert!(!settings.force);
    }

    #[test]
    fn test_template_settings_flags() {
        let settings = TemplateSettings::try_parse_from([
            "pc-budget-template",
            "my.xlsx",
            "--with-examples",
            "--force",
        ])
        .expect("parse");
        assert_eq!(settings.output, PathBuf::from("my.xlsx"));
        assert!(settings.with_examples);
        assert!(settings.force);
    }
}
