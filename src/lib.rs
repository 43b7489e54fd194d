pub mod cli;
pub mod config;
pub mod convert;
pub mod filter;
pub mod format;
pub mod matcher;
pub mod pipeline;
pub mod report;
pub mod request;

use anyhow::{Context, bail};
use colored::Colorize;
use comfy_table::Cell;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub use cli::{Cli, ColorMode, Commands, OutputFormat, SortBy, cli_parse};
pub use config::{
    AnalyzerConfig, CompiledProfile, ConfigError, builtin_profile_names, default_config,
    load_builtin_profile, load_config, load_config_from_path, resolve_config,
};
pub use convert::{Conversion, ConversionError, FieldValue, Fields, LiteralError};
pub use filter::{
    Categorizer, CategoryKey, EvalError, FilterExpression, FilterParseError, RequestFilter,
};
pub use format::{
    CaptureConfig, FileFormat, FormatConfig, FormatError, LineDefinitionConfig, LineRole,
};
pub use matcher::{LineMatcher, MatchOutcome};
pub use pipeline::{
    Analysis, AnalysisReport, AnalyzeOptions, PipelineError, RunSummary, StreamProcessor,
    StreamSummary, analyze_files, analyze_lines, analyze_path, analyze_reader,
};
pub use report::{
    Report, ReportConfig, ReportError, ReportKind, ReportSet, ReportSnapshot, SortOrder,
};
pub use request::{Record, Request, RequestBuilder, RequestSink, RequestStatus, TypedEvent};

fn write_output(path: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write output file '{}'", path.display())),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}

fn spinner(cli: &Cli) -> Option<ProgressBar> {
    if cli.quiet || (cli.format == OutputFormat::Json && cli.output.is_none()) {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {human_pos} lines ({per_sec})") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    Some(bar)
}

fn describe_profile(profile: &CompiledProfile) -> String {
    let mut out = format!(
        "{} {}\n\n",
        "Profile is valid:".green().bold(),
        profile.name.bold()
    );

    let mut lines = report::create_styled_table(&["Line", "Role", "Teaser", "Captures"]);
    for definition in &profile.matcher.format().definitions {
        let captures: Vec<String> = definition
            .captures
            .iter()
            .map(|c| format!("{}:{}", c.name, c.conversion))
            .collect();
        lines.add_row(vec![
            Cell::new(&definition.name),
            Cell::new(definition.role),
            Cell::new(definition.teaser.as_ref().map(|t| t.as_str()).unwrap_or("-")),
            Cell::new(captures.join(", ")),
        ]);
    }
    out.push_str(&format!("{lines}\n\n"));

    let mut reports =
        report::create_styled_table(&["Report", "Kind", "Category", "Value", "Filter", "Line types"]);
    for report in profile.reports.reports() {
        let mut line_types = report.line_types().join(", ");
        if report.is_per_event() {
            line_types.push_str(" (each)");
        }
        reports.add_row(vec![
            Cell::new(report.title()),
            Cell::new(report.kind()),
            Cell::new(report.categorizer().map(ToString::to_string).unwrap_or_default()),
            Cell::new(report.value_field().unwrap_or_default()),
            Cell::new(report.filter().map(ToString::to_string).unwrap_or_default()),
            Cell::new(line_types),
        ]);
    }
    out.push_str(&format!("{reports}\n"));
    out
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto if cli.output.is_some() => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    if let Commands::Profiles = cli.command {
        let content = match cli.format {
            OutputFormat::Text => builtin_profile_names()
                .iter()
                .map(|name| format!("{name}\n"))
                .collect::<String>(),
            OutputFormat::Json => format!(
                "{}\n",
                serde_json::to_string_pretty(&builtin_profile_names())?
            ),
        };
        return write_output(cli.output.as_deref(), &content);
    }

    let analyzer_config = resolve_config(cli.config.as_deref(), cli.profile.as_deref())
        .context("Failed to load config")?;
    let profile = analyzer_config.compile()?;
    info!(
        profile = %profile.name,
        lines = profile.matcher.format().definitions.len(),
        reports = profile.reports.len(),
        "profile loaded"
    );

    match &cli.command {
        Commands::Profiles => Ok(()),
        Commands::Check => {
            let content = match cli.format {
                OutputFormat::Text => describe_profile(&profile),
                OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&analyzer_config)?),
            };
            write_output(cli.output.as_deref(), &content)
        }
        Commands::Analyze {
            files,
            jobs,
            sort_by,
            top,
        } => {
            let mut options = AnalyzeOptions::new();
            if let Some(jobs) = jobs {
                options = options.jobs(*jobs);
            }
            let bar = spinner(&cli);
            if let Some(bar) = &bar {
                options = options.progress(bar.clone());
            }

            let analysis = analyze_files(&profile.matcher, files, profile.reports, &options);
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }

            let snapshot = analysis.snapshot((*sort_by).into());
            let content = match cli.format {
                OutputFormat::Text => report::format_analysis_text(&snapshot, Some(*top)),
                OutputFormat::Json => format!("{}\n", report::format_analysis_json(&snapshot)?),
            };
            write_output(cli.output.as_deref(), &content)?;

            let failed = analysis.summary.failed_sources();
            if failed > 0 {
                bail!("{failed} of {} inputs could not be read", files.len());
            }
            Ok(())
        }
    }
}
