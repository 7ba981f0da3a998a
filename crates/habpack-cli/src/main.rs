mod completion;
mod render;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use habpack_core::{version_code, MigrationSection};
use habpack_installer::{
    default_user_prefix, plan_migrations, read_layout_file, render_env_file,
    run_migration_section, write_env_files, DistroLayout, Notice, UpgradeOptions,
    UpgradeOrchestrator, UpgradeReport, UpgradeRun, DEFAULT_PROCESS_PATTERN,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::completion::{write_completions_script, CliCompletionShell};
use crate::render::{
    current_output_style, format_migration_outcome_line, format_paths_lines, format_plan_lines,
    format_upgrade_report_lines, TerminalRenderer,
};

#[derive(Parser, Debug)]
#[command(name = "habpack")]
#[command(
    about = "Upgrade an openHAB installation from a staged release",
    long_about = None
)]
struct Cli {
    /// Installation prefix; defaults to HABPACK_PREFIX, then ~/.habpack.
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,
    /// TOML file overriding individual directory roots.
    #[arg(long, global = true)]
    layout: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply the staged release to the live tree.
    Upgrade {
        #[arg(long)]
        purge_staging: bool,
        #[arg(long)]
        skip_running_check: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show the migration commands an upgrade from VERSION would run.
    Plan {
        #[arg(long)]
        from: String,
        #[arg(long = "section", value_enum, ignore_case = true)]
        sections: Vec<CliSection>,
        #[arg(long)]
        json: bool,
    },
    /// Run one migration section against the live tree.
    Migrate {
        #[arg(long)]
        from: String,
        #[arg(long, value_enum, ignore_case = true)]
        section: CliSection,
    },
    VersionCode {
        version: String,
    },
    Paths,
    /// Print the environment file, or write it with the launcher script.
    Env {
        #[arg(long)]
        write: bool,
    },
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CliSection {
    Msg,
    Pre,
    Post,
}

impl From<CliSection> for MigrationSection {
    fn from(value: CliSection) -> Self {
        match value {
            CliSection::Msg => MigrationSection::Msg,
            CliSection::Pre => MigrationSection::Pre,
            CliSection::Post => MigrationSection::Post,
        }
    }
}

struct ResolvedLayout {
    layout: DistroLayout,
    process_pattern: Option<String>,
}

#[derive(Serialize)]
struct UpgradeJsonOutput<'a> {
    status: &'static str,
    pids: &'a [String],
    report: Option<&'a UpgradeReport>,
    notices: &'a [Notice],
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn run_cli(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Upgrade {
            purge_staging,
            skip_running_check,
            json,
        } => {
            let resolved = resolve_layout(cli.prefix.as_deref(), cli.layout.as_deref())?;
            let options = UpgradeOptions {
                purge_staging,
                skip_running_check,
                process_pattern: resolved
                    .process_pattern
                    .unwrap_or_else(|| DEFAULT_PROCESS_PATTERN.to_string()),
            };
            let orchestrator = UpgradeOrchestrator::new(&resolved.layout, options);

            if json {
                let mut notices: Vec<Notice> = Vec::new();
                let run = orchestrator.run(&mut notices)?;
                let output = match &run {
                    UpgradeRun::Completed(report) => UpgradeJsonOutput {
                        status: "completed",
                        pids: &[],
                        report: Some(report),
                        notices: &notices,
                    },
                    UpgradeRun::Aborted { pids } => UpgradeJsonOutput {
                        status: "aborted",
                        pids,
                        report: None,
                        notices: &notices,
                    },
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output)
                        .context("failed to serialize upgrade report")?
                );
                return Ok(exit_code_for(&run));
            }

            let mut renderer = TerminalRenderer::new(current_output_style());
            let run = orchestrator.run(&mut renderer)?;
            match &run {
                UpgradeRun::Completed(report) => {
                    renderer.print_section("Summary");
                    renderer.print_lines(&format_upgrade_report_lines(report, renderer.style()));
                }
                UpgradeRun::Aborted { .. } => {
                    renderer.print_status("error", "upgrade aborted; nothing was changed");
                }
            }
            Ok(exit_code_for(&run))
        }
        Commands::Plan {
            from,
            sections,
            json,
        } => {
            let resolved = resolve_layout(cli.prefix.as_deref(), cli.layout.as_deref())?;
            let sections = selected_sections(&sections);
            let plan = plan_migrations(&resolved.layout, &from, &sections)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&plan)
                        .context("failed to serialize migration plan")?
                );
            } else {
                let renderer = TerminalRenderer::new(current_output_style());
                renderer.print_lines(&format_plan_lines(&plan, renderer.style()));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Migrate { from, section } => {
            let resolved = resolve_layout(cli.prefix.as_deref(), cli.layout.as_deref())?;
            let mut renderer = TerminalRenderer::new(current_output_style());
            let outcome =
                run_migration_section(&resolved.layout, section.into(), &from, &mut renderer)?;
            let (status, line) = format_migration_outcome_line(&outcome);
            renderer.print_status(status, &line);
            Ok(ExitCode::SUCCESS)
        }
        Commands::VersionCode { version } => {
            println!("{}", version_code(&version));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Paths => {
            let resolved = resolve_layout(cli.prefix.as_deref(), cli.layout.as_deref())?;
            for line in format_paths_lines(&resolved.layout) {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Env { write } => {
            let resolved = resolve_layout(cli.prefix.as_deref(), cli.layout.as_deref())?;
            if !write {
                print!("{}", render_env_file(&resolved.layout));
                return Ok(ExitCode::SUCCESS);
            }
            let renderer = TerminalRenderer::new(current_output_style());
            for path in write_env_files(&resolved.layout)? {
                renderer.print_status("ok", &format!("wrote {}", path.display()));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => {
            let mut stdout = io::stdout().lock();
            write_completions_script(shell, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_layout(prefix: Option<&Path>, layout_file: Option<&Path>) -> Result<ResolvedLayout> {
    let prefix = match prefix {
        Some(prefix) => prefix.to_path_buf(),
        None => default_user_prefix()?,
    };
    let mut layout = DistroLayout::from_prefix(prefix);
    let mut process_pattern = None;

    if let Some(path) = layout_file {
        let file = read_layout_file(path)?;
        layout = layout.with_overrides(&file);
        process_pattern = file.process_pattern;
    }
    debug!(
        prefix = %layout.prefix().display(),
        home = %layout.home().display(),
        conf = %layout.conf().display(),
        userdata = %layout.userdata().display(),
        "resolved layout"
    );

    Ok(ResolvedLayout {
        layout,
        process_pattern,
    })
}

fn selected_sections(requested: &[CliSection]) -> Vec<MigrationSection> {
    if requested.is_empty() {
        return MigrationSection::all().to_vec();
    }
    requested.iter().map(|section| (*section).into()).collect()
}

fn exit_code_for(run: &UpgradeRun) -> ExitCode {
    match run {
        UpgradeRun::Completed(_) => ExitCode::SUCCESS,
        UpgradeRun::Aborted { .. } => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests;
