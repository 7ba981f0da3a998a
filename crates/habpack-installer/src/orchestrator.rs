use anyhow::{anyhow, Context, Result};
use habpack_core::{parse_distro_version, MigrationSection};
use std::fs;
use std::io;
use std::process::{Command, Output};
use tracing::{debug, info, warn};

use crate::caches::{clear_caches, purge_staging};
use crate::env_file::install_default_file;
use crate::fs_utils::dir_is_empty;
use crate::migrations::{read_optional, run_migration_section};
use crate::process::{
    capture_output, detect_running_instance_with_runner, RunningCheck, DEFAULT_PROCESS_PATTERN,
};
use crate::reconcile::reconcile_configuration;
use crate::sysfiles::{install_system_files, update_system_files};
use crate::upgrade_tool::run_upgrade_tool_with_runner;
use crate::{DistroLayout, NoticeSink, StepFailure, UpgradeMode, UpgradeReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpgradeStep {
    Preflight,
    EnsureDirectories,
    DetermineMode,
    PreMigrations,
    ReconcileConfiguration,
    SynchronizeSystemFiles,
    ClearCaches,
    PostMigrations,
    UpgradeTool,
}

/// Steps in execution order. Nothing loops back.
pub const UPGRADE_STEPS: [UpgradeStep; 9] = [
    UpgradeStep::Preflight,
    UpgradeStep::EnsureDirectories,
    UpgradeStep::DetermineMode,
    UpgradeStep::PreMigrations,
    UpgradeStep::ReconcileConfiguration,
    UpgradeStep::SynchronizeSystemFiles,
    UpgradeStep::ClearCaches,
    UpgradeStep::PostMigrations,
    UpgradeStep::UpgradeTool,
];

impl UpgradeStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::EnsureDirectories => "ensure-directories",
            Self::DetermineMode => "determine-mode",
            Self::PreMigrations => "pre-migrations",
            Self::ReconcileConfiguration => "reconcile-configuration",
            Self::SynchronizeSystemFiles => "synchronize-system-files",
            Self::ClearCaches => "clear-caches",
            Self::PostMigrations => "post-migrations",
            Self::UpgradeTool => "upgrade-tool",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Preflight => "Checking for a running instance",
            Self::EnsureDirectories => "Preparing directories",
            Self::DetermineMode => "Reading installed version",
            Self::PreMigrations => "Running pre-update tasks",
            Self::ReconcileConfiguration => "Installing default configuration",
            Self::SynchronizeSystemFiles => "Synchronizing system files",
            Self::ClearCaches => "Clearing cache",
            Self::PostMigrations => "Running post-update tasks",
            Self::UpgradeTool => "Updating JSON database",
        }
    }

    /// Failures in these steps end the run; later steps are best-effort.
    fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::Preflight | Self::EnsureDirectories | Self::DetermineMode
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOptions {
    pub purge_staging: bool,
    pub skip_running_check: bool,
    pub process_pattern: String,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            purge_staging: false,
            skip_running_check: false,
            process_pattern: DEFAULT_PROCESS_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeRun {
    Completed(UpgradeReport),
    /// The application was running; nothing was changed.
    Aborted { pids: Vec<String> },
}

/// Sequences one upgrade of the live tree described by a [`DistroLayout`].
pub struct UpgradeOrchestrator<'a> {
    layout: &'a DistroLayout,
    options: UpgradeOptions,
    report: UpgradeReport,
}

impl<'a> UpgradeOrchestrator<'a> {
    pub fn new(layout: &'a DistroLayout, options: UpgradeOptions) -> Self {
        Self {
            layout,
            options,
            report: UpgradeReport::new(UpgradeMode::FreshInstall),
        }
    }

    pub fn report(&self) -> &UpgradeReport {
        &self.report
    }

    pub fn run<S: NoticeSink>(self, sink: &mut S) -> Result<UpgradeRun> {
        self.run_with_runner(sink, capture_output)
    }

    /// Runs every step in order. `run` spawns the running-instance probe and
    /// the upgrade tool.
    pub fn run_with_runner<S, RunCommand>(
        mut self,
        sink: &mut S,
        mut run: RunCommand,
    ) -> Result<UpgradeRun>
    where
        S: NoticeSink,
        RunCommand: FnMut(&mut Command) -> io::Result<Output>,
    {
        for step in UPGRADE_STEPS {
            sink.step_started(step);
            let result = self.run_step(step, sink, &mut run);
            sink.step_finished(step);

            match result {
                Ok(StepResult::Continue) => {}
                Ok(StepResult::Abort { pids }) => return Ok(UpgradeRun::Aborted { pids }),
                Err(err) if step.is_fatal() => {
                    return Err(err).with_context(|| format!("{} failed", step.as_str()));
                }
                Err(err) => {
                    warn!(step = step.as_str(), error = %format!("{err:#}"), "upgrade step failed");
                    sink.warn(format!("{} failed: {err:#}", step.title()));
                    self.report.step_failures.push(StepFailure {
                        step: step.as_str().to_string(),
                        error: format!("{err:#}"),
                    });
                }
            }
        }

        info!(mode = self.report.mode.as_str(), "upgrade finished");
        Ok(UpgradeRun::Completed(self.report))
    }

    /// Runs a single step against the current state. Steps after
    /// `DetermineMode` rely on the mode it records.
    pub fn run_step<S, RunCommand>(
        &mut self,
        step: UpgradeStep,
        sink: &mut S,
        run: &mut RunCommand,
    ) -> Result<StepResult>
    where
        S: NoticeSink,
        RunCommand: FnMut(&mut Command) -> io::Result<Output>,
    {
        match step {
            UpgradeStep::Preflight => self.preflight(sink, run),
            UpgradeStep::EnsureDirectories => {
                self.layout.ensure_base_dirs()?;
                Ok(StepResult::Continue)
            }
            UpgradeStep::DetermineMode => {
                self.determine_mode(sink)?;
                Ok(StepResult::Continue)
            }
            UpgradeStep::PreMigrations => {
                self.run_migrations(&[MigrationSection::Msg, MigrationSection::Pre], sink)?;
                Ok(StepResult::Continue)
            }
            UpgradeStep::ReconcileConfiguration => {
                sink.info("Installing default configuration ...");
                self.report.default_file_written = install_default_file(self.layout)?;
                let outcome = reconcile_configuration(
                    &self.layout.staged_conf_dir(),
                    self.layout.conf(),
                    sink,
                )?;
                self.report.reconcile = Some(outcome);
                Ok(StepResult::Continue)
            }
            UpgradeStep::SynchronizeSystemFiles => {
                self.synchronize_system_files(sink)?;
                Ok(StepResult::Continue)
            }
            UpgradeStep::ClearCaches => {
                sink.info("Clearing cache ...");
                self.report.caches_removed = clear_caches(self.layout)?;
                Ok(StepResult::Continue)
            }
            UpgradeStep::PostMigrations => {
                self.run_migrations(&[MigrationSection::Post], sink)?;
                Ok(StepResult::Continue)
            }
            UpgradeStep::UpgradeTool => {
                self.report.upgrade_tool =
                    run_upgrade_tool_with_runner(self.layout, sink, &mut *run);
                Ok(StepResult::Continue)
            }
        }
    }

    fn preflight<S, RunCommand>(&mut self, sink: &mut S, run: &mut RunCommand) -> Result<StepResult>
    where
        S: NoticeSink,
        RunCommand: FnMut(&mut Command) -> io::Result<Output>,
    {
        if self.options.skip_running_check {
            debug!("running-instance check disabled");
            return Ok(StepResult::Continue);
        }

        match detect_running_instance_with_runner(&self.options.process_pattern, &mut *run) {
            RunningCheck::NotRunning => Ok(StepResult::Continue),
            RunningCheck::Running { pids } => {
                sink.fatal(format!(
                    "openHAB is running (pid {})! Please stop the process before continuing.",
                    pids.join(", ")
                ));
                Ok(StepResult::Abort { pids })
            }
            RunningCheck::Unknown { reason } => {
                sink.warn(format!(
                    "could not check for a running openHAB instance: {reason}"
                ));
                Ok(StepResult::Continue)
            }
        }
    }

    fn determine_mode<S: NoticeSink>(&mut self, sink: &mut S) -> Result<()> {
        let previous = read_optional(&self.layout.installed_version_path())?
            .as_deref()
            .and_then(parse_distro_version);
        let new = read_optional(&self.layout.staged_version_path())?
            .as_deref()
            .and_then(parse_distro_version);
        if new.is_none() {
            sink.warn(format!(
                "staged release has no version marker at {}",
                self.layout.staged_version_path().display()
            ));
        }

        self.report.mode = UpgradeMode::decide(previous.as_deref(), new.as_deref());
        info!(
            mode = self.report.mode.as_str(),
            previous = previous.as_deref().unwrap_or("none"),
            new = new.as_deref().unwrap_or("unknown"),
            "determined upgrade mode"
        );
        self.report.previous_version = previous;
        self.report.new_version = new;
        Ok(())
    }

    fn run_migrations<S: NoticeSink>(
        &mut self,
        sections: &[MigrationSection],
        sink: &mut S,
    ) -> Result<()> {
        if !self.report.mode.is_upgrade() {
            return Ok(());
        }
        let previous = self
            .report
            .previous_version
            .clone()
            .ok_or_else(|| anyhow!("upgrade mode without a previous version"))?;

        for section in sections {
            let outcome = run_migration_section(self.layout, *section, &previous, sink)?;
            self.report.migrations.push(outcome);
        }
        Ok(())
    }

    fn synchronize_system_files<S: NoticeSink>(&mut self, sink: &mut S) -> Result<()> {
        let userdata = self.layout.userdata();
        let fresh = self.report.previous_version.is_none() || dir_is_empty(userdata)?;
        let outcome = if fresh {
            sink.info("Installing system files ...");
            install_system_files(&self.layout.staged_userdata_dir(), userdata, sink)?
        } else {
            sink.info("Updating system files ...");
            update_system_files(
                &self.layout.sysfiles_list_path(),
                &self.layout.staged_etc_dir(),
                &self.layout.userdata_etc_dir(),
                sink,
            )?
        };
        self.report.sysfiles = Some(outcome);

        let backups = self.layout.backups();
        fs::create_dir_all(backups)
            .with_context(|| format!("failed to create {}", backups.display()))?;

        if self.options.purge_staging {
            self.report.staging_purged = purge_staging(self.layout)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    Abort { pids: Vec<String> },
}
