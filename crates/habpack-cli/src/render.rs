use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use habpack_installer::{
    environment_variables, DistroLayout, MigrationOutcome, MigrationPlan, Notice, NoticeSink,
    Severity, SysfilesMode, UpgradeReport, UpgradeStep, UpgradeToolOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    output_style_for(
        std::env::var_os("NO_COLOR").is_some(),
        std::io::stdout().is_terminal(),
    )
}

pub(crate) fn output_style_for(no_color: bool, is_terminal: bool) -> OutputStyle {
    if no_color || !is_terminal {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

/// Prints notices as they arrive; in rich mode each upgrade step shows a spinner.
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
    spinner: Option<ProgressBar>,
}

impl TerminalRenderer {
    pub(crate) fn new(style: OutputStyle) -> Self {
        Self {
            style,
            spinner: None,
        }
    }

    pub(crate) fn style(&self) -> OutputStyle {
        self.style
    }

    pub(crate) fn print_status(&self, status: &str, message: &str) {
        self.print_line(&render_status_line(self.style, status, message));
    }

    pub(crate) fn print_section(&self, title: &str) {
        if self.style == OutputStyle::Plain {
            return;
        }
        self.print_line("");
        self.print_line(&colorize(section_style(), &format!("== {title} ==")));
    }

    pub(crate) fn print_lines(&self, lines: &[String]) {
        for line in lines {
            self.print_line(line);
        }
    }

    fn print_line(&self, line: &str) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }
}

impl NoticeSink for TerminalRenderer {
    fn notice(&mut self, notice: Notice) {
        self.print_status(severity_status(notice.severity), &notice.message);
    }

    fn step_started(&mut self, step: UpgradeStep) {
        if self.style == OutputStyle::Plain {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg}") {
            spinner.set_style(style.tick_chars("-=~* "));
        }
        spinner.set_message(step.title().to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    fn step_finished(&mut self, _step: UpgradeStep) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "error" => "[ERR]",
        _ => "[..]",
    }
}

fn severity_status(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "step",
        Severity::Warn => "warn",
        Severity::Fatal => "error",
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub(crate) fn format_migration_outcome_line(outcome: &MigrationOutcome) -> (&'static str, String) {
    let status = if outcome.failed.is_empty() { "ok" } else { "warn" };
    let versions = if outcome.versions.is_empty() {
        "no versions".to_string()
    } else {
        outcome.versions.join(", ")
    };
    (
        status,
        format!(
            "{}: {} ({} applied, {} unchanged, {} skipped, {} failed)",
            outcome.section,
            versions,
            outcome.applied,
            outcome.unchanged,
            outcome.skipped.len(),
            outcome.failed.len()
        ),
    )
}

pub(crate) fn format_upgrade_report_lines(report: &UpgradeReport, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(render_status_line(
        style,
        "ok",
        &format!(
            "{}: {} -> {}",
            report.mode.as_str(),
            report.previous_version.as_deref().unwrap_or("none"),
            report.new_version.as_deref().unwrap_or("unknown")
        ),
    ));

    for outcome in &report.migrations {
        let (status, line) = format_migration_outcome_line(outcome);
        lines.push(render_status_line(style, status, &line));
    }

    if let Some(reconcile) = &report.reconcile {
        let status = if reconcile.conflicts.is_empty() && reconcile.failed.is_empty() {
            "ok"
        } else {
            "warn"
        };
        lines.push(render_status_line(
            style,
            status,
            &format!(
                "configuration: {} installed, {} unchanged, {} conflicts",
                reconcile.installed.len(),
                reconcile.unchanged.len(),
                reconcile.conflicts.len()
            ),
        ));
        for conflict in &reconcile.conflicts {
            lines.push(format!(
                "  review {} against {}",
                conflict.live.display(),
                conflict.sidecar.display()
            ));
        }
    }

    if let Some(sysfiles) = &report.sysfiles {
        let status = if sysfiles.failed.is_empty() { "ok" } else { "warn" };
        lines.push(render_status_line(
            style,
            status,
            &format!(
                "system files ({}): {} copied, {} not shipped",
                match sysfiles.mode {
                    SysfilesMode::FreshInstall => "fresh install",
                    SysfilesMode::Upgrade => "manifest",
                },
                sysfiles.copied.len(),
                sysfiles.missing_from_release.len()
            ),
        ));
    }

    if report.staging_purged {
        lines.push(render_status_line(style, "ok", "staging removed"));
    }
    lines.push(render_status_line(
        style,
        "ok",
        &format!("caches cleared: {}", report.caches_removed.len()),
    ));

    let (status, tool) = match &report.upgrade_tool {
        UpgradeToolOutcome::NotNeeded => ("ok", "not needed".to_string()),
        UpgradeToolOutcome::Succeeded => ("ok", "succeeded".to_string()),
        UpgradeToolOutcome::Failed { exit_code } => (
            "warn",
            match exit_code {
                Some(code) => format!("failed (exit {code})"),
                None => "failed (terminated)".to_string(),
            },
        ),
        UpgradeToolOutcome::CouldNotStart { error } => {
            ("warn", format!("could not start ({error})"))
        }
    };
    lines.push(render_status_line(style, status, &format!("upgrade tool: {tool}")));

    for failure in &report.step_failures {
        lines.push(render_status_line(
            style,
            "warn",
            &format!("{} failed: {}", failure.step, failure.error),
        ));
    }

    if report.has_warnings() {
        lines.push(render_status_line(style, "warn", "upgrade finished with warnings"));
    } else {
        lines.push(render_status_line(style, "ok", "upgrade finished"));
    }
    lines
}

pub(crate) fn format_plan_lines(plan: &MigrationPlan, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    if !plan.update_list_present {
        lines.push(render_status_line(
            style,
            "warn",
            &format!("no update list at {}", plan.update_list.display()),
        ));
        return lines;
    }

    for section in &plan.sections {
        lines.push(render_status_line(
            style,
            "step",
            &format!(
                "{}: {} version block(s) newer than {}",
                section.section,
                section.blocks.len(),
                plan.previous_version
            ),
        ));
        for block in &section.blocks {
            lines.push(format!("  [{}] line {}", block.version, block.line));
            for command in &block.commands {
                lines.push(format!("    {:>4}: {}", command.line, command.description));
            }
        }
        for line in &section.ignored_reentries {
            lines.push(render_status_line(
                style,
                "warn",
                &format!("{} appears again at line {line}; ignored", section.section),
            ));
        }
    }

    if !plan.unscoped_lines.is_empty() {
        let numbers = plan
            .unscoped_lines
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(render_status_line(
            style,
            "warn",
            &format!("lines outside any section are ignored: {numbers}"),
        ));
    }
    lines
}

pub(crate) fn format_paths_lines(layout: &DistroLayout) -> Vec<String> {
    let mut lines = environment_variables(layout)
        .into_iter()
        .map(|(key, value)| format!("{key}: {}", value.display()))
        .collect::<Vec<_>>();
    lines.push(format!("OPENHAB_ADDONS: {}", layout.addons().display()));
    lines.push(format!("staging: {}", layout.staging().display()));
    lines.push(format!("launcher: {}", layout.launcher_path().display()));
    lines
}
