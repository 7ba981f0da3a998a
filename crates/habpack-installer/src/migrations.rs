use anyhow::{Context, Result};
use habpack_core::{
    parse_update_list, section_header_lines, MigrationCommand, MigrationSection,
    PathPlaceholders, ScanEvent, SectionScanner, VersionCode,
};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::fs_utils::{backup_path, ensure_parent_dir, move_path};
use crate::{
    CommandEffect, DistroLayout, MigrationOutcome, MigrationPlan, NoticeSink, PlannedBlock,
    PlannedCommand, SectionPlan,
};

/// Runs the commands of `section` that are newer than `previous_version`.
///
/// A missing update list is an empty run. A failing command is reported as a
/// warning and the next command still runs.
pub fn run_migration_section<S: NoticeSink>(
    layout: &DistroLayout,
    section: MigrationSection,
    previous_version: &str,
    sink: &mut S,
) -> Result<MigrationOutcome> {
    let path = layout.update_list_path();
    let Some(text) = read_optional(&path)? else {
        debug!(path = %path.display(), "update list not found; nothing to migrate");
        return Ok(MigrationOutcome {
            section: section.as_str().to_string(),
            ..MigrationOutcome::default()
        });
    };

    Ok(run_migration_text(
        &text,
        &layout.placeholders(),
        section,
        previous_version,
        sink,
    ))
}

pub fn run_migration_text<S: NoticeSink>(
    text: &str,
    placeholders: &PathPlaceholders,
    section: MigrationSection,
    previous_version: &str,
    sink: &mut S,
) -> MigrationOutcome {
    let mut outcome = MigrationOutcome {
        section: section.as_str().to_string(),
        ..MigrationOutcome::default()
    };

    outcome.ignored_reentries = section_header_lines(text, section.as_str())
        .into_iter()
        .skip(1)
        .collect();
    for line in &outcome.ignored_reentries {
        sink.warn(format!(
            "section {} appears again at line {}; ignored",
            section, line
        ));
    }

    let installed = VersionCode::from_version(previous_version);
    for event in SectionScanner::new(text, section.as_str(), installed, placeholders) {
        match event {
            ScanEvent::Banner { version, .. } => {
                info!(section = %section, %version, "applying version block");
                sink.info(format!("{} {}", section.banner_prefix(), version));
                outcome.versions.push(version);
            }
            ScanEvent::Command { command, line } => match execute_migration_command(&command, sink)
            {
                Ok(CommandEffect::Applied) => outcome.applied += 1,
                Ok(CommandEffect::Unchanged) => outcome.unchanged += 1,
                Ok(CommandEffect::Skipped) => {
                    if let MigrationCommand::Skipped { raw, reason } = &command {
                        debug!(line, %raw, %reason, "skipping malformed migration line");
                        outcome.skipped.push(raw.clone());
                    }
                }
                Err(err) => {
                    warn!(line, %command, error = %format!("{err:#}"), "migration command failed");
                    sink.warn(format!(
                        "migration command at line {line} failed ({command}): {err:#}"
                    ));
                    outcome.failed.push(format!("line {line}: {command}"));
                }
            },
        }
    }

    outcome
}

pub fn execute_migration_command<S: NoticeSink>(
    command: &MigrationCommand,
    sink: &mut S,
) -> Result<CommandEffect> {
    match command {
        MigrationCommand::Default { path } => {
            if !path_exists(path) {
                return Ok(CommandEffect::Unchanged);
            }
            let backup = backup_path(path);
            sink.info(format!("Adding '.bak' to {}", path.display()));
            move_path(path, &backup)?;
            Ok(CommandEffect::Applied)
        }
        MigrationCommand::Delete { path } => {
            if !path.is_file() {
                return Ok(CommandEffect::Unchanged);
            }
            sink.info(format!("Deleting file: {}", path.display()));
            fs::remove_file(path)
                .with_context(|| format!("failed to delete {}", path.display()))?;
            Ok(CommandEffect::Applied)
        }
        MigrationCommand::DeleteDir { path } => {
            if !path.is_dir() {
                return Ok(CommandEffect::Unchanged);
            }
            sink.info(format!("Deleting directory: {}", path.display()));
            fs::remove_dir_all(path)
                .with_context(|| format!("failed to delete directory {}", path.display()))?;
            Ok(CommandEffect::Applied)
        }
        MigrationCommand::Move { from, to } => {
            sink.info(format!("Moving {} to {}", from.display(), to.display()));
            ensure_parent_dir(to)?;
            move_path(from, to)?;
            Ok(CommandEffect::Applied)
        }
        MigrationCommand::Replace {
            pattern,
            replacement,
            path,
        } => {
            if !path.is_file() {
                return Ok(CommandEffect::Unchanged);
            }
            sink.info(format!(
                "Replacing '{}' with '{}' in {}",
                pattern.as_str(),
                replacement,
                path.display()
            ));
            let backup = backup_path(path);
            fs::copy(path, &backup).with_context(|| {
                format!(
                    "failed to back up {} to {}",
                    path.display(),
                    backup.display()
                )
            })?;
            let original = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let rewritten = pattern.replace_all(&original, replacement);
            fs::write(path, rewritten.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(CommandEffect::Applied)
        }
        MigrationCommand::Note { message } => {
            sink.info(message.clone());
            Ok(CommandEffect::Applied)
        }
        MigrationCommand::Alert { message } => {
            sink.warn(message.clone());
            Ok(CommandEffect::Applied)
        }
        MigrationCommand::Skipped { .. } => Ok(CommandEffect::Skipped),
    }
}

/// Lists what [`run_migration_section`] would do for each section, without
/// touching the filesystem beyond reading the update list.
pub fn plan_migrations(
    layout: &DistroLayout,
    previous_version: &str,
    sections: &[MigrationSection],
) -> Result<MigrationPlan> {
    let path = layout.update_list_path();
    let text = read_optional(&path)?;
    let list = parse_update_list(text.as_deref().unwrap_or_default());
    let placeholders = layout.placeholders();
    let installed = VersionCode::from_version(previous_version);

    let sections = sections
        .iter()
        .map(|section| {
            let blocks = list
                .applicable_blocks(section.as_str(), installed)
                .into_iter()
                .map(|block| PlannedBlock {
                    version: block.version.clone(),
                    line: block.line,
                    commands: block
                        .commands
                        .iter()
                        .map(|(line, raw)| {
                            let command = MigrationCommand::parse(raw, &placeholders);
                            PlannedCommand {
                                line: *line,
                                skipped: command.is_skipped(),
                                description: command.to_string(),
                            }
                        })
                        .collect(),
                })
                .collect();
            SectionPlan {
                section: section.as_str().to_string(),
                blocks,
                ignored_reentries: list.repeated_section_lines(section.as_str()),
            }
        })
        .collect();

    Ok(MigrationPlan {
        previous_version: previous_version.to_string(),
        update_list_present: text.is_some(),
        update_list: path,
        sections,
        unscoped_lines: list.unscoped_lines,
    })
}

fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}
