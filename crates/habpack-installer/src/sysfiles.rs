use anyhow::Result;
use habpack_core::parse_sysfiles_manifest;
use std::path::Path;
use tracing::debug;

use crate::fs_utils::{collect_relative_file_paths, copy_file_with_parents};
use crate::migrations::read_optional;
use crate::{NoticeSink, SysfilesMode, SysfilesOutcome};

/// Copies every shipped system file into an empty userdata tree.
pub fn install_system_files<S: NoticeSink>(
    source_root: &Path,
    userdata: &Path,
    sink: &mut S,
) -> Result<SysfilesOutcome> {
    let mut outcome = SysfilesOutcome::new(SysfilesMode::FreshInstall);
    if !source_root.is_dir() {
        debug!(path = %source_root.display(), "no shipped system files");
        return Ok(outcome);
    }

    for relative in collect_relative_file_paths(source_root)? {
        let target = userdata.join(&relative);
        match copy_file_with_parents(&source_root.join(&relative), &target) {
            Ok(()) => outcome.copied.push(relative),
            Err(err) => {
                sink.warn(format!("failed to install {}: {err:#}", target.display()));
                outcome.failed.push(relative.display().to_string());
            }
        }
    }

    Ok(outcome)
}

/// Refreshes only the `etc` files named by the sysfiles manifest.
///
/// Manifest entries are relative to `etc`. Entries the new release does not
/// ship are skipped; a missing manifest refreshes nothing.
pub fn update_system_files<S: NoticeSink>(
    manifest_path: &Path,
    shipped_etc: &Path,
    live_etc: &Path,
    sink: &mut S,
) -> Result<SysfilesOutcome> {
    let mut outcome = SysfilesOutcome::new(SysfilesMode::Upgrade);
    let Some(raw) = read_optional(manifest_path)? else {
        debug!(path = %manifest_path.display(), "sysfiles manifest not found");
        return Ok(outcome);
    };
    outcome.manifest_present = true;

    let manifest = parse_sysfiles_manifest(&raw);
    for (entry, reason) in manifest.rejected {
        sink.warn(format!("ignoring sysfiles entry '{entry}': {reason}"));
        outcome.rejected.push(entry);
    }

    for relative in manifest.entries {
        let source = shipped_etc.join(&relative);
        if !source.is_file() {
            debug!(entry = %relative.display(), "sysfiles entry not shipped by this release");
            outcome.missing_from_release.push(relative);
            continue;
        }

        let target = live_etc.join(&relative);
        match copy_file_with_parents(&source, &target) {
            Ok(()) => outcome.copied.push(relative),
            Err(err) => {
                sink.warn(format!("failed to refresh {}: {err:#}", target.display()));
                outcome.failed.push(relative.display().to_string());
            }
        }
    }

    Ok(outcome)
}
