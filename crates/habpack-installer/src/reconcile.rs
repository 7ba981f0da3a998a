use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::fs_utils::{
    collect_relative_file_paths, copy_file_with_parents, dist_new_path, files_identical,
};
use crate::{ConfigConflict, NoticeSink, ReconcileOutcome};

/// Merges shipped default configuration into the live configuration tree.
///
/// Missing files are installed, byte-identical files are left alone, and a
/// differing live file is kept while the shipped copy lands next to it as a
/// `.dist-new` sidecar. A live file that differs from its default is never
/// written.
pub fn reconcile_configuration<S: NoticeSink>(
    defaults_root: &Path,
    live_root: &Path,
    sink: &mut S,
) -> Result<ReconcileOutcome> {
    let mut outcome = ReconcileOutcome::default();
    if !defaults_root.is_dir() {
        debug!(path = %defaults_root.display(), "no shipped configuration to reconcile");
        return Ok(outcome);
    }

    for relative in collect_relative_file_paths(defaults_root)? {
        let source = defaults_root.join(&relative);
        let target = live_root.join(&relative);

        match reconcile_file(&source, &target) {
            Ok(FileResolution::Installed) => outcome.installed.push(relative),
            Ok(FileResolution::Unchanged) => outcome.unchanged.push(relative),
            Ok(FileResolution::Conflict(sidecar)) => {
                sink.warn(format!(
                    "Installed new version of file {} as {}. Please check for changes!",
                    target.display(),
                    sidecar.display()
                ));
                outcome.conflicts.push(ConfigConflict {
                    live: target,
                    sidecar,
                });
            }
            Err(err) => {
                sink.warn(format!(
                    "failed to reconcile {}: {err:#}",
                    target.display()
                ));
                outcome.failed.push(relative.display().to_string());
            }
        }
    }

    Ok(outcome)
}

enum FileResolution {
    Installed,
    Unchanged,
    Conflict(PathBuf),
}

fn reconcile_file(source: &Path, target: &Path) -> Result<FileResolution> {
    if !target.exists() {
        copy_file_with_parents(source, target)?;
        return Ok(FileResolution::Installed);
    }

    if files_identical(source, target)? {
        return Ok(FileResolution::Unchanged);
    }

    let sidecar = dist_new_path(target);
    copy_file_with_parents(source, &sidecar)?;
    Ok(FileResolution::Conflict(sidecar))
}
