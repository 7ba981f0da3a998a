use std::io;
use std::process::{Command, Output};
use tracing::{info, warn};

use crate::{DistroLayout, NoticeSink, UpgradeToolOutcome};

pub fn build_upgrade_tool_command(layout: &DistroLayout) -> Command {
    let mut command = Command::new(layout.java_binary_path());
    command
        .arg("-jar")
        .arg(layout.upgrade_tool_jar_path())
        .env_remove("_JAVA_OPTIONS")
        .env("OPENHAB_USERDATA", layout.userdata())
        .env("OPENHAB_CONF", layout.conf());
    command
}

/// Runs the JSON database upgrade tool when userdata carries a `jsondb`.
///
/// A failing tool is only a warning: the file-level upgrade is already done
/// and the database can be migrated by hand.
pub fn run_upgrade_tool_with_runner<S, RunCommand>(
    layout: &DistroLayout,
    sink: &mut S,
    mut run: RunCommand,
) -> UpgradeToolOutcome
where
    S: NoticeSink,
    RunCommand: FnMut(&mut Command) -> io::Result<Output>,
{
    if !layout.jsondb_dir().is_dir() {
        return UpgradeToolOutcome::NotNeeded;
    }

    sink.info("Starting JSON database update ...");
    let mut command = build_upgrade_tool_command(layout);
    let output = match run(&mut command) {
        Ok(output) => output,
        Err(err) => {
            warn!(command = ?command, error = %err, "upgrade tool could not start");
            sink.warn(format!(
                "Update tool could not be started ({}): {err}. Please check the openHAB website (www.openhab.org) for manual update instructions.",
                layout.java_binary_path().display()
            ));
            return UpgradeToolOutcome::CouldNotStart {
                error: err.to_string(),
            };
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        sink.info(stdout.trim_end().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        if !stderr.trim().is_empty() {
            sink.warn(stderr.trim_end().to_string());
        }
        info!("upgrade tool finished");
        sink.info("JSON database updated successfully.");
        return UpgradeToolOutcome::Succeeded;
    }

    if !stderr.trim().is_empty() {
        sink.info(stderr.trim_end().to_string());
    }
    warn!(status = %output.status, "upgrade tool failed");
    sink.warn(
        "Update tool failed, please check the openHAB website (www.openhab.org) for manual update instructions.",
    );
    UpgradeToolOutcome::Failed {
        exit_code: output.status.code(),
    }
}
