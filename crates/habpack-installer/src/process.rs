use std::io;
use std::process::{Command, Output};

/// Spawns `command`, waits for it, and buffers stdout and stderr.
pub fn capture_output(command: &mut Command) -> io::Result<Output> {
    command.output()
}

pub const DEFAULT_PROCESS_PATTERN: &str = "openhab.*java";

pub fn build_running_check_command(pattern: &str) -> Command {
    let mut command = Command::new("pgrep");
    command.arg("-f").arg(pattern);
    command
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunningCheck {
    NotRunning,
    Running { pids: Vec<String> },
    /// The probe itself could not run; callers proceed with a warning.
    Unknown { reason: String },
}

pub fn detect_running_instance_with_runner<RunCommand>(
    pattern: &str,
    mut run: RunCommand,
) -> RunningCheck
where
    RunCommand: FnMut(&mut Command) -> io::Result<Output>,
{
    let mut command = build_running_check_command(pattern);
    let output = match run(&mut command) {
        Ok(output) => output,
        Err(err) => {
            return RunningCheck::Unknown {
                reason: format!("failed to run pgrep: {err}"),
            }
        }
    };

    let pids = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pids.is_empty() {
        RunningCheck::NotRunning
    } else {
        RunningCheck::Running { pids }
    }
}
