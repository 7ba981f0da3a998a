use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::fs_utils::ensure_parent_dir;
use crate::DistroLayout;

/// Variables exported to the application and to the upgrade tool, in order.
pub fn environment_variables(layout: &DistroLayout) -> Vec<(&'static str, PathBuf)> {
    vec![
        ("OPENHAB_HOME", layout.home().to_path_buf()),
        ("OPENHAB_CONF", layout.conf().to_path_buf()),
        ("OPENHAB_RUNTIME", layout.runtime().to_path_buf()),
        ("OPENHAB_USERDATA", layout.userdata().to_path_buf()),
        ("OPENHAB_LOGDIR", layout.logs().to_path_buf()),
        ("OPENHAB_BACKUPS", layout.backups().to_path_buf()),
        ("JAVA_HOME", layout.java_home().to_path_buf()),
    ]
}

pub fn render_env_file(layout: &DistroLayout) -> String {
    environment_variables(layout)
        .into_iter()
        .map(|(key, value)| format!("{key}=\"{}\"\n", escape_double_quoted(&value.display().to_string())))
        .collect()
}

pub fn render_launcher_script(layout: &DistroLayout) -> String {
    let env_file = escape_single_quote_shell(&layout.env_file_path().display().to_string());
    let default_file = escape_single_quote_shell(&layout.default_file_path().display().to_string());
    let karaf = escape_single_quote_shell(&layout.karaf_path().display().to_string());
    format!(
        "#!/bin/sh\n(\n  echo Launching the openHAB runtime...\n  set -a\n  . '{env_file}'\n  if [ -f '{default_file}' ]; then\n    . '{default_file}'\n  fi\n  set +a\n  exec '{karaf}' \"$@\"\n)\n"
    )
}

/// Writes `<home>/env` and the launcher script; returns the written paths.
pub fn write_env_files(layout: &DistroLayout) -> Result<Vec<PathBuf>> {
    let env_path = layout.env_file_path();
    ensure_parent_dir(&env_path)?;
    fs::write(&env_path, render_env_file(layout))
        .with_context(|| format!("failed to write env file: {}", env_path.display()))?;

    let launcher = layout.launcher_path();
    ensure_parent_dir(&launcher)?;
    fs::write(&launcher, render_launcher_script(layout))
        .with_context(|| format!("failed to write launcher: {}", launcher.display()))?;
    make_executable(&launcher)?;

    Ok(vec![env_path, launcher])
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("failed to mark {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

/// Writes `<conf>/default` unless it already exists. Returns whether it was written.
pub fn install_default_file(layout: &DistroLayout) -> Result<bool> {
    let path = layout.default_file_path();
    if path.exists() {
        return Ok(false);
    }
    ensure_parent_dir(&path)?;
    fs::write(&path, render_default_file(layout))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

pub fn render_default_file(layout: &DistroLayout) -> String {
    format!(
        "# openHAB service options

#########################
## PORTS
## The ports openHAB will bind its HTTP/HTTPS web server to.

OPENHAB_HTTP_PORT=8080
OPENHAB_HTTPS_PORT=8443

#########################
## HTTP(S) LISTEN ADDRESS
##  The listen address used by the HTTP(S) server.
##  0.0.0.0 (default) allows a connection from any location
##  127.0.0.1 only allows the local machine to connect

OPENHAB_HTTP_ADDRESS=0.0.0.0

#########################
## JAVA OPTIONS
## Additional options for the JAVA_OPTS environment variable.
## These will be appended to the execution of the openHAB Java runtime in front of all other options.

EXTRA_JAVA_OPTS=\"-Djna.library.path={}/\"
",
        layout.library_dir().display()
    )
}

pub(crate) fn escape_single_quote_shell(value: &str) -> String {
    value.replace('\'', "'\"'\"'")
}

fn escape_double_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
