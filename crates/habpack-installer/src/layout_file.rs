use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::DistroLayout;

/// Optional TOML overlay for a [`DistroLayout`].
///
/// ```toml
/// version = 1
/// conf = "/etc/openhab"
/// userdata = "/var/lib/openhab"
/// java_home = "/usr/lib/jvm/java-21"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutFile {
    #[serde(default = "layout_file_version")]
    pub version: u32,
    pub home: Option<PathBuf>,
    pub runtime: Option<PathBuf>,
    pub addons: Option<PathBuf>,
    pub conf: Option<PathBuf>,
    pub userdata: Option<PathBuf>,
    pub logs: Option<PathBuf>,
    pub backups: Option<PathBuf>,
    pub staging: Option<PathBuf>,
    pub java_home: Option<PathBuf>,
    pub process_pattern: Option<String>,
}

pub(crate) fn layout_file_version() -> u32 {
    1
}

pub fn parse_layout_file(content: &str) -> Result<LayoutFile> {
    let parsed: LayoutFile = toml::from_str(content).context("failed parsing layout file")?;
    let expected = layout_file_version();
    if parsed.version != expected {
        anyhow::bail!(
            "unsupported layout file version {} (expected {}): update the layout file to version {}",
            parsed.version,
            expected,
            expected
        );
    }
    if parsed
        .process_pattern
        .as_deref()
        .is_some_and(|pattern| pattern.trim().is_empty())
    {
        anyhow::bail!("process_pattern must not be empty");
    }
    Ok(parsed)
}

/// Reads a layout file; relative paths inside it resolve against its directory.
pub fn read_layout_file(path: &Path) -> Result<LayoutFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read layout file: {}", path.display()))?;
    let mut parsed = parse_layout_file(&raw)
        .with_context(|| format!("invalid layout file: {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parsed.resolve_relative_to(base);
    Ok(parsed)
}

impl LayoutFile {
    fn resolve_relative_to(&mut self, base: &Path) {
        for slot in [
            &mut self.home,
            &mut self.runtime,
            &mut self.addons,
            &mut self.conf,
            &mut self.userdata,
            &mut self.logs,
            &mut self.backups,
            &mut self.staging,
            &mut self.java_home,
        ] {
            if let Some(path) = slot.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}

impl DistroLayout {
    /// Applies overrides. Roots derived from another root follow it unless
    /// they are overridden themselves: runtime and addons follow home,
    /// backups follows userdata.
    pub fn with_overrides(mut self, file: &LayoutFile) -> Self {
        if let Some(home) = &file.home {
            self.home = home.clone();
            self.runtime = home.join("runtime");
            self.addons = home.join("addons");
        }
        if let Some(userdata) = &file.userdata {
            self.userdata = userdata.clone();
            self.backups = userdata.join("backups");
        }
        if let Some(runtime) = &file.runtime {
            self.runtime = runtime.clone();
        }
        if let Some(addons) = &file.addons {
            self.addons = addons.clone();
        }
        if let Some(backups) = &file.backups {
            self.backups = backups.clone();
        }
        if let Some(conf) = &file.conf {
            self.conf = conf.clone();
        }
        if let Some(logs) = &file.logs {
            self.logs = logs.clone();
        }
        if let Some(staging) = &file.staging {
            self.staging = staging.clone();
        }
        if let Some(java_home) = &file.java_home {
            self.java_home = java_home.clone();
        }
        self
    }
}
