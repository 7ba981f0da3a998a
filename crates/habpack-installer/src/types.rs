use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpgradeMode {
    FreshInstall,
    Upgrade,
    /// Same version staged again; no migrations run.
    Reinstall,
}

impl UpgradeMode {
    pub fn decide(previous: Option<&str>, new: Option<&str>) -> Self {
        match previous {
            None => Self::FreshInstall,
            Some(previous) if Some(previous) == new => Self::Reinstall,
            Some(_) => Self::Upgrade,
        }
    }

    pub fn is_upgrade(self) -> bool {
        self == Self::Upgrade
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreshInstall => "fresh-install",
            Self::Upgrade => "upgrade",
            Self::Reinstall => "reinstall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    Applied,
    /// The precondition did not hold (e.g. DELETE of a missing file).
    Unchanged,
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub section: String,
    pub versions: Vec<String>,
    pub applied: usize,
    pub unchanged: usize,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub ignored_reentries: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigConflict {
    pub live: PathBuf,
    pub sidecar: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub installed: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub conflicts: Vec<ConfigConflict>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SysfilesMode {
    FreshInstall,
    Upgrade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SysfilesOutcome {
    pub mode: SysfilesMode,
    pub manifest_present: bool,
    pub copied: Vec<PathBuf>,
    pub missing_from_release: Vec<PathBuf>,
    pub rejected: Vec<String>,
    pub failed: Vec<String>,
}

impl SysfilesOutcome {
    pub(crate) fn new(mode: SysfilesMode) -> Self {
        Self {
            mode,
            manifest_present: false,
            copied: Vec::new(),
            missing_from_release: Vec::new(),
            rejected: Vec::new(),
            failed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum UpgradeToolOutcome {
    NotNeeded,
    Succeeded,
    Failed { exit_code: Option<i32> },
    CouldNotStart { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeReport {
    pub mode: UpgradeMode,
    pub previous_version: Option<String>,
    pub new_version: Option<String>,
    pub migrations: Vec<MigrationOutcome>,
    pub default_file_written: bool,
    pub reconcile: Option<ReconcileOutcome>,
    pub sysfiles: Option<SysfilesOutcome>,
    pub staging_purged: bool,
    pub caches_removed: Vec<PathBuf>,
    pub upgrade_tool: UpgradeToolOutcome,
    pub step_failures: Vec<StepFailure>,
}

impl UpgradeReport {
    pub(crate) fn new(mode: UpgradeMode) -> Self {
        Self {
            mode,
            previous_version: None,
            new_version: None,
            migrations: Vec::new(),
            default_file_written: false,
            reconcile: None,
            sysfiles: None,
            staging_purged: false,
            caches_removed: Vec::new(),
            upgrade_tool: UpgradeToolOutcome::NotNeeded,
            step_failures: Vec::new(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.step_failures.is_empty()
            || self
                .migrations
                .iter()
                .any(|outcome| !outcome.failed.is_empty())
            || self
                .reconcile
                .as_ref()
                .is_some_and(|outcome| !outcome.conflicts.is_empty() || !outcome.failed.is_empty())
            || self
                .sysfiles
                .as_ref()
                .is_some_and(|outcome| !outcome.failed.is_empty())
            || matches!(
                self.upgrade_tool,
                UpgradeToolOutcome::Failed { .. } | UpgradeToolOutcome::CouldNotStart { .. }
            )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCommand {
    pub line: usize,
    pub description: String,
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedBlock {
    pub version: String,
    pub line: usize,
    pub commands: Vec<PlannedCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionPlan {
    pub section: String,
    pub blocks: Vec<PlannedBlock>,
    pub ignored_reentries: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    pub previous_version: String,
    pub update_list: PathBuf,
    pub update_list_present: bool,
    pub sections: Vec<SectionPlan>,
    pub unscoped_lines: Vec<usize>,
}
