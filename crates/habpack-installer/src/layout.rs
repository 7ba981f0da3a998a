use anyhow::{Context, Result};
use habpack_core::PathPlaceholders;
use std::fs;
use std::path::{Path, PathBuf};

/// Cache-like directories under userdata that are dropped on every run.
pub const USERDATA_CACHE_DIRS: [&str; 4] = ["cache", "tmp", "marketplace", "kar"];

/// Resolved directory roots of one installation.
///
/// Every component that substitutes placeholders or touches the live tree
/// takes this value explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroLayout {
    pub(crate) prefix: PathBuf,
    pub(crate) home: PathBuf,
    pub(crate) runtime: PathBuf,
    pub(crate) addons: PathBuf,
    pub(crate) conf: PathBuf,
    pub(crate) userdata: PathBuf,
    pub(crate) logs: PathBuf,
    pub(crate) backups: PathBuf,
    pub(crate) staging: PathBuf,
    pub(crate) java_home: PathBuf,
}

impl DistroLayout {
    pub fn from_prefix(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        let home = prefix.join("libexec").join("openhab");
        let userdata = prefix.join("var").join("lib").join("openhab");
        Self {
            runtime: home.join("runtime"),
            addons: home.join("addons"),
            conf: prefix.join("etc").join("openhab"),
            logs: prefix.join("var").join("log").join("openhab"),
            backups: userdata.join("backups"),
            staging: prefix.join("share").join("openhab"),
            java_home: prefix.join("opt").join("openjdk"),
            home,
            userdata,
            prefix,
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn runtime(&self) -> &Path {
        &self.runtime
    }

    pub fn addons(&self) -> &Path {
        &self.addons
    }

    pub fn conf(&self) -> &Path {
        &self.conf
    }

    pub fn userdata(&self) -> &Path {
        &self.userdata
    }

    pub fn logs(&self) -> &Path {
        &self.logs
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    pub fn java_home(&self) -> &Path {
        &self.java_home
    }

    pub fn placeholders(&self) -> PathPlaceholders {
        PathPlaceholders::new(&self.home, &self.conf, &self.userdata)
    }

    pub fn runtime_bin_dir(&self) -> PathBuf {
        self.runtime.join("bin")
    }

    pub fn update_list_path(&self) -> PathBuf {
        self.runtime_bin_dir().join("update.lst")
    }

    pub fn sysfiles_list_path(&self) -> PathBuf {
        self.runtime_bin_dir().join("userdata_sysfiles.lst")
    }

    pub fn upgrade_tool_jar_path(&self) -> PathBuf {
        self.runtime_bin_dir().join("upgradetool.jar")
    }

    pub fn karaf_path(&self) -> PathBuf {
        self.runtime_bin_dir().join("karaf")
    }

    pub fn java_binary_path(&self) -> PathBuf {
        self.java_home.join("bin").join("java")
    }

    pub fn staged_conf_dir(&self) -> PathBuf {
        self.staging.join("conf")
    }

    pub fn staged_userdata_dir(&self) -> PathBuf {
        self.staging.join("userdata")
    }

    pub fn staged_etc_dir(&self) -> PathBuf {
        self.staged_userdata_dir().join("etc")
    }

    pub fn userdata_etc_dir(&self) -> PathBuf {
        self.userdata.join("etc")
    }

    pub fn installed_version_path(&self) -> PathBuf {
        self.userdata_etc_dir().join("version.properties")
    }

    pub fn staged_version_path(&self) -> PathBuf {
        self.staged_etc_dir().join("version.properties")
    }

    pub fn jsondb_dir(&self) -> PathBuf {
        self.userdata.join("jsondb")
    }

    pub fn cache_dirs(&self) -> Vec<PathBuf> {
        USERDATA_CACHE_DIRS
            .iter()
            .map(|name| self.userdata.join(name))
            .collect()
    }

    pub fn default_file_path(&self) -> PathBuf {
        self.conf.join("default")
    }

    pub fn env_file_path(&self) -> PathBuf {
        self.home.join("env")
    }

    pub fn launcher_path(&self) -> PathBuf {
        self.home.join("bin").join("openhab")
    }

    pub fn library_dir(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    /// Creates the mutable roots. Backups live under userdata and must not
    /// exist before the fresh-install check, so they are not created here.
    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [&self.conf, &self.userdata, &self.logs] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_user_prefix() -> Result<PathBuf> {
    if let Some(prefix) = std::env::var_os("HABPACK_PREFIX") {
        return Ok(PathBuf::from(prefix));
    }

    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows user prefix")?;
        return Ok(PathBuf::from(app_data).join("habpack"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve user prefix")?;
    Ok(PathBuf::from(home).join(".habpack"))
}
