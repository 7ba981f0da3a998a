use std::path::{Path, PathBuf};

pub const HOME_PLACEHOLDER: &str = "$OPENHAB_HOME";
pub const CONF_PLACEHOLDER: &str = "$OPENHAB_CONF";
pub const USERDATA_PLACEHOLDER: &str = "$OPENHAB_USERDATA";

/// Resolved roots substituted into migration command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPlaceholders {
    home: PathBuf,
    conf: PathBuf,
    userdata: PathBuf,
}

impl PathPlaceholders {
    pub fn new(
        home: impl Into<PathBuf>,
        conf: impl Into<PathBuf>,
        userdata: impl Into<PathBuf>,
    ) -> Self {
        Self {
            home: home.into(),
            conf: conf.into(),
            userdata: userdata.into(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn conf(&self) -> &Path {
        &self.conf
    }

    pub fn userdata(&self) -> &Path {
        &self.userdata
    }

    pub fn substitute(&self, line: &str) -> String {
        line.replace(USERDATA_PLACEHOLDER, &self.userdata.display().to_string())
            .replace(CONF_PLACEHOLDER, &self.conf.display().to_string())
            .replace(HOME_PLACEHOLDER, &self.home.display().to_string())
    }
}
