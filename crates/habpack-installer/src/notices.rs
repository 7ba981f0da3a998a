use serde::Serialize;

use crate::UpgradeStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Fatal,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

/// Receives operator-facing messages as they happen.
pub trait NoticeSink {
    fn notice(&mut self, notice: Notice);

    fn step_started(&mut self, _step: UpgradeStep) {}

    fn step_finished(&mut self, _step: UpgradeStep) {}

    fn info(&mut self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.notice(Notice {
            severity: Severity::Info,
            message: message.into(),
        });
    }

    fn warn(&mut self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.notice(Notice {
            severity: Severity::Warn,
            message: message.into(),
        });
    }

    fn fatal(&mut self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.notice(Notice {
            severity: Severity::Fatal,
            message: message.into(),
        });
    }
}

impl NoticeSink for Vec<Notice> {
    fn notice(&mut self, notice: Notice) {
        self.push(notice);
    }
}
