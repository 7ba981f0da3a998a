use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationSection {
    Msg,
    Pre,
    Post,
}

impl MigrationSection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Msg => "MSG",
            Self::Pre => "PRE",
            Self::Post => "POST",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "MSG" => Some(Self::Msg),
            "PRE" => Some(Self::Pre),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }

    /// Text printed ahead of the version when a block in this section applies.
    pub fn banner_prefix(self) -> &'static str {
        match self {
            Self::Msg => "Important notes for version",
            Self::Pre => "Performing pre-update tasks for version",
            Self::Post => "Performing post-update tasks for version",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Msg, Self::Pre, Self::Post]
    }
}

impl fmt::Display for MigrationSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
