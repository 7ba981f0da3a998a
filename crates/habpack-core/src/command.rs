use std::fmt;
use std::path::PathBuf;

use regex::Regex;

use crate::PathPlaceholders;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationOp {
    Default,
    Delete,
    DeleteDir,
    Move,
    Replace,
    Note,
    Alert,
}

impl MigrationOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Delete => "DELETE",
            Self::DeleteDir => "DELETEDIR",
            Self::Move => "MOVE",
            Self::Replace => "REPLACE",
            Self::Note => "NOTE",
            Self::Alert => "ALERT",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "DEFAULT" => Some(Self::Default),
            "DELETE" => Some(Self::Delete),
            "DELETEDIR" => Some(Self::DeleteDir),
            "MOVE" => Some(Self::Move),
            "REPLACE" => Some(Self::Replace),
            "NOTE" => Some(Self::Note),
            "ALERT" => Some(Self::Alert),
            _ => None,
        }
    }

    fn path_arity(self) -> usize {
        match self {
            Self::Default | Self::Delete | Self::DeleteDir => 1,
            Self::Move => 2,
            Self::Replace => 3,
            Self::Note | Self::Alert => 1,
        }
    }
}

/// Compiled `REPLACE` pattern; equality is by source text.
#[derive(Debug, Clone)]
pub struct SubstitutionPattern(Regex);

impl SubstitutionPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Replaces every match in `text`. `\1`..`\9` in `replacement` refer to
    /// capture groups and `\&` to the whole match; `$` is literal.
    pub fn replace_all(&self, text: &str, replacement: &str) -> String {
        let template = replacement_template(replacement);
        self.0.replace_all(text, template.as_str()).into_owned()
    }
}

impl PartialEq for SubstitutionPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for SubstitutionPattern {}

fn replacement_template(replacement: &str) -> String {
    let mut template = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '$' => template.push_str("$$"),
            '\\' => match chars.peek().copied() {
                Some(digit) if digit.is_ascii_digit() => {
                    chars.next();
                    template.push_str("${");
                    template.push(digit);
                    template.push('}');
                }
                Some('&') => {
                    chars.next();
                    template.push_str("${0}");
                }
                Some('\\') => {
                    chars.next();
                    template.push('\\');
                }
                _ => template.push('\\'),
            },
            other => template.push(other),
        }
    }
    template
}

/// One line of an update list after placeholder substitution.
///
/// Lines that do not form a valid command are kept as `Skipped` so callers
/// can report them; executing a skipped command is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationCommand {
    Default {
        path: PathBuf,
    },
    Delete {
        path: PathBuf,
    },
    DeleteDir {
        path: PathBuf,
    },
    Move {
        from: PathBuf,
        to: PathBuf,
    },
    Replace {
        pattern: SubstitutionPattern,
        replacement: String,
        path: PathBuf,
    },
    Note {
        message: String,
    },
    Alert {
        message: String,
    },
    Skipped {
        raw: String,
        reason: String,
    },
}

impl MigrationCommand {
    pub fn parse(line: &str, placeholders: &PathPlaceholders) -> Self {
        let substituted = placeholders.substitute(line.trim());
        let (op_token, rest) = match substituted.split_once(';') {
            Some((op, rest)) => (op, Some(rest)),
            None => (substituted.as_str(), None),
        };

        let Some(op) = MigrationOp::parse(op_token.trim()) else {
            return Self::skipped(line, format!("unknown operation '{}'", op_token.trim()));
        };
        let Some(rest) = rest else {
            return Self::skipped(line, format!("{} has no arguments", op.as_str()));
        };

        let args = match op {
            MigrationOp::Note | MigrationOp::Alert => {
                if rest.trim().is_empty() {
                    return Self::skipped(line, format!("{} message is empty", op.as_str()));
                }
                let message = rest.to_string();
                return if op == MigrationOp::Alert {
                    Self::Alert { message }
                } else {
                    Self::Note { message }
                };
            }
            _ => match split_path_args(op, rest) {
                Ok(args) => args,
                Err(reason) => return Self::skipped(line, reason),
            },
        };

        match (op, args.as_slice()) {
            (MigrationOp::Default, [path]) => Self::Default {
                path: PathBuf::from(*path),
            },
            (MigrationOp::Delete, [path]) => Self::Delete {
                path: PathBuf::from(*path),
            },
            (MigrationOp::DeleteDir, [path]) => Self::DeleteDir {
                path: PathBuf::from(*path),
            },
            (MigrationOp::Move, [from, to]) => Self::Move {
                from: PathBuf::from(*from),
                to: PathBuf::from(*to),
            },
            (MigrationOp::Replace, [pattern, replacement, path]) => {
                match SubstitutionPattern::new(pattern) {
                    Ok(pattern) => Self::Replace {
                        pattern,
                        replacement: replacement.to_string(),
                        path: PathBuf::from(*path),
                    },
                    Err(err) => Self::skipped(line, format!("invalid REPLACE pattern: {err}")),
                }
            }
            _ => Self::skipped(line, format!("{} arguments do not match", op.as_str())),
        }
    }

    pub fn op(&self) -> Option<MigrationOp> {
        match self {
            Self::Default { .. } => Some(MigrationOp::Default),
            Self::Delete { .. } => Some(MigrationOp::Delete),
            Self::DeleteDir { .. } => Some(MigrationOp::DeleteDir),
            Self::Move { .. } => Some(MigrationOp::Move),
            Self::Replace { .. } => Some(MigrationOp::Replace),
            Self::Note { .. } => Some(MigrationOp::Note),
            Self::Alert { .. } => Some(MigrationOp::Alert),
            Self::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    fn skipped(raw: &str, reason: String) -> Self {
        Self::Skipped {
            raw: raw.trim().to_string(),
            reason,
        }
    }
}

// Trailing empty fields are dropped, so `DELETE;path;` is still one argument.
// Only the REPLACE replacement may be empty.
fn split_path_args(op: MigrationOp, rest: &str) -> Result<Vec<&str>, String> {
    let mut args = rest.split(';').collect::<Vec<_>>();
    while args.last().is_some_and(|arg| arg.is_empty()) {
        args.pop();
    }
    let arity = op.path_arity();
    if args.len() != arity {
        return Err(format!(
            "{} expects {} argument(s), found {}",
            op.as_str(),
            arity,
            args.len()
        ));
    }

    let empty_argument = args.iter().enumerate().any(|(index, arg)| {
        arg.trim().is_empty() && !(op == MigrationOp::Replace && index == 1)
    });
    if empty_argument {
        return Err(format!("{} has an empty argument", op.as_str()));
    }

    Ok(args)
}

impl fmt::Display for MigrationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default { path } => write!(f, "DEFAULT {}", path.display()),
            Self::Delete { path } => write!(f, "DELETE {}", path.display()),
            Self::DeleteDir { path } => write!(f, "DELETEDIR {}", path.display()),
            Self::Move { from, to } => {
                write!(f, "MOVE {} -> {}", from.display(), to.display())
            }
            Self::Replace {
                pattern,
                replacement,
                path,
            } => write!(
                f,
                "REPLACE '{}' with '{}' in {}",
                pattern.as_str(),
                replacement,
                path.display()
            ),
            Self::Note { message } => write!(f, "NOTE {message}"),
            Self::Alert { message } => write!(f, "ALERT {message}"),
            Self::Skipped { raw, reason } => write!(f, "skipped '{raw}' ({reason})"),
        }
    }
}
