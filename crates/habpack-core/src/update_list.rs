use std::iter::Enumerate;
use std::str::Lines;

use serde::Serialize;

use crate::{MigrationCommand, PathPlaceholders, VersionCode};

/// Structural view of an update list, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateList {
    pub sections: Vec<UpdateListSection>,
    /// Non-blank lines that sit outside any section or version block.
    pub unscoped_lines: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateListSection {
    pub name: String,
    pub line: usize,
    pub blocks: Vec<VersionBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionBlock {
    pub version: String,
    pub code: VersionCode,
    pub line: usize,
    pub commands: Vec<(usize, String)>,
}

impl UpdateList {
    /// First occurrence of `name`; later occurrences are never scanned.
    pub fn section(&self, name: &str) -> Option<&UpdateListSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Header lines of every occurrence of `name` after the first.
    pub fn repeated_section_lines(&self, name: &str) -> Vec<usize> {
        self.sections
            .iter()
            .filter(|section| section.name == name)
            .skip(1)
            .map(|section| section.line)
            .collect()
    }

    pub fn applicable_blocks(&self, name: &str, installed: VersionCode) -> Vec<&VersionBlock> {
        self.section(name)
            .map(|section| {
                section
                    .blocks
                    .iter()
                    .filter(|block| block.code > installed)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl VersionBlock {
    pub fn parsed_commands(&self, placeholders: &PathPlaceholders) -> Vec<MigrationCommand> {
        self.commands
            .iter()
            .map(|(_, raw)| MigrationCommand::parse(raw, placeholders))
            .collect()
    }
}

enum LineKind<'a> {
    SectionHeader(&'a str),
    VersionHeader(&'a str),
    Body,
}

fn classify_line(line: &str) -> LineKind<'_> {
    if let Some(name) = section_header_name(line) {
        return LineKind::SectionHeader(name);
    }
    if let Some(version) = version_header(line) {
        return LineKind::VersionHeader(version);
    }
    LineKind::Body
}

// Any `[[...]]` on the line counts as a section header.
fn section_header_name(line: &str) -> Option<&str> {
    let open = line.find("[[")?;
    let close = line.rfind("]]")?;
    if close < open + 2 {
        return None;
    }
    Some(&line[open + 2..close])
}

// `[X.Y.Z...]`: bracketed on both ends with at least two dots inside.
fn version_header(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    if inner.matches('.').count() < 2 {
        return None;
    }
    Some(inner)
}

pub fn parse_update_list(text: &str) -> UpdateList {
    let mut list = UpdateList::default();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let line_number = index + 1;

        match classify_line(line) {
            LineKind::SectionHeader(name) => list.sections.push(UpdateListSection {
                name: name.to_string(),
                line: line_number,
                blocks: Vec::new(),
            }),
            LineKind::VersionHeader(version) => match list.sections.last_mut() {
                Some(section) => section.blocks.push(VersionBlock {
                    version: version.to_string(),
                    code: VersionCode::from_version(version),
                    line: line_number,
                    commands: Vec::new(),
                }),
                None => list.unscoped_lines.push(line_number),
            },
            LineKind::Body => {
                let block = list
                    .sections
                    .last_mut()
                    .and_then(|section| section.blocks.last_mut());
                match block {
                    Some(block) => block.commands.push((line_number, line.to_string())),
                    None => list.unscoped_lines.push(line_number),
                }
            }
        }
    }

    list
}

/// Line numbers of every exact `[[section]]` header.
pub fn section_header_lines(text: &str, section: &str) -> Vec<usize> {
    let header = format!("[[{section}]]");
    text.lines()
        .enumerate()
        .filter(|(_, line)| line.trim() == header)
        .map(|(index, _)| index + 1)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A version block newer than the installed version starts here.
    Banner { version: String, line: usize },
    Command { command: MigrationCommand, line: usize },
}

/// Streams the commands of one section that apply on top of `installed`.
///
/// Lines are consumed lazily so a caller can execute each command before
/// the next one is parsed. Once the requested section has been entered,
/// scanning stops at the next section header, including a repeat of its own.
pub struct SectionScanner<'a> {
    lines: Enumerate<Lines<'a>>,
    header: String,
    installed: VersionCode,
    placeholders: &'a PathPlaceholders,
    in_section: bool,
    in_new_version: bool,
    finished: bool,
}

impl<'a> SectionScanner<'a> {
    pub fn new(
        text: &'a str,
        section: &str,
        installed: VersionCode,
        placeholders: &'a PathPlaceholders,
    ) -> Self {
        Self {
            lines: text.lines().enumerate(),
            header: format!("[[{section}]]"),
            installed,
            placeholders,
            in_section: false,
            in_new_version: false,
            finished: false,
        }
    }
}

impl Iterator for SectionScanner<'_> {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        for (index, raw) in self.lines.by_ref() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let line_number = index + 1;

            if line == self.header {
                if self.in_section {
                    self.finished = true;
                    return None;
                }
                self.in_section = true;
                self.in_new_version = false;
                continue;
            }

            match classify_line(line) {
                LineKind::SectionHeader(_) => {
                    if self.in_section {
                        self.finished = true;
                        return None;
                    }
                    self.in_new_version = false;
                }
                LineKind::VersionHeader(version) => {
                    if !self.in_section {
                        continue;
                    }
                    self.in_new_version = VersionCode::from_version(version) > self.installed;
                    if self.in_new_version {
                        return Some(ScanEvent::Banner {
                            version: version.to_string(),
                            line: line_number,
                        });
                    }
                }
                LineKind::Body => {
                    if self.in_section && self.in_new_version {
                        return Some(ScanEvent::Command {
                            command: MigrationCommand::parse(line, self.placeholders),
                            line: line_number,
                        });
                    }
                }
            }
        }

        self.finished = true;
        None
    }
}
