use std::path::{Component, Path, PathBuf};

/// Files under the live `etc` directory that an upgrade may refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysfilesManifest {
    pub entries: Vec<PathBuf>,
    /// Entries that would escape the `etc` root, with the reason.
    pub rejected: Vec<(String, String)>,
}

pub fn parse_sysfiles_manifest(content: &str) -> SysfilesManifest {
    let mut manifest = SysfilesManifest::default();
    for line in content.lines() {
        let entry = line.trim();
        if entry.is_empty() {
            continue;
        }
        match validate_relative_entry(entry) {
            Ok(path) => manifest.entries.push(path),
            Err(reason) => manifest
                .rejected
                .push((entry.to_string(), reason.to_string())),
        }
    }
    manifest
}

fn validate_relative_entry(entry: &str) -> Result<PathBuf, &'static str> {
    let path = Path::new(entry);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err("parent directory components are not allowed"),
            Component::RootDir | Component::Prefix(_) => {
                return Err("absolute paths are not allowed")
            }
        }
    }
    Ok(path.to_path_buf())
}
