mod command;
mod manifest;
mod marker;
mod placeholders;
mod section;
mod update_list;
mod version;

pub use command::{MigrationCommand, MigrationOp, SubstitutionPattern};
pub use manifest::{parse_sysfiles_manifest, SysfilesManifest};
pub use marker::{parse_distro_version, DISTRO_VERSION_KEY};
pub use placeholders::PathPlaceholders;
pub use section::MigrationSection;
pub use update_list::{
    parse_update_list, section_header_lines, ScanEvent, SectionScanner, UpdateList,
    UpdateListSection, VersionBlock,
};
pub use version::{version_code, VersionCode};
