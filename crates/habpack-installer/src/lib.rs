mod caches;
mod env_file;
mod fs_utils;
mod layout;
mod layout_file;
mod migrations;
mod notices;
mod orchestrator;
mod process;
mod reconcile;
mod sysfiles;
mod types;
mod upgrade_tool;

pub use caches::{clear_caches, purge_staging};
pub use env_file::{
    environment_variables, install_default_file, render_default_file, render_env_file,
    render_launcher_script, write_env_files,
};
pub use fs_utils::{backup_path, dist_new_path};
pub use layout::{default_user_prefix, DistroLayout, USERDATA_CACHE_DIRS};
pub use layout_file::{parse_layout_file, read_layout_file, LayoutFile};
pub use migrations::{
    execute_migration_command, plan_migrations, run_migration_section, run_migration_text,
};
pub use notices::{Notice, NoticeSink, Severity};
pub use orchestrator::{
    StepResult, UpgradeOptions, UpgradeOrchestrator, UpgradeRun, UpgradeStep, UPGRADE_STEPS,
};
pub use process::{
    build_running_check_command, capture_output, detect_running_instance_with_runner,
    RunningCheck, DEFAULT_PROCESS_PATTERN,
};
pub use reconcile::reconcile_configuration;
pub use sysfiles::{install_system_files, update_system_files};
pub use types::{
    CommandEffect, ConfigConflict, MigrationOutcome, MigrationPlan, PlannedBlock, PlannedCommand,
    ReconcileOutcome, SectionPlan, StepFailure, SysfilesMode, SysfilesOutcome, UpgradeMode,
    UpgradeReport, UpgradeToolOutcome,
};
pub use upgrade_tool::{build_upgrade_tool_command, run_upgrade_tool_with_runner};
