use super::*;
use crate::render::{output_style_for, render_status_line, OutputStyle};
use clap::error::ErrorKind;
use habpack_installer::{
    ConfigConflict, MigrationOutcome, ReconcileOutcome, StepFailure, SysfilesMode,
    SysfilesOutcome, UpgradeMode, UpgradeToolOutcome,
};
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!(
        "habpack-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    std::fs::create_dir_all(&path).expect("must create test dir");
    path
}

fn sample_report() -> UpgradeReport {
    UpgradeReport {
        mode: UpgradeMode::Upgrade,
        previous_version: Some("3.0.0".to_string()),
        new_version: Some("3.1.0".to_string()),
        migrations: vec![MigrationOutcome {
            section: "PRE".to_string(),
            versions: vec!["3.1.0".to_string()],
            applied: 2,
            unchanged: 1,
            skipped: vec!["BOGUS".to_string()],
            failed: Vec::new(),
            ignored_reentries: Vec::new(),
        }],
        default_file_written: false,
        reconcile: Some(ReconcileOutcome {
            installed: vec![PathBuf::from("items/demo.items")],
            unchanged: Vec::new(),
            conflicts: vec![ConfigConflict {
                live: PathBuf::from("/conf/services/addons.cfg"),
                sidecar: PathBuf::from("/conf/services/addons.dist-new.cfg"),
            }],
            failed: Vec::new(),
        }),
        sysfiles: Some(SysfilesOutcome {
            mode: SysfilesMode::Upgrade,
            manifest_present: true,
            copied: vec![PathBuf::from("all.policy")],
            missing_from_release: Vec::new(),
            rejected: Vec::new(),
            failed: Vec::new(),
        }),
        staging_purged: false,
        caches_removed: vec![PathBuf::from("/userdata/cache")],
        upgrade_tool: UpgradeToolOutcome::Failed { exit_code: Some(2) },
        step_failures: vec![StepFailure {
            step: "clear-caches".to_string(),
            error: "permission denied".to_string(),
        }],
    }
}

#[test]
fn cli_parses_upgrade_flags() {
    let cli = Cli::try_parse_from([
        "habpack",
        "upgrade",
        "--purge-staging",
        "--skip-running-check",
        "--json",
    ])
    .expect("must parse");
    match cli.command {
        Commands::Upgrade {
            purge_staging,
            skip_running_check,
            json,
        } => {
            assert!(purge_staging);
            assert!(skip_running_check);
            assert!(json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_accepts_global_prefix_after_subcommand() {
    let cli = Cli::try_parse_from(["habpack", "paths", "--prefix", "/opt/oh", "--layout", "l.toml"])
        .expect("must parse");
    assert_eq!(cli.prefix, Some(PathBuf::from("/opt/oh")));
    assert_eq!(cli.layout, Some(PathBuf::from("l.toml")));
    assert!(matches!(cli.command, Commands::Paths));
}

#[test]
fn cli_plan_collects_repeated_sections_case_insensitively() {
    let cli = Cli::try_parse_from([
        "habpack", "plan", "--from", "3.0.0", "--section", "PRE", "--section", "post",
    ])
    .expect("must parse");
    match cli.command {
        Commands::Plan {
            from,
            sections,
            json,
        } => {
            assert_eq!(from, "3.0.0");
            assert_eq!(sections, vec![CliSection::Pre, CliSection::Post]);
            assert!(!json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_migrate_requires_section() {
    let err = Cli::try_parse_from(["habpack", "migrate", "--from", "3.0.0"])
        .expect_err("section is required");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn cli_rejects_unknown_completion_shell() {
    let err = Cli::try_parse_from(["habpack", "completions", "tcsh"])
        .expect_err("tcsh is not supported");
    assert_eq!(err.kind(), ErrorKind::InvalidValue);

    let cli = Cli::try_parse_from(["habpack", "completions", "powershell"]).expect("must parse");
    assert!(matches!(
        cli.command,
        Commands::Completions {
            shell: CliCompletionShell::Powershell
        }
    ));
}

#[test]
fn cli_parses_version_code_argument() {
    let cli = Cli::try_parse_from(["habpack", "version-code", "4.1.0-SNAPSHOT"]).expect("must parse");
    match cli.command {
        Commands::VersionCode { version } => assert_eq!(version_code(&version), 40100),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn selected_sections_default_to_all() {
    assert_eq!(
        selected_sections(&[]),
        vec![
            MigrationSection::Msg,
            MigrationSection::Pre,
            MigrationSection::Post
        ]
    );
    assert_eq!(
        selected_sections(&[CliSection::Post]),
        vec![MigrationSection::Post]
    );
}

#[test]
fn resolve_layout_applies_layout_file_overrides() {
    let dir = test_dir();
    let layout_path = dir.join("layout.toml");
    std::fs::write(
        &layout_path,
        "version = 1\nconf = \"conf\"\nprocess_pattern = \"karaf\"\n",
    )
    .expect("must write layout file");

    let resolved =
        resolve_layout(Some(Path::new("/opt/oh")), Some(&layout_path)).expect("must resolve");
    assert_eq!(resolved.layout.conf(), dir.join("conf").as_path());
    assert_eq!(
        resolved.layout.userdata(),
        Path::new("/opt/oh/var/lib/openhab")
    );
    assert_eq!(resolved.process_pattern.as_deref(), Some("karaf"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn resolve_layout_reports_unsupported_layout_version() {
    let dir = test_dir();
    let layout_path = dir.join("layout.toml");
    std::fs::write(&layout_path, "version = 7\n").expect("must write layout file");

    let err = resolve_layout(Some(Path::new("/opt/oh")), Some(&layout_path))
        .err()
        .expect("version 7 must be rejected");
    let message = format!("{err:#}");
    assert!(
        message.contains("unsupported layout file version 7"),
        "unexpected error: {message}"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn output_style_requires_terminal_and_color() {
    assert_eq!(output_style_for(false, true), OutputStyle::Rich);
    assert_eq!(output_style_for(true, true), OutputStyle::Plain);
    assert_eq!(output_style_for(false, false), OutputStyle::Plain);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "upgrade finished"),
        "upgrade finished"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "upgrade finished"),
        "[OK] upgrade finished"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "binding removed"),
        "[WARN] binding removed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "Clearing cache ..."),
        "[..] Clearing cache ..."
    );
}

#[test]
fn upgrade_summary_lists_every_outcome() {
    let lines = format_upgrade_report_lines(&sample_report(), OutputStyle::Rich);
    assert_eq!(lines[0], "[OK] upgrade: 3.0.0 -> 3.1.0");
    assert_eq!(
        lines[1],
        "[OK] PRE: 3.1.0 (2 applied, 1 unchanged, 1 skipped, 0 failed)"
    );
    assert_eq!(
        lines[2],
        "[WARN] configuration: 1 installed, 0 unchanged, 1 conflicts"
    );
    assert!(lines[3].contains("addons.dist-new.cfg"));
    assert!(lines.contains(&"[OK] system files (manifest): 1 copied, 0 not shipped".to_string()));
    assert!(lines.contains(&"[WARN] upgrade tool: failed (exit 2)".to_string()));
    assert!(lines.contains(&"[WARN] clear-caches failed: permission denied".to_string()));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("[WARN] upgrade finished with warnings")
    );
}

#[test]
fn plan_without_update_list_warns() {
    let plan = habpack_installer::MigrationPlan {
        previous_version: "3.0.0".to_string(),
        update_list: PathBuf::from("/oh/runtime/bin/update.lst"),
        update_list_present: false,
        sections: Vec::new(),
        unscoped_lines: Vec::new(),
    };
    assert_eq!(
        format_plan_lines(&plan, OutputStyle::Plain),
        vec!["no update list at /oh/runtime/bin/update.lst".to_string()]
    );
}

#[test]
fn plan_lines_show_blocks_and_commands() {
    let plan = habpack_installer::MigrationPlan {
        previous_version: "3.0.0".to_string(),
        update_list: PathBuf::from("/oh/runtime/bin/update.lst"),
        update_list_present: true,
        sections: vec![habpack_installer::SectionPlan {
            section: "PRE".to_string(),
            blocks: vec![habpack_installer::PlannedBlock {
                version: "3.1.0".to_string(),
                line: 4,
                commands: vec![habpack_installer::PlannedCommand {
                    line: 5,
                    description: "DELETE /conf/obsolete.cfg".to_string(),
                    skipped: false,
                }],
            }],
            ignored_reentries: vec![9],
        }],
        unscoped_lines: vec![1],
    };

    let lines = format_plan_lines(&plan, OutputStyle::Plain);
    assert_eq!(
        lines,
        vec![
            "PRE: 1 version block(s) newer than 3.0.0".to_string(),
            "  [3.1.0] line 4".to_string(),
            "       5: DELETE /conf/obsolete.cfg".to_string(),
            "PRE appears again at line 9; ignored".to_string(),
            "lines outside any section are ignored: 1".to_string(),
        ]
    );
}

#[test]
fn paths_lines_include_environment_roots() {
    let layout = DistroLayout::from_prefix("/usr/local");
    let lines = format_paths_lines(&layout);
    assert_eq!(lines[0], "OPENHAB_HOME: /usr/local/libexec/openhab");
    assert!(lines.contains(&"OPENHAB_CONF: /usr/local/etc/openhab".to_string()));
    assert!(lines.contains(&"staging: /usr/local/share/openhab".to_string()));
}

#[test]
fn completions_script_names_the_binary() {
    let mut output = Vec::new();
    write_completions_script(CliCompletionShell::Bash, &mut output)
        .expect("must generate completions");
    let script = String::from_utf8(output).expect("completion script is utf-8");
    assert!(script.contains("habpack"));
    assert!(script.contains("version-code"));
}
