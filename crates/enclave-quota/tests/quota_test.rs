//! Quota manager tests against canned tool output.

#![cfg(unix)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};
use std::sync::Mutex;

use enclave_common::config::QuotaConfig;
use enclave_common::limits::DiskLimits;
use enclave_quota::runner::describe;
use enclave_quota::{CommandRunner, LinuxQuotaManager, QuotaError, QuotaManager, SystemRunner};

const DF_OUTPUT: &str = "Filesystem 1024-blocks Used Available Capacity Mounted on\n\
                         /dev/sda1 1000 10 990 1% /var/containers\n";

/// Canned reply for one program.
#[derive(Clone, Debug)]
struct Canned {
    code: i32,
    stdout: String,
    stderr: String,
}

impl Canned {
    fn ok(stdout: &str) -> Self {
        Self {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn failed(code: i32, stderr: &str) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

/// Records every command and answers from a table keyed by program file name.
#[derive(Debug, Default)]
struct FakeRunner {
    replies: HashMap<String, Canned>,
    commands: Mutex<Vec<String>>,
}

impl FakeRunner {
    fn with(mut self, program: &str, reply: Canned) -> Self {
        let _ = self.replies.insert(program.to_string(), reply);
        self
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &mut Command) -> io::Result<Output> {
        self.commands.lock().unwrap().push(describe(command));
        let program = Path::new(command.get_program())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let reply = self
            .replies
            .get(&program)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, program))?;
        Ok(Output {
            status: ExitStatus::from_raw(reply.code << 8),
            stdout: reply.stdout.into_bytes(),
            stderr: reply.stderr.into_bytes(),
        })
    }
}

fn config() -> QuotaConfig {
    QuotaConfig {
        depot_path: PathBuf::from("/var/containers/depot"),
        root_path: PathBuf::from("/opt/enclave"),
    }
}

fn manager(runner: FakeRunner) -> LinuxQuotaManager<FakeRunner> {
    LinuxQuotaManager::new(&config(), runner.with("df", Canned::ok(DF_OUTPUT)))
        .expect("manager")
}

#[test]
fn mount_point_comes_from_df() {
    let quota = manager(FakeRunner::default());
    assert_eq!(quota.mount_point(), "/var/containers");
}

#[test]
fn df_without_data_line_is_mount_not_found() {
    let runner = FakeRunner::default().with(
        "df",
        Canned::ok("Filesystem 1024-blocks Used Available Capacity Mounted on\n"),
    );
    let err = LinuxQuotaManager::new(&config(), runner).expect_err("no mount");
    assert!(matches!(err, QuotaError::MountNotFound { path } if path == Path::new("/var/containers/depot")));
}

#[test]
fn df_failure_is_reported() {
    let runner = FakeRunner::default().with("df", Canned::failed(1, "df: no such file"));
    let err = LinuxQuotaManager::new(&config(), runner).expect_err("df fails");
    assert!(matches!(err, QuotaError::ToolFailed { ref tool, .. } if tool == "df"));
}

#[test]
fn set_limits_runs_setquota_with_derived_blocks() {
    let quota = manager(FakeRunner::default().with("setquota", Canned::ok("")));
    quota
        .set_limits(
            1000,
            DiskLimits {
                byte_soft: Some(1025),
                block_hard: Some(50),
                inode_hard: Some(900),
                ..DiskLimits::default()
            },
        )
        .expect("set limits");

    let commands = quota_commands(&quota);
    assert_eq!(
        commands.last().map(String::as_str),
        Some("setquota -u 1000 2 50 0 900 /var/containers")
    );
}

#[test]
fn setquota_failure_carries_stderr() {
    let quota = manager(
        FakeRunner::default().with("setquota", Canned::failed(2, "setquota: quota not enabled\n")),
    );
    let err = quota
        .set_limits(1000, DiskLimits::default())
        .expect_err("setquota fails");
    match err {
        QuotaError::ToolFailed {
            tool,
            status,
            stderr,
        } => {
            assert_eq!(tool, "setquota");
            assert_eq!(status.code(), Some(2));
            assert_eq!(stderr, "setquota: quota not enabled");
        }
        other => unreachable!("expected ToolFailed, got {other:?}"),
    }
}

#[test]
fn repquota_line_yields_limits_and_usage() {
    let quota = manager(
        FakeRunner::default().with("repquota", Canned::ok("0 500 1000 1200 0 300 900 950\n")),
    );

    let limits = quota.get_limits(1000).expect("limits");
    assert_eq!(
        limits,
        DiskLimits {
            block_soft: Some(1000),
            block_hard: Some(1200),
            inode_soft: Some(900),
            inode_hard: Some(950),
            ..DiskLimits::default()
        }
    );

    let usage = quota.get_usage(1000).expect("usage");
    assert_eq!(usage.bytes_used, 500);
    assert_eq!(usage.inodes_used, 300);

    let commands = quota_commands(&quota);
    assert_eq!(commands[1], "/opt/enclave/bin/repquota /var/containers 1000");
}

#[test]
fn short_repquota_output_is_a_parse_error() {
    let quota = manager(FakeRunner::default().with("repquota", Canned::ok("0 500 1000\n")));
    let err = quota.get_limits(7).expect_err("short output");
    assert!(matches!(err, QuotaError::Parse { ref output, .. } if output == "0 500 1000\n"));
}

#[test]
fn non_numeric_repquota_output_is_a_parse_error() {
    let quota = manager(
        FakeRunner::default().with("repquota", Canned::ok("0 500 x 1200 0 300 900 950\n")),
    );
    assert!(matches!(quota.get_usage(7), Err(QuotaError::Parse { .. })));
}

#[test]
fn missing_tool_is_a_launch_error() {
    let quota = manager(FakeRunner::default());
    let err = quota.get_usage(7).expect_err("no repquota");
    assert!(matches!(err, QuotaError::Launch { ref tool, .. } if tool == "repquota"));
}

#[cfg(target_os = "linux")]
#[test]
fn system_runner_reads_a_real_report_script() {
    use std::os::unix::fs::PermissionsExt;

    let depot = tempfile::tempdir().expect("depot dir");
    let root = tempfile::tempdir().expect("root dir");
    let bin = root.path().join("bin");
    std::fs::create_dir(&bin).expect("bin dir");
    let script = bin.join("repquota");
    std::fs::write(&script, "#!/bin/sh\necho \"0 4096 10 20 0 12 30 40\"\n").expect("script");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
        .expect("chmod");

    let config = QuotaConfig {
        depot_path: depot.path().to_path_buf(),
        root_path: root.path().to_path_buf(),
    };
    let quota = LinuxQuotaManager::new(&config, SystemRunner).expect("df should resolve");
    assert!(quota.mount_point().starts_with('/'));

    let usage = quota.get_usage(1000).expect("usage");
    assert_eq!(usage.bytes_used, 4096);
    assert_eq!(usage.inodes_used, 12);
}

fn quota_commands(quota: &LinuxQuotaManager<FakeRunner>) -> Vec<String> {
    quota.runner().commands()
}
