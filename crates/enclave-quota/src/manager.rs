//! Per-user disk quotas on the filesystem holding the container depot.

use std::path::PathBuf;
use std::process::{Command, Output};

use enclave_common::config::QuotaConfig;
use enclave_common::limits::DiskLimits;
use enclave_common::types::DiskStat;

use crate::error::{QuotaError, Result};
use crate::parse::{REPQUOTA_FIELDS, parse_mount_point, parse_repquota};
use crate::runner::CommandRunner;

/// Disk quota operations for container owners, identified by numeric user ID.
pub trait QuotaManager: Send + Sync {
    /// Applies disk limits to `owner`. Byte limits are converted to blocks
    /// first; unset limits are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the quota tool cannot be run or fails.
    fn set_limits(&self, owner: u32, limits: DiskLimits) -> Result<()>;

    /// Returns the block and inode limits of `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the report tool cannot be run, fails, or prints
    /// something unexpected.
    fn get_limits(&self, owner: u32) -> Result<DiskLimits>;

    /// Returns the disk usage of `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the report tool cannot be run, fails, or prints
    /// something unexpected.
    fn get_usage(&self, owner: u32) -> Result<DiskStat>;
}

/// Quota manager backed by the Linux `setquota` and `repquota` tools.
#[derive(Debug)]
pub struct LinuxQuotaManager<R> {
    mount_point: String,
    repquota: PathBuf,
    runner: R,
}

impl<R: CommandRunner> LinuxQuotaManager<R> {
    /// Resolves the mount point of the depot with `df -P` and keeps it for
    /// the lifetime of the manager.
    ///
    /// # Errors
    ///
    /// Returns an error if `df` cannot be run, fails, or reports no mount
    /// point.
    pub fn new(config: &QuotaConfig, runner: R) -> Result<Self> {
        let mut df = Command::new("df");
        let _ = df.arg("-P").arg(&config.depot_path);
        let output = run_checked(&runner, "df", &mut df)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mount_point = parse_mount_point(&stdout)
            .ok_or_else(|| QuotaError::MountNotFound {
                path: config.depot_path.clone(),
            })?
            .to_string();

        tracing::info!(depot = %config.depot_path.display(), mount = %mount_point, "quota mount point resolved");
        Ok(Self {
            mount_point,
            repquota: config.root_path.join("bin").join("repquota"),
            runner,
        })
    }

    /// Mount point the quotas apply to.
    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    /// Runner the tools are executed with.
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    fn report(&self, owner: u32) -> Result<[u64; REPQUOTA_FIELDS]> {
        let mut cmd = Command::new(&self.repquota);
        let _ = cmd.arg(&self.mount_point).arg(owner.to_string());
        let output = run_checked(&self.runner, "repquota", &mut cmd)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_repquota(&stdout).map_err(|reason| QuotaError::Parse {
            tool: "repquota".to_string(),
            output: stdout.into_owned(),
            reason,
        })
    }
}

impl<R: CommandRunner> QuotaManager for LinuxQuotaManager<R> {
    fn set_limits(&self, owner: u32, limits: DiskLimits) -> Result<()> {
        let limits = limits.with_derived_blocks();
        let values = [
            limits.block_soft,
            limits.block_hard,
            limits.inode_soft,
            limits.inode_hard,
        ]
        .map(|v| v.unwrap_or(0).to_string());

        let mut cmd = Command::new("setquota");
        let _ = cmd
            .arg("-u")
            .arg(owner.to_string())
            .args(&values)
            .arg(&self.mount_point);
        let _ = run_checked(&self.runner, "setquota", &mut cmd)?;

        tracing::info!(owner, mount = %self.mount_point, ?limits, "disk quota set");
        Ok(())
    }

    fn get_limits(&self, owner: u32) -> Result<DiskLimits> {
        let [_, _, block_soft, block_hard, _, _, inode_soft, inode_hard] = self.report(owner)?;
        Ok(DiskLimits {
            block_soft: Some(block_soft),
            block_hard: Some(block_hard),
            inode_soft: Some(inode_soft),
            inode_hard: Some(inode_hard),
            ..DiskLimits::default()
        })
    }

    fn get_usage(&self, owner: u32) -> Result<DiskStat> {
        let [_, bytes_used, _, _, _, inodes_used, _, _] = self.report(owner)?;
        Ok(DiskStat {
            bytes_used,
            inodes_used,
        })
    }
}

/// Runs `cmd` and turns launch failures and non-zero exits into errors.
fn run_checked<R: CommandRunner>(runner: &R, tool: &str, cmd: &mut Command) -> Result<Output> {
    let output = runner.run(cmd).map_err(|source| QuotaError::Launch {
        tool: tool.to_string(),
        source,
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(tool, status = %output.status, stderr = %stderr, "quota tool failed");
        return Err(QuotaError::ToolFailed {
            tool: tool.to_string(),
            status: output.status,
            stderr,
        });
    }
    Ok(output)
}
