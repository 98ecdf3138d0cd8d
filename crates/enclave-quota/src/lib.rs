//! # enclave-quota
//!
//! Per-user disk quotas for container owners.
//!
//! The mount point holding the container depot is resolved once with
//! `df -P`. Limits are then applied with `setquota` and read back with
//! `repquota`, both run through a [`CommandRunner`] so tests can substitute
//! canned tool output.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod error;
pub mod manager;
pub mod parse;
pub mod runner;

pub use error::{QuotaError, Result};
pub use manager::{LinuxQuotaManager, QuotaManager};
pub use runner::{CommandRunner, SystemRunner};
