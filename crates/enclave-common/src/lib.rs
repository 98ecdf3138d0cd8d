//! # enclave-common
//!
//! Shared data model, error definitions, configuration models, and constants
//! used across the Enclave control plane.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and holds the value objects that the protocol client and
//! the quota backend exchange with their callers.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod limits;
pub mod net;
pub mod process;
pub mod types;
