//! nginx virtual host management with validated, rollback-safe changes.
//!
//! Every change to a live config file is snapshotted, written to both the
//! project mirror and the live location, and checked with `nginx -t` before
//! it is kept. Whether a site is enabled is always read from the
//! `sites-enabled` symlink farm, never from the registry.

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
