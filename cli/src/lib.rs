//! Command-line front end for the gitwatch agent.
//!
//! The binary loads configuration, installs logging and hands control to the
//! pipeline coordinator. It also renders the per-user service definitions
//! used by `gitwatch install`.

pub mod args;
pub mod commands;
pub mod logging;
pub mod service;

pub use args::{Cli, Command};
