//! Lifecycle economics for utility-scale battery energy storage (BESS) projects.
//!
//! The crate evaluates a project's discounted cash flows and headline metrics, how sensitive they
//! are to the inputs, and, for utility-owned projects, the revenue requirement, avoided costs,
//! wires comparison and Slice-of-Day qualification a regulator would look at.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod analysis;
pub mod avoided_cost;
pub mod cli;
pub mod economics;
pub mod finance;
pub mod input;
pub mod log;
pub mod output;
pub mod project;
pub mod rate_base;
pub mod sensitivity;
pub mod settings;
pub mod sod;
pub mod uos;
pub mod wires;

#[cfg(test)]
mod fixture;

/// Get the config directory for the program
pub fn get_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        panic!("Could not get user's config directory");
    };
    config_dir.push(env!("CARGO_PKG_NAME"));

    config_dir
}
