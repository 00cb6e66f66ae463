//! Command handlers.

pub mod common;
pub mod config;
pub mod dedupe;
pub mod folder;
pub mod restore;
