//! wssh library — exposes modules for integration testing.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod agent;
pub mod capture;
pub mod cli;
pub mod commands;
pub mod config;
pub mod history;
pub mod hosts;
pub mod output;
pub mod ssh;
