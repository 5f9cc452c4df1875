//! Command implementations

pub mod add;
pub mod auth;
pub mod capture;
pub mod connect;
pub mod history;
pub mod list;
pub mod push;
pub mod run;
