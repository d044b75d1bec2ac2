//! mergeit - keep a pull request up to date and merge it once its build is green
//!
//! The merge loop lives in [`merge`]; platform access is abstracted behind
//! [`platform::StatusSource`] with GitHub and GitLab implementations.

pub mod auth;
pub mod config;
pub mod error;
pub mod merge;
pub mod platform;
pub mod types;
