pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod logging;
pub mod platform;
pub mod ui;
pub mod usecase;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
