pub mod adb;
pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod scrcpy;
pub mod state;

#[cfg(all(test, unix))]
mod test_support;
