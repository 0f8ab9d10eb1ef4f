pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod output;
pub mod process_guard;
pub mod prompt;
pub mod render;
pub mod session;
pub mod util;
