//! Command-line front end for the `todo-list` engine.
pub mod cli;
pub mod commands;
pub mod config;
pub mod notifier;
pub mod render;
