pub mod app;
pub mod buffer;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod logging;
pub mod tui;
