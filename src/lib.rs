pub mod cli;
pub mod commands;
pub mod config;
pub mod connectivity;
pub mod platform;
pub mod release;
pub mod runner;
pub mod ui;
