pub mod client;
pub mod cmd;
pub mod config;
pub mod console;
pub mod error;
pub mod session;
pub mod ui;
pub mod upload;
pub mod view;
