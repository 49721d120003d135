pub mod command_executor;
pub mod communication;
pub mod config;
pub mod controller;
pub mod hardware;
pub mod logging;
pub mod models;
