pub mod cli;
pub mod error;
pub mod logging;
pub mod server;
pub mod signal;
