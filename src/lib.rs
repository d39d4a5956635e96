pub mod acceptor;
pub mod audit;
pub mod cli;
pub mod config;
pub mod context;
pub mod control;
pub mod framing;
pub mod logging;
pub mod lpd;
pub mod server;
pub mod utils;
