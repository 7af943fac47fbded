#![forbid(unsafe_code)]

pub mod cli;
pub mod dev_backends;
pub mod error;
pub mod routes;
pub mod server;
