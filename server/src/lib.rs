pub extern crate actix_web;

pub mod connection;
mod connection_tx_storage;
pub mod server;
mod server_state;
