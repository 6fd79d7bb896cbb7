//! HTTP adapter for the remote services port.

mod client;

pub use client::HttpRemoteClient;
