pub mod client;

pub use client::HttpConnectorClient;
