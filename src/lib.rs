//! This crate provides a library for constructing a [SOCKS](https://www.rfc-editor.org/rfc/rfc1928)
//! proxy server speaking SOCKS4, SOCKS4A and SOCKS5.
//!
//! # Feature
//! ## Authentication
//!
//! Any authentication method is not supported.
//!
//! A SOCKS5 client connecting to the server is required to offer `X'00'`
//! (`NO AUTHENTICATION REQUIRED`) among its method candidates.
//!
//! ## Command
//!
//! Only the `CONNECT` command is supported.
//! Then, some protocols connecting from server to client are not able to
//! proxy. And also protocols using UDP are not supported.
//!
//! ## Protocol selection
//!
//! Both SOCKS versions are served on the same port: the first byte of a
//! connection decides whether the SOCKS4 or the SOCKS5 state machine runs.
//!
//! # Usage
//!
//! This crate is on [crates.io](https://crates.io/crates/wicket), and can be
//! used by adding `wicket` to your dependencies in your project's
//! `Cargo.toml`.
//!
//! ```toml
//! [dependencies]
//! wicket = "1.1.0"
//! ```
//!
//! ## Server
//!
//! Here is a minimum server example.
//!
//! ```rust
//! use std::net::TcpListener;
//! use wicket::*;
//! let server = SocksServer::new(&ServerConfig::default()).unwrap();
//! let listener = TcpListener::bind("127.0.0.1:0").unwrap();
//! server.serve(listener).unwrap();
//! // ... proxy is accepting in the background ...
//! server.close().unwrap();
//! ```

pub mod binder;
mod byte_stream;
pub mod config;
pub mod connector;
pub mod error;
pub mod model;
mod peek_stream;
mod relay;
pub mod server;
mod socks4;
mod socks5;
mod tcp_listener_ext;
mod test;
mod thread;

pub use config::*;
pub use error::{Error, Result};
pub use model::Address;
pub use server::*;
