//! Shared helpers for site-server integration tests.

#![allow(dead_code)]

pub mod server;

pub use server::TestServer;
