//! Concrete implementations of the domain ports.

pub mod http;
pub mod sqlite;
