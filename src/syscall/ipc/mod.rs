//! # IPC Syscalls
//!
//! Portas e conexões.

pub mod connection;
pub mod port;

pub use connection::*;
pub use port::*;
