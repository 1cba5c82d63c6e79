//! Core Module
//!
//! Infraestrutura comum do IPC: logging e o modelo de objetos do kernel
//! (refcount, handles, eventos, caches).

pub mod logging;
pub mod object;
