//! Forge IPC.
//!
//! Núcleo de comunicação entre processos do Forge: portas, conexões
//! bidirecionais e mensagens com anexos (dados e handles).
//!
//! Tudo que não é IPC (scheduler, alocador, tabela de handles) entra como
//! colaborador injetado pelas interfaces em `sched`, `core::object` e
//! `syscall::handle`.

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (necessário para Vec/Box/Arc)
extern crate alloc;

// --- Módulos Centrais ---
pub mod core; // Logging, objetos do kernel, caches
pub mod sched; // Threads, processos, tempo
pub mod security; // Contexto de segurança
pub mod sync; // CondVar, Notifier

// --- Subsistemas ---
pub mod ipc; // Portas, conexões, mensagens
pub mod syscall; // Interface com Userspace

#[doc(hidden)]
pub use log as __log;

pub use crate::ipc::Ipc;
pub use crate::syscall::error::{SysError, SysResult};
