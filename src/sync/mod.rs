//! # Synchronization Primitives
//!
//! Primitivas usadas pelo IPC.
//!
//! ## Hierarquia de Uso
//!
//! ```text
//! Mutex      → Seções críticas curtas (spin, não dorme segurando)
//! CondVar    → Espera por condição (solta o Mutex e dorme)
//! Notifier   → Lista de eventos disparados em transições de estado
//! ```
//!
//! ## Regras
//!
//! - **Ordem de Lock**: Porta antes de Conexão. Nunca duas conexões.
//! - **CondVar**: sempre re-verificar a condição em loop após acordar.

/// Condition Variable
pub mod condvar;

/// Listas de eventos
pub mod notifier;

pub use condvar::CondVar;
pub use notifier::Notifier;
pub use spin::{Mutex, MutexGuard};
