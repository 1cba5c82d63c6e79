//! # Scheduler Interface
//!
//! O IPC não agenda nada: consome threads, processos e o relógio do
//! scheduler do kernel através dos traits deste módulo.
//!
//! ## Contrato de timeout
//!
//! | timeout | Deadline      | Comportamento                              |
//! |---------|---------------|--------------------------------------------|
//! | < 0     | `Never`       | Bloqueia indefinidamente                   |
//! | == 0    | `Now`         | Tenta uma vez, `WouldBlock` se não der     |
//! | > 0     | `At(now + t)` | Absoluto a partir da chamada, `TimedOut`   |

pub mod process;
pub mod thread;

pub use process::{HandleReservation, Pid, Process, KERNEL_PID};
pub use thread::{Scheduler, Thread, ThreadId};

use bitflags::bitflags;

/// Tempo em nanossegundos.
pub type Nstime = i64;

/// Prazo absoluto de uma espera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Bloqueia até a condição (ou interrupção).
    Never,
    /// Não bloqueia.
    Now,
    /// Até o instante absoluto dado.
    At(Nstime),
}

impl Deadline {
    /// Converte um timeout relativo em prazo absoluto no momento da chamada.
    pub fn from_timeout(timeout: Nstime, now: Nstime) -> Self {
        match timeout {
            t if t < 0 => Deadline::Never,
            0 => Deadline::Now,
            t => Deadline::At(now.saturating_add(t)),
        }
    }
}

bitflags! {
    /// Flags de `Thread::sleep`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SleepFlags: u32 {
        /// Uma interrupção externa aborta a espera.
        const INTERRUPTIBLE = 1 << 0;
    }
}

/// Por que `Thread::sleep` retornou.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepStatus {
    /// `wake()` (possivelmente anterior ao sleep).
    Woken,
    TimedOut,
    Interrupted,
}
