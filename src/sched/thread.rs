//! Threads e Scheduler
//!
//! Interfaces implementadas pelo scheduler do kernel hospedeiro.

use super::{Nstime, Process, SleepFlags, SleepStatus};
use crate::ipc::Port;
use crate::security::SecurityContext;
use alloc::sync::Arc;

/// ID de thread
pub type ThreadId = u64;

/// Uma thread do kernel (ou de usuário, dentro de uma syscall).
pub trait Thread: Send + Sync {
    fn id(&self) -> ThreadId;

    /// Processo dono da thread.
    fn process(&self) -> Arc<Process>;

    /// Contexto de segurança efetivo da thread agora.
    fn security(&self) -> SecurityContext {
        self.process().security()
    }

    /// Bloqueia a thread atual.
    ///
    /// Semântica de permissão: um `wake()` que chegue antes do `sleep()`
    /// faz o próximo `sleep()` retornar `Woken` imediatamente. Retornos
    /// espúrios são permitidos.
    ///
    /// `deadline` é absoluto (mesma base de `Scheduler::system_time`).
    fn sleep(&self, deadline: Option<Nstime>, flags: SleepFlags) -> SleepStatus;

    /// Acorda a thread (ou deixa a permissão para o próximo sleep).
    fn wake(&self);

    /// Porta de entrega de exceções da thread, se houver.
    fn exception_port(&self) -> Option<Arc<Port>> {
        None
    }
}

/// Acesso ao relógio e à thread corrente.
pub trait Scheduler: Send + Sync {
    /// Tempo monotônico em nanossegundos.
    fn system_time(&self) -> Nstime;

    /// Thread executando a chamada atual.
    fn current_thread(&self) -> Arc<dyn Thread>;
}
