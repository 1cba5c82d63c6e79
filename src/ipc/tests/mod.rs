//! Testes do subsistema de IPC
//!
//! Rodam no host, com o scheduler falso de `harness` e threads reais do SO.
//!
//! # Como Executar os Testes
//!
//! ```bash
//! cargo test --lib ipc::tests
//! cargo test --lib ipc::tests::queue
//! ```
//!
//! # Estrutura dos Testes
//!
//! - `message.rs` - Mensagens do kernel e anexos
//! - `queue.rs` - Fila, backpressure, hangup
//! - `connection.rs` - Ciclo de vida e referências
//! - `port.rs` - listen/connect, disown, portas do kernel
//! - `syscall.rs` - Camada de syscalls (validação, anexos pendentes)
//! - `events.rs` - Protocolo de espera de objetos
//!
//! # Convenções
//!
//! - Timeouts curtos aceitam `TimedOut` ou `WouldBlock`: o prazo pode
//!   vencer antes da primeira espera.

#![cfg(test)]

pub mod harness;

pub mod syscall;

use crate::ipc::{Connection, EndpointRef, Ipc};
use crate::sched::{Pid, Process};
use crate::security::SecurityContext;
use crate::syscall::error::{SysError, SysResult};
use std::sync::Arc;

pub use harness::{enter, settle, spawn, FakeScheduler};

/// Timeout "curto": 1ms.
pub const SHORT: i64 = 1_000_000;

/// Helper: Cria um contexto de IPC novo
pub fn create_test_ipc() -> Arc<Ipc> {
    Ipc::new(Arc::new(FakeScheduler))
}

/// Helper: Cria um processo de usuário com uid == pid
pub fn create_test_process(pid: Pid) -> Arc<Process> {
    Process::new(pid, SecurityContext::user(pid, pid))
}

/// Helper: Cria uma conexão já ACTIVE, sem porta. Devolve (servidor, cliente).
pub fn create_active_connection(ipc: &Arc<Ipc>) -> (EndpointRef, EndpointRef) {
    let (server, client) = Connection::new(ipc).expect("Connection::new");
    assert!(server.connection().activate());
    (server, client)
}

/// Timeouts curtos podem vencer antes de dormir.
pub fn assert_flow_timeout<T: core::fmt::Debug>(result: SysResult<T>) {
    match result {
        Err(SysError::TimedOut) | Err(SysError::WouldBlock) => {}
        other => panic!("esperava TimedOut/WouldBlock, veio {:?}", other),
    }
}

/// Espera (até 5s) uma condição observável de outra thread.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let start = std::time::Instant::now();
    while !condition() {
        assert!(
            start.elapsed() < std::time::Duration::from_secs(5),
            "condição não ocorreu a tempo"
        );
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}
