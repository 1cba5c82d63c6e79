//! # Inter-Process Communication (IPC)
//!
//! Canais bidirecionais orientados a conexão.
//!
//! ## Objetos
//!
//! | Objeto     | Papel                                                     |
//! |------------|-----------------------------------------------------------|
//! | Port       | Ponto de encontro. Lista de conexões aguardando `listen`  |
//! | Connection | Dois endpoints + máquina de estados SETUP/ACTIVE/CLOSED   |
//! | Endpoint   | Fila limitada de mensagens + slot de anexos pendentes     |
//! | Message    | Envelope + blob opcional + handle opcional (refcounted)   |
//!
//! ## Fluxo
//!
//! ```text
//! cliente: open(porta) ──► Port::connect ──► [kernel] callback síncrono
//!                                        └─► [user]   fila de espera ──► listen
//! ACTIVE:  send ──► fila do endpoint remoto ──► receive
//! close:   primeiro lado → CLOSED + hangup no remoto; segundo lado → só release
//! ```
//!
//! ## Ordem de locks
//!
//! Porta primeiro, conexão depois. Nunca dois locks de conexão ao mesmo tempo.

use crate::core::object::ObjectCache;
use crate::sched::{Process, Scheduler, SleepFlags, Thread};
use crate::syscall::handle::HandleId;
use alloc::sync::Arc;
use bitflags::bitflags;

/// Mensagens e envelopes
pub mod message;

/// Endpoints (lados de uma conexão)
pub mod endpoint;

/// Conexões
pub mod connection;

/// Portas de comunicação
pub mod port;

pub use connection::{ClientInfo, Connection, ConnectionState};
pub use endpoint::{EndpointFlags, EndpointRef, Side};
pub use message::{IpcMessage, KMessage, Message, MessageFlags};
pub use port::{ConnectHandler, Port};

// =============================================================================
// CONSTANTES
// =============================================================================

/// Tamanho máximo dos dados anexados a uma mensagem.
pub const IPC_DATA_MAX: usize = 16384;

/// Número máximo de mensagens na fila de um endpoint.
pub const IPC_QUEUE_MAX: usize = 256;

/// Porta raiz do processo atual (ID especial, não é handle).
pub const PROCESS_ROOT_PORT: HandleId = -1;

/// Porta de exceções da thread atual (ID especial, não é handle).
pub const THREAD_EXCEPTION_PORT: HandleId = -10;

/// Evento de porta: há uma conexão aguardando `listen`.
pub const PORT_EVENT_CONNECTION: u32 = 0;

/// Evento de conexão: o outro lado desligou.
pub const CONNECTION_EVENT_HANGUP: u32 = 0;

/// Evento de conexão: mensagem chegou.
pub const CONNECTION_EVENT_MESSAGE: u32 = 1;

bitflags! {
    /// Flags internas de send/receive.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct IpcFlags: u32 {
        /// A espera pode ser interrompida.
        const INTERRUPTIBLE = 1 << 0;
        /// Ignora o limite da fila (remetentes privilegiados).
        const FORCE         = 1 << 1;
    }
}

impl IpcFlags {
    pub(crate) fn sleep_flags(self) -> SleepFlags {
        if self.contains(IpcFlags::INTERRUPTIBLE) {
            SleepFlags::INTERRUPTIBLE
        } else {
            SleepFlags::empty()
        }
    }
}

// =============================================================================
// CONTEXTO
// =============================================================================

/// Estado global do subsistema: scheduler injetado e caches de objetos.
pub struct Ipc {
    scheduler: Arc<dyn Scheduler>,
    port_cache: Arc<ObjectCache>,
    connection_cache: Arc<ObjectCache>,
    message_cache: Arc<ObjectCache>,
}

impl Ipc {
    /// Inicializa o subsistema de IPC
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Arc<Self> {
        crate::kinfo!("(IPC) Inicializando subsistema de IPC...");

        let ipc = Arc::new(Self {
            scheduler,
            port_cache: ObjectCache::new("ipc_port_cache"),
            connection_cache: ObjectCache::new("ipc_connection_cache"),
            message_cache: ObjectCache::new("ipc_kmessage_cache"),
        });

        crate::kok!("(IPC) IPC inicializado");
        ipc
    }

    pub fn scheduler(&self) -> &dyn Scheduler {
        &*self.scheduler
    }

    pub fn current_thread(&self) -> Arc<dyn Thread> {
        self.scheduler.current_thread()
    }

    pub fn current_process(&self) -> Arc<Process> {
        self.scheduler.current_thread().process()
    }

    pub fn port_cache(&self) -> &Arc<ObjectCache> {
        &self.port_cache
    }

    pub fn connection_cache(&self) -> &Arc<ObjectCache> {
        &self.connection_cache
    }

    pub fn message_cache(&self) -> &Arc<ObjectCache> {
        &self.message_cache
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests;
