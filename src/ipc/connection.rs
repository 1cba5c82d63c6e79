//! Conexões
//!
//! Canal bidirecional entre cliente e servidor.
//!
//! ```text
//!  SETUP ──listen/callback──► ACTIVE ──close──► CLOSED
//!    └──────────disown/falha no open──────────────┘
//! ```
//!
//! Nasce com DUAS referências, uma por `EndpointRef`. O primeiro `close`
//! muda o estado e avisa o remoto; o segundo só solta a referência.

use super::endpoint::{EndpointQueue, EndpointRef, EndpointSignals, Side};
use super::message::Message;
use super::{Ipc, IpcFlags, CONNECTION_EVENT_HANGUP, CONNECTION_EVENT_MESSAGE, IPC_QUEUE_MAX};
use crate::core::object::{generate_koid, CacheSlot, KObject, Koid, ObjectEvent, ObjectType, RefCount};
use crate::sched::{Deadline, Pid};
use crate::security::SecurityContext;
use crate::syscall::error::{SysError, SysResult};
use crate::sync::CondVar;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::{Mutex, MutexGuard};

/// Estado da conexão. As transições nunca voltam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Aguardando aceitação.
    Setup,
    /// Mensagens podem fluir.
    Active,
    /// Terminal.
    Closed,
}

/// Identidade do cliente, visível ao `listen`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub pid: Pid,
    pub security: SecurityContext,
}

/// Estado protegido pelo lock da conexão.
pub(crate) struct ConnectionInner {
    pub(crate) state: ConnectionState,
    pub(crate) endpoints: [EndpointQueue; 2],
    /// Só existe em SETUP, enquanto o cliente espera na porta.
    pub(crate) client: Option<ClientInfo>,
}

pub struct Connection {
    koid: Koid,
    ipc: Arc<Ipc>,
    pub(crate) inner: Mutex<ConnectionInner>,
    signals: [EndpointSignals; 2],
    /// Cliente esperando a aceitação. Usado com o lock da PORTA.
    pub(crate) open_cvar: CondVar,
    count: RefCount,
    _slot: CacheSlot,
}

impl Connection {
    /// Cria uma conexão em SETUP e devolve as referências dos dois lados
    /// (servidor, cliente).
    pub fn new(ipc: &Arc<Ipc>) -> SysResult<(EndpointRef, EndpointRef)> {
        let slot = ipc.connection_cache().alloc()?;

        let conn = Arc::new(Self {
            koid: generate_koid(),
            ipc: Arc::clone(ipc),
            inner: Mutex::new(ConnectionInner {
                state: ConnectionState::Setup,
                endpoints: [EndpointQueue::default(), EndpointQueue::default()],
                client: None,
            }),
            signals: [EndpointSignals::default(), EndpointSignals::default()],
            open_cvar: CondVar::new(),
            count: RefCount::new(2),
            _slot: slot,
        });

        crate::ktrace!("(IPC) connection: criada koid=", conn.koid);
        let server = EndpointRef::new(Arc::clone(&conn), Side::Server);
        let client = EndpointRef::new(conn, Side::Client);
        Ok((server, client))
    }

    pub(crate) fn ipc(&self) -> &Arc<Ipc> {
        &self.ipc
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Referências vivas (lados ainda não fechados).
    pub fn refcount(&self) -> usize {
        self.count.get()
    }

    /// SETUP → ACTIVE. Falso se a conexão já não está em SETUP.
    pub(crate) fn activate(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != ConnectionState::Setup {
            return false;
        }
        inner.state = ConnectionState::Active;
        true
    }

    /// Enfileira `msg` no endpoint `dest`.
    ///
    /// Recebe e devolve o guard: quem chama pode fazer mais trabalho na
    /// mesma seção crítica.
    pub(crate) fn queue_message<'a>(
        &'a self,
        mut inner: MutexGuard<'a, ConnectionInner>,
        dest: Side,
        msg: &Message,
        flags: IpcFlags,
        deadline: Deadline,
    ) -> (MutexGuard<'a, ConnectionInner>, SysResult<()>) {
        let index = dest.index();

        if inner.state == ConnectionState::Closed {
            return (inner, Err(SysError::ConnHungup));
        }

        if inner.endpoints[index].flags.contains(super::EndpointFlags::DROP) {
            return (inner, Ok(()));
        }

        let sched = self.ipc.scheduler();
        msg.stamp(sched.system_time(), sched.current_thread().security());

        if !flags.contains(IpcFlags::FORCE) {
            while inner.endpoints[index].messages.len() >= IPC_QUEUE_MAX {
                let (guard, result) = self.signals[index].space_cvar.wait(
                    sched,
                    inner,
                    &self.inner,
                    deadline,
                    flags.sleep_flags(),
                );
                inner = guard;

                // Pode ter fechado enquanto dormíamos.
                if inner.state == ConnectionState::Closed {
                    return (inner, Err(SysError::ConnHungup));
                }

                if let Err(err) = result {
                    if inner.endpoints[index].messages.len() >= IPC_QUEUE_MAX {
                        return (inner, Err(err));
                    }
                }
            }
        }

        inner.endpoints[index].messages.push_back(Arc::clone(msg));
        crate::ktrace!("(IPC) send: mensagem enfileirada koid=", self.koid);

        self.signals[index].data_cvar.signal();
        self.signals[index].message_notifier.run(0);
        (inner, Ok(()))
    }

    /// Retira a próxima mensagem do endpoint `side`.
    ///
    /// Mensagens já enfileiradas são entregues antes do hangup.
    pub(crate) fn receive_message<'a>(
        &'a self,
        mut inner: MutexGuard<'a, ConnectionInner>,
        side: Side,
        flags: IpcFlags,
        deadline: Deadline,
    ) -> (MutexGuard<'a, ConnectionInner>, SysResult<Message>) {
        let index = side.index();

        let msg = loop {
            if let Some(msg) = inner.endpoints[index].messages.pop_front() {
                break msg;
            }

            if inner.state == ConnectionState::Closed {
                return (inner, Err(SysError::ConnHungup));
            }

            let (guard, result) = self.signals[index].data_cvar.wait(
                self.ipc.scheduler(),
                inner,
                &self.inner,
                deadline,
                flags.sleep_flags(),
            );
            inner = guard;

            if let Err(err) = result {
                let empty = inner.endpoints[index].messages.is_empty();
                if empty && inner.state != ConnectionState::Closed {
                    return (inner, Err(err));
                }
            }
        };

        crate::ktrace!("(IPC) receive: mensagem retirada koid=", self.koid);
        self.signals[index].space_cvar.signal();
        (inner, Ok(msg))
    }

    /// Fecha o lado `side` e solta a referência dele.
    ///
    /// Só o primeiro fechamento muda estado, acorda todos os waiters,
    /// descarta a fila do lado que fecha e dispara o hangup no remoto.
    pub(crate) fn close(&self, side: Side) {
        let mut discarded: Vec<Message> = Vec::new();

        {
            let mut inner = self.inner.lock();

            if inner.state != ConnectionState::Closed {
                for signals in &self.signals {
                    signals.space_cvar.broadcast();
                    signals.data_cvar.broadcast();
                }

                let endpoint = &mut inner.endpoints[side.index()];
                discarded.extend(endpoint.messages.drain(..));
                discarded.extend(endpoint.pending.take());

                inner.state = ConnectionState::Closed;
                self.signals[side.remote().index()].hangup_notifier.run(0);

                crate::ktrace!("(IPC) close: conexão fechada koid=", self.koid);
            }
        }

        // Mensagens podem carregar a última referência de uma porta.
        drop(discarded);
        self.release();
    }

    fn release(&self) {
        if self.count.dec() {
            assert!(
                self.inner.lock().state == ConnectionState::Closed,
                "Connection::release: última referência com conexão aberta"
            );
            crate::ktrace!("(IPC) connection: última referência koid=", self.koid);
        }
    }

    // =========================================================================
    // EVENTOS
    // =========================================================================

    pub(crate) fn wait_event(&self, side: Side, event: &Arc<ObjectEvent>) -> SysResult<()> {
        let inner = self.inner.lock();
        let signals = &self.signals[side.index()];

        match event.event() {
            CONNECTION_EVENT_HANGUP => {
                if !event.is_edge() && inner.state == ConnectionState::Closed {
                    event.signal(0);
                } else {
                    signals.hangup_notifier.register(event);
                }
            }
            CONNECTION_EVENT_MESSAGE => {
                if !event.is_edge() && !inner.endpoints[side.index()].messages.is_empty() {
                    event.signal(0);
                } else {
                    signals.message_notifier.register(event);
                }
            }
            _ => return Err(SysError::InvalidEvent),
        }

        Ok(())
    }

    pub(crate) fn unwait_event(&self, side: Side, event: &Arc<ObjectEvent>) -> SysResult<()> {
        let signals = &self.signals[side.index()];

        match event.event() {
            CONNECTION_EVENT_HANGUP => signals.hangup_notifier.unregister(event),
            CONNECTION_EVENT_MESSAGE => signals.message_notifier.unregister(event),
            _ => return Err(SysError::InvalidEvent),
        }

        Ok(())
    }
}

impl KObject for Connection {
    fn koid(&self) -> Koid {
        self.koid
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Connection
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug_assert_eq!(self.count.get(), 0);
        crate::ktrace!("(IPC) connection: destruída koid=", self.koid);
    }
}
