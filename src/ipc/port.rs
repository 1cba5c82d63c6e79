//! Portas de comunicação
//!
//! Ponto de encontro entre clientes e um servidor. Duas formas de aceitar
//! conexões:
//!
//! - **Listener**: o `open` entra na fila de espera da porta e dorme até um
//!   `listen` do dono aceitar (ou a porta ser abandonada).
//! - **Kernel**: o `open` chama um callback do kernel de forma síncrona,
//!   sem fila.
//!
//! A fila guarda a referência do lado SERVIDOR de cada conexão em SETUP.
//! `listen` a entrega ao dono; `disown` a solta após fechar a conexão.

use super::connection::{ClientInfo, Connection, ConnectionState};
use super::endpoint::EndpointRef;
use super::{Ipc, IpcFlags, PORT_EVENT_CONNECTION};
use crate::core::object::{
    generate_koid, CacheSlot, KObject, Koid, ObjectEvent, ObjectHandle, ObjectType,
};
use crate::sched::{Deadline, Nstime, Pid, Process, SleepFlags, KERNEL_PID};
use crate::syscall::error::{SysError, SysResult};
use crate::syscall::handle::HandleId;
use crate::sync::{CondVar, Notifier};
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use spin::{Mutex, MutexGuard};

/// Callback de uma porta do kernel.
///
/// Recebe o lado servidor da nova conexão (ainda em SETUP) e o timeout do
/// `open`. Retornar erro recusa a conexão; a referência recebida é solta.
pub type ConnectHandler = dyn Fn(EndpointRef, Nstime) -> SysResult<()> + Send + Sync;

/// Como a porta aceita conexões.
enum PortAccept {
    Listener,
    Kernel(Box<ConnectHandler>),
}

struct PortInner {
    /// `None` depois de `disown`: a porta não aceita mais conexões.
    owner: Option<Pid>,
    /// Handles da porta dentro do processo dono.
    owner_count: usize,
    /// Conexões em SETUP aguardando `listen`, em ordem de chegada.
    waiting: VecDeque<EndpointRef>,
}

pub struct Port {
    koid: Koid,
    ipc: Arc<Ipc>,
    accept: PortAccept,
    inner: Mutex<PortInner>,
    listen_cvar: CondVar,
    connection_notifier: Notifier,
    _slot: CacheSlot,
}

impl Port {
    /// Cria uma porta de usuário pertencente a `owner`.
    pub fn new(ipc: &Arc<Ipc>, owner: Pid) -> SysResult<Arc<Self>> {
        Self::create(ipc, owner, PortAccept::Listener)
    }

    /// Cria uma porta do kernel. O callback roda a cada `open`.
    pub fn new_kernel<F>(ipc: &Arc<Ipc>, handler: F) -> SysResult<Arc<Self>>
    where
        F: Fn(EndpointRef, Nstime) -> SysResult<()> + Send + Sync + 'static,
    {
        Self::create(ipc, KERNEL_PID, PortAccept::Kernel(Box::new(handler)))
    }

    fn create(ipc: &Arc<Ipc>, owner: Pid, accept: PortAccept) -> SysResult<Arc<Self>> {
        let slot = ipc.port_cache().alloc()?;

        let port = Arc::new(Self {
            koid: generate_koid(),
            ipc: Arc::clone(ipc),
            accept,
            inner: Mutex::new(PortInner {
                owner: Some(owner),
                owner_count: 0,
                waiting: VecDeque::new(),
            }),
            listen_cvar: CondVar::new(),
            connection_notifier: Notifier::new(),
            _slot: slot,
        });

        crate::klog!("(IPC) port: criada koid=", port.koid, " owner=", owner);
        Ok(port)
    }

    /// Instala um handle para a porta no processo.
    pub fn publish(self: &Arc<Self>, process: &Process) -> SysResult<HandleId> {
        process.attach_handle(Arc::new(ObjectHandle::Port(Arc::clone(self))))
    }

    /// Abandona a porta e solta esta referência.
    pub fn destroy(self: Arc<Self>) {
        self.disown();
    }

    pub fn owner(&self) -> Option<Pid> {
        self.inner.lock().owner
    }

    pub fn owner_count(&self) -> usize {
        self.inner.lock().owner_count
    }

    /// Conexões esperando `listen`.
    pub fn waiting_count(&self) -> usize {
        self.inner.lock().waiting.len()
    }

    pub fn is_kernel(&self) -> bool {
        matches!(self.accept, PortAccept::Kernel(_))
    }

    // =========================================================================
    // CONNECT
    // =========================================================================

    /// Abre uma conexão com a porta e devolve o lado cliente, já ACTIVE.
    pub fn connect(&self, flags: IpcFlags, timeout: Nstime) -> SysResult<EndpointRef> {
        let sched = self.ipc.scheduler();
        let thread = sched.current_thread();
        let info = ClientInfo {
            pid: thread.process().id(),
            security: thread.security(),
        };
        let deadline = Deadline::from_timeout(timeout, sched.system_time());

        let (server, client) = Connection::new(&self.ipc)?;

        let inner = self.inner.lock();
        if inner.owner.is_none() {
            drop(inner);
            crate::kdebug!("(IPC) open: porta sem dono koid=", self.koid);
            return Err(SysError::ConnHungup);
        }

        match &self.accept {
            PortAccept::Kernel(handler) => {
                // O callback pode bloquear: roda sem o lock da porta.
                drop(inner);
                handler(server, timeout)?;

                if !client.connection().activate() {
                    return Err(SysError::ConnHungup);
                }
                Ok(client)
            }
            PortAccept::Listener => {
                self.queue_for_listener(inner, server, client, info, flags, deadline)
            }
        }
    }

    /// Coloca a conexão na fila e espera o `listen`.
    ///
    /// Espera no `open_cvar` da conexão com o lock da PORTA: `listen` e
    /// `disown` só mudam o estado de uma conexão em SETUP com esse lock
    /// adquirido, então o estado lido depois de acordar é estável até o
    /// lock ser solto.
    fn queue_for_listener<'a>(
        &'a self,
        mut inner: MutexGuard<'a, PortInner>,
        server: EndpointRef,
        client: EndpointRef,
        info: ClientInfo,
        flags: IpcFlags,
        deadline: Deadline,
    ) -> SysResult<EndpointRef> {
        let conn = Arc::clone(client.connection());
        conn.inner.lock().client = Some(info);

        inner.waiting.push_back(server);
        self.listen_cvar.signal();
        self.connection_notifier.run(0);

        let state = loop {
            let state = conn.state();
            if state != ConnectionState::Setup {
                break state;
            }

            let (guard, result) = conn.open_cvar.wait(
                self.ipc.scheduler(),
                inner,
                &self.inner,
                deadline,
                flags.sleep_flags(),
            );
            inner = guard;

            if let Err(err) = result {
                // Ninguém aceitou a tempo: sai da fila.
                if conn.state() == ConnectionState::Setup {
                    let removed = inner
                        .waiting
                        .iter()
                        .position(|s| Arc::ptr_eq(s.connection(), &conn))
                        .and_then(|i| inner.waiting.remove(i));
                    conn.inner.lock().client = None;
                    drop(inner);

                    drop(removed);
                    return Err(err);
                }
            }
        };

        conn.inner.lock().client = None;
        drop(inner);

        match state {
            ConnectionState::Active => Ok(client),
            _ => Err(SysError::ConnHungup),
        }
    }

    // =========================================================================
    // LISTEN
    // =========================================================================

    /// Aceita a próxima conexão pendente.
    ///
    /// `reserve` separa o destino da referência do servidor (slot na tabela
    /// de handles) antes de qualquer mudança. Se falhar, a conexão continua
    /// em SETUP na frente da fila e um novo `listen` a encontra.
    pub fn listen_with<R>(
        &self,
        caller: Pid,
        timeout: Nstime,
        reserve: impl FnOnce() -> SysResult<R>,
    ) -> SysResult<(EndpointRef, ClientInfo, R)> {
        let deadline = Deadline::from_timeout(timeout, self.ipc.scheduler().system_time());

        let mut inner = self.inner.lock();
        if inner.owner != Some(caller) {
            return Err(SysError::AccessDenied);
        }

        // O dono de uma porta do kernel aceita pelo callback, nunca por listen.
        if self.is_kernel() {
            return Err(SysError::NotSupported);
        }

        let server = loop {
            if let Some(server) = inner.waiting.pop_front() {
                break server;
            }

            let (guard, result) = self.listen_cvar.wait(
                self.ipc.scheduler(),
                inner,
                &self.inner,
                deadline,
                SleepFlags::INTERRUPTIBLE,
            );
            inner = guard;

            // Abandonada durante a espera.
            if inner.owner != Some(caller) {
                return Err(SysError::AccessDenied);
            }

            if let Err(err) = result {
                if inner.waiting.is_empty() {
                    return Err(err);
                }
            }
        };

        let conn = Arc::clone(server.connection());
        let mut conn_inner = conn.inner.lock();

        let reserved = match reserve() {
            Ok(reserved) => reserved,
            Err(err) => {
                drop(conn_inner);
                inner.waiting.push_front(server);
                crate::kwarn!("(IPC) listen: sem destino para a conexão koid=", conn.koid());
                return Err(err);
            }
        };

        debug_assert_eq!(conn_inner.state, ConnectionState::Setup);
        conn_inner.state = ConnectionState::Active;
        let client = conn_inner.client.unwrap_or_default();
        conn.open_cvar.broadcast();
        drop(conn_inner);
        drop(inner);

        crate::klog!("(IPC) listen: aceita koid=", conn.koid(), " pid=", client.pid);
        Ok((server, client, reserved))
    }

    /// `listen` para consumidores do kernel.
    pub fn listen(&self, caller: Pid, timeout: Nstime) -> SysResult<(EndpointRef, ClientInfo)> {
        self.listen_with(caller, timeout, || Ok(()))
            .map(|(server, client, ())| (server, client))
    }

    // =========================================================================
    // DONO
    // =========================================================================

    /// Remove o dono e cancela todas as conexões pendentes. Idempotente.
    pub fn disown(&self) {
        let cancelled = {
            let mut inner = self.inner.lock();
            self.disown_locked(&mut inner)
        };

        drop(cancelled);
    }

    /// Devolve as referências canceladas para serem soltas sem o lock.
    fn disown_locked(&self, inner: &mut PortInner) -> VecDeque<EndpointRef> {
        if inner.owner.take().is_some() {
            crate::kdebug!("(IPC) port: sem dono koid=", self.koid);
        }
        inner.owner_count = 0;

        let cancelled = core::mem::take(&mut inner.waiting);
        for server in &cancelled {
            let conn = server.connection();
            conn.inner.lock().state = ConnectionState::Closed;
            conn.open_cvar.broadcast();
        }

        // Listeners bloqueados voltam com AccessDenied.
        self.listen_cvar.broadcast();
        cancelled
    }

    /// Hook de attach: um handle da porta entrou no processo `pid`.
    pub(crate) fn attach_owner(&self, pid: Pid) {
        let mut inner = self.inner.lock();
        if inner.owner == Some(pid) {
            inner.owner_count += 1;
        }
    }

    /// Hook de detach. O último handle do dono abandona a porta.
    pub(crate) fn detach_owner(&self, pid: Pid) {
        let cancelled = {
            let mut inner = self.inner.lock();
            if inner.owner != Some(pid) {
                return;
            }

            debug_assert!(inner.owner_count > 0);
            inner.owner_count = inner.owner_count.saturating_sub(1);
            if inner.owner_count > 0 {
                return;
            }
            self.disown_locked(&mut inner)
        };

        drop(cancelled);
    }

    // =========================================================================
    // EVENTOS
    // =========================================================================

    pub(crate) fn wait_event(&self, caller: Pid, event: &Arc<ObjectEvent>) -> SysResult<()> {
        match event.event() {
            PORT_EVENT_CONNECTION => {
                let inner = self.inner.lock();
                if inner.owner != Some(caller) {
                    return Err(SysError::AccessDenied);
                }

                if !inner.waiting.is_empty() {
                    event.signal(0);
                } else {
                    self.connection_notifier.register(event);
                }
                Ok(())
            }
            _ => Err(SysError::InvalidEvent),
        }
    }

    pub(crate) fn unwait_event(&self, event: &Arc<ObjectEvent>) -> SysResult<()> {
        match event.event() {
            PORT_EVENT_CONNECTION => {
                self.connection_notifier.unregister(event);
                Ok(())
            }
            _ => Err(SysError::InvalidEvent),
        }
    }
}

impl core::fmt::Debug for Port {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Port")
            .field("koid", &self.koid)
            .field("kernel", &self.is_kernel())
            .finish()
    }
}

impl KObject for Port {
    fn koid(&self) -> Koid {
        self.koid
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Port
    }
}

impl Drop for Port {
    fn drop(&mut self) {
        crate::ktrace!("(IPC) port: destruída koid=", self.koid);
    }
}
