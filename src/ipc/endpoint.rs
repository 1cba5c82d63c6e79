//! Endpoints
//!
//! Cada conexão tem dois endpoints (servidor e cliente), guardados como
//! campos da própria `Connection`. O lado remoto é só um índice: os dois
//! lados vivem e morrem com a conexão, então não há ciclo de referências.
//!
//! `EndpointRef` é a posse de UM dos lados. Soltá-la fecha o lado.

use super::connection::{Connection, ConnectionState};
use super::message::{IpcMessage, Message, MessageFlags};
use super::IpcFlags;
use crate::core::object::{KObject, Koid, ObjectEvent, ObjectHandle};
use crate::sched::{Deadline, Nstime};
use crate::security::SecurityContext;
use crate::syscall::error::{SysError, SysResult};
use crate::sync::{CondVar, Notifier};
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use bitflags::bitflags;

/// Lado de uma conexão.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server = 0,
    Client = 1,
}

impl Side {
    /// Índice no array de endpoints da conexão.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// O outro lado.
    #[inline]
    pub const fn remote(self) -> Side {
        match self {
            Side::Server => Side::Client,
            Side::Client => Side::Server,
        }
    }
}

bitflags! {
    /// Flags de um endpoint.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EndpointFlags: u32 {
        /// Descarta mensagens recebidas em vez de enfileirar.
        const DROP = 1 << 0;
    }
}

/// Estado de um endpoint protegido pelo lock da conexão.
#[derive(Default)]
pub(crate) struct EndpointQueue {
    pub(crate) flags: EndpointFlags,
    /// Mensagens recebidas, em ordem de chegada.
    pub(crate) messages: VecDeque<Message>,
    /// Última mensagem recebida com anexos ainda não extraídos.
    pub(crate) pending: Option<Message>,
}

/// Filas de espera e notificadores de um endpoint.
#[derive(Default)]
pub(crate) struct EndpointSignals {
    /// Remetentes esperando espaço na fila deste endpoint.
    pub(crate) space_cvar: CondVar,
    /// Leitores esperando mensagens neste endpoint.
    pub(crate) data_cvar: CondVar,
    pub(crate) hangup_notifier: Notifier,
    pub(crate) message_notifier: Notifier,
}

/// Referência dona de um lado de uma conexão.
pub struct EndpointRef {
    conn: Arc<Connection>,
    side: Side,
}

impl EndpointRef {
    /// Só `Connection::new` cria referências: exatamente uma por lado.
    pub(crate) fn new(conn: Arc<Connection>, side: Side) -> Self {
        Self { conn, side }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    pub fn koid(&self) -> Koid {
        self.conn.koid()
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// Mensagens na fila deste lado.
    pub fn queued(&self) -> usize {
        self.conn.inner.lock().endpoints[self.side.index()].messages.len()
    }

    /// Há anexos esperando `receive_data`/`receive_handle`?
    pub fn has_pending(&self) -> bool {
        self.conn.inner.lock().endpoints[self.side.index()]
            .pending
            .is_some()
    }

    pub fn set_flags(&self, flags: EndpointFlags) {
        self.conn.inner.lock().endpoints[self.side.index()].flags = flags;
    }

    fn deadline(&self, timeout: Nstime) -> Deadline {
        Deadline::from_timeout(timeout, self.conn.ipc().scheduler().system_time())
    }

    // =========================================================================
    // API DO KERNEL
    // =========================================================================

    /// Envia uma mensagem ao lado remoto.
    ///
    /// A fila toma a sua própria referência; o chamador continua com a dele.
    pub fn send(&self, msg: &Message, flags: IpcFlags, timeout: Nstime) -> SysResult<()> {
        let deadline = self.deadline(timeout);
        let inner = self.conn.inner.lock();
        let (_inner, result) =
            self.conn
                .queue_message(inner, self.side.remote(), msg, flags, deadline);
        result
    }

    /// Recebe a próxima mensagem deste lado.
    pub fn receive(&self, flags: IpcFlags, timeout: Nstime) -> SysResult<Message> {
        let deadline = self.deadline(timeout);
        let inner = self.conn.inner.lock();
        let (_inner, result) = self
            .conn
            .receive_message(inner, self.side, flags, deadline);
        result
    }

    /// Fecha este lado. Equivale a soltar a referência.
    pub fn close(self) {
        drop(self);
    }

    // =========================================================================
    // CAMINHO DE USUÁRIO
    // =========================================================================

    /// Envio vindo de syscall: descarta anexos pendentes e espera
    /// interrompível.
    pub fn user_send(&self, msg: &Message, timeout: Nstime) -> SysResult<()> {
        let deadline = self.deadline(timeout);

        let mut inner = self.conn.inner.lock();
        let stale = inner.endpoints[self.side.index()].pending.take();
        let (inner, result) = self.conn.queue_message(
            inner,
            self.side.remote(),
            msg,
            IpcFlags::INTERRUPTIBLE,
            deadline,
        );
        drop(inner);

        drop(stale);
        result
    }

    /// Recebimento vindo de syscall: devolve só o envelope e o contexto do
    /// remetente. Dados e handle ficam pendentes neste lado.
    pub fn user_receive(&self, timeout: Nstime) -> SysResult<(IpcMessage, SecurityContext)> {
        let deadline = self.deadline(timeout);
        let index = self.side.index();

        let mut inner = self.conn.inner.lock();
        let stale = inner.endpoints[index].pending.take();
        let (mut inner, result) =
            self.conn
                .receive_message(inner, self.side, IpcFlags::INTERRUPTIBLE, deadline);

        let mut released = None;
        let received = result.map(|msg| {
            let out = (msg.envelope(), msg.security());
            if msg.has_attachment() {
                inner.endpoints[index].pending = Some(msg);
            } else {
                released = Some(msg);
            }
            out
        });
        drop(inner);

        drop(released);
        drop(stale);
        received
    }

    /// Extrai os dados da mensagem pendente.
    ///
    /// `None` descarta os dados. Um buffer menor que os dados falha com
    /// `InvalidArgument` sem consumir nada. Retorna o tamanho dos dados.
    pub fn take_pending_data(&self, buf: Option<&mut [u8]>) -> SysResult<usize> {
        let index = self.side.index();

        let mut inner = self.conn.inner.lock();
        let endpoint = &mut inner.endpoints[index];
        let pending = endpoint.pending.as_ref().ok_or(SysError::NotFound)?;

        let mut msg = pending.lock();
        let size = msg.msg.size as usize;
        let data = msg.data.as_deref().ok_or(SysError::NotFound)?;

        if let Some(buf) = buf {
            if buf.len() < size {
                return Err(SysError::InvalidArgument);
            }
            buf[..size].copy_from_slice(data);
        }

        let data = msg.data.take();
        msg.msg.size = 0;
        let done = msg.handle.is_none();
        drop(msg);

        let released = if done { endpoint.pending.take() } else { None };
        drop(inner);

        drop(data);
        drop(released);
        Ok(size)
    }

    /// Extrai o handle da mensagem pendente.
    ///
    /// `reserve` separa o destino do handle (slot na tabela do processo)
    /// ainda com o lock da conexão; se falhar, nada é consumido. O hook de
    /// attach roda depois, fora do lock, quando o chamador instala o handle.
    pub fn take_pending_handle<R>(
        &self,
        reserve: impl FnOnce() -> SysResult<R>,
    ) -> SysResult<(Arc<ObjectHandle>, R)> {
        let index = self.side.index();

        let mut inner = self.conn.inner.lock();
        let endpoint = &mut inner.endpoints[index];
        let pending = endpoint.pending.as_ref().ok_or(SysError::NotFound)?;

        let mut msg = pending.lock();
        if msg.handle.is_none() {
            return Err(SysError::NotFound);
        }

        let reserved = reserve()?;
        let handle = msg.handle.take().ok_or(SysError::NotFound)?;
        msg.msg.flags.remove(MessageFlags::HANDLE);
        let done = msg.data.is_none();
        drop(msg);

        let released = if done { endpoint.pending.take() } else { None };
        drop(inner);

        drop(released);
        Ok((handle, reserved))
    }

    // =========================================================================
    // EVENTOS
    // =========================================================================

    pub fn wait_event(&self, event: &Arc<ObjectEvent>) -> SysResult<()> {
        self.conn.wait_event(self.side, event)
    }

    pub fn unwait_event(&self, event: &Arc<ObjectEvent>) -> SysResult<()> {
        self.conn.unwait_event(self.side, event)
    }
}

impl Drop for EndpointRef {
    fn drop(&mut self) {
        self.conn.close(self.side);
    }
}

impl core::fmt::Debug for EndpointRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EndpointRef")
            .field("koid", &self.conn.koid())
            .field("side", &self.side)
            .finish()
    }
}
