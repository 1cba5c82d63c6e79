//! Mensagem IPC
//!
//! `IpcMessage` é o envelope de tamanho fixo copiado para o userspace.
//! `KMessage` é a versão do kernel: envelope + snapshot de segurança do
//! remetente + blob opcional + handle opcional, com contagem de referências
//! via `Arc`. Criada com uma referência pelo remetente; a fila toma outra
//! ao enfileirar.

use super::{Ipc, IPC_DATA_MAX};
use crate::core::object::{CacheSlot, ObjectHandle};
use crate::sched::Nstime;
use crate::security::SecurityContext;
use crate::syscall::error::SysResult;
use alloc::boxed::Box;
use alloc::sync::Arc;
use bitflags::bitflags;
use spin::{Mutex, MutexGuard};

bitflags! {
    /// Flags do envelope.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MessageFlags: u16 {
        /// Há um handle anexado.
        const HANDLE = 1 << 1;
    }
}

/// Envelope da mensagem
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpcMessage {
    /// Tipo de mensagem (definido pelo protocolo do serviço)
    pub id: u32,
    pub flags: MessageFlags,
    /// Tamanho dos dados anexados
    pub size: u16,
    /// Argumentos inline
    pub args: [u64; 6],
    /// Instante do envio
    pub timestamp: Nstime,
}

impl IpcMessage {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_args(id: u32, args: [u64; 6]) -> Self {
        Self {
            id,
            args,
            ..Self::default()
        }
    }
}

/// Estado mutável da mensagem.
pub(crate) struct MessageInner {
    pub(crate) msg: IpcMessage,
    pub(crate) security: SecurityContext,
    /// `Some` sse `msg.size > 0`.
    pub(crate) data: Option<Box<[u8]>>,
    /// `Some` sse `MessageFlags::HANDLE`.
    pub(crate) handle: Option<Arc<ObjectHandle>>,
}

/// Mensagem do kernel
pub struct KMessage {
    inner: Mutex<MessageInner>,
    _slot: CacheSlot,
}

/// Referência a uma mensagem do kernel.
pub type Message = Arc<KMessage>;

impl KMessage {
    /// Aloca uma mensagem zerada.
    pub fn alloc(ipc: &Ipc) -> SysResult<Message> {
        let slot = ipc.message_cache().alloc()?;

        Ok(Arc::new(Self {
            inner: Mutex::new(MessageInner {
                msg: IpcMessage::default(),
                security: SecurityContext::default(),
                data: None,
                handle: None,
            }),
            _slot: slot,
        }))
    }

    /// Define tipo e argumentos inline.
    pub fn set_envelope(&self, id: u32, args: [u64; 6]) {
        let mut inner = self.inner.lock();
        inner.msg.id = id;
        inner.msg.args = args;
    }

    /// Anexa dados (ou remove, com `None`), substituindo os anteriores.
    ///
    /// O tamanho já deve ter sido validado pelo chamador.
    pub fn set_data(&self, data: Option<Box<[u8]>>) {
        let data = data.filter(|d| !d.is_empty());
        let size = data.as_ref().map_or(0, |d| d.len());
        assert!(size <= IPC_DATA_MAX, "KMessage::set_data acima de IPC_DATA_MAX");

        let mut inner = self.inner.lock();
        inner.msg.size = size as u16;
        inner.data = data;
    }

    /// Anexa um handle (ou remove, com `None`), soltando o anterior.
    ///
    /// O objeto precisa ser transferível.
    pub fn set_handle(&self, handle: Option<Arc<ObjectHandle>>) {
        assert!(
            handle.as_ref().map_or(true, |h| h.is_transferrable()),
            "KMessage::set_handle com objeto não transferível"
        );

        let old = {
            let mut inner = self.inner.lock();
            inner
                .msg
                .flags
                .set(MessageFlags::HANDLE, handle.is_some());
            core::mem::replace(&mut inner.handle, handle)
        };

        // Soltar fora do lock: pode ser a última referência do objeto.
        drop(old);
    }

    /// Cópia do envelope.
    pub fn envelope(&self) -> IpcMessage {
        self.inner.lock().msg
    }

    /// Contexto de segurança do remetente no momento do envio.
    pub fn security(&self) -> SecurityContext {
        self.inner.lock().security
    }

    /// Há dados ou handle anexados?
    pub fn has_attachment(&self) -> bool {
        let inner = self.inner.lock();
        inner.data.is_some() || inner.handle.is_some()
    }

    pub fn data_len(&self) -> usize {
        self.inner.lock().msg.size as usize
    }

    pub fn has_handle(&self) -> bool {
        self.inner.lock().handle.is_some()
    }

    /// Carimba instante e contexto do remetente.
    pub(crate) fn stamp(&self, timestamp: Nstime, security: SecurityContext) {
        let mut inner = self.inner.lock();
        inner.msg.timestamp = timestamp;
        inner.security = security;
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, MessageInner> {
        self.inner.lock()
    }
}

impl core::fmt::Debug for KMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = self.envelope();
        f.debug_struct("KMessage")
            .field("id", &msg.id)
            .field("size", &msg.size)
            .finish()
    }
}

impl Drop for KMessage {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        crate::ktrace!("(IPC) kmessage: liberada id=", inner.msg.id);
    }
}
