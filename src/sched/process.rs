//! Processos
//!
//! A parte do processo que o IPC enxerga: PID, contexto de segurança,
//! tabela de handles e a porta raiz (`PROCESS_ROOT_PORT`).

use crate::core::object::{ObjectHandle, ObjectType};
use crate::ipc::Port;
use crate::security::SecurityContext;
use crate::syscall::error::{SysError, SysResult};
use crate::syscall::handle::{HandleId, HandleTable};
use alloc::sync::Arc;
use spin::Mutex;

/// ID do processo
pub type Pid = u32;

/// PID do processo do kernel. Dono das portas criadas pelo kernel.
pub const KERNEL_PID: Pid = 0;

pub struct Process {
    id: Pid,
    security: SecurityContext,
    handles: Mutex<HandleTable>,
    root_port: Mutex<Option<Arc<Port>>>,
}

impl Process {
    pub fn new(id: Pid, security: SecurityContext) -> Arc<Self> {
        Self::with_handle_capacity(id, security, HandleTable::DEFAULT_CAPACITY)
    }

    pub fn with_handle_capacity(id: Pid, security: SecurityContext, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            security,
            handles: Mutex::new(HandleTable::with_capacity(capacity)),
            root_port: Mutex::new(None),
        })
    }

    pub fn id(&self) -> Pid {
        self.id
    }

    pub fn security(&self) -> SecurityContext {
        self.security
    }

    pub fn root_port(&self) -> Option<Arc<Port>> {
        self.root_port.lock().clone()
    }

    /// Define a porta raiz (herdada na criação do processo).
    pub fn set_root_port(&self, port: Option<Arc<Port>>) {
        *self.root_port.lock() = port;
    }

    /// Separa um slot na tabela sem ainda ter o objeto.
    pub fn reserve_handle(&self) -> SysResult<HandleReservation<'_>> {
        let index = self.handles.lock().reserve().ok_or(SysError::NoHandles)?;
        Ok(HandleReservation {
            process: self,
            index,
            installed: false,
        })
    }

    /// Instala uma referência ao objeto na tabela e roda o hook de attach.
    ///
    /// Em caso de falha a referência recebida é solta.
    pub fn attach_handle(&self, handle: Arc<ObjectHandle>) -> SysResult<HandleId> {
        Ok(self.reserve_handle()?.install(handle))
    }

    /// Busca um handle, opcionalmente exigindo um tipo.
    pub fn lookup_handle(
        &self,
        id: HandleId,
        expected: Option<ObjectType>,
    ) -> SysResult<Arc<ObjectHandle>> {
        let table = self.handles.lock();
        let handle = table.get(id).ok_or(SysError::InvalidHandle)?;

        match expected {
            Some(ty) if handle.object_type() != ty => Err(SysError::InvalidHandle),
            _ => Ok(Arc::clone(handle)),
        }
    }

    /// Fecha um handle: detach e solta a referência.
    pub fn close_handle(&self, id: HandleId) -> SysResult<()> {
        let handle = self
            .handles
            .lock()
            .remove(id)
            .ok_or(SysError::InvalidHandle)?;

        handle.detach(self);
        Ok(())
    }

    /// Fecha todos os handles (saída do processo).
    pub fn close_all(&self) {
        let handles = self.handles.lock().drain();
        for handle in handles {
            handle.detach(self);
        }
    }

    pub fn handle_count(&self) -> usize {
        self.handles.lock().len()
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Slot reservado na tabela de handles de um processo.
///
/// Solto sem `install`, o slot volta a ficar livre.
pub struct HandleReservation<'a> {
    process: &'a Process,
    index: usize,
    installed: bool,
}

impl HandleReservation<'_> {
    /// Instala o objeto. Os hooks de attach rodam fora do lock da tabela
    /// (o attach de porta adquire o lock da porta).
    pub fn install(mut self, handle: Arc<ObjectHandle>) -> HandleId {
        let id = self
            .process
            .handles
            .lock()
            .install(self.index, Arc::clone(&handle));
        self.installed = true;

        handle.attach(self.process);
        id
    }
}

impl Drop for HandleReservation<'_> {
    fn drop(&mut self) {
        if !self.installed {
            self.process.handles.lock().cancel(self.index);
        }
    }
}
