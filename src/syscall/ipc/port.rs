//! # IPC Port Operations
//!
//! port_create, port_listen

use crate::core::object::{ObjectHandle, ObjectType};
use crate::ipc::{ClientInfo, Ipc, Port};
use crate::sched::Nstime;
use crate::syscall::error::{SysError, SysResult};
use crate::syscall::handle::HandleId;
use alloc::sync::Arc;

/// Cria uma porta pertencente ao processo atual
///
/// # Returns
/// Handle da porta ou erro
pub fn sys_port_create(ipc: &Arc<Ipc>) -> SysResult<HandleId> {
    let process = ipc.current_process();
    let port = Port::new(ipc, process.id())?;

    let result = port.publish(&process);
    crate::syscall::trace_result("(Syscall) port_create: erro=", &result);
    result
}

/// Aceita a próxima conexão pendente na porta
///
/// # Args
/// - handle: porta do processo atual
/// - client: destino opcional da identidade do cliente
/// - timeout: < 0 bloqueia, 0 não bloqueia, > 0 em nanossegundos
///
/// # Returns
/// Handle do lado servidor da conexão
pub fn sys_port_listen(
    ipc: &Ipc,
    handle: HandleId,
    client: Option<&mut ClientInfo>,
    timeout: Nstime,
) -> SysResult<HandleId> {
    let process = ipc.current_process();
    let object = process.lookup_handle(handle, Some(ObjectType::Port))?;
    let port = object.as_port().ok_or(SysError::InvalidHandle)?;

    // O slot do handle é separado antes da aceitação: sem slot, a conexão
    // continua na fila.
    let result = port
        .listen_with(process.id(), timeout, || process.reserve_handle())
        .map(|(server, info, reservation)| {
            if let Some(client) = client {
                *client = info;
            }
            reservation.install(Arc::new(ObjectHandle::Connection(server)))
        });

    crate::syscall::trace_result("(Syscall) port_listen: erro=", &result);
    result
}
