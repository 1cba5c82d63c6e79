//! # IPC Connection Operations
//!
//! connection_open, send, receive, receive_data, receive_handle

use crate::core::object::{ObjectHandle, ObjectType};
use crate::ipc::{
    EndpointRef, Ipc, IpcFlags, IpcMessage, KMessage, Message, MessageFlags, Port,
    IPC_DATA_MAX, PROCESS_ROOT_PORT, THREAD_EXCEPTION_PORT,
};
use crate::sched::{Nstime, Process};
use crate::security::SecurityContext;
use crate::syscall::error::{SysError, SysResult};
use crate::syscall::handle::HandleId;
use alloc::boxed::Box;
use alloc::sync::Arc;

// === HELPERS ===

/// Resolve o lado de conexão apontado por `handle`.
fn lookup_endpoint(process: &Process, handle: HandleId) -> SysResult<Arc<ObjectHandle>> {
    process.lookup_handle(handle, Some(ObjectType::Connection))
}

fn endpoint_of(object: &ObjectHandle) -> SysResult<&EndpointRef> {
    object.as_endpoint().ok_or(SysError::InvalidHandle)
}

/// Resolve uma porta: handle comum ou um dos IDs especiais negativos.
fn resolve_port(ipc: &Ipc, process: &Process, id: HandleId) -> SysResult<Arc<Port>> {
    match id {
        PROCESS_ROOT_PORT => process.root_port().ok_or(SysError::NotFound),
        THREAD_EXCEPTION_PORT => ipc
            .current_thread()
            .exception_port()
            .ok_or(SysError::NotFound),
        id if id < 0 => Err(SysError::InvalidArgument),
        id => {
            let object = process.lookup_handle(id, Some(ObjectType::Port))?;
            object
                .as_port()
                .map(Arc::clone)
                .ok_or(SysError::InvalidHandle)
        }
    }
}

/// Monta a mensagem do kernel a partir dos argumentos do usuário.
///
/// Nada é alocado antes de toda a validação passar.
fn copy_message_from_user(
    ipc: &Ipc,
    process: &Process,
    msg: &IpcMessage,
    data: Option<&[u8]>,
    attached: HandleId,
) -> SysResult<Message> {
    let size = msg.size as usize;
    if size > IPC_DATA_MAX {
        return Err(SysError::TooLarge);
    }

    let data: Option<Box<[u8]>> = match (size, data) {
        (0, None) => None,
        (0, Some(_)) | (_, None) => return Err(SysError::InvalidArgument),
        (size, Some(data)) if data.len() < size => return Err(SysError::InvalidArgument),
        (size, Some(data)) => Some(data[..size].into()),
    };

    let handle = if msg.flags.contains(MessageFlags::HANDLE) {
        let object = process.lookup_handle(attached, None)?;
        if !object.is_transferrable() {
            return Err(SysError::AccessDenied);
        }
        Some(object)
    } else if attached >= 0 {
        return Err(SysError::InvalidArgument);
    } else {
        None
    };

    let kmsg = KMessage::alloc(ipc)?;
    kmsg.set_envelope(msg.id, msg.args);
    kmsg.set_data(data);
    kmsg.set_handle(handle);
    Ok(kmsg)
}

// === IMPLEMENTAÇÕES ===

/// Abre uma conexão com uma porta
///
/// # Args
/// - port: handle da porta, `PROCESS_ROOT_PORT` ou `THREAD_EXCEPTION_PORT`
/// - timeout: espera pela aceitação (portas de usuário)
///
/// # Returns
/// Handle do lado cliente
pub fn sys_connection_open(ipc: &Ipc, port: HandleId, timeout: Nstime) -> SysResult<HandleId> {
    let process = ipc.current_process();

    let result = resolve_port(ipc, &process, port).and_then(|port| {
        // Sem slot livre, a conexão nem chega a ser criada.
        let reservation = process.reserve_handle()?;
        let client = port.connect(IpcFlags::INTERRUPTIBLE, timeout)?;
        Ok(reservation.install(Arc::new(ObjectHandle::Connection(client))))
    });

    crate::syscall::trace_result("(Syscall) connection_open: erro=", &result);
    result
}

/// Envia uma mensagem pela conexão
///
/// # Args
/// - msg: envelope (`size` e `HANDLE` descrevem os anexos)
/// - data: dados anexados, ao menos `msg.size` bytes
/// - attached: handle anexado (com `MessageFlags::HANDLE`) ou negativo
/// - timeout: espera por espaço na fila do remoto
pub fn sys_connection_send(
    ipc: &Ipc,
    handle: HandleId,
    msg: &IpcMessage,
    data: Option<&[u8]>,
    attached: HandleId,
    timeout: Nstime,
) -> SysResult<()> {
    let process = ipc.current_process();
    let object = lookup_endpoint(&process, handle)?;
    let endpoint = endpoint_of(&object)?;

    let result = copy_message_from_user(ipc, &process, msg, data, attached)
        .and_then(|kmsg| endpoint.user_send(&kmsg, timeout));

    crate::syscall::trace_result("(Syscall) connection_send: erro=", &result);
    result
}

/// Recebe uma mensagem da conexão
///
/// Só o envelope é copiado. Dados e handle ficam pendentes para
/// `sys_connection_receive_data` / `sys_connection_receive_handle`.
pub fn sys_connection_receive(
    ipc: &Ipc,
    handle: HandleId,
    msg: &mut IpcMessage,
    security: Option<&mut SecurityContext>,
    timeout: Nstime,
) -> SysResult<()> {
    let process = ipc.current_process();
    let object = lookup_endpoint(&process, handle)?;
    let endpoint = endpoint_of(&object)?;

    let result = endpoint.user_receive(timeout).map(|(envelope, sender)| {
        *msg = envelope;
        if let Some(security) = security {
            *security = sender;
        }
    });

    crate::syscall::trace_result("(Syscall) connection_receive: erro=", &result);
    result
}

/// Copia os dados da mensagem pendente
///
/// # Args
/// - buf: destino, ou `None` para descartar
///
/// # Returns
/// Tamanho dos dados
pub fn sys_connection_receive_data(
    ipc: &Ipc,
    handle: HandleId,
    buf: Option<&mut [u8]>,
) -> SysResult<usize> {
    let process = ipc.current_process();
    let object = lookup_endpoint(&process, handle)?;

    endpoint_of(&object)?.take_pending_data(buf)
}

/// Instala o handle da mensagem pendente no processo atual
///
/// # Args
/// - out: destino do novo ID, ou `None` para descartar
pub fn sys_connection_receive_handle(
    ipc: &Ipc,
    handle: HandleId,
    out: Option<&mut HandleId>,
) -> SysResult<()> {
    let process = ipc.current_process();
    let object = lookup_endpoint(&process, handle)?;
    let endpoint = endpoint_of(&object)?;

    let result = match out {
        Some(out) => endpoint
            .take_pending_handle(|| process.reserve_handle())
            .map(|(attached, reservation)| *out = reservation.install(attached)),
        None => endpoint.take_pending_handle(|| Ok(())).map(|_| ()),
    };

    crate::syscall::trace_result("(Syscall) connection_receive_handle: erro=", &result);
    result
}
