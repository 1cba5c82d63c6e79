//! # Handle Management
//!
//! Handles por processo com referência compartilhada ao objeto.

pub mod table;

pub use table::{Handle, HandleId, HandleTable, INVALID_HANDLE};

use super::error::SysResult;
use crate::core::object::ObjectEvent;
use crate::ipc::Ipc;
use alloc::sync::Arc;

/// Fecha um handle
///
/// Fechar o handle de uma conexão fecha aquele lado; o de uma porta
/// solta a referência (e abandona a porta se era o último do dono).
pub fn sys_handle_close(ipc: &Ipc, handle: HandleId) -> SysResult<()> {
    let result = ipc.current_process().close_handle(handle);
    super::trace_result("(Syscall) handle_close: erro=", &result);
    result
}

/// Espera um evento de um objeto.
///
/// # Args
/// - handle: porta ou conexão
/// - event: pedido de espera (id do evento, flags, destino)
pub fn sys_object_wait(ipc: &Ipc, handle: HandleId, event: &Arc<ObjectEvent>) -> SysResult<()> {
    let process = ipc.current_process();
    let object = process.lookup_handle(handle, None)?;

    let result = object.wait(process.id(), event);
    super::trace_result("(Syscall) object_wait: erro=", &result);
    result
}

/// Cancela uma espera registrada por `sys_object_wait`.
pub fn sys_object_unwait(ipc: &Ipc, handle: HandleId, event: &Arc<ObjectEvent>) -> SysResult<()> {
    let object = ipc.current_process().lookup_handle(handle, None)?;
    object.unwait(event)
}
