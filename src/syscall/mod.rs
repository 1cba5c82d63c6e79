//! Syscalls do Forge IPC
//!
//! Camada fina entre IDs de handle vistos pelo userspace e os objetos do
//! IPC. Os ponteiros de usuário já chegam validados e copiados como fatias
//! pelo dispatcher do kernel hospedeiro.
//!
//! # Módulos
//!
//! - `error`: Códigos de erro (SysError)
//! - `handle`: tabela de handles, close, wait/unwait
//! - `ipc`: port_create, port_listen, connection_open/send/receive

pub mod error;
pub mod handle;
pub mod ipc;

// Re-exports principais
pub use error::{SysError, SysResult};
pub use handle::{sys_handle_close, sys_object_unwait, sys_object_wait};
pub use ipc::{
    sys_connection_open, sys_connection_receive, sys_connection_receive_data,
    sys_connection_receive_handle, sys_connection_send, sys_port_create, sys_port_listen,
};

/// Registra o resultado de uma syscall. Controle de fluxo fica em trace.
pub(crate) fn trace_result<T>(name: &'static str, result: &SysResult<T>) {
    if let Err(err) = result {
        if err.is_flow_control() {
            crate::ktrace!(name, *err as i32);
        } else {
            crate::kdebug!(name, *err as i32);
        }
    }
}
