//! Objeto referenciado por handle
//!
//! O que fica na tabela de handles de um processo (e dentro de mensagens,
//! para objetos transferíveis). Compartilhado via `Arc<ObjectHandle>`:
//! quando a última referência some, o objeto é solto (porta) ou fechado
//! (lado de uma conexão).

use super::{KObject, Koid, ObjectEvent, ObjectFlags, ObjectType};
use crate::ipc::{EndpointRef, Port};
use crate::sched::{Pid, Process};
use crate::syscall::error::SysResult;
use alloc::sync::Arc;

#[derive(Debug)]
pub enum ObjectHandle {
    Port(Arc<Port>),
    Connection(EndpointRef),
}

impl ObjectHandle {
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectHandle::Port(_) => ObjectType::Port,
            ObjectHandle::Connection(_) => ObjectType::Connection,
        }
    }

    pub fn koid(&self) -> Koid {
        match self {
            ObjectHandle::Port(port) => port.koid(),
            ObjectHandle::Connection(endpoint) => endpoint.koid(),
        }
    }

    pub fn flags(&self) -> ObjectFlags {
        self.object_type().flags()
    }

    /// Pode ser anexado a uma mensagem?
    pub fn is_transferrable(&self) -> bool {
        self.flags().contains(ObjectFlags::TRANSFERRABLE)
    }

    pub fn as_port(&self) -> Option<&Arc<Port>> {
        match self {
            ObjectHandle::Port(port) => Some(port),
            _ => None,
        }
    }

    pub fn as_endpoint(&self) -> Option<&EndpointRef> {
        match self {
            ObjectHandle::Connection(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    /// Hook: o handle entrou na tabela de `process`.
    pub fn attach(&self, process: &Process) {
        if let ObjectHandle::Port(port) = self {
            port.attach_owner(process.id());
        }
    }

    /// Hook: o handle saiu da tabela de `process`.
    pub fn detach(&self, process: &Process) {
        if let ObjectHandle::Port(port) = self {
            port.detach_owner(process.id());
        }
    }

    /// Protocolo de espera genérico. `caller` é o processo que espera.
    pub fn wait(&self, caller: Pid, event: &Arc<ObjectEvent>) -> SysResult<()> {
        match self {
            ObjectHandle::Port(port) => port.wait_event(caller, event),
            ObjectHandle::Connection(endpoint) => endpoint.wait_event(event),
        }
    }

    pub fn unwait(&self, event: &Arc<ObjectEvent>) -> SysResult<()> {
        match self {
            ObjectHandle::Port(port) => port.unwait_event(event),
            ObjectHandle::Connection(endpoint) => endpoint.unwait_event(event),
        }
    }
}
