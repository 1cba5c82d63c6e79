// Arquivo: core/object/kobject.rs
//
// Propósito: Definição base para Objetos do Kernel (Kernel Objects).
// Portas e conexões implementam `KObject` e são expostas ao userspace
// através de `ObjectHandle`.
//
// Detalhes de Implementação:
// - IDs únicos globais (KOID).
// - O tipo do objeto decide quais operações genéricas se aplicam
//   (transferência em mensagens, hooks de attach/detach, eventos).

//! Kernel Object Base

use bitflags::bitflags;
use core::sync::atomic::{AtomicU64, Ordering};

/// Kernel Object ID
pub type Koid = u64;

/// Gerador de KOIDs
static KOID_GENERATOR: AtomicU64 = AtomicU64::new(1);

/// Gera um novo KOID único
pub fn generate_koid() -> Koid {
    KOID_GENERATOR.fetch_add(1, Ordering::Relaxed)
}

/// Tipo de objeto apontado por um handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Port,
    Connection,
}

bitflags! {
    /// Propriedades de um tipo de objeto.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ObjectFlags: u32 {
        /// Handles deste tipo podem ser anexados a mensagens IPC.
        const TRANSFERRABLE = 1 << 0;
    }
}

impl ObjectType {
    /// Flags do tipo. Conexões não podem trocar de dono.
    pub const fn flags(self) -> ObjectFlags {
        match self {
            ObjectType::Port => ObjectFlags::TRANSFERRABLE,
            ObjectType::Connection => ObjectFlags::empty(),
        }
    }
}

/// Trait base que todos os objetos do kernel gerenciáveis devem implementar.
pub trait KObject: Send + Sync {
    /// Retorna o ID único do objeto.
    fn koid(&self) -> Koid;

    /// Retorna o tipo do objeto.
    fn object_type(&self) -> ObjectType;
}
