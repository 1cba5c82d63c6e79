//! # Handle Table
//!
//! Tabela de handles per-process. Cada slot guarda uma referência ao
//! `ObjectHandle` compartilhado; o ID visto pelo userspace é índice +
//! generation, sempre não-negativo (IDs negativos são portas especiais).

use crate::core::object::ObjectHandle;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// ID de handle visto pelo userspace.
pub type HandleId = i32;

/// Nenhum handle.
pub const INVALID_HANDLE: HandleId = -1;

/// Handle é índice + generation
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle(u32);

impl Handle {
    /// Generation tem 15 bits para o ID caber positivo num i32.
    const GENERATION_MASK: u16 = 0x7FFF;

    pub fn new(index: u16, generation: u16) -> Self {
        Self((((generation & Self::GENERATION_MASK) as u32) << 16) | index as u32)
    }

    pub fn from_id(id: HandleId) -> Option<Self> {
        (id >= 0).then_some(Self(id as u32))
    }

    pub fn index(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn generation(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn as_id(&self) -> HandleId {
        self.0 as HandleId
    }
}

/// Estado de um slot
enum Slot {
    Free,
    /// Separado por `reserve`, ainda sem objeto.
    Reserved,
    Used(Arc<ObjectHandle>),
}

/// Entrada na handle table
struct HandleEntry {
    slot: Slot,
    generation: u16,
}

impl HandleEntry {
    const fn empty() -> Self {
        Self {
            slot: Slot::Free,
            generation: 0,
        }
    }
}

/// Tabela de handles para um processo
pub struct HandleTable {
    entries: Vec<HandleEntry>,
    used: usize,
}

impl HandleTable {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(u16::MAX as usize + 1);
        let mut entries = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            entries.push(HandleEntry::empty());
        }
        Self { entries, used: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Handles instalados.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Separa um slot livre. `None` se a tabela está cheia.
    pub fn reserve(&mut self) -> Option<usize> {
        let (idx, entry) = self
            .entries
            .iter_mut()
            .enumerate()
            .find(|(_, e)| matches!(e.slot, Slot::Free))?;
        entry.slot = Slot::Reserved;
        Some(idx)
    }

    /// Devolve um slot reservado e não usado.
    pub fn cancel(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            debug_assert!(matches!(entry.slot, Slot::Reserved));
            entry.slot = Slot::Free;
        }
    }

    /// Instala um objeto num slot reservado.
    pub fn install(&mut self, index: usize, handle: Arc<ObjectHandle>) -> HandleId {
        let entry = &mut self.entries[index];
        assert!(
            matches!(entry.slot, Slot::Reserved),
            "HandleTable::install em slot não reservado"
        );
        entry.generation = entry.generation.wrapping_add(1);
        entry.slot = Slot::Used(handle);
        self.used += 1;
        Handle::new(index as u16, entry.generation).as_id()
    }

    /// Obtém objeto por ID (validando generation)
    pub fn get(&self, id: HandleId) -> Option<&Arc<ObjectHandle>> {
        let handle = Handle::from_id(id)?;
        let entry = self.entries.get(handle.index() as usize)?;
        if entry.generation & Handle::GENERATION_MASK != handle.generation() {
            return None;
        }
        match &entry.slot {
            Slot::Used(object) => Some(object),
            _ => None,
        }
    }

    /// Remove o handle, devolvendo a referência ao objeto.
    pub fn remove(&mut self, id: HandleId) -> Option<Arc<ObjectHandle>> {
        self.get(id)?;
        let index = Handle::from_id(id)?.index() as usize;
        match core::mem::replace(&mut self.entries[index].slot, Slot::Free) {
            Slot::Used(object) => {
                self.used -= 1;
                Some(object)
            }
            other => {
                self.entries[index].slot = other;
                None
            }
        }
    }

    /// Esvazia a tabela (saída do processo).
    pub fn drain(&mut self) -> Vec<Arc<ObjectHandle>> {
        let mut out = Vec::with_capacity(self.used);
        for entry in self.entries.iter_mut() {
            if let Slot::Used(object) = core::mem::replace(&mut entry.slot, Slot::Free) {
                out.push(object);
            }
        }
        self.used = 0;
        out
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
