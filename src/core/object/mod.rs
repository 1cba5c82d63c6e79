//! # Object - Sistema de Objetos do Kernel
//!
//! Todo recurso exposto ao userspace é um objeto referenciado por handle.
//! Aqui vivem as peças genéricas que o IPC consome: contagem de
//! referências, o handle compartilhado, eventos de espera e caches.

pub mod cache;
pub mod event;
pub mod handle;
pub mod kobject;
pub mod refcount;

pub use cache::{CacheSlot, ObjectCache};
pub use event::{EventFlags, EventSink, ObjectEvent};
pub use handle::ObjectHandle;
pub use kobject::{generate_koid, KObject, Koid, ObjectFlags, ObjectType};
pub use refcount::RefCount;
