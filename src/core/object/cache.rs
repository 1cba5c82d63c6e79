//! # Object Cache
//!
//! Contabilidade de pools de objetos de tamanho fixo (portas, conexões,
//! mensagens). A memória em si vem do heap global via `Arc`; o cache só
//! conta objetos vivos e permite impor um limite, o que torna falhas de
//! alocação (`OutOfMemory`) reproduzíveis.

use crate::syscall::error::{SysError, SysResult};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Pool nomeado de objetos.
#[derive(Debug)]
pub struct ObjectCache {
    name: &'static str,
    live: AtomicUsize,
    total: AtomicUsize,
    limit: AtomicUsize,
}

impl ObjectCache {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            live: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            limit: AtomicUsize::new(usize::MAX),
        })
    }

    /// Reserva um objeto do pool. O slot devolve o objeto ao ser solto.
    pub fn alloc(self: &Arc<Self>) -> SysResult<CacheSlot> {
        let limit = self.limit.load(Ordering::Relaxed);
        let reserved = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |live| {
                (live < limit).then_some(live + 1)
            });

        if reserved.is_err() {
            crate::kwarn!("(Cache) alloc: pool esgotado, live=", limit);
            crate::kwarn!(self.name);
            return Err(SysError::OutOfMemory);
        }

        self.total.fetch_add(1, Ordering::Relaxed);
        Ok(CacheSlot {
            cache: Arc::clone(self),
        })
    }

    /// Objetos atualmente vivos.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Total de alocações desde a criação.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Limita o número de objetos vivos (`None` = sem limite).
    pub fn set_limit(&self, limit: Option<usize>) {
        self.limit
            .store(limit.unwrap_or(usize::MAX), Ordering::Relaxed);
    }

    fn free(&self) {
        let prev = self.live.fetch_sub(1, Ordering::AcqRel);
        assert!(prev > 0, "ObjectCache::free sem alocação correspondente");
    }
}

/// Posse de um objeto do pool. Devolvido ao cache no `Drop`.
#[derive(Debug)]
pub struct CacheSlot {
    cache: Arc<ObjectCache>,
}

impl Drop for CacheSlot {
    fn drop(&mut self) {
        self.cache.free();
    }
}
