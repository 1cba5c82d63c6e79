//! Condition Variable
//!
//! Espera bloqueante sobre um `Mutex` de spin. A thread entra na fila de
//! espera ANTES de soltar o lock, então um `signal` entre o unlock e o
//! `sleep` não se perde: a thread guarda a permissão de acordar e o
//! próximo `sleep` retorna na hora.

use crate::sched::{Deadline, Scheduler, SleepFlags, SleepStatus, Thread};
use crate::syscall::error::{SysError, SysResult};
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::{Mutex, MutexGuard};

/// Uma thread na fila de espera.
struct Waiter {
    thread: Arc<dyn Thread>,
    /// Setado (com o lock da fila) por quem acorda a thread.
    woken: AtomicBool,
}

/// Condition Variable
/// Permite que threads esperem por uma condição específica.
pub struct CondVar {
    waiters: Mutex<VecDeque<Arc<Waiter>>>,
}

impl CondVar {
    pub const fn new() -> Self {
        Self {
            waiters: Mutex::new(VecDeque::new()),
        }
    }

    /// Espera pela condição.
    ///
    /// Solta `guard`, dorme até `signal`/`broadcast`, deadline ou
    /// interrupção, e re-adquire `lock` antes de retornar. O guard SEMPRE
    /// volta, inclusive nos erros.
    ///
    /// - `Deadline::Now`: não dorme, retorna `WouldBlock` sem soltar o lock.
    /// - Deadline vencido: `TimedOut`.
    /// - Interrupção com `SleepFlags::INTERRUPTIBLE`: `Interrupted`.
    ///
    /// Acordar não garante a condição: o chamador re-verifica em loop.
    pub fn wait<'a, T>(
        &self,
        sched: &dyn Scheduler,
        guard: MutexGuard<'a, T>,
        lock: &'a Mutex<T>,
        deadline: Deadline,
        flags: SleepFlags,
    ) -> (MutexGuard<'a, T>, SysResult<()>) {
        let deadline = match deadline {
            Deadline::Now => return (guard, Err(SysError::WouldBlock)),
            Deadline::Never => None,
            Deadline::At(at) => Some(at),
        };

        let waiter = Arc::new(Waiter {
            thread: sched.current_thread(),
            woken: AtomicBool::new(false),
        });
        self.waiters.lock().push_back(Arc::clone(&waiter));

        drop(guard);

        let mut result = Ok(());
        while !waiter.woken.load(Ordering::Acquire) {
            match waiter.thread.sleep(deadline, flags) {
                SleepStatus::Woken => {}
                SleepStatus::TimedOut => {
                    result = Err(SysError::TimedOut);
                    break;
                }
                SleepStatus::Interrupted => {
                    result = Err(SysError::Interrupted);
                    break;
                }
            }
        }

        if result.is_err() {
            let mut waiters = self.waiters.lock();
            waiters.retain(|w| !Arc::ptr_eq(w, &waiter));

            // O sinal chegou junto com o timeout: não pode ser perdido.
            if waiter.woken.load(Ordering::Acquire) {
                result = Ok(());
            }
        }

        (lock.lock(), result)
    }

    /// Acorda a thread mais antiga na fila.
    pub fn signal(&self) {
        let waiter = {
            let mut waiters = self.waiters.lock();
            let waiter = waiters.pop_front();
            if let Some(w) = &waiter {
                w.woken.store(true, Ordering::Release);
            }
            waiter
        };

        if let Some(w) = waiter {
            w.thread.wake();
        }
    }

    /// Acorda todas as threads da fila.
    pub fn broadcast(&self) {
        let woken: VecDeque<Arc<Waiter>> = {
            let mut waiters = self.waiters.lock();
            for w in waiters.iter() {
                w.woken.store(true, Ordering::Release);
            }
            core::mem::take(&mut *waiters)
        };

        for w in woken {
            w.thread.wake();
        }
    }
}

impl Default for CondVar {
    fn default() -> Self {
        Self::new()
    }
}
