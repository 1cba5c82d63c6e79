//! Fakes do scheduler para testes no host.
//!
//! Cada thread do SO que chama o IPC precisa de um `FakeThread` corrente
//! (`enter`). O relógio é monotônico a partir da primeira leitura.

#![cfg(test)]

use crate::ipc::Port;
use crate::sched::{Nstime, Process, Scheduler, SleepFlags, SleepStatus, Thread, ThreadId};
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::{Duration, Instant};

static EPOCH: OnceLock<Instant> = OnceLock::new();
static NEXT_TID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<Arc<FakeThread>>> = const { RefCell::new(None) };
}

pub fn now() -> Nstime {
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as Nstime
}

/// Scheduler cujo "thread atual" é o `FakeThread` da thread do SO.
pub struct FakeScheduler;

impl Scheduler for FakeScheduler {
    fn system_time(&self) -> Nstime {
        now()
    }

    fn current_thread(&self) -> Arc<dyn Thread> {
        let thread = CURRENT.with(|c| c.borrow().clone());
        thread.expect("thread do SO sem FakeThread: chame enter() antes")
    }
}

#[derive(Default)]
struct SleepState {
    permit: bool,
    interrupted: bool,
}

pub struct FakeThread {
    id: ThreadId,
    process: Arc<Process>,
    state: Mutex<SleepState>,
    cond: Condvar,
    exception_port: Mutex<Option<Arc<Port>>>,
}

impl FakeThread {
    pub fn new(process: &Arc<Process>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_TID.fetch_add(1, Ordering::Relaxed),
            process: Arc::clone(process),
            state: Mutex::new(SleepState::default()),
            cond: Condvar::new(),
            exception_port: Mutex::new(None),
        })
    }

    /// Sinal externo: aborta o próximo sleep interrompível.
    pub fn interrupt(&self) {
        self.state.lock().unwrap().interrupted = true;
        self.cond.notify_all();
    }

    pub fn set_exception_port(&self, port: Option<Arc<Port>>) {
        *self.exception_port.lock().unwrap() = port;
    }
}

impl Thread for FakeThread {
    fn id(&self) -> ThreadId {
        self.id
    }

    fn process(&self) -> Arc<Process> {
        Arc::clone(&self.process)
    }

    fn sleep(&self, deadline: Option<Nstime>, flags: SleepFlags) -> SleepStatus {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.permit {
                state.permit = false;
                return SleepStatus::Woken;
            }

            if state.interrupted && flags.contains(SleepFlags::INTERRUPTIBLE) {
                state.interrupted = false;
                return SleepStatus::Interrupted;
            }

            match deadline {
                None => state = self.cond.wait(state).unwrap(),
                Some(at) => {
                    let current = now();
                    if current >= at {
                        return SleepStatus::TimedOut;
                    }
                    let left = Duration::from_nanos((at - current) as u64);
                    state = self.cond.wait_timeout(state, left).unwrap().0;
                }
            }
        }
    }

    fn wake(&self) {
        self.state.lock().unwrap().permit = true;
        self.cond.notify_all();
    }

    fn exception_port(&self) -> Option<Arc<Port>> {
        self.exception_port.lock().unwrap().clone()
    }
}

/// Torna `process` o processo da thread do SO atual.
pub fn enter(process: &Arc<Process>) -> Arc<FakeThread> {
    let thread = FakeThread::new(process);
    CURRENT.with(|c| *c.borrow_mut() = Some(Arc::clone(&thread)));
    thread
}

/// Sai do contexto (solta a referência ao processo).
pub fn leave() {
    CURRENT.with(|c| c.borrow_mut().take());
}

/// Roda `f` numa nova thread do SO dentro de `process`.
pub fn spawn<T, F>(process: &Arc<Process>, f: F) -> std::thread::JoinHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let process = Arc::clone(process);
    std::thread::spawn(move || {
        enter(&process);
        let result = f();
        leave();
        result
    })
}

/// Dá tempo para threads auxiliares chegarem ao ponto de bloqueio.
pub fn settle() {
    std::thread::sleep(Duration::from_millis(50));
}
