//! Notifier
//!
//! Lista de `ObjectEvent`s interessados numa transição de um objeto
//! (mensagem chegou, outro lado desligou, conexão pendente na porta).

use crate::core::object::ObjectEvent;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

pub struct Notifier {
    events: Mutex<Vec<Arc<ObjectEvent>>>,
}

impl Notifier {
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Registra um evento. Fica registrado até `unregister`.
    pub fn register(&self, event: &Arc<ObjectEvent>) {
        self.events.lock().push(Arc::clone(event));
    }

    /// Remove um evento (comparado por identidade).
    pub fn unregister(&self, event: &Arc<ObjectEvent>) {
        self.events.lock().retain(|e| !Arc::ptr_eq(e, event));
    }

    /// Dispara todos os eventos registrados.
    ///
    /// Os sinais rodam fora do lock da lista, então um `EventSink` pode
    /// chamar `unregister` no mesmo notifier.
    pub fn run(&self, data: u64) {
        let events: Vec<Arc<ObjectEvent>> = self.events.lock().clone();
        for event in events {
            event.signal(data);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::object::{EventFlags, EventSink};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl EventSink for Counter {
        fn signal(&self, _event: u32, _data: u64) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_run_and_unregister() {
        let notifier = Notifier::new();
        let counter = Arc::new(Counter::default());
        let event = ObjectEvent::new(0, EventFlags::empty(), counter.clone());

        notifier.register(&event);
        notifier.run(0);
        notifier.run(0);
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        notifier.unregister(&event);
        assert!(notifier.is_empty());
        notifier.run(0);
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }
}
