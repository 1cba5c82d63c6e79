//! # Object Events
//!
//! Protocolo de espera genérico: quem quer ser avisado de um evento de um
//! objeto cria um `ObjectEvent` e o entrega ao `wait` do objeto. O objeto
//! sinaliza na hora (se a condição já vale) ou registra o evento num
//! `Notifier` e sinaliza depois. O despachante que consome os sinais (poll,
//! callbacks assíncronos) fica fora deste crate, atrás de `EventSink`.

use alloc::sync::Arc;
use bitflags::bitflags;

bitflags! {
    /// Comportamento da espera.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EventFlags: u32 {
        /// Edge-triggered: só sinaliza em transições futuras, nunca pelo
        /// estado atual.
        const EDGE = 1 << 0;
    }
}

/// Destino dos sinais de um evento.
pub trait EventSink: Send + Sync {
    /// Chamado a cada disparo. Pode rodar com locks do objeto adquiridos, então
    /// não deve voltar a chamar operações do mesmo objeto.
    fn signal(&self, event: u32, data: u64);
}

/// Um pedido de espera por um evento de um objeto.
pub struct ObjectEvent {
    event: u32,
    flags: EventFlags,
    sink: Arc<dyn EventSink>,
}

impl ObjectEvent {
    pub fn new(event: u32, flags: EventFlags, sink: Arc<dyn EventSink>) -> Arc<Self> {
        Arc::new(Self { event, flags, sink })
    }

    /// ID do evento (dependente do tipo do objeto).
    #[inline]
    pub fn event(&self) -> u32 {
        self.event
    }

    #[inline]
    pub fn flags(&self) -> EventFlags {
        self.flags
    }

    #[inline]
    pub fn is_edge(&self) -> bool {
        self.flags.contains(EventFlags::EDGE)
    }

    /// Dispara o evento.
    pub fn signal(&self, data: u64) {
        self.sink.signal(self.event, data);
    }
}
