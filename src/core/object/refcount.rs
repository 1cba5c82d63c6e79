// Arquivo: core/object/refcount.rs
//
// Propósito: Contagem de referências lógica para objetos cujo ciclo de vida
// não coincide com o do `Arc` que os guarda. Uma conexão, por exemplo,
// nasce com DUAS referências (cliente e servidor) e só é destruída quando
// ambos os lados fecharam.
//
// Detalhes de Implementação:
// - `AtomicUsize` com Release no decremento e fence Acquire no último.

//! Reference Counting

use core::sync::atomic::{fence, AtomicUsize, Ordering};

/// Contador de referências atômico
#[derive(Debug)]
pub struct RefCount {
    count: AtomicUsize,
}

impl RefCount {
    /// Cria um novo contador com valor inicial
    pub const fn new(initial: usize) -> Self {
        Self {
            count: AtomicUsize::new(initial),
        }
    }

    /// Decrementa o contador.
    /// Retorna `true` se a contagem chegou a ZERO (o objeto deve ser destruído).
    #[inline]
    #[must_use]
    pub fn dec(&self) -> bool {
        let prev = self.count.fetch_sub(1, Ordering::Release);
        assert!(prev != 0, "RefCount::dec abaixo de zero");

        if prev == 1 {
            fence(Ordering::Acquire);
            true
        } else {
            false
        }
    }

    /// Retorna o valor atual (relaxado, apenas para diagnóstico e testes).
    #[inline]
    pub fn get(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}
