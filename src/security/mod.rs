//! # Security Context
//!
//! O IPC não decide política: apenas captura o contexto de segurança de
//! quem envia (no momento do envio) e de quem conecta (no momento da
//! conexão) para que o servidor decida.

pub mod context;

pub use context::{Gid, Privileges, SecurityContext, Uid};
