//! Contexto de segurança de uma thread.

use bitflags::bitflags;

/// ID de usuário
pub type Uid = u32;

/// ID de grupo
pub type Gid = u32;

bitflags! {
    /// Privilégios efetivos.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Privileges: u64 {
        /// Pode administrar serviços do sistema.
        const SERVICE_ADMIN = 1 << 0;
        /// Pode criar/alterar portas especiais de outros processos.
        const PORT_ADMIN    = 1 << 1;
        /// Pode depurar outros processos.
        const DEBUG         = 1 << 2;
        /// Pode alterar identidade (uid/gid).
        const SET_IDENTITY  = 1 << 3;
    }
}

/// Snapshot copiado para mensagens e informações de cliente.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SecurityContext {
    pub uid: Uid,
    pub gid: Gid,
    pub privileges: Privileges,
}

impl SecurityContext {
    /// Contexto do kernel: root com todos os privilégios.
    pub const fn kernel() -> Self {
        Self {
            uid: 0,
            gid: 0,
            privileges: Privileges::all(),
        }
    }

    pub const fn user(uid: Uid, gid: Gid) -> Self {
        Self {
            uid,
            gid,
            privileges: Privileges::empty(),
        }
    }
}
