//! Códigos de Erro do Forge IPC
//!
//! Conjunto fechado de status retornados pelas operações de IPC.
//! Na fronteira de syscall viram valores negativos em RAX.

/// Enum de erros do sistema.
///
/// Valores são i32 para permitir representação negativa em isize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SysError {
    // === Erros Gerais (1-15) ===
    /// Chamador não tem permissão (ex: listen de quem não é dono)
    AccessDenied = 1,
    /// Objeto não encontrado (porta especial ausente, nada pendente)
    NotFound = 2,
    /// Argumento inválido
    InvalidArgument = 4,
    /// Operação bloquearia (timeout == 0)
    WouldBlock = 5,
    /// Espera interrompida
    Interrupted = 6,
    /// Timeout expirado
    TimedOut = 7,
    /// Operação não suportada pelo objeto
    NotSupported = 9,

    // === Erros de Handle (16-31) ===
    /// Handle inválido, fechado ou de tipo incompatível
    InvalidHandle = 16,
    /// Evento desconhecido para o tipo do objeto
    InvalidEvent = 17,
    /// Tabela de handles cheia
    NoHandles = 19,

    // === Erros de Memória (32-47) ===
    /// Sem memória disponível
    OutOfMemory = 32,

    // === Erros de IPC (64-79) ===
    /// O outro lado fechou a conexão (ou a porta morreu)
    ConnHungup = 64,
    /// Dados anexados excedem o tamanho máximo
    TooLarge = 66,
}

impl SysError {
    /// Converte para isize negativo (formato de retorno da syscall)
    #[inline]
    pub fn as_isize(self) -> isize {
        -(self as i32 as isize)
    }

    /// Cria erro a partir de código negativo
    pub fn from_code(code: isize) -> Option<Self> {
        if code >= 0 {
            return None;
        }
        match -code {
            1 => Some(Self::AccessDenied),
            2 => Some(Self::NotFound),
            4 => Some(Self::InvalidArgument),
            5 => Some(Self::WouldBlock),
            6 => Some(Self::Interrupted),
            7 => Some(Self::TimedOut),
            9 => Some(Self::NotSupported),
            16 => Some(Self::InvalidHandle),
            17 => Some(Self::InvalidEvent),
            19 => Some(Self::NoHandles),
            32 => Some(Self::OutOfMemory),
            64 => Some(Self::ConnHungup),
            66 => Some(Self::TooLarge),
            _ => None,
        }
    }

    /// Resultados de controle de fluxo: esperados e sempre repetíveis.
    pub fn is_flow_control(self) -> bool {
        matches!(self, Self::WouldBlock | Self::TimedOut | Self::Interrupted)
    }
}

/// Resultado de syscall: Ok(valor) ou Err(SysError)
pub type SysResult<T> = Result<T, SysError>;

/// Helper para converter SysResult<usize> em isize para retorno
pub fn result_to_isize(result: SysResult<usize>) -> isize {
    match result {
        Ok(val) => val as isize,
        Err(e) => e.as_isize(),
    }
}
