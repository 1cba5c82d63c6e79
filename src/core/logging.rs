// =============================================================================
// KERNEL LOGGING SYSTEM - ZERO OVERHEAD
// =============================================================================
//
// Sistema de logging do Forge IPC com custo ZERO em release.
//
// ARQUITETURA:
// - Usa features do Cargo para compile-time filtering
// - Com feature "no_logs", TODOS os macros viram expressões vazias
// - SEM alocação - Apenas strings literais + um valor opcional em hex
// - Destino: fachada `log`. O kernel hospedeiro registra o logger
//   (serial, console, buffer em memória...)
//
// NÍVEIS DE LOG (do mais crítico ao menos):
// - ERROR: Erros fatais ou críticos
// - WARN:  Situações suspeitas mas recuperáveis
// - INFO:  Fluxo normal de execução
// - DEBUG: Informações de debugging
// - TRACE: Detalhes extremos (cada send/receive)
//
// COMO USAR:
//   kinfo!("(IPC) Inicializando...");          // Apenas string
//   kinfo!("(IPC) koid=", 0x1000);             // String + hex
//   klog!("koid=", koid, " pid=", pid);        // Múltiplos valores
//
// =============================================================================

/// Target usado em todos os registros emitidos por este crate.
pub const TARGET: &str = "forge::ipc";

// =============================================================================
// PREFIXOS DE STATUS
// =============================================================================

pub const P_OK: &str = "[OK] ";

// =============================================================================
// MACROS DE LOG - NÍVEL ERROR
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kerror {
    // Apenas string literal
    ($msg:expr) => {{
        $crate::__log::error!(target: $crate::core::logging::TARGET, "{}", $msg);
    }};
    // String + valor hex
    ($msg:expr, $val:expr) => {{
        $crate::__log::error!(target: $crate::core::logging::TARGET, "{}{:#x}", $msg, $val as u64);
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kerror {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL WARN
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kwarn {
    ($msg:expr) => {{
        $crate::__log::warn!(target: $crate::core::logging::TARGET, "{}", $msg);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::__log::warn!(target: $crate::core::logging::TARGET, "{}{:#x}", $msg, $val as u64);
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kwarn {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL INFO
// =============================================================================
//
// kinfo! - Desligado com no_logs e log_error.
//

#[cfg(not(any(feature = "no_logs", feature = "log_error")))]
#[macro_export]
macro_rules! kinfo {
    ($msg:expr) => {{
        $crate::__log::info!(target: $crate::core::logging::TARGET, "{}", $msg);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::__log::info!(target: $crate::core::logging::TARGET, "{}{:#x}", $msg, $val as u64);
    }};
}

#[cfg(any(feature = "no_logs", feature = "log_error"))]
#[macro_export]
macro_rules! kinfo {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL DEBUG
// =============================================================================
//
// kdebug! - Apenas com log_trace ou log_debug.
//

#[cfg(all(
    not(feature = "no_logs"),
    any(feature = "log_trace", feature = "log_debug")
))]
#[macro_export]
macro_rules! kdebug {
    ($msg:expr) => {{
        $crate::__log::debug!(target: $crate::core::logging::TARGET, "{}", $msg);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::__log::debug!(target: $crate::core::logging::TARGET, "{}{:#x}", $msg, $val as u64);
    }};
}

#[cfg(not(all(
    not(feature = "no_logs"),
    any(feature = "log_trace", feature = "log_debug")
)))]
#[macro_export]
macro_rules! kdebug {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL TRACE
// =============================================================================
//
// ktrace! - Apenas com log_trace. Cada mensagem enfileirada passa por aqui.
//

#[cfg(all(not(feature = "no_logs"), feature = "log_trace"))]
#[macro_export]
macro_rules! ktrace {
    ($msg:expr) => {{
        $crate::__log::trace!(target: $crate::core::logging::TARGET, "{}", $msg);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::__log::trace!(target: $crate::core::logging::TARGET, "{}{:#x}", $msg, $val as u64);
    }};
}

#[cfg(not(all(not(feature = "no_logs"), feature = "log_trace")))]
#[macro_export]
macro_rules! ktrace {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - MÚLTIPLOS VALORES
// =============================================================================
//
// klog! - Nível DEBUG, aceita pares string/valor.
//

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! klog {
    ($msg:expr) => {{
        $crate::__log::debug!(target: $crate::core::logging::TARGET, "{}", $msg);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::__log::debug!(target: $crate::core::logging::TARGET, "{}{:#x}", $msg, $val as u64);
    }};
    ($msg1:expr, $val1:expr, $msg2:expr, $val2:expr) => {{
        $crate::__log::debug!(
            target: $crate::core::logging::TARGET,
            "{}{:#x}{}{:#x}",
            $msg1,
            $val1 as u64,
            $msg2,
            $val2 as u64
        );
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! klog {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// STATUS [OK]
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kok {
    ($msg:expr) => {{
        $crate::__log::info!(target: $crate::core::logging::TARGET, "{}{}", $crate::core::logging::P_OK, $msg);
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kok {
    ($($t:tt)*) => {{}};
}
