//! Erros da camada de atuador

use thiserror::Error;
use vib_core::HapticError;

pub type ActuatorResult<T> = Result<T, ActuatorError>;

/// Erros de atuador
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    /// HAL não conectado ou indisponível
    #[error("Actuator offline")]
    Offline,

    /// Falha injetada ou reportada pelo hardware
    #[error("Actuator fault: {0}")]
    Fault(String),

    /// Capacidade não reportada pelo HAL
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Configuração inválida
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Mutex envenenado
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for ActuatorError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        ActuatorError::LockPoisoned(err.to_string())
    }
}

impl From<ActuatorError> for HapticError {
    fn from(err: ActuatorError) -> Self {
        HapticError::HardwareUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ActuatorError::Offline.to_string(), "Actuator offline");
        assert_eq!(
            ActuatorError::Unsupported("always-on").to_string(),
            "Unsupported operation: always-on"
        );
    }

    #[test]
    fn test_into_haptic_error() {
        let err: HapticError = ActuatorError::Fault("coil open".into()).into();
        assert_eq!(err, HapticError::HardwareUnavailable("Actuator fault: coil open".into()));
    }
}
