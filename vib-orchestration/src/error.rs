//! Erros de orquestração

use thiserror::Error;
use vib_core::HapticError;

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

/// Erros de orquestração
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    /// Erro da taxonomia háptica (validação, versão, timeout, HAL)
    #[error(transparent)]
    Haptic(#[from] HapticError),

    /// Configuração inválida
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Worker encerrado ou inacessível
    #[error("Vibration worker stopped: {0}")]
    WorkerStopped(String),

    /// Lock poison
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Sessão externa desconhecida
    #[error("Unknown external vibration: {0}")]
    UnknownExternal(u64),
}

impl<T> From<std::sync::PoisonError<T>> for OrchestrationError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        OrchestrationError::LockPoisoned(err.to_string())
    }
}

impl OrchestrationError {
    /// Erro háptico subjacente, se houver
    pub fn haptic(&self) -> Option<&HapticError> {
        match self {
            OrchestrationError::Haptic(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vib_core::Field;

    #[test]
    fn test_error_display() {
        let err = OrchestrationError::UnknownExternal(9);
        assert!(err.to_string().contains("Unknown external"));
    }

    #[test]
    fn test_haptic_error_conversion() {
        let err: OrchestrationError = HapticError::OutOfRange(Field::Amplitude).into();
        assert_eq!(err.haptic(), Some(&HapticError::OutOfRange(Field::Amplitude)));
        assert_eq!(err.to_string(), HapticError::OutOfRange(Field::Amplitude).to_string());
    }
}
