//! Taxonomia de erros compartilhada

use thiserror::Error;
use crate::types::Field;

pub type HapticResult<T> = Result<T, HapticError>;

/// Erros de padrão, codec e hardware
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HapticError {
    /// Campo ausente ou estrutura ilegível
    #[error("Malformed structure: {0}")]
    MalformedStructure(String),

    /// Valor numérico fora dos limites
    #[error("Out of range: {0}")]
    OutOfRange(Field),

    /// Invariante de tempo/sequência quebrado
    #[error("Ordering violation: {0}")]
    OrderingViolation(String),

    /// Versão HE não suportada
    #[error("Unsupported HE version: {0}")]
    UnsupportedVersion(i64),

    /// Timeout aguardando o slot atual liberar
    #[error("Scheduling timeout after {0}ms")]
    SchedulingTimeout(u64),

    /// HAL inacessível
    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),
}

impl HapticError {
    /// Falha de validação/codec (local, não afeta outras vibrações)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HapticError::MalformedStructure(_)
                | HapticError::OutOfRange(_)
                | HapticError::OrderingViolation(_)
                | HapticError::UnsupportedVersion(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HapticError::MalformedStructure("missing Event".into());
        assert!(err.to_string().contains("Malformed structure"));
        assert!(err.to_string().contains("missing Event"));
    }

    #[test]
    fn test_out_of_range_names_field() {
        let err = HapticError::OutOfRange(Field::CurveIntensity);
        assert_eq!(err.to_string(), "Out of range: Curve.Intensity");
    }

    #[test]
    fn test_timeout_error() {
        let err = HapticError::SchedulingTimeout(5000);
        assert!(err.to_string().contains("5000ms"));
    }

    #[test]
    fn test_validation_classification() {
        assert!(HapticError::OrderingViolation("x".into()).is_validation());
        assert!(HapticError::UnsupportedVersion(3).is_validation());
        assert!(!HapticError::HardwareUnavailable("hal".into()).is_validation());
        assert!(!HapticError::SchedulingTimeout(1).is_validation());
    }
}
