//! Configuração do scheduler de vibração

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OrchestrationError, OrchestrationResult};

/// Configuração do scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Espera máxima do handoff para controle externo (ms)
    #[serde(default = "default_cancel_wait_ms")]
    pub cancel_wait_ms: u64,
    /// Quanto o worker espera o ack de stop de um padrão compilado (ms)
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
    /// Vibrações encerradas guardadas por uso
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Sessões externas guardadas
    #[serde(default = "default_history_limit")]
    pub external_history_limit: usize,
    /// Duração assumida de um prebaked quando o HAL reporta 0 (ms)
    #[serde(default = "default_prebaked_fallback_ms")]
    pub prebaked_fallback_ms: u64,
    /// Cauda após o último transiente de um padrão HE (ms)
    #[serde(default = "default_transient_tail_ms")]
    pub transient_tail_ms: u64,
    /// Nome da thread do worker
    #[serde(default = "default_worker_name")]
    pub worker_name: String,
}

fn default_cancel_wait_ms() -> u64 {
    5000
}

fn default_cancel_grace_ms() -> u64 {
    1000
}

fn default_history_limit() -> usize {
    50
}

fn default_prebaked_fallback_ms() -> u64 {
    30
}

fn default_transient_tail_ms() -> u64 {
    80
}

fn default_worker_name() -> String {
    "vibration-worker".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cancel_wait_ms: default_cancel_wait_ms(),
            cancel_grace_ms: default_cancel_grace_ms(),
            history_limit: default_history_limit(),
            external_history_limit: default_history_limit(),
            prebaked_fallback_ms: default_prebaked_fallback_ms(),
            transient_tail_ms: default_transient_tail_ms(),
            worker_name: default_worker_name(),
        }
    }
}

impl SchedulerConfig {
    /// Lê configuração de uma string TOML
    pub fn from_toml_str(text: &str) -> OrchestrationResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| OrchestrationError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Lê configuração de um arquivo TOML
    pub fn load(path: impl AsRef<Path>) -> OrchestrationResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            OrchestrationError::InvalidConfiguration(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> OrchestrationResult<String> {
        toml::to_string(self).map_err(|e| OrchestrationError::InvalidConfiguration(e.to_string()))
    }

    pub fn validate(&self) -> OrchestrationResult<()> {
        let zero = [
            ("cancel_wait_ms", self.cancel_wait_ms == 0),
            ("cancel_grace_ms", self.cancel_grace_ms == 0),
            ("history_limit", self.history_limit == 0),
            ("external_history_limit", self.external_history_limit == 0),
            ("prebaked_fallback_ms", self.prebaked_fallback_ms == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(OrchestrationError::InvalidConfiguration(format!("{} must be positive", name)));
        }
        if self.worker_name.is_empty() {
            return Err(OrchestrationError::InvalidConfiguration("worker_name must not be empty".into()));
        }
        Ok(())
    }

    /// Atalho para testes e demos: esperas curtas
    pub fn with_waits(mut self, cancel_wait_ms: u64, cancel_grace_ms: u64) -> Self {
        self.cancel_wait_ms = cancel_wait_ms;
        self.cancel_grace_ms = cancel_grace_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.cancel_wait_ms, 5000);
        assert_eq!(config.cancel_grace_ms, 1000);
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.worker_name, "vibration-worker");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SchedulerConfig::from_toml_str("cancel_wait_ms = 250\n").unwrap();
        assert_eq!(config.cancel_wait_ms, 250);
        assert_eq!(config.transient_tail_ms, 80);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = SchedulerConfig::from_toml_str("history_limit = 0").unwrap_err();
        assert!(matches!(err, OrchestrationError::InvalidConfiguration(msg) if msg.contains("history_limit")));
    }

    #[test]
    fn test_garbage_toml_rejected() {
        assert!(SchedulerConfig::from_toml_str("cancel_wait_ms = \"soon\"").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SchedulerConfig::default().with_waits(100, 20);
        let text = config.to_toml_string().unwrap();
        assert_eq!(SchedulerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(SchedulerConfig::load("/nonexistent/vib.toml").is_err());
    }
}
