//! Traits da interface de controle do atuador
//!
//! O scheduler é o único componente que emite comandos para o atuador.
//! Conclusões assíncronas voltam como mensagens pelo [`CompletionSink`].

use std::sync::Arc;
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use crate::effect::{CompiledPattern, PatternParams, PrebakedEffect};
use crate::error::HapticResult;
use crate::types::VibrationId;

/// Versão e capacidades reportadas pelo HAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorInfo {
    /// `client << 16 | major << 8 | minor`
    pub version: u32,
    pub capabilities: u32,
}

impl ActuatorInfo {
    pub const CAP_AMPLITUDE_CONTROL: u32 = 1 << 0;
    pub const CAP_EXTERNAL_CONTROL: u32 = 1 << 1;
    pub const CAP_ALWAYS_ON_CONTROL: u32 = 1 << 2;
    pub const CAP_COMPILED_PATTERNS: u32 = 1 << 3;
    pub const CAP_ENVELOPE: u32 = 1 << 4;
    pub const CAP_ALL: u32 = 0x1F;

    pub fn new(client: u8, major: u8, minor: u8, capabilities: u32) -> Self {
        Self {
            version: (client as u32) << 16 | (major as u32) << 8 | minor as u32,
            capabilities,
        }
    }

    pub fn client_code(&self) -> u8 {
        ((self.version >> 16) & 0xFF) as u8
    }

    pub fn major_version(&self) -> u8 {
        ((self.version >> 8) & 0xFF) as u8
    }

    pub fn minor_version(&self) -> u8 {
        (self.version & 0xFF) as u8
    }

    pub fn has_capability(&self, capability: u32) -> bool {
        self.capabilities & capability == capability
    }

    /// Major < 0x16: nenhuma; 0x16: só HE 1.0; ≥ 0x17: HE 1.0 e 2.0
    pub fn supports_he(&self, he_version: i64) -> bool {
        match self.major_version() {
            major if major < 0x16 => false,
            0x16 => he_version == 1,
            _ => he_version == 1 || he_version == 2,
        }
    }
}

/// Mensagens do atuador para o worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorEvent {
    /// Fim de um comando emitido para a vibração indicada
    Complete(VibrationId),
    /// Conexão com o HAL morreu
    Died,
}

/// Lado emissor do canal de conclusão
#[derive(Debug, Clone)]
pub struct CompletionSink {
    sender: Sender<ActuatorEvent>,
}

impl CompletionSink {
    pub fn new(sender: Sender<ActuatorEvent>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, Receiver<ActuatorEvent>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender), receiver)
    }

    /// Envia conclusão; ignorado se o worker já encerrou
    pub fn complete(&self, vibration_id: VibrationId) {
        let _ = self.sender.send(ActuatorEvent::Complete(vibration_id));
    }

    pub fn died(&self) {
        let _ = self.sender.send(ActuatorEvent::Died);
    }
}

/// Interface de controle do atuador (HAL)
///
/// Falhas retornam `HapticError::HardwareUnavailable`.
pub trait ActuatorControl: Send + Sync {
    fn info(&self) -> ActuatorInfo;

    /// Liga pelo tempo indicado; retorna a duração efetiva
    fn on(&self, duration_ms: u64, vibration_id: VibrationId) -> HapticResult<u64>;

    fn off(&self) -> HapticResult<()>;

    fn set_amplitude(&self, amplitude: u8) -> HapticResult<()>;

    /// Retorna a duração do efeito em ms (0 se desconhecida)
    fn perform_prebaked(&self, effect: &PrebakedEffect, vibration_id: VibrationId) -> HapticResult<u64>;

    fn perform_envelope(&self, params: &[i32; 12], steep: bool, vibration_id: VibrationId) -> HapticResult<()>;

    fn perform_compiled_pattern(&self, pattern: &CompiledPattern, vibration_id: VibrationId) -> HapticResult<()>;

    fn update_pattern_params(&self, params: PatternParams) -> HapticResult<()>;

    fn set_haptic_param(&self, param: &[i32]) -> HapticResult<()>;

    fn stop(&self) -> HapticResult<()>;

    fn set_external_control(&self, enabled: bool) -> HapticResult<()>;

    fn always_on_enable(&self, channel: u8, always_on_id: i32, effect: &PrebakedEffect) -> HapticResult<()>;

    fn always_on_disable(&self, channel: u8, always_on_id: i32) -> HapticResult<()>;
}

/// Resolve conexões com o HAL
pub trait ActuatorProvider: Send + Sync {
    /// Conecta e registra o canal de conclusão/morte
    fn connect(&self, sink: CompletionSink) -> HapticResult<Arc<dyn ActuatorControl>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_decode() {
        let info = ActuatorInfo::new(0xFF, 0x20, 0x10, ActuatorInfo::CAP_ALL);
        assert_eq!(info.client_code(), 0xFF);
        assert_eq!(info.major_version(), 0x20);
        assert_eq!(info.minor_version(), 0x10);
        assert!(info.has_capability(ActuatorInfo::CAP_ALWAYS_ON_CONTROL));
    }

    #[test]
    fn test_he_support_by_major() {
        assert!(!ActuatorInfo::new(0, 0x15, 0, 0).supports_he(1));
        let v16 = ActuatorInfo::new(0, 0x16, 0, 0);
        assert!(v16.supports_he(1));
        assert!(!v16.supports_he(2));
        let v17 = ActuatorInfo::new(0, 0x17, 0, 0);
        assert!(v17.supports_he(2));
        assert!(!v17.supports_he(3));
    }

    #[test]
    fn test_completion_sink_delivers_in_order() {
        let (sink, receiver) = CompletionSink::channel();
        sink.complete(4);
        sink.died();
        assert_eq!(receiver.recv().unwrap(), ActuatorEvent::Complete(4));
        assert_eq!(receiver.recv().unwrap(), ActuatorEvent::Died);
    }

    #[test]
    fn test_completion_sink_survives_closed_receiver() {
        let (sink, receiver) = CompletionSink::channel();
        drop(receiver);
        sink.complete(1);
    }
}
