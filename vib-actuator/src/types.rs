//! Tipos do atuador simulado

use serde::{Deserialize, Serialize};
use vib_core::{ActuatorInfo, PatternParams, PrebakedEffect, VibrationId};

use crate::error::{ActuatorError, ActuatorResult};

/// Como o atuador simulado reporta o fim de um comando
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompletionMode {
    /// Conclusão enviada dentro da própria chamada
    Immediate,
    /// Conclusão enviada por uma thread após a duração do comando
    #[default]
    AfterDuration,
    /// Nada é enviado até `complete_in_flight()`
    Manual,
}

/// Comando recebido pelo atuador, na ordem de chegada
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActuatorCommand {
    On { duration_ms: u64, vibration_id: VibrationId },
    Off,
    SetAmplitude(u8),
    Prebaked { effect: PrebakedEffect, vibration_id: VibrationId },
    Envelope { params: [i32; 12], steep: bool, vibration_id: VibrationId },
    /// Pacote compilado; guarda só os metadados úteis para asserts
    Compiled { words: usize, first_index: Option<i32>, vibration_id: VibrationId },
    PatternParams(PatternParams),
    HapticParam(Vec<i32>),
    Stop,
    ExternalControl(bool),
    AlwaysOnEnable { channel: u8, always_on_id: i32, effect: PrebakedEffect },
    AlwaysOnDisable { channel: u8, always_on_id: i32 },
}

impl ActuatorCommand {
    /// Vibração dona do comando, se houver
    pub fn vibration_id(&self) -> Option<VibrationId> {
        match self {
            ActuatorCommand::On { vibration_id, .. }
            | ActuatorCommand::Prebaked { vibration_id, .. }
            | ActuatorCommand::Envelope { vibration_id, .. }
            | ActuatorCommand::Compiled { vibration_id, .. } => Some(*vibration_id),
            _ => None,
        }
    }

    /// Verifica se o comando liga o motor
    pub fn starts_vibration(&self) -> bool {
        self.vibration_id().is_some()
    }
}

/// Configuração do atuador simulado
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedConfig {
    pub name: String,
    pub info: ActuatorInfo,
    pub completion: CompletionMode,
    /// Duração reportada para efeitos pré-gravados (ms)
    pub prebaked_duration_ms: u64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            name: "sim-vibrator".into(),
            info: ActuatorInfo::new(0x01, 0x17, 0x00, ActuatorInfo::CAP_ALL),
            completion: CompletionMode::AfterDuration,
            prebaked_duration_ms: 30,
        }
    }
}

impl SimulatedConfig {
    pub fn with_completion(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_info(mut self, info: ActuatorInfo) -> Self {
        self.info = info;
        self
    }

    pub fn validate(&self) -> ActuatorResult<()> {
        if self.name.is_empty() {
            return Err(ActuatorError::InvalidConfig("name must not be empty".into()));
        }
        if self.info.major_version() == 0 {
            return Err(ActuatorError::InvalidConfig("major version must be set".into()));
        }
        Ok(())
    }
}
