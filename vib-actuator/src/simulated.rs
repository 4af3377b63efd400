//! Atuador de vibração simulado
//!
//! Registra cada comando recebido e reporta conclusões pelo
//! [`CompletionSink`] conforme o [`CompletionMode`] configurado.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};
use vib_core::{
    ActuatorControl, ActuatorInfo, CompiledPattern, CompletionSink, HapticResult, PatternParams,
    PrebakedEffect, VibrationId,
};

use crate::error::{ActuatorError, ActuatorResult};
use crate::types::{ActuatorCommand, CompletionMode, SimulatedConfig};

/// Estado interno do atuador
#[derive(Debug, Clone, Default)]
pub struct SimulatedState {
    pub commands: Vec<ActuatorCommand>,
    pub vibrating: bool,
    pub amplitude: u8,
    pub external_control: bool,
    pub always_on: BTreeMap<(u8, i32), PrebakedEffect>,
    pub pattern_params: Option<PatternParams>,
    pub haptic_params: Vec<i32>,
    /// Vibração cujo comando ainda não foi concluído
    pub in_flight: Option<VibrationId>,
    pub completions: u64,
    /// Falha injetada: todo comando retorna erro
    pub failing: bool,
    generation: u64,
    sink: Option<CompletionSink>,
}

impl SimulatedState {
    fn check_fault(&self) -> ActuatorResult<()> {
        if self.failing {
            return Err(ActuatorError::Fault("injected failure".into()));
        }
        Ok(())
    }

    fn finish(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        let Some(vibration_id) = self.in_flight.take() else {
            return false;
        };
        self.vibrating = false;
        self.completions += 1;
        if let Some(sink) = &self.sink {
            sink.complete(vibration_id);
        }
        trace!("vibration {} completed", vibration_id);
        true
    }
}

/// Atuador simulado
///
/// Clones compartilham o mesmo estado: o provider entrega um clone ao
/// scheduler e os testes inspecionam outro.
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    state: Arc<Mutex<SimulatedState>>,
    config: SimulatedConfig,
}

impl SimulatedActuator {
    /// Cria atuador com configuração padrão
    pub fn new() -> ActuatorResult<Self> {
        Self::with_config(SimulatedConfig::default())
    }

    /// Cria atuador com configuração customizada
    pub fn with_config(config: SimulatedConfig) -> ActuatorResult<Self> {
        config.validate()?;
        Ok(Self {
            state: Arc::new(Mutex::new(SimulatedState { amplitude: 255, ..Default::default() })),
            config,
        })
    }

    /// Cria atuador com o modo de conclusão indicado
    pub fn with_completion(completion: CompletionMode) -> ActuatorResult<Self> {
        Self::with_config(SimulatedConfig::default().with_completion(completion))
    }

    fn lock(&self) -> ActuatorResult<MutexGuard<'_, SimulatedState>> {
        Ok(self.state.lock()?)
    }

    fn snapshot(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SimulatedConfig {
        &self.config
    }

    /// Retorna cópia do estado interno
    pub fn state(&self) -> SimulatedState {
        self.snapshot().clone()
    }

    /// Registra o canal de conclusão
    pub fn attach(&self, sink: CompletionSink) {
        self.snapshot().sink = Some(sink);
    }

    /// Remove o canal de conclusão, devolvendo-o
    pub fn detach(&self) -> Option<CompletionSink> {
        let mut state = self.snapshot();
        state.in_flight = None;
        state.vibrating = false;
        state.generation += 1;
        state.sink.take()
    }

    pub fn is_attached(&self) -> bool {
        self.snapshot().sink.is_some()
    }

    pub fn commands(&self) -> Vec<ActuatorCommand> {
        self.snapshot().commands.clone()
    }

    pub fn command_count(&self) -> usize {
        self.snapshot().commands.len()
    }

    pub fn clear_commands(&self) {
        self.snapshot().commands.clear();
    }

    pub fn is_vibrating(&self) -> bool {
        self.snapshot().vibrating
    }

    pub fn amplitude(&self) -> u8 {
        self.snapshot().amplitude
    }

    pub fn is_external_control(&self) -> bool {
        self.snapshot().external_control
    }

    pub fn always_on(&self) -> BTreeMap<(u8, i32), PrebakedEffect> {
        self.snapshot().always_on.clone()
    }

    pub fn in_flight(&self) -> Option<VibrationId> {
        self.snapshot().in_flight
    }

    /// Injeta (ou remove) falha em todos os comandos
    pub fn set_failing(&self, failing: bool) {
        self.snapshot().failing = failing;
    }

    /// Conclui o comando em andamento (modo `Manual`)
    pub fn complete_in_flight(&self) -> bool {
        let mut state = self.snapshot();
        let generation = state.generation;
        state.finish(generation)
    }

    fn require(&self, capability: u32, operation: &'static str) -> ActuatorResult<()> {
        if self.config.info.has_capability(capability) {
            Ok(())
        } else {
            Err(ActuatorError::Unsupported(operation))
        }
    }

    fn start(
        &self,
        command: ActuatorCommand,
        vibration_id: VibrationId,
        duration_ms: Option<u64>,
    ) -> ActuatorResult<()> {
        let mut state = self.lock()?;
        state.check_fault()?;
        if state.sink.is_none() {
            return Err(ActuatorError::Offline);
        }
        debug!("{}: {:?}", self.config.name, command);
        state.commands.push(command);
        state.vibrating = true;
        state.in_flight = Some(vibration_id);
        state.generation += 1;
        let generation = state.generation;

        match self.config.completion {
            CompletionMode::Immediate => {
                state.finish(generation);
            }
            CompletionMode::AfterDuration => {
                if let Some(duration_ms) = duration_ms {
                    let shared = Arc::clone(&self.state);
                    thread::spawn(move || {
                        thread::sleep(Duration::from_millis(duration_ms));
                        shared.lock().unwrap_or_else(PoisonError::into_inner).finish(generation);
                    });
                }
            }
            CompletionMode::Manual => {}
        }
        Ok(())
    }

    fn record(&self, command: ActuatorCommand) -> ActuatorResult<MutexGuard<'_, SimulatedState>> {
        let mut state = self.lock()?;
        state.check_fault()?;
        trace!("{}: {:?}", self.config.name, command);
        state.commands.push(command);
        Ok(state)
    }
}

impl ActuatorControl for SimulatedActuator {
    fn info(&self) -> ActuatorInfo {
        self.config.info
    }

    fn on(&self, duration_ms: u64, vibration_id: VibrationId) -> HapticResult<u64> {
        self.start(ActuatorCommand::On { duration_ms, vibration_id }, vibration_id, Some(duration_ms))?;
        Ok(duration_ms)
    }

    fn off(&self) -> HapticResult<()> {
        let mut state = self.record(ActuatorCommand::Off)?;
        state.vibrating = false;
        state.in_flight = None;
        state.generation += 1;
        Ok(())
    }

    fn set_amplitude(&self, amplitude: u8) -> HapticResult<()> {
        self.require(ActuatorInfo::CAP_AMPLITUDE_CONTROL, "amplitude control")?;
        let mut state = self.record(ActuatorCommand::SetAmplitude(amplitude))?;
        state.amplitude = amplitude;
        Ok(())
    }

    fn perform_prebaked(&self, effect: &PrebakedEffect, vibration_id: VibrationId) -> HapticResult<u64> {
        let duration_ms = self.config.prebaked_duration_ms;
        self.start(
            ActuatorCommand::Prebaked { effect: *effect, vibration_id },
            vibration_id,
            Some(duration_ms),
        )?;
        Ok(duration_ms)
    }

    fn perform_envelope(&self, params: &[i32; 12], steep: bool, vibration_id: VibrationId) -> HapticResult<()> {
        self.require(ActuatorInfo::CAP_ENVELOPE, "envelope")?;
        let duration_ms = params[9].max(0) as u64;
        self.start(
            ActuatorCommand::Envelope { params: *params, steep, vibration_id },
            vibration_id,
            Some(duration_ms),
        )?;
        Ok(())
    }

    fn perform_compiled_pattern(&self, pattern: &CompiledPattern, vibration_id: VibrationId) -> HapticResult<()> {
        self.require(ActuatorInfo::CAP_COMPILED_PATTERNS, "compiled patterns")?;
        let command = ActuatorCommand::Compiled {
            words: pattern.data.len(),
            first_index: pattern.first_pattern_index(),
            vibration_id,
        };
        self.start(command, vibration_id, pattern.duration_hint_ms)?;
        Ok(())
    }

    fn update_pattern_params(&self, params: PatternParams) -> HapticResult<()> {
        self.require(ActuatorInfo::CAP_COMPILED_PATTERNS, "pattern parameters")?;
        let mut state = self.record(ActuatorCommand::PatternParams(params))?;
        state.pattern_params = Some(params);
        Ok(())
    }

    fn set_haptic_param(&self, param: &[i32]) -> HapticResult<()> {
        let mut state = self.record(ActuatorCommand::HapticParam(param.to_vec()))?;
        state.haptic_params = param.to_vec();
        Ok(())
    }

    fn stop(&self) -> HapticResult<()> {
        let mut state = self.record(ActuatorCommand::Stop)?;
        state.vibrating = false;
        // Em modo manual o ack do stop fica pendente até complete_in_flight()
        if self.config.completion != CompletionMode::Manual {
            let generation = state.generation;
            state.finish(generation);
        }
        Ok(())
    }

    fn set_external_control(&self, enabled: bool) -> HapticResult<()> {
        self.require(ActuatorInfo::CAP_EXTERNAL_CONTROL, "external control")?;
        let mut state = self.record(ActuatorCommand::ExternalControl(enabled))?;
        state.external_control = enabled;
        Ok(())
    }

    fn always_on_enable(&self, channel: u8, always_on_id: i32, effect: &PrebakedEffect) -> HapticResult<()> {
        self.require(ActuatorInfo::CAP_ALWAYS_ON_CONTROL, "always-on")?;
        let mut state =
            self.record(ActuatorCommand::AlwaysOnEnable { channel, always_on_id, effect: *effect })?;
        state.always_on.insert((channel, always_on_id), *effect);
        Ok(())
    }

    fn always_on_disable(&self, channel: u8, always_on_id: i32) -> HapticResult<()> {
        self.require(ActuatorInfo::CAP_ALWAYS_ON_CONTROL, "always-on")?;
        let mut state = self.record(ActuatorCommand::AlwaysOnDisable { channel, always_on_id })?;
        state.always_on.remove(&(channel, always_on_id));
        Ok(())
    }
}
