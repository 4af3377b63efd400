//! Provider do atuador simulado

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{info, warn};
use vib_core::{ActuatorControl, ActuatorProvider, CompletionSink, HapticResult};

use crate::error::ActuatorError;
use crate::simulated::SimulatedActuator;

/// Entrega clones de um [`SimulatedActuator`] a cada conexão
///
/// `set_available(false)` faz `connect` falhar; `kill()` simula a morte
/// do HAL enviando `ActuatorEvent::Died` pelo canal registrado.
#[derive(Debug)]
pub struct SimulatedProvider {
    actuator: SimulatedActuator,
    available: AtomicBool,
    connections: AtomicU64,
}

impl SimulatedProvider {
    pub fn new(actuator: SimulatedActuator) -> Self {
        Self {
            actuator,
            available: AtomicBool::new(true),
            connections: AtomicU64::new(0),
        }
    }

    /// Atuador compartilhado com as conexões
    pub fn actuator(&self) -> &SimulatedActuator {
        &self.actuator
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Número de conexões bem-sucedidas
    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }

    /// Derruba a conexão atual e notifica o scheduler
    pub fn kill(&self) {
        match self.actuator.detach() {
            Some(sink) => {
                warn!("{}: HAL died", self.actuator.config().name);
                sink.died();
            }
            None => warn!("{}: kill without connection", self.actuator.config().name),
        }
    }
}

impl ActuatorProvider for SimulatedProvider {
    fn connect(&self, sink: CompletionSink) -> HapticResult<Arc<dyn ActuatorControl>> {
        if !self.is_available() {
            return Err(ActuatorError::Offline.into());
        }
        self.actuator.attach(sink);
        let count = self.connections.fetch_add(1, Ordering::SeqCst) + 1;
        info!("{}: connected (#{})", self.actuator.config().name, count);
        Ok(Arc::new(self.actuator.clone()))
    }
}
