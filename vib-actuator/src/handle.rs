//! Handle do HAL resolvido sob demanda

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};
use vib_core::{ActuatorControl, ActuatorProvider, CompletionSink, HapticResult};

/// Cache da conexão com o HAL
///
/// A conexão só é feita no primeiro `get()`; `reset()` descarta o cache
/// após morte do HAL ou falha de despacho.
pub struct ActuatorHandle {
    provider: Arc<dyn ActuatorProvider>,
    sink: CompletionSink,
    cached: Option<Arc<dyn ActuatorControl>>,
}

impl ActuatorHandle {
    pub fn new(provider: Arc<dyn ActuatorProvider>, sink: CompletionSink) -> Self {
        Self { provider, sink, cached: None }
    }

    /// Retorna a conexão, conectando se necessário
    pub fn get(&mut self) -> HapticResult<Arc<dyn ActuatorControl>> {
        if let Some(control) = &self.cached {
            return Ok(Arc::clone(control));
        }
        match self.provider.connect(self.sink.clone()) {
            Ok(control) => {
                debug!("actuator resolved: {:?}", control.info());
                self.cached = Some(Arc::clone(&control));
                Ok(control)
            }
            Err(err) => {
                warn!("actuator unavailable: {}", err);
                Err(err)
            }
        }
    }

    /// Conexão atual sem tentar conectar
    pub fn peek(&self) -> Option<Arc<dyn ActuatorControl>> {
        self.cached.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.cached.is_some()
    }

    pub fn reset(&mut self) {
        if self.cached.take().is_some() {
            debug!("actuator handle reset");
        }
    }
}

impl fmt::Debug for ActuatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActuatorHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SimulatedActuator, SimulatedProvider};

    #[test]
    fn test_lazy_connect_and_cache() {
        let provider = Arc::new(SimulatedProvider::new(SimulatedActuator::new().unwrap()));
        let (sink, _receiver) = CompletionSink::channel();
        let mut handle = ActuatorHandle::new(provider.clone(), sink);
        assert!(!handle.is_connected());
        handle.get().unwrap();
        handle.get().unwrap();
        assert_eq!(provider.connection_count(), 1);
        handle.reset();
        assert!(handle.peek().is_none());
        handle.get().unwrap();
        assert_eq!(provider.connection_count(), 2);
    }

    #[test]
    fn test_failed_connect_not_cached() {
        let provider = Arc::new(SimulatedProvider::new(SimulatedActuator::new().unwrap()));
        provider.set_available(false);
        let (sink, _receiver) = CompletionSink::channel();
        let mut handle = ActuatorHandle::new(provider.clone(), sink);
        assert!(handle.get().is_err());
        provider.set_available(true);
        assert!(handle.get().is_ok());
    }
}
