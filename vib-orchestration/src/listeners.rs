//! Observadores do estado "vibrando"

use std::sync::{Arc, Mutex};

use crate::error::OrchestrationResult;

/// Callback de estado
pub type StateListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Identificador de registro
pub type ListenerId = u64;

struct ListenerState {
    next_id: ListenerId,
    listeners: Vec<(ListenerId, StateListener)>,
    vibrating: bool,
}

/// Registro de listeners
///
/// Callbacks rodam sob o lock do registro: a ordem de entrega é a ordem
/// das transições, mesmo com register/unregister concorrentes. Um callback
/// não pode registrar nem remover listeners.
#[derive(Clone)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<ListenerState>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListenerState {
                next_id: 1,
                listeners: Vec::new(),
                vibrating: false,
            })),
        }
    }

    /// Registra e entrega o estado atual imediatamente
    pub fn register<F>(&self, listener: F) -> OrchestrationResult<ListenerId>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut state = self.inner.lock()?;
        let id = state.next_id;
        state.next_id += 1;
        let listener: StateListener = Arc::new(listener);
        listener(state.vibrating);
        state.listeners.push((id, listener));
        Ok(id)
    }

    pub fn unregister(&self, id: ListenerId) -> OrchestrationResult<bool> {
        let mut state = self.inner.lock()?;
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        Ok(state.listeners.len() != before)
    }

    /// Difunde uma transição; repetições do mesmo estado são ignoradas
    pub fn notify(&self, vibrating: bool) -> OrchestrationResult<()> {
        let mut state = self.inner.lock()?;
        if state.vibrating == vibrating {
            return Ok(());
        }
        state.vibrating = vibrating;
        for (_, listener) in &state.listeners {
            listener(vibrating);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|state| state.listeners.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_receives_current_state() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.register(move |v| sink.lock().unwrap().push(v)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![false]);
    }

    #[test]
    fn test_notify_in_order_and_dedup() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.register(move |v| sink.lock().unwrap().push(v)).unwrap();
        registry.notify(true).unwrap();
        registry.notify(true).unwrap();
        registry.notify(false).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
    }

    #[test]
    fn test_unregister() {
        let registry = ListenerRegistry::new();
        let id = registry.register(|_| {}).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(id).unwrap());
        assert!(!registry.unregister(id).unwrap());
        assert!(registry.is_empty());
    }
}
