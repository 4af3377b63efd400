//! # 🦾 vib-actuator — Atuador de Vibração
//!
//! Implementações da interface de controle do HAL definida em `vib-core`.
//! O scheduler acessa o hardware por um [`ActuatorHandle`] resolvido sob
//! demanda; testes e demos usam o [`SimulatedActuator`].
//!
//! ## Arquitetura
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            vibration worker              │
//! │   ┌──────────────────────────────────┐   │
//! │   │  ActuatorHandle (lazy, reset())  │   │
//! │   └──────────────────────────────────┘   │
//! │                  ↓ connect(sink)         │
//! │   ┌──────────────────────────────────┐   │
//! │   │  ActuatorProvider                │   │
//! │   │   └─ SimulatedProvider           │   │
//! │   └──────────────────────────────────┘   │
//! └──────────────────────────────────────────┘
//!          ↓ comandos        ↑ Complete / Died
//!   ┌──────────────────────────────────────┐
//!   │ SimulatedActuator (Arc<Mutex<_>>)    │
//!   └──────────────────────────────────────┘
//! ```
//!
//! ## Exemplo
//!
//! ```rust
//! use vib_actuator::{CompletionMode, SimulatedActuator};
//! use vib_core::{ActuatorControl, ActuatorEvent, CompletionSink};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let actuator = SimulatedActuator::with_completion(CompletionMode::Immediate)?;
//! let (sink, events) = CompletionSink::channel();
//! actuator.attach(sink);
//!
//! actuator.on(40, 1)?;
//! assert_eq!(events.try_recv()?, ActuatorEvent::Complete(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Características
//!
//! - **Thread-safe**: estado em `Arc<Mutex<_>>`, clones compartilham o motor
//! - **Determinístico**: modo `Manual` deixa o teste decidir quando concluir
//! - **Injeção de falhas**: `set_failing()` e `SimulatedProvider::kill()`

pub mod error;
pub mod handle;
pub mod provider;
pub mod simulated;
pub mod types;

pub use error::{ActuatorError, ActuatorResult};
pub use handle::ActuatorHandle;
pub use provider::SimulatedProvider;
pub use simulated::{SimulatedActuator, SimulatedState};
pub use types::{ActuatorCommand, CompletionMode, SimulatedConfig};

#[cfg(test)]
mod tests;
