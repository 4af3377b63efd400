//! # 🎭 vib-orchestration — Arbitragem de Vibração
//!
//! Scheduler que decide qual vibração ocupa o atuador. Um único worker
//! recebe pedidos, cancelamentos, eventos do HAL e timers; só ele emite
//! comandos ao hardware.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  VibrationScheduler (clonável)      HapticPlayer            │
//! │   vibrate | cancel | external | always-on | params          │
//! └─────────────────────────────────────────────────────────────┘
//!               ↓ Command + reply bounded(1)
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    vibration-worker                          │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────────────────┐ │
//! │  │  current   │  │   next     │  │  external session      │ │
//! │  └────────────┘  └────────────┘  └────────────────────────┘ │
//! │  select! { commands | ActuatorEvent | deadline }            │
//! │  history | always-on registry | listeners                   │
//! └─────────────────────────────────────────────────────────────┘
//!               ↓ ActuatorHandle
//!         ActuatorControl (HAL)
//! ```
//!
//! ## Exemplo
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vib_actuator::{CompletionMode, SimulatedActuator, SimulatedProvider};
//! use vib_core::{ClientToken, Effect, Usage};
//! use vib_orchestration::{VibrationRequest, VibrationScheduler};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let actuator = SimulatedActuator::with_completion(CompletionMode::Immediate)?;
//! let provider = Arc::new(SimulatedProvider::new(actuator));
//! let scheduler = VibrationScheduler::with_provider(provider)?;
//!
//! let request = VibrationRequest::new(10_001, "com.example", ClientToken(1), Effect::OneShot {
//!     duration_ms: 20,
//!     amplitude: 128,
//! })
//! .with_usage(Usage::Touch);
//! let report = scheduler.vibrate(request)?;
//! assert!(scheduler.wait_idle(Duration::from_secs(2))?);
//! assert_eq!(scheduler.dump()?.history[0].id, report.id);
//! # Ok(())
//! # }
//! ```

pub mod always_on;
pub mod config;
pub mod error;
pub mod listeners;
pub mod player;
pub mod policy;
pub mod records;
pub mod scheduler;
pub mod vibration;

mod playback;
mod worker;

pub use always_on::{AlwaysOnInfo, AlwaysOnRequest};
pub use config::SchedulerConfig;
pub use error::{OrchestrationError, OrchestrationResult};
pub use listeners::{ListenerId, StateListener};
pub use player::HapticPlayer;
pub use policy::{DefaultPolicy, SYSTEM_UID, SettingsPolicy, VibrationPolicy};
pub use records::{VibrationDump, VibrationRecords};
pub use scheduler::VibrationScheduler;
pub use vibration::{
    ExternalInfo, ExternalScale, ExternalVibration, PacketDisposition, VibrationInfo,
    VibrationReport, VibrationRequest,
};

#[cfg(test)]
mod tests;
