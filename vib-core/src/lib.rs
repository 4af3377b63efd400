//! # 📳 vib-core — Vocabulário Compartilhado
//!
//! Tipos, erros e traits usados pelo compilador de padrões HE e pelo
//! scheduler de arbitragem de vibração.
//!
//! ## Módulos
//!
//! - [`error`]: taxonomia `HapticError`
//! - [`types`]: usos, atributos, status e SenderId
//! - [`effect`]: efeitos despacháveis e o buffer compilado
//! - [`traits`]: interface de controle do atuador (HAL)
//!
//! ## Exemplo
//!
//! ```
//! use vib_core::prelude::*;
//!
//! let params = PatternParams::decode(&[100, -1, -1]).unwrap();
//! assert_eq!(params.interval_ms, 100);
//! assert!(VibrationStatus::IgnoredForAlarm.is_terminal());
//! ```

pub mod effect;
pub mod error;
pub mod prelude;
pub mod traits;
pub mod types;

pub use effect::{
    CompiledPattern, Effect, EffectStrength, EnvelopeEffect, EnvelopePoint, LoopCount,
    PatternParams, PrebakedEffect, EXT_EFFECT_ID_START, HE1_FORMAT_TAG, HE2_FORMAT_VERSION,
    HE2_HEADER_LEN,
};
pub use error::{HapticError, HapticResult};
pub use traits::{ActuatorControl, ActuatorEvent, ActuatorInfo, ActuatorProvider, CompletionSink};
pub use types::{
    CallState, ClientToken, Field, SenderId, Usage, UsageFilter, VibrationAttributes,
    VibrationId, VibrationStatus,
};
