//! # Prelude — Re-exportações Convenientes
//!
//! ```
//! use vib_core::prelude::*;
//! ```

pub use crate::effect::{
    CompiledPattern,
    Effect,
    EffectStrength,
    EnvelopeEffect,
    EnvelopePoint,
    LoopCount,
    PatternParams,
    PrebakedEffect,
};
pub use crate::error::{HapticError, HapticResult};
pub use crate::traits::{
    ActuatorControl,
    ActuatorEvent,
    ActuatorInfo,
    ActuatorProvider,
    CompletionSink,
};
pub use crate::types::{
    CallState,
    ClientToken,
    Field,
    SenderId,
    Usage,
    UsageFilter,
    VibrationAttributes,
    VibrationId,
    VibrationStatus,
};
