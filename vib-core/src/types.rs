//! Tipos compartilhados entre compilador e scheduler

use serde::{Deserialize, Serialize};
use std::fmt;

/// ID único de vibração (monotônico, atribuído pelo scheduler)
pub type VibrationId = u64;

/// Campo numérico violado em `OutOfRange`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    RelativeTime,
    Intensity,
    Frequency,
    Duration,
    CurvePointCount,
    CurveTime,
    CurveIntensity,
    CurveFrequency,
    EventCount,
    PatternCount,
    Channel,
    AbsoluteTime,
    LoopCount,
    Interval,
    Amplitude,
    Strength,
    EnvelopeTime,
    EnvelopeScale,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::RelativeTime => "RelativeTime",
            Field::Intensity => "Intensity",
            Field::Frequency => "Frequency",
            Field::Duration => "Duration",
            Field::CurvePointCount => "Curve.Count",
            Field::CurveTime => "Curve.Time",
            Field::CurveIntensity => "Curve.Intensity",
            Field::CurveFrequency => "Curve.Frequency",
            Field::EventCount => "EventCount",
            Field::PatternCount => "PatternCount",
            Field::Channel => "Index",
            Field::AbsoluteTime => "AbsoluteTime",
            Field::LoopCount => "LoopCount",
            Field::Interval => "Interval",
            Field::Amplitude => "Amplitude",
            Field::Strength => "Strength",
            Field::EnvelopeTime => "Envelope.Time",
            Field::EnvelopeScale => "Envelope.Scale",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classe de uso da vibração
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Usage {
    #[default]
    Unknown,
    Alarm,
    Ringtone,
    Notification,
    Communication,
    Touch,
    PhysicalEmulation,
    HardwareFeedback,
    Accessibility,
    Media,
}

/// Atributos de uma requisição
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VibrationAttributes {
    pub usage: Usage,
    pub flags: u32,
}

impl VibrationAttributes {
    /// Ignora a política de interrupção (DND)
    pub const FLAG_BYPASS_INTERRUPTION_POLICY: u32 = 0x1;

    pub fn new(usage: Usage) -> Self {
        Self { usage, flags: 0 }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_flag_set(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }
}

/// Ciclo de vida de uma vibração
///
/// `Pending → Running → {terminal}`. Estados terminais são finais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VibrationStatus {
    Pending,
    Running,
    Finished,
    CancelledByUser,
    CancelledSuperseded,
    CancelledByScreenOff,
    CancelledBySettingsUpdate,
    IgnoredForAlarm,
    IgnoredForRingtone,
    IgnoredForOngoing,
    IgnoredForExternal,
    IgnoredSuperseded,
    IgnoredAppOps,
    IgnoredErrorScheduling,
}

impl VibrationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VibrationStatus::Pending | VibrationStatus::Running)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            VibrationStatus::CancelledByUser
                | VibrationStatus::CancelledSuperseded
                | VibrationStatus::CancelledByScreenOff
                | VibrationStatus::CancelledBySettingsUpdate
        )
    }

    pub fn is_ignored(&self) -> bool {
        self.is_terminal() && !self.is_cancelled() && *self != VibrationStatus::Finished
    }
}

/// Identidade de uma transmissão multi-pacote: (pid, seq)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId {
    pub pid: i32,
    pub seq: i32,
}

impl SenderId {
    pub fn new(pid: i32, seq: i32) -> Self {
        Self { pid, seq }
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid, self.seq)
    }
}

/// Token de cliente usado para cancelar apenas as próprias vibrações
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientToken(pub u64);

/// Filtro de uso em `cancel_vibrate`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UsageFilter {
    #[default]
    All,
    Usages(Vec<Usage>),
}

impl UsageFilter {
    pub fn matches(&self, usage: Usage) -> bool {
        match self {
            UsageFilter::All => true,
            UsageFilter::Usages(usages) => usages.contains(&usage),
        }
    }
}

/// Estado de chamada telefônica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallState {
    Idle,
    Ringing,
    OffHook,
}

impl CallState {
    pub fn is_calling(&self) -> bool {
        !matches!(self, CallState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!VibrationStatus::Pending.is_terminal());
        assert!(!VibrationStatus::Running.is_terminal());
        assert!(VibrationStatus::Finished.is_terminal());
        assert!(VibrationStatus::IgnoredForAlarm.is_terminal());
        assert!(VibrationStatus::CancelledSuperseded.is_cancelled());
        assert!(VibrationStatus::IgnoredSuperseded.is_ignored());
        assert!(!VibrationStatus::Finished.is_ignored());
    }

    #[test]
    fn test_usage_filter() {
        assert!(UsageFilter::All.matches(Usage::Alarm));
        let filter = UsageFilter::Usages(vec![Usage::Touch, Usage::Notification]);
        assert!(filter.matches(Usage::Touch));
        assert!(!filter.matches(Usage::Alarm));
    }

    #[test]
    fn test_attribute_flags() {
        let attrs = VibrationAttributes::new(Usage::Alarm)
            .with_flags(VibrationAttributes::FLAG_BYPASS_INTERRUPTION_POLICY);
        assert!(attrs.is_flag_set(VibrationAttributes::FLAG_BYPASS_INTERRUPTION_POLICY));
        assert!(!VibrationAttributes::default().is_flag_set(1));
    }

    #[test]
    fn test_field_display() {
        assert_eq!(Field::Channel.to_string(), "Index");
        assert_eq!(Field::CurvePointCount.to_string(), "Curve.Count");
    }
}
