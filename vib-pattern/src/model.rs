//! Modelo em memória de um padrão HE validado

use serde::{Deserialize, Serialize};
use vib_core::{HapticError, HapticResult};

/// Código de evento contínuo no fio
pub const CONTINUOUS_EVENT: i32 = 0x1000;
/// Código de evento transiente no fio
pub const TRANSIENT_EVENT: i32 = CONTINUOUS_EVENT + 1;

/// Versão do documento HE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeVersion {
    V1,
    V2,
}

impl HeVersion {
    pub fn from_raw(version: i64) -> HapticResult<Self> {
        match version {
            1 => Ok(HeVersion::V1),
            2 => Ok(HeVersion::V2),
            other => Err(HapticError::UnsupportedVersion(other)),
        }
    }

    pub fn as_raw(&self) -> i32 {
        match self {
            HeVersion::V1 => 1,
            HeVersion::V2 => 2,
        }
    }
}

/// Ponto de curva de um evento contínuo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Offset dentro da duração do evento (ms)
    pub time_ms: i32,
    /// Intensidade ×100 (0..=100)
    pub intensity: i32,
    /// -100..=100
    pub frequency: i32,
}

impl CurvePoint {
    pub fn new(time_ms: i32, intensity: i32, frequency: i32) -> Self {
        Self { time_ms, intensity, frequency }
    }
}

/// Campos comuns aos dois tipos de evento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Canal do vibrador (HE 2.0; sempre 0 em HE 1.0)
    pub channel: u8,
    pub relative_time_ms: i32,
    pub intensity: i32,
    pub frequency: i32,
}

/// Evento de um padrão
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Transient(EventHeader),
    Continuous {
        header: EventHeader,
        duration_ms: i32,
        curve: Vec<CurvePoint>,
    },
}

impl Event {
    pub fn header(&self) -> &EventHeader {
        match self {
            Event::Transient(header) => header,
            Event::Continuous { header, .. } => header,
        }
    }

    pub fn type_code(&self) -> i32 {
        match self {
            Event::Transient(_) => TRANSIENT_EVENT,
            Event::Continuous { .. } => CONTINUOUS_EVENT,
        }
    }

    pub fn duration_ms(&self) -> i32 {
        match self {
            Event::Transient(_) => 0,
            Event::Continuous { duration_ms, .. } => *duration_ms,
        }
    }

    /// Fim do evento relativo ao início do padrão
    pub fn end_time_ms(&self) -> i64 {
        self.header().relative_time_ms as i64 + self.duration_ms() as i64
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, Event::Continuous { .. })
    }
}

/// Sequência ordenada de eventos
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Offset a partir do início do conjunto (AbsoluteTime em HE 2.0)
    pub relative_time_ms: i32,
    pub events: Vec<Event>,
}

impl Pattern {
    pub fn new(relative_time_ms: i32, events: Vec<Event>) -> Self {
        Self { relative_time_ms, events }
    }

    /// Maior fim de evento, relativo ao início do padrão
    pub fn end_time_ms(&self) -> i64 {
        self.events.iter().map(Event::end_time_ms).max().unwrap_or(0)
    }

    /// Duração de reprodução: último evento + duração, ou + cauda se transiente
    pub fn playback_duration_ms(&self, transient_tail_ms: u64) -> u64 {
        match self.events.last() {
            Some(last @ Event::Continuous { .. }) => last.end_time_ms().max(0) as u64,
            Some(last) => last.header().relative_time_ms.max(0) as u64 + transient_tail_ms,
            None => 0,
        }
    }
}

/// Conjunto de padrões de uma requisição HE 2.0
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    pub patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new(patterns: Vec<Pattern>) -> Self {
        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn playback_duration_ms(&self, transient_tail_ms: u64) -> u64 {
        match self.patterns.last() {
            Some(last) => last.relative_time_ms.max(0) as u64 + last.playback_duration_ms(transient_tail_ms),
            None => 0,
        }
    }
}

/// Documento validado, pronto para codificar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HapticDocument {
    V1(Pattern),
    V2(PatternSet),
}

impl HapticDocument {
    pub fn version(&self) -> HeVersion {
        match self {
            HapticDocument::V1(_) => HeVersion::V1,
            HapticDocument::V2(_) => HeVersion::V2,
        }
    }

    pub fn playback_duration_ms(&self, transient_tail_ms: u64) -> u64 {
        match self {
            HapticDocument::V1(pattern) => pattern.playback_duration_ms(transient_tail_ms),
            HapticDocument::V2(set) => set.playback_duration_ms(transient_tail_ms),
        }
    }
}
