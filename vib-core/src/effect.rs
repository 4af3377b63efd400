//! Efeitos que o scheduler sabe despachar

use serde::{Deserialize, Serialize};
use crate::error::{HapticError, HapticResult};
use crate::types::{Field, SenderId};

/// Tag do buffer HE 1.0 (suporta 16 pontos de curva)
pub const HE1_FORMAT_TAG: i32 = 0x3;
/// Versão de formato dos pacotes HE 2.0
pub const HE2_FORMAT_VERSION: i32 = 2;
/// Palavras no cabeçalho de pacote HE 2.0
pub const HE2_HEADER_LEN: usize = 5;
/// Offset dos IDs de prebaked estendido
pub const EXT_EFFECT_ID_START: i32 = 0x1000;

/// Número de repetições de um padrão compilado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopCount {
    Finite(u32),
    Infinite,
}

impl LoopCount {
    /// `-1` = infinito, `0` = uma vez, `N > 0` = N vezes
    pub fn from_raw(raw: i32) -> HapticResult<Self> {
        match raw {
            -1 => Ok(LoopCount::Infinite),
            0 => Ok(LoopCount::Finite(1)),
            n if n > 0 => Ok(LoopCount::Finite(n as u32)),
            _ => Err(HapticError::OutOfRange(Field::LoopCount)),
        }
    }

    /// Valor enviado ao HAL
    pub fn as_raw(&self) -> i32 {
        match self {
            LoopCount::Finite(n) => (*n).min(i32::MAX as u32) as i32,
            LoopCount::Infinite => i32::MAX,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, LoopCount::Infinite)
    }
}

impl Default for LoopCount {
    fn default() -> Self {
        LoopCount::Finite(1)
    }
}

/// Parâmetros de controle de um padrão em execução (intervalo, amplitude, frequência)
///
/// `-1` mantém o valor atual; `(0, 0, 0)` é a forma de parada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternParams {
    pub interval_ms: i32,
    pub amplitude: i32,
    pub frequency: i32,
}

impl PatternParams {
    pub const UNCHANGED: i32 = -1;
    pub const WORDS: usize = 3;

    pub fn new(interval_ms: i32, amplitude: i32, frequency: i32) -> HapticResult<Self> {
        if interval_ms < 0 && interval_ms != Self::UNCHANGED {
            return Err(HapticError::OutOfRange(Field::Interval));
        }
        if frequency < 0 && frequency != Self::UNCHANGED {
            return Err(HapticError::OutOfRange(Field::Frequency));
        }
        if (amplitude < 0 && amplitude != Self::UNCHANGED) || amplitude > 255 {
            return Err(HapticError::OutOfRange(Field::Amplitude));
        }
        Ok(Self { interval_ms, amplitude, frequency })
    }

    pub fn stop() -> Self {
        Self { interval_ms: 0, amplitude: 0, frequency: 0 }
    }

    pub fn is_stop(&self) -> bool {
        *self == Self::stop()
    }

    pub fn encode(&self) -> [i32; 3] {
        [self.interval_ms, self.amplitude, self.frequency]
    }

    /// Decodifica os parâmetros de controle; campos faltando → `MalformedStructure`
    pub fn decode(words: &[i32]) -> HapticResult<Self> {
        match words {
            [interval, amplitude, frequency, ..] => Self::new(*interval, *amplitude, *frequency),
            _ => Err(HapticError::MalformedStructure(format!(
                "pattern parameters need {} words, got {}",
                Self::WORDS,
                words.len()
            ))),
        }
    }
}

/// Buffer HE compilado + parâmetros de reprodução
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPattern {
    pub data: Vec<i32>,
    pub loop_count: LoopCount,
    pub interval_ms: i32,
    pub amplitude: i32,
    pub frequency: i32,
    /// Duração estimada de uma reprodução completa (None se infinita)
    pub duration_hint_ms: Option<u64>,
}

impl CompiledPattern {
    pub fn new(data: Vec<i32>) -> Self {
        Self {
            data,
            loop_count: LoopCount::default(),
            interval_ms: 0,
            amplitude: 255,
            frequency: 0,
            duration_hint_ms: None,
        }
    }

    pub fn is_he2(&self) -> bool {
        self.data.first() == Some(&HE2_FORMAT_VERSION)
    }

    /// SenderId gravado no cabeçalho HE 2.0
    pub fn sender_id(&self) -> Option<SenderId> {
        if !self.is_he2() || self.data.len() < 4 {
            return None;
        }
        Some(SenderId::new(self.data[2], self.data[3]))
    }

    /// Índice global do primeiro padrão do pacote
    pub fn first_pattern_index(&self) -> Option<i32> {
        if self.is_he2() {
            self.data.get(HE2_HEADER_LEN).copied()
        } else {
            None
        }
    }

    /// Pacote HE 2.0 que não abre a transmissão
    pub fn is_continuation(&self) -> bool {
        matches!(self.first_pattern_index(), Some(index) if index != 0)
    }
}

/// Intensidade de efeitos pré-gravados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectStrength {
    Light,
    Medium,
    Strong,
}

impl EffectStrength {
    pub fn scale(&self) -> u8 {
        match self {
            EffectStrength::Light => 69,
            EffectStrength::Medium => 89,
            EffectStrength::Strong => 99,
        }
    }
}

/// Efeito residente no hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrebakedEffect {
    pub effect_id: i32,
    /// Escala 1..=100
    pub strength: u8,
}

impl PrebakedEffect {
    pub fn new(effect_id: i32, strength: EffectStrength) -> Self {
        Self { effect_id, strength: strength.scale() }
    }

    /// Prebaked estendido do fornecedor: ID deslocado por `0x1000`
    pub fn extended(effect_id: i32, strength: i32) -> HapticResult<Self> {
        if !(1..=100).contains(&strength) {
            return Err(HapticError::OutOfRange(Field::Strength));
        }
        Ok(Self {
            effect_id: EXT_EFFECT_ID_START + effect_id,
            strength: strength as u8,
        })
    }

    pub fn is_extended(&self) -> bool {
        self.effect_id >= EXT_EFFECT_ID_START
    }
}

/// Ponto de envelope: tempo, escala (×100), frequência
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    pub time_ms: i32,
    pub scale: i32,
    pub frequency: i32,
}

/// Envelope de 4 pontos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeEffect {
    pub points: [EnvelopePoint; 4],
    pub steep: bool,
    /// `-1` = amplitude padrão, senão 1..=255
    pub amplitude: i32,
}

impl EnvelopeEffect {
    pub fn new(points: [EnvelopePoint; 4], steep: bool, amplitude: i32) -> HapticResult<Self> {
        if amplitude != -1 && !(1..=255).contains(&amplitude) {
            return Err(HapticError::OutOfRange(Field::Amplitude));
        }
        let mut previous = 0;
        for point in &points {
            if point.time_ms < 0 {
                return Err(HapticError::OutOfRange(Field::EnvelopeTime));
            }
            if point.time_ms < previous {
                return Err(HapticError::OrderingViolation(format!(
                    "envelope time {} after {}",
                    point.time_ms, previous
                )));
            }
            if point.scale < 0 {
                return Err(HapticError::OutOfRange(Field::EnvelopeScale));
            }
            previous = point.time_ms;
        }
        Ok(Self { points, steep, amplitude })
    }

    /// Parâmetros achatados `[t0, s0, f0, t1, s1, f1, ...]`
    pub fn params(&self) -> [i32; 12] {
        let mut params = [0; 12];
        for (i, point) in self.points.iter().enumerate() {
            params[i * 3] = point.time_ms;
            params[i * 3 + 1] = point.scale;
            params[i * 3 + 2] = point.frequency;
        }
        params
    }

    pub fn duration_ms(&self) -> u64 {
        self.points[3].time_ms.max(0) as u64
    }
}

/// Efeito alvo de uma vibração
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    OneShot { duration_ms: u64, amplitude: u8 },
    Waveform {
        timings_ms: Vec<u64>,
        amplitudes: Vec<u8>,
        /// Índice de onde a forma de onda recomeça
        repeat: Option<usize>,
    },
    Prebaked(PrebakedEffect),
    Envelope(EnvelopeEffect),
    Compiled(CompiledPattern),
}

impl Effect {
    pub fn is_repeating(&self) -> bool {
        match self {
            Effect::Waveform { repeat, .. } => repeat.is_some(),
            Effect::Compiled(pattern) => pattern.loop_count.is_infinite(),
            _ => false,
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, Effect::Compiled(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Effect::OneShot { .. } => "one-shot",
            Effect::Waveform { .. } => "waveform",
            Effect::Prebaked(_) => "prebaked",
            Effect::Envelope(_) => "envelope",
            Effect::Compiled(_) => "compiled",
        }
    }

    pub fn validate(&self) -> HapticResult<()> {
        match self {
            Effect::Waveform { timings_ms, amplitudes, repeat } => {
                if timings_ms.is_empty() || timings_ms.len() != amplitudes.len() {
                    return Err(HapticError::MalformedStructure(format!(
                        "waveform with {} timings and {} amplitudes",
                        timings_ms.len(),
                        amplitudes.len()
                    )));
                }
                if matches!(repeat, Some(index) if *index >= timings_ms.len()) {
                    return Err(HapticError::MalformedStructure("waveform repeat index past end".into()));
                }
                Ok(())
            }
            Effect::Compiled(pattern) if pattern.data.is_empty() => {
                Err(HapticError::MalformedStructure("empty compiled pattern".into()))
            }
            _ => Ok(()),
        }
    }
}
