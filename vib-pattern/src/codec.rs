//! Codec binário HE 1.0 / HE 2.0
//!
//! ```text
//! HE 1.0: [0x3] + N × [type, rel, int, freq, dur, channel, points, 16 × (t, i, f)]
//! HE 2.0: [2, he, pid, seq, total | count << 16] + padrões
//!         padrão      = [index, rel, eventos, registros...]
//!         transiente  = [type, 5, channel, rel, int, freq, dur]
//!         contínuo    = [type, 6 + 3n, channel, rel, int, freq, dur, n, n × (t, i, f)]
//! ```
//!
//! Codificar nunca falha: o validador já garantiu os limites.

use serde::{Deserialize, Serialize};
use vib_core::{
    CompiledPattern, HapticError, HapticResult, LoopCount, SenderId, HE1_FORMAT_TAG,
    HE2_FORMAT_VERSION, HE2_HEADER_LEN,
};

use crate::model::{
    CONTINUOUS_EVENT, CurvePoint, Event, EventHeader, HeVersion, Pattern, TRANSIENT_EVENT,
};
use crate::validator::{MAX_EVENT_COUNT, MAX_POINT_COUNT};

/// Palavras por evento HE 1.0
pub const HE1_EVENT_LEN: usize = 7 + 3 * MAX_POINT_COUNT;
pub const HE2_TRANSIENT_LEN: usize = 7;
pub const HE2_CONTINUOUS_BASE_LEN: usize = 8;
const HE2_PATTERN_HEADER_LEN: usize = 3;

/// Parâmetros de reprodução anexados ao buffer compilado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackOptions {
    pub loop_count: LoopCount,
    pub interval_ms: i32,
    pub amplitude: i32,
    pub frequency: i32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            loop_count: LoopCount::Finite(1),
            interval_ms: 0,
            amplitude: 255,
            frequency: 0,
        }
    }
}

impl PlaybackOptions {
    /// Duração total considerando repetições e intervalos
    pub fn total_duration_ms(&self, single_play_ms: u64) -> Option<u64> {
        match self.loop_count {
            LoopCount::Infinite => None,
            LoopCount::Finite(n) => {
                let n = n.max(1) as u64;
                let gap = self.interval_ms.max(0) as u64;
                Some(single_play_ms.saturating_mul(n).saturating_add(gap.saturating_mul(n - 1)))
            }
        }
    }

    pub fn compile(&self, data: Vec<i32>, single_play_ms: u64) -> CompiledPattern {
        CompiledPattern {
            data,
            loop_count: self.loop_count,
            interval_ms: self.interval_ms,
            amplitude: self.amplitude,
            frequency: self.frequency,
            duration_hint_ms: self.total_duration_ms(single_play_ms),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HE 1.0
// ═══════════════════════════════════════════════════════════════════════════════

/// Codifica um padrão HE 1.0 (tag + registros de tamanho fixo)
pub fn encode_he1(pattern: &Pattern) -> Vec<i32> {
    let events = &pattern.events[..pattern.events.len().min(MAX_EVENT_COUNT)];
    let mut words = vec![0; 1 + events.len() * HE1_EVENT_LEN];
    words[0] = HE1_FORMAT_TAG;

    for (i, event) in events.iter().enumerate() {
        let record = &mut words[1 + i * HE1_EVENT_LEN..1 + (i + 1) * HE1_EVENT_LEN];
        let header = event.header();
        record[0] = event.type_code();
        record[1] = header.relative_time_ms;
        record[2] = header.intensity;
        record[3] = header.frequency;
        if let Event::Continuous { duration_ms, curve, .. } = event {
            let points = &curve[..curve.len().min(MAX_POINT_COUNT)];
            record[4] = *duration_ms;
            record[5] = header.channel as i32;
            record[6] = points.len() as i32;
            for (p, point) in points.iter().enumerate() {
                record[7 + p * 3] = point.time_ms;
                record[8 + p * 3] = point.intensity;
                record[9 + p * 3] = point.frequency;
            }
        }
    }
    words
}

/// Decodifica um buffer HE 1.0 de volta ao modelo
pub fn decode_he1(words: &[i32]) -> HapticResult<Pattern> {
    match words.first() {
        Some(&HE1_FORMAT_TAG) => {}
        Some(other) => {
            return Err(HapticError::MalformedStructure(format!("HE 1.0 tag {:#x}", other)));
        }
        None => return Err(HapticError::MalformedStructure("empty HE 1.0 buffer".into())),
    }
    let body = &words[1..];
    if body.len() % HE1_EVENT_LEN != 0 {
        return Err(HapticError::MalformedStructure(format!(
            "HE 1.0 body of {} words is not a multiple of {}",
            body.len(),
            HE1_EVENT_LEN
        )));
    }

    let mut events = Vec::with_capacity(body.len() / HE1_EVENT_LEN);
    for record in body.chunks_exact(HE1_EVENT_LEN) {
        let header = EventHeader {
            channel: channel_from(record[5])?,
            relative_time_ms: record[1],
            intensity: record[2],
            frequency: record[3],
        };
        let event = match record[0] {
            TRANSIENT_EVENT => Event::Transient(header),
            CONTINUOUS_EVENT => {
                let count = point_count_from(record[6])?;
                let curve = (0..count)
                    .map(|p| CurvePoint::new(record[7 + p * 3], record[8 + p * 3], record[9 + p * 3]))
                    .collect();
                Event::Continuous { header, duration_ms: record[4], curve }
            }
            other => return Err(HapticError::MalformedStructure(format!("event type {:#x}", other))),
        };
        events.push(event);
    }
    Ok(Pattern::new(0, events))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HE 2.0
// ═══════════════════════════════════════════════════════════════════════════════

/// Cabeçalho de pacote HE 2.0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketHeader {
    pub he_version: HeVersion,
    pub sender: SenderId,
    /// Padrões na requisição inteira
    pub total_patterns: u16,
    /// Padrões neste pacote
    pub packet_patterns: u16,
}

impl PacketHeader {
    pub fn encode(&self) -> [i32; HE2_HEADER_LEN] {
        let counts = (self.total_patterns as u32) | ((self.packet_patterns as u32) << 16);
        [
            HE2_FORMAT_VERSION,
            self.he_version.as_raw(),
            self.sender.pid,
            self.sender.seq,
            counts as i32,
        ]
    }

    pub fn decode(words: &[i32]) -> HapticResult<Self> {
        let [format, he, pid, seq, counts] = match words.get(..HE2_HEADER_LEN) {
            Some(&[a, b, c, d, e]) => [a, b, c, d, e],
            _ => return Err(HapticError::MalformedStructure("short HE 2.0 header".into())),
        };
        if format != HE2_FORMAT_VERSION {
            return Err(HapticError::MalformedStructure(format!("format version {}", format)));
        }
        let counts = counts as u32;
        Ok(Self {
            he_version: HeVersion::from_raw(he as i64)?,
            sender: SenderId::new(pid, seq),
            total_patterns: (counts & 0xFFFF) as u16,
            packet_patterns: (counts >> 16) as u16,
        })
    }
}

/// Pacote HE 2.0 decodificado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    pub header: PacketHeader,
    /// (índice global, padrão)
    pub patterns: Vec<(u32, Pattern)>,
}

fn event_len(event: &Event) -> usize {
    match event {
        Event::Transient(_) => HE2_TRANSIENT_LEN,
        Event::Continuous { curve, .. } => HE2_CONTINUOUS_BASE_LEN + 3 * curve.len(),
    }
}

fn pattern_len(pattern: &Pattern) -> usize {
    HE2_PATTERN_HEADER_LEN + pattern.events.iter().map(event_len).sum::<usize>()
}

/// Registro de um padrão com seu índice global
pub fn encode_he2_pattern(index: u32, pattern: &Pattern, out: &mut Vec<i32>) {
    out.push(index as i32);
    out.push(pattern.relative_time_ms);
    out.push(pattern.events.len() as i32);
    for event in &pattern.events {
        let header = event.header();
        let len = event_len(event);
        out.extend_from_slice(&[
            event.type_code(),
            (len - 2) as i32,
            header.channel as i32,
            header.relative_time_ms,
            header.intensity,
            header.frequency,
            event.duration_ms(),
        ]);
        if let Event::Continuous { curve, .. } = event {
            out.push(curve.len() as i32);
            for point in curve {
                out.extend_from_slice(&[point.time_ms, point.intensity, point.frequency]);
            }
        }
    }
}

/// Pacote completo: cabeçalho + padrões a partir de `first_index`
pub fn encode_he2_packet(header: &PacketHeader, first_index: u32, patterns: &[Pattern]) -> Vec<i32> {
    let body: usize = patterns.iter().map(pattern_len).sum();
    let mut words = Vec::with_capacity(HE2_HEADER_LEN + body);
    words.extend_from_slice(&header.encode());
    for (offset, pattern) in patterns.iter().enumerate() {
        encode_he2_pattern(first_index + offset as u32, pattern, &mut words);
    }
    words
}

/// Cursor sobre palavras; leitura além do fim → `MalformedStructure`
struct Reader<'a> {
    words: &'a [i32],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn next(&mut self) -> HapticResult<i32> {
        let word = self.words.get(self.pos).copied().ok_or_else(|| {
            HapticError::MalformedStructure(format!("packet truncated at word {}", self.pos))
        })?;
        self.pos += 1;
        Ok(word)
    }
}

pub fn decode_he2_packet(words: &[i32]) -> HapticResult<DecodedPacket> {
    let header = PacketHeader::decode(words)?;
    let mut reader = Reader { words, pos: HE2_HEADER_LEN };
    let mut patterns = Vec::with_capacity(header.packet_patterns as usize);

    for _ in 0..header.packet_patterns {
        let index = reader.next()?;
        let relative_time = reader.next()?;
        let event_count = reader.next()?;
        if !(0..=MAX_EVENT_COUNT as i32).contains(&event_count) {
            return Err(HapticError::MalformedStructure(format!("event count {}", event_count)));
        }

        let mut events = Vec::with_capacity(event_count as usize);
        for _ in 0..event_count {
            let kind = reader.next()?;
            let len = reader.next()?;
            let header = EventHeader {
                channel: channel_from(reader.next()?)?,
                relative_time_ms: reader.next()?,
                intensity: reader.next()?,
                frequency: reader.next()?,
            };
            let duration_ms = reader.next()?;
            let event = match kind {
                TRANSIENT_EVENT => Event::Transient(header),
                CONTINUOUS_EVENT => {
                    let count = point_count_from(reader.next()?)?;
                    let mut curve = Vec::with_capacity(count);
                    for _ in 0..count {
                        curve.push(CurvePoint::new(reader.next()?, reader.next()?, reader.next()?));
                    }
                    Event::Continuous { header, duration_ms, curve }
                }
                other => {
                    return Err(HapticError::MalformedStructure(format!("event type {:#x}", other)));
                }
            };
            if len as usize != event_len(&event) - 2 {
                return Err(HapticError::MalformedStructure(format!("event length {}", len)));
            }
            events.push(event);
        }
        let index = u32::try_from(index)
            .map_err(|_| HapticError::MalformedStructure(format!("pattern index {}", index)))?;
        patterns.push((index, Pattern::new(relative_time, events)));
    }

    if reader.pos != words.len() {
        return Err(HapticError::MalformedStructure(format!(
            "{} trailing words after packet",
            words.len() - reader.pos
        )));
    }
    Ok(DecodedPacket { header, patterns })
}

fn channel_from(word: i32) -> HapticResult<u8> {
    u8::try_from(word).map_err(|_| HapticError::MalformedStructure(format!("channel {}", word)))
}

fn point_count_from(word: i32) -> HapticResult<usize> {
    if (0..=MAX_POINT_COUNT as i32).contains(&word) {
        Ok(word as usize)
    } else {
        Err(HapticError::MalformedStructure(format!("point count {}", word)))
    }
}
