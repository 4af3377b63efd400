//! Validação de documentos HE
//!
//! HE 1.0 é leniente: tempos ausentes recebem padrão e excedentes além de
//! 16 eventos/pontos são truncados. HE 2.0 é estrito: qualquer campo
//! ausente, fora de ordem ou além do limite rejeita o documento inteiro.
//! Em ambos, a primeira falha encerra a validação sem modelo parcial.

use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::{Number, Value};
use tracing::{debug, warn};
use vib_core::{Field, HapticError, HapticResult};

use crate::model::{CurvePoint, Event, EventHeader, HapticDocument, HeVersion, Pattern, PatternSet};

pub const MAX_EVENT_COUNT: usize = 16;
pub const MAX_POINT_COUNT: usize = 16;
pub const MAX_RELATIVE_TIME_MS: i64 = 50_000;
pub const MAX_EVENT_DURATION_MS: i64 = 5_000;
pub const MAX_INTENSITY: i64 = 100;
pub const MAX_FREQUENCY: i64 = 100;
pub const MIN_CURVE_FREQUENCY: i64 = -100;
/// Espaçamento aplicado a eventos HE 1.0 sem `RelativeTime`
pub const HE1_DEFAULT_RELATIVE_TIME_MS: i64 = 400;
const HE2_MAX_PATTERNS: usize = u16::MAX as usize;

const TYPE_CONTINUOUS: &str = "continuous";
const TYPE_TRANSIENT: &str = "transient";

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENTO BRUTO
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "Metadata")]
    metadata: RawMetadata,
    #[serde(rename = "Pattern", default)]
    pattern: Option<Vec<RawEventEntry>>,
    #[serde(rename = "PatternList", default)]
    pattern_list: Option<Vec<RawPatternEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(rename = "Version", deserialize_with = "json_int")]
    version: i64,
}

#[derive(Debug, Deserialize)]
struct RawPatternEntry {
    #[serde(rename = "AbsoluteTime", deserialize_with = "json_int")]
    absolute_time: i64,
    #[serde(rename = "Pattern")]
    events: Vec<RawEventEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEventEntry {
    #[serde(rename = "Event")]
    event: RawEvent,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "RelativeTime", default, deserialize_with = "json_opt_int")]
    relative_time: Option<i64>,
    #[serde(rename = "Duration", default, deserialize_with = "json_opt_int")]
    duration: Option<i64>,
    #[serde(rename = "Index", default, deserialize_with = "json_opt_int")]
    index: Option<i64>,
    #[serde(rename = "Parameters")]
    parameters: RawParameters,
}

#[derive(Debug, Deserialize)]
struct RawParameters {
    #[serde(rename = "Intensity", deserialize_with = "json_int")]
    intensity: i64,
    #[serde(rename = "Frequency", deserialize_with = "json_int")]
    frequency: i64,
    #[serde(rename = "Curve", default)]
    curve: Option<Vec<RawCurvePoint>>,
}

#[derive(Debug, Deserialize)]
struct RawCurvePoint {
    #[serde(rename = "Time", deserialize_with = "json_int")]
    time: i64,
    #[serde(rename = "Intensity")]
    intensity: f64,
    #[serde(rename = "Frequency", deserialize_with = "json_int")]
    frequency: i64,
}

/// Número JSON lido como inteiro; frações são truncadas
fn number_to_int(number: &Number) -> Option<i64> {
    number
        .as_i64()
        .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

fn json_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = Number::deserialize(deserializer)?;
    number_to_int(&number).ok_or_else(|| D::Error::custom(format!("not an integer: {}", number)))
}

fn json_opt_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<Number>::deserialize(deserializer)? {
        Some(number) => number_to_int(&number)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("not an integer: {}", number))),
        None => Ok(None),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API
// ═══════════════════════════════════════════════════════════════════════════════

/// Valida um documento HE em texto JSON
pub fn validate(json: &str) -> HapticResult<HapticDocument> {
    let raw: RawDocument = serde_json::from_str(json).map_err(|e| {
        warn!("HE document rejected: {}", e);
        HapticError::MalformedStructure(e.to_string())
    })?;
    validate_raw(raw)
}

/// Valida um documento HE já parseado
pub fn validate_value(value: Value) -> HapticResult<HapticDocument> {
    let raw: RawDocument = serde_json::from_value(value).map_err(|e| {
        warn!("HE document rejected: {}", e);
        HapticError::MalformedStructure(e.to_string())
    })?;
    validate_raw(raw)
}

/// Lê apenas `Metadata.Version`
pub fn declared_version(json: &str) -> HapticResult<HeVersion> {
    #[derive(Deserialize)]
    struct VersionOnly {
        #[serde(rename = "Metadata")]
        metadata: RawMetadata,
    }
    let only: VersionOnly =
        serde_json::from_str(json).map_err(|e| HapticError::MalformedStructure(e.to_string()))?;
    HeVersion::from_raw(only.metadata.version)
}

fn validate_raw(raw: RawDocument) -> HapticResult<HapticDocument> {
    let result = match HeVersion::from_raw(raw.metadata.version)? {
        HeVersion::V1 => match raw.pattern {
            Some(entries) => validate_he1(&entries).map(HapticDocument::V1),
            None => Err(HapticError::MalformedStructure("HE 1.0 document without Pattern".into())),
        },
        HeVersion::V2 => match raw.pattern_list {
            Some(entries) => validate_he2(&entries).map(HapticDocument::V2),
            None => Err(HapticError::MalformedStructure("HE 2.0 document without PatternList".into())),
        },
    };
    if let Err(err) = &result {
        warn!("HE document isn't compliant: {}", err);
    }
    result
}

// ═══════════════════════════════════════════════════════════════════════════════
// HE 1.0
// ═══════════════════════════════════════════════════════════════════════════════

fn validate_he1(entries: &[RawEventEntry]) -> HapticResult<Pattern> {
    if entries.is_empty() {
        return Err(HapticError::MalformedStructure("empty Pattern".into()));
    }
    if entries.len() > MAX_EVENT_COUNT {
        debug!("HE 1.0 pattern has {} events, truncating to {}", entries.len(), MAX_EVENT_COUNT);
    }

    let mut events = Vec::with_capacity(entries.len().min(MAX_EVENT_COUNT));
    for (index, entry) in entries.iter().take(MAX_EVENT_COUNT).enumerate() {
        let raw = &entry.event;
        let continuous = event_kind(raw)?;
        let relative_time = match raw.relative_time {
            Some(time) => time,
            None => {
                let fallback = index as i64 * HE1_DEFAULT_RELATIVE_TIME_MS;
                debug!("event {} has no RelativeTime, using {}", index, fallback);
                fallback
            }
        };
        check_relative_time(relative_time)?;
        let header = event_header(raw, 0, relative_time)?;

        if continuous {
            let duration = raw.duration.unwrap_or(0);
            events.push(continuous_event(raw, header, duration, Strictness::Lenient)?);
        } else {
            events.push(Event::Transient(header));
        }
    }
    Ok(Pattern::new(0, events))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HE 2.0
// ═══════════════════════════════════════════════════════════════════════════════

fn validate_he2(entries: &[RawPatternEntry]) -> HapticResult<PatternSet> {
    if entries.is_empty() {
        return Err(HapticError::MalformedStructure("empty PatternList".into()));
    }
    if entries.len() > HE2_MAX_PATTERNS {
        return Err(HapticError::OutOfRange(Field::PatternCount));
    }

    let mut patterns = Vec::with_capacity(entries.len());
    let mut earliest_start: Option<i64> = None;

    for (pattern_index, entry) in entries.iter().enumerate() {
        let absolute_time = entry.absolute_time;
        if !(0..=i32::MAX as i64).contains(&absolute_time) {
            return Err(HapticError::OutOfRange(Field::AbsoluteTime));
        }
        if let Some(earliest) = earliest_start {
            if absolute_time < earliest {
                return Err(HapticError::OrderingViolation(format!(
                    "pattern {} starts at {} before previous pattern ends at {}",
                    pattern_index, absolute_time, earliest
                )));
            }
        }
        if entry.events.len() > MAX_EVENT_COUNT {
            return Err(HapticError::OutOfRange(Field::EventCount));
        }

        let mut events = Vec::with_capacity(entry.events.len());
        let mut previous_time: Option<i64> = None;
        for (event_index, event_entry) in entry.events.iter().enumerate() {
            let raw = &event_entry.event;
            let continuous = event_kind(raw)?;
            let channel = match raw.index {
                Some(index) => u8::try_from(index).map_err(|_| HapticError::OutOfRange(Field::Channel))?,
                None => {
                    return Err(HapticError::MalformedStructure(format!(
                        "pattern {} event {} has no Index",
                        pattern_index, event_index
                    )));
                }
            };
            let relative_time = raw.relative_time.ok_or_else(|| {
                HapticError::MalformedStructure(format!(
                    "pattern {} event {} has no RelativeTime",
                    pattern_index, event_index
                ))
            })?;
            check_relative_time(relative_time)?;
            if let Some(previous) = previous_time {
                if relative_time < previous {
                    return Err(HapticError::OrderingViolation(format!(
                        "pattern {} event {} at {} precedes {}",
                        pattern_index, event_index, relative_time, previous
                    )));
                }
            }
            previous_time = Some(relative_time);

            let header = event_header(raw, channel, relative_time)?;
            if continuous {
                let duration = raw.duration.ok_or_else(|| {
                    HapticError::MalformedStructure(format!(
                        "pattern {} event {} has no Duration",
                        pattern_index, event_index
                    ))
                })?;
                events.push(continuous_event(raw, header, duration, Strictness::Strict)?);
            } else {
                events.push(Event::Transient(header));
            }
        }

        let pattern = Pattern::new(absolute_time as i32, events);
        earliest_start = Some(absolute_time + pattern.end_time_ms());
        patterns.push(pattern);
    }
    Ok(PatternSet::new(patterns))
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGRAS COMUNS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strictness {
    /// Trunca pontos além do limite
    Lenient,
    /// Rejeita pontos além do limite
    Strict,
}

/// `true` para contínuo, `false` para transiente
fn event_kind(raw: &RawEvent) -> HapticResult<bool> {
    match raw.kind.as_str() {
        TYPE_CONTINUOUS => Ok(true),
        TYPE_TRANSIENT => Ok(false),
        other => Err(HapticError::MalformedStructure(format!("unknown event type {:?}", other))),
    }
}

fn check_relative_time(relative_time: i64) -> HapticResult<()> {
    if (0..=MAX_RELATIVE_TIME_MS).contains(&relative_time) {
        Ok(())
    } else {
        Err(HapticError::OutOfRange(Field::RelativeTime))
    }
}

fn event_header(raw: &RawEvent, channel: u8, relative_time: i64) -> HapticResult<EventHeader> {
    let intensity = raw.parameters.intensity;
    let frequency = raw.parameters.frequency;
    if !(0..=MAX_INTENSITY).contains(&intensity) {
        return Err(HapticError::OutOfRange(Field::Intensity));
    }
    if !(0..=MAX_FREQUENCY).contains(&frequency) {
        return Err(HapticError::OutOfRange(Field::Frequency));
    }
    Ok(EventHeader {
        channel,
        relative_time_ms: relative_time as i32,
        intensity: intensity as i32,
        frequency: frequency as i32,
    })
}

fn continuous_event(
    raw: &RawEvent,
    header: EventHeader,
    duration: i64,
    strictness: Strictness,
) -> HapticResult<Event> {
    if !(0..=MAX_EVENT_DURATION_MS).contains(&duration) {
        return Err(HapticError::OutOfRange(Field::Duration));
    }
    let raw_curve = raw
        .parameters
        .curve
        .as_deref()
        .ok_or_else(|| HapticError::MalformedStructure("continuous event without Curve".into()))?;

    let count = match strictness {
        Strictness::Lenient => raw_curve.len().min(MAX_POINT_COUNT),
        Strictness::Strict if raw_curve.len() > MAX_POINT_COUNT => {
            return Err(HapticError::OutOfRange(Field::CurvePointCount));
        }
        Strictness::Strict => raw_curve.len(),
    };
    if count == 0 {
        return Err(HapticError::OutOfRange(Field::CurvePointCount));
    }

    let mut curve = Vec::with_capacity(count);
    let mut previous_time = 0;
    for (i, point) in raw_curve.iter().take(count).enumerate() {
        let intensity = (point.intensity * 100.0) as i64;
        check_point(i, count, point.time, intensity, point.frequency, duration, previous_time)?;
        previous_time = point.time;
        curve.push(CurvePoint::new(point.time as i32, intensity as i32, point.frequency as i32));
    }

    Ok(Event::Continuous {
        header,
        duration_ms: duration as i32,
        curve,
    })
}

/// Primeiro ponto em (0, 0); último em (duração, 0); internos dentro dos limites e em ordem
fn check_point(
    i: usize,
    count: usize,
    time: i64,
    intensity: i64,
    frequency: i64,
    duration: i64,
    previous_time: i64,
) -> HapticResult<()> {
    let first = i == 0;
    let last = i + 1 == count;

    if first {
        if time != 0 {
            return Err(HapticError::OutOfRange(Field::CurveTime));
        }
        if intensity != 0 {
            return Err(HapticError::OutOfRange(Field::CurveIntensity));
        }
    } else {
        if !(0..=duration).contains(&time) && !last {
            return Err(HapticError::OutOfRange(Field::CurveTime));
        }
        if time < previous_time {
            return Err(HapticError::OrderingViolation(format!(
                "curve point {} at {} precedes {}",
                i, time, previous_time
            )));
        }
        if !(0..=MAX_INTENSITY).contains(&intensity) {
            return Err(HapticError::OutOfRange(Field::CurveIntensity));
        }
    }

    if last {
        if time != duration {
            return Err(HapticError::OutOfRange(Field::CurveTime));
        }
        if intensity != 0 {
            return Err(HapticError::OutOfRange(Field::CurveIntensity));
        }
    }

    if !(MIN_CURVE_FREQUENCY..=MAX_FREQUENCY).contains(&frequency) {
        return Err(HapticError::OutOfRange(Field::CurveFrequency));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn continuous(duration: i64, curve: Value) -> Value {
        json!({
            "Metadata": { "Version": 1 },
            "Pattern": [{
                "Event": {
                    "Type": "continuous",
                    "RelativeTime": 0,
                    "Duration": duration,
                    "Parameters": { "Intensity": 80, "Frequency": 40, "Curve": curve }
                }
            }]
        })
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let doc = json!({
            "Metadata": { "Version": 1 },
            "Pattern": [{ "Event": { "Type": "buzz", "Parameters": { "Intensity": 1, "Frequency": 1 } } }]
        });
        assert!(matches!(validate_value(doc), Err(HapticError::MalformedStructure(_))));
    }

    #[test]
    fn test_garbled_json_is_malformed() {
        assert!(matches!(validate("{\"Metadata\":"), Err(HapticError::MalformedStructure(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let doc = json!({ "Metadata": { "Version": 3 }, "Pattern": [] });
        assert_eq!(validate_value(doc), Err(HapticError::UnsupportedVersion(3)));
    }

    #[test]
    fn test_first_point_must_start_at_zero() {
        let doc = continuous(100, json!([
            { "Time": 5, "Intensity": 0.0, "Frequency": 0 },
            { "Time": 100, "Intensity": 0.0, "Frequency": 0 }
        ]));
        assert_eq!(validate_value(doc), Err(HapticError::OutOfRange(Field::CurveTime)));

        let doc = continuous(100, json!([
            { "Time": 0, "Intensity": 0.3, "Frequency": 0 },
            { "Time": 100, "Intensity": 0.0, "Frequency": 0 }
        ]));
        assert_eq!(validate_value(doc), Err(HapticError::OutOfRange(Field::CurveIntensity)));
    }

    #[test]
    fn test_last_point_must_match_duration() {
        let doc = continuous(100, json!([
            { "Time": 0, "Intensity": 0.0, "Frequency": 0 },
            { "Time": 50, "Intensity": 0.8, "Frequency": 0 },
            { "Time": 90, "Intensity": 0.0, "Frequency": 0 }
        ]));
        assert_eq!(validate_value(doc), Err(HapticError::OutOfRange(Field::CurveTime)));
    }

    #[test]
    fn test_interior_points_out_of_order() {
        let doc = continuous(100, json!([
            { "Time": 0, "Intensity": 0.0, "Frequency": 0 },
            { "Time": 60, "Intensity": 0.8, "Frequency": 0 },
            { "Time": 40, "Intensity": 0.5, "Frequency": 0 },
            { "Time": 100, "Intensity": 0.0, "Frequency": 0 }
        ]));
        assert!(matches!(validate_value(doc), Err(HapticError::OrderingViolation(_))));
    }

    #[test]
    fn test_curve_frequency_may_be_negative() {
        let doc = continuous(100, json!([
            { "Time": 0, "Intensity": 0.0, "Frequency": -100 },
            { "Time": 50, "Intensity": 1.0, "Frequency": -20 },
            { "Time": 100, "Intensity": 0.0, "Frequency": 100 }
        ]));
        assert!(validate_value(doc).is_ok());
    }

    #[test]
    fn test_empty_curve_rejected() {
        let doc = continuous(0, json!([]));
        assert_eq!(validate_value(doc), Err(HapticError::OutOfRange(Field::CurvePointCount)));
    }

    #[test]
    fn test_float_integers_truncate() {
        let doc = json!({
            "Metadata": { "Version": 1.0 },
            "Pattern": [{
                "Event": { "Type": "transient", "RelativeTime": 10.9, "Parameters": { "Intensity": 50.5, "Frequency": 7 } }
            }]
        });
        let HapticDocument::V1(pattern) = validate_value(doc).unwrap() else {
            panic!("expected HE 1.0");
        };
        assert_eq!(pattern.events[0].header().relative_time_ms, 10);
        assert_eq!(pattern.events[0].header().intensity, 50);
    }

    #[test]
    fn test_declared_version() {
        assert_eq!(declared_version(r#"{"Metadata":{"Version":2}}"#).unwrap(), HeVersion::V2);
        assert!(declared_version(r#"{"Pattern":[]}"#).is_err());
    }
}
