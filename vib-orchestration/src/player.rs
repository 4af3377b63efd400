//! Superfície de reprodução HE para um cliente
//!
//! Um [`HapticPlayer`] compila documentos HE e os entrega ao scheduler com
//! a identidade do chamador. Atualizações de parâmetros e `stop()` só têm
//! efeito depois da primeira reprodução.

use tracing::{debug, info};
use vib_core::{
    ClientToken, Effect, Field, HapticError, LoopCount, PatternParams, SenderId, Usage, UsageFilter,
    VibrationAttributes,
};
use vib_pattern::{HeVersion, PlaybackOptions, compile, declared_version, validate};

use crate::error::OrchestrationResult;
use crate::scheduler::VibrationScheduler;
use crate::vibration::{PacketDisposition, VibrationReport, VibrationRequest};

/// Amplitude usada quando o chamador passa `-1`
pub const DEFAULT_AMPLITUDE: i32 = 255;

/// Player HE de um cliente
#[derive(Debug)]
pub struct HapticPlayer {
    scheduler: VibrationScheduler,
    uid: i32,
    package: String,
    pid: i32,
    token: ClientToken,
    attributes: VibrationAttributes,
    started: bool,
}

impl HapticPlayer {
    pub fn new(scheduler: VibrationScheduler, uid: i32, package: impl Into<String>) -> Self {
        let token = scheduler.issue_token();
        Self {
            scheduler,
            uid,
            package: package.into(),
            pid: std::process::id() as i32,
            token,
            attributes: VibrationAttributes::new(Usage::Media),
            started: false,
        }
    }

    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_attributes(mut self, attributes: VibrationAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn token(&self) -> ClientToken {
        self.token
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Valida, compila e reproduz um documento HE
    ///
    /// `-1` em intervalo, amplitude ou frequência usa o padrão; amplitude
    /// válida é `1..=255`. HE 2.0 com mais de 10 padrões vira vários pacotes:
    /// o primeiro entra por `vibrate`, os demais por `submit_packet`.
    pub fn compile_and_play(
        &mut self,
        json: &str,
        loop_count: i32,
        interval_ms: i32,
        amplitude: i32,
        frequency: i32,
    ) -> OrchestrationResult<VibrationReport> {
        let params = checked_params(interval_ms, amplitude, frequency)?;
        let loop_count = LoopCount::from_raw(loop_count)?;

        let version = declared_version(json)?;
        let info = self
            .scheduler
            .actuator_info()?
            .ok_or_else(|| HapticError::HardwareUnavailable("vibrator HAL not connected".into()))?;
        if !info.supports_he(version.as_raw() as i64) {
            return Err(HapticError::UnsupportedVersion(version.as_raw() as i64).into());
        }
        let document = validate(json)?;

        let options = PlaybackOptions {
            loop_count,
            interval_ms: or_default(params.interval_ms, 0),
            amplitude: or_default(params.amplitude, DEFAULT_AMPLITUDE),
            frequency: or_default(params.frequency, 0),
        };
        let sender = match version {
            HeVersion::V2 => SenderId::new(self.pid, self.scheduler.next_sequence()),
            HeVersion::V1 => SenderId::new(self.pid, 0),
        };
        let mut packets =
            compile(&document, &options, sender, self.scheduler.config().transient_tail_ms).into_iter();
        let first = packets
            .next()
            .ok_or_else(|| HapticError::MalformedStructure("document compiled to nothing".into()))?;

        let request = VibrationRequest::new(self.uid, self.package.clone(), self.token, Effect::Compiled(first))
            .with_attributes(self.attributes);
        let report = self.scheduler.vibrate(request)?;
        self.started = true;
        info!("player {} started vibration {} ({:?})", self.package, report.id, report.status);

        let mut forwarded = 1usize;
        for packet in packets {
            if self.scheduler.submit_packet(packet)? == PacketDisposition::Dropped {
                debug!("stream {} no longer admitted, remaining packets dropped", sender);
                break;
            }
            forwarded += 1;
        }
        debug!("vibration {}: {} packet(s) forwarded", report.id, forwarded);
        Ok(report)
    }

    pub fn update_interval(&self, interval_ms: i32) -> OrchestrationResult<bool> {
        self.update_parameter(interval_ms, PatternParams::UNCHANGED, PatternParams::UNCHANGED)
    }

    pub fn update_amplitude(&self, amplitude: i32) -> OrchestrationResult<bool> {
        self.update_parameter(PatternParams::UNCHANGED, amplitude, PatternParams::UNCHANGED)
    }

    pub fn update_frequency(&self, frequency: i32) -> OrchestrationResult<bool> {
        self.update_parameter(PatternParams::UNCHANGED, PatternParams::UNCHANGED, frequency)
    }

    /// Atualiza o stream em andamento; `Ok(false)` se nada foi atualizado
    pub fn update_parameter(&self, interval_ms: i32, amplitude: i32, frequency: i32) -> OrchestrationResult<bool> {
        if !self.started {
            return Ok(false);
        }
        let params = checked_params(interval_ms, amplitude, frequency)?;
        self.scheduler.update_pattern_params_for(self.token, params)
    }

    /// Cancela as vibrações deste player
    pub fn stop(&self) -> OrchestrationResult<usize> {
        if !self.started {
            return Ok(0);
        }
        self.scheduler.cancel_vibrate(UsageFilter::All, self.token)
    }
}

fn checked_params(interval_ms: i32, amplitude: i32, frequency: i32) -> OrchestrationResult<PatternParams> {
    // Amplitude 0 só existe na forma de parada
    if amplitude == 0 {
        return Err(HapticError::OutOfRange(Field::Amplitude).into());
    }
    Ok(PatternParams::new(interval_ms, amplitude, frequency)?)
}

fn or_default(value: i32, default: i32) -> i32 {
    if value == PatternParams::UNCHANGED { default } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_params_rejects_zero_amplitude() {
        let err = checked_params(0, 0, 0).unwrap_err();
        assert_eq!(err.haptic(), Some(&HapticError::OutOfRange(Field::Amplitude)));
    }

    #[test]
    fn test_checked_params_accepts_unchanged() {
        let params = checked_params(-1, -1, -1).unwrap();
        assert_eq!(params.encode(), [-1, -1, -1]);
    }

    #[test]
    fn test_checked_params_rejects_negatives() {
        assert!(checked_params(-2, 10, 0).is_err());
        assert!(checked_params(0, 256, 0).is_err());
        assert!(checked_params(0, 10, -5).is_err());
    }

    #[test]
    fn test_or_default() {
        assert_eq!(or_default(-1, 255), 255);
        assert_eq!(or_default(80, 255), 80);
    }
}
