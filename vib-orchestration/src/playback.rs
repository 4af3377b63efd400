//! Expansão de efeitos em passos de atuador

use std::time::{Duration, Instant};

use tracing::trace;
use vib_core::{
    ActuatorControl, ActuatorInfo, CompiledPattern, Effect, EnvelopeEffect, HapticResult,
    PrebakedEffect, VibrationId,
};

use crate::vibration::Vibration;

/// Comando elementar emitido ao atuador
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    On { duration_ms: u64, amplitude: u8 },
    Off { duration_ms: u64 },
    Prebaked(PrebakedEffect),
    Envelope(EnvelopeEffect),
    Compiled(CompiledPattern),
}

/// Como um passo em andamento termina
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepKind {
    /// Só pelo prazo
    Timed,
    /// Conclusão do HAL ou prazo
    Awaiting,
    /// Stream compilado: conclusão, prazo (se finito) ou stop
    Compiled,
}

/// Vibração no slot current (ou aguardando em next)
#[derive(Debug)]
pub(crate) struct Playback {
    pub vibration: Vibration,
    cursor: usize,
    pub step: Option<StepKind>,
    pub deadline: Option<Instant>,
    /// Stop emitido, aguardando ack do HAL
    pub stopping: bool,
    /// Pacotes de continuação recebidos antes do despacho
    pub packets: Vec<CompiledPattern>,
}

impl Playback {
    pub fn new(vibration: Vibration) -> Self {
        Self {
            vibration,
            cursor: 0,
            step: None,
            deadline: None,
            stopping: false,
            packets: Vec::new(),
        }
    }

    pub fn id(&self) -> VibrationId {
        self.vibration.id
    }

    /// Stream compilado em voo no HAL
    pub fn has_compiled_in_flight(&self) -> bool {
        self.step == Some(StepKind::Compiled)
    }

    /// Próximo passo; `None` quando o efeito terminou
    pub fn next_step(&mut self) -> Option<Step> {
        match &self.vibration.effect {
            Effect::Waveform { timings_ms, amplitudes, repeat } => {
                let len = timings_ms.len();
                // Formas de onda só com zeros não podem girar para sempre
                for _ in 0..=len {
                    if self.cursor >= len {
                        match repeat {
                            Some(index) if *index < len => self.cursor = *index,
                            _ => return None,
                        }
                    }
                    let index = self.cursor;
                    self.cursor += 1;
                    let duration_ms = timings_ms[index];
                    if duration_ms == 0 {
                        continue;
                    }
                    return Some(match amplitudes[index] {
                        0 => Step::Off { duration_ms },
                        amplitude => Step::On { duration_ms, amplitude },
                    });
                }
                None
            }
            effect => {
                if self.cursor > 0 {
                    return None;
                }
                self.cursor = 1;
                Some(match effect {
                    Effect::OneShot { duration_ms, amplitude } => {
                        Step::On { duration_ms: *duration_ms, amplitude: *amplitude }
                    }
                    Effect::Prebaked(prebaked) => Step::Prebaked(*prebaked),
                    Effect::Envelope(envelope) => Step::Envelope(*envelope),
                    Effect::Compiled(pattern) => Step::Compiled(pattern.clone()),
                    Effect::Waveform { .. } => return None,
                })
            }
        }
    }

    /// Despacha um passo e arma o prazo
    pub fn dispatch(
        &mut self,
        control: &dyn ActuatorControl,
        step: Step,
        prebaked_fallback_ms: u64,
    ) -> HapticResult<()> {
        let id = self.id();
        let info = control.info();
        let amplitude_control = info.has_capability(ActuatorInfo::CAP_AMPLITUDE_CONTROL);
        trace!("vibration {} step {:?}", id, step);

        let (kind, duration_ms) = match step {
            Step::On { duration_ms, amplitude } => {
                if amplitude_control {
                    control.set_amplitude(amplitude)?;
                }
                (StepKind::Awaiting, Some(control.on(duration_ms, id)?))
            }
            Step::Off { duration_ms } => {
                control.off()?;
                (StepKind::Timed, Some(duration_ms))
            }
            Step::Prebaked(prebaked) => {
                let reported = control.perform_prebaked(&prebaked, id)?;
                let duration_ms = if reported == 0 { prebaked_fallback_ms } else { reported };
                (StepKind::Awaiting, Some(duration_ms))
            }
            Step::Envelope(envelope) => {
                if amplitude_control && envelope.amplitude > 0 {
                    control.set_amplitude(envelope.amplitude.min(255) as u8)?;
                }
                control.perform_envelope(&envelope.params(), envelope.steep, id)?;
                (StepKind::Awaiting, Some(envelope.duration_ms()))
            }
            Step::Compiled(pattern) => {
                control.perform_compiled_pattern(&pattern, id)?;
                for packet in self.packets.drain(..) {
                    control.perform_compiled_pattern(&packet, id)?;
                }
                (StepKind::Compiled, pattern.duration_hint_ms)
            }
        };

        self.step = Some(kind);
        self.deadline = duration_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibration::VibrationRequest;
    use vib_core::{ClientToken, LoopCount};

    fn playback(effect: Effect) -> Playback {
        Playback::new(Vibration::new(1, VibrationRequest::new(1, "p", ClientToken(1), effect)))
    }

    #[test]
    fn test_one_shot_single_step() {
        let mut p = playback(Effect::OneShot { duration_ms: 40, amplitude: 9 });
        assert_eq!(p.next_step(), Some(Step::On { duration_ms: 40, amplitude: 9 }));
        assert_eq!(p.next_step(), None);
    }

    #[test]
    fn test_waveform_skips_zero_and_offs_silence() {
        let mut p = playback(Effect::Waveform {
            timings_ms: vec![0, 100, 50],
            amplitudes: vec![255, 0, 200],
            repeat: None,
        });
        assert_eq!(p.next_step(), Some(Step::Off { duration_ms: 100 }));
        assert_eq!(p.next_step(), Some(Step::On { duration_ms: 50, amplitude: 200 }));
        assert_eq!(p.next_step(), None);
    }

    #[test]
    fn test_waveform_repeats_from_index() {
        let mut p = playback(Effect::Waveform {
            timings_ms: vec![10, 20, 30],
            amplitudes: vec![1, 2, 3],
            repeat: Some(1),
        });
        let durations: Vec<u64> = (0..5)
            .map(|_| match p.next_step() {
                Some(Step::On { duration_ms, .. }) => duration_ms,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(durations, vec![10, 20, 30, 20, 30]);
    }

    #[test]
    fn test_all_zero_repeating_waveform_ends() {
        let mut p = playback(Effect::Waveform {
            timings_ms: vec![0, 0],
            amplitudes: vec![1, 1],
            repeat: Some(0),
        });
        assert_eq!(p.next_step(), None);
    }

    #[test]
    fn test_infinite_compiled_has_no_deadline() {
        use vib_actuator::{CompletionMode, SimulatedActuator};
        use vib_core::CompletionSink;

        let actuator = SimulatedActuator::with_completion(CompletionMode::Manual).unwrap();
        let (sink, _events) = CompletionSink::channel();
        actuator.attach(sink);

        let mut pattern = CompiledPattern::new(vec![3, 0]);
        pattern.loop_count = LoopCount::Infinite;
        let mut p = playback(Effect::Compiled(pattern));
        let step = p.next_step().unwrap();
        p.dispatch(&actuator, step, 30).unwrap();
        assert!(p.has_compiled_in_flight());
        assert!(p.deadline.is_none());
    }
}
