//! Testes do módulo vib-orchestration

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use vib_actuator::{ActuatorCommand, CompletionMode, SimulatedActuator, SimulatedProvider};
use vib_core::{
    ClientToken, CompiledPattern, Effect, EffectStrength, LoopCount, PrebakedEffect, SenderId, Usage,
    UsageFilter, VibrationStatus,
};

use super::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup(mode: CompletionMode) -> (Arc<SimulatedProvider>, VibrationScheduler) {
    init_tracing();
    let actuator = SimulatedActuator::with_completion(mode).unwrap();
    let provider = Arc::new(SimulatedProvider::new(actuator));
    let scheduler =
        VibrationScheduler::new(provider.clone(), Arc::new(DefaultPolicy), SchedulerConfig::default()).unwrap();
    (provider, scheduler)
}

fn one_shot(token: u64, usage: Usage, duration_ms: u64) -> VibrationRequest {
    let effect = Effect::OneShot { duration_ms, amplitude: 200 };
    VibrationRequest::new(10_001, "com.example", ClientToken(token), effect).with_usage(usage)
}

/// Espera `check` ficar verdadeiro
fn eventually(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}

// ═══════════════════════════════════════════════════════════════════════════════
// CICLO DE VIDA
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_scheduler_rejects_invalid_config() {
    let actuator = SimulatedActuator::new().unwrap();
    let provider = Arc::new(SimulatedProvider::new(actuator));
    let config = SchedulerConfig { history_limit: 0, ..SchedulerConfig::default() };
    let result = VibrationScheduler::new(provider, Arc::new(DefaultPolicy), config);
    assert!(matches!(result, Err(OrchestrationError::InvalidConfiguration(_))));
}

#[test]
fn test_scheduler_starts_idle() {
    let (_provider, scheduler) = setup(CompletionMode::Manual);
    assert!(!scheduler.is_vibrating());
    assert!(scheduler.current().is_none());
    assert!(scheduler.wait_idle(Duration::from_millis(10)).unwrap());
}

#[test]
fn test_one_shot_runs_to_completion() {
    let (provider, scheduler) = setup(CompletionMode::Immediate);
    let report = scheduler.vibrate(one_shot(1, Usage::Touch, 20)).unwrap();
    assert_eq!(report.id, 1);

    assert!(scheduler.wait_idle(Duration::from_secs(2)).unwrap());
    let dump = scheduler.dump().unwrap();
    assert_eq!(dump.history.len(), 1);
    assert_eq!(dump.history[0].status, VibrationStatus::Finished);
    assert!(provider.actuator().commands().contains(&ActuatorCommand::On { duration_ms: 20, vibration_id: 1 }));
}

#[test]
fn test_ids_are_monotonic() {
    let (_provider, scheduler) = setup(CompletionMode::Immediate);
    let a = scheduler.vibrate(one_shot(1, Usage::Touch, 5)).unwrap();
    let b = scheduler.vibrate(one_shot(1, Usage::Touch, 5)).unwrap();
    assert!(b.id > a.id);
}

#[test]
fn test_invalid_effect_rejected_before_admission() {
    let (provider, scheduler) = setup(CompletionMode::Manual);
    let effect = Effect::Waveform { timings_ms: vec![10, 20], amplitudes: vec![255], repeat: None };
    let request = VibrationRequest::new(1, "p", ClientToken(1), effect);
    let err = scheduler.vibrate(request).unwrap_err();
    assert!(err.haptic().is_some_and(|e| e.is_validation()));
    assert_eq!(provider.actuator().command_count(), 0);
}

#[test]
fn test_shutdown_cancels_current() {
    let (provider, scheduler) = setup(CompletionMode::Manual);
    scheduler.vibrate(one_shot(1, Usage::Touch, 10_000)).unwrap();
    assert!(scheduler.is_vibrating());

    scheduler.shutdown();
    assert!(!scheduler.is_running());
    assert!(!scheduler.is_vibrating());
    assert!(!provider.actuator().is_vibrating());
    assert!(matches!(scheduler.dump(), Err(OrchestrationError::WorkerStopped(_))));
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRECEDÊNCIA E CANCELAMENTO
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_repeating_alarm_ignores_touch() {
    let (_provider, scheduler) = setup(CompletionMode::Manual);
    let alarm = Effect::Waveform { timings_ms: vec![100, 100], amplitudes: vec![255, 0], repeat: Some(0) };
    let alarm = VibrationRequest::new(1000, "clock", ClientToken(1), alarm).with_usage(Usage::Alarm);
    let alarm = scheduler.vibrate(alarm).unwrap();
    assert_eq!(alarm.status, VibrationStatus::Running);

    let touch = scheduler.vibrate(one_shot(2, Usage::Touch, 30)).unwrap();
    assert_eq!(touch.status, VibrationStatus::IgnoredForAlarm);
    assert_eq!(scheduler.current().map(|v| v.id), Some(alarm.id));

    assert_eq!(scheduler.cancel_vibrate(UsageFilter::All, ClientToken(1)).unwrap(), 1);
    assert!(scheduler.current().is_none());
}

#[test]
fn test_alarm_preempts_touch() {
    let (_provider, scheduler) = setup(CompletionMode::Manual);
    let touch = scheduler.vibrate(one_shot(1, Usage::Touch, 10_000)).unwrap();
    let alarm = scheduler.vibrate(one_shot(2, Usage::Alarm, 10_000)).unwrap();
    assert_eq!(alarm.status, VibrationStatus::Running);
    assert_eq!(scheduler.current().map(|v| v.id), Some(alarm.id));

    let dump = scheduler.dump().unwrap();
    let replaced = dump.history.iter().find(|v| v.id == touch.id).unwrap();
    assert_eq!(replaced.status, VibrationStatus::CancelledSuperseded);
}

#[test]
fn test_cancel_respects_token_and_filter() {
    let (_provider, scheduler) = setup(CompletionMode::Manual);
    scheduler.vibrate(one_shot(7, Usage::Notification, 10_000)).unwrap();

    assert_eq!(scheduler.cancel_vibrate(UsageFilter::All, ClientToken(8)).unwrap(), 0);
    let filter = UsageFilter::Usages(vec![Usage::Touch]);
    assert_eq!(scheduler.cancel_vibrate(filter, ClientToken(7)).unwrap(), 0);
    assert!(scheduler.is_vibrating());

    let filter = UsageFilter::Usages(vec![Usage::Notification]);
    assert_eq!(scheduler.cancel_vibrate(filter, ClientToken(7)).unwrap(), 1);
    assert!(!scheduler.is_vibrating());
}

#[test]
fn test_prebaked_completes_on_hal_ack() {
    let (provider, scheduler) = setup(CompletionMode::Manual);
    let effect = Effect::Prebaked(PrebakedEffect::new(2, EffectStrength::Medium));
    let report = scheduler.vibrate(VibrationRequest::new(1, "p", ClientToken(1), effect)).unwrap();
    assert_eq!(report.status, VibrationStatus::Running);

    assert!(provider.actuator().complete_in_flight());
    assert!(scheduler.wait_idle(Duration::from_secs(2)).unwrap());
    assert_eq!(scheduler.dump().unwrap().history[0].status, VibrationStatus::Finished);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PACOTES HE 2.0
// ═══════════════════════════════════════════════════════════════════════════════

fn he2_packet(sender: SenderId, first_index: i32) -> CompiledPattern {
    let mut data = vec![2, 2, sender.pid, sender.seq, 20 | (1 << 16)];
    data.extend([first_index, 0, 7, 0x1001, 0, 0, 10, 20, 0, 0]);
    let mut pattern = CompiledPattern::new(data);
    pattern.loop_count = LoopCount::Infinite;
    pattern.duration_hint_ms = None;
    pattern
}

#[test]
fn test_continuation_cannot_start_vibration() {
    let (_provider, scheduler) = setup(CompletionMode::Manual);
    let packet = he2_packet(SenderId::new(9, 1), 10);
    let request = VibrationRequest::new(1, "p", ClientToken(1), Effect::Compiled(packet));
    assert!(scheduler.vibrate(request).is_err());
}

#[test]
fn test_stale_packet_dropped_without_state_change() {
    let (provider, scheduler) = setup(CompletionMode::Manual);
    let first = he2_packet(SenderId::new(9, 1), 0);
    let request = VibrationRequest::new(1, "p", ClientToken(1), Effect::Compiled(first));
    let report = scheduler.vibrate(request).unwrap();

    let commands = provider.actuator().command_count();
    let stale = he2_packet(SenderId::new(9, 0), 10);
    assert_eq!(scheduler.submit_packet(stale).unwrap(), PacketDisposition::Dropped);
    assert_eq!(provider.actuator().command_count(), commands);
    assert_eq!(scheduler.current().map(|v| v.status), Some(VibrationStatus::Running));

    let next = he2_packet(SenderId::new(9, 1), 10);
    assert_eq!(scheduler.submit_packet(next).unwrap(), PacketDisposition::Forwarded(report.id));
}

// ═══════════════════════════════════════════════════════════════════════════════
// LISTENERS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_listener_sees_transitions_in_order() {
    let (_provider, scheduler) = setup(CompletionMode::Manual);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = scheduler.register_listener(move |vibrating| sink.lock().unwrap().push(vibrating)).unwrap();

    scheduler.vibrate(one_shot(1, Usage::Touch, 10_000)).unwrap();
    scheduler.cancel_vibrate(UsageFilter::All, ClientToken(1)).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);

    assert!(scheduler.unregister_listener(id).unwrap());
    scheduler.vibrate(one_shot(1, Usage::Touch, 10_000)).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[test]
fn test_listener_registered_while_vibrating() {
    let (_provider, scheduler) = setup(CompletionMode::Manual);
    scheduler.vibrate(one_shot(1, Usage::Touch, 10_000)).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    scheduler.register_listener(move |vibrating| sink.lock().unwrap().push(vibrating)).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![true]);
}

#[test]
fn test_timed_step_finishes_by_deadline() {
    let (_provider, scheduler) = setup(CompletionMode::Manual);
    scheduler.vibrate(one_shot(1, Usage::Touch, 20)).unwrap();
    assert!(eventually(Duration::from_secs(2), || !scheduler.is_vibrating()));
}

// ═══════════════════════════════════════════════════════════════════════════════
// SLOT NEXT, CONCLUSÕES ATRASADAS E FALHAS DE DESPACHO
// ═══════════════════════════════════════════════════════════════════════════════

/// Stream compilado infinito no current; cancelá-lo segura o slot até o ack
fn start_stream(scheduler: &VibrationScheduler) -> VibrationReport {
    let packet = he2_packet(SenderId::new(9, 1), 0);
    scheduler.vibrate(VibrationRequest::new(1, "p", ClientToken(1), Effect::Compiled(packet))).unwrap()
}

fn status_in_history(scheduler: &VibrationScheduler, id: u64) -> Option<VibrationStatus> {
    scheduler.dump().unwrap().history.iter().find(|v| v.id == id).map(|v| v.status)
}

#[test]
fn test_queued_next_replaced_by_newer_request() {
    let (provider, scheduler) = setup(CompletionMode::Manual);
    let stream = start_stream(&scheduler);

    let first = scheduler.vibrate(one_shot(2, Usage::Alarm, 10_000)).unwrap();
    assert_eq!(first.status, VibrationStatus::Pending);
    assert_eq!(scheduler.next().map(|v| v.id), Some(first.id));

    let second = scheduler.vibrate(one_shot(3, Usage::Alarm, 10_000)).unwrap();
    assert_eq!(scheduler.next().map(|v| v.id), Some(second.id));
    assert_eq!(status_in_history(&scheduler, first.id), Some(VibrationStatus::IgnoredSuperseded));

    // Ack do stop libera o slot para o substituto
    assert!(provider.actuator().complete_in_flight());
    assert!(eventually(Duration::from_secs(2), || scheduler.current().is_some_and(|v| v.id == second.id)));
    assert_eq!(status_in_history(&scheduler, stream.id), Some(VibrationStatus::CancelledSuperseded));
}

#[test]
fn test_completion_for_other_vibration_ignored() {
    let (provider, scheduler) = setup(CompletionMode::Manual);
    let old = scheduler.vibrate(one_shot(1, Usage::Touch, 10_000)).unwrap();
    let effect = Effect::Waveform { timings_ms: vec![10_000, 10_000], amplitudes: vec![100, 120], repeat: None };
    let wave = scheduler.vibrate(VibrationRequest::new(1, "p", ClientToken(2), effect)).unwrap();
    assert_eq!(status_in_history(&scheduler, old.id), Some(VibrationStatus::CancelledSuperseded));

    let on_count = |id: u64| {
        provider
            .actuator()
            .commands()
            .iter()
            .filter(|c| matches!(c, ActuatorCommand::On { vibration_id, .. } if *vibration_id == id))
            .count()
    };
    assert_eq!(on_count(wave.id), 1);

    // Conclusão atrasada da vibração antiga seguida da do passo atual
    let sink = provider.actuator().detach().unwrap();
    provider.actuator().attach(sink.clone());
    sink.complete(old.id);
    sink.complete(wave.id);

    assert!(eventually(Duration::from_secs(2), || on_count(wave.id) == 2));
    assert!(scheduler.is_vibrating());
    assert_eq!(scheduler.current().map(|v| v.id), Some(wave.id));
}

#[test]
fn test_dispatch_failure_ends_promoted_vibration() {
    let (provider, scheduler) = setup(CompletionMode::Manual);
    let stream = start_stream(&scheduler);
    let alarm = scheduler.vibrate(one_shot(2, Usage::Alarm, 10_000)).unwrap();
    assert_eq!(scheduler.next().map(|v| v.id), Some(alarm.id));

    provider.actuator().set_failing(true);
    assert!(provider.actuator().complete_in_flight());
    assert!(scheduler.wait_idle(Duration::from_secs(2)).unwrap());
    assert_eq!(status_in_history(&scheduler, stream.id), Some(VibrationStatus::CancelledSuperseded));
    assert_eq!(status_in_history(&scheduler, alarm.id), Some(VibrationStatus::IgnoredErrorScheduling));
    assert!(!scheduler.is_vibrating());

    // O handle é refeito e o próximo pedido roda normalmente
    provider.actuator().set_failing(false);
    let report = scheduler.vibrate(one_shot(3, Usage::Touch, 10_000)).unwrap();
    assert_eq!(report.status, VibrationStatus::Running);
}
