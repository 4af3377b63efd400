//! Testes do módulo vib-actuator

use std::sync::Arc;

use vib_core::{
    ActuatorControl, ActuatorEvent, CompiledPattern, CompletionSink, LoopCount, PatternParams,
    PrebakedEffect,
};

use crate::{ActuatorCommand, ActuatorHandle, CompletionMode, SimulatedActuator, SimulatedProvider};

// ═══════════════════════════════════════════════════════════════════════════════
// Fluxo via handle
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_handle_drives_shared_actuator() {
    let provider = Arc::new(SimulatedProvider::new(
        SimulatedActuator::with_completion(CompletionMode::Immediate).unwrap(),
    ));
    let (sink, events) = CompletionSink::channel();
    let mut handle = ActuatorHandle::new(provider.clone(), sink);

    let control = handle.get().unwrap();
    control.set_amplitude(120).unwrap();
    control.on(25, 4).unwrap();

    assert_eq!(events.try_recv().unwrap(), ActuatorEvent::Complete(4));
    assert_eq!(provider.actuator().amplitude(), 120);
    assert_eq!(
        provider.actuator().commands(),
        vec![
            ActuatorCommand::SetAmplitude(120),
            ActuatorCommand::On { duration_ms: 25, vibration_id: 4 },
        ]
    );
}

#[test]
fn test_reconnect_after_death() {
    let provider = Arc::new(SimulatedProvider::new(
        SimulatedActuator::with_completion(CompletionMode::Manual).unwrap(),
    ));
    let (sink, events) = CompletionSink::channel();
    let mut handle = ActuatorHandle::new(provider.clone(), sink);

    handle.get().unwrap().on(500, 1).unwrap();
    provider.kill();
    assert_eq!(events.try_recv().unwrap(), ActuatorEvent::Died);

    handle.reset();
    let control = handle.get().unwrap();
    assert!(control.on(10, 2).is_ok());
    assert_eq!(provider.connection_count(), 2);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Comandos
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_compiled_pattern_recorded() {
    let actuator = SimulatedActuator::with_completion(CompletionMode::Manual).unwrap();
    let (sink, _events) = CompletionSink::channel();
    actuator.attach(sink);

    let mut pattern = CompiledPattern::new(vec![2, 0, 10, 3, 12 | (2 << 16), 10]);
    pattern.loop_count = LoopCount::Infinite;
    actuator.perform_compiled_pattern(&pattern, 8).unwrap();
    actuator.update_pattern_params(PatternParams::new(50, -1, -1).unwrap()).unwrap();

    let commands = actuator.commands();
    assert_eq!(
        commands[0],
        ActuatorCommand::Compiled { words: 6, first_index: Some(10), vibration_id: 8 }
    );
    assert!(matches!(commands[1], ActuatorCommand::PatternParams(p) if p.interval_ms == 50));
    assert_eq!(actuator.in_flight(), Some(8));
}

#[test]
fn test_prebaked_reports_configured_duration() {
    let actuator = SimulatedActuator::with_completion(CompletionMode::Immediate).unwrap();
    let (sink, _events) = CompletionSink::channel();
    actuator.attach(sink);
    let duration = actuator
        .perform_prebaked(&PrebakedEffect { effect_id: 1, strength: 69 }, 3)
        .unwrap();
    assert_eq!(duration, actuator.config().prebaked_duration_ms);
}

#[test]
fn test_external_control_and_haptic_param() {
    let actuator = SimulatedActuator::new().unwrap();
    actuator.set_external_control(true).unwrap();
    actuator.set_haptic_param(&[1, 3]).unwrap();
    let state = actuator.state();
    assert!(state.external_control);
    assert_eq!(state.haptic_params, vec![1, 3]);
}

#[test]
fn test_clear_commands() {
    let actuator = SimulatedActuator::new().unwrap();
    actuator.set_haptic_param(&[1, 0]).unwrap();
    assert_eq!(actuator.command_count(), 1);
    actuator.clear_commands();
    assert_eq!(actuator.command_count(), 0);
}
