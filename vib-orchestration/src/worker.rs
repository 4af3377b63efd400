//! Worker serial do scheduler
//!
//! Uma única thread é dona do handle do atuador e de toda mutação dos
//! slots `current`/`next`. Chamadas públicas chegam como [`Command`],
//! conclusões do HAL como [`ActuatorEvent`], e prazos de passo pelo timer
//! do `select!`.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, at, never, select};
use tracing::{debug, error, info, warn};
use vib_actuator::ActuatorHandle;
use vib_core::{
    ActuatorEvent, ActuatorInfo, CallState, ClientToken, CompiledPattern, HapticError,
    PatternParams, SenderId, Usage, UsageFilter, VibrationId, VibrationStatus,
};

use crate::always_on::{AlwaysOnRegistry, AlwaysOnRequest};
use crate::config::SchedulerConfig;
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::listeners::ListenerRegistry;
use crate::playback::{Playback, StepKind};
use crate::policy::VibrationPolicy;
use crate::records::{VibrationDump, VibrationRecords};
use crate::vibration::{
    ExternalInfo, ExternalScale, ExternalSession, ExternalVibration, PacketDisposition, Vibration,
    VibrationInfo, VibrationReport,
};

/// Comandos aceitos pelo worker
pub(crate) enum Command {
    Vibrate { vibration: Vibration, reply: Sender<VibrationReport> },
    Packet { pattern: CompiledPattern, reply: Sender<PacketDisposition> },
    Cancel { filter: UsageFilter, token: ClientToken, reply: Sender<usize> },
    ScreenOff { reply: Sender<usize> },
    SettingsChanged { reply: Sender<usize> },
    CallState { state: CallState, reply: Sender<usize> },
    StartExternal { external: ExternalVibration, reply: Sender<ExternalAdmission> },
    ExternalTimedOut { id: u64, reply: Sender<bool> },
    StopExternal { id: u64, reply: Sender<OrchestrationResult<()>> },
    SetAlwaysOn { request: AlwaysOnRequest, reply: Sender<bool> },
    UpdateParams { params: PatternParams, token: Option<ClientToken>, reply: Sender<bool> },
    SetMode { mode: i32, reply: Sender<OrchestrationResult<()>> },
    Info { reply: Sender<Option<ActuatorInfo>> },
    Dump { reply: Sender<VibrationDump> },
    Shutdown,
}

/// Resultado da admissão de uma sessão externa
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExternalAdmission {
    Rejected,
    Active(ExternalScale),
    /// Aguardando o slot esvaziar
    Waiting(ExternalScale),
}

/// Estado publicado pelo worker
#[derive(Debug, Clone, Default)]
pub(crate) struct SchedulerState {
    pub current: Option<VibrationInfo>,
    pub next: Option<VibrationInfo>,
    pub external: Option<ExternalInfo>,
    pub vibrating: bool,
    pub running: bool,
}

impl SchedulerState {
    pub fn is_external_pending(&self, id: u64) -> bool {
        self.external.as_ref().is_some_and(|e| e.id == id && !e.active)
    }

    pub fn is_external_active(&self, id: u64) -> bool {
        self.external.as_ref().is_some_and(|e| e.id == id && e.active)
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.next.is_none()
    }
}

/// Estado compartilhado entre worker e chamadores
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub state: Mutex<SchedulerState>,
    pub changed: Condvar,
}

/// Classe de precedência da vibração em andamento
fn current_rank(vibration: &Vibration) -> u8 {
    match vibration.usage() {
        Usage::Alarm => 3,
        Usage::Ringtone => 2,
        _ if vibration.is_repeating() => 1,
        _ => 0,
    }
}

fn incoming_rank(vibration: &Vibration) -> u8 {
    match vibration.usage() {
        Usage::Alarm => 3,
        Usage::Ringtone => 2,
        _ => 0,
    }
}

/// Status de ignore quando `incoming` não pode preemptar `current`
pub(crate) fn precedence_ignore(current: &Vibration, incoming: &Vibration) -> Option<VibrationStatus> {
    if current.has_ended() || incoming.is_repeating() {
        return None;
    }
    let rank = current_rank(current);
    if rank == 0 || incoming_rank(incoming) > rank {
        return None;
    }
    Some(match current.usage() {
        Usage::Alarm => VibrationStatus::IgnoredForAlarm,
        Usage::Ringtone => VibrationStatus::IgnoredForRingtone,
        _ => VibrationStatus::IgnoredForOngoing,
    })
}

pub(crate) struct Worker {
    config: SchedulerConfig,
    handle: ActuatorHandle,
    policy: Arc<dyn VibrationPolicy>,
    shared: Arc<Shared>,
    listeners: ListenerRegistry,
    records: VibrationRecords,
    always_on: AlwaysOnRegistry,
    current: Option<Playback>,
    next: Option<Playback>,
    external: Option<ExternalSession>,
    /// SenderId da transmissão HE 2.0 admitida
    admitted_sender: Option<SenderId>,
    call_state: CallState,
}

impl Worker {
    pub fn new(
        config: SchedulerConfig,
        handle: ActuatorHandle,
        policy: Arc<dyn VibrationPolicy>,
        shared: Arc<Shared>,
        listeners: ListenerRegistry,
    ) -> Self {
        let records = VibrationRecords::new(config.history_limit, config.external_history_limit);
        Self {
            config,
            handle,
            policy,
            shared,
            listeners,
            records,
            always_on: AlwaysOnRegistry::new(),
            current: None,
            next: None,
            external: None,
            admitted_sender: None,
            call_state: CallState::Idle,
        }
    }

    pub fn run(mut self, commands: Receiver<Command>, events: Receiver<ActuatorEvent>) {
        info!("{} started", self.config.worker_name);
        self.publish();

        let mut running = true;
        while running {
            let timer = match self.deadline() {
                Some(deadline) => at(deadline),
                None => never(),
            };
            select! {
                recv(commands) -> command => match command {
                    Ok(Command::Shutdown) | Err(_) => running = false,
                    Ok(command) => self.handle(command),
                },
                recv(events) -> event => {
                    if let Ok(event) = event {
                        self.on_actuator_event(event);
                    }
                },
                recv(timer) -> _ => self.on_timer(&events),
            }
            if running {
                self.publish();
            }
        }

        self.stop_all();
        info!("{} stopped", self.config.worker_name);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Despacho de comandos
    // ═══════════════════════════════════════════════════════════════════════

    fn handle(&mut self, command: Command) {
        match command {
            Command::Vibrate { vibration, reply } => {
                let report = self.on_vibrate(vibration);
                self.respond(reply, report);
            }
            Command::Packet { pattern, reply } => {
                let disposition = self.on_packet(pattern);
                self.respond(reply, disposition);
            }
            Command::Cancel { filter, token, reply } => {
                let count = self.on_cancel(&filter, token);
                self.respond(reply, count);
            }
            Command::ScreenOff { reply } => {
                let policy = Arc::clone(&self.policy);
                let count = self.cancel_where(VibrationStatus::CancelledByScreenOff, |v| {
                    policy.should_cancel_on_screen_off(v.uid, &v.attributes)
                });
                self.respond(reply, count);
            }
            Command::SettingsChanged { reply } => {
                let count = self.on_settings_changed();
                self.respond(reply, count);
            }
            Command::CallState { state, reply } => {
                let count = self.on_call_state(state);
                self.respond(reply, count);
            }
            Command::StartExternal { external, reply } => {
                let admission = self.on_start_external(external);
                self.respond(reply, admission);
            }
            Command::ExternalTimedOut { id, reply } => {
                let activated = self.on_external_timed_out(id);
                self.respond(reply, activated);
            }
            Command::StopExternal { id, reply } => {
                let result = if self.external.as_ref().is_some_and(|s| s.id() == id) {
                    self.end_external(VibrationStatus::Finished);
                    Ok(())
                } else {
                    Err(OrchestrationError::UnknownExternal(id))
                };
                self.respond(reply, result);
            }
            Command::SetAlwaysOn { request, reply } => {
                let applied = self.on_set_always_on(request);
                self.respond(reply, applied);
            }
            Command::UpdateParams { params, token, reply } => {
                let updated = self.on_update_params(params, token);
                self.respond(reply, updated);
            }
            Command::SetMode { mode, reply } => {
                let result = self.on_set_mode(mode);
                self.respond(reply, result);
            }
            Command::Info { reply } => {
                let info = self.handle.get().ok().map(|control| control.info());
                self.respond(reply, info);
            }
            Command::Dump { reply } => {
                let dump = self.dump();
                self.respond(reply, dump);
            }
            Command::Shutdown => {}
        }
    }

    /// Publica o estado antes de responder: quem recebe a resposta já vê o snapshot novo
    fn respond<T>(&mut self, reply: Sender<T>, value: T) {
        self.publish();
        let _ = reply.send(value);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Admissão
    // ═══════════════════════════════════════════════════════════════════════

    fn admission_ignore(&self, vibration: &Vibration) -> Option<VibrationStatus> {
        if !self.policy.check_app_ops(vibration.uid, &vibration.package, &vibration.attributes) {
            return Some(VibrationStatus::IgnoredAppOps);
        }
        if self.external.is_some() {
            return Some(VibrationStatus::IgnoredForExternal);
        }
        let current = self.current.as_ref()?;
        precedence_ignore(&current.vibration, vibration)
    }

    fn on_vibrate(&mut self, vibration: Vibration) -> VibrationReport {
        let id = vibration.id;
        let mut playback = Playback::new(vibration);

        if let Some(status) = self.admission_ignore(&playback.vibration) {
            info!("vibration {} ({:?}) ignored: {:?}", id, playback.vibration.usage(), status);
            playback.vibration.end(status);
            self.retire(playback);
            return VibrationReport { id, status };
        }

        if let Some(mut replaced) = self.next.take() {
            debug!("vibration {} replaces queued {}", id, replaced.id());
            replaced.vibration.end(VibrationStatus::IgnoredSuperseded);
            self.retire(replaced);
        }
        if let Some(sender) = playback.vibration.sender {
            self.admitted_sender = Some(sender);
        }

        if self.current.is_none() {
            let status = self.start(playback);
            return VibrationReport { id, status };
        }

        // Fica em next; liberar o current promove imediatamente
        self.next = Some(playback);
        self.cancel_current(VibrationStatus::CancelledSuperseded);
        VibrationReport { id, status: self.status_of(id) }
    }

    fn start(&mut self, mut playback: Playback) -> VibrationStatus {
        let id = playback.id();
        playback.vibration.start();
        debug!("vibration {} running ({})", id, playback.vibration.effect.kind());
        self.current = Some(playback);
        self.advance();
        self.status_of(id)
    }

    fn status_of(&self, id: VibrationId) -> VibrationStatus {
        [self.current.as_ref(), self.next.as_ref()]
            .into_iter()
            .flatten()
            .find(|p| p.id() == id)
            .map(|p| p.vibration.status)
            .or_else(|| self.records.find(id).map(|info| info.status))
            .unwrap_or(VibrationStatus::Finished)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Passos, conclusão e liberação do slot
    // ═══════════════════════════════════════════════════════════════════════

    fn advance(&mut self) {
        let fallback_ms = self.config.prebaked_fallback_ms;
        let Some(playback) = self.current.as_mut() else {
            return;
        };
        let Some(step) = playback.next_step() else {
            playback.vibration.end(VibrationStatus::Finished);
            self.release_current();
            return;
        };
        let result = match self.handle.get() {
            Ok(control) => playback.dispatch(control.as_ref(), step, fallback_ms),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            self.fail_current(err);
        }
    }

    fn fail_current(&mut self, err: HapticError) {
        self.handle.reset();
        if let Some(playback) = self.current.as_mut() {
            error!("vibration {} dispatch failed: {}", playback.id(), err);
            playback.vibration.end(VibrationStatus::IgnoredErrorScheduling);
        }
        self.release_current();
    }

    /// Esvazia o slot current e entrega a vez: sessão externa pendente ou next
    fn release_current(&mut self) {
        if let Some(mut playback) = self.current.take() {
            playback.vibration.end(VibrationStatus::Finished);
            self.retire(playback);
        }
        self.activate_external();
        if self.external.is_none() {
            self.promote_next();
        }
    }

    fn promote_next(&mut self) {
        if self.current.is_some() {
            return;
        }
        if let Some(playback) = self.next.take() {
            self.start(playback);
        }
    }

    fn retire(&mut self, playback: Playback) {
        let vibration = playback.vibration;
        if vibration.sender.is_some() && vibration.sender == self.admitted_sender {
            self.admitted_sender = None;
        }
        debug!("vibration {} ended: {:?}", vibration.id, vibration.status);
        self.records.record(vibration.info());
    }

    /// Cancela o current; retorna `false` se não havia o que cancelar
    ///
    /// Passos não compilados param na hora. Um stream compilado recebe
    /// `stop()` e segura o slot até o ack do HAL ou `cancel_grace_ms`.
    fn cancel_current(&mut self, status: VibrationStatus) -> bool {
        let grace = Duration::from_millis(self.config.cancel_grace_ms);
        let Some(playback) = self.current.as_mut() else {
            return false;
        };
        if playback.stopping {
            return false;
        }
        let id = playback.id();
        playback.vibration.end(status);

        if playback.has_compiled_in_flight() {
            let stopped = match self.handle.peek() {
                Some(control) => control.stop(),
                None => Err(HapticError::HardwareUnavailable("actuator not connected".into())),
            };
            match stopped {
                Ok(()) => {
                    playback.stopping = true;
                    playback.deadline = Some(Instant::now() + grace);
                    debug!("vibration {} stopping, waiting for ack", id);
                    return true;
                }
                Err(err) => {
                    warn!("vibration {} stop failed: {}", id, err);
                    self.handle.reset();
                }
            }
        } else if let Some(control) = self.handle.peek() {
            if let Err(err) = control.off() {
                warn!("vibration {} off failed: {}", id, err);
            }
        }
        self.release_current();
        true
    }

    /// Cancela next e current que satisfazem o predicado
    fn cancel_where<F>(&mut self, status: VibrationStatus, predicate: F) -> usize
    where
        F: Fn(&Vibration) -> bool,
    {
        let mut count = 0;
        if self.next.as_ref().is_some_and(|p| predicate(&p.vibration)) {
            if let Some(mut playback) = self.next.take() {
                playback.vibration.end(status);
                self.retire(playback);
                count += 1;
            }
        }
        if self.current.as_ref().is_some_and(|p| !p.stopping && predicate(&p.vibration))
            && self.cancel_current(status)
        {
            count += 1;
        }
        if count > 0 {
            info!("cancelled {} vibrations: {:?}", count, status);
        }
        count
    }

    fn deadline(&self) -> Option<Instant> {
        self.current.as_ref().and_then(|p| p.deadline)
    }

    /// Prazo vencido: conclusões já enfileiradas contam antes do prazo
    fn on_timer(&mut self, events: &Receiver<ActuatorEvent>) {
        for event in events.try_iter() {
            self.on_actuator_event(event);
        }
        self.on_deadline();
    }

    fn on_deadline(&mut self) {
        let Some(playback) = self.current.as_mut() else {
            return;
        };
        if !playback.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return;
        }
        playback.deadline = None;
        if playback.stopping {
            warn!(
                "vibration {} got no stop ack after {}ms, releasing",
                playback.id(),
                self.config.cancel_grace_ms
            );
            self.release_current();
        } else {
            self.advance();
        }
    }

    fn on_actuator_event(&mut self, event: ActuatorEvent) {
        match event {
            ActuatorEvent::Complete(id) => {
                let Some(playback) = self.current.as_mut() else {
                    debug!("stale completion for vibration {}", id);
                    return;
                };
                if playback.id() != id {
                    debug!("stale completion for vibration {} (current {})", id, playback.id());
                    return;
                }
                if playback.stopping {
                    debug!("vibration {} stop acknowledged", id);
                    self.release_current();
                    return;
                }
                let step = playback.step;
                match step {
                    Some(StepKind::Awaiting) | Some(StepKind::Compiled) => self.advance(),
                    _ => debug!("completion during timed step of vibration {}", id),
                }
            }
            ActuatorEvent::Died => {
                warn!("actuator died, resetting handle");
                self.handle.reset();
                self.admitted_sender = None;
                if let Some(playback) = self.current.as_mut() {
                    playback.vibration.end(VibrationStatus::IgnoredErrorScheduling);
                    self.release_current();
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Pacotes HE 2.0
    // ═══════════════════════════════════════════════════════════════════════

    fn on_packet(&mut self, pattern: CompiledPattern) -> PacketDisposition {
        let sender = pattern.sender_id();
        if sender.is_none() || sender != self.admitted_sender {
            debug!("dropping stale packet from {:?} (admitted {:?})", sender, self.admitted_sender);
            return PacketDisposition::Dropped;
        }

        if let Some(queued) = self.next.as_mut() {
            if queued.vibration.sender == sender {
                queued.packets.push(pattern);
                return PacketDisposition::Forwarded(queued.id());
            }
        }

        let Some(playback) = self.current.as_mut() else {
            return PacketDisposition::Dropped;
        };
        if playback.vibration.sender != sender || playback.stopping || !playback.has_compiled_in_flight() {
            return PacketDisposition::Dropped;
        }
        let id = playback.id();
        let result = match self.handle.peek() {
            Some(control) => control.perform_compiled_pattern(&pattern, id),
            None => Err(HapticError::HardwareUnavailable("actuator not connected".into())),
        };
        match result {
            Ok(()) => PacketDisposition::Forwarded(id),
            Err(err) => {
                self.fail_current(err);
                PacketDisposition::Dropped
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Cancelamentos dirigidos por eventos
    // ═══════════════════════════════════════════════════════════════════════

    fn on_cancel(&mut self, filter: &UsageFilter, token: ClientToken) -> usize {
        let mut count = self.cancel_where(VibrationStatus::CancelledByUser, |v| {
            v.token == token && filter.matches(v.usage())
        });
        let external_matches = self
            .external
            .as_ref()
            .is_some_and(|s| s.request.token == token && filter.matches(s.request.attributes.usage));
        if external_matches {
            self.end_external(VibrationStatus::CancelledByUser);
            count += 1;
        }
        count
    }

    fn on_settings_changed(&mut self) -> usize {
        let policy = Arc::clone(&self.policy);
        let count = self.cancel_where(VibrationStatus::CancelledBySettingsUpdate, |v| {
            policy.is_muted(v.uid, &v.attributes)
        });
        if !self.always_on.is_empty() {
            let refreshed = self
                .handle
                .get()
                .and_then(|control| self.always_on.refresh(control.as_ref(), policy.as_ref()));
            if let Err(err) = refreshed {
                warn!("always-on refresh failed: {}", err);
            }
        }
        count
    }

    fn on_call_state(&mut self, state: CallState) -> usize {
        self.call_state = state;
        if !state.is_calling() {
            return 0;
        }
        self.cancel_where(VibrationStatus::CancelledBySettingsUpdate, |v| v.effect.is_compiled())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Controle externo
    // ═══════════════════════════════════════════════════════════════════════

    fn on_start_external(&mut self, external: ExternalVibration) -> ExternalAdmission {
        if let Some(session) = &self.external {
            if session.id() == external.id {
                return if session.active {
                    ExternalAdmission::Active(session.scale)
                } else {
                    ExternalAdmission::Waiting(session.scale)
                };
            }
        }

        let supported = self
            .handle
            .get()
            .map(|control| control.info().has_capability(ActuatorInfo::CAP_EXTERNAL_CONTROL))
            .unwrap_or(false);
        if !supported {
            debug!("external vibration {} rejected: no external control", external.id);
            return ExternalAdmission::Rejected;
        }
        let scale = self.policy.external_scale(&external);
        if scale == ExternalScale::Mute {
            info!("external vibration {} muted by policy", external.id);
            return ExternalAdmission::Rejected;
        }

        let handoff = self.external.as_ref().is_some_and(|s| s.active);
        if let Some(mut previous) = self.external.take() {
            previous.end(VibrationStatus::CancelledSuperseded);
            info!("external vibration {} superseded by {}", previous.id(), external.id);
            self.records.record_external(previous.info());
        }

        let mut session = ExternalSession::new(external, scale);
        if handoff {
            session.activate();
            self.external = Some(session);
            return ExternalAdmission::Active(scale);
        }

        if let Some(mut queued) = self.next.take() {
            queued.vibration.end(VibrationStatus::IgnoredForExternal);
            self.retire(queued);
        }
        self.external = Some(session);
        self.cancel_current(VibrationStatus::CancelledSuperseded);
        self.activate_external();

        match &self.external {
            Some(session) if session.active => ExternalAdmission::Active(scale),
            Some(_) => ExternalAdmission::Waiting(scale),
            None => ExternalAdmission::Rejected,
        }
    }

    /// Entrega o atuador à sessão externa pendente quando o slot esvazia
    fn activate_external(&mut self) {
        let pending = self.external.as_ref().is_some_and(|s| !s.active);
        if !pending || self.current.is_some() {
            return;
        }
        let result = self.handle.get().and_then(|control| control.set_external_control(true));
        match result {
            Ok(()) => {
                if let Some(session) = self.external.as_mut() {
                    session.activate();
                    info!("external vibration {} took control", session.id());
                }
            }
            Err(err) => {
                error!("external control handoff failed: {}", err);
                self.handle.reset();
                self.end_external(VibrationStatus::IgnoredErrorScheduling);
            }
        }
    }

    fn on_external_timed_out(&mut self, id: u64) -> bool {
        let active = self.external.as_ref().filter(|s| s.id() == id).map(|s| s.active);
        match active {
            Some(true) => true,
            Some(false) => {
                warn!("external vibration {} timed out waiting for the actuator", id);
                self.end_external(VibrationStatus::IgnoredErrorScheduling);
                false
            }
            None => false,
        }
    }

    fn end_external(&mut self, status: VibrationStatus) {
        let Some(mut session) = self.external.take() else {
            return;
        };
        if session.active {
            if let Some(control) = self.handle.peek() {
                if let Err(err) = control.set_external_control(false) {
                    warn!("leaving external control failed: {}", err);
                }
            }
        }
        session.end(status);
        info!("external vibration {} ended: {:?}", session.id(), session.status);
        self.records.record_external(session.info());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Always-on e extras do fornecedor
    // ═══════════════════════════════════════════════════════════════════════

    fn on_set_always_on(&mut self, request: AlwaysOnRequest) -> bool {
        let control = match self.handle.get() {
            Ok(control) => control,
            Err(err) => {
                warn!("always-on {} not applied: {}", request.id, err);
                return false;
            }
        };
        if !control.info().has_capability(ActuatorInfo::CAP_ALWAYS_ON_CONTROL) {
            debug!("always-on {} rejected: no always-on control", request.id);
            return false;
        }
        let id = request.id;
        match self.always_on.apply(request, control.as_ref(), self.policy.as_ref()) {
            Ok(()) => true,
            Err(err) => {
                warn!("always-on {} failed: {}", id, err);
                false
            }
        }
    }

    fn on_update_params(&mut self, params: PatternParams, token: Option<ClientToken>) -> bool {
        let Some(playback) = self.current.as_ref() else {
            return false;
        };
        if !playback.has_compiled_in_flight() || playback.stopping {
            return false;
        }
        if token.is_some_and(|token| token != playback.vibration.token) {
            return false;
        }
        match self.handle.peek() {
            Some(control) => match control.update_pattern_params(params) {
                Ok(()) => true,
                Err(err) => {
                    warn!("pattern parameter update failed: {}", err);
                    false
                }
            },
            None => false,
        }
    }

    fn on_set_mode(&mut self, mode: i32) -> OrchestrationResult<()> {
        if !self.cancel_current(VibrationStatus::CancelledBySettingsUpdate) {
            self.handle.get()?.stop()?;
        }
        self.handle.get()?.set_haptic_param(&[1, mode])?;
        info!("vibration mode set to {}", mode);
        Ok(())
    }

    fn dump(&self) -> VibrationDump {
        VibrationDump {
            current: self.current.as_ref().map(|p| p.vibration.info()),
            next: self.next.as_ref().map(|p| p.vibration.info()),
            external: self.external.as_ref().map(|s| s.info()),
            history: self.records.all(),
            external_history: self.records.external(),
            always_on: self.always_on.info(),
            call_state: self.call_state,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Publicação e encerramento
    // ═══════════════════════════════════════════════════════════════════════

    fn publish(&self) {
        let vibrating = self.current.is_some() || self.external.as_ref().is_some_and(|s| s.active);
        {
            let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.current = self.current.as_ref().map(|p| p.vibration.info());
            state.next = self.next.as_ref().map(|p| p.vibration.info());
            state.external = self.external.as_ref().map(|s| s.info());
            state.vibrating = vibrating;
            state.running = true;
        }
        self.shared.changed.notify_all();
        if let Err(err) = self.listeners.notify(vibrating) {
            warn!("listener notification failed: {}", err);
        }
    }

    fn stop_all(&mut self) {
        if let Some(mut queued) = self.next.take() {
            queued.vibration.end(VibrationStatus::CancelledByUser);
            self.retire(queued);
        }
        if let Some(mut playback) = self.current.take() {
            if let Some(control) = self.handle.peek() {
                let stopped = if playback.has_compiled_in_flight() { control.stop() } else { control.off() };
                if let Err(err) = stopped {
                    warn!("stopping vibration {} on shutdown failed: {}", playback.id(), err);
                }
            }
            playback.vibration.end(VibrationStatus::CancelledByUser);
            self.retire(playback);
        }
        self.end_external(VibrationStatus::CancelledByUser);

        {
            let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = SchedulerState::default();
        }
        self.shared.changed.notify_all();
        if let Err(err) = self.listeners.notify(false) {
            warn!("listener notification failed: {}", err);
        }
    }
}
