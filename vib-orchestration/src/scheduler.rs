//! Scheduler de arbitragem de vibração
//!
//! [`VibrationScheduler`] é a fachada clonável: valida pedidos no thread do
//! chamador, envia comandos ao worker e espera a resposta. Só o worker
//! emite comandos ao atuador.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, unbounded};
use tracing::{debug, warn};
use vib_actuator::ActuatorHandle;
use vib_core::{
    ActuatorInfo, ActuatorProvider, CallState, ClientToken, CompiledPattern, CompletionSink, Effect,
    HapticError, PatternParams, UsageFilter,
};

use crate::always_on::AlwaysOnRequest;
use crate::config::SchedulerConfig;
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::listeners::{ListenerId, ListenerRegistry};
use crate::policy::{DefaultPolicy, VibrationPolicy};
use crate::records::VibrationDump;
use crate::vibration::{
    ExternalInfo, ExternalScale, ExternalVibration, PacketDisposition, Vibration, VibrationInfo,
    VibrationReport, VibrationRequest,
};
use crate::worker::{Command, ExternalAdmission, SchedulerState, Shared, Worker};

struct SchedulerInner {
    config: SchedulerConfig,
    commands: Sender<Command>,
    shared: Arc<Shared>,
    listeners: ListenerRegistry,
    vibration_ids: AtomicU64,
    sequence: AtomicI32,
    tokens: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerInner {
    fn stop_worker(&self) {
        let handle = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(handle) = handle else {
            return;
        };
        let _ = self.commands.send(Command::Shutdown);
        // O último clone pode cair dentro de um callback do próprio worker
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!("{} panicked", self.config.worker_name);
        }
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

/// Scheduler de vibração
///
/// Clones compartilham o mesmo worker; o worker para em `shutdown()` ou
/// quando o último clone é descartado.
#[derive(Clone)]
pub struct VibrationScheduler {
    inner: Arc<SchedulerInner>,
}

impl VibrationScheduler {
    /// Cria o scheduler e inicia o worker
    pub fn new(
        provider: Arc<dyn ActuatorProvider>,
        policy: Arc<dyn VibrationPolicy>,
        config: SchedulerConfig,
    ) -> OrchestrationResult<Self> {
        config.validate()?;

        let (commands, receiver) = unbounded();
        let (sink, events) = CompletionSink::channel();
        let shared = Arc::new(Shared::default());
        let listeners = ListenerRegistry::new();
        let worker = Worker::new(
            config.clone(),
            ActuatorHandle::new(provider, sink),
            policy,
            Arc::clone(&shared),
            listeners.clone(),
        );

        let handle = thread::Builder::new()
            .name(config.worker_name.clone())
            .spawn(move || worker.run(receiver, events))
            .map_err(|e| OrchestrationError::WorkerStopped(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(SchedulerInner {
                config,
                commands,
                shared,
                listeners,
                vibration_ids: AtomicU64::new(1),
                sequence: AtomicI32::new(1),
                tokens: AtomicU64::new(1),
                worker: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Política permissiva e configuração padrão
    pub fn with_provider(provider: Arc<dyn ActuatorProvider>) -> OrchestrationResult<Self> {
        Self::new(provider, Arc::new(DefaultPolicy), SchedulerConfig::default())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    fn request<R>(&self, build: impl FnOnce(Sender<R>) -> Command) -> OrchestrationResult<R> {
        let (reply, response) = bounded(1);
        self.inner
            .commands
            .send(build(reply))
            .map_err(|_| OrchestrationError::WorkerStopped("command queue closed".into()))?;
        response
            .recv()
            .map_err(|_| OrchestrationError::WorkerStopped("worker dropped the request".into()))
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Pedidos de vibração
    // ═══════════════════════════════════════════════════════════════════════

    /// Admite um pedido; o status retornado é o status no momento da admissão
    ///
    /// Pacotes HE 2.0 de continuação são recusados com `MalformedStructure`:
    /// eles entram por [`submit_packet`](Self::submit_packet).
    pub fn vibrate(&self, request: VibrationRequest) -> OrchestrationResult<VibrationReport> {
        request.effect.validate()?;
        if let Effect::Compiled(pattern) = &request.effect {
            if pattern.is_continuation() {
                return Err(HapticError::MalformedStructure(
                    "continuation packet submitted as a new vibration".into(),
                )
                .into());
            }
        }
        let id = self.inner.vibration_ids.fetch_add(1, Ordering::SeqCst);
        let vibration = Vibration::new(id, request);
        debug!("vibration {} requested by {} ({:?})", id, vibration.package, vibration.usage());
        self.request(|reply| Command::Vibrate { vibration, reply })
    }

    /// Entrega um pacote de continuação ao stream admitido
    pub fn submit_packet(&self, pattern: CompiledPattern) -> OrchestrationResult<PacketDisposition> {
        self.request(|reply| Command::Packet { pattern, reply })
    }

    /// Cancela vibrações do token que passam pelo filtro
    pub fn cancel_vibrate(&self, filter: UsageFilter, token: ClientToken) -> OrchestrationResult<usize> {
        self.request(|reply| Command::Cancel { filter, token, reply })
    }

    pub fn on_screen_off(&self) -> OrchestrationResult<usize> {
        self.request(|reply| Command::ScreenOff { reply })
    }

    pub fn on_settings_changed(&self) -> OrchestrationResult<usize> {
        self.request(|reply| Command::SettingsChanged { reply })
    }

    pub fn on_call_state_changed(&self, state: CallState) -> OrchestrationResult<usize> {
        self.request(|reply| Command::CallState { state, reply })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Controle externo
    // ═══════════════════════════════════════════════════════════════════════

    /// Inicia sessão de controle externo
    ///
    /// Se uma vibração de app ocupa o atuador, espera (até `cancel_wait_ms`)
    /// o slot esvaziar; no timeout a sessão termina e o erro é
    /// `SchedulingTimeout`.
    pub fn start_external(&self, external: ExternalVibration) -> OrchestrationResult<ExternalScale> {
        let id = external.id;
        match self.request(|reply| Command::StartExternal { external, reply })? {
            ExternalAdmission::Rejected => Ok(ExternalScale::Mute),
            ExternalAdmission::Active(scale) => Ok(scale),
            ExternalAdmission::Waiting(scale) => self.await_external(id, scale),
        }
    }

    fn await_external(&self, id: u64, scale: ExternalScale) -> OrchestrationResult<ExternalScale> {
        let wait_ms = self.inner.config.cancel_wait_ms;
        let shared = &self.inner.shared;
        let (active, pending, running) = {
            let state = shared.state.lock()?;
            let (state, _) = shared.changed.wait_timeout_while(
                state,
                Duration::from_millis(wait_ms),
                |s| s.running && s.is_external_pending(id),
            )?;
            (state.is_external_active(id), state.is_external_pending(id), state.running)
        };

        if active {
            return Ok(scale);
        }
        if !running {
            return Err(OrchestrationError::WorkerStopped("stopped during external handoff".into()));
        }
        if !pending {
            // Sessão substituída ou handoff falhou
            return Ok(ExternalScale::Mute);
        }
        if self.request(|reply| Command::ExternalTimedOut { id, reply })? {
            return Ok(scale);
        }
        Err(HapticError::SchedulingTimeout(wait_ms).into())
    }

    pub fn stop_external(&self, id: u64) -> OrchestrationResult<()> {
        self.request(|reply| Command::StopExternal { id, reply })?
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Always-on e extras do fornecedor
    // ═══════════════════════════════════════════════════════════════════════

    /// Registra, sobrescreve ou remove um always-on; `false` sem suporte do HAL
    pub fn set_always_on(&self, request: AlwaysOnRequest) -> OrchestrationResult<bool> {
        self.request(|reply| Command::SetAlwaysOn { request, reply })
    }

    /// Atualiza o stream compilado em andamento
    pub fn update_pattern_params(&self, params: PatternParams) -> OrchestrationResult<bool> {
        self.request(|reply| Command::UpdateParams { params, token: None, reply })
    }

    /// Como `update_pattern_params`, só se o stream pertence ao token
    pub fn update_pattern_params_for(
        &self,
        token: ClientToken,
        params: PatternParams,
    ) -> OrchestrationResult<bool> {
        self.request(|reply| Command::UpdateParams { params, token: Some(token), reply })
    }

    /// Para a reprodução e envia o parâmetro DRC `[1, mode]`
    pub fn set_vibration_mode(&self, mode: i32) -> OrchestrationResult<()> {
        self.request(|reply| Command::SetMode { mode, reply })?
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Consultas
    // ═══════════════════════════════════════════════════════════════════════

    pub fn is_vibrating(&self) -> bool {
        self.state().vibrating
    }

    pub fn current(&self) -> Option<VibrationInfo> {
        self.state().current.clone()
    }

    pub fn next(&self) -> Option<VibrationInfo> {
        self.state().next.clone()
    }

    pub fn external(&self) -> Option<ExternalInfo> {
        self.state().external.clone()
    }

    /// Informações do HAL; `None` se indisponível
    pub fn actuator_info(&self) -> OrchestrationResult<Option<ActuatorInfo>> {
        self.request(|reply| Command::Info { reply })
    }

    pub fn dump(&self) -> OrchestrationResult<VibrationDump> {
        self.request(|reply| Command::Dump { reply })
    }

    /// Espera os slots esvaziarem; `false` no timeout
    pub fn wait_idle(&self, timeout: Duration) -> OrchestrationResult<bool> {
        let shared = &self.inner.shared;
        let state = shared.state.lock()?;
        let (state, _) =
            shared.changed.wait_timeout_while(state, timeout, |s| s.running && !s.is_idle())?;
        Ok(state.is_idle())
    }

    /// Próximo número de sequência para SenderId
    pub fn next_sequence(&self) -> i32 {
        self.inner.sequence.fetch_add(1, Ordering::SeqCst)
    }

    pub fn issue_token(&self) -> ClientToken {
        ClientToken(self.inner.tokens.fetch_add(1, Ordering::SeqCst))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Listeners e ciclo de vida
    // ═══════════════════════════════════════════════════════════════════════

    /// Registra observador do estado "vibrando"; recebe o estado atual na hora
    pub fn register_listener<F>(&self, listener: F) -> OrchestrationResult<ListenerId>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner.listeners.register(listener)
    }

    pub fn unregister_listener(&self, id: ListenerId) -> OrchestrationResult<bool> {
        self.inner.listeners.unregister(id)
    }

    /// Para o worker; vibrações pendentes terminam `CancelledByUser`
    pub fn shutdown(&self) {
        self.inner.stop_worker();
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }
}

impl std::fmt::Debug for VibrationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("VibrationScheduler")
            .field("worker", &self.inner.config.worker_name)
            .field("current", &state.current.as_ref().map(|v| v.id))
            .field("next", &state.next.as_ref().map(|v| v.id))
            .field("vibrating", &state.vibrating)
            .finish()
    }
}
