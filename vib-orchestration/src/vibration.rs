//! Vibração: pedido admitido pelo scheduler e seu ciclo de vida
//!
//! Uma [`Vibration`] nasce `Pending`, vira `Running` ao ser despachada e
//! termina em um status terminal. Status terminais nunca são sobrescritos.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use vib_core::{
    ClientToken, Effect, SenderId, Usage, VibrationAttributes, VibrationId, VibrationStatus,
};

/// Milissegundos desde a época Unix
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Pedido de vibração de um cliente
#[derive(Debug, Clone)]
pub struct VibrationRequest {
    pub uid: i32,
    pub package: String,
    pub token: ClientToken,
    pub attributes: VibrationAttributes,
    pub effect: Effect,
}

impl VibrationRequest {
    pub fn new(uid: i32, package: impl Into<String>, token: ClientToken, effect: Effect) -> Self {
        Self {
            uid,
            package: package.into(),
            token,
            attributes: VibrationAttributes::default(),
            effect,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.attributes.usage = usage;
        self
    }

    pub fn with_attributes(mut self, attributes: VibrationAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Vibração admitida
#[derive(Debug, Clone)]
pub struct Vibration {
    pub id: VibrationId,
    pub uid: i32,
    pub package: String,
    pub token: ClientToken,
    pub attributes: VibrationAttributes,
    pub effect: Effect,
    pub status: VibrationStatus,
    pub created_ms: u64,
    pub ended_ms: Option<u64>,
    /// SenderId do primeiro pacote HE 2.0
    pub sender: Option<SenderId>,
}

impl Vibration {
    pub fn new(id: VibrationId, request: VibrationRequest) -> Self {
        let sender = match &request.effect {
            Effect::Compiled(pattern) => pattern.sender_id(),
            _ => None,
        };
        Self {
            id,
            uid: request.uid,
            package: request.package,
            token: request.token,
            attributes: request.attributes,
            effect: request.effect,
            status: VibrationStatus::Pending,
            created_ms: now_ms(),
            ended_ms: None,
            sender,
        }
    }

    pub fn usage(&self) -> Usage {
        self.attributes.usage
    }

    pub fn is_repeating(&self) -> bool {
        self.effect.is_repeating()
    }

    pub fn has_ended(&self) -> bool {
        self.status.is_terminal()
    }

    /// Marca como despachada; ignorado se já terminou
    pub fn start(&mut self) {
        if !self.has_ended() {
            self.status = VibrationStatus::Running;
        }
    }

    /// Encerra com o status dado; retorna `false` se já havia terminado
    pub fn end(&mut self, status: VibrationStatus) -> bool {
        if self.has_ended() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.ended_ms = Some(now_ms());
        true
    }

    pub fn info(&self) -> VibrationInfo {
        VibrationInfo {
            id: self.id,
            uid: self.uid,
            package: self.package.clone(),
            usage: self.usage(),
            status: self.status,
            effect: self.effect.kind().to_string(),
            repeating: self.is_repeating(),
            created_ms: self.created_ms,
            ended_ms: self.ended_ms,
        }
    }
}

/// Snapshot somente-leitura de uma vibração
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibrationInfo {
    pub id: VibrationId,
    pub uid: i32,
    pub package: String,
    pub usage: Usage,
    pub status: VibrationStatus,
    pub effect: String,
    pub repeating: bool,
    pub created_ms: u64,
    pub ended_ms: Option<u64>,
}

/// Resposta de `vibrate()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibrationReport {
    pub id: VibrationId,
    pub status: VibrationStatus,
}

/// Destino de um pacote de continuação
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDisposition {
    /// Entregue ao stream da vibração indicada
    Forwarded(VibrationId),
    /// Pacote obsoleto ou sem destino; descartado sem mudar estado
    Dropped,
}

/// Escala aplicada a uma vibração controlada externamente
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExternalScale {
    Mute,
    VeryLow,
    Low,
    #[default]
    None,
    High,
    VeryHigh,
}

impl ExternalScale {
    pub fn as_raw(&self) -> i32 {
        match self {
            ExternalScale::Mute => -100,
            ExternalScale::VeryLow => -2,
            ExternalScale::Low => -1,
            ExternalScale::None => 0,
            ExternalScale::High => 1,
            ExternalScale::VeryHigh => 2,
        }
    }
}

/// Pedido de controle externo do atuador
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalVibration {
    pub id: u64,
    pub uid: i32,
    pub package: String,
    pub token: ClientToken,
    pub attributes: VibrationAttributes,
}

impl ExternalVibration {
    pub fn new(id: u64, uid: i32, package: impl Into<String>, token: ClientToken) -> Self {
        Self {
            id,
            uid,
            package: package.into(),
            token,
            attributes: VibrationAttributes::new(Usage::Media),
        }
    }
}

/// Sessão de controle externo
#[derive(Debug, Clone)]
pub(crate) struct ExternalSession {
    pub request: ExternalVibration,
    pub scale: ExternalScale,
    pub status: VibrationStatus,
    /// Controle externo já entregue ao atuador
    pub active: bool,
    pub created_ms: u64,
    pub ended_ms: Option<u64>,
}

impl ExternalSession {
    pub fn new(request: ExternalVibration, scale: ExternalScale) -> Self {
        Self {
            request,
            scale,
            status: VibrationStatus::Pending,
            active: false,
            created_ms: now_ms(),
            ended_ms: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.request.id
    }

    pub fn activate(&mut self) {
        self.active = true;
        self.status = VibrationStatus::Running;
    }

    pub fn end(&mut self, status: VibrationStatus) {
        if !self.status.is_terminal() {
            self.status = status;
            self.ended_ms = Some(now_ms());
        }
        self.active = false;
    }

    pub fn info(&self) -> ExternalInfo {
        ExternalInfo {
            id: self.request.id,
            uid: self.request.uid,
            package: self.request.package.clone(),
            usage: self.request.attributes.usage,
            scale: self.scale,
            status: self.status,
            active: self.active,
            created_ms: self.created_ms,
            ended_ms: self.ended_ms,
        }
    }
}

/// Snapshot de uma sessão externa
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalInfo {
    pub id: u64,
    pub uid: i32,
    pub package: String,
    pub usage: Usage,
    pub scale: ExternalScale,
    pub status: VibrationStatus,
    pub active: bool,
    pub created_ms: u64,
    pub ended_ms: Option<u64>,
}
