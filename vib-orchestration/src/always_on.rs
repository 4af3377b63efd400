//! Registro de efeitos always-on
//!
//! Efeitos residentes no hardware, por canal, independentes dos slots
//! current/next. Atualizações passam pelo worker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vib_core::{ActuatorControl, HapticResult, PrebakedEffect, VibrationAttributes};

use crate::policy::VibrationPolicy;

/// Pedido de registro (ou remoção, com `effects = None`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlwaysOnRequest {
    pub id: i32,
    pub uid: i32,
    pub package: String,
    pub attributes: VibrationAttributes,
    /// Efeito por canal
    pub effects: Option<BTreeMap<u8, PrebakedEffect>>,
}

impl AlwaysOnRequest {
    pub fn set(id: i32, uid: i32, package: impl Into<String>, effects: BTreeMap<u8, PrebakedEffect>) -> Self {
        Self {
            id,
            uid,
            package: package.into(),
            attributes: VibrationAttributes::default(),
            effects: Some(effects),
        }
    }

    pub fn clear(id: i32, uid: i32, package: impl Into<String>) -> Self {
        Self {
            id,
            uid,
            package: package.into(),
            attributes: VibrationAttributes::default(),
            effects: None,
        }
    }
}

#[derive(Debug, Clone)]
struct AlwaysOnEntry {
    uid: i32,
    package: String,
    attributes: VibrationAttributes,
    effects: BTreeMap<u8, PrebakedEffect>,
    enabled: bool,
}

/// Snapshot de uma entrada
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlwaysOnInfo {
    pub id: i32,
    pub uid: i32,
    pub package: String,
    pub channels: Vec<u8>,
    pub enabled: bool,
}

#[derive(Debug, Default)]
pub struct AlwaysOnRegistry {
    entries: BTreeMap<i32, AlwaysOnEntry>,
}

impl AlwaysOnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aplica o pedido no atuador e no registro
    ///
    /// O registro só muda depois que o hardware aceitou tudo; em falha a
    /// entrada anterior continua valendo e `clear` ainda alcança seus canais.
    pub fn apply(
        &mut self,
        request: AlwaysOnRequest,
        control: &dyn ActuatorControl,
        policy: &dyn VibrationPolicy,
    ) -> HapticResult<()> {
        let id = request.id;
        let Some(effects) = request.effects else {
            if let Some(previous) = self.entries.get(&id) {
                for channel in previous.effects.keys() {
                    control.always_on_disable(*channel, id)?;
                }
                self.entries.remove(&id);
                debug!("always-on {} removed", id);
            }
            return Ok(());
        };

        if let Some(previous) = self.entries.get(&id) {
            for channel in previous.effects.keys().filter(|c| !effects.contains_key(*c)) {
                control.always_on_disable(*channel, id)?;
            }
        }

        let mut entry = AlwaysOnEntry {
            uid: request.uid,
            package: request.package,
            attributes: request.attributes,
            effects,
            enabled: false,
        };
        if let Err(err) = Self::sync(id, &mut entry, control, policy) {
            self.rollback(id, entry, control);
            return Err(err);
        }
        self.entries.insert(id, entry);
        Ok(())
    }

    /// Desfaz os canais novos de um `set` que falhou
    ///
    /// Canal que não pôde ser desligado continua rastreado sob o mesmo id.
    fn rollback(&mut self, id: i32, failed: AlwaysOnEntry, control: &dyn ActuatorControl) {
        for (channel, effect) in failed.effects {
            if self.entries.get(&id).is_some_and(|e| e.effects.contains_key(&channel)) {
                continue;
            }
            if control.always_on_disable(channel, id).is_ok() {
                continue;
            }
            warn!("always-on {} channel {} may still be enabled, keeping it tracked", id, channel);
            self.entries
                .entry(id)
                .or_insert_with(|| AlwaysOnEntry {
                    uid: failed.uid,
                    package: failed.package.clone(),
                    attributes: failed.attributes.clone(),
                    effects: BTreeMap::new(),
                    enabled: false,
                })
                .effects
                .insert(channel, effect);
        }
    }

    /// Reavalia todas as entradas contra a política atual
    ///
    /// Uma entrada com falha não impede as demais; devolve o primeiro erro.
    pub fn refresh(&mut self, control: &dyn ActuatorControl, policy: &dyn VibrationPolicy) -> HapticResult<()> {
        let mut first_error = None;
        for (id, entry) in self.entries.iter_mut() {
            if let Err(err) = Self::sync(*id, entry, control, policy) {
                warn!("always-on {} refresh failed: {}", id, err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn sync(
        id: i32,
        entry: &mut AlwaysOnEntry,
        control: &dyn ActuatorControl,
        policy: &dyn VibrationPolicy,
    ) -> HapticResult<()> {
        let allowed = policy.allow_always_on(entry.uid, &entry.package, &entry.attributes);
        if allowed {
            for (channel, effect) in &entry.effects {
                control.always_on_enable(*channel, id, effect)?;
            }
        } else {
            if entry.enabled {
                warn!("always-on {} vetoed by policy", id);
            }
            for channel in entry.effects.keys() {
                control.always_on_disable(*channel, id)?;
            }
        }
        entry.enabled = allowed;
        Ok(())
    }

    pub fn contains(&self, id: i32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn info(&self) -> Vec<AlwaysOnInfo> {
        self.entries
            .iter()
            .map(|(id, entry)| AlwaysOnInfo {
                id: *id,
                uid: entry.uid,
                package: entry.package.clone(),
                channels: entry.effects.keys().copied().collect(),
                enabled: entry.enabled,
            })
            .collect()
    }
}
