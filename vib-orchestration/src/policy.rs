//! Política de vibração: app-ops, configurações e tela desligada
//!
//! O scheduler consulta a política antes da precedência e sempre que um
//! evento externo (tela, configurações) pode cancelar vibrações.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use vib_core::{Usage, VibrationAttributes};

use crate::vibration::{ExternalScale, ExternalVibration};

/// UID do sistema
pub const SYSTEM_UID: i32 = 1000;

/// Decisões de política consultadas pelo worker
pub trait VibrationPolicy: Send + Sync {
    /// `false` → `IgnoredAppOps`
    fn check_app_ops(&self, _uid: i32, _package: &str, _attributes: &VibrationAttributes) -> bool {
        true
    }

    /// Configurações atuais silenciam este uso
    fn is_muted(&self, _uid: i32, _attributes: &VibrationAttributes) -> bool {
        false
    }

    fn should_cancel_on_screen_off(&self, uid: i32, attributes: &VibrationAttributes) -> bool {
        if uid == SYSTEM_UID {
            return false;
        }
        !matches!(
            attributes.usage,
            Usage::Accessibility | Usage::PhysicalEmulation | Usage::HardwareFeedback
        )
    }

    /// Escala de uma sessão externa; `Mute` rejeita a sessão
    fn external_scale(&self, external: &ExternalVibration) -> ExternalScale {
        if self.check_app_ops(external.uid, &external.package, &external.attributes) {
            ExternalScale::None
        } else {
            ExternalScale::Mute
        }
    }

    /// Veto de efeitos always-on
    fn allow_always_on(&self, uid: i32, package: &str, attributes: &VibrationAttributes) -> bool {
        self.check_app_ops(uid, package, attributes) && !self.is_muted(uid, attributes)
    }
}

/// Política permissiva
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPolicy;

impl VibrationPolicy for DefaultPolicy {}

#[derive(Debug, Default)]
struct SettingsState {
    muted: HashSet<Usage>,
    denied_uids: HashSet<i32>,
}

/// Política dirigida por configurações mutáveis
///
/// Usos silenciados são rejeitados na admissão e cancelados em
/// `on_settings_changed`, exceto com `FLAG_BYPASS_INTERRUPTION_POLICY`.
#[derive(Debug, Default)]
pub struct SettingsPolicy {
    state: Mutex<SettingsState>,
}

impl SettingsPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SettingsState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn mute_usage(&self, usage: Usage) {
        self.with_state(|s| s.muted.insert(usage));
    }

    pub fn unmute_usage(&self, usage: Usage) {
        self.with_state(|s| s.muted.remove(&usage));
    }

    pub fn deny_uid(&self, uid: i32) {
        self.with_state(|s| s.denied_uids.insert(uid));
    }

    pub fn allow_uid(&self, uid: i32) {
        self.with_state(|s| s.denied_uids.remove(&uid));
    }
}

impl VibrationPolicy for SettingsPolicy {
    fn check_app_ops(&self, uid: i32, _package: &str, attributes: &VibrationAttributes) -> bool {
        !self.with_state(|s| s.denied_uids.contains(&uid)) && !self.is_muted(uid, attributes)
    }

    fn is_muted(&self, _uid: i32, attributes: &VibrationAttributes) -> bool {
        if attributes.is_flag_set(VibrationAttributes::FLAG_BYPASS_INTERRUPTION_POLICY) {
            return false;
        }
        self.with_state(|s| s.muted.contains(&attributes.usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vib_core::ClientToken;

    #[test]
    fn test_default_screen_off_rules() {
        let policy = DefaultPolicy;
        assert!(policy.should_cancel_on_screen_off(10001, &VibrationAttributes::new(Usage::Touch)));
        assert!(!policy.should_cancel_on_screen_off(10001, &VibrationAttributes::new(Usage::Accessibility)));
        assert!(!policy.should_cancel_on_screen_off(10001, &VibrationAttributes::new(Usage::HardwareFeedback)));
        assert!(!policy.should_cancel_on_screen_off(SYSTEM_UID, &VibrationAttributes::new(Usage::Touch)));
    }

    #[test]
    fn test_settings_mute_and_bypass() {
        let policy = SettingsPolicy::new();
        let ringtone = VibrationAttributes::new(Usage::Ringtone);
        assert!(!policy.is_muted(1, &ringtone));
        policy.mute_usage(Usage::Ringtone);
        assert!(policy.is_muted(1, &ringtone));
        assert!(!policy.check_app_ops(1, "p", &ringtone));

        let bypass = ringtone.with_flags(VibrationAttributes::FLAG_BYPASS_INTERRUPTION_POLICY);
        assert!(!policy.is_muted(1, &bypass));
        policy.unmute_usage(Usage::Ringtone);
        assert!(policy.check_app_ops(1, "p", &ringtone));
    }

    #[test]
    fn test_denied_uid_mutes_external() {
        let policy = SettingsPolicy::new();
        policy.deny_uid(42);
        let external = ExternalVibration::new(1, 42, "media", ClientToken(1));
        assert_eq!(policy.external_scale(&external), ExternalScale::Mute);
        policy.allow_uid(42);
        assert_eq!(policy.external_scale(&external), ExternalScale::None);
    }
}
