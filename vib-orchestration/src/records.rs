//! Histórico limitado de vibrações encerradas

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use vib_core::{CallState, Usage, VibrationId};

use crate::always_on::AlwaysOnInfo;
use crate::vibration::{ExternalInfo, VibrationInfo};

/// Diagnóstico completo do scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibrationDump {
    pub current: Option<VibrationInfo>,
    pub next: Option<VibrationInfo>,
    pub external: Option<ExternalInfo>,
    pub history: Vec<VibrationInfo>,
    pub external_history: Vec<ExternalInfo>,
    pub always_on: Vec<AlwaysOnInfo>,
    pub call_state: CallState,
}

/// Histórico por uso + sessões externas
#[derive(Debug, Clone)]
pub struct VibrationRecords {
    limit: usize,
    external_limit: usize,
    by_usage: BTreeMap<Usage, VecDeque<VibrationInfo>>,
    external: VecDeque<ExternalInfo>,
}

impl VibrationRecords {
    pub fn new(limit: usize, external_limit: usize) -> Self {
        Self {
            limit,
            external_limit,
            by_usage: BTreeMap::new(),
            external: VecDeque::new(),
        }
    }

    pub fn record(&mut self, info: VibrationInfo) {
        let entries = self.by_usage.entry(info.usage).or_default();
        entries.push_back(info);
        while entries.len() > self.limit {
            entries.pop_front();
        }
    }

    pub fn record_external(&mut self, info: ExternalInfo) {
        self.external.push_back(info);
        while self.external.len() > self.external_limit {
            self.external.pop_front();
        }
    }

    pub fn recent(&self, usage: Usage) -> Vec<VibrationInfo> {
        self.by_usage
            .get(&usage)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn find(&self, id: VibrationId) -> Option<&VibrationInfo> {
        self.by_usage.values().flat_map(|entries| entries.iter()).find(|info| info.id == id)
    }

    /// Todas as vibrações, ordenadas por ID
    pub fn all(&self) -> Vec<VibrationInfo> {
        let mut all: Vec<VibrationInfo> =
            self.by_usage.values().flat_map(|entries| entries.iter().cloned()).collect();
        all.sort_by_key(|info| info.id);
        all
    }

    pub fn external(&self) -> Vec<ExternalInfo> {
        self.external.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_usage.values().map(|entries| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vib_core::VibrationStatus;

    fn info(id: VibrationId, usage: Usage) -> VibrationInfo {
        VibrationInfo {
            id,
            uid: 1,
            package: "p".into(),
            usage,
            status: VibrationStatus::Finished,
            effect: "one-shot".into(),
            repeating: false,
            created_ms: 0,
            ended_ms: Some(1),
        }
    }

    #[test]
    fn test_bounded_per_usage() {
        let mut records = VibrationRecords::new(2, 2);
        for id in 1..=3 {
            records.record(info(id, Usage::Touch));
        }
        records.record(info(4, Usage::Alarm));
        let touch: Vec<_> = records.recent(Usage::Touch).iter().map(|i| i.id).collect();
        assert_eq!(touch, vec![2, 3]);
        assert_eq!(records.len(), 3);
        assert!(records.find(1).is_none());
        assert!(records.find(4).is_some());
    }

    #[test]
    fn test_all_sorted_by_id() {
        let mut records = VibrationRecords::new(5, 5);
        records.record(info(5, Usage::Alarm));
        records.record(info(2, Usage::Touch));
        let ids: Vec<_> = records.all().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 5]);
    }
}
