//! Per-person violation state.
//!
//! One `PersonState` per track id, created lazily on first sight. Holds the
//! frozen-once-resolved identity, the single confirmation counter shared
//! across all violation kinds, the current violation set, and the per-kind
//! last-alert timestamps that drive cooldown.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, SystemTime};

use crate::faceid::UNKNOWN_IDENTITY;

#[derive(Debug, Default)]
pub struct PersonState {
    name: Option<String>,
    confirm_count: u32,
    current_violations: BTreeSet<String>,
    last_alerts: HashMap<String, SystemTime>,
}

impl PersonState {
    pub fn is_resolved(&self) -> bool {
        self.name.is_some()
    }

    /// Freeze the resolved identity. Later calls are ignored; resolution
    /// happens at most once per track.
    pub fn resolve(&mut self, name: String) {
        if self.name.is_none() {
            self.name = Some(name);
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_IDENTITY)
    }

    pub fn confirm_count(&self) -> u32 {
        self.confirm_count
    }

    pub fn current_violations(&self) -> &BTreeSet<String> {
        &self.current_violations
    }

    /// Record one frame's observation.
    ///
    /// A violating frame increments the counter (saturating at
    /// `confirm_frames`) and replaces the current set with this frame's set.
    /// A clean frame decrements (floor 0); the set is cleared only once the
    /// counter reaches exactly 0.
    pub fn observe(&mut self, violations: BTreeSet<String>, confirm_frames: u32) {
        if violations.is_empty() {
            self.confirm_count = self.confirm_count.saturating_sub(1);
            if self.confirm_count == 0 {
                self.current_violations.clear();
            }
        } else {
            self.confirm_count = (self.confirm_count + 1).min(confirm_frames);
            self.current_violations = violations;
        }
    }

    pub fn is_confirmed(&self, confirm_frames: u32) -> bool {
        self.confirm_count >= confirm_frames
    }

    /// Close out a confirmed cycle: return the violation kinds whose
    /// cooldown has elapsed, stamp their last-alert time, and reset the
    /// counter unconditionally so the next alert needs full re-confirmation
    /// even when nothing was eligible this round.
    pub fn alert_kinds(&mut self, now: SystemTime, cooldown: Duration) -> Vec<String> {
        let mut eligible = Vec::new();
        for kind in &self.current_violations {
            let open = match self.last_alerts.get(kind) {
                Some(last) => now
                    .duration_since(*last)
                    .map(|elapsed| elapsed > cooldown)
                    .unwrap_or(false),
                None => true,
            };
            if open {
                eligible.push(kind.clone());
            }
        }
        for kind in &eligible {
            self.last_alerts.insert(kind.clone(), now);
        }
        self.confirm_count = 0;
        eligible
    }
}

/// Get-or-insert-default map of person states, keyed by track id.
#[derive(Default)]
pub struct PersonStateMap {
    states: HashMap<u64, PersonState>,
}

impl PersonStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert(&mut self, track_id: u64) -> &mut PersonState {
        self.states.entry(track_id).or_default()
    }

    pub fn remove(&mut self, track_id: u64) -> Option<PersonState> {
        self.states.remove(&track_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
