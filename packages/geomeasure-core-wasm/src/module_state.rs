use lazy_static::lazy_static;
use log::{debug, warn};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::engine::MeasurementEngine;
use crate::error::{MeasureError, MeasureResult};
use crate::models::SessionStats;

// A measurement session and when it was last touched
struct SessionEntry {
    engine: MeasurementEngine,
    last_used: u64,
}

// Module state holding one measurement engine per map page session
pub struct ModuleState {
    sessions: HashMap<String, SessionEntry>,

    // Applies to sessions opened after it is set
    pub config: EngineConfig,

    // Monotonic use counter, orders sessions for eviction
    tick: u64,

    // Stats
    pub lookup_hits: usize,
    pub lookup_misses: usize,
}

// Create a global static instance of the module state
lazy_static! {
    static ref MODULE_STATE: ReentrantMutex<RefCell<ModuleState>> =
        ReentrantMutex::new(RefCell::new(ModuleState::new()));
}

impl Default for ModuleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleState {
    pub fn new() -> Self {
        ModuleState {
            sessions: HashMap::new(),
            config: EngineConfig::default(),
            tick: 0,
            lookup_hits: 0,
            lookup_misses: 0,
        }
    }

    pub fn with_mut<F, R>(f: F) -> R
    where
        F: FnOnce(&mut ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let mut borrow = guard.borrow_mut();
        f(&mut borrow)
    }

    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let borrow = guard.borrow();
        f(&borrow)
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Validate and apply a new configuration. Existing sessions keep the
    /// earth radius they were opened with; the session limit applies at once.
    pub fn apply_config(&mut self, config: EngineConfig) -> MeasureResult<()> {
        config.validate()?;
        self.config = config;
        while self.sessions.len() > self.config.max_sessions {
            self.evict_oldest();
        }
        Ok(())
    }

    /// Open a fresh session. An existing session with the same id is replaced.
    pub fn open_session(&mut self, session_id: &str) {
        // If we're at capacity, remove the least recently used session
        if self.sessions.len() >= self.config.max_sessions && !self.sessions.contains_key(session_id)
        {
            self.evict_oldest();
        }

        let last_used = self.next_tick();
        let engine = MeasurementEngine::with_earth_radius(self.config.earth_radius_km);
        if self
            .sessions
            .insert(session_id.to_string(), SessionEntry { engine, last_used })
            .is_some()
        {
            debug!("measurement session {} replaced", session_id);
        } else {
            debug!("measurement session {} opened", session_id);
        }
    }

    fn evict_oldest(&mut self) {
        let oldest_key = self
            .sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(k, _)| k.clone());

        if let Some(oldest) = oldest_key {
            warn!("session limit reached, evicting measurement session {}", oldest);
            self.sessions.remove(&oldest);
        }
    }

    /// Run `f` against a session's engine.
    pub fn with_session<F, R>(&mut self, session_id: &str, f: F) -> MeasureResult<R>
    where
        F: FnOnce(&MeasurementEngine) -> R,
    {
        self.with_session_mut(session_id, |engine| f(engine))
    }

    /// Run `f` with mutable access to a session's engine.
    pub fn with_session_mut<F, R>(&mut self, session_id: &str, f: F) -> MeasureResult<R>
    where
        F: FnOnce(&mut MeasurementEngine) -> R,
    {
        let tick = self.next_tick();
        match self.sessions.get_mut(session_id) {
            Some(entry) => {
                self.lookup_hits += 1;
                entry.last_used = tick;
                Ok(f(&mut entry.engine))
            }
            None => {
                self.lookup_misses += 1;
                Err(MeasureError::UnknownSession(session_id.to_string()))
            }
        }
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Close a session, returning whether it existed.
    pub fn close_session(&mut self, session_id: &str) -> bool {
        let existed = self.sessions.remove(session_id).is_some();
        if existed {
            debug!("measurement session {} closed", session_id);
        }
        existed
    }

    /// Ids of all open sessions, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn stats(&self) -> SessionStats {
        let total_lookups = self.lookup_hits + self.lookup_misses;
        let hit_rate = if total_lookups > 0 {
            self.lookup_hits as f64 / total_lookups as f64
        } else {
            0.0
        };
        SessionStats {
            active_sessions: self.sessions.len(),
            max_sessions: self.config.max_sessions,
            total_lookups,
            hit_rate,
        }
    }

    // Drop every session and reset stats
    pub fn clear_sessions(&mut self) {
        self.sessions.clear();
        self.lookup_hits = 0;
        self.lookup_misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, MeasurementMode};

    fn state_with_limit(max_sessions: usize) -> ModuleState {
        let mut state = ModuleState::new();
        state
            .apply_config(EngineConfig {
                max_sessions,
                ..EngineConfig::default()
            })
            .unwrap();
        state
    }

    #[test]
    fn sessions_are_isolated() {
        let mut state = ModuleState::new();
        state.open_session("a");
        state.open_session("b");

        state
            .with_session_mut("a", |engine| {
                engine.select_mode(MeasurementMode::Path);
                engine.submit_point(GeoPoint::new(1.0, 1.0).unwrap());
            })
            .unwrap();

        let a_points = state.with_session("a", |e| e.points().len()).unwrap();
        let b_mode = state.with_session("b", |e| e.active_mode()).unwrap();
        assert_eq!(a_points, 1);
        assert_eq!(b_mode, MeasurementMode::None);
    }

    #[test]
    fn unknown_session_is_an_error() {
        let mut state = ModuleState::new();
        let err = state.with_session("missing", |_| ()).unwrap_err();
        assert_eq!(err, MeasureError::UnknownSession("missing".to_string()));

        let stats = state.stats();
        assert_eq!(stats.total_lookups, 1);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn reopening_replaces_session() {
        let mut state = ModuleState::new();
        state.open_session("a");
        state
            .with_session_mut("a", |e| e.select_mode(MeasurementMode::Area))
            .unwrap();

        state.open_session("a");
        let mode = state.with_session("a", |e| e.active_mode()).unwrap();
        assert_eq!(mode, MeasurementMode::None);
        assert_eq!(state.stats().active_sessions, 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut state = state_with_limit(2);
        state.open_session("a");
        state.open_session("b");
        // Touch "a" so "b" becomes the oldest
        state.with_session("a", |_| ()).unwrap();

        state.open_session("c");
        assert_eq!(state.session_ids(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn shrinking_limit_evicts_immediately() {
        let mut state = ModuleState::new();
        for id in ["a", "b", "c"] {
            state.open_session(id);
        }
        state
            .apply_config(EngineConfig {
                max_sessions: 1,
                ..EngineConfig::default()
            })
            .unwrap();
        assert_eq!(state.session_ids(), vec!["c".to_string()]);
    }

    #[test]
    fn invalid_config_is_rejected_and_ignored() {
        let mut state = ModuleState::new();
        let bad = EngineConfig {
            earth_radius_km: 0.0,
            ..EngineConfig::default()
        };
        assert!(state.apply_config(bad).is_err());
        assert_eq!(state.config, EngineConfig::default());
    }

    #[test]
    fn new_sessions_use_configured_radius() {
        let mut state = ModuleState::new();
        state
            .apply_config(EngineConfig {
                earth_radius_km: 3389.5,
                ..EngineConfig::default()
            })
            .unwrap();
        state.open_session("mars");
        let radius = state.with_session("mars", |e| e.earth_radius_km()).unwrap();
        assert_eq!(radius, 3389.5);
    }

    #[test]
    fn close_and_clear() {
        let mut state = ModuleState::new();
        state.open_session("a");
        state.open_session("b");
        assert!(state.close_session("a"));
        assert!(!state.close_session("a"));
        assert!(!state.has_session("a"));

        state.with_session("b", |_| ()).unwrap();
        state.clear_sessions();
        let stats = state.stats();
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(stats.total_lookups, 0);
    }
}
