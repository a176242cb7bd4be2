//! Per-query result cache
//!
//! A query remembers at most one computed result together with what it was
//! computed from: the limit, the bound parameter values and the
//! modification clock reading taken before computing. The result is handed
//! out again only when a fresh reading proves nothing it depends on could
//! have changed.
//!
//! # Reuse conditions (all must hold)
//!
//! 1. a previous result exists and is not closed
//! 2. the limit is the same
//! 3. the query is deterministic and independent of session state
//! 4. every parameter has the same declared type and an equal value
//! 5. the clock has not advanced past the previous reading, or none of
//!    the referenced tables and sequences changed since then
//!
//! False misses are acceptable. False hits are not.

use serde::Serialize;

use crate::executor::LocalResult;
use crate::value::Value;

/// Whether this query may ever reuse a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cacheability {
    /// Not decided yet; decided on the first reuse attempt
    Unknown,
    Cacheable,
    /// References an object whose changes are not tracked
    NeverCacheable,
}

/// What the cached result was computed from
#[derive(Debug, Default)]
pub struct CacheState {
    pub last_limit: usize,
    pub last_evaluated: u64,
    pub last_result: Option<LocalResult>,
    pub last_parameters: Vec<Value>,
}

/// Inputs of the current call
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    pub limit: usize,
    pub parameters: Vec<Value>,
    /// Clock reading taken once at the start of the call
    pub modification_id: u64,
}

/// Determinism analysis of the query for the current call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    pub deterministic: bool,
    pub independent: bool,
    pub max_data_modification_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    NoResult,
    LimitChanged,
    NotDeterministic,
    NotIndependent,
    ParametersChanged,
    DataModified,
}

impl MissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissReason::NoResult => "no_result",
            MissReason::LimitChanged => "limit_changed",
            MissReason::NotDeterministic => "not_deterministic",
            MissReason::NotIndependent => "not_independent",
            MissReason::ParametersChanged => "parameters_changed",
            MissReason::DataModified => "data_modified",
        }
    }
}

/// First reuse condition that fails, if any
pub fn miss_reason<F>(state: &CacheState, key: &CacheKey, freshness: &Freshness, values_equal: F) -> Option<MissReason>
where
    F: Fn(&Value, &Value) -> bool,
{
    match &state.last_result {
        Some(result) if !result.is_closed() => {}
        _ => return Some(MissReason::NoResult),
    }
    if key.limit != state.last_limit {
        return Some(MissReason::LimitChanged);
    }
    if !freshness.deterministic {
        return Some(MissReason::NotDeterministic);
    }
    if !freshness.independent {
        return Some(MissReason::NotIndependent);
    }
    if key.parameters.len() != state.last_parameters.len() {
        return Some(MissReason::ParametersChanged);
    }
    let params_equal = key
        .parameters
        .iter()
        .zip(&state.last_parameters)
        .all(|(now, last)| now.value_type() == last.value_type() && values_equal(last, now));
    if !params_equal {
        return Some(MissReason::ParametersChanged);
    }
    if key.modification_id > state.last_evaluated && freshness.max_data_modification_id > state.last_evaluated {
        return Some(MissReason::DataModified);
    }
    None
}

/// Whether the cached result may be returned for this call
pub fn is_reusable<F>(state: &CacheState, key: &CacheKey, freshness: &Freshness, values_equal: F) -> bool
where
    F: Fn(&Value, &Value) -> bool,
{
    miss_reason(state, key, freshness, values_equal).is_none()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub bypassed: u64,
}

/// Cache owned by one query
#[derive(Debug)]
pub struct ResultCache {
    disabled: bool,
    cacheability: Cacheability,
    state: CacheState,
    stats: CacheStats,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            disabled: false,
            cacheability: Cacheability::Unknown,
            state: CacheState::default(),
            stats: CacheStats::default(),
        }
    }

    /// Opt this query out of caching for good
    pub fn disable(&mut self) {
        self.disabled = true;
        self.release();
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled || self.cacheability == Cacheability::NeverCacheable
    }

    pub fn cacheability(&self) -> Cacheability {
        self.cacheability
    }

    /// Decide cacheability from the query's max modification id. Only the
    /// first call decides; later calls return the remembered outcome.
    pub fn settle(&mut self, max_data_modification_id: u64) -> Cacheability {
        if self.cacheability == Cacheability::Unknown {
            self.cacheability = if max_data_modification_id == u64::MAX {
                self.release();
                Cacheability::NeverCacheable
            } else {
                Cacheability::Cacheable
            };
        }
        self.cacheability
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// A live result computed with the same limit exists
    pub fn has_candidate(&self, limit: usize) -> bool {
        matches!(&self.state.last_result, Some(r) if !r.is_closed()) && self.state.last_limit == limit
    }

    /// Fresh cursor over the cached rows
    pub fn reuse(&self) -> Option<LocalResult> {
        self.state.last_result.as_ref()?.shallow_copy()
    }

    /// Close and drop the cached result
    pub fn release(&mut self) {
        if let Some(mut result) = self.state.last_result.take() {
            result.close();
        }
    }

    /// Keep `result` as the new cache entry and return the caller's copy.
    /// A never-cacheable query keeps nothing.
    pub fn store(&mut self, key: CacheKey, result: LocalResult) -> LocalResult {
        if self.is_disabled() {
            return result;
        }
        match result.shallow_copy() {
            Some(copy) => {
                self.state = CacheState {
                    last_limit: key.limit,
                    last_evaluated: key.modification_id,
                    last_result: Some(result),
                    last_parameters: key.parameters,
                };
                copy
            }
            None => result,
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub(crate) fn record_hit(&mut self) {
        self.stats.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.stats.misses += 1;
    }

    pub(crate) fn record_bypass(&mut self) {
        self.stats.bypassed += 1;
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict_eq(a: &Value, b: &Value) -> bool {
        a.compare_to(b).is_eq()
    }

    fn filled(limit: usize, params: Vec<Value>, evaluated: u64) -> CacheState {
        CacheState {
            last_limit: limit,
            last_evaluated: evaluated,
            last_result: Some(LocalResult::new(1, vec![vec![Value::Int(1)]])),
            last_parameters: params,
        }
    }

    fn key(limit: usize, params: Vec<Value>, now: u64) -> CacheKey {
        CacheKey {
            limit,
            parameters: params,
            modification_id: now,
        }
    }

    fn fresh(max: u64) -> Freshness {
        Freshness {
            deterministic: true,
            independent: true,
            max_data_modification_id: max,
        }
    }

    #[test]
    fn test_reusable_when_nothing_changed() {
        let state = filled(0, vec![Value::Int(1)], 10);
        assert!(is_reusable(&state, &key(0, vec![Value::Int(1)], 10), &fresh(5), strict_eq));
    }

    #[test]
    fn test_empty_parameter_lists_are_equal() {
        let state = filled(0, vec![], 10);
        assert!(is_reusable(&state, &key(0, vec![], 10), &fresh(5), strict_eq));
    }

    #[test]
    fn test_no_result_or_closed_result() {
        let mut state = CacheState::default();
        assert_eq!(
            miss_reason(&state, &key(0, vec![], 0), &fresh(0), strict_eq),
            Some(MissReason::NoResult)
        );
        state = filled(0, vec![], 0);
        state.last_result.as_mut().unwrap().close();
        assert_eq!(
            miss_reason(&state, &key(0, vec![], 0), &fresh(0), strict_eq),
            Some(MissReason::NoResult)
        );
    }

    #[test]
    fn test_limit_must_match() {
        let state = filled(10, vec![], 1);
        assert_eq!(
            miss_reason(&state, &key(20, vec![], 1), &fresh(0), strict_eq),
            Some(MissReason::LimitChanged)
        );
    }

    #[test]
    fn test_parameter_type_sensitivity() {
        let state = filled(0, vec![Value::Int(1)], 1);
        assert_eq!(
            miss_reason(&state, &key(0, vec![Value::Long(1)], 1), &fresh(0), strict_eq),
            Some(MissReason::ParametersChanged)
        );
        assert_eq!(
            miss_reason(&state, &key(0, vec![Value::Int(2)], 1), &fresh(0), strict_eq),
            Some(MissReason::ParametersChanged)
        );
    }

    #[test]
    fn test_determinism_and_independence() {
        let state = filled(0, vec![], 1);
        let mut f = fresh(0);
        f.deterministic = false;
        assert_eq!(miss_reason(&state, &key(0, vec![], 1), &f, strict_eq), Some(MissReason::NotDeterministic));
        let mut f = fresh(0);
        f.independent = false;
        assert_eq!(miss_reason(&state, &key(0, vec![], 1), &f, strict_eq), Some(MissReason::NotIndependent));
    }

    #[test]
    fn test_freshness() {
        let state = filled(0, vec![], 10);
        // clock advanced, but by an unrelated object
        assert!(is_reusable(&state, &key(0, vec![], 12), &fresh(10), strict_eq));
        // clock advanced and a referenced object changed
        assert_eq!(
            miss_reason(&state, &key(0, vec![], 12), &fresh(11), strict_eq),
            Some(MissReason::DataModified)
        );
        // referenced object newer, but the clock reading has not moved
        assert!(is_reusable(&state, &key(0, vec![], 10), &fresh(11), strict_eq));
    }

    #[test]
    fn test_settle_is_remembered() {
        let mut cache = ResultCache::new();
        assert_eq!(cache.settle(3), Cacheability::Cacheable);
        assert_eq!(cache.settle(u64::MAX), Cacheability::Cacheable);

        let mut never = ResultCache::new();
        assert_eq!(never.settle(u64::MAX), Cacheability::NeverCacheable);
        assert!(never.is_disabled());
        assert_eq!(never.settle(0), Cacheability::NeverCacheable);
    }

    #[test]
    fn test_store_keeps_original_and_returns_copy() {
        let mut cache = ResultCache::new();
        let result = LocalResult::new(1, vec![vec![Value::Int(7)]]);
        let mut copy = cache.store(key(5, vec![Value::Int(1)], 9), result);
        copy.close();

        assert!(cache.has_candidate(5));
        assert!(!cache.has_candidate(6));
        assert_eq!(cache.state().last_evaluated, 9);
        assert_eq!(cache.state().last_parameters, vec![Value::Int(1)]);

        let reused = cache.reuse().unwrap();
        assert!(!reused.is_closed());
        assert_eq!(reused.rows(), &[vec![Value::Int(7)]]);
    }

    #[test]
    fn test_release_closes() {
        let mut cache = ResultCache::new();
        let _ = cache.store(key(0, vec![], 1), LocalResult::new(1, vec![]));
        cache.release();
        assert!(!cache.has_candidate(0));
        assert!(cache.reuse().is_none());
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let mut cache = ResultCache::new();
        cache.disable();
        let _ = cache.store(key(0, vec![], 1), LocalResult::new(1, vec![]));
        assert!(!cache.has_candidate(0));
    }
}
