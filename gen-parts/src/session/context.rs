//! Running totals of one generation run.

use crate::error::SynthesisError;
use std::collections::BTreeMap;

/// Counters threaded through every chunk of a run, in order.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Seconds of audio produced so far; never decreases
    pub total_duration: f64,
    /// Chunks finalized so far, discarded ones included
    pub chunk_counter: u64,
    /// Chunks below the resume offset
    pub discarded: u64,
    /// Chunks whose cleaned text was empty
    pub skipped_empty: u64,
    pub synthesized: u64,
    /// Chunks lost to synthesis failures, by failure kind
    pub dropped: BTreeMap<&'static str, u64>,
    pub parts_written: u32,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number the next finalized chunk (1-based).
    pub fn next_chunk(&mut self) -> u64 {
        self.chunk_counter += 1;
        self.chunk_counter
    }

    pub fn add_audio(&mut self, seconds: f64) {
        self.total_duration += seconds.max(0.0);
        self.synthesized += 1;
    }

    pub fn record_failure(&mut self, error: &SynthesisError) {
        *self.dropped.entry(error.kind()).or_insert(0) += 1;
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped.values().sum()
    }
}
