// engine/stalls.rs
//
// The four stall accumulators. Each lost cycle is classified into exactly
// one bucket, at the stage that first detects it (see SPEC_FULL.md §4.2-4.6).

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StallCounters {
    pub rb_delays: usize,
    pub rs_delays: usize,
    pub dmc_delays: usize,
    pub true_dep_delays: usize,
}

impl StallCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rob_full(&mut self) {
        self.rb_delays += 1;
    }

    pub fn record_rs_full(&mut self) {
        self.rs_delays += 1;
    }

    pub fn record_memory_conflict(&mut self) {
        self.dmc_delays += 1;
    }

    pub fn record_true_dependency(&mut self) {
        self.true_dep_delays += 1;
    }

    pub fn total(&self) -> usize {
        self.rb_delays + self.rs_delays + self.dmc_delays + self.true_dep_delays
    }
}
