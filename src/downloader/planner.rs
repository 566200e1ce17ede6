//! Batch planning
//!
//! A fold over `(symbol, cost)` pairs that packs symbols into batches whose
//! estimated weight stays under a ceiling. The symbol that would overflow the
//! current batch always opens the next one; it is never dropped, and a symbol
//! heavier than the ceiling ends up in a batch of its own.

use crate::Symbol;

/// One symbol queued in a batch with its estimated cost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Symbol to fetch
    pub symbol: Symbol,
    /// Estimated request count
    pub cost: u32,
}

/// Symbols fetched together between two pacing pauses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    entries: Vec<BatchEntry>,
}

impl Batch {
    /// Entries in planning order
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Symbols in planning order
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter().map(|e| &e.symbol)
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch holds no symbols
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of member costs
    pub fn total_cost(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.cost)).sum()
    }

    fn push(&mut self, symbol: Symbol, cost: u32) {
        self.entries.push(BatchEntry { symbol, cost });
    }
}

/// Running state of batch construction
#[derive(Debug)]
pub struct BatchPlanner {
    ceiling: u32,
    current: Batch,
    current_weight: u64,
}

impl BatchPlanner {
    /// Create a planner with the given weight ceiling
    pub fn new(ceiling: u32) -> Self {
        Self {
            ceiling,
            current: Batch::default(),
            current_weight: 0,
        }
    }

    /// Weight accumulated towards the current batch
    pub fn current_weight(&self) -> u64 {
        self.current_weight
    }

    /// Charge estimation overhead to the running weight
    pub fn charge_overhead(&mut self, weight: u32) {
        self.current_weight += u64::from(weight);
    }

    /// Offer the next symbol
    ///
    /// Returns the closed batch when this symbol overflowed the ceiling. Zero-cost
    /// symbols are ignored entirely.
    pub fn push(&mut self, symbol: Symbol, cost: u32) -> Option<Batch> {
        if cost == 0 {
            return None;
        }

        if self.current_weight + u64::from(cost) > u64::from(self.ceiling) {
            let closed = std::mem::take(&mut self.current);
            self.current.push(symbol, cost);
            self.current_weight = u64::from(cost);
            return (!closed.is_empty()).then_some(closed);
        }

        self.current.push(symbol, cost);
        self.current_weight += u64::from(cost);
        None
    }

    /// Hand back the trailing batch, if it holds anything
    pub fn finish(self) -> Option<Batch> {
        (!self.current.is_empty()).then_some(self.current)
    }
}

/// Plan a whole sequence at once, ignoring estimation overhead
pub fn plan_batches<I>(ceiling: u32, costs: I) -> Vec<Batch>
where
    I: IntoIterator<Item = (Symbol, u32)>,
{
    let mut planner = BatchPlanner::new(ceiling);
    let mut batches: Vec<Batch> = costs
        .into_iter()
        .filter_map(|(symbol, cost)| planner.push(symbol, cost))
        .collect();
    batches.extend(planner.finish());
    batches
}
