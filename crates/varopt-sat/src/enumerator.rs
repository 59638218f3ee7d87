use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clause::{Literal, Variable};
use super::clause_set::ClauseSet;
use super::decisions::Decisions;
use super::error::EnumerationError;
use super::watch_graph::{PropagateResult, Propagator, WatchGraph};

/// How often (in search steps) the deadline and cancellation flag are polled
const POLL_INTERVAL: u64 = 1024;

/// Counters collected during one enumeration run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnumerationStats {
    pub models: usize,
    pub decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
}

/// A branching point on the trail
struct Branch {
    level: u32,
    literal: Literal,
    /// Whether the opposite polarity is already being explored
    flipped: bool,
}

/// Enumerates every satisfying assignment of a clause set.
///
/// The search is a DPLL loop with chronological backtracking: every branch
/// variable is first tried false, and after the subtree is exhausted (model
/// found or conflict) the most recent unflipped branch is flipped to true.
/// Every assignment is therefore visited exactly once, which is what makes
/// the result complete and duplicate-free without blocking clauses.
///
/// Variables that appear in no clause are branched on like any other, so an
/// unconstrained variable shows up both true and false across the models.
pub struct ModelEnumerator {
    num_variables: Variable,
    clauses: ClauseSet,
    timeout: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
}

impl ModelEnumerator {
    /// Create an enumerator over variables `1..=num_variables`.
    ///
    /// Clauses mentioning larger variables widen the range to cover them.
    pub fn new(num_variables: Variable, clauses: ClauseSet) -> Self {
        let num_variables = num_variables.max(clauses.max_variable());
        Self {
            num_variables,
            clauses,
            timeout: None,
            cancel: None,
        }
    }

    /// Give up once this much wall-clock time has elapsed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Stop early when the flag becomes true
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn num_variables(&self) -> Variable {
        self.num_variables
    }

    /// Collect every model as the ascending list of its true variables.
    pub fn collect(self) -> Result<(Vec<Vec<Variable>>, EnumerationStats), EnumerationError> {
        let mut models = Vec::new();
        let stats = self.enumerate(|model| models.push(model.to_vec()))?;
        Ok((models, stats))
    }

    /// Run the search, handing each model (ascending true variables) to `on_model`.
    pub fn enumerate<F>(mut self, mut on_model: F) -> Result<EnumerationStats, EnumerationError>
    where
        F: FnMut(&[Variable]),
    {
        let start = Instant::now();
        let mut stats = EnumerationStats::default();

        log::debug!(
            "Enumerating models over {} variables and {} clauses",
            self.num_variables,
            self.clauses.len()
        );

        if let Some(clause) = self.clauses.empty_clause() {
            return Err(EnumerationError::Contradiction { clause: clause.to_string() });
        }

        let mut state = SearchState::new(self.num_variables, &self.clauses);

        // Level 0: unit clauses and everything they force
        for unit in self.clauses.units() {
            let literal = unit.literals()[0];
            if !state.decisions.decide(literal, Some(unit.id())) {
                return Err(EnumerationError::Contradiction { clause: unit.to_string() });
            }
        }
        if let Err(clause_id) = state.propagate(&mut self.clauses, &mut stats) {
            let clause = self.clauses
                .get(clause_id)
                .map(|c| c.to_string())
                .unwrap_or_default();
            return Err(EnumerationError::Contradiction { clause });
        }

        let mut steps = 0u64;
        loop {
            steps += 1;
            if steps % POLL_INTERVAL == 0 {
                self.check_interrupt(start, stats.models)?;
            }

            match state.next_unassigned() {
                Some(var) => {
                    stats.decisions += 1;
                    state.branch(-(var as Literal));
                }
                None => {
                    let model = state.decisions.true_variables();
                    on_model(&model);
                    stats.models += 1;
                    if !state.backtrack() {
                        break;
                    }
                }
            }

            while let Err(_conflict) = state.propagate(&mut self.clauses, &mut stats) {
                stats.conflicts += 1;
                if !state.backtrack() {
                    return Ok(self.finish(start, stats));
                }
            }
        }

        Ok(self.finish(start, stats))
    }

    fn check_interrupt(&self, start: Instant, models_found: usize) -> Result<(), EnumerationError> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(EnumerationError::Cancelled);
            }
        }
        if let Some(timeout) = self.timeout {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(EnumerationError::Timeout { elapsed, models_found });
            }
        }
        Ok(())
    }

    fn finish(&self, start: Instant, stats: EnumerationStats) -> EnumerationStats {
        log::info!(
            "Enumerated {} models in {:.3} seconds ({} decisions, {} conflicts, {} propagations)",
            stats.models,
            start.elapsed().as_secs_f64(),
            stats.decisions,
            stats.conflicts,
            stats.propagations
        );
        stats
    }
}

/// Internal state for one search
struct SearchState {
    num_variables: Variable,
    decisions: Decisions,
    watch_graph: WatchGraph,
    branches: Vec<Branch>,
    /// Index of next trail entry to propagate
    propagate_index: usize,
    /// Variables below this are known to be assigned
    scan_from: Variable,
}

impl SearchState {
    fn new(num_variables: Variable, clauses: &ClauseSet) -> Self {
        Self {
            num_variables,
            decisions: Decisions::with_capacity(num_variables as usize),
            watch_graph: WatchGraph::from_clauses(clauses),
            branches: Vec::new(),
            propagate_index: 0,
            scan_from: 1,
        }
    }

    fn propagate(&mut self, clauses: &mut ClauseSet, stats: &mut EnumerationStats) -> Result<(), u32> {
        while self.propagate_index < self.decisions.len() {
            let (literal, _) = self.decisions.queue()[self.propagate_index];
            self.propagate_index += 1;

            let mut propagator = Propagator::new(&mut self.watch_graph, clauses);
            if let PropagateResult::Conflict(clause_id) =
                propagator.propagate(literal, &mut self.decisions, &mut stats.propagations)
            {
                return Err(clause_id);
            }
        }
        Ok(())
    }

    fn next_unassigned(&mut self) -> Option<Variable> {
        while self.scan_from <= self.num_variables {
            if self.decisions.undecided(self.scan_from) {
                return Some(self.scan_from);
            }
            self.scan_from += 1;
        }
        None
    }

    fn branch(&mut self, literal: Literal) {
        self.decisions.increment_level();
        self.branches.push(Branch {
            level: self.decisions.level(),
            literal,
            flipped: false,
        });
        self.decisions.decide(literal, None);
    }

    /// Undo the most recent unflipped branch and take its other polarity.
    /// Returns false once every branch has been explored both ways.
    fn backtrack(&mut self) -> bool {
        while let Some(branch) = self.branches.pop() {
            if branch.flipped {
                continue;
            }

            self.decisions.revert_to_level(branch.level - 1);
            self.propagate_index = self.decisions.len();
            self.scan_from = self.scan_from.min(branch.literal.unsigned_abs());

            self.decisions.increment_level();
            self.branches.push(Branch {
                level: branch.level,
                literal: -branch.literal,
                flipped: true,
            });
            self.decisions.decide(-branch.literal, None);
            return true;
        }
        false
    }
}
