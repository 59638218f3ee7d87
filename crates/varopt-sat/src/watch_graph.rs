use super::clause::Literal;
use super::clause_set::ClauseSet;
use super::decisions::Decisions;

/// Two-watched literals graph for efficient unit propagation.
///
/// Each clause of length >= 2 watches the literals at its positions 0 and 1.
/// When a watched literal becomes false, we try to find another
/// literal to watch. Unit and tautological clauses are never watched.
#[derive(Debug, Default)]
pub struct WatchGraph {
    /// Maps literal index -> clauses watching that literal
    watches: Vec<Vec<WatchNode>>,
}

/// A watch node linking a clause to a watched literal
#[derive(Debug, Clone, Copy)]
pub(crate) struct WatchNode {
    clause_id: u32,
    /// Some literal of the clause; if it is true the clause needs no visit
    blocker: Literal,
}

impl WatchGraph {
    /// Create a new empty watch graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert literal to index (handles positive and negative literals)
    fn literal_to_index(literal: Literal) -> usize {
        let abs = literal.unsigned_abs() as usize;
        if literal > 0 {
            abs * 2
        } else {
            abs * 2 + 1
        }
    }

    fn get_watches_mut(&mut self, literal: Literal) -> &mut Vec<WatchNode> {
        let idx = Self::literal_to_index(literal);
        if idx >= self.watches.len() {
            self.watches.resize(idx + 1, Vec::new());
        }
        &mut self.watches[idx]
    }

    /// Build the watch graph from a clause set
    pub fn from_clauses(clauses: &ClauseSet) -> Self {
        let mut graph = Self::new();

        for clause in clauses.iter() {
            if clause.len() < 2 || clause.is_tautology() {
                continue;
            }

            let literals = clause.literals();
            graph.watch(literals[0], clause.id(), literals[1]);
            graph.watch(literals[1], clause.id(), literals[0]);
        }

        graph
    }

    fn watch(&mut self, literal: Literal, clause_id: u32, blocker: Literal) {
        self.get_watches_mut(literal).push(WatchNode { clause_id, blocker });
    }

    /// Number of clauses watching a literal
    pub fn watch_count(&self, literal: Literal) -> usize {
        self.watches
            .get(Self::literal_to_index(literal))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Result of propagating a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateResult {
    /// Propagation successful, no conflict
    Ok,
    /// Every literal of this clause is false
    Conflict(u32),
}

/// Propagator handles unit propagation using the watch graph.
///
/// Units are assigned on the trail as soon as they are found, so clauses
/// visited later in the same pass already see them.
#[derive(Debug)]
pub struct Propagator<'a> {
    graph: &'a mut WatchGraph,
    clauses: &'a mut ClauseSet,
}

impl<'a> Propagator<'a> {
    /// Create a new propagator
    pub fn new(graph: &'a mut WatchGraph, clauses: &'a mut ClauseSet) -> Self {
        Self { graph, clauses }
    }

    /// Propagate a literal that has just become true.
    ///
    /// Visits every clause watching its negation. For each clause, the other
    /// watched literal is:
    /// - True: clause is satisfied
    /// - Otherwise we look for a replacement watch among the rest
    /// - No replacement and other watch undecided: the other watch is forced (unit)
    /// - No replacement and other watch false: conflict
    ///
    /// `units` is incremented for every forced assignment.
    pub fn propagate(&mut self, literal: Literal, decisions: &mut Decisions, units: &mut u64) -> PropagateResult {
        let false_literal = -literal;
        let idx = WatchGraph::literal_to_index(false_literal);
        if idx >= self.graph.watches.len() {
            return PropagateResult::Ok;
        }

        let watches = std::mem::take(&mut self.graph.watches[idx]);
        let mut kept = Vec::with_capacity(watches.len());
        let mut result = PropagateResult::Ok;

        let mut iter = watches.into_iter();
        while let Some(node) = iter.next() {
            if decisions.satisfied(node.blocker) {
                kept.push(node);
                continue;
            }

            let Some(clause) = self.clauses.get_mut(node.clause_id) else {
                continue;
            };
            let literals = clause.literals_mut();

            // Keep the false literal at position 1
            if literals[0] == false_literal {
                literals.swap(0, 1);
            }
            let first = literals[0];

            if decisions.satisfied(first) {
                kept.push(WatchNode { clause_id: node.clause_id, blocker: first });
                continue;
            }

            // Look for a new literal to watch
            let replacement = (2..literals.len()).find(|&k| !decisions.conflict(literals[k]));
            if let Some(k) = replacement {
                literals.swap(1, k);
                let new_watch = literals[1];
                self.graph.watch(new_watch, node.clause_id, first);
                continue;
            }

            kept.push(WatchNode { clause_id: node.clause_id, blocker: first });

            if decisions.conflict(first) {
                result = PropagateResult::Conflict(node.clause_id);
                kept.extend(iter.by_ref());
                break;
            }

            decisions.decide(first, Some(node.clause_id));
            *units += 1;
        }

        // New watches may have been registered on other literals, never on this one
        let slot = &mut self.graph.watches[idx];
        kept.append(slot);
        *slot = kept;

        result
    }
}
