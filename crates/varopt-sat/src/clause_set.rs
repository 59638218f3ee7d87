use std::collections::{BTreeSet, HashMap};

use super::clause::{Clause, Literal, Variable};

/// A CNF formula: a conjunction of clauses.
///
/// The ClauseSet manages clauses with:
/// - Deduplication based on literal content
/// - Sequential ID assignment
/// - Tracking of the largest variable mentioned
#[derive(Debug, Clone, Default)]
pub struct ClauseSet {
    /// All clauses indexed by ID
    clauses: Vec<Clause>,

    /// Literal hash -> clause IDs sharing that hash
    clause_hashes: HashMap<u64, Vec<u32>>,

    /// Largest variable seen so far
    max_variable: Variable,
}

impl ClauseSet {
    /// Create a new empty clause set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a clause set from raw literal lists
    pub fn from_literals<I, C>(clauses: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = Literal>,
    {
        let mut set = Self::new();
        for clause in clauses {
            set.add(Clause::new(clause));
        }
        set
    }

    /// Add a clause to the set, returning its ID.
    /// Returns the existing clause's ID if a duplicate exists.
    pub fn add(&mut self, mut clause: Clause) -> u32 {
        let hash = clause.literal_hash();
        if let Some(ids) = self.clause_hashes.get(&hash) {
            for &existing_id in ids {
                if let Some(existing) = self.get(existing_id) {
                    if existing.equals_literals(&clause) {
                        return existing_id;
                    }
                }
            }
        }

        let id = self.clauses.len() as u32;
        clause.set_id(id);

        if let Some(max) = clause.variables().max() {
            self.max_variable = self.max_variable.max(max);
        }

        self.clause_hashes.entry(hash).or_default().push(id);
        self.clauses.push(clause);

        id
    }

    /// Get a clause by ID
    pub fn get(&self, id: u32) -> Option<&Clause> {
        self.clauses.get(id as usize)
    }

    pub(crate) fn get_mut(&mut self, id: u32) -> Option<&mut Clause> {
        self.clauses.get_mut(id as usize)
    }

    /// Get all clauses
    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    /// Get unit clauses (single literal)
    pub fn units(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(|c| c.is_unit())
    }

    /// The first empty clause, if any. An empty clause can never be satisfied.
    pub fn empty_clause(&self) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.is_empty())
    }

    /// Largest variable mentioned by any clause
    pub fn max_variable(&self) -> Variable {
        self.max_variable
    }

    /// Variables in `1..=num_variables` that occur in no clause.
    pub fn free_variables(&self, num_variables: Variable) -> Vec<Variable> {
        let used: BTreeSet<Variable> = self.clauses
            .iter()
            .flat_map(|c| c.variables())
            .collect();

        (1..=num_variables).filter(|v| !used.contains(v)).collect()
    }

    /// Get the total number of clauses
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Check if the clause set is empty
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Get statistics about the clause set
    pub fn stats(&self) -> ClauseSetStats {
        let mut stats = ClauseSetStats {
            total: self.clauses.len(),
            ..Default::default()
        };

        for clause in &self.clauses {
            if clause.is_unit() {
                stats.units += 1;
            }
            if clause.is_tautology() {
                stats.tautologies += 1;
            }
            stats.longest = stats.longest.max(clause.len());
        }

        stats
    }
}

/// Statistics about a clause set
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClauseSetStats {
    pub total: usize,
    pub units: usize,
    pub tautologies: usize,
    pub longest: usize,
}
