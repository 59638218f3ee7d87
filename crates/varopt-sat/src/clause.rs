use std::fmt;
use std::hash::{Hash, Hasher};

/// A literal in SAT terms - positive means "enabled", negative means "disabled".
/// The absolute value names the variable.
pub type Literal = i32;

/// A propositional variable, numbered from 1.
pub type Variable = u32;

/// Variable addressed by a literal.
#[inline]
pub fn variable(literal: Literal) -> Variable {
    literal.unsigned_abs()
}

/// A disjunction of literals.
///
/// A clause is satisfied when at least one of its literals is true.
///
/// # Examples
///
/// - `[1]` - variable 1 must be true (unit)
/// - `[-2]` - variable 2 must be false
/// - `[-2, 1]` - if 2 is true then 1 must be true
/// - `[3, -3]` - tautology, satisfied by every assignment
#[derive(Clone)]
pub struct Clause {
    literals: Vec<Literal>,
    /// Clause ID (assigned by ClauseSet)
    id: u32,
}

impl Clause {
    /// Create a clause, dropping repeated literals while keeping first occurrences.
    ///
    /// Literal `0` is not a valid literal; callers are expected to have
    /// rejected it during parsing.
    pub fn new(literals: impl IntoIterator<Item = Literal>) -> Self {
        let mut unique: Vec<Literal> = Vec::new();
        for literal in literals {
            debug_assert!(literal != 0, "literal 0 is reserved");
            if !unique.contains(&literal) {
                unique.push(literal);
            }
        }
        Self { literals: unique, id: 0 }
    }

    /// Create a unit clause
    pub fn unit(literal: Literal) -> Self {
        Self::new([literal])
    }

    /// Create an implication clause: `premise -> any of conclusions`
    pub fn implies(premise: Literal, conclusions: impl IntoIterator<Item = Literal>) -> Self {
        let mut literals = vec![-premise];
        literals.extend(conclusions);
        Self::new(literals)
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// The propagator reorders literals to keep its two watches in front.
    pub(crate) fn literals_mut(&mut self) -> &mut Vec<Literal> {
        &mut self.literals
    }

    pub fn is_unit(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// True if the clause contains both polarities of some variable.
    pub fn is_tautology(&self) -> bool {
        self.literals.iter().any(|&l| self.literals.contains(&-l))
    }

    /// Variables mentioned by this clause
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.literals.iter().map(|&l| variable(l))
    }

    /// Get a hash of this clause's literals for deduplication
    pub fn literal_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();

        // Sort literals for consistent hashing
        let mut sorted = self.literals.clone();
        sorted.sort_unstable();
        sorted.hash(&mut hasher);

        hasher.finish()
    }

    /// Check if two clauses have the same literals (regardless of order)
    pub fn equals_literals(&self, other: &Clause) -> bool {
        if self.literals.len() != other.literals.len() {
            return false;
        }

        let mut a = self.literals.clone();
        let mut b = other.literals.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Clause#{}({:?})", self.id, self.literals)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<String> = self.literals
            .iter()
            .map(|&l| {
                if l > 0 {
                    format!("+{}", l)
                } else {
                    format!("{}", l)
                }
            })
            .collect();

        write!(f, "[{}]", literals.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clause_unit() {
        let clause = Clause::unit(5);
        assert!(clause.is_unit());
        assert_eq!(clause.literals(), &[5]);
    }

    #[test]
    fn test_clause_implies() {
        let clause = Clause::implies(2, [1, 3]);
        assert_eq!(clause.literals(), &[-2, 1, 3]);
    }

    #[test]
    fn test_clause_drops_repeated_literals() {
        let clause = Clause::new([1, -2, 1, -2, 3]);
        assert_eq!(clause.literals(), &[1, -2, 3]);
    }

    #[test]
    fn test_clause_tautology() {
        assert!(Clause::new([4, 1, -4]).is_tautology());
        assert!(!Clause::new([4, 1, -2]).is_tautology());
    }

    #[test]
    fn test_clause_literal_hash() {
        let a = Clause::new([1, 2, 3]);
        let b = Clause::new([3, 1, 2]);
        let c = Clause::new([1, 2, 4]);

        assert_eq!(a.literal_hash(), b.literal_hash());
        assert_ne!(a.literal_hash(), c.literal_hash());
        assert!(a.equals_literals(&b));
        assert!(!a.equals_literals(&c));
    }

    #[test]
    fn test_clause_display() {
        let clause = Clause::implies(1, [2]);
        assert_eq!(format!("{}", clause), "[-1 | +2]");
    }
}
