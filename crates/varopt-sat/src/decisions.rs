use super::clause::{variable, Literal, Variable};

/// Tracks the assignment trail during enumeration.
///
/// Each assignment records:
/// - Whether a variable is true (+) or false (-)
/// - At what decision level it was assigned
/// - Which clause forced it (none for branching decisions)
///
/// Uses flat Vecs indexed by variable for O(1) lookups.
/// The decision_map stores: 0 = unassigned, >0 = true at level N-1, <0 = false at level N-1
#[derive(Debug, Default)]
pub struct Decisions {
    /// Variable -> encoded value and level (level+1 so that level 0 is distinguishable from unassigned)
    decision_map: Vec<i32>,

    /// Variable -> clause that forced the assignment
    reasons: Vec<Option<u32>>,

    /// Assignments in the order they were made [(literal, reason)]
    decision_queue: Vec<(Literal, Option<u32>)>,

    /// Current decision level
    level: u32,
}

impl Decisions {
    /// Create a new empty trail
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trail pre-sized for `num_variables` variables
    pub fn with_capacity(num_variables: usize) -> Self {
        Self {
            decision_map: vec![0; num_variables + 1],
            reasons: vec![None; num_variables + 1],
            decision_queue: Vec::with_capacity(num_variables),
            level: 0,
        }
    }

    #[inline]
    fn ensure_capacity(&mut self, var: Variable) {
        let id = var as usize;
        if id >= self.decision_map.len() {
            self.decision_map.resize(id + 1, 0);
            self.reasons.resize(id + 1, None);
        }
    }

    #[inline]
    fn raw(&self, var: Variable) -> i32 {
        self.decision_map.get(var as usize).copied().unwrap_or(0)
    }

    /// Get the current decision level
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Increment the decision level
    #[inline]
    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    /// Assign a literal at the current level.
    ///
    /// Returns false if this conflicts with an existing assignment.
    pub fn decide(&mut self, literal: Literal, reason: Option<u32>) -> bool {
        let var = variable(literal);
        self.ensure_capacity(var);

        let existing = self.decision_map[var as usize];
        if existing != 0 {
            return (existing > 0) == (literal > 0);
        }

        let level_value = (self.level + 1) as i32;
        self.decision_map[var as usize] = if literal > 0 { level_value } else { -level_value };
        self.reasons[var as usize] = reason;
        self.decision_queue.push((literal, reason));

        true
    }

    /// Truth value of a literal: `None` while its variable is unassigned
    #[inline]
    pub fn value(&self, literal: Literal) -> Option<bool> {
        match self.raw(variable(literal)) {
            0 => None,
            d => Some((d > 0) == (literal > 0)),
        }
    }

    /// Check if a literal is satisfied by current assignments
    #[inline]
    pub fn satisfied(&self, literal: Literal) -> bool {
        self.value(literal) == Some(true)
    }

    /// Check if a literal conflicts with current assignments
    #[inline]
    pub fn conflict(&self, literal: Literal) -> bool {
        self.value(literal) == Some(false)
    }

    /// Check if a variable has been assigned (either way)
    #[inline]
    pub fn decided(&self, var: Variable) -> bool {
        self.raw(var) != 0
    }

    /// Check if a variable is unassigned
    #[inline]
    pub fn undecided(&self, var: Variable) -> bool {
        !self.decided(var)
    }

    /// Get the decision level at which a literal's variable was assigned
    #[inline]
    pub fn decision_level(&self, literal: Literal) -> Option<u32> {
        match self.raw(variable(literal)) {
            0 => None,
            d => Some(d.unsigned_abs() - 1),
        }
    }

    /// Get the clause that forced an assignment
    pub fn decision_rule(&self, literal: Literal) -> Option<u32> {
        let var = variable(literal);
        if self.decided(var) {
            self.reasons.get(var as usize).copied().flatten()
        } else {
            None
        }
    }

    /// Revert all assignments made at levels > target_level.
    ///
    /// The trail is level-ordered, so this only pops from its tail.
    pub fn revert_to_level(&mut self, target_level: u32) {
        while let Some(&(literal, _)) = self.decision_queue.last() {
            match self.decision_level(literal) {
                Some(level) if level > target_level => {
                    let var = variable(literal) as usize;
                    self.decision_map[var] = 0;
                    self.reasons[var] = None;
                    self.decision_queue.pop();
                }
                _ => break,
            }
        }

        self.level = target_level;
    }

    /// All variables currently assigned true, ascending
    pub fn true_variables(&self) -> Vec<Variable> {
        self.decision_map
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > 0)
            .map(|(id, _)| id as Variable)
            .collect()
    }

    /// Get the assignment trail
    pub fn queue(&self) -> &[(Literal, Option<u32>)] {
        &self.decision_queue
    }

    /// Get the number of assignments
    pub fn len(&self) -> usize {
        self.decision_queue.len()
    }

    /// Check if nothing has been assigned
    pub fn is_empty(&self) -> bool {
        self.decision_queue.is_empty()
    }
}
