use std::collections::HashSet;

use varopt_sat::Variable;

/// Frozen result of a successful enumeration.
///
/// Each model is the ascending list of the binary feature ids it activates.
#[derive(Debug, Default)]
pub struct ValidModels {
    models: Vec<Vec<Variable>>,
    index: HashSet<Vec<Variable>>,
}

impl ValidModels {
    pub(crate) fn new(models: Vec<Vec<Variable>>) -> Self {
        let index = models.iter().cloned().collect();
        Self { models, index }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Models in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &[Variable]> {
        self.models.iter().map(Vec::as_slice)
    }

    pub(crate) fn as_slice(&self) -> &[Vec<Variable>] {
        &self.models
    }

    pub fn get(&self, index: usize) -> Option<&[Variable]> {
        self.models.get(index).map(Vec::as_slice)
    }

    /// Whether `active` (ascending) is exactly one of the models
    pub fn contains(&self, active: &[Variable]) -> bool {
        self.index.contains(active)
    }

    /// The first model with the fewest active features
    pub fn smallest(&self) -> Option<&[Variable]> {
        self.models.iter().min_by_key(|m| m.len()).map(Vec::as_slice)
    }
}

/// `|a \ b| + |b \ a|` for two ascending id lists
pub(crate) fn symmetric_difference(a: &[Variable], b: &[Variable]) -> usize {
    let (mut i, mut j, mut diff) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            i += 1;
            j += 1;
        } else if a[i] < b[j] {
            diff += 1;
            i += 1;
        } else {
            diff += 1;
            j += 1;
        }
    }
    diff + (a.len() - i) + (b.len() - j)
}
