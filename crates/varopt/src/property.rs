use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A named, unit-bearing objective of a feature system.
///
/// Two properties with the same name are the same property, whatever their
/// unit or direction says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    name: String,
    unit: String,
    minimize: bool,
}

impl Property {
    /// `minimize` is true when lower values are better (`<` in a performance table)
    pub fn new(name: impl Into<String>, unit: impl Into<String>, minimize: bool) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            minimize,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn minimize(&self) -> bool {
        self.minimize
    }

    /// Whether `candidate` is strictly better than `incumbent` for this property
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        if self.minimize {
            candidate < incumbent
        } else {
            candidate > incumbent
        }
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Property {}

impl Hash for Property {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property: {} [{}]", self.name, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_equality_by_name() {
        let a = Property::new("price", "EUR", true);
        let b = Property::new("price", "USD", false);
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1.0);
        assert_eq!(map.get(&b), Some(&1.0));
    }

    #[test]
    fn test_improves() {
        let price = Property::new("price", "EUR", true);
        let speed = Property::new("speed", "km/h", false);

        assert!(price.improves(1.0, 2.0));
        assert!(!price.improves(2.0, 2.0));
        assert!(speed.improves(3.0, 2.0));
        assert!(!speed.improves(2.0, 2.0));
    }
}
