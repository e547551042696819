use std::fmt;

/// One sampled bus transaction: an ordered set of named field values.
///
/// Field order is fixed by the monitor configuration that produced the
/// record. Records are immutable once sampled and are consumed exactly once
/// by the checker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    fields: Vec<(&'static str, u64)>,
}

impl Transaction {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn push(&mut self, name: &'static str, value: u64) {
        self.fields.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.fields.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True if every field of `self` is present in `other` with an equal
    /// value. The checker compares `expected.matches(actual)` so a monitor
    /// may sample auxiliary fields (e.g. a ready flag) the model does not
    /// predict.
    pub fn matches(&self, other: &Transaction) -> bool {
        self.fields
            .iter()
            .all(|(name, value)| other.get(name) == Some(*value))
    }
}

impl FromIterator<(&'static str, u64)> for Transaction {
    fn from_iter<I: IntoIterator<Item = (&'static str, u64)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}=0x{:x}", name, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_and_lookup() {
        let txn: Transaction = [("data", 0xab_u64), ("ready", 1)].into_iter().collect();
        assert_eq!(txn.len(), 2);
        assert_eq!(txn.get("data"), Some(0xab));
        assert_eq!(txn.get("ready"), Some(1));
        assert_eq!(txn.get("missing"), None);
        let names: Vec<_> = txn.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["data", "ready"]);
    }

    #[test]
    fn subset_match() {
        let expected: Transaction = [("data", 7_u64)].into_iter().collect();
        let actual: Transaction = [("data", 7_u64), ("ready", 0)].into_iter().collect();
        assert!(expected.matches(&actual));

        let wrong: Transaction = [("data", 8_u64), ("ready", 0)].into_iter().collect();
        assert!(!expected.matches(&wrong));

        let missing: Transaction = [("ready", 0_u64)].into_iter().collect();
        assert!(!expected.matches(&missing));
    }

    #[test]
    fn display() {
        let txn: Transaction = [("data", 255_u64)].into_iter().collect();
        assert_eq!(txn.to_string(), "{data=0xff}");
    }
}
