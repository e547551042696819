use std::fmt;

/// Payload carried by a completed testbench task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Val {
    None,
    Int(u64),
    String(String),
}

/// A sampled signal state: either a resolved value or indeterminate.
///
/// Undriven and unresolved signals read as `X`. Code that needs a number
/// must go through [`crate::SimObject::u64`], which surfaces `X` as a
/// fault instead of coercing it to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    V(u64),
    X,
}

impl Logic {
    pub fn is_high(&self) -> bool {
        matches!(self, Logic::V(1))
    }

    pub fn is_low(&self) -> bool {
        matches!(self, Logic::V(0))
    }

    pub fn resolved(&self) -> Option<u64> {
        match self {
            Logic::V(v) => Some(*v),
            Logic::X => None,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::V(v) => write!(f, "0x{:x}", v),
            Logic::X => write!(f, "x"),
        }
    }
}

impl From<u64> for Logic {
    fn from(v: u64) -> Self {
        Logic::V(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logic_predicates() {
        assert!(Logic::V(1).is_high());
        assert!(!Logic::V(0).is_high());
        assert!(Logic::V(0).is_low());
        assert!(!Logic::X.is_high());
        assert!(!Logic::X.is_low());
        assert_eq!(Logic::V(42).resolved(), Some(42));
        assert_eq!(Logic::X.resolved(), None);
    }

    #[test]
    fn logic_display() {
        assert_eq!(Logic::V(255).to_string(), "0xff");
        assert_eq!(Logic::X.to_string(), "x");
    }
}
