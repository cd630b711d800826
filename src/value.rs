//! A single integer slot in a rule: either a literal or a reference to an
//! argument by index (index `0` is the implicit `_toggle` argument).
//!
//! This collapses the Python source's `ValueOrArg` (a struct with a
//! `value`/`arg` pair, where `arg == 0` means "literal") into a proper sum
//! type, per spec §9's "Tagged variants" note.

/// Index into the argument vector reserved for the implicit `_toggle` bit.
pub const TOGGLE_INDEX: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrArg {
    Literal(i128),
    Arg(usize),
}

impl Default for ValueOrArg {
    fn default() -> Self {
        ValueOrArg::Literal(0)
    }
}

impl ValueOrArg {
    pub fn literal(value: i128) -> Self {
        ValueOrArg::Literal(value)
    }

    pub fn arg(index: usize) -> Self {
        ValueOrArg::Arg(index)
    }

    /// Returns the literal value, or the referenced argument's current
    /// value out of `args` (where `args[0]` is `_toggle`).
    pub fn get(&self, args: &[i128]) -> i128 {
        match *self {
            ValueOrArg::Literal(v) => v,
            ValueOrArg::Arg(idx) => args.get(idx).copied().unwrap_or(0),
        }
    }

    pub fn has_arg(&self) -> bool {
        matches!(self, ValueOrArg::Arg(_))
    }

    /// The argument index this points at, if any.
    pub fn arg_index(&self) -> Option<usize> {
        match *self {
            ValueOrArg::Arg(idx) => Some(idx),
            ValueOrArg::Literal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_ignores_args() {
        let v = ValueOrArg::literal(42);
        assert_eq!(v.get(&[1, 2, 3]), 42);
        assert!(!v.has_arg());
    }

    #[test]
    fn arg_reads_from_slice() {
        let v = ValueOrArg::arg(2);
        assert_eq!(v.get(&[1, 2, 3]), 3);
        assert!(v.has_arg());
        assert_eq!(v.arg_index(), Some(2));
    }
}
