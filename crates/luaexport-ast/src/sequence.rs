/// Monotonic counter for synthetic identifiers
///
/// Owned by whoever needs fresh numbers (the analysis context for collision
/// qualifiers, test fixtures for source lines), never shared between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    next: u32,
}

impl Sequence {
    pub fn starting_at(first: u32) -> Self {
        Sequence { next: first }
    }

    pub fn next_value(&mut self) -> u32 {
        let value = self.next;
        self.next = self.next.saturating_add(1);
        value
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Sequence::starting_at(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_independent_sequences() {
        let mut first = Sequence::default();
        let mut second = Sequence::starting_at(2);
        assert_eq!(first.next_value(), 1);
        assert_eq!(first.next_value(), 2);
        assert_eq!(second.next_value(), 2);
        assert_eq!(first.next_value(), 3);
    }
}
