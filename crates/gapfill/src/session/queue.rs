//! Navigation over the keys flagged by a scan.

/// Keys of primary rows with missing values, in scan order.
///
/// Stable until the next scan. Navigation is clamped at both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlaggedKeyQueue {
    keys: Vec<String>,
    position: Option<usize>,
}

impl FlaggedKeyQueue {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            position: None,
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Current position, `None` before the first step.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn current(&self) -> Option<&str> {
        self.position.map(|p| self.keys[p].as_str())
    }

    /// Advance and return the key now current. Stays on the last key at the end.
    pub fn next_key(&mut self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let next = match self.position {
            None => 0,
            Some(p) => (p + 1).min(self.keys.len() - 1),
        };
        self.position = Some(next);
        self.current()
    }

    /// Step back and return the key now current. Stays on the first key at the start.
    pub fn prev_key(&mut self) -> Option<&str> {
        let p = self.position?;
        self.position = Some(p.saturating_sub(1));
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_is_clamped() {
        let mut queue = FlaggedKeyQueue::new(vec!["a".into(), "b".into()]);
        assert_eq!(queue.current(), None);
        assert_eq!(queue.prev_key(), None);
        assert_eq!(queue.next_key(), Some("a"));
        assert_eq!(queue.next_key(), Some("b"));
        assert_eq!(queue.next_key(), Some("b"));
        assert_eq!(queue.position(), Some(1));
        assert_eq!(queue.prev_key(), Some("a"));
        assert_eq!(queue.prev_key(), Some("a"));
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = FlaggedKeyQueue::default();
        assert!(queue.is_empty());
        assert_eq!(queue.next_key(), None);
        assert_eq!(queue.position(), None);
    }
}
