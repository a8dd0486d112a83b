use std::collections::VecDeque;

/// The most recently committed hooks of a single digest run, oldest first.
///
/// Only consulted for similarity checks. Pushing beyond capacity evicts the
/// oldest entry.
#[derive(Debug, Clone)]
pub struct RecentHooks {
    capacity: usize,
    hooks: VecDeque<String>,
}

impl RecentHooks {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            hooks: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, hook: impl Into<String>) {
        self.hooks.push_back(hook.into());
        while self.hooks.len() > self.capacity {
            self.hooks.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<S: Into<String>> FromIterator<S> for RecentHooks {
    /// Unbounded window holding every item, mostly useful for one-off checks.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let hooks: VecDeque<String> = iter.into_iter().map(Into::into).collect();
        Self {
            capacity: hooks.len().max(1),
            hooks,
        }
    }
}
