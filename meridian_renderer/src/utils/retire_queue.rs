//! Deferred release of objects the GPU may still be reading

/// Objects waiting for the frames that may still use them to complete
pub struct RetireQueue<T> {
    entries: Vec<(u64, T)>,
}

impl<T> RetireQueue<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Queue `item`, last used by frame `frame`
    pub fn retire(&mut self, frame: u64, item: T) {
        self.entries.push((frame, item));
    }

    /// Take every item whose last frame is at most `completed`
    pub fn release(&mut self, completed: u64) -> Vec<T> {
        let (done, pending): (Vec<_>, Vec<_>) = self.entries.drain(..).partition(|(frame, _)| *frame <= completed);
        self.entries = pending;
        done.into_iter().map(|(_, item)| item).collect()
    }

    /// Take everything regardless of frame (device teardown)
    pub fn drain(&mut self) -> Vec<T> {
        self.entries.drain(..).map(|(_, item)| item).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for RetireQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "retire_queue_tests.rs"]
mod tests;
