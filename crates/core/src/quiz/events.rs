use std::fmt;

/// Notification emitted after each successful machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    Started { total: usize },
    AnswerSelected { position: usize },
    Advanced { position: usize },
    WentBack { position: usize },
    Completed { score: u32, total: usize },
    Reset,
}

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Explicit observer registry for the state machine.
///
/// Callbacks run synchronously after the transition completes, in no
/// guaranteed order relative to each other. The machine is single-threaded
/// by contract, so no locking is involved.
pub(crate) struct Observers {
    next_id: u64,
    subscribers: Vec<(ObserverId, Box<dyn Fn(&QuizEvent) + Send>)>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub(crate) fn subscribe(&mut self, callback: Box<dyn Fn(&QuizEvent) + Send>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, callback));
        id
    }

    /// Returns true if the observer was registered.
    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() < before
    }

    pub(crate) fn emit(&self, event: &QuizEvent) {
        for (_, callback) in &self.subscribers {
            callback(event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
