use std::collections::VecDeque;

use {
    serde::{Deserialize, Serialize},
    tokio::sync::Mutex,
};

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Bounded FIFO of recent turns. The oldest turn is dropped on overflow.
pub struct ConversationLog {
    capacity: usize,
    turns: Mutex<VecDeque<ConversationTurn>>,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ConversationLog {
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            turns: Mutex::new(VecDeque::with_capacity(capacity + 1)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a turn and return the resulting log, both under one lock.
    pub async fn append(&self, turn: ConversationTurn) -> Vec<ConversationTurn> {
        let mut turns = self.turns.lock().await;
        turns.push_back(turn);
        while turns.len() > self.capacity {
            turns.pop_front();
        }
        turns.iter().cloned().collect()
    }

    /// Owned copy, oldest first.
    pub async fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.turns.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.turns.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc};

    fn turn(n: usize) -> ConversationTurn {
        ConversationTurn::new(format!("q{n}"), format!("a{n}"))
    }

    #[tokio::test]
    async fn keeps_last_ten_in_order() {
        let log = ConversationLog::default();
        for n in 1..=15 {
            log.append(turn(n)).await;
        }
        let snap = log.snapshot().await;
        assert_eq!(snap.len(), 10);
        let expected: Vec<ConversationTurn> = (6..=15).map(turn).collect();
        assert_eq!(snap, expected);
    }

    #[tokio::test]
    async fn append_returns_post_append_state() {
        let log = ConversationLog::new(2);
        assert_eq!(log.append(turn(1)).await, vec![turn(1)]);
        assert_eq!(log.append(turn(2)).await, vec![turn(1), turn(2)]);
        assert_eq!(log.append(turn(3)).await, vec![turn(2), turn(3)]);
    }

    #[tokio::test]
    async fn snapshot_is_detached() {
        let log = ConversationLog::default();
        log.append(turn(1)).await;
        let before = log.snapshot().await;
        log.append(turn(2)).await;
        assert_eq!(before, vec![turn(1)]);
        assert_eq!(log.len().await, 2);
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let log = ConversationLog::new(0);
        assert_eq!(log.capacity(), 1);
        log.append(turn(1)).await;
        log.append(turn(2)).await;
        assert_eq!(log.snapshot().await, vec![turn(2)]);
    }

    #[tokio::test]
    async fn concurrent_appends_respect_capacity() {
        let log = Arc::new(ConversationLog::default());
        let mut tasks = Vec::new();
        for n in 0..100 {
            let log = Arc::clone(&log);
            tasks.push(tokio::spawn(async move {
                let snap = log.append(turn(n)).await;
                assert!(snap.len() <= 10);
                assert!(snap.contains(&turn(n)));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snap = log.snapshot().await;
        assert_eq!(snap.len(), 10);
        let mut questions: Vec<&str> = snap.iter().map(|t| t.question.as_str()).collect();
        questions.sort_unstable();
        questions.dedup();
        assert_eq!(questions.len(), 10);
    }
}
