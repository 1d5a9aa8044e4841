//! Outbound command queue
//!
//! Commands are appended by any caller context and drained by the session
//! loop from the NEWEST end: under backlog the most recent command wins and
//! stale queued commands are sent later. This LIFO drain is an observable
//! behavioral contract of the command channel. It can starve an older,
//! still-relevant command if newer ones keep arriving; see
//! `test_backlog_prefers_newest_and_can_starve_oldest`.

use crate::protocol::RequestKind;
use parking_lot::Mutex;

/// An encoded wire message awaiting transmission, tagged with what it is
#[derive(Debug, Clone)]
pub struct QueuedCommand {
    pub bytes: Vec<u8>,
    pub kind: RequestKind,
}

/// Concurrency-safe outbound buffer shared between host calls and the
/// session loop
#[derive(Debug, Default)]
pub struct CommandQueue {
    inner: Mutex<Vec<QueuedCommand>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        CommandQueue {
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Append a command; callable from any context
    pub fn push(&self, command: QueuedCommand) {
        self.inner.lock().push(command);
    }

    /// Remove and return the most recently pushed command not yet sent
    pub fn pop_newest(&self) -> Option<QueuedCommand> {
        self.inner.lock().pop()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn command(id: u8) -> QueuedCommand {
        QueuedCommand {
            bytes: vec![id],
            kind: RequestKind::Identify,
        }
    }

    #[test]
    fn test_pop_newest_is_lifo() {
        let queue = CommandQueue::new();
        queue.push(command(1));
        queue.push(command(2));
        queue.push(command(3));

        assert_eq!(queue.pop_newest().unwrap().bytes, vec![3]);
        assert_eq!(queue.pop_newest().unwrap().bytes, vec![2]);
        queue.push(command(4));
        assert_eq!(queue.pop_newest().unwrap().bytes, vec![4]);
        assert_eq!(queue.pop_newest().unwrap().bytes, vec![1]);
        assert!(queue.pop_newest().is_none());
    }

    #[test]
    fn test_length_accounting() {
        let queue = CommandQueue::new();
        assert!(queue.is_empty());

        for i in 0..10 {
            queue.push(command(i));
        }
        assert_eq!(queue.len(), 10);

        for popped in 1..=4 {
            queue.pop_newest();
            assert_eq!(queue.len(), 10 - popped);
        }
    }

    #[test]
    fn test_backlog_prefers_newest_and_can_starve_oldest() {
        // A stale start-recording command queued behind newer traffic is
        // drained LAST: most recent intent wins. This is also the starvation
        // risk that policy carries.
        let queue = CommandQueue::new();
        queue.push(QueuedCommand {
            bytes: b"<StartRecordingReq/>".to_vec(),
            kind: RequestKind::StartRecording,
        });
        queue.push(QueuedCommand {
            bytes: b"<IdentifyReq/>".to_vec(),
            kind: RequestKind::Identify,
        });
        queue.push(QueuedCommand {
            bytes: b"<IdentifyReq/>".to_vec(),
            kind: RequestKind::Identify,
        });

        assert_eq!(queue.pop_newest().unwrap().kind, RequestKind::Identify);
        assert_eq!(queue.pop_newest().unwrap().kind, RequestKind::Identify);
        // Only once the backlog is drained does the stale command go out
        assert_eq!(
            queue.pop_newest().unwrap().kind,
            RequestKind::StartRecording
        );
    }

    #[test]
    fn test_concurrent_push_pop_loses_nothing() {
        let queue = Arc::new(CommandQueue::new());
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..100u8 {
                        queue.push(QueuedCommand {
                            bytes: vec![w, i],
                            kind: RequestKind::Identify,
                        });
                    }
                })
            })
            .collect();

        let popper = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let mut seen = Vec::new();
                while seen.len() < 200 {
                    if let Some(cmd) = queue.pop_newest() {
                        seen.push(cmd.bytes);
                    } else {
                        std::thread::yield_now();
                    }
                }
                seen
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        let mut seen = popper.join().unwrap();
        while let Some(cmd) = queue.pop_newest() {
            seen.push(cmd.bytes);
        }

        // Every pushed entry came out exactly once
        assert_eq!(seen.len(), 400);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 400);
    }
}
