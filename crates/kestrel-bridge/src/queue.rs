//! Message-queue abstraction.
//!
//! A queue is one logical thread of execution: everything posted to one
//! queue runs serialized, in post order. The bridge never pumps a queue
//! itself — it dispatches onto whichever queue the embedder hands it.
//! The script executor and all native-module calls bound to a given
//! queue are serialized on it; adapters bound to different queues may
//! run concurrently with respect to each other.

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use std::thread::JoinHandle;

/// A unit of work posted to a queue.
pub type QueueTask = Box<dyn FnOnce() + Send>;

/// Single logical thread of execution onto which work is serialized.
pub trait MessageQueue: Send + Sync {
    /// Enqueue `task` and return immediately.
    fn run(&self, task: QueueTask);

    /// Enqueue `task` and block the caller until it has completed.
    ///
    /// Must not be called from the queue's own thread; that would wait
    /// on work the blocked thread is supposed to run.
    fn run_sync(&self, task: QueueTask);
}

/// Queue that executes tasks on the caller's thread, immediately.
///
/// Useful for tests and for embedders whose host loop already provides
/// the serialization guarantee.
pub struct InlineQueue;

impl MessageQueue for InlineQueue {
    fn run(&self, task: QueueTask) {
        task();
    }

    fn run_sync(&self, task: QueueTask) {
        task();
    }
}

/// Queue backed by a dedicated worker thread draining a channel.
///
/// Tasks run strictly in post order. Dropping the queue disconnects the
/// channel and joins the worker after it has drained everything already
/// posted; nothing accepted before the drop is lost.
pub struct WorkerQueue {
    // Some until Drop disconnects the channel.
    sender: Option<Sender<QueueTask>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerQueue {
    /// Spawn the worker thread and return the queue.
    pub fn new(name: &str) -> Self {
        let (sender, receiver) = channel::unbounded::<QueueTask>();

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // recv keeps yielding buffered tasks after the sender is
                // dropped, erring only once the channel is empty.
                while let Ok(task) = receiver.recv() {
                    task();
                }
            })
            .expect("failed to spawn queue worker thread");

        Self {
            sender: Some(sender),
            handle: Mutex::new(Some(handle)),
        }
    }

    fn send(&self, task: QueueTask) -> bool {
        match &self.sender {
            Some(sender) => sender.send(task).is_ok(),
            None => false,
        }
    }
}

impl MessageQueue for WorkerQueue {
    fn run(&self, task: QueueTask) {
        // A disconnected channel means the worker is gone; the task is
        // dropped, matching fire-and-forget semantics during teardown.
        let _ = self.send(task);
    }

    fn run_sync(&self, task: QueueTask) {
        let (done_tx, done_rx) = channel::bounded::<()>(1);
        let wrapped: QueueTask = Box::new(move || {
            task();
            let _ = done_tx.send(());
        });
        if self.send(wrapped) {
            let _ = done_rx.recv();
        }
    }
}

impl Drop for WorkerQueue {
    fn drop(&mut self) {
        // Dropping the sole sender disconnects the channel; the worker
        // finishes the backlog, then recv errors and it exits.
        self.sender.take();
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_worker_queue_runs_in_post_order() {
        let queue = WorkerQueue::new("test-order");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..16 {
            let seen = seen.clone();
            queue.run(Box::new(move || seen.lock().push(i)));
        }
        // run_sync acts as a barrier: everything before it has run.
        queue.run_sync(Box::new(|| {}));

        assert_eq!(*seen.lock(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_run_sync_blocks_until_task_completes() {
        let queue = WorkerQueue::new("test-sync");
        let flag = Arc::new(AtomicBool::new(false));
        let task_flag = flag.clone();

        queue.run_sync(Box::new(move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            task_flag.store(true, Ordering::Release);
        }));

        assert!(flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_drop_drains_already_posted_tasks() {
        let queue = WorkerQueue::new("test-drain");
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let ran = ran.clone();
            queue.run(Box::new(move || {
                std::thread::sleep(std::time::Duration::from_millis(1));
                ran.fetch_add(1, Ordering::SeqCst);
            }));
        }
        // Drop joins the worker only after the backlog has run.
        drop(queue);

        assert_eq!(ran.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_inline_queue_runs_immediately() {
        let queue = InlineQueue;
        let hit = Arc::new(AtomicBool::new(false));
        let task_hit = hit.clone();
        queue.run(Box::new(move || task_hit.store(true, Ordering::Release)));
        assert!(hit.load(Ordering::Acquire));
    }
}
