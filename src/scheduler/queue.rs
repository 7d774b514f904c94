//! Concurrent due-time priority queue.
//!
//! Jobs are ordered by their next due time, earliest first, with ties
//! broken by registration order. The queue is the single shared mutable
//! structure between the registration path and the dispatcher.

use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tokio::sync::{Mutex, Notify};

use crate::core::job::Job;
use crate::core::types::JobId;

/// Thread-safe min-heap of jobs keyed by `next_due_at`.
///
/// `take_earliest` suspends on an internal [`Notify`] while the queue is
/// empty; `insert` rings it. `Notify`'s stored-permit semantics mean an
/// insert that lands between the taker's empty check and its await still
/// wakes it, so no entry is ever stranded.
pub(crate) struct DueQueue {
    heap: Mutex<BinaryHeap<Reverse<Job>>>,
    bell: Notify,
}

impl DueQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            bell: Notify::new(),
        }
    }

    /// Insert a job; returns true if it is now the earliest-due entry.
    pub(crate) async fn insert(&self, job: Job) -> bool {
        let arrival = job.arrival();
        let mut heap = self.heap.lock().await;
        heap.push(Reverse(job));
        let is_head = heap
            .peek()
            .map(|Reverse(head)| head.arrival() == arrival)
            .unwrap_or(false);
        drop(heap);
        self.bell.notify_one();
        is_head
    }

    /// Snapshot the earliest-due entry without removing it.
    pub(crate) async fn peek(&self) -> Option<(JobId, DateTime<Utc>)> {
        let heap = self.heap.lock().await;
        heap.peek().map(|Reverse(job)| (job.id(), job.next_due_at()))
    }

    /// Remove and return the earliest-due job, waiting while the queue is
    /// empty.
    pub(crate) async fn take_earliest(&self) -> Job {
        loop {
            if let Some(Reverse(job)) = self.heap.lock().await.pop() {
                return job;
            }
            self.bell.notified().await;
        }
    }

    /// Number of queued jobs.
    pub(crate) async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }
}
