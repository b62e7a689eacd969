//! Pending call queue
//!
//! FIFO of calls that have not been handed to an agent yet. Any number of
//! producers append at the tail; the routing loop pops from the head and
//! pushes failed handoffs back at the head so they are retried before newer
//! arrivals.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::call::Call;

/// A call waiting in the pending queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    pub call: Call,
    /// Failed handoff attempts so far
    pub attempts: u32,
    pub queued_at: DateTime<Utc>,
}

impl PendingCall {
    pub fn new(call: Call) -> Self {
        Self {
            call,
            attempts: 0,
            queued_at: Utc::now(),
        }
    }

    /// How long the call has been waiting, in milliseconds
    pub fn wait_ms(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.queued_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

#[derive(Debug, Default)]
pub struct PendingQueue {
    calls: Mutex<VecDeque<PendingCall>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new arrival; returns the queue length afterwards
    pub fn push_back(&self, call: Call) -> usize {
        let mut calls = self.calls.lock();
        calls.push_back(PendingCall::new(call));
        calls.len()
    }

    /// Put a call back ahead of everything else
    pub fn push_front(&self, call: PendingCall) {
        self.calls.lock().push_front(call);
    }

    pub fn pop_front(&self) -> Option<PendingCall> {
        self.calls.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Copy of the waiting calls, head first
    pub fn snapshot(&self) -> Vec<Call> {
        self.calls.lock().iter().map(|pending| pending.call.clone()).collect()
    }

    /// Wait time of the oldest queued call, in milliseconds
    pub fn longest_wait_ms(&self) -> u64 {
        let now = Utc::now();
        self.calls
            .lock()
            .iter()
            .map(|pending| pending.wait_ms(now))
            .max()
            .unwrap_or(0)
    }
}
