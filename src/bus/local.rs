// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process event bus.
//!
//! Every listening handle owns an unbounded channel; publishing fans the
//! event out to all live subscribers under one lock, so every subscriber
//! observes the same publication order. Dropping a handle ends its
//! subscription; the dead sender is pruned on the next publish.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{MatchType, PatternCache};
use crate::errors::BusError;
use crate::traits::{BusHandle, Event, EventBus};

/// Shared in-memory transport; clones publish to the same subscribers.
#[derive(Clone, Default)]
pub struct LocalBus {
    subscribers: Arc<Mutex<Vec<Sender<Event>>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed form of [`EventBus::connect`].
    pub fn handle(&self, listen: bool) -> LocalBusHandle {
        let receiver = listen.then(|| {
            let (sender, receiver) = unbounded();
            self.subscribers.lock().push(sender);
            receiver
        });
        LocalBusHandle {
            bus: self.clone(),
            receiver,
            patterns: PatternCache::new(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Drops every subscription; listeners observe [`BusError::Disconnected`].
    pub fn disconnect_all(&self) {
        self.subscribers.lock().clear();
    }

    fn publish(&self, event: Event) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

impl EventBus for LocalBus {
    fn connect(&self, listen: bool) -> Result<Box<dyn BusHandle>, BusError> {
        Ok(Box::new(self.handle(listen)))
    }
}

pub struct LocalBusHandle {
    bus: LocalBus,
    receiver: Option<Receiver<Event>>,
    patterns: PatternCache,
}

impl LocalBusHandle {
    fn receiver(&self) -> Result<&Receiver<Event>, BusError> {
        self.receiver.as_ref().ok_or(BusError::NotListening)
    }
}

impl BusHandle for LocalBusHandle {
    fn fire_event(&self, data: &Value, tag: &str) -> Result<(), BusError> {
        self.bus.publish(Event::new(tag, data.clone()));
        Ok(())
    }

    fn next_event(&mut self, wait: Duration) -> Result<Option<Event>, BusError> {
        match self.receiver()?.recv_timeout(wait) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(BusError::Disconnected),
        }
    }

    fn get_event(
        &mut self,
        wait: Duration,
        tag: &str,
        match_type: MatchType,
    ) -> Result<Option<Event>, BusError> {
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match self.receiver()?.recv_timeout(remaining) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(BusError::Disconnected),
            };
            if self.patterns.is_match(&event.tag, tag, match_type)? {
                return Ok(Some(event));
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.receiver.is_some()
    }
}
