//! In-process proof topic backed by a tokio mpsc channel
//!
//! Used by tests and local development in place of Kafka. Offsets are
//! assigned on publish. A message that was received but not acknowledged
//! when its subscription closes is redelivered to the next subscriber,
//! the same at-least-once behaviour a consumer group gives.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use super::{ProofSource, SourceFactory, StreamMessage};
use crate::infra::{GatewayError, Result};

struct TopicState {
    name: String,
    receiver: tokio::sync::Mutex<mpsc::Receiver<StreamMessage>>,
    redeliver: Mutex<VecDeque<StreamMessage>>,
    acked: Mutex<Vec<i64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Producer half of a channel topic
#[derive(Clone)]
pub struct ChannelPublisher {
    topic: String,
    sender: mpsc::Sender<StreamMessage>,
    next_offset: Arc<AtomicI64>,
}

impl ChannelPublisher {
    /// Publish a raw payload; returns its offset.
    pub async fn publish(&self, payload: Vec<u8>) -> Result<i64> {
        let offset = self.next_offset.fetch_add(1, Ordering::SeqCst);
        let message = StreamMessage {
            topic: self.topic.clone(),
            partition: 0,
            offset,
            payload,
        };
        self.sender
            .send(message)
            .await
            .map_err(|_| GatewayError::Stream(format!("topic {} is closed", self.topic)))?;
        Ok(offset)
    }

    pub async fn publish_json<T: Serialize>(&self, value: &T) -> Result<i64> {
        let payload =
            serde_json::to_vec(value).map_err(|e| GatewayError::Internal(e.to_string()))?;
        self.publish(payload).await
    }
}

/// Consumer side of a channel topic; hands out subscriptions.
#[derive(Clone)]
pub struct ChannelTopic {
    state: Arc<TopicState>,
}

impl ChannelTopic {
    pub fn new(name: impl Into<String>, capacity: usize) -> (ChannelPublisher, ChannelTopic) {
        let name = name.into();
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        let publisher = ChannelPublisher {
            topic: name.clone(),
            sender,
            next_offset: Arc::new(AtomicI64::new(0)),
        };
        let topic = ChannelTopic {
            state: Arc::new(TopicState {
                name,
                receiver: tokio::sync::Mutex::new(receiver),
                redeliver: Mutex::new(VecDeque::new()),
                acked: Mutex::new(Vec::new()),
            }),
        };
        (publisher, topic)
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Offsets acknowledged so far, in acknowledgement order
    pub fn acked_offsets(&self) -> Vec<i64> {
        lock(&self.state.acked).clone()
    }
}

#[async_trait]
impl SourceFactory for ChannelTopic {
    async fn subscribe(&self) -> Result<Box<dyn ProofSource>> {
        Ok(Box::new(ChannelProofSource {
            state: self.state.clone(),
            in_flight: None,
        }))
    }
}

/// One subscription to a channel topic
pub struct ChannelProofSource {
    state: Arc<TopicState>,
    in_flight: Option<StreamMessage>,
}

#[async_trait]
impl ProofSource for ChannelProofSource {
    async fn recv(&mut self) -> Result<Option<StreamMessage>> {
        // An unacked message from this subscription is delivered again.
        if let Some(message) = &self.in_flight {
            return Ok(Some(message.clone()));
        }

        let redelivered = lock(&self.state.redeliver).pop_front();
        let next = match redelivered {
            Some(message) => Some(message),
            None => self.state.receiver.lock().await.recv().await,
        };

        self.in_flight = next.clone();
        Ok(next)
    }

    async fn ack(&mut self, message: &StreamMessage) -> Result<()> {
        if self.in_flight.as_ref().map(|m| m.offset) == Some(message.offset) {
            self.in_flight = None;
        }
        lock(&self.state.acked).push(message.offset);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(message) = self.in_flight.take() {
            lock(&self.state.redeliver).push_front(message);
        }
    }
}
