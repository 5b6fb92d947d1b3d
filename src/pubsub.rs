//! Pub/sub channel bookkeeping.
//!
//! Tracks channel subscriptions, queues outbound frames while no transport
//! is attached, and replays subscriptions when one (re)connects. The
//! WebSocket itself belongs to the embedding application: it drains frames
//! through the attached sender and feeds inbound messages to `dispatch`.

use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// A pubsub protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Frame {
  Sub { channel: String },
  Unsub { channel: String },
  Pub { channel: String, data: Value },
}

/// Stream of messages published to one channel.
pub struct Subscription {
  channel: String,
  receiver: mpsc::UnboundedReceiver<Value>,
}

impl Subscription {
  pub fn channel(&self) -> &str {
    &self.channel
  }

  pub async fn next(&mut self) -> Option<Value> {
    self.receiver.recv().await
  }
}

impl Stream for Subscription {
  type Item = Value;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Value>> {
    self.receiver.poll_recv(cx)
  }
}

/// Channel registry and outbound frame queue.
#[derive(Default)]
pub struct Pubsub {
  handlers: HashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
  transport: Option<mpsc::UnboundedSender<Frame>>,
  queue: Vec<Frame>,
}

impl Pubsub {
  pub fn new() -> Self {
    Self::default()
  }

  /// Subscribe to a channel. The first subscriber of a channel emits a
  /// `sub` frame to the server.
  pub fn subscribe(&mut self, channel: &str) -> Subscription {
    let (sender, receiver) = mpsc::unbounded_channel();
    let subscribers = self.handlers.entry(channel.to_string()).or_default();
    let first = subscribers.is_empty();
    subscribers.push(sender);
    if first {
      self.send(Frame::Sub {
        channel: channel.to_string(),
      });
    }
    Subscription {
      channel: channel.to_string(),
      receiver,
    }
  }

  /// Drop every subscriber of a channel and tell the server.
  pub fn unsubscribe(&mut self, channel: &str) {
    if self.handlers.remove(channel).is_some() {
      self.send(Frame::Unsub {
        channel: channel.to_string(),
      });
    }
  }

  /// Publish a message to a channel.
  pub fn publish(&mut self, channel: &str, data: Value) {
    self.send(Frame::Pub {
      channel: channel.to_string(),
      data,
    });
  }

  fn send(&mut self, frame: Frame) {
    let delivered = match &self.transport {
      Some(sender) => sender.send(frame.clone()).is_ok(),
      None => false,
    };
    if !delivered {
      // transport is absent or went away, queue until the next attach
      self.transport = None;
      self.queue.push(frame);
    }
  }

  /// Attach a (re)connected transport: resubscribe every live channel, then
  /// flush frames queued while offline.
  pub fn attach(&mut self, sender: mpsc::UnboundedSender<Frame>) -> Result<()> {
    for channel in self.handlers.keys() {
      let frame = Frame::Sub {
        channel: channel.clone(),
      };
      if sender.send(frame).is_err() {
        return Err(Error::ChannelClosed);
      }
    }
    while let Some(frame) = self.queue.first().cloned() {
      if sender.send(frame).is_err() {
        return Err(Error::ChannelClosed);
      }
      self.queue.remove(0);
    }
    self.transport = Some(sender);
    Ok(())
  }

  pub fn detach(&mut self) {
    self.transport = None;
  }

  /// Route an inbound message to local subscribers, pruning closed ones.
  pub fn dispatch(&mut self, channel: &str, data: Value) {
    let prune = match self.handlers.get_mut(channel) {
      Some(subscribers) => {
        subscribers.retain(|sender| sender.send(data.clone()).is_ok());
        subscribers.is_empty()
      }
      None => false,
    };
    if prune {
      self.handlers.remove(channel);
    }
  }

  pub fn has_subscribers(&self, channel: &str) -> bool {
    self.handlers.contains_key(channel)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_frame_wire_shapes() {
    let sub = serde_json::to_value(Frame::Sub {
      channel: "lobby".to_string(),
    })
    .unwrap();
    assert_eq!(sub, json!({"action": "sub", "channel": "lobby"}));

    let publish = serde_json::to_value(Frame::Pub {
      channel: "lobby".to_string(),
      data: json!({"text": "hi"}),
    })
    .unwrap();
    assert_eq!(
      publish,
      json!({"action": "pub", "channel": "lobby", "data": {"text": "hi"}})
    );

    let parsed: Frame = serde_json::from_value(json!({"action": "unsub", "channel": "lobby"}))
      .unwrap();
    assert_eq!(
      parsed,
      Frame::Unsub {
        channel: "lobby".to_string()
      }
    );
  }

  #[test]
  fn test_frames_queue_until_attach() {
    let mut pubsub = Pubsub::new();
    let _sub = pubsub.subscribe("lobby");
    pubsub.publish("lobby", json!("hello"));

    let (sender, mut receiver) = mpsc::unbounded_channel();
    pubsub.attach(sender).unwrap();

    // resubscription first, then the queued frames in order
    assert_eq!(
      receiver.try_recv().unwrap(),
      Frame::Sub {
        channel: "lobby".to_string()
      }
    );
    assert_eq!(
      receiver.try_recv().unwrap(),
      Frame::Sub {
        channel: "lobby".to_string()
      }
    );
    assert_eq!(
      receiver.try_recv().unwrap(),
      Frame::Pub {
        channel: "lobby".to_string(),
        data: json!("hello")
      }
    );
    assert!(receiver.try_recv().is_err());
  }

  #[test]
  fn test_dispatch_routes_to_subscribers() {
    let mut pubsub = Pubsub::new();
    let mut sub = pubsub.subscribe("lobby");
    pubsub.dispatch("lobby", json!({"n": 1}));
    pubsub.dispatch("other", json!({"n": 2}));

    assert_eq!(sub.receiver.try_recv().unwrap(), json!({"n": 1}));
    assert!(sub.receiver.try_recv().is_err());
  }

  #[test]
  fn test_dispatch_prunes_dropped_subscribers() {
    let mut pubsub = Pubsub::new();
    let sub = pubsub.subscribe("lobby");
    drop(sub);
    pubsub.dispatch("lobby", json!(1));
    assert!(!pubsub.has_subscribers("lobby"));
  }

  #[test]
  fn test_second_subscriber_does_not_resend_sub() {
    let mut pubsub = Pubsub::new();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    pubsub.attach(sender).unwrap();

    let _a = pubsub.subscribe("lobby");
    let _b = pubsub.subscribe("lobby");
    assert_eq!(
      receiver.try_recv().unwrap(),
      Frame::Sub {
        channel: "lobby".to_string()
      }
    );
    assert!(receiver.try_recv().is_err());
  }

  #[test]
  fn test_unsubscribe_emits_unsub() {
    let mut pubsub = Pubsub::new();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    pubsub.attach(sender).unwrap();

    let _sub = pubsub.subscribe("lobby");
    pubsub.unsubscribe("lobby");

    assert_eq!(
      receiver.try_recv().unwrap(),
      Frame::Sub {
        channel: "lobby".to_string()
      }
    );
    assert_eq!(
      receiver.try_recv().unwrap(),
      Frame::Unsub {
        channel: "lobby".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_subscription_stream() {
    use futures::StreamExt;

    let mut pubsub = Pubsub::new();
    let mut sub = pubsub.subscribe("lobby");
    pubsub.dispatch("lobby", json!("first"));
    assert_eq!(sub.next().await, Some(json!("first")));

    pubsub.dispatch("lobby", json!("second"));
    assert_eq!(StreamExt::next(&mut sub).await, Some(json!("second")));
  }
}
