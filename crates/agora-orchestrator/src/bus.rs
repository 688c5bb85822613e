use agora_core::{AgoraError, AgoraResult, Message, Recipient};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Outcome of a successful [`MessageBus::publish`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Ids of the subscribers that received the message.
    pub recipients: Vec<String>,
}

impl Delivery {
    /// Number of subscribers reached.
    pub fn count(&self) -> usize {
        self.recipients.len()
    }
}

/// Publish/subscribe transport between the hub and its agents.
///
/// Every published message is appended to the history before routing, so
/// undeliverable messages are still recorded. Delivery from one sender to
/// one subscriber preserves publish order.
pub trait MessageBus: Send + Sync {
    /// Register an inbox for `subscriber_id`, replacing any earlier one.
    fn subscribe(&self, subscriber_id: &str) -> mpsc::UnboundedReceiver<Message>;

    /// Drop the inbox for `subscriber_id`. Returns whether one existed.
    fn unsubscribe(&self, subscriber_id: &str) -> bool;

    /// Record and route a message.
    ///
    /// Broadcasts reach every subscriber except the sender. A point-to-point
    /// message to an unknown or closed inbox fails with
    /// [`AgoraError::UnknownRecipient`].
    fn publish(&self, message: Message) -> AgoraResult<Delivery>;

    /// Every message ever published, oldest first.
    fn history(&self) -> Vec<Message>;

    /// The last `n` published messages, oldest first.
    fn recent(&self, n: usize) -> Vec<Message>;

    /// Total number of published messages.
    fn message_count(&self) -> usize;

    /// Ids of the current subscribers.
    fn subscribers(&self) -> Vec<String>;
}

/// In-process [`MessageBus`] backed by unbounded mpsc inboxes.
pub struct InMemoryBus {
    inboxes: RwLock<HashMap<String, mpsc::UnboundedSender<Message>>>,
    history: RwLock<Vec<Message>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            inboxes: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    fn deliver(&self, id: &str, tx: &mpsc::UnboundedSender<Message>, message: &Message) -> bool {
        if tx.send(message.clone()).is_err() {
            warn!(subscriber = %id, "Inbox closed, message not delivered");
            return false;
        }
        true
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus for InMemoryBus {
    fn subscribe(&self, subscriber_id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self
            .inboxes
            .write()
            .insert(subscriber_id.to_string(), tx)
            .is_some()
        {
            warn!(subscriber = %subscriber_id, "Replacing existing subscription");
        }
        rx
    }

    fn unsubscribe(&self, subscriber_id: &str) -> bool {
        self.inboxes.write().remove(subscriber_id).is_some()
    }

    fn publish(&self, message: Message) -> AgoraResult<Delivery> {
        self.history.write().push(message.clone());

        let inboxes = self.inboxes.read();
        match &message.to {
            Recipient::Broadcast => {
                let mut recipients: Vec<String> = inboxes
                    .iter()
                    .filter(|(id, _)| **id != message.from)
                    .filter(|(id, tx)| self.deliver(id, tx, &message))
                    .map(|(id, _)| id.clone())
                    .collect();
                recipients.sort();
                debug!(
                    from = %message.from,
                    kind = %message.kind,
                    recipients = recipients.len(),
                    "Broadcast delivered"
                );
                Ok(Delivery { recipients })
            }
            Recipient::Agent(id) => match inboxes.get(id) {
                Some(tx) if self.deliver(id, tx, &message) => {
                    debug!(from = %message.from, to = %id, kind = %message.kind, "Message delivered");
                    Ok(Delivery {
                        recipients: vec![id.clone()],
                    })
                }
                _ => Err(AgoraError::UnknownRecipient(id.clone())),
            },
        }
    }

    fn history(&self) -> Vec<Message> {
        self.history.read().clone()
    }

    fn recent(&self, n: usize) -> Vec<Message> {
        let history = self.history.read();
        let start = history.len().saturating_sub(n);
        history[start..].to_vec()
    }

    fn message_count(&self) -> usize {
        self.history.read().len()
    }

    fn subscribers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inboxes.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
