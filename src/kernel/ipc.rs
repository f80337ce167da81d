//! Inter-process communication
//!
//! Two facilities:
//! - Mailboxes: one FIFO queue per receiver pid, drained whole on receive
//! - Shared store: a flat last-writer-wins key/value map
//!
//! Neither validates pids against the process table. A mailbox is created
//! on first send. Tractable > Clever.

use super::logger::{NullLog, SharedLog};
use super::process::Pid;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// A message in a mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub sender: Pid,
    pub body: String,
}

impl Message {
    pub fn new(sender: Pid, body: impl Into<String>) -> Self {
        Self {
            sender,
            body: body.into(),
        }
    }
}

/// Mailboxes and shared store
pub struct Ipc {
    mailboxes: HashMap<Pid, VecDeque<Message>>,
    shared: BTreeMap<String, String>,
    log: SharedLog,
}

impl Ipc {
    pub fn new(log: SharedLog) -> Self {
        Self {
            mailboxes: HashMap::new(),
            shared: BTreeMap::new(),
            log,
        }
    }

    /// Append a message to the receiver's mailbox. Always succeeds.
    pub fn send(&mut self, sender: Pid, receiver: Pid, body: impl Into<String>) {
        self.mailboxes
            .entry(receiver)
            .or_default()
            .push_back(Message::new(sender, body));
        self.log
            .log(&format!("Message sent from {} to {}", sender, receiver));
        tracing::debug!(%sender, %receiver, "message sent");
    }

    /// Take every pending message for `receiver`, oldest first
    ///
    /// Returns an empty vec if there is no mailbox or it is empty.
    pub fn receive(&mut self, receiver: Pid) -> Vec<Message> {
        let Some(mailbox) = self.mailboxes.get_mut(&receiver) else {
            return Vec::new();
        };
        if mailbox.is_empty() {
            return Vec::new();
        }

        let messages: Vec<Message> = mailbox.drain(..).collect();
        self.log
            .log(&format!("Messages retrieved for {}", receiver));
        messages
    }

    pub fn shared_memory_write(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.log.log(&format!("Shared memory updated: {}", key));
        self.shared.insert(key, value.into());
    }

    /// `None` if the key was never written
    pub fn shared_memory_read(&self, key: &str) -> Option<&str> {
        self.shared.get(key).map(|v| v.as_str())
    }

    /// All keys, sorted
    pub fn shared_memory_list(&self) -> Vec<String> {
        self.shared.keys().cloned().collect()
    }
}

impl Default for Ipc {
    fn default() -> Self {
        Self::new(Arc::new(NullLog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::logger::MemoryLog;

    #[test]
    fn test_send_receive_fifo() {
        let mut ipc = Ipc::default();
        ipc.send(Pid(1), Pid(2), "first");
        ipc.send(Pid(3), Pid(2), "second");

        let messages = ipc.receive(Pid(2));
        assert_eq!(
            messages,
            vec![Message::new(Pid(1), "first"), Message::new(Pid(3), "second")]
        );
    }

    #[test]
    fn test_receive_drains() {
        let mut ipc = Ipc::default();
        ipc.send(Pid(1), Pid(2), "hello");

        assert_eq!(ipc.receive(Pid(2)).len(), 1);
        assert!(ipc.receive(Pid(2)).is_empty());
    }

    #[test]
    fn test_receive_without_mailbox() {
        let mut ipc = Ipc::default();
        assert!(ipc.receive(Pid(42)).is_empty());
    }

    #[test]
    fn test_mailboxes_are_per_receiver() {
        let mut ipc = Ipc::default();
        ipc.send(Pid(1), Pid(2), "to two");
        ipc.send(Pid(1), Pid(3), "to three");

        assert_eq!(ipc.receive(Pid(3)), vec![Message::new(Pid(1), "to three")]);
        assert_eq!(ipc.receive(Pid(2)), vec![Message::new(Pid(1), "to two")]);
    }

    #[test]
    fn test_shared_memory_round_trip() {
        let mut ipc = Ipc::default();
        ipc.shared_memory_write("k", "v");
        assert_eq!(ipc.shared_memory_read("k"), Some("v"));

        ipc.shared_memory_write("k", "w");
        assert_eq!(ipc.shared_memory_read("k"), Some("w"));
    }

    #[test]
    fn test_shared_memory_absent_key() {
        let ipc = Ipc::default();
        assert_eq!(ipc.shared_memory_read("missing"), None);
    }

    #[test]
    fn test_shared_memory_list() {
        let mut ipc = Ipc::default();
        ipc.shared_memory_write("beta", "2");
        ipc.shared_memory_write("alpha", "1");
        assert_eq!(ipc.shared_memory_list(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_events_logged() {
        let log = Arc::new(MemoryLog::new());
        let mut ipc = Ipc::new(log.clone());
        ipc.send(Pid(1), Pid(2), "x");
        ipc.receive(Pid(2));
        ipc.receive(Pid(2)); // empty, not logged
        ipc.shared_memory_write("k", "v");

        assert_eq!(
            log.messages(),
            vec![
                "Message sent from 1 to 2",
                "Messages retrieved for 2",
                "Shared memory updated: k",
            ]
        );
    }
}
