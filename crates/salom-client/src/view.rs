//! Client-side view of one chat.
//!
//! A reset poll replaces the view wholesale. An incremental poll appends
//! the messages not already shown, so a message sent optimistically and
//! then echoed by the next poll appears once.

use std::collections::HashSet;

use salom_shared::constants::RECENT_MESSAGE_LIMIT;
use salom_shared::protocol::{EnrichedMessage, PollResponse, PublicProfile, SyncCursor};
use salom_shared::{ChatId, MessageId};

#[derive(Debug, Clone)]
pub struct ChatView {
    chat: ChatId,
    messages: Vec<EnrichedMessage>,
    users: Vec<PublicProfile>,
    cursor: Option<SyncCursor>,
}

impl ChatView {
    pub fn new(chat: ChatId) -> Self {
        Self {
            chat,
            messages: Vec::new(),
            users: Vec::new(),
            cursor: None,
        }
    }

    pub fn chat(&self) -> ChatId {
        self.chat
    }

    pub fn messages(&self) -> &[EnrichedMessage] {
        &self.messages
    }

    pub fn users(&self) -> &[PublicProfile] {
        &self.users
    }

    /// The cursor to send with the next poll.
    pub fn cursor(&self) -> Option<SyncCursor> {
        self.cursor
    }

    /// Merge one poll result. Returns the messages that became visible.
    pub fn apply_poll(&mut self, poll: PollResponse) -> Vec<EnrichedMessage> {
        let known: HashSet<MessageId> = self.messages.iter().map(|m| m.id).collect();
        let fresh: Vec<EnrichedMessage> = poll
            .messages
            .iter()
            .filter(|m| !known.contains(&m.id))
            .cloned()
            .collect();

        if poll.reset {
            self.messages = poll.messages;
        } else {
            self.messages.extend(fresh.iter().cloned());
            self.trim();
        }
        self.users = poll.users;
        self.cursor = Some(poll.cursor);
        fresh
    }

    /// Show a message the server just accepted from us, without waiting
    /// for the next tick. Returns `false` if it is already visible.
    pub fn push_sent(&mut self, message: EnrichedMessage) -> bool {
        if message.chat != self.chat || self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message);
        self.trim();
        true
    }

    fn trim(&mut self) {
        if self.messages.len() > RECENT_MESSAGE_LIMIT {
            let excess = self.messages.len() - RECENT_MESSAGE_LIMIT;
            self.messages.drain(..excess);
        }
    }
}
