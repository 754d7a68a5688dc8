use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use studyhall_db::KeyValueStore;
use studyhall_types::events::SyncEvent;
use studyhall_types::models::{Directory, Group, Message};

use crate::access::{can_moderate, can_toggle_pin};
use crate::error::DirectoryError;
use crate::relay::{Broadcaster, SyncEnvelope};
use crate::store::PersistedStore;

/// Why an operation left the directory untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    EmptySubject,
    EmptyText,
    GroupNotFound,
    MessageNotFound,
    AlreadyMember,
    NotMember,
    CreatorCannotLeave,
    NotPermitted,
}

impl Reason {
    /// Text suitable for showing to the person who attempted the operation.
    pub fn message(&self) -> &'static str {
        match self {
            Self::EmptySubject => "Subject is required",
            Self::EmptyText => "Message cannot be empty",
            Self::GroupNotFound => "Group not found",
            Self::MessageNotFound => "Message not found",
            Self::AlreadyMember => "Already a member of this group",
            Self::NotMember => "Not a member of this group",
            Self::CreatorCannotLeave => "Group creator cannot leave the group.",
            Self::NotPermitted => "Only the sender or the group creator can pin this message",
        }
    }
}

/// Result of a directory operation. `Ignored` means nothing was saved or published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T = ()> {
    Applied(T),
    Ignored(Reason),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Ignored(_) => None,
        }
    }

    pub fn reason(&self) -> Option<Reason> {
        match self {
            Self::Applied(_) => None,
            Self::Ignored(reason) => Some(*reason),
        }
    }
}

/// One replica of the study group directory.
///
/// Operations are read-modify-write over the whole collection: the updated
/// directory is saved, swapped in, then published to the relay. A failed save
/// leaves the in-memory directory untouched.
pub struct DirectoryStore {
    origin: Uuid,
    directory: Directory,
    persisted: PersistedStore,
    broadcaster: Arc<dyn Broadcaster>,
}

impl DirectoryStore {
    pub fn open(
        storage: Arc<dyn KeyValueStore>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Result<Self, DirectoryError> {
        let persisted = PersistedStore::new(storage);
        let directory = persisted.load()?;
        let origin = Uuid::new_v4();

        info!("Directory store {} opened with {} groups", origin, directory.len());
        Ok(Self {
            origin,
            directory,
            persisted,
            broadcaster,
        })
    }

    /// Identifies this replica's publications on the relay.
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn group(&self, group_id: Uuid) -> Option<&Group> {
        self.directory.group(group_id)
    }

    pub fn create_group(
        &mut self,
        subject: &str,
        description: &str,
        creator_id: &str,
    ) -> Result<Outcome<Uuid>, DirectoryError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Ok(self.ignore(Reason::EmptySubject));
        }

        let group = Group {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            description: description.trim().to_string(),
            creator_id: creator_id.to_string(),
            members: vec![creator_id.to_string()],
            messages: Vec::new(),
        };
        let group_id = group.id;

        let mut next = self.directory.clone();
        next.groups.push(group);
        self.commit(next)?;

        info!("{} created group '{}' ({})", creator_id, subject, group_id);
        Ok(Outcome::Applied(group_id))
    }

    pub fn join_group(&mut self, group_id: Uuid, user_id: &str) -> Result<Outcome, DirectoryError> {
        let Some(group) = self.directory.group(group_id) else {
            return Ok(self.ignore(Reason::GroupNotFound));
        };
        if group.is_member(user_id) {
            return Ok(self.ignore(Reason::AlreadyMember));
        }

        self.update_group(group_id, |g| g.members.push(user_id.to_string()))?;

        info!("{} joined group {}", user_id, group_id);
        Ok(Outcome::Applied(()))
    }

    /// The creator can never leave their own group.
    pub fn leave_group(&mut self, group_id: Uuid, user_id: &str) -> Result<Outcome, DirectoryError> {
        let Some(group) = self.directory.group(group_id) else {
            return Ok(self.ignore(Reason::GroupNotFound));
        };
        if can_moderate(group, user_id) {
            return Ok(self.ignore(Reason::CreatorCannotLeave));
        }
        if !group.is_member(user_id) {
            return Ok(self.ignore(Reason::NotMember));
        }

        self.update_group(group_id, |g| g.members.retain(|m| m != user_id))?;

        info!("{} left group {}", user_id, group_id);
        Ok(Outcome::Applied(()))
    }

    pub fn send_message(
        &mut self,
        group_id: Uuid,
        text: &str,
        sender_id: &str,
    ) -> Result<Outcome<Uuid>, DirectoryError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(self.ignore(Reason::EmptyText));
        }
        if self.directory.group(group_id).is_none() {
            return Ok(self.ignore(Reason::GroupNotFound));
        }

        let message = Message {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            important: false,
        };
        let message_id = message.id;

        self.update_group(group_id, |g| g.messages.push(message))?;

        debug!("{} posted message {} in group {}", sender_id, message_id, group_id);
        Ok(Outcome::Applied(message_id))
    }

    /// Flip a message's pinned flag. Returns the new flag value.
    pub fn toggle_important(
        &mut self,
        group_id: Uuid,
        message_id: Uuid,
        requester_id: &str,
    ) -> Result<Outcome<bool>, DirectoryError> {
        let Some(group) = self.directory.group(group_id) else {
            return Ok(self.ignore(Reason::GroupNotFound));
        };
        let Some(message) = group.message(message_id) else {
            return Ok(self.ignore(Reason::MessageNotFound));
        };
        if !can_toggle_pin(group, message, requester_id) {
            return Ok(self.ignore(Reason::NotPermitted));
        }

        let pinned = !message.important;
        self.update_group(group_id, |g| {
            if let Some(m) = g.message_mut(message_id) {
                m.important = pinned;
            }
        })?;

        debug!("{} set pinned={} on message {}", requester_id, pinned, message_id);
        Ok(Outcome::Applied(pinned))
    }

    /// Replace the in-memory directory with a foreign update. No merge, no save.
    pub fn apply_remote(&mut self, directory: Directory) {
        debug!(
            "Store {} replacing {} groups with {} from relay",
            self.origin,
            self.directory.len(),
            directory.len()
        );
        self.directory = directory;
    }

    /// Apply an envelope from the relay unless this store published it.
    /// Returns whether the directory was replaced.
    pub fn receive(&mut self, envelope: &SyncEnvelope) -> bool {
        if envelope.origin == self.origin {
            return false;
        }
        self.apply_remote(envelope.event.clone().into_directory());
        true
    }

    fn update_group<F>(&mut self, group_id: Uuid, f: F) -> Result<(), DirectoryError>
    where
        F: FnOnce(&mut Group),
    {
        let mut next = self.directory.clone();
        if let Some(group) = next.group_mut(group_id) {
            f(group);
        }
        self.commit(next)
    }

    fn commit(&mut self, next: Directory) -> Result<(), DirectoryError> {
        self.persisted.save(&next)?;
        self.directory = next;
        self.broadcaster.publish(SyncEnvelope {
            origin: self.origin,
            event: SyncEvent::UpdateGroups(self.directory.clone()),
        });
        Ok(())
    }

    fn ignore<T>(&self, reason: Reason) -> Outcome<T> {
        debug!("Store {} ignored operation: {:?}", self.origin, reason);
        Outcome::Ignored(reason)
    }
}
