use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User identities are caller-supplied strings. The directory never validates them.
pub type UserId = String;

/// A study group. Field names match the persisted document layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub subject: String,
    pub description: String,
    pub creator_id: UserId,
    /// Duplicate-free, insertion ordered. Always contains `creator_id`.
    pub members: Vec<UserId>,
    pub messages: Vec<Message>,
}

impl Group {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.creator_id == user_id
    }

    pub fn message(&self, message_id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: Uuid) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Pinned flag. Pinned messages are shown ahead of the rest of the thread.
    pub important: bool,
}

/// The full collection of groups. Serialized as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directory {
    pub groups: Vec<Group>,
}

impl Directory {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    pub fn group(&self, group_id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn group_mut(&mut self, group_id: Uuid) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == group_id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A local account. `password` holds an argon2id PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl Account {
    pub fn profile(&self) -> Profile {
        Profile {
            email: self.email.clone(),
            username: self.username.clone(),
            bio: self.bio.clone(),
        }
    }
}

/// What the rest of the system gets to see of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl Profile {
    /// Identity used as the directory user id: email, falling back to username.
    pub fn user_id(&self) -> UserId {
        if self.email.is_empty() {
            self.username.clone()
        } else {
            self.email.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_serializes_with_camel_case_fields() {
        let group = Group {
            id: Uuid::nil(),
            subject: "Algebra".into(),
            description: String::new(),
            creator_id: "ana@example.com".into(),
            members: vec!["ana@example.com".into()],
            messages: vec![],
        };

        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["creatorId"], "ana@example.com");
        assert!(json.get("creator_id").is_none());
    }

    #[test]
    fn directory_is_a_bare_array() {
        let json = serde_json::to_string(&Directory::default()).unwrap();
        assert_eq!(json, "[]");
    }

    #[test]
    fn profile_user_id_prefers_email() {
        let mut profile = Profile {
            email: "ana@example.com".into(),
            username: "ana".into(),
            bio: None,
        };
        assert_eq!(profile.user_id(), "ana@example.com");

        profile.email.clear();
        assert_eq!(profile.user_id(), "ana");
    }
}
