//! Read-only views over a directory for one viewer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use studyhall_types::models::{Directory, Group, Message, UserId};

use crate::access::{can_leave, can_toggle_pin};

/// Pinned messages first, then the rest. Stored order is kept within each
/// half; timestamps are not consulted.
pub fn sorted_messages(group: &Group) -> Vec<&Message> {
    let (pinned, rest): (Vec<&Message>, Vec<&Message>) =
        group.messages.iter().partition(|m| m.important);
    pinned.into_iter().chain(rest).collect()
}

/// Which group a viewer has open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub selected: Option<Uuid>,
}

impl ViewState {
    /// Initial state: the first group is selected, if there is one.
    pub fn initial(directory: &Directory) -> Self {
        Self {
            selected: directory.groups.first().map(|g| g.id),
        }
    }

    pub fn select(&mut self, group_id: Uuid) {
        self.selected = Some(group_id);
    }

    /// Drop a selection whose group no longer exists, e.g. after a foreign update.
    pub fn reconcile(&mut self, directory: &Directory) {
        if let Some(id) = self.selected {
            if directory.group(id).is_none() {
                self.selected = None;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub subject: String,
    pub description: String,
    pub member_count: usize,
    pub is_member: bool,
    pub is_creator: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub sender_id: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub important: bool,
    pub is_own: bool,
    pub can_pin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadView {
    pub group_id: Uuid,
    pub subject: String,
    pub description: String,
    pub creator_id: UserId,
    pub members: Vec<UserId>,
    pub is_member: bool,
    pub can_leave: bool,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryView {
    pub groups: Vec<GroupSummary>,
    pub thread: Option<ThreadView>,
}

pub fn render(directory: &Directory, state: &ViewState, viewer_id: &str) -> DirectoryView {
    let groups = directory
        .groups
        .iter()
        .map(|g| GroupSummary {
            id: g.id,
            subject: g.subject.clone(),
            description: g.description.clone(),
            member_count: g.members.len(),
            is_member: g.is_member(viewer_id),
            is_creator: g.is_creator(viewer_id),
            selected: state.selected == Some(g.id),
        })
        .collect();

    let thread = state
        .selected
        .and_then(|id| directory.group(id))
        .map(|g| render_thread(g, viewer_id));

    DirectoryView { groups, thread }
}

fn render_thread(group: &Group, viewer_id: &str) -> ThreadView {
    let messages = sorted_messages(group)
        .into_iter()
        .map(|m| MessageView {
            id: m.id,
            sender_id: m.sender_id.clone(),
            text: m.text.clone(),
            timestamp: m.timestamp,
            important: m.important,
            is_own: m.sender_id == viewer_id,
            can_pin: can_toggle_pin(group, m, viewer_id),
        })
        .collect();

    ThreadView {
        group_id: group.id,
        subject: group.subject.clone(),
        description: group.description.clone(),
        creator_id: group.creator_id.clone(),
        members: group.members.clone(),
        is_member: group.is_member(viewer_id),
        can_leave: can_leave(group, viewer_id),
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(secs: i64, pinned: bool, sender: &str, text: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender.into(),
            text: text.into(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            important: pinned,
        }
    }

    fn group(messages: Vec<Message>) -> Group {
        Group {
            id: Uuid::new_v4(),
            subject: "Statistics".into(),
            description: "Bayes".into(),
            creator_id: "ana".into(),
            members: vec!["ana".into(), "ben".into()],
            messages,
        }
    }

    #[test]
    fn pinned_message_comes_first_regardless_of_timestamp() {
        let g = group(vec![message(2, false, "ana", "later"), message(1, true, "ben", "earlier")]);
        let sorted: Vec<&str> = sorted_messages(&g).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(sorted, vec!["earlier", "later"]);

        let g = group(vec![message(1, false, "ana", "old"), message(2, true, "ben", "new")]);
        let sorted: Vec<&str> = sorted_messages(&g).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(sorted, vec!["new", "old"]);
    }

    #[test]
    fn stored_order_kept_within_each_half() {
        let g = group(vec![
            message(1, false, "ana", "a"),
            message(2, true, "ana", "b"),
            message(3, false, "ana", "c"),
            message(4, true, "ana", "d"),
        ]);
        let sorted: Vec<&str> = sorted_messages(&g).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(sorted, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn render_marks_viewer_capabilities() {
        let g = group(vec![message(1, false, "ben", "hello"), message(2, false, "ana", "welcome")]);
        let id = g.id;
        let directory = Directory::new(vec![g]);
        let mut state = ViewState::initial(&directory);
        assert_eq!(state.selected, Some(id));
        state.select(id);

        let view = render(&directory, &state, "ben");
        assert!(view.groups[0].is_member);
        assert!(!view.groups[0].is_creator);
        assert!(view.groups[0].selected);

        let thread = view.thread.unwrap();
        assert!(thread.can_leave);
        assert!(thread.messages[0].can_pin);
        assert!(thread.messages[0].is_own);
        assert!(!thread.messages[1].can_pin);

        let creator_view = render(&directory, &state, "ana").thread.unwrap();
        assert!(!creator_view.can_leave);
        assert!(creator_view.messages.iter().all(|m| m.can_pin));
    }

    #[test]
    fn reconcile_clears_vanished_selection() {
        let mut state = ViewState::default();
        state.select(Uuid::new_v4());
        state.reconcile(&Directory::default());
        assert_eq!(state.selected, None);
        assert!(render(&Directory::default(), &state, "ana").thread.is_none());
    }
}
