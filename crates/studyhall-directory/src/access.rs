use studyhall_types::models::{Group, Message};

/// Moderation rights belong to the group creator alone.
pub fn can_moderate(group: &Group, actor_id: &str) -> bool {
    group.is_creator(actor_id)
}

/// A pin may be flipped by the group's moderator or the message's sender.
pub fn can_toggle_pin(group: &Group, message: &Message, actor_id: &str) -> bool {
    can_moderate(group, actor_id) || message.sender_id == actor_id
}

/// Members may leave, except the moderator.
pub fn can_leave(group: &Group, actor_id: &str) -> bool {
    group.is_member(actor_id) && !can_moderate(group, actor_id)
}
