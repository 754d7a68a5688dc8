use std::sync::Arc;

use proptest::prelude::*;
use uuid::Uuid;

use studyhall_db::MemoryStore;
use studyhall_directory::{DirectoryStore, PersistedStore, Relay};

const USERS: [&str; 4] = ["ana", "ben", "cal", "dee"];

#[derive(Debug, Clone)]
enum Op {
    Create { user: usize, subject: String },
    Join { group: usize, user: usize },
    Leave { group: usize, user: usize },
    Send { group: usize, user: usize, text: String },
    Toggle { group: usize, message: usize, user: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..USERS.len(), "[ a-z]{0,6}").prop_map(|(user, subject)| Op::Create { user, subject }),
        (0..4usize, 0..USERS.len()).prop_map(|(group, user)| Op::Join { group, user }),
        (0..4usize, 0..USERS.len()).prop_map(|(group, user)| Op::Leave { group, user }),
        (0..4usize, 0..USERS.len(), "[ a-z]{0,6}")
            .prop_map(|(group, user, text)| Op::Send { group, user, text }),
        (0..4usize, 0..6usize, 0..USERS.len())
            .prop_map(|(group, message, user)| Op::Toggle { group, message, user }),
    ]
}

fn group_id(store: &DirectoryStore, index: usize) -> Uuid {
    store
        .directory()
        .groups
        .get(index)
        .map(|g| g.id)
        .unwrap_or_else(Uuid::new_v4)
}

proptest! {
    #[test]
    fn creator_is_always_a_member(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let storage = Arc::new(MemoryStore::new());
        let mut store = DirectoryStore::open(storage.clone(), Arc::new(Relay::default())).unwrap();

        for op in ops {
            match op {
                Op::Create { user, subject } => {
                    store.create_group(&subject, "", USERS[user]).unwrap();
                }
                Op::Join { group, user } => {
                    let id = group_id(&store, group);
                    store.join_group(id, USERS[user]).unwrap();
                }
                Op::Leave { group, user } => {
                    let id = group_id(&store, group);
                    store.leave_group(id, USERS[user]).unwrap();
                }
                Op::Send { group, user, text } => {
                    let id = group_id(&store, group);
                    store.send_message(id, &text, USERS[user]).unwrap();
                }
                Op::Toggle { group, message, user } => {
                    let id = group_id(&store, group);
                    let message_id = store
                        .group(id)
                        .and_then(|g| g.messages.get(message))
                        .map(|m| m.id)
                        .unwrap_or_else(Uuid::new_v4);
                    store.toggle_important(id, message_id, USERS[user]).unwrap();
                }
            }

            for g in &store.directory().groups {
                prop_assert!(g.is_member(&g.creator_id));
                prop_assert!(!g.subject.trim().is_empty());
                prop_assert!(g.messages.iter().all(|m| !m.text.is_empty()));
            }
        }

        // Round trip through storage
        prop_assert_eq!(&PersistedStore::new(storage).load().unwrap(), store.directory());
    }
}
