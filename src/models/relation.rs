use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RelationKind;

/// A (user, target) pair: favorite recipe, cart recipe or followed author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub user_id: String,
    pub kind: RelationKind,
    pub target_id: String,
    pub added_at: DateTime<Utc>,
}

impl Relation {
    pub fn new(user_id: String, kind: RelationKind, target_id: String) -> Self {
        Self {
            user_id,
            kind,
            target_id,
            added_at: Utc::now(),
        }
    }

    pub fn sort_key(&self) -> String {
        self.kind.sort_key(&self.target_id)
    }
}
