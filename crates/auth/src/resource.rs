//! Moderated resources, as seen by the policy layer.
//!
//! The CRUD layer owns these entities; the evaluator only reads the fields
//! relevant to ownership and pinning.

use serde::{Deserialize, Serialize};

use modgate_core::{CommentId, Entity, EventId, UserId};

/// Capability set the evaluator needs from anything it moderates.
pub trait OwnedResource: Entity {
    /// Principal that owns (authored/created) the resource.
    fn owner_id(&self) -> UserId;

    fn is_pinned(&self) -> bool {
        false
    }
}

/// Comment posted under an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: UserId,
    pub event_id: EventId,
    pub pinned: bool,
}

impl Entity for Comment {
    type Id = CommentId;

    fn id(&self) -> CommentId {
        self.id
    }

    fn entity_type(&self) -> &'static str {
        "comment"
    }
}

impl OwnedResource for Comment {
    fn owner_id(&self) -> UserId {
        self.author_id
    }

    fn is_pinned(&self) -> bool {
        self.pinned
    }
}

/// Event a comment lives in; only its creator matters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    pub id: EventId,
    pub creator_id: UserId,
}

impl Entity for EventRef {
    type Id = EventId;

    fn id(&self) -> EventId {
        self.id
    }

    fn entity_type(&self) -> &'static str {
        "event"
    }
}
