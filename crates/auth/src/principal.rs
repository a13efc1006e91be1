use serde::{Deserialize, Serialize};

use modgate_core::{Entity, UserId};

use crate::Role;

/// A fully resolved principal for moderation decisions.
///
/// Role assignments come from the identity layer; this core only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl Entity for Principal {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn entity_type(&self) -> &'static str {
        "user"
    }
}
