use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role identifier as stored by the identity layer.
///
/// Role names are opaque strings at this layer; their authority comes only
/// from the [`RoleHierarchy`] they are looked up in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const USER: Role = Role(Cow::Borrowed("User"));
    pub const ORGANIZER: Role = Role(Cow::Borrowed("Organizer"));
    pub const ADMIN: Role = Role(Cow::Borrowed("Admin"));
    pub const SENIOR_ADMIN: Role = Role(Cow::Borrowed("SeniorAdmin"));
    pub const OWNER: Role = Role(Cow::Borrowed("Owner"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a role in the total order (higher = more authority).
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Rank(u8);

impl Rank {
    pub const USER: Rank = Rank(0);
    pub const ORGANIZER: Rank = Rank(1);
    pub const ADMIN: Rank = Rank(2);
    pub const SENIOR_ADMIN: Rank = Rank(3);
    pub const OWNER: Rank = Rank(4);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for Rank {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Actor's standing relative to a target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Higher,
    Equal,
    Lower,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("role '{0}' declared more than once")]
    DuplicateRole(String),
}

/// Static total order over role names.
///
/// One value is built at startup and shared (typically behind an `Arc`) by
/// every evaluator; there are no per-call-site copies of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHierarchy {
    ranks: HashMap<Role, Rank>,
}

impl RoleHierarchy {
    /// `User=0, Organizer=1, Admin=2, SeniorAdmin=3, Owner=4`.
    pub fn standard() -> Self {
        let ranks = [
            (Role::USER, Rank::USER),
            (Role::ORGANIZER, Rank::ORGANIZER),
            (Role::ADMIN, Rank::ADMIN),
            (Role::SENIOR_ADMIN, Rank::SENIOR_ADMIN),
            (Role::OWNER, Rank::OWNER),
        ]
        .into_iter()
        .collect();

        Self { ranks }
    }

    /// Build a hierarchy from an explicit `(role, rank)` table.
    pub fn from_table<I>(table: I) -> Result<Self, HierarchyError>
    where
        I: IntoIterator<Item = (Role, Rank)>,
    {
        let mut ranks = HashMap::new();
        for (role, rank) in table {
            if ranks.contains_key(&role) {
                return Err(HierarchyError::DuplicateRole(role.as_str().to_string()));
            }
            ranks.insert(role, rank);
        }
        Ok(Self { ranks })
    }

    /// Rank of a single role; unknown names rank lowest.
    pub fn rank_of_role(&self, role: &Role) -> Rank {
        self.ranks.get(role).copied().unwrap_or_default()
    }

    /// Effective rank: the maximum rank over `roles`, 0 when empty.
    ///
    /// Unknown role names map to rank 0 rather than failing.
    pub fn rank_of<'a, I>(&self, roles: I) -> Rank
    where
        I: IntoIterator<Item = &'a Role>,
    {
        roles
            .into_iter()
            .map(|role| self.rank_of_role(role))
            .max()
            .unwrap_or_default()
    }

    pub fn compare<'a, A, T>(&self, actor_roles: A, target_roles: T) -> Standing
    where
        A: IntoIterator<Item = &'a Role>,
        T: IntoIterator<Item = &'a Role>,
    {
        match self.rank_of(actor_roles).cmp(&self.rank_of(target_roles)) {
            core::cmp::Ordering::Greater => Standing::Higher,
            core::cmp::Ordering::Equal => Standing::Equal,
            core::cmp::Ordering::Less => Standing::Lower,
        }
    }

    /// Name of the lowest-named role holding exactly `rank`, if any.
    pub fn role_at(&self, rank: Rank) -> Option<&Role> {
        self.ranks
            .iter()
            .filter(|(_, r)| **r == rank)
            .map(|(role, _)| role)
            .min_by(|a, b| a.as_str().cmp(b.as_str()))
    }
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self::standard()
    }
}
