//! Read-only views onto the identity and content layers.
//!
//! Users, comments and events are owned by the CRUD layer; the moderation
//! engine only looks up roles and ownership through these traits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use modgate_auth::{Comment, EventRef, Principal, Role};
use modgate_core::{CommentId, EventId, ModerationError, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for ModerationError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unavailable(msg) => ModerationError::Storage(msg),
        }
    }
}

/// Identity/role provider.
pub trait IdentityProvider: Send + Sync {
    /// Roles held by `user`, or `None` if the user does not exist.
    fn roles_of(&self, user: UserId) -> Result<Option<Vec<Role>>, DirectoryError>;

    fn principal(&self, user: UserId) -> Result<Option<Principal>, DirectoryError> {
        Ok(self.roles_of(user)?.map(|roles| Principal::new(user, roles)))
    }
}

/// Lookup of moderated content.
pub trait ContentDirectory: Send + Sync {
    fn comment(&self, id: CommentId) -> Result<Option<Comment>, DirectoryError>;

    fn event(&self, id: EventId) -> Result<Option<EventRef>, DirectoryError>;
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    fn roles_of(&self, user: UserId) -> Result<Option<Vec<Role>>, DirectoryError> {
        (**self).roles_of(user)
    }
}

impl<T: ContentDirectory + ?Sized> ContentDirectory for Arc<T> {
    fn comment(&self, id: CommentId) -> Result<Option<Comment>, DirectoryError> {
        (**self).comment(id)
    }

    fn event(&self, id: EventId) -> Result<Option<EventRef>, DirectoryError> {
        (**self).event(id)
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, Vec<Role>>>,
    comments: RwLock<HashMap<CommentId, Comment>>,
    events: RwLock<HashMap<EventId, EventRef>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn upsert_user(&self, user: UserId, roles: impl IntoIterator<Item = Role>) -> Result<(), DirectoryError> {
        self.users
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?
            .insert(user, roles.into_iter().collect());
        Ok(())
    }

    pub fn remove_user(&self, user: UserId) -> Result<(), DirectoryError> {
        self.users
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?
            .remove(&user);
        Ok(())
    }

    pub fn upsert_event(&self, event: EventRef) -> Result<(), DirectoryError> {
        self.events
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?
            .insert(event.id, event);
        Ok(())
    }

    pub fn upsert_comment(&self, comment: Comment) -> Result<(), DirectoryError> {
        self.comments
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?
            .insert(comment.id, comment);
        Ok(())
    }

    pub fn remove_comment(&self, id: CommentId) -> Result<Option<Comment>, DirectoryError> {
        Ok(self
            .comments
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?
            .remove(&id))
    }
}

impl IdentityProvider for InMemoryDirectory {
    fn roles_of(&self, user: UserId) -> Result<Option<Vec<Role>>, DirectoryError> {
        let users = self
            .users
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        Ok(users.get(&user).cloned())
    }
}

impl ContentDirectory for InMemoryDirectory {
    fn comment(&self, id: CommentId) -> Result<Option<Comment>, DirectoryError> {
        let comments = self
            .comments
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        Ok(comments.get(&id).cloned())
    }

    fn event(&self, id: EventId) -> Result<Option<EventRef>, DirectoryError> {
        let events = self
            .events
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        Ok(events.get(&id).cloned())
    }
}
