//! `modgate-auth`: role hierarchy and moderation policy (pure, no IO).
//!
//! This crate is intentionally decoupled from HTTP and storage: callers hand
//! it resolved principals and resources and get a [`Decision`] back.

pub mod actions;
pub mod evaluator;
pub mod principal;
pub mod resource;
pub mod roles;

pub use actions::{ActionScope, CommentOp, ModerationAction};
pub use evaluator::{Decision, Denial, DenialCode, PermissionEvaluator, Target};
pub use principal::Principal;
pub use resource::{Comment, EventRef, OwnedResource};
pub use roles::{HierarchyError, Rank, Role, RoleHierarchy, Standing};
