use serde::{Deserialize, Serialize};

/// Every moderation action the evaluator decides on.
///
/// All of these mutate state, so each one is audited by the service layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Ban,
    Unban,
    Mute,
    Unmute,
    ToggleBan,
    ModifyUser,
    AssignRoles,
    DeleteUser,
    EditComment,
    DeleteComment,
    PinComment,
    UnpinComment,
}

/// Comment operation column in the comment policy table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommentOp {
    /// Edit and delete share a column.
    Modify,
    /// Pin and unpin share a column.
    Pin,
}

/// Which half of the decision table an action is evaluated against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ActionScope {
    /// Actor must strictly outrank the targeted principal.
    RankGated,
    /// Ownership-aware comment rules.
    Comment(CommentOp),
}

impl ModerationAction {
    pub const RANK_GATED: [ModerationAction; 8] = [
        Self::Ban,
        Self::Unban,
        Self::Mute,
        Self::Unmute,
        Self::ToggleBan,
        Self::ModifyUser,
        Self::AssignRoles,
        Self::DeleteUser,
    ];

    pub const COMMENT: [ModerationAction; 4] = [
        Self::EditComment,
        Self::DeleteComment,
        Self::PinComment,
        Self::UnpinComment,
    ];

    pub fn scope(self) -> ActionScope {
        match self {
            Self::EditComment | Self::DeleteComment => ActionScope::Comment(CommentOp::Modify),
            Self::PinComment | Self::UnpinComment => ActionScope::Comment(CommentOp::Pin),
            _ => ActionScope::RankGated,
        }
    }

    pub fn is_rank_gated(self) -> bool {
        self.scope() == ActionScope::RankGated
    }

    /// Stable tag for audit records.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Ban => "user.ban",
            Self::Unban => "user.unban",
            Self::Mute => "user.mute",
            Self::Unmute => "user.unmute",
            Self::ToggleBan => "user.toggle_ban",
            Self::ModifyUser => "user.modify",
            Self::AssignRoles => "user.assign_roles",
            Self::DeleteUser => "user.delete",
            Self::EditComment => "comment.edit",
            Self::DeleteComment => "comment.delete",
            Self::PinComment => "comment.pin",
            Self::UnpinComment => "comment.unpin",
        }
    }

    /// Verb phrase used in denial reasons ("Cannot {verb} yourself").
    pub fn verb(self) -> &'static str {
        match self {
            Self::Ban | Self::ToggleBan => "ban",
            Self::Unban => "unban",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::ModifyUser => "modify",
            Self::AssignRoles => "assign roles to",
            Self::DeleteUser | Self::DeleteComment => "delete",
            Self::EditComment => "edit",
            Self::PinComment => "pin",
            Self::UnpinComment => "unpin",
        }
    }
}

impl core::fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.tag())
    }
}
