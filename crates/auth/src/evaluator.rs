//! Moderation decision table.
//!
//! Every moderation action is decided here and nowhere else. The policy is
//! data ([`GUARDS`] and [`COMMENT_POLICY`]) plus a small matcher, so each rule
//! exists exactly once.
//!
//! Evaluation order is fixed; later steps assume earlier ones passed:
//! 1. self-target on a rank-gated action
//! 2. pinned comment blocks edit
//! 3. own comment blocks pin
//! 4. rank / ownership table

use std::sync::Arc;

use serde::Serialize;

use modgate_core::ModerationError;

use crate::actions::{ActionScope, CommentOp, ModerationAction};
use crate::resource::{Comment, OwnedResource};
use crate::{Principal, Rank, Role, RoleHierarchy};

/// Machine-readable class of a denial.
///
/// Hosts only use this to pick a status code; the reason text is opaque.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialCode {
    SelfTarget,
    PinnedComment,
    OwnCommentPin,
    InsufficientRank,
    RoleEscalation,
    OwnerEvent,
    NotEventCreator,
    NotAuthor,
    TargetMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub code: DenialCode,
    pub reason: String,
}

impl Denial {
    fn new(code: DenialCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

impl From<Denial> for ModerationError {
    fn from(denial: Denial) -> Self {
        match denial.code {
            DenialCode::SelfTarget => ModerationError::InvalidArgument(denial.reason),
            _ => ModerationError::PermissionDenied(denial.reason),
        }
    }
}

/// Outcome of one evaluation. Computed per call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Decision::Allow => None,
            Decision::Deny(d) => Some(d),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        self.denial().map(|d| d.reason.as_str())
    }

    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(d) => Err(d),
        }
    }
}

/// What the action is aimed at.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    User(&'a Principal),
    /// Role assignment: the targeted principal plus the roles being granted.
    RoleGrant {
        principal: &'a Principal,
        granted: &'a [Role],
    },
    /// A comment together with the creator of the event it lives in.
    Comment {
        comment: &'a Comment,
        event_creator: &'a Principal,
    },
}

impl Target<'_> {
    fn principal(&self) -> Option<&Principal> {
        match self {
            Target::User(p) => Some(p),
            Target::RoleGrant { principal, .. } => Some(principal),
            Target::Comment { .. } => None,
        }
    }

    fn comment(&self) -> Option<&Comment> {
        match self {
            Target::Comment { comment, .. } => Some(comment),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Target::User(_) | Target::RoleGrant { .. } => "user",
            Target::Comment { .. } => "comment",
        }
    }
}

/// Pre-table checks, in evaluation order.
#[derive(Debug, Copy, Clone)]
enum Guard {
    SelfTarget,
    PinnedBlocksEdit,
    OwnCommentBlocksPin,
}

const GUARDS: [Guard; 3] = [
    Guard::SelfTarget,
    Guard::PinnedBlocksEdit,
    Guard::OwnCommentBlocksPin,
];

impl Guard {
    fn check(self, action: ModerationAction, actor: &Principal, target: &Target<'_>) -> Result<(), Denial> {
        match self {
            Guard::SelfTarget => match target.principal() {
                Some(p) if action.is_rank_gated() && p.id == actor.id => Err(Denial::new(
                    DenialCode::SelfTarget,
                    format!("Cannot {} yourself", action.verb()),
                )),
                _ => Ok(()),
            },
            Guard::PinnedBlocksEdit => match target.comment() {
                Some(c) if action == ModerationAction::EditComment && c.is_pinned() => Err(
                    Denial::new(DenialCode::PinnedComment, "Pinned comments cannot be edited"),
                ),
                _ => Ok(()),
            },
            Guard::OwnCommentBlocksPin => match target.comment() {
                Some(c) if action == ModerationAction::PinComment && c.owner_id() == actor.id => {
                    Err(Denial::new(DenialCode::OwnCommentPin, "Cannot pin your own comment"))
                }
                _ => Ok(()),
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CommentRule {
    Always,
    /// Allowed unless the event creator's effective rank is at least this.
    UnlessEventCreatorAtLeast(Rank),
    OnlyEventCreator,
    OnlyAuthor,
    Never,
}

#[derive(Debug)]
struct CommentPolicyRow {
    /// Lowest actor rank this row applies to.
    min_rank: Rank,
    tier: &'static str,
    modify: CommentRule,
    pin: CommentRule,
}

impl CommentPolicyRow {
    fn rule(&self, op: CommentOp) -> CommentRule {
        match op {
            CommentOp::Modify => self.modify,
            CommentOp::Pin => self.pin,
        }
    }
}

/// Rows in descending `min_rank`; the first row the actor reaches applies.
static COMMENT_POLICY: [CommentPolicyRow; 4] = [
    CommentPolicyRow {
        min_rank: Rank::OWNER,
        tier: "Owners",
        modify: CommentRule::Always,
        pin: CommentRule::Always,
    },
    CommentPolicyRow {
        min_rank: Rank::SENIOR_ADMIN,
        tier: "Senior admins",
        modify: CommentRule::UnlessEventCreatorAtLeast(Rank::OWNER),
        pin: CommentRule::UnlessEventCreatorAtLeast(Rank::OWNER),
    },
    CommentPolicyRow {
        min_rank: Rank::ADMIN,
        tier: "Admins",
        modify: CommentRule::OnlyEventCreator,
        pin: CommentRule::OnlyEventCreator,
    },
    CommentPolicyRow {
        min_rank: Rank::USER,
        tier: "Users",
        modify: CommentRule::OnlyAuthor,
        pin: CommentRule::Never,
    },
];

/// Pure decision function over the shared [`RoleHierarchy`].
///
/// - No IO
/// - No panics
/// - No state mutation
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    hierarchy: Arc<RoleHierarchy>,
}

impl PermissionEvaluator {
    pub fn new(hierarchy: Arc<RoleHierarchy>) -> Self {
        Self { hierarchy }
    }

    pub fn evaluate(&self, action: ModerationAction, actor: &Principal, target: Target<'_>) -> Decision {
        match self.check(action, actor, target) {
            Ok(()) => Decision::Allow,
            Err(denial) => Decision::Deny(denial),
        }
    }

    fn check(&self, action: ModerationAction, actor: &Principal, target: Target<'_>) -> Result<(), Denial> {
        let scope = action.scope();
        let shape_ok = matches!(
            (scope, &target),
            (ActionScope::RankGated, Target::User(_) | Target::RoleGrant { .. })
                | (ActionScope::Comment(_), Target::Comment { .. })
        );
        if !shape_ok {
            return Err(Denial::new(
                DenialCode::TargetMismatch,
                format!("Action '{action}' does not apply to a {}", target.kind()),
            ));
        }

        for guard in GUARDS {
            guard.check(action, actor, &target)?;
        }

        match (scope, target) {
            (ActionScope::RankGated, Target::User(principal)) => {
                self.rank_gate(action, actor, principal)
            }
            (ActionScope::RankGated, Target::RoleGrant { principal, granted }) => {
                self.rank_gate(action, actor, principal)?;
                self.no_escalation(actor, granted)
            }
            (
                ActionScope::Comment(op),
                Target::Comment {
                    comment,
                    event_creator,
                },
            ) => self.comment_rule(action, op, actor, comment, event_creator),
            _ => Err(Denial::new(
                DenialCode::TargetMismatch,
                format!("Action '{action}' does not apply to a {}", target.kind()),
            )),
        }
    }

    fn rank_gate(&self, action: ModerationAction, actor: &Principal, target: &Principal) -> Result<(), Denial> {
        let actor_rank = self.hierarchy.rank_of(&actor.roles);
        let target_rank = self.hierarchy.rank_of(&target.roles);
        if target_rank >= actor_rank {
            return Err(Denial::new(
                DenialCode::InsufficientRank,
                format!("Cannot {} a user with equal or higher rank", action.verb()),
            ));
        }
        Ok(())
    }

    fn no_escalation(&self, actor: &Principal, granted: &[Role]) -> Result<(), Denial> {
        let actor_rank = self.hierarchy.rank_of(&actor.roles);
        match granted
            .iter()
            .find(|role| self.hierarchy.rank_of_role(role) >= actor_rank)
        {
            Some(role) => Err(Denial::new(
                DenialCode::RoleEscalation,
                format!("Cannot assign role '{role}' at or above your own rank"),
            )),
            None => Ok(()),
        }
    }

    fn comment_rule(
        &self,
        action: ModerationAction,
        op: CommentOp,
        actor: &Principal,
        comment: &Comment,
        event_creator: &Principal,
    ) -> Result<(), Denial> {
        let actor_rank = self.hierarchy.rank_of(&actor.roles);
        let row = COMMENT_POLICY
            .iter()
            .find(|row| actor_rank >= row.min_rank)
            .unwrap_or(&COMMENT_POLICY[COMMENT_POLICY.len() - 1]);
        let verb = action.verb();

        match row.rule(op) {
            CommentRule::Always => Ok(()),
            CommentRule::UnlessEventCreatorAtLeast(limit) => {
                if self.hierarchy.rank_of(&event_creator.roles) >= limit {
                    Err(Denial::new(
                        DenialCode::OwnerEvent,
                        format!("Cannot {verb} comments in {} events", self.rank_label(limit)),
                    ))
                } else {
                    Ok(())
                }
            }
            CommentRule::OnlyEventCreator => {
                if event_creator.id == actor.id {
                    Ok(())
                } else {
                    Err(Denial::new(
                        DenialCode::NotEventCreator,
                        format!("{} can only {verb} comments in their own events", row.tier),
                    ))
                }
            }
            CommentRule::OnlyAuthor => {
                if comment.owner_id() == actor.id {
                    Ok(())
                } else {
                    Err(Denial::new(
                        DenialCode::NotAuthor,
                        format!("You can only {verb} your own comments"),
                    ))
                }
            }
            CommentRule::Never => Err(Denial::new(
                DenialCode::InsufficientRank,
                format!("Insufficient permissions to {verb} comments"),
            )),
        }
    }

    fn rank_label(&self, rank: Rank) -> String {
        self.hierarchy
            .role_at(rank)
            .map(|role| role.as_str().to_string())
            .unwrap_or_else(|| format!("rank {rank}"))
    }
}

impl Default for PermissionEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(RoleHierarchy::standard()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgate_core::{CommentId, EventId, UserId};

    fn evaluator() -> PermissionEvaluator {
        PermissionEvaluator::default()
    }

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(), [role])
    }

    fn comment_by(author: &Principal) -> Comment {
        Comment {
            id: CommentId::new(),
            author_id: author.id,
            event_id: EventId::new(),
            pinned: false,
        }
    }

    fn denied_with(decision: &Decision, code: DenialCode) -> bool {
        decision.denial().map(|d| d.code) == Some(code)
    }

    #[test]
    fn self_target_denied_for_every_rank_gated_action_even_owner() {
        let owner = principal(Role::OWNER);
        for action in ModerationAction::RANK_GATED {
            let decision = evaluator().evaluate(action, &owner, Target::User(&owner));
            assert!(denied_with(&decision, DenialCode::SelfTarget), "{action}: {decision:?}");
        }
    }

    #[test]
    fn self_target_message_names_the_action() {
        let admin = principal(Role::ADMIN);
        let decision = evaluator().evaluate(ModerationAction::Mute, &admin, Target::User(&admin));
        assert_eq!(decision.reason(), Some("Cannot mute yourself"));
    }

    #[test]
    fn equal_rank_is_denied() {
        let actor = principal(Role::ADMIN);
        let target = principal(Role::ADMIN);
        let decision = evaluator().evaluate(ModerationAction::Ban, &actor, Target::User(&target));
        assert!(denied_with(&decision, DenialCode::InsufficientRank));
    }

    #[test]
    fn strictly_higher_rank_is_allowed() {
        let actor = principal(Role::SENIOR_ADMIN);
        let target = principal(Role::ADMIN);
        for action in ModerationAction::RANK_GATED {
            let decision = evaluator().evaluate(action, &actor, Target::User(&target));
            assert!(decision.is_allowed(), "{action}: {decision:?}");
        }
    }

    #[test]
    fn lower_rank_cannot_act_upward() {
        let actor = principal(Role::ADMIN);
        let target = Principal::new(UserId::new(), [Role::USER, Role::OWNER]);
        let decision = evaluator().evaluate(ModerationAction::DeleteUser, &actor, Target::User(&target));
        assert_eq!(
            decision.reason(),
            Some("Cannot delete a user with equal or higher rank")
        );
    }

    #[test]
    fn role_grant_at_or_above_actor_rank_is_escalation() {
        let actor = principal(Role::SENIOR_ADMIN);
        let target = principal(Role::USER);

        let ok = [Role::ADMIN];
        let decision = evaluator().evaluate(
            ModerationAction::AssignRoles,
            &actor,
            Target::RoleGrant { principal: &target, granted: &ok },
        );
        assert!(decision.is_allowed());

        let too_high = [Role::ORGANIZER, Role::SENIOR_ADMIN];
        let decision = evaluator().evaluate(
            ModerationAction::AssignRoles,
            &actor,
            Target::RoleGrant { principal: &target, granted: &too_high },
        );
        assert!(denied_with(&decision, DenialCode::RoleEscalation));
        assert_eq!(
            decision.reason(),
            Some("Cannot assign role 'SeniorAdmin' at or above your own rank")
        );
    }

    #[test]
    fn admin_edits_comment_in_own_event() {
        let admin = principal(Role::ADMIN);
        let author = principal(Role::USER);
        let comment = comment_by(&author);
        let decision = evaluator().evaluate(
            ModerationAction::EditComment,
            &admin,
            Target::Comment { comment: &comment, event_creator: &admin },
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn admin_cannot_edit_comment_in_another_admins_event() {
        let admin = principal(Role::ADMIN);
        let other_admin = principal(Role::ADMIN);
        let comment = comment_by(&principal(Role::USER));
        let decision = evaluator().evaluate(
            ModerationAction::EditComment,
            &admin,
            Target::Comment { comment: &comment, event_creator: &other_admin },
        );
        assert_eq!(
            decision.reason(),
            Some("Admins can only edit comments in their own events")
        );
    }

    #[test]
    fn senior_admin_cannot_touch_owner_events() {
        let senior = principal(Role::SENIOR_ADMIN);
        let owner = principal(Role::OWNER);
        let comment = comment_by(&principal(Role::USER));
        let decision = evaluator().evaluate(
            ModerationAction::EditComment,
            &senior,
            Target::Comment { comment: &comment, event_creator: &owner },
        );
        assert_eq!(decision.reason(), Some("Cannot edit comments in Owner events"));

        let decision = evaluator().evaluate(
            ModerationAction::PinComment,
            &senior,
            Target::Comment { comment: &comment, event_creator: &owner },
        );
        assert_eq!(decision.reason(), Some("Cannot pin comments in Owner events"));
    }

    #[test]
    fn senior_admin_moderates_admin_events() {
        let senior = principal(Role::SENIOR_ADMIN);
        let admin = principal(Role::ADMIN);
        let comment = comment_by(&principal(Role::USER));
        for action in ModerationAction::COMMENT {
            let decision = evaluator().evaluate(
                action,
                &senior,
                Target::Comment { comment: &comment, event_creator: &admin },
            );
            assert!(decision.is_allowed(), "{action}: {decision:?}");
        }
    }

    #[test]
    fn pinned_comment_cannot_be_edited_even_by_owner() {
        let owner = principal(Role::OWNER);
        let mut comment = comment_by(&owner);
        comment.pinned = true;
        let decision = evaluator().evaluate(
            ModerationAction::EditComment,
            &owner,
            Target::Comment { comment: &comment, event_creator: &owner },
        );
        assert!(denied_with(&decision, DenialCode::PinnedComment));

        // Deleting a pinned comment is not blocked by the pin.
        let decision = evaluator().evaluate(
            ModerationAction::DeleteComment,
            &owner,
            Target::Comment { comment: &comment, event_creator: &owner },
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn authorship_does_not_lift_staff_tier_limits() {
        let admin = principal(Role::ADMIN);
        let other_admin = principal(Role::ADMIN);
        let own = comment_by(&admin);
        let decision = evaluator().evaluate(
            ModerationAction::EditComment,
            &admin,
            Target::Comment { comment: &own, event_creator: &other_admin },
        );
        assert!(denied_with(&decision, DenialCode::NotEventCreator));

        let senior = principal(Role::SENIOR_ADMIN);
        let owner = principal(Role::OWNER);
        let own = comment_by(&senior);
        let decision = evaluator().evaluate(
            ModerationAction::DeleteComment,
            &senior,
            Target::Comment { comment: &own, event_creator: &owner },
        );
        assert!(denied_with(&decision, DenialCode::OwnerEvent));
    }

    #[test]
    fn nobody_pins_their_own_comment() {
        for role in [Role::USER, Role::ORGANIZER, Role::ADMIN, Role::SENIOR_ADMIN, Role::OWNER] {
            let actor = principal(role.clone());
            let comment = comment_by(&actor);
            let decision = evaluator().evaluate(
                ModerationAction::PinComment,
                &actor,
                Target::Comment { comment: &comment, event_creator: &actor },
            );
            assert!(denied_with(&decision, DenialCode::OwnCommentPin), "{role}");
        }
    }

    #[test]
    fn owner_pins_anyones_comment() {
        let owner = principal(Role::OWNER);
        let creator = principal(Role::SENIOR_ADMIN);
        let comment = comment_by(&principal(Role::USER));
        let decision = evaluator().evaluate(
            ModerationAction::PinComment,
            &owner,
            Target::Comment { comment: &comment, event_creator: &creator },
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn plain_users_only_manage_their_own_comments() {
        let user = principal(Role::USER);
        let creator = principal(Role::ORGANIZER);
        let own = comment_by(&user);
        let other = comment_by(&principal(Role::USER));

        let allowed = evaluator().evaluate(
            ModerationAction::DeleteComment,
            &user,
            Target::Comment { comment: &own, event_creator: &creator },
        );
        assert!(allowed.is_allowed());

        let denied = evaluator().evaluate(
            ModerationAction::EditComment,
            &user,
            Target::Comment { comment: &other, event_creator: &creator },
        );
        assert_eq!(denied.reason(), Some("You can only edit your own comments"));

        let pin = evaluator().evaluate(
            ModerationAction::UnpinComment,
            &user,
            Target::Comment { comment: &other, event_creator: &creator },
        );
        assert_eq!(pin.reason(), Some("Insufficient permissions to unpin comments"));
    }

    #[test]
    fn organizer_gets_no_moderation_power_over_comments() {
        let organizer = principal(Role::ORGANIZER);
        let comment = comment_by(&principal(Role::USER));
        let decision = evaluator().evaluate(
            ModerationAction::DeleteComment,
            &organizer,
            Target::Comment { comment: &comment, event_creator: &organizer },
        );
        assert!(denied_with(&decision, DenialCode::NotAuthor));
    }

    #[test]
    fn mismatched_target_is_denied() {
        let owner = principal(Role::OWNER);
        let comment = comment_by(&principal(Role::USER));
        let decision = evaluator().evaluate(
            ModerationAction::Ban,
            &owner,
            Target::Comment { comment: &comment, event_creator: &owner },
        );
        assert!(denied_with(&decision, DenialCode::TargetMismatch));

        let user = principal(Role::USER);
        let decision = evaluator().evaluate(ModerationAction::PinComment, &owner, Target::User(&user));
        assert!(denied_with(&decision, DenialCode::TargetMismatch));
    }

    #[test]
    fn denial_maps_to_error_taxonomy() {
        let admin = principal(Role::ADMIN);
        let self_ban = evaluator()
            .evaluate(ModerationAction::Ban, &admin, Target::User(&admin))
            .into_result()
            .unwrap_err();
        assert!(matches!(
            ModerationError::from(self_ban),
            ModerationError::InvalidArgument(_)
        ));

        let peer = principal(Role::ADMIN);
        let peer_ban = evaluator()
            .evaluate(ModerationAction::Ban, &admin, Target::User(&peer))
            .into_result()
            .unwrap_err();
        assert!(matches!(
            ModerationError::from(peer_ban),
            ModerationError::PermissionDenied(_)
        ));
    }

    #[test]
    fn decision_serializes_with_outcome_tag() {
        let json = serde_json::to_value(Decision::Allow).unwrap();
        assert_eq!(json, serde_json::json!({ "outcome": "allow" }));

        let user = principal(Role::USER);
        let decision = evaluator().evaluate(ModerationAction::Ban, &user, Target::User(&user));
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["outcome"], "deny");
        assert_eq!(json["code"], "self_target");
        assert_eq!(json["reason"], "Cannot ban yourself");
    }
}
