//! Moderation pipeline (application-level orchestration).
//!
//! Every moderation request goes through the same steps:
//!
//! ```text
//! Request (actor id, target id, action)
//!   ↓
//! 1. Validate arguments (sanction duration)
//!   ↓
//! 2. Resolve actor / target / resource (NotFound)
//!   ↓
//! 3. Evaluate the decision table (pure; Deny → audit `denied`, return error)
//!   ↓
//! 4. Mutate (status store, or the caller's closure for CRUD-owned resources)
//!   ↓
//! 5. Audit `granted` (failures logged, never rolled back)
//! ```
//!
//! Nothing is mutated before step 4, so a failed attempt never partially applies.

use std::sync::Arc;

use chrono::Duration;

use modgate_auth::{
    Comment, Decision, ModerationAction, PermissionEvaluator, Principal, Role, RoleHierarchy, Target,
};
use modgate_core::{Clock, CommentId, Entity, ModerationError, ModerationResult, UserId};

use crate::audit::{AuditOutcome, AuditRecord, AuditSink, ClientMetadata};
use crate::config::ModerationConfig;
use crate::directory::{ContentDirectory, IdentityProvider};
use crate::status::{SanctionDuration, StatusKind, TemporalStatus, TemporalStatusStore};

/// Who is asking, plus what the host knows about the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: UserId,
    pub client: ClientMetadata,
}

impl RequestContext {
    pub fn new(actor: UserId) -> Self {
        Self {
            actor,
            client: ClientMetadata::default(),
        }
    }

    pub fn with_client(mut self, client: ClientMetadata) -> Self {
        self.client = client;
        self
    }
}

/// Audit coordinates of the thing being acted on.
struct AuditSubject {
    entity_type: &'static str,
    entity_id: String,
}

impl AuditSubject {
    fn of<E: Entity>(entity: &E) -> Self {
        Self {
            entity_type: entity.entity_type(),
            entity_id: entity.id().to_string(),
        }
    }
}

/// Entry point the CRUD/controller layer calls for every moderation action.
///
/// ## Generic Parameters
///
/// - `S`: status store (ban/mute state)
/// - `A`: audit sink
/// - `D`: identity + content directory
pub struct ModerationService<S, A, D> {
    store: S,
    audit: A,
    directory: D,
    evaluator: PermissionEvaluator,
    clock: Arc<dyn Clock>,
    config: ModerationConfig,
}

impl<S, A, D> ModerationService<S, A, D>
where
    S: TemporalStatusStore,
    A: AuditSink,
    D: IdentityProvider + ContentDirectory,
{
    pub fn new(store: S, audit: A, directory: D, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            audit,
            directory,
            evaluator: PermissionEvaluator::new(Arc::new(RoleHierarchy::standard())),
            clock,
            config: ModerationConfig::default(),
        }
    }

    pub fn with_hierarchy(mut self, hierarchy: Arc<RoleHierarchy>) -> Self {
        self.evaluator = PermissionEvaluator::new(hierarchy);
        self
    }

    pub fn with_config(mut self, config: ModerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the startup sweep when `sweep_on_start` is set; returns records cleared.
    pub fn run_startup_sweep(&self) -> ModerationResult<usize> {
        if !self.config.sweep_on_start {
            return Ok(0);
        }
        Ok(self.store.sweep_expired()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads (never audited)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn status(&self, subject: UserId, kind: StatusKind) -> ModerationResult<TemporalStatus> {
        Ok(self.store.get(subject, kind)?)
    }

    pub fn is_banned(&self, subject: UserId) -> ModerationResult<bool> {
        Ok(self.status(subject, StatusKind::Ban)?.active)
    }

    pub fn is_muted(&self, subject: UserId) -> ModerationResult<bool> {
        Ok(self.status(subject, StatusKind::Mute)?.active)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ban / mute
    // ─────────────────────────────────────────────────────────────────────────

    /// Ban `target`; `duration` of `None` bans permanently.
    pub fn ban(
        &self,
        ctx: &RequestContext,
        target: UserId,
        duration: Option<Duration>,
        reason: Option<String>,
    ) -> ModerationResult<TemporalStatus> {
        self.sanction(ctx, ModerationAction::Ban, StatusKind::Ban, target, duration, reason)
    }

    /// Mute `target`; `duration` of `None` mutes permanently.
    pub fn mute(
        &self,
        ctx: &RequestContext,
        target: UserId,
        duration: Option<Duration>,
        reason: Option<String>,
    ) -> ModerationResult<TemporalStatus> {
        self.sanction(ctx, ModerationAction::Mute, StatusKind::Mute, target, duration, reason)
    }

    pub fn unban(&self, ctx: &RequestContext, target: UserId) -> ModerationResult<TemporalStatus> {
        self.lift(ctx, ModerationAction::Unban, StatusKind::Ban, target)
    }

    pub fn unmute(&self, ctx: &RequestContext, target: UserId) -> ModerationResult<TemporalStatus> {
        self.lift(ctx, ModerationAction::Unmute, StatusKind::Mute, target)
    }

    /// Lift an in-effect ban, or ban permanently if none is in effect.
    pub fn toggle_ban(
        &self,
        ctx: &RequestContext,
        target: UserId,
        reason: Option<String>,
    ) -> ModerationResult<TemporalStatus> {
        let action = ModerationAction::ToggleBan;
        let (actor, subject) = self.resolve_pair(ctx, target)?;
        self.authorize(ctx, action, &actor, Target::User(&subject), AuditSubject::of(&subject))?;

        let status = self
            .store
            .toggle(target, StatusKind::Ban, reason, Some(actor.id))?;

        let detail = if status.active { "banned" } else { "unbanned" };
        self.applied(ctx, action, AuditSubject::of(&subject), detail.to_string());
        Ok(status)
    }

    fn sanction(
        &self,
        ctx: &RequestContext,
        action: ModerationAction,
        kind: StatusKind,
        target: UserId,
        duration: Option<Duration>,
        reason: Option<String>,
    ) -> ModerationResult<TemporalStatus> {
        let term = duration.map(SanctionDuration::new).transpose()?;
        let (actor, subject) = self.resolve_pair(ctx, target)?;
        self.authorize(ctx, action, &actor, Target::User(&subject), AuditSubject::of(&subject))?;

        let status = match term {
            None => self
                .store
                .set_permanent(target, kind, reason, Some(actor.id))?,
            Some(term) => self
                .store
                .set_timed(target, kind, term, reason, Some(actor.id))?,
        };

        let detail = match (term, &status.reason) {
            (None, Some(reason)) => format!("permanent {kind}: {reason}"),
            (None, None) => format!("permanent {kind}"),
            (Some(term), Some(reason)) => {
                format!("{kind} for {}s: {reason}", term.as_duration().num_seconds())
            }
            (Some(term), None) => format!("{kind} for {}s", term.as_duration().num_seconds()),
        };
        self.applied(ctx, action, AuditSubject::of(&subject), detail);
        Ok(status)
    }

    fn lift(
        &self,
        ctx: &RequestContext,
        action: ModerationAction,
        kind: StatusKind,
        target: UserId,
    ) -> ModerationResult<TemporalStatus> {
        let (actor, subject) = self.resolve_pair(ctx, target)?;
        self.authorize(ctx, action, &actor, Target::User(&subject), AuditSubject::of(&subject))?;

        let status = self.store.clear(target, kind)?;
        self.applied(ctx, action, AuditSubject::of(&subject), format!("{kind} lifted"));
        Ok(status)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User management (mutation owned by the caller)
    // ─────────────────────────────────────────────────────────────────────────

    /// Gate a modify-user or delete-user change; `apply` runs only on Allow.
    pub fn authorize_user_change<T, F>(
        &self,
        ctx: &RequestContext,
        action: ModerationAction,
        target: UserId,
        apply: F,
    ) -> ModerationResult<T>
    where
        F: FnOnce(&Principal) -> ModerationResult<T>,
    {
        if !matches!(action, ModerationAction::ModifyUser | ModerationAction::DeleteUser) {
            return Err(ModerationError::invalid_argument(format!(
                "'{action}' is not a user change"
            )));
        }

        let (actor, subject) = self.resolve_pair(ctx, target)?;
        self.authorize(ctx, action, &actor, Target::User(&subject), AuditSubject::of(&subject))?;

        let out = apply(&subject)?;
        self.applied(ctx, action, AuditSubject::of(&subject), String::new());
        Ok(out)
    }

    /// Gate a role assignment; every granted role must rank below the actor.
    pub fn assign_roles<T, F>(
        &self,
        ctx: &RequestContext,
        target: UserId,
        roles: &[Role],
        apply: F,
    ) -> ModerationResult<T>
    where
        F: FnOnce(&Principal, &[Role]) -> ModerationResult<T>,
    {
        let action = ModerationAction::AssignRoles;
        let (actor, subject) = self.resolve_pair(ctx, target)?;
        self.authorize(
            ctx,
            action,
            &actor,
            Target::RoleGrant {
                principal: &subject,
                granted: roles,
            },
            AuditSubject::of(&subject),
        )?;

        let out = apply(&subject, roles)?;
        let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
        self.applied(
            ctx,
            action,
            AuditSubject::of(&subject),
            format!("roles: {}", names.join(", ")),
        );
        Ok(out)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Comments (mutation owned by the caller)
    // ─────────────────────────────────────────────────────────────────────────

    /// Gate an edit/delete/pin/unpin on a comment; `apply` runs only on Allow.
    pub fn moderate_comment<T, F>(
        &self,
        ctx: &RequestContext,
        action: ModerationAction,
        comment_id: CommentId,
        apply: F,
    ) -> ModerationResult<T>
    where
        F: FnOnce(&Comment) -> ModerationResult<T>,
    {
        if action.is_rank_gated() {
            return Err(ModerationError::invalid_argument(format!(
                "'{action}' is not a comment action"
            )));
        }

        let actor = self.principal(ctx.actor)?;
        let comment = self
            .directory
            .comment(comment_id)?
            .ok_or_else(|| ModerationError::not_found(format!("comment {comment_id}")))?;
        let event = self
            .directory
            .event(comment.event_id)?
            .ok_or_else(|| ModerationError::not_found(format!("event {}", comment.event_id)))?;
        // A deleted creator no longer outranks anyone.
        let event_creator = self
            .directory
            .principal(event.creator_id)?
            .unwrap_or_else(|| Principal::new(event.creator_id, Vec::new()));

        self.authorize(
            ctx,
            action,
            &actor,
            Target::Comment {
                comment: &comment,
                event_creator: &event_creator,
            },
            AuditSubject::of(&comment),
        )?;

        let out = apply(&comment)?;
        self.applied(
            ctx,
            action,
            AuditSubject::of(&comment),
            format!("event {}", comment.event_id),
        );
        Ok(out)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn principal(&self, id: UserId) -> ModerationResult<Principal> {
        self.directory
            .principal(id)?
            .ok_or_else(|| ModerationError::not_found(format!("user {id}")))
    }

    fn resolve_pair(&self, ctx: &RequestContext, target: UserId) -> ModerationResult<(Principal, Principal)> {
        let actor = self.principal(ctx.actor)?;
        let subject = self.principal(target)?;
        Ok((actor, subject))
    }

    fn authorize(
        &self,
        ctx: &RequestContext,
        action: ModerationAction,
        actor: &Principal,
        target: Target<'_>,
        subject: AuditSubject,
    ) -> ModerationResult<()> {
        match self.evaluator.evaluate(action, actor, target) {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => {
                tracing::info!(
                    actor = %actor.id,
                    action = %action,
                    entity = %subject.entity_id,
                    reason = %denial.reason,
                    "moderation action denied"
                );
                if self.config.audit_denials {
                    self.audit(ctx, action, subject, AuditOutcome::Denied, denial.reason.clone());
                }
                Err(denial.into())
            }
        }
    }

    fn applied(&self, ctx: &RequestContext, action: ModerationAction, subject: AuditSubject, detail: String) {
        tracing::info!(
            actor = %ctx.actor,
            action = %action,
            entity = %subject.entity_id,
            "moderation action applied"
        );
        self.audit(ctx, action, subject, AuditOutcome::Granted, detail);
    }

    fn audit(
        &self,
        ctx: &RequestContext,
        action: ModerationAction,
        subject: AuditSubject,
        outcome: AuditOutcome,
        detail: String,
    ) {
        let record = AuditRecord {
            actor_id: ctx.actor,
            action,
            entity_type: subject.entity_type.to_string(),
            entity_id: subject.entity_id,
            outcome,
            detail,
            client: ctx.client.clone(),
            recorded_at: self.clock.now(),
        };

        if let Err(err) = self.audit.record(record) {
            tracing::warn!(error = %err, action = %action, "audit write failed; continuing");
        }
    }
}
