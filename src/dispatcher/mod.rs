//! Resume dispatcher: the pause/resume state machine.
//!
//! ```text
//! NEW ──(quantity <= threshold)──────────────────────────> RESOLVED (auto_approved)
//! NEW ──(quantity >  threshold)──> AWAITING_CONFIRMATION ─(decision)─> RESOLVED
//! ```
//!
//! A paused call returns `pending` immediately; the caller re-invokes with the
//! same token and a [`Confirmation`] to finish it. Re-presenting a resolved
//! token returns the stored result and never re-runs the action.

pub mod events;

pub use events::{DispatchEvent, DispatchEventKind, EventSink};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::action::{ApprovalAction, ApprovalMode};
use crate::error::{GateError, Result};
use crate::gate::{ApprovalGate, Classification};
use crate::store::{PendingRecord, PendingStore, RecordPhase, RecordState, Resolution};
use crate::types::request::payload_fingerprint;
use crate::types::{Confirmation, Decision, Outcome, Request, RequestToken, ToolCall, ToolResult};
use crate::util::locks::TokenLocks;
use crate::util::retry::RetryPolicy;

/// Drives one action through the approval state machine.
pub struct ResumeDispatcher {
    gate: ApprovalGate,
    action: Arc<dyn ApprovalAction>,
    store: Arc<dyn PendingStore>,
    locks: TokenLocks,
    retry: RetryPolicy,
    expiry: Option<Duration>,
    event_sink: Option<EventSink>,
}

impl ResumeDispatcher {
    pub fn new(
        action: Arc<dyn ApprovalAction>,
        store: Arc<dyn PendingStore>,
        gate: ApprovalGate,
    ) -> Self {
        Self {
            gate,
            action,
            store,
            locks: TokenLocks::new(),
            retry: RetryPolicy::none(),
            expiry: None,
            event_sink: None,
        }
    }

    /// Share a lock table with other dispatchers over the same store.
    pub fn with_locks(mut self, locks: TokenLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Awaiting records older than `ttl` are treated as gone.
    pub fn with_expiry(mut self, ttl: Option<Duration>) -> Self {
        self.expiry = ttl;
        self
    }

    pub fn with_event_sink(mut self, sink: Option<EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn action(&self) -> &Arc<dyn ApprovalAction> {
        &self.action
    }

    pub fn gate(&self) -> ApprovalGate {
        self.gate
    }

    /// Handle one invocation of the gated action.
    ///
    /// Without a decision this submits (or replays) the request. With a
    /// decision it resumes the paused request named by `call.token`; the
    /// payload must match what was paused.
    pub async fn dispatch(&self, call: ToolCall) -> Result<ToolResult> {
        let quantity = ApprovalGate::validate(call.quantity)?;
        let token = match call.token.as_deref() {
            Some(raw) => RequestToken::new(raw)?,
            None if call.decision.is_some() => {
                return Err(GateError::InvalidInput(
                    "a decision needs the token of the paused request".into(),
                ));
            }
            None => RequestToken::generate(),
        };
        let fingerprint = payload_fingerprint(self.action.name(), quantity, &call.target);

        let _guard = self.locks.lock(&token).await;
        match call.decision {
            Some(confirmation) => {
                self.resume_locked(&token, confirmation, Some(&fingerprint))
                    .await
            }
            None => self.submit_locked(token, quantity, call.target, &fingerprint).await,
        }
    }

    /// Resume a paused request by token alone.
    pub async fn resume(&self, token: &str, confirmation: Confirmation) -> Result<ToolResult> {
        let token = RequestToken::new(token)?;
        let _guard = self.locks.lock(&token).await;
        self.resume_locked(&token, confirmation, None).await
    }

    /// Current phase of `token`. Unknown and expired tokens report `New`.
    pub async fn status(&self, token: &str) -> Result<RecordPhase> {
        let token = RequestToken::new(token)?;
        Ok(match self.store.get(&token).await? {
            Some(record) if !record.is_expired(self.expiry, Utc::now()) => record.phase(),
            _ => RecordPhase::New,
        })
    }

    /// Remove expired awaiting records. Returns how many were removed.
    pub async fn reclaim_expired(&self) -> Result<usize> {
        reclaim_expired(
            self.store.as_ref(),
            &self.locks,
            self.expiry,
            self.event_sink.as_ref(),
        )
        .await
    }

    async fn submit_locked(
        &self,
        token: RequestToken,
        quantity: u32,
        target: String,
        fingerprint: &str,
    ) -> Result<ToolResult> {
        if let Some(record) = self.store.get(&token).await? {
            self.ensure_same_action(&record)?;
            if record.is_expired(self.expiry, Utc::now()) {
                self.reclaim(&record).await?;
            } else {
                if record.phase() == RecordPhase::Executing {
                    return Err(self.interrupted(&record));
                }
                if record.request.fingerprint() != fingerprint {
                    let reason = match record.phase() {
                        RecordPhase::Resolved => "token already resolved for a different request",
                        _ => "token is awaiting confirmation for a different request",
                    };
                    return Err(GateError::conflict(token.as_str(), reason));
                }
                return Ok(self.replay(&record));
            }
        }

        let request = Request::new(token, self.action.name(), quantity, target);
        match self.gate.classify_units(quantity) {
            Classification::AutoApprove => self.auto_approve(request).await,
            Classification::RequiresConfirmation => self.pause(request).await,
        }
    }

    async fn auto_approve(&self, request: Request) -> Result<ToolResult> {
        let message = self.action.approved_message(&request, ApprovalMode::Auto);
        let claimed = PendingRecord::executing(request, message.clone(), ApprovalMode::Auto);
        self.store.put(claimed.clone()).await?;

        let result_id = self.execute_claimed(&claimed, ApprovalMode::Auto).await?;
        let resolution = Resolution {
            outcome: Outcome::AutoApproved,
            result_id: Some(result_id.clone()),
            message,
            decision: None,
            resolved_at: Utc::now(),
        };
        let record = self.store.resolve(claimed.token(), resolution).await?;

        tracing::info!(
            token = %record.token(),
            action = self.action.name(),
            quantity = record.request.quantity,
            result_id = %result_id,
            "request auto-approved"
        );
        self.emit(&record, events::DispatchEventKind::AutoApproved { result_id });
        Ok(record.to_result())
    }

    async fn pause(&self, request: Request) -> Result<ToolResult> {
        let hint = self.action.confirmation_hint(&request);
        let message = self.action.pending_message(&request);
        let record = PendingRecord::awaiting(request, message, Some(hint.clone()));
        self.store.put(record.clone()).await?;

        tracing::info!(
            token = %record.token(),
            action = self.action.name(),
            quantity = record.request.quantity,
            threshold = self.gate.threshold(),
            "request paused awaiting confirmation"
        );
        self.emit(&record, events::DispatchEventKind::Paused { hint });
        Ok(record.to_result())
    }

    async fn resume_locked(
        &self,
        token: &RequestToken,
        confirmation: Confirmation,
        fingerprint: Option<&str>,
    ) -> Result<ToolResult> {
        let record = self
            .store
            .get(token)
            .await?
            .ok_or_else(|| GateError::not_found(token.as_str()))?;
        self.ensure_same_action(&record)?;

        if record.is_expired(self.expiry, Utc::now()) {
            self.reclaim(&record).await?;
            return Err(GateError::not_found(token.as_str()));
        }
        if let Some(fingerprint) = fingerprint {
            if record.request.fingerprint() != fingerprint {
                return Err(GateError::conflict(
                    token.as_str(),
                    "decision payload does not match the paused request",
                ));
            }
        }
        match record.state {
            RecordState::Resolved(_) => return Ok(self.replay(&record)),
            RecordState::Executing { .. } => return Err(self.interrupted(&record)),
            RecordState::Awaiting => {}
        }

        let decision = Decision::from_confirmation(token.clone(), confirmation);
        let resolution = if decision.confirmed {
            let claimed = self
                .store
                .begin_execution(token, ApprovalMode::Human)
                .await?;
            let result_id = self
                .execute_claimed(&claimed, ApprovalMode::Human)
                .await?;
            Resolution {
                outcome: Outcome::Approved,
                result_id: Some(result_id),
                message: self
                    .action
                    .approved_message(&record.request, ApprovalMode::Human),
                decision: Some(decision),
                resolved_at: Utc::now(),
            }
        } else {
            Resolution {
                outcome: Outcome::Rejected,
                result_id: None,
                message: self.action.rejected_message(&record.request),
                decision: Some(decision),
                resolved_at: Utc::now(),
            }
        };

        let outcome = resolution.outcome;
        let result_id = resolution.result_id.clone();
        let resolved = self.store.resolve(token, resolution).await?;

        tracing::info!(
            token = %token,
            action = self.action.name(),
            outcome = %outcome,
            "paused request resolved"
        );
        self.emit(
            &resolved,
            events::DispatchEventKind::Resolved { outcome, result_id },
        );
        Ok(resolved.to_result())
    }

    fn replay(&self, record: &PendingRecord) -> ToolResult {
        let result = record.to_result();
        tracing::debug!(
            token = %record.token(),
            action = self.action.name(),
            outcome = %result.outcome,
            "replaying known token"
        );
        self.emit(
            record,
            events::DispatchEventKind::Replayed {
                outcome: result.outcome,
            },
        );
        result
    }

    async fn reclaim(&self, record: &PendingRecord) -> Result<()> {
        self.store.remove(record.token()).await?;
        tracing::info!(
            token = %record.token(),
            action = %record.request.action,
            "reclaimed expired request"
        );
        self.emit(record, events::DispatchEventKind::Reclaimed);
        Ok(())
    }

    /// Run the action for a record already marked executing. On failure the
    /// claim is undone: a human-approved record goes back to awaiting, an
    /// auto-approved one is dropped.
    async fn execute_claimed(&self, claimed: &PendingRecord, mode: ApprovalMode) -> Result<String> {
        let action = &self.action;
        let request = &claimed.request;
        let err = match self
            .retry
            .execute_for(action.name(), request.token.as_str(), move || {
                action.execute(request, mode)
            })
            .await
        {
            Ok(result_id) => return Ok(result_id),
            Err(err) => err,
        };

        let undone = match mode {
            ApprovalMode::Human => self.store.release(claimed.token()).await.map(|_| ()),
            ApprovalMode::Auto => self.store.remove(claimed.token()).await.map(|_| ()),
        };
        if let Err(undo_err) = undone {
            tracing::warn!(
                token = %claimed.token(),
                action = self.action.name(),
                error = %undo_err,
                "could not release claim after failed action"
            );
        }
        Err(err)
    }

    fn interrupted(&self, record: &PendingRecord) -> GateError {
        tracing::warn!(
            token = %record.token(),
            action = self.action.name(),
            "token left executing by an interrupted run"
        );
        GateError::interrupted(record.token().as_str())
    }

    fn ensure_same_action(&self, record: &PendingRecord) -> Result<()> {
        if record.request.action != self.action.name() {
            return Err(GateError::conflict(
                record.token().as_str(),
                format!("token belongs to action {}", record.request.action),
            ));
        }
        Ok(())
    }

    fn emit(&self, record: &PendingRecord, kind: events::DispatchEventKind) {
        if let Some(sink) = &self.event_sink {
            sink(DispatchEvent::new(
                record.token().as_str(),
                record.request.action.as_str(),
                kind,
            ));
        }
    }
}

impl std::fmt::Debug for ResumeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeDispatcher")
            .field("action", &self.action.name())
            .field("gate", &self.gate)
            .field("retry", &self.retry)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Remove every expired awaiting record in `store`.
pub async fn reclaim_expired(
    store: &dyn PendingStore,
    locks: &TokenLocks,
    ttl: Option<Duration>,
    sink: Option<&EventSink>,
) -> Result<usize> {
    if ttl.is_none() {
        return Ok(0);
    }
    let mut reclaimed = 0;
    for candidate in store.list().await? {
        if !candidate.is_expired(ttl, Utc::now()) {
            continue;
        }
        let _guard = locks.lock(candidate.token()).await;
        // Re-read under the lock; the record may have been resolved meanwhile.
        let Some(record) = store.get(candidate.token()).await? else {
            continue;
        };
        if !record.is_expired(ttl, Utc::now()) {
            continue;
        }
        if store.remove(record.token()).await? {
            reclaimed += 1;
            tracing::info!(
                token = %record.token(),
                action = %record.request.action,
                "reclaimed expired request"
            );
            if let Some(sink) = sink {
                sink(DispatchEvent::new(
                    record.token().as_str(),
                    record.request.action.as_str(),
                    events::DispatchEventKind::Reclaimed,
                ));
            }
        }
    }
    Ok(reclaimed)
}
