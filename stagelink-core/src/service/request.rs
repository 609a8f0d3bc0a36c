//! Signaling request tracker
//!
//! Uniformly manages the lifecycle of any asynchronous request that waits
//! for a remote accept/reject/cancel/timeout resolution: seat
//! applications, admin device requests, seat invitations, and (separately
//! instanced) conference invitations, connection requests, and battle
//! requests are all the same state machine parameterized with a different
//! payload type.
//!
//! A request is `Pending` while its entry sits in the tracker map and
//! terminal once removed. Removal happens under one write lock, so a
//! response, a cancellation, and the timeout supervisor racing each other
//! have exactly one winner; the losers observe a terminal id.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::models::{RequestId, RequestOutcome, RequestState, UserId};

/// Resolved-id log capacity; old entries are evicted FIFO
const RESOLVED_LOG_CAP: usize = 1024;

/// Completion hook run by the resolution winner before the outcome is
/// published to the issuer's handle
type Hook<P> = Box<dyn FnOnce(&TrackedRequest<P>, &RequestOutcome) + Send + Sync>;

/// Immutable snapshot of a tracked request
#[derive(Debug, Clone)]
pub struct TrackedRequest<P> {
    pub request_id: RequestId,
    pub issuer: UserId,
    pub targets: Vec<UserId>,
    pub payload: P,
    pub created_at: DateTime<Utc>,
}

struct PendingEntry<P> {
    tracked: TrackedRequest<P>,
    outcome_tx: oneshot::Sender<RequestOutcome>,
    hook: Option<Hook<P>>,
    timeout_task: Option<tokio::task::JoinHandle<()>>,
}

/// Bounded log of terminal request states, used to tell a duplicate
/// response (`RequestIdRepeat`) from a stale or unknown id
/// (`RequestIdInvalid`), and to absorb duplicate transport deliveries.
#[derive(Default)]
struct ResolvedLog {
    states: HashMap<RequestId, RequestState>,
    order: VecDeque<RequestId>,
}

impl ResolvedLog {
    fn record(&mut self, id: RequestId, state: RequestState) {
        if self.states.insert(id.clone(), state).is_none() {
            self.order.push_back(id);
            while self.order.len() > RESOLVED_LOG_CAP {
                if let Some(old) = self.order.pop_front() {
                    self.states.remove(&old);
                }
            }
        }
    }

    fn state(&self, id: &RequestId) -> Option<RequestState> {
        self.states.get(id).copied()
    }
}

struct TrackerInner<P> {
    pending: RwLock<HashMap<RequestId, PendingEntry<P>>>,
    resolved: RwLock<ResolvedLog>,
}

/// Request tracker, cheap to clone
pub struct RequestTracker<P> {
    inner: Arc<TrackerInner<P>>,
}

impl<P> Clone for RequestTracker<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> Default for RequestTracker<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> RequestTracker<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                pending: RwLock::new(HashMap::new()),
                resolved: RwLock::new(ResolvedLog::default()),
            }),
        }
    }

    /// Issue a request to `targets` and start timeout supervision.
    ///
    /// A zero `timeout` disables supervision entirely: the request only
    /// resolves through a response, a cancellation, or an internal error.
    /// With a non-zero `timeout` the caller must be inside a tokio
    /// runtime.
    pub fn issue(
        &self,
        payload: P,
        issuer: UserId,
        targets: Vec<UserId>,
        timeout: Duration,
    ) -> Result<RequestHandle<P>> {
        self.issue_inner(RequestId::new(), payload, issuer, targets, timeout, None)
    }

    /// Issue under a caller-chosen id, for payloads that embed the id
    /// themselves.
    pub fn issue_with_id(
        &self,
        request_id: RequestId,
        payload: P,
        issuer: UserId,
        targets: Vec<UserId>,
        timeout: Duration,
    ) -> Result<RequestHandle<P>> {
        self.issue_inner(request_id, payload, issuer, targets, timeout, None)
    }

    /// Same as [`issue`](Self::issue), with a completion hook the
    /// resolution winner runs exactly once before the outcome reaches the
    /// issuer's handle. Services use this to apply the accepted effect
    /// (e.g. seat the applicant) atomically with the resolution.
    pub fn issue_with_hook(
        &self,
        payload: P,
        issuer: UserId,
        targets: Vec<UserId>,
        timeout: Duration,
        hook: Hook<P>,
    ) -> Result<RequestHandle<P>> {
        self.issue_inner(RequestId::new(), payload, issuer, targets, timeout, Some(hook))
    }

    fn issue_inner(
        &self,
        request_id: RequestId,
        payload: P,
        issuer: UserId,
        targets: Vec<UserId>,
        timeout: Duration,
        hook: Option<Hook<P>>,
    ) -> Result<RequestHandle<P>> {
        if targets.is_empty() {
            return Err(Error::InvalidParameter(
                "request needs at least one target".to_string(),
            ));
        }

        let tracked = TrackedRequest {
            request_id,
            issuer,
            targets,
            payload,
            created_at: Utc::now(),
        };

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let mut entry = PendingEntry {
            tracked: tracked.clone(),
            outcome_tx,
            hook,
            timeout_task: None,
        };

        if !timeout.is_zero() {
            let tracker = self.clone();
            let request_id = tracked.request_id.clone();
            entry.timeout_task = Some(tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracker.expire(&request_id);
            }));
        }

        self.inner
            .pending
            .write()
            .insert(tracked.request_id.clone(), entry);

        tracing::debug!(request_id = %tracked.request_id, "request issued");

        Ok(RequestHandle {
            tracked,
            tracker: self.clone(),
            outcome: outcome_rx,
        })
    }

    /// Build a handle for a request that never waited (e.g. free-to-take
    /// seat taking): the outcome is published before the handle is
    /// returned and no entry enters the tracker.
    pub fn resolved_handle(&self, tracked: TrackedRequest<P>, outcome: RequestOutcome) -> RequestHandle<P> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .resolved
            .write()
            .record(tracked.request_id.clone(), outcome.state());
        let _ = tx.send(outcome);
        RequestHandle {
            tracked,
            tracker: self.clone(),
            outcome: rx,
        }
    }

    /// Resolve a pending request as its target.
    ///
    /// Returns the request snapshot so callers can fan out
    /// processed/accepted events. Errors: `RequestNoPermission` when
    /// `caller` is not a target, `RequestIdRepeat` when the id was
    /// already resolved by another response, `RequestIdInvalid` when the
    /// id is unknown or reached a terminal state some other way.
    pub fn respond(
        &self,
        caller: &UserId,
        request_id: &RequestId,
        agree: bool,
        message: &str,
    ) -> Result<TrackedRequest<P>> {
        let entry = {
            let mut pending = self.inner.pending.write();
            let authorized = match pending.get(request_id) {
                Some(entry) => entry.tracked.targets.contains(caller),
                None => {
                    return Err(match self.inner.resolved.read().state(request_id) {
                        Some(RequestState::Accepted | RequestState::Rejected) => {
                            Error::RequestIdRepeat
                        }
                        _ => Error::RequestIdInvalid,
                    });
                }
            };
            if !authorized {
                return Err(Error::RequestNoPermission);
            }
            match pending.remove(request_id) {
                Some(entry) => entry,
                None => return Err(Error::RequestIdInvalid),
            }
        };

        let outcome = if agree {
            RequestOutcome::Accepted {
                user_id: caller.clone(),
            }
        } else {
            RequestOutcome::Rejected {
                user_id: caller.clone(),
                message: message.to_string(),
            }
        };
        Ok(self.finish(entry, outcome))
    }

    /// Cancel a still-pending request as its issuer.
    pub fn cancel(&self, caller: &UserId, request_id: &RequestId) -> Result<TrackedRequest<P>> {
        let entry = {
            let mut pending = self.inner.pending.write();
            let is_issuer = match pending.get(request_id) {
                Some(entry) => entry.tracked.issuer == *caller,
                None => return Err(Error::RequestIdInvalid),
            };
            if !is_issuer {
                return Err(Error::RequestNoPermission);
            }
            match pending.remove(request_id) {
                Some(entry) => entry,
                None => return Err(Error::RequestIdInvalid),
            }
        };

        Ok(self.finish(entry, RequestOutcome::Cancelled))
    }

    /// Resolve a pending request as `Errored`; no-op when already terminal.
    pub fn fail(&self, request_id: &RequestId, error: Error) -> Option<TrackedRequest<P>> {
        let entry = self.inner.pending.write().remove(request_id)?;
        Some(self.finish(entry, RequestOutcome::Errored { error }))
    }

    /// Timeout supervisor entry point; losing the race is a no-op.
    fn expire(&self, request_id: &RequestId) {
        let Some(entry) = self.inner.pending.write().remove(request_id) else {
            return;
        };
        tracing::debug!(request_id = %request_id, "request timed out");
        self.finish(entry, RequestOutcome::TimedOut);
    }

    fn finish(&self, entry: PendingEntry<P>, outcome: RequestOutcome) -> TrackedRequest<P> {
        let PendingEntry {
            tracked,
            outcome_tx,
            hook,
            timeout_task,
        } = entry;

        if let Some(task) = timeout_task {
            task.abort();
        }
        self.inner
            .resolved
            .write()
            .record(tracked.request_id.clone(), outcome.state());
        if let Some(hook) = hook {
            hook(&tracked, &outcome);
        }
        // The issuer may have dropped its handle; that does not undo the
        // resolution.
        let _ = outcome_tx.send(outcome);
        tracked
    }

    /// Current state of an id: `Pending`, a terminal state from the
    /// resolved log, or `None` for ids this tracker never saw.
    pub fn state_of(&self, request_id: &RequestId) -> Option<RequestState> {
        if self.inner.pending.read().contains_key(request_id) {
            return Some(RequestState::Pending);
        }
        self.inner.resolved.read().state(request_id)
    }

    /// Pending request snapshot by id
    pub fn get(&self, request_id: &RequestId) -> Option<TrackedRequest<P>> {
        self.inner
            .pending
            .read()
            .get(request_id)
            .map(|e| e.tracked.clone())
    }

    /// Pending requests targeting `user`
    pub fn pending_targeting(&self, user: &UserId) -> Vec<TrackedRequest<P>> {
        self.inner
            .pending
            .read()
            .values()
            .filter(|e| e.tracked.targets.contains(user))
            .map(|e| e.tracked.clone())
            .collect()
    }

    /// Pending requests whose payload matches `filter`
    pub fn pending_matching(&self, filter: impl Fn(&TrackedRequest<P>) -> bool) -> Vec<TrackedRequest<P>> {
        self.inner
            .pending
            .read()
            .values()
            .map(|e| &e.tracked)
            .filter(|t| filter(t))
            .cloned()
            .collect()
    }
}

impl<P> std::fmt::Debug for RequestTracker<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTracker")
            .field("pending", &self.inner.pending.read().len())
            .finish()
    }
}

/// Issuer-side handle to a tracked request: an immutable snapshot, a
/// cancel capability, and an outcome that resolves exactly once.
pub struct RequestHandle<P>
where
    P: Clone + Send + Sync + 'static,
{
    tracked: TrackedRequest<P>,
    tracker: RequestTracker<P>,
    outcome: oneshot::Receiver<RequestOutcome>,
}

impl<P> RequestHandle<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn tracked(&self) -> &TrackedRequest<P> {
        &self.tracked
    }

    pub fn request_id(&self) -> &RequestId {
        &self.tracked.request_id
    }

    /// Cancel as the issuer; fails `RequestIdInvalid` once terminal.
    pub fn cancel(&self) -> Result<TrackedRequest<P>> {
        self.tracker.cancel(&self.tracked.issuer, &self.tracked.request_id)
    }

    /// Await the terminal resolution. Resolves exactly once; if the
    /// tracker vanished underneath the handle this reports an internal
    /// error rather than hanging.
    pub async fn outcome(self) -> RequestOutcome {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(_) => RequestOutcome::Errored {
                error: Error::ServerSystemError,
            },
        }
    }
}

impl<P> std::fmt::Debug for RequestHandle<P>
where
    P: Clone + Send + Sync + 'static + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("tracked", &self.tracked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tracker() -> RequestTracker<String> {
        RequestTracker::new()
    }

    fn issuer() -> UserId {
        UserId::from("issuer")
    }

    fn target() -> UserId {
        UserId::from("target")
    }

    #[tokio::test]
    async fn test_accept_resolves_once() {
        let tracker = tracker();
        let handle = tracker
            .issue("hello".to_string(), issuer(), vec![target()], Duration::ZERO)
            .unwrap();
        let id = handle.request_id().clone();

        tracker.respond(&target(), &id, true, "").unwrap();

        assert_eq!(
            handle.outcome().await,
            RequestOutcome::Accepted { user_id: target() }
        );
        assert_eq!(tracker.state_of(&id), Some(RequestState::Accepted));
    }

    #[tokio::test]
    async fn test_reject_carries_message() {
        let tracker = tracker();
        let handle = tracker
            .issue("hi".to_string(), issuer(), vec![target()], Duration::ZERO)
            .unwrap();
        let id = handle.request_id().clone();

        tracker.respond(&target(), &id, false, "busy").unwrap();

        assert_eq!(
            handle.outcome().await,
            RequestOutcome::Rejected {
                user_id: target(),
                message: "busy".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_response_is_repeat() {
        let tracker = tracker();
        let handle = tracker
            .issue(String::new(), issuer(), vec![target()], Duration::ZERO)
            .unwrap();
        let id = handle.request_id().clone();

        tracker.respond(&target(), &id, true, "").unwrap();
        assert_eq!(
            tracker.respond(&target(), &id, true, "").unwrap_err(),
            Error::RequestIdRepeat
        );
    }

    #[tokio::test]
    async fn test_response_after_cancel_is_invalid() {
        let tracker = tracker();
        let handle = tracker
            .issue(String::new(), issuer(), vec![target()], Duration::ZERO)
            .unwrap();
        let id = handle.request_id().clone();

        tracker.cancel(&issuer(), &id).unwrap();
        assert_eq!(
            tracker.respond(&target(), &id, true, "").unwrap_err(),
            Error::RequestIdInvalid
        );
        assert_eq!(handle.outcome().await, RequestOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_unknown_id_is_invalid() {
        let tracker = tracker();
        assert_eq!(
            tracker
                .respond(&target(), &RequestId::new(), true, "")
                .unwrap_err(),
            Error::RequestIdInvalid
        );
        assert_eq!(
            tracker.cancel(&issuer(), &RequestId::new()).unwrap_err(),
            Error::RequestIdInvalid
        );
    }

    #[tokio::test]
    async fn test_non_target_cannot_respond() {
        let tracker = tracker();
        let handle = tracker
            .issue(String::new(), issuer(), vec![target()], Duration::ZERO)
            .unwrap();

        assert_eq!(
            tracker
                .respond(&UserId::from("stranger"), handle.request_id(), true, "")
                .unwrap_err(),
            Error::RequestNoPermission
        );
        // Still pending afterwards
        assert_eq!(
            tracker.state_of(handle.request_id()),
            Some(RequestState::Pending)
        );
    }

    #[tokio::test]
    async fn test_non_issuer_cannot_cancel() {
        let tracker = tracker();
        let handle = tracker
            .issue(String::new(), issuer(), vec![target()], Duration::ZERO)
            .unwrap();

        assert_eq!(
            tracker
                .cancel(&target(), handle.request_id())
                .unwrap_err(),
            Error::RequestNoPermission
        );
    }

    #[tokio::test]
    async fn test_empty_targets_rejected() {
        let tracker = tracker();
        assert_eq!(
            tracker
                .issue(String::new(), issuer(), vec![], Duration::ZERO)
                .unwrap_err(),
            Error::InvalidParameter("request needs at least one target".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_when_unanswered() {
        let tracker = tracker();
        let handle = tracker
            .issue(
                String::new(),
                issuer(),
                vec![target()],
                Duration::from_secs(30),
            )
            .unwrap();
        let id = handle.request_id().clone();

        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(handle.outcome().await, RequestOutcome::TimedOut);
        assert_eq!(tracker.state_of(&id), Some(RequestState::TimedOut));
        // A late response observes the terminal id
        assert_eq!(
            tracker.respond(&target(), &id, true, "").unwrap_err(),
            Error::RequestIdInvalid
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_never_expires() {
        let tracker = tracker();
        let handle = tracker
            .issue(String::new(), issuer(), vec![target()], Duration::ZERO)
            .unwrap();
        let id = handle.request_id().clone();

        tokio::time::sleep(Duration::from_secs(24 * 3600)).await;

        assert_eq!(tracker.state_of(&id), Some(RequestState::Pending));
        tracker.respond(&target(), &id, true, "").unwrap();
        assert_eq!(
            handle.outcome().await,
            RequestOutcome::Accepted { user_id: target() }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_beats_timer() {
        let tracker = tracker();
        let handle = tracker
            .issue(
                String::new(),
                issuer(),
                vec![target()],
                Duration::from_secs(30),
            )
            .unwrap();
        let id = handle.request_id().clone();

        tokio::time::sleep(Duration::from_secs(29)).await;
        tracker.respond(&target(), &id, true, "").unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // The late timer is a no-op; the accepted outcome stands
        assert_eq!(
            handle.outcome().await,
            RequestOutcome::Accepted { user_id: target() }
        );
        assert_eq!(tracker.state_of(&id), Some(RequestState::Accepted));
    }

    #[tokio::test]
    async fn test_hook_runs_exactly_once() {
        let tracker = tracker();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_hook = calls.clone();
        let handle = tracker
            .issue_with_hook(
                String::new(),
                issuer(),
                vec![target()],
                Duration::ZERO,
                Box::new(move |_, outcome| {
                    assert!(matches!(outcome, RequestOutcome::Accepted { .. }));
                    calls_in_hook.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        tracker.respond(&target(), handle.request_id(), true, "").unwrap();
        let _ = tracker.respond(&target(), handle.request_id(), true, "");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pending_queries() {
        let tracker = tracker();
        let _h1 = tracker
            .issue("a".to_string(), issuer(), vec![target()], Duration::ZERO)
            .unwrap();
        let _h2 = tracker
            .issue("b".to_string(), UserId::from("other"), vec![target()], Duration::ZERO)
            .unwrap();

        assert_eq!(tracker.pending_targeting(&target()).len(), 2);
        assert_eq!(
            tracker.pending_matching(|t| t.payload == "a").len(),
            1
        );
    }

    #[tokio::test]
    async fn test_resolved_handle_is_terminal() {
        let tracker = tracker();
        let tracked = TrackedRequest {
            request_id: RequestId::new(),
            issuer: issuer(),
            targets: vec![target()],
            payload: String::new(),
            created_at: Utc::now(),
        };
        let id = tracked.request_id.clone();
        let handle = tracker.resolved_handle(
            tracked,
            RequestOutcome::Accepted { user_id: issuer() },
        );

        assert!(handle.cancel().is_err());
        assert_eq!(
            handle.outcome().await,
            RequestOutcome::Accepted { user_id: issuer() }
        );
        assert_eq!(tracker.state_of(&id), Some(RequestState::Accepted));
    }
}
