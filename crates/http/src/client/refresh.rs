//! Single-flight access token refresh
//!
//! A [`RefreshCoordinator`] is a handle to one background task that owns all
//! refresh state. Requests that were rejected with 401 ask the task for a
//! fresh token. The first such request while idle starts the one refresh
//! call; every request arriving while that call is outstanding is queued
//! behind it. When the call settles, the outcome is persisted and every
//! queued request is answered with it in a single pass, so no waiter sees a
//! token older than the one the refresh produced.

use super::error::{RefreshError, extract_message};
use super::events::SessionEvent;
use async_trait::async_trait;
use futures::future::{BoxFuture, OptionFuture};
use serde::Deserialize;
use shopfront_core::SessionStore;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Obtains a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, RefreshError>;
}

/// Calls the refresh endpoint; the refresh token travels in the cookie jar
pub struct HttpTokenRefresher {
    http: reqwest::Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[derive(Deserialize)]
struct RefreshBody {
    #[serde(default, rename = "accessToken", alias = "access_token")]
    access_token: Option<String>,
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self) -> Result<String, RefreshError> {
        let response = self
            .http
            .post(&self.url)
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: extract_message(&body, status),
            });
        }

        serde_json::from_str::<RefreshBody>(&body)
            .ok()
            .and_then(|b| b.access_token)
            .filter(|t| !t.is_empty())
            .ok_or(RefreshError::MissingToken)
    }
}

type Reply = oneshot::Sender<Result<String, RefreshError>>;

enum RefreshRequest {
    /// `stale` is the token the rejected request was sent with
    Acquire { stale: Option<String>, reply: Reply },
}

/// Handle to the refresh task; clones share the task
#[derive(Clone)]
pub struct RefreshCoordinator {
    tx: mpsc::Sender<RefreshRequest>,
}

impl RefreshCoordinator {
    /// Start the refresh task on the current tokio runtime
    ///
    /// The task stops once every handle has been dropped.
    pub fn spawn(
        refresher: Arc<dyn TokenRefresher>,
        session: SessionStore,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let actor = RefreshActor {
            refresher,
            session,
            events,
            rx,
            in_flight: None,
            waiters: Vec::new(),
        };
        tokio::spawn(actor.run());
        Self { tx }
    }

    /// Wait for an access token newer than `stale`
    ///
    /// Returns the session's current token straight away if it already
    /// differs from `stale`; otherwise joins (or starts) the refresh.
    pub async fn fresh_token(&self, stale: Option<String>) -> Result<String, RefreshError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RefreshRequest::Acquire { stale, reply })
            .await
            .map_err(|_| RefreshError::Closed)?;
        rx.await.map_err(|_| RefreshError::Closed)?
    }
}

struct RefreshActor {
    refresher: Arc<dyn TokenRefresher>,
    session: SessionStore,
    events: broadcast::Sender<SessionEvent>,
    rx: mpsc::Receiver<RefreshRequest>,
    in_flight: Option<BoxFuture<'static, Result<String, RefreshError>>>,
    waiters: Vec<Reply>,
}

impl RefreshActor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                request = self.rx.recv() => match request {
                    Some(RefreshRequest::Acquire { stale, reply }) => self.acquire(stale, reply),
                    None => break,
                },
                Some(result) = OptionFuture::from(self.in_flight.as_mut()) => self.settle(result),
            }
        }
        debug!("Refresh coordinator stopped");
    }

    fn acquire(&mut self, stale: Option<String>, reply: Reply) {
        if self.in_flight.is_some() {
            self.waiters.push(reply);
            debug!(queued = self.waiters.len(), "Refresh in flight, queued request");
            return;
        }

        if let Some(current) = self.session.access_token()
            && stale.as_deref() != Some(current.as_str())
        {
            debug!("Access token already replaced, skipping refresh");
            let _ = reply.send(Ok(current));
            return;
        }

        info!("Access token rejected, refreshing");
        let refresher = Arc::clone(&self.refresher);
        self.in_flight = Some(Box::pin(async move { refresher.refresh().await }));
        self.waiters.push(reply);
    }

    fn settle(&mut self, result: Result<String, RefreshError>) {
        self.in_flight = None;
        let waiters = std::mem::take(&mut self.waiters);

        match &result {
            Ok(token) => {
                if let Err(e) = self.session.set_access_token(token.clone()) {
                    warn!("Failed to persist refreshed access token: {e}");
                }
                info!(waiters = waiters.len(), "Access token refreshed");
                let _ = self.events.send(SessionEvent::Refreshed);
            }
            Err(e) => {
                warn!(waiters = waiters.len(), "Token refresh failed, clearing session: {e}");
                if let Err(e) = self.session.logout() {
                    warn!("Failed to clear stored session: {e}");
                }
                let _ = self.events.send(SessionEvent::Expired { reason: e.clone() });
            }
        }

        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_core::{Role, Session, UserProfile};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Blocks every refresh until released, then returns `outcome`
    struct GatedRefresher {
        calls: AtomicUsize,
        gate: Notify,
        outcome: Result<String, RefreshError>,
    }

    impl GatedRefresher {
        fn new(outcome: Result<String, RefreshError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
                outcome,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(&self) -> Result<String, RefreshError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.outcome.clone()
        }
    }

    fn signed_in(token: &str) -> SessionStore {
        let session = SessionStore::in_memory();
        session
            .login(
                UserProfile {
                    id: "u-1".into(),
                    email: "bob@example.com".into(),
                    name: None,
                    role: Role::Customer,
                    phone: None,
                    address: None,
                },
                token,
            )
            .unwrap();
        session
    }

    async fn wait_for_calls(refresher: &GatedRefresher, calls: usize) {
        for _ in 0..100 {
            if refresher.calls() >= calls {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn spawn_waiters(
        coordinator: &RefreshCoordinator,
        count: usize,
        stale: &str,
    ) -> Vec<tokio::task::JoinHandle<Result<String, RefreshError>>> {
        (0..count)
            .map(|_| {
                let coordinator = coordinator.clone();
                let stale = stale.to_string();
                tokio::spawn(async move { coordinator.fresh_token(Some(stale)).await })
            })
            .collect()
    }

    #[tokio::test]
    async fn test_concurrent_waiters_share_one_refresh() {
        let session = signed_in("old");
        let refresher = GatedRefresher::new(Ok("new".to_string()));
        let (events, mut rx) = broadcast::channel(8);
        let coordinator = RefreshCoordinator::spawn(refresher.clone(), session.clone(), events);

        let waiters = spawn_waiters(&coordinator, 3, "old");
        wait_for_calls(&refresher, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        refresher.gate.notify_one();

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Ok("new".to_string()));
        }
        assert_eq!(refresher.calls(), 1);
        assert_eq!(session.access_token().as_deref(), Some("new"));
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Refreshed);
    }

    #[tokio::test]
    async fn test_failed_refresh_rejects_all_and_clears_session() {
        let session = signed_in("old");
        let failure = RefreshError::Rejected {
            status: 401,
            message: "refresh token revoked".into(),
        };
        let refresher = GatedRefresher::new(Err(failure.clone()));
        let (events, mut rx) = broadcast::channel(8);
        let coordinator = RefreshCoordinator::spawn(refresher.clone(), session.clone(), events);

        let waiters = spawn_waiters(&coordinator, 3, "old");
        wait_for_calls(&refresher, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        refresher.gate.notify_one();

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Err(failure.clone()));
        }
        assert_eq!(refresher.calls(), 1);
        assert_eq!(session.snapshot(), Session::default());
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Expired { reason: failure }
        );
    }

    #[tokio::test]
    async fn test_replaced_token_is_returned_without_refresh() {
        let session = signed_in("current");
        let refresher = GatedRefresher::new(Ok("unused".to_string()));
        let (events, _rx) = broadcast::channel(8);
        let coordinator = RefreshCoordinator::spawn(refresher.clone(), session, events);

        let token = coordinator
            .fresh_token(Some("stale".to_string()))
            .await
            .unwrap();
        assert_eq!(token, "current");
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_sequential_rejections_refresh_again() {
        let session = signed_in("t0");
        let refresher = GatedRefresher::new(Ok("t1".to_string()));
        let (events, _rx) = broadcast::channel(8);
        let coordinator = RefreshCoordinator::spawn(refresher.clone(), session.clone(), events);

        refresher.gate.notify_one();
        assert_eq!(coordinator.fresh_token(Some("t0".into())).await.unwrap(), "t1");

        // The refreshed token itself was rejected later on
        refresher.gate.notify_one();
        assert_eq!(coordinator.fresh_token(Some("t1".into())).await.unwrap(), "t1");
        assert_eq!(refresher.calls(), 2);
    }

    #[tokio::test]
    async fn test_signed_out_session_still_refreshes() {
        let session = SessionStore::in_memory();
        let refresher = GatedRefresher::new(Ok("fresh".to_string()));
        let (events, _rx) = broadcast::channel(8);
        let coordinator = RefreshCoordinator::spawn(refresher.clone(), session.clone(), events);

        refresher.gate.notify_one();
        assert_eq!(coordinator.fresh_token(None).await.unwrap(), "fresh");
        assert_eq!(session.access_token().as_deref(), Some("fresh"));
    }
}
