//! Fixed-interval polling.
//!
//! Each tick issues one poll for the view's chat and merges the result. A
//! failed tick is logged and dropped: the view keeps its last good state
//! and the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use salom_shared::protocol::{EnrichedMessage, ServerInfo};

use crate::api::ApiClient;
use crate::error::Result;
use crate::view::ChatView;

pub struct SyncLoop {
    client: ApiClient,
    view: Arc<Mutex<ChatView>>,
    interval: Duration,
    heartbeat: bool,
    updates: Option<mpsc::UnboundedSender<Vec<EnrichedMessage>>>,
}

/// Handle to a spawned [`SyncLoop`].
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Signal the loop and wait for it to finish its current tick.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "sync task ended abnormally");
        }
    }
}

impl SyncLoop {
    pub fn new(client: ApiClient, view: Arc<Mutex<ChatView>>, interval: Duration) -> Self {
        Self {
            client,
            view,
            interval,
            heartbeat: false,
            updates: None,
        }
    }

    /// Also refresh the presence lease on every tick.
    pub fn with_heartbeat(mut self, enabled: bool) -> Self {
        self.heartbeat = enabled;
        self
    }

    /// Send heartbeats only if the server leases presence.
    pub fn with_server_info(self, info: &ServerInfo) -> Self {
        self.with_heartbeat(info.presence_lease_secs > 0)
    }

    /// Receive the messages each tick makes visible.
    pub fn with_updates(mut self, tx: mpsc::UnboundedSender<Vec<EnrichedMessage>>) -> Self {
        self.updates = Some(tx);
        self
    }

    /// Poll once and merge. Returns how many messages became visible.
    pub async fn tick(&self) -> Result<usize> {
        let (chat, cursor) = {
            let view = self.view.lock().await;
            (view.chat(), view.cursor())
        };

        let poll = self.client.poll(chat, cursor).await?;
        let reset = poll.reset;
        let fresh = self.view.lock().await.apply_poll(poll);
        debug!(chat = %chat, reset, new = fresh.len(), "poll applied");

        let count = fresh.len();
        if count > 0 {
            if let Some(tx) = &self.updates {
                let _ = tx.send(fresh);
            }
        }
        Ok(count)
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "poll failed, keeping current view");
                    }
                    if self.heartbeat {
                        if let Err(e) = self.client.heartbeat().await {
                            warn!(error = %e, "heartbeat failed");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("sync loop stopping");
                        break;
                    }
                }
            }
        }
    }

    pub fn spawn(self) -> SyncHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        SyncHandle { shutdown, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::test_server::{spawn_server, spawn_server_with, sign_up};
    use salom_server::config::ServerConfig;
    use salom_shared::protocol::PublicProfile;

    #[tokio::test]
    async fn tick_merges_new_messages() {
        let server = spawn_server().await;
        let ali = sign_up(&server, "ali").await;
        let vali = sign_up(&server, "vali").await;
        let chat = ali.global_chat().await.unwrap();

        let view = Arc::new(Mutex::new(ChatView::new(chat)));
        let sync = SyncLoop::new(ali.clone(), view.clone(), Duration::from_secs(60));

        assert_eq!(sync.tick().await.unwrap(), 0);

        let sent = ali.send_global_message("salom").await.unwrap();
        view.lock().await.push_sent(sent);
        vali.send_global_message("va alaykum").await.unwrap();

        assert_eq!(sync.tick().await.unwrap(), 1);
        let view = view.lock().await;
        let contents: Vec<_> = view.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["salom", "va alaykum"]);
        assert_eq!(view.users().len(), 2);
    }

    #[tokio::test]
    async fn failed_tick_leaves_the_view_alone() {
        let server = spawn_server().await;
        let ali = sign_up(&server, "ali").await;
        let chat = ali.global_chat().await.unwrap();
        ali.send_global_message("salom").await.unwrap();

        let view = Arc::new(Mutex::new(ChatView::new(chat)));
        SyncLoop::new(ali.clone(), view.clone(), Duration::from_secs(60))
            .tick()
            .await
            .unwrap();
        let before = view.lock().await.messages().to_vec();

        let mut expired = ali.clone();
        expired.set_token("not-a-session");
        let err = SyncLoop::new(expired, view.clone(), Duration::from_secs(60))
            .tick()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 401, .. }));
        assert_eq!(view.lock().await.messages(), before.as_slice());
    }

    #[tokio::test]
    async fn spawned_loop_delivers_updates_and_stops() {
        let server = spawn_server().await;
        let ali = sign_up(&server, "ali").await;
        let vali = sign_up(&server, "vali").await;
        let chat = ali.global_chat().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let view = Arc::new(Mutex::new(ChatView::new(chat)));
        let handle = SyncLoop::new(ali, view.clone(), Duration::from_millis(20))
            .with_updates(tx)
            .spawn();

        vali.send_global_message("salom").await.unwrap();
        let batch = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch[0].content, "salom");

        handle.stop().await;
        assert_eq!(view.lock().await.messages().len(), 1);
    }

    async fn profile_of(client: &ApiClient, handle: &str) -> PublicProfile {
        let users = client.users().await.unwrap();
        users.into_iter().find(|u| u.username == handle).unwrap()
    }

    async fn run_until_update(ali: ApiClient, vali: &ApiClient) {
        let info = ali.info().await.unwrap();
        let chat = ali.global_chat().await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let view = Arc::new(Mutex::new(ChatView::new(chat)));
        let handle = SyncLoop::new(ali, view, Duration::from_millis(20))
            .with_server_info(&info)
            .with_updates(tx)
            .spawn();

        vali.send_global_message("salom").await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop().await;
    }

    #[tokio::test]
    async fn loop_leaves_last_seen_alone_without_a_lease() {
        let server = spawn_server().await;
        let ali = sign_up(&server, "ali").await;
        let vali = sign_up(&server, "vali").await;
        let before = profile_of(&vali, "ali").await.last_seen;

        run_until_update(ali, &vali).await;

        assert_eq!(profile_of(&vali, "ali").await.last_seen, before);
    }

    #[tokio::test]
    async fn loop_refreshes_a_leased_presence() {
        let server = spawn_server_with(ServerConfig {
            presence_lease: Duration::from_secs(60),
            ..ServerConfig::default()
        })
        .await;
        let ali = sign_up(&server, "ali").await;
        let vali = sign_up(&server, "vali").await;
        let before = profile_of(&vali, "ali").await.last_seen;

        run_until_update(ali, &vali).await;

        let after = profile_of(&vali, "ali").await;
        assert!(after.is_online);
        assert!(after.last_seen > before);
    }
}
