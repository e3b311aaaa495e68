//! # salom-client
//!
//! HTTP client for the salom chat server.
//!
//! - **ApiClient**: one async call per server operation, bearer session
//! - **ChatView**: the in-memory messages and users of one open chat
//! - **SyncLoop**: fixed-interval polling that keeps a view current

pub mod api;
pub mod config;
pub mod error;
pub mod sync;
pub mod view;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use sync::{SyncHandle, SyncLoop};
pub use view::ChatView;

#[cfg(test)]
pub(crate) mod test_server {
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use salom_server::api::{serve_on, AppState};
    use salom_server::config::ServerConfig;
    use salom_store::Database;

    use crate::{ApiClient, ClientConfig};

    pub(crate) struct TestServer {
        pub config: ClientConfig,
        handle: JoinHandle<()>,
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    /// A real server on an ephemeral port, backed by an in-memory database.
    pub(crate) async fn spawn_server() -> TestServer {
        spawn_server_with(ServerConfig::default()).await
    }

    pub(crate) async fn spawn_server_with(config: ServerConfig) -> TestServer {
        let db = salom_server::shared(Database::open_in_memory().unwrap());
        let state = AppState::new(db, config);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            serve_on(state, listener).await.unwrap();
        });

        TestServer {
            config: ClientConfig {
                server_url: format!("http://{addr}"),
                ..ClientConfig::default()
            },
            handle,
        }
    }

    pub(crate) async fn sign_up(server: &TestServer, handle: &str) -> ApiClient {
        let mut client = ApiClient::new(&server.config).unwrap();
        client
            .register(handle, &format!("{handle}@example.uz"), "parol")
            .await
            .unwrap();
        client.login(handle, "parol").await.unwrap();
        client
    }
}
