use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use salom_shared::protocol::{
    AddContactRequest, ChatIdResponse, ChatSummary, EnrichedMessage, ErrorBody, LoginRequest,
    LoginResponse, PollResponse, PrivateChatRequest, PublicProfile, RegisterRequest,
    RegisterResponse, SendMessageRequest, ServerInfo, StatusMessage, SyncCursor,
};
use salom_shared::{ChatId, UserId};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Typed access to the server's HTTP API. Cloning shares the connection
/// pool and copies the session token.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(cfg: &ClientConfig) -> Result<ApiClient> {
        if cfg.timeout.is_zero() {
            return Err(ClientError::InvalidInput("timeout"));
        }
        if cfg.user_agent.trim().is_empty() {
            return Err(ClientError::InvalidInput("user_agent"));
        }
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()?;
        Ok(ApiClient {
            base_url: cfg.server_url.trim_end_matches('/').to_string(),
            http,
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Resume a session obtained earlier.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Public instance settings. Needs no session.
    pub async fn info(&self) -> Result<ServerInfo> {
        self.send(self.http.get(self.url("/info"))).await
    }

    // ─── Identity ───

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.http.post(self.url("/api/register")).json(&body))
            .await
    }

    /// Sign in and keep the returned session for later calls.
    pub async fn login(&mut self, username_or_email: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            username_or_email: username_or_email.to_string(),
            password: password.to_string(),
        };
        let resp: LoginResponse = self
            .send(self.http.post(self.url("/api/auth/login")).json(&body))
            .await?;
        self.token = Some(resp.token.clone());
        Ok(resp)
    }

    pub async fn logout(&mut self) -> Result<StatusMessage> {
        let resp = self.post_empty("/api/auth/logout").await?;
        self.token = None;
        Ok(resp)
    }

    pub async fn heartbeat(&self) -> Result<StatusMessage> {
        self.post_empty("/api/presence/heartbeat").await
    }

    pub async fn users(&self) -> Result<Vec<PublicProfile>> {
        self.get_authed("/api/users").await
    }

    pub async fn user(&self, id: UserId) -> Result<PublicProfile> {
        self.get_authed(&format!("/api/users/{id}")).await
    }

    pub async fn me(&self) -> Result<PublicProfile> {
        self.get_authed("/api/users/me").await
    }

    pub async fn contacts(&self) -> Result<Vec<PublicProfile>> {
        self.get_authed("/api/contacts").await
    }

    pub async fn add_contact(&self, target: UserId) -> Result<StatusMessage> {
        let body = AddContactRequest {
            target_user_id: target.to_string(),
        };
        self.post_authed("/api/contacts", &body).await
    }

    // ─── Chats ───

    pub async fn open_private_chat(&self, a: UserId, b: UserId) -> Result<ChatId> {
        let body = PrivateChatRequest {
            participant1_id: a.to_string(),
            participant2_id: b.to_string(),
        };
        let resp: ChatIdResponse = self.post_authed("/api/chats/private", &body).await?;
        Ok(resp.chat_id)
    }

    pub async fn global_chat(&self) -> Result<ChatId> {
        let resp: ChatIdResponse = self.get_authed("/api/chats/global").await?;
        Ok(resp.chat_id)
    }

    pub async fn chat(&self, id: ChatId) -> Result<ChatSummary> {
        self.get_authed(&format!("/api/chats/{id}")).await
    }

    pub async fn poll(&self, chat: ChatId, since: Option<SyncCursor>) -> Result<PollResponse> {
        let path = match since {
            Some(cursor) => format!("/api/chats/{chat}/poll?since={cursor}"),
            None => format!("/api/chats/{chat}/poll"),
        };
        self.get_authed(&path).await
    }

    // ─── Messages ───

    pub async fn messages(&self, chat: ChatId) -> Result<Vec<EnrichedMessage>> {
        self.get_authed(&format!("/api/messages/{chat}")).await
    }

    pub async fn global_messages(&self) -> Result<Vec<EnrichedMessage>> {
        self.get_authed("/api/messages/global").await
    }

    pub async fn send_message(&self, chat: ChatId, content: &str) -> Result<EnrichedMessage> {
        let body = SendMessageRequest {
            content: content.to_string(),
        };
        self.post_authed(&format!("/api/messages/{chat}"), &body)
            .await
    }

    pub async fn send_global_message(&self, content: &str) -> Result<EnrichedMessage> {
        let body = SendMessageRequest {
            content: content.to_string(),
        };
        self.post_authed("/api/messages/global", &body).await
    }

    // ─── Plumbing ───

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::NotSignedIn)?;
        Ok(req.bearer_auth(token))
    }

    async fn get_authed<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let req = self.authed(self.http.get(self.url(path)))?;
        self.send(req).await
    }

    async fn post_authed<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let req = self.authed(self.http.post(self.url(path)))?.json(body);
        self.send(req).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let req = self.authed(self.http.post(self.url(path)))?;
        self.send(req).await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        handle_json_response(resp).await
    }
}

async fn handle_json_response<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let body = resp.bytes().await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{spawn_server, sign_up};

    #[tokio::test]
    async fn calls_without_a_session_fail_locally() {
        let client = ApiClient::new(&ClientConfig::default()).unwrap();
        assert!(matches!(client.users().await, Err(ClientError::NotSignedIn)));
    }

    #[tokio::test]
    async fn info_reports_the_disabled_lease() {
        let server = spawn_server().await;
        let client = ApiClient::new(&server.config).unwrap();
        let info = client.info().await.unwrap();
        assert!(info.registration_open);
        assert_eq!(info.presence_lease_secs, 0);
    }

    #[tokio::test]
    async fn server_errors_carry_status_and_message() {
        let server = spawn_server().await;
        let client = ApiClient::new(&server.config).unwrap();
        client.register("ali", "ali@example.uz", "parol").await.unwrap();

        let err = client
            .register("ali", "ali2@example.uz", "parol")
            .await
            .unwrap_err();
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "This username is already taken");
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut client = client;
        let err = client.login("ali", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(client.token().is_none());
    }

    #[tokio::test]
    async fn private_chat_between_two_clients() {
        let server = spawn_server().await;
        let ali = sign_up(&server, "ali").await;
        let vali = sign_up(&server, "vali").await;
        let eve = sign_up(&server, "eve").await;

        let ali_id = ali.me().await.unwrap().id;
        let vali_id = vali.me().await.unwrap().id;

        let chat = ali.open_private_chat(ali_id, vali_id).await.unwrap();
        assert_eq!(vali.open_private_chat(vali_id, ali_id).await.unwrap(), chat);

        vali.send_message(chat, "salom ali").await.unwrap();
        let seen = ali.messages(chat).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].sender.username, "vali");

        let denied = eve.send_message(chat, "hi").await.unwrap_err();
        assert_eq!(denied.status(), Some(403));

        let summary = ali.chat(chat).await.unwrap();
        assert!(!summary.is_group_chat);
    }

    #[tokio::test]
    async fn contacts_and_logout() {
        let server = spawn_server().await;
        let mut ali = sign_up(&server, "ali").await;
        let vali = sign_up(&server, "vali").await;
        let vali_id = vali.me().await.unwrap().id;

        ali.add_contact(vali_id).await.unwrap();
        let again = ali.add_contact(vali_id).await.unwrap_err();
        assert_eq!(again.status(), Some(409));
        assert_eq!(ali.contacts().await.unwrap().len(), 1);

        ali.heartbeat().await.unwrap();
        ali.logout().await.unwrap();
        assert!(ali.token().is_none());

        let users = vali.users().await.unwrap();
        let ali_profile = users.iter().find(|u| u.username == "ali").unwrap();
        assert!(!ali_profile.is_online);
    }
}
