use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use salom_shared::constants::SELF_PROFILE_ALIAS;
use salom_shared::protocol::{
    AddContactRequest, ChatIdResponse, ChatSummary, EnrichedMessage, LoginRequest, LoginResponse,
    PollQuery, PollResponse, PrivateChatRequest, PublicProfile, RegisterRequest,
    RegisterResponse, SendMessageRequest, ServerInfo, StatusMessage, SyncCursor,
};
use salom_shared::{ChatId, UserId};

use crate::access::{ensure_member, AuthSession};
use crate::config::ServerConfig;
use crate::directory::ChatDirectory;
use crate::error::ServerError;
use crate::identity::{session_user, IdentityStore};
use crate::message_log::MessageLog;
use crate::presence::PresenceTracker;
use crate::session::SessionIssuer;
use crate::sync::SyncService;
use crate::SharedDb;

#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityStore,
    pub directory: ChatDirectory,
    pub messages: MessageLog,
    pub presence: PresenceTracker,
    pub sync: SyncService,
    pub sessions: Arc<SessionIssuer>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire every service to the one shared database.
    pub fn new(db: SharedDb, config: ServerConfig) -> Self {
        let presence = PresenceTracker::new(db.clone()).with_lease(config.presence_lease);
        let directory = ChatDirectory::new(db.clone());
        let sessions = SessionIssuer::from_secret(config.session_signing_key, config.session_ttl);
        Self {
            identity: IdentityStore::new(db.clone(), presence.clone()),
            messages: MessageLog::new(db.clone(), directory.clone()),
            sync: SyncService::new(db, directory.clone()),
            directory,
            presence,
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Arc<SessionIssuer> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/api/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/presence/heartbeat", post(heartbeat))
        .route("/api/users", get(list_users))
        .route("/api/users/:id", get(get_user))
        .route("/api/chats/private", post(open_private_chat))
        .route("/api/chats/global", get(open_global_chat))
        .route("/api/chats/:id", get(chat_view))
        .route("/api/chats/:id/poll", get(poll_chat))
        .route(
            "/api/messages/global",
            get(global_messages).post(send_global_message),
        )
        .route(
            "/api/messages/:chat_id",
            get(chat_messages).post(send_chat_message),
        )
        .route("/api/contacts", get(list_contacts).post(add_contact))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfo> {
    Json(ServerInfo {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION").into(),
        registration_open: state.config.registration_open,
        poll_interval_ms: state.config.poll_interval_hint.as_millis() as u64,
        presence_lease_secs: state.config.presence_lease.as_secs(),
    })
}

// ─── Identity ───

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ServerError> {
    if !state.config.registration_open {
        return Err(ServerError::RegistrationClosed);
    }

    let user = state
        .identity
        .register(&req.username, &req.email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user: user.to_profile(),
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    let user = state
        .identity
        .authenticate(&req.username_or_email, &req.password)
        .await?;
    let (token, claims) = state.sessions.issue(&user)?;

    Ok(Json(LoginResponse {
        token,
        expires_at: claims.expires_at,
        user: session_user(&user),
    }))
}

async fn logout(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<StatusMessage>, ServerError> {
    state.presence.sign_out(session.user_id()).await?;
    info!(user = %session.user_id(), "user signed out");
    Ok(Json(StatusMessage {
        message: "Signed out".into(),
    }))
}

async fn heartbeat(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<StatusMessage>, ServerError> {
    let refreshed = state.presence.heartbeat(session.user_id()).await?;
    let message = if refreshed {
        "ok"
    } else if state.presence.lease_enabled() {
        "not signed in"
    } else {
        "presence lease disabled"
    };
    Ok(Json(StatusMessage {
        message: message.into(),
    }))
}

async fn list_users(
    State(state): State<AppState>,
    _session: AuthSession,
) -> Result<Json<Vec<PublicProfile>>, ServerError> {
    let users = state.identity.list_all().await?;
    Ok(Json(users.iter().map(|u| u.to_profile()).collect()))
}

async fn get_user(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<PublicProfile>, ServerError> {
    let id = if id == SELF_PROFILE_ALIAS {
        session.user_id()
    } else {
        parse_id::<UserId>(&id, "user id")?
    };
    Ok(Json(state.identity.get_by_id(id).await?.to_profile()))
}

async fn list_contacts(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<PublicProfile>>, ServerError> {
    let contacts = state.identity.contacts(session.user_id()).await?;
    Ok(Json(contacts.iter().map(|u| u.to_profile()).collect()))
}

async fn add_contact(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<AddContactRequest>,
) -> Result<Json<StatusMessage>, ServerError> {
    let target = parse_id::<UserId>(&req.target_user_id, "targetUserId")?;
    state.identity.add_contact(session.user_id(), target).await?;
    Ok(Json(StatusMessage {
        message: "Contact added successfully".into(),
    }))
}

// ─── Chats ───

async fn open_private_chat(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(req): Json<PrivateChatRequest>,
) -> Result<Json<ChatIdResponse>, ServerError> {
    let a = parse_id::<UserId>(&req.participant1_id, "participant1Id")?;
    let b = parse_id::<UserId>(&req.participant2_id, "participant2Id")?;
    let chat = state.directory.get_or_create_private_chat(a, b).await?;
    Ok(Json(ChatIdResponse { chat_id: chat.id }))
}

async fn open_global_chat(
    State(state): State<AppState>,
    _session: AuthSession,
) -> Result<Json<ChatIdResponse>, ServerError> {
    let chat = state.directory.get_or_create_global_chat().await?;
    Ok(Json(ChatIdResponse { chat_id: chat.id }))
}

async fn chat_view(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<ChatSummary>, ServerError> {
    let chat = state.directory.get(parse_id(&id, "chat id")?).await?;
    ensure_member(&chat, session.user_id())?;
    Ok(Json(state.directory.summary(&chat).await?))
}

async fn poll_chat(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollResponse>, ServerError> {
    let chat_id = parse_id::<ChatId>(&id, "chat id")?;
    let since = match query.since.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<SyncCursor>()
                .map_err(|_| ServerError::BadRequest(format!("invalid cursor: {raw}")))?,
        ),
    };
    Ok(Json(state.sync.poll(chat_id, session.user_id(), since).await?))
}

// ─── Messages ───

async fn global_messages(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<EnrichedMessage>>, ServerError> {
    let chat = state.directory.get_or_create_global_chat().await?;
    let messages = state
        .messages
        .recent_messages(chat.id, session.user_id())
        .await?;
    Ok(Json(messages))
}

async fn send_global_message(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<EnrichedMessage>), ServerError> {
    let chat = state.directory.get_or_create_global_chat().await?;
    let message = state
        .messages
        .append(chat.id, session.user_id(), &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn chat_messages(
    State(state): State<AppState>,
    session: AuthSession,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<EnrichedMessage>>, ServerError> {
    let chat_id = parse_id(&chat_id, "chat id")?;
    let messages = state
        .messages
        .recent_messages(chat_id, session.user_id())
        .await?;
    Ok(Json(messages))
}

async fn send_chat_message(
    State(state): State<AppState>,
    session: AuthSession,
    Path(chat_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<EnrichedMessage>), ServerError> {
    let chat_id = parse_id(&chat_id, "chat id")?;
    let message = state
        .messages
        .append(chat_id, session.user_id(), &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Identifiers arrive as strings; a malformed one is a validation error,
/// never a lookup.
fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, ServerError> {
    raw.trim()
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("malformed {what}: {raw}")))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(state, listener).await
}

/// Serve on an already bound listener.
pub async fn serve_on(state: AppState, listener: TcpListener) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %listener.local_addr()?, "Starting HTTP API server");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, Response};
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use salom_shared::protocol::ErrorBody;

    fn app_with(config: ServerConfig) -> Router {
        let db = crate::test_support::memory_db();
        build_router(AppState::new(db, config))
    }

    fn app() -> Router {
        app_with(ServerConfig::default())
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn call(app: &Router, req: Request<Body>) -> Response<Body> {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn read<T: DeserializeOwned>(resp: Response<Body>) -> T {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn sign_up_and_in(app: &Router, handle: &str) -> LoginResponse {
        let resp = call(
            app,
            request(
                Method::POST,
                "/api/register",
                None,
                Some(json!({
                    "username": handle,
                    "email": format!("{handle}@example.uz"),
                    "password": "parol",
                })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = call(
            app,
            request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "usernameOrEmail": handle, "password": "parol" })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        read(resp).await
    }

    #[tokio::test]
    async fn health_is_public() {
        let resp = call(&app(), request(Method::GET, "/health", None, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = read(resp).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_need_a_session() {
        let app = app();
        for (method, uri) in [
            (Method::GET, "/api/users"),
            (Method::GET, "/api/contacts"),
            (Method::GET, "/api/messages/global"),
            (Method::GET, "/api/chats/global"),
        ] {
            let resp = call(&app, request(method, uri, None, None)).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }

        let resp = call(&app, request(Method::GET, "/api/users", Some("junk"), None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = app();
        sign_up_and_in(&app, "ali").await;

        let resp = call(
            &app,
            request(
                Method::POST,
                "/api/register",
                None,
                Some(json!({ "username": "ali", "email": "other@example.uz", "password": "x" })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: ErrorBody = read(resp).await;
        assert_eq!(body.error, "This username is already taken");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = app();
        sign_up_and_in(&app, "ali").await;

        let resp = call(
            &app,
            request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "usernameOrEmail": "ali", "password": "wrong" })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn closed_registration_is_forbidden() {
        let app = app_with(ServerConfig {
            registration_open: false,
            ..ServerConfig::default()
        });
        let resp = call(
            &app,
            request(
                Method::POST,
                "/api/register",
                None,
                Some(json!({ "username": "ali", "email": "ali@example.uz", "password": "x" })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn global_chat_round_trip() {
        let app = app();
        let ali = sign_up_and_in(&app, "ali").await;

        let resp = call(
            &app,
            request(
                Method::POST,
                "/api/messages/global",
                Some(&ali.token),
                Some(json!({ "content": "salom" })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let sent: EnrichedMessage = read(resp).await;
        assert_eq!(sent.sender.username, "ali");

        let resp = call(
            &app,
            request(Method::GET, "/api/messages/global", Some(&ali.token), None),
        )
        .await;
        let messages: Vec<EnrichedMessage> = read(resp).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "salom");

        let resp = call(
            &app,
            request(Method::GET, "/api/chats/global", Some(&ali.token), None),
        )
        .await;
        let global: ChatIdResponse = read(resp).await;
        assert_eq!(global.chat_id, sent.chat);
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let app = app();
        let ali = sign_up_and_in(&app, "ali").await;
        let resp = call(
            &app,
            request(
                Method::POST,
                "/api/messages/global",
                Some(&ali.token),
                Some(json!({ "content": "   " })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn private_chat_access() {
        let app = app();
        let ali = sign_up_and_in(&app, "ali").await;
        let vali = sign_up_and_in(&app, "vali").await;
        let eve = sign_up_and_in(&app, "eve").await;

        let resp = call(
            &app,
            request(
                Method::POST,
                "/api/chats/private",
                Some(&ali.token),
                Some(json!({
                    "participant1Id": ali.user.id.to_string(),
                    "participant2Id": vali.user.id.to_string(),
                })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let chat: ChatIdResponse = read(resp).await;
        let uri = format!("/api/messages/{}", chat.chat_id);

        let resp = call(
            &app,
            request(Method::POST, &uri, Some(&vali.token), Some(json!({ "content": "hi" }))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = call(
            &app,
            request(Method::POST, &uri, Some(&eve.token), Some(json!({ "content": "hi" }))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = call(&app, request(Method::GET, &uri, Some(&eve.token), None)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let view = format!("/api/chats/{}", chat.chat_id);
        let resp = call(&app, request(Method::GET, &view, Some(&ali.token), None)).await;
        let summary: ChatSummary = read(resp).await;
        assert_eq!(summary.participants.len(), 2);
    }

    #[tokio::test]
    async fn self_chat_and_malformed_ids_are_bad_requests() {
        let app = app();
        let ali = sign_up_and_in(&app, "ali").await;
        let id = ali.user.id.to_string();

        let resp = call(
            &app,
            request(
                Method::POST,
                "/api/chats/private",
                Some(&ali.token),
                Some(json!({ "participant1Id": id, "participant2Id": id })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = call(
            &app,
            request(Method::GET, "/api/messages/not-a-uuid", Some(&ali.token), None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let unknown = format!("/api/messages/{}", ChatId::new());
        let resp = call(&app, request(Method::GET, &unknown, Some(&ali.token), None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn contacts_and_profile_alias() {
        let app = app();
        let ali = sign_up_and_in(&app, "ali").await;
        let vali = sign_up_and_in(&app, "vali").await;
        let body = json!({ "targetUserId": vali.user.id.to_string() });

        let resp = call(
            &app,
            request(Method::POST, "/api/contacts", Some(&ali.token), Some(body.clone())),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = call(
            &app,
            request(Method::POST, "/api/contacts", Some(&ali.token), Some(body)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = call(
            &app,
            request(
                Method::POST,
                "/api/contacts",
                Some(&ali.token),
                Some(json!({ "targetUserId": ali.user.id.to_string() })),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = call(&app, request(Method::GET, "/api/users/me", Some(&ali.token), None)).await;
        let me: PublicProfile = read(resp).await;
        assert_eq!(me.username, "ali");
        assert_eq!(me.contacts, vec![vali.user.id]);
        assert!(me.is_online);

        let resp = call(&app, request(Method::GET, "/api/contacts", Some(&vali.token), None)).await;
        let theirs: Vec<PublicProfile> = read(resp).await;
        assert!(theirs.is_empty());
    }

    #[tokio::test]
    async fn logout_marks_offline() {
        let app = app();
        let ali = sign_up_and_in(&app, "ali").await;
        let vali = sign_up_and_in(&app, "vali").await;

        let resp = call(&app, request(Method::POST, "/api/auth/logout", Some(&ali.token), None)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = call(&app, request(Method::GET, "/api/users", Some(&vali.token), None)).await;
        let users: Vec<PublicProfile> = read(resp).await;
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["ali", "vali"]);
        assert!(!users[0].is_online);
        assert!(users[1].is_online);
    }

    async fn presence_of(app: &Router, token: &str, handle: &str) -> PublicProfile {
        let resp = call(app, request(Method::GET, "/api/users", Some(token), None)).await;
        let users: Vec<PublicProfile> = read(resp).await;
        users.into_iter().find(|u| u.username == handle).unwrap()
    }

    #[tokio::test]
    async fn heartbeat_after_logout_keeps_user_offline() {
        let app = app();
        let ali = sign_up_and_in(&app, "ali").await;
        let vali = sign_up_and_in(&app, "vali").await;

        let resp = call(&app, request(Method::POST, "/api/auth/logout", Some(&ali.token), None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let before = presence_of(&app, &vali.token, "ali").await;

        let resp = call(&app, request(Method::POST, "/api/presence/heartbeat", Some(&ali.token), None)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let after = presence_of(&app, &vali.token, "ali").await;
        assert!(!after.is_online);
        assert_eq!(after.last_seen, before.last_seen);
    }

    #[tokio::test]
    async fn leased_heartbeat_refreshes_only_online_users() {
        let app = app_with(ServerConfig {
            presence_lease: std::time::Duration::from_secs(60),
            ..ServerConfig::default()
        });
        let ali = sign_up_and_in(&app, "ali").await;
        let vali = sign_up_and_in(&app, "vali").await;

        let resp = call(&app, request(Method::GET, "/info", None, None)).await;
        let info: ServerInfo = read(resp).await;
        assert_eq!(info.presence_lease_secs, 60);

        let resp = call(&app, request(Method::POST, "/api/presence/heartbeat", Some(&ali.token), None)).await;
        let body: StatusMessage = read(resp).await;
        assert_eq!(body.message, "ok");
        assert!(presence_of(&app, &vali.token, "ali").await.is_online);

        call(&app, request(Method::POST, "/api/auth/logout", Some(&ali.token), None)).await;
        let resp = call(&app, request(Method::POST, "/api/presence/heartbeat", Some(&ali.token), None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!presence_of(&app, &vali.token, "ali").await.is_online);
    }

    #[tokio::test]
    async fn poll_over_http() {
        let app = app();
        let ali = sign_up_and_in(&app, "ali").await;

        let resp = call(&app, request(Method::GET, "/api/chats/global", Some(&ali.token), None)).await;
        let global: ChatIdResponse = read(resp).await;
        let poll_uri = format!("/api/chats/{}/poll", global.chat_id);

        let resp = call(&app, request(Method::GET, &poll_uri, Some(&ali.token), None)).await;
        let first: PollResponse = read(resp).await;
        assert!(first.reset);

        call(
            &app,
            request(
                Method::POST,
                "/api/messages/global",
                Some(&ali.token),
                Some(json!({ "content": "yangi" })),
            ),
        )
        .await;

        let uri = format!("{poll_uri}?since={}", first.cursor);
        let resp = call(&app, request(Method::GET, &uri, Some(&ali.token), None)).await;
        let next: PollResponse = read(resp).await;
        assert!(!next.reset);
        assert_eq!(next.messages.len(), 1);
        assert_eq!(next.messages[0].content, "yangi");

        let bad = format!("{poll_uri}?since=abc");
        let resp = call(&app, request(Method::GET, &bad, Some(&ali.token), None)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
