//! # salom
//!
//! Terminal client.
//!
//! ```text
//! salom register <username> <email> <password>
//! salom login <username-or-email> <password>
//! ```
//!
//! After `login` the client joins the global chat: new messages are
//! printed as the sync loop discovers them and every stdin line is sent.

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use salom_client::{ApiClient, ChatView, ClientConfig, SyncLoop};
use salom_shared::protocol::EnrichedMessage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,salom_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ClientConfig::from_env();
    let mut client = ApiClient::new(&config)?;

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["register", username, email, password] => {
            let resp = client.register(username, email, password).await?;
            println!("{} ({})", resp.message, resp.user.username);
            Ok(())
        }
        ["login", login, password] => {
            let session = client
                .login(login, password)
                .await
                .context("sign-in failed")?;
            info!(user = %session.user.id, "signed in as {}", session.user.username);
            global_chat(client, &config).await
        }
        _ => bail!(
            "usage:\n  salom register <username> <email> <password>\n  salom login <username-or-email> <password>"
        ),
    }
}

/// Join the global chat, then sign out however the session ended.
async fn global_chat(mut client: ApiClient, config: &ClientConfig) -> anyhow::Result<()> {
    let outcome = chat_session(&client, config).await;
    client.logout().await?;
    outcome
}

async fn chat_session(client: &ApiClient, config: &ClientConfig) -> anyhow::Result<()> {
    let server = client.info().await?;
    let chat = client.global_chat().await?;
    let view = Arc::new(Mutex::new(ChatView::new(chat)));
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<EnrichedMessage>>();

    let sync = SyncLoop::new(client.clone(), view.clone(), config.poll_interval)
        .with_server_info(&server)
        .with_updates(tx)
        .spawn();

    println!("Joined the global chat. Type a message and press Enter; Ctrl+D to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            batch = rx.recv() => match batch {
                Some(messages) => messages.iter().for_each(print_message),
                None => break,
            },
            line = lines.next_line() => match line {
                Ok(Some(text)) if text.trim().is_empty() => {}
                Ok(Some(text)) => match client.send_global_message(&text).await {
                    Ok(sent) => {
                        let shown = sent.clone();
                        if view.lock().await.push_sent(sent) {
                            print_message(&shown);
                        }
                    }
                    Err(e) => eprintln!("! not sent: {e}"),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            },
        }
    }

    sync.stop().await;
    Ok(())
}

fn print_message(message: &EnrichedMessage) {
    println!(
        "[{}] {}: {}",
        message.timestamp.format("%H:%M:%S"),
        message.sender.username,
        message.content
    );
}
