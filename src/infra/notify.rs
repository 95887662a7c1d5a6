//! Telegram Bot API delivery for contact requests.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{debug, warn};

use crate::application::contact::{Notifier, NotifyError};

const SOURCE: &str = "vitrina::infra::notify";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Posts messages to a chat through `sendMessage`.
#[derive(Clone, Debug)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: Url,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &Url, bot_token: &str, chat_id: String) -> Result<Self, NotifyError> {
        let endpoint = send_message_url(api_base, bot_token)?;
        let client = Client::builder()
            .user_agent(concat!("vitrina/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(target = SOURCE, status = status.as_u16(), "message rejected");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!(target = SOURCE, "message delivered");
        Ok(())
    }
}

/// Stand-in used when no bot token or chat id is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Disabled)
    }
}

fn send_message_url(api_base: &Url, bot_token: &str) -> Result<Url, NotifyError> {
    let mut base = api_base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("./bot{bot_token}/sendMessage"))
        .map_err(|err| NotifyError::Transport(format!("invalid notify endpoint: {err}")))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, routing::post};
    use serde_json::Value;

    use super::*;

    #[test]
    fn endpoint_keeps_base_path() {
        let root = Url::parse("https://api.telegram.org").expect("url");
        assert_eq!(
            send_message_url(&root, "123:abc").expect("endpoint").as_str(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );

        let nested = Url::parse("http://127.0.0.1:9000/proxy").expect("url");
        assert_eq!(
            send_message_url(&nested, "t").expect("endpoint").as_str(),
            "http://127.0.0.1:9000/proxy/bott/sendMessage"
        );
    }

    #[tokio::test]
    async fn disabled_notifier_refuses() {
        assert!(matches!(
            DisabledNotifier.send("hi").await,
            Err(NotifyError::Disabled)
        ));
    }

    #[tokio::test]
    async fn posts_markdown_payload() {
        let received: Arc<Mutex<Vec<Value>>> = Arc::default();
        let app = Router::new()
            .route(
                "/bottoken/sendMessage",
                post(
                    |State(received): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                        received.lock().expect("received lock").push(body);
                        Json(serde_json::json!({ "ok": true }))
                    },
                ),
            )
            .with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let base = Url::parse(&format!("http://{addr}")).expect("url");
        let notifier = TelegramNotifier::new(&base, "token", "42".into()).expect("notifier");
        notifier.send("*hello*").await.expect("send");
        server.abort();

        let received = received.lock().expect("received lock");
        assert_eq!(
            received.as_slice(),
            [serde_json::json!({
                "chat_id": "42",
                "text": "*hello*",
                "parse_mode": "Markdown"
            })]
        );
    }
}
