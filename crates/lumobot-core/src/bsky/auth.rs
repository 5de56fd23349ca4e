use serde::Deserialize;

use crate::config::BotConfig;
use crate::constants::{nsid, REQUEST_TIMEOUT};
use crate::error::BotError;

/// Authenticated identity used for every XRPC call of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_jwt: String,
    /// Repository replies are written to
    pub did: String,
    pub handle: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    access_jwt: String,
    did: String,
    #[serde(default)]
    handle: String,
}

/// Exchange handle + app password for a session token.
///
/// Any failure here is fatal to the run.
pub async fn create_session(
    client: &reqwest::Client,
    service_url: &str,
    identifier: &str,
    password: &str,
) -> Result<Session, BotError> {
    let url = format!(
        "{}/xrpc/{}",
        service_url.trim_end_matches('/'),
        nsid::CREATE_SESSION
    );

    let response = client
        .post(&url)
        .timeout(REQUEST_TIMEOUT)
        .json(&serde_json::json!({
            "identifier": identifier,
            "password": password,
        }))
        .send()
        .await
        .map_err(|e| BotError::Auth {
            message: format!("createSession request failed: {e}"),
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(BotError::Auth {
            message: format!("createSession returned {status}: {error_text}"),
        });
    }

    let body: CreateSessionResponse = response.json().await.map_err(|e| BotError::Auth {
        message: format!("createSession response unreadable: {e}"),
    })?;

    Ok(Session {
        access_jwt: body.access_jwt,
        did: body.did,
        handle: body.handle,
    })
}

/// Use the pre-issued token when configured, otherwise log in with the app password
pub async fn session_from_config(
    client: &reqwest::Client,
    config: &BotConfig,
) -> Result<Session, BotError> {
    if let Some(token) = config.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(Session {
            access_jwt: token.to_string(),
            did: config.bot_did.clone(),
            handle: config.bot_handle.clone(),
        });
    }

    let password = config
        .app_password
        .as_deref()
        .ok_or_else(|| BotError::Auth {
            message: "no access token or app password configured".to_string(),
        })?;

    let session = create_session(client, config.service_url(), &config.bot_handle, password).await?;
    if session.did != config.bot_did {
        tracing::warn!(
            "session DID {} differs from configured botDid {}; replies go to the session repo",
            session.did,
            config.bot_did
        );
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_session_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .and(body_partial_json(serde_json::json!({
                "identifier": "bot.bsky.social",
                "password": "app-pass"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accessJwt": "jwt-123",
                "refreshJwt": "refresh",
                "did": "did:plc:bot",
                "handle": "bot.bsky.social"
            })))
            .mount(&server)
            .await;

        let session = create_session(
            &reqwest::Client::new(),
            &server.uri(),
            "bot.bsky.social",
            "app-pass",
        )
        .await
        .unwrap();

        assert_eq!(session.access_jwt, "jwt-123");
        assert_eq!(session.did, "did:plc:bot");
    }

    #[tokio::test]
    async fn test_create_session_rejected_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(ResponseTemplate::new(401).set_body_string("AuthenticationRequired"))
            .mount(&server)
            .await;

        let err = create_session(&reqwest::Client::new(), &server.uri(), "bot", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Auth { .. }));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_token_skips_network() {
        let config = BotConfig {
            access_token: Some("preissued".to_string()),
            bot_did: "did:plc:bot".to_string(),
            bot_handle: "bot.bsky.social".to_string(),
            service_url: Some("http://127.0.0.1:1".to_string()),
            ..Default::default()
        };

        let session = session_from_config(&reqwest::Client::new(), &config)
            .await
            .unwrap();
        assert_eq!(session.access_jwt, "preissued");
        assert_eq!(session.did, "did:plc:bot");
    }
}
