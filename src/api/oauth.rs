//! Provides Google access tokens.
//!
//! Service accounts use the JWT bearer grant: a short-lived assertion signed with the account's
//! private key is exchanged for an access token. Authorized users use the refresh-token grant.
//!
//! An access token is fetched the first time one is needed and then reused until it is about to
//! expire, so a burst of webhook deliveries costs one token request rather than one each.

use crate::api::files::{AuthorizedUser, ServiceAccount};
use crate::api::CredentialsFile;
use crate::error::Res;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Google access tokens last an hour. This is used if the token response does not say.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// A cached token is refreshed when it has less than this much time left.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Read and write access to spreadsheets, and nothing else.
const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Google accepts assertions that are valid for at most an hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// The claims of the assertion a service account signs.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct JwtTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub(crate) struct TokenProvider {
    credentials: CredentialsFile,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub(crate) fn new(credentials: CredentialsFile, http: reqwest::Client) -> Self {
        Self {
            credentials,
            http,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid access token, refreshing it first if needed.
    pub(crate) async fn token(&self) -> Res<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - chrono::Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now() {
                return Ok(token.access_token.clone());
            }
        }
        debug!(
            "Requesting a Google access token from {}",
            self.credentials.token_uri()
        );
        let (access_token, lifetime) = match &self.credentials {
            CredentialsFile::ServiceAccount(account) => self.service_account_token(account).await?,
            CredentialsFile::AuthorizedUser(user) => self.refresh_user_token(user).await?,
        };
        let expires_at = Utc::now()
            + chrono::Duration::from_std(lifetime).unwrap_or(chrono::Duration::hours(1));
        debug!("Google access token valid until {expires_at}");
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });
        Ok(access_token)
    }

    async fn service_account_token(&self, account: &ServiceAccount) -> Res<(String, Duration)> {
        let assertion = sign_assertion(account, Utc::now())?;
        let response = self
            .http
            .post(account.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("Failed to request a Google access token for the service account")?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!(
                "Google refused the token request for {} with status {status}: {body}",
                account.client_email()
            );
        }
        let token: JwtTokenResponse = response
            .json()
            .await
            .context("Failed to parse the Google token response")?;
        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LIFETIME);
        Ok((token.access_token, lifetime))
    }

    async fn refresh_user_token(&self, user: &AuthorizedUser) -> Res<(String, Duration)> {
        let token_url = TokenUrl::new(user.token_uri().to_string())
            .context("The token_uri in the Google credentials is not a valid URL")?;
        let client = BasicClient::new(ClientId::new(user.client_id().to_string()))
            .set_client_secret(ClientSecret::new(user.client_secret().to_string()))
            .set_token_uri(token_url);

        let response = client
            .exchange_refresh_token(&RefreshToken::new(user.refresh_token().to_string()))
            .request_async(&self.http)
            .await
            .context("Failed to refresh the Google access token")?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_LIFETIME);
        Ok((response.access_token().secret().to_string(), lifetime))
    }
}

/// Signs the RS256 assertion that a service account exchanges for an access token.
fn sign_assertion(account: &ServiceAccount, now: DateTime<Utc>) -> Res<String> {
    let claims = Claims {
        iss: account.client_email().to_string(),
        scope: SPREADSHEETS_SCOPE.to_string(),
        aud: account.token_uri().to_string(),
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = account.private_key_id().map(str::to_string);
    let key = EncodingKey::from_rsa_pem(account.private_key().as_bytes())
        .context("The private_key in the service account credentials is not a PEM RSA key")?;
    jsonwebtoken::encode(&header, &claims, &key).context("Failed to sign the token assertion")
}
