//! HTTP client for the hosted identity/profile service.
//!
//! Token resolution and profile reads are both idempotent GETs; profile reads
//! additionally go through the backoff wrapper since a missing profile only
//! degrades a leaderboard row.

use std::time::Duration;

use async_trait::async_trait;
use color_eyre::eyre::{Context as _, eyre};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::retry::retry_with_backoff;
use crate::store::{IdentityProvider, Profile};

const PROFILE_RETRY_ATTEMPTS: u32 = 3;
const PROFILE_RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    name: String,
    avatar: String,
    points: i64,
}

/// Append a path to the base URL, keeping any query string where it belongs.
fn build_endpoint_url(base_url: &str, path: &str) -> String {
    match Url::parse(base_url) {
        Ok(mut url) => {
            let joined = format!("{}/{}", url.path().trim_end_matches('/'), path);
            url.set_path(&joined);
            url.to_string()
        }
        Err(_) => format!("{}/{}", base_url.trim_end_matches('/'), path),
    }
}

impl HttpIdentityProvider {
    pub fn new(base_url: String, timeout: Duration) -> color_eyre::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("Failed to build identity client")?;
        Ok(Self { client, base_url })
    }

    async fn fetch_profile(&self, user_id: Uuid) -> color_eyre::Result<Option<Profile>> {
        let url = build_endpoint_url(&self.base_url, &format!("api/profiles/{user_id}"));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .wrap_err("Identity service request failed")?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let profile: ProfileResponse = response
                    .json()
                    .await
                    .wrap_err("Failed to parse profile response")?;
                Ok(Some(Profile {
                    name: profile.name,
                    avatar: profile.avatar,
                    points: profile.points,
                }))
            }
            status => Err(eyre!("identity service returned {status} for {url}")),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_user(&self, token: &str) -> Result<Option<Uuid>, ServiceError> {
        let url = build_endpoint_url(&self.base_url, "api/session");
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .wrap_err("Identity service request failed")?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let session: SessionResponse = response
                    .json()
                    .await
                    .wrap_err("Failed to parse session response")?;
                Ok(Some(session.user_id))
            }
            status => Err(ServiceError::Store(eyre!(
                "identity service returned {status} for session check"
            ))),
        }
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ServiceError> {
        let profile = retry_with_backoff(PROFILE_RETRY_ATTEMPTS, PROFILE_RETRY_BASE_DELAY, || {
            self.fetch_profile(user_id)
        })
        .await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_simple() {
        assert_eq!(
            build_endpoint_url("https://id.example.com", "api/session"),
            "https://id.example.com/api/session"
        );
    }

    #[test]
    fn endpoint_url_trailing_slash() {
        assert_eq!(
            build_endpoint_url("https://id.example.com/", "api/session"),
            "https://id.example.com/api/session"
        );
    }

    #[test]
    fn endpoint_url_keeps_base_path_and_query() {
        assert_eq!(
            build_endpoint_url("https://id.example.com/v2?key=abc", "api/profiles/x"),
            "https://id.example.com/v2/api/profiles/x?key=abc"
        );
    }
}
