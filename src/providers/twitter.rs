use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use super::{FollowOutcome, SocialClient};
use crate::error::SocialError;
use crate::models::Post;

const API_BASE: &str = "https://api.twitter.com/2";

/// Twitter API v2 client. Write operations use the OAuth2 user-context
/// access token; search uses the app-only bearer token.
pub struct Twitter {
    client: reqwest::Client,
    access_token: String,
    bearer_token: String,
    cached_user_id: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Debug, Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchTweet>,
}

#[derive(Debug, Deserialize)]
struct SearchTweet {
    id: String,
    text: String,
    author_id: String,
    created_at: DateTime<Utc>,
    public_metrics: PublicMetrics,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    like_count: u32,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: UserData,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
}

impl Twitter {
    pub fn new(access_token: &str, bearer_token: &str) -> Self {
        Twitter {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
            bearer_token: bearer_token.to_string(),
            cached_user_id: Mutex::new(None),
        }
    }

    /// The authenticated account's own id, fetched once and cached.
    async fn user_id(&self) -> Result<String, SocialError> {
        let mut cached = self.cached_user_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let response = self
            .client
            .get(format!("{API_BASE}/users/me"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body: UserResponse = Self::parse(response).await?;
        *cached = Some(body.data.id.clone());
        Ok(body.data.id)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SocialError> {
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SocialError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| raw.parse::<i64>().ok())
                .map(|reset_epoch| (reset_epoch - Utc::now().timestamp()).max(0));
            return Err(SocialError::RateLimited { retry_after_secs });
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(SocialError::Auth(body));
        }
        Err(SocialError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SocialClient for Twitter {
    async fn post(&self, content: &str) -> Result<String, SocialError> {
        let response = self
            .client
            .post(format!("{API_BASE}/tweets"))
            .bearer_auth(&self.access_token)
            .json(&json!({ "text": content }))
            .send()
            .await?;
        let body: TweetResponse = Self::parse(response).await?;
        Ok(body.data.id)
    }

    async fn reply(&self, post_id: &str, content: &str) -> Result<String, SocialError> {
        let response = self
            .client
            .post(format!("{API_BASE}/tweets"))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "text": content,
                "reply": { "in_reply_to_tweet_id": post_id },
            }))
            .send()
            .await?;
        let body: TweetResponse = Self::parse(response).await?;
        Ok(body.data.id)
    }

    async fn search(&self, keyword: &str, max_results: u32) -> Result<Vec<Post>, SocialError> {
        let query = format!("{keyword} -is:retweet -is:reply");
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(format!("{API_BASE}/tweets/search/recent"))
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query.as_str()),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at,author_id,public_metrics"),
            ])
            .send()
            .await?;
        let body: SearchResponse = Self::parse(response).await?;

        Ok(body
            .data
            .into_iter()
            .map(|tweet| Post {
                id: tweet.id,
                author_id: tweet.author_id,
                text: tweet.text,
                like_count: tweet.public_metrics.like_count,
                created_at: tweet.created_at,
            })
            .collect())
    }

    async fn follow(&self, user_id: &str) -> Result<FollowOutcome, SocialError> {
        let me = self.user_id().await?;
        let response = self
            .client
            .post(format!("{API_BASE}/users/{me}/following"))
            .bearer_auth(&self.access_token)
            .json(&json!({ "target_user_id": user_id }))
            .send()
            .await?;
        match Self::check(response).await {
            Ok(_) => Ok(FollowOutcome::Followed),
            // The platform reports an existing follow as a client error.
            Err(SocialError::Auth(body)) if body.to_lowercase().contains("already") => {
                Ok(FollowOutcome::AlreadyFollowing)
            }
            Err(e) => Err(e),
        }
    }

    async fn send_direct_message(&self, user_id: &str, content: &str) -> Result<(), SocialError> {
        let response = self
            .client
            .post(format!("{API_BASE}/dm_conversations/with/{user_id}/messages"))
            .bearer_auth(&self.access_token)
            .json(&json!({ "text": content }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
