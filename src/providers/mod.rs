pub mod twitter;

use async_trait::async_trait;

use crate::error::SocialError;
use crate::models::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
}

/// The remote side of the bot. Everything the runtime does to the outside
/// world goes through this seam, so tests can stand in for the platform.
#[async_trait]
pub trait SocialClient {
    /// Publish a standalone post, returning its id.
    async fn post(&self, content: &str) -> Result<String, SocialError>;

    /// Publish a reply to an existing post, returning the reply's id.
    async fn reply(&self, post_id: &str, content: &str) -> Result<String, SocialError>;

    /// Recent original posts matching a keyword, excluding reposts and
    /// replies.
    async fn search(&self, keyword: &str, max_results: u32) -> Result<Vec<Post>, SocialError>;

    async fn follow(&self, user_id: &str) -> Result<FollowOutcome, SocialError>;

    async fn send_direct_message(&self, user_id: &str, content: &str) -> Result<(), SocialError>;
}
