use std::fmt;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::seq::SliceRandom;

use crate::content::ContentBook;
use crate::error::SocialError;
use crate::models::{ActionKind, Post};
use crate::providers::{FollowOutcome, SocialClient};
use crate::scheduler::{ActionScheduler, Decision, RejectReason};

const SEARCH_PAGE_SIZE: u32 = 10;
const RECENT_CONTENT_WINDOW: usize = 5;

#[derive(Debug)]
pub enum ActionOutcome {
    Executed {
        kind: ActionKind,
        target: Option<String>,
    },
    RemoteFailed {
        kind: ActionKind,
        error: SocialError,
    },
    Rejected {
        kind: ActionKind,
        reason: RejectReason,
    },
    Skipped {
        kind: ActionKind,
        why: &'static str,
    },
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Executed {
                kind,
                target: Some(target),
            } => write!(f, "{}: executed against {target}", kind.label()),
            ActionOutcome::Executed { kind, target: None } => {
                write!(f, "{}: executed", kind.label())
            }
            ActionOutcome::RemoteFailed { kind, error } => {
                write!(f, "{}: remote call failed: {error}", kind.label())
            }
            ActionOutcome::Rejected { kind, reason } => {
                write!(f, "{}: rejected ({reason})", kind.label())
            }
            ActionOutcome::Skipped { kind, why } => {
                write!(f, "{}: skipped ({why})", kind.label())
            }
        }
    }
}

/// What one invocation did, per action kind attempted.
#[derive(Debug, Default)]
pub struct InvocationReport {
    pub outcomes: Vec<ActionOutcome>,
}

impl InvocationReport {
    fn push(&mut self, outcome: ActionOutcome) {
        match &outcome {
            ActionOutcome::RemoteFailed { .. } => warn!("{outcome}"),
            _ => info!("{outcome}"),
        }
        self.outcomes.push(outcome);
    }

    pub fn executed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ActionOutcome::Executed { .. }))
            .count()
    }

    pub fn summary(&self) -> String {
        let mut executed = 0;
        let mut failed = 0;
        let mut rejected = 0;
        let mut skipped = 0;
        for outcome in &self.outcomes {
            match outcome {
                ActionOutcome::Executed { .. } => executed += 1,
                ActionOutcome::RemoteFailed { .. } => failed += 1,
                ActionOutcome::Rejected { .. } => rejected += 1,
                ActionOutcome::Skipped { .. } => skipped += 1,
            }
        }
        format!("{executed} executed, {failed} failed remotely, {rejected} rejected, {skipped} skipped")
    }
}

/// One invocation pass over every action kind: tweet, reply, follow, DM.
/// Each pass asks the scheduler first, acts through the client only on an
/// `Allowed`, and records the action before moving on. Rate limits end the
/// affected pass and are retried on a later invocation; auth and storage
/// failures abort the run.
pub struct Runtime<C> {
    client: C,
    scheduler: ActionScheduler,
    tweets: ContentBook,
    replies: ContentBook,
    dms: ContentBook,
}

impl<C: SocialClient> Runtime<C> {
    pub fn new(
        client: C,
        scheduler: ActionScheduler,
        tweets: ContentBook,
        replies: ContentBook,
        dms: ContentBook,
    ) -> Self {
        Runtime {
            client,
            scheduler,
            tweets,
            replies,
            dms,
        }
    }

    pub fn scheduler(&self) -> &ActionScheduler {
        &self.scheduler
    }

    pub async fn run_once(&mut self, now: DateTime<Utc>) -> Result<InvocationReport, anyhow::Error> {
        let mut report = InvocationReport::default();

        self.tweet_pass(now, &mut report).await?;

        // Search only runs when a pass downstream can use the results.
        let reply_gate = self.scheduler.can_execute(ActionKind::Reply, None, now);
        let follows_enabled = self.scheduler.config().enable_follows;
        let posts = if matches!(reply_gate, Decision::Allowed) || follows_enabled {
            self.search_posts(&mut report).await?
        } else {
            Vec::new()
        };

        match reply_gate {
            Decision::Allowed => self.reply_pass(&posts, now, &mut report).await?,
            Decision::Rejected(reason) => report.push(ActionOutcome::Rejected {
                kind: ActionKind::Reply,
                reason,
            }),
        }

        if follows_enabled {
            self.follow_pass(&posts, now, &mut report).await?;
        }
        if self.scheduler.config().enable_dms {
            self.dm_pass(now, &mut report).await?;
        }

        Ok(report)
    }

    async fn tweet_pass(
        &mut self,
        now: DateTime<Utc>,
        report: &mut InvocationReport,
    ) -> Result<(), anyhow::Error> {
        if let Decision::Rejected(reason) = self.scheduler.can_execute(ActionKind::Tweet, None, now)
        {
            report.push(ActionOutcome::Rejected {
                kind: ActionKind::Tweet,
                reason,
            });
            return Ok(());
        }

        let Some(content) = self.pick_content(ActionKind::Tweet) else {
            report.push(ActionOutcome::Skipped {
                kind: ActionKind::Tweet,
                why: "no tweet templates available",
            });
            return Ok(());
        };

        match self.client.post(&content).await {
            Ok(id) => {
                self.scheduler
                    .record_action(ActionKind::Tweet, None, &content, now)?;
                info!("posted tweet {id}: {content}");
                report.push(ActionOutcome::Executed {
                    kind: ActionKind::Tweet,
                    target: None,
                });
            }
            Err(SocialError::Auth(msg)) => {
                return Err(anyhow!("post authorization rejected: {msg}"))
            }
            Err(error) => report.push(ActionOutcome::RemoteFailed {
                kind: ActionKind::Tweet,
                error,
            }),
        }
        Ok(())
    }

    async fn search_posts(
        &mut self,
        report: &mut InvocationReport,
    ) -> Result<Vec<Post>, anyhow::Error> {
        let Some(keyword) = self
            .scheduler
            .config()
            .target_keywords
            .choose(&mut rand::thread_rng())
            .cloned()
        else {
            return Ok(Vec::new());
        };

        info!("searching recent posts for {keyword:?}");
        match self.client.search(&keyword, SEARCH_PAGE_SIZE).await {
            Ok(posts) => {
                info!("search returned {} posts", posts.len());
                Ok(posts)
            }
            Err(SocialError::Auth(msg)) => Err(anyhow!("search authorization rejected: {msg}")),
            Err(error) => {
                report.push(ActionOutcome::RemoteFailed {
                    kind: ActionKind::Reply,
                    error,
                });
                Ok(Vec::new())
            }
        }
    }

    async fn reply_pass(
        &mut self,
        posts: &[Post],
        now: DateTime<Utc>,
        report: &mut InvocationReport,
    ) -> Result<(), anyhow::Error> {
        let candidates = self.scheduler.select_candidates(posts);
        let Some(post) = candidates.into_iter().next() else {
            report.push(ActionOutcome::Skipped {
                kind: ActionKind::Reply,
                why: "no candidates above the engagement bar",
            });
            return Ok(());
        };

        if let Decision::Rejected(reason) =
            self.scheduler
                .can_execute(ActionKind::Reply, Some(&post.id), now)
        {
            report.push(ActionOutcome::Rejected {
                kind: ActionKind::Reply,
                reason,
            });
            return Ok(());
        }

        let Some(content) = self.pick_content(ActionKind::Reply) else {
            report.push(ActionOutcome::Skipped {
                kind: ActionKind::Reply,
                why: "no reply templates available",
            });
            return Ok(());
        };

        match self.client.reply(&post.id, &content).await {
            Ok(id) => {
                self.scheduler
                    .record_action(ActionKind::Reply, Some(&post.id), &content, now)?;
                info!("replied to {} by {} with {id}", post.id, post.author_id);
                report.push(ActionOutcome::Executed {
                    kind: ActionKind::Reply,
                    target: Some(post.id.clone()),
                });
            }
            Err(SocialError::Auth(msg)) => {
                return Err(anyhow!("reply authorization rejected: {msg}"))
            }
            Err(error) => report.push(ActionOutcome::RemoteFailed {
                kind: ActionKind::Reply,
                error,
            }),
        }
        Ok(())
    }

    async fn follow_pass(
        &mut self,
        posts: &[Post],
        now: DateTime<Utc>,
        report: &mut InvocationReport,
    ) -> Result<(), anyhow::Error> {
        let mut rejection = None;
        let mut target = None;
        for post in posts {
            match self
                .scheduler
                .can_execute(ActionKind::Follow, Some(&post.author_id), now)
            {
                Decision::Allowed => {
                    target = Some(post.author_id.clone());
                    break;
                }
                Decision::Rejected(reason) => rejection = Some(reason),
            }
        }
        let Some(user_id) = target else {
            match rejection {
                Some(reason) => report.push(ActionOutcome::Rejected {
                    kind: ActionKind::Follow,
                    reason,
                }),
                None => report.push(ActionOutcome::Skipped {
                    kind: ActionKind::Follow,
                    why: "no follow candidates",
                }),
            }
            return Ok(());
        };

        match self.client.follow(&user_id).await {
            Ok(outcome) => {
                // Recorded either way so the user stops coming up as a
                // candidate.
                self.scheduler
                    .record_action(ActionKind::Follow, Some(&user_id), "", now)?;
                if outcome == FollowOutcome::AlreadyFollowing {
                    info!("already following {user_id}");
                } else {
                    info!("followed {user_id}");
                }
                report.push(ActionOutcome::Executed {
                    kind: ActionKind::Follow,
                    target: Some(user_id),
                });
            }
            Err(SocialError::Auth(msg)) => {
                return Err(anyhow!("follow authorization rejected: {msg}"))
            }
            Err(error) => report.push(ActionOutcome::RemoteFailed {
                kind: ActionKind::Follow,
                error,
            }),
        }
        Ok(())
    }

    async fn dm_pass(
        &mut self,
        now: DateTime<Utc>,
        report: &mut InvocationReport,
    ) -> Result<(), anyhow::Error> {
        let pending = self.scheduler.pending_dm_targets();
        let Some(user_id) = pending.choose(&mut rand::thread_rng()).cloned() else {
            report.push(ActionOutcome::Skipped {
                kind: ActionKind::DirectMessage,
                why: "no followed users awaiting a message",
            });
            return Ok(());
        };

        if let Decision::Rejected(reason) =
            self.scheduler
                .can_execute(ActionKind::DirectMessage, Some(&user_id), now)
        {
            report.push(ActionOutcome::Rejected {
                kind: ActionKind::DirectMessage,
                reason,
            });
            return Ok(());
        }

        let Some(content) = self.pick_content(ActionKind::DirectMessage) else {
            report.push(ActionOutcome::Skipped {
                kind: ActionKind::DirectMessage,
                why: "no dm templates available",
            });
            return Ok(());
        };

        match self.client.send_direct_message(&user_id, &content).await {
            Ok(()) => {
                self.scheduler.record_action(
                    ActionKind::DirectMessage,
                    Some(&user_id),
                    &content,
                    now,
                )?;
                info!("sent dm to {user_id}");
                report.push(ActionOutcome::Executed {
                    kind: ActionKind::DirectMessage,
                    target: Some(user_id),
                });
            }
            Err(SocialError::Auth(msg)) => {
                return Err(anyhow!("dm authorization rejected: {msg}"))
            }
            Err(error) => report.push(ActionOutcome::RemoteFailed {
                kind: ActionKind::DirectMessage,
                error,
            }),
        }
        Ok(())
    }

    fn pick_content(&self, kind: ActionKind) -> Option<String> {
        let book = match kind {
            ActionKind::Tweet => &self.tweets,
            ActionKind::Reply => &self.replies,
            ActionKind::DirectMessage => &self.dms,
            ActionKind::Follow => return None,
        };
        let used = self.scheduler.used_content(kind);
        let recent = self.scheduler.recent_content(kind, RECENT_CONTENT_WINDOW);
        book.pick(&used, &recent, &mut rand::thread_rng())
            .map(String::from)
    }
}
