use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use chrono::Duration;
use rand::Rng;

use crate::models::ActionKind;

/// Immutable run configuration, read once at startup. Defaults match the
/// limits the bot has always run with.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub tweet_interval_hours: RangeInclusive<i64>,
    pub reply_interval_minutes: RangeInclusive<i64>,
    pub daily_tweet_limit: u32,
    pub daily_reply_limit: u32,
    pub daily_follow_limit: u32,
    pub daily_dm_limit: u32,
    pub min_likes_threshold: u32,
    pub target_keywords: Vec<String>,
    pub enable_follows: bool,
    pub enable_dms: bool,
    pub state_path: PathBuf,
    pub content_dir: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            tweet_interval_hours: 4..=6,
            reply_interval_minutes: 30..=60,
            daily_tweet_limit: 5,
            daily_reply_limit: 24,
            daily_follow_limit: 20,
            daily_dm_limit: 5,
            min_likes_threshold: 2,
            target_keywords: Vec::new(),
            enable_follows: false,
            enable_dms: false,
            state_path: PathBuf::from("./storage/bot_state.json"),
            content_dir: PathBuf::from("."),
        }
    }
}

impl BotConfig {
    pub fn from_env() -> Self {
        let defaults = BotConfig::default();
        BotConfig {
            tweet_interval_hours: env_range("TWEET_INTERVAL_HOURS", defaults.tweet_interval_hours),
            reply_interval_minutes: env_range(
                "REPLY_INTERVAL_MINUTES",
                defaults.reply_interval_minutes,
            ),
            daily_tweet_limit: env_u32("DAILY_TWEET_LIMIT", defaults.daily_tweet_limit),
            daily_reply_limit: env_u32("DAILY_REPLY_LIMIT", defaults.daily_reply_limit),
            daily_follow_limit: env_u32("DAILY_FOLLOW_LIMIT", defaults.daily_follow_limit),
            daily_dm_limit: env_u32("DAILY_DM_LIMIT", defaults.daily_dm_limit),
            min_likes_threshold: env_u32("MIN_LIKES_THRESHOLD", defaults.min_likes_threshold),
            target_keywords: env::var("TARGET_KEYWORDS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|kw| !kw.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.target_keywords),
            enable_follows: env_flag("ENABLE_FOLLOWS"),
            enable_dms: env_flag("ENABLE_DMS"),
            state_path: env::var("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            content_dir: env::var("CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.content_dir),
        }
    }

    /// Minimum spacing before another action of this kind may fire, drawn
    /// fresh from the configured range on every call. Follows and DMs are
    /// only capped per day.
    pub fn min_interval(&self, kind: ActionKind, rng: &mut impl Rng) -> Option<Duration> {
        match kind {
            ActionKind::Tweet => {
                let (lo, hi) = self.tweet_interval_hours.clone().into_inner();
                Some(Duration::minutes(rng.gen_range(lo * 60..=hi * 60)))
            }
            ActionKind::Reply => {
                let (lo, hi) = self.reply_interval_minutes.clone().into_inner();
                Some(Duration::minutes(rng.gen_range(lo..=hi)))
            }
            ActionKind::Follow | ActionKind::DirectMessage => None,
        }
    }

    pub fn daily_limit(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Tweet => self.daily_tweet_limit,
            ActionKind::Reply => self.daily_reply_limit,
            ActionKind::Follow => self.daily_follow_limit,
            ActionKind::DirectMessage => self.daily_dm_limit,
        }
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|raw| matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_range(key: &str, default: RangeInclusive<i64>) -> RangeInclusive<i64> {
    env::var(key)
        .ok()
        .and_then(|raw| parse_range(&raw))
        .unwrap_or(default)
}

/// Accepts "4-6" or a bare "4".
fn parse_range(raw: &str) -> Option<RangeInclusive<i64>> {
    let raw = raw.trim();
    let (lo, hi) = match raw.split_once('-') {
        Some((lo, hi)) => (lo.trim().parse().ok()?, hi.trim().parse().ok()?),
        None => {
            let fixed = raw.parse().ok()?;
            (fixed, fixed)
        }
    };
    if lo > 0 && lo <= hi {
        Some(lo..=hi)
    } else {
        None
    }
}
