use std::env;

use chrono::Utc;
use dotenv::dotenv;
use log::{info, warn};

use promo_agent::config::BotConfig;
use promo_agent::content::ContentBook;
use promo_agent::core::runtime::Runtime;
use promo_agent::providers::twitter::Twitter;
use promo_agent::scheduler::ActionScheduler;
use promo_agent::store::StateStore;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(e) = dotenv() {
        eprintln!("Error loading .env file: {}", e);
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BotConfig::from_env();

    let twitter = Twitter::new(
        &env::var("TWITTER_ACCESS_TOKEN").expect("TWITTER_ACCESS_TOKEN not set"),
        &env::var("TWITTER_BEARER_TOKEN").expect("TWITTER_BEARER_TOKEN not set"),
    );

    let tweets = ContentBook::load(&config.content_dir.join("tweets.txt"))?;
    let replies = ContentBook::load(&config.content_dir.join("replies.txt"))?;
    let dms = ContentBook::load(&config.content_dir.join("dms.txt"))?;
    if config.target_keywords.is_empty() {
        warn!("TARGET_KEYWORDS is empty, the reply and follow passes will find nothing");
    }

    let store = StateStore::new(&config.state_path);
    let scheduler = ActionScheduler::new(config, store)?;
    let mut runtime = Runtime::new(twitter, scheduler, tweets, replies, dms);

    let report = runtime.run_once(Utc::now()).await?;
    info!("invocation complete: {}", report.summary());

    Ok(())
}
