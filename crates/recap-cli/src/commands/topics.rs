use super::Context;
use anyhow::{bail, Result};
use clap::Subcommand;
use recap_core::TopicCache;

#[derive(Subcommand, Debug)]
pub enum TopicsCommands {
    /// Record that a channel used a topic
    Record {
        #[clap(long)]
        channel: Option<String>,

        #[clap(long)]
        topic: String,
    },
    /// How often a channel used a topic inside the retention window
    Count {
        #[clap(long)]
        channel: Option<String>,

        #[clap(long)]
        topic: String,
    },
    /// Topics a channel used recently, newest first
    Recent {
        #[clap(long)]
        channel: Option<String>,

        #[clap(long, default_value = "10")]
        limit: usize,
    },
    /// Pick the next topic, preferring ones the channel has not used
    Pick {
        #[clap(long)]
        channel: Option<String>,

        #[clap(long = "topic", help = "Candidate topic (defaults to the channel's configured topics)")]
        topics: Vec<String>,

        #[clap(long, help = "Record the picked topic as used")]
        record: bool,
    },
}

async fn open_cache(ctx: &Context) -> Result<TopicCache> {
    Ok(TopicCache::open(
        ctx.config.topic_history_path(),
        ctx.config.recap.retention_days,
    )
    .await?)
}

pub async fn handle(ctx: &Context, action: TopicsCommands) -> Result<()> {
    match action {
        TopicsCommands::Record { channel, topic } => {
            let channel = ctx.channel(channel.as_deref())?;
            if topic.trim().is_empty() {
                bail!("Topic cannot be empty");
            }
            let mut cache = open_cache(ctx).await?;
            cache.record_usage(channel.as_str(), &topic).await?;
            println!("Recorded '{}' for {}", topic, channel);
        }
        TopicsCommands::Count { channel, topic } => {
            let channel = ctx.channel(channel.as_deref())?;
            let cache = open_cache(ctx).await?;
            println!("{}", cache.usage_count(channel.as_str(), &topic));
        }
        TopicsCommands::Recent { channel, limit } => {
            let channel = ctx.channel(channel.as_deref())?;
            let cache = open_cache(ctx).await?;
            let recent = cache.recent_topics(channel.as_str(), limit);
            if recent.is_empty() {
                println!(
                    "No topics used by {} in the last {} days.",
                    channel, ctx.config.recap.retention_days
                );
            }
            for topic in recent {
                println!("{}", topic);
            }
        }
        TopicsCommands::Pick {
            channel,
            topics,
            record,
        } => {
            let channel = ctx.channel(channel.as_deref())?;
            let available = if topics.is_empty() {
                ctx.config
                    .channel(&channel)
                    .map(|c| c.topics.clone())
                    .unwrap_or_default()
            } else {
                topics
            };
            if available.is_empty() {
                bail!(
                    "No topics for {}; add channels.{}.topics to the config or pass --topic",
                    channel,
                    channel
                );
            }

            let mut cache = open_cache(ctx).await?;
            let Some(topic) = cache.smart_topic(channel.as_str(), &available) else {
                bail!("No topic available for {}", channel);
            };
            if record {
                cache.record_usage(channel.as_str(), &topic).await?;
            }
            println!("{}", topic);
        }
    }
    Ok(())
}
