//! Persistent topic usage history
//!
//! Tracks which topics each channel has turned into videos so the next run
//! can prefer something fresh. History older than the retention window is
//! dropped on open, which keeps the file small enough to commit alongside the
//! pipeline's configuration.

use super::entry::UsageEntry;
use crate::errors::{RecapError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const LOGGED_TOPIC_CHARS: usize = 50;

#[derive(Serialize)]
struct HistoryFileOut<'a> {
    last_updated: String,
    history: &'a [UsageEntry],
}

pub struct TopicCache {
    path: PathBuf,
    retention: Duration,
    history: Vec<UsageEntry>,
}

impl TopicCache {
    /// Open the history at `path`, dropping entries older than
    /// `retention_days`.
    pub async fn open(path: impl AsRef<Path>, retention_days: u32) -> Result<Self> {
        Self::open_at(path, retention_days, Utc::now()).await
    }

    pub async fn open_at(
        path: impl AsRef<Path>,
        retention_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if retention_days == 0 {
            return Err(RecapError::TopicCacheError(
                "retention must be at least one day".to_string(),
            ));
        }

        let path = path.as_ref().to_path_buf();
        let history = Self::load(&path).await;
        let mut cache = Self {
            path,
            retention: Duration::days(i64::from(retention_days)),
            history,
        };
        cache.cleanup_expired(now).await?;
        Ok(cache)
    }

    /// A missing or unreadable file yields an empty history; malformed
    /// entries are skipped.
    async fn load(path: &Path) -> Vec<UsageEntry> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No topic history at {}, starting empty", path.display());
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Failed to read topic history {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        let document: serde_json::Value = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                log::warn!("Failed to parse topic history {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        let raw_entries = match document.get("history").and_then(|h| h.as_array()) {
            Some(entries) => entries.clone(),
            None => Vec::new(),
        };

        let mut history = Vec::with_capacity(raw_entries.len());
        for raw in raw_entries {
            match serde_json::from_value::<UsageEntry>(raw) {
                Ok(entry) => history.push(entry),
                Err(e) => log::warn!("Skipping malformed topic history entry: {}", e),
            }
        }

        log::info!("Loaded {} topic history entries", history.len());
        history
    }

    /// Write the history, replacing the file atomically.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    RecapError::TopicCacheError(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let document = HistoryFileOut {
            last_updated: Utc::now().to_rfc3339(),
            history: &self.history,
        };
        let serialized = serde_json::to_string_pretty(&document).map_err(|e| {
            RecapError::TopicCacheError(format!("Failed to serialize topic history: {}", e))
        })?;

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        tokio::fs::write(&temp_path, serialized).await.map_err(|e| {
            RecapError::TopicCacheError(format!(
                "Failed to write {}: {}",
                temp_path.display(),
                e
            ))
        })?;
        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            RecapError::TopicCacheError(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        log::debug!("Saved {} topic history entries", self.history.len());
        Ok(())
    }

    /// Drop entries at or before `now - retention`; returns how many went.
    pub async fn cleanup_expired(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - self.retention;
        let before = self.history.len();
        self.history.retain(|entry| entry.timestamp > cutoff);

        let removed = before - self.history.len();
        if removed > 0 {
            log::info!("Cleaned up {} expired topic history entries", removed);
            self.save().await?;
        }
        Ok(removed)
    }

    pub async fn record_usage(&mut self, channel: &str, topic: &str) -> Result<()> {
        self.record_usage_at(channel, topic, Utc::now()).await
    }

    pub async fn record_usage_at(
        &mut self,
        channel: &str,
        topic: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.history.push(UsageEntry::new(channel, topic, timestamp));
        if let Err(e) = self.save().await {
            // Keep the in-memory history in step with the file
            self.history.pop();
            return Err(e);
        }

        let shown: String = topic.chars().take(LOGGED_TOPIC_CHARS).collect();
        let ellipsis = if topic.chars().count() > LOGGED_TOPIC_CHARS { "..." } else { "" };
        log::info!("Recorded topic usage: {} -> {}{}", channel, shown, ellipsis);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[UsageEntry] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Times `topic` was used by `channel` inside the retention window
    pub fn usage_count(&self, channel: &str, topic: &str) -> usize {
        self.history
            .iter()
            .filter(|e| e.channel == channel && e.topic == topic)
            .count()
    }

    /// Distinct topics `channel` used, most recent first
    pub fn recent_topics(&self, channel: &str, limit: usize) -> Vec<String> {
        let mut entries: Vec<&UsageEntry> =
            self.history.iter().filter(|e| e.channel == channel).collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for entry in entries {
            if result.len() >= limit {
                break;
            }
            if seen.insert(entry.topic.as_str()) {
                result.push(entry.topic.clone());
            }
        }
        result
    }

    pub fn unused_topic<S: AsRef<str>>(&self, channel: &str, available: &[S]) -> Option<String> {
        self.unused_topic_with_rng(channel, available, &mut rand::rng())
    }

    /// A random topic from `available` that `channel` has not used yet
    pub fn unused_topic_with_rng<S, R>(
        &self,
        channel: &str,
        available: &[S],
        rng: &mut R,
    ) -> Option<String>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let used: HashSet<&str> = self
            .history
            .iter()
            .filter(|e| e.channel == channel)
            .map(|e| e.topic.as_str())
            .collect();

        let unused: Vec<&str> = available
            .iter()
            .map(|t| t.as_ref())
            .filter(|t| !used.contains(t))
            .collect();

        unused.choose(rng).map(|t| t.to_string())
    }

    pub fn least_used_topic<S: AsRef<str>>(&self, channel: &str, available: &[S]) -> Option<String> {
        self.least_used_topic_with_rng(channel, available, &mut rand::rng())
    }

    /// A random topic among those `channel` used the fewest times
    pub fn least_used_topic_with_rng<S, R>(
        &self,
        channel: &str,
        available: &[S],
        rng: &mut R,
    ) -> Option<String>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entry in self.history.iter().filter(|e| e.channel == channel) {
            *counts.entry(entry.topic.as_str()).or_default() += 1;
        }

        let mut seen = HashSet::new();
        let candidates: Vec<(&str, usize)> = available
            .iter()
            .map(|t| t.as_ref())
            .filter(|t| seen.insert(*t))
            .map(|t| (t, counts.get(t).copied().unwrap_or(0)))
            .collect();

        let min_count = candidates.iter().map(|(_, count)| *count).min()?;
        let least_used: Vec<&str> = candidates
            .iter()
            .filter(|(_, count)| *count == min_count)
            .map(|(topic, _)| *topic)
            .collect();

        least_used.choose(rng).map(|t| t.to_string())
    }

    pub fn smart_topic<S: AsRef<str>>(&self, channel: &str, available: &[S]) -> Option<String> {
        self.smart_topic_with_rng(channel, available, &mut rand::rng())
    }

    /// Prefer a topic the channel never used, else one of the least used.
    /// `None` only when `available` is empty.
    pub fn smart_topic_with_rng<S, R>(
        &self,
        channel: &str,
        available: &[S],
        rng: &mut R,
    ) -> Option<String>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        if let Some(topic) = self.unused_topic_with_rng(channel, available, rng) {
            log::info!("Selected unused topic for {}", channel);
            return Some(topic);
        }

        if available.is_empty() {
            return None;
        }

        log::info!("All topics used for {}, selecting least used", channel);
        self.least_used_topic_with_rng(channel, available, rng)
    }
}
