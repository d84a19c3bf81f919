//! Append-only journal of mapping changes.
//!
//! A single async mutex covers the in-memory index, the append handle and
//! compaction, so a rewrite can never race an append. Records are JSON
//! lines, which leaves content ids free to contain any character.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::MappingRegistry;
use crate::{ContentId, FsError, MessageId, Result};

/// Dead records tolerated before a compaction is considered.
pub const DEFAULT_COMPACT_THRESHOLD: usize = 1024;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum JournalRecord {
    Save { content_id: ContentId, message_id: MessageId },
    Remove { content_id: ContentId },
}

struct JournalState {
    entries: HashMap<ContentId, MessageId>,
    file: File,
    /// Records in the file that no longer describe a live entry.
    dead: usize,
}

pub struct JournalRegistry {
    path: PathBuf,
    compact_threshold: usize,
    state: Mutex<JournalState>,
}

fn persistence(context: &str, err: impl std::fmt::Display) -> FsError {
    FsError::Persistence(format!("{}: {}", context, err))
}

impl JournalRegistry {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let (entries, dead, unterminated) = match fs::read_to_string(&path).await {
            Ok(content) => {
                let (entries, dead) = replay(&content)?;
                (entries, dead, !content.is_empty() && !content.ends_with('\n'))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (HashMap::new(), 0, false),
            Err(e) => return Err(persistence("failed to read mapping journal", e)),
        };
        info!(path = %path.display(), live = entries.len(), dead, "mapping journal opened");

        let file = open_append(&path).await?;
        let registry = Self {
            path,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            state: Mutex::new(JournalState { entries, file, dead }),
        };
        // Appending after an unterminated line would corrupt it.
        if unterminated {
            registry.compact().await?;
        }
        Ok(registry)
    }

    pub fn with_compact_threshold(mut self, threshold: usize) -> Self {
        self.compact_threshold = threshold;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrites the journal so it holds exactly one record per live entry.
    pub async fn compact(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.compact_locked(&mut state).await
    }

    async fn compact_locked(&self, state: &mut JournalState) -> Result<()> {
        let mut content = String::new();
        for (content_id, message_id) in &state.entries {
            content.push_str(&encode(&JournalRecord::Save {
                content_id: content_id.clone(),
                message_id: *message_id,
            })?);
        }

        let tmp_path = self.path.with_extension("compact");
        let mut tmp = File::create(&tmp_path)
            .await
            .map_err(|e| persistence("failed to create compacted journal", e))?;
        tmp.write_all(content.as_bytes())
            .await
            .map_err(|e| persistence("failed to write compacted journal", e))?;
        tmp.sync_all()
            .await
            .map_err(|e| persistence("failed to sync compacted journal", e))?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| persistence("failed to replace mapping journal", e))?;

        state.file = open_append(&self.path).await?;
        info!(live = state.entries.len(), dropped = state.dead, "mapping journal compacted");
        state.dead = 0;
        Ok(())
    }

    async fn append(&self, state: &mut JournalState, record: &JournalRecord) -> Result<()> {
        let line = encode(record)?;
        let written = write_line(&mut state.file, &line).await;
        if written.is_err() {
            // A partial line would poison the next replay; rebuild the file
            // from the index, which does not include this record yet.
            if let Err(e) = self.compact_locked(state).await {
                warn!(error = %e, "mapping journal repair failed");
            }
        }
        written
    }

    async fn maybe_compact(&self, state: &mut JournalState) {
        if state.dead <= self.compact_threshold || state.dead <= state.entries.len() {
            return;
        }
        // The journal is still consistent if compaction fails; retry next time.
        if let Err(e) = self.compact_locked(state).await {
            warn!(error = %e, "mapping journal compaction failed");
        }
    }
}

async fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| persistence("failed to open mapping journal", e))
}

async fn write_line(file: &mut File, line: &str) -> Result<()> {
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| persistence("failed to append to mapping journal", e))?;
    file.flush()
        .await
        .map_err(|e| persistence("failed to flush mapping journal", e))?;
    file.sync_data()
        .await
        .map_err(|e| persistence("failed to sync mapping journal", e))
}

fn encode(record: &JournalRecord) -> Result<String> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}

fn replay(content: &str) -> Result<(HashMap<ContentId, MessageId>, usize)> {
    let mut entries = HashMap::new();
    let mut dead = 0;
    let lines: Vec<&str> = content.lines().filter(|line| !line.trim().is_empty()).collect();

    for (index, line) in lines.iter().enumerate() {
        let record = match serde_json::from_str::<JournalRecord>(line) {
            Ok(record) => record,
            Err(e) if index + 1 == lines.len() && !content.ends_with('\n') => {
                warn!(error = %e, "ignoring torn record at end of mapping journal");
                dead += 1;
                break;
            }
            Err(e) => return Err(persistence(&format!("corrupt mapping journal line {}", index + 1), e)),
        };
        match record {
            JournalRecord::Save { content_id, message_id } => {
                if entries.insert(content_id, message_id).is_some() {
                    dead += 1;
                }
            }
            JournalRecord::Remove { content_id } => {
                dead += 1;
                if entries.remove(&content_id).is_some() {
                    dead += 1;
                }
            }
        }
    }
    Ok((entries, dead))
}

#[async_trait]
impl MappingRegistry for JournalRegistry {
    async fn save(&self, content_id: &ContentId, message_id: MessageId) -> Result<()> {
        let mut state = self.state.lock().await;
        let record = JournalRecord::Save {
            content_id: content_id.clone(),
            message_id,
        };
        self.append(&mut state, &record).await?;
        if state.entries.insert(content_id.clone(), message_id).is_some() {
            state.dead += 1;
        }
        debug!(%content_id, %message_id, "mapping saved");
        Ok(())
    }

    async fn remove(&self, content_id: &ContentId) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.entries.contains_key(content_id) {
            return Ok(());
        }
        let record = JournalRecord::Remove {
            content_id: content_id.clone(),
        };
        self.append(&mut state, &record).await?;
        state.entries.remove(content_id);
        // The save it cancels and the removal record itself.
        state.dead += 2;
        debug!(%content_id, "mapping removed");
        self.maybe_compact(&mut state).await;
        Ok(())
    }

    async fn find(&self, content_id: &ContentId) -> Result<MessageId> {
        self.state
            .lock()
            .await
            .entries
            .get(content_id)
            .copied()
            .ok_or_else(|| FsError::NotFound(format!("mapping for {}", content_id)))
    }
}
