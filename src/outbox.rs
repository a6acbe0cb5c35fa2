//! Store-and-forward outbound queue.
//!
//! A single append-only file of line-oriented records: `target|sync|payload`.
//! Each record is complete and independently parseable, so power loss
//! mid-append can at worst produce one torn final line, which is skipped on
//! load without touching earlier records. Replay is FIFO across the whole
//! queue (not per vessel); flush stops at the first failed resend and swaps
//! the survivors back via a temp file + atomic rename.

use crate::config::defaults::{OUTBOX_MAX_BYTES, OUTBOX_PRUNE_HEADROOM};
use crate::telemetry::ComposedMessage;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for OutboxError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// ============================================================================
// Queued Record
// ============================================================================

/// One buffered outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub target: String,
    pub sync: bool,
    pub payload: String,
}

impl QueuedMessage {
    fn to_line(&self) -> String {
        format!("{}|{}|{}\n", self.target, u8::from(self.sync), self.payload)
    }

    /// Parse one complete line. Returns `None` for malformed records (torn
    /// writes, manual edits); they are skipped, never fatal.
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, '|');
        let target = parts.next()?.to_string();
        let sync = match parts.next()? {
            "1" => true,
            "0" => false,
            _ => return None,
        };
        let payload = parts.next()?.to_string();
        if target.is_empty() || payload.is_empty() {
            return None;
        }
        // A torn final line can carry a truncated payload that still has all
        // three fields; requiring complete JSON rejects it.
        if serde_json::from_str::<serde_json::Value>(&payload).is_err() {
            return None;
        }
        Some(Self {
            target,
            sync,
            payload,
        })
    }
}

impl From<ComposedMessage> for QueuedMessage {
    fn from(msg: ComposedMessage) -> Self {
        Self {
            target: msg.target.to_string(),
            sync: msg.sync,
            payload: msg.payload,
        }
    }
}

// ============================================================================
// Outbox
// ============================================================================

/// Durable, size-bounded store-and-forward buffer.
pub struct Outbox {
    path: PathBuf,
    max_bytes: u64,
    prune_headroom: u64,
}

impl Outbox {
    /// Open (or create the parent directory for) an outbox file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OutboxError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let outbox = Self {
            path,
            max_bytes: OUTBOX_MAX_BYTES,
            prune_headroom: OUTBOX_PRUNE_HEADROOM,
        };

        let pending = outbox.load()?.len();
        if pending > 0 {
            info!(pending, "Outbox opened with buffered messages");
        } else {
            debug!("Outbox opened (empty)");
        }
        Ok(outbox)
    }

    #[cfg(test)]
    pub fn with_budget<P: AsRef<Path>>(
        path: P,
        max_bytes: u64,
        prune_headroom: u64,
    ) -> Result<Self, OutboxError> {
        let mut outbox = Self::open(path)?;
        outbox.max_bytes = max_bytes;
        outbox.prune_headroom = prune_headroom;
        Ok(outbox)
    }

    /// Append a message to persistent storage, then enforce the byte budget.
    pub fn enqueue(&self, msg: QueuedMessage) -> Result<(), OutboxError> {
        let line = msg.to_line();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        debug!(target = %msg.target, bytes = line.len(), "Message buffered");

        self.prune_if_oversize()?;
        Ok(())
    }

    /// Load all complete records, oldest first. Torn or malformed lines are
    /// skipped with a warning.
    pub fn load(&self) -> Result<Vec<QueuedMessage>, OutboxError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut messages = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match QueuedMessage::parse(&line) {
                Some(msg) => messages.push(msg),
                None => warn!(record = %truncate(&line, 40), "Skipping malformed outbox record"),
            }
        }
        Ok(messages)
    }

    /// Number of buffered records.
    pub fn pending(&self) -> Result<usize, OutboxError> {
        Ok(self.load()?.len())
    }

    /// Replay buffered records in FIFO order through `send`.
    ///
    /// Stops at the first failed resend; that record and everything after
    /// it stay queued, in order. Returns the number of records delivered.
    pub fn flush<F>(&self, mut send: F) -> Result<usize, OutboxError>
    where
        F: FnMut(&QueuedMessage) -> bool,
    {
        let messages = self.load()?;
        if messages.is_empty() {
            return Ok(0);
        }

        let mut delivered = 0;
        for msg in &messages {
            if send(msg) {
                delivered += 1;
            } else {
                break;
            }
        }

        if delivered > 0 {
            self.rewrite(&messages[delivered..])?;
            info!(
                delivered,
                remaining = messages.len() - delivered,
                "Outbox flush"
            );
        } else {
            debug!(pending = messages.len(), "Outbox flush delivered nothing");
        }
        Ok(delivered)
    }

    /// Enforce the byte budget: when the file exceeds `max_bytes`, drop
    /// records from the oldest end until usage falls to
    /// `max_bytes - prune_headroom`. Oldest telemetry is least valuable.
    pub fn prune_if_oversize(&self) -> Result<(), OutboxError> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size <= self.max_bytes {
            return Ok(());
        }

        let target = self.max_bytes.saturating_sub(self.prune_headroom);
        let messages = self.load()?;
        let mut kept: u64 = messages.iter().map(|m| m.to_line().len() as u64).sum();
        let mut drop = 0;
        while drop < messages.len() && kept > target {
            kept -= messages[drop].to_line().len() as u64;
            drop += 1;
        }

        warn!(
            dropped = drop,
            size,
            budget = self.max_bytes,
            "Outbox over budget; pruning oldest records"
        );
        self.rewrite(&messages[drop..])
    }

    /// Atomically replace the queue contents: write survivors to a temp
    /// file, then rename over the live file.
    fn rewrite(&self, messages: &[QueuedMessage]) -> Result<(), OutboxError> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            for msg in messages {
                file.write_all(msg.to_line().as_bytes())?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
