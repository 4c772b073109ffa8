//! Action journal: a sequence-numbered record of every committed player action.
//!
//! Pull entries carry the sub-seed and the pity state the batch started from,
//! which is enough to re-run the batch (see [`audit`]).

pub mod audit;
pub mod endpoints;
pub mod persistence;

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use crate::catalog::MissionId;
use crate::gacha::pity::PityState;
use crate::gacha::{DrawOutcome, PullPlan};
use crate::ledger::{lock_unpoisoned, UserId};
use persistence::FileWriter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde", tag = "kind")]
pub enum ActionPayload {
    RegisterPlayer {
        player: UserId,
        coins: u64,
    },
    Pull {
        player: UserId,
        plan: PullPlan,
        subseed: u64,
        pity_before: PityState,
        pity_after: PityState,
        coins_after: u64,
        outcomes: Vec<DrawOutcome>,
    },
    Click {
        player: UserId,
        total_clicks: u64,
        coins_earned: u64,
        missions: Vec<MissionId>,
    },
    TimeSpent {
        player: UserId,
        seconds: u64,
        total: u64,
    },
    SetSeed {
        seed: u64,
    },
    CatalogChange {
        change: String,
    },
}

impl ActionPayload {
    /// The player the action belongs to, if any.
    pub fn player(&self) -> Option<UserId> {
        match self {
            ActionPayload::RegisterPlayer { player, .. }
            | ActionPayload::Pull { player, .. }
            | ActionPayload::Click { player, .. }
            | ActionPayload::TimeSpent { player, .. } => Some(*player),
            ActionPayload::SetSeed { .. } | ActionPayload::CatalogChange { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct ActionEntry {
    pub seq: u64,
    pub action_type: String,
    pub payload: ActionPayload,
    /// Milliseconds since the Unix epoch.
    pub timestamp: String,
    pub actor: Option<String>,
}

#[derive(Debug, Default)]
pub struct ActionLog {
    entries: Mutex<Vec<ActionEntry>>,
    seq: AtomicU64,
    writer: Option<FileWriter>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror every future entry to a JSON-lines file.
    pub fn set_writer(&mut self, writer: Option<FileWriter>) {
        self.writer = writer;
    }

    pub fn load_from_file(path: &str) -> Result<ActionLog, String> {
        let file = File::open(path).map_err(|e| e.to_string())?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut max_seq = 0u64;
        for line in reader.lines() {
            let line = line.map_err(|e| e.to_string())?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: ActionEntry = serde_json::from_str(&line).map_err(|e| e.to_string())?;
            max_seq = max_seq.max(entry.seq);
            entries.push(entry);
        }
        entries.sort_by_key(|e| e.seq);
        Ok(ActionLog {
            entries: Mutex::new(entries),
            seq: AtomicU64::new(max_seq),
            writer: None,
        })
    }

    pub fn write_all_to_file(&self, path: &str) -> Result<(), String> {
        let entries = self.entries();
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| e.to_string())?;
        for e in entries {
            let line = serde_json::to_string(&e).map_err(|e| e.to_string())?;
            writeln!(f, "{}", line).map_err(|e| e.to_string())?;
        }
        f.flush().map_err(|e| e.to_string())
    }

    /// Append an action entry, assigning the next sequence number.
    pub fn append(&self, action_type: &str, payload: ActionPayload) -> ActionEntry {
        self.append_with_actor(action_type, payload, None)
    }

    pub fn append_with_actor(
        &self,
        action_type: &str,
        payload: ActionPayload,
        actor: Option<String>,
    ) -> ActionEntry {
        let timestamp = match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            Ok(dur) => format!("{}", dur.as_millis()),
            Err(_) => "0".to_string(),
        };
        // seq is taken under the entries lock so the vector stays in seq order
        let mut entries = lock_unpoisoned(&self.entries);
        let entry = ActionEntry {
            seq: self.seq.fetch_add(1, Ordering::SeqCst) + 1,
            action_type: action_type.to_string(),
            payload,
            timestamp,
            actor,
        };
        entries.push(entry.clone());
        if let Some(writer) = &self.writer {
            writer.send(entry.clone());
        }
        entry
    }

    /// Cloned snapshot of all entries, ordered by seq.
    pub fn entries(&self) -> Vec<ActionEntry> {
        lock_unpoisoned(&self.entries).clone()
    }

    /// Flush and stop the file writer, if any.
    pub fn shutdown(&self) {
        if let Some(writer) = &self.writer {
            writer.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seqs_start_at_one_and_follow_append_order() {
        let log = ActionLog::new();
        for seed in 0..5 {
            log.append("SetSeed", ActionPayload::SetSeed { seed });
        }
        let seqs: Vec<u64> = log.entries().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn file_round_trip_resumes_sequence() {
        let path = std::env::temp_dir().join(format!("gacha-journal-{}.jsonl", std::process::id()));
        let path = path.to_string_lossy().to_string();
        let log = ActionLog::new();
        log.append(
            "CatalogChange",
            ActionPayload::CatalogChange {
                change: "added creature 21".to_string(),
            },
        );
        log.append("SetSeed", ActionPayload::SetSeed { seed: 7 });
        log.write_all_to_file(&path).unwrap();

        let loaded = ActionLog::load_from_file(&path).unwrap();
        assert_eq!(loaded.entries(), log.entries());
        let next = loaded.append("SetSeed", ActionPayload::SetSeed { seed: 8 });
        assert_eq!(next.seq, 3);
        let _ = std::fs::remove_file(&path);
    }
}
