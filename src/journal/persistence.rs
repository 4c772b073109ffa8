use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use super::ActionEntry;
use crate::ledger::lock_unpoisoned;

/// Appends journal entries to a JSON-lines file from a background thread.
#[derive(Clone, Debug)]
pub struct FileWriter {
    sender: Arc<Mutex<Option<Sender<ActionEntry>>>>,
    handle: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
}

impl FileWriter {
    pub fn new(path: PathBuf) -> std::io::Result<Self> {
        // open up front so a bad path fails the caller, not the thread
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (tx, rx) = mpsc::channel::<ActionEntry>();
        let handle = thread::spawn(move || {
            let mut writer = BufWriter::new(file);
            for entry in rx {
                let mut bytes = match serde_json::to_vec(&entry) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::error!("journal entry {} not serializable: {}", entry.seq, e);
                        continue;
                    }
                };
                bytes.push(b'\n');
                if let Err(e) = writer.write_all(&bytes).and_then(|_| writer.flush()) {
                    log::error!("journal write to {:?} failed: {}", path, e);
                }
            }
            let _ = writer.flush();
            log::debug!("journal writer for {:?} stopped", path);
        });

        Ok(FileWriter {
            sender: Arc::new(Mutex::new(Some(tx))),
            handle: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Queue an entry. Entries sent after `close` are dropped.
    pub fn send(&self, entry: ActionEntry) {
        if let Some(tx) = &*lock_unpoisoned(&self.sender) {
            if tx.send(entry).is_err() {
                log::warn!("journal writer is gone; entry not persisted");
            }
        }
    }

    /// Drop the sender and wait for pending entries to reach the file.
    pub fn close(&self) {
        lock_unpoisoned(&self.sender).take();
        let handle = lock_unpoisoned(&self.handle).take();
        if let Some(h) = handle {
            if h.join().is_err() {
                log::error!("journal writer thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{ActionLog, ActionPayload};

    #[test]
    fn closed_writer_has_flushed_every_entry() {
        let path = std::env::temp_dir().join(format!("gacha-writer-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let mut log = ActionLog::new();
        log.set_writer(Some(FileWriter::new(path.clone()).unwrap()));
        for seed in 1..=3 {
            log.append("SetSeed", ActionPayload::SetSeed { seed });
        }
        log.shutdown();

        let reloaded = ActionLog::load_from_file(&path.to_string_lossy()).unwrap();
        assert_eq!(reloaded.entries(), log.entries());
        let _ = std::fs::remove_file(&path);
    }
}
