//! Persisted bookkeeping: who used the bot (`users.json`) and what they ran (`logs.json`).
//!
//! Both documents are read whole, mutated and written back whole on every
//! dispatched command. `JsonFileStore` serializes each read-modify-write
//! behind a per-document async lock, so concurrent pipelines inside one
//! process cannot lose updates. Separate processes sharing the same files are
//! not coordinated.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{domain::SenderId, errors::Error, Result};

/// The command log keeps only this many most recent entries.
pub const COMMAND_LOG_CAP: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub name: String,
    pub number: String,
    pub first_seen: String,
    pub last_seen: String,
    pub command_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub timestamp: String,
    #[serde(rename = "user")]
    pub user_id: String,
    pub username: String,
    pub command: String,
    pub args: Vec<String>,
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`.
    pub date: String,
}

impl CommandLogEntry {
    pub fn new(
        sender: &SenderId,
        username: &str,
        command: &str,
        args: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: now.to_rfc3339(),
            user_id: sender.to_string(),
            username: username.to_string(),
            command: command.to_string(),
            args: args.to_vec(),
            date: now
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

pub type UserMap = BTreeMap<String, UserRecord>;

/// Create-if-absent, else bump `command_count` and refresh `last_seen` and `name`.
///
/// `first_seen` is written once and never changed.
pub fn apply_upsert(
    users: &mut UserMap,
    sender: &SenderId,
    name: &str,
    now: DateTime<Utc>,
) -> UserRecord {
    let now = now.to_rfc3339();
    let record = users
        .entry(sender.to_string())
        .and_modify(|r| {
            r.name = name.to_string();
            r.last_seen = now.clone();
            r.command_count += 1;
        })
        .or_insert_with(|| UserRecord {
            name: name.to_string(),
            number: sender.to_string(),
            first_seen: now.clone(),
            last_seen: now.clone(),
            command_count: 1,
        });
    record.clone()
}

/// Append `entry`, dropping the oldest entries beyond `cap`.
pub fn push_capped(log: &mut Vec<CommandLogEntry>, entry: CommandLogEntry, cap: usize) {
    log.push(entry);
    if log.len() > cap {
        let excess = log.len() - cap;
        log.drain(..excess);
    }
}

/// UserStore + CommandLog port.
#[async_trait]
pub trait BotStore: Send + Sync {
    async fn upsert_user(&self, sender: &SenderId, name: &str) -> Result<UserRecord>;

    /// Returns the log length after the append.
    async fn append_log(&self, entry: CommandLogEntry) -> Result<usize>;

    async fn users(&self) -> Result<UserMap>;

    async fn command_log(&self) -> Result<Vec<CommandLogEntry>>;
}

/// JSON documents on disk.
pub struct JsonFileStore {
    users_path: PathBuf,
    logs_path: PathBuf,
    users_lock: Mutex<()>,
    logs_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(users_path: impl Into<PathBuf>, logs_path: impl Into<PathBuf>) -> Self {
        Self {
            users_path: users_path.into(),
            logs_path: logs_path.into(),
            users_lock: Mutex::new(()),
            logs_lock: Mutex::new(()),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("users.json"), dir.join("logs.json"))
    }

    pub fn users_path(&self) -> &Path {
        &self.users_path
    }

    pub fn logs_path(&self) -> &Path {
        &self.logs_path
    }

    /// Create parent directories and seed empty documents that do not exist yet.
    pub async fn ensure_files(&self) -> Result<()> {
        if !path_exists(&self.users_path).await {
            write_json(&self.users_path, &UserMap::new()).await?;
        }
        if !path_exists(&self.logs_path).await {
            write_json(&self.logs_path, &Vec::<CommandLogEntry>::new()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BotStore for JsonFileStore {
    async fn upsert_user(&self, sender: &SenderId, name: &str) -> Result<UserRecord> {
        let _guard = self.users_lock.lock().await;
        let mut users: UserMap = read_json_or_default(&self.users_path).await?;
        let record = apply_upsert(&mut users, sender, name, Utc::now());
        write_json(&self.users_path, &users).await?;
        Ok(record)
    }

    async fn append_log(&self, entry: CommandLogEntry) -> Result<usize> {
        let _guard = self.logs_lock.lock().await;
        let mut log: Vec<CommandLogEntry> = read_json_or_default(&self.logs_path).await?;
        push_capped(&mut log, entry, COMMAND_LOG_CAP);
        write_json(&self.logs_path, &log).await?;
        Ok(log.len())
    }

    async fn users(&self) -> Result<UserMap> {
        read_json_or_default(&self.users_path).await
    }

    async fn command_log(&self) -> Result<Vec<CommandLogEntry>> {
        read_json_or_default(&self.logs_path).await
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Missing, empty and unparsable documents all read as empty.
///
/// An unparsable document is copied to `<doc>.corrupt` first, since the next
/// write replaces it.
async fn read_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let txt = match tokio::fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(Error::Io(e)),
    };
    if txt.trim().is_empty() {
        return Ok(T::default());
    }
    match serde_json::from_str(&txt) {
        Ok(value) => Ok(value),
        Err(e) => {
            let backup = sibling(path, ".corrupt");
            if let Err(copy_err) = tokio::fs::write(&backup, &txt).await {
                tracing::error!(
                    path = %backup.display(),
                    "failed to back up corrupt document: {copy_err}"
                );
            }
            tracing::warn!(
                path = %path.display(),
                backup = %backup.display(),
                "corrupt document read as empty: {e}"
            );
            Ok(T::default())
        }
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Write the whole document to a sibling temp file, then rename it into place.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let txt = serde_json::to_string_pretty(value)?;
    let tmp = sibling(path, ".tmp");
    tokio::fs::write(&tmp, txt).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::Io(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;

    fn tmp_dir(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        PathBuf::from(format!("/tmp/{prefix}-{}-{ts}", std::process::id()))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn entry(n: usize) -> CommandLogEntry {
        CommandLogEntry::new(
            &SenderId::new("u"),
            "U",
            &format!("cmd{n}"),
            &[],
            at(n as i64),
        )
    }

    #[test]
    fn upsert_sets_first_seen_once_and_counts() {
        let mut users = UserMap::new();
        let s = SenderId::new("6281");

        let first = apply_upsert(&mut users, &s, "Irfan", at(0));
        assert_eq!(first.command_count, 1);
        assert_eq!(first.first_seen, first.last_seen);

        for i in 1..5 {
            apply_upsert(&mut users, &s, "Irfan R", at(i));
        }
        let rec = &users["6281"];
        assert_eq!(rec.command_count, 5);
        assert_eq!(rec.first_seen, at(0).to_rfc3339());
        assert_eq!(rec.last_seen, at(4).to_rfc3339());
        assert_eq!(rec.name, "Irfan R");
        assert_eq!(rec.number, "6281");
    }

    #[test]
    fn log_is_capped_and_keeps_arrival_order() {
        let mut log = Vec::new();
        for n in 0..COMMAND_LOG_CAP + 5 {
            push_capped(&mut log, entry(n), COMMAND_LOG_CAP);
            assert!(log.len() <= COMMAND_LOG_CAP);
        }
        assert_eq!(log.len(), COMMAND_LOG_CAP);
        assert_eq!(log[0].command, "cmd5");
        assert_eq!(log[COMMAND_LOG_CAP - 1].command, format!("cmd{}", COMMAND_LOG_CAP + 4));
    }

    #[test]
    fn log_entry_serializes_with_document_keys() {
        let e = CommandLogEntry::new(
            &SenderId::new("42"),
            "Ann",
            "ping",
            &["a".to_string()],
            at(0),
        );
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["user"], "42");
        assert_eq!(v["args"][0], "a");
        assert_eq!(v["date"].as_str().unwrap().len(), "YYYY-MM-DD HH:MM:SS".len());
    }

    #[tokio::test]
    async fn ensure_files_seeds_empty_documents() {
        let dir = tmp_dir("cmdbot-store-seed");
        let store = JsonFileStore::in_dir(&dir);
        store.ensure_files().await.unwrap();

        assert!(store.users().await.unwrap().is_empty());
        assert!(store.command_log().await.unwrap().is_empty());
        let raw = std::fs::read_to_string(store.users_path()).unwrap();
        assert_eq!(raw.trim(), "{}");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn file_store_round_trips_whole_documents() {
        let dir = tmp_dir("cmdbot-store-rt");
        let store = JsonFileStore::in_dir(&dir);
        let s = SenderId::new("7");

        store.upsert_user(&s, "Seven").await.unwrap();
        let rec = store.upsert_user(&s, "Seven").await.unwrap();
        assert_eq!(rec.command_count, 2);

        assert_eq!(store.append_log(entry(1)).await.unwrap(), 1);
        assert_eq!(store.append_log(entry(2)).await.unwrap(), 2);

        let reopened = JsonFileStore::in_dir(&dir);
        assert_eq!(reopened.users().await.unwrap()["7"].command_count, 2);
        let log = reopened.command_log().await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].command, "cmd2");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn concurrent_upserts_do_not_lose_updates() {
        let dir = tmp_dir("cmdbot-store-race");
        let store = Arc::new(JsonFileStore::in_dir(&dir));
        let s = SenderId::new("racer");

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let s = s.clone();
            tasks.push(tokio::spawn(async move {
                store.upsert_user(&s, "R").await.unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(store.users().await.unwrap()["racer"].command_count, 20);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn corrupt_documents_read_as_empty_and_are_backed_up() {
        let dir = tmp_dir("cmdbot-store-corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let store = JsonFileStore::in_dir(&dir);
        std::fs::write(store.users_path(), "{ not json").unwrap();
        std::fs::write(store.logs_path(), "[ broken").unwrap();

        assert!(store.users().await.unwrap().is_empty());
        assert!(store.command_log().await.unwrap().is_empty());

        let rec = store.upsert_user(&SenderId::new("1"), "x").await.unwrap();
        assert_eq!(rec.command_count, 1);
        assert_eq!(store.users().await.unwrap().len(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.join("users.json.corrupt")).unwrap(),
            "{ not json"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("logs.json.corrupt")).unwrap(),
            "[ broken"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let dir = tmp_dir("cmdbot-store-rename");
        // A non-empty directory in place of the document makes the rename fail.
        let target = dir.join("users.json");
        std::fs::create_dir_all(target.join("occupied")).unwrap();

        let res = write_json(&target, &UserMap::new()).await;
        assert!(matches!(res, Err(Error::Io(_))));
        assert!(!dir.join("users.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
