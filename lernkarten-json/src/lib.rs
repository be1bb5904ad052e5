use chrono::{DateTime, Utc};
use lernkarten_core::repo::{check_owner, has_duplicate, CardRepository};
use lernkarten_core::{Card, CardId, CoreError, Review, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, warn};

pub mod paths;

const FILE_VERSION: u32 = 1;
pub const DEFAULT_MAX_BACKUPS: usize = 10;

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cards: Vec<Card>,
    reviews: Vec<Review>,
}

#[derive(Clone)]
struct State {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cards: HashMap<CardId, Card>,
    reviews: Vec<Review>,
}

impl State {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            cards: HashMap::new(),
            reviews: Vec::new(),
        }
    }

    fn to_image(&self) -> FileImage {
        let mut cards: Vec<Card> = self.cards.values().cloned().collect();
        cards.sort_by_key(|c| (c.last_review_date, c.id));
        FileImage {
            version: FILE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            cards,
            reviews: self.reviews.clone(),
        }
    }

    fn from_image(img: FileImage) -> Self {
        let cards = img.cards.into_iter().map(|c| (c.id, c)).collect();
        Self {
            created_at: img.created_at,
            updated_at: img.updated_at,
            cards,
            reviews: img.reviews,
        }
    }
}

/// Card store kept in a single JSON file.
///
/// Every write goes to a temp file that is then renamed over the store, and
/// a timestamped copy lands in the backup directory. The in-memory state only
/// changes after the file write succeeded.
pub struct JsonStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub async fn open_in(root: &Path) -> Result<Self, CoreError> {
        let (file, backups) = paths::store_files(root);
        Self::open_with(file, backups, DEFAULT_MAX_BACKUPS).await
    }

    pub async fn open_with(
        path: PathBuf,
        backups_dir: PathBuf,
        max_backups: usize,
    ) -> Result<Self, CoreError> {
        ensure_parent_dirs(&path)?;
        ensure_dir(&backups_dir)?;
        let state = load_or_init(&path, &backups_dir).await?;
        debug!(path = %path.display(), cards = state.cards.len(), "opened json store");
        Ok(Self {
            path,
            backups_dir,
            max_backups: max_backups.max(1),
            state: RwLock::new(state),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `f` to a copy of the state, writes it out, then publishes it.
    async fn mutate<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut State) -> Result<T, CoreError> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut next = self.state.read().clone();
        let out = f(&mut next)?;
        next.updated_at = Utc::now();

        let img = next.to_image();
        let path = self.path.clone();
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;
        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, &img))
            .await
            .map_err(|_| CoreError::Unavailable("json store task"))?
            .map_err(|e| {
                warn!(path = %self.path.display(), error = %e, "json store write failed");
                CoreError::Unavailable("json store io")
            })?;

        *self.state.write() = next;
        Ok(out)
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(path).map_err(|_| CoreError::Unavailable("json store io"))
}

async fn load_or_init(path: &Path, backups_dir: &Path) -> Result<State, CoreError> {
    if path.exists() {
        let p = path.to_path_buf();
        let img: FileImage = task::spawn_blocking(move || {
            let mut f = fs::File::open(&p)?;
            let mut buf = String::new();
            f.read_to_string(&mut buf)?;
            let v = serde_json::from_str::<FileImage>(&buf)?;
            Ok::<FileImage, std::io::Error>(v)
        })
        .await
        .map_err(|_| CoreError::Unavailable("json store task"))
        .and_then(|r| {
            r.map_err(|e| {
                warn!(error = %e, "reading json store failed");
                CoreError::Unavailable("json store read")
            })
        })?;
        Ok(State::from_image(img))
    } else {
        let st = State::new_empty();
        write_with_backup(path, backups_dir, 1, &st.to_image())
            .map_err(|_| CoreError::Unavailable("json store io"))?;
        Ok(st)
    }
}

/// Replaces the store file, then drops a timestamped copy into the backup
/// directory. Only a failure to replace the store file is an error: once the
/// rename happened the new state is on disk, whatever the backup step does.
fn write_with_backup(
    path: &Path,
    backups_dir: &Path,
    max_backups: usize,
    img: &FileImage,
) -> Result<(), std::io::Error> {
    let json = serde_json::to_vec_pretty(img)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path)?;

    if let Err(e) = write_backup(backups_dir, max_backups, &json) {
        warn!(dir = %backups_dir.display(), error = %e, "json store backup failed");
    }
    Ok(())
}

fn write_backup(backups_dir: &Path, max_backups: usize, json: &[u8]) -> Result<(), std::io::Error> {
    fs::create_dir_all(backups_dir)?;
    let ts = Utc::now().format("%Y%m%d-%H%M%S%.3f");
    let backup_path = backups_dir.join(format!("lernkarten-{ts}.json"));
    let mut btmp = NamedTempFile::new_in(backups_dir)?;
    btmp.write_all(json)?;
    btmp.flush()?;
    btmp.persist(&backup_path)?;

    rotate_backups(backups_dir, max_backups)
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), std::io::Error> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    // names embed the timestamp, so lexical order is age order
    entries.sort();
    if entries.len() > keep {
        for p in &entries[..entries.len() - keep] {
            let _ = fs::remove_file(p);
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl CardRepository for JsonStore {
    async fn fetch_by_user(&self, user_id: &UserId) -> Result<Vec<Card>, CoreError> {
        let s = self.state.read();
        Ok(s.cards
            .values()
            .filter(|c| &c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        let s = self.state.read();
        s.cards.get(&id).cloned().ok_or(CoreError::CardNotFound(id))
    }

    async fn insert_card(&self, card: &Card) -> Result<Card, CoreError> {
        self.mutate(|s| {
            if s.cards.contains_key(&card.id) || has_duplicate(s.cards.values(), card) {
                return Err(CoreError::DuplicateCard);
            }
            s.cards.insert(card.id, card.clone());
            Ok(card.clone())
        })
        .await
    }

    async fn update_card(&self, card: &Card) -> Result<Card, CoreError> {
        self.mutate(|s| {
            let Some(stored) = s.cards.get(&card.id) else {
                return Err(CoreError::CardNotFound(card.id));
            };
            check_owner(stored, card)?;
            s.cards.insert(card.id, card.clone());
            Ok(card.clone())
        })
        .await
    }

    async fn upsert_card(&self, card: &Card) -> Result<Card, CoreError> {
        card.validate()?;
        self.mutate(|s| {
            if let Some(stored) = s.cards.get(&card.id) {
                check_owner(stored, card)?;
            }
            s.cards.insert(card.id, card.clone());
            Ok(card.clone())
        })
        .await
    }

    async fn insert_review(&self, review: &Review) -> Result<(), CoreError> {
        self.mutate(|s| {
            s.reviews.push(review.clone());
            Ok(())
        })
        .await
    }

    async fn list_reviews(&self, user_id: &UserId) -> Result<Vec<Review>, CoreError> {
        let s = self.state.read();
        Ok(s.reviews
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }
}
