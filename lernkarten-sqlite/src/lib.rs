use chrono::{DateTime, SecondsFormat, Utc};
use lernkarten_core::{repo::CardRepository, Card, CardId, CoreError, Quality, Review, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| storage("sqlite connect", e))?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        debug!(path = %path.as_ref().display(), "opened sqlite store");
        Ok(repo)
    }

    pub async fn open_memory() -> Result<Self, CoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| storage("sqlite options", e))?
            .foreign_keys(true);
        // one connection: every sqlite memory connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| storage("sqlite connect", e))?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS cards (
          id                TEXT PRIMARY KEY,
          user_id           TEXT NOT NULL,
          front             TEXT NOT NULL,
          back              TEXT NOT NULL,
          ease_factor       REAL    NOT NULL DEFAULT 2.5,
          repetitions       INTEGER NOT NULL DEFAULT 0,
          next_review_date  TEXT    NOT NULL,
          last_review_date  TEXT    NOT NULL,
          UNIQUE (user_id, front, back)
        );

        CREATE TABLE IF NOT EXISTS reviews (
          id                 TEXT PRIMARY KEY,
          card_id            TEXT NOT NULL,
          user_id            TEXT NOT NULL,
          quality            INTEGER NOT NULL,
          reviewed_at        TEXT NOT NULL,
          interval_days      INTEGER NOT NULL,
          ease_factor_after  REAL NOT NULL,
          FOREIGN KEY(card_id) REFERENCES cards(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_cards_user_due ON cards (user_id, next_review_date);
        CREATE INDEX IF NOT EXISTS idx_reviews_user_time ON reviews (user_id, reviewed_at);
        "#;

        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| storage("sqlite schema", e))?;
        }
        Ok(())
    }

    async fn owner_of(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        id: CardId,
    ) -> Result<Option<UserId>, CoreError> {
        let row = sqlx::query("SELECT user_id FROM cards WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| storage("read card", e))?;
        Ok(row.map(|r| UserId::new(r.get::<String, _>("user_id"))))
    }
}

const CARD_COLUMNS: &str =
    "id,user_id,front,back,ease_factor,repetitions,next_review_date,last_review_date";

#[async_trait::async_trait]
impl CardRepository for SqliteRepo {
    async fn fetch_by_user(&self, user_id: &UserId) -> Result<Vec<Card>, CoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE user_id=? ORDER BY next_review_date ASC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("list cards", e))?;
        rows.into_iter().map(row_into_card).collect()
    }

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        let row = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage("read card", e))?;
        let row = row.ok_or(CoreError::CardNotFound(id))?;
        row_into_card(row)
    }

    async fn insert_card(&self, card: &Card) -> Result<Card, CoreError> {
        sqlx::query(&format!(
            "INSERT INTO cards ({CARD_COLUMNS}) VALUES (?,?,?,?,?,?,?,?)"
        ))
        .bind(card.id.to_string())
        .bind(card.user_id.as_str())
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.ease_factor)
        .bind(card.repetitions as i64)
        .bind(dt_to_str(card.next_review_date))
        .bind(dt_to_str(card.last_review_date))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("insert card", e))?;
        Ok(card.clone())
    }

    async fn update_card(&self, card: &Card) -> Result<Card, CoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| storage("tx", e))?;
        match Self::owner_of(&mut tx, card.id).await? {
            None => return Err(CoreError::CardNotFound(card.id)),
            Some(owner) if owner != card.user_id => {
                return Err(CoreError::PermissionDenied("card belongs to another user"))
            }
            Some(_) => {}
        }

        sqlx::query(
            r#"
            UPDATE cards SET
              front=?, back=?, ease_factor=?, repetitions=?,
              next_review_date=?, last_review_date=?
            WHERE id=?
            "#,
        )
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.ease_factor)
        .bind(card.repetitions as i64)
        .bind(dt_to_str(card.next_review_date))
        .bind(dt_to_str(card.last_review_date))
        .bind(card.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("update card", e))?;

        tx.commit().await.map_err(|e| storage("tx commit", e))?;
        Ok(card.clone())
    }

    async fn upsert_card(&self, card: &Card) -> Result<Card, CoreError> {
        card.validate()?;
        let mut tx = self.pool.begin().await.map_err(|e| storage("tx", e))?;
        if let Some(owner) = Self::owner_of(&mut tx, card.id).await? {
            if owner != card.user_id {
                return Err(CoreError::PermissionDenied("card belongs to another user"));
            }
        }

        sqlx::query(&format!(
            r#"
            INSERT INTO cards ({CARD_COLUMNS}) VALUES (?,?,?,?,?,?,?,?)
            ON CONFLICT(id) DO UPDATE SET
              front=excluded.front, back=excluded.back,
              ease_factor=excluded.ease_factor, repetitions=excluded.repetitions,
              next_review_date=excluded.next_review_date,
              last_review_date=excluded.last_review_date
            "#
        ))
        .bind(card.id.to_string())
        .bind(card.user_id.as_str())
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.ease_factor)
        .bind(card.repetitions as i64)
        .bind(dt_to_str(card.next_review_date))
        .bind(dt_to_str(card.last_review_date))
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("upsert card", e))?;

        tx.commit().await.map_err(|e| storage("tx commit", e))?;
        Ok(card.clone())
    }

    async fn insert_review(&self, review: &Review) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO reviews
                 (id,card_id,user_id,quality,reviewed_at,interval_days,ease_factor_after)
               VALUES (?,?,?,?,?,?,?)"#,
        )
        .bind(review.id.to_string())
        .bind(review.card_id.to_string())
        .bind(review.user_id.as_str())
        .bind(review.quality.value() as i64)
        .bind(dt_to_str(review.reviewed_at))
        .bind(review.interval_days as i64)
        .bind(review.ease_factor_after)
        .execute(&self.pool)
        .await
        .map_err(|e| storage("insert review", e))?;
        Ok(())
    }

    async fn list_reviews(&self, user_id: &UserId) -> Result<Vec<Review>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT id,card_id,user_id,quality,reviewed_at,interval_days,ease_factor_after
               FROM reviews WHERE user_id=? ORDER BY reviewed_at ASC"#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("list reviews", e))?;
        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            v.push(Review {
                id: uuid_from_str(row.get::<String, _>("id"))?,
                card_id: uuid_from_str(row.get::<String, _>("card_id"))?,
                user_id: UserId::new(row.get::<String, _>("user_id")),
                quality: Quality::new(row.get::<i64, _>("quality"))
                    .map_err(|_| CoreError::Unavailable("corrupt quality"))?,
                reviewed_at: dt_from_str(row.get::<String, _>("reviewed_at"))?,
                interval_days: u32::try_from(row.get::<i64, _>("interval_days"))
                    .map_err(|_| CoreError::Unavailable("corrupt interval"))?,
                ease_factor_after: row.get::<f64, _>("ease_factor_after"),
            });
        }
        Ok(v)
    }
}

// ===== Helpers =====
fn storage(what: &'static str, e: sqlx::Error) -> CoreError {
    warn!(error = %e, "{what} failed");
    CoreError::Unavailable(what)
}

/// Unique violations on the card table mean a duplicate id or content.
fn write_error(what: &'static str, e: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return CoreError::DuplicateCard;
        }
    }
    storage(what, e)
}

fn uuid_from_str(s: String) -> Result<uuid::Uuid, CoreError> {
    uuid::Uuid::parse_str(&s).map_err(|_| CoreError::Unavailable("corrupt uuid"))
}

/// Fixed-width RFC 3339 so text order matches time order.
fn dt_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn dt_from_str(s: String) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(&s)
        .map_err(|_| CoreError::Unavailable("corrupt datetime"))
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_into_card(row: sqlx::sqlite::SqliteRow) -> Result<Card, CoreError> {
    Ok(Card {
        id: uuid_from_str(row.get::<String, _>("id"))?,
        user_id: UserId::new(row.get::<String, _>("user_id")),
        front: row.get::<String, _>("front"),
        back: row.get::<String, _>("back"),
        ease_factor: row.get::<f64, _>("ease_factor"),
        repetitions: u32::try_from(row.get::<i64, _>("repetitions"))
            .map_err(|_| CoreError::Unavailable("corrupt repetitions"))?,
        next_review_date: dt_from_str(row.get::<String, _>("next_review_date"))?,
        last_review_date: dt_from_str(row.get::<String, _>("last_review_date"))?,
    })
}
