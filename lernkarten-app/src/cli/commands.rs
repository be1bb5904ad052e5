use crate::api::server as api_server;
use crate::cli::opts::*;
use crate::config::AppConfig;

use anyhow::{anyhow, Result};
use chrono::Utc;
use lernkarten_core::{
    daily_streak, due_cards, due_forecast, filter_by_text, has_duplicate, summarize, Card,
    CardDraft, CardRepository, CoreError, StudySession, UserId,
};
use lernkarten_json::JsonStore;
use lernkarten_sqlite::SqliteRepo;
use serde::{Deserialize, Serialize};
use std::io::{stdin, stdout, Read, Write};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub async fn run_cli(cmd: Command, config: AppConfig) -> Result<()> {
    let repo = open_repo(&config).await?;
    match cmd {
        Command::Api(api) => {
            let addr: std::net::SocketAddr = api.addr.parse()?;
            api_server::run(repo, addr).await
        }
        Command::Card(c) => card_cmd(repo, &config.user, c).await,
        Command::Review(c) => review_cmd(repo, &config.user, c).await,
        Command::Import(c) => import_cmd(repo, &config.user, c).await,
        Command::Export(c) => export_cmd(repo, &config.user, c).await,
        Command::Stats(c) => stats_cmd(repo, &config.user, c).await,
    }
}

pub async fn open_repo(config: &AppConfig) -> Result<Arc<dyn CardRepository>> {
    match config.store {
        StoreKind::Json => {
            let s = JsonStore::open_in(&config.data_dir).await?;
            info!(path = %s.path().display(), "using json store");
            Ok(Arc::new(s))
        }
        StoreKind::Sqlite => {
            if let Some(parent) = config.db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let s = SqliteRepo::open_file(&config.db_path).await?;
            info!(path = %config.db_path.display(), "using sqlite store");
            Ok(Arc::new(s))
        }
    }
}

async fn card_cmd(repo: Arc<dyn CardRepository>, user: &UserId, cmd: CardCmd) -> Result<()> {
    let now = Utc::now();
    match cmd {
        CardCmd::Add(a) => {
            let mut session = StudySession::new(repo, user.clone());
            match session.add_card(&a.front, &a.back, now).await {
                Ok(c) => println!("{}", c.id),
                Err(CoreError::DuplicateCard) => println!("skipped: card already exists"),
                Err(e) => return Err(e.into()),
            }
        }
        CardCmd::List { query, due } => {
            let mut cards = repo.fetch_by_user(user).await?;
            if let Some(q) = query {
                cards = filter_by_text(&cards, &q);
            }
            if due {
                cards = due_cards(&cards, now);
            } else {
                cards.sort_by_key(|c| c.next_review_date);
            }
            for c in cards {
                println!(
                    "{}\t{}\t{}\treps={}\tease={:.2}\tnext={}",
                    c.id,
                    c.front,
                    c.back,
                    c.repetitions,
                    c.ease_factor,
                    c.next_review_date.format("%Y-%m-%d %H:%M")
                );
            }
        }
        CardCmd::Edit(e) => {
            let id = parse_uuid(&e.card_id)?;
            let mut session = StudySession::new(repo, user.clone());
            session.edit_card(id, e.front, e.back).await?;
            println!("ok");
        }
    }
    Ok(())
}

async fn review_cmd(repo: Arc<dyn CardRepository>, user: &UserId, cmd: ReviewCmd) -> Result<()> {
    let mut session = StudySession::open(repo, user.clone()).await?;

    let mut count = 0usize;
    while count < cmd.max {
        let now = Utc::now();
        let Some(card) = session.current(now).cloned() else {
            println!("no cards due. [r=replay session, enter=quit]");
            if read_line("> ")?.trim().eq_ignore_ascii_case("r") && session.replay(now).is_some() {
                continue;
            }
            break;
        };

        println!("\n[{}/{}] {}", count + 1, cmd.max, card.id);
        println!("Q: {}", card.front);
        prompt_enter("[enter=show]")?;
        println!("A: {}", card.back);
        println!("[0-5 = quality (0 blackout, 5 perfect), r=replay, q=quit]");

        let quality = loop {
            let line = read_line("quality> ")?;
            let line = line.trim().to_lowercase();
            match line.as_str() {
                "q" | "quit" => return Ok(()),
                "r" | "replay" => break None,
                _ => match line.parse::<i64>() {
                    Ok(q) if (0..=5).contains(&q) => break Some(q),
                    _ => println!("enter 0-5, r, or q"),
                },
            }
        };
        let Some(quality) = quality else {
            session.replay(Utc::now());
            continue;
        };

        count += 1;
        match session.answer_card(card.id, quality, Utc::now()).await {
            Ok(out) => println!("→ next review in {} day(s)", out.interval_days),
            Err(e) if e.is_transient() => {
                println!("could not save review ({e}); the card stays in the queue")
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("\nreviewed {count}");
    Ok(())
}

async fn import_cmd(repo: Arc<dyn CardRepository>, user: &UserId, cmd: ImportCmd) -> Result<()> {
    let now = Utc::now();
    match cmd {
        ImportCmd::Csv { path } => {
            let drafts = read_csv_drafts(std::fs::File::open(&path)?)?;
            let mut session = StudySession::new(repo, user.clone());
            let report = session.add_batch(drafts, now).await?;
            println!(
                "imported {}, skipped {} duplicate(s)",
                report.inserted.len(),
                report.duplicates.len()
            );
        }
        ImportCmd::Json { path } => {
            let data = std::fs::read_to_string(&path)?;
            let bundle: ExportBundle = serde_json::from_str(&data)?;
            // all or nothing: a bad record aborts before anything is written
            for c in &bundle.cards {
                c.validate()
                    .map_err(|e| anyhow!("{}: card {}: {e}", path.display(), c.id))?;
            }
            let mut existing = repo.fetch_by_user(user).await?;
            let (mut imported, mut skipped) = (0usize, 0usize);
            for mut c in bundle.cards {
                // re-home under the current learner, keeping the schedule
                match repo.get_card(c.id).await {
                    Ok(stored) if &stored.user_id != user => c.id = Uuid::new_v4(),
                    Ok(_) | Err(CoreError::CardNotFound(_)) => {}
                    Err(e) => return Err(e.into()),
                }
                c.user_id = user.clone();
                if has_duplicate(&existing, &c) {
                    skipped += 1;
                    continue;
                }
                let stored = repo.upsert_card(&c).await?;
                existing.push(stored);
                imported += 1;
            }
            println!("imported {imported}, skipped {skipped} duplicate(s)");
        }
    }
    Ok(())
}

async fn export_cmd(repo: Arc<dyn CardRepository>, user: &UserId, cmd: ExportCmd) -> Result<()> {
    let mut cards = repo.fetch_by_user(user).await?;
    cards.sort_by_key(|c| c.next_review_date);
    match cmd {
        ExportCmd::Json { path } => {
            let bundle = ExportBundle { version: 1, cards };
            std::fs::write(&path, serde_json::to_string_pretty(&bundle)?)?;
            println!("wrote {}", path.display());
        }
        ExportCmd::Csv { path } => {
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record(["front", "back", "repetitions", "easeFactor", "nextReviewDate"])?;
            for c in cards {
                wtr.write_record([
                    c.front,
                    c.back,
                    c.repetitions.to_string(),
                    format!("{:.2}", c.ease_factor),
                    c.next_review_date.to_rfc3339(),
                ])?;
            }
            wtr.flush()?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

async fn stats_cmd(repo: Arc<dyn CardRepository>, user: &UserId, cmd: StatsCmd) -> Result<()> {
    let now = Utc::now();
    let reviews = repo.list_reviews(user).await?;
    let cards = repo.fetch_by_user(user).await?;
    let s = summarize(&reviews);

    println!("cards:    {}", cards.len());
    println!("reviews:  {}", s.totals.total);
    println!("accuracy: {:.0}%", s.totals.accuracy() * 100.0);
    println!("streak:   {} day(s)", daily_streak(&reviews, now.date_naive()));
    for (i, n) in due_forecast(&cards, now, cmd.days).iter().enumerate() {
        println!("due +{i}d: {n}");
    }
    Ok(())
}

// ===== Helpers =====
fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| anyhow!("invalid card id: {s}"))
}

/// Reads `front,back` rows; extra columns are ignored, blank rows skipped.
fn read_csv_drafts<R: Read>(input: R) -> Result<Vec<CardDraft>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let mut drafts = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let front = rec.get(0).unwrap_or("").trim();
        let back = rec.get(1).unwrap_or("").trim();
        if front.is_empty() && back.is_empty() {
            continue;
        }
        drafts.push(CardDraft::new(front, back));
    }
    Ok(drafts)
}

fn prompt_enter(label: &str) -> Result<()> {
    read_line(label).map(|_| ())
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(s)
}

#[derive(Serialize, Deserialize)]
struct ExportBundle {
    version: u32,
    cards: Vec<Card>,
}
