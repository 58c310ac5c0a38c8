// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Seed the database with demo content: one demo user, 50 memories,
//! 15 stories with pages, and a handful of badges.
//!
//! Usage: `cargo run --bin seed` (reads DATABASE_URL, defaults to
//! sqlite://fold.db).

use chrono::{DateTime, TimeZone, Utc};
use fold_backend::db::Db;
use fold_backend::models::user::CREDENTIAL_PROVIDER;
use fold_backend::models::{
    Account, Badge, Location, MediaAttachment, Memory, Story, StoryPage, User,
};
use fold_backend::services::auth::hash_password;
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::Row;

const VIDEOS: &[&str] = &[
    "https://media.fold.example/clips/morning-ride.mp4",
    "https://media.fold.example/clips/lake-swim.mp4",
    "https://media.fold.example/clips/city-walk.mp4",
];

const IMAGES: &[&str] = &[
    "https://media.fold.example/photos/sunrise-01.png",
    "https://media.fold.example/photos/forest-trail.png",
    "https://media.fold.example/photos/coffee-corner.png",
    "https://media.fold.example/photos/rainy-window.png",
    "https://media.fold.example/photos/harbor-dusk.png",
    "https://media.fold.example/photos/rooftop-view.png",
];

const AUDIOS: &[&str] = &[
    "https://media.fold.example/audio/premiere.mp3",
    "https://media.fold.example/audio/iron-caravan.mp3",
    "https://media.fold.example/audio/until-were-gone.mp3",
    "https://media.fold.example/audio/ballerina.mp3",
];

const MOODS: &[i32] = &[-2, -1, 0, 1, 2];

/// Domain tables only the seed populates; no runtime route touches them.
const DOMAIN_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS memory (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE,
    mood INTEGER NOT NULL,
    text_content TEXT NOT NULL,
    visibility TEXT NOT NULL,
    video_url TEXT,
    image_url TEXT,
    audio_url TEXT,
    location_name TEXT,
    latitude REAL,
    longitude REAL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS story (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    visibility TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS story_page (
    id TEXT PRIMARY KEY,
    story_id TEXT NOT NULL REFERENCES story(id) ON DELETE CASCADE,
    page_number INTEGER NOT NULL,
    page_text TEXT NOT NULL,
    video_url TEXT,
    image_url TEXT,
    audio_url TEXT
);

CREATE TABLE IF NOT EXISTS badge (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    icon_url TEXT NOT NULL
);
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://fold.db".to_string());

    tracing::info!(url = %database_url, "Starting seed");

    let db = Db::connect(&database_url).await?;
    sqlx::raw_sql(DOMAIN_SCHEMA).execute(db.pool()).await?;

    let user_id = ensure_demo_user(&db).await?;
    seed_memories(&db, &user_id).await?;
    seed_stories(&db, &user_id).await?;
    seed_badges(&db, &user_id).await?;
    verify_media_exclusivity(&db).await?;

    tracing::info!("Seed completed");
    Ok(())
}

/// Find or create the demo user with a credential account.
async fn ensure_demo_user(db: &Db) -> anyhow::Result<String> {
    let email = "demo@example.com";

    if let Some(user) = db.get_user_by_email(email).await? {
        tracing::info!(user_id = %user.id, "Demo user already exists");
        return Ok(user.id);
    }

    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: "Demo User".to_string(),
        email: email.to_string(),
        email_verified: false,
        image: None,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        updated_at: now,
    };
    db.create_user(&user).await?;

    db.insert_account(&Account {
        id: uuid::Uuid::new_v4().to_string(),
        account_id: user.id.clone(),
        provider_id: CREDENTIAL_PROVIDER.to_string(),
        user_id: user.id.clone(),
        access_token: None,
        refresh_token: None,
        id_token: None,
        access_token_expires_at: None,
        refresh_token_expires_at: None,
        scope: None,
        password: Some(hash_password("Password123!")?),
        created_at: now,
        updated_at: now,
    })
    .await?;

    tracing::info!(user_id = %user.id, "Demo user created (demo@example.com / Password123!)");
    Ok(user.id)
}

/// Pick at most one media attachment, 70% of the time.
fn random_media(rng: &mut impl Rng) -> Option<MediaAttachment> {
    if !rng.gen_bool(0.7) {
        return None;
    }

    Some(match rng.gen_range(0..3) {
        0 => MediaAttachment::Video(VIDEOS.choose(rng).unwrap().to_string()),
        1 => MediaAttachment::Image(IMAGES.choose(rng).unwrap().to_string()),
        _ => MediaAttachment::Audio(AUDIOS.choose(rng).unwrap().to_string()),
    })
}

fn random_date(rng: &mut impl Rng) -> DateTime<Utc> {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap().timestamp();
    let end = Utc::now().timestamp();
    Utc.timestamp_opt(rng.gen_range(start..end), 0).unwrap()
}

async fn insert_memory(db: &Db, memory: Memory) -> anyhow::Result<()> {
    let (video_url, image_url, audio_url) = memory
        .media
        .map(MediaAttachment::into_columns)
        .unwrap_or((None, None, None));

    let (location_name, latitude, longitude) = match memory.location {
        Some(location) => (
            Some(location.name),
            Some(location.latitude),
            Some(location.longitude),
        ),
        None => (None, None, None),
    };

    sqlx::query(
        "INSERT INTO memory
             (id, user_id, mood, text_content, visibility, video_url, image_url, audio_url,
              location_name, latitude, longitude, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(memory.id)
    .bind(memory.user_id)
    .bind(memory.mood)
    .bind(memory.text_content)
    .bind(memory.visibility)
    .bind(video_url)
    .bind(image_url)
    .bind(audio_url)
    .bind(location_name)
    .bind(latitude)
    .bind(longitude)
    .bind(memory.created_at)
    .execute(db.pool())
    .await?;

    Ok(())
}

async fn seed_memories(db: &Db, user_id: &str) -> anyhow::Result<()> {
    tracing::info!("Creating 50 memories");
    let mut rng = rand::thread_rng();

    for i in 0..50 {
        let media = random_media(&mut rng);
        let mood = *MOODS.choose(&mut rng).unwrap();
        let has_media = media.is_some();

        let location = rng.gen_bool(0.2).then(|| Location {
            name: "San Francisco, CA".to_string(),
            latitude: 37.7749,
            longitude: -122.4194,
        });

        let memory = Memory {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            mood,
            text_content: format!(
                "Memory #{}: Feeling {} today. {}",
                i + 1,
                mood,
                if has_media { "Attached some media." } else { "Just thoughts." }
            ),
            visibility: "private".to_string(),
            media,
            location,
            created_at: random_date(&mut rng),
        };

        insert_memory(db, memory).await?;
    }

    tracing::info!("Memories created");
    Ok(())
}

async fn insert_story_page(db: &Db, page: StoryPage) -> anyhow::Result<()> {
    let (video_url, image_url, audio_url) = page
        .media
        .map(MediaAttachment::into_columns)
        .unwrap_or((None, None, None));

    sqlx::query(
        "INSERT INTO story_page
             (id, story_id, page_number, page_text, video_url, image_url, audio_url)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(page.id)
    .bind(page.story_id)
    .bind(page.page_number)
    .bind(page.page_text)
    .bind(video_url)
    .bind(image_url)
    .bind(audio_url)
    .execute(db.pool())
    .await?;

    Ok(())
}

async fn seed_stories(db: &Db, user_id: &str) -> anyhow::Result<()> {
    tracing::info!("Creating 15 stories");
    let mut rng = rand::thread_rng();

    for i in 0..15 {
        let story = Story {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: format!("My Adventures - Chapter {}", i + 1),
            visibility: "private".to_string(),
            created_at: random_date(&mut rng),
        };

        sqlx::query(
            "INSERT INTO story (id, user_id, title, visibility, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&story.id)
        .bind(&story.user_id)
        .bind(&story.title)
        .bind(&story.visibility)
        .bind(story.created_at)
        .execute(db.pool())
        .await?;

        let num_pages = rng.gen_range(1..=5);
        for page_number in 1..=num_pages {
            // Pages carry media less often than memories.
            let media = if rng.gen_bool(0.5) {
                random_media(&mut rng)
            } else {
                None
            };

            let page = StoryPage {
                id: uuid::Uuid::new_v4().to_string(),
                story_id: story.id.clone(),
                page_number,
                page_text: format!("Page {}: Exploring the world.", page_number),
                media,
            };

            insert_story_page(db, page).await?;
        }
    }

    tracing::info!("Stories created");
    Ok(())
}

async fn seed_badges(db: &Db, user_id: &str) -> anyhow::Result<()> {
    tracing::info!("Creating badges");
    let mut rng = rand::thread_rng();

    let names = [
        ("First Post", "first-post"),
        ("Memory Maker", "memory-maker"),
        ("Storyteller", "story-teller"),
        ("Vlogger", "vlogger"),
        ("Photographer", "photographer"),
    ];

    for (name, slug) in names {
        let badge = Badge {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            // Suffix keeps slugs unique across repeated seed runs.
            slug: format!(
                "{}-{}-{}",
                slug,
                Utc::now().timestamp_millis(),
                rng.gen_range(0..1000)
            ),
            description: format!("Awarded for being a great {}", name),
            icon_url: IMAGES.choose(&mut rng).unwrap().to_string(),
        };

        sqlx::query(
            "INSERT INTO badge (id, user_id, name, slug, description, icon_url)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(badge.id)
        .bind(badge.user_id)
        .bind(badge.name)
        .bind(badge.slug)
        .bind(badge.description)
        .bind(badge.icon_url)
        .execute(db.pool())
        .await?;
    }

    tracing::info!("Badges created");
    Ok(())
}

/// Decode every seeded memory row back through the attachment enum,
/// confirming no row carries more than one media URL.
async fn verify_media_exclusivity(db: &Db) -> anyhow::Result<()> {
    let rows = sqlx::query("SELECT id, video_url, image_url, audio_url FROM memory")
        .fetch_all(db.pool())
        .await?;

    let mut with_media = 0usize;
    for row in &rows {
        let id: String = row.get("id");
        let media = MediaAttachment::from_columns(
            row.get("video_url"),
            row.get("image_url"),
            row.get("audio_url"),
        )
        .map_err(|e| anyhow::anyhow!("memory {}: {}", id, e))?;

        if media.is_some() {
            with_media += 1;
        }
    }

    tracing::info!(
        total = rows.len(),
        with_media,
        "Media exclusivity verified"
    );
    Ok(())
}
