//! rowfeed CLI — provision a demo table and bulk-load generated records.

use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use rand::Rng;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rowfeed_core::{column_enum, impl_record};
use rowfeed_postgres::BulkCopyOptions;

#[derive(Parser)]
#[command(name = "rowfeed")]
#[command(about = "Bulk-load generated records into PostgreSQL via COPY")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the demo table (idempotent)
    Provision,

    /// Generate records and bulk-load them
    Load {
        /// Number of records to generate
        #[arg(short = 'n', long, default_value_t = 100_000)]
        rows: usize,

        /// Rows per COPY statement (0 = single batch)
        #[arg(short, long, default_value_t = 0)]
        batch_size: usize,

        /// Operation timeout in seconds (0 = no timeout)
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Truncate the destination table first
        #[arg(long)]
        truncate: bool,
    },
}

// ---------------------------------------------------------------------------
// Demo record type
// ---------------------------------------------------------------------------

struct Person {
    id: i64,
    name: String,
    age: i32,
    create_time: Option<NaiveDateTime>,
    sex: Gender,
}

#[derive(Clone, Copy)]
enum Gender {
    Man = 0,
    Woman = 1,
}

column_enum!(Gender as i32);

impl_record!(Person as "person" {
    id: i64,
    name: String,
    age: i32,
    create_time: Option<NaiveDateTime>,
    sex: Gender,
});

fn generate_people(rows: usize) -> Vec<Person> {
    let mut rng = rand::rng();
    let now = Utc::now().naive_utc();
    (0..rows)
        .map(|i| Person {
            id: i as i64 + 1,
            name: format!("person-{}", i),
            age: rng.random_range(1..128),
            create_time: if rng.random_range(0..2) == 0 {
                None
            } else {
                Some(now + chrono::Duration::seconds(i as i64))
            },
            sex: if rng.random_range(0..2) == 0 {
                Gender::Man
            } else {
                Gender::Woman
            },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let database_url = cli
        .database_url
        .ok_or_else(|| anyhow::anyhow!("set DATABASE_URL or pass --database-url"))?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    info!("Connected to database");

    match cli.command {
        Commands::Provision => provision(&pool).await?,
        Commands::Load {
            rows,
            batch_size,
            timeout_secs,
            truncate,
        } => load(&pool, rows, batch_size, timeout_secs, truncate).await?,
    }

    Ok(())
}

async fn provision(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "person" (
            "id"          BIGINT      NOT NULL PRIMARY KEY,
            "name"        VARCHAR(64) NOT NULL,
            "age"         INT         NOT NULL,
            "create_time" TIMESTAMP   NULL,
            "sex"         INT         NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    info!("Table 'person' ready");
    Ok(())
}

async fn load(
    pool: &PgPool,
    rows: usize,
    batch_size: usize,
    timeout_secs: u64,
    truncate: bool,
) -> Result<()> {
    if truncate {
        sqlx::query("TRUNCATE TABLE \"person\"").execute(pool).await?;
        info!("Truncated 'person'");
    }

    info!("Generating {} records", rows);
    let people = generate_people(rows);

    let options = BulkCopyOptions {
        batch_size,
        timeout: Duration::from_secs(timeout_secs),
        ..Default::default()
    };

    let started = Instant::now();
    let inserted = rowfeed_postgres::bulk_copy(pool, people, &options).await?;
    let elapsed = started.elapsed();

    println!("{}", inserted);
    println!("{:.2}ms", elapsed.as_secs_f64() * 1000.0);
    Ok(())
}
