use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use forum_details::config::{AppConfig, StoreBackend};
use forum_details::details::ThreadDetailsAssembler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is a dev convenience only; deployments set the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let thread_id = std::env::args().nth(1).context("usage: forum-details <thread-id>")?;
    let cfg = AppConfig::from_env()?;
    let assembler = build_assembler(&cfg)?;

    match assembler.assemble(&thread_id).await {
        Ok(details) => {
            println!("{}", serde_json::to_string_pretty(&details)?);
            Ok(())
        }
        Err(e) => {
            if e.is_client_error() {
                warn!(thread_id = %thread_id, status = e.status_code(), "{e}");
            } else {
                error!(thread_id = %thread_id, status = e.status_code(), "{e}");
            }
            eprintln!("{}", serde_json::to_string(&e.body())?);
            std::process::exit(e.exit_code());
        }
    }
}

fn build_assembler(cfg: &AppConfig) -> anyhow::Result<ThreadDetailsAssembler> {
    match cfg.store {
        StoreBackend::InMem => inmem_assembler(cfg),
        StoreBackend::Postgres => postgres_assembler(cfg),
    }
}

#[cfg(feature = "inmem-store")]
fn inmem_assembler(cfg: &AppConfig) -> anyhow::Result<ThreadDetailsAssembler> {
    use forum_details::repo::inmem::InMemRepo;

    let repo = match &cfg.seed_file {
        Some(seed) => InMemRepo::from_seed_file(seed)?,
        None => InMemRepo::with_snapshot(cfg.snapshot_path()),
    };
    info!("Using in-memory repository backend");
    Ok(ThreadDetailsAssembler::from_repo(Arc::new(repo)))
}

#[cfg(not(feature = "inmem-store"))]
fn inmem_assembler(_cfg: &AppConfig) -> anyhow::Result<ThreadDetailsAssembler> {
    anyhow::bail!("FORUM_STORE=inmem requires the inmem-store feature")
}

#[cfg(feature = "postgres-store")]
fn postgres_assembler(cfg: &AppConfig) -> anyhow::Result<ThreadDetailsAssembler> {
    use forum_details::repo::pg::PgRepo;
    use sqlx::postgres::PgPoolOptions;

    let url = cfg.database_url.as_deref().context("DATABASE_URL must be set for postgres store")?;
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .connect_lazy(url)
        .context("creating Postgres pool")?;
    info!(max_connections = cfg.db_max_connections, "Using Postgres repository backend");
    Ok(ThreadDetailsAssembler::from_repo(Arc::new(PgRepo::new(pool))))
}

#[cfg(not(feature = "postgres-store"))]
fn postgres_assembler(_cfg: &AppConfig) -> anyhow::Result<ThreadDetailsAssembler> {
    anyhow::bail!("FORUM_STORE=postgres requires the postgres-store feature")
}
