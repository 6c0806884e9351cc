use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{WrapErr, bail, eyre};
use tokio::time::{Duration, Instant, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

use parcelbox_core::app::{AppBuilder, Registration};
use parcelbox_core::domain::{OperationId, PackageDraft, PackageKind, PhotoId, UnitDraft, UnitId};
use parcelbox_core::impls::{InMemoryDocumentStore, SqliteLocalStore, WatchConnectivity};
use parcelbox_core::ports::{Collection, LocalStore};
use parcelbox_core::sync::RetryPolicy;

/// Front-desk package tracker: inspect the local queue and photo store.
#[derive(Debug, Parser)]
#[command(name = "parcelbox", version)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// SQLite file holding photos and the pending-operation queue.
    #[arg(long, env = "PARCELBOX_DB", default_value = "parcelbox.db", global = true)]
    db: PathBuf,

    /// Failed attempts before an operation is dead-lettered.
    #[arg(
        long,
        env = "PARCELBOX_MAX_ATTEMPTS",
        default_value_t = RetryPolicy::DEFAULT_MAX_ATTEMPTS,
        global = true
    )]
    max_attempts: u32,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pending-operation queue.
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Locally cached photos.
    #[command(subcommand)]
    Photo(PhotoCommand),

    /// Offline capture, reconnect and drain against an in-memory remote.
    Demo,
}

#[derive(Debug, Subcommand)]
enum QueueCommand {
    /// Print pending operations, oldest first.
    List,
    /// Print quarantined operations.
    DeadLetters,
    /// Move a dead letter back to the tail of the queue.
    Requeue { id: i64 },
    /// Print queue counters.
    Health,
}

#[derive(Debug, Subcommand)]
enum PhotoCommand {
    /// Write a photo to a file.
    Get {
        id: PhotoId,
        #[arg(long)]
        out: PathBuf,
    },
    /// Delete a photo (no-op if it does not exist).
    Delete { id: PhotoId },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Queue(cmd) => queue(&cli.store, cmd).await,
        Command::Photo(cmd) => photo(&cli.store, cmd).await,
        Command::Demo => demo(&cli.store).await,
    }
}

fn open_store(args: &StoreArgs) -> color_eyre::Result<SqliteLocalStore> {
    SqliteLocalStore::open(&args.db)
        .wrap_err_with(|| format!("opening local store {}", args.db.display()))
}

async fn queue(args: &StoreArgs, cmd: QueueCommand) -> color_eyre::Result<()> {
    let store = open_store(args)?;
    match cmd {
        QueueCommand::List => {
            for op in store.list_pending_operations().await? {
                println!("{}", serde_json::to_string(&op)?);
            }
        }
        QueueCommand::DeadLetters => {
            for letter in store.list_dead_letters().await? {
                println!("{}", serde_json::to_string(&letter)?);
            }
        }
        QueueCommand::Requeue { id } => {
            let Some(fresh) = store.requeue_dead_letter(OperationId::new(id)).await? else {
                bail!("no dead letter with id {id}");
            };
            println!("requeued as {fresh}");
        }
        QueueCommand::Health => {
            let health = store.queue_health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }
    Ok(())
}

async fn photo(args: &StoreArgs, cmd: PhotoCommand) -> color_eyre::Result<()> {
    let store = open_store(args)?;
    match cmd {
        PhotoCommand::Get { id, out } => {
            let photo = store
                .get_photo(&id)
                .await?
                .ok_or_else(|| eyre!("photo {id} not found"))?;
            tokio::fs::write(&out, &photo.content)
                .await
                .wrap_err_with(|| format!("writing {}", out.display()))?;
            println!("{} bytes written to {}", photo.len(), out.display());
        }
        PhotoCommand::Delete { id } => {
            store.delete_photo(&id).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

async fn demo(args: &StoreArgs) -> color_eyre::Result<()> {
    let local = Arc::new(SqliteLocalStore::open_in_memory()?);
    let remote = Arc::new(InMemoryDocumentStore::new());
    let connectivity = Arc::new(WatchConnectivity::new(false));

    let app = AppBuilder::new()
        .local_store(local.clone())
        .document_store(remote.clone())
        .connectivity(connectivity.clone())
        .retry_policy(RetryPolicy::new(args.max_attempts))
        .build()?;
    let monitor = app.start_monitor();

    app.units
        .add_unit(UnitDraft {
            id: "101".to_string(),
            block: "A".to_string(),
            resident_name: Some("Resident 101".to_string()),
            phone: Some("+5511999990101".to_string()),
        })
        .await?;

    info!("device is offline, registering a package");
    let registration = app
        .desk
        .register_package(
            PackageDraft {
                tracking_code: "BR123456789".to_string(),
                unit_id: UnitId::new("101"),
                unit_block: "A".to_string(),
                kind: PackageKind::Perishable,
            },
            Some(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        )
        .await?;
    let Registration::Deferred { package_id, operation_id } = registration else {
        bail!("registration should have been deferred while offline");
    };
    info!(%package_id, %operation_id, "registration queued");
    println!("queue: {}", serde_json::to_string(&local.queue_health().await?)?);

    info!("back online");
    connectivity.set_online(true);
    let deadline = Instant::now() + Duration::from_secs(5);
    while local.queue_health().await?.pending > 0 {
        if Instant::now() >= deadline {
            bail!("queue was not drained after reconnect");
        }
        sleep(Duration::from_millis(20)).await;
    }
    println!("queue: {}", serde_json::to_string(&local.queue_health().await?)?);

    let message = app.desk.compose_notification(&package_id).await?;
    println!("--- {} ---\n{}", message.title, message.text);
    app.desk.mark_notified(&package_id).await?;

    let pickup = app
        .desk
        .record_pickup(&[package_id.clone()], "Resident 101", "data:image/png;base64,iVBORw0KGgo=")
        .await?;
    println!("pickup: {pickup:?}");
    println!(
        "remote packages: {}",
        remote.documents(Collection::Packages).await.len()
    );

    monitor.shutdown_and_join().await;
    Ok(())
}
