use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::{Duration as Span, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use campus_core::{
    CampusConfig, ConversationView, NotificationCenter, NotificationFilter, ReadSync,
    reconcile_page,
};
use campus_db::{Database, LocalBackend};
use campus_events::EventDispatcher;
use campus_types::events::Topic;
use campus_types::models::{
    ConversationId, Decision, NotificationId, NotificationKind, NotificationRecord, RequestKind,
    UserId,
};

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Campus notifications, requests and conversations")]
#[command(
    after_help = "Environment:\n  CAMPUS_DB_PATH             SQLite file (default campus.db)\n  CAMPUS_UTC_OFFSET_MINUTES  Reference zone for day labels (default -240)\n  CAMPUS_LOCALE              es or en\n  RUST_LOG                   Log filter (default campus=info)"
)]
struct Cli {
    /// Act as this user.
    #[arg(long = "as", global = true, default_value = "luis")]
    viewer: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert demo requests, notifications and a conversation.
    Seed,
    Notifications {
        #[arg(long, default_value_t = false)]
        unread: bool,
    },
    /// Accept or reject the request behind a notification.
    Respond {
        notification: String,
        decision: Decision,
    },
    ReadAll,
    /// Open a conversation and print it grouped by day.
    Conversation {
        id: String,
    },
    Send {
        conversation: String,
        body: String,
    },
    Edit {
        conversation: String,
        message: String,
        body: String,
    },
    Delete {
        conversation: String,
        message: String,
    },
    /// Poll the feed and print refresh signals until Ctrl-C.
    Watch {
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
    /// Reconcile a raw notification page saved as JSON.
    Reconcile {
        file: PathBuf,
    },
}

struct App {
    config: CampusConfig,
    db: Arc<Database>,
    backend: Arc<LocalBackend>,
    dispatcher: EventDispatcher,
}

impl App {
    fn center(&self) -> NotificationCenter {
        NotificationCenter::new(
            self.backend.clone(),
            self.backend.clone(),
            self.dispatcher.clone(),
        )
        .with_page_size(self.config.page_size)
    }

    fn view(&self) -> ConversationView {
        ConversationView::new(
            self.backend.viewer().clone(),
            self.backend.clone(),
            Arc::new(ReadSync::new(self.backend.clone())),
            self.dispatcher.clone(),
            self.config.zone,
            self.config.locale,
        )
    }

    async fn open(&self, conversation: &str) -> anyhow::Result<ConversationView> {
        let mut view = self.view();
        view.open(&ConversationId::from(conversation)).await?;
        Ok(view)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = CampusConfig::from_env()?;

    let db = Arc::new(Database::open(&config.database_path)?);
    let backend = Arc::new(LocalBackend::new(db.clone(), UserId::from(cli.viewer.as_str())));
    let dispatcher = EventDispatcher::new(config.event_capacity);
    let app = App {
        config,
        db,
        backend,
        dispatcher,
    };

    let result = run(&app, cli.command).await;
    app.dispatcher.shutdown();
    result
}

async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    let viewer = app.backend.viewer().as_str();

    match command {
        Commands::Seed => seed(&app.db, viewer)?,

        Commands::Notifications { unread } => {
            let center = app.center();
            center.load().await?;
            let filter = if unread {
                NotificationFilter::Unread
            } else {
                NotificationFilter::All
            };
            for n in center.filtered(filter) {
                print_notification(&n);
            }
            println!("{} unread", center.unread_count());
        }

        Commands::Respond {
            notification,
            decision,
        } => {
            let center = app.center();
            center.load().await?;
            let id = NotificationId::from(notification);
            let record = center
                .get(&id)
                .with_context(|| format!("no notification {} for {}", id, viewer))?;
            let Some(kind) = RequestKind::for_notification(record.kind) else {
                bail!("a {} notification has nothing to accept or reject", record.kind.label());
            };
            let resolution = center.respond_to_request(&record, kind, decision).await?;
            println!("{}", resolution.summary(app.config.locale));
        }

        Commands::ReadAll => {
            let center = app.center();
            center.load().await?;
            center.mark_all_read().await?;
            println!("All notifications marked read");
        }

        Commands::Conversation { id } => {
            let view = app.open(&id).await?;
            for group in view.grouped(Utc::now()) {
                println!("── {} ──", group.title(view.locale()));
                for m in &group.messages {
                    let local = m.sent_at.with_timezone(&app.config.zone);
                    let edited = if m.edited { " (edited)" } else { "" };
                    println!("  {} {:>8} {}{}  [{}]", local.format("%H:%M"), m.author_id.as_str(), m.body, edited, m.id);
                }
            }
        }

        Commands::Send { conversation, body } => {
            let mut view = app.open(&conversation).await?;
            let sent = view.send(&body).await?;
            println!("Sent {}", sent.id);
        }

        Commands::Edit {
            conversation,
            message,
            body,
        } => {
            let mut view = app.open(&conversation).await?;
            view.edit(&message.into(), &body).await?;
            println!("Edited");
        }

        Commands::Delete {
            conversation,
            message,
        } => {
            let mut view = app.open(&conversation).await?;
            view.delete(&message.into()).await?;
            println!("Deleted");
        }

        Commands::Watch { interval } => watch(app, Duration::from_secs(interval.max(1))).await,

        Commands::Reconcile { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let body: serde_json::Value = serde_json::from_str(&raw)?;
            for n in reconcile_page(body) {
                print_notification(&n);
            }
        }
    }

    Ok(())
}

fn print_notification(n: &NotificationRecord) {
    let mark = if n.read { " " } else { "•" };
    let reference = n
        .reference_id
        .as_ref()
        .map(|r| format!(" → {}", r))
        .unwrap_or_default();
    println!("{} {} [{}] {}{}", mark, n.id, n.kind.label(), n.content, reference);
}

async fn watch(app: &App, interval: Duration) {
    let center = Arc::new(app.center());
    let dispatcher = app.dispatcher.clone();
    let mut signals = dispatcher.subscribe();

    let poller = {
        let center = center.clone();
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut last_unread = None;
            loop {
                ticker.tick().await;
                match center.load().await {
                    Ok(_) => {
                        let unread = center.unread_count();
                        if last_unread != Some(unread) {
                            last_unread = Some(unread);
                            dispatcher.publish(Topic::NotificationsUpdated);
                        }
                    }
                    Err(e) => warn!("Poll failed: {}", e),
                }
            }
        })
    };

    info!("Watching for refresh signals; Ctrl-C to stop");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = async {
            while let Some(topic) = signals.recv().await {
                println!("{} ({} unread)", topic, center.unread_count());
            }
        } => {}
    }

    poller.abort();
    dispatcher.shutdown();
}

fn seed(db: &Database, viewer: &str) -> anyhow::Result<()> {
    let friend = db.send_friend_request("eva", viewer)?;
    let seat = db.request_ride_seat("ana", viewer, "Centro → Campus 7:30")?;
    db.insert_legacy_ride_notification(viewer, "Pedro solicita unirse a tu ruta")?;
    db.insert_notification(
        viewer,
        NotificationKind::Comment,
        None,
        "Ana comentó tu publicación",
    )?;

    let conversation = format!("dm-ana-{}", viewer);
    let now = Utc::now();
    db.insert_message(&conversation, "ana", "¿Sigue en pie lo de mañana?", now - Span::days(1))?;
    db.insert_message(&conversation, viewer, "Sí, salgo a las 7:30", now - Span::hours(20))?;
    db.insert_message(&conversation, "ana", "Perfecto, te espero en la esquina", now - Span::minutes(10))?;

    println!("friend request {}", friend);
    println!("seat request   {}", seat);
    println!("conversation   {}", conversation);
    Ok(())
}
