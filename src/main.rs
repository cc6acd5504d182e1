use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use drivedesk::api::{documents, folders, items, sharing, ApiClient, ItemBackend, UploadFile};
use drivedesk::breadcrumb::Navigator;
use drivedesk::config::{self, ClientConfig};
use drivedesk::directory::Directory;
use drivedesk::editor;
use drivedesk::error::{validation, ClientError};
use drivedesk::filter::{DateRange, FilterValue};
use drivedesk::metrics::Metrics;
use drivedesk::notify::{Notifier, ToastLevel};
use drivedesk::push::PushClient;
use drivedesk::search::{SearchBox, SearchSettings, SearchState};
use drivedesk::session::{Profile, Session, SessionStore};
use drivedesk::share;
use drivedesk::types::{CreateDocumentRequest, Item, ItemId, ItemType, PermissionLevel, ViewMode};
use drivedesk::upload::{UploadOrchestrator, UploadPhase, UploadSettings};

#[derive(Parser)]
#[command(name = "drivedesk", version, about = "Command-line client for a cloud document drive")]
struct Cli {
    /// Session file (overrides session.file from the configuration)
    #[arg(long, global = true, env = "DRIVEDESK_SESSION")]
    session: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store access tokens obtained from the login flow
    Login {
        #[arg(long)]
        token: String,
        #[arg(long)]
        refresh_token: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List a folder
    Ls(LsArgs),
    /// Search document metadata
    Search { keyword: String },
    /// Create a folder
    Mkdir {
        name: String,
        #[arg(long)]
        parent: Option<ItemId>,
    },
    /// Create an empty document
    Touch {
        name: String,
        /// Document type, e.g. docx, xlsx, pptx
        #[arg(long, default_value = "docx")]
        doc_type: String,
        #[arg(long)]
        folder: Option<ItemId>,
    },
    Rename { id: ItemId, name: String },
    Copy { id: ItemId },
    /// Move an item to the trash
    Trash { id: ItemId },
    /// Restore an item from the trash
    Restore { id: ItemId },
    /// Delete a trashed item permanently
    Purge { id: ItemId },
    /// Empty the trash
    EmptyTrash,
    Save { id: ItemId },
    Unsave { id: ItemId },
    /// Restore an older version of a document
    RestoreVersion { id: ItemId, version: i32 },
    /// Upload files with live progress; Ctrl-C cancels
    Upload {
        files: Vec<PathBuf>,
        #[arg(long)]
        folder: Option<ItemId>,
    },
    /// Download a document, or a folder as an archive
    Download {
        id: ItemId,
        #[arg(long)]
        folder: bool,
        #[arg(short, long, required_unless_present = "link")]
        output: Option<PathBuf>,
        /// Print a direct download link instead of downloading
        #[arg(long, conflicts_with = "output")]
        link: bool,
    },
    /// Share an item with another user
    Share {
        id: ItemId,
        email: String,
        #[arg(long, default_value = "viewer")]
        permission: PermissionLevel,
    },
    /// List who has access to an item
    Permissions { id: ItemId },
    /// List owners known to the owner filter
    Owners,
    /// Print the document editor configuration of a document
    EditorConfig { id: ItemId },
}

#[derive(Args)]
struct LsArgs {
    /// Folder id (root when omitted)
    folder: Option<ItemId>,
    #[arg(long, conflicts_with_all = ["trash", "saved"])]
    shared: bool,
    #[arg(long, conflicts_with = "saved")]
    trash: bool,
    #[arg(long)]
    saved: bool,
    /// document or folder
    #[arg(long = "type")]
    item_type: Option<String>,
    /// Owner email
    #[arg(long)]
    owner: Option<String>,
    /// Modified on or after (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,
    /// Modified on or before (YYYY-MM-DD)
    #[arg(long, requires = "since")]
    until: Option<NaiveDate>,
    /// Fetch every page instead of the first one
    #[arg(long)]
    all: bool,
}

impl LsArgs {
    fn view(&self) -> ViewMode {
        if self.shared {
            ViewMode::SharedWithMe
        } else if self.trash {
            ViewMode::Trash
        } else if self.saved {
            ViewMode::Saved
        } else {
            ViewMode::MyDrive
        }
    }

    fn filters(&self) -> anyhow::Result<Vec<FilterValue>> {
        let mut out = Vec::new();
        if let Some(t) = &self.item_type {
            let item_type = match t.to_ascii_lowercase().as_str() {
                "document" | "doc" => ItemType::Document,
                "folder" | "dir" => ItemType::Folder,
                other => anyhow::bail!("unknown item type {:?} (expected document or folder)", other),
            };
            out.push(FilterValue::ItemType(Some(item_type)));
        }
        if let Some(owner) = &self.owner {
            out.push(FilterValue::CreatedBy(Some(owner.clone())));
        }
        if let Some(from) = self.since {
            let range = match self.until {
                Some(to) => DateRange::between(from, to),
                None => DateRange::since(from),
            };
            out.push(FilterValue::UpdatedAt(Some(range)));
        }
        Ok(out)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging (stdout + daily rotation under ./logs)
    std::fs::create_dir_all("logs").ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stderr());
    let file_appender = tracing_appender::rolling::daily("logs", "drivedesk.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,drivedesk=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Keep the guards alive so the non-blocking writers flush on exit
    let _log_guards = (stdout_guard, file_guard);

    let cli = Cli::parse();
    // Load configuration (embedded defaults -> drivedesk.toml -> env/.env)
    let cfg = config::load()?;
    // An empty session.file keeps the session in memory only
    let session_path = cli.session.clone().or_else(|| {
        let file = cfg.session.file.trim();
        (!file.is_empty()).then(|| PathBuf::from(file))
    });

    let store = SessionStore::new();
    if let Some(path) = &session_path {
        if let Some(session) = Session::load(path)? {
            store.login(session);
        }
    }
    let metrics = Metrics::new();
    let notifier = Notifier::new();
    spawn_toast_printer(&notifier);
    let api = Arc::new(ApiClient::new(&cfg, store.clone(), metrics.clone())?);

    let result = run(cli.command, &cfg, session_path.as_deref(), &store, api, notifier, metrics.clone()).await;
    if let Some(err) = result.as_ref().err().and_then(|e| e.downcast_ref::<ClientError>()) {
        if store.end_if_rejected(err) {
            if let Some(path) = &session_path {
                Session::remove(path)?;
            }
            eprintln!("Session is no longer valid; run `drivedesk login` again");
        }
    }
    let snapshot = metrics.get_snapshot();
    tracing::debug!(
        requests = snapshot.requests_sent,
        failed = snapshot.requests_failed,
        stale = snapshot.stale_responses_dropped,
        "done"
    );
    result
}

fn spawn_toast_printer(notifier: &Notifier) {
    let mut rx = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(toast) => {
                    let tag = match toast.level {
                        ToastLevel::Info => "info",
                        ToastLevel::Success => "ok",
                        ToastLevel::Warning => "warning",
                        ToastLevel::Error => "error",
                    };
                    eprintln!("[{}] {}", tag, toast.message);
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn run(
    command: Command,
    cfg: &ClientConfig,
    session_path: Option<&Path>,
    store: &SessionStore,
    api: Arc<ApiClient>,
    notifier: Notifier,
    metrics: Metrics,
) -> anyhow::Result<()> {
    let backend: Arc<dyn ItemBackend> = api.clone();
    let directory = |view: ViewMode| {
        Arc::new(Directory::new(backend.clone(), view, cfg.listing.page_size, notifier.clone(), metrics.clone()))
    };

    match command {
        Command::Login { token, refresh_token } => {
            store.login(Session::new(token, refresh_token));
            let user = sharing::user_info(&api).await.context("token was not accepted")?;
            let profile = Profile { user_id: Some(user.id), email: user.email, name: user.name, avatar: user.avatar };
            store.set_profile(profile.clone());
            if let (Some(path), Some(session)) = (session_path, store.current()) {
                session.save(path)?;
            }
            info!(email = %profile.email, "logged in");
            println!("Logged in as {}", profile.email);
        }
        Command::Logout => {
            store.logout();
            if let Some(path) = session_path {
                Session::remove(path)?;
            }
            println!("Logged out");
        }
        Command::Whoami => match store.profile() {
            Some(p) => println!("{} {}", p.email, p.name.unwrap_or_default()),
            None if store.is_logged_in() => println!("logged in (no profile cached)"),
            None => println!("not logged in"),
        },
        Command::Ls(args) => {
            let filters = args.filters()?;
            let view = args.view();
            let dir = directory(view);
            let nav = Navigator::new(dir.clone(), backend.clone(), notifier.clone()).await;
            nav.navigate(args.folder).await?;
            for value in filters {
                dir.set_filter(value).await?;
            }
            while args.all && dir.can_load_more().await {
                dir.load_more().await?;
            }
            let trail = nav.trail().await;
            let snap = dir.snapshot().await;
            println!("{}", trail.labels().join(" / "));
            for item in &snap.items {
                print_item(item);
            }
            println!("{} of {} item(s)", snap.items.len(), snap.total_items);
        }
        Command::Search { keyword } => {
            let settings = SearchSettings { debounce: cfg.debounce(), page_size: cfg.search.page_size };
            let search = SearchBox::spawn(backend.clone(), settings, notifier.clone(), metrics.clone());
            let mut rx = search.subscribe();
            search.input(keyword);
            let state = rx
                .wait_for(|s| matches!(s, SearchState::Results { .. } | SearchState::Failed { .. }))
                .await?
                .clone();
            match state {
                SearchState::Results { items, total, .. } => {
                    for item in &items {
                        print_item(item);
                    }
                    println!("{} match(es)", total);
                }
                SearchState::Failed { message, .. } => anyhow::bail!(message),
                _ => {}
            }
        }
        Command::Mkdir { name, parent } => {
            let dir = directory(ViewMode::MyDrive);
            dir.open_folder(parent).await?;
            let folder = dir.create_folder(&name).await?;
            println!("Created folder {} ({})", folder.name, folder.id);
        }
        Command::Touch { name, doc_type, folder } => {
            validation::validate_item_name(&name)?;
            let req = CreateDocumentRequest { name, doc_type, folder_id: folder };
            let doc = documents::create(&api, &req).await?;
            println!("Created document {} ({})", doc.name, doc.id);
        }
        Command::Rename { id, name } => {
            api.rename_item(id, &name).await?;
            println!("Renamed {} to {}", id, name);
        }
        Command::Copy { id } => {
            let copy = api.copy_document(id).await?;
            println!("Created copy {} ({})", copy.name, copy.id);
        }
        Command::Trash { id } => {
            api.trash_item(id).await?;
            println!("Moved {} to trash", id);
        }
        Command::Restore { id } => {
            api.restore_item(id).await?;
            println!("Restored {}", id);
        }
        Command::Purge { id } => {
            api.delete_forever(id).await?;
            println!("Deleted {} permanently", id);
        }
        Command::EmptyTrash => {
            api.clean_trash().await?;
            println!("Trash emptied");
        }
        Command::Save { id } => {
            api.save_item(id).await?;
            println!("Saved {}", id);
        }
        Command::Unsave { id } => {
            api.unsave_item(id).await?;
            println!("Removed {} from saved items", id);
        }
        Command::RestoreVersion { id, version } => {
            let doc = api.restore_version(id, version).await?;
            println!("Restored {} to version {}", doc.name, version);
        }
        Command::Upload { files, folder } => {
            upload(cfg, store, api, files, folder, notifier, metrics).await?;
        }
        Command::Download { id, folder, output, link } => {
            if link {
                let url = if folder { folders::download_url(&api, id)? } else { documents::download_url(&api, id)? };
                println!("{}", url);
                return Ok(());
            }
            let Some(output) = output else {
                anyhow::bail!("--output is required");
            };
            let bytes = if folder { folders::download(&api, id).await? } else { documents::download(&api, id).await? };
            tokio::fs::write(&output, &bytes).await?;
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
        Command::Share { id, email, permission } => {
            let item = items::find_in_roots(backend.as_ref(), id, cfg.listing.page_size).await?;
            share::share_item(api.as_ref(), &notifier, &item, &email, permission).await?;
        }
        Command::Permissions { id } => {
            for p in sharing::permissions(&api, id).await? {
                println!("{:<8} {}", p.permission.as_str(), p.email);
            }
        }
        Command::Owners => {
            for email in items::owner_emails(&api).await? {
                println!("{}", email);
            }
        }
        Command::EditorConfig { id } => {
            let item = items::find_in_roots(backend.as_ref(), id, cfg.listing.page_size).await?;
            let config = editor::open(&api, &item).await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

async fn upload(
    cfg: &ClientConfig,
    store: &SessionStore,
    api: Arc<ApiClient>,
    paths: Vec<PathBuf>,
    folder: Option<ItemId>,
    notifier: Notifier,
    metrics: Metrics,
) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        files.push(UploadFile::from_path(path).await?);
    }
    let push_url = Url::parse(&cfg.push.url).context("invalid push.url")?;
    let push = Arc::new(PushClient::connect(push_url, store.clone(), cfg.reconnect_delay()));
    let settings = UploadSettings {
        progress_topic: cfg.push.progress_topic.clone(),
        completion_topic: cfg.push.completion_topic.clone(),
        grace_period: cfg.grace_period(),
    };
    let orchestrator = Arc::new(UploadOrchestrator::new(api, push.clone(), settings, notifier, metrics));
    let mut view = orchestrator.subscribe();

    let starter = orchestrator.clone();
    let mut request = tokio::spawn(async move { starter.start(folder, files).await });
    let mut request_done = false;
    loop {
        tokio::select! {
            res = &mut request, if !request_done => {
                request_done = true;
                res??;
            }
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                if let Some(p) = &current.progress {
                    eprintln!("{} {:>5.1}% ({}/{})", p.file_name, p.percent, p.current_chunk, p.total_chunks);
                }
                if request_done && current.phase == UploadPhase::Idle {
                    break;
                }
                if matches!(current.phase, UploadPhase::Completed(_) | UploadPhase::Cancelled(_)) {
                    orchestrator.wait_idle().await;
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                orchestrator.cancel().await?;
            }
        }
    }
    push.close();
    Ok(())
}

fn print_item(item: &Item) {
    let kind = match item.item_type() {
        ItemType::Folder => "folder",
        ItemType::Document => "doc",
    };
    let marker = if item.saved { "*" } else { " " };
    println!(
        "{:>8} {}{:<6} {:<40} {:<28} {}",
        item.id,
        marker,
        kind,
        item.name,
        item.owner_email,
        item.updated_at.as_deref().unwrap_or("-")
    );
}
