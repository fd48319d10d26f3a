use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use filekeep::auth::Authenticator;
use filekeep::config::ServerConfig;
use filekeep::content::{ContentStore, Fetcher};
use filekeep::engine::{Engine, NamespaceRegistry};
use filekeep::error::Error;
use filekeep::server::{AppState, create_router};
use filekeep::store::{SqliteStore, Store};
use filekeep::types::{Capability, Role};

const URL_CEILING_BYTES: i64 = 100 * 1024 * 1024;

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "filekeep")]
#[command(about = "A self-hosted file manager backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Data directory for the database and file content
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, roles and admin token)
    Init {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user and print its token
    Create {
        #[command(flatten)]
        config: ConfigArgs,

        /// User name
        #[arg(long)]
        name: String,

        /// Role name (admin, user or guest)
        #[arg(long, default_value = "user")]
        role: String,
    },
}

fn builtin_roles() -> [Role; 3] {
    [
        Role {
            id: 0,
            name: "admin".to_string(),
            capabilities: Capability::ALL,
            max_upload_bytes: None,
            max_url_content_bytes: None,
        },
        Role {
            id: 0,
            name: "user".to_string(),
            capabilities: Capability::UPLOAD_FILES.union(Capability::UPLOAD_URLS),
            max_upload_bytes: None,
            max_url_content_bytes: Some(URL_CEILING_BYTES),
        },
        Role {
            id: 0,
            name: "guest".to_string(),
            capabilities: Capability::default(),
            max_upload_bytes: None,
            max_url_content_bytes: None,
        },
    ]
}

fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let store = SqliteStore::new(config.db_path())
        .with_context(|| format!("failed to open {}", config.db_path().display()))?;
    store.initialize()?;
    Ok(Arc::new(store))
}

fn run_init(config: &ServerConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&config.data_dir)?;
    let store = open_store(config)?;
    let token_file = config.token_path();

    if store.has_users()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    for role in builtin_roles() {
        match store.create_role(&role) {
            Ok(_) | Err(Error::AlreadyExists) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let store: Arc<dyn Store> = store;
    NamespaceRegistry::new(store.clone(), config.default_namespace.as_str()).ensure_default()?;

    let admin_role = store
        .get_role_by_name("admin")?
        .context("admin role missing after seeding")?;
    let admin = store.create_user("admin", admin_role.id)?;

    let raw_token = Authenticator::new(store).issue(&admin)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn run_create_user(config: &ServerConfig, name: &str, role: &str) -> anyhow::Result<()> {
    if !config.db_path().exists() {
        bail!("Server not initialized. Run 'filekeep admin init' first.");
    }
    let store: Arc<dyn Store> = open_store(config)?;

    let role = store
        .get_role_by_name(role)?
        .with_context(|| format!("unknown role '{role}'"))?;

    let user = match store.create_user(name, role.id) {
        Ok(user) => user,
        Err(Error::AlreadyExists) => bail!("user '{name}' already exists"),
        Err(e) => return Err(e.into()),
    };
    let raw_token = Authenticator::new(store).issue(&user)?;

    println!();
    println!("========================================");
    println!("Created user '{name}' with role '{}' and token:", role.name);
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();

    Ok(())
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let token_file = config.token_path();
    if !token_file.exists() {
        bail!(
            "Server not initialized. Run 'filekeep admin init' first to create the database and admin token."
        );
    }

    let store: Arc<dyn Store> = open_store(&config)?;
    if !store.has_users()? {
        bail!(
            "Server not initialized. Run 'filekeep admin init' first to create the database and admin token."
        );
    }

    info!("Admin token available at {}", token_file.display());

    let content = Arc::new(ContentStore::new(&config.data_dir));
    let fetcher = Fetcher::new(config.fetch_timeout())?;
    let engine = Engine::new(store.clone(), content, fetcher, &config.default_namespace)?;

    let state = Arc::new(AppState::new(
        engine,
        Authenticator::new(store),
        config.max_request_body_bytes,
    ));

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("filekeep=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { config } => run_init(&config.load()?)?,
            AdminCommands::User {
                command: UserCommands::Create { config, name, role },
            } => run_create_user(&config.load()?, &name, &role)?,
        },
        Commands::Serve { config, host, port } => {
            let mut config = config.load()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            run_serve(config).await?;
        }
    }

    Ok(())
}
