mod commands;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use pzstore::api::{ApiClient, Navigation};
use pzstore::config::Config;
use pzstore::error::AppError;
use pzstore::session::Session;
use pzstore::storage::{FileStorage, MemoryStorage, StorageAdapter};

#[derive(Parser)]
#[command(name = "pzstore", version, about = "PZ launcher and scripts storefront")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show or set the display language (pt, en, es)
    Language { language: Option<String> },
    /// List products, optionally filtered
    Products {
        /// Category id to include (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Subcategory name to include (repeatable)
        #[arg(long = "subcategory")]
        subcategories: Vec<String>,
    },
    /// List categories and their subcategories
    Categories,
    /// Account overview
    Dashboard,
    /// Launcher licenses
    Licenses,
    /// Purchased scripts
    Scripts,
    /// Check whether a domain already holds a launcher license
    CheckDomain { domain: String },
    /// Change the domain and URLs of a launcher license
    EditLicense {
        token: String,
        #[arg(long)]
        domain: String,
        #[arg(long)]
        theme_url: String,
        #[arg(long)]
        update_url: String,
    },
    /// Buy a product through the payment gateway
    Buy {
        product_id: String,
        #[command(flatten)]
        license: LicenseArgs,
    },
    /// Renew a launcher license for 30 days
    Renew {
        /// License id or token
        license: String,
    },
    /// Wait for a pending payment and finish the purchase
    AwaitPayment {
        #[arg(long)]
        payment_id: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        product_id: String,
        /// The payment is for the launcher
        #[arg(long)]
        launcher: bool,
        #[command(flatten)]
        license: LicenseArgs,
    },
}

/// Launcher license fields; prompted for when omitted.
#[derive(Args, Debug, Clone, Default)]
pub struct LicenseArgs {
    #[arg(long)]
    pub domain: Option<String>,
    #[arg(long)]
    pub theme_url: Option<String>,
    #[arg(long)]
    pub update_url: Option<String>,
}

pub struct App {
    pub config: Config,
    pub client: Arc<ApiClient>,
}

fn open_storage(config: &Config) -> Arc<dyn StorageAdapter> {
    let storage = match &config.data_dir {
        Some(dir) => FileStorage::in_dir(dir),
        None => FileStorage::new(),
    };
    match storage {
        Some(storage) => Arc::new(storage),
        None => {
            tracing::warn!("No data directory available, the session will not be remembered");
            Arc::new(MemoryStorage::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pzstore=info,tower_http=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::debug!(api_url = %config.api_url, "Using storefront API");

    let session = Session::new(open_storage(&config));
    let (nav_tx, mut nav_rx) = mpsc::unbounded_channel();
    let client = ApiClient::new(&config, session)?.with_navigation(nav_tx);

    let app = App {
        config,
        client: Arc::new(client),
    };

    let result = commands::run(&app, cli.command).await;

    let redirected = matches!(nav_rx.try_recv(), Ok(Navigation::Login));
    if redirected {
        println!("Your session has ended. Log in again with `pzstore login`.");
    }

    match result {
        Err(e) if matches!(e.downcast_ref::<AppError>(), Some(err) if err.redirect_target().is_some()) => {
            if !redirected {
                println!("Please log in first with `pzstore login`.");
            }
            std::process::exit(2);
        }
        other => other,
    }
}
