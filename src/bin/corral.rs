//! corral: command-line client for the ranch API.
//!
//! Exercises the session, gate, cache and theme layers against a live
//! server using the same storage file as other corral clients.

use clap::{Parser, Subcommand, ValueEnum};
use corral::{CacheKey, ClientConfig, Corral, LoadConfig, LoadOutcome, Navigation, ThemePreference};

/// Corral CLI client
#[derive(Parser)]
#[command(name = "corral")]
#[command(version = corral::PKG_VERSION)]
#[command(about = "Ranch API client")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// API base URL (overrides the config file)
    #[arg(long, env = "CORRAL_API_URL")]
    api_url: Option<String>,

    /// Access token issued by the identity provider
    #[arg(long, env = "CORRAL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the authenticated principal
    Whoami,

    /// Run the authorization gate for a URL
    Navigate {
        /// Destination, e.g. "/home?tab=herd"
        url: String,
    },

    /// Fetch an enveloped resource through the request cache
    Get {
        /// API path, e.g. "/api/v1/animals/7"
        path: String,
        /// Show stale data while refreshing
        #[arg(long)]
        stale_while_revalidate: bool,
    },

    /// Forget the persisted principal
    Logout,

    /// Show or change the theme preference
    Theme {
        #[arg(value_enum, default_value_t = ThemeAction::Show)]
        action: ThemeAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeAction {
    Show,
    Dark,
    Light,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = ClientConfig::load(args.config.as_deref())?;

    let mut builder = Corral::builder().from_config(&config);
    if let Some(url) = args.api_url {
        builder = builder.api_base_url(url);
    }
    if let Some(token) = args.token {
        builder = builder.bearer_token(token);
    }
    let ctx = builder.build()?;

    match args.command {
        Command::Whoami => match ctx.session().load_principal().await {
            Some(principal) => {
                println!("{} ({})", principal.display_name(), principal.id);
                if let Some(email) = &principal.email_address {
                    println!("email: {email}");
                }
                let scopes: Vec<&str> = principal.scope_codes().collect();
                println!("scopes: {}", scopes.join(", "));
            }
            None => println!("not authenticated"),
        },

        Command::Navigate { url } => match ctx.router().navigate(&url).await {
            Navigation::Proceed { route, .. } => {
                let path = if route.path.is_empty() { "/" } else { route.path.as_str() };
                println!("proceed: {url} (route {path})");
            }
            Navigation::Redirect { decision, redirect } => {
                println!("{:?}: redirect to {redirect}", decision.state);
            }
            Navigation::NotFound => println!("no route matches {url}"),
        },

        Command::Get {
            path,
            stale_while_revalidate,
        } => {
            let key = CacheKey::new(path.clone());
            let handle = ctx.cache().acquire_handle::<serde_json::Value>(&key)?;
            let api = ctx.api().clone();
            let load = LoadConfig::new().stale_while_revalidate(stale_while_revalidate);
            let outcome = ctx
                .cache()
                .load(
                    &key,
                    || async move { api.get_data::<serde_json::Value>(&path).await },
                    &load,
                )
                .await?;

            if let LoadOutcome::Failed(message) = &outcome {
                eprintln!("error: {message}");
            }
            if let Some(data) = handle.data() {
                println!("{}", serde_json::to_string_pretty(data.as_ref())?);
            }
        }

        Command::Logout => {
            ctx.logout();
            println!("logged out");
        }

        Command::Theme { action } => {
            let theme = ctx.theme();
            match action {
                ThemeAction::Show => {}
                ThemeAction::Dark => theme.set(ThemePreference::Dark),
                ThemeAction::Light => theme.set(ThemePreference::Light),
                ThemeAction::Toggle => {
                    theme.toggle();
                }
            }
            println!("theme: {}", theme.current());
        }
    }

    Ok(())
}
