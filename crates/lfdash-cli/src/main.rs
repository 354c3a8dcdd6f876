mod render;
mod session;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lfdash_core::{load_reps, BusinessId, RangeOption};
use lfdash_view::{Dashboard, FilterState, RefreshApplied, SortMode, Tile};

use crate::session::Session;

#[derive(Debug, Parser)]
#[command(name = "lfdash")]
#[command(about = "Visitor-intelligence dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sign in with a three-letter rep code
    Signin {
        /// Rep code (case-insensitive)
        code: String,
    },
    /// Browse activity across all businesses
    Explore,
    /// Sign out (resets filters when exploring)
    Signout,
    /// Show the business list, tiles, and reports
    Show(ShowArgs),
    /// Most-viewed pages for one business
    Pages {
        business_id: String,
    },
    /// Recent visits for one business
    Visits {
        business_id: String,
        /// Access code that reveals visitor IPs
        #[arg(long)]
        access: Option<String>,
    },
    /// List rep sign-in codes
    Codes {
        /// Access code for the code listing
        #[arg(long)]
        access: Option<String>,
    },
    /// Show the current session settings
    Settings,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Lookback range, e.g. 24h, 7d, 30d
    #[arg(long)]
    range: Option<RangeOption>,
    /// Match against name, location, industry, and website
    #[arg(long, short)]
    query: Option<String>,
    #[arg(long, default_value_t = 0)]
    min_visits: u64,
    /// Active tile: new, visits, or returning
    #[arg(long)]
    tile: Option<Tile>,
    /// Hide placeholder and unnamed businesses
    #[arg(long)]
    hide_generic: bool,
    /// Sort order: activity, visits, or pages
    #[arg(long, default_value_t = SortMode::Activity)]
    sort: SortMode,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    state: Option<String>,
    /// Maximum rows to print
    #[arg(long, default_value_t = 25)]
    limit: usize,
}

impl ShowArgs {
    fn filters(&self) -> FilterState {
        FilterState {
            query: self.query.clone().unwrap_or_default(),
            min_visits: self.min_visits,
            tile: self.tile,
            hide_generic: self.hide_generic,
            sort: self.sort,
            country: self.country.clone(),
            state: self.state.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = lfdash_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("lfdash: run `lfdash --help` for commands");
        return Ok(());
    };

    let roster = load_reps(&config.reps_path)
        .with_context(|| format!("loading rep roster from {}", config.reps_path.display()))?;
    let mut dashboard = Dashboard::from_app_config(&config, roster)?;
    let saved = session::load(&config.session_path);
    dashboard.resume(saved.to_mode(dashboard.roster()), saved.range);

    match command {
        Commands::Signin { code } => {
            let applied = dashboard.sign_in(&code).await?;
            report_refresh(&applied);
            println!("{}", render::status_line(dashboard.state()));
        }
        Commands::Explore => {
            let applied = dashboard.explore().await;
            report_refresh(&applied);
            println!("{}", render::status_line(dashboard.state()));
        }
        Commands::Signout => {
            let was = dashboard.state().mode.to_string();
            dashboard.sign_out();
            if dashboard.state().mode.is_authenticated() {
                println!("Filters and caches reset ({was}).");
            } else {
                println!("Signed out ({was}).");
            }
        }
        Commands::Show(args) => {
            require_sign_in(&dashboard)?;
            let applied = match args.range {
                Some(range) => dashboard.set_range(range).await,
                None => dashboard.refresh().await,
            };
            report_refresh(&applied);
            dashboard.set_filters(args.filters());
            render::print_dashboard(&dashboard, args.limit, now(&dashboard));
        }
        Commands::Pages { business_id } => {
            let id = parse_business_id(&business_id)?;
            load(&mut dashboard).await?;
            let pages = dashboard.business_pages(&id).await?;
            render::print_pages(&pages);
        }
        Commands::Visits {
            business_id,
            access,
        } => {
            let id = parse_business_id(&business_id)?;
            load(&mut dashboard).await?;
            if let Some(code) = access {
                if !dashboard.unlock_ips(&code) {
                    eprintln!("Access code not accepted; IPs stay hidden.");
                }
            }
            let visits = dashboard.business_visits(&id).await?;
            render::print_visits(&visits, now(&dashboard));
        }
        Commands::Codes { access } => {
            let reps = dashboard.rep_codes(access.as_deref())?;
            render::print_codes(&reps);
        }
        Commands::Settings => render::print_settings(&dashboard.settings_view()),
    }

    session::store(&config.session_path, &Session::from_state(dashboard.state()))
        .with_context(|| format!("saving session to {}", config.session_path.display()))?;
    Ok(())
}

fn require_sign_in(dashboard: &Dashboard) -> anyhow::Result<()> {
    if dashboard.state().mode.is_authenticated() {
        Ok(())
    } else {
        anyhow::bail!("not signed in; run `lfdash signin <CODE>` or `lfdash explore`")
    }
}

/// Loads data for the saved mode; detail lookups need a loaded window.
async fn load(dashboard: &mut Dashboard) -> anyhow::Result<()> {
    require_sign_in(dashboard)?;
    let applied = dashboard.refresh().await;
    report_refresh(&applied);
    if let RefreshApplied::Failed(message) = applied {
        anyhow::bail!("could not load data: {message}");
    }
    Ok(())
}

fn report_refresh(applied: &RefreshApplied) {
    match applied {
        RefreshApplied::Updated => tracing::debug!("refresh applied"),
        RefreshApplied::Failed(message) => eprintln!("Error loading: {message}"),
        RefreshApplied::Discarded => tracing::debug!("refresh superseded"),
        RefreshApplied::NotSignedIn => eprintln!("Not signed in."),
    }
}

fn parse_business_id(raw: &str) -> anyhow::Result<BusinessId> {
    BusinessId::new(raw).context("business id must not be blank")
}

fn now(dashboard: &Dashboard) -> chrono::DateTime<Utc> {
    dashboard.state().window.map_or_else(Utc::now, |w| w.end)
}
