use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use movie_finder::cli::{run_session, SystemBrowser};
use movie_finder::config::Config;
use movie_finder::filters::FilterCriteria;
use movie_finder::finder::MovieFinder;
use movie_finder::tmdb::TmdbClient;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "movie-finder")]
#[command(about = "Recommends movies from TMDB you haven't seen or ruled out")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through recommendations one at a time (default)
    Pick(PickArgs),
    /// Serve the discover/mark/trailer HTTP endpoints
    Serve {
        /// Address to bind, overrides MOVIE_FINDER_ADDR
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}

#[derive(clap::Args, Debug, Default)]
struct PickArgs {
    /// Minimum number of votes
    #[arg(long)]
    min_votes: Option<u32>,
    /// Earliest primary release date (YYYY-MM-DD)
    #[arg(long)]
    release_date: Option<String>,
    /// Original language code, e.g. "en"
    #[arg(long)]
    language: Option<String>,
    /// Minimum average rating
    #[arg(long)]
    min_rating: Option<f64>,
    /// Minimum US certification, e.g. "PG-13"
    #[arg(long)]
    certification: Option<String>,
    /// Comma-separated genres searched together; repeat for more groups
    #[arg(long = "genres")]
    genre_groups: Vec<String>,
    /// Drop the default genre group and search every genre
    #[arg(long, conflicts_with = "genre_groups")]
    any_genre: bool,
}

impl PickArgs {
    fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::default();
        if let Some(v) = self.min_votes {
            criteria.min_votes = Some(v);
        }
        if let Some(d) = &self.release_date {
            criteria.release_date_min = Some(d.clone());
        }
        if let Some(l) = &self.language {
            criteria.original_language = Some(l.clone());
        }
        if let Some(r) = self.min_rating {
            criteria.min_rating = Some(r);
        }
        if let Some(c) = &self.certification {
            criteria.us_certification = Some(c.clone());
        }
        if self.any_genre {
            criteria.genre_groups.clear();
        } else if !self.genre_groups.is_empty() {
            criteria.genre_groups = self
                .genre_groups
                .iter()
                .map(|group| {
                    group
                        .split(',')
                        .map(str::trim)
                        .filter(|g| !g.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|group| !group.is_empty())
                .collect();
        }
        criteria
    }
}

fn init_tracing(serving: bool) {
    let default = if serving { "info,tower_http=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();
    if serving {
        builder.init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
}

async fn run_pick(config: Config, pick: PickArgs) -> Result<()> {
    let criteria = pick.criteria();
    let catalog = Arc::new(TmdbClient::new(&config)?);
    let finder = MovieFinder::with_list_names(catalog, config.list_names());

    let mut candidates = finder.discover_new(&criteria).await?;
    if candidates.is_empty() {
        println!("No suitable movies found. Try adjusting filters.");
        return Ok(());
    }
    println!("Found {} movies that match your criteria.", candidates.len());

    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let mut rng = StdRng::from_entropy();
    let end = run_session(
        &finder,
        &mut candidates,
        &mut input,
        &mut output,
        &SystemBrowser,
        &mut rng,
    )
    .await?;
    info!(?end, "Session finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = dotenv();
    let args = Args::parse();
    let command = args
        .command
        .unwrap_or_else(|| Command::Pick(PickArgs::default()));
    init_tracing(matches!(command, Command::Serve { .. }));
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }

    let mut config = Config::from_env()?;
    match command {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.addr = addr;
            }
            movie_finder::app::run_server(config).await
        }
        Command::Pick(pick) => run_pick(config, pick).await,
    }
}
