//! Print what the finder shows about a single movie.
//! Usage:
//!   cargo run --bin movie_props -- <tmdb_id> [list]
//! With `list`, also reports whether the movie is on the Watched/NeverWatch lists.
//! Requires TMDB_API_KEY and TMDB_ACCOUNT_ID in the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use movie_finder::config::Config;
use movie_finder::finder::{ExclusionList, MovieFinder};
use movie_finder::tmdb::{CatalogApi, TmdbClient};
use serde_json::json;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin movie_props -- <tmdb_id> [list]");
        std::process::exit(1);
    }
    let movie_id: i64 = args[1].parse().context("tmdb_id must be an integer")?;
    let check_lists = args.get(2).map(|a| a == "list").unwrap_or(false);

    let config = Config::from_env()?;
    let client = Arc::new(TmdbClient::new(&config)?);
    let finder = MovieFinder::with_list_names(client.clone(), config.list_names());

    let detail = client.movie_details(movie_id).await?;
    let certification = finder.certification(movie_id).await?;
    let trailer = finder.trailer_url(movie_id).await?;
    let streaming = finder.streaming_info(movie_id).await?;

    let mut out = json!({
        "id": detail.id,
        "imdb_id": detail.imdb_id,
        "tagline": detail.tagline,
        "runtime": detail.runtime,
        "certification": certification,
        "trailer": trailer,
        "streaming": streaming,
    });

    if check_lists {
        for list in [ExclusionList::Watched, ExclusionList::NeverWatch] {
            let ids = finder.exclusion_ids(list).await?;
            out[finder.list_names().name(list)] = json!(ids.contains(&movie_id));
        }
    }

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
