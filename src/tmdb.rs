use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

use crate::config::Config;
use crate::models::Movie;

const REGION: &str = "US";
const RENTAL_PREFIX: &str = "r-";

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    account_id: String,
}

/// Everything the finder needs from the remote catalog. Kept narrow so the
/// discovery pipeline can run against a fake in tests.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn genres(&self) -> Result<Vec<Genre>>;
    async fn discover(&self, params: &[(String, String)]) -> Result<Vec<Movie>>;
    async fn account_lists(&self) -> Result<Vec<AccountList>>;
    async fn list_items(&self, list_id: i64) -> Result<Vec<ListItem>>;
    async fn add_list_item(&self, list_id: i64, movie_id: i64) -> Result<()>;
    async fn movie_details(&self, movie_id: i64) -> Result<MovieDetail>;
    async fn release_dates(&self, movie_id: i64) -> Result<ReleaseDates>;
    async fn videos(&self, movie_id: i64) -> Result<Vec<Video>>;
    async fn watch_providers(&self, movie_id: i64) -> Result<WatchProviders>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountList {
    pub id: i64,
    pub name: String,
}

/// Only the id matters for exclusion; list entries may also be TV shows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListItem {
    pub id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieDetail {
    pub id: i64,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseDates {
    #[serde(default)]
    pub results: Vec<ReleaseEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseEntry {
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<ReleaseCert>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseCert {
    #[serde(default)]
    pub certification: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchProviders {
    #[serde(default)]
    pub results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionProviders {
    #[serde(default)]
    pub flatrate: Vec<Provider>,
    #[serde(default)]
    pub rent: Vec<Provider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Provider {
    pub provider_name: String,
}

#[derive(Debug, Deserialize)]
struct Paged<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    total_pages: u32,
}

impl TmdbClient {
    pub fn new(config: &Config) -> Result<Self> {
        let user_agent = format!("movie-finder/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
            account_id: config.account_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Catalog reads authenticate with the api key query parameter.
    fn keyed(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .query(&[("api_key", self.api_key.as_str())])
    }

    /// Account and list endpoints need the bearer token.
    fn bearer(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| anyhow!("TMDB_ACCESS_TOKEN is required for account list access"))?;
        Ok(builder
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T> {
        // Reads carry the api key in the query string, so reqwest errors must
        // not carry the URL into messages that reach HTTP callers.
        let res = builder
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("request failed")?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {} {}", path, status, text));
        }
        let parsed: T = serde_json::from_str(&text)
            .with_context(|| format!("JSON parse failed for {}", path))?;
        Ok(parsed)
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn genres(&self) -> Result<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreResponse {
            #[serde(default)]
            genres: Vec<Genre>,
        }

        let path = "/genre/movie/list";
        let data: GenreResponse = self.send_json(path, self.keyed(path)).await?;
        debug!("Fetched {} genres", data.genres.len());
        Ok(data.genres)
    }

    async fn discover(&self, params: &[(String, String)]) -> Result<Vec<Movie>> {
        let path = "/discover/movie";
        debug!(?params, "Discovery query");
        let data: Paged<Movie> = self
            .send_json(path, self.keyed(path).query(params))
            .await?;
        Ok(data.results)
    }

    async fn account_lists(&self) -> Result<Vec<AccountList>> {
        let path = format!("/account/{}/lists", self.account_id);
        let mut lists = Vec::new();
        let mut page = 1u32;
        loop {
            let builder = self
                .bearer(self.client.get(self.url(&path)))?
                .query(&[("page", page)]);
            let data: Paged<AccountList> = self.send_json(&path, builder).await?;
            lists.extend(data.results);
            if page >= data.total_pages {
                break;
            }
            page += 1;
        }
        Ok(lists)
    }

    async fn list_items(&self, list_id: i64) -> Result<Vec<ListItem>> {
        #[derive(Deserialize)]
        struct ListDetail {
            #[serde(default)]
            items: Vec<ListItem>,
        }

        let path = format!("/list/{list_id}");
        let builder = self.bearer(self.client.get(self.url(&path)))?;
        let data: ListDetail = self.send_json(&path, builder).await?;
        Ok(data.items)
    }

    async fn add_list_item(&self, list_id: i64, movie_id: i64) -> Result<()> {
        let path = format!("/list/{list_id}/add_item");
        let builder = self
            .bearer(self.client.post(self.url(&path)))?
            .json(&json!({ "media_id": movie_id, "media_type": "movie" }));
        let _: serde_json::Value = self.send_json(&path, builder).await?;
        Ok(())
    }

    async fn movie_details(&self, movie_id: i64) -> Result<MovieDetail> {
        let path = format!("/movie/{movie_id}");
        self.send_json(&path, self.keyed(&path)).await
    }

    async fn release_dates(&self, movie_id: i64) -> Result<ReleaseDates> {
        let path = format!("/movie/{movie_id}/release_dates");
        self.send_json(&path, self.keyed(&path)).await
    }

    async fn videos(&self, movie_id: i64) -> Result<Vec<Video>> {
        let path = format!("/movie/{movie_id}/videos");
        let data: Paged<Video> = self.send_json(&path, self.keyed(&path)).await?;
        Ok(data.results)
    }

    async fn watch_providers(&self, movie_id: i64) -> Result<WatchProviders> {
        let path = format!("/movie/{movie_id}/watch/providers");
        self.send_json(&path, self.keyed(&path)).await
    }
}

pub fn us_certification(data: &ReleaseDates) -> Option<String> {
    data.results
        .iter()
        .filter(|r| r.iso_3166_1 == REGION)
        .flat_map(|r| r.release_dates.iter())
        .find(|rd| !rd.certification.is_empty())
        .map(|rd| rd.certification.clone())
}

pub fn select_trailer(videos: &[Video]) -> Option<String> {
    videos
        .iter()
        .find(|v| v.video_type == "Trailer")
        .map(|v| {
            if v.site.eq_ignore_ascii_case("Vimeo") {
                format!("https://vimeo.com/{}", v.key)
            } else {
                format!("https://www.youtube.com/watch?v={}", v.key)
            }
        })
}

/// Subscription providers first; rentals only when nothing streams, each
/// marked with `r-`.
pub fn streaming_summary(data: &WatchProviders) -> String {
    let Some(region) = data.results.get(REGION) else {
        return String::new();
    };
    let mut providers: Vec<String> = region
        .flatrate
        .iter()
        .map(|p| p.provider_name.clone())
        .collect();
    if providers.is_empty() {
        providers = region
            .rent
            .iter()
            .map(|p| format!("{RENTAL_PREFIX}{}", p.provider_name))
            .collect();
    }
    providers.join(", ")
}
