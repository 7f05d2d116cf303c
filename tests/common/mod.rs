#![allow(dead_code)]

use movie_finder::models::Movie;
use movie_finder::tmdb::{
    AccountList, CatalogApi, Genre, ListItem, MovieDetail, ReleaseDates, Video, WatchProviders,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

pub const WATCHED_ID: i64 = 9001;
pub const NEVERWATCH_ID: i64 = 9002;

/// In-memory stand-in for TMDB. Discovery answers are keyed by the
/// `with_genres` parameter (None when absent).
#[derive(Default)]
pub struct FakeCatalog {
    pub genres: Vec<Genre>,
    pub discover_results: HashMap<Option<String>, Vec<Movie>>,
    pub lists: Vec<AccountList>,
    pub list_items: Mutex<HashMap<i64, Vec<i64>>>,
    pub release_dates: HashMap<i64, ReleaseDates>,
    pub videos: HashMap<i64, Vec<Video>>,
    pub providers: HashMap<i64, WatchProviders>,
    pub fail_discover: bool,
    pub discover_calls: Mutex<Vec<Vec<(String, String)>>>,
    pub genre_calls: Mutex<usize>,
    pub added: Mutex<Vec<(i64, i64)>>,
}

#[async_trait::async_trait]
impl CatalogApi for FakeCatalog {
    async fn genres(&self) -> anyhow::Result<Vec<Genre>> {
        *self.genre_calls.lock().unwrap() += 1;
        Ok(self.genres.clone())
    }

    async fn discover(&self, params: &[(String, String)]) -> anyhow::Result<Vec<Movie>> {
        self.discover_calls.lock().unwrap().push(params.to_vec());
        if self.fail_discover {
            anyhow::bail!("/discover/movie -> 503 Service Unavailable");
        }
        let key = params
            .iter()
            .find(|(k, _)| k == "with_genres")
            .map(|(_, v)| v.clone());
        Ok(self.discover_results.get(&key).cloned().unwrap_or_default())
    }

    async fn account_lists(&self) -> anyhow::Result<Vec<AccountList>> {
        Ok(self.lists.clone())
    }

    async fn list_items(&self, list_id: i64) -> anyhow::Result<Vec<ListItem>> {
        Ok(self
            .list_items
            .lock()
            .unwrap()
            .get(&list_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|id| ListItem { id })
            .collect())
    }

    async fn add_list_item(&self, list_id: i64, movie_id: i64) -> anyhow::Result<()> {
        self.added.lock().unwrap().push((list_id, movie_id));
        self.list_items
            .lock()
            .unwrap()
            .entry(list_id)
            .or_default()
            .push(movie_id);
        Ok(())
    }

    async fn movie_details(&self, movie_id: i64) -> anyhow::Result<MovieDetail> {
        Ok(MovieDetail {
            id: movie_id,
            runtime: Some(110),
            ..MovieDetail::default()
        })
    }

    async fn release_dates(&self, movie_id: i64) -> anyhow::Result<ReleaseDates> {
        Ok(self.release_dates.get(&movie_id).cloned().unwrap_or_default())
    }

    async fn videos(&self, movie_id: i64) -> anyhow::Result<Vec<Video>> {
        Ok(self.videos.get(&movie_id).cloned().unwrap_or_default())
    }

    async fn watch_providers(&self, movie_id: i64) -> anyhow::Result<WatchProviders> {
        Ok(self.providers.get(&movie_id).cloned().unwrap_or_default())
    }
}

impl FakeCatalog {
    /// Genres, both exclusion lists (empty) and nothing to discover.
    pub fn standard() -> Self {
        Self {
            genres: vec![
                Genre {
                    id: 10749,
                    name: "Romance".to_string(),
                },
                Genre {
                    id: 878,
                    name: "Science Fiction".to_string(),
                },
                Genre {
                    id: 35,
                    name: "Comedy".to_string(),
                },
            ],
            lists: vec![
                AccountList {
                    id: 1,
                    name: "Favourites".to_string(),
                },
                AccountList {
                    id: WATCHED_ID,
                    name: "Watched".to_string(),
                },
                AccountList {
                    id: NEVERWATCH_ID,
                    name: "NeverWatch".to_string(),
                },
            ],
            ..Self::default()
        }
    }

    pub fn with_discover(mut self, genres: Option<&str>, movies: Vec<Movie>) -> Self {
        self.discover_results
            .insert(genres.map(str::to_string), movies);
        self
    }

    pub fn with_list_items(self, list_id: i64, ids: &[i64]) -> Self {
        self.list_items
            .lock()
            .unwrap()
            .insert(list_id, ids.to_vec());
        self
    }

    pub fn with_trailer(mut self, movie_id: i64, key: &str) -> Self {
        let videos = serde_json::from_value(json!([
            { "site": "YouTube", "type": "Featurette", "key": "bts" },
            { "site": "YouTube", "type": "Trailer", "key": key }
        ]))
        .expect("videos");
        self.videos.insert(movie_id, videos);
        self
    }

    pub fn with_flatrate(mut self, movie_id: i64, name: &str) -> Self {
        let providers = serde_json::from_value(json!({
            "results": { "US": { "flatrate": [{ "provider_name": name }] } }
        }))
        .expect("providers");
        self.providers.insert(movie_id, providers);
        self
    }

    pub fn with_certification(mut self, movie_id: i64, cert: &str) -> Self {
        let dates = serde_json::from_value(json!({
            "results": [{ "iso_3166_1": "US", "release_dates": [{ "certification": cert }] }]
        }))
        .expect("release dates");
        self.release_dates.insert(movie_id, dates);
        self
    }

    pub fn discover_call_count(&self) -> usize {
        self.discover_calls.lock().unwrap().len()
    }

    pub fn items(&self, list_id: i64) -> Vec<i64> {
        self.list_items
            .lock()
            .unwrap()
            .get(&list_id)
            .cloned()
            .unwrap_or_default()
    }
}

pub fn movie(id: i64, title: &str, genre_ids: &[i64]) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        overview: format!("{} overview", title),
        release_date: "2022-02-14".to_string(),
        vote_average: 7.4,
        vote_count: 512,
        genre_ids: genre_ids.to_vec(),
        adult: false,
        poster_path: Some(format!("/{}.jpg", id)),
    }
}

pub fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
