use serde::{Deserialize, Serialize};

const TMDB_MOVIE_PAGE: &str = "https://www.themoviedb.org/movie";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl Movie {
    pub fn page_url(&self) -> String {
        movie_page_url(self.id)
    }
}

pub fn movie_page_url(id: i64) -> String {
    format!("{TMDB_MOVIE_PAGE}/{id}")
}

/// A candidate enriched with everything the front-ends print about it.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub movie: Movie,
    pub genres: Vec<String>,
    pub certification: Option<String>,
    pub streaming: String,
    pub runtime_minutes: Option<u32>,
    pub url: String,
}

impl Recommendation {
    /// Just what discovery returned, for when the per-movie lookups fail.
    pub fn bare(movie: Movie) -> Self {
        let url = movie.page_url();
        Self {
            movie,
            genres: Vec::new(),
            certification: None,
            streaming: String::new(),
            runtime_minutes: None,
            url,
        }
    }

    pub fn description(&self) -> &str {
        if self.movie.overview.trim().is_empty() {
            "No description available."
        } else {
            &self.movie.overview
        }
    }
}
