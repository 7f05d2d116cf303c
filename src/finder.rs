use anyhow::{Context, Result};
use rand::seq::IteratorRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::filters::FilterCriteria;
use crate::genres::{self, GenreTable};
use crate::models::{Movie, Recommendation};
use crate::tmdb::{self, CatalogApi};

#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    #[error("No account list named '{0}'")]
    ListNotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionList {
    Watched,
    NeverWatch,
}

impl fmt::Display for ExclusionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionList::Watched => f.write_str("watched"),
            ExclusionList::NeverWatch => f.write_str("never watch"),
        }
    }
}

/// Remote names of the two exclusion lists on the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNames {
    pub watched: String,
    pub neverwatch: String,
}

impl Default for ListNames {
    fn default() -> Self {
        Self {
            watched: "Watched".to_string(),
            neverwatch: "NeverWatch".to_string(),
        }
    }
}

impl ListNames {
    pub fn name(&self, list: ExclusionList) -> &str {
        match list {
            ExclusionList::Watched => &self.watched,
            ExclusionList::NeverWatch => &self.neverwatch,
        }
    }
}

/// Id-keyed candidates for one discovery. Inserting an id that is already
/// present replaces the earlier movie.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    movies: BTreeMap<i64, Movie>,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.movies.contains_key(&id)
    }

    pub fn get(&self, id: i64) -> Option<&Movie> {
        self.movies.get(&id)
    }

    pub fn insert(&mut self, movie: Movie) -> Option<Movie> {
        self.movies.insert(movie.id, movie)
    }

    pub fn remove(&mut self, id: i64) -> Option<Movie> {
        self.movies.remove(&id)
    }

    pub fn retain<F: FnMut(i64) -> bool>(&mut self, mut keep: F) {
        self.movies.retain(|id, _| keep(*id));
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Movie> {
        self.movies.values().choose(rng)
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.movies.keys().copied()
    }

    pub fn into_vec(self) -> Vec<Movie> {
        self.movies.into_values().collect()
    }
}

impl Extend<Movie> for CandidateSet {
    fn extend<I: IntoIterator<Item = Movie>>(&mut self, iter: I) {
        for movie in iter {
            self.insert(movie);
        }
    }
}

impl FromIterator<Movie> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Movie>>(iter: I) -> Self {
        let mut set = CandidateSet::default();
        set.extend(iter);
        set
    }
}

pub struct MovieFinder {
    catalog: Arc<dyn CatalogApi>,
    genres: OnceCell<GenreTable>,
    lists: ListNames,
}

impl MovieFinder {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self::with_list_names(catalog, ListNames::default())
    }

    pub fn with_list_names(catalog: Arc<dyn CatalogApi>, lists: ListNames) -> Self {
        Self {
            catalog,
            genres: OnceCell::new(),
            lists,
        }
    }

    pub fn list_names(&self) -> &ListNames {
        &self.lists
    }

    /// Fetched on first use and kept for the finder's lifetime.
    pub async fn genre_table(&self) -> Result<&GenreTable> {
        self.genres
            .get_or_try_init(|| async {
                let genres = self
                    .catalog
                    .genres()
                    .await
                    .context("Failed to fetch genre list")?;
                info!("Loaded {} genres", genres.len());
                Ok::<_, anyhow::Error>(GenreTable::new(genres))
            })
            .await
    }

    pub async fn genre_ids<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<i64>> {
        Ok(self.genre_table().await?.resolve(names))
    }

    /// One query per genre group, or a single query when there are none.
    /// Results from every query accumulate into one set.
    pub async fn discover(&self, criteria: &FilterCriteria) -> Result<CandidateSet> {
        criteria.validate()?;
        let base = criteria.base_params();
        let mut movies = CandidateSet::default();

        if criteria.genre_groups.is_empty() {
            let found = self
                .catalog
                .discover(&base)
                .await
                .context("Discovery query failed")?;
            movies.extend(found);
        } else {
            let table = self.genre_table().await?;
            for group in &criteria.genre_groups {
                let ids = table.resolve(group.as_slice());
                let mut params = base.clone();
                if ids.is_empty() {
                    warn!("No known genres in group {:?}, querying without genre filter", group);
                } else {
                    params.push(("with_genres".to_string(), genres::query_value(&ids)));
                }
                let found = self
                    .catalog
                    .discover(&params)
                    .await
                    .with_context(|| format!("Discovery query failed for genres {:?}", group))?;
                debug!("Genre group {:?} returned {} movies", group, found.len());
                movies.extend(found);
            }
        }

        info!("Discovery returned {} movies", movies.len());
        Ok(movies)
    }

    /// Discovery minus everything on the Watched and NeverWatch lists.
    pub async fn discover_new(&self, criteria: &FilterCriteria) -> Result<CandidateSet> {
        let mut movies = self.discover(criteria).await?;
        let watched = self.exclusion_ids(ExclusionList::Watched).await?;
        let neverwatch = self.exclusion_ids(ExclusionList::NeverWatch).await?;

        let before = movies.len();
        movies.retain(|id| !watched.contains(&id) && !neverwatch.contains(&id));
        info!(
            "{} new movies after excluding {} already handled",
            movies.len(),
            before - movies.len()
        );
        Ok(movies)
    }

    pub async fn resolve_list_id(&self, name: &str) -> Result<Option<i64>> {
        let lists = self
            .catalog
            .account_lists()
            .await
            .context("Failed to fetch account lists")?;
        Ok(lists.into_iter().find(|l| l.name == name).map(|l| l.id))
    }

    /// A list missing from the account excludes nothing.
    pub async fn exclusion_ids(&self, list: ExclusionList) -> Result<HashSet<i64>> {
        let name = self.lists.name(list);
        let Some(list_id) = self.resolve_list_id(name).await? else {
            warn!("Account has no list named '{}', nothing excluded", name);
            return Ok(HashSet::new());
        };
        let items = self
            .catalog
            .list_items(list_id)
            .await
            .with_context(|| format!("Failed to fetch items of list '{}'", name))?;
        Ok(items.into_iter().map(|i| i.id).collect())
    }

    pub async fn mark(&self, list: ExclusionList, movie_id: i64) -> Result<()> {
        let name = self.lists.name(list);
        let list_id = self
            .resolve_list_id(name)
            .await?
            .ok_or_else(|| FinderError::ListNotFound(name.to_string()))?;
        self.catalog
            .add_list_item(list_id, movie_id)
            .await
            .with_context(|| format!("Failed to add movie {} to list '{}'", movie_id, name))?;
        info!("Marked movie {} as {}", movie_id, list);
        Ok(())
    }

    pub async fn certification(&self, movie_id: i64) -> Result<Option<String>> {
        let dates = self
            .catalog
            .release_dates(movie_id)
            .await
            .context("Failed to fetch release dates")?;
        Ok(tmdb::us_certification(&dates))
    }

    pub async fn trailer_url(&self, movie_id: i64) -> Result<Option<String>> {
        let videos = self
            .catalog
            .videos(movie_id)
            .await
            .context("Failed to fetch videos")?;
        Ok(tmdb::select_trailer(&videos))
    }

    pub async fn streaming_info(&self, movie_id: i64) -> Result<String> {
        let providers = self
            .catalog
            .watch_providers(movie_id)
            .await
            .context("Failed to fetch watch providers")?;
        Ok(tmdb::streaming_summary(&providers))
    }

    pub async fn recommendation(&self, movie: &Movie) -> Result<Recommendation> {
        let genres = self.genre_table().await?.names_for(&movie.genre_ids);
        let certification = self.certification(movie.id).await?;
        let streaming = self.streaming_info(movie.id).await?;
        let runtime_minutes = match self.catalog.movie_details(movie.id).await {
            Ok(detail) => detail.runtime.filter(|r| *r > 0),
            Err(e) => {
                warn!("Failed to fetch details for movie {}: {}", movie.id, e);
                None
            }
        };

        Ok(Recommendation {
            movie: movie.clone(),
            genres,
            certification,
            streaming,
            runtime_minutes,
            url: movie.page_url(),
        })
    }
}
