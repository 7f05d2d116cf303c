use std::collections::HashMap;

use crate::tmdb::Genre;

/// Genre id <-> name lookup, built once from the catalog's genre listing.
#[derive(Debug, Clone, Default)]
pub struct GenreTable {
    by_id: HashMap<i64, String>,
    by_name: HashMap<String, i64>,
}

impl GenreTable {
    pub fn new(genres: Vec<Genre>) -> Self {
        let mut by_id = HashMap::with_capacity(genres.len());
        let mut by_name = HashMap::with_capacity(genres.len());
        for genre in genres {
            by_name.insert(genre.name.to_lowercase(), genre.id);
            by_id.insert(genre.id, genre.name);
        }
        Self { by_id, by_name }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Case-insensitive; names the catalog doesn't know are dropped.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Vec<i64> {
        names
            .iter()
            .filter_map(|n| self.by_name.get(&n.as_ref().trim().to_lowercase()).copied())
            .collect()
    }

    pub fn names_for(&self, ids: &[i64]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.name(*id))
            .map(str::to_string)
            .collect()
    }
}

pub fn query_value(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
