use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const CERTIFICATION_COUNTRY: &str = "US";

/// User preferences turned into `/discover/movie` query parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub min_votes: Option<u32>,
    pub release_date_min: Option<String>,
    pub original_language: Option<String>,
    pub min_rating: Option<f64>,
    pub us_certification: Option<String>,
    /// Each group becomes its own discovery query.
    pub genre_groups: Vec<Vec<String>>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_votes: Some(150),
            release_date_min: Some("2020-01-01".to_string()),
            original_language: Some("en".to_string()),
            min_rating: Some(7.0),
            us_certification: Some("R".to_string()),
            genre_groups: vec![vec!["Romance".to_string()]],
        }
    }
}

impl FilterCriteria {
    /// Criteria with nothing set; only the fixed discovery parameters apply.
    pub fn unfiltered() -> Self {
        Self {
            min_votes: None,
            release_date_min: None,
            original_language: None,
            min_rating: None,
            us_certification: None,
            genre_groups: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(date) = non_empty(&self.release_date_min) {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("release date '{}' is not YYYY-MM-DD", date))?;
        }
        Ok(())
    }

    pub fn base_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            param("include_adult", "true"),
            param("language", "en-US"),
            param("sort_by", "vote_average.desc"),
            param("page", "1"),
        ];

        if let Some(votes) = self.min_votes.filter(|v| *v > 0) {
            params.push(param("vote_count.gte", votes.to_string()));
        }
        if let Some(date) = non_empty(&self.release_date_min) {
            params.push(param("primary_release_date.gte", date));
        }
        if let Some(lang) = non_empty(&self.original_language) {
            params.push(param("with_original_language", lang));
        }
        if let Some(rating) = self.min_rating.filter(|r| *r > 0.0) {
            params.push(param("vote_average.gte", rating.to_string()));
        }
        if let Some(cert) = non_empty(&self.us_certification) {
            params.push(param("certification_country", CERTIFICATION_COUNTRY));
            params.push(param("region", "us"));
            params.push(param("certification.gte", cert));
        }
        params
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn param(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}
