//! Access path selection for catalog searches.
//!
//! The catalog table carries one secondary index per searchable attribute.
//! A request is served by the first rule in [`INDEX_RULES`] that applies; only
//! requests that match none of them fall back to a full scan.

use super::error::CatalogError;
use crate::store::{AttributeValue, IndexDefinition, KeyCondition, ScanFilter};
use serde::Deserialize;
use tracing::debug;

/// Sparse search request. Blank strings count as absent; other values are
/// matched exactly, surrounding whitespace included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchCriteria {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i64>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

impl SearchCriteria {
    pub fn normalized(&self) -> Self {
        Self {
            title: non_empty(&self.title),
            artist: non_empty(&self.artist),
            album: non_empty(&self.album),
            year: self.year,
        }
    }

    pub fn is_empty(&self) -> bool {
        let normalized = self.normalized();
        normalized.title.is_none()
            && normalized.artist.is_none()
            && normalized.album.is_none()
            && normalized.year.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogIndex {
    Title,
    Artist,
    Album,
    Year,
}

impl CatalogIndex {
    pub const ALL: [CatalogIndex; 4] = [
        CatalogIndex::Title,
        CatalogIndex::Artist,
        CatalogIndex::Album,
        CatalogIndex::Year,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CatalogIndex::Title => "TitleIndex",
            CatalogIndex::Artist => "ArtistIndex",
            CatalogIndex::Album => "AlbumIndex",
            CatalogIndex::Year => "YearIndex",
        }
    }

    pub fn attribute(&self) -> &'static str {
        match self {
            CatalogIndex::Title => "title",
            CatalogIndex::Artist => "artist",
            CatalogIndex::Album => "album",
            CatalogIndex::Year => "year",
        }
    }

    /// Index definitions the key-value store must know about for `table`.
    pub fn definitions(table: &str) -> Vec<IndexDefinition> {
        Self::ALL
            .iter()
            .map(|index| IndexDefinition {
                table: table.to_string(),
                index: index.name().to_string(),
                attribute: index.attribute().to_string(),
            })
            .collect()
    }
}

/// The access path chosen for a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    ByTitle(String),
    ByArtist(String),
    ByAlbum(String),
    ByYear(i64),
    Scan(ScanFilter),
}

/// How a plan reaches the store.
#[derive(Debug, PartialEq, Eq)]
pub enum AccessPath<'a> {
    Index(CatalogIndex, KeyCondition),
    Scan(&'a ScanFilter),
}

impl QueryPlan {
    pub fn access_path(&self) -> AccessPath<'_> {
        let (index, value) = match self {
            QueryPlan::ByTitle(title) => (CatalogIndex::Title, AttributeValue::S(title.clone())),
            QueryPlan::ByArtist(artist) => {
                (CatalogIndex::Artist, AttributeValue::S(artist.clone()))
            }
            QueryPlan::ByAlbum(album) => (CatalogIndex::Album, AttributeValue::S(album.clone())),
            QueryPlan::ByYear(year) => (CatalogIndex::Year, AttributeValue::N(*year)),
            QueryPlan::Scan(filter) => return AccessPath::Scan(filter),
        };
        AccessPath::Index(
            index,
            KeyCondition {
                attribute: index.attribute().to_string(),
                value,
            },
        )
    }
}

struct IndexRule {
    name: &'static str,
    plan: fn(&SearchCriteria) -> Option<QueryPlan>,
}

fn title_with_artist(criteria: &SearchCriteria) -> Option<QueryPlan> {
    match (&criteria.title, &criteria.artist) {
        (Some(title), Some(_)) => Some(QueryPlan::ByTitle(title.clone())),
        _ => None,
    }
}

fn artist_only(criteria: &SearchCriteria) -> Option<QueryPlan> {
    criteria.artist.clone().map(QueryPlan::ByArtist)
}

fn album_only(criteria: &SearchCriteria) -> Option<QueryPlan> {
    criteria.album.clone().map(QueryPlan::ByAlbum)
}

fn year_only(criteria: &SearchCriteria) -> Option<QueryPlan> {
    criteria.year.map(QueryPlan::ByYear)
}

/// Evaluated in order, first match wins. Fields not used by the winning
/// rule are not applied.
const INDEX_RULES: [IndexRule; 4] = [
    IndexRule {
        name: "title+artist",
        plan: title_with_artist,
    },
    IndexRule {
        name: "artist",
        plan: artist_only,
    },
    IndexRule {
        name: "album",
        plan: album_only,
    },
    IndexRule {
        name: "year",
        plan: year_only,
    },
];

/// Equality conjunction over every present field.
fn scan_filter(criteria: &SearchCriteria) -> ScanFilter {
    let mut conditions = Vec::new();
    if let Some(title) = &criteria.title {
        conditions.push(("title".to_string(), AttributeValue::S(title.clone())));
    }
    if let Some(year) = criteria.year {
        conditions.push(("year".to_string(), AttributeValue::N(year)));
    }
    if let Some(artist) = &criteria.artist {
        conditions.push(("artist".to_string(), AttributeValue::S(artist.clone())));
    }
    if let Some(album) = &criteria.album {
        conditions.push(("album".to_string(), AttributeValue::S(album.clone())));
    }
    ScanFilter { conditions }
}

pub fn select(criteria: &SearchCriteria) -> Result<QueryPlan, CatalogError> {
    let criteria = criteria.normalized();
    if criteria.is_empty() {
        return Err(CatalogError::InvalidCriteria);
    }

    for rule in INDEX_RULES.iter() {
        if let Some(plan) = (rule.plan)(&criteria) {
            debug!("Search {:?} matched index rule '{}'", criteria, rule.name);
            return Ok(plan);
        }
    }

    debug!("Search {:?} matched no index rule, planning a scan", criteria);
    Ok(QueryPlan::Scan(scan_filter(&criteria)))
}
