//! Destinations and their lookup.
//!
//! A destination is addressed by block and lot. Two lookups are provided:
//!
//! - [`RestDestinationLookup`] - queries a PostgREST `locations` table whose
//!   rows carry a GeoJSON point in `coordinates`
//! - [`StaticDestinationTable`] - an in-memory table loaded from a JSON file,
//!   for offline use
//!
//! A lookup that finds nothing fails with [`LookupError::NotFound`]; it is
//! never retried automatically.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geo::Coordinate;
use crate::http::{AsyncHttpClient, HttpError};

/// Block and lot identifying a destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationId {
    pub block: String,
    pub lot: String,
}

impl DestinationId {
    /// Create an id. Surrounding whitespace is trimmed.
    pub fn new(block: impl AsRef<str>, lot: impl AsRef<str>) -> Self {
        Self {
            block: block.as_ref().trim().to_string(),
            lot: lot.as_ref().trim().to_string(),
        }
    }
}

impl std::fmt::Display for DestinationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Block {}, Lot {}", self.block, self.lot)
    }
}

/// A selected destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub coordinates: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Backend row the destination was built from, `Null` when none.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl Destination {
    pub fn new(id: DestinationId, coordinates: Coordinate) -> Self {
        Self {
            id,
            coordinates,
            label: None,
            metadata: Value::Null,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Errors from destination lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// No destination with this block and lot.
    #[error("{0} not found")]
    NotFound(DestinationId),

    /// The backend could not be reached or returned an error status.
    #[error("Destination lookup failed: {0}")]
    Http(String),

    /// The backend answered with something that is not a destination.
    #[error("Invalid destination data: {0}")]
    InvalidResponse(String),

    /// The destination table file could not be read.
    #[error("Failed to read destination table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<HttpError> for LookupError {
    fn from(e: HttpError) -> Self {
        Self::Http(e.to_string())
    }
}

/// Resolves a block/lot pair to a destination.
pub trait DestinationLookup: Send + Sync {
    fn lookup(
        &self,
        id: &DestinationId,
    ) -> impl Future<Output = Result<Destination, LookupError>> + Send;
}

/// Lookup against a PostgREST `locations` table.
///
/// # URL Pattern
///
/// `GET {base}/rest/v1/locations?block=eq.{block}&lot=eq.{lot}&select=*`
///
/// The key is sent both as `apikey` and as a bearer token.
pub struct RestDestinationLookup<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    api_key: String,
}

impl<C: AsyncHttpClient> RestDestinationLookup<C> {
    pub fn new(http_client: C, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn build_url(&self, id: &DestinationId) -> Result<String, LookupError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/rest/v1/locations", self.base_url),
            &[
                ("block", format!("eq.{}", id.block)),
                ("lot", format!("eq.{}", id.lot)),
                ("select", "*".to_string()),
            ],
        )
        .map_err(|e| LookupError::Http(format!("invalid backend URL '{}': {}", self.base_url, e)))?;
        Ok(url.to_string())
    }
}

impl<C: AsyncHttpClient> DestinationLookup for RestDestinationLookup<C> {
    async fn lookup(&self, id: &DestinationId) -> Result<Destination, LookupError> {
        let url = self.build_url(id)?;
        let bearer = format!("Bearer {}", self.api_key);
        let body = self
            .http_client
            .get_with_headers(
                &url,
                &[
                    ("apikey", self.api_key.as_str()),
                    ("Authorization", bearer.as_str()),
                    ("Accept", "application/json"),
                ],
            )
            .await?;

        let destination = parse_rows(id, &body)?;
        tracing::debug!(
            block = %id.block,
            lot = %id.lot,
            coordinates = %destination.coordinates,
            "Destination found"
        );
        Ok(destination)
    }
}

/// Parse a PostgREST response: an array of rows, the first one wins.
fn parse_rows(id: &DestinationId, body: &[u8]) -> Result<Destination, LookupError> {
    let rows: Vec<Value> = serde_json::from_slice(body)
        .map_err(|e| LookupError::InvalidResponse(format!("expected an array of rows: {}", e)))?;

    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| LookupError::NotFound(id.clone()))?;

    let pair = row
        .get("coordinates")
        .and_then(|c| c.get("coordinates"))
        .and_then(Value::as_array)
        .ok_or_else(|| LookupError::InvalidResponse("row has no point coordinates".to_string()))?;

    let (Some(longitude), Some(latitude)) = (
        pair.first().and_then(Value::as_f64),
        pair.get(1).and_then(Value::as_f64),
    ) else {
        return Err(LookupError::InvalidResponse(format!(
            "malformed point coordinates: {}",
            Value::Array(pair.clone())
        )));
    };

    let coordinates = Coordinate::new(longitude, latitude);
    if !coordinates.is_valid() {
        return Err(LookupError::InvalidResponse(format!(
            "point out of range: {}",
            coordinates
        )));
    }

    let label = ["label", "name"]
        .iter()
        .find_map(|key| row.get(*key).and_then(Value::as_str))
        .map(str::to_string);

    Ok(Destination {
        id: id.clone(),
        coordinates,
        label,
        metadata: row,
    })
}

/// Block or lot written either as a string or as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Label {
    Text(String),
    Number(serde_json::Number),
}

impl Label {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct TableEntry {
    block: Label,
    lot: Label,
    longitude: f64,
    latitude: f64,
    #[serde(default)]
    label: Option<String>,
}

/// In-memory destination table.
#[derive(Debug, Clone, Default)]
pub struct StaticDestinationTable {
    entries: HashMap<DestinationId, Destination>,
}

impl StaticDestinationTable {
    pub fn new(destinations: impl IntoIterator<Item = Destination>) -> Self {
        Self {
            entries: destinations
                .into_iter()
                .map(|d| (d.id.clone(), d))
                .collect(),
        }
    }

    /// Parse a JSON array of `{block, lot, longitude, latitude, label?}`.
    pub fn from_json(json: &str) -> Result<Self, LookupError> {
        let entries: Vec<TableEntry> = serde_json::from_str(json).map_err(|e| {
            LookupError::InvalidResponse(format!("invalid destination table: {}", e))
        })?;

        let mut destinations = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = DestinationId::new(entry.block.into_string(), entry.lot.into_string());
            let coordinates = Coordinate::new(entry.longitude, entry.latitude);
            if !coordinates.is_valid() {
                return Err(LookupError::InvalidResponse(format!(
                    "{} has invalid coordinates {}",
                    id, coordinates
                )));
            }
            destinations.push(Destination {
                id,
                coordinates,
                label: entry.label,
                metadata: Value::Null,
            });
        }

        Ok(Self::new(destinations))
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let json = std::fs::read_to_string(path).map_err(|source| LookupError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &DestinationId) -> Option<&Destination> {
        self.entries.get(id)
    }
}

impl DestinationLookup for StaticDestinationTable {
    async fn lookup(&self, id: &DestinationId) -> Result<Destination, LookupError> {
        self.get(id)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(id.clone()))
    }
}

/// A destination lookup of any supported kind.
pub enum DestinationSource<C: AsyncHttpClient> {
    Rest(RestDestinationLookup<C>),
    Static(StaticDestinationTable),
}

impl<C: AsyncHttpClient> DestinationLookup for DestinationSource<C> {
    async fn lookup(&self, id: &DestinationId) -> Result<Destination, LookupError> {
        match self {
            Self::Rest(l) => l.lookup(id).await,
            Self::Static(l) => l.lookup(id).await,
        }
    }
}
