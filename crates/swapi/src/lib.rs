//! Typed data model for the Star Wars API (SWAPI)
//!
//! SWAPI exposes six read-only collections (`films`, `people`, `planets`,
//! `species`, `starships`, `vehicles`). Every list endpoint returns the same
//! paginated envelope and every entity carries its canonical URL, from which
//! a stable id can be extracted.
//!
//! # Example
//!
//! ```
//! use swapi::{Collection, Envelope, Film, Resource};
//!
//! let raw = r#"{
//!     "count": 1,
//!     "next": null,
//!     "previous": null,
//!     "results": [{
//!         "title": "A New Hope",
//!         "episode_id": 4,
//!         "opening_crawl": "It is a period of civil war.",
//!         "director": "George Lucas",
//!         "url": "https://swapi.dev/api/films/1/"
//!     }]
//! }"#;
//!
//! let page: Envelope<Film> = serde_json::from_str(raw)?;
//! assert!(page.is_last());
//! assert_eq!(page.results[0].id(), Some("1"));
//! assert_eq!(Film::COLLECTION, Collection::Films);
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors produced by the SWAPI model
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for SWAPI model operations
pub type Result<T> = std::result::Result<T, Error>;

/// A named upstream resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Films,
    People,
    Planets,
    Species,
    Starships,
    Vehicles,
}

impl Collection {
    /// All known collections, in a stable order
    pub const ALL: [Collection; 6] = [
        Collection::Films,
        Collection::People,
        Collection::Planets,
        Collection::Species,
        Collection::Starships,
        Collection::Vehicles,
    ];

    /// Upstream path segment, also used as the cache key prefix
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Films => "films",
            Collection::People => "people",
            Collection::Planets => "planets",
            Collection::Species => "species",
            Collection::Starships => "starships",
            Collection::Vehicles => "vehicles",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "films" | "film" => Ok(Collection::Films),
            "people" | "characters" | "character" => Ok(Collection::People),
            "planets" | "planet" => Ok(Collection::Planets),
            "species" => Ok(Collection::Species),
            "starships" | "starship" => Ok(Collection::Starships),
            "vehicles" | "vehicle" => Ok(Collection::Vehicles),
            _ => Err(Error::UnknownCollection(s.to_string())),
        }
    }
}

/// Paginated list response returned by every SWAPI list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Total number of items across all pages
    pub count: u64,
    /// URL of the successor page, `None` on the last page
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the predecessor page, `None` on the first page
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Envelope<T> {
    /// Whether this is the terminal page
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

impl Envelope<serde_json::Value> {
    /// Decode the raw results into a typed envelope
    pub fn decode<T: DeserializeOwned>(self) -> Result<Envelope<T>> {
        let results = self
            .results
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()?;

        Ok(Envelope {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results,
        })
    }
}

/// Extract an entity id from its canonical URL
///
/// The id is the last non-empty path segment:
/// `https://swapi.dev/api/people/1/` yields `"1"`.
pub fn id_from_url(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
}

/// An entity type that lives in a specific collection
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The collection this entity is listed under
    const COLLECTION: Collection;

    /// Canonical URL of this entity
    fn url(&self) -> &str;

    /// Human readable name (title for films)
    fn label(&self) -> &str;

    /// Stable id extracted from the canonical URL
    fn id(&self) -> Option<&str> {
        id_from_url(self.url())
    }
}

/// A Star Wars film
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub title: String,
    pub episode_id: i64,
    #[serde(default)]
    pub opening_crawl: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub producer: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub planets: Vec<String>,
    #[serde(default)]
    pub starships: Vec<String>,
    #[serde(default)]
    pub vehicles: Vec<String>,
    #[serde(default)]
    pub species: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub edited: Option<String>,
}

/// A person (character)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub mass: String,
    #[serde(default)]
    pub hair_color: String,
    #[serde(default)]
    pub skin_color: String,
    #[serde(default)]
    pub eye_color: String,
    #[serde(default)]
    pub birth_year: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub homeworld: Option<String>,
    #[serde(default)]
    pub films: Vec<String>,
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub vehicles: Vec<String>,
    #[serde(default)]
    pub starships: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub edited: Option<String>,
}

/// A planet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    #[serde(default)]
    pub rotation_period: String,
    #[serde(default)]
    pub orbital_period: String,
    #[serde(default)]
    pub diameter: String,
    #[serde(default)]
    pub climate: String,
    #[serde(default)]
    pub gravity: String,
    #[serde(default)]
    pub terrain: String,
    #[serde(default)]
    pub surface_water: String,
    #[serde(default)]
    pub population: String,
    #[serde(default)]
    pub residents: Vec<String>,
    #[serde(default)]
    pub films: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub edited: Option<String>,
}

/// A species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    #[serde(default)]
    pub classification: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub average_height: String,
    #[serde(default)]
    pub average_lifespan: String,
    #[serde(default)]
    pub eye_colors: String,
    #[serde(default)]
    pub hair_colors: String,
    #[serde(default)]
    pub skin_colors: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub homeworld: Option<String>,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub films: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub edited: Option<String>,
}

/// A starship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Starship {
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub cost_in_credits: String,
    #[serde(default)]
    pub length: String,
    #[serde(default)]
    pub max_atmosphering_speed: String,
    #[serde(default)]
    pub crew: String,
    #[serde(default)]
    pub passengers: String,
    #[serde(default)]
    pub cargo_capacity: String,
    #[serde(default)]
    pub consumables: String,
    #[serde(default)]
    pub hyperdrive_rating: String,
    #[serde(default, rename = "MGLT")]
    pub mglt: String,
    #[serde(default)]
    pub starship_class: String,
    #[serde(default)]
    pub pilots: Vec<String>,
    #[serde(default)]
    pub films: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub edited: Option<String>,
}

/// A vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub cost_in_credits: String,
    #[serde(default)]
    pub length: String,
    #[serde(default)]
    pub max_atmosphering_speed: String,
    #[serde(default)]
    pub crew: String,
    #[serde(default)]
    pub passengers: String,
    #[serde(default)]
    pub cargo_capacity: String,
    #[serde(default)]
    pub consumables: String,
    #[serde(default)]
    pub vehicle_class: String,
    #[serde(default)]
    pub pilots: Vec<String>,
    #[serde(default)]
    pub films: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub edited: Option<String>,
}

impl Resource for Film {
    const COLLECTION: Collection = Collection::Films;

    fn url(&self) -> &str {
        &self.url
    }

    fn label(&self) -> &str {
        &self.title
    }
}

impl Resource for Character {
    const COLLECTION: Collection = Collection::People;

    fn url(&self) -> &str {
        &self.url
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl Resource for Planet {
    const COLLECTION: Collection = Collection::Planets;

    fn url(&self) -> &str {
        &self.url
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl Resource for Species {
    const COLLECTION: Collection = Collection::Species;

    fn url(&self) -> &str {
        &self.url
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl Resource for Starship {
    const COLLECTION: Collection = Collection::Starships;

    fn url(&self) -> &str {
        &self.url
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl Resource for Vehicle {
    const COLLECTION: Collection = Collection::Vehicles;

    fn url(&self) -> &str {
        &self.url
    }

    fn label(&self) -> &str {
        &self.name
    }
}
