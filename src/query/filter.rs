//! Per-collection filter predicates
//!
//! Each collection has a filter struct with one optional [`Matcher`] per
//! filterable field. An absent matcher always matches and present matchers
//! are combined with logical AND, so the default filter matches everything.

use crate::{HolonetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use swapi::{Character, Film, Planet, Resource, Species, Starship, Vehicle};

/// Condition on a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    /// Case-insensitive substring match
    Contains(String),
    /// Exact numeric equality
    Equals(i64),
}

impl Matcher {
    pub fn contains(needle: impl Into<String>) -> Self {
        Matcher::Contains(needle.into())
    }

    pub fn matches_text(&self, value: &str) -> bool {
        match self {
            Matcher::Contains(needle) => value.to_lowercase().contains(&needle.to_lowercase()),
            Matcher::Equals(expected) => value.trim().parse::<i64>().ok() == Some(*expected),
        }
    }

    pub fn matches_number(&self, value: i64) -> bool {
        match self {
            Matcher::Equals(expected) => value == *expected,
            Matcher::Contains(needle) => value.to_string().contains(needle.trim()),
        }
    }
}

fn text(matcher: &Option<Matcher>, value: &str) -> bool {
    matcher.as_ref().map_or(true, |m| m.matches_text(value))
}

fn number(matcher: &Option<Matcher>, value: i64) -> bool {
    matcher.as_ref().map_or(true, |m| m.matches_number(value))
}

fn parse_number(field: &str, value: &str) -> Result<Matcher> {
    value
        .trim()
        .parse::<i64>()
        .map(Matcher::Equals)
        .map_err(|_| {
            HolonetError::InvalidArgument(format!(
                "filter field '{}' expects an integer, got '{}'",
                field, value
            ))
        })
}

fn unknown_field(field: &str, known: &[&str]) -> HolonetError {
    HolonetError::InvalidArgument(format!(
        "unknown filter field '{}' (expected one of: {})",
        field,
        known.join(", ")
    ))
}

/// A predicate over entities of type `T`
pub trait Predicate<T> {
    fn matches(&self, item: &T) -> bool;
}

/// A filter that can be assembled from `field=value` pairs
pub trait FieldFilter: Default + Sized {
    /// Filterable field names, in declaration order
    const FIELDS: &'static [&'static str];

    /// Set one field from its textual value
    fn set_field(&mut self, field: &str, value: &str) -> Result<()>;

    /// Whether no matcher is present
    fn is_empty(&self) -> bool;

    /// Build a filter from `(field, value)` pairs; later pairs win
    fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::default();
        for (field, value) in pairs {
            filter.set_field(field.as_ref().trim(), value.as_ref())?;
        }
        Ok(filter)
    }
}

/// An entity type with a filter
pub trait Queryable: Resource {
    type Filter: FieldFilter + Predicate<Self> + Debug + Clone + Send + Sync;
}

/// Film filter: title, episode_id, director
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilmFilter {
    pub title: Option<Matcher>,
    pub episode_id: Option<Matcher>,
    pub director: Option<Matcher>,
}

impl Predicate<Film> for FilmFilter {
    fn matches(&self, film: &Film) -> bool {
        text(&self.title, &film.title)
            && number(&self.episode_id, film.episode_id)
            && text(&self.director, &film.director)
    }
}

impl FieldFilter for FilmFilter {
    const FIELDS: &'static [&'static str] = &["title", "episode_id", "director"];

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            "title" => self.title = Some(Matcher::contains(value)),
            "episode_id" => self.episode_id = Some(parse_number(field, value)?),
            "director" => self.director = Some(Matcher::contains(value)),
            _ => return Err(unknown_field(field, Self::FIELDS)),
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.title.is_none() && self.episode_id.is_none() && self.director.is_none()
    }
}

impl Queryable for Film {
    type Filter = FilmFilter;
}

/// Character filter: name, gender, birth_year
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterFilter {
    pub name: Option<Matcher>,
    pub gender: Option<Matcher>,
    pub birth_year: Option<Matcher>,
}

impl Predicate<Character> for CharacterFilter {
    fn matches(&self, person: &Character) -> bool {
        text(&self.name, &person.name)
            && text(&self.gender, &person.gender)
            && text(&self.birth_year, &person.birth_year)
    }
}

impl FieldFilter for CharacterFilter {
    const FIELDS: &'static [&'static str] = &["name", "gender", "birth_year"];

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let matcher = Some(Matcher::contains(value));
        match field {
            "name" => self.name = matcher,
            "gender" => self.gender = matcher,
            "birth_year" => self.birth_year = matcher,
            _ => return Err(unknown_field(field, Self::FIELDS)),
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.gender.is_none() && self.birth_year.is_none()
    }
}

impl Queryable for Character {
    type Filter = CharacterFilter;
}

/// Planet filter: name, climate, terrain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanetFilter {
    pub name: Option<Matcher>,
    pub climate: Option<Matcher>,
    pub terrain: Option<Matcher>,
}

impl Predicate<Planet> for PlanetFilter {
    fn matches(&self, planet: &Planet) -> bool {
        text(&self.name, &planet.name)
            && text(&self.climate, &planet.climate)
            && text(&self.terrain, &planet.terrain)
    }
}

impl FieldFilter for PlanetFilter {
    const FIELDS: &'static [&'static str] = &["name", "climate", "terrain"];

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let matcher = Some(Matcher::contains(value));
        match field {
            "name" => self.name = matcher,
            "climate" => self.climate = matcher,
            "terrain" => self.terrain = matcher,
            _ => return Err(unknown_field(field, Self::FIELDS)),
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.climate.is_none() && self.terrain.is_none()
    }
}

impl Queryable for Planet {
    type Filter = PlanetFilter;
}

/// Species filter: name, classification, language
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesFilter {
    pub name: Option<Matcher>,
    pub classification: Option<Matcher>,
    pub language: Option<Matcher>,
}

impl Predicate<Species> for SpeciesFilter {
    fn matches(&self, species: &Species) -> bool {
        text(&self.name, &species.name)
            && text(&self.classification, &species.classification)
            && text(&self.language, &species.language)
    }
}

impl FieldFilter for SpeciesFilter {
    const FIELDS: &'static [&'static str] = &["name", "classification", "language"];

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let matcher = Some(Matcher::contains(value));
        match field {
            "name" => self.name = matcher,
            "classification" => self.classification = matcher,
            "language" => self.language = matcher,
            _ => return Err(unknown_field(field, Self::FIELDS)),
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.classification.is_none() && self.language.is_none()
    }
}

impl Queryable for Species {
    type Filter = SpeciesFilter;
}

/// Starship filter: name, model, starship_class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StarshipFilter {
    pub name: Option<Matcher>,
    pub model: Option<Matcher>,
    pub starship_class: Option<Matcher>,
}

impl Predicate<Starship> for StarshipFilter {
    fn matches(&self, ship: &Starship) -> bool {
        text(&self.name, &ship.name)
            && text(&self.model, &ship.model)
            && text(&self.starship_class, &ship.starship_class)
    }
}

impl FieldFilter for StarshipFilter {
    const FIELDS: &'static [&'static str] = &["name", "model", "starship_class"];

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let matcher = Some(Matcher::contains(value));
        match field {
            "name" => self.name = matcher,
            "model" => self.model = matcher,
            "starship_class" => self.starship_class = matcher,
            _ => return Err(unknown_field(field, Self::FIELDS)),
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.model.is_none() && self.starship_class.is_none()
    }
}

impl Queryable for Starship {
    type Filter = StarshipFilter;
}

/// Vehicle filter: name, model, manufacturer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleFilter {
    pub name: Option<Matcher>,
    pub model: Option<Matcher>,
    pub manufacturer: Option<Matcher>,
}

impl Predicate<Vehicle> for VehicleFilter {
    fn matches(&self, vehicle: &Vehicle) -> bool {
        text(&self.name, &vehicle.name)
            && text(&self.model, &vehicle.model)
            && text(&self.manufacturer, &vehicle.manufacturer)
    }
}

impl FieldFilter for VehicleFilter {
    const FIELDS: &'static [&'static str] = &["name", "model", "manufacturer"];

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let matcher = Some(Matcher::contains(value));
        match field {
            "name" => self.name = matcher,
            "model" => self.model = matcher,
            "manufacturer" => self.manufacturer = matcher,
            _ => return Err(unknown_field(field, Self::FIELDS)),
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.model.is_none() && self.manufacturer.is_none()
    }
}

impl Queryable for Vehicle {
    type Filter = VehicleFilter;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film(title: &str, episode_id: i64, director: &str) -> Film {
        serde_json::from_value(serde_json::json!({
            "title": title,
            "episode_id": episode_id,
            "director": director,
            "url": format!("https://swapi.dev/api/films/{}/", episode_id),
        }))
        .unwrap()
    }

    #[test]
    fn test_matcher_contains_is_case_insensitive() {
        let m = Matcher::contains("HOPE");
        assert!(m.matches_text("A New Hope"));
        assert!(!m.matches_text("Return of the Jedi"));
    }

    #[test]
    fn test_matcher_equals() {
        let m = Matcher::Equals(4);
        assert!(m.matches_number(4));
        assert!(!m.matches_number(5));
        assert!(m.matches_text(" 4 "));
        assert!(!m.matches_text("unknown"));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = FilmFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&film("A New Hope", 4, "George Lucas")));
    }

    #[test]
    fn test_filter_is_conjunction() {
        let filter = FilmFilter {
            director: Some(Matcher::contains("lucas")),
            episode_id: Some(Matcher::Equals(4)),
            ..Default::default()
        };

        assert!(filter.matches(&film("A New Hope", 4, "George Lucas")));
        assert!(!filter.matches(&film("The Phantom Menace", 1, "George Lucas")));
        assert!(!filter.matches(&film("The Empire Strikes Back", 4, "Irvin Kershner")));
    }

    #[test]
    fn test_from_pairs() {
        let filter = FilmFilter::from_pairs([("title", "empire"), ("episode_id", "5")]).unwrap();
        assert_eq!(filter.title, Some(Matcher::contains("empire")));
        assert_eq!(filter.episode_id, Some(Matcher::Equals(5)));
        assert!(filter.director.is_none());
    }

    #[test]
    fn test_from_pairs_rejects_unknown_field() {
        let err = PlanetFilter::from_pairs([("population", "1000")]).unwrap_err();
        assert!(matches!(err, HolonetError::InvalidArgument(msg) if msg.contains("climate")));
    }

    #[test]
    fn test_from_pairs_rejects_bad_number() {
        let err = FilmFilter::from_pairs([("episode_id", "four")]).unwrap_err();
        assert!(matches!(err, HolonetError::InvalidArgument(_)));
    }

    #[test]
    fn test_starship_filter() {
        let ship: Starship = serde_json::from_value(serde_json::json!({
            "name": "Millennium Falcon",
            "model": "YT-1300 light freighter",
            "starship_class": "Light freighter",
            "url": "https://swapi.dev/api/starships/10/",
        }))
        .unwrap();

        let filter = StarshipFilter::from_pairs([("starship_class", "freighter")]).unwrap();
        assert!(filter.matches(&ship));

        let filter = StarshipFilter::from_pairs([("name", "x-wing")]).unwrap();
        assert!(!filter.matches(&ship));
    }
}
