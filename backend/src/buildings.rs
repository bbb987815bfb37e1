use std::io::Read;

use once_cell::sync::Lazy;

use crate::geo::haversine_m;
use crate::models::{Building, BuildingCategory, Coordinate};

const BUILDINGS_JSON: &str = include_str!("../data/buildings.json");
const POPULAR_MIN_SCORE: u8 = 90;
const POPULAR_LIMIT: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum BuildingsError {
    #[error("invalid building directory: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("building directory is empty")]
    Empty,
}

static CAMPUS_DIRECTORY: Lazy<BuildingDirectory> = Lazy::new(|| {
    BuildingDirectory::from_reader(BUILDINGS_JSON.as_bytes())
        .expect("embedded building directory is valid")
});

/// Static lookup table of campus buildings.
#[derive(Debug, Clone)]
pub struct BuildingDirectory {
    buildings: Vec<Building>,
}

impl BuildingDirectory {
    /// The directory compiled into the binary.
    pub fn campus() -> &'static BuildingDirectory {
        &CAMPUS_DIRECTORY
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, BuildingsError> {
        let buildings: Vec<Building> = serde_json::from_reader(reader)?;
        if buildings.is_empty() {
            return Err(BuildingsError::Empty);
        }
        Ok(Self { buildings })
    }

    pub fn all(&self) -> &[Building] {
        &self.buildings
    }

    /// Case-insensitive match on name, description or any facility.
    pub fn search(&self, query: &str, category: Option<BuildingCategory>) -> Vec<&Building> {
        let query = query.trim().to_lowercase();
        self.buildings
            .iter()
            .filter(|building| category.map_or(true, |c| building.category == c))
            .filter(|building| query.is_empty() || matches_query(building, &query))
            .collect()
    }

    pub fn by_id(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|building| building.id == id)
    }

    pub fn by_category(&self, category: BuildingCategory) -> Vec<&Building> {
        self.search("", Some(category))
    }

    /// Highest-rated buildings, best first.
    pub fn popular(&self) -> Vec<&Building> {
        let mut popular: Vec<&Building> = self
            .buildings
            .iter()
            .filter(|building| building.safety_score.unwrap_or(0) >= POPULAR_MIN_SCORE)
            .collect();
        popular.sort_by(|a, b| b.safety_score.cmp(&a.safety_score));
        popular.truncate(POPULAR_LIMIT);
        popular
    }

    pub fn nearby(&self, location: Coordinate, radius_m: f64) -> Vec<&Building> {
        self.buildings
            .iter()
            .filter(|building| haversine_m(location, building.coordinates) <= radius_m)
            .collect()
    }
}

fn matches_query(building: &Building, query: &str) -> bool {
    building.name.to_lowercase().contains(query)
        || building
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(query))
        || building
            .facilities
            .iter()
            .any(|facility| facility.to_lowercase().contains(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{CAMPUS_CENTER, MAIN_GATE};

    fn directory() -> &'static BuildingDirectory {
        BuildingDirectory::campus()
    }

    #[test]
    fn embedded_directory_loads() {
        assert!(directory().all().len() > 40);
        let gate = directory().by_id("main-gate").expect("main gate");
        assert_eq!(gate.coordinates, MAIN_GATE);
        assert_eq!(gate.category, BuildingCategory::Gate);
    }

    #[test]
    fn empty_query_returns_everything() {
        assert_eq!(directory().search("  ", None).len(), directory().all().len());
    }

    #[test]
    fn search_matches_name_and_facilities() {
        let by_name = directory().search("main gate", None);
        assert_eq!(by_name.first().map(|b| b.id.as_str()), Some("main-gate"));

        let by_facility = directory().search("visitor registration", None);
        assert!(by_facility.iter().any(|b| b.id == "main-gate"));
    }

    #[test]
    fn category_filter_applies_with_query() {
        let gates = directory().by_category(BuildingCategory::Gate);
        assert_eq!(gates.len(), 4);
        let academic = directory().search("gate", Some(BuildingCategory::Academic));
        assert!(academic
            .iter()
            .all(|b| b.category == BuildingCategory::Academic));
    }

    #[test]
    fn popular_is_sorted_and_limited() {
        let popular = directory().popular();
        assert!(popular.len() <= 8);
        assert!(popular.windows(2).all(|w| w[0].safety_score >= w[1].safety_score));
        assert!(popular.iter().all(|b| b.safety_score.unwrap_or(0) >= 90));
    }

    #[test]
    fn nearby_includes_center_building() {
        let nearby = directory().nearby(CAMPUS_CENTER, 50.0);
        assert!(nearby.iter().any(|b| b.id == "main-building"));
    }

    #[test]
    fn rejects_empty_directory() {
        assert!(matches!(
            BuildingDirectory::from_reader("[]".as_bytes()),
            Err(BuildingsError::Empty)
        ));
    }
}
