//! Incident heatmap.
//!
//! Partitions a fixed campus box into a uniform lat/lng grid and scores each
//! cell centre by the incidents within a search radius. The scan is brute
//! force (cells × incidents), which is fine for a few hundred reports.

use crate::geo::{Bounds, CAMPUS_CENTER, haversine_m};
use crate::models::{Coordinate, Incident, IncidentSeverity, SafetyLevel, SafetyZone};

const BASE_ZONE_SCORE: i32 = 95;
const MIN_ZONE_SCORE: i32 = 30;
const PER_INCIDENT_PENALTY: i32 = 10;
/// Cells without incidents are only emitted below this score.
const SPARSE_SCORE_CUTOFF: i32 = 90;
/// Tolerance so a bound that is an exact multiple of the step is included.
const GRID_EPSILON: f64 = 1e-9;
/// Upper bound on cells along one grid axis.
pub const MAX_AXIS_CELLS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("grid step must be a positive finite number of degrees, got {0}")]
    InvalidStep(f64),
    #[error("grid bounds must be finite with south <= north and west <= east")]
    InvalidBounds,
    #[error("grid step {step} yields {cells} cells per axis, more than {MAX_AXIS_CELLS}")]
    TooManyCells { step: f64, cells: f64 },
}

/// Grid geometry for the heatmap scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub bounds: Bounds,
    pub step_deg: f64,
    pub search_radius_m: f64,
    pub zone_radius_m: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            bounds: Bounds {
                south: 12.985,
                north: 12.998,
                west: 80.228,
                east: 80.245,
            },
            step_deg: 0.002,
            search_radius_m: 300.0,
            zone_radius_m: 150.0,
        }
    }
}

impl GridSpec {
    fn axis_len(min: f64, max: f64, step: f64) -> Result<usize, GridError> {
        let span = max - min;
        if !span.is_finite() || span < 0.0 {
            return Err(GridError::InvalidBounds);
        }
        // counted in f64 so an oversized grid is rejected before any cast
        let cells = (span / step + GRID_EPSILON).floor() + 1.0;
        if !cells.is_finite() || cells > MAX_AXIS_CELLS as f64 {
            return Err(GridError::TooManyCells { step, cells });
        }
        Ok(cells as usize)
    }

    /// Rows and columns of the grid, or why the geometry is unusable.
    pub fn dimensions(&self) -> Result<(usize, usize), GridError> {
        let step = self.step_deg;
        if !(step.is_finite() && step > 0.0) {
            return Err(GridError::InvalidStep(step));
        }
        Ok((
            Self::axis_len(self.bounds.south, self.bounds.north, step)?,
            Self::axis_len(self.bounds.west, self.bounds.east, step)?,
        ))
    }

    /// Cell centres, row by row from the south-west corner.
    pub fn cells(&self) -> Result<impl Iterator<Item = Coordinate> + '_, GridError> {
        let (rows, cols) = self.dimensions()?;
        Ok(self.centres(rows, cols))
    }

    fn centres(&self, rows: usize, cols: usize) -> impl Iterator<Item = Coordinate> + '_ {
        let step = self.step_deg;
        (0..rows).flat_map(move |row| {
            let lat = self.bounds.south + row as f64 * step;
            (0..cols).map(move |col| Coordinate {
                lat,
                lng: self.bounds.west + col as f64 * step,
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellScore {
    pub incidents: usize,
    pub safety_score: i32,
    pub level: SafetyLevel,
}

pub fn severity_penalty(severity: IncidentSeverity) -> i32 {
    match severity {
        IncidentSeverity::Critical => 20,
        IncidentSeverity::High => 15,
        IncidentSeverity::Medium => 10,
        IncidentSeverity::Low => 5,
    }
}

pub fn classify(score: i32) -> SafetyLevel {
    if score < 60 {
        SafetyLevel::Low
    } else if score < 80 {
        SafetyLevel::Medium
    } else {
        SafetyLevel::High
    }
}

#[derive(Debug, Clone)]
pub struct SafetyZoneAggregator {
    grid: GridSpec,
    rows: usize,
    cols: usize,
}

impl Default for SafetyZoneAggregator {
    fn default() -> Self {
        // the campus grid is 7 x 9
        match Self::new(GridSpec::default()) {
            Ok(aggregator) => aggregator,
            Err(err) => unreachable!("campus grid: {err}"),
        }
    }
}

impl SafetyZoneAggregator {
    pub fn new(grid: GridSpec) -> Result<Self, GridError> {
        let (rows, cols) = grid.dimensions()?;
        Ok(Self { grid, rows, cols })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Scores one cell centre.
    ///
    /// Each nearby incident costs a flat 10 points plus its severity
    /// penalty; the result never drops below 30.
    pub fn score_cell(&self, center: Coordinate, incidents: &[Incident]) -> CellScore {
        let mut count = 0;
        let mut score = BASE_ZONE_SCORE;
        for incident in incidents {
            if haversine_m(center, incident.location) <= self.grid.search_radius_m {
                count += 1;
                score -= PER_INCIDENT_PENALTY + severity_penalty(incident.severity);
            }
        }
        let safety_score = score.max(MIN_ZONE_SCORE);
        CellScore {
            incidents: count,
            safety_score,
            level: classify(safety_score),
        }
    }

    /// Zones for every cell that has a nearby incident or scores below 90.
    pub fn generate_safety_zones(&self, incidents: &[Incident]) -> Vec<SafetyZone> {
        let zones: Vec<SafetyZone> = self
            .grid
            .centres(self.rows, self.cols)
            .filter_map(|center| {
                let cell = self.score_cell(center, incidents);
                if cell.incidents == 0 && cell.safety_score >= SPARSE_SCORE_CUTOFF {
                    return None;
                }
                Some(SafetyZone {
                    lat: center.lat,
                    lng: center.lng,
                    radius: self.grid.zone_radius_m,
                    color: cell.level.color().to_string(),
                    level: cell.level,
                    incidents: cell.incidents,
                    safety_score: cell.safety_score,
                })
            })
            .collect();

        tracing::debug!(
            "generated {} safety zones from {} incidents",
            zones.len(),
            incidents.len()
        );
        zones
    }
}

/// Shorthand for [`SafetyZoneAggregator::generate_safety_zones`] on the campus grid.
pub fn generate_safety_zones(incidents: &[Incident]) -> Vec<SafetyZone> {
    SafetyZoneAggregator::default().generate_safety_zones(incidents)
}

/// Point safety estimate used by the location badge in the map UI.
///
/// 95 minus 10 at night (22-5) or plus 5 early morning (6-8), minus 5 when
/// more than 1km from the campus centre, minus 3 per incident within 200m,
/// clamped to [60, 95].
pub fn location_safety_score(location: Coordinate, hour: u8, incidents: &[Incident]) -> i32 {
    let mut score = 95;

    if hour >= 22 || hour <= 5 {
        score -= 10;
    } else if (6..=8).contains(&hour) {
        score += 5;
    }

    if haversine_m(location, CAMPUS_CENTER) > 1000.0 {
        score -= 5;
    }

    let nearby = incidents
        .iter()
        .filter(|incident| haversine_m(location, incident.location) < 200.0)
        .count() as i32;
    score -= nearby * 3;

    score.clamp(60, 95)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{IncidentStatus, IncidentType};

    fn incident(location: Coordinate, severity: IncidentSeverity) -> Incident {
        Incident {
            id: format!("test-{}-{}", location.lat, location.lng),
            incident_type: IncidentType::Other,
            severity,
            location,
            description: "test".into(),
            timestamp: Utc::now(),
            anonymous: true,
            photos: Vec::new(),
            reporter_contact: None,
            status: IncidentStatus::Reported,
            admin_notes: None,
            resolved_at: None,
        }
    }

    fn nearest<'a>(zones: &'a [SafetyZone], to: Coordinate) -> &'a SafetyZone {
        zones
            .iter()
            .min_by(|a, b| {
                let da = haversine_m(Coordinate::new(a.lat, a.lng), to);
                let db = haversine_m(Coordinate::new(b.lat, b.lng), to);
                da.partial_cmp(&db).unwrap()
            })
            .unwrap()
    }

    #[test]
    fn default_grid_has_63_cells() {
        let grid = GridSpec::default();
        assert_eq!(grid.dimensions(), Ok((7, 9)));
        assert_eq!(grid.cells().unwrap().count(), 63);
        let first = grid.cells().unwrap().next().unwrap();
        assert_eq!(first, Coordinate::new(12.985, 80.228));
        let last = grid.cells().unwrap().last().unwrap();
        assert!((last.lat - 12.997).abs() < 1e-9);
        assert!((last.lng - 80.244).abs() < 1e-9);
    }

    #[test]
    fn unusable_steps_are_rejected() {
        for step in [0.0, -0.002, f64::NAN, f64::INFINITY] {
            let grid = GridSpec {
                step_deg: step,
                ..GridSpec::default()
            };
            assert!(matches!(grid.dimensions(), Err(GridError::InvalidStep(_))));
            assert!(grid.cells().is_err());
            assert!(SafetyZoneAggregator::new(grid).is_err());
        }
    }

    #[test]
    fn tiny_steps_exceed_the_axis_cap() {
        for step in [1e-320, 1e-9, 1e-6] {
            let grid = GridSpec {
                step_deg: step,
                ..GridSpec::default()
            };
            assert!(matches!(
                grid.dimensions(),
                Err(GridError::TooManyCells { .. })
            ));
            assert!(SafetyZoneAggregator::new(grid).is_err());
        }
        let fine = GridSpec {
            step_deg: 0.000_01,
            ..GridSpec::default()
        };
        let (rows, cols) = fine.dimensions().unwrap();
        assert!(rows > 1000 && cols > 1000);
        assert!(cols <= MAX_AXIS_CELLS);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let mut grid = GridSpec::default();
        grid.bounds.north = grid.bounds.south - 0.01;
        assert_eq!(grid.dimensions(), Err(GridError::InvalidBounds));
    }

    #[test]
    fn no_incidents_no_zones() {
        assert!(generate_safety_zones(&[]).is_empty());
    }

    #[test]
    fn single_critical_incident_at_center_is_medium() {
        let zones = generate_safety_zones(&[incident(CAMPUS_CENTER, IncidentSeverity::Critical)]);
        assert!(!zones.is_empty());
        let zone = nearest(&zones, CAMPUS_CENTER);
        // 95 - 10 - 20
        assert_eq!(zone.safety_score, 65);
        assert_eq!(zone.level, SafetyLevel::Medium);
        assert_eq!(zone.color, "#f59e0b");
        assert_eq!(zone.incidents, 1);
        assert_eq!(zone.radius, 150.0);
        assert!(zones.iter().all(|z| z.incidents == 1 && z.safety_score == 65));
    }

    #[test]
    fn severity_penalties_stack_and_clamp_at_30() {
        let aggregator = SafetyZoneAggregator::default();
        let center = Coordinate::new(12.991, 80.234);

        let low = aggregator.score_cell(center, &[incident(center, IncidentSeverity::Low)]);
        assert_eq!(low.safety_score, 80);
        assert_eq!(low.level, SafetyLevel::High);

        let two = aggregator.score_cell(
            center,
            &[
                incident(center, IncidentSeverity::High),
                incident(center, IncidentSeverity::Medium),
            ],
        );
        // 95 - 20 - 15 - 10
        assert_eq!(two.safety_score, 50);
        assert_eq!(two.level, SafetyLevel::Low);

        let many = vec![incident(center, IncidentSeverity::Critical); 3];
        let cell = aggregator.score_cell(center, &many);
        assert_eq!(cell.safety_score, 30);
        assert_eq!(cell.incidents, 3);
    }

    #[test]
    fn incidents_beyond_radius_are_ignored() {
        let aggregator = SafetyZoneAggregator::default();
        let center = Coordinate::new(12.991, 80.234);
        // ~330m north
        let far = Coordinate::new(12.994, 80.234);
        let cell = aggregator.score_cell(center, &[incident(far, IncidentSeverity::Critical)]);
        assert_eq!(cell.incidents, 0);
        assert_eq!(cell.safety_score, 95);
    }

    #[test]
    fn incidents_outside_box_produce_no_zones() {
        let zones = generate_safety_zones(&[incident(
            Coordinate::new(13.1, 80.5),
            IncidentSeverity::Critical,
        )]);
        assert!(zones.is_empty());
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(classify(59), SafetyLevel::Low);
        assert_eq!(classify(60), SafetyLevel::Medium);
        assert_eq!(classify(79), SafetyLevel::Medium);
        assert_eq!(classify(80), SafetyLevel::High);
    }

    #[test]
    fn location_score_adjustments() {
        assert_eq!(location_safety_score(CAMPUS_CENTER, 12, &[]), 95);
        assert_eq!(location_safety_score(CAMPUS_CENTER, 23, &[]), 85);
        // bonus is clamped back to 95
        assert_eq!(location_safety_score(CAMPUS_CENTER, 7, &[]), 95);

        let far = Coordinate::new(12.975, 80.2336832);
        assert_eq!(location_safety_score(far, 2, &[]), 80);

        let nearby = vec![incident(CAMPUS_CENTER, IncidentSeverity::Low); 4];
        assert_eq!(location_safety_score(CAMPUS_CENTER, 12, &nearby), 83);
        let crowded = vec![incident(CAMPUS_CENTER, IncidentSeverity::Low); 20];
        assert_eq!(location_safety_score(CAMPUS_CENTER, 12, &crowded), 60);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn severity() -> impl Strategy<Value = IncidentSeverity> {
            prop_oneof![
                Just(IncidentSeverity::Low),
                Just(IncidentSeverity::Medium),
                Just(IncidentSeverity::High),
                Just(IncidentSeverity::Critical),
            ]
        }

        fn campus_incident() -> impl Strategy<Value = Incident> {
            (12.98..13.0, 80.22..80.25, severity())
                .prop_map(|(lat, lng, sev)| incident(Coordinate { lat, lng }, sev))
        }

        proptest! {
            #[test]
            fn prop_zone_scores_in_range(incidents in prop::collection::vec(campus_incident(), 0..12)) {
                for zone in generate_safety_zones(&incidents) {
                    prop_assert!((30..=95).contains(&zone.safety_score));
                    prop_assert!(zone.incidents > 0 || zone.safety_score < 90);
                    prop_assert_eq!(zone.level, classify(zone.safety_score));
                }
            }

            #[test]
            fn prop_critical_incident_never_raises_scores(
                incidents in prop::collection::vec(campus_incident(), 0..8),
                lat in 12.98..13.0,
                lng in 80.22..80.25,
            ) {
                let aggregator = SafetyZoneAggregator::default();
                let location = Coordinate { lat, lng };
                let mut with_critical = incidents.clone();
                with_critical.push(incident(location, IncidentSeverity::Critical));

                for center in aggregator.grid().cells().unwrap() {
                    if haversine_m(center, location) > 300.0 {
                        continue;
                    }
                    let before = aggregator.score_cell(center, &incidents);
                    let after = aggregator.score_cell(center, &with_critical);
                    prop_assert!(after.safety_score <= before.safety_score);
                    prop_assert_eq!(after.incidents, before.incidents + 1);
                }
            }
        }
    }
}
