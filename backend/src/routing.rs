use chrono::{Local, Timelike, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::geo::{Heading, haversine_m};
use crate::models::{Coordinate, Route, RouteOptions, RoutePoint, RouteType, WeatherCondition};

const BASE_SAFETY_SCORE: i32 = 87;
const MIN_SAFETY_SCORE: i32 = 60;
const MAX_SAFETY_SCORE: i32 = 95;
const NIGHT_PENALTY: i32 = 8;
const EARLY_MORNING_BONUS: i32 = 3;
const RAIN_PENALTY: i32 = 5;
const LONG_ROUTE_PENALTY: i32 = 3;
const LONG_ROUTE_M: u32 = 1500;

/// Separation (degrees, either axis) above which the base path gets a midpoint.
const MIDPOINT_THRESHOLD_DEG: f64 = 0.005;
const MIDPOINT_JITTER_DEG: f64 = 0.001;
/// Walking speed used for per-leg durations, whatever the variant.
const LEG_SPEED_MPS: f64 = 1.4;

const START_INSTRUCTION: &str = "Start your journey";
const MIDPOINT_INSTRUCTION: &str = "Continue straight on main pathway";
const ARRIVAL_INSTRUCTION: &str = "You have arrived at your destination";

/// How a variant bends, stretches and rescores the base path.
struct VariantProfile {
    name: &'static str,
    /// Full width of the uniform jitter window per axis, in degrees.
    jitter_deg: f64,
    distance_multiplier: f64,
    speed_mps: f64,
    score_bonus: i32,
    instruction_suffix: Option<&'static str>,
    highlights: [&'static str; 3],
}

fn profile(route_type: RouteType) -> &'static VariantProfile {
    const SHORTEST: VariantProfile = VariantProfile {
        name: "Shortest Route",
        jitter_deg: 0.0,
        distance_multiplier: 1.0,
        speed_mps: 1.4,
        score_bonus: 0,
        instruction_suffix: None,
        highlights: ["Fastest route", "Direct path", "Minimal detours"],
    };
    const SAFEST: VariantProfile = VariantProfile {
        name: "Safest Route",
        jitter_deg: 0.0005,
        distance_multiplier: 1.15,
        speed_mps: 1.3,
        score_bonus: 8,
        instruction_suffix: Some("(well-lit pathway)"),
        highlights: [
            "Well-lit pathways",
            "High foot traffic areas",
            "Emergency call points nearby",
        ],
    };
    const COVERED: VariantProfile = VariantProfile {
        name: "Covered Route",
        jitter_deg: 0.0008,
        distance_multiplier: 1.25,
        speed_mps: 1.35,
        score_bonus: 3,
        instruction_suffix: Some("(covered walkway)"),
        highlights: [
            "Covered walkways",
            "Weather protection",
            "Indoor connections where possible",
        ],
    };
    const SCENIC: VariantProfile = VariantProfile {
        name: "Scenic Route",
        jitter_deg: 0.001,
        distance_multiplier: 1.3,
        speed_mps: 1.2,
        score_bonus: 0,
        instruction_suffix: Some("(scenic route)"),
        highlights: [
            "Campus landmarks",
            "Green spaces",
            "Architectural highlights",
        ],
    };

    match route_type {
        RouteType::Shortest => &SHORTEST,
        RouteType::Safest => &SAFEST,
        RouteType::Covered => &COVERED,
        RouteType::Scenic => &SCENIC,
    }
}

pub type HourSource = fn() -> u8;

pub fn local_hour() -> u8 {
    Local::now().hour() as u8
}

/// Synthesizes named route variants between two points.
///
/// This is a heuristic, not a pathfinder: the base path is the straight
/// line with at most one jittered midpoint, and each variant perturbs that
/// path with its own random offsets. The random source is owned by the
/// calculator so callers can seed it for reproducible output.
pub struct RouteCalculator<R = StdRng> {
    rng: R,
    current_hour: HourSource,
}

impl RouteCalculator<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RouteCalculator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            current_hour: local_hour,
        }
    }

    /// Replaces the clock consulted when `RouteOptions::time_of_day` is unset.
    pub fn with_hour_source(mut self, current_hour: HourSource) -> Self {
        self.current_hour = current_hour;
        self
    }

    pub fn calculate_route(
        &mut self,
        from: Coordinate,
        to: Coordinate,
        route_type: RouteType,
        options: &RouteOptions,
    ) -> Route {
        let base_path = self.find_base_path(from, to);
        let route = self.optimize_for(&base_path, route_type, options);
        tracing::debug!(
            "calculated {} route: {}m, {}s, safety {}",
            route_type,
            route.total_distance,
            route.total_duration,
            route.safety_score
        );
        route
    }

    /// Shortest, safest and covered, in that order. Scenic is only available
    /// through [`RouteCalculator::calculate_route`].
    pub fn calculate_multiple_routes(
        &mut self,
        from: Coordinate,
        to: Coordinate,
        options: &RouteOptions,
    ) -> Vec<Route> {
        [RouteType::Shortest, RouteType::Safest, RouteType::Covered]
            .into_iter()
            .map(|route_type| self.calculate_route(from, to, route_type, options))
            .collect()
    }

    /// Origin, an optional jittered midpoint, destination.
    pub fn find_base_path(&mut self, from: Coordinate, to: Coordinate) -> Vec<RoutePoint> {
        let mut points = Vec::with_capacity(3);
        points.push(RoutePoint::new(from, START_INSTRUCTION));

        if (from.lat - to.lat).abs() > MIDPOINT_THRESHOLD_DEG
            || (from.lng - to.lng).abs() > MIDPOINT_THRESHOLD_DEG
        {
            let mid = from.midpoint(to);
            let waypoint = Coordinate {
                lat: mid.lat + self.jitter(MIDPOINT_JITTER_DEG),
                lng: mid.lng + self.jitter(MIDPOINT_JITTER_DEG),
            };
            points.push(RoutePoint::new(waypoint, MIDPOINT_INSTRUCTION));
        }

        points.push(RoutePoint::new(to, ARRIVAL_INSTRUCTION));
        points
    }

    /// Heuristic score for a path: 87 adjusted for hour, weather and length,
    /// clamped to [60, 95].
    pub fn safety_score(&self, path: &[RoutePoint], options: &RouteOptions) -> i32 {
        let mut score = BASE_SAFETY_SCORE;
        let hour = options.time_of_day.unwrap_or_else(self.current_hour);

        if hour >= 22 || hour <= 5 {
            score -= NIGHT_PENALTY;
        } else if (6..=8).contains(&hour) {
            score += EARLY_MORNING_BONUS;
        }

        if options.weather_condition == Some(WeatherCondition::Rain) {
            score -= RAIN_PENALTY;
        }

        if rounded_distance_m(path) > LONG_ROUTE_M {
            score -= LONG_ROUTE_PENALTY;
        }

        score.clamp(MIN_SAFETY_SCORE, MAX_SAFETY_SCORE)
    }

    fn optimize_for(
        &mut self,
        base_path: &[RoutePoint],
        route_type: RouteType,
        options: &RouteOptions,
    ) -> Route {
        let profile = profile(route_type);
        let path = if profile.jitter_deg > 0.0 {
            self.perturb(base_path, profile.jitter_deg)
        } else {
            base_path.to_vec()
        };

        let scaled_distance = f64::from(rounded_distance_m(&path)) * profile.distance_multiplier;
        let total_distance = round_u32(scaled_distance);
        let total_duration = round_u32(scaled_distance / profile.speed_mps);
        // scored on the base path so jitter never moves the score
        let safety_score = (self.safety_score(base_path, options) + profile.score_bonus)
            .clamp(MIN_SAFETY_SCORE, MAX_SAFETY_SCORE);

        let description = match route_type {
            RouteType::Shortest => format!(
                "Direct route covering {total_distance}m in approximately {} minutes",
                (f64::from(total_duration) / 60.0).round()
            ),
            RouteType::Safest => {
                format!("Well-lit route with high safety score covering {total_distance}m")
            }
            RouteType::Covered => {
                format!("Weather-protected route with maximum coverage for {total_distance}m")
            }
            RouteType::Scenic => {
                format!("Scenic route through campus landmarks covering {total_distance}m")
            }
        };

        let warnings = match route_type {
            RouteType::Shortest if safety_score < 85 => {
                vec!["Some areas may have limited lighting".to_string()]
            }
            RouteType::Covered if options.weather_condition != Some(WeatherCondition::Rain) => {
                vec!["Route optimized for weather protection".to_string()]
            }
            RouteType::Scenic => vec!["Longer route with scenic detours".to_string()],
            _ => Vec::new(),
        };

        Route {
            id: format!("{route_type}-{}", Utc::now().timestamp_millis()),
            name: profile.name.to_string(),
            route_type,
            points: add_detailed_instructions(&path, profile.instruction_suffix),
            total_distance,
            total_duration,
            safety_score: safety_score as u8,
            description,
            warnings,
            highlights: profile.highlights.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Every point moves, the endpoints included.
    fn perturb(&mut self, path: &[RoutePoint], jitter_deg: f64) -> Vec<RoutePoint> {
        path.iter()
            .map(|point| RoutePoint {
                lat: point.lat + self.jitter(jitter_deg),
                lng: point.lng + self.jitter(jitter_deg),
                ..point.clone()
            })
            .collect()
    }

    /// Uniform offset in [-width/2, width/2).
    fn jitter(&mut self, width: f64) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * width
    }
}

/// Route with the highest safety score; the earliest one wins ties.
pub fn safest_of(routes: &[Route]) -> Option<&Route> {
    routes.iter().reduce(|best, candidate| {
        if candidate.safety_score > best.safety_score {
            candidate
        } else {
            best
        }
    })
}

fn add_detailed_instructions(points: &[RoutePoint], suffix: Option<&str>) -> Vec<RoutePoint> {
    let last = points.len().saturating_sub(1);
    points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            if index == 0 {
                return RoutePoint {
                    instruction: Some(START_INSTRUCTION.to_string()),
                    distance: Some(0),
                    duration: Some(0),
                    ..point.clone()
                };
            }

            let previous = points[index - 1].coordinate();
            let leg = haversine_m(previous, point.coordinate());
            let instruction = if index == last {
                ARRIVAL_INSTRUCTION.to_string()
            } else {
                let heading = Heading::between(previous, point.coordinate());
                let mut text = format!("Head {heading} for {}m", leg.round());
                if let Some(suffix) = suffix {
                    text.push(' ');
                    text.push_str(suffix);
                }
                text
            };

            RoutePoint {
                instruction: Some(instruction),
                distance: Some(round_u32(leg)),
                duration: Some(round_u32(leg / LEG_SPEED_MPS)),
                ..point.clone()
            }
        })
        .collect()
}

fn rounded_distance_m(points: &[RoutePoint]) -> u32 {
    let total: f64 = points
        .windows(2)
        .map(|w| haversine_m(w[0].coordinate(), w[1].coordinate()))
        .sum();
    round_u32(total)
}

/// NaN and negatives saturate to 0.
fn round_u32(value: f64) -> u32 {
    value.round() as u32
}
