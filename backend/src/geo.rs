use std::fmt;

use crate::models::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Administrative main building, used as the campus reference point.
pub const CAMPUS_CENTER: Coordinate = Coordinate::new(12.9915936, 80.2336832);

/// Default route origin when the caller has no current location.
pub const MAIN_GATE: Coordinate = Coordinate::new(12.995, 80.225);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl Bounds {
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.lat >= self.south
            && coord.lat <= self.north
            && coord.lng >= self.west
            && coord.lng <= self.east
    }
}

pub const CAMPUS_BOUNDS: Bounds = Bounds {
    south: 12.985,
    north: 12.998,
    west: 80.228,
    east: 80.24,
};

pub fn is_within_campus(coord: Coordinate) -> bool {
    CAMPUS_BOUNDS.contains(coord)
}

pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlng = (dlng / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

pub fn path_distance_m(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_m(w[0], w[1])).sum()
}

/// Eight-way compass bucket for a leg, 45° sectors centred on north.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
    /// Degenerate angle (NaN input).
    Straight,
}

impl Heading {
    pub fn between(from: Coordinate, to: Coordinate) -> Self {
        let angle = (to.lng - from.lng).atan2(to.lat - from.lat).to_degrees();
        Self::from_angle(angle)
    }

    /// `angle` is in degrees, clockwise from north, within [-180, 180].
    pub fn from_angle(angle: f64) -> Self {
        match angle {
            a if (-22.5..22.5).contains(&a) => Heading::North,
            a if (22.5..67.5).contains(&a) => Heading::Northeast,
            a if (67.5..112.5).contains(&a) => Heading::East,
            a if (112.5..157.5).contains(&a) => Heading::Southeast,
            a if a >= 157.5 || a < -157.5 => Heading::South,
            a if (-157.5..-112.5).contains(&a) => Heading::Southwest,
            a if (-112.5..-67.5).contains(&a) => Heading::West,
            a if (-67.5..-22.5).contains(&a) => Heading::Northwest,
            _ => Heading::Straight,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Heading::North => "north",
            Heading::Northeast => "northeast",
            Heading::East => "east",
            Heading::Southeast => "southeast",
            Heading::South => "south",
            Heading::Southwest => "southwest",
            Heading::West => "west",
            Heading::Northwest => "northwest",
            Heading::Straight => "straight",
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
