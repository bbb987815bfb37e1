use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::NavError;
use crate::models::{Route, RoutePoint};

const CREATOR: &str = "navguard";

/// Serializes a route as a base64-encoded GPX 1.1 track.
///
/// Points carrying an instruction keep it as the waypoint name.
pub fn encode_route_as_gpx(route: &Route) -> Result<String, NavError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some(route.name.clone()),
        description: Some(route.description.clone()),
        ..Default::default()
    };

    let mut segment = TrackSegment::new();
    segment.points.extend(route.points.iter().map(to_waypoint));
    track.segments.push(segment);
    gpx.tracks.push(track);

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

fn to_waypoint(point: &RoutePoint) -> Waypoint {
    let mut waypoint = Waypoint::new(Point::new(point.lng, point.lat));
    waypoint.name = point.instruction.clone();
    waypoint
}
