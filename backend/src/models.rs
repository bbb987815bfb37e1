pub use navguard_shared::{
    AlertKind, AlertStatus, AlertStatusUpdate, ApiError, Building, BuildingCategory, ContactKind,
    Coordinate, EmergencyAlert, EmergencyContact, HeatmapResponse, Incident, IncidentSeverity,
    IncidentStatus, IncidentType, InvalidCoordinate, LocationSafety, MultiRouteRequest,
    MultiRouteResponse, NewIncident, PathwayRequest, PathwayRoute, Route, RouteOptions,
    RoutePoint, RouteRequest, RouteResponse, RouteType, SafetyLevel, SafetyZone,
    ShareLocationRequest, ShareLocationResponse, SosRequest, SosResponse, WeatherCondition,
};
