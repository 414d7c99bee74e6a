use serde::Deserialize;
use utoipa::ToSchema;

use crate::config::Config;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, haversine formula.
/// Pure and total; NaN inputs propagate NaN.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GeofenceStatus {
    OnCampus,
    OffCampus,
}

impl GeofenceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GeofenceStatus::OnCampus => "On-Campus",
            GeofenceStatus::OffCampus => "Off-Campus",
        }
    }
}

/// Client-supplied device position.
#[derive(Debug, Copy, Clone, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = 17.6253)]
    pub latitude: f64,
    #[schema(example = 78.0878)]
    pub longitude: f64,
}

/// Location metadata attached to an attendance record when coordinates
/// were supplied.
#[derive(Debug, Clone)]
pub struct LocationStamp {
    pub status: GeofenceStatus,
    pub coordinates: String,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CampusGeofence {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
}

impl CampusGeofence {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lat: config.campus_lat,
            lon: config.campus_lon,
            radius_km: config.campus_radius_km,
        }
    }

    /// Classify a device position against the campus reference point.
    pub fn stamp(&self, pos: Coordinates) -> LocationStamp {
        let distance = distance_km(pos.latitude, pos.longitude, self.lat, self.lon);
        let status = if distance <= self.radius_km {
            GeofenceStatus::OnCampus
        } else {
            GeofenceStatus::OffCampus
        };
        LocationStamp {
            status,
            coordinates: format!("{:.5}, {:.5}", pos.latitude, pos.longitude),
            distance_km: distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMPUS: CampusGeofence = CampusGeofence {
        lat: 18.4550,
        lon: 79.5217,
        radius_km: 0.5,
    };

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_km(CAMPUS.lat, CAMPUS.lon, CAMPUS.lat, CAMPUS.lon), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let d1 = distance_km(17.6253, 78.0878, 18.4550, 79.5217);
        let d2 = distance_km(18.4550, 79.5217, 17.6253, 78.0878);
        assert!((d1 - d2).abs() < 1e-12);
    }

    #[test]
    fn known_distance_hyderabad_to_delhi() {
        // ~1255 km great-circle.
        let d = distance_km(17.3850, 78.4867, 28.6139, 77.2090);
        assert!((d - 1255.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn point_300m_away_is_on_campus() {
        // ~0.0027 degrees of latitude is ~0.3 km.
        let stamp = CAMPUS.stamp(Coordinates {
            latitude: CAMPUS.lat + 0.0027,
            longitude: CAMPUS.lon,
        });
        assert_eq!(stamp.status, GeofenceStatus::OnCampus);
        assert!(stamp.distance_km < 0.5, "got {}", stamp.distance_km);
    }

    #[test]
    fn point_2km_away_is_off_campus() {
        // ~0.018 degrees of latitude is ~2 km.
        let stamp = CAMPUS.stamp(Coordinates {
            latitude: CAMPUS.lat + 0.018,
            longitude: CAMPUS.lon,
        });
        assert_eq!(stamp.status, GeofenceStatus::OffCampus);
        assert!(stamp.distance_km > 0.5, "got {}", stamp.distance_km);
    }

    #[test]
    fn fence_boundary_is_inclusive() {
        let fence = CampusGeofence { lat: 0.0, lon: 0.0, radius_km: 0.5 };
        // Exactly on the reference point: distance 0, inside.
        let stamp = fence.stamp(Coordinates { latitude: 0.0, longitude: 0.0 });
        assert_eq!(stamp.status, GeofenceStatus::OnCampus);
    }

    #[test]
    fn coordinates_string_has_five_decimals() {
        let stamp = CAMPUS.stamp(Coordinates { latitude: 18.4550, longitude: 79.5217 });
        assert_eq!(stamp.coordinates, "18.45500, 79.52170");
    }

    #[test]
    fn nan_propagates() {
        assert!(distance_km(f64::NAN, 0.0, 0.0, 0.0).is_nan());
    }
}
