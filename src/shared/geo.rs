//! Great-circle radius matching.
//!
//! Everything here is a pure computation over coordinates. Range validation
//! of user input happens in the DTO layer; these functions still reject
//! NaN/out-of-range values that reach them so a corrupt row can never be
//! silently treated as "in range".

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::error::DomainError;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// A WGS84 point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    /// Pair up nullable latitude/longitude columns. A point is only present
    /// when both halves are.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, DomainError> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            _ => Ok(None),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);

        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(DomainError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Anything that may carry a position
pub trait Locatable {
    fn coordinates(&self) -> Option<Coordinates>;
}

impl Locatable for Coordinates {
    fn coordinates(&self) -> Option<Coordinates> {
        Some(*self)
    }
}

impl Locatable for Option<Coordinates> {
    fn coordinates(&self) -> Option<Coordinates> {
        *self
    }
}

impl<T: Locatable> Locatable for &T {
    fn coordinates(&self) -> Option<Coordinates> {
        (*self).coordinates()
    }
}

/// Haversine distance in kilometers. Inputs are assumed valid.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // rounding can push h a hair above 1 for antipodal points
    let c = 2.0 * h.min(1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

pub fn validate_radius(radius_km: f64) -> Result<(), DomainError> {
    if radius_km.is_finite() && radius_km >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::InvalidRadius(radius_km))
    }
}

/// Whether `point` lies within `radius_km` of `center` (boundary inclusive).
pub fn within_radius(
    center: Coordinates,
    point: Coordinates,
    radius_km: f64,
) -> Result<bool, DomainError> {
    center.validate()?;
    point.validate()?;
    validate_radius(radius_km)?;

    Ok(distance_km(center, point) <= radius_km)
}

/// Keep the candidates that lie within `radius_km` of `center`, in input
/// order. Candidates without coordinates are dropped.
pub fn filter_by_radius<T, I>(
    center: Coordinates,
    radius_km: f64,
    candidates: I,
) -> Result<Vec<T>, DomainError>
where
    T: Locatable,
    I: IntoIterator<Item = T>,
{
    center.validate()?;
    validate_radius(radius_km)?;

    let mut matched = Vec::new();
    for candidate in candidates {
        let Some(point) = candidate.coordinates() else {
            continue;
        };
        if within_radius(center, point, radius_km)? {
            matched.push(candidate);
        }
    }

    Ok(matched)
}

/// Coarse lat/lon box enclosing a radius, used to narrow SQL candidates
/// before the exact haversine check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn around(center: Coordinates, radius_km: f64) -> Self {
        let angular = radius_km.max(0.0) / EARTH_RADIUS_KM;
        let lat = center.latitude.to_radians();

        let min_lat = (lat - angular).to_degrees();
        let max_lat = (lat + angular).to_degrees();

        // Box touches a pole or the longitude span wraps: take every longitude
        if min_lat <= -90.0 || max_lat >= 90.0 {
            return Self {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                min_lon: -180.0,
                max_lon: 180.0,
            };
        }

        let ratio = angular.sin() / lat.cos();
        if ratio >= 1.0 {
            return Self {
                min_lat,
                max_lat,
                min_lon: -180.0,
                max_lon: 180.0,
            };
        }

        let delta_lon = ratio.asin().to_degrees();
        let min_lon = center.longitude - delta_lon;
        let max_lon = center.longitude + delta_lon;

        if min_lon < -180.0 || max_lon > 180.0 {
            // crossing the antimeridian, fall back to the full band
            return Self {
                min_lat,
                max_lat,
                min_lon: -180.0,
                max_lon: 180.0,
            };
        }

        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lon..=self.max_lon).contains(&point.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn test_distance_tashkent_neighbourhood() {
        let executor = point(41.30, 69.24);
        let near = point(41.35, 69.25);
        let far = point(42.00, 70.00);

        let d_near = distance_km(executor, near);
        assert!(d_near > 5.4 && d_near < 5.8, "{d_near}");

        let d_far = distance_km(executor, far);
        assert!(d_far > 80.0 && d_far < 110.0, "{d_far}");

        assert!(within_radius(executor, near, 10.0).unwrap());
        assert!(!within_radius(executor, far, 10.0).unwrap());
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = point(-6.2088, 106.8456);
        let b = point(41.2995, 69.2401);
        assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_same_point_is_zero() {
        let a = point(41.3, 69.2);
        assert!(distance_km(a, a) < 1e-9);
        assert!(within_radius(a, a, 0.0).unwrap());
    }

    #[test]
    fn test_increasing_radius_never_drops_points() {
        let center = point(41.30, 69.24);
        let candidates: Vec<Coordinates> = (0..40)
            .map(|i| point(41.0 + i as f64 * 0.02, 69.0 + i as f64 * 0.015))
            .collect();

        let mut previous: Vec<Coordinates> = Vec::new();
        for radius in [0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0] {
            let current = filter_by_radius(center, radius, candidates.iter().copied()).unwrap();
            for p in &previous {
                assert!(current.contains(p), "radius {radius} dropped {p:?}");
            }
            previous = current;
        }
    }

    #[test]
    fn test_filter_preserves_order_and_skips_missing_coordinates() {
        let center = point(41.30, 69.24);
        let candidates = vec![
            Some(point(41.31, 69.25)),
            None,
            Some(point(45.0, 60.0)),
            Some(point(41.29, 69.23)),
        ];

        let matched = filter_by_radius(center, 10.0, candidates).unwrap();
        assert_eq!(
            matched,
            vec![Some(point(41.31, 69.25)), Some(point(41.29, 69.23))]
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            Coordinates::new(91.0, 0.0),
            Err(DomainError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            Coordinates::new(0.0, f64::NAN),
            Err(DomainError::InvalidCoordinate { .. })
        ));

        let raw = Coordinates {
            latitude: f64::NAN,
            longitude: 0.0,
        };
        assert!(matches!(
            within_radius(point(0.0, 0.0), raw, 10.0),
            Err(DomainError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            within_radius(point(0.0, 0.0), point(0.0, 0.0), -1.0),
            Err(DomainError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_from_parts_requires_both_halves() {
        assert_eq!(Coordinates::from_parts(Some(41.0), None).unwrap(), None);
        assert_eq!(
            Coordinates::from_parts(Some(41.0), Some(69.0)).unwrap(),
            Some(point(41.0, 69.0))
        );
        assert!(Coordinates::from_parts(Some(100.0), Some(69.0)).is_err());
    }

    #[test]
    fn test_bounding_box_contains_every_point_in_radius() {
        let center = point(41.30, 69.24);
        let bbox = BoundingBox::around(center, 10.0);

        for i in 0..360 {
            let bearing = (i as f64).to_radians();
            // walk ~9.9 km out along each bearing
            let d = 9.9 / EARTH_RADIUS_KM;
            let lat1 = center.latitude.to_radians();
            let lon1 = center.longitude.to_radians();
            let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * bearing.cos()).asin();
            let lon2 = lon1
                + (bearing.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());
            let p = point(lat2.to_degrees(), lon2.to_degrees());
            assert!(bbox.contains(p), "bearing {i} escaped the box");
        }

        assert!(!bbox.contains(point(42.0, 70.0)));
    }

    #[test]
    fn test_bounding_box_near_pole_spans_all_longitudes() {
        let bbox = BoundingBox::around(point(89.9, 10.0), 50.0);
        assert_eq!(bbox.min_lon, -180.0);
        assert_eq!(bbox.max_lon, 180.0);
        assert_eq!(bbox.max_lat, 90.0);
    }
}
