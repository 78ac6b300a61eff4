use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::geo::{Coordinates, Locatable};

/// Where and what an executor works on.
///
/// Owned by the profile service; the order engine only reads it.
#[derive(Debug, Clone, FromRow)]
pub struct ExecutorProfile {
    pub executor_id: Uuid,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub work_radius_km: f64,
    /// Advisory; does not gate bidding
    pub is_available: bool,
    pub rating: Option<Decimal>,
    /// Categories the executor offers; empty means every category
    pub category_ids: Vec<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutorProfile {
    pub fn offers_any_category(&self) -> bool {
        self.category_ids.is_empty()
    }
}

impl Locatable for ExecutorProfile {
    fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_profile(location: Option<(f64, f64)>, work_radius_km: f64) -> ExecutorProfile {
    ExecutorProfile {
        executor_id: Uuid::new_v4(),
        latitude: location.map(|(lat, _)| lat),
        longitude: location.map(|(_, lon)| lon),
        work_radius_km,
        is_available: true,
        rating: None,
        category_ids: Vec::new(),
        updated_at: Utc::now(),
    }
}
