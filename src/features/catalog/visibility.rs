//! Which open orders an executor gets to see.

use std::collections::HashSet;

use uuid::Uuid;

use crate::core::error::DomainError;
use crate::features::categories::CategoryTree;
use crate::features::executors::ExecutorProfile;
use crate::features::orders::models::Order;
use crate::shared::geo::{filter_by_radius, validate_radius, BoundingBox, Coordinates, Locatable};

/// The executor offers the order's category or one of its ancestors.
///
/// An executor without any listed categories matches every order.
pub fn category_matches(order: &Order, executor: &ExecutorProfile, tree: &CategoryTree) -> bool {
    if executor.offers_any_category() {
        return true;
    }
    if executor.category_ids.contains(&order.category_id) {
        return true;
    }
    tree.ancestor_ids(order.category_id)
        .iter()
        .any(|id| executor.category_ids.contains(id))
}

/// Category ids whose orders the executor can see: every offered category
/// and everything below it. `None` when the executor offers all categories.
pub fn offered_category_ids(executor: &ExecutorProfile, tree: &CategoryTree) -> Option<Vec<Uuid>> {
    if executor.offers_any_category() {
        return None;
    }

    let mut ids: HashSet<Uuid> = HashSet::new();
    for id in &executor.category_ids {
        ids.extend(tree.subtree_ids(*id));
    }
    Some(ids.into_iter().collect())
}

/// Work area of a located executor
#[derive(Debug, Clone, Copy)]
pub struct FeedArea {
    pub center: Coordinates,
    pub radius_km: f64,
    pub bbox: BoundingBox,
}

/// The feed rules in a shape a SQL query can apply before paging, so that
/// orders outside the executor's categories or radius never take up a slot.
#[derive(Debug, Clone)]
pub struct FeedFilter {
    pub category_ids: Option<Vec<Uuid>>,
    /// `None` for an executor without a location, who only gets
    /// address-only orders
    pub area: Option<FeedArea>,
}

impl FeedFilter {
    pub fn for_executor(executor: &ExecutorProfile, tree: &CategoryTree) -> Result<Self, DomainError> {
        let area = match executor.coordinates() {
            Some(center) => {
                center.validate()?;
                validate_radius(executor.work_radius_km)?;
                Some(FeedArea {
                    center,
                    radius_km: executor.work_radius_km,
                    bbox: BoundingBox::around(center, executor.work_radius_km),
                })
            }
            None => None,
        };

        Ok(Self {
            category_ids: offered_category_ids(executor, tree),
            area,
        })
    }
}

/// Address-only orders are anchored at the executor's own position, which
/// keeps them inside any radius.
struct Anchored {
    order: Order,
    anchor: Coordinates,
}

impl Locatable for Anchored {
    fn coordinates(&self) -> Option<Coordinates> {
        self.order.coordinates().or(Some(self.anchor))
    }
}

/// The candidates the executor gets to see, in input order: open, published,
/// in a matching category and inside the executor's work radius.
///
/// An order without coordinates is visible regardless of distance. An
/// executor without a location only sees orders without coordinates. Orders
/// whose stored position is invalid are skipped; an invalid executor
/// position or radius is an error.
pub fn visible_orders(
    candidates: Vec<Order>,
    executor: &ExecutorProfile,
    tree: &CategoryTree,
) -> Result<Vec<Order>, DomainError> {
    let center = executor.coordinates();

    let mut eligible = Vec::new();
    for order in candidates {
        if !order.accepts_applications() || !category_matches(&order, executor, tree) {
            continue;
        }
        if let Some(point) = order.coordinates() {
            if let Err(e) = point.validate() {
                tracing::warn!("Skipping order {} with invalid location: {}", order.id, e);
                continue;
            }
            if center.is_none() {
                continue;
            }
        }
        eligible.push(order);
    }

    let Some(center) = center else {
        return Ok(eligible);
    };

    let anchored = eligible.into_iter().map(|order| Anchored {
        order,
        anchor: center,
    });
    Ok(filter_by_radius(center, executor.work_radius_km, anchored)?
        .into_iter()
        .map(|a| a.order)
        .collect())
}
