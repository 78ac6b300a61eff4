//! Consistency rules for the service category hierarchy.
//!
//! [`CategoryTree`] is an in-memory snapshot of every category. The service
//! loads it inside the write transaction, asks it whether a change is legal,
//! and only then touches the table. Every parent walk is bounded by the
//! number of nodes, so corrupt data (a dangling parent or a cycle that slipped
//! in) ends the walk instead of hanging the request.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::core::error::DomainError;
use crate::features::categories::dtos::{BreadcrumbDto, CategoryTreeDto};
use crate::features::categories::models::{Category, Locale};
use crate::shared::validation::{slugify, SLUG_REGEX};

/// Slug used when the primary-locale name has no ASCII letters or digits
const FALLBACK_SLUG: &str = "category";

#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: HashMap<Uuid, Category>,
}

impl CategoryTree {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            nodes: categories.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Category> {
        self.nodes.get(&id)
    }

    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.nodes
            .values()
            .any(|c| c.slug == slug && Some(c.id) != except)
    }

    /// Pick the slug for a new category: the explicit one if given (must be
    /// well formed), otherwise one derived from the primary-locale name.
    pub fn resolve_slug(explicit: Option<&str>, name_uz: &str) -> Result<String, DomainError> {
        match explicit {
            Some(slug) if SLUG_REGEX.is_match(slug) => Ok(slug.to_string()),
            Some(slug) => Err(DomainError::InvalidSlug(slug.to_string())),
            None => Ok(slugify(name_uz).unwrap_or_else(|| FALLBACK_SLUG.to_string())),
        }
    }

    pub fn check_create(&self, parent_id: Option<Uuid>, slug: &str) -> Result<(), DomainError> {
        if self.slug_taken(slug, None) {
            return Err(DomainError::DuplicateSlug(slug.to_string()));
        }

        if let Some(parent_id) = parent_id {
            if !self.nodes.contains_key(&parent_id) {
                return Err(DomainError::ParentNotFound(parent_id));
            }
        }

        Ok(())
    }

    /// Slug change on an existing category
    pub fn check_slug_change(&self, id: Uuid, slug: &str) -> Result<(), DomainError> {
        if !self.nodes.contains_key(&id) {
            return Err(DomainError::CategoryNotFound(id));
        }
        if !SLUG_REGEX.is_match(slug) {
            return Err(DomainError::InvalidSlug(slug.to_string()));
        }
        if self.slug_taken(slug, Some(id)) {
            return Err(DomainError::DuplicateSlug(slug.to_string()));
        }
        Ok(())
    }

    pub fn check_reparent(&self, id: Uuid, new_parent_id: Option<Uuid>) -> Result<(), DomainError> {
        if new_parent_id == Some(id) {
            return Err(DomainError::SelfParent);
        }
        if !self.nodes.contains_key(&id) {
            return Err(DomainError::CategoryNotFound(id));
        }

        let Some(parent_id) = new_parent_id else {
            return Ok(());
        };
        if !self.nodes.contains_key(&parent_id) {
            return Err(DomainError::ParentNotFound(parent_id));
        }

        // Walk up from the proposed parent; meeting `id` means `id` would
        // become its own ancestor.
        let mut current = Some(parent_id);
        let mut steps = 0;
        while let Some(node_id) = current {
            if node_id == id {
                return Err(DomainError::CyclicDependency { id, parent_id });
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            current = self.nodes.get(&node_id).and_then(|c| c.parent_id);
        }

        Ok(())
    }

    pub fn check_delete(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.nodes.contains_key(&id) {
            return Err(DomainError::CategoryNotFound(id));
        }
        if self.nodes.values().any(|c| c.parent_id == Some(id)) {
            return Err(DomainError::HasChildren(id));
        }
        Ok(())
    }

    #[cfg(test)]
    fn set_parent(&mut self, id: Uuid, parent_id: Option<Uuid>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent_id = parent_id;
        }
    }

    /// Ids from the node's parent up to its root, nearest first.
    pub fn ancestor_ids(&self, id: Uuid) -> Vec<Uuid> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.nodes.get(&id).and_then(|c| c.parent_id);

        while let Some(node_id) = current {
            if !seen.insert(node_id) {
                break;
            }
            let Some(node) = self.nodes.get(&node_id) else {
                break;
            };
            ancestors.push(node_id);
            current = node.parent_id;
        }

        ancestors
    }

    /// The node and everything below it
    pub fn subtree_ids(&self, id: Uuid) -> HashSet<Uuid> {
        let children = self.children_index();
        let mut found = HashSet::new();
        let mut stack = vec![id];

        while let Some(node_id) = stack.pop() {
            if !found.insert(node_id) {
                continue;
            }
            if let Some(kids) = children.get(&Some(node_id)) {
                stack.extend(kids.iter().map(|c| c.id));
            }
        }

        found
    }

    /// Whether following parent pointers from `id` ever returns to `id`
    #[cfg(test)]
    fn has_cycle_from(&self, id: Uuid) -> bool {
        let mut current = self.nodes.get(&id).and_then(|c| c.parent_id);
        let mut steps = 0;
        while let Some(node_id) = current {
            if node_id == id {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                // stuck in a loop that does not include `id`
                return false;
            }
            current = self.nodes.get(&node_id).and_then(|c| c.parent_id);
        }
        false
    }

    /// Root-to-node path. Stops at a parent reference that does not resolve.
    pub fn breadcrumbs(&self, id: Uuid, locale: Locale) -> Result<Vec<BreadcrumbDto>, DomainError> {
        let node = self
            .nodes
            .get(&id)
            .ok_or(DomainError::CategoryNotFound(id))?;

        let mut path = vec![node];
        path.extend(self.ancestor_ids(id).into_iter().filter_map(|a| self.nodes.get(&a)));
        path.reverse();

        Ok(path
            .into_iter()
            .map(|c| BreadcrumbDto {
                id: c.id,
                name: c.name(locale).to_string(),
                slug: c.slug.clone(),
            })
            .collect())
    }

    fn children_index(&self) -> HashMap<Option<Uuid>, Vec<&Category>> {
        let mut index: HashMap<Option<Uuid>, Vec<&Category>> = HashMap::new();
        for c in self.nodes.values() {
            index.entry(c.parent_id).or_default().push(c);
        }
        index
    }

    pub fn build_tree(&self, locale: Locale) -> Vec<CategoryTreeDto> {
        let mut index = self.children_index();
        for siblings in index.values_mut() {
            siblings.sort_by(|a, b| sibling_order(a, b, locale));
        }

        let mut visited = HashSet::new();
        index
            .get(&None)
            .map(|roots| {
                roots
                    .iter()
                    .map(|root| materialize(root, &index, locale, &mut visited))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn sibling_order(a: &Category, b: &Category, locale: Locale) -> Ordering {
    a.sort_order
        .cmp(&b.sort_order)
        .then_with(|| a.name(locale).cmp(b.name(locale)))
        .then_with(|| a.id.cmp(&b.id))
}

fn materialize(
    node: &Category,
    index: &HashMap<Option<Uuid>, Vec<&Category>>,
    locale: Locale,
    visited: &mut HashSet<Uuid>,
) -> CategoryTreeDto {
    visited.insert(node.id);

    let children = index
        .get(&Some(node.id))
        .map(|kids| {
            kids.iter()
                .filter_map(|k| {
                    (!visited.contains(&k.id)).then(|| materialize(k, index, locale, visited))
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    CategoryTreeDto {
        id: node.id,
        name: node.name(locale).to_string(),
        slug: node.slug.clone(),
        description: node.description(locale).map(String::from),
        icon: node.icon.clone(),
        color: node.color.clone(),
        sort_order: node.sort_order,
        services_count: node.services_count,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::models::test_category;

    /// A -> B -> C, plus a second root D
    fn sample() -> (CategoryTree, [Uuid; 4]) {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let tree = CategoryTree::new(vec![
            test_category(a, None, "Remont"),
            test_category(b, Some(a), "Santexnika"),
            test_category(c, Some(b), "Quvur almashtirish"),
            test_category(d, None, "Tozalash"),
        ]);
        (tree, [a, b, c, d])
    }

    fn assert_acyclic(tree: &CategoryTree) {
        for id in tree.nodes.keys() {
            assert!(!tree.has_cycle_from(*id), "cycle through {id}");
        }
    }

    #[test]
    fn test_reparent_root_under_child_is_cyclic() {
        let (tree, [a, b, _, _]) = sample();
        assert_eq!(
            tree.check_reparent(a, Some(b)),
            Err(DomainError::CyclicDependency { id: a, parent_id: b })
        );
    }

    #[test]
    fn test_reparent_under_grandchild_is_cyclic() {
        let (tree, [a, _, c, _]) = sample();
        assert!(matches!(
            tree.check_reparent(a, Some(c)),
            Err(DomainError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_reparent_self_and_missing_parent() {
        let (tree, [a, _, _, _]) = sample();
        assert_eq!(tree.check_reparent(a, Some(a)), Err(DomainError::SelfParent));

        let ghost = Uuid::new_v4();
        assert_eq!(
            tree.check_reparent(a, Some(ghost)),
            Err(DomainError::ParentNotFound(ghost))
        );
    }

    #[test]
    fn test_legal_reparents_keep_tree_acyclic() {
        let (mut tree, [a, b, c, d]) = sample();

        for (id, parent) in [(c, Some(d)), (b, None), (a, Some(d)), (b, Some(c))] {
            tree.check_reparent(id, parent).unwrap();
            tree.set_parent(id, parent);
            assert_acyclic(&tree);
        }
    }

    #[test]
    fn test_walk_stops_at_dangling_parent() {
        let (a, b, ghost) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let tree = CategoryTree::new(vec![
            test_category(a, Some(ghost), "Orphan"),
            test_category(b, None, "Root"),
        ]);

        assert!(tree.check_reparent(b, Some(a)).is_ok());

        let crumbs = tree.breadcrumbs(a, Locale::Uz).unwrap();
        assert_eq!(crumbs.len(), 1);
        assert_eq!(crumbs[0].id, a);
    }

    #[test]
    fn test_walk_terminates_on_corrupt_cycle() {
        let (x, y, z) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let tree = CategoryTree::new(vec![
            test_category(x, Some(y), "X"),
            test_category(y, Some(x), "Y"),
            test_category(z, None, "Z"),
        ]);

        assert!(tree.has_cycle_from(x));
        assert!(tree.check_reparent(z, Some(x)).is_ok());
        assert_eq!(tree.breadcrumbs(x, Locale::Uz).unwrap().len(), 2);
    }

    #[test]
    fn test_breadcrumbs_match_manual_parent_walk() {
        let (tree, [a, b, c, _]) = sample();

        let crumbs = tree.breadcrumbs(c, Locale::Ru).unwrap();
        let ids: Vec<Uuid> = crumbs.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![a, b, c]);

        let mut manual = vec![c];
        let mut current = tree.get(c).unwrap().parent_id;
        while let Some(id) = current {
            manual.push(id);
            current = tree.get(id).unwrap().parent_id;
        }
        manual.reverse();
        assert_eq!(ids, manual);

        assert_eq!(crumbs[1].name, "Santexnika (ru)");
        assert_eq!(crumbs[1].slug, "santexnika");
    }

    #[test]
    fn test_create_checks() {
        let (tree, [a, _, _, _]) = sample();

        assert_eq!(
            tree.check_create(None, "santexnika"),
            Err(DomainError::DuplicateSlug("santexnika".into()))
        );

        let ghost = Uuid::new_v4();
        assert_eq!(
            tree.check_create(Some(ghost), "yangi"),
            Err(DomainError::ParentNotFound(ghost))
        );

        assert!(tree.check_create(Some(a), "yangi").is_ok());
    }

    #[test]
    fn test_slug_change_ignores_own_slug() {
        let (tree, [_, b, c, _]) = sample();
        assert!(tree.check_slug_change(b, "santexnika").is_ok());
        assert!(matches!(
            tree.check_slug_change(c, "santexnika"),
            Err(DomainError::DuplicateSlug(_))
        ));
    }

    #[test]
    fn test_resolve_slug() {
        assert_eq!(
            CategoryTree::resolve_slug(None, "Uy Tozalash").unwrap(),
            "uy-tozalash"
        );
        assert_eq!(CategoryTree::resolve_slug(None, "Ремонт").unwrap(), "category");
        assert_eq!(
            CategoryTree::resolve_slug(Some("custom-slug"), "ignored").unwrap(),
            "custom-slug"
        );
        assert!(matches!(
            CategoryTree::resolve_slug(Some("Bad Slug"), "x"),
            Err(DomainError::InvalidSlug(_))
        ));
    }

    #[test]
    fn test_delete_requires_no_children() {
        let (tree, [a, _, c, _]) = sample();
        assert_eq!(tree.check_delete(a), Err(DomainError::HasChildren(a)));
        assert!(tree.check_delete(c).is_ok());
    }

    #[test]
    fn test_build_tree_orders_siblings() {
        let root = Uuid::new_v4();
        let (x, y, z) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let mut first = test_category(x, Some(root), "Zamonaviy");
        first.sort_order = 1;
        let mut second = test_category(y, Some(root), "Bog'");
        second.sort_order = 2;
        let mut third = test_category(z, Some(root), "Avto");
        third.sort_order = 2;

        let forest = CategoryTree::new(vec![
            second,
            test_category(root, None, "Root"),
            third,
            first,
        ])
        .build_tree(Locale::Uz);

        assert_eq!(forest.len(), 1);
        let names: Vec<&str> = forest[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zamonaviy", "Avto", "Bog'"]);
    }

    #[test]
    fn test_ancestors_and_subtree() {
        let (tree, [a, b, c, d]) = sample();
        assert_eq!(tree.ancestor_ids(c), vec![b, a]);
        assert!(tree.ancestor_ids(d).is_empty());

        let subtree = tree.subtree_ids(b);
        assert!(subtree.contains(&b) && subtree.contains(&c));
        assert!(!subtree.contains(&a));
    }
}
