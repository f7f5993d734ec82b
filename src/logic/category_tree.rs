use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::logic::error::{CatalogError, CatalogResult};
use crate::model::{Category, CategoryUpdate, DeletePolicy, Id};

#[derive(Debug, Clone, PartialEq)]
struct CategoryNode {
    category: Category,
    children: Vec<Id>,
}

/// Forest of categories stored as an arena keyed by identifier.
///
/// Nodes only refer to each other by id: each node keeps its parent id and
/// an ordered child index, roots are listed separately. Cycle checks and
/// subtree walks are explicit traversals over those ids.
///
/// Serialized as the list of categories in depth-first order, so parents
/// always precede their children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Category>", into = "Vec<Category>")]
pub struct CategoryTree {
    nodes: HashMap<Id, CategoryNode>,
    roots: Vec<Id>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tree from categories in any order
    pub fn from_categories(categories: Vec<Category>) -> CatalogResult<Self> {
        let mut tree = Self::new();
        let mut pending = categories;

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for category in pending {
                let ready = category
                    .parent_id
                    .as_ref()
                    .map_or(true, |parent| tree.contains(parent));
                if ready {
                    let parent = category.parent_id.clone();
                    tree.insert(category, parent.as_deref())?;
                } else {
                    deferred.push(category);
                }
            }
            if deferred.len() == before {
                // Parents that never show up, or a cycle among the leftovers
                let missing = deferred[0].parent_id.clone().unwrap_or_default();
                return Err(CatalogError::ParentNotFound(missing));
            }
            pending = deferred;
        }

        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> CatalogResult<&Category> {
        self.node(id).map(|n| &n.category)
    }

    pub fn roots(&self) -> Vec<&Category> {
        self.roots
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|n| &n.category)
            .collect()
    }

    pub fn children_of(&self, id: &str) -> CatalogResult<Vec<&Category>> {
        let node = self.node(id)?;
        Ok(node
            .children
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .map(|n| &n.category)
            .collect())
    }

    /// Every category, depth-first from each root in order
    pub fn list(&self) -> Vec<&Category> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            if let Some(node) = self.nodes.get(root) {
                out.push(&node.category);
            }
            for id in self.walk_subtree(root) {
                if let Some(node) = self.nodes.get(&id) {
                    out.push(&node.category);
                }
            }
        }
        out
    }

    pub fn insert(&mut self, mut category: Category, parent_id: Option<&str>) -> CatalogResult<&Category> {
        if self.nodes.contains_key(&category.id) {
            return Err(CatalogError::DuplicateCategory(category.id));
        }
        if let Some(parent) = parent_id {
            if !self.nodes.contains_key(parent) {
                return Err(CatalogError::ParentNotFound(parent.to_string()));
            }
        }

        category.parent_id = parent_id.map(str::to_string);
        let id = category.id.clone();
        self.attach(&id, parent_id, None);
        debug!("Inserted category '{}' under {:?}", id, parent_id);

        let node = self.nodes.entry(id).or_insert(CategoryNode {
            category,
            children: Vec::new(),
        });
        Ok(&node.category)
    }

    pub fn update(&mut self, id: &str, update: CategoryUpdate) -> CatalogResult<&Category> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CatalogError::CategoryNotFound(id.to_string()))?;
        if let Some(code) = update.code {
            node.category.code = code;
        }
        if let Some(labels) = update.labels {
            node.category.labels = labels;
        }
        node.category.updated_at = chrono::Utc::now();
        Ok(&node.category)
    }

    /// Re-parent `id` under `new_parent` (or make it a root)
    pub fn move_to(&mut self, id: &str, new_parent: Option<&str>) -> CatalogResult<&Category> {
        let current_parent = self.node(id)?.category.parent_id.clone();
        if let Some(parent) = new_parent {
            if !self.nodes.contains_key(parent) {
                return Err(CatalogError::ParentNotFound(parent.to_string()));
            }
            if parent == id || self.is_ancestor(id, parent) {
                return Err(CatalogError::CycleDetected {
                    category: id.to_string(),
                    new_parent: parent.to_string(),
                });
            }
        }

        if current_parent.as_deref() != new_parent {
            self.detach(id, current_parent.as_deref());
            self.attach(id, new_parent, None);
            debug!("Moved category '{}' under {:?}", id, new_parent);
        }

        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CatalogError::CategoryNotFound(id.to_string()))?;
        node.category.parent_id = new_parent.map(str::to_string);
        node.category.updated_at = chrono::Utc::now();
        Ok(&node.category)
    }

    /// Delete `id` according to `policy` and return the removed ids.
    /// A rejected delete leaves the tree untouched.
    pub fn delete(&mut self, id: &str, policy: DeletePolicy) -> CatalogResult<Vec<Id>> {
        let node = self.node(id)?;
        let parent = node.category.parent_id.clone();
        let children = node.children.clone();

        let removed = match policy {
            DeletePolicy::RejectIfHasChildren => {
                if !children.is_empty() {
                    return Err(CatalogError::CategoryHasChildren(id.to_string()));
                }
                self.detach(id, parent.as_deref());
                vec![id.to_string()]
            }
            DeletePolicy::CascadeDeleteSubtree => {
                let mut removed = vec![id.to_string()];
                removed.extend(self.walk_subtree(id));
                self.detach(id, parent.as_deref());
                removed
            }
            DeletePolicy::ReparentChildrenToGrandparent => {
                let position = self.detach(id, parent.as_deref());
                for (offset, child) in children.iter().enumerate() {
                    self.attach(child, parent.as_deref(), position.map(|p| p + offset));
                    if let Some(child_node) = self.nodes.get_mut(child) {
                        child_node.category.parent_id = parent.clone();
                    }
                }
                vec![id.to_string()]
            }
        };

        for removed_id in &removed {
            self.nodes.remove(removed_id);
        }
        debug!("Deleted categories {:?} ({:?})", removed, policy);
        Ok(removed)
    }

    /// Immediate parent first, root last; empty for a root
    pub fn ancestors_of(&self, id: &str) -> CatalogResult<Vec<Id>> {
        let mut ancestors = Vec::new();
        let mut current = self.node(id)?.category.parent_id.as_ref();
        while let Some(parent) = current {
            // The walk can never be longer than the forest itself
            if ancestors.len() >= self.nodes.len() {
                break;
            }
            ancestors.push(parent.clone());
            current = self
                .nodes
                .get(parent)
                .and_then(|n| n.category.parent_id.as_ref());
        }
        Ok(ancestors)
    }

    /// Depth-first pre-order over the subtree, excluding `id` itself
    pub fn descendants_of(&self, id: &str) -> CatalogResult<Vec<Id>> {
        self.node(id)?;
        Ok(self.walk_subtree(id))
    }

    /// Whether `ancestor` is a strict ancestor of `id`. Irreflexive; unknown
    /// ids are never ancestors.
    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut current = self.nodes.get(id).and_then(|n| n.category.parent_id.as_ref());
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self
                .nodes
                .get(parent)
                .and_then(|n| n.category.parent_id.as_ref());
        }
        false
    }

    /// `id` itself or one of its ancestors is in `candidates`
    pub fn is_within_any(&self, id: &str, candidates: &[Id]) -> bool {
        candidates
            .iter()
            .any(|c| c == id || self.is_ancestor(c, id))
    }

    fn node(&self, id: &str) -> CatalogResult<&CategoryNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| CatalogError::CategoryNotFound(id.to_string()))
    }

    fn walk_subtree(&self, id: &str) -> Vec<Id> {
        let mut out = Vec::new();
        let mut stack: Vec<&Id> = match self.nodes.get(id) {
            Some(node) => node.children.iter().rev().collect(),
            None => return out,
        };
        while let Some(current) = stack.pop() {
            out.push(current.clone());
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Remove `id` from its parent's child index (or the roots) and return
    /// the position it occupied
    fn detach(&mut self, id: &str, parent: Option<&str>) -> Option<usize> {
        let siblings = match parent {
            Some(parent) => &mut self.nodes.get_mut(parent)?.children,
            None => &mut self.roots,
        };
        let position = siblings.iter().position(|c| c == id)?;
        siblings.remove(position);
        Some(position)
    }

    fn attach(&mut self, id: &str, parent: Option<&str>, position: Option<usize>) {
        let siblings = match parent {
            Some(parent) => match self.nodes.get_mut(parent) {
                Some(node) => &mut node.children,
                None => return,
            },
            None => &mut self.roots,
        };
        match position {
            Some(position) if position <= siblings.len() => {
                siblings.insert(position, id.to_string())
            }
            _ => siblings.push(id.to_string()),
        }
    }
}

impl TryFrom<Vec<Category>> for CategoryTree {
    type Error = CatalogError;

    fn try_from(categories: Vec<Category>) -> Result<Self, Self::Error> {
        Self::from_categories(categories)
    }
}

impl From<CategoryTree> for Vec<Category> {
    fn from(tree: CategoryTree) -> Self {
        tree.list().into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root
    /// ├── men
    /// │   ├── shirts
    /// │   └── shoes
    /// └── women
    ///     └── dresses
    fn apparel() -> CategoryTree {
        let mut tree = CategoryTree::new();
        tree.insert(Category::new("root", "root"), None).unwrap();
        tree.insert(Category::new("men", "men"), Some("root")).unwrap();
        tree.insert(Category::new("shirts", "shirts"), Some("men")).unwrap();
        tree.insert(Category::new("shoes", "shoes"), Some("men")).unwrap();
        tree.insert(Category::new("women", "women"), Some("root")).unwrap();
        tree.insert(Category::new("dresses", "dresses"), Some("women")).unwrap();
        tree
    }

    fn ids(values: &[&str]) -> Vec<Id> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_insert_unknown_parent() {
        let mut tree = CategoryTree::new();
        let err = tree
            .insert(Category::new("shirts", "shirts"), Some("men"))
            .unwrap_err();
        assert_eq!(err, CatalogError::ParentNotFound("men".to_string()));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_insert_duplicate() {
        let mut tree = apparel();
        assert_eq!(
            tree.insert(Category::new("men", "men"), None).unwrap_err(),
            CatalogError::DuplicateCategory("men".to_string())
        );
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let tree = apparel();
        assert_eq!(tree.ancestors_of("shirts").unwrap(), ids(&["men", "root"]));
        assert!(tree.ancestors_of("root").unwrap().is_empty());
        assert_eq!(
            tree.descendants_of("root").unwrap(),
            ids(&["men", "shirts", "shoes", "women", "dresses"])
        );
        assert!(tree.descendants_of("dresses").unwrap().is_empty());
        assert!(matches!(
            tree.descendants_of("nope"),
            Err(CatalogError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn test_is_ancestor_is_strict() {
        let tree = apparel();
        assert!(tree.is_ancestor("root", "shirts"));
        assert!(tree.is_ancestor("men", "shirts"));
        assert!(!tree.is_ancestor("women", "shirts"));
        assert!(!tree.is_ancestor("shirts", "men"));
        for category in tree.list() {
            assert!(!tree.is_ancestor(&category.id, &category.id));
        }
    }

    #[test]
    fn test_descendants_never_list_node_among_ancestors() {
        let tree = apparel();
        for category in tree.list() {
            for descendant in tree.descendants_of(&category.id).unwrap() {
                let ancestors = tree.ancestors_of(&descendant).unwrap();
                assert!(ancestors.contains(&category.id));
                assert!(!ancestors.contains(&descendant));
            }
        }
    }

    #[test]
    fn test_move_into_own_subtree_is_a_cycle() {
        let mut tree = apparel();
        let before = tree.clone();
        for target in ["root", "men", "shirts", "shoes", "women", "dresses"] {
            let err = tree.move_to("root", Some(target)).unwrap_err();
            assert!(matches!(err, CatalogError::CycleDetected { .. }));
        }
        let err = tree.move_to("men", Some("shirts")).unwrap_err();
        assert!(matches!(err, CatalogError::CycleDetected { .. }));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_move_every_shape_rejects_descendants() {
        let tree = apparel();
        for category in tree.list() {
            let mut targets = tree.descendants_of(&category.id).unwrap();
            targets.push(category.id.clone());
            for target in targets {
                let mut copy = tree.clone();
                assert!(matches!(
                    copy.move_to(&category.id, Some(&target)),
                    Err(CatalogError::CycleDetected { .. })
                ));
            }
        }
    }

    #[test]
    fn test_move_reparents() {
        let mut tree = apparel();
        tree.move_to("shoes", Some("women")).unwrap();
        assert_eq!(tree.ancestors_of("shoes").unwrap(), ids(&["women", "root"]));
        assert_eq!(tree.descendants_of("men").unwrap(), ids(&["shirts"]));

        tree.move_to("women", None).unwrap();
        let roots: Vec<_> = tree.roots().iter().map(|c| c.id.clone()).collect();
        assert_eq!(roots, ids(&["root", "women"]));
        assert!(!tree.is_ancestor("root", "shoes"));

        assert_eq!(
            tree.move_to("shoes", Some("nope")).unwrap_err(),
            CatalogError::ParentNotFound("nope".to_string())
        );
    }

    #[test]
    fn test_delete_reject_policy_is_repeatable() {
        let mut tree = apparel();
        let before = tree.clone();
        for _ in 0..3 {
            assert_eq!(
                tree.delete("men", DeletePolicy::RejectIfHasChildren),
                Err(CatalogError::CategoryHasChildren("men".to_string()))
            );
            assert_eq!(tree, before);
        }
        assert_eq!(
            tree.delete("shoes", DeletePolicy::RejectIfHasChildren).unwrap(),
            ids(&["shoes"])
        );
        assert_eq!(tree.descendants_of("men").unwrap(), ids(&["shirts"]));
    }

    #[test]
    fn test_delete_cascade() {
        let mut tree = apparel();
        let removed = tree.delete("men", DeletePolicy::CascadeDeleteSubtree).unwrap();
        assert_eq!(removed, ids(&["men", "shirts", "shoes"]));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.descendants_of("root").unwrap(), ids(&["women", "dresses"]));
    }

    #[test]
    fn test_delete_reparent_keeps_position() {
        let mut tree = apparel();
        tree.delete("men", DeletePolicy::ReparentChildrenToGrandparent)
            .unwrap();
        assert_eq!(
            tree.descendants_of("root").unwrap(),
            ids(&["shirts", "shoes", "women", "dresses"])
        );
        assert_eq!(tree.get("shirts").unwrap().parent_id.as_deref(), Some("root"));

        tree.delete("root", DeletePolicy::ReparentChildrenToGrandparent)
            .unwrap();
        let roots: Vec<_> = tree.roots().iter().map(|c| c.id.clone()).collect();
        assert_eq!(roots, ids(&["shirts", "shoes", "women"]));
        assert!(tree.get("women").unwrap().is_root());
    }

    #[test]
    fn test_serde_round_trip_preserves_shape() {
        let tree = apparel();
        let json = serde_json::to_value(&tree).unwrap();
        let restored: CategoryTree = serde_json::from_value(json).unwrap();
        assert_eq!(restored, tree);
    }

    #[test]
    fn test_from_categories_any_order() {
        let mut shirts = Category::new("shirts", "shirts");
        shirts.parent_id = Some("men".to_string());
        let mut men = Category::new("men", "men");
        men.parent_id = Some("root".to_string());
        let tree =
            CategoryTree::from_categories(vec![shirts, men, Category::new("root", "root")])
                .unwrap();
        assert!(tree.is_ancestor("root", "shirts"));

        let mut orphan = Category::new("orphan", "orphan");
        orphan.parent_id = Some("ghost".to_string());
        assert_eq!(
            CategoryTree::from_categories(vec![orphan]).unwrap_err(),
            CatalogError::ParentNotFound("ghost".to_string())
        );
    }

    #[test]
    fn test_is_within_any() {
        let tree = apparel();
        assert!(tree.is_within_any("shirts", &ids(&["men"])));
        assert!(tree.is_within_any("men", &ids(&["men"])));
        assert!(!tree.is_within_any("dresses", &ids(&["men"])));
    }
}
