use std::collections::{HashMap, HashSet};
use tracing::warn;
use wrongbook_schemas::{Subject, TagId, TagNode};

use crate::error::Result;
use crate::store::{TagFilter, TagStore};

/// In-memory view of a subject's tag tree.
///
/// Children are kept in sibling order. Nodes whose parent is not part of the
/// loaded set are unreachable from the roots.
#[derive(Debug, Default)]
pub struct TaxonomyTree {
    nodes: HashMap<TagId, TagNode>,
    children: HashMap<TagId, Vec<TagId>>,
    roots: Vec<TagId>,
}

impl TaxonomyTree {
    pub fn from_nodes(nodes: Vec<TagNode>) -> Self {
        let mut ordered = nodes;
        ordered.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut tree = TaxonomyTree::default();
        for node in ordered {
            match &node.parent_id {
                Some(parent) => tree
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .push(node.id.clone()),
                None => tree.roots.push(node.id.clone()),
            }
            tree.nodes.insert(node.id.clone(), node);
        }

        let orphans = tree
            .nodes
            .values()
            .filter(|n| matches!(&n.parent_id, Some(p) if !tree.nodes.contains_key(p)))
            .count();
        if orphans > 0 {
            warn!("Tag tree has {} nodes with a missing parent", orphans);
        }

        tree
    }

    /// Load every system node of a subject
    pub fn load<S: TagStore + ?Sized>(store: &S, subject: Subject) -> Result<Self> {
        let nodes = store.find_nodes(&TagFilter::subject(subject).system())?;
        Ok(Self::from_nodes(nodes))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &TagId) -> Option<&TagNode> {
        self.nodes.get(id)
    }

    pub fn roots(&self) -> impl Iterator<Item = &TagNode> {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn children(&self, id: &TagId) -> impl Iterator<Item = &TagNode> {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|cid| self.nodes.get(cid))
    }

    pub fn is_leaf(&self, id: &TagId) -> bool {
        self.children.get(id).map_or(true, |c| c.is_empty())
    }

    /// Leaf descendants of `id` in depth-first sibling order. A childless
    /// node is its own leaf. Duplicate names across branches are kept.
    pub fn collect_leaves(&self, id: &TagId) -> Vec<&TagNode> {
        let mut leaves = Vec::new();
        let mut visited: HashSet<&TagId> = HashSet::new();
        let mut stack: Vec<&TagId> = vec![id];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                warn!("Cycle detected at tag {}", current);
                continue;
            }
            let Some(node) = self.nodes.get(current) else {
                continue;
            };

            match self.children.get(current) {
                Some(kids) if !kids.is_empty() => {
                    // Reverse so the first sibling is popped first
                    stack.extend(kids.iter().rev());
                }
                _ => leaves.push(node),
            }
        }

        leaves
    }

    pub fn leaf_names(&self, id: &TagId) -> Vec<String> {
        self.collect_leaves(id)
            .into_iter()
            .map(|n| n.name.clone())
            .collect()
    }

    /// Leaves of every root, concatenated in root order
    pub fn all_leaf_names(&self) -> Vec<String> {
        self.roots
            .iter()
            .flat_map(|id| self.leaf_names(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str, parent: Option<&str>, order: i64) -> TagNode {
        TagNode {
            id: TagId(id.to_string()),
            name: name.to_string(),
            subject: Subject::Math,
            parent_id: parent.map(|p| TagId(p.to_string())),
            is_system: true,
            order,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    fn sample_tree() -> TaxonomyTree {
        // Deliberately shuffled input
        TaxonomyTree::from_nodes(vec![
            node("p3", "因式分解", Some("c2"), 1),
            node("g1", "國一上", None, 1),
            node("c2", "多項式", Some("g1"), 2),
            node("c1", "整數", Some("g1"), 1),
            node("s1", "負數", Some("c1"), 1),
            node("p2", "絕對值", Some("s1"), 2),
            node("p1", "數線", Some("s1"), 1),
            node("g2", "國一下", None, 2),
        ])
    }

    #[test]
    fn test_leaves_follow_sibling_order() {
        let tree = sample_tree();
        let names = tree.leaf_names(&TagId("g1".to_string()));
        assert_eq!(names, vec!["數線", "絕對值", "因式分解"]);
    }

    #[test]
    fn test_childless_node_is_its_own_leaf() {
        let tree = sample_tree();
        assert_eq!(tree.leaf_names(&TagId("g2".to_string())), vec!["國一下"]);
        assert_eq!(tree.leaf_names(&TagId("p1".to_string())), vec!["數線"]);
        assert!(tree.leaf_names(&TagId("missing".to_string())).is_empty());
    }

    #[test]
    fn test_leaf_totality_over_roots() {
        let tree = sample_tree();
        let mut from_roots = tree.all_leaf_names();
        from_roots.sort();

        let mut childless: Vec<String> = tree
            .nodes
            .values()
            .filter(|n| tree.is_leaf(&n.id))
            .map(|n| n.name.clone())
            .collect();
        childless.sort();

        assert_eq!(from_roots, childless);
    }

    #[test]
    fn test_duplicates_across_branches_are_preserved() {
        let tree = TaxonomyTree::from_nodes(vec![
            node("g1", "國一上", None, 1),
            node("c1", "章一", Some("g1"), 1),
            node("c2", "章二", Some("g1"), 2),
            node("p1", "應用題", Some("c1"), 1),
            node("p2", "應用題", Some("c2"), 1),
        ]);
        assert_eq!(
            tree.leaf_names(&TagId("g1".to_string())),
            vec!["應用題", "應用題"]
        );
    }

    #[test]
    fn test_cycle_terminates() {
        let tree = TaxonomyTree::from_nodes(vec![
            node("a", "甲", Some("b"), 1),
            node("b", "乙", Some("a"), 1),
        ]);
        assert!(tree.roots().next().is_none());
        assert!(tree.leaf_names(&TagId("a".to_string())).is_empty());
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut nodes = vec![node("n0", "root", None, 1)];
        for i in 1..5000 {
            nodes.push(node(
                &format!("n{}", i),
                &format!("level {}", i),
                Some(&format!("n{}", i - 1)),
                1,
            ));
        }
        let tree = TaxonomyTree::from_nodes(nodes);
        assert_eq!(
            tree.leaf_names(&TagId("n0".to_string())),
            vec!["level 4999"]
        );
    }
}
