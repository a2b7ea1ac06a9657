//! Tag store interface consumed by the taxonomy engine.

use wrongbook_schemas::{Subject, TagId, TagNode};

use crate::error::Result;

/// Constraint on a node's parent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParentFilter {
    #[default]
    Any,
    /// Only roots (`parent_id IS NULL`)
    Root,
    /// Only direct children of the given node
    Of(TagId),
}

impl ParentFilter {
    pub fn from_parent(parent_id: Option<&TagId>) -> Self {
        match parent_id {
            Some(id) => ParentFilter::Of(id.clone()),
            None => ParentFilter::Root,
        }
    }
}

/// Conjunctive filter over tag nodes. `None` fields are unconstrained.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub subject: Option<Subject>,
    pub parent: ParentFilter,
    pub is_system: Option<bool>,
    pub order: Option<i64>,
    pub name: Option<String>,
    /// Only nodes with no children
    pub leaf_only: bool,
}

impl TagFilter {
    pub fn subject(subject: Subject) -> Self {
        Self {
            subject: Some(subject),
            ..Default::default()
        }
    }

    /// Structural identity key of a system node.
    pub fn structural_key(subject: Subject, parent_id: Option<&TagId>, order: i64) -> Self {
        Self {
            subject: Some(subject),
            parent: ParentFilter::from_parent(parent_id),
            is_system: Some(true),
            order: Some(order),
            ..Default::default()
        }
    }

    /// System grade/semester roots of a subject.
    pub fn system_roots(subject: Subject) -> Self {
        Self {
            subject: Some(subject),
            parent: ParentFilter::Root,
            is_system: Some(true),
            ..Default::default()
        }
    }

    /// Any node of a subject carrying the given name.
    pub fn named(subject: Subject, name: &str) -> Self {
        Self {
            subject: Some(subject),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn system(mut self) -> Self {
        self.is_system = Some(true);
        self
    }

    pub fn leaves(mut self) -> Self {
        self.leaf_only = true;
        self
    }
}

/// Fields of a node to be created.
#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub subject: Subject,
    pub parent_id: Option<TagId>,
    pub is_system: bool,
    pub order: i64,
}

/// Mutable fields of an existing node.
#[derive(Debug, Clone, Default)]
pub struct TagUpdate {
    pub name: Option<String>,
}

/// Generic store over tag nodes.
///
/// Results of `find_nodes` are ordered by `order`, then creation time.
pub trait TagStore {
    fn find_nodes(&self, filter: &TagFilter) -> Result<Vec<TagNode>>;

    fn create_node(&self, fields: NewTag) -> Result<TagNode>;

    fn update_node(&self, id: &TagId, update: TagUpdate) -> Result<TagNode>;

    /// Returns the number of deleted nodes.
    fn delete_nodes(&self, filter: &TagFilter) -> Result<usize>;

    fn find_first(&self, filter: &TagFilter) -> Result<Option<TagNode>> {
        Ok(self.find_nodes(filter)?.into_iter().next())
    }
}
