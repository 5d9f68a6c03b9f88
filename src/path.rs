//! Location tracking for validation traversal.
//!
//! [`ElementPath`] is a persistent list of segments: descending shares the
//! parent's nodes instead of copying them, so a path can be handed to every
//! queued child of an object without the children seeing each other's
//! segments.

use std::fmt;
use std::sync::Arc;

/// A single step of an element path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A property name (the first segment is the resource or type name)
    Field(String),
    /// An index into the array held by the preceding field
    Index(usize),
}

#[derive(Debug)]
struct PathNode {
    segment: PathSegment,
    parent: Option<Arc<PathNode>>,
    depth: usize,
}

impl Drop for PathNode {
    // Unlinks the parent chain in a loop; the derived drop would recurse once
    // per segment.
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(node) = parent {
            parent = match Arc::into_inner(node) {
                Some(mut node) => node.parent.take(),
                None => None,
            };
        }
    }
}

/// Immutable FHIRPath-like location, e.g. `Patient.name[0].family`.
#[derive(Debug, Clone, Default)]
pub struct ElementPath {
    head: Option<Arc<PathNode>>,
}

impl ElementPath {
    /// Path rooted at a resource or type name.
    pub fn root(name: impl Into<String>) -> Self {
        Self::default().descend(PathSegment::Field(name.into()))
    }

    /// Returns a new path extended by `segment`; `self` is left untouched.
    pub fn descend(&self, segment: PathSegment) -> Self {
        let depth = self.depth() + 1;
        Self {
            head: Some(Arc::new(PathNode {
                segment,
                parent: self.head.clone(),
                depth,
            })),
        }
    }

    pub fn field(&self, name: impl Into<String>) -> Self {
        self.descend(PathSegment::Field(name.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.descend(PathSegment::Index(index))
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.head.as_ref().map_or(0, |node| node.depth)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Segments from root to leaf.
    pub fn segments(&self) -> Vec<&PathSegment> {
        let mut segments = Vec::with_capacity(self.depth());
        let mut current = self.head.as_deref();
        while let Some(node) = current {
            segments.push(&node.segment);
            current = node.parent.as_deref();
        }
        segments.reverse();
        segments
    }

    /// Renders the path as `Patient.name[0].family`.
    pub fn current_expression(&self) -> String {
        let mut out = String::new();
        for segment in self.segments() {
            match segment {
                PathSegment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Index(index) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    /// Name of the innermost field segment (`family` for `Patient.name[0].family`).
    pub fn last_field(&self) -> Option<&str> {
        self.fields().next()
    }

    /// Field enclosing the innermost one (`name` for `Patient.name[0].family`,
    /// `Patient` for `Patient.active`).
    pub fn parent_segment(&self) -> Option<&str> {
        self.fields().nth(1)
    }

    /// First segment, normally the resource type.
    pub fn root_name(&self) -> Option<&str> {
        let mut current = self.head.as_deref()?;
        while let Some(parent) = current.parent.as_deref() {
            current = parent;
        }
        match &current.segment {
            PathSegment::Field(name) => Some(name.as_str()),
            PathSegment::Index(_) => None,
        }
    }

    /// Field names from leaf to root.
    fn fields(&self) -> impl Iterator<Item = &str> {
        let mut current = self.head.as_deref();
        std::iter::from_fn(move || {
            while let Some(node) = current {
                current = node.parent.as_deref();
                if let PathSegment::Field(name) = &node.segment {
                    return Some(name.as_str());
                }
            }
            None
        })
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.current_expression())
    }
}

impl PartialEq for ElementPath {
    fn eq(&self, other: &Self) -> bool {
        self.segments() == other.segments()
    }
}

impl Eq for ElementPath {}
