//! Hierarchy of named controls built from a layout.

use std::sync::Arc;

use ahash::AHashMap;
use smallvec::SmallVec;
use statepad_layout::{
    decode, ControlDescriptor, ControlKind, ControlValue, LayoutDescriptor, VariantTag,
};

use crate::error::{Error, Result};

/// Index of a node inside its [`ControlTree`].
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct ControlNode {
    path: Arc<str>,
    depth: usize,
    kind: Option<ControlKind>,
    descriptor: Option<ControlDescriptor>,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
}

impl ControlNode {
    /// Full path as declared, e.g. `leftStick/x`.
    pub fn path(&self) -> &Arc<str> {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Kind of the control. Plain groups without a value have none.
    pub fn kind(&self) -> Option<ControlKind> {
        self.kind
    }

    /// The layout entry backing this node, absent for synthesized groups.
    pub fn descriptor(&self) -> Option<&ControlDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_noisy(&self) -> bool {
        self.descriptor.as_ref().is_some_and(ControlDescriptor::is_noisy)
    }
}

/// How a node's value is produced.
#[derive(Debug, Clone, Copy)]
enum Reader {
    Own,
    Vector { x: NodeId, y: NodeId },
    Dpad {
        up: NodeId,
        down: NodeId,
        left: NodeId,
        right: NodeId,
    },
    None,
}

/// Controls of one layout variant, linked into a tree by path segment.
///
/// Immutable once built and safe to share between threads.
#[derive(Debug)]
pub struct ControlTree {
    layout: Arc<LayoutDescriptor>,
    variant: VariantTag,
    nodes: Vec<ControlNode>,
    readers: Vec<Reader>,
    roots: Vec<NodeId>,
    index: AHashMap<Box<str>, NodeId>,
}

impl ControlTree {
    pub fn build(layout: Arc<LayoutDescriptor>, variant: VariantTag) -> Result<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            readers: Vec::new(),
            roots: Vec::new(),
            index: AHashMap::new(),
            variant,
            layout: Arc::clone(&layout),
        };

        let selection = tree.variant.clone();
        for control in layout.active_controls(&selection) {
            let id = tree.ensure_path(control.name());
            let node = &mut tree.nodes[id];
            if node.descriptor.is_some() {
                return Err(Error::DuplicateControl(control.name().to_string()));
            }
            node.kind = Some(control.kind());
            node.descriptor = Some(control.clone());
        }

        tree.readers = (0..tree.nodes.len()).map(|id| tree.reader_for(id)).collect();
        for id in 0..tree.nodes.len() {
            if tree.nodes[id].kind.is_none() {
                tree.nodes[id].kind = match tree.readers[id] {
                    Reader::Vector { .. } => Some(ControlKind::Stick),
                    Reader::Dpad { .. } => Some(ControlKind::Dpad),
                    _ => None,
                };
            }
        }

        log::debug!(
            "built control tree for {} ({}): {} nodes",
            tree.layout.name(),
            tree.variant,
            tree.nodes.len()
        );
        Ok(tree)
    }

    /// Returns the node for `path`, creating missing groups on the way.
    fn ensure_path(&mut self, path: &str) -> NodeId {
        let mut parent: Option<NodeId> = None;
        let mut end = 0;
        for (depth, segment) in path.split('/').enumerate() {
            end += segment.len() + usize::from(depth > 0);
            let prefix = &path[..end];
            let key: Box<str> = prefix.to_ascii_lowercase().into();
            let id = match self.index.get(&key) {
                Some(&id) => id,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(ControlNode {
                        path: prefix.into(),
                        depth,
                        kind: None,
                        descriptor: None,
                        parent,
                        children: SmallVec::new(),
                    });
                    match parent {
                        Some(p) => self.nodes[p].children.push(id),
                        None => self.roots.push(id),
                    }
                    self.index.insert(key, id);
                    id
                }
            };
            parent = Some(id);
        }
        // paths are never empty, so the loop ran at least once
        parent.unwrap_or_default()
    }

    fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name().eq_ignore_ascii_case(name))
    }

    fn reader_for(&self, id: NodeId) -> Reader {
        let node = &self.nodes[id];
        let composes_vector = matches!(
            node.kind,
            None | Some(ControlKind::Stick | ControlKind::Vector2)
        );
        let composes_dpad = matches!(node.kind, None | Some(ControlKind::Dpad));

        if composes_vector {
            if let (Some(x), Some(y)) = (self.child_named(id, "x"), self.child_named(id, "y")) {
                return Reader::Vector { x, y };
            }
        }
        if composes_dpad {
            let dirs = (
                self.child_named(id, "up"),
                self.child_named(id, "down"),
                self.child_named(id, "left"),
                self.child_named(id, "right"),
            );
            if let (Some(up), Some(down), Some(left), Some(right)) = dirs {
                return Reader::Dpad {
                    up,
                    down,
                    left,
                    right,
                };
            }
        }
        if node.descriptor.is_some() {
            Reader::Own
        } else {
            Reader::None
        }
    }

    pub fn layout(&self) -> &Arc<LayoutDescriptor> {
        &self.layout
    }

    pub fn variant(&self) -> &VariantTag {
        &self.variant
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&ControlNode> {
        self.nodes.get(id)
    }

    /// All nodes, parents before their children.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ControlNode)> {
        self.nodes.iter().enumerate()
    }

    /// Case-insensitive lookup by full path.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let key = path.trim_matches('/').to_ascii_lowercase();
        self.index.get(key.as_str()).copied()
    }

    pub fn is_readable(&self, id: NodeId) -> bool {
        !matches!(self.readers.get(id), None | Some(Reader::None))
    }

    pub fn read(&self, buf: &[u8], path: &str) -> Result<ControlValue> {
        let id = self
            .find(path)
            .ok_or_else(|| Error::UnknownControl(path.to_string()))?;
        self.read_node(buf, id)
    }

    pub fn read_node(&self, buf: &[u8], id: NodeId) -> Result<ControlValue> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| Error::UnknownControl(format!("#{id}")))?;

        match self.readers[id] {
            Reader::Own => match &node.descriptor {
                Some(desc) => Ok(decode(buf, desc)?),
                None => Err(Error::NotReadable(node.path.to_string())),
            },
            Reader::Vector { x, y } => {
                let x = self.read_scalar(buf, x)?;
                let y = self.read_scalar(buf, y)?;
                Ok(ControlValue::Vector2(x, y))
            }
            Reader::Dpad {
                up,
                down,
                left,
                right,
            } => {
                let x = self.read_scalar(buf, right)? - self.read_scalar(buf, left)?;
                let y = self.read_scalar(buf, up)? - self.read_scalar(buf, down)?;
                Ok(ControlValue::Vector2(x, y))
            }
            Reader::None => Err(Error::NotReadable(node.path.to_string())),
        }
    }

    fn read_scalar(&self, buf: &[u8], id: NodeId) -> Result<f32> {
        let value = self.read_node(buf, id)?;
        Ok(value.as_scalar().unwrap_or_else(|| value.magnitude()))
    }
}
