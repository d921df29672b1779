//! Minimal view of the processing graph the registry reconciles against.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::PluginReference;

/// Stable identity of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Input,
    Output,
    Plugin,
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub plugin: Option<PluginReference>,
}

impl GraphNode {
    pub fn plugin(id: NodeId, reference: PluginReference) -> Self {
        Self {
            id,
            kind: NodeKind::Plugin,
            plugin: Some(reference),
        }
    }

    pub fn builtin(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            plugin: None,
        }
    }
}
