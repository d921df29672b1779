use std::collections::HashMap;
use std::sync::Arc;

use super::native::{ParameterHandle, ParameterNode};
use crate::parameters::PluginParameter;

/// Semantic parameter list built from a unit's parameter tree, plus the
/// handles needed to read and write live values.
///
/// The tree is walked once per generation. A generation changes whenever
/// the unit is (re)instantiated or reconfigured.
#[derive(Default)]
pub(crate) struct ParameterCache {
    generation: Option<u64>,
    entries: Vec<PluginParameter>,
    handles: Vec<Arc<dyn ParameterHandle>>,
    by_id: HashMap<String, usize>,
}

impl ParameterCache {
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == Some(generation)
    }

    pub fn rebuild(&mut self, generation: u64, tree: Vec<ParameterNode>) {
        self.entries.clear();
        self.handles.clear();
        self.by_id.clear();
        for node in tree {
            self.walk(node, None);
        }
        self.generation = Some(generation);
    }

    fn walk(&mut self, node: ParameterNode, group: Option<&str>) {
        match node {
            ParameterNode::Group { name, children } => {
                for child in children {
                    self.walk(child, Some(name.as_str()));
                }
            }
            ParameterNode::Parameter(parameter) => {
                let id = if parameter.identifier.is_empty() {
                    parameter.address.to_string()
                } else {
                    parameter.identifier.clone()
                };
                if self.by_id.contains_key(&id) {
                    return;
                }
                self.by_id.insert(id.clone(), self.entries.len());
                self.entries.push(PluginParameter {
                    id,
                    name: parameter.display_name,
                    value: f64::from(parameter.handle.value()),
                    min: f64::from(parameter.min),
                    max: f64::from(parameter.max),
                    unit: parameter.unit_name,
                    group: group.map(str::to_owned),
                    read_only: !parameter.writable,
                });
                self.handles.push(parameter.handle);
            }
        }
    }

    /// Refreshes every value from its live handle and returns a snapshot.
    pub fn snapshot(&mut self) -> Vec<PluginParameter> {
        for (entry, handle) in self.entries.iter_mut().zip(&self.handles) {
            entry.value = f64::from(handle.value());
        }
        self.entries.clone()
    }

    /// Writes through to the native handle. Unknown and read-only ids are ignored.
    pub fn set(&mut self, id: &str, value: f64) -> bool {
        let Some(&index) = self.by_id.get(id) else {
            return false;
        };
        let entry = &mut self.entries[index];
        if entry.read_only {
            return false;
        }
        let value = entry.clamp(value);
        self.handles[index].set_value(value as f32);
        entry.value = value;
        true
    }
}
