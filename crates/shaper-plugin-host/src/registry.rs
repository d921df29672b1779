//! Per-node plugin registry.
//!
//! The registry keeps one hosted instance per graph node that carries a
//! plugin reference. [`PluginHostRegistry::sync`] reconciles it against the
//! current node list; everything else is a short guarded lookup. The lock is
//! only held for map edits, never across a call into a backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::control::ControlHandle;
use crate::descriptor::PluginReference;
use crate::editor::{EditorContent, EditorPresenter, EditorWindows, WindowId};
use crate::formats::audio_unit::native::{ComponentInstantiator, ViewHandle};
use crate::formats::HostedPlugin;
use crate::graph::{GraphNode, NodeId};
use crate::instance::PluginInstance;
use crate::parameters::PluginParameter;
use crate::settings::HostSettings;

/// Invoked on the control thread with the node whose instance became ready.
pub type ReadyListener = Arc<dyn Fn(NodeId) + Send + Sync>;

#[derive(Default)]
struct Entries {
    instances: HashMap<NodeId, Arc<HostedPlugin>>,
    references: HashMap<NodeId, PluginReference>,
}

/// Node-to-instance registry plus editor window bookkeeping.
///
/// `F` is the caller's generic parameter-editor view, shown whenever a
/// plugin has no usable custom view.
pub struct PluginHostRegistry<F> {
    instantiator: Arc<dyn ComponentInstantiator>,
    control: ControlHandle,
    settings: RwLock<HostSettings>,
    entries: Arc<Mutex<Entries>>,
    ready_listener: Arc<Mutex<Option<ReadyListener>>>,
    windows: Arc<EditorWindows<F>>,
}

impl<F: Send + 'static> PluginHostRegistry<F> {
    pub fn new(
        instantiator: Arc<dyn ComponentInstantiator>,
        control: ControlHandle,
        presenter: Arc<dyn EditorPresenter<F>>,
        settings: HostSettings,
    ) -> Self {
        Self {
            instantiator,
            control,
            settings: RwLock::new(settings),
            entries: Arc::new(Mutex::new(Entries::default())),
            ready_listener: Arc::new(Mutex::new(None)),
            windows: Arc::new(EditorWindows::new(presenter)),
        }
    }

    pub fn settings(&self) -> HostSettings {
        self.settings.read().clone()
    }

    pub fn set_settings(&self, settings: HostSettings) {
        *self.settings.write() = settings;
    }

    /// Replaces the listener notified when any instance becomes ready.
    pub fn set_ready_listener(&self, listener: impl Fn(NodeId) + Send + Sync + 'static) {
        *self.ready_listener.lock() = Some(Arc::new(listener));
    }

    /// Reconciles the registry with the full current node list.
    ///
    /// Nodes whose reference is unchanged keep their instance. Nodes that
    /// disappeared or whose reference changed lose theirs; replaced
    /// instances are released after the lock is dropped.
    pub fn sync(&self, nodes: &[GraphNode]) {
        let wanted: HashMap<NodeId, &PluginReference> = nodes
            .iter()
            .filter_map(|node| node.plugin.as_ref().map(|reference| (node.id, reference)))
            .collect();

        let mut discarded = Vec::new();
        let mut created = Vec::new();
        {
            let mut entries = self.entries.lock();
            let Entries {
                instances,
                references,
            } = &mut *entries;

            references.retain(|node, _| wanted.contains_key(node));
            let removed: Vec<NodeId> = instances
                .keys()
                .filter(|node| !wanted.contains_key(node))
                .copied()
                .collect();
            for node in removed {
                if let Some(instance) = instances.remove(&node) {
                    discarded.push((node, instance));
                }
            }

            for (&node, &reference) in &wanted {
                if references.get(&node) == Some(reference) && instances.contains_key(&node) {
                    continue;
                }
                let instance = Arc::new(HostedPlugin::instantiate(
                    reference.clone(),
                    &self.instantiator,
                    &self.control,
                ));
                if let Some(previous) = instances.insert(node, Arc::clone(&instance)) {
                    discarded.push((node, previous));
                }
                references.insert(node, reference.clone());
                created.push((node, instance));
            }
        }

        self.windows.retain(|node| wanted.contains_key(node));

        for (node, instance) in created {
            debug!(%node, format = %instance.format(), identifier = %instance.reference().identifier, "plugin instance created");
            let listener = Arc::clone(&self.ready_listener);
            instance.on_ready(Box::new(move || {
                let listener = listener.lock().clone();
                if let Some(listener) = listener {
                    listener(node);
                }
            }));
        }
        for (node, instance) in discarded {
            debug!(%node, identifier = %instance.reference().identifier, "plugin instance discarded");
        }
    }

    pub fn instance(&self, node: NodeId) -> Option<Arc<HostedPlugin>> {
        self.entries.lock().instances.get(&node).cloned()
    }

    /// Reference the node's current instance was built from.
    pub fn reference(&self, node: NodeId) -> Option<PluginReference> {
        self.entries.lock().references.get(&node).cloned()
    }

    pub fn is_ready(&self, node: NodeId) -> bool {
        self.instance(node).is_some_and(|instance| instance.is_ready())
    }

    pub fn state_data(&self, node: NodeId) -> Option<Vec<u8>> {
        self.instance(node)?.state_data()
    }

    pub fn parameters(&self, node: NodeId) -> Vec<PluginParameter> {
        self.instance(node)
            .map(|instance| instance.parameters())
            .unwrap_or_default()
    }

    pub fn set_parameter(&self, node: NodeId, id: &str, value: f64) {
        if let Some(instance) = self.instance(node) {
            instance.set_parameter(id, value);
        }
    }

    /// Tracked nodes in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.entries.lock().instances.keys().copied().collect();
        nodes.sort();
        nodes
    }

    /// Opens, or brings forward, the editor window for `node`.
    ///
    /// The plugin's custom view is preferred; `fallback` is shown when the
    /// plugin has none, fails to produce one or times out. Returns false when
    /// the node has no instance.
    pub fn open_editor(&self, node: NodeId, fallback: F) -> bool {
        if self.windows.focus(node) {
            return true;
        }
        let Some(instance) = self.instance(node) else {
            return false;
        };
        let reference = instance.reference();
        let title = reference.name.clone();

        if reference.has_custom_ui == Some(false) {
            self.windows.open(node, &title, EditorContent::Fallback(fallback));
            return true;
        }

        if instance.supports_async_editor() {
            let timeout = self
                .settings
                .read()
                .editor_timeout(reference.component_key.as_ref());
            let windows = Arc::clone(&self.windows);
            let entries = Arc::downgrade(&self.entries);
            let requested_from = Arc::downgrade(&instance);
            instance.request_editor_view(
                timeout,
                Box::new(move |view| {
                    if !still_hosted(&entries, node, &requested_from) {
                        debug!(%node, "dropping editor view for a node that is no longer hosted");
                        return;
                    }
                    windows.open(node, &title, editor_content(view, fallback));
                }),
            );
        } else {
            let view = instance.editor_view();
            self.windows.open(node, &title, editor_content(view, fallback));
        }
        true
    }

    /// Forgets the node's window after the UI closed it.
    pub fn editor_closed(&self, node: NodeId) {
        if self.windows.close(node).is_some() {
            debug!(%node, "editor window closed");
        }
    }

    pub fn editor_window(&self, node: NodeId) -> Option<WindowId> {
        self.windows.window(node)
    }

    /// Drops every instance.
    pub fn clear(&self) {
        let drained = {
            let mut entries = self.entries.lock();
            entries.references.clear();
            std::mem::take(&mut entries.instances)
        };
        let nodes: HashSet<NodeId> = drained.keys().copied().collect();
        self.windows.retain(|node| !nodes.contains(node));
        info!(count = drained.len(), "plugin registry cleared");
    }
}

/// True while the registry still maps `node` to `instance`.
fn still_hosted(
    entries: &Weak<Mutex<Entries>>,
    node: NodeId,
    instance: &Weak<HostedPlugin>,
) -> bool {
    let (Some(entries), Some(instance)) = (entries.upgrade(), instance.upgrade()) else {
        return false;
    };
    let entries = entries.lock();
    entries
        .instances
        .get(&node)
        .is_some_and(|current| Arc::ptr_eq(current, &instance))
}

fn editor_content<F>(view: Option<ViewHandle>, fallback: F) -> EditorContent<F> {
    match view {
        Some(view) => EditorContent::Native(view),
        None => EditorContent::Fallback(fallback),
    }
}
