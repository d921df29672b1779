use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::control::ControlHandle;
use crate::formats::audio_unit::native::{ViewHandle, ViewReply};
use crate::graph::NodeId;

/// Identifier of a window created by the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// Content placed in an editor window.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorContent<F> {
    /// The plugin's own custom view.
    Native(ViewHandle),
    /// Generic parameter editor supplied by the caller.
    Fallback(F),
}

/// Window management supplied by the UI collaborator.
pub trait EditorPresenter<F>: Send + Sync {
    fn present(&self, node: NodeId, title: &str, content: EditorContent<F>) -> WindowId;
    fn bring_to_front(&self, window: WindowId);
}

/// Delivers a view result at most once, on the control thread.
///
/// Both the unit's own reply and the timeout race to deliver; whichever
/// arrives first wins and the other is discarded.
#[derive(Clone)]
pub(crate) struct OneShotReply {
    slot: Arc<Mutex<Option<ViewReply>>>,
}

impl OneShotReply {
    pub fn new(reply: ViewReply) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(reply))),
        }
    }

    /// Returns false when a result was already delivered.
    pub fn deliver(&self, control: &ControlHandle, view: Option<ViewHandle>) -> bool {
        let Some(reply) = self.slot.lock().take() else {
            return false;
        };
        control.dispatch(move || reply(view));
        true
    }
}

/// One editor window per graph node.
pub(crate) struct EditorWindows<F> {
    presenter: Arc<dyn EditorPresenter<F>>,
    open: Mutex<HashMap<NodeId, WindowId>>,
}

impl<F> EditorWindows<F> {
    pub fn new(presenter: Arc<dyn EditorPresenter<F>>) -> Self {
        Self {
            presenter,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Brings an existing window forward. Returns false when the node has none.
    pub fn focus(&self, node: NodeId) -> bool {
        let window = self.open.lock().get(&node).copied();
        match window {
            Some(window) => {
                self.presenter.bring_to_front(window);
                true
            }
            None => false,
        }
    }

    /// Opens a window for `node`, or focuses the one that appeared while the
    /// view was being requested.
    pub fn open(&self, node: NodeId, title: &str, content: EditorContent<F>) -> WindowId {
        if let Some(window) = self.open.lock().get(&node).copied() {
            self.presenter.bring_to_front(window);
            return window;
        }
        let window = self.presenter.present(node, title, content);
        debug!(?node, ?window, "editor window opened");
        *self.open.lock().entry(node).or_insert(window)
    }

    pub fn close(&self, node: NodeId) -> Option<WindowId> {
        self.open.lock().remove(&node)
    }

    pub fn window(&self, node: NodeId) -> Option<WindowId> {
        self.open.lock().get(&node).copied()
    }

    /// Forgets windows of nodes that are no longer tracked.
    pub fn retain(&self, mut keep: impl FnMut(&NodeId) -> bool) {
        self.open.lock().retain(|node, _| keep(node));
    }
}
