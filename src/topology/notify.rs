//! Change notification for objects that depend on a mesh.
//!
//! Two independent channels:
//!
//! - [`MeshReceiver`]s get a typed, ordered stream of [`MeshMessage`]s
//!   describing each structural change (which convex was added, removed or
//!   renumbered).
//! - [`ContextDependent`]s only learn that "something changed" and are
//!   expected to recheck their derived state lazily.
//!
//! Both lists hold [`Weak`] references: the mesh never keeps a dependent
//! alive. A dropped receiver is skipped and pruned on the next broadcast,
//! but callers should still [`unsubscribe`](Notifier::unsubscribe).

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::ConvexId;

/// Structural change broadcast by a mesh.
#[derive(Clone, Copy)]
pub enum MeshMessage<'a> {
    /// The whole mesh was emptied.
    Clear,
    /// The mesh is being dropped; it is still fully readable.
    Delete(&'a Mesh),
    AddConvex(ConvexId),
    RemoveConvex(ConvexId),
    /// Convexes `a` and `b` exchanged their ids.
    SwapConvex(ConvexId, ConvexId),
}

impl MeshMessage<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            MeshMessage::Clear => "Clear",
            MeshMessage::Delete(_) => "Delete",
            MeshMessage::AddConvex(_) => "AddConvex",
            MeshMessage::RemoveConvex(_) => "RemoveConvex",
            MeshMessage::SwapConvex(..) => "SwapConvex",
        }
    }
}

impl fmt::Debug for MeshMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshMessage::Clear => f.write_str("Clear"),
            MeshMessage::Delete(m) => f.debug_tuple("Delete").field(&m.uid()).finish(),
            MeshMessage::AddConvex(cv) => f.debug_tuple("AddConvex").field(cv).finish(),
            MeshMessage::RemoveConvex(cv) => f.debug_tuple("RemoveConvex").field(cv).finish(),
            MeshMessage::SwapConvex(a, b) => f.debug_tuple("SwapConvex").field(a).field(b).finish(),
        }
    }
}

fn unhandled(kind: &str) -> MeshError {
    MeshError::InternalConsistencyFault(format!("receiver does not handle {kind} messages"))
}

/// Object receiving the structural changes of a mesh.
///
/// Every handler defaults to an `InternalConsistencyFault`: a dependent that
/// does not expect a kind of change must not silently miss it.
pub trait MeshReceiver: Send + Sync {
    fn on_clear(&self) -> Result<(), MeshError> {
        Err(unhandled("Clear"))
    }

    fn on_delete(&self, _mesh: &Mesh) -> Result<(), MeshError> {
        Err(unhandled("Delete"))
    }

    fn on_add_convex(&self, _cv: ConvexId) -> Result<(), MeshError> {
        Err(unhandled("AddConvex"))
    }

    fn on_remove_convex(&self, _cv: ConvexId) -> Result<(), MeshError> {
        Err(unhandled("RemoveConvex"))
    }

    fn on_swap_convex(&self, _a: ConvexId, _b: ConvexId) -> Result<(), MeshError> {
        Err(unhandled("SwapConvex"))
    }

    /// Dispatches `msg` to the matching handler.
    fn receipt(&self, msg: &MeshMessage<'_>) -> Result<(), MeshError> {
        match *msg {
            MeshMessage::Clear => self.on_clear(),
            MeshMessage::Delete(m) => self.on_delete(m),
            MeshMessage::AddConvex(cv) => self.on_add_convex(cv),
            MeshMessage::RemoveConvex(cv) => self.on_remove_convex(cv),
            MeshMessage::SwapConvex(a, b) => self.on_swap_convex(a, b),
        }
    }
}

/// Object caching data derived from a mesh, told when to recheck it.
pub trait ContextDependent: Send + Sync {
    /// The mesh changed; `version` is its new [`Mesh::version`].
    fn context_changed(&self, version: u64);
}

/// Handle returned by [`Mesh::subscribe`](crate::mesh::Mesh::subscribe).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Handle returned by [`Mesh::add_dependent`](crate::mesh::Mesh::add_dependent).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DependencyId(u64);

/// Ordered list of weak entries with stable handles.
struct WeakList<T: ?Sized> {
    entries: Vec<(u64, Weak<T>)>,
    next: u64,
}

impl<T: ?Sized> fmt::Debug for WeakList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(k, w)| (k, w.strong_count() > 0)))
            .finish()
    }
}

impl<T: ?Sized> Default for WeakList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
        }
    }
}

impl<T: ?Sized> WeakList<T> {
    fn push(&mut self, w: Weak<T>) -> u64 {
        let key = self.next;
        self.next += 1;
        self.entries.push((key, w));
        key
    }

    fn remove(&mut self, key: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != key);
        before != self.entries.len()
    }

    /// Upgrades the live entries, pruning dead ones.
    fn live(&mut self) -> Vec<Arc<T>> {
        let mut out = Vec::with_capacity(self.entries.len());
        self.entries.retain(|(k, w)| match w.upgrade() {
            Some(a) => {
                out.push(a);
                true
            }
            None => {
                log::warn!("pruning dropped mesh dependent #{k}");
                false
            }
        });
        out
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Receiver list and synchronous broadcaster.
#[derive(Debug, Default)]
pub struct Notifier {
    receivers: Mutex<WeakList<dyn MeshReceiver>>,
}

impl Notifier {
    pub fn subscribe<R: MeshReceiver + 'static>(&mut self, receiver: &Arc<R>) -> SubscriptionId {
        let weak: Weak<dyn MeshReceiver> = Arc::downgrade(receiver) as Weak<dyn MeshReceiver>;
        SubscriptionId(self.receivers.get_mut().push(weak))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.receivers.get_mut().remove(id.0)
    }

    /// Number of registered receivers, including dropped ones not yet pruned.
    pub fn len(&self) -> usize {
        self.receivers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `msg` to every receiver in subscription order, stopping at
    /// the first fault.
    pub fn broadcast(&self, msg: &MeshMessage<'_>) -> Result<(), MeshError> {
        // The lock is released before delivery so receivers may read the mesh.
        let live = self.receivers.lock().live();
        log::trace!("broadcast {msg:?} to {} receiver(s)", live.len());
        for r in live {
            if let Err(e) = r.receipt(msg) {
                log::warn!("receiver rejected {}: {e}", msg.kind());
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Registered context dependents.
#[derive(Debug, Default)]
pub struct DependencyList {
    deps: Mutex<WeakList<dyn ContextDependent>>,
}

impl DependencyList {
    pub fn add<D: ContextDependent + 'static>(&mut self, dep: &Arc<D>) -> DependencyId {
        let weak: Weak<dyn ContextDependent> = Arc::downgrade(dep) as Weak<dyn ContextDependent>;
        DependencyId(self.deps.get_mut().push(weak))
    }

    pub fn remove(&mut self, id: DependencyId) -> bool {
        self.deps.get_mut().remove(id.0)
    }

    pub fn len(&self) -> usize {
        self.deps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self, version: u64) {
        let live = self.deps.lock().live();
        for d in live {
            d.context_changed(version);
        }
    }
}
