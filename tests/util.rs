#![allow(dead_code)]
use std::sync::Arc;

use fem_mesh::prelude::*;
use parking_lot::Mutex;

pub fn pid(u: usize) -> PointId {
    PointId::new(u)
}

pub fn cid(u: usize) -> ConvexId {
    ConvexId::new(u)
}

/// Unit square split along (1,0)-(0,1) into two triangles.
pub fn two_triangles(config: MeshConfig) -> (Mesh, ConvexId, ConvexId) {
    let mut m = Mesh::with_config(config);
    let a = m
        .add_triangle_by_points(&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0])
        .unwrap();
    let b = m
        .add_triangle_by_points(&[1.0, 0.0], &[1.0, 1.0], &[0.0, 1.0])
        .unwrap();
    (m, a, b)
}

/// `nx × ny` grid of unit quadrilaterals, convexes numbered row by row.
pub fn quad_grid(nx: usize, ny: usize) -> Mesh {
    let mut m = Mesh::new();
    for j in 0..ny {
        for i in 0..nx {
            let (x, y) = (i as f64, j as f64);
            m.add_parallelepiped_by_points(
                2,
                &[&[x, y], &[x + 1.0, y], &[x, y + 1.0], &[x + 1.0, y + 1.0]],
            )
            .unwrap();
        }
    }
    m
}

/// Owned copy of a [`MeshMessage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Clear,
    /// Delete, with the convex count read from the mesh at that moment.
    Delete(usize),
    Add(ConvexId),
    Remove(ConvexId),
    Swap(ConvexId, ConvexId),
}

/// Receiver logging every message; rejects `reject` when set.
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<Event>>,
    pub reject: Mutex<Option<&'static str>>,
    /// Matching messages let through before the next rejection.
    pub skip: Mutex<usize>,
    /// Stop rejecting after the first rejection.
    pub once: Mutex<bool>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn reject(&self, kind: &'static str) {
        *self.reject.lock() = Some(kind);
    }

    /// Accepts `skip` messages of `kind`, rejects the next one, then
    /// accepts everything again.
    pub fn reject_once_after(&self, kind: &'static str, skip: usize) {
        *self.skip.lock() = skip;
        *self.once.lock() = true;
        self.reject(kind);
    }

    fn should_reject(&self, kind: &'static str) -> bool {
        if *self.reject.lock() != Some(kind) {
            return false;
        }
        {
            let mut skip = self.skip.lock();
            if *skip > 0 {
                *skip -= 1;
                return false;
            }
        }
        if *self.once.lock() {
            *self.reject.lock() = None;
        }
        true
    }
}

impl MeshReceiver for Recorder {
    fn receipt(&self, msg: &MeshMessage<'_>) -> Result<(), MeshError> {
        if self.should_reject(msg.kind()) {
            return Err(MeshError::InternalConsistencyFault(format!(
                "{} rejected",
                msg.kind()
            )));
        }
        let ev = match *msg {
            MeshMessage::Clear => Event::Clear,
            MeshMessage::Delete(m) => Event::Delete(m.nb_convex()),
            MeshMessage::AddConvex(cv) => Event::Add(cv),
            MeshMessage::RemoveConvex(cv) => Event::Remove(cv),
            MeshMessage::SwapConvex(a, b) => Event::Swap(a, b),
        };
        self.events.lock().push(ev);
        Ok(())
    }
}

/// Counts touches through the dependency channel.
#[derive(Default)]
pub struct TouchCounter {
    pub count: Mutex<usize>,
    pub last_version: Mutex<u64>,
}

impl ContextDependent for TouchCounter {
    fn context_changed(&self, version: u64) {
        *self.count.lock() += 1;
        *self.last_version.lock() = version;
    }
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}
