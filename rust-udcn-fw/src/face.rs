//! The abstract Face contract and the FaceTable that owns faces.
//!
//! A `Face` is an opaque, non-blocking packet endpoint; the forwarding core
//! never touches sockets directly; `rust-udcn-quic::Face` and any future
//! transport implement this trait. The core is ownership-strict about it:
//! `FaceTable` exclusively owns `Rc<dyn Face>` instances, and every other
//! table (FIB next-hops, PIT in/out-records) keeps only a `FaceId`, looking
//! the face back up through the table when it actually needs to send.

use rust_udcn_common::ndn::{Data, Interest, Nack};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};

/// Stable face identifier. `0` is invalid; ids below `FaceTable::FIRST_FREE_ID`
/// are reserved for internal/special faces (e.g. a future contentstore
/// pseudo-face) and are only usable via `FaceTable::add_reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId(pub u64);

impl FaceId {
    pub const INVALID: FaceId = FaceId(0);
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a face terminates locally (this host) or reaches a remote peer.
/// Governs `/localhost` and `/localhop` scope checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    NonLocal,
}

/// Whether a face can reach exactly one peer or a shared medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    PointToPoint,
    MultiAccess,
    AdHoc,
}

/// Face lifecycle policy, set by management at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistency {
    OnDemand,
    Persistent,
    Permanent,
}

/// Up/Down/Closed, reported via `after_state_change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceState {
    Up,
    Down,
    Closed,
}

/// The contract the forwarding core consumes. Implementations must be
/// non-blocking: `send_*` enqueue onto the underlying transport and return
/// immediately, matching §5's "face transports are expected to be fully
/// non-blocking."
pub trait Face {
    fn id(&self) -> FaceId;
    fn scope(&self) -> Scope;
    fn link_type(&self) -> LinkType;
    fn persistency(&self) -> Persistency;
    fn local_uri(&self) -> &str;
    fn remote_uri(&self) -> &str;
    fn state(&self) -> FaceState;

    fn send_interest(&self, interest: Interest) -> Result<()>;
    fn send_data(&self, data: Data) -> Result<()>;
    fn send_nack(&self, nack: Nack) -> Result<()>;
}

type AfterAddHook = Box<dyn FnMut(FaceId)>;
type BeforeRemoveHook = Box<dyn FnMut(FaceId)>;

/// Registry of active faces, keyed by `FaceId`. Exclusively owns `Rc<dyn
/// Face>`; every other component keeps only the id.
pub struct FaceTable {
    faces: RefCell<BTreeMap<FaceId, Rc<dyn Face>>>,
    next_id: RefCell<u64>,
    after_add: RefCell<Vec<AfterAddHook>>,
    before_remove: RefCell<Vec<BeforeRemoveHook>>,
}

impl FaceTable {
    /// First id handed out by `add`; ids below this are reserved for
    /// internal/special faces and only reachable via `add_reserved`.
    pub const FIRST_FREE_ID: u64 = 256;

    pub fn new() -> Self {
        Self {
            faces: RefCell::new(BTreeMap::new()),
            next_id: RefCell::new(Self::FIRST_FREE_ID),
            after_add: RefCell::new(Vec::new()),
            before_remove: RefCell::new(Vec::new()),
        }
    }

    /// Registers a callback invoked after a face is added.
    pub fn on_after_add<F: FnMut(FaceId) + 'static>(&self, callback: F) {
        self.after_add.borrow_mut().push(Box::new(callback));
    }

    /// Registers a callback invoked before a face is removed (while it is
    /// still resolvable through `get`).
    pub fn on_before_remove<F: FnMut(FaceId) + 'static>(&self, callback: F) {
        self.before_remove.borrow_mut().push(Box::new(callback));
    }

    /// Assigns the next sequential id and stores the face.
    pub fn add(&self, face: Rc<dyn Face>) -> FaceId {
        let mut next_id = self.next_id.borrow_mut();
        let id = FaceId(*next_id);
        *next_id += 1;
        drop(next_id);
        self.faces.borrow_mut().insert(id, face);
        for hook in self.after_add.borrow_mut().iter_mut() {
            hook(id);
        }
        id
    }

    /// Inserts a face under a caller-chosen reserved id. Fails if the id is
    /// already in use.
    pub fn add_reserved(&self, face: Rc<dyn Face>, id: FaceId) -> Result<()> {
        let mut faces = self.faces.borrow_mut();
        if faces.contains_key(&id) {
            return Err(Error::Face(format!("face id {} already in use", id)));
        }
        faces.insert(id, face);
        drop(faces);
        for hook in self.after_add.borrow_mut().iter_mut() {
            hook(id);
        }
        Ok(())
    }

    pub fn get(&self, id: FaceId) -> Option<Rc<dyn Face>> {
        self.faces.borrow().get(&id).cloned()
    }

    /// Fires `before_remove` then drops the owning reference.
    pub fn remove(&self, id: FaceId) {
        for hook in self.before_remove.borrow_mut().iter_mut() {
            hook(id);
        }
        self.faces.borrow_mut().remove(&id);
    }

    /// All face ids in ascending order.
    pub fn ids(&self) -> Vec<FaceId> {
        self.faces.borrow().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.faces.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.borrow().is_empty()
    }
}

impl Default for FaceTable {
    fn default() -> Self {
        Self::new()
    }
}
