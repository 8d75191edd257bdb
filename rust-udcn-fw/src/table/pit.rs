//! Pending Interest Table (spec §4.3).
//!
//! Keyed by (Name, selectors, ForwardingHint) — see
//! `Interest::matches_pit_key` in `rust_udcn_common::ndn`. Entries are
//! reference-counted (`Rc<RefCell<Entry>>`) so strategies and the Forwarder
//! can both hold non-owning-in-spirit handles that are really just clones of
//! the owning `Rc`; the PIT itself is the only place an entry is removed
//! from, matching §3's "PIT entries are exclusively owned by the PIT."

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use rust_udcn_common::ndn::{Data, Interest, NackReason};

use crate::face::FaceId;
use crate::scheduler::ScopedEventId;
use crate::strategy_info::StrategyInfoMap;

/// Per-downstream-face record: the last Interest received from that face.
#[derive(Debug, Clone)]
pub struct InRecord {
    pub face: FaceId,
    pub last_nonce: u32,
    pub last_renewed: Instant,
    pub expiry: Instant,
    /// Opaque token carried on the Interest that created/renewed this
    /// record; round-tripped onto the Data sent back to this downstream
    /// (spec §10.6 "PIT tokens").
    pub pit_token: Option<Bytes>,
    /// Set by self-learning forwarding: this downstream's Interests no
    /// longer need discovery (broadcast) treatment.
    pub is_non_discovery: bool,
}

/// Per-upstream-face record: the last Interest sent on that face.
#[derive(Debug, Clone)]
pub struct OutRecord {
    pub face: FaceId,
    pub last_nonce: u32,
    pub last_renewed: Instant,
    pub expiry: Instant,
    pub incoming_nack: Option<NackReason>,
}

/// One outstanding Interest-shape. See spec §4.3 for the full invariant
/// list; `strategy_info` is the polymorphic per-strategy bookkeeping slot
/// shared with Measurements entries (spec §9 "Polymorphic strategy-info").
pub struct Entry {
    pub interest: Interest,
    in_records: Vec<InRecord>,
    out_records: Vec<OutRecord>,
    pub is_satisfied: bool,
    pub strategy_info: StrategyInfoMap,
    /// The strategy bound to this entry's Name at the time it was created;
    /// per spec §4.5, an in-flight entry keeps its originally-chosen
    /// strategy even if `StrategyChoice` is later changed for the prefix.
    pub chosen_strategy: Option<Rc<str>>,
    expiry_timer: Option<ScopedEventId>,
}

impl Entry {
    fn new(interest: Interest) -> Self {
        Self {
            interest,
            in_records: Vec::new(),
            out_records: Vec::new(),
            is_satisfied: false,
            strategy_info: StrategyInfoMap::new(),
            chosen_strategy: None,
            expiry_timer: None,
        }
    }

    pub fn in_records(&self) -> impl Iterator<Item = &InRecord> {
        self.in_records.iter()
    }

    pub fn out_records(&self) -> impl Iterator<Item = &OutRecord> {
        self.out_records.iter()
    }

    pub fn get_in_record(&self, face: FaceId) -> Option<&InRecord> {
        self.in_records.iter().find(|r| r.face == face)
    }

    pub fn get_out_record(&self, face: FaceId) -> Option<&OutRecord> {
        self.out_records.iter().find(|r| r.face == face)
    }

    pub fn has_unexpired_out_records(&self) -> bool {
        let now = Instant::now();
        self.out_records.iter().any(|r| r.expiry > now)
    }

    pub fn has_unexpired_out_record_for(&self, face: FaceId) -> bool {
        let now = Instant::now();
        self.out_records
            .iter()
            .any(|r| r.face == face && r.expiry > now)
    }

    /// Inserts or updates the in-record for `face` with `interest`'s Nonce
    /// and lifetime. Expiry = now + Interest lifetime.
    pub fn insert_or_update_in_record(&mut self, face: FaceId, interest: &Interest) {
        let now = Instant::now();
        let expiry = now + Duration::from_millis(interest.lifetime_ms as u64);
        match self.in_records.iter_mut().find(|r| r.face == face) {
            Some(r) => {
                r.last_nonce = interest.nonce;
                r.last_renewed = now;
                r.expiry = expiry;
                r.pit_token = interest.pit_token.clone();
            }
            None => self.in_records.push(InRecord {
                face,
                last_nonce: interest.nonce,
                last_renewed: now,
                expiry,
                pit_token: interest.pit_token.clone(),
                is_non_discovery: false,
            }),
        }
    }

    /// Inserts or updates the out-record for `face`. `fresh_nonce`, when
    /// given, is the Nonce actually put on the wire (a "probe" when it
    /// differs from the original Interest's Nonce); otherwise the
    /// Interest's own Nonce is recorded.
    pub fn insert_or_update_out_record(&mut self, face: FaceId, interest: &Interest) {
        self.insert_or_update_out_record_with_nonce(face, interest, interest.nonce);
    }

    pub fn insert_or_update_out_record_with_nonce(
        &mut self,
        face: FaceId,
        interest: &Interest,
        nonce: u32,
    ) {
        let now = Instant::now();
        let expiry = now + Duration::from_millis(interest.lifetime_ms as u64);
        match self.out_records.iter_mut().find(|r| r.face == face) {
            Some(r) => {
                r.last_nonce = nonce;
                r.last_renewed = now;
                r.expiry = expiry;
                r.incoming_nack = None;
            }
            None => self.out_records.push(OutRecord {
                face,
                last_nonce: nonce,
                last_renewed: now,
                expiry,
                incoming_nack: None,
            }),
        }
    }

    /// Marks `face`'s in-record as no longer needing discovery (broadcast)
    /// treatment, once a route has been learned for it (spec §4.9
    /// self-learning). No-op if there is no in-record for `face`.
    pub fn set_in_record_non_discovery(&mut self, face: FaceId, is_non_discovery: bool) {
        if let Some(r) = self.in_records.iter_mut().find(|r| r.face == face) {
            r.is_non_discovery = is_non_discovery;
        }
    }

    pub fn delete_in_record(&mut self, face: FaceId) {
        self.in_records.retain(|r| r.face != face);
    }

    pub fn delete_out_record(&mut self, face: FaceId) {
        self.out_records.retain(|r| r.face != face);
    }

    pub fn clear_in_records(&mut self) {
        self.in_records.clear();
    }

    /// Attaches an incoming Nack's reason to the out-record for `face`.
    /// No-op if there is no out-record for `face` (caller should have
    /// checked per the incoming-Nack pipeline step).
    pub fn record_incoming_nack(&mut self, face: FaceId, reason: NackReason) {
        if let Some(r) = self.out_records.iter_mut().find(|r| r.face == face) {
            r.incoming_nack = Some(reason);
        }
    }

    /// Entry expiry per spec §4.3: `max` of in-record expiries, or
    /// whatever `set_expiry_timer` last established if there are none.
    pub fn compute_expiry(&self) -> Option<Instant> {
        self.in_records.iter().map(|r| r.expiry).max()
    }

    /// Installs (replacing any previous) expiry/straggler timer handle.
    /// Dropping the previous handle cancels it, matching §5's cancellation
    /// semantics.
    pub fn set_expiry_timer_handle(&mut self, handle: ScopedEventId) {
        self.expiry_timer = Some(handle);
    }

    pub fn cancel_expiry_timer(&mut self) {
        self.expiry_timer = None;
    }
}

/// Key used to deduplicate PIT entries: everything that defines Interest
/// "shape" per spec §4.3, excluding Nonce and lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PitKey {
    name: rust_udcn_common::ndn::Name,
    can_be_prefix: bool,
    must_be_fresh: bool,
    selectors: rust_udcn_common::ndn::Selectors,
    forwarding_hint: Option<rust_udcn_common::ndn::Name>,
}

impl PitKey {
    fn of(interest: &Interest) -> Self {
        Self {
            name: interest.name.clone(),
            can_be_prefix: interest.can_be_prefix,
            must_be_fresh: interest.must_be_fresh,
            selectors: interest.selectors.clone(),
            forwarding_hint: interest.forwarding_hint.clone(),
        }
    }
}

/// The Pending Interest Table. Entries are `Rc<RefCell<Entry>>` so that the
/// Forwarder, strategies, and scheduled timer callbacks can all hold a
/// reference without the PIT needing interior `unsafe`.
pub struct Pit {
    entries: RefCell<HashMap<PitKey, Rc<RefCell<Entry>>>>,
}

impl Pit {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the existing entry for `interest`'s shape, or inserts a new
    /// one. The bool indicates whether a new entry was created.
    pub fn insert(&self, interest: Interest) -> (Rc<RefCell<Entry>>, bool) {
        let key = PitKey::of(&interest);
        let mut entries = self.entries.borrow_mut();
        if let Some(existing) = entries.get(&key) {
            return (existing.clone(), false);
        }
        let entry = Rc::new(RefCell::new(Entry::new(interest)));
        entries.insert(key, entry.clone());
        (entry, true)
    }

    /// Finds the entry (if any) already present for `interest`'s shape,
    /// without creating one.
    pub fn find(&self, interest: &Interest) -> Option<Rc<RefCell<Entry>>> {
        let key = PitKey::of(interest);
        self.entries.borrow().get(&key).cloned()
    }

    /// `find_all_data_matches`: every entry whose canonical Interest is
    /// satisfied by `data`, per NDN matching rules.
    pub fn find_all_data_matches(&self, data: &Data) -> Vec<Rc<RefCell<Entry>>> {
        self.entries
            .borrow()
            .values()
            .filter(|e| e.borrow().interest.is_satisfied_by(data))
            .cloned()
            .collect()
    }

    /// Removes `entry` from the table. Dropping the last `Rc` to it drops
    /// its `strategy_info` map, canceling any timers it owned.
    pub fn erase(&self, entry: &Rc<RefCell<Entry>>) {
        let key = PitKey::of(&entry.borrow().interest);
        self.entries.borrow_mut().remove(&key);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn iter(&self) -> Vec<Rc<RefCell<Entry>>> {
        self.entries.borrow().values().cloned().collect()
    }
}

impl Default for Pit {
    fn default() -> Self {
        Self::new()
    }
}
