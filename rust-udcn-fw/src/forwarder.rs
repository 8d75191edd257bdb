//! The Forwarder: owns every table and drives the packet-processing
//! pipelines (spec §4.8). Pipelines call into the effective strategy via
//! `StrategyApi`; the strategy calls back through the same façade to
//! actually send packets. The Forwarder itself never blocks and performs
//! at most one suspension point (scheduling a timer) per invocation (spec
//! §5).

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use rust_udcn_common::ndn::{Data, Interest, Nack, NackReason};

use rust_udcn_common::ndn::Name;

use crate::algorithm::{self, DuplicateNonceWhere};
use crate::face::{Face, FaceId, FaceTable, Scope};
use crate::scheduler::Scheduler;
use crate::strategy::{Strategy, StrategyApi, StrategyRegistry};
use crate::table::measurements::MeasurementsAccessor;
use crate::table::{dead_nonce_list::DeadNonceList, fib::Fib, measurements::Measurements, pit, strategy_choice::StrategyChoice};
use crate::Result;

/// Delay before erasing a satisfied PIT entry, once there is nothing left
/// to wait for (spec §6 `pit.straggler_timeout`, default 100 ms).
pub const DEFAULT_STRAGGLER_TIMEOUT: Duration = Duration::from_millis(100);

/// The strategy bound at `/` by `Forwarder::new` before any management
/// configuration runs (spec §6 `default_strategy`).
pub const DEFAULT_STRATEGY: &str = "/localhost/nfd/strategy/best-route";

/// Owns the FIB, PIT, Measurements, StrategyChoice, DeadNonceList, and the
/// `FaceTable`, and runs the six pipelines of spec §4.8. Always held behind
/// an `Rc` (`Forwarder::new` returns one) since pipeline steps schedule
/// timers that close over a weak reference back to the Forwarder itself.
pub struct Forwarder {
    pub faces: FaceTable,
    pub fib: Fib,
    pub pit: pit::Pit,
    pub measurements: Measurements,
    pub strategy_choice: StrategyChoice,
    pub dead_nonce_list: RefCell<DeadNonceList>,
    pub scheduler: Scheduler,
    straggler_timeout: Duration,
    self_weak: RefCell<Weak<Forwarder>>,
}

impl Forwarder {
    pub fn new() -> Rc<Self> {
        Self::with_straggler_timeout(DEFAULT_STRAGGLER_TIMEOUT)
    }

    pub fn with_straggler_timeout(straggler_timeout: Duration) -> Rc<Self> {
        let forwarder = Rc::new(Self {
            faces: FaceTable::new(),
            fib: Fib::new(),
            pit: pit::Pit::new(),
            measurements: Measurements::new(),
            strategy_choice: StrategyChoice::new(),
            dead_nonce_list: RefCell::new(DeadNonceList::new()),
            scheduler: Scheduler::new(),
            straggler_timeout,
            self_weak: RefCell::new(Weak::new()),
        });
        *forwarder.self_weak.borrow_mut() = Rc::downgrade(&forwarder);

        let weak = Rc::downgrade(&forwarder);
        forwarder.faces.on_before_remove(move |face_id| {
            if let Some(forwarder) = weak.upgrade() {
                forwarder.before_remove_face(face_id);
            }
        });

        let registry = StrategyRegistry::builtin();
        match registry.create(&Name::from_string(DEFAULT_STRATEGY)) {
            Ok(Some(strategy)) => forwarder.strategy_choice.install(&Name::from_string("/"), strategy),
            _ => unreachable!("best-route is always registered by StrategyRegistry::builtin"),
        }

        forwarder
    }

    fn strategy_api<'a>(&'a self, strategy_name: Rc<str>) -> StrategyApi<'a> {
        let host: Weak<dyn StrategyHost> = self.self_weak.borrow().clone();
        StrategyApi::new(
            &self.faces,
            &self.fib,
            MeasurementsAccessor::new(&self.measurements, strategy_name.clone()),
            &self.scheduler,
            host,
            strategy_name,
        )
    }

    /* ----------------------------------------------------------------- *
     * Incoming Interest (spec §4.8, steps 1-7)
     * ----------------------------------------------------------------- */

    pub fn on_incoming_interest(self: &Rc<Self>, in_face_id: FaceId, interest: Interest) {
        let Some(in_face) = self.faces.get(in_face_id) else {
            return;
        };

        // 1. /localhost may only arrive on a local face.
        if algorithm::is_under_localhost(&interest.name) && !matches!(in_face.scope(), Scope::Local) {
            return;
        }

        // 2. Loop check against DeadNonceList — no PIT entry is assumed to
        // exist, so the default on_interest_loop(in_face, interest) trigger
        // fires without one.
        if self.dead_nonce_list.borrow().has(&interest.name, interest.nonce) {
            self.fire_interest_loop(in_face_id, &interest);
            return;
        }

        // 3. PIT insert + duplicate-Nonce loop rules.
        let (entry, is_new) = self.pit.insert(interest.clone());
        if !is_new {
            let where_found = algorithm::find_duplicate_nonce(&entry.borrow(), interest.nonce, in_face_id);
            if where_found.contains(DuplicateNonceWhere::IN_SAME) {
                self.fire_interest_loop(in_face_id, &interest);
                return;
            }
            if where_found.contains(DuplicateNonceWhere::IN_OTHER)
                || where_found.contains(DuplicateNonceWhere::OUT_SAME)
                || where_found.contains(DuplicateNonceWhere::OUT_OTHER)
            {
                // Record the in-record (so the suppressed retransmission
                // still counts as "this downstream wants the Data") then
                // stop without forwarding.
                entry.borrow_mut().insert_or_update_in_record(in_face_id, &interest);
                return;
            }
        }

        // 4. Content Store is out of scope for this core (spec §10.7); no
        // hit is ever reported.

        // 5. Insert/update in-record.
        entry.borrow_mut().insert_or_update_in_record(in_face_id, &interest);

        // 6. Cancel any straggler/expiry timer — the entry is active again.
        entry.borrow_mut().cancel_expiry_timer();

        // 7. Dispatch to the effective strategy. The strategy bound at
        // entry-creation time sticks for the entry's whole lifetime (spec
        // §4.5) even if StrategyChoice is later reconfigured for the prefix.
        let strategy = self.strategy_choice.find_effective_strategy(interest.fib_lookup_name());
        if is_new {
            let name: Rc<str> = Rc::from(strategy.instance_name().to_string());
            entry.borrow_mut().chosen_strategy = Some(name);
        }
        let strategy_name = entry.borrow().chosen_strategy.clone().expect("set above");
        let api = self.strategy_api(strategy_name);
        strategy.after_receive_interest(&api, &entry, in_face_id, &interest);
    }

    fn fire_interest_loop(self: &Rc<Self>, in_face_id: FaceId, interest: &Interest) {
        let strategy = self
            .strategy_choice
            .find_effective_strategy(interest.fib_lookup_name());
        let api = self.strategy_api(Rc::from(strategy.instance_name().to_string()));
        strategy.on_interest_loop(&api, in_face_id, interest);
    }

    /// Resolves the strategy governing `entry`: the one captured at entry
    /// creation if set, otherwise a fresh StrategyChoice lookup (used for
    /// pipelines that can observe an entry created before this Forwarder
    /// instrumented `chosen_strategy`, e.g. in tests that build entries
    /// directly).
    fn strategy_for_entry(&self, entry: &Rc<RefCell<pit::Entry>>) -> (Rc<dyn Strategy>, Rc<str>) {
        let fib_name = entry.borrow().interest.fib_lookup_name().clone();
        let strategy = self.strategy_choice.find_effective_strategy(&fib_name);
        let name = entry
            .borrow()
            .chosen_strategy
            .clone()
            .unwrap_or_else(|| Rc::from(strategy.instance_name().to_string()));
        (strategy, name)
    }

    /* ----------------------------------------------------------------- *
     * Interest finalize (spec §4.8)
     * ----------------------------------------------------------------- */

    /// Schedules the finalize callback for `entry` at `max(in-record
    /// expiries) + straggler_timeout`, or immediately-plus-straggler if
    /// there are no in-records (a strategy must have called
    /// `set_expiry_timer` itself in that case; this core schedules the
    /// straggler unconditionally as a safety net so a passive strategy
    /// still converges).
    pub fn schedule_finalize(self: &Rc<Self>, entry: &Rc<RefCell<pit::Entry>>) {
        let delay = entry
            .borrow()
            .compute_expiry()
            .map(|expiry| expiry.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_millis(0))
            + self.straggler_timeout;

        let weak_self = Rc::downgrade(self);
        let weak_entry = Rc::downgrade(entry);
        let handle = self.scheduler.schedule_fn(delay, move || {
            let (Some(forwarder), Some(entry)) = (weak_self.upgrade(), weak_entry.upgrade()) else {
                return;
            };
            forwarder.finalize_interest(&entry);
        });
        entry.borrow_mut().set_expiry_timer_handle(handle);
    }

    /// For every in-record the Interest was never forwarded on behalf of
    /// (the entry carries no out-record at all), its (Name, Nonce) goes
    /// into `DeadNonceList` so a late retransmission of the same Interest
    /// is still recognized as looping even after this entry is gone.
    fn finalize_interest(self: &Rc<Self>, entry: &Rc<RefCell<pit::Entry>>) {
        let name = entry.borrow().interest.name.clone();
        let has_out_records = entry.borrow().out_records().next().is_some();
        if !has_out_records {
            let nonces: Vec<u32> = entry.borrow().in_records().map(|r| r.last_nonce).collect();
            let mut dnl = self.dead_nonce_list.borrow_mut();
            for nonce in nonces {
                dnl.add(&name, nonce);
            }
        }
        self.pit.erase(entry);
    }

    /* ----------------------------------------------------------------- *
     * Incoming Data (spec §4.8)
     * ----------------------------------------------------------------- */

    pub fn on_incoming_data(self: &Rc<Self>, in_face_id: FaceId, data: Data) {
        let Some(in_face) = self.faces.get(in_face_id) else {
            return;
        };

        // 1. /localhost Data may only come from a local face.
        if algorithm::is_under_localhost(&data.name) && !matches!(in_face.scope(), Scope::Local) {
            return;
        }

        // 2. Find every matching PIT entry.
        let matches = self.pit.find_all_data_matches(&data);
        if matches.is_empty() {
            return;
        }

        // 3. Satisfy each.
        for entry in matches {
            let (strategy, strategy_name) = self.strategy_for_entry(&entry);
            let api = self.strategy_api(strategy_name);

            entry.borrow_mut().is_satisfied = true;
            strategy.after_receive_data(&api, &entry, in_face_id, &data);

            let downstreams: Vec<FaceId> = entry
                .borrow()
                .in_records()
                .filter(|r| r.face != in_face_id)
                .map(|r| r.face)
                .collect();

            for down in &downstreams {
                strategy.before_satisfy_interest(&api, &entry, *down, &data);
            }
            for down in downstreams {
                let mut outgoing = data.clone();
                outgoing.pit_token = entry.borrow().get_in_record(down).and_then(|r| r.pit_token.clone());
                let _ = api.send_data(down, outgoing);
            }

            entry.borrow_mut().clear_in_records();
            self.schedule_finalize(&entry);
        }
    }

    /* ----------------------------------------------------------------- *
     * Incoming Nack (spec §4.8)
     * ----------------------------------------------------------------- */

    pub fn on_incoming_nack(self: &Rc<Self>, in_face_id: FaceId, nack: Nack) {
        // 1. Must match an existing out-record on in_face_id with the
        // Nack's Interest's Nonce; otherwise drop.
        let Some(entry) = self.pit.find(&nack.interest) else {
            return;
        };
        let has_matching_out_record = entry
            .borrow()
            .get_out_record(in_face_id)
            .is_some_and(|r| r.last_nonce == nack.interest.nonce);
        if !has_matching_out_record {
            return;
        }

        // 2. Attach.
        entry.borrow_mut().record_incoming_nack(in_face_id, nack.reason);

        // 3. Fire the trigger.
        let (strategy, strategy_name) = self.strategy_for_entry(&entry);
        let api = self.strategy_api(strategy_name);
        strategy.after_receive_nack(&api, &entry, in_face_id, &nack);
    }

    /* ----------------------------------------------------------------- *
     * Face lifecycle
     * ----------------------------------------------------------------- */

    /// Fired by `FaceTable::remove` before `face_id` is actually dropped.
    /// Purges it from the FIB, notifies every outstanding PIT entry's
    /// strategy, and drops any in/out-records referencing it.
    fn before_remove_face(self: &Rc<Self>, face_id: FaceId) {
        self.fib.remove_face(face_id);

        for entry in self.pit.iter() {
            let had_record =
                entry.borrow().get_in_record(face_id).is_some() || entry.borrow().get_out_record(face_id).is_some();
            if !had_record {
                continue;
            }
            let (strategy, strategy_name) = self.strategy_for_entry(&entry);
            let api = self.strategy_api(strategy_name);
            strategy.before_remove_face(&api, face_id);
            entry.borrow_mut().delete_in_record(face_id);
            entry.borrow_mut().delete_out_record(face_id);
        }
    }

    /// Outbound entry point used by callers outside any pipeline (e.g. a
    /// `forward` CLI subcommand driving `Forwarder` directly from a face's
    /// receive callbacks). `Forwarder` does not poll faces itself.
    pub fn dispatch(self: &Rc<Self>, in_face: FaceId, packet: ForwarderInput) {
        match packet {
            ForwarderInput::Interest(i) => self.on_incoming_interest(in_face, i),
            ForwarderInput::Data(d) => self.on_incoming_data(in_face, d),
            ForwarderInput::Nack(n) => self.on_incoming_nack(in_face, n),
        }
    }
}

/// The three packet kinds a face can hand the Forwarder.
pub enum ForwarderInput {
    Interest(Interest),
    Data(Data),
    Nack(Nack),
}

/// What `StrategyApi::schedule_retry` needs to re-enter the forwarding
/// tables later from a timer callback (spec §5: "a timer callback may
/// re-acquire weak references to its target", generalized to the façade
/// itself). `Forwarder` is the sole implementor; strategies only ever see
/// this through a `Weak<dyn StrategyHost>` captured by a scheduled closure,
/// never the concrete `Forwarder`.
pub trait StrategyHost {
    fn with_strategy_api(&self, strategy_name: Rc<str>, f: &mut dyn FnMut(&StrategyApi<'_>));
}

impl StrategyHost for Forwarder {
    fn with_strategy_api(&self, strategy_name: Rc<str>, f: &mut dyn FnMut(&StrategyApi<'_>)) {
        let api = self.strategy_api(strategy_name);
        f(&api);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{FaceState, LinkType, Persistency};
    use bytes::Bytes;
    use rust_udcn_common::ndn::Name;
    use std::cell::RefCell as StdRefCell;

    struct RecordingFace {
        id: FaceId,
        scope: Scope,
        sent_interests: StdRefCell<Vec<Interest>>,
        sent_data: StdRefCell<Vec<Data>>,
        sent_nacks: StdRefCell<Vec<Nack>>,
    }

    impl RecordingFace {
        fn new(id: u64, scope: Scope) -> Rc<Self> {
            Rc::new(Self {
                id: FaceId(id),
                scope,
                sent_interests: StdRefCell::new(Vec::new()),
                sent_data: StdRefCell::new(Vec::new()),
                sent_nacks: StdRefCell::new(Vec::new()),
            })
        }
    }

    impl Face for RecordingFace {
        fn id(&self) -> FaceId {
            self.id
        }
        fn scope(&self) -> Scope {
            self.scope
        }
        fn link_type(&self) -> LinkType {
            LinkType::PointToPoint
        }
        fn persistency(&self) -> Persistency {
            Persistency::Persistent
        }
        fn local_uri(&self) -> &str {
            "test://local"
        }
        fn remote_uri(&self) -> &str {
            "test://remote"
        }
        fn state(&self) -> FaceState {
            FaceState::Up
        }
        fn send_interest(&self, interest: Interest) -> Result<()> {
            self.sent_interests.borrow_mut().push(interest);
            Ok(())
        }
        fn send_data(&self, data: Data) -> Result<()> {
            self.sent_data.borrow_mut().push(data);
            Ok(())
        }
        fn send_nack(&self, nack: Nack) -> Result<()> {
            self.sent_nacks.borrow_mut().push(nack);
            Ok(())
        }
    }

    /// Always forwards a brand-new Interest to the lowest-cost FIB next-hop
    /// that isn't the downstream; never retransmits. Enough to exercise the
    /// Forwarder's pipeline plumbing without importing a reference strategy.
    struct TrivialBestRoute {
        name: Name,
    }

    impl Strategy for TrivialBestRoute {
        fn instance_name(&self) -> &Name {
            &self.name
        }
        fn after_receive_interest(
            &self,
            api: &StrategyApi<'_>,
            pit_entry: &Rc<RefCell<pit::Entry>>,
            in_face: FaceId,
            interest: &Interest,
        ) {
            let fib_entry = api.lookup_fib(interest);
            let next_hop = fib_entry
                .borrow()
                .next_hops()
                .iter()
                .find(|nh| nh.face != in_face)
                .map(|nh| nh.face);
            if let Some(out_face) = next_hop {
                let _ = api.send_interest(pit_entry, out_face, false);
            } else {
                api.send_nacks(pit_entry, NackReason::NoRoute);
            }
        }
    }

    fn install_trivial_strategy(forwarder: &Rc<Forwarder>) -> Rc<dyn Strategy> {
        let strategy: Rc<dyn Strategy> = Rc::new(TrivialBestRoute {
            name: Name::from_string("/localhost/nfd/strategy/trivial-best-route/%FD01"),
        });
        forwarder
            .strategy_choice
            .install(&Name::from_string("/"), strategy.clone());
        strategy
    }

    #[test]
    fn incoming_interest_is_forwarded_to_fib_nexthop() {
        let forwarder = Forwarder::new();
        install_trivial_strategy(&forwarder);

        let consumer = RecordingFace::new(1, Scope::NonLocal);
        let producer = RecordingFace::new(2, Scope::NonLocal);
        forwarder.faces.add_reserved(consumer.clone(), FaceId(1)).unwrap();
        forwarder.faces.add_reserved(producer.clone(), FaceId(2)).unwrap();

        let (entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&entry, FaceId(2), 10);

        let interest = Interest::new(Name::from_string("/a/b"));
        forwarder.on_incoming_interest(FaceId(1), interest);

        assert_eq!(producer.sent_interests.borrow().len(), 1);
        assert!(consumer.sent_interests.borrow().is_empty());
    }

    #[test]
    fn localhost_interest_from_non_local_face_is_dropped() {
        let forwarder = Forwarder::new();
        install_trivial_strategy(&forwarder);
        let in_face = RecordingFace::new(1, Scope::NonLocal);
        forwarder.faces.add_reserved(in_face, FaceId(1)).unwrap();

        let interest = Interest::new(Name::from_string("/localhost/nfd/status"));
        forwarder.on_incoming_interest(FaceId(1), interest);
        assert!(forwarder.pit.is_empty());
    }

    #[test]
    fn duplicate_nonce_same_face_fires_loop_nack() {
        let forwarder = Forwarder::new();
        install_trivial_strategy(&forwarder);
        let in_face = RecordingFace::new(1, Scope::NonLocal);
        let out_face = RecordingFace::new(2, Scope::NonLocal);
        forwarder.faces.add_reserved(in_face.clone(), FaceId(1)).unwrap();
        forwarder.faces.add_reserved(out_face.clone(), FaceId(2)).unwrap();
        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);

        let interest = Interest::new(Name::from_string("/a/b")).with_nonce(777);
        forwarder.on_incoming_interest(FaceId(1), interest.clone());
        forwarder.on_incoming_interest(FaceId(1), interest);

        assert_eq!(in_face.sent_nacks.borrow().len(), 1);
        assert_eq!(in_face.sent_nacks.borrow()[0].reason, NackReason::Duplicate);
    }

    #[test]
    fn incoming_data_satisfies_and_clears_the_entry() {
        let forwarder = Forwarder::new();
        install_trivial_strategy(&forwarder);
        let consumer = RecordingFace::new(1, Scope::NonLocal);
        let producer = RecordingFace::new(2, Scope::NonLocal);
        forwarder.faces.add_reserved(consumer.clone(), FaceId(1)).unwrap();
        forwarder.faces.add_reserved(producer.clone(), FaceId(2)).unwrap();
        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);

        let interest = Interest::new(Name::from_string("/a/b"));
        forwarder.on_incoming_interest(FaceId(1), interest);

        let data = Data::new(Name::from_string("/a/b"), Bytes::from_static(b"hello"));
        forwarder.on_incoming_data(FaceId(2), data);

        assert_eq!(consumer.sent_data.borrow().len(), 1);
    }

    #[test]
    fn removing_a_face_purges_it_from_the_fib() {
        let forwarder = Forwarder::new();
        install_trivial_strategy(&forwarder);
        let face = RecordingFace::new(2, Scope::NonLocal);
        let id = forwarder.faces.add(face);
        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, id, 10);

        forwarder.faces.remove(id);
        assert!(fib_entry.borrow().next_hops().is_empty());
    }
}
