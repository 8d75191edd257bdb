//! Adaptive SRTT-based Forwarding (spec §4.9): per-namespace, per-face RTT
//! measurements rank eligible next-hops into priority groups (measured-and-
//! healthy, never-measured, timed-out) and pick the best; a periodic probe
//! occasionally samples a non-best face so its measurement doesn't go
//! stale.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use rand::Rng;

use rust_udcn_common::ndn::{Interest, Name, NackReason};

use crate::algorithm::RttEstimator;
use crate::face::FaceId;
use crate::scheduler::{ScopedEventId, Scheduler};
use crate::strategy::{Strategy, StrategyApi};
use crate::table::measurements;
use crate::table::pit;

/// How often a namespace gets an extra probe to a non-best face (spec
/// §4.9's default probing interval).
const DEFAULT_PROBING_INTERVAL: Duration = Duration::from_secs(60);

/// Sentinel RTT recorded for a face that has timed out, deliberately worse
/// than any real measurement so it always ranks into the lowest priority
/// group.
const RTT_TIMEOUT: Duration = Duration::from_secs(3600);

struct FaceInfo {
    rtt: RttEstimator,
    last_rtt: Option<Duration>,
    silent_timeout_count: u32,
    rto_timer: Option<ScopedEventId>,
}

impl FaceInfo {
    fn new() -> Self {
        Self {
            rtt: RttEstimator::new(),
            last_rtt: None,
            silent_timeout_count: 0,
            rto_timer: None,
        }
    }

    /// 1 = measured and not currently timed out, 2 = never measured, 3 =
    /// timed out (spec §4.9).
    fn priority_group(&self) -> u8 {
        if self.last_rtt == Some(RTT_TIMEOUT) {
            3
        } else if self.rtt.has_samples() {
            1
        } else {
            2
        }
    }

    fn sort_key(&self) -> (u8, Duration) {
        let srtt = self.rtt.smoothed_rtt().unwrap_or(RTT_TIMEOUT);
        (self.priority_group(), srtt)
    }
}

struct NamespaceInfo {
    faces: HashMap<FaceId, FaceInfo>,
    is_probing_due: bool,
    probing_timer: Option<ScopedEventId>,
}

impl NamespaceInfo {
    fn new() -> Self {
        Self {
            faces: HashMap::new(),
            is_probing_due: false,
            probing_timer: None,
        }
    }
}

/// Arms (and re-arms itself on each fire) the periodic probing-due flag for
/// a namespace, mutating `NamespaceInfo` through a plain weak handle to the
/// owning Measurements entry — no re-entry into the forwarding tables is
/// needed, unlike access/ncc's RTO handlers, since flipping the flag is all
/// this timer does; the actual probe send happens synchronously the next
/// time an Interest for this namespace arrives.
fn arm_probing_timer(
    scheduler: Scheduler,
    weak_entry: Weak<RefCell<measurements::EntryData>>,
    interval: Duration,
) -> ScopedEventId {
    let rearm_weak = weak_entry.clone();
    scheduler.schedule_fn(interval, move || {
        let Some(entry) = rearm_weak.upgrade() else {
            return;
        };
        let next_timer = arm_probing_timer(scheduler, rearm_weak.clone(), interval);
        if let Some(ns) = entry.borrow_mut().strategy_info.get_mut::<NamespaceInfo>() {
            ns.is_probing_due = true;
            ns.probing_timer = Some(next_timer);
        }
    })
}

/// Arms a one-shot RTO timer for `face`'s outstanding attempt in this
/// namespace: on expiry, marks the face timed out so the next ranking
/// demotes it to priority group 3. Mutation-only, same reasoning as
/// `arm_probing_timer`.
fn arm_rto_timer(
    scheduler: &Scheduler,
    weak_entry: Weak<RefCell<measurements::EntryData>>,
    face: FaceId,
    rto: Duration,
) -> ScopedEventId {
    scheduler.schedule_fn(rto, move || {
        let Some(entry) = weak_entry.upgrade() else {
            return;
        };
        if let Some(ns) = entry.borrow_mut().strategy_info.get_mut::<NamespaceInfo>() {
            if let Some(fi) = ns.faces.get_mut(&face) {
                fi.last_rtt = Some(RTT_TIMEOUT);
                fi.silent_timeout_count += 1;
            }
        }
    })
}

/// Picks a probe face stochastically: rank 1 is the best-measured
/// candidate, rank n the worst; probability of selection is `(n + 1 -
/// rank) / sum_of_ranks` (spec §4.9).
fn choose_probe_face(candidates: &[FaceId]) -> Option<FaceId> {
    let n = candidates.len();
    if n == 0 {
        return None;
    }
    let sum: f64 = (1..=n).map(|rank| (n + 1 - rank) as f64).sum();
    let mut roll = rand::thread_rng().gen_range(0.0..sum);
    for (rank, face) in candidates.iter().enumerate().map(|(i, f)| (i + 1, f)) {
        let weight = (n + 1 - rank) as f64;
        if roll < weight {
            return Some(*face);
        }
        roll -= weight;
    }
    candidates.last().copied()
}

/// The only instance-name version this strategy implements.
const SUPPORTED_VERSION: u64 = 1;

const PARAM_PROBING_INTERVAL: &str = "probing-interval";

pub struct Asf {
    name: Name,
    probing_interval: Duration,
}

impl Asf {
    /// Constructs ASF from an instance name of the form
    /// `/localhost/nfd/strategy/asf[/%FD01][/probing-interval~<ms>]` (spec
    /// §4.9/§6, §10.4). Fails with `Error::Strategy` on an unsupported
    /// version or an unrecognized parameter.
    pub fn new(name: Name) -> crate::Result<Rc<dyn Strategy>> {
        Self::build(name).map(|s| Rc::new(s) as Rc<dyn Strategy>)
    }

    fn build(name: Name) -> crate::Result<Self> {
        let parsed = crate::strategy::parse_instance_name(&name);
        crate::strategy::require_supported_version(&parsed, SUPPORTED_VERSION)?;
        let params = crate::strategy::parse_known_parameters(&parsed, &[PARAM_PROBING_INTERVAL])?;
        let probing_interval =
            crate::strategy::parse_millis_parameter(&params, PARAM_PROBING_INTERVAL)?.unwrap_or(DEFAULT_PROBING_INTERVAL);

        Ok(Self { name, probing_interval })
    }
}

impl Strategy for Asf {
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
        let namespace = fib_entry.borrow().prefix.clone();
        let ns_entry = api.measurements.get(&namespace);

        {
            let mut ns = ns_entry.borrow_mut();
            let info = ns.strategy_info.get_or_insert_with(NamespaceInfo::new);
            if info.probing_timer.is_none() {
                let weak_entry = Rc::downgrade(&ns_entry);
                info.probing_timer = Some(arm_probing_timer(*api.scheduler, weak_entry, self.probing_interval));
            }
        }

        let hops: Vec<FaceId> = fib_entry
            .borrow()
            .next_hops()
            .iter()
            .map(|nh| nh.face)
            .filter(|&hop| super::is_next_hop_eligible(api, pit_entry, in_face, hop))
            .collect();

        if hops.is_empty() {
            if !pit_entry.borrow().has_unexpired_out_records() {
                api.send_nacks(pit_entry, NackReason::NoRoute);
                api.reject_pending_interest(pit_entry);
            }
            return;
        }

        let mut ranked: Vec<FaceId> = {
            let mut ns = ns_entry.borrow_mut();
            let info = ns.strategy_info.get_or_insert_with(NamespaceInfo::new);
            let mut ranked = hops.clone();
            ranked.sort_by_key(|hop| {
                let key = info
                    .faces
                    .entry(*hop)
                    .or_insert_with(FaceInfo::new)
                    .sort_key();
                (key.0, key.1.as_nanos())
            });
            ranked
        };

        let best = ranked.remove(0);
        if api.send_interest(pit_entry, best, false).is_ok() {
            let rto = ns_entry
                .borrow()
                .strategy_info
                .get::<NamespaceInfo>()
                .and_then(|info| info.faces.get(&best))
                .map(|fi| fi.rtt.compute_rto())
                .unwrap_or(RttEstimator::DEFAULT_MIN_RTO);
            let weak_entry = Rc::downgrade(&ns_entry);
            let timer = arm_rto_timer(api.scheduler, weak_entry, best, rto);
            if let Some(info) = ns_entry.borrow_mut().strategy_info.get_mut::<NamespaceInfo>() {
                if let Some(fi) = info.faces.get_mut(&best) {
                    fi.rto_timer = Some(timer);
                }
            }
        }

        let should_probe = ns_entry
            .borrow()
            .strategy_info
            .get::<NamespaceInfo>()
            .is_some_and(|info| info.is_probing_due);
        if should_probe && !ranked.is_empty() {
            if let Some(probe_face) = choose_probe_face(&ranked) {
                let _ = api.send_interest(pit_entry, probe_face, true);
            }
            if let Some(info) = ns_entry.borrow_mut().strategy_info.get_mut::<NamespaceInfo>() {
                info.is_probing_due = false;
            }
        }
    }

    fn after_receive_data(
        &self,
        api: &StrategyApi<'_>,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        in_face: FaceId,
        _data: &rust_udcn_common::ndn::Data,
    ) {
        let rtt = pit_entry
            .borrow()
            .get_out_record(in_face)
            .map(|r| r.last_renewed.elapsed());
        let Some(rtt) = rtt else { return };

        let fib_entry = api.lookup_fib(&pit_entry.borrow().interest.clone());
        let namespace = fib_entry.borrow().prefix.clone();
        let ns_entry = api.measurements.get(&namespace);
        let mut ns = ns_entry.borrow_mut();
        let info = ns.strategy_info.get_or_insert_with(NamespaceInfo::new);
        let face_info = info.faces.entry(in_face).or_insert_with(FaceInfo::new);
        face_info.rto_timer = None;
        face_info.rtt.add_measurement(rtt);
        face_info.last_rtt = Some(rtt);
        face_info.silent_timeout_count = 0;
    }

    fn after_receive_nack(
        &self,
        api: &StrategyApi<'_>,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        in_face: FaceId,
        _nack: &rust_udcn_common::ndn::Nack,
    ) {
        let fib_entry = api.lookup_fib(&pit_entry.borrow().interest.clone());
        let namespace = fib_entry.borrow().prefix.clone();
        let ns_entry = api.measurements.get(&namespace);
        {
            let mut ns = ns_entry.borrow_mut();
            let info = ns.strategy_info.get_or_insert_with(NamespaceInfo::new);
            let face_info = info.faces.entry(in_face).or_insert_with(FaceInfo::new);
            face_info.rto_timer = None;
            face_info.last_rtt = Some(RTT_TIMEOUT);
            face_info.silent_timeout_count += 1;
        }
        super::process_nack(api, pit_entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{FaceState, LinkType, Persistency, Scope};
    use crate::forwarder::Forwarder;
    use std::cell::RefCell as StdRefCell;

    struct RecordingFace {
        id: FaceId,
        sent_interests: StdRefCell<Vec<Interest>>,
    }

    impl RecordingFace {
        fn new(id: u64) -> Rc<Self> {
            Rc::new(Self {
                id: FaceId(id),
                sent_interests: StdRefCell::new(Vec::new()),
            })
        }
    }

    impl crate::Face for RecordingFace {
        fn id(&self) -> FaceId {
            self.id
        }
        fn scope(&self) -> Scope {
            Scope::NonLocal
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
        fn send_interest(&self, interest: Interest) -> crate::Result<()> {
            self.sent_interests.borrow_mut().push(interest);
            Ok(())
        }
        fn send_data(&self, _data: rust_udcn_common::ndn::Data) -> crate::Result<()> {
            Ok(())
        }
        fn send_nack(&self, _nack: rust_udcn_common::ndn::Nack) -> crate::Result<()> {
            Ok(())
        }
    }

    fn setup(forwarder: &Rc<Forwarder>) {
        let strategy = Asf::new(Name::from_string("/localhost/nfd/strategy/asf")).unwrap();
        forwarder.strategy_choice.install(&Name::from_string("/"), strategy);
    }

    #[test]
    fn never_measured_faces_still_get_a_first_pick() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        let hop = RecordingFace::new(2);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(hop.clone(), FaceId(2)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));
        assert_eq!(hop.sent_interests.borrow().len(), 1);
    }

    #[test]
    fn no_eligible_nexthop_rejects_with_no_route() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        forwarder.faces.add_reserved(consumer.clone(), FaceId(1)).unwrap();

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/nowhere")));
        assert!(consumer.sent_interests.borrow().is_empty());
    }

    #[test]
    fn satisfied_face_is_preferred_on_subsequent_interests() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        let fast = RecordingFace::new(2);
        let slow = RecordingFace::new(3);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(fast.clone(), FaceId(2)).unwrap();
        forwarder.faces.add_reserved(slow.clone(), FaceId(3)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(3), 10);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));
        forwarder.on_incoming_data(
            FaceId(2),
            rust_udcn_common::ndn::Data::new(Name::from_string("/a/b"), bytes::Bytes::new()),
        );

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/c")));

        assert_eq!(fast.sent_interests.borrow().len(), 2);
    }

    #[test]
    fn rejects_an_unsupported_version() {
        let err = Asf::new(Name::from_string("/localhost/nfd/strategy/asf/%FD99")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn rejects_an_unrecognized_parameter() {
        let err = Asf::new(Name::from_string("/localhost/nfd/strategy/asf/%FD01/bogus~1")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn probing_interval_parameter_is_applied() {
        let asf = Asf::build(Name::from_string(
            "/localhost/nfd/strategy/asf/%FD01/probing-interval~5000",
        ))
        .unwrap();
        assert_eq!(asf.probing_interval, Duration::from_millis(5000));
    }
}
