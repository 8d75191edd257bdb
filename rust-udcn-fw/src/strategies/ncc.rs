//! NCC (spec §4.9), named for CCNx's original forwarding strategy: tracks a
//! best/previous face per exact Interest name with a self-adjusting
//! "prediction" clock (how long to wait before assuming the best face is
//! slow) and propagates what it learns up to a few ancestor names so
//! related content converges faster.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rand::Rng;

use rust_udcn_common::ndn::{Interest, Name, NackReason};

use crate::face::FaceId;
use crate::scheduler::ScopedEventId;
use crate::strategy::{parse_instance_name, parse_known_parameters, require_supported_version, Strategy, StrategyApi};
use crate::table::measurements;
use crate::table::pit;

/// The only instance-name version this strategy implements.
const SUPPORTED_VERSION: u64 = 1;

const INITIAL_PREDICTION: Duration = Duration::from_millis(8);
const MIN_PREDICTION: Duration = Duration::from_micros(127);
const MAX_PREDICTION: Duration = Duration::from_millis(160);
const UPDATE_N_LEVELS: usize = 2;

struct NccInfo {
    prediction: Duration,
    best_face: Option<FaceId>,
    previous_face: Option<FaceId>,
    best_face_timer: Option<ScopedEventId>,
    defer_timer: Option<ScopedEventId>,
}

impl NccInfo {
    fn new() -> Self {
        Self {
            prediction: INITIAL_PREDICTION,
            best_face: None,
            previous_face: None,
            best_face_timer: None,
            defer_timer: None,
        }
    }

    fn adjust_up(&mut self) {
        self.prediction = (self.prediction + self.prediction / 8).min(MAX_PREDICTION);
    }

    fn adjust_down(&mut self) {
        let reduced = self.prediction.saturating_sub(self.prediction / 128);
        self.prediction = reduced.max(MIN_PREDICTION);
    }
}

pub struct Ncc {
    name: Name,
}

impl Ncc {
    /// Constructs ncc from an instance name of the form
    /// `/localhost/nfd/strategy/ncc[/%FD01]` (spec §4.7). Fails with
    /// `Error::Strategy` on an unsupported version or any parameter — this
    /// strategy takes none.
    pub fn new(name: Name) -> crate::Result<Rc<dyn Strategy>> {
        let parsed = parse_instance_name(&name);
        require_supported_version(&parsed, SUPPORTED_VERSION)?;
        parse_known_parameters(&parsed, &[])?;
        Ok(Rc::new(Self { name }))
    }
}

fn is_pending(pit_entry: &Rc<RefCell<pit::Entry>>) -> bool {
    pit_entry.borrow().in_records().next().is_some()
}

/// Fired when the best face hasn't answered within `prediction`: penalizes
/// that face by lengthening `prediction`, then retries on the next eligible
/// next-hop in the ring.
fn best_face_timeout(
    api: &StrategyApi<'_>,
    pit_entry: &Rc<RefCell<pit::Entry>>,
    mt_entry: Rc<RefCell<measurements::EntryData>>,
    in_face: FaceId,
    tried: FaceId,
) {
    if !is_pending(pit_entry) {
        return;
    }
    let fib_entry = api.lookup_fib(&pit_entry.borrow().interest.clone());
    let Some(next) = super::next_eligible_hop(api, pit_entry, in_face, &fib_entry, Some(tried)) else {
        return;
    };
    if api.send_interest(pit_entry, next, true).is_err() {
        return;
    }
    let mut entry = mt_entry.borrow_mut();
    if let Some(info) = entry.strategy_info.get_mut::<NccInfo>() {
        info.adjust_up();
        info.previous_face = Some(tried);
        info.best_face = Some(next);
    }
}

/// Propagates an Interest to the previously-best face as a backup, in case
/// the current best face is simply slow rather than unreachable; reschedules
/// itself at a fresh random delay in `[0, prediction)` while the entry
/// remains pending.
fn defer_propagate(
    api: &StrategyApi<'_>,
    pit_entry: &Rc<RefCell<pit::Entry>>,
    mt_entry: Rc<RefCell<measurements::EntryData>>,
    in_face: FaceId,
    previous_face: FaceId,
) {
    if !is_pending(pit_entry) {
        return;
    }
    if super::is_eligible_ignoring_out_record(api, pit_entry, in_face, previous_face) {
        let _ = api.send_interest(pit_entry, previous_face, true);
    }

    let prediction = mt_entry
        .borrow()
        .strategy_info
        .get::<NccInfo>()
        .map(|i| i.prediction)
        .unwrap_or(INITIAL_PREDICTION);
    let delay = Duration::from_secs_f64(rand::thread_rng().gen::<f64>() * prediction.as_secs_f64());

    let retry_pit = pit_entry.clone();
    let retry_mt = mt_entry.clone();
    let timer = api.schedule_retry(delay, move |api| {
        defer_propagate(api, &retry_pit, retry_mt, in_face, previous_face);
    });
    if let Some(info) = mt_entry.borrow_mut().strategy_info.get_mut::<NccInfo>() {
        info.defer_timer = Some(timer);
    }
}

impl Strategy for Ncc {
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

        let mt_entry = api.measurements.get(&interest.name);
        let (primary, previous_face, prediction) = {
            let mut entry = mt_entry.borrow_mut();
            let info = entry.strategy_info.get_or_insert_with(NccInfo::new);
            let primary = info
                .best_face
                .filter(|f| hops.contains(f))
                .unwrap_or(hops[0]);
            info.best_face = Some(primary);
            (primary, info.previous_face, info.prediction)
        };

        if api.send_interest(pit_entry, primary, false).is_err() {
            return;
        }

        let retry_pit = pit_entry.clone();
        let retry_mt = mt_entry.clone();
        let best_timer = api.schedule_retry(prediction, move |api| {
            best_face_timeout(api, &retry_pit, retry_mt, in_face, primary);
        });
        if let Some(info) = mt_entry.borrow_mut().strategy_info.get_mut::<NccInfo>() {
            info.best_face_timer = Some(best_timer);
        }

        if let Some(previous) = previous_face.filter(|&f| f != primary) {
            defer_propagate(api, pit_entry, mt_entry, in_face, previous);
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

        let mut name = pit_entry.borrow().interest.name.clone();
        for level in 0..=UPDATE_N_LEVELS {
            let mt_entry = api.measurements.get(&name);
            {
                let mut entry = mt_entry.borrow_mut();
                let info = entry.strategy_info.get_or_insert_with(NccInfo::new);
                info.best_face_timer = None;
                info.defer_timer = None;
                if let Some(rtt) = rtt {
                    if rtt < info.prediction {
                        info.adjust_down();
                    }
                }
                info.previous_face = info.best_face;
                info.best_face = Some(in_face);
            }
            api.measurements
                .extend_lifetime(api.scheduler, &name, &mt_entry, Duration::from_secs(60));

            if level == UPDATE_N_LEVELS || name.is_empty() {
                break;
            }
            name = name.prefix(name.len() - 1);
        }
    }

    fn after_receive_nack(
        &self,
        api: &StrategyApi<'_>,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        _in_face: FaceId,
        _nack: &rust_udcn_common::ndn::Nack,
    ) {
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
        let strategy = Ncc::new(Name::from_string("/localhost/nfd/strategy/ncc")).unwrap();
        forwarder.strategy_choice.install(&Name::from_string("/"), strategy);
    }

    #[test]
    fn first_interest_goes_to_first_eligible_hop() {
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
    fn satisfied_face_becomes_best_face_for_the_same_name() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        let hop_a = RecordingFace::new(2);
        let hop_b = RecordingFace::new(3);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(hop_a.clone(), FaceId(2)).unwrap();
        forwarder.faces.add_reserved(hop_b.clone(), FaceId(3)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(3), 1);
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 2);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));
        assert_eq!(hop_b.sent_interests.borrow().len(), 1);

        forwarder.on_incoming_data(
            FaceId(3),
            rust_udcn_common::ndn::Data::new(Name::from_string("/a/b"), bytes::Bytes::new()),
        );

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));
        assert_eq!(hop_b.sent_interests.borrow().len(), 2);
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
    fn rejects_an_unsupported_version() {
        let err = Ncc::new(Name::from_string("/localhost/nfd/strategy/ncc/%FD99")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn rejects_an_unrecognized_parameter() {
        let err = Ncc::new(Name::from_string("/localhost/nfd/strategy/ncc/%FD01/bogus~1")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }
}
