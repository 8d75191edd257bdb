//! Access (spec §4.9): optimized for a stub network with one upstream
//! gateway per consumer. Remembers, per namespace, which next-hop last
//! satisfied an Interest (`MtInfo::last_nexthop`) and unicasts there first;
//! falls back to a multicast probe when nothing is known yet, on
//! retransmission, or when the unicast attempt times out.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use rust_udcn_common::ndn::{Data, Interest, Name, NackReason};

use crate::algorithm::{RetxSuppressionFixed, RetxSuppressionResult, RttEstimator};
use crate::face::FaceId;
use crate::scheduler::ScopedEventId;
use crate::strategy::{parse_instance_name, parse_known_parameters, require_supported_version, Strategy, StrategyApi};
use crate::table::pit;

/// The only instance-name version this strategy implements.
const SUPPORTED_VERSION: u64 = 1;

/// PIT-entry strategy-info: the running RTO timer for the outstanding
/// unicast attempt, and the face it was sent to (so the timeout handler
/// knows what to exclude from its retry multicast).
struct PitInfo {
    rto_timer: ScopedEventId,
    first_out_face: FaceId,
}

/// Measurements strategy-info: the next-hop that last satisfied this
/// namespace.
struct MtInfo {
    last_nexthop: FaceId,
}

pub struct Access {
    name: Name,
    /// Per-face RTT, shared across namespaces — a gateway's latency doesn't
    /// depend on which prefix is being requested.
    face_rtt: RefCell<HashMap<FaceId, RttEstimator>>,
    suppression: RetxSuppressionFixed,
}

impl Access {
    /// Constructs access from an instance name of the form
    /// `/localhost/nfd/strategy/access[/%FD01]` (spec §4.7). Fails with
    /// `Error::Strategy` on an unsupported version or any parameter — this
    /// strategy takes none.
    pub fn new(name: Name) -> crate::Result<Rc<dyn Strategy>> {
        let parsed = parse_instance_name(&name);
        require_supported_version(&parsed, SUPPORTED_VERSION)?;
        parse_known_parameters(&parsed, &[])?;
        Ok(Rc::new(Self {
            name,
            face_rtt: RefCell::new(HashMap::new()),
            suppression: RetxSuppressionFixed::default(),
        }))
    }

    fn measurements_name(interest: &Interest) -> Name {
        let name = &interest.name;
        if name.is_empty() {
            name.clone()
        } else {
            name.prefix(name.len() - 1)
        }
    }

    fn rto_for(&self, face: FaceId) -> Duration {
        self.face_rtt
            .borrow()
            .get(&face)
            .map(|rtt| rtt.compute_rto())
            .unwrap_or(RttEstimator::DEFAULT_MIN_RTO)
    }
}

impl Strategy for Access {
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
        let decision = self.suppression.decide(&pit_entry.borrow());

        match decision {
            RetxSuppressionResult::New => {
                let mt_name = Self::measurements_name(interest);
                let last_nexthop = api
                    .measurements
                    .find_longest_prefix_match(&mt_name)
                    .and_then(|entry| entry.borrow().strategy_info.get::<MtInfo>().map(|mi| mi.last_nexthop));

                let chosen = last_nexthop.filter(|&hop| {
                    hop != in_face && super::is_eligible_ignoring_out_record(api, pit_entry, in_face, hop)
                });

                match chosen {
                    Some(hop) => {
                        if api.send_interest(pit_entry, hop, false).is_ok() {
                            let rto = self.rto_for(hop);
                            let retry_pit = pit_entry.clone();
                            let timer = api.schedule_retry(rto, move |api| {
                                access_rto_timeout(api, &retry_pit, in_face, hop);
                            });
                            pit_entry
                                .borrow_mut()
                                .strategy_info
                                .insert(PitInfo { rto_timer: timer, first_out_face: hop });
                        }
                    }
                    None => {
                        let fib_entry = api.lookup_fib(interest);
                        super::multicast_except(api, pit_entry, in_face, &fib_entry, &[in_face]);
                    }
                }
            }
            RetxSuppressionResult::Forward => {
                let fib_entry = api.lookup_fib(interest);
                super::multicast_except(api, pit_entry, in_face, &fib_entry, &[in_face]);
            }
            RetxSuppressionResult::Suppress => {}
        }
    }

    fn after_receive_data(
        &self,
        api: &StrategyApi<'_>,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        in_face: FaceId,
        data: &Data,
    ) {
        pit_entry.borrow_mut().strategy_info.remove::<PitInfo>();

        let rtt = pit_entry
            .borrow()
            .get_out_record(in_face)
            .map(|r| r.last_renewed.elapsed());
        let Some(rtt) = rtt else { return };

        self.face_rtt
            .borrow_mut()
            .entry(in_face)
            .or_insert_with(RttEstimator::new)
            .add_measurement(rtt);

        let mt_name = Self::measurements_name(&pit_entry.borrow().interest);
        let _ = data;
        let entry = api.measurements.get(&mt_name);
        entry
            .borrow_mut()
            .strategy_info
            .insert(MtInfo { last_nexthop: in_face });
        api.measurements
            .extend_lifetime(api.scheduler, &mt_name, &entry, Duration::from_secs(8));
    }

    fn after_receive_nack(
        &self,
        api: &StrategyApi<'_>,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        _in_face: FaceId,
        _nack: &rust_udcn_common::ndn::Nack,
    ) {
        pit_entry.borrow_mut().strategy_info.remove::<PitInfo>();
        super::process_nack(api, pit_entry);
    }
}

/// Fired from `schedule_retry` when the unicast attempt at `first_out_face`
/// has not been answered within its RTO: multicasts to every other eligible
/// next-hop, excluding the original downstream and the face already tried.
/// A no-op if `pit_entry` has since been satisfied or rejected (its
/// in-records are gone by then).
fn access_rto_timeout(
    api: &StrategyApi<'_>,
    pit_entry: &Rc<RefCell<pit::Entry>>,
    in_face: FaceId,
    first_out_face: FaceId,
) {
    if pit_entry.borrow().in_records().next().is_none() {
        return;
    }
    let fib_entry = api.lookup_fib(&pit_entry.borrow().interest.clone());
    super::multicast_except(api, pit_entry, in_face, &fib_entry, &[in_face, first_out_face]);
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
        fn send_data(&self, _data: Data) -> crate::Result<()> {
            Ok(())
        }
        fn send_nack(&self, _nack: rust_udcn_common::ndn::Nack) -> crate::Result<()> {
            Ok(())
        }
    }

    fn setup(forwarder: &Rc<Forwarder>) {
        let strategy = Access::new(Name::from_string("/localhost/nfd/strategy/access")).unwrap();
        forwarder.strategy_choice.install(&Name::from_string("/"), strategy);
    }

    #[test]
    fn first_interest_with_no_history_falls_back_to_multicast() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        let gateway_a = RecordingFace::new(2);
        let gateway_b = RecordingFace::new(3);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(gateway_a.clone(), FaceId(2)).unwrap();
        forwarder.faces.add_reserved(gateway_b.clone(), FaceId(3)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(3), 10);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));

        assert_eq!(gateway_a.sent_interests.borrow().len(), 1);
        assert_eq!(gateway_b.sent_interests.borrow().len(), 1);
    }

    #[test]
    fn learns_last_nexthop_from_satisfied_data_and_unicasts_next_time() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        let gateway_a = RecordingFace::new(2);
        let gateway_b = RecordingFace::new(3);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(gateway_a.clone(), FaceId(2)).unwrap();
        forwarder.faces.add_reserved(gateway_b.clone(), FaceId(3)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(3), 10);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));
        forwarder.on_incoming_data(FaceId(2), Data::new(Name::from_string("/a/b"), bytes::Bytes::new()));

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/c")));

        assert_eq!(gateway_a.sent_interests.borrow().len(), 2);
        assert_eq!(gateway_b.sent_interests.borrow().len(), 1);
    }

    #[test]
    fn rejects_an_unsupported_version() {
        let err = Access::new(Name::from_string("/localhost/nfd/strategy/access/%FD99")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn rejects_an_unrecognized_parameter() {
        let err = Access::new(Name::from_string("/localhost/nfd/strategy/access/%FD01/bogus~1")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }
}
