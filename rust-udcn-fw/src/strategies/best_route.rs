//! Best-route v5 (spec §4.9), the default strategy: forward new Interests to
//! the lowest-cost eligible next-hop; on retransmission, apply per-PIT-entry
//! exponential retx suppression and rotate to the next eligible next-hop
//! after the one last used, wrapping around the FIB's next-hop ring.

use std::cell::RefCell;
use std::rc::Rc;

use rust_udcn_common::ndn::{Interest, Name};

use crate::algorithm::{RetxSuppressionExponential, RetxSuppressionResult};
use crate::face::FaceId;
use crate::strategy::{
    parse_instance_name, parse_known_parameters, parse_f64_parameter, parse_millis_parameter,
    require_supported_version, Strategy, StrategyApi,
};
use crate::table::pit;
use crate::Result;

/// The only instance-name version this strategy implements (spec §4.9's
/// "Best-route v5").
const SUPPORTED_VERSION: u64 = 5;

const PARAM_RETX_INITIAL: &str = "retx-suppression-initial";
const PARAM_RETX_MAX: &str = "retx-suppression-max";
const PARAM_RETX_MULTIPLIER: &str = "retx-suppression-multiplier";

pub struct BestRoute {
    name: Name,
    suppression: RetxSuppressionExponential,
}

impl BestRoute {
    /// Constructs best-route from an instance name of the form
    /// `/localhost/nfd/strategy/best-route[/%FD05][/retx-suppression-initial~<ms>]
    /// [/retx-suppression-max~<ms>][/retx-suppression-multiplier~<f64>]`
    /// (spec §4.7/§6, §10.4). Fails with `Error::Strategy` on an
    /// unsupported version or an unrecognized parameter, leaving the
    /// caller's existing `StrategyChoice` binding untouched.
    pub fn new(name: Name) -> Result<Rc<dyn Strategy>> {
        Self::build(name).map(|s| Rc::new(s) as Rc<dyn Strategy>)
    }

    fn build(name: Name) -> Result<Self> {
        let parsed = parse_instance_name(&name);
        require_supported_version(&parsed, SUPPORTED_VERSION)?;
        let params = parse_known_parameters(&parsed, &[PARAM_RETX_INITIAL, PARAM_RETX_MAX, PARAM_RETX_MULTIPLIER])?;

        let initial = parse_millis_parameter(&params, PARAM_RETX_INITIAL)?
            .unwrap_or(RetxSuppressionExponential::DEFAULT_INITIAL_INTERVAL);
        let max = parse_millis_parameter(&params, PARAM_RETX_MAX)?
            .unwrap_or(RetxSuppressionExponential::DEFAULT_MAX_INTERVAL);
        let multiplier = parse_f64_parameter(&params, PARAM_RETX_MULTIPLIER)?
            .unwrap_or(RetxSuppressionExponential::DEFAULT_MULTIPLIER);

        Ok(Self {
            name,
            suppression: RetxSuppressionExponential::new(initial, multiplier, max),
        })
    }
}

impl Strategy for BestRoute {
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
        let decision = self.suppression.decide_per_pit_entry(&mut pit_entry.borrow_mut());
        let fib_entry = api.lookup_fib(interest);

        match decision {
            RetxSuppressionResult::New => {
                match super::next_eligible_hop(api, pit_entry, in_face, &fib_entry, None) {
                    Some(hop) => {
                        let _ = api.send_interest(pit_entry, hop, false);
                    }
                    None => {
                        api.send_nacks(pit_entry, rust_udcn_common::ndn::NackReason::NoRoute);
                        api.reject_pending_interest(pit_entry);
                    }
                }
            }
            RetxSuppressionResult::Forward => {
                let last_used = pit_entry
                    .borrow()
                    .out_records()
                    .max_by_key(|r| r.last_renewed)
                    .map(|r| r.face);
                if let Some(hop) = super::next_eligible_hop(api, pit_entry, in_face, &fib_entry, last_used) {
                    let _ = api.send_interest(pit_entry, hop, true);
                }
            }
            RetxSuppressionResult::Suppress => {}
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
    use crate::table::strategy_choice::StrategyChoice;
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
        let strategy = BestRoute::new(Name::from_string("/localhost/nfd/strategy/best-route/%FD05")).unwrap();
        forwarder.strategy_choice.install(&Name::from_string("/"), strategy);
        let _: &StrategyChoice = &forwarder.strategy_choice;
    }

    #[test]
    fn new_interest_goes_to_lowest_cost_nexthop() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        let cheap = RecordingFace::new(2);
        let expensive = RecordingFace::new(3);
        forwarder.faces.add_reserved(consumer.clone(), FaceId(1)).unwrap();
        forwarder.faces.add_reserved(cheap.clone(), FaceId(2)).unwrap();
        forwarder.faces.add_reserved(expensive.clone(), FaceId(3)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(3), 20);
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));

        assert_eq!(cheap.sent_interests.borrow().len(), 1);
        assert!(expensive.sent_interests.borrow().is_empty());
    }

    #[test]
    fn downstream_face_is_never_chosen_as_nexthop() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        let producer = RecordingFace::new(2);
        forwarder.faces.add_reserved(consumer.clone(), FaceId(1)).unwrap();
        forwarder.faces.add_reserved(producer.clone(), FaceId(2)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(1), 1);
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));
        assert_eq!(producer.sent_interests.borrow().len(), 1);
    }

    #[test]
    fn no_eligible_nexthop_rejects_the_entry() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        forwarder.faces.add_reserved(consumer.clone(), FaceId(1)).unwrap();

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/nowhere")));
        assert_eq!(consumer.sent_interests.borrow().len(), 0);
    }

    #[test]
    fn rejects_an_unsupported_version() {
        let err = BestRoute::new(Name::from_string("/localhost/nfd/strategy/best-route/%FD99")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn rejects_an_unrecognized_parameter() {
        let err = BestRoute::new(Name::from_string("/localhost/nfd/strategy/best-route/%FD05/bogus~1")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn retx_suppression_parameters_are_applied() {
        let best_route = BestRoute::build(Name::from_string(
            "/localhost/nfd/strategy/best-route/%FD05/retx-suppression-initial~20/retx-suppression-max~40/retx-suppression-multiplier~2",
        ))
        .unwrap();
        assert_eq!(best_route.suppression.initial_interval, std::time::Duration::from_millis(20));
        assert_eq!(best_route.suppression.max_interval, std::time::Duration::from_millis(40));
        assert_eq!(best_route.suppression.multiplier, 2.0);
    }
}
