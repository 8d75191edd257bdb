//! The pluggable per-prefix forwarding Strategy framework (spec §4.7).
//!
//! A `Strategy` only sees the narrow façade the `Forwarder` hands it
//! (`StrategyApi`) — it cannot reach into the PIT/FIB/Measurements tables
//! directly, matching the source's `Strategy` base class exposing
//! protected helper methods rather than the tables themselves. Triggers are
//! default no-ops so a strategy overrides only what it cares about (most
//! override `after_receive_interest` and little else).

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use rust_udcn_common::ndn::{Data, Interest, Nack, NackReason};

use crate::face::FaceId;
use crate::forwarder::StrategyHost;
use crate::scheduler::{ScopedEventId, Scheduler};
use crate::table::measurements::MeasurementsAccessor;
use crate::table::{fib, pit};
use crate::{Face, FaceTable, Result};

/// The façade a `Strategy` uses to act on the forwarding state, scoped to
/// exactly what NFD's `Strategy` base class exposes to subclasses (spec
/// §4.7 "Strategy façade"). Strategies never see the raw `Pit`/`Fib`/`Face
/// Table`/`Scheduler` — only this view.
pub struct StrategyApi<'a> {
    pub faces: &'a FaceTable,
    pub fib: &'a fib::Fib,
    pub measurements: MeasurementsAccessor<'a>,
    pub scheduler: &'a Scheduler,
    host: Weak<dyn StrategyHost>,
    strategy_name: Rc<str>,
}

impl<'a> StrategyApi<'a> {
    pub fn new(
        faces: &'a FaceTable,
        fib: &'a fib::Fib,
        measurements: MeasurementsAccessor<'a>,
        scheduler: &'a Scheduler,
        host: Weak<dyn StrategyHost>,
        strategy_name: Rc<str>,
    ) -> Self {
        Self {
            faces,
            fib,
            measurements,
            scheduler,
            host,
            strategy_name,
        }
    }

    /// Resolves a face, or `None` if it has since been removed.
    pub fn get_face(&self, id: FaceId) -> Option<Rc<dyn Face>> {
        self.faces.get(id)
    }

    /// Outgoing-Interest pipeline (spec §4.8): refuses on a scope violation
    /// (judged from the face of `pit_entry`'s earliest in-record, i.e. the
    /// original requester) or on an unexpired out-record for `out_face`
    /// unless `want_new_nonce`; otherwise records the out-record and sends,
    /// using a fresh Nonce iff `want_new_nonce` or no unexpired out-record
    /// existed yet. A refusal or a since-removed `out_face` is a silent
    /// no-op, not an error (spec §7's "the send is skipped").
    pub fn send_interest(
        &self,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        out_face: FaceId,
        want_new_nonce: bool,
    ) -> Result<()> {
        let Some(out_face_obj) = self.get_face(out_face) else {
            return Ok(());
        };

        let (base_interest, earliest_in_face, has_unexpired_out) = {
            let entry = pit_entry.borrow();
            let earliest_in_face = entry.in_records().min_by_key(|r| r.last_renewed).map(|r| r.face);
            let has_unexpired_out = entry.has_unexpired_out_record_for(out_face);
            (entry.interest.clone(), earliest_in_face, has_unexpired_out)
        };

        if let Some(in_face) = earliest_in_face {
            if let Some(in_face_obj) = self.get_face(in_face) {
                if crate::algorithm::would_violate_scope(
                    in_face_obj.as_ref(),
                    &base_interest,
                    out_face_obj.as_ref(),
                ) {
                    return Ok(());
                }
            }
        }

        if has_unexpired_out && !want_new_nonce {
            return Ok(());
        }

        let fresh_nonce_needed = want_new_nonce || !has_unexpired_out;
        let nonce = if fresh_nonce_needed {
            rand::random::<u32>()
        } else {
            base_interest.nonce
        };
        let outgoing = base_interest.with_nonce(nonce);

        pit_entry
            .borrow_mut()
            .insert_or_update_out_record_with_nonce(out_face, &outgoing, nonce);
        out_face_obj.send_interest(outgoing)
    }

    /// Sends `data` out `out_face` with no PIT bookkeeping — Data delivery
    /// is driven by in-records, which the Forwarder manages directly; a
    /// strategy only ever originates Data from a content-store hit (not yet
    /// implemented; spec §4.8 notes the content store as a future module).
    pub fn send_data(&self, out_face: FaceId, data: Data) -> Result<()> {
        let face = self
            .get_face(out_face)
            .ok_or_else(|| crate::Error::Face(format!("no such face {out_face}")))?;
        face.send_data(data)
    }

    /// Outgoing-Nack pipeline (spec §4.8): requires an in-record for
    /// `out_face` — deletes it (signaling "I will not satisfy this
    /// downstream") before sending a Nack carrying that in-record's last
    /// Nonce. A no-op if there is no such in-record or the face is gone.
    pub fn send_nack(
        &self,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        out_face: FaceId,
        reason: NackReason,
    ) -> Result<()> {
        let last_nonce = {
            let mut entry = pit_entry.borrow_mut();
            let nonce = entry.get_in_record(out_face).map(|r| r.last_nonce);
            entry.delete_in_record(out_face);
            nonce
        };
        let Some(nonce) = last_nonce else {
            return Ok(());
        };
        let Some(face) = self.get_face(out_face) else {
            return Ok(());
        };
        let interest = pit_entry.borrow().interest.clone().with_nonce(nonce);
        face.send_nack(Nack { interest, reason })
    }

    /// Sends a Nack with `reason` to every downstream face currently
    /// recorded on `pit_entry` (spec §4.8, fan-out variant used when a
    /// strategy gives up on an Interest entirely).
    pub fn send_nacks(&self, pit_entry: &Rc<RefCell<pit::Entry>>, reason: NackReason) {
        let downstreams: Vec<FaceId> = pit_entry.borrow().in_records().map(|r| r.face).collect();
        for face in downstreams {
            let _ = self.send_nack(pit_entry, face, reason);
        }
    }

    /// Sends `reason` directly to `face` without any PIT-entry bookkeeping
    /// (used for `on_interest_loop`'s default Nack(Duplicate), which may
    /// fire before any PIT entry for this Interest shape is known to exist).
    pub fn send_raw_nack(&self, face: FaceId, interest: Interest, reason: NackReason) -> Result<()> {
        let Some(face_obj) = self.get_face(face) else {
            return Ok(());
        };
        face_obj.send_nack(Nack { interest, reason })
    }

    /// Marks `pit_entry` as rejected: every downstream in-record is
    /// dropped, so the entry is no longer a candidate for satisfaction and
    /// will simply expire away (spec §4.7 `rejectPendingInterest`). Used
    /// when a strategy determines the Interest can never be served (e.g.
    /// no eligible next-hop).
    pub fn reject_pending_interest(&self, pit_entry: &Rc<RefCell<pit::Entry>>) {
        pit_entry.borrow_mut().clear_in_records();
    }

    /// Longest-prefix match against the FIB.
    pub fn lookup_fib(&self, interest: &Interest) -> fib::Entry {
        self.fib
            .find_longest_prefix_match(&interest.fib_lookup_name())
    }

    /// The Measurements accessor scoped to this strategy's own namespace.
    pub fn get_measurements(&self) -> &MeasurementsAccessor<'a> {
        &self.measurements
    }

    /// Schedules `callback` to run after `after`, returning a handle that
    /// cancels it on drop (spec §4.7 `setExpiryTimer`, generalized: a
    /// strategy attaches the returned `ScopedEventId` wherever it needs the
    /// timer's lifetime tied to, typically the PIT entry's strategy-info).
    pub fn schedule(
        &self,
        after: Duration,
        callback: impl std::future::Future<Output = ()> + 'static,
    ) -> ScopedEventId {
        self.scheduler.schedule(after, callback)
    }

    /// Schedules `callback` to run after `after` with a *fresh* `StrategyApi`
    /// for this strategy, re-entering the forwarding tables the way NFD's
    /// strategies do from an RTO/timeout handler (e.g. access-strategy's
    /// `afterRtoTimeout`, ncc-strategy's best-face timeout). Unlike
    /// `schedule`, the callback is not tied to this invocation's borrowed
    /// `StrategyApi` — it reaches the tables again through a `Weak` handle
    /// back to the `Forwarder`, a no-op if the Forwarder has since been
    /// dropped (spec §5 "a timer callback that discovers a stale target
    /// returns silently").
    pub fn schedule_retry(
        &self,
        after: Duration,
        callback: impl FnOnce(&StrategyApi<'_>) + 'static,
    ) -> ScopedEventId {
        let host = self.host.clone();
        let strategy_name = self.strategy_name.clone();
        self.scheduler.schedule_fn(after, move || {
            let Some(host) = host.upgrade() else {
                return;
            };
            let mut callback = Some(callback);
            host.with_strategy_api(strategy_name, &mut |api| {
                if let Some(callback) = callback.take() {
                    callback(api);
                }
            });
        })
    }

    /// Adds (or updates) a FIB next-hop at `prefix`, creating the entry if
    /// needed. Used by self-learning to materialize a route from a
    /// `PrefixAnnouncement` (spec §4.9); no other reference strategy
    /// mutates the FIB.
    pub fn add_nexthop(&self, prefix: &rust_udcn_common::ndn::Name, face: FaceId, cost: u64) {
        let (entry, _) = self.fib.insert(prefix);
        self.fib.add_or_update_next_hop(&entry, face, cost);
    }
}

/// A per-prefix forwarding strategy (spec §4.7). All methods are triggers
/// fired by the `Forwarder` pipeline; a strategy overrides only the ones
/// relevant to its behavior. Default implementations match NFD's base
/// `Strategy` class (e.g. `afterContentStoreHit` forwards the cached Data
/// downstream unconditionally; `afterReceiveNack` does nothing).
pub trait Strategy {
    /// The versioned instance name this strategy was constructed from
    /// (e.g. `/localhost/nfd/strategy/best-route/%FD%05`), used for
    /// `StrategyChoice` bookkeeping and logging.
    fn instance_name(&self) -> &rust_udcn_common::ndn::Name;

    /// Fired when a new Interest (or a retransmission not suppressed by the
    /// Forwarder) needs forwarding decisions made. The bulk of a strategy's
    /// logic lives here.
    fn after_receive_interest(
        &self,
        api: &StrategyApi<'_>,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        in_face: FaceId,
        interest: &Interest,
    );

    /// Fired when an Interest matching a content-store entry is satisfiable
    /// immediately. The default sends the cached Data to `in_face` as-is;
    /// no content store exists in this core yet (spec §10.7 Non-goals), so
    /// no reference strategy currently exercises this trigger.
    fn after_content_store_hit(
        &self,
        api: &StrategyApi<'_>,
        _pit_entry: &Rc<RefCell<pit::Entry>>,
        in_face: FaceId,
        data: Data,
    ) {
        let _ = api.send_data(in_face, data);
    }

    /// Fired just before Data is sent downstream to satisfy `pit_entry`,
    /// once per downstream. Default: no-op (most strategies don't need to
    /// observe satisfaction directly; Access and ASF do, to update RTT).
    fn before_satisfy_interest(
        &self,
        _api: &StrategyApi<'_>,
        _pit_entry: &Rc<RefCell<pit::Entry>>,
        _in_face: FaceId,
        _data: &Data,
    ) {
    }

    /// Fired when Data arrives that matches one or more PIT entries, once
    /// per matching entry, before the Forwarder satisfies downstreams.
    /// Default: no-op.
    fn after_receive_data(
        &self,
        _api: &StrategyApi<'_>,
        _pit_entry: &Rc<RefCell<pit::Entry>>,
        _in_face: FaceId,
        _data: &Data,
    ) {
    }

    /// Fired when a Nack arrives on an out-record's face. Default: no-op —
    /// `algorithm::combine_nacks` plus `StrategyApi::send_nacks` is the
    /// common reaction, but strategies opt in explicitly.
    fn after_receive_nack(
        &self,
        _api: &StrategyApi<'_>,
        _pit_entry: &Rc<RefCell<pit::Entry>>,
        _in_face: FaceId,
        _nack: &Nack,
    ) {
    }

    /// Fired when a looping Interest (its (Name, Nonce) already seen, either
    /// via `DeadNonceList` or a duplicate Nonce on the same in-face) is
    /// detected. No PIT entry is passed — a loop from `DeadNonceList` can
    /// fire with no entry in the table at all (spec §4.7/§4.8). Default:
    /// sends Nack(Duplicate) directly to `in_face`.
    fn on_interest_loop(&self, api: &StrategyApi<'_>, in_face: FaceId, interest: &Interest) {
        let _ = api.send_raw_nack(in_face, interest.clone(), NackReason::Duplicate);
    }

    /// Fired when a new FIB next-hop becomes available while `pit_entry` is
    /// outstanding (spec §4.9: self-learning uses this to react to a route
    /// just learned from a PrefixAnnouncement). Default: no-op.
    fn after_new_next_hop(
        &self,
        _api: &StrategyApi<'_>,
        _pit_entry: &Rc<RefCell<pit::Entry>>,
        _new_hop: FaceId,
    ) {
    }

    /// Fired once, before `face` is actually removed from the `FaceTable`
    /// (spec §5's ordering guarantee: delivered before any subsequent event
    /// referencing the departed id). Strategies that index internal state
    /// by `FaceId` (ASF's `FaceInfo`, NCC's best/previous-best) must purge
    /// it here. Default: no-op.
    fn before_remove_face(&self, _api: &StrategyApi<'_>, _face: FaceId) {}
}

/// Parses a strategy instance Name of the form
/// `/localhost/nfd/strategy/<strategy-name>[/<version>][/<parameter>...]`
/// into its short name, optional version, and parameter components (spec
/// §10.6). Mirrors NFD's `ParsedInstanceName`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstanceName {
    pub strategy_name: String,
    pub version: Option<u64>,
    pub parameters: rust_udcn_common::ndn::Name,
}

pub fn parse_instance_name(name: &rust_udcn_common::ndn::Name) -> ParsedInstanceName {
    const PREFIX: &str = "/localhost/nfd/strategy";
    let prefix = rust_udcn_common::ndn::Name::from_string(PREFIX);
    // Strip the shared `/localhost/nfd/strategy` prefix, if present.
    let skip = if prefix.is_prefix_of(name) {
        prefix.component_count()
    } else {
        0
    };
    let components: Vec<_> = name.components().skip(skip).cloned().collect();

    let mut strategy_name = String::new();
    let mut version = None;
    let mut parameters = rust_udcn_common::ndn::Name::new();

    for (i, component) in components.iter().enumerate() {
        if i == 0 {
            strategy_name = component.to_string();
            continue;
        }
        if version.is_none() {
            if let Some(marker) = component.to_string().strip_prefix("%FD") {
                if let Ok(v) = u64::from_str_radix(marker, 16) {
                    version = Some(v);
                    continue;
                }
            }
        }
        parameters.push(component.clone());
    }

    ParsedInstanceName {
        strategy_name,
        version,
        parameters,
    }
}

/// Rejects `parsed.version` if it names a version this strategy doesn't
/// implement (spec §4.7: "Constructing with an unsupported version …
/// fails with an invalid-argument error"). No version component at all is
/// always accepted — the caller gets `supported`'s behavior by default,
/// matching NFD's `getStrategyName()` defaulting instance construction to
/// its own canonical versioned name.
pub fn require_supported_version(parsed: &ParsedInstanceName, supported: u64) -> Result<()> {
    match parsed.version {
        Some(v) if v != supported => Err(crate::Error::Strategy(format!(
            "{} strategy does not support version {} (supported: {})",
            parsed.strategy_name, v, supported
        ))),
        _ => Ok(()),
    }
}

/// Splits each parameter component of the form `key~value` into a map,
/// erroring on a component that doesn't follow that shape (spec §10.6: a
/// parameter the strategy can't make sense of is an `Error::Strategy`, the
/// same as an unsupported version).
fn parse_parameter_map(parameters: &rust_udcn_common::ndn::Name) -> Result<std::collections::HashMap<String, String>> {
    let mut map = std::collections::HashMap::new();
    for component in parameters.components() {
        let text = component.to_string();
        let Some((key, value)) = text.split_once('~') else {
            return Err(crate::Error::Strategy(format!(
                "malformed strategy parameter '{text}' (expected 'key~value')"
            )));
        };
        if map.insert(key.to_string(), value.to_string()).is_some() {
            return Err(crate::Error::Strategy(format!("duplicate strategy parameter '{key}'")));
        }
    }
    Ok(map)
}

/// Parses `parsed.parameters` into a key/value map, rejecting any key not
/// in `known` (spec §4.7/§10.6: "any unrecognized parameter component"
/// fails construction). A strategy that takes no parameters at all calls
/// this with an empty `known` list, so any parameter component is
/// rejected.
pub fn parse_known_parameters(
    parsed: &ParsedInstanceName,
    known: &[&str],
) -> Result<std::collections::HashMap<String, String>> {
    let map = parse_parameter_map(&parsed.parameters)?;
    for key in map.keys() {
        if !known.contains(&key.as_str()) {
            return Err(crate::Error::Strategy(format!(
                "{} strategy does not support parameter '{}'",
                parsed.strategy_name, key
            )));
        }
    }
    Ok(map)
}

/// Parses an optional named parameter as a millisecond duration. `None` if
/// the key wasn't supplied; `Err` if it was supplied but isn't a valid
/// non-negative integer.
pub fn parse_millis_parameter(
    params: &std::collections::HashMap<String, String>,
    key: &str,
) -> Result<Option<Duration>> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| crate::Error::Strategy(format!("parameter '{key}' must be a non-negative integer millisecond count, got '{value}'"))),
    }
}

/// Parses an optional named parameter as an `f64`. `None` if the key
/// wasn't supplied; `Err` if it was supplied but isn't a valid number.
pub fn parse_f64_parameter(params: &std::collections::HashMap<String, String>, key: &str) -> Result<Option<f64>> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| crate::Error::Strategy(format!("parameter '{key}' must be a number, got '{value}'"))),
    }
}

/// Constructs a `Strategy` trait object by short name (spec §10.6
/// `StrategyRegistry`). Reference strategies self-register via
/// `StrategyRegistry::builtin()`. Factories are fallible: an unsupported
/// version or an unrecognized parameter is an `Error::Strategy` (spec §7
/// "surfaced to management as invalid-argument; the old strategy remains in
/// place" — the caller simply doesn't swap in the new instance on `Err`).
type StrategyFactory = Rc<dyn Fn(rust_udcn_common::ndn::Name) -> Result<Rc<dyn Strategy>>>;

pub struct StrategyRegistry {
    factories: std::collections::HashMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            factories: std::collections::HashMap::new(),
        }
    }

    /// The registry pre-populated with the seven reference strategies (spec
    /// §4.9), the way NFD's `available-strategies.cpp` registers its
    /// built-ins at startup.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::strategies::register_builtins(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(rust_udcn_common::ndn::Name) -> Result<Rc<dyn Strategy>> + 'static,
    {
        self.factories.insert(name.to_string(), Rc::new(factory));
    }

    /// Constructs the strategy named by `instance_name`'s `strategy_name`
    /// component. `Ok(None)` if no such strategy is registered; `Err` if the
    /// name is registered but construction fails (bad version/parameter).
    pub fn create(&self, instance_name: &rust_udcn_common::ndn::Name) -> Result<Option<Rc<dyn Strategy>>> {
        let parsed = parse_instance_name(instance_name);
        let Some(factory) = self.factories.get(&parsed.strategy_name) else {
            return Ok(None);
        };
        factory(instance_name.clone()).map(Some)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_udcn_common::ndn::Name;

    #[test]
    fn parse_instance_name_extracts_name_version_and_parameters() {
        let name = Name::from_string("/localhost/nfd/strategy/best-route/%FD05/one/two");
        let parsed = parse_instance_name(&name);
        assert_eq!(parsed.strategy_name, "best-route");
        assert_eq!(parsed.version, Some(5));
        assert_eq!(parsed.parameters, Name::from_string("/one/two"));
    }

    #[test]
    fn parse_instance_name_with_no_version_or_parameters() {
        let name = Name::from_string("/localhost/nfd/strategy/multicast");
        let parsed = parse_instance_name(&name);
        assert_eq!(parsed.strategy_name, "multicast");
        assert_eq!(parsed.version, None);
        assert!(parsed.parameters.is_empty());
    }

    #[test]
    fn require_supported_version_accepts_no_version_or_the_supported_one() {
        let unversioned = parse_instance_name(&Name::from_string("/localhost/nfd/strategy/best-route"));
        assert!(require_supported_version(&unversioned, 5).is_ok());

        let versioned = parse_instance_name(&Name::from_string("/localhost/nfd/strategy/best-route/%FD05"));
        assert!(require_supported_version(&versioned, 5).is_ok());
    }

    #[test]
    fn require_supported_version_rejects_a_mismatched_version() {
        let parsed = parse_instance_name(&Name::from_string("/localhost/nfd/strategy/best-route/%FD99"));
        assert!(matches!(require_supported_version(&parsed, 5), Err(crate::Error::Strategy(_))));
    }

    #[test]
    fn parse_known_parameters_reads_recognized_keys() {
        let parsed = parse_instance_name(&Name::from_string(
            "/localhost/nfd/strategy/best-route/%FD05/retx-suppression-initial~20/retx-suppression-max~500",
        ));
        let params = parse_known_parameters(
            &parsed,
            &["retx-suppression-initial", "retx-suppression-max", "retx-suppression-multiplier"],
        )
        .unwrap();
        assert_eq!(params.get("retx-suppression-initial").map(String::as_str), Some("20"));
        assert_eq!(
            parse_millis_parameter(&params, "retx-suppression-initial").unwrap(),
            Some(Duration::from_millis(20))
        );
        assert_eq!(parse_millis_parameter(&params, "retx-suppression-multiplier").unwrap(), None);
    }

    #[test]
    fn parse_known_parameters_rejects_an_unrecognized_key() {
        let parsed = parse_instance_name(&Name::from_string("/localhost/nfd/strategy/best-route/%FD05/bogus~1"));
        assert!(matches!(
            parse_known_parameters(&parsed, &["retx-suppression-initial"]),
            Err(crate::Error::Strategy(_))
        ));
    }

    #[test]
    fn parse_known_parameters_rejects_a_strategy_with_no_parameters_of_its_own() {
        let parsed = parse_instance_name(&Name::from_string("/localhost/nfd/strategy/random/anything~1"));
        assert!(matches!(parse_known_parameters(&parsed, &[]), Err(crate::Error::Strategy(_))));
    }

    #[test]
    fn parse_millis_parameter_rejects_a_non_integer_value() {
        let mut params = std::collections::HashMap::new();
        params.insert("retx-suppression-initial".to_string(), "not-a-number".to_string());
        assert!(matches!(
            parse_millis_parameter(&params, "retx-suppression-initial"),
            Err(crate::Error::Strategy(_))
        ));
    }

    struct NoopStrategy {
        name: Name,
    }

    impl Strategy for NoopStrategy {
        fn instance_name(&self) -> &Name {
            &self.name
        }
        fn after_receive_interest(
            &self,
            _api: &StrategyApi<'_>,
            _pit_entry: &Rc<RefCell<pit::Entry>>,
            _in_face: FaceId,
            _interest: &Interest,
        ) {
        }
    }

    #[test]
    fn registry_round_trips_a_factory() {
        let mut registry = StrategyRegistry::new();
        registry.register("noop", |name| Ok(Rc::new(NoopStrategy { name }) as Rc<dyn Strategy>));
        assert!(registry.is_registered("noop"));
        let created = registry
            .create(&Name::from_string("/localhost/nfd/strategy/noop/%FD01"))
            .unwrap()
            .unwrap();
        assert_eq!(
            created.instance_name(),
            &Name::from_string("/localhost/nfd/strategy/noop/%FD01")
        );
    }

    #[test]
    fn registry_create_returns_none_for_unknown_strategy() {
        let registry = StrategyRegistry::new();
        assert!(registry
            .create(&Name::from_string("/localhost/nfd/strategy/unknown"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn registry_create_propagates_construction_errors() {
        let mut registry = StrategyRegistry::new();
        registry.register("picky", |_name| Err(crate::Error::Strategy("nope".into())));
        assert!(registry
            .create(&Name::from_string("/localhost/nfd/strategy/picky"))
            .is_err());
    }
}
