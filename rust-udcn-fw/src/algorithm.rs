//! Auxiliary algorithms shared across strategies (spec §4.10 and the
//! original's `algorithm.{hpp,cpp}`, `retx-suppression*`,
//! `process-nack-traits.*`): scope enforcement, duplicate-Nonce detection,
//! RTT estimation, retransmission suppression, and Nack-reason combination.

use std::time::{Duration, Instant};

use rust_udcn_common::ndn::NackReason;

use crate::face::{Face, Scope};
use crate::table::pit;

/// `ndn:/localhost` — local-only scope; see spec §6.
pub const LOCALHOST: &str = "/localhost";
/// `ndn:/localhop` — single-hop scope; see spec §6.
pub const LOCALHOP: &str = "/localhop";

fn is_under(name: &rust_udcn_common::ndn::Name, prefix: &str) -> bool {
    rust_udcn_common::ndn::Name::from_string(prefix).is_prefix_of(name)
}

/// Whether `name` falls under `/localhost` (spec §4.8 incoming-Interest/
/// incoming-Data step 1: such packets may only arrive on a local face).
pub fn is_under_localhost(name: &rust_udcn_common::ndn::Name) -> bool {
    is_under(name, LOCALHOST)
}

/// A tiny `bitflags`-shaped macro, used only for `DuplicateNonceWhere`: the
/// core has exactly one flag-set type and doesn't otherwise depend on the
/// `bitflags` crate.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name($repr);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            pub fn contains(self, other: $name) -> bool {
                (self.0 & other.0) == other.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }
    };
}

/// Determines whether forwarding `interest` to `out_face` would violate
/// `/localhost`/`/localhop` scope, given it arrived on `in_face`.
pub fn would_violate_scope(
    in_face: &dyn Face,
    interest: &rust_udcn_common::ndn::Interest,
    out_face: &dyn Face,
) -> bool {
    if matches!(out_face.scope(), Scope::Local) {
        // Forwarding to a local face is always allowed.
        return false;
    }

    if is_under(&interest.name, LOCALHOST) {
        // /localhost Interests cannot be forwarded to a non-local face.
        return true;
    }

    if is_under(&interest.name, LOCALHOP) {
        // /localhop Interests can cross to a non-local face only if they
        // arrived on a local face.
        return !matches!(in_face.scope(), Scope::Local);
    }

    false
}

/// `canForwardToLegacy`: true iff `face` has no unexpired out-record and
/// some *other* face has an unexpired in-record. Used by best-route v1 only
/// (spec §4.10); kept for fidelity, not called by any reference strategy here.
pub fn can_forward_to_legacy(entry: &pit::Entry, face_id: crate::face::FaceId) -> bool {
    let now = Instant::now();
    let has_unexpired_out = entry
        .out_records()
        .any(|r| r.face == face_id && r.expiry > now);
    if has_unexpired_out {
        return false;
    }
    entry
        .in_records()
        .any(|r| r.face != face_id && r.expiry > now)
}

bitflags_like! {
    /// Bitmask over where a duplicate Nonce was found (spec §4.10).
    pub struct DuplicateNonceWhere: u8 {
        const NONE = 0;
        const IN_SAME = 1 << 0;
        const IN_OTHER = 1 << 1;
        const OUT_SAME = 1 << 2;
        const OUT_OTHER = 1 << 3;
    }
}

/// `findDuplicateNonce`: scans `entry`'s in/out-records for `nonce`, returning
/// a bitmask of where it was found relative to `face`.
pub fn find_duplicate_nonce(
    entry: &pit::Entry,
    nonce: u32,
    face: crate::face::FaceId,
) -> DuplicateNonceWhere {
    let mut found = DuplicateNonceWhere::NONE;
    for r in entry.in_records() {
        if r.last_nonce == nonce {
            found |= if r.face == face {
                DuplicateNonceWhere::IN_SAME
            } else {
                DuplicateNonceWhere::IN_OTHER
            };
        }
    }
    for r in entry.out_records() {
        if r.last_nonce == nonce {
            found |= if r.face == face {
                DuplicateNonceWhere::OUT_SAME
            } else {
                DuplicateNonceWhere::OUT_OTHER
            };
        }
    }
    found
}

/// `hasPendingOutRecords`: true iff some out-record is unexpired and has not
/// yet received an incoming Nack.
pub fn has_pending_out_records(entry: &pit::Entry) -> bool {
    let now = Instant::now();
    entry
        .out_records()
        .any(|r| r.expiry > now && r.incoming_nack.is_none())
}

/// `getLastOutgoing`: the most recent out-record's `last_renewed` time.
/// Panics if there are no out-records (callers must check first, as in NFD).
pub fn get_last_outgoing(entry: &pit::Entry) -> Instant {
    entry
        .out_records()
        .map(|r| r.last_renewed)
        .max()
        .expect("pitEntry has one or more out-records")
}

/* ------------------------------------------------------------------- *
 * RTT estimator
 * ------------------------------------------------------------------- */

/// Jacobson/Karels-style smoothed RTT estimator, tunable per strategy
/// (spec §4.10). `alpha` smooths SRTT, `k` scales RTTVAR into the RTO, and
/// `min_rto`/`max_rto` clamp the computed timeout.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    alpha: f64,
    beta: f64,
    k: f64,
    min_rto: Duration,
    max_rto: Duration,
    srtt: Option<Duration>,
    rttvar: Duration,
}

impl RttEstimator {
    pub const DEFAULT_ALPHA: f64 = 0.125;
    pub const DEFAULT_BETA: f64 = 0.25;
    pub const DEFAULT_K: f64 = 4.0;
    pub const DEFAULT_MIN_RTO: Duration = Duration::from_millis(200);
    pub const DEFAULT_MAX_RTO: Duration = Duration::from_secs(4);

    pub fn new() -> Self {
        Self::with_params(
            Self::DEFAULT_ALPHA,
            Self::DEFAULT_BETA,
            Self::DEFAULT_K,
            Self::DEFAULT_MIN_RTO,
            Self::DEFAULT_MAX_RTO,
        )
    }

    pub fn with_params(
        alpha: f64,
        beta: f64,
        k: f64,
        min_rto: Duration,
        max_rto: Duration,
    ) -> Self {
        Self {
            alpha,
            beta,
            k,
            min_rto,
            max_rto,
            srtt: None,
            rttvar: Duration::from_millis(0),
        }
    }

    /// Whether any measurement has been recorded yet.
    pub fn has_samples(&self) -> bool {
        self.srtt.is_some()
    }

    /// Folds a new RTT sample into SRTT/RTTVAR.
    pub fn add_measurement(&mut self, rtt: Duration) {
        match self.srtt {
            None => {
                self.srtt = Some(rtt);
                self.rttvar = rtt / 2;
            }
            Some(srtt) => {
                let rtt_s = rtt.as_secs_f64();
                let srtt_s = srtt.as_secs_f64();
                let rttvar_s = self.rttvar.as_secs_f64();
                let delta = rtt_s - srtt_s;
                let new_rttvar = (1.0 - self.beta) * rttvar_s + self.beta * delta.abs();
                let new_srtt = srtt_s + self.alpha * delta;
                self.rttvar = Duration::from_secs_f64(new_rttvar.max(0.0));
                self.srtt = Some(Duration::from_secs_f64(new_srtt.max(0.0)));
            }
        }
    }

    /// `SRTT` if at least one measurement has been recorded.
    pub fn smoothed_rtt(&self) -> Option<Duration> {
        self.srtt
    }

    /// `SRTT + k * RTTVAR`, clamped to `[min_rto, max_rto]`. Falls back to
    /// `min_rto` when no measurement has ever been recorded.
    pub fn compute_rto(&self) -> Duration {
        let rto = match self.srtt {
            None => return self.min_rto,
            Some(srtt) => srtt.as_secs_f64() + self.k * self.rttvar.as_secs_f64(),
        };
        let rto = Duration::from_secs_f64(rto.max(0.0));
        rto.clamp(self.min_rto, self.max_rto)
    }
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/* ------------------------------------------------------------------- *
 * Retransmission suppression
 * ------------------------------------------------------------------- */

/// Outcome of a retransmission-suppression decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetxSuppressionResult {
    /// The Interest is not a retransmission (no unexpired out-record yet).
    New,
    /// A retransmission that should be forwarded.
    Forward,
    /// A retransmission that should be suppressed.
    Suppress,
}

/// Fixed-interval suppression (spec §4.10): decides purely off the age of
/// the last out-record, with a constant `min_interval`.
#[derive(Debug, Clone, Copy)]
pub struct RetxSuppressionFixed {
    min_interval: Duration,
}

impl RetxSuppressionFixed {
    pub const DEFAULT_MIN_RETX_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    pub fn decide(&self, entry: &pit::Entry) -> RetxSuppressionResult {
        if !entry.has_unexpired_out_records() {
            return RetxSuppressionResult::New;
        }
        let last = get_last_outgoing(entry);
        if last.elapsed() < self.min_interval {
            RetxSuppressionResult::Suppress
        } else {
            RetxSuppressionResult::Forward
        }
    }
}

impl Default for RetxSuppressionFixed {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_RETX_INTERVAL)
    }
}

/// Per-PIT-entry exponential-backoff suppression interval, stored as
/// strategy-info on the entry (mirrors NFD's `RetxSuppressionExponential::PitInfo`).
#[derive(Debug, Clone, Copy)]
pub struct RetxSuppressionExponentialInfo {
    pub suppression_interval: Duration,
}

/// Exponential-backoff suppression (spec §4.10): the i-th retransmission is
/// suppressed if the last out-record occurred within
/// `min(initial * multiplier^(i-1), max)`.
#[derive(Debug, Clone, Copy)]
pub struct RetxSuppressionExponential {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
}

impl RetxSuppressionExponential {
    pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(1);
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;
    pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(250);

    pub fn new(initial_interval: Duration, multiplier: f64, max_interval: Duration) -> Self {
        debug_assert!(initial_interval > Duration::from_millis(0));
        debug_assert!(multiplier >= 1.0);
        debug_assert!(max_interval >= initial_interval);
        Self {
            initial_interval,
            multiplier,
            max_interval,
        }
    }

    /// Decides per-PIT-entry, using (and updating) the `RetxSuppressionExponentialInfo`
    /// strategy-info slot on `entry`.
    pub fn decide_per_pit_entry(&self, entry: &mut pit::Entry) -> RetxSuppressionResult {
        if !entry.has_unexpired_out_records() {
            return RetxSuppressionResult::New;
        }
        let last = get_last_outgoing(entry);
        let since = last.elapsed();

        let info = entry
            .strategy_info
            .get_or_insert_with(|| RetxSuppressionExponentialInfo {
                suppression_interval: self.initial_interval,
            });

        if since < info.suppression_interval {
            return RetxSuppressionResult::Suppress;
        }

        let next = info.suppression_interval.mul_f64(self.multiplier);
        info.suppression_interval = next.min(self.max_interval);
        RetxSuppressionResult::Forward
    }
}

impl Default for RetxSuppressionExponential {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_INITIAL_INTERVAL,
            Self::DEFAULT_MULTIPLIER,
            Self::DEFAULT_MAX_INTERVAL,
        )
    }
}

/// Per-out-face variant of exponential suppression, for strategies (e.g.
/// multicast) that manage each upstream's retransmission independently
/// rather than suppressing the whole PIT entry at once.
#[derive(Debug, Default, Clone)]
pub struct RetxSuppressionExponentialPerFace {
    params: RetxSuppressionExponentialInner,
}

#[derive(Debug, Clone, Copy)]
struct RetxSuppressionExponentialInner {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
}

impl Default for RetxSuppressionExponentialInner {
    fn default() -> Self {
        Self {
            initial_interval: RetxSuppressionExponential::DEFAULT_INITIAL_INTERVAL,
            multiplier: RetxSuppressionExponential::DEFAULT_MULTIPLIER,
            max_interval: RetxSuppressionExponential::DEFAULT_MAX_INTERVAL,
        }
    }
}

impl RetxSuppressionExponentialPerFace {
    pub fn new(initial_interval: Duration, multiplier: f64, max_interval: Duration) -> Self {
        Self {
            params: RetxSuppressionExponentialInner {
                initial_interval,
                multiplier,
                max_interval,
            },
        }
    }

    /// Decides for a single out-face, given that out-record's existing
    /// suppression interval (or `None` if this face has never been sent to).
    /// Returns the decision plus the (possibly advanced) interval to store.
    pub fn decide(
        &self,
        out_record_last_renewed: Option<Instant>,
        current_interval: Option<Duration>,
    ) -> (RetxSuppressionResult, Duration) {
        let Some(last) = out_record_last_renewed else {
            return (RetxSuppressionResult::New, self.params.initial_interval);
        };
        let interval = current_interval.unwrap_or(self.params.initial_interval);
        if last.elapsed() < interval {
            (RetxSuppressionResult::Suppress, interval)
        } else {
            let next = interval.mul_f64(self.params.multiplier).min(self.params.max_interval);
            (RetxSuppressionResult::Forward, next)
        }
    }
}

/* ------------------------------------------------------------------- *
 * Nack reason combination (ProcessNackTraits)
 * ------------------------------------------------------------------- */

/// Result of folding all of a PIT entry's out-record Nacks together.
pub enum NackCombination {
    /// Not all upstreams have responded yet (and the live-deadlock
    /// exception doesn't apply); keep waiting.
    Wait,
    /// Send a Nack with `reason` to exactly `face` (the live-deadlock
    /// break, or the sole un-Nacked face doubling as a downstream).
    NackOne {
        face: crate::face::FaceId,
        reason: NackReason,
    },
    /// Every out-record carries an incoming Nack: send `reason` to every
    /// downstream whose last Nonce matches an out-record Nonce.
    NackAll { reason: NackReason },
}

/// `ProcessNackTraits::processNack`'s decision logic (spec §4.10). Strategies
/// call this from `after_receive_nack` after attaching the incoming Nack to
/// the relevant out-record, then act on the returned `NackCombination`.
pub fn combine_nacks(entry: &pit::Entry) -> NackCombination {
    let mut not_nacked = Vec::new();
    let mut least_severe = NackReason::None;
    let mut any_nacked = false;

    for out in entry.out_records() {
        match out.incoming_nack {
            Some(reason) => {
                any_nacked = true;
                least_severe = least_severe.combine(reason);
            }
            None => not_nacked.push(out.face),
        }
    }

    if not_nacked.len() == 1 {
        let face = not_nacked[0];
        if entry.in_records().any(|r| r.face == face) {
            return NackCombination::NackOne {
                face,
                reason: least_severe,
            };
        }
    }

    if !not_nacked.is_empty() {
        return NackCombination::Wait;
    }

    debug_assert!(any_nacked, "combine_nacks called with no out-records");
    NackCombination::NackAll {
        reason: least_severe,
    }
}
