//! The retransmission timer.
//!
//! RFC 3315 §14: every timeout is randomized by a factor uniformly drawn from
//! `[-0.1, 0.1]`, doubled on each retransmission and clamped to `MRT`.

use std::time::{Duration, Instant};

use rand::Rng;

use dhcpv6_protocol::{ELAPSED_TIME_MAX, REQ_MAX_RC, REQ_MAX_RT, REQ_TIMEOUT};

/// Retransmission parameters of a message class.
///
/// Zero `mrt`, `mrc` or `mrd` means the corresponding bound is not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Initial retransmission timeout.
    pub irt: Duration,
    /// Maximum retransmission timeout.
    pub mrt: Duration,
    /// Maximum retransmission count.
    pub mrc: u32,
    /// Maximum retransmission duration.
    pub mrd: Duration,
}

impl Timing {
    /// REQUEST message timing (RFC 3315 §18.1.1).
    pub fn request() -> Self {
        Timing {
            irt: Duration::from_millis(REQ_TIMEOUT),
            mrt: Duration::from_millis(REQ_MAX_RT),
            mrc: REQ_MAX_RC,
            mrd: Duration::from_secs(0),
        }
    }

    /// An exchange with neither `mrc` nor `mrd` retransmits forever.
    pub fn is_bounded(&self) -> bool {
        self.mrc > 0 || self.mrd > Duration::from_secs(0)
    }
}

/// What the timer asks the exchange to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The current timeout has not elapsed yet.
    Pending,
    /// The timeout has elapsed and the message must be sent again.
    Retransmit,
    /// `mrc` or `mrd` has been exceeded.
    Exhausted,
}

/// The RFC 3315 exponential backoff with jitter for a single exchange.
#[derive(Debug, Clone)]
pub struct Backoff {
    timing: Timing,
    started_at: Instant,
    expires_at: Instant,
    /// Current retransmission timeout.
    rt: Duration,
    /// Current retransmission count.
    rc: u32,
    exhausted: bool,
}

impl Backoff {
    /// Arms the timer for the first transmission made at `now`.
    pub fn new(timing: Timing, now: Instant) -> Self {
        let rt = Self::randomize(timing.irt, 1.0);
        let mut backoff = Backoff {
            timing,
            started_at: now,
            expires_at: now,
            rt,
            rc: 0,
            exhausted: false,
        };
        backoff.expires_at = backoff.deadline(now);
        backoff
    }

    /// Advances the timer to `now`.
    ///
    /// Each `Retransmit` increments the retransmission count and computes the next timeout.
    pub fn poll(&mut self, now: Instant) -> Tick {
        if self.exhausted {
            return Tick::Exhausted;
        }
        if now < self.expires_at {
            return Tick::Pending;
        }

        if self.timing.mrd > Duration::from_secs(0) && self.elapsed(now) >= self.timing.mrd {
            self.exhausted = true;
            return Tick::Exhausted;
        }
        self.rc += 1;
        if self.timing.mrc > 0 && self.rc > self.timing.mrc {
            self.exhausted = true;
            return Tick::Exhausted;
        }

        self.rt = self.next_timeout();
        self.expires_at = self.deadline(now);
        Tick::Retransmit
    }

    /// Current retransmission timeout.
    pub fn rt(&self) -> Duration {
        self.rt
    }

    /// The number of retransmissions made so far.
    pub fn rc(&self) -> u32 {
        self.rc
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// The `ELAPSED_TIME` option value in hundredths of a second.
    pub fn elapsed_time(&self, now: Instant) -> u16 {
        let hundredths = self.elapsed(now).as_millis() / 10;
        if hundredths > u128::from(ELAPSED_TIME_MAX) {
            ELAPSED_TIME_MAX
        } else {
            hundredths as u16
        }
    }

    fn next_timeout(&self) -> Duration {
        let rt = Self::randomize(self.rt, 2.0);
        if self.timing.mrt > Duration::from_secs(0) && rt > self.timing.mrt {
            Self::randomize(self.timing.mrt, 1.0)
        } else {
            rt
        }
    }

    /// The timer never fires after the `mrd` deadline.
    fn deadline(&self, now: Instant) -> Instant {
        let expires_at = now + self.rt;
        if self.timing.mrd > Duration::from_secs(0) {
            let limit = self.started_at + self.timing.mrd;
            if expires_at > limit {
                return limit;
            }
        }
        expires_at
    }

    /// `base * factor + RAND * base`, where `RAND` is within `[-0.1, 0.1]`.
    fn randomize(base: Duration, factor: f64) -> Duration {
        let jitter: f64 = rand::thread_rng().gen_range(-0.1..=0.1);
        base.mul_f64(factor + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn timing(irt: u64, mrt: u64, mrc: u32, mrd: u64) -> Timing {
        Timing {
            irt: Duration::from_millis(irt),
            mrt: Duration::from_millis(mrt),
            mrc,
            mrd: Duration::from_millis(mrd),
        }
    }

    #[test]
    fn first_timeout_is_irt_with_jitter() {
        for _ in 0..1_000 {
            let backoff = Backoff::new(timing(1_000, 30_000, 10, 0), Instant::now());
            let rt = backoff.rt().as_secs_f64();
            assert!(rt >= 0.9 - EPSILON && rt <= 1.1 + EPSILON, "rt = {}", rt);
        }
    }

    #[test]
    fn timeouts_double_within_jitter_and_respect_mrt() {
        let mrt = 30_000u64;
        for _ in 0..100 {
            let mut now = Instant::now();
            let mut backoff = Backoff::new(timing(1_000, mrt, 0, 0), now);
            for _ in 0..12 {
                let previous = backoff.rt().as_secs_f64();
                now = backoff.expires_at();
                assert_eq!(backoff.poll(now), Tick::Retransmit);
                let current = backoff.rt().as_secs_f64();

                let doubled =
                    current >= 1.9 * previous - EPSILON && current <= 2.1 * previous + EPSILON;
                let clamped = current >= 0.9 * 30.0 - EPSILON && current <= 1.1 * 30.0 + EPSILON;
                assert!(doubled || clamped, "{} -> {}", previous, current);
                assert!(current <= 1.1 * 30.0 + EPSILON);
            }
        }
    }

    #[test]
    fn pending_until_timeout_elapses() {
        let now = Instant::now();
        let mut backoff = Backoff::new(timing(1_000, 0, 3, 0), now);
        assert_eq!(backoff.poll(now + Duration::from_millis(800)), Tick::Pending);
        assert_eq!(backoff.rc(), 0);
    }

    #[test]
    fn exhausted_after_mrc_retransmissions() {
        let mut now = Instant::now();
        let mut backoff = Backoff::new(timing(100, 1_000, 3, 0), now);
        for rc in 1..=3 {
            now = backoff.expires_at();
            assert_eq!(backoff.poll(now), Tick::Retransmit);
            assert_eq!(backoff.rc(), rc);
        }
        now = backoff.expires_at();
        assert_eq!(backoff.poll(now), Tick::Exhausted);
        assert_eq!(backoff.poll(now + Duration::from_secs(100)), Tick::Exhausted);
        assert!(backoff.is_exhausted());
    }

    #[test]
    fn exhausted_after_mrd() {
        let start = Instant::now();
        let mut backoff = Backoff::new(timing(1_000, 0, 0, 2_500), start);
        let mut now;
        let mut retransmissions = 0;
        loop {
            now = backoff.expires_at();
            assert!(now <= start + Duration::from_millis(2_500));
            match backoff.poll(now) {
                Tick::Retransmit => retransmissions += 1,
                Tick::Exhausted => break,
                Tick::Pending => unreachable!(),
            }
        }
        assert!(retransmissions >= 1);
        assert_eq!(backoff.elapsed(now), Duration::from_millis(2_500));
    }

    #[test]
    fn unbounded_timing_never_exhausts() {
        let unbounded = timing(1_000, 0, 0, 0);
        assert!(!unbounded.is_bounded());
        assert!(Timing::request().is_bounded());

        let mut backoff = Backoff::new(unbounded, Instant::now());
        for _ in 0..5 {
            let now = backoff.expires_at();
            assert_eq!(backoff.poll(now), Tick::Retransmit);
        }
        assert_eq!(backoff.rc(), 5);
        assert!(!backoff.is_exhausted());
    }

    #[test]
    fn elapsed_time_is_saturated() {
        let start = Instant::now();
        let backoff = Backoff::new(Timing::request(), start);
        assert_eq!(backoff.elapsed_time(start + Duration::from_millis(1_234)), 123);
        assert_eq!(backoff.elapsed_time(start + Duration::from_secs(1_000)), ELAPSED_TIME_MAX);
    }
}
