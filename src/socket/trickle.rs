//! A trickle timer, after [RFC 6206].
//!
//! The timer fires at most once per interval, at a random point in the
//! second half of it. Every interval that passes without an inconsistency
//! doubles the next one, up to `i_max`. Hearing an inconsistency shrinks
//! the interval back to `i_min` so the next firing comes soon.
//!
//! There is no redundancy counter: the client never hears consistent
//! transmissions from peers, so every firing transmits.
//!
//! [RFC 6206]: https://datatracker.ietf.org/doc/html/rfc6206

use crate::rand::Rand;
use crate::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrickleTimer {
    i_min: Duration,
    i_max: Duration,
    /// Length of the current interval.
    i: Duration,
    /// When the current interval ends.
    i_exp: Instant,
    /// When the timer fires within the current interval.
    t_exp: Instant,
    fired: bool,
    running: bool,
}

impl Default for TrickleTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrickleTimer {
    pub const fn new() -> Self {
        TrickleTimer {
            i_min: Duration::ZERO,
            i_max: Duration::ZERO,
            i: Duration::ZERO,
            i_exp: Instant::ZERO,
            t_exp: Instant::ZERO,
            fired: false,
            running: false,
        }
    }

    /// Start a new cycle. The first interval is picked at random in
    /// `[i_min, 2 * i_min)`, never longer than `i_max`.
    pub fn start(&mut self, now: Instant, rand: &mut Rand, i_min: Duration, i_max: Duration) {
        let i_min = i_min.max(Duration::from_millis(1));
        let i_max = i_max.max(i_min);

        self.i_min = i_min;
        self.i_max = i_max;
        let i = rand.rand_range(i_min.total_millis()..(i_min * 2).total_millis());
        self.i = Duration::from_millis(i).min(i_max);
        self.running = true;
        self.start_interval(now, rand);
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Length of the current interval.
    pub fn interval(&self) -> Duration {
        self.i
    }

    /// Shrink the interval back to `i_min` and start over, unless it is
    /// already there.
    pub fn hear_inconsistent(&mut self, now: Instant, rand: &mut Rand) {
        if self.running && self.i != self.i_min {
            self.i = self.i_min;
            self.start_interval(now, rand);
        }
    }

    /// Advance the timer to `now`. Returns `true` if it fired.
    pub fn poll(&mut self, now: Instant, rand: &mut Rand) -> bool {
        if !self.running {
            return false;
        }

        loop {
            if !self.fired {
                if now >= self.t_exp {
                    self.fired = true;
                    return true;
                }
                return false;
            }

            if now < self.i_exp {
                return false;
            }

            self.i = (self.i * 2).min(self.i_max);
            // A late driver gets one firing, not a burst of them.
            self.start_interval(now, rand);
        }
    }

    /// When the timer next needs polling, or `None` if it is stopped.
    pub fn poll_at(&self) -> Option<Instant> {
        if !self.running {
            None
        } else if !self.fired {
            Some(self.t_exp)
        } else {
            Some(self.i_exp)
        }
    }

    fn start_interval(&mut self, now: Instant, rand: &mut Rand) {
        let i = self.i.total_millis();
        let t = rand.rand_range(i / 2..i);

        self.i_exp = now + self.i;
        self.t_exp = now + Duration::from_millis(t);
        self.fired = false;

        net_trace!("trickle: interval {} fires at {}", self.i, self.t_exp);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const I_MIN: Duration = Duration::from_secs(1);
    const I_MAX: Duration = Duration::from_secs(120);

    fn started(rand: &mut Rand) -> TrickleTimer {
        let mut timer = TrickleTimer::new();
        timer.start(Instant::ZERO, rand, I_MIN, I_MAX);
        timer
    }

    #[test]
    fn test_first_interval() {
        let mut rand = Rand::new(0x7a);
        for _ in 0..100 {
            let timer = started(&mut rand);
            assert!(timer.interval() >= I_MIN);
            assert!(timer.interval() < I_MIN * 2);
            let t = timer.poll_at().unwrap();
            assert!(t >= Instant::ZERO + timer.interval() / 2);
            assert!(t < Instant::ZERO + timer.interval());
        }
    }

    #[test]
    fn test_fires_once_per_interval() {
        let mut rand = Rand::new(1);
        let mut timer = started(&mut rand);
        let t = timer.poll_at().unwrap();

        assert!(!timer.poll(t - Duration::from_millis(1), &mut rand));
        assert!(timer.poll(t, &mut rand));
        assert!(!timer.poll(t, &mut rand));
    }

    #[test]
    fn test_interval_doubles_up_to_max() {
        let mut rand = Rand::new(2);
        let mut timer = started(&mut rand);
        let mut now = Instant::ZERO;
        let mut last = timer.interval();
        let mut fired = 0;

        while fired < 16 {
            now = timer.poll_at().unwrap();
            if timer.poll(now, &mut rand) {
                fired += 1;
                assert!(timer.interval() >= last);
                assert!(timer.interval() <= I_MAX);
                last = timer.interval();
            }
        }
        assert_eq!(timer.interval(), I_MAX);
        assert!(now > Instant::from_secs(120));
    }

    #[test]
    fn test_inconsistency_resets_to_min() {
        let mut rand = Rand::new(3);
        let mut timer = started(&mut rand);
        timer.hear_inconsistent(Instant::ZERO, &mut rand);
        assert_eq!(timer.interval(), I_MIN);

        let t = timer.poll_at().unwrap();
        assert!(t >= Instant::from_millis(500));
        assert!(t < Instant::from_millis(1000));
    }

    #[test]
    fn test_late_poll_fires_once() {
        let mut rand = Rand::new(4);
        let mut timer = started(&mut rand);
        let late = Instant::from_secs(1000);
        assert!(timer.poll(late, &mut rand));
        // the missed intervals collapse into a single fresh one
        assert!(!timer.poll(late, &mut rand));
        assert!(timer.poll_at().unwrap() > late);
    }

    #[test]
    fn test_stop() {
        let mut rand = Rand::new(5);
        let mut timer = started(&mut rand);
        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.poll_at(), None);
        assert!(!timer.poll(Instant::from_secs(10), &mut rand));
    }
}
