//! Virtual time driver for embassy-time with adjustable simulation speed.
//!
//! Registers a global time driver that maps host time to virtual ticks
//! through a speed factor (percent of real time). At 100% virtual time
//! tracks the wall clock; at 400% a 2-second cycle interval elapses in half
//! a real second. Changing the speed rebases the mapping at the current
//! virtual instant so time never jumps.
//!
//! All timer state lives behind one mutex: the clock origin, the speed, and
//! the queue of pending wakers keyed by virtual deadline. A single
//! background thread waits for the earliest deadline and fires due wakers.

use core::task::Waker;
use embassy_time_driver::{Driver, TICK_HZ, time_driver_impl};
use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, OnceLock};
use std::time::{Duration, Instant as StdInstant};

/// Upper bound on one condvar wait so speed changes apply promptly even if
/// a notification is missed.
const MAX_WAIT_SLICE: Duration = Duration::from_millis(25);

struct VirtualClock {
    /// Host instant the current mapping is anchored at.
    origin_real: StdInstant,
    /// Virtual ticks at `origin_real`.
    origin_ticks: u64,
    /// Simulation speed as percent of real time (100 = real time).
    percent: u32,
    /// Pending wakers keyed by virtual deadline.
    queue: BTreeMap<u64, Vec<Waker>>,
}

impl VirtualClock {
    /// Current virtual time in ticks.
    fn now_ticks(&self) -> u64 {
        let elapsed_ns = self.origin_real.elapsed().as_nanos();
        let real_ticks = elapsed_ns * TICK_HZ as u128 / 1_000_000_000u128;
        let scaled = real_ticks * self.percent as u128 / 100u128;
        self.origin_ticks.saturating_add(scaled.min(u64::MAX as u128) as u64)
    }

    /// Real duration until virtual deadline `target`, zero if already due.
    fn real_until(&self, target: u64) -> Duration {
        let now = self.now_ticks();
        let Some(dv) = target.checked_sub(now) else {
            return Duration::ZERO;
        };
        let real_ns = dv as u128 * 1_000_000_000u128 * 100u128 / (TICK_HZ as u128 * self.percent as u128);
        Duration::from_nanos(real_ns.min(u64::MAX as u128) as u64)
    }
}

static CLOCK: OnceLock<Mutex<VirtualClock>> = OnceLock::new();
static CV: OnceLock<Condvar> = OnceLock::new();
static SCHEDULER_STARTED: OnceLock<()> = OnceLock::new();

fn clock() -> &'static Mutex<VirtualClock> {
    CLOCK.get_or_init(|| {
        Mutex::new(VirtualClock {
            origin_real: StdInstant::now(),
            origin_ticks: 0,
            percent: 100,
            queue: BTreeMap::new(),
        })
    })
}

fn cv() -> &'static Condvar {
    CV.get_or_init(Condvar::new)
}

fn ensure_scheduler_thread() {
    SCHEDULER_STARTED.get_or_init(|| {
        std::thread::Builder::new()
            .name("virtual-time-scheduler".into())
            .spawn(scheduler_thread)
            .expect("failed to start virtual time scheduler thread");
    });
}

fn scheduler_thread() {
    loop {
        let mut guard = clock().lock().unwrap();

        // Fire everything that is already due
        let now = guard.now_ticks();
        let later = guard.queue.split_off(&now.saturating_add(1));
        let due_map = std::mem::replace(&mut guard.queue, later);
        let due: Vec<Waker> = due_map.into_values().flatten().collect();
        if !due.is_empty() {
            drop(guard);
            for waker in due {
                waker.wake();
            }
            continue;
        }

        // Sleep until the earliest deadline (or a notify), in bounded slices
        match guard.queue.keys().next().copied() {
            None => {
                let _guard = cv().wait(guard).unwrap();
            }
            Some(next) => {
                let wait = guard.real_until(next).min(MAX_WAIT_SLICE);
                let _ = cv().wait_timeout(guard, wait).unwrap();
            }
        }
    }
}

struct VirtualDriver;

impl Driver for VirtualDriver {
    fn now(&self) -> u64 {
        clock().lock().unwrap().now_ticks()
    }

    fn schedule_wake(&self, at: u64, waker: &Waker) {
        ensure_scheduler_thread();
        let mut guard = clock().lock().unwrap();
        guard.queue.entry(at).or_default().push(waker.clone());
        drop(guard);
        cv().notify_all();
    }
}

time_driver_impl!(static DRIVER: VirtualDriver = VirtualDriver);

/// Set the simulation speed as a percent of real time, clamped to 1–1000.
///
/// The mapping is rebased at the current virtual instant, so `now()` is
/// continuous across the change and queued deadlines stay in the future.
pub fn set_simulation_speed_percent(percent: u32) {
    let percent = percent.clamp(1, 1000);
    let mut guard = clock().lock().unwrap();
    if guard.percent == percent {
        return;
    }
    guard.origin_ticks = guard.now_ticks();
    guard.origin_real = StdInstant::now();
    guard.percent = percent;
    drop(guard);
    // Wake the scheduler so pending waits are re-evaluated under the new scale
    cv().notify_all();
}

pub fn get_simulation_speed_percent() -> u32 {
    clock().lock().unwrap().percent
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // Serialize tests touching the global clock state
    static TEST_GUARD: StdMutex<()> = StdMutex::new(());

    #[test]
    fn virtual_now_is_monotonic() {
        let _g = TEST_GUARD.lock().unwrap();
        set_simulation_speed_percent(100);
        let a = clock().lock().unwrap().now_ticks();
        std::thread::sleep(Duration::from_millis(5));
        let b = clock().lock().unwrap().now_ticks();
        assert!(b >= a);
    }

    #[test]
    fn speed_change_keeps_now_continuous() {
        let _g = TEST_GUARD.lock().unwrap();
        set_simulation_speed_percent(100);
        let before = clock().lock().unwrap().now_ticks();
        set_simulation_speed_percent(400);
        let after = clock().lock().unwrap().now_ticks();
        // Rebasing anchors the new scale at the current instant; any gap is
        // only the real time between the two reads
        assert!(after >= before);
        assert!(after - before <= TICK_HZ / 10, "virtual time jumped on speed change");
        set_simulation_speed_percent(100);
    }

    #[test]
    fn real_wait_scales_inversely_with_speed() {
        let _g = TEST_GUARD.lock().unwrap();
        set_simulation_speed_percent(200);
        let guard = clock().lock().unwrap();
        let now = guard.now_ticks();
        // A 0.2 virtual-second deadline should be ~0.1 real seconds away at 200%
        let target = now + TICK_HZ / 5;
        let wait = guard.real_until(target);
        drop(guard);
        let diff = (wait.as_secs_f64() - 0.1).abs();
        assert!(diff < 0.01, "expected ~0.1s wait, got {:?}", wait);
        set_simulation_speed_percent(100);
    }

    #[test]
    fn past_deadlines_are_due_immediately() {
        let _g = TEST_GUARD.lock().unwrap();
        let guard = clock().lock().unwrap();
        let now = guard.now_ticks();
        assert_eq!(guard.real_until(now.saturating_sub(1)), Duration::ZERO);
    }

    #[test]
    fn speed_percent_is_clamped() {
        let _g = TEST_GUARD.lock().unwrap();
        set_simulation_speed_percent(5000);
        assert_eq!(get_simulation_speed_percent(), 1000);
        set_simulation_speed_percent(0);
        assert_eq!(get_simulation_speed_percent(), 1);
        set_simulation_speed_percent(100);
    }
}
