//! Wrapping microsecond and millisecond uptime counters.

use embassy_time::Instant;

/// Source of the two uptime counters used by the sampler.
///
/// Both counters are `u32` and wrap around at `u32::MAX`, so any arithmetic
/// on them has to use wrapping operations.
pub trait Clock {
    /// Microseconds since boot, modulo 2^32.
    fn micros(&self) -> u32;

    /// Milliseconds since boot, modulo 2^32.
    fn millis(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn micros(&self) -> u32 {
        (**self).micros()
    }

    fn millis(&self) -> u32 {
        (**self).millis()
    }
}

/// [`Clock`] backed by the embassy time driver.
///
/// The resolution is bounded by the driver tick rate. The RTC based nRF
/// driver ticks at 32768 Hz, which quantizes a 4000 us interval to 4028 us,
/// so firmware gates on a [`CounterClock`] instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct UptimeClock;

impl Clock for UptimeClock {
    fn micros(&self) -> u32 {
        Instant::now().as_micros() as u32
    }

    fn millis(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

/// Free running 1 MHz counter that wraps at 2^32.
pub trait MicrosCounter {
    fn count(&self) -> u32;
}

impl<M: MicrosCounter + ?Sized> MicrosCounter for &M {
    fn count(&self) -> u32 {
        (**self).count()
    }
}

/// [`Clock`] gating on a hardware microsecond counter while the printed
/// uptime stays on the embassy time driver.
pub struct CounterClock<M: MicrosCounter> {
    counter: M,
    uptime: UptimeClock,
}

impl<M: MicrosCounter> CounterClock<M> {
    pub fn new(counter: M) -> Self {
        Self { counter, uptime: UptimeClock }
    }
}

impl<M: MicrosCounter> Clock for CounterClock<M> {
    fn micros(&self) -> u32 {
        self.counter.count()
    }

    fn millis(&self) -> u32 {
        self.uptime.millis()
    }
}
