use adc_stream_core::clock::MicrosCounter;
use embassy_nrf::{
    Peri,
    timer::{Cc, Frequency, Instance, Timer},
};

/// Free running 32-bit TIMER at 1 MHz, read through a capture task.
pub struct TimerCounter<'d> {
    _timer: Timer<'d>,
    capture: Cc<'d>,
}

impl<'d> TimerCounter<'d> {
    pub fn new<T: Instance>(timer: Peri<'d, T>) -> Self {
        let timer = Timer::new(timer);
        timer.set_frequency(Frequency::F1MHz);
        timer.clear();
        let capture = timer.cc(0);
        timer.start();
        Self { _timer: timer, capture }
    }
}

impl MicrosCounter for TimerCounter<'_> {
    fn count(&self) -> u32 {
        self.capture.capture()
    }
}
