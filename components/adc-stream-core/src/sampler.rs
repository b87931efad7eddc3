#![allow(async_fn_in_trait)]

use embassy_futures::yield_now;
use embedded_io_async::Write;

use crate::{clock::Clock, config, record::Record};

/// One analog channel delivering raw converter values.
pub trait AnalogInput {
    async fn read(&mut self) -> u16;
}

impl<A: AnalogInput + ?Sized> AnalogInput for &mut A {
    async fn read(&mut self) -> u16 {
        (**self).read().await
    }
}

/// Decides when the next sample is due.
///
/// `last_sample_us` is only ever set to the gating timestamp of a sample that
/// fired. The elapsed time is computed with wrapping subtraction so the gate
/// keeps working when the microsecond counter rolls over.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleGate {
    interval_us: u32,
    last_sample_us: u32,
}

impl SampleGate {
    pub const fn new(interval_us: u32) -> Self {
        Self {
            interval_us,
            last_sample_us: 0,
        }
    }

    pub const fn with_last_sample(interval_us: u32, last_sample_us: u32) -> Self {
        Self { interval_us, last_sample_us }
    }

    pub fn interval_us(&self) -> u32 {
        self.interval_us
    }

    pub fn last_sample_us(&self) -> u32 {
        self.last_sample_us
    }

    pub fn elapsed_us(&self, now_us: u32) -> u32 {
        now_us.wrapping_sub(self.last_sample_us)
    }

    pub fn is_due(&self, now_us: u32) -> bool {
        self.elapsed_us(now_us) >= self.interval_us
    }

    /// Returns `true` and records `now_us` as the last sample time when a
    /// sample is due, otherwise leaves the gate untouched.
    pub fn poll(&mut self, now_us: u32) -> bool {
        if self.is_due(now_us) {
            self.last_sample_us = now_us;
            true
        } else {
            false
        }
    }
}

impl Default for SampleGate {
    fn default() -> Self {
        Self::new(config::SAMPLE_INTERVAL_US)
    }
}

/// Fixed rate sampler writing one text record per sample to `output`.
pub struct Sampler<C: Clock, A: AnalogInput, W: Write> {
    clock: C,
    input: A,
    output: W,
    gate: SampleGate,
    last_value: u16,
}

impl<C: Clock, A: AnalogInput, W: Write> Sampler<C, A, W> {
    pub fn new(clock: C, input: A, output: W) -> Self {
        Self::with_gate(clock, input, output, SampleGate::default())
    }

    pub fn with_gate(clock: C, input: A, output: W, gate: SampleGate) -> Self {
        Self {
            clock,
            input,
            output,
            gate,
            last_value: 0,
        }
    }

    pub fn gate(&self) -> &SampleGate {
        &self.gate
    }

    pub fn last_value(&self) -> u16 {
        self.last_value
    }

    pub async fn run(mut self) {
        info!("Sampler> interval {} us", self.gate.interval_us());
        loop {
            if self.poll_once().await.is_none() {
                yield_now().await;
            }
        }
    }

    /// Checks the gate once and, when due, captures and emits one record.
    ///
    /// The microsecond counter gates the sample, the record carries the
    /// millisecond uptime read after the conversion.
    pub async fn poll_once(&mut self) -> Option<Record> {
        if !self.gate.poll(self.clock.micros()) {
            return None;
        }
        self.last_value = self.input.read().await;
        let record = Record::new(self.clock.millis(), self.last_value);
        trace!("Sampler> {:?}", record);
        self.emit(&record).await;
        Some(record)
    }

    async fn emit(&mut self, record: &Record) {
        let line = match record.encode() {
            Ok(line) => line,
            Err(_e) => {
                error!("Sampler> encoding record failed");
                return;
            }
        };
        if let Err(_e) = self.output.write_all(line.as_bytes()).await {
            warn!("UART.TX> write failed, record dropped");
        }
    }
}
