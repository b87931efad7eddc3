use adc_stream_core::{record::MAX_RAW_VALUE, sampler::AnalogInput};
use embassy_nrf::saadc::Saadc;

/// Single SAADC channel configured for 10-bit conversions.
pub struct SaadcInput<'d> {
    saadc: Saadc<'d, 1>,
}

impl<'d> SaadcInput<'d> {
    pub async fn new(saadc: Saadc<'d, 1>) -> Self {
        saadc.calibrate().await;
        Self { saadc }
    }
}

impl AnalogInput for SaadcInput<'_> {
    async fn read(&mut self) -> u16 {
        let mut buf = [0i16; 1];
        self.saadc.sample(&mut buf).await;
        // single ended conversions can dip slightly below zero
        buf[0].clamp(0, MAX_RAW_VALUE as i16) as u16
    }
}
