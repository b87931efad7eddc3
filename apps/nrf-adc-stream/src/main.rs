#![no_std]
#![no_main]

mod analog;
mod counter;

use adc_stream_core::{clock::CounterClock, config, sampler::Sampler};
use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::join::*;
use embassy_nrf::{
    bind_interrupts,
    buffered_uarte::{self, BufferedUarte},
    gpio::{Level, Output, OutputDrive},
    peripherals, saadc, uarte,
};
use embassy_time::Timer;
use {defmt_rtt as _, panic_probe as _};

use crate::{analog::SaadcInput, counter::TimerCounter};

bind_interrupts!(struct Irqs {
    UARTE0 => buffered_uarte::InterruptHandler<peripherals::UARTE0>;
    SAADC => saadc::InterruptHandler;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    let mut led = Output::new(p.P1_12, Level::Low, OutputDrive::Standard);

    let mut uart_config = uarte::Config::default();
    uart_config.parity = uarte::Parity::EXCLUDED;
    uart_config.baudrate = uarte::Baudrate::BAUD115200;
    let mut tx_buffer = [0u8; 1024];
    let mut rx_buffer = [0u8; 64];
    let uart = BufferedUarte::new(
        p.UARTE0,
        p.TIMER0,
        p.PPI_CH0,
        p.PPI_CH1,
        p.PPI_GROUP0,
        p.P0_08,
        p.P0_06,
        Irqs,
        uart_config,
        &mut rx_buffer,
        &mut tx_buffer,
    );

    // AIN0, ratiometric to VDD like the AVcc reference of a classic AVR board
    let mut saadc_config = saadc::Config::default();
    saadc_config.resolution = saadc::Resolution::_10BIT;
    let mut channel_config = saadc::ChannelConfig::single_ended(p.P0_02);
    channel_config.reference = saadc::Reference::VDD1_4;
    channel_config.gain = saadc::Gain::GAIN1_4;
    let saadc = saadc::Saadc::new(p.SAADC, Irqs, saadc_config, [channel_config]);
    let input = SaadcInput::new(saadc).await;

    // gating needs microsecond resolution, the RTC time driver only has 30.5 us ticks
    let clock = CounterClock::new(TimerCounter::new(p.TIMER1));

    info!("ADC stream started: AIN0 every {} us at 115200 baud", config::SAMPLE_INTERVAL_US);
    let sampler = Sampler::new(clock, input, uart);

    let heartbeat = async {
        loop {
            led.set_high();
            Timer::after_millis(50).await;
            led.set_low();
            Timer::after_millis(950).await;
        }
    };

    join(sampler.run(), heartbeat).await;
}
