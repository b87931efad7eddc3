#![no_std]
#![no_main]

use adc_stream_core::reader::RecordReader;
use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::join::*;
use embassy_nrf::{
    bind_interrupts,
    buffered_uarte::{self, BufferedUarte},
    gpio::{Level, Output, OutputDrive},
    peripherals, uarte,
};
use embassy_time::{Instant, Timer};
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    UARTE1 => buffered_uarte::InterruptHandler<peripherals::UARTE1>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    let mut led = Output::new(p.P1_12, Level::Low, OutputDrive::Standard);

    let mut config = uarte::Config::default();
    config.parity = uarte::Parity::EXCLUDED;
    config.baudrate = uarte::Baudrate::BAUD115200;
    let mut tx_buffer = [0u8; 64];
    let mut rx_buffer = [0u8; 4096];
    let uart = BufferedUarte::new(p.UARTE1, p.TIMER1, p.PPI_CH2, p.PPI_CH3, p.PPI_GROUP1, p.P1_10, p.P1_08, Irqs, config, &mut rx_buffer, &mut tx_buffer);

    let blinky = async {
        info!("blinky loop start");
        loop {
            led.set_high();
            Timer::after_millis(250).await;
            led.set_low();
            Timer::after_millis(250).await;
        }
    };

    let monitor = async {
        let mut reader = RecordReader::new(uart);
        let mut count: u32 = 0;
        let mut window_start = Instant::now();
        while let Some(record) = reader.next_record().await {
            count += 1;
            debug!("Record> {}", record);
            if window_start.elapsed().as_secs() >= 1 {
                info!("Record> last {} => {} records/s", record, count);
                count = 0;
                window_start = Instant::now();
            }
        }
        warn!("Record stream ended");
    };
    join(blinky, monitor).await;
}
