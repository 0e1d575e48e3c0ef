#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::Timer;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::i2c::master::I2c;
use esp_hal_embassy::main;
use hardware::{initialize_touchpad, SharedI2c, Snowflake};
use log::{info, warn};
use snowflake_touchpad::Coordinate;
use static_cell::StaticCell;

mod hardware;

esp_bootloader_esp_idf::esp_app_desc!();

/// Interval between two cursor reads in milliseconds
const POLL_INTERVAL_MS: u64 = 20;

static I2C_BUS: StaticCell<SharedI2c> = StaticCell::new();

#[main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();

    // Initialize peripherals
    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::_240MHz));

    let timg0 = esp_hal::timer::timg::TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timg0.timer0);
    info!("Embassy initialized!");

    // Initialize I2C bus
    let i2c = I2c::new(peripherals.I2C0, esp_hal::i2c::master::Config::default())
        .expect("Failed to initialize I2C0")
        .with_sda(peripherals.GPIO3)
        .with_scl(peripherals.GPIO2);
    let i2c_bus = I2C_BUS.init(SharedI2c::new(i2c));

    let touchpad = initialize_touchpad(i2c_bus);

    // TASK: report the cursor
    spawner.spawn(touch_task(touchpad)).ok();
}

#[embassy_executor::task()]
async fn touch_task(mut touchpad: Snowflake) {
    let mut last = Coordinate::CENTER;
    loop {
        match touchpad.position() {
            Ok(position) if position != last => {
                info!("Cursor: ({}, {})", position.x, position.y);
                last = position;
            }
            Ok(_) => {}
            Err(err) => warn!("Touchpad read failed: {err}"),
        }
        Timer::after_millis(POLL_INTERVAL_MS).await
    }
}
