//! Vaultbadge - badge-style hardware puzzle firmware
//!
//! Main firmware binary for RP2040-based badges: six buttons, a 128x64
//! OLED, two status LEDs, a DS1307 RTC whose battery-backed RAM holds the
//! puzzle secrets, and a line-based shell on UART0. Players work through
//! four challenge tiers to extract the flags.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::Instant;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use vaultbadge_core::device::Badge;
use vaultbadge_drivers::{Ds1307, StatusLeds};

use crate::display::Renderer;

mod channels;
mod display;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("vaultbadge firmware starting...");

    let p = embassy_rp::init(Default::default());

    // DS1307 on I2C0 (GP4 SDA / GP5 SCL). The chip tops out at 100 kHz.
    let rtc_i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c::Config::default());
    let mut rtc = Ds1307::new(rtc_i2c);

    // OLED on I2C1 (GP2 SDA / GP3 SCL)
    let mut oled_config = i2c::Config::default();
    oled_config.frequency = 400_000;
    let oled_i2c = I2c::new_blocking(p.I2C1, p.PIN_3, p.PIN_2, oled_config);
    let interface = I2CDisplayInterface::new(oled_i2c);
    let oled = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate180)
        .into_buffered_graphics_mode();
    let renderer = Renderer::new(oled);

    info!("buses initialized");

    // Buttons, in Button::ALL order: up, down, left, right, A, B
    let buttons = [
        Input::new(p.PIN_10, Pull::Up),
        Input::new(p.PIN_11, Pull::Up),
        Input::new(p.PIN_12, Pull::Up),
        Input::new(p.PIN_13, Pull::Up),
        Input::new(p.PIN_14, Pull::Up),
        Input::new(p.PIN_15, Pull::Up),
    ];

    let leds = StatusLeds::new(
        Output::new(p.PIN_16, Level::Low),
        Output::new(p.PIN_17, Level::Low),
    );

    // Shell UART
    let uart_config = UartConfig::default();
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("shell UART initialized");

    // Seed the minigame RNG from what little entropy the board has at hand
    let seconds = rtc.read_time().map(|t| u64::from(t.seconds)).unwrap_or(0);
    let seed = (seconds << 32) | Instant::now().as_ticks();

    let (badge, boot_error) = Badge::boot(rtc, seed);
    if let Some(e) = boot_error {
        warn!("error reading challenge mode at boot: {:?}", e);
    }
    info!(
        "challenge tier {} loaded, vault locked",
        badge.challenge_mode().as_u8()
    );

    spawner.spawn(tasks::buttons_task(buttons)).unwrap();
    spawner
        .spawn(tasks::controller_task(badge, renderer, leds))
        .unwrap();
    spawner.spawn(tasks::shell_task(rx)).unwrap();
    spawner.spawn(tasks::console_task(tx)).unwrap();

    info!("all tasks spawned, badge running");

    // All work happens in the spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("main loop heartbeat");
    }
}
