//! Button edge sampling
//!
//! Samples the six inputs at a fixed rate. The idle-to-pressed transition
//! fires once per press; no repeat while held, and no debounce beyond the
//! state memory itself.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};

use vaultbadge_core::input::Button;

use crate::channels::BUTTON_EVENTS;

const SAMPLE_INTERVAL_MS: u64 = 20;

/// Button sampling task. The pin array order matches `Button::ALL`.
#[embassy_executor::task]
pub async fn buttons_task(pins: [Input<'static>; 6]) {
    info!("button task started");

    let mut ticker = Ticker::every(Duration::from_millis(SAMPLE_INTERVAL_MS));
    let mut held: u8 = 0;

    loop {
        ticker.next().await;
        for (i, button) in Button::ALL.into_iter().enumerate() {
            let mask = 1u8 << i;
            if pins[i].is_low() {
                if held & mask == 0 {
                    held |= mask;
                    debug!("button {}", button.name());
                    if BUTTON_EVENTS.try_send(button).is_err() {
                        warn!("button queue full, dropping {}", button.name());
                    }
                }
            } else {
                held &= !mask;
            }
        }
    }
}
