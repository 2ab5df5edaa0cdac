//! Operator console output
//!
//! Everything the player sees on the serial link flows through one channel
//! so shell replies and controller notes interleave cleanly. The transmit
//! task drains the channel; `say` never blocks the controller.

use core::fmt::Write as _;

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use crate::channels::{ConsoleLine, CONSOLE};

/// Queue a line without waiting. Congestion drops the line rather than
/// stalling the sender.
pub fn say(args: core::fmt::Arguments<'_>) {
    let mut line = ConsoleLine::new();
    if line.write_fmt(args).is_err() {
        return;
    }
    let _ = line.push_str("\r\n");
    let _ = CONSOLE.try_send(line);
}

/// Console transmit task
#[embassy_executor::task]
pub async fn console_task(tx: BufferedUartTx<'static>) {
    info!("console task started");

    let mut tx = tx;
    loop {
        let chunk = CONSOLE.receive().await;
        if tx.write_all(chunk.as_bytes()).await.is_err() {
            warn!("console write failed");
        }
    }
}
