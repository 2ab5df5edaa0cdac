//! Device drivers for the vaultbadge puzzle firmware
//!
//! - DS1307 RTC: timekeeping plus the battery-backed RAM window that backs
//!   the secret vault
//! - Status LED pair with a shared flash timer

#![no_std]
#![deny(unsafe_code)]

pub mod ds1307;
pub mod leds;

pub use ds1307::{Ds1307, RtcTime};
pub use leds::StatusLeds;
