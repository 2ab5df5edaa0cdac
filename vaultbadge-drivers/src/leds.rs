//! Status LED pair with a shared flash timer
//!
//! Green and red feedback LEDs: green for an accepted PIN or an apple
//! spawn, red for a rejected PIN. One timer clears whichever LED is lit.

use embedded_hal::digital::OutputPin;

/// Default feedback flash length, in controller ticks
pub const FLASH_TICKS: u8 = 20;

pub struct StatusLeds<P> {
    green: P,
    red: P,
    timer: u8,
}

impl<P: OutputPin> StatusLeds<P> {
    pub fn new(green: P, red: P) -> Self {
        Self {
            green,
            red,
            timer: 0,
        }
    }

    /// Light the green LED for the given ticks
    pub fn flash_green(&mut self, ticks: u8) {
        let _ = self.green.set_high();
        let _ = self.red.set_low();
        self.timer = ticks;
    }

    /// Light the red LED for the given ticks
    pub fn flash_red(&mut self, ticks: u8) {
        let _ = self.green.set_low();
        let _ = self.red.set_high();
        self.timer = ticks;
    }

    /// Count the flash timer down, clearing both LEDs when it expires
    pub fn tick(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            if self.timer == 0 {
                let _ = self.green.set_low();
                let _ = self.red.set_low();
            }
        }
    }
}
