//! OLED output

use embassy_rp::i2c::{Blocking, I2c};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::Ssd1306;

pub mod renderer;

pub use renderer::Renderer;

/// The badge's 128x64 I2C OLED in buffered graphics mode. The board has the
/// screen installed upside down, so everything renders rotated 180 degrees.
pub type Oled = Ssd1306<
    I2CInterface<I2c<'static, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;
