//! Screen rendering
//!
//! Builds the per-mode screens. The snake grid doubles each cell to a 2x2
//! pixel block inside the 2 pixel arena border; everything else is text.

use core::fmt::Write as _;

use defmt::*;
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment};
use embedded_graphics::text::{Baseline, Text};
use heapless::String;

use vaultbadge_core::challenge::ChallengeMode;
use vaultbadge_core::device::SessionSummary;
use vaultbadge_core::snake::SnakeGame;
use vaultbadge_core::unlock::PinGuess;
use vaultbadge_drivers::RtcTime;

use super::Oled;

/// Draws the badge screens onto the OLED
pub struct Renderer {
    display: Oled,
    alive: bool,
}

impl Renderer {
    pub fn new(display: Oled) -> Self {
        Self {
            display,
            alive: false,
        }
    }

    /// Bring the panel up. On failure the badge keeps running headless;
    /// the shell still works.
    pub fn init(&mut self) {
        match self.display.init() {
            Ok(()) => self.alive = true,
            Err(_) => warn!("display init failed, running headless"),
        }
    }

    fn big(&self) -> MonoTextStyle<'static, BinaryColor> {
        MonoTextStyleBuilder::new()
            .font(&FONT_10X20)
            .text_color(BinaryColor::On)
            .build()
    }

    fn small(&self) -> MonoTextStyle<'static, BinaryColor> {
        MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build()
    }

    fn clear(&mut self) {
        let _ = self.display.clear(BinaryColor::Off);
    }

    fn text_big(&mut self, text: &str, x: i32, y: i32) {
        let style = self.big();
        let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
            .draw(&mut self.display);
    }

    fn text_small(&mut self, text: &str, x: i32, y: i32) {
        let style = self.small();
        let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
            .draw(&mut self.display);
    }

    fn flush(&mut self) {
        if !self.alive {
            return;
        }
        if self.display.flush().is_err() {
            warn!("display flush failed");
        }
    }

    /// Mode-name banner shown right after a mode change
    pub fn banner(&mut self, name: &str) {
        self.clear();
        self.text_big(name, 10, 20);
        self.flush();
    }

    pub fn clock(&mut self, time: &RtcTime) {
        self.clear();
        let mut text: String<12> = String::new();
        let _ = write!(
            &mut text,
            "{:02}:{:02}:{:02}",
            time.hours, time.minutes, time.seconds
        );
        match time.pm {
            None => self.text_big(&text, 14, 25),
            Some(pm) => {
                self.text_big(&text, 14, 12);
                self.text_big(if pm { "PM" } else { "AM" }, 50, 38);
            }
        }
        self.flush();
    }

    /// PIN entry screen: five digits with cursor markers above and below
    pub fn unlock(&mut self, guess: &PinGuess) {
        self.clear();
        let cursor_x = i32::from(guess.cursor()) * 16;
        self.text_big("v", cursor_x, 0);
        self.text_big("^", cursor_x, 40);
        for (i, digit) in guess.digits().iter().enumerate() {
            let mut s: String<1> = String::new();
            let _ = write!(&mut s, "{}", digit);
            self.text_big(&s, i as i32 * 16, 20);
        }
        self.flush();
    }

    pub fn version(&mut self, mode: ChallengeMode) {
        self.clear();
        let mut line: String<10> = String::new();
        let _ = write!(&mut line, "Ver 1.{}", mode.as_u8());
        self.text_big(&line, 0, 8);
        self.text_small(mode.description(), 0, 32);
        self.flush();
    }

    pub fn flag(&mut self, text: &str) {
        self.clear();
        let mut line: String<24> = String::new();
        let _ = write!(&mut line, "vault{{{}}}", text);
        self.text_small(&line, 0, 0);
        self.flush();
    }

    pub fn flag_error(&mut self) {
        self.clear();
        self.text_small("flag data is damaged", 0, 0);
        self.flush();
    }

    pub fn locked_screen(&mut self) {
        self.clear();
        self.text_big("Vault", 0, 10);
        self.text_big("Secured", 0, 34);
        self.flush();
    }

    /// Throttle countdown shown after a failed attempt at the hardest tier
    pub fn countdown(&mut self, secs_left: u8) {
        self.clear();
        self.text_big("WRONG", 30, 10);
        let mut s: String<4> = String::new();
        let _ = write!(&mut s, "{}", secs_left);
        self.text_big(&s, 60, 40);
        self.flush();
    }

    pub fn snake(&mut self, game: &SnakeGame) {
        self.clear();
        let border = PrimitiveStyleBuilder::new()
            .stroke_color(BinaryColor::On)
            .stroke_width(2)
            .stroke_alignment(StrokeAlignment::Inside)
            .build();
        let _ = Rectangle::new(Point::zero(), Size::new(128, 64))
            .into_styled(border)
            .draw(&mut self.display);

        let fill = PrimitiveStyle::with_fill(BinaryColor::On);
        for cell in game.apples().chain(game.body()) {
            let _ = Rectangle::new(
                Point::new(i32::from(cell.x) * 2, i32::from(cell.y) * 2),
                Size::new(2, 2),
            )
            .into_styled(fill)
            .draw(&mut self.display);
        }
        self.flush();
    }

    /// Session wrap-up screen with the final and best scores
    pub fn game_over(&mut self, summary: &SessionSummary) {
        self.clear();
        self.text_small("Game Over", 5, 5);
        let mut s: String<8> = String::new();
        let _ = write!(&mut s, "{}", summary.score);
        self.text_small(&s, 5, 20);

        self.text_small("HighScore", 5, 35);
        let mut s: String<8> = String::new();
        let _ = write!(&mut s, "{}", summary.best);
        self.text_small(&s, 5, 50);
        self.flush();
    }
}
