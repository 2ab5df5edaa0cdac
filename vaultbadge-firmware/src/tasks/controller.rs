//! Main controller task
//!
//! Single owner of the badge state. Selects over button edges, shell
//! requests, and the periodic tick, then renders the active display mode.
//! The brute-force throttle window lives here: while it is open, button
//! input is swallowed and shell unlock attempts are refused.

use core::fmt::Write as _;

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_rp::gpio::Output;
use embassy_rp::i2c::{Blocking, I2c};
use embassy_time::{Duration, Instant, Ticker};

use vaultbadge_core::challenge::{AdvanceOutcome, UnlockOutcome};
use vaultbadge_core::device::{Badge, ButtonFeedback, SessionSummary};
use vaultbadge_core::input::Button;
use vaultbadge_core::modes::BadgeMode;
use vaultbadge_core::snake::CrashCause;
use vaultbadge_drivers::leds::FLASH_TICKS;
use vaultbadge_drivers::{Ds1307, StatusLeds};

#[cfg(feature = "debug-shell")]
use vaultbadge_core::device::FlagRefusal;

use crate::channels::{
    ConsoleLine, Reply, Request, BUTTON_EVENTS, CONSOLE, SHELL_REPLIES, SHELL_REQUESTS,
};
use crate::display::Renderer;
use crate::tasks::console::say;

/// Controller tick interval
pub const TICK_INTERVAL_MS: u64 = 50;

/// Ticks the game-over screen stays up
const GAME_OVER_TICKS: u8 = 100;

/// Short green blip when an apple appears
const APPLE_BLIP_TICKS: u8 = 2;

// Beating the high score earns its own flag. Redacted in the shared
// source; workshop builds carry a sample value.
#[cfg(feature = "demo")]
const SNAKE_REWARD_FLAG: &str = "sn4ke-ch4rm";
#[cfg(not(feature = "demo"))]
const SNAKE_REWARD_FLAG: &str = "********";

pub type Rtc = Ds1307<I2c<'static, Blocking>>;
pub type Leds = StatusLeds<Output<'static>>;

/// An open brute-force cool-down window
struct Throttle {
    until: Instant,
    countdown: bool,
}

impl Throttle {
    fn open(secs: u8, countdown: bool) -> Self {
        Self {
            until: Instant::now() + Duration::from_secs(u64::from(secs)),
            countdown,
        }
    }

    fn secs_left(&self) -> u8 {
        let now = Instant::now();
        if now >= self.until {
            0
        } else {
            ((self.until - now).as_millis() / 1000 + 1) as u8
        }
    }
}

#[embassy_executor::task]
pub async fn controller_task(badge: Badge<Rtc>, renderer: Renderer, leds: Leds) {
    info!("controller task started");

    let mut badge = badge;
    let mut renderer = renderer;
    let mut leds = leds;
    renderer.init();

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));
    let mut throttle: Option<Throttle> = None;
    let mut game_over: Option<(SessionSummary, u8)> = None;

    loop {
        match select3(
            BUTTON_EVENTS.receive(),
            SHELL_REQUESTS.receive(),
            ticker.next(),
        )
        .await
        {
            Either3::First(button) => {
                // The cool-down window and the game-over screen both
                // swallow button input
                if throttle_open(&mut throttle) || game_over.is_some() {
                    debug!("input ignored during wait window");
                } else {
                    let feedback = badge.handle_button(button);
                    apply_button_feedback(&mut badge, &mut leds, &mut throttle, button, feedback);
                }
            }
            Either3::Second(request) => {
                let reply = handle_request(&mut badge, &mut throttle, request);
                SHELL_REPLIES.send(reply).await;
            }
            Either3::Third(_) => {
                leds.tick();
                if let Some((_, ticks_left)) = &mut game_over {
                    *ticks_left = ticks_left.saturating_sub(1);
                    if *ticks_left == 0 {
                        game_over = None;
                    }
                } else {
                    let effects = badge.tick();
                    if effects.apple_spawned {
                        leds.flash_green(APPLE_BLIP_TICKS);
                    }
                    if effects.relocked {
                        debug!("lock screen engaged the lock");
                    }
                    if let Some(summary) = effects.session_end {
                        report_session(&summary);
                        if summary.cause == CrashCause::AppleOverflow {
                            leds.flash_red(FLASH_TICKS);
                        }
                        game_over = Some((summary, GAME_OVER_TICKS));
                    }
                }
            }
        }

        render(&mut badge, &mut renderer, &throttle, &game_over);
        forward_traffic(&mut badge);
    }
}

/// True while the cool-down window is open; clears it once elapsed
fn throttle_open(throttle: &mut Option<Throttle>) -> bool {
    match throttle {
        Some(t) if Instant::now() < t.until => true,
        Some(_) => {
            *throttle = None;
            false
        }
        None => false,
    }
}

fn apply_button_feedback(
    badge: &mut Badge<Rtc>,
    leds: &mut Leds,
    throttle: &mut Option<Throttle>,
    button: Button,
    feedback: ButtonFeedback,
) {
    match feedback {
        ButtonFeedback::None => debug!("{} ignored in this mode", button.name()),
        ButtonFeedback::ModeChanged(mode) => {
            info!("mode -> {}", mode.name());
            say(format_args!("New mode = {}", mode.name()));
        }
        ButtonFeedback::GuessEdited => {
            debug!("pin guess = {}", badge.guess().value());
        }
        ButtonFeedback::Unlock(outcome) => {
            unlock_feedback(leds, throttle, badge.guess().value(), outcome);
        }
        ButtonFeedback::UnlockReadFailed(outcome) => {
            say(format_args!("Error reading the pin code"));
            unlock_feedback(leds, throttle, badge.guess().value(), outcome);
        }
        ButtonFeedback::Steered => debug!("snake steered {}", button.name()),
        ButtonFeedback::SnakeRestarted => info!("snake restarted by player"),
        ButtonFeedback::BannerReplay => debug!("banner replay"),
    }
}

fn unlock_feedback(
    leds: &mut Leds,
    throttle: &mut Option<Throttle>,
    submitted: u32,
    outcome: UnlockOutcome,
) {
    match outcome {
        UnlockOutcome::Accepted => {
            info!("pin accepted");
            leds.flash_green(FLASH_TICKS);
            say(format_args!("PIN ACCEPTED!"));
        }
        UnlockOutcome::Rejected {
            throttle_secs,
            countdown,
        } => {
            info!("pin rejected");
            leds.flash_red(FLASH_TICKS);
            say(format_args!("PIN {} INVALID", submitted));
            if let Some(secs) = throttle_secs {
                *throttle = Some(Throttle::open(secs, countdown));
            }
        }
    }
}

fn handle_request(
    badge: &mut Badge<Rtc>,
    throttle: &mut Option<Throttle>,
    request: Request,
) -> Reply {
    match request {
        Request::Version => {
            let mode = badge.challenge_mode();
            Reply::Version {
                mode: mode.as_u8(),
                desc: mode.description(),
            }
        }
        Request::Lock => {
            info!("locked via shell");
            badge.lock();
            Reply::Ack
        }
        Request::Unlock { pin } => {
            if let Some(t) = throttle.as_ref() {
                let secs_left = t.secs_left();
                if secs_left > 0 {
                    return Reply::Throttled { secs_left };
                }
            }
            *throttle = None;
            match badge.try_unlock(pin) {
                Ok(UnlockOutcome::Accepted) => {
                    info!("pin accepted via shell");
                    Reply::Unlock {
                        accepted: true,
                        throttle_secs: None,
                        read_failed: false,
                    }
                }
                Ok(UnlockOutcome::Rejected {
                    throttle_secs,
                    countdown,
                }) => {
                    if let Some(secs) = throttle_secs {
                        *throttle = Some(Throttle::open(secs, countdown));
                    }
                    Reply::Unlock {
                        accepted: false,
                        throttle_secs,
                        read_failed: false,
                    }
                }
                Err(e) => {
                    warn!("stored pin unreadable: {:?}", e);
                    let mode = badge.challenge_mode();
                    let throttle_secs = mode.throttle_secs();
                    if let Some(secs) = throttle_secs {
                        *throttle = Some(Throttle::open(secs, mode.shows_countdown()));
                    }
                    Reply::Unlock {
                        accepted: false,
                        throttle_secs,
                        read_failed: true,
                    }
                }
            }
        }
        Request::AdvanceQuery => Reply::CanAdvance(badge.mode() != BadgeMode::Flag),
        Request::AdvanceConfirmed => match badge.advance_challenge(true) {
            AdvanceOutcome::Advanced {
                mode,
                persist_error,
            } => {
                info!("challenge advanced to {}", mode.as_u8());
                if let Some(e) = persist_error {
                    warn!("challenge mode not persisted: {:?}", e);
                }
                Reply::Advanced {
                    mode: mode.as_u8(),
                    desc: mode.description(),
                    persist_failed: persist_error.is_some(),
                }
            }
            AdvanceOutcome::OnFlagScreen => Reply::CanAdvance(false),
            AdvanceOutcome::NotConfirmed => Reply::Ack,
        },
        Request::GetFlag => Reply::Flag(badge.current_flag()),
        Request::RtcRegister { reg } => {
            let mut buf = [0u8; 1];
            match badge.vault_mut().store_mut().read_registers(reg, &mut buf) {
                Ok(()) => Reply::RtcByte(Some(buf[0])),
                Err(e) => {
                    warn!("rtc register {} read failed: {:?}", reg, e);
                    Reply::RtcByte(None)
                }
            }
        }
        Request::RtcStart => match badge.vault_mut().store_mut().start() {
            Ok(()) => Reply::Ack,
            Err(e) => {
                warn!("rtc start failed: {:?}", e);
                Reply::StoreFailed
            }
        },
        Request::RtcSetTime {
            hours,
            minutes,
            seconds,
            pm,
        } => match badge
            .vault_mut()
            .store_mut()
            .set_time(hours, minutes, seconds, pm)
        {
            Ok(()) => Reply::Ack,
            Err(e) => {
                warn!("rtc set time failed: {:?}", e);
                Reply::StoreFailed
            }
        },
        #[cfg(feature = "debug-shell")]
        Request::DebugFlag { slot } => Reply::Flag(
            badge
                .vault_mut()
                .read_flag(slot)
                .map_err(FlagRefusal::Vault),
        ),
        #[cfg(feature = "debug-shell")]
        Request::SetFlag { slot, text } => match badge.vault_mut().write_flag(slot, &text) {
            Ok(()) => Reply::Ack,
            Err(_) => Reply::StoreFailed,
        },
        #[cfg(feature = "debug-shell")]
        Request::SetPin { slot, value } => match badge.vault_mut().write_pin(slot, value) {
            Ok(()) => Reply::Ack,
            Err(_) => Reply::StoreFailed,
        },
        #[cfg(feature = "debug-shell")]
        Request::GetHighScore => Reply::HighScore(badge.vault_mut().read_high_score().ok()),
        #[cfg(feature = "debug-shell")]
        Request::SetHighScore { value } => match badge.vault_mut().write_high_score(value) {
            Ok(()) => Reply::Ack,
            Err(_) => Reply::StoreFailed,
        },
    }
}

fn report_session(summary: &SessionSummary) {
    info!(
        "snake session over: score {} best {}",
        summary.score, summary.best
    );
    if summary.cause == CrashCause::AppleOverflow {
        say(format_args!("Too many apples!"));
    }
    if summary.new_best {
        say(format_args!("New High Score"));
        say(format_args!("vault{{{}}}", SNAKE_REWARD_FLAG));
    }
}

/// Render whatever currently owns the screen: the throttle countdown, the
/// game-over card, the mode banner, or the active mode body.
fn render(
    badge: &mut Badge<Rtc>,
    renderer: &mut Renderer,
    throttle: &Option<Throttle>,
    game_over: &Option<(SessionSummary, u8)>,
) {
    if let Some(t) = throttle {
        if t.countdown {
            let secs_left = t.secs_left();
            if secs_left > 0 {
                renderer.countdown(secs_left);
                return;
            }
        }
    }
    if let Some((summary, _)) = game_over {
        renderer.game_over(summary);
        return;
    }
    if badge.banner_active() {
        renderer.banner(badge.mode().name());
        return;
    }
    match badge.mode() {
        BadgeMode::Clock => match badge.vault_mut().store_mut().read_time() {
            Ok(time) => renderer.clock(&time),
            Err(e) => {
                warn!("clock read failed: {:?}", e);
                say(format_args!("Error reading the time"));
            }
        },
        BadgeMode::Unlock => renderer.unlock(badge.guess()),
        BadgeMode::Version => renderer.version(badge.challenge_mode()),
        BadgeMode::Flag => match badge.current_flag() {
            Ok(flag) => renderer.flag(&flag),
            Err(_) => renderer.flag_error(),
        },
        BadgeMode::Lock => renderer.locked_screen(),
        BadgeMode::Snake => renderer.snake(badge.snake()),
    }
}

/// Echo tapped store reads to the operator channel (tier-0 leak)
fn forward_traffic(badge: &mut Badge<Rtc>) {
    for t in badge.vault_mut().take_traffic() {
        let mut line = ConsoleLine::new();
        let _ = write!(&mut line, "Read {}: ", t.addr);
        for b in &t.data {
            let _ = write!(&mut line, "{:02x}", b);
        }
        let _ = line.push_str("\r\n");
        let _ = CONSOLE.try_send(line);
    }
}
