//! The badge device state
//!
//! One struct owns every mutable piece: the vault handle, the challenge
//! state, the mode navigator, the button-side PIN guess, and the snake
//! session. The firmware's controller task is its single owner; the shell
//! reaches it through that task, so no locking discipline is needed.

use crate::challenge::{AdvanceOutcome, ChallengeMode, ChallengeState, UnlockOutcome};
use crate::input::Button;
use crate::modes::{BadgeMode, ModeNavigator};
use crate::snake::{CrashCause, Direction, SnakeGame};
use crate::store::NvramStore;
use crate::unlock::PinGuess;
use crate::vault::{FlagText, Vault, VaultError};

/// What a button press did, for logging and LED feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonFeedback {
    /// Nothing to report
    None,
    /// Navigated to a new display mode
    ModeChanged(BadgeMode),
    /// The PIN guess changed (digit or cursor)
    GuessEdited,
    /// An unlock attempt ran to completion
    Unlock(UnlockOutcome),
    /// The stored PIN could not be read; the attempt counts as failed
    UnlockReadFailed(UnlockOutcome),
    /// Snake steering input
    Steered,
    /// Snake session restarted by the player
    SnakeRestarted,
    /// Mode banner replay requested
    BannerReplay,
}

/// Summary of a finished snake session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionSummary {
    pub score: u16,
    /// Best score on record after this session
    pub best: u16,
    /// True when this session set (and persisted) a new best
    pub new_best: bool,
    pub cause: CrashCause,
}

/// Side effects of one controller tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickEffects {
    pub apple_spawned: bool,
    pub session_end: Option<SessionSummary>,
    /// The lock display re-engaged the lock and folded navigation back
    pub relocked: bool,
}

/// Why the current flag cannot be disclosed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlagRefusal {
    /// The vault is locked
    Locked,
    /// The vault could not produce the flag
    Vault(VaultError),
}

/// The whole badge: secrets, challenge state, navigation, and the minigame
pub struct Badge<S: NvramStore> {
    vault: Vault<S>,
    challenge: ChallengeState,
    nav: ModeNavigator,
    guess: PinGuess,
    snake: SnakeGame,
}

impl<S: NvramStore> Badge<S> {
    /// Bring the device up: read the stored challenge tier, falling back to
    /// tier 0 when the byte is corrupt or unreadable. The error, if any, is
    /// returned alongside so the caller can report it.
    pub fn boot(store: S, snake_seed: u64) -> (Self, Option<VaultError>) {
        let mut vault = Vault::new(store);
        let (mode, boot_error) = match vault.read_challenge_mode() {
            Ok(mode) => (mode, None),
            Err(e) => (ChallengeMode::BusSpy, Some(e)),
        };
        vault.set_spy(mode.leaks_store_traffic());
        let badge = Self {
            vault,
            challenge: ChallengeState::new(mode),
            nav: ModeNavigator::new(),
            guess: PinGuess::new(),
            snake: SnakeGame::new(snake_seed),
        };
        (badge, boot_error)
    }

    pub fn mode(&self) -> BadgeMode {
        self.nav.mode()
    }

    pub fn banner_active(&self) -> bool {
        self.nav.banner_active()
    }

    pub fn is_locked(&self) -> bool {
        self.challenge.is_locked()
    }

    pub fn challenge_mode(&self) -> ChallengeMode {
        self.challenge.mode()
    }

    pub fn guess(&self) -> &PinGuess {
        &self.guess
    }

    pub fn snake(&self) -> &SnakeGame {
        &self.snake
    }

    /// The vault, for maintenance commands and clock access
    pub fn vault_mut(&mut self) -> &mut Vault<S> {
        &mut self.vault
    }

    /// Route one button edge to the active mode's handler set. During the
    /// banner window every mode falls back to the navigation handlers.
    pub fn handle_button(&mut self, button: Button) -> ButtonFeedback {
        if self.nav.banner_active() {
            return self.handle_navigation(button);
        }
        match self.nav.mode() {
            BadgeMode::Unlock => self.handle_unlock_button(button),
            BadgeMode::Snake => self.handle_snake_button(button),
            _ => self.handle_navigation(button),
        }
    }

    fn handle_navigation(&mut self, button: Button) -> ButtonFeedback {
        let locked = self.challenge.is_locked();
        match button {
            Button::Up => ButtonFeedback::ModeChanged(self.nav.next(locked)),
            Button::Down => ButtonFeedback::ModeChanged(self.nav.previous(locked)),
            _ => ButtonFeedback::None,
        }
    }

    fn handle_unlock_button(&mut self, button: Button) -> ButtonFeedback {
        match button {
            Button::Up => {
                self.guess.increment();
                ButtonFeedback::GuessEdited
            }
            Button::Down => {
                self.guess.decrement();
                ButtonFeedback::GuessEdited
            }
            Button::Left => {
                self.guess.move_left();
                ButtonFeedback::GuessEdited
            }
            Button::Right => {
                self.guess.move_right();
                ButtonFeedback::GuessEdited
            }
            Button::A => {
                self.nav.replay_banner();
                ButtonFeedback::BannerReplay
            }
            Button::B => self.confirm_guess(),
        }
    }

    fn confirm_guess(&mut self) -> ButtonFeedback {
        match self.try_unlock(self.guess.value()) {
            Ok(outcome) => ButtonFeedback::Unlock(outcome),
            Err(_) => {
                // Failed reads still burn the attempt: stay locked and
                // keep the throttle policy for the tier.
                let mode = self.challenge.mode();
                ButtonFeedback::UnlockReadFailed(UnlockOutcome::Rejected {
                    throttle_secs: mode.throttle_secs(),
                    countdown: mode.shows_countdown(),
                })
            }
        }
    }

    fn handle_snake_button(&mut self, button: Button) -> ButtonFeedback {
        match button {
            Button::Up => {
                self.snake.set_direction(Direction::Up);
                ButtonFeedback::Steered
            }
            Button::Down => {
                self.snake.set_direction(Direction::Down);
                ButtonFeedback::Steered
            }
            Button::Left => {
                self.snake.set_direction(Direction::Left);
                ButtonFeedback::Steered
            }
            Button::Right => {
                self.snake.set_direction(Direction::Right);
                ButtonFeedback::Steered
            }
            Button::A => {
                self.nav.replay_banner();
                ButtonFeedback::BannerReplay
            }
            Button::B => {
                self.snake.reset();
                ButtonFeedback::SnakeRestarted
            }
        }
    }

    /// One unlock attempt against the stored PIN for the active tier
    pub fn try_unlock(&mut self, submitted: u32) -> Result<UnlockOutcome, VaultError> {
        let stored = self.vault.read_pin(self.challenge.mode().as_u8())?;
        Ok(self.challenge.attempt_unlock(submitted, stored))
    }

    /// Engage the lock and fold navigation back into the locked subset
    pub fn lock(&mut self) {
        self.challenge.lock();
        self.nav.revalidate(true);
    }

    /// Advance to the next challenge tier. Needs the typed confirmation and
    /// is refused while the flag screen is up. Always re-locks. A failed
    /// persist is reported, but the in-memory tier stays advanced.
    pub fn advance_challenge(&mut self, confirmed: bool) -> AdvanceOutcome {
        if self.nav.mode() == BadgeMode::Flag {
            return AdvanceOutcome::OnFlagScreen;
        }
        if !confirmed {
            return AdvanceOutcome::NotConfirmed;
        }
        let mode = self.challenge.advance();
        self.nav.revalidate(true);
        self.vault.set_spy(mode.leaks_store_traffic());
        let persist_error = self.vault.write_challenge_mode(mode).err();
        AdvanceOutcome::Advanced {
            mode,
            persist_error,
        }
    }

    /// Disclose the active tier's flag, subject to the lock
    pub fn current_flag(&mut self) -> Result<FlagText, FlagRefusal> {
        if self.challenge.is_locked() {
            return Err(FlagRefusal::Locked);
        }
        self.vault
            .read_flag(self.challenge.mode().as_u8())
            .map_err(FlagRefusal::Vault)
    }

    /// Run one controller tick: banner countdown, lock-screen side effect,
    /// snake stepping and high score persistence.
    pub fn tick(&mut self) -> TickEffects {
        let mut effects = TickEffects::default();

        if self.nav.banner_active() {
            self.nav.tick_banner();
            return effects;
        }

        match self.nav.mode() {
            BadgeMode::Lock => {
                // Showing the lock screen engages the lock, which folds
                // navigation straight back into the locked subset.
                self.challenge.lock();
                self.nav.revalidate(true);
                effects.relocked = true;
            }
            BadgeMode::Snake => {
                let outcome = self.snake.tick();
                effects.apple_spawned = outcome.apple_spawned;
                if let Some(cause) = outcome.ended {
                    effects.session_end = Some(self.finish_session(cause));
                }
            }
            _ => {}
        }

        effects
    }

    /// Wrap up a finished session: persist the score if it beats the
    /// stored best, then reinitialize for the next run.
    fn finish_session(&mut self, cause: CrashCause) -> SessionSummary {
        let score = self.snake.score();
        let (mut best, readable) = match self.vault.read_high_score() {
            Ok(best) => (best, true),
            Err(_) => (0, false),
        };
        let mut new_best = false;
        if readable && score > best {
            new_best = self.vault.write_high_score(score).is_ok();
            if new_best {
                best = score;
            }
        }
        self.snake.reset();
        SessionSummary {
            score,
            best,
            new_best,
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::BANNER_TICKS;
    use crate::testing::MemStore;

    const SEED: u64 = 42;

    fn provisioned_store() -> MemStore {
        let mut vault = Vault::new(MemStore::new());
        vault
            .write_challenge_mode(ChallengeMode::SerialGuess)
            .unwrap();
        vault.write_pin(0, 111).unwrap();
        vault.write_pin(1, 4242).unwrap();
        vault.write_pin(2, 333).unwrap();
        vault.write_pin(3, 444).unwrap();
        vault.write_flag(0, "zero").unwrap();
        vault.write_flag(1, "one").unwrap();
        vault.write_flag(2, "two").unwrap();
        vault.write_high_score(10).unwrap();

        let mut store = MemStore::new();
        store.bytes = vault.store_mut().bytes;
        store
    }

    fn badge() -> Badge<MemStore> {
        let (badge, err) = Badge::boot(provisioned_store(), SEED);
        assert!(err.is_none());
        badge
    }

    fn skip_banner(badge: &mut Badge<MemStore>) {
        for _ in 0..BANNER_TICKS {
            badge.tick();
        }
    }

    #[test]
    fn test_boot_reads_tier() {
        let b = badge();
        assert_eq!(b.challenge_mode(), ChallengeMode::SerialGuess);
        assert!(b.is_locked());
        assert_eq!(b.mode(), BadgeMode::Clock);
    }

    #[test]
    fn test_boot_falls_back_on_corrupt_tier() {
        let mut store = provisioned_store();
        store.bytes[0] = 9;
        let (b, err) = Badge::boot(store, SEED);
        assert_eq!(err, Some(VaultError::Corrupt));
        assert_eq!(b.challenge_mode(), ChallengeMode::BusSpy);
        assert!(b.is_locked());
    }

    #[test]
    fn test_serial_unlock_example() {
        // Stored PIN 04242, submitted text "4242"
        let mut b = badge();
        let outcome = b.try_unlock(4242).unwrap();
        assert_eq!(outcome, UnlockOutcome::Accepted);
        assert!(!b.is_locked());
    }

    #[test]
    fn test_unlock_succeeds_iff_pin_matches_per_tier() {
        let pins: [(ChallengeMode, u32); 4] = [
            (ChallengeMode::BusSpy, 111),
            (ChallengeMode::SerialGuess, 4242),
            (ChallengeMode::ButtonGuess, 333),
            (ChallengeMode::Hardened, 444),
        ];
        for (mode, pin) in pins {
            let mut store = provisioned_store();
            store.bytes[0] = mode.as_u8();
            let (mut b, _) = Badge::boot(store, SEED);

            assert!(!b.try_unlock(pin + 1).unwrap().accepted());
            assert!(b.is_locked());

            assert!(b.try_unlock(pin).unwrap().accepted());
            assert!(!b.is_locked());
        }
    }

    #[test]
    fn test_wrong_button_pin_starts_throttle_window() {
        let mut store = provisioned_store();
        store.bytes[0] = ChallengeMode::ButtonGuess.as_u8();
        let (mut b, _) = Badge::boot(store, SEED);

        // Navigate to the unlock screen and confirm the all-zeroes guess
        b.handle_button(Button::Up);
        assert_eq!(b.mode(), BadgeMode::Unlock);
        skip_banner(&mut b);
        let feedback = b.handle_button(Button::B);
        assert_eq!(
            feedback,
            ButtonFeedback::Unlock(UnlockOutcome::Rejected {
                throttle_secs: Some(5),
                countdown: false
            })
        );
        assert!(b.is_locked());
    }

    #[test]
    fn test_flag_disclosure_gated_by_lock_for_all_tiers() {
        let flags = ["zero", "one", "two"];
        for tier in 0..4u8 {
            let mut store = provisioned_store();
            store.bytes[0] = tier;
            let (mut b, _) = Badge::boot(store, SEED);

            assert_eq!(b.current_flag(), Err(FlagRefusal::Locked));

            let pin = match tier {
                0 => 111,
                1 => 4242,
                2 => 333,
                _ => 444,
            };
            b.try_unlock(pin).unwrap();
            let flag = b.current_flag().unwrap();
            if tier < 3 {
                assert_eq!(flag.as_str(), flags[tier as usize]);
            } else {
                // The reserved tier's flag is compiled in
                assert!(!flag.is_empty());
            }
        }
    }

    #[test]
    fn test_advance_requires_confirmation() {
        let mut b = badge();
        assert_eq!(b.advance_challenge(false), AdvanceOutcome::NotConfirmed);
        assert_eq!(b.challenge_mode(), ChallengeMode::SerialGuess);
    }

    #[test]
    fn test_advance_refused_on_flag_screen() {
        let mut b = badge();
        b.try_unlock(4242).unwrap();
        for _ in 0..3 {
            b.handle_button(Button::Up);
        }
        assert_eq!(b.mode(), BadgeMode::Flag);
        assert_eq!(b.advance_challenge(true), AdvanceOutcome::OnFlagScreen);
        assert_eq!(b.challenge_mode(), ChallengeMode::SerialGuess);
    }

    #[test]
    fn test_advance_relocks_increments_and_persists() {
        let mut b = badge();
        b.try_unlock(4242).unwrap();
        assert!(!b.is_locked());

        match b.advance_challenge(true) {
            AdvanceOutcome::Advanced {
                mode,
                persist_error,
            } => {
                assert_eq!(mode, ChallengeMode::ButtonGuess);
                assert!(persist_error.is_none());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(b.is_locked());
        assert_eq!(
            b.vault_mut().read_challenge_mode().unwrap(),
            ChallengeMode::ButtonGuess
        );

        // Wrap 3 -> 0
        b.advance_challenge(true);
        match b.advance_challenge(true) {
            AdvanceOutcome::Advanced { mode, .. } => assert_eq!(mode, ChallengeMode::BusSpy),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_advance_persist_failure_keeps_memory_state() {
        let mut b = badge();
        b.vault_mut().store_mut().fail_writes = true;
        match b.advance_challenge(true) {
            AdvanceOutcome::Advanced {
                mode,
                persist_error,
            } => {
                assert_eq!(mode, ChallengeMode::ButtonGuess);
                assert_eq!(persist_error, Some(VaultError::WriteFailed));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        // The in-memory tier stays advanced even though the save failed
        assert_eq!(b.challenge_mode(), ChallengeMode::ButtonGuess);
    }

    #[test]
    fn test_navigation_cycles_respect_lock() {
        let mut b = badge();
        // Locked: three steps return to the clock
        for expected in [BadgeMode::Unlock, BadgeMode::Version, BadgeMode::Clock] {
            assert_eq!(b.handle_button(Button::Up), ButtonFeedback::ModeChanged(expected));
        }

        b.try_unlock(4242).unwrap();
        // Unlocked: six steps return to the clock
        for expected in [
            BadgeMode::Unlock,
            BadgeMode::Version,
            BadgeMode::Flag,
            BadgeMode::Lock,
            BadgeMode::Snake,
            BadgeMode::Clock,
        ] {
            assert_eq!(b.handle_button(Button::Up), ButtonFeedback::ModeChanged(expected));
        }
    }

    #[test]
    fn test_banner_redirects_mode_inputs_to_navigation() {
        let mut b = badge();
        b.handle_button(Button::Up);
        assert_eq!(b.mode(), BadgeMode::Unlock);
        assert!(b.banner_active());

        // During the banner, Up navigates instead of editing the guess
        assert_eq!(
            b.handle_button(Button::Up),
            ButtonFeedback::ModeChanged(BadgeMode::Version)
        );
        assert_eq!(b.guess().value(), 0);
    }

    #[test]
    fn test_unlock_screen_edits_guess_after_banner() {
        let mut b = badge();
        b.handle_button(Button::Up);
        skip_banner(&mut b);
        assert_eq!(b.mode(), BadgeMode::Unlock);

        assert_eq!(b.handle_button(Button::Up), ButtonFeedback::GuessEdited);
        assert_eq!(b.guess().value(), 10_000);
        b.handle_button(Button::Right);
        b.handle_button(Button::Up);
        assert_eq!(b.guess().value(), 11_000);
    }

    #[test]
    fn test_lock_screen_relocks_and_folds_back() {
        let mut b = badge();
        b.try_unlock(4242).unwrap();
        for _ in 0..4 {
            b.handle_button(Button::Up);
        }
        assert_eq!(b.mode(), BadgeMode::Lock);
        skip_banner(&mut b);

        let effects = b.tick();
        assert!(effects.relocked);
        assert!(b.is_locked());
        // Mode 4 folds to 4 % 3 = 1 inside the locked subset
        assert_eq!(b.mode(), BadgeMode::Unlock);
    }

    #[test]
    fn test_shell_lock_folds_flag_screen_away() {
        let mut b = badge();
        b.try_unlock(4242).unwrap();
        for _ in 0..3 {
            b.handle_button(Button::Up);
        }
        assert_eq!(b.mode(), BadgeMode::Flag);

        b.lock();
        assert!(b.is_locked());
        assert_eq!(b.mode(), BadgeMode::Clock);
    }

    #[test]
    fn test_high_score_persists_only_on_strict_improvement() {
        let mut b = badge();

        // Losing below the stored best leaves it alone
        let summary = b.finish_session(CrashCause::Wall);
        assert_eq!(summary.score, 0);
        assert_eq!(summary.best, 10);
        assert!(!summary.new_best);
        assert_eq!(b.vault_mut().read_high_score().unwrap(), 10);

        // Beating it persists the new value
        b.snake.set_score(12);
        let summary = b.finish_session(CrashCause::SelfHit);
        assert_eq!(summary.score, 12);
        assert!(summary.new_best);
        assert_eq!(b.vault_mut().read_high_score().unwrap(), 12);

        // Replaying the same score never lowers it
        b.snake.set_score(12);
        let summary = b.finish_session(CrashCause::Wall);
        assert_eq!(summary.score, 12);
        assert!(!summary.new_best);
        assert_eq!(b.vault_mut().read_high_score().unwrap(), 12);
    }

    #[test]
    fn test_tier_zero_taps_unlock_traffic() {
        let mut store = provisioned_store();
        store.bytes[0] = ChallengeMode::BusSpy.as_u8();
        let (mut b, _) = Badge::boot(store, SEED);

        b.try_unlock(0).unwrap();
        let traffic = b.vault_mut().take_traffic();
        assert_eq!(traffic.len(), 1);
        assert_eq!(traffic[0].data.as_slice(), &111u32.to_le_bytes());

        // Other tiers stay quiet
        let mut b2 = badge();
        b2.try_unlock(0).unwrap();
        assert!(b2.vault_mut().take_traffic().is_empty());
    }
}
