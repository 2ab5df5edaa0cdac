//! Challenge tier state machine and the unlock protocol
//!
//! Four tiers of increasing difficulty select which PIN/flag pair is active
//! and how the unlock has to be performed. The lock itself is volatile:
//! every power-up starts locked, and only a matching PIN (or an explicit
//! maintenance action) clears it.

use crate::vault::VaultError;

/// Seconds a failed attempt blocks new input at the throttled tiers
pub const THROTTLE_SECS: u8 = 5;

/// Challenge difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChallengeMode {
    /// Tier 0: the PIN can be recovered by watching the store traffic tap
    BusSpy = 0,
    /// Tier 1: serial guessing, unthrottled
    SerialGuess = 1,
    /// Tier 2: button guessing, failed attempts are throttled
    ButtonGuess = 2,
    /// Tier 3: throttled, with an on-screen countdown after a failure
    Hardened = 3,
}

impl ChallengeMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ChallengeMode::BusSpy),
            1 => Some(ChallengeMode::SerialGuess),
            2 => Some(ChallengeMode::ButtonGuess),
            3 => Some(ChallengeMode::Hardened),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Next tier, wrapping back to the first after the last
    pub fn next(self) -> Self {
        match self {
            ChallengeMode::BusSpy => ChallengeMode::SerialGuess,
            ChallengeMode::SerialGuess => ChallengeMode::ButtonGuess,
            ChallengeMode::ButtonGuess => ChallengeMode::Hardened,
            ChallengeMode::Hardened => ChallengeMode::BusSpy,
        }
    }

    /// Human-readable description shown by the version screen and `ver`
    pub fn description(self) -> &'static str {
        match self {
            ChallengeMode::BusSpy => "Flag via serial CLI",
            ChallengeMode::SerialGuess => "Flag via serial pin brute force",
            ChallengeMode::ButtonGuess => "Flag via button brute force",
            ChallengeMode::Hardened => "Flag via hardware monitoring",
        }
    }

    /// Whether store reads should be echoed to the operator channel
    pub fn leaks_store_traffic(self) -> bool {
        matches!(self, ChallengeMode::BusSpy)
    }

    /// Mandatory wait after a failed unlock attempt, if any
    pub fn throttle_secs(self) -> Option<u8> {
        match self {
            ChallengeMode::BusSpy | ChallengeMode::SerialGuess => None,
            ChallengeMode::ButtonGuess | ChallengeMode::Hardened => Some(THROTTLE_SECS),
        }
    }

    /// Whether the throttle renders a visible countdown
    pub fn shows_countdown(self) -> bool {
        matches!(self, ChallengeMode::Hardened)
    }
}

/// Outcome of a single unlock attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnlockOutcome {
    /// PIN matched; the vault is now unlocked
    Accepted,
    /// PIN mismatch. The caller must refuse new attempts for
    /// `throttle_secs` before accepting input again.
    Rejected {
        throttle_secs: Option<u8>,
        countdown: bool,
    },
}

impl UnlockOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, UnlockOutcome::Accepted)
    }
}

/// Outcome of a challenge advancement request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvanceOutcome {
    /// Tier advanced and re-locked. A failed save is reported here; the
    /// in-memory tier is not rolled back in that case.
    Advanced {
        mode: ChallengeMode,
        persist_error: Option<VaultError>,
    },
    /// The confirmation phrase was not given; nothing changed
    NotConfirmed,
    /// Advancement is refused while the flag screen is showing
    OnFlagScreen,
}

/// The persisted difficulty tier plus the volatile lock
#[derive(Debug, Clone, Copy)]
pub struct ChallengeState {
    mode: ChallengeMode,
    locked: bool,
}

impl ChallengeState {
    /// Start locked at the given tier
    pub fn new(mode: ChallengeMode) -> Self {
        Self { mode, locked: true }
    }

    pub fn mode(&self) -> ChallengeMode {
        self.mode
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Engage the lock. Volatile, nothing to persist.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Compare a submitted PIN against the stored one for the active tier
    /// and unlock on a match.
    pub fn attempt_unlock(&mut self, submitted: u32, stored: u16) -> UnlockOutcome {
        if submitted == u32::from(stored) {
            self.locked = false;
            UnlockOutcome::Accepted
        } else {
            UnlockOutcome::Rejected {
                throttle_secs: self.mode.throttle_secs(),
                countdown: self.mode.shows_countdown(),
            }
        }
    }

    /// Step to the next tier and re-engage the lock. Persisting the new
    /// tier is the caller's job (`Badge::advance_challenge`).
    pub fn advance(&mut self) -> ChallengeMode {
        self.mode = self.mode.next();
        self.locked = true;
        self.mode
    }
}
