//! Display mode navigation
//!
//! Six display modes cycle under the Up/Down buttons. While the vault is
//! locked only the first three are reachable; unlocking opens up the rest.
//! Every change shows the mode name on a short banner, and inputs during
//! the banner window go to the navigation handlers regardless of mode.

/// Ticks the mode-name banner stays up after a change
pub const BANNER_TICKS: u8 = 20;

const LOCKED_MODES: i8 = 3;
const ALL_MODES: i8 = 6;

/// The six display modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BadgeMode {
    Clock,
    Unlock,
    Version,
    Flag,
    Lock,
    Snake,
}

impl BadgeMode {
    fn from_index(index: i8) -> Self {
        match index {
            0 => BadgeMode::Clock,
            1 => BadgeMode::Unlock,
            2 => BadgeMode::Version,
            3 => BadgeMode::Flag,
            4 => BadgeMode::Lock,
            _ => BadgeMode::Snake,
        }
    }

    /// Short name shown on the banner
    pub fn name(self) -> &'static str {
        match self {
            BadgeMode::Clock => "clock",
            BadgeMode::Unlock => "unlock",
            BadgeMode::Version => "version",
            BadgeMode::Flag => "flag",
            BadgeMode::Lock => "lock",
            BadgeMode::Snake => "snake",
        }
    }
}

/// Cycles the display modes, restricted to the locked subset while locked
#[derive(Debug, Clone, Copy)]
pub struct ModeNavigator {
    index: i8,
    banner_ticks: u8,
}

impl ModeNavigator {
    /// Initial state: clock display, no banner
    pub fn new() -> Self {
        Self {
            index: 0,
            banner_ticks: 0,
        }
    }

    pub fn mode(&self) -> BadgeMode {
        BadgeMode::from_index(self.index)
    }

    /// Whether the mode-name banner is still showing
    pub fn banner_active(&self) -> bool {
        self.banner_ticks > 0
    }

    /// Restart the banner without changing mode
    pub fn replay_banner(&mut self) {
        self.banner_ticks = BANNER_TICKS;
    }

    /// Consume one banner tick
    pub fn tick_banner(&mut self) {
        self.banner_ticks = self.banner_ticks.saturating_sub(1);
    }

    fn clamp(&mut self, locked: bool) {
        let count = if locked { LOCKED_MODES } else { ALL_MODES };
        if self.index < 0 {
            self.index = count - 1;
        }
        self.index %= count;
    }

    /// Step to the next mode and start the banner
    pub fn next(&mut self, locked: bool) -> BadgeMode {
        self.index += 1;
        self.clamp(locked);
        self.banner_ticks = BANNER_TICKS;
        self.mode()
    }

    /// Step to the previous mode and start the banner
    pub fn previous(&mut self, locked: bool) -> BadgeMode {
        self.index -= 1;
        self.clamp(locked);
        self.banner_ticks = BANNER_TICKS;
        self.mode()
    }

    /// Re-check reachability after a lock state change. Locking while on a
    /// mode outside the locked subset folds back into it immediately.
    /// Returns true if the mode changed.
    pub fn revalidate(&mut self, locked: bool) -> bool {
        let before = self.index;
        self.clamp(locked);
        if self.index != before {
            self.banner_ticks = BANNER_TICKS;
            true
        } else {
            false
        }
    }
}

impl Default for ModeNavigator {
    fn default() -> Self {
        Self::new()
    }
}
