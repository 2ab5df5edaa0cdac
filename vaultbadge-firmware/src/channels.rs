//! Inter-task communication channels
//!
//! Static embassy-sync channels connecting the button sampler, the serial
//! shell, and the controller, plus the request/reply types the shell
//! exchanges with the controller.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;

use vaultbadge_core::device::FlagRefusal;
use vaultbadge_core::input::Button;
use vaultbadge_core::vault::FlagText;

/// Longest chunk of operator console text sent at once
pub const CONSOLE_LINE_LEN: usize = 64;

/// One chunk of console output, sent verbatim (line endings included)
pub type ConsoleLine = String<CONSOLE_LINE_LEN>;

const BUTTON_CHANNEL_SIZE: usize = 8;
const CONSOLE_CHANNEL_SIZE: usize = 16;

/// Button edges from the sampling task
pub static BUTTON_EVENTS: Channel<CriticalSectionRawMutex, Button, BUTTON_CHANNEL_SIZE> =
    Channel::new();

/// Shell requests into the controller
pub static SHELL_REQUESTS: Channel<CriticalSectionRawMutex, Request, 1> = Channel::new();

/// Controller replies back to the shell
pub static SHELL_REPLIES: Channel<CriticalSectionRawMutex, Reply, 1> = Channel::new();

/// Operator console output for the transmit task
pub static CONSOLE: Channel<CriticalSectionRawMutex, ConsoleLine, CONSOLE_CHANNEL_SIZE> =
    Channel::new();

/// Shell commands that need device state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Version,
    Lock,
    Unlock {
        pin: u32,
    },
    AdvanceQuery,
    AdvanceConfirmed,
    GetFlag,
    RtcRegister {
        reg: u8,
    },
    RtcStart,
    RtcSetTime {
        hours: u8,
        minutes: u8,
        seconds: u8,
        pm: Option<bool>,
    },
    #[cfg(feature = "debug-shell")]
    DebugFlag {
        slot: u8,
    },
    #[cfg(feature = "debug-shell")]
    SetFlag {
        slot: u8,
        text: FlagText,
    },
    #[cfg(feature = "debug-shell")]
    SetPin {
        slot: u8,
        value: u32,
    },
    #[cfg(feature = "debug-shell")]
    GetHighScore,
    #[cfg(feature = "debug-shell")]
    SetHighScore {
        value: u16,
    },
}

/// Controller answers to shell requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Version {
        mode: u8,
        desc: &'static str,
    },
    Ack,
    StoreFailed,
    Unlock {
        accepted: bool,
        throttle_secs: Option<u8>,
        read_failed: bool,
    },
    Throttled {
        secs_left: u8,
    },
    CanAdvance(bool),
    Advanced {
        mode: u8,
        desc: &'static str,
        persist_failed: bool,
    },
    Flag(Result<FlagText, FlagRefusal>),
    RtcByte(Option<u8>),
    #[cfg(feature = "debug-shell")]
    HighScore(Option<u16>),
}
