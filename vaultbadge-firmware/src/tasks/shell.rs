//! Serial command shell
//!
//! Line-based token dispatch over UART0. The shell owns the receive side
//! and both intentional waits: the bounded interactive line read, and the
//! brute-force cool-down after a failed unlock. Commands that touch device
//! state go to the controller as request/reply messages.

use core::fmt::Write as _;

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embassy_time::{with_timeout, Duration};
use embedded_io_async::Read;
use heapless::String;

#[cfg(not(feature = "debug-shell"))]
use embassy_time::Timer;

use vaultbadge_core::device::FlagRefusal;
use vaultbadge_core::vault::VaultError;

#[cfg(feature = "debug-shell")]
use vaultbadge_core::vault::FlagText;

use crate::channels::{ConsoleLine, Reply, Request, CONSOLE, SHELL_REPLIES, SHELL_REQUESTS};

/// Longest command token
const COMMAND_MAX: usize = 8;

/// Seconds to wait for interactive entries
const ENTRY_TIMEOUT_SECS: u64 = 30;
/// The time string gets longer to type
const TIME_ENTRY_TIMEOUT_SECS: u64 = 60;

#[cfg(not(feature = "debug-shell"))]
const COMMANDS: &[&str] = &[
    "help", "secs", "mins", "start", "settim", "nxtchl", "lock", "unlock", "getflg", "ver",
];
#[cfg(feature = "debug-shell")]
const COMMANDS: &[&str] = &[
    "help", "secs", "mins", "start", "settim", "wrflgs", "wrpins", "getflg", "geths", "seths",
    "ver",
];

/// Shell task: byte-at-a-time line editor plus command dispatch
#[embassy_executor::task]
pub async fn shell_task(rx: BufferedUartRx<'static>) {
    info!("shell task started");

    let mut rx = rx;
    let mut line: String<COMMAND_MAX> = String::new();
    loop {
        let byte = read_byte(&mut rx).await;
        echo(byte).await;
        if byte == b'\r' || byte == b'\n' {
            dispatch(&mut rx, line.as_str()).await;
            line.clear();
        } else if line.len() < COMMAND_MAX {
            let _ = line.push(byte as char);
        }
    }
}

async fn dispatch(rx: &mut BufferedUartRx<'static>, token: &str) {
    print(format_args!("Command Receive: {}\r\n", token)).await;
    match token {
        "help" => help().await,
        "ver" => version().await,
        "secs" => rtc_register(0x00, "seconds").await,
        "mins" => rtc_register(0x01, "minutes").await,
        "start" => rtc_start().await,
        "settim" => set_time(rx).await,
        #[cfg(not(feature = "debug-shell"))]
        "lock" => lock().await,
        #[cfg(not(feature = "debug-shell"))]
        "unlock" => unlock(rx).await,
        #[cfg(not(feature = "debug-shell"))]
        "nxtchl" => next_challenge(rx).await,
        #[cfg(not(feature = "debug-shell"))]
        "getflg" => get_flag().await,
        #[cfg(feature = "debug-shell")]
        "getflg" => get_all_flags().await,
        #[cfg(feature = "debug-shell")]
        "wrflgs" => write_flags(rx).await,
        #[cfg(feature = "debug-shell")]
        "wrpins" => write_pins(rx).await,
        #[cfg(feature = "debug-shell")]
        "geths" => get_high_score().await,
        #[cfg(feature = "debug-shell")]
        "seths" => set_high_score(rx).await,
        _ => print(format_args!("No matching handler found for command\r\n")).await,
    }
}

async fn request(req: Request) -> Reply {
    SHELL_REQUESTS.send(req).await;
    SHELL_REPLIES.receive().await
}

async fn print(args: core::fmt::Arguments<'_>) {
    let mut chunk = ConsoleLine::new();
    let _ = chunk.write_fmt(args);
    CONSOLE.send(chunk).await;
}

async fn echo(byte: u8) {
    let mut chunk = ConsoleLine::new();
    if byte == b'\r' || byte == b'\n' {
        let _ = chunk.push_str("\r\n");
    } else {
        let _ = chunk.push(byte as char);
    }
    CONSOLE.send(chunk).await;
}

async fn read_byte(rx: &mut BufferedUartRx<'static>) -> u8 {
    let mut buf = [0u8; 1];
    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => return buf[0],
            Ok(_) => {}
            Err(e) => warn!("uart read error: {:?}", e),
        }
    }
}

/// Read one interactive line of at most `N - 1` characters, echoing as it
/// goes. Returns None if the deadline passes; the in-progress command is
/// abandoned with no state change.
async fn read_line<const N: usize>(
    rx: &mut BufferedUartRx<'static>,
    timeout_secs: u64,
) -> Option<String<N>> {
    match with_timeout(Duration::from_secs(timeout_secs), read_line_inner::<N>(rx)).await {
        Ok(line) => Some(line),
        Err(_) => {
            print(format_args!("\r\nTIMEOUT\r\n")).await;
            None
        }
    }
}

async fn read_line_inner<const N: usize>(rx: &mut BufferedUartRx<'static>) -> String<N> {
    let mut line: String<N> = String::new();
    loop {
        let byte = read_byte(rx).await;
        echo(byte).await;
        if byte == b'\r' || byte == b'\n' {
            return line;
        }
        if line.len() < N - 1 {
            let _ = line.push(byte as char);
        } else {
            // Buffer full; the bounded read stops here
            return line;
        }
    }
}

async fn help() {
    print(format_args!("Command List:\r\n")).await;
    for name in COMMANDS {
        print(format_args!(" {}\r\n", name)).await;
    }
}

async fn version() {
    if let Reply::Version { mode, desc } = request(Request::Version).await {
        print(format_args!("Version: {}\r\n{}\r\n", mode, desc)).await;
    }
}

async fn rtc_register(reg: u8, label: &str) {
    match request(Request::RtcRegister { reg }).await {
        Reply::RtcByte(Some(value)) => {
            print(format_args!("{} register: {:02x}\r\n", label, value)).await;
        }
        _ => print(format_args!("Error reading {} register\r\n", label)).await,
    }
}

async fn rtc_start() {
    match request(Request::RtcStart).await {
        Reply::Ack => print(format_args!("Clock oscillator started\r\n")).await,
        _ => print(format_args!("Error starting clock\r\n")).await,
    }
}

#[cfg(not(feature = "debug-shell"))]
async fn lock() {
    let _ = request(Request::Lock).await;
    print(format_args!("Locking!\r\n")).await;
}

#[cfg(not(feature = "debug-shell"))]
fn parse_pin(entry: &str) -> Option<u32> {
    if entry.is_empty() || entry.len() > 5 {
        return None;
    }
    if !entry.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    entry.parse().ok()
}

#[cfg(not(feature = "debug-shell"))]
async fn unlock(rx: &mut BufferedUartRx<'static>) {
    print(format_args!("Enter the pin (no more than 5 digits)\r\n")).await;
    let Some(entry) = read_line::<8>(rx, ENTRY_TIMEOUT_SECS).await else {
        return;
    };
    let Some(pin) = parse_pin(entry.as_str()) else {
        print(format_args!("Pin code is invalid\r\n")).await;
        return;
    };
    match request(Request::Unlock { pin }).await {
        Reply::Unlock { accepted: true, .. } => {
            print(format_args!("PIN ACCEPTED!\r\n")).await;
        }
        Reply::Unlock {
            accepted: false,
            throttle_secs,
            read_failed,
        } => {
            if read_failed {
                print(format_args!("Error reading the pin code\r\n")).await;
            }
            print(format_args!("PIN {} INVALID\r\n", pin)).await;
            if let Some(secs) = throttle_secs {
                print(format_args!("Brute force guard! Wait {} seconds\r\n", secs)).await;
                Timer::after_secs(u64::from(secs)).await;
                print(format_args!("You can try again now!\r\n")).await;
            }
        }
        Reply::Throttled { secs_left } => {
            print(format_args!(
                "Brute force guard! {} seconds left\r\n",
                secs_left
            ))
            .await;
        }
        _ => {}
    }
}

#[cfg(not(feature = "debug-shell"))]
async fn next_challenge(rx: &mut BufferedUartRx<'static>) {
    if request(Request::AdvanceQuery).await == Reply::CanAdvance(false) {
        print(format_args!("Can't be on flag screen!\r\n")).await;
        return;
    }
    print(format_args!(
        "You really want to goto next challenge?\r\nType yes to confirm\r\n"
    ))
    .await;
    let Some(answer) = read_line::<4>(rx, ENTRY_TIMEOUT_SECS).await else {
        return;
    };
    if answer.as_str() != "yes" {
        return;
    }
    match request(Request::AdvanceConfirmed).await {
        Reply::Advanced {
            mode,
            desc,
            persist_failed,
        } => {
            print(format_args!("Mode changed to {}\r\n{}\r\n", mode, desc)).await;
            if persist_failed {
                print(format_args!("Error saving challenge mode\r\n")).await;
            }
        }
        Reply::CanAdvance(false) => print(format_args!("Can't be on flag screen!\r\n")).await,
        _ => {}
    }
}

async fn print_flag_reply(slot: Option<u8>, reply: Reply) {
    match reply {
        Reply::Flag(Ok(flag)) => match slot {
            Some(slot) => print(format_args!("Flag {}: vault{{{}}}\r\n", slot, flag)).await,
            None => print(format_args!("Flag: vault{{{}}}\r\n", flag)).await,
        },
        Reply::Flag(Err(FlagRefusal::Locked)) => {
            print(format_args!("Must unlock device first!\r\n")).await;
        }
        Reply::Flag(Err(FlagRefusal::Vault(VaultError::Corrupt))) => {
            print(format_args!("Error. Flag data lacks null terminator\r\n")).await;
        }
        _ => print(format_args!("Error reading flag\r\n")).await,
    }
}

#[cfg(not(feature = "debug-shell"))]
async fn get_flag() {
    let reply = request(Request::GetFlag).await;
    print_flag_reply(None, reply).await;
}

async fn set_time(rx: &mut BufferedUartRx<'static>) {
    print(format_args!(
        "Enter the time as HHMMSS, HHMMSSa, or HHMMSSp\r\n"
    ))
    .await;
    let Some(entry) = read_line::<9>(rx, TIME_ENTRY_TIMEOUT_SECS).await else {
        return;
    };
    match parse_time(entry.as_str()) {
        Ok((hours, minutes, seconds, pm)) => {
            match request(Request::RtcSetTime {
                hours,
                minutes,
                seconds,
                pm,
            })
            .await
            {
                Reply::Ack => print(format_args!("Set Time handler complete\r\n")).await,
                _ => print(format_args!("Error writing clock registers\r\n")).await,
            }
        }
        Err(reason) => print(format_args!("{}\r\n", reason)).await,
    }
}

fn parse_time(entry: &str) -> Result<(u8, u8, u8, Option<bool>), &'static str> {
    let b = entry.as_bytes();
    if b.len() != 6 && b.len() != 7 {
        return Err("Time val must be 6/7 chars long");
    }
    if !b[0].is_ascii_digit() || !b[1].is_ascii_digit() || b[0] > b'2' {
        return Err("Invalid HH value");
    }
    if !b[2].is_ascii_digit() || !b[3].is_ascii_digit() || b[2] > b'5' {
        return Err("Invalid MM value");
    }
    if !b[4].is_ascii_digit() || !b[5].is_ascii_digit() || b[4] > b'5' {
        return Err("Invalid SS value");
    }
    let pm = if b.len() == 7 {
        match b[6] {
            b'a' => Some(false),
            b'p' => Some(true),
            _ => return Err("Invalid a/p value"),
        }
    } else {
        None
    };
    let digit = |i: usize| b[i] - b'0';
    Ok((
        digit(0) * 10 + digit(1),
        digit(2) * 10 + digit(3),
        digit(4) * 10 + digit(5),
        pm,
    ))
}

#[cfg(feature = "debug-shell")]
async fn get_all_flags() {
    for slot in 0..4u8 {
        let reply = request(Request::DebugFlag { slot }).await;
        print_flag_reply(Some(slot), reply).await;
    }
}

#[cfg(feature = "debug-shell")]
async fn write_flags(rx: &mut BufferedUartRx<'static>) {
    for slot in 0..3u8 {
        print(format_args!(
            "Give me flag {} to write (11 chars max, no wrapper)\r\n",
            slot
        ))
        .await;
        let Some(entry) = read_line::<12>(rx, ENTRY_TIMEOUT_SECS).await else {
            return;
        };
        let mut text = FlagText::new();
        let _ = text.push_str(entry.as_str());
        match request(Request::SetFlag { slot, text }).await {
            Reply::Ack => {
                print(format_args!("Wrote flag {}: vault{{{}}}\r\n", slot, entry)).await;
            }
            _ => print(format_args!("Error writing flag {}\r\n", slot)).await,
        }
    }
    print(format_args!("Done\r\n")).await;
}

#[cfg(feature = "debug-shell")]
async fn write_pins(rx: &mut BufferedUartRx<'static>) {
    for slot in 0..4u8 {
        print(format_args!("Give me pin {} to write (3-5 digits)\r\n", slot)).await;
        let Some(entry) = read_line::<8>(rx, ENTRY_TIMEOUT_SECS).await else {
            return;
        };
        if entry.len() < 3 || entry.len() > 5 || !entry.bytes().all(|b| b.is_ascii_digit()) {
            print(format_args!("Invalid pin length of {}\r\n", entry.len())).await;
            return;
        }
        let Ok(value) = entry.parse::<u32>() else {
            return;
        };
        match request(Request::SetPin { slot, value }).await {
            Reply::Ack => print(format_args!("Wrote pin #{} as {}\r\n", slot, value)).await,
            _ => print(format_args!("Error saving the pin code\r\n")).await,
        }
    }
}

#[cfg(feature = "debug-shell")]
async fn get_high_score() {
    match request(Request::GetHighScore).await {
        Reply::HighScore(Some(value)) => {
            print(format_args!("Read high score of {} from backup RAM\r\n", value)).await;
        }
        _ => print(format_args!("Error reading high score\r\n")).await,
    }
}

#[cfg(feature = "debug-shell")]
async fn set_high_score(rx: &mut BufferedUartRx<'static>) {
    print(format_args!("Give me a high score to write\r\n")).await;
    let Some(entry) = read_line::<8>(rx, ENTRY_TIMEOUT_SECS).await else {
        return;
    };
    let Ok(value) = entry.parse::<u16>() else {
        print(format_args!("Invalid high score\r\n")).await;
        return;
    };
    match request(Request::SetHighScore { value }).await {
        Reply::Ack => {
            print(format_args!("Wrote high score of {} to backup RAM\r\n", value)).await;
        }
        _ => print(format_args!("Error writing high score\r\n")).await,
    }
}
