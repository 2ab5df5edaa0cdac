//! DS1307 real-time clock driver
//!
//! Owns both jobs the chip does for the badge: BCD timekeeping in registers
//! 0x00-0x07, and the 56 byte battery-backed RAM window at 0x08-0x3F that
//! backs the secret vault. The RAM window is exposed through the core's
//! `NvramStore` trait with 0-based addresses; the driver adds the base.

use embedded_hal::i2c::{Error as I2cError, ErrorKind, I2c, NoAcknowledgeSource};

use vaultbadge_core::store::{NvramStore, StoreError, REGION_LEN};

/// Seven-bit bus address of the DS1307
pub const DS1307_ADDR: u8 = 0x68;

/// First RAM byte behind the clock registers
const NVRAM_BASE: u8 = 0x08;

const REG_SECONDS: u8 = 0x00;
const REG_MINUTES: u8 = 0x01;
const REG_HOURS: u8 = 0x02;

/// Decoded clock registers
///
/// `pm` is `None` in 24 hour mode, `Some(is_pm)` in 12 hour mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub pm: Option<bool>,
}

fn bcd_to_bin(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0f)
}

fn bin_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// DS1307 over a blocking I2C bus
pub struct Ds1307<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Ds1307<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    fn map_err<E: I2cError>(err: E) -> StoreError {
        match err.kind() {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => StoreError::AddressNak,
            ErrorKind::NoAcknowledge(_) => StoreError::DataNak,
            ErrorKind::Overrun => StoreError::DataTooLong,
            _ => StoreError::Other,
        }
    }

    /// Read raw chip registers starting at `reg`
    pub fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), StoreError> {
        self.i2c
            .write_read(DS1307_ADDR, &[reg], buf)
            .map_err(Self::map_err)
    }

    /// Write raw chip registers starting at `reg`
    pub fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), StoreError> {
        if data.len() > REGION_LEN {
            return Err(StoreError::DataTooLong);
        }
        let mut frame = [0u8; 1 + REGION_LEN];
        frame[0] = reg;
        frame[1..=data.len()].copy_from_slice(data);
        self.i2c
            .write(DS1307_ADDR, &frame[..data.len() + 1])
            .map_err(Self::map_err)
    }

    /// Current time, honoring the chip's 12/24 hour flag
    pub fn read_time(&mut self) -> Result<RtcTime, StoreError> {
        let mut regs = [0u8; 3];
        self.read_registers(REG_SECONDS, &mut regs)?;
        let seconds = bcd_to_bin(regs[0] & 0x7f);
        let minutes = bcd_to_bin(regs[1] & 0x7f);
        let hour_reg = regs[2];
        if hour_reg & 0x40 != 0 {
            Ok(RtcTime {
                hours: bcd_to_bin(hour_reg & 0x3f),
                minutes,
                seconds,
                pm: None,
            })
        } else {
            Ok(RtcTime {
                hours: bcd_to_bin(hour_reg & 0x1f),
                minutes,
                seconds,
                pm: Some(hour_reg & 0x20 != 0),
            })
        }
    }

    /// Set the time. `pm: None` selects 24 hour mode.
    pub fn set_time(
        &mut self,
        hours: u8,
        minutes: u8,
        seconds: u8,
        pm: Option<bool>,
    ) -> Result<(), StoreError> {
        let mut hour_reg = bin_to_bcd(hours);
        match pm {
            None => hour_reg |= 0x40,
            Some(true) => hour_reg |= 0x20,
            Some(false) => {}
        }
        self.write_registers(REG_HOURS, &[hour_reg])?;
        self.write_registers(REG_MINUTES, &[bin_to_bcd(minutes)])?;
        self.write_registers(REG_SECONDS, &[bin_to_bcd(seconds)])
    }

    /// Restart the oscillator by clearing the clock-halt bit. Resets the
    /// seconds register in the process.
    pub fn start(&mut self) -> Result<(), StoreError> {
        self.write_registers(REG_SECONDS, &[0x44])
    }
}

impl<I2C: I2c> NvramStore for Ds1307<I2C> {
    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<usize, StoreError> {
        if addr as usize + buf.len() > REGION_LEN {
            return Err(StoreError::DataTooLong);
        }
        self.read_registers(NVRAM_BASE + addr, buf)?;
        Ok(buf.len())
    }

    fn write(&mut self, addr: u8, data: &[u8]) -> Result<(), StoreError> {
        if addr as usize + data.len() > REGION_LEN {
            return Err(StoreError::DataTooLong);
        }
        self.write_registers(NVRAM_BASE + addr, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, Operation};

    /// Register-file fake standing in for the chip
    struct FakeBus {
        regs: [u8; 64],
        pointer: u8,
    }

    impl FakeBus {
        fn new() -> Self {
            Self {
                regs: [0; 64],
                pointer: 0,
            }
        }
    }

    impl ErrorType for FakeBus {
        type Error = core::convert::Infallible;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        if let Some((&reg, data)) = bytes.split_first() {
                            self.pointer = reg;
                            for (i, &b) in data.iter().enumerate() {
                                self.regs[self.pointer as usize + i] = b;
                            }
                        }
                    }
                    Operation::Read(buf) => {
                        for (i, slot) in buf.iter_mut().enumerate() {
                            *slot = self.regs[self.pointer as usize + i];
                        }
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_bcd_roundtrip() {
        for value in 0..60u8 {
            assert_eq!(bcd_to_bin(bin_to_bcd(value)), value);
        }
        assert_eq!(bin_to_bcd(59), 0x59);
        assert_eq!(bcd_to_bin(0x42), 42);
    }

    #[test]
    fn test_nvram_window_is_offset_past_the_clock() {
        let mut rtc = Ds1307::new(FakeBus::new());
        rtc.write(0, &[0xaa, 0xbb]).unwrap();
        assert_eq!(rtc.i2c.regs[8], 0xaa);
        assert_eq!(rtc.i2c.regs[9], 0xbb);

        let mut buf = [0u8; 2];
        assert_eq!(rtc.read(0, &mut buf).unwrap(), 2);
        assert_eq!(buf, [0xaa, 0xbb]);
    }

    #[test]
    fn test_nvram_bounds_checked() {
        let mut rtc = Ds1307::new(FakeBus::new());
        let mut buf = [0u8; 2];
        assert_eq!(rtc.read(55, &mut buf), Err(StoreError::DataTooLong));
        assert_eq!(rtc.write(55, &[0, 0]), Err(StoreError::DataTooLong));
        // The last byte of the region is still reachable
        assert!(rtc.write(55, &[0x5a]).is_ok());
        assert_eq!(rtc.i2c.regs[63], 0x5a);
    }

    #[test]
    fn test_time_decode_24h() {
        let mut rtc = Ds1307::new(FakeBus::new());
        rtc.i2c.regs[0] = 0x30;
        rtc.i2c.regs[1] = 0x59;
        rtc.i2c.regs[2] = 0x40 | 0x23;
        let time = rtc.read_time().unwrap();
        assert_eq!(
            time,
            RtcTime {
                hours: 23,
                minutes: 59,
                seconds: 30,
                pm: None
            }
        );
    }

    #[test]
    fn test_time_decode_12h_pm() {
        let mut rtc = Ds1307::new(FakeBus::new());
        rtc.i2c.regs[2] = 0x20 | 0x07;
        let time = rtc.read_time().unwrap();
        assert_eq!(time.hours, 7);
        assert_eq!(time.pm, Some(true));
    }

    #[test]
    fn test_set_time_encodes_mode_flags() {
        let mut rtc = Ds1307::new(FakeBus::new());
        rtc.set_time(14, 30, 5, None).unwrap();
        assert_eq!(rtc.i2c.regs[2], 0x40 | 0x14);
        assert_eq!(rtc.i2c.regs[1], 0x30);
        assert_eq!(rtc.i2c.regs[0], 0x05);

        rtc.set_time(7, 0, 0, Some(true)).unwrap();
        assert_eq!(rtc.i2c.regs[2], 0x20 | 0x07);
    }

    #[test]
    fn test_start_kicks_the_oscillator() {
        let mut rtc = Ds1307::new(FakeBus::new());
        rtc.i2c.regs[0] = 0x80;
        rtc.start().unwrap();
        assert_eq!(rtc.i2c.regs[0] & 0x80, 0);
    }
}
