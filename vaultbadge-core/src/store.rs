//! Byte-addressable persistent storage abstraction
//!
//! The badge keeps its secrets in the spare RAM of a battery-backed RTC.
//! That channel is slow and occasionally drops transfers, so reads report
//! how many bytes actually moved and the caller must check the count.

/// Size of the logical persistent region in bytes
pub const REGION_LEN: usize = 56;

/// Errors from the persistent store channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Transfer exceeded the channel buffer
    DataTooLong,
    /// No acknowledge on the device address
    AddressNak,
    /// No acknowledge on a data byte
    DataNak,
    /// Unclassified channel error
    Other,
    /// Channel timeout
    Timeout,
}

/// Byte-addressable non-volatile storage
///
/// Addresses are 0-based into the logical region (`REGION_LEN` bytes); the
/// implementation adds whatever base offset the device needs. A successful
/// read may still transfer fewer bytes than requested.
pub trait NvramStore {
    /// Read bytes starting at `addr` into `buf`, returning the count
    /// actually transferred.
    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Write `data` starting at `addr`.
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<(), StoreError>;
}
