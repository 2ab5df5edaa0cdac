//! Shared test doubles

use crate::store::{NvramStore, StoreError, REGION_LEN};

/// In-memory store standing in for the RTC RAM
pub struct MemStore {
    pub bytes: [u8; REGION_LEN],
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub short_reads: bool,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            bytes: [0; REGION_LEN],
            fail_reads: false,
            fail_writes: false,
            short_reads: false,
        }
    }
}

impl NvramStore for MemStore {
    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<usize, StoreError> {
        if self.fail_reads {
            return Err(StoreError::AddressNak);
        }
        let start = addr as usize;
        if start + buf.len() > REGION_LEN {
            return Err(StoreError::DataTooLong);
        }
        if self.short_reads && !buf.is_empty() {
            let n = buf.len() - 1;
            buf[..n].copy_from_slice(&self.bytes[start..start + n]);
            return Ok(n);
        }
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
        Ok(buf.len())
    }

    fn write(&mut self, addr: u8, data: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::DataNak);
        }
        let start = addr as usize;
        if start + data.len() > REGION_LEN {
            return Err(StoreError::DataTooLong);
        }
        self.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}
