use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
};

/// Program granularity of the QSPI flash on the furnace controller.
pub const FLASH_PAGE_SIZE: usize = 256;

/// Erase granularity of the QSPI flash on the furnace controller.
pub const FLASH_SECTOR_SIZE: usize = 4096;

/// Flash image held in memory, behaving like the NOR part it is written to.
pub(crate) struct RamFlash {
    buf: Vec<u8>,
}

impl RamFlash {
    pub(crate) fn erased(len: usize) -> Self {
        Self {
            buf: vec![0xff; len],
        }
    }

    pub(crate) fn from_image(image: &[u8]) -> Self {
        Self {
            buf: image.to_vec(),
        }
    }

    pub(crate) fn into_image(self) -> Vec<u8> {
        self.buf
    }
}

impl ErrorType for RamFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for RamFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(&*self, offset, bytes.len())?;
        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for RamFlash {
    const WRITE_SIZE: usize = FLASH_PAGE_SIZE;

    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(&*self, from, to)?;
        self.buf[from as usize..to as usize].fill(0xff);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(&*self, offset, bytes.len())?;
        let offset = offset as usize;
        for (cell, &value) in self.buf[offset..offset + bytes.len()].iter_mut().zip(bytes) {
            *cell &= value;
        }
        Ok(())
    }
}
