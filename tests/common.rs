#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use furnace_store::Settings;

pub const PAGE_SIZE: usize = 256;
pub const PAGES_PER_SECTOR: usize = 4;
pub const SECTOR_SIZE: usize = PAGE_SIZE * PAGES_PER_SECTOR;
pub const WORD_SIZE: usize = 4;

/// NOR flash model: programming can only clear bits, erasing sets a whole sector to 0xFF.
///
/// Power loss is modeled by `power_loss_after`: once that many programs and erases have been
/// executed, every further program or erase fails without touching the buffer. Reads keep
/// working so the next boot can be simulated on the same instance after `restore_power`.
#[derive(Default)]
pub struct Flash {
    pub buf: Vec<u8>,
    pub power_loss_after: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl Flash {
    pub fn new(sectors: usize) -> Self {
        Self {
            buf: vec![0xffu8; SECTOR_SIZE * sectors],
            power_loss_after: usize::MAX,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Lets the next `count` programs or erases succeed and fails every one after that.
    pub fn lose_power_after(&mut self, count: usize) {
        self.power_loss_after = self.modifications() + count;
    }

    pub fn restore_power(&mut self) {
        self.power_loss_after = usize::MAX;
    }

    pub fn modifications(&self) -> usize {
        self.writes() + self.erases()
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn erases(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Erase { .. }))
            .count()
    }

    /// Erases and programs recorded so far, without the reads.
    pub fn modifications_log(&self) -> Vec<Operation> {
        self.operations
            .iter()
            .filter(|op| !matches!(op, Operation::Read { .. }))
            .cloned()
            .collect()
    }

    pub fn page(&self, sector: usize, index: usize) -> &[u8] {
        let offset = sector * SECTOR_SIZE + index * PAGE_SIZE;
        &self.buf[offset..offset + PAGE_SIZE]
    }

    /// Bypasses the NOR model to fabricate arbitrary flash content.
    pub fn poke(&mut self, sector: usize, index: usize, bytes: &[u8]) {
        let offset = sector * SECTOR_SIZE + index * PAGE_SIZE;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    fn power_lost(&self) -> bool {
        self.modifications() >= self.power_loss_after
    }
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));

        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        println!(
            "    flash: erase: {from:04X} - {to:04X} #{:>2}",
            self.operations.len()
        );

        if self.power_lost() {
            println!("    flash: POWER LOSS");
            return Err(FlashError);
        }

        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        for addr in from..to {
            self.buf[addr as usize] = 0xff;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE as _));

        println!(
            "    flash: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        if self.power_lost() {
            println!("    flash: POWER LOSS");
            return Err(FlashError);
        }
        assert!(!bytes.is_empty());

        let offset = offset as usize;
        // a page may only be programmed once between two erases
        assert!(
            self.buf[offset..offset + bytes.len()]
                .iter()
                .all(|&it| it == 0xff),
            "programming a page that has not been erased: 0x{offset:04X}"
        );

        self.operations.push(Operation::Write {
            offset: offset as u32,
            len: bytes.len(),
        });

        for (i, &val) in bytes.iter().enumerate() {
            // NOR flash can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }
        Ok(())
    }
}

/// A settings value distinct for every `seed`.
pub fn settings(seed: u8) -> Settings {
    Settings {
        log_bits: seed & 0b11,
        pwm_level: seed,
        pwm_ceiling: 50,
        water_pwm: seed.wrapping_mul(3),
        magnetron_pulse_count: seed / 2,
        magnetron_deadline: 1_000_000 + seed as u64,
        pilot_enabled: seed % 2 == 0,
        pilot_des_temp: 100 + seed as i32,
        mapper_enabled: seed % 3 == 0,
        mapper_max_pwm_temp: -(seed as i32),
    }
}
