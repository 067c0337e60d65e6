#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod capability;
pub mod error;
mod internal;
pub mod linear;
pub mod platform;
mod raw;
mod schedule;
pub mod settings;

pub use capability::{Capabilities, Capability};
pub use internal::{Repair, SectorId};
pub use raw::MAX_RECORD_LEN;
pub use schedule::{LINEAR_WRITE_INTERVAL_MS, SECTOR_WRITE_INTERVAL_MS, Tick};
pub use settings::Settings;

use crate::error::Error;
use crate::internal::Cursor;
use crate::platform::{Platform, is_aligned};
use crate::raw::Page;
use crate::schedule::Schedule;
#[cfg(feature = "defmt")]
use defmt::debug;

/// Where the settings came from during [`SectorStore::init`].
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    /// No sector held a record of this build, the caller's defaults stay in place.
    Defaults,
    /// The record at page `index` of `sector` was loaded.
    Sector { sector: SectorId, index: usize },
}

/// Report of the boot sequence.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Boot {
    pub repair: Repair,
    pub source: Source,
}

/// A single page program performed by [`SectorStore::tick`].
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SectorWrite {
    pub sector: SectorId,
    pub index: usize,
    /// The sector that was erased after the page had been programmed.
    pub erased: Option<SectorId>,
}

/// Two sector, wear leveled store for one [`Settings`] record.
///
/// The store owns two consecutive flash sectors starting at `base_address`. Records are
/// appended page by page alternating between both sectors, and a sector is only erased after
/// the other one absorbed the newest record, so a power loss at any point leaves at least one
/// valid copy behind.
///
/// `PAGE_SIZE` is the program granularity of the flash and has to hold the largest record
/// ([`MAX_RECORD_LEN`]), which is checked at compile time.
pub struct SectorStore<T: Platform, const PAGE_SIZE: usize> {
    pub(crate) hal: T,
    pub(crate) base_address: usize,
    pub(crate) sector_size: usize,
    pub(crate) capabilities: Capabilities,
    pub(crate) schedule: Schedule,
    pub(crate) faulted: bool,
    pub(crate) initialized: bool,

    // set after calling self.init
    pub(crate) cursors: [Cursor; 2],
    pub(crate) last_written: Page<PAGE_SIZE>,
}

impl<T: Platform, const PAGE_SIZE: usize> SectorStore<T, PAGE_SIZE> {
    /// Checks the geometry of the region without touching the flash. The region spans
    /// `2 * sector_size` bytes from `base_address`.
    ///
    /// The capability set defaults to [`Capabilities::BUILD`] and the write interval to
    /// [`SECTOR_WRITE_INTERVAL_MS`].
    pub fn new(hal: T, base_address: usize, sector_size: usize) -> Result<Self, Error> {
        if !is_aligned(PAGE_SIZE, T::WRITE_SIZE) || !is_aligned(PAGE_SIZE, T::READ_SIZE) {
            return Err(Error::InvalidPageSize);
        }

        if !is_aligned(base_address, T::ERASE_SIZE) {
            return Err(Error::InvalidRegionOffset);
        }

        if !is_aligned(sector_size, T::ERASE_SIZE)
            || !is_aligned(sector_size, PAGE_SIZE)
            || sector_size / PAGE_SIZE < 2
        {
            return Err(Error::InvalidRegionSize);
        }

        let end = sector_size
            .checked_mul(2)
            .and_then(|len| base_address.checked_add(len))
            .ok_or(Error::InvalidRegionSize)?;
        if end > hal.capacity() || end > u32::MAX as usize {
            return Err(Error::InvalidRegionSize);
        }

        Ok(Self {
            hal,
            base_address,
            sector_size,
            capabilities: Capabilities::BUILD,
            schedule: Schedule::new(SECTOR_WRITE_INTERVAL_MS),
            faulted: false,
            initialized: false,
            cursors: [None, None],
            last_written: Page::erased(),
        })
    }

    /// Records of other capability sets are treated like erased sectors.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.schedule.set_interval(interval_ms);
        self
    }

    /// Scans both sectors, repairs states left behind by an interrupted erase, and loads the
    /// newest valid record into `settings`. Without a valid record `settings` keep their
    /// values and become the baseline the next ticks compare against.
    ///
    /// Always arms the write deadline at `now_ms + interval`.
    pub fn init(&mut self, settings: &mut Settings, now_ms: u64) -> Result<Boot, Error> {
        self.initialized = false;
        self.faulted = false;

        match self.boot(settings) {
            Ok(boot) => {
                #[cfg(feature = "defmt")]
                debug!("init: {}", boot);

                #[cfg(feature = "debug-logs")]
                println!("store: init: {boot:?}, cursors: {:?}", self.cursors);

                self.initialized = true;
                self.schedule.arm(now_ms);
                Ok(boot)
            }
            Err(Error::FlashError) => {
                self.faulted = true;
                Err(Error::FlashError)
            }
            Err(e) => Err(e),
        }
    }

    /// Persists `settings` if the deadline passed and they differ from the last record.
    pub fn tick(&mut self, settings: &Settings, now_ms: u64) -> Result<Tick<SectorWrite>, Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        if self.faulted {
            return Err(Error::FlashError);
        }

        if !self.schedule.poll(now_ms) {
            return Ok(Tick::NotDue);
        }

        let candidate = Page::sector_record(settings, self.capabilities);
        if candidate == self.last_written {
            return Ok(Tick::Unchanged);
        }

        match self.write_record(&candidate) {
            Ok(write) => {
                self.last_written = candidate;
                Ok(Tick::Written(write))
            }
            Err(e) => {
                self.faulted = true;
                Err(e)
            }
        }
    }

    /// Index of the newest page per sector, `None` for an erased sector.
    pub fn cursors(&self) -> (Option<usize>, Option<usize>) {
        (self.cursors[0], self.cursors[1])
    }

    pub fn pages_per_sector(&self) -> usize {
        self.sector_size / PAGE_SIZE
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Gives the flash driver back, e.g. to hand it to the next owner of the region.
    pub fn release(self) -> T {
        self.hal
    }
}
