//! The first generation of the settings store, kept for boards whose linker script only
//! reserves a single sector.
//!
//! The sector is used as a forward log: every write appends one page and the newest matching
//! page wins on boot. Once the sector is full it is erased before the next write, which loses
//! the only copy if power fails between the erase and the program. [`crate::SectorStore`] does
//! not have that window.

use crate::capability::Capabilities;
use crate::error::Error;
use crate::platform::{Platform, erase, is_aligned, program};
use crate::raw::{Page, body_len};
use crate::schedule::{LINEAR_WRITE_INTERVAL_MS, Schedule, Tick};
use crate::settings::Settings;
#[cfg(feature = "defmt")]
use defmt::{debug, trace};

/// A page appended by [`LinearStore::tick`].
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinearWrite {
    pub index: usize,
    /// The sector was full and had to be erased first.
    pub erased: bool,
}

/// Single sector, append only store for one [`Settings`] record.
pub struct LinearStore<T: Platform, const PAGE_SIZE: usize> {
    hal: T,
    base_address: usize,
    sector_size: usize,
    capabilities: Capabilities,
    schedule: Schedule,
    faulted: bool,
    initialized: bool,

    // set after calling self.init
    next_free: usize,
    last_written: Page<PAGE_SIZE>,
}

impl<T: Platform, const PAGE_SIZE: usize> LinearStore<T, PAGE_SIZE> {
    pub fn new(hal: T, base_address: usize, sector_size: usize) -> Result<Self, Error> {
        if !is_aligned(PAGE_SIZE, T::WRITE_SIZE) || !is_aligned(PAGE_SIZE, T::READ_SIZE) {
            return Err(Error::InvalidPageSize);
        }

        if !is_aligned(base_address, T::ERASE_SIZE) {
            return Err(Error::InvalidRegionOffset);
        }

        if !is_aligned(sector_size, T::ERASE_SIZE)
            || !is_aligned(sector_size, PAGE_SIZE)
            || sector_size < PAGE_SIZE
        {
            return Err(Error::InvalidRegionSize);
        }

        match base_address.checked_add(sector_size) {
            Some(end) if end <= hal.capacity() && end <= u32::MAX as usize => {}
            _ => return Err(Error::InvalidRegionSize),
        }

        Ok(Self {
            hal,
            base_address,
            sector_size,
            capabilities: Capabilities::BUILD,
            schedule: Schedule::new(LINEAR_WRITE_INTERVAL_MS),
            faulted: false,
            initialized: false,
            next_free: 0,
            last_written: Page::erased(),
        })
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.schedule.set_interval(interval_ms);
        self
    }

    fn pages(&self) -> usize {
        self.sector_size / PAGE_SIZE
    }

    fn page_address(&self, index: usize) -> usize {
        self.base_address + index * PAGE_SIZE
    }

    /// Loads the newest record of this build into `settings` and returns its page index.
    ///
    /// A record only counts if no foreign page follows it, neither one of a different length
    /// nor one of the same length with another capability mask. The first firmware generation
    /// applied that rule to avoid booting from a record older than a newer, incompatible one.
    pub fn init(&mut self, settings: &mut Settings, now_ms: u64) -> Result<Option<usize>, Error> {
        #[cfg(feature = "defmt")]
        trace!("linear: init");

        self.initialized = false;
        self.faulted = false;

        let mut candidate = None;
        let mut next_free = self.pages();
        let expected_len = body_len(self.capabilities) as u8;

        for index in 0..self.pages() {
            let mut page = Page::<PAGE_SIZE>::erased();
            let address = self.page_address(index);
            if self.hal.read(address as _, page.as_mut_bytes()).is_err() {
                self.faulted = true;
                return Err(Error::FlashError);
            }

            match page.linear_body_len() {
                None => {
                    next_free = index;
                    break;
                }
                Some(len) if len == expected_len => {
                    candidate = page
                        .is_linear_record_of(self.capabilities)
                        .then_some((index, page));
                }
                Some(_) => candidate = None,
            }
        }

        self.next_free = next_free;
        let loaded = match candidate {
            Some((index, page)) => {
                page.load_linear_record(self.capabilities, settings);
                self.last_written = page;
                Some(index)
            }
            None => {
                self.last_written = Page::linear_record(settings, self.capabilities);
                None
            }
        };

        #[cfg(feature = "defmt")]
        debug!("linear: loaded {:?}, next free page {}", loaded, next_free);

        #[cfg(feature = "debug-logs")]
        println!("linear: init: loaded {loaded:?}, next free page {next_free}");

        self.initialized = true;
        self.schedule.arm(now_ms);
        Ok(loaded)
    }

    pub fn tick(&mut self, settings: &Settings, now_ms: u64) -> Result<Tick<LinearWrite>, Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        if self.faulted {
            return Err(Error::FlashError);
        }

        if !self.schedule.poll(now_ms) {
            return Ok(Tick::NotDue);
        }

        let candidate = Page::linear_record(settings, self.capabilities);
        if candidate == self.last_written {
            return Ok(Tick::Unchanged);
        }

        match self.append(&candidate) {
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

    fn append(&mut self, page: &Page<PAGE_SIZE>) -> Result<LinearWrite, Error> {
        let erased = self.next_free == self.pages();
        if erased {
            #[cfg(feature = "defmt")]
            trace!("linear: sector full, erasing");

            let from = self.base_address;
            erase(&mut self.hal, from as _, (from + self.sector_size) as _)
                .map_err(|_| Error::FlashError)?;
            self.next_free = 0;
        }

        let index = self.next_free;
        let address = self.page_address(index);
        program(&mut self.hal, address as _, page.as_bytes())
            .map_err(|_| Error::FlashError)?;
        self.next_free += 1;

        Ok(LinearWrite { index, erased })
    }

    pub fn release(self) -> T {
        self.hal
    }
}
