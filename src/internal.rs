use crate::error::Error;
use crate::platform::{Platform, erase, program};
use crate::raw::Page;
use crate::settings::Settings;
use crate::{Boot, SectorStore, SectorWrite, Source};
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Index of the newest non-erased page of a sector, `None` if the sector is erased.
pub(crate) type Cursor = Option<usize>;

/// One of the two sectors owned by a [`SectorStore`]. `A` is located at the base address, `B`
/// directly after it.
#[derive(strum::Display, Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SectorId {
    A = 0,
    B = 1,
}

/// What the boot sequence had to erase before the sectors were consistent again.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Repair {
    /// The cursors were in a state the writer produces, nothing was erased.
    None,
    /// Power was lost after `B` received its last page but before `A` was erased.
    ErasedA,
    /// Power was lost after `A` wrapped around to its first page but before `B` was erased.
    ErasedB,
    /// The cursors were in a state the writer never produces, both sectors were wiped.
    WipedBoth,
}

/// Treats an erased sector as sitting at index -1, right before its first page.
fn ordinal(cursor: Cursor) -> isize {
    cursor.map_or(-1, |index| index as isize)
}

/// Decides whether the cursor combination is one the writer leaves behind.
///
/// The writer only ever produces `a == b`, `a == b + 1`, and `(None, last)`. Two more states
/// exist for the duration of an erase and are finished here; everything else is corruption.
pub(crate) fn classify(a: Cursor, b: Cursor, last: usize) -> Repair {
    match (a, b) {
        (Some(a), Some(b)) if a == last && b == last => Repair::ErasedA,
        (Some(0), Some(b)) if b == last => Repair::ErasedB,
        _ if a == b => Repair::None,
        _ if ordinal(a) == ordinal(b) + 1 => Repair::None,
        (None, Some(b)) if b == last => Repair::None,
        _ => Repair::WipedBoth,
    }
}

/// Picks the sector holding the newest record among the valid ones.
///
/// `A` always receives the first write of a round, so with equal cursors `B` is newer and with
/// `A` one page ahead `A` is newer.
pub(crate) fn authoritative(a: Cursor, a_valid: bool, b: Cursor, b_valid: bool) -> Option<SectorId> {
    match (a_valid, b_valid) {
        (false, false) => None,
        (true, false) => Some(SectorId::A),
        (false, true) => Some(SectorId::B),
        (true, true) if a <= b => Some(SectorId::B),
        (true, true) => Some(SectorId::A),
    }
}

/// The page the next record goes to and the sector that has to be erased afterward.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub(crate) struct WritePlan {
    pub(crate) sector: SectorId,
    pub(crate) index: usize,
    pub(crate) erase: Option<SectorId>,
}

/// Strict alternation, `A` leads and `B` follows.
///
/// `B` reaching its last page makes `A` stale, so `A` is erased and restarts at page 0 with
/// the next write. `A` starting over at page 0 makes `B` stale in turn.
pub(crate) fn plan_write(a: Cursor, b: Cursor, pages: usize) -> WritePlan {
    let last = pages - 1;
    if a == b || (a.is_none() && b == Some(last)) {
        let index = a.map_or(0, |index| (index + 1) % pages);
        WritePlan {
            sector: SectorId::A,
            index,
            erase: (index == 0 && b.is_some()).then_some(SectorId::B),
        }
    } else {
        let index = b.map_or(0, |index| (index + 1) % pages);
        WritePlan {
            sector: SectorId::B,
            index,
            erase: (index == last).then_some(SectorId::A),
        }
    }
}

impl<T: Platform, const PAGE_SIZE: usize> SectorStore<T, PAGE_SIZE> {
    pub(crate) fn boot(&mut self, settings: &mut Settings) -> Result<Boot, Error> {
        #[cfg(feature = "defmt")]
        trace!("boot");

        #[cfg(feature = "debug-logs")]
        println!("internal: boot");

        self.cursors = [self.scan_sector(SectorId::A)?, self.scan_sector(SectorId::B)?];
        let repair = self.repair()?;
        let source = self.load(settings)?;

        Ok(Boot { repair, source })
    }

    fn sector_address(&self, sector: SectorId) -> usize {
        self.base_address + sector as usize * self.sector_size
    }

    fn page_address(&self, sector: SectorId, index: usize) -> usize {
        self.sector_address(sector) + index * PAGE_SIZE
    }

    fn read_page(&mut self, sector: SectorId, index: usize) -> Result<Page<PAGE_SIZE>, Error> {
        let mut page = Page::erased();
        let address = self.page_address(sector, index);
        self.hal
            .read(address as _, page.as_mut_bytes())
            .map_err(|_| Error::FlashError)?;
        Ok(page)
    }

    /// Walks the sector from its last page down and stops at the first one that is not erased.
    fn scan_sector(&mut self, sector: SectorId) -> Result<Cursor, Error> {
        #[cfg(feature = "defmt")]
        trace!("scan_sector: {}", sector);

        for index in (0..self.pages_per_sector()).rev() {
            if !self.read_page(sector, index)?.is_erased() {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn erase_sector(&mut self, sector: SectorId) -> Result<(), Error> {
        #[cfg(feature = "debug-logs")]
        println!("  internal: erase_sector {sector}");

        let from = self.sector_address(sector);
        erase(&mut self.hal, from as _, (from + self.sector_size) as _)
            .map_err(|_| Error::FlashError)?;
        self.cursors[sector as usize] = None;
        Ok(())
    }

    fn repair(&mut self) -> Result<Repair, Error> {
        let [a, b] = self.cursors;
        let repair = classify(a, b, self.pages_per_sector() - 1);

        match repair {
            Repair::None => {}
            Repair::ErasedA => {
                #[cfg(feature = "defmt")]
                warn!("repair: finishing interrupted erase of sector A");
                self.erase_sector(SectorId::A)?;
            }
            Repair::ErasedB => {
                #[cfg(feature = "defmt")]
                warn!("repair: finishing interrupted erase of sector B");
                self.erase_sector(SectorId::B)?;
            }
            Repair::WipedBoth => {
                #[cfg(feature = "defmt")]
                warn!("repair: unreachable cursors {:?}/{:?}, wiping both sectors", a, b);

                #[cfg(feature = "debug-logs")]
                println!("internal: repair: unreachable cursors {a:?}/{b:?}");

                self.erase_sector(SectorId::A)?;
                self.erase_sector(SectorId::B)?;
            }
        }

        Ok(repair)
    }

    /// Reads the cursor page of `sector` and returns it if it holds a record of this build.
    fn validate(&mut self, sector: SectorId) -> Result<Option<(usize, Page<PAGE_SIZE>)>, Error> {
        let Some(index) = self.cursors[sector as usize] else {
            return Ok(None);
        };

        let page = self.read_page(sector, index)?;
        if page.is_sector_record_of(self.capabilities) {
            Ok(Some((index, page)))
        } else {
            #[cfg(feature = "defmt")]
            warn!("validate: ignoring foreign record in sector {}[{}]", sector, index);

            #[cfg(feature = "debug-logs")]
            println!("internal: validate: foreign record in {sector}[{index}]: {page:?}");

            Ok(None)
        }
    }

    fn load(&mut self, settings: &mut Settings) -> Result<Source, Error> {
        let [a, b] = self.cursors;
        let record_a = self.validate(SectorId::A)?;
        let record_b = self.validate(SectorId::B)?;

        let winner = authoritative(a, record_a.is_some(), b, record_b.is_some());
        let (sector, (index, page)) = match (winner, record_a, record_b) {
            (Some(SectorId::A), Some(record), _) => (SectorId::A, record),
            (Some(SectorId::B), _, Some(record)) => (SectorId::B, record),
            _ => {
                self.last_written = Page::sector_record(settings, self.capabilities);
                return Ok(Source::Defaults);
            }
        };

        page.load_sector_record(self.capabilities, settings);
        self.last_written = page;

        Ok(Source::Sector { sector, index })
    }

    /// Programs `page` into the next slot and erases the sector it made stale. The erase only
    /// starts once the program returned, so the newest record always exists on flash.
    pub(crate) fn write_record(&mut self, page: &Page<PAGE_SIZE>) -> Result<SectorWrite, Error> {
        let [a, b] = self.cursors;
        let plan = plan_write(a, b, self.pages_per_sector());

        #[cfg(feature = "defmt")]
        trace!("write_record: {}[{}]", plan.sector, plan.index);

        #[cfg(feature = "debug-logs")]
        println!("internal: write_record: {plan:?}");

        debug_assert_ne!(plan.erase, Some(plan.sector));

        let address = self.page_address(plan.sector, plan.index);
        program(&mut self.hal, address as _, page.as_bytes()).map_err(|_| Error::FlashError)?;
        self.cursors[plan.sector as usize] = Some(plan.index);

        if let Some(stale) = plan.erase {
            self.erase_sector(stale)?;
        }

        Ok(SectorWrite {
            sector: plan.sector,
            index: plan.index,
            erased: plan.erase,
        })
    }
}
