//! Host side companion of `furnace-store`: generates flash images holding a settings record
//! and parses images dumped from a furnace controller back into CSV.
//!
//! Both directions drive the real [`SectorStore`] over an in-memory flash, so an image written
//! by this tool is exactly what the firmware would have written and parsing applies the same
//! boot repair the firmware applies.

pub mod error;
pub mod field;

mod csv;
mod flash;

use std::fs;
use std::path::Path;

pub use error::Error;
pub use field::{parse_capabilities, Field};
pub use flash::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE};
use flash::RamFlash;
use furnace_store::{Boot, Capabilities, SectorStore, Settings, Source};

/// Length of the tag and the capability mask in front of every record.
const RECORD_HEADER_LEN: usize = 9;

/// The settings of one record together with the capability set of the build it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsRecord {
    pub capabilities: Capabilities,
    pub settings: Settings,
}

/// What booting a store over an image revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReport {
    /// The loaded record, or the defaults if no sector held a record of this build.
    pub record: SettingsRecord,
    pub boot: Boot,
    /// Cursors of sector A and B after the boot repair.
    pub cursors: (Option<usize>, Option<usize>),
    /// Tag and capability mask of the loaded page, hex encoded.
    pub header: Option<String>,
}

impl SettingsRecord {
    /// Parse settings CSV content from a string.
    pub fn from_csv(content: &str, capabilities: Capabilities) -> Result<Self, Error> {
        csv::parser::parse_csv(content, capabilities)
    }

    /// Parse a settings CSV file at the given `path`.
    pub fn from_csv_file<P: AsRef<Path>>(path: P, capabilities: Capabilities) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        csv::parser::parse_csv(&content, capabilities)
    }

    /// Serialize this record to CSV and return the content as a `String`.
    pub fn to_csv(&self) -> Result<String, Error> {
        csv::writer::write_csv_content(self)
    }

    /// Serialize this record to a CSV file at the given `path`.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        csv::writer::write_csv(self, path)
    }

    /// Generate an image of both store sectors holding this record as the only page.
    ///
    /// `sector_size` must be a non-zero multiple of [`FLASH_SECTOR_SIZE`].
    pub fn generate_image(&self, sector_size: usize) -> Result<Vec<u8>, Error> {
        let mut flash = RamFlash::erased(image_len(sector_size)?);

        {
            let mut store = SectorStore::<_, FLASH_PAGE_SIZE>::new(&mut flash, 0, sector_size)?
                .with_capabilities(self.capabilities)
                .with_interval(0);

            // a baseline that differs from the record makes the first tick program it
            let mut baseline = Settings {
                pwm_level: self.settings.pwm_level.wrapping_add(1),
                ..self.settings
            };
            store.init(&mut baseline, 0)?;
            store.tick(&self.settings, 0)?;
        }

        Ok(flash.into_image())
    }

    /// Generate an image and write it to `path`.
    pub fn generate_image_file<P: AsRef<Path>>(
        &self,
        path: P,
        sector_size: usize,
    ) -> Result<(), Error> {
        let image = self.generate_image(sector_size)?;
        fs::write(path, image)?;
        Ok(())
    }

    /// Boot a store of a build with `capabilities` over an image of both sectors.
    ///
    /// The sector size is half the image. The image itself is left untouched even if the boot
    /// had to repair it.
    pub fn parse_image(image: &[u8], capabilities: Capabilities) -> Result<ImageReport, Error> {
        let sector_size = image.len() / 2;
        if image.len() != image_len(sector_size)? {
            return Err(Error::InvalidImageSize(image.len()));
        }

        let mut flash = RamFlash::from_image(image);
        let mut store = SectorStore::<_, FLASH_PAGE_SIZE>::new(&mut flash, 0, sector_size)?
            .with_capabilities(capabilities);

        let mut settings = Settings::default();
        let boot = store.init(&mut settings, 0)?;

        let header = match boot.source {
            Source::Sector { sector, index } => {
                let offset = sector as usize * sector_size + index * FLASH_PAGE_SIZE;
                Some(hex::encode(&image[offset..offset + RECORD_HEADER_LEN]))
            }
            Source::Defaults => None,
        };

        Ok(ImageReport {
            record: SettingsRecord {
                capabilities,
                settings,
            },
            boot,
            cursors: store.cursors(),
            header,
        })
    }

    /// Parse an image file at the given `path`.
    pub fn parse_image_file<P: AsRef<Path>>(
        path: P,
        capabilities: Capabilities,
    ) -> Result<ImageReport, Error> {
        let image = fs::read(path)?;
        Self::parse_image(&image, capabilities)
    }
}

fn image_len(sector_size: usize) -> Result<usize, Error> {
    if sector_size == 0 || !sector_size.is_multiple_of(FLASH_SECTOR_SIZE) {
        return Err(Error::InvalidImageSize(sector_size.saturating_mul(2)));
    }
    sector_size
        .checked_mul(2)
        .ok_or(Error::InvalidImageSize(usize::MAX))
}
