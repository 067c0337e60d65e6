use thiserror::Error;

/// Errors returned by the stores. Recoverable flash states (corrupted cursors, foreign or
/// missing records) are never reported as errors, they are repaired in place during boot.
/// What remains is a misconfigured region or a failing flash driver.
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The region offset has to be aligned to the erase size of the flash
    #[error("invalid region offset")]
    InvalidRegionOffset,

    /// The sector size has to be a multiple of the erase size and the page size, hold at
    /// least two pages, and the region has to fit into the flash
    #[error("invalid region size")]
    InvalidRegionSize,

    /// The page size has to be a multiple of the flash write and read sizes
    #[error("invalid page size")]
    InvalidPageSize,

    /// The internal error value is returned from the provided `NorFlash`.
    /// Once returned, the store refuses further writes until it is initialized again.
    #[error("internal flash error")]
    FlashError,

    /// `tick` was called before `init` completed successfully.
    #[error("store not initialized")]
    NotInitialized,
}
