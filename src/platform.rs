use embedded_storage::nor_flash::NorFlash;
#[cfg(feature = "defmt")]
use defmt::trace;

/// Any blocking NOR flash driver can back a store. Offsets handed to the driver are relative
/// to the start of the flash, exactly like the `NorFlash` trait expects them.
pub trait Platform: NorFlash {}

impl<T: NorFlash> Platform for T {}

/// Programs `bytes` at `offset` with interrupts suspended.
///
/// On parts that execute in place the flash cannot be fetched from while it is programmed,
/// so no interrupt handler may run until the hardware operation finished.
#[inline(always)]
pub(crate) fn program<T: Platform>(hal: &mut T, offset: u32, bytes: &[u8]) -> Result<(), T::Error> {
    #[cfg(feature = "defmt")]
    trace!("program @{:#08x}: [{}]", offset, bytes.len());

    critical_section::with(|_| hal.write(offset, bytes))
}

/// Erases `[from, to)` with interrupts suspended. See [`program`].
#[inline(always)]
pub(crate) fn erase<T: Platform>(hal: &mut T, from: u32, to: u32) -> Result<(), T::Error> {
    #[cfg(feature = "defmt")]
    trace!("erase @{:#08x}..{:#08x}", from, to);

    critical_section::with(|_| hal.erase(from, to))
}

#[inline(always)]
pub(crate) const fn is_aligned(value: usize, alignment: usize) -> bool {
    alignment != 0 && value.is_multiple_of(alignment)
}
