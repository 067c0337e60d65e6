//! Optional subsystems a firmware build can be compiled with.
//!
//! Every record carries the capability mask of the build that wrote it. A build only accepts
//! records with exactly its own mask because the mask also determines which fields are present
//! in the record and therefore its length.

use core::fmt;

/// One optional subsystem. The discriminant is the bit position in the serialized mask.
#[derive(strum::FromRepr, strum::Display, strum::EnumIter, Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Capability {
    Magnetron = 0,
    Water = 1,
    Pilot = 2,
    Mapper = 3,
    Shutter = 4,
    Stirrer = 5,
}

impl Capability {
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// A set of [`Capability`] values, serialized as a single byte.
#[derive(Copy, Clone, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    pub magnetron: bool,
    pub water: bool,
    pub pilot: bool,
    pub mapper: bool,
    pub shutter: bool,
    pub stirrer: bool,
}

impl Capabilities {
    /// No optional subsystem.
    pub const NONE: Self = Self {
        magnetron: false,
        water: false,
        pilot: false,
        mapper: false,
        shutter: false,
        stirrer: false,
    };

    /// Every optional subsystem. Determines the largest possible record.
    pub const ALL: Self = Self {
        magnetron: true,
        water: true,
        pilot: true,
        mapper: true,
        shutter: true,
        stirrer: true,
    };

    /// The subsystems selected through cargo features for this build.
    pub const BUILD: Self = Self {
        magnetron: cfg!(feature = "magnetron"),
        water: cfg!(feature = "water"),
        pilot: cfg!(feature = "pilot"),
        mapper: cfg!(feature = "mapper"),
        shutter: cfg!(feature = "shutter"),
        stirrer: cfg!(feature = "stirrer"),
    };

    pub const fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::Magnetron => self.magnetron,
            Capability::Water => self.water,
            Capability::Pilot => self.pilot,
            Capability::Mapper => self.mapper,
            Capability::Shutter => self.shutter,
            Capability::Stirrer => self.stirrer,
        }
    }

    pub const fn with(mut self, capability: Capability) -> Self {
        match capability {
            Capability::Magnetron => self.magnetron = true,
            Capability::Water => self.water = true,
            Capability::Pilot => self.pilot = true,
            Capability::Mapper => self.mapper = true,
            Capability::Shutter => self.shutter = true,
            Capability::Stirrer => self.stirrer = true,
        }
        self
    }

    pub const fn to_mask(&self) -> u8 {
        let mut mask = 0;
        if self.magnetron {
            mask |= Capability::Magnetron.bit();
        }
        if self.water {
            mask |= Capability::Water.bit();
        }
        if self.pilot {
            mask |= Capability::Pilot.bit();
        }
        if self.mapper {
            mask |= Capability::Mapper.bit();
        }
        if self.shutter {
            mask |= Capability::Shutter.bit();
        }
        if self.stirrer {
            mask |= Capability::Stirrer.bit();
        }
        mask
    }

    /// Bits without a known capability are dropped. Use [`Capabilities::to_mask`] on the result
    /// and compare it with the raw byte to detect them.
    pub const fn from_mask(mask: u8) -> Self {
        Self {
            magnetron: mask & Capability::Magnetron.bit() != 0,
            water: mask & Capability::Water.bit() != 0,
            pilot: mask & Capability::Pilot.bit() != 0,
            mapper: mask & Capability::Mapper.bit() != 0,
            shutter: mask & Capability::Shutter.bit() != 0,
            stirrer: mask & Capability::Stirrer.bit() != 0,
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use strum::IntoEnumIterator;

        write!(f, "Capabilities(")?;
        let mut first = true;
        for capability in Capability::iter().filter(|it| self.contains(*it)) {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{capability}")?;
            first = false;
        }
        write!(f, ")")
    }
}
