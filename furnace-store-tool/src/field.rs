use furnace_store::{Capabilities, Capability, Settings};

use crate::error::Error;

/// A persisted [`Settings`] field, named like the struct member in CSV files.
#[derive(
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    LogBits,
    PwmLevel,
    PwmCeiling,
    WaterPwm,
    MagnetronPulseCount,
    MagnetronDeadline,
    PilotEnabled,
    PilotDesTemp,
    MapperEnabled,
    MapperMaxPwmTemp,
}

impl Field {
    /// The subsystem the field belongs to, `None` for fields every build persists.
    pub fn capability(self) -> Option<Capability> {
        match self {
            Field::LogBits | Field::PwmLevel | Field::PwmCeiling => None,
            Field::WaterPwm => Some(Capability::Water),
            Field::MagnetronPulseCount | Field::MagnetronDeadline => Some(Capability::Magnetron),
            Field::PilotEnabled | Field::PilotDesTemp => Some(Capability::Pilot),
            Field::MapperEnabled | Field::MapperMaxPwmTemp => Some(Capability::Mapper),
        }
    }

    pub fn is_present(self, capabilities: Capabilities) -> bool {
        self.capability()
            .is_none_or(|capability| capabilities.contains(capability))
    }

    pub(crate) fn get(self, settings: &Settings) -> String {
        match self {
            Field::LogBits => settings.log_bits.to_string(),
            Field::PwmLevel => settings.pwm_level.to_string(),
            Field::PwmCeiling => settings.pwm_ceiling.to_string(),
            Field::WaterPwm => settings.water_pwm.to_string(),
            Field::MagnetronPulseCount => settings.magnetron_pulse_count.to_string(),
            Field::MagnetronDeadline => settings.magnetron_deadline.to_string(),
            Field::PilotEnabled => settings.pilot_enabled.to_string(),
            Field::PilotDesTemp => settings.pilot_des_temp.to_string(),
            Field::MapperEnabled => settings.mapper_enabled.to_string(),
            Field::MapperMaxPwmTemp => settings.mapper_max_pwm_temp.to_string(),
        }
    }

    pub(crate) fn set(self, settings: &mut Settings, value: &str) -> Result<(), Error> {
        let trimmed = value.trim();
        let invalid = || Error::InvalidValue {
            field: self,
            value: value.to_string(),
        };

        match self {
            Field::LogBits => settings.log_bits = parse_bits(trimmed).ok_or_else(invalid)?,
            Field::PwmLevel => settings.pwm_level = trimmed.parse().map_err(|_| invalid())?,
            Field::PwmCeiling => settings.pwm_ceiling = trimmed.parse().map_err(|_| invalid())?,
            Field::WaterPwm => settings.water_pwm = trimmed.parse().map_err(|_| invalid())?,
            Field::MagnetronPulseCount => {
                settings.magnetron_pulse_count = trimmed.parse().map_err(|_| invalid())?
            }
            Field::MagnetronDeadline => {
                settings.magnetron_deadline = trimmed.parse().map_err(|_| invalid())?
            }
            Field::PilotEnabled => settings.pilot_enabled = trimmed.parse().map_err(|_| invalid())?,
            Field::PilotDesTemp => settings.pilot_des_temp = trimmed.parse().map_err(|_| invalid())?,
            Field::MapperEnabled => {
                settings.mapper_enabled = trimmed.parse().map_err(|_| invalid())?
            }
            Field::MapperMaxPwmTemp => {
                settings.mapper_max_pwm_temp = trimmed.parse().map_err(|_| invalid())?
            }
        }
        Ok(())
    }
}

/// Log channel masks are usually written in binary.
fn parse_bits(value: &str) -> Option<u8> {
    match value.strip_prefix("0b").or_else(|| value.strip_prefix("0B")) {
        Some(bits) => u8::from_str_radix(bits, 2).ok(),
        None => value.parse().ok(),
    }
}

/// Parses a comma separated list of capability names, `all`, or `none`.
pub fn parse_capabilities(list: &str) -> Result<Capabilities, Error> {
    use strum::IntoEnumIterator;

    match list.trim() {
        "all" => return Ok(Capabilities::ALL),
        "none" | "" => return Ok(Capabilities::NONE),
        _ => {}
    }

    list.split(',')
        .map(str::trim)
        .try_fold(Capabilities::NONE, |capabilities, name| {
            Capability::iter()
                .find(|capability| capability.to_string().eq_ignore_ascii_case(name))
                .map(|capability| capabilities.with(capability))
                .ok_or_else(|| Error::UnknownCapability(name.to_string()))
        })
}
