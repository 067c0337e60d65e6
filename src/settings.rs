/// The part of the furnace runtime state that survives a reboot.
///
/// Owned by the control loop; the stores only copy it by value. Fields of subsystems that are
/// not compiled into the build are kept here as well but never persisted or loaded.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// One bit per log channel, see the logger of the command server.
    pub log_bits: u8,
    pub pwm_level: u8,
    pub pwm_ceiling: i32,

    pub water_pwm: u8,

    pub magnetron_pulse_count: u8,
    /// Absolute time of the next magnetron pulse in microseconds since boot.
    pub magnetron_deadline: u64,

    pub pilot_enabled: bool,
    pub pilot_des_temp: i32,

    pub mapper_enabled: bool,
    pub mapper_max_pwm_temp: i32,
}
