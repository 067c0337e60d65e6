//! On-flash representation of a [`Settings`] snapshot.
//!
//! Two page layouts share the same record body:
//!
//! ```text
//! sector store: [tag: 8][capability_mask: 1][body][0xFF padding up to the page size]
//! linear store: [body_len: 1][capability_mask: 1][body][0xFF padding up to the page size]
//!
//! body: [log_bits: 1][pwm_level: 1][pwm_ceiling: 4]
//!       [water_pwm: 1]                                       if Water
//!       [magnetron_pulse_count: 1][magnetron_deadline: 8]    if Magnetron
//!       [pilot_enabled: 1][pilot_des_temp: 4]                if Pilot
//!       [mapper_enabled: 1][mapper_max_pwm_temp: 4]          if Mapper
//! ```
//!
//! All integers are little endian and there is no padding between fields, so the layout is a
//! pure function of the capability set.

use crate::capability::Capabilities;
use crate::settings::Settings;
use core::mem::size_of;

/// Value of every byte of an erased NOR flash.
pub(crate) const ERASED: u8 = 0xFF;

/// Distinguishes a record from erased or unrelated flash content.
pub(crate) const TAG: [u8; 8] = *b"FURNACE1";

const MASK_LEN: usize = size_of::<u8>();
pub(crate) const SECTOR_HEADER_LEN: usize = TAG.len() + MASK_LEN;
pub(crate) const LINEAR_HEADER_LEN: usize = size_of::<u8>() + MASK_LEN;

pub(crate) const fn body_len(caps: Capabilities) -> usize {
    let mut len = size_of::<u8>() + size_of::<u8>() + size_of::<i32>();
    if caps.water {
        len += size_of::<u8>();
    }
    if caps.magnetron {
        len += size_of::<u8>() + size_of::<u64>();
    }
    if caps.pilot {
        len += size_of::<u8>() + size_of::<i32>();
    }
    if caps.mapper {
        len += size_of::<u8>() + size_of::<i32>();
    }
    len
}

pub(crate) const fn sector_record_len(caps: Capabilities) -> usize {
    SECTOR_HEADER_LEN + body_len(caps)
}

pub(crate) const fn linear_record_len(caps: Capabilities) -> usize {
    LINEAR_HEADER_LEN + body_len(caps)
}

const fn max(a: usize, b: usize) -> usize {
    if a > b { a } else { b }
}

/// The largest record any build can produce. Every page has to be at least this large.
pub const MAX_RECORD_LEN: usize = max(
    sector_record_len(Capabilities::ALL),
    linear_record_len(Capabilities::ALL),
);

// The linear layout stores the body length in a single byte and reserves 0xFF for erased pages.
const _: () = assert!(
    body_len(Capabilities::ALL) < ERASED as usize,
    "record body must be shorter than 255 bytes"
);

/// A record padded with erased bytes to the program granularity of the flash.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Page<const N: usize>([u8; N]);

impl<const N: usize> Page<N> {
    pub(crate) const fn erased() -> Self {
        const {
            assert!(N >= MAX_RECORD_LEN, "page size is smaller than the largest record");
        }
        Self([ERASED; N])
    }

    pub(crate) fn is_erased(&self) -> bool {
        self.0.iter().all(|&it| it == ERASED)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; N] {
        &mut self.0
    }

    /// Layout used by the two sector store.
    pub(crate) fn sector_record(settings: &Settings, caps: Capabilities) -> Self {
        let mut page = Self::erased();
        page.0[..TAG.len()].copy_from_slice(&TAG);
        page.0[TAG.len()] = caps.to_mask();
        encode_body(settings, caps, &mut page.0[SECTOR_HEADER_LEN..]);
        page
    }

    /// Tag and capability mask both match the build.
    pub(crate) fn is_sector_record_of(&self, caps: Capabilities) -> bool {
        self.0[..TAG.len()] == TAG && self.0[TAG.len()] == caps.to_mask()
    }

    /// Callers check [`Page::is_sector_record_of`] first.
    pub(crate) fn load_sector_record(&self, caps: Capabilities, settings: &mut Settings) {
        decode_body(&self.0[SECTOR_HEADER_LEN..], caps, settings);
    }

    /// Layout used by the linear store.
    pub(crate) fn linear_record(settings: &Settings, caps: Capabilities) -> Self {
        let mut page = Self::erased();
        page.0[0] = body_len(caps) as u8;
        page.0[1] = caps.to_mask();
        encode_body(settings, caps, &mut page.0[LINEAR_HEADER_LEN..]);
        page
    }

    /// The length byte of a linear record, or `None` for an erased slot.
    pub(crate) fn linear_body_len(&self) -> Option<u8> {
        match self.0[0] {
            ERASED => None,
            len => Some(len),
        }
    }

    pub(crate) fn is_linear_record_of(&self, caps: Capabilities) -> bool {
        self.linear_body_len() == Some(body_len(caps) as u8) && self.0[1] == caps.to_mask()
    }

    pub(crate) fn load_linear_record(&self, caps: Capabilities, settings: &mut Settings) {
        decode_body(&self.0[LINEAR_HEADER_LEN..], caps, settings);
    }
}

#[cfg(feature = "debug-logs")]
impl<const N: usize> core::fmt::Debug for Page<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let used = N - self.0.iter().rev().take_while(|&&it| it == ERASED).count();
        f.write_fmt(format_args!("Page {{ {:02x?} }}", &self.0[..used]))
    }
}

struct Encoder<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Encoder<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn put_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    fn put_bool(&mut self, value: bool) {
        self.put_u8(value as u8);
    }

    fn put_i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }

    fn put_u64(&mut self, value: u64) {
        self.put(&value.to_le_bytes());
    }
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn take<const M: usize>(&mut self) -> [u8; M] {
        let mut out = [0u8; M];
        out.copy_from_slice(&self.buf[self.pos..self.pos + M]);
        self.pos += M;
        out
    }

    fn u8(&mut self) -> u8 {
        let [value] = self.take::<1>();
        value
    }

    fn bool(&mut self) -> bool {
        self.u8() != 0
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }
}

fn encode_body(settings: &Settings, caps: Capabilities, out: &mut [u8]) {
    let mut enc = Encoder { buf: out, pos: 0 };
    enc.put_u8(settings.log_bits);
    enc.put_u8(settings.pwm_level);
    enc.put_i32(settings.pwm_ceiling);
    if caps.water {
        enc.put_u8(settings.water_pwm);
    }
    if caps.magnetron {
        enc.put_u8(settings.magnetron_pulse_count);
        enc.put_u64(settings.magnetron_deadline);
    }
    if caps.pilot {
        enc.put_bool(settings.pilot_enabled);
        enc.put_i32(settings.pilot_des_temp);
    }
    if caps.mapper {
        enc.put_bool(settings.mapper_enabled);
        enc.put_i32(settings.mapper_max_pwm_temp);
    }
    debug_assert_eq!(enc.pos, body_len(caps));
}

/// Fields of subsystems outside `caps` are left untouched.
fn decode_body(bytes: &[u8], caps: Capabilities, settings: &mut Settings) {
    let mut dec = Decoder { buf: bytes, pos: 0 };
    settings.log_bits = dec.u8();
    settings.pwm_level = dec.u8();
    settings.pwm_ceiling = dec.i32();
    if caps.water {
        settings.water_pwm = dec.u8();
    }
    if caps.magnetron {
        settings.magnetron_pulse_count = dec.u8();
        settings.magnetron_deadline = dec.u64();
    }
    if caps.pilot {
        settings.pilot_enabled = dec.bool();
        settings.pilot_des_temp = dec.i32();
    }
    if caps.mapper {
        settings.mapper_enabled = dec.bool();
        settings.mapper_max_pwm_temp = dec.i32();
    }
}
