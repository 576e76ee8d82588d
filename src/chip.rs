//! MultiPCM chip emulation
//!
//! Register-level emulation of the Sega 315-5560 wavetable chip: 28 sample
//! playback voices mixed into a stereo stream at the chip-derived rate of
//! master_clock / 180. The register interface mirrors the hardware bus, with
//! a slot-select and an address-select port in front of a single data port.

use crate::sample::{SampleDescriptor, DESCRIPTOR_BYTES, SAMPLE_COUNT, TABLE_BYTES};
use crate::tables::{self, RateTables};
use crate::voice::Voice;
use crate::{MultiPcmError, Result};

/// Number of playback voices.
pub const VOICE_COUNT: usize = 28;

/// Master clock of the Sega System 32 / Model 1 sound board (Hz).
pub const DEFAULT_CLOCK: u32 = 8_053_975;

/// Divider from master clock to output sample rate.
const CLOCK_DIVIDER: f32 = 180.0;

/// Slot-select decode table. The 5-bit select field addresses 32 positions
/// but the chip only has 28 voices; every eighth position selects nothing.
const VAL2CHAN: [i8; 32] = [
    0, 1, 2, 3, 4, 5, 6, -1, //
    7, 8, 9, 10, 11, 12, 13, -1, //
    14, 15, 16, 17, 18, 19, 20, -1, //
    21, 22, 23, 24, 25, 26, 27, -1,
];

/// Sega 315-5560 MultiPCM emulator
///
/// A behavioral model of the 28-voice wavetable chip used on Sega System 32,
/// Model 1 and Model 2 boards. Sample data and the instrument header table
/// live in an external ROM supplied through [`MultiPcm::alloc_rom`] and
/// [`MultiPcm::write_rom`]; everything else is driven by byte-wide register
/// writes.
///
/// # Example
///
/// ```
/// use multipcm::MultiPcm;
///
/// let mut chip = MultiPcm::new();
/// chip.alloc_rom(0x10000).unwrap();
/// chip.write_rom(0, &[0x00, 0x00, 0x0c, 0x00, 0x00, 0xff, 0xbf, 0, 0xf0, 0, 0xf0, 0]);
///
/// chip.write(1, 0x00); // select slot 0
/// chip.write(2, 0x01); // select the sample register
/// chip.write(0, 0x00); // latch sample 0
/// chip.write(2, 0x04);
/// chip.write(0, 0x80); // key on
///
/// let mut left = [0i32; 64];
/// let mut right = [0i32; 64];
/// chip.update(&mut left, &mut right);
/// ```
#[derive(Clone)]
pub struct MultiPcm {
    samples: [SampleDescriptor; SAMPLE_COUNT],
    voices: [Voice; VOICE_COUNT],
    /// Currently selected slot, or -1 when the select field hit a gap.
    cur_slot: i32,
    /// Currently selected register address, 0..=7.
    address: u32,
    bank_l: u32,
    bank_r: u32,
    /// Output sample rate in Hz (master clock / 180).
    rate: f32,
    rom: Vec<u8>,
    /// Smallest power-of-two-minus-one covering the ROM.
    rom_mask: u32,
    rates: RateTables,
}

impl MultiPcm {
    /// Create a chip clocked like the Sega System 32 sound board.
    pub fn new() -> Self {
        Self::with_clock(DEFAULT_CLOCK)
    }

    /// Create a chip with a custom master clock.
    ///
    /// The output sample rate is `clock_hz / 180`; [`MultiPcm::update`]
    /// produces samples at that rate.
    pub fn with_clock(clock_hz: u32) -> Self {
        let rate = clock_hz as f32 / CLOCK_DIVIDER;
        MultiPcm {
            samples: [SampleDescriptor::default(); SAMPLE_COUNT],
            voices: std::array::from_fn(|_| Voice::new()),
            cur_slot: 0,
            address: 0,
            bank_l: 0,
            bank_r: 0,
            rate,
            rom: Vec::new(),
            rom_mask: 0,
            rates: RateTables::new(rate as f64),
        }
    }

    /// Output sample rate in Hz.
    pub fn output_rate(&self) -> f32 {
        self.rate
    }

    /// Stop every voice. ROM contents and the sample table survive.
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.playing = false;
        }
    }

    /// Write to one of the three bus ports.
    ///
    /// Port 0 writes the selected slot register, port 1 selects a slot and
    /// port 2 selects a register address. Other ports and data writes with
    /// no slot selected are ignored.
    pub fn write(&mut self, port: u8, data: u8) {
        match port {
            0 => {
                if self.cur_slot >= 0 {
                    self.write_slot(self.cur_slot as usize, self.address as usize, data);
                }
            }
            1 => self.cur_slot = VAL2CHAN[(data & 0x1f) as usize] as i32,
            2 => self.address = (data as u32).min(7),
            _ => {}
        }
    }

    /// Combined write: slot select in bits 3-7, register address in bits 0-2.
    pub fn write_quick(&mut self, slot_addr: u8, data: u8) {
        self.cur_slot = VAL2CHAN[((slot_addr >> 3) & 0x1f) as usize] as i32;
        self.address = (slot_addr & 0x7) as u32;
        if self.cur_slot < 0 {
            return;
        }
        self.write_slot(self.cur_slot as usize, self.address as usize, data);
    }

    /// Read a bus port. The chip exposes no readable state; always 0.
    pub fn read(&self, _port: u8) -> u8 {
        0
    }

    /// Set both sample bank bases directly (raw 24-bit offsets).
    pub fn set_bank(&mut self, left: u32, right: u32) {
        self.bank_l = left;
        self.bank_r = right;
    }

    /// Word-wide bank register write; bit 0 of the selector targets the left
    /// bank, bit 1 the right bank. The word lands on address bits 16-31.
    pub fn bank_write(&mut self, selector: u8, data: u16) {
        if selector & 0x1 != 0 {
            self.bank_l = (data as u32) << 16;
        }
        if selector & 0x2 != 0 {
            self.bank_r = (data as u32) << 16;
        }
    }

    /// (Re)allocate sample ROM, filled with 0xff.
    ///
    /// Reallocating with the current size is a no-op. On success the ROM mask
    /// is recomputed; previous contents are discarded.
    pub fn alloc_rom(&mut self, size: usize) -> Result<()> {
        if self.rom.len() == size {
            return Ok(());
        }
        let mut rom = Vec::new();
        rom.try_reserve_exact(size)
            .map_err(|_| MultiPcmError::RomAlloc(size))?;
        rom.resize(size, 0xff);
        self.rom = rom;
        self.rom_mask = rom_mask_for(size);
        Ok(())
    }

    /// Copy bytes into sample ROM.
    ///
    /// Writes past the end are silently truncated. A write that touches the
    /// header window rebuilds the whole sample descriptor table.
    pub fn write_rom(&mut self, offset: usize, data: &[u8]) {
        if offset > self.rom.len() {
            return;
        }
        let len = data.len().min(self.rom.len() - offset);
        self.rom[offset..offset + len].copy_from_slice(&data[..len]);

        if offset < TABLE_BYTES {
            self.rebuild_sample_table();
        }
    }

    /// Mute voices by bitmask; bit i silences voice i.
    ///
    /// A muted voice contributes nothing and is frozen in place: phase and
    /// envelope stay where they were until it is unmuted.
    pub fn set_mute_mask(&mut self, mask: u32) {
        for (i, voice) in self.voices.iter_mut().enumerate() {
            voice.muted = mask >> i & 1 != 0;
        }
    }

    /// Mute or unmute a single voice.
    pub fn set_voice_mute(&mut self, voice: usize, mute: bool) {
        if voice < VOICE_COUNT {
            self.voices[voice].muted = mute;
        }
    }

    /// Check whether a voice is muted.
    pub fn is_voice_muted(&self, voice: usize) -> bool {
        self.voices.get(voice).is_some_and(|v| v.muted)
    }

    /// Render a block of stereo output.
    ///
    /// Writes `min(out_l.len(), out_r.len())` samples, overwriting the
    /// buffers; callers wanting additive mixing must accumulate themselves.
    /// Output is wider than 16 bits so the host can clamp or downmix.
    pub fn update(&mut self, out_l: &mut [i32], out_r: &mut [i32]) {
        let t = tables::common();
        let count = out_l.len().min(out_r.len());

        for (left, right) in out_l[..count].iter_mut().zip(&mut out_r[..count]) {
            let mut acc_l = 0;
            let mut acc_r = 0;
            for voice in &mut self.voices {
                if voice.playing && !voice.muted {
                    let sample = &self.samples[voice.sample];
                    let (l, r) = voice.render(sample, &self.rom, self.rom_mask, t);
                    acc_l += l;
                    acc_r += r;
                }
            }
            *left = acc_l;
            *right = acc_r;
        }
    }

    /// Apply a write to a slot register and its side effects.
    fn write_slot(&mut self, slot: usize, reg: usize, data: u8) {
        self.voices[slot].regs[reg] = data;

        match reg {
            0 => self.voices[slot].set_pan(data),
            1 => {
                // Selecting a sample loads its LFO setup into registers 6/7,
                // like the YMF278B. Changing the sample of a playing voice is
                // defined but not something the driver is expected to do.
                let sample = &self.samples[data as usize];
                let (vib, am) = (sample.lfo_vib, sample.am);
                self.write_slot(slot, 6, vib);
                self.write_slot(slot, 7, am);
            }
            2 | 3 => self.voices[slot].set_pitch(&self.rates.fns, self.rate),
            4 => {
                if data & 0x80 != 0 {
                    let index = self.voices[slot].regs[1] as usize;
                    let sample = self.samples[index];
                    self.voices[slot].key_on(index, &sample, self.bank_l, self.bank_r, &self.rates);
                } else {
                    let release = self.samples[self.voices[slot].sample].release_rate;
                    self.voices[slot].key_off(release);
                }
            }
            5 => self.voices[slot].set_level(data),
            6 | 7 => {
                if data != 0 {
                    self.voices[slot].refresh_lfos(self.rate);
                }
            }
            _ => {}
        }
    }

    /// Re-decode every descriptor that lies fully inside the ROM.
    fn rebuild_sample_table(&mut self) {
        for (i, sample) in self.samples.iter_mut().enumerate() {
            let offset = i * DESCRIPTOR_BYTES;
            match self.rom.get(offset..offset + DESCRIPTOR_BYTES) {
                Some(raw) => *sample = SampleDescriptor::decode(raw),
                None => break,
            }
        }
    }
}

impl Default for MultiPcm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MultiPcm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiPcm")
            .field("rate", &self.rate)
            .field("rom_size", &self.rom.len())
            .field("cur_slot", &self.cur_slot)
            .field("address", &self.address)
            .field("active_voices", &self.voices.iter().filter(|v| v.playing).count())
            .finish_non_exhaustive()
    }
}

/// Smallest `2^k - 1` that covers `size - 1`.
fn rom_mask_for(size: usize) -> u32 {
    let mut mask = 1u32;
    while (mask as usize) < size {
        mask <<= 1;
    }
    mask - 1
}
