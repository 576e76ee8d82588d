//! Sega 315-5560 "MultiPCM" emulator
//!
//! A behavioral emulator of the 28-voice wavetable synthesis chip used on
//! Sega System 32, Model 1 and Model 2 arcade boards, a close sibling of the
//! Yamaha YMF278B (OPL4) wavetable engine.
//!
//! # Features
//! - 28 voices with linear-interpolated 8-bit sample playback from ROM
//! - Four-stage envelope generator with key rate scaling
//! - Per-voice pitch and amplitude LFOs (vibrato / tremolo)
//! - Interpolated total-level changes and the chip's 16-position pan law
//! - Sample banking for ROMs beyond the 1 MiB window
//! - Instrument header table parsing out of the first 6144 ROM bytes
//!
//! # Quick start
//! ```no_run
//! # let rom_image: Vec<u8> = Vec::new();
//! use multipcm::MultiPcm;
//!
//! let mut chip = MultiPcm::new();
//! chip.alloc_rom(rom_image.len())?;
//! chip.write_rom(0, &rom_image);
//!
//! // Register writes go through the slot/address/data ports.
//! chip.write(1, 0x00); // slot 0
//! chip.write(2, 0x01); // sample register
//! chip.write(0, 0x05); // instrument 5
//! chip.write(2, 0x04);
//! chip.write(0, 0x80); // key on
//!
//! let mut left = vec![0i32; 512];
//! let mut right = vec![0i32; 512];
//! chip.update(&mut left, &mut right);
//! # Ok::<(), multipcm::MultiPcmError>(())
//! ```
//!
//! The render loop is synchronous and allocation-free; register writes made
//! before a call to [`MultiPcm::update`] take effect on its first sample.

#![warn(missing_docs)]

mod chip;
mod envelope;
mod lfo;
mod sample;
mod tables;
mod voice;

/// Error type for MultiPCM chip operations
///
/// The register and render paths never fail; the only fallible operation is
/// reserving memory for the sample ROM.
#[derive(thiserror::Error, Debug)]
pub enum MultiPcmError {
    /// Sample ROM allocation failed
    #[error("failed to allocate {0} bytes of sample ROM")]
    RomAlloc(usize),
}

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, MultiPcmError>;

// Public API exports
pub use chip::{MultiPcm, DEFAULT_CLOCK, VOICE_COUNT};
