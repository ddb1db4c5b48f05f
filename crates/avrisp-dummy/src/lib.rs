//! avrisp-dummy - In-memory AVR target for testing
//!
//! This crate provides a dummy programmer link with an emulated ATmega328P
//! on the other end. It answers the serial programming instruction set the
//! way the real part does, one byte at a time, so everything above the link
//! can be exercised without hardware.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

#[cfg(feature = "alloc")]
use avrisp_core::chip::{
    FuseSet, HighFuse, MemoryRegion, EEPROM_PAGE_SIZE, EEPROM_SIZE, ERASED_VALUE, FLASH_PAGE_SIZE,
    FLASH_PAGE_WORDS, FLASH_SIZE,
};
#[cfg(feature = "alloc")]
use avrisp_core::programmer::IspLink;
#[cfg(feature = "alloc")]
use avrisp_core::protocol::{opcodes, Frame};

#[cfg(test)]
mod tests;

/// Configuration for the emulated target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Signature bytes
    pub signature: [u8; 3],
    /// Lock byte at power-up
    pub lock: u8,
    /// Low fuse at power-up
    pub low: u8,
    /// High fuse at power-up
    pub high: u8,
    /// Extended fuse at power-up
    pub extended: u8,
    /// Number of programming-enable attempts that get no echo
    pub sync_failures: u32,
    /// Number of RDY/BSY polls that report busy after each write
    pub busy_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            signature: [0x1E, 0x95, 0x0F], // ATmega328P
            lock: 0xFF,
            low: 0x62,
            high: 0xD9,
            extended: 0xFF,
            sync_failures: 0,
            busy_polls: 2,
        }
    }
}

/// Emulated target behind an [`IspLink`]
///
/// The target only listens while RESET is held low. Frames are executed once
/// their fourth byte arrives. Flash page writes can only clear bits, as on
/// real flash, so writing without erasing first shows up on readback.
#[cfg(feature = "alloc")]
pub struct DummyTarget {
    config: DummyConfig,
    flash: Vec<u8>,
    eeprom: Vec<u8>,
    fuses: FuseSet,
    flash_latch: [u8; FLASH_PAGE_SIZE],
    eeprom_latch: [u8; EEPROM_PAGE_SIZE],
    extended_address: u8,
    in_reset: bool,
    programming: bool,
    sync_failures: u32,
    busy: u32,
    frame: Frame,
    position: usize,
    frames: Vec<Frame>,
    reset_pulses: usize,
    violations: usize,
    stuck: Option<(MemoryRegion, u16, u8)>,
    released: bool,
}

#[cfg(feature = "alloc")]
impl DummyTarget {
    /// Create a new target with the given configuration, memories erased
    pub fn new(config: DummyConfig) -> Self {
        let fuses = FuseSet {
            lock: config.lock,
            low: config.low,
            high: config.high,
            extended: config.extended,
        };
        Self {
            flash: vec![ERASED_VALUE; FLASH_SIZE],
            eeprom: vec![ERASED_VALUE; EEPROM_SIZE],
            fuses,
            flash_latch: [ERASED_VALUE; FLASH_PAGE_SIZE],
            eeprom_latch: [ERASED_VALUE; EEPROM_PAGE_SIZE],
            extended_address: 0,
            in_reset: false,
            programming: false,
            sync_failures: config.sync_failures,
            busy: 0,
            frame: [0; 4],
            position: 0,
            frames: Vec::new(),
            reset_pulses: 0,
            violations: 0,
            stuck: None,
            released: false,
            config,
        }
    }

    /// Create a new ATmega328P with default fuses
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Get a reference to the flash contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Get a mutable reference to the flash contents
    pub fn flash_mut(&mut self) -> &mut [u8] {
        &mut self.flash
    }

    /// Get a reference to the EEPROM contents
    pub fn eeprom(&self) -> &[u8] {
        &self.eeprom
    }

    /// Get a mutable reference to the EEPROM contents
    pub fn eeprom_mut(&mut self) -> &mut [u8] {
        &mut self.eeprom
    }

    /// Current fuse and lock bytes
    pub fn fuses(&self) -> FuseSet {
        self.fuses
    }

    /// Last value set with the extended address instruction
    pub fn extended_address(&self) -> u8 {
        self.extended_address
    }

    /// Every complete frame received, in order
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Forget the frames received so far
    pub fn clear_frames(&mut self) {
        self.frames.clear();
    }

    /// Number of reset pulses seen
    pub fn reset_pulses(&self) -> usize {
        self.reset_pulses
    }

    /// Number of instructions other than RDY/BSY polls received while busy
    pub fn protocol_violations(&self) -> usize {
        self.violations
    }

    /// Whether the link has been released
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Whether the target is in programming mode
    pub fn is_programming(&self) -> bool {
        self.programming
    }

    /// Make one byte always read back as `value`, as a worn cell would
    pub fn stick_byte(&mut self, region: MemoryRegion, addr: u16, value: u8) {
        self.stuck = Some((region, addr, value));
    }

    fn read_memory(&self, region: MemoryRegion, addr: u16) -> u8 {
        if let Some((r, a, value)) = self.stuck {
            if r == region && a == addr {
                return value;
            }
        }
        match region {
            MemoryRegion::Flash => self.flash[addr as usize % FLASH_SIZE],
            MemoryRegion::Eeprom => self.eeprom[addr as usize % EEPROM_SIZE],
        }
    }

    fn start_write_cycle(&mut self) {
        self.busy = self.config.busy_polls;
    }

    fn chip_erase(&mut self) {
        self.flash.fill(ERASED_VALUE);
        if !HighFuse::from_bits_retain(self.fuses.high).eeprom_preserved() {
            self.eeprom.fill(ERASED_VALUE);
        }
        self.fuses.lock = 0xFF;
        self.start_write_cycle();
    }

    fn commit_flash_page(&mut self, word_addr: u16) {
        let base = (word_addr as usize & !(FLASH_PAGE_WORDS - 1)) * 2 % FLASH_SIZE;
        for (cell, &byte) in self.flash[base..base + FLASH_PAGE_SIZE]
            .iter_mut()
            .zip(self.flash_latch.iter())
        {
            *cell &= byte;
        }
        self.flash_latch = [ERASED_VALUE; FLASH_PAGE_SIZE];
        self.start_write_cycle();
    }

    fn commit_eeprom_page(&mut self, addr: u16) {
        let base = (addr as usize & !(EEPROM_PAGE_SIZE - 1)) % EEPROM_SIZE;
        self.eeprom[base..base + EEPROM_PAGE_SIZE].copy_from_slice(&self.eeprom_latch);
        self.eeprom_latch = [ERASED_VALUE; EEPROM_PAGE_SIZE];
        self.start_write_cycle();
    }

    /// Execute a complete frame and return the byte shifted out with its
    /// fourth byte
    fn execute(&mut self, frame: Frame) -> u8 {
        self.frames.push(frame);

        if frame[0] == opcodes::POLL_READY {
            return if self.busy > 0 {
                self.busy -= 1;
                opcodes::BUSY_BIT
            } else {
                0x00
            };
        }
        if self.busy > 0 {
            log::warn!("dummy: instruction {:02X?} while busy", frame);
            self.violations += 1;
        }

        let addr = u16::from_be_bytes([frame[1], frame[2]]);
        match frame {
            [opcodes::WRITE_CONTROL, opcodes::PROGRAMMING_ENABLE, _, _] => 0x00,
            [opcodes::WRITE_CONTROL, opcodes::CHIP_ERASE, _, _] => {
                self.chip_erase();
                0x00
            }
            [opcodes::WRITE_CONTROL, op, _, value] => {
                match op {
                    opcodes::WRITE_FUSE_LOW => self.fuses.low = value,
                    opcodes::WRITE_FUSE_HIGH => self.fuses.high = value,
                    opcodes::WRITE_FUSE_EXTENDED => self.fuses.extended = value,
                    // Lock bits can only be programmed, never cleared, short of a chip erase
                    opcodes::WRITE_LOCK => self.fuses.lock &= value,
                    _ => log::warn!("dummy: unknown write {:02X?}", frame),
                }
                self.start_write_cycle();
                0x00
            }
            [opcodes::READ_SIGNATURE, _, index, _] => {
                let signature = &self.config.signature;
                signature.get(index as usize).copied().unwrap_or(0xFF)
            }
            [b0, b1, _, _] if [b0, b1] == opcodes::READ_LOCK => self.fuses.lock,
            [b0, b1, _, _] if [b0, b1] == opcodes::READ_FUSE_LOW => self.fuses.low,
            [b0, b1, _, _] if [b0, b1] == opcodes::READ_FUSE_HIGH => self.fuses.high,
            [b0, b1, _, _] if [b0, b1] == opcodes::READ_FUSE_EXTENDED => self.fuses.extended,
            [opcodes::READ_FLASH_LOW, _, _, _] => {
                self.read_memory(MemoryRegion::Flash, addr.wrapping_mul(2))
            }
            [opcodes::READ_FLASH_HIGH, _, _, _] => {
                self.read_memory(MemoryRegion::Flash, addr.wrapping_mul(2) | 1)
            }
            [opcodes::READ_EEPROM, _, _, _] => self.read_memory(MemoryRegion::Eeprom, addr),
            [opcodes::WRITE_EEPROM, _, _, value] => {
                self.eeprom[addr as usize % EEPROM_SIZE] = value;
                self.start_write_cycle();
                0x00
            }
            [opcodes::LOAD_EEPROM_PAGE, _, index, value] => {
                self.eeprom_latch[index as usize % EEPROM_PAGE_SIZE] = value;
                0x00
            }
            [opcodes::WRITE_EEPROM_PAGE, _, _, _] => {
                self.commit_eeprom_page(addr);
                0x00
            }
            [opcodes::LOAD_FLASH_LOW, _, index, value] => {
                self.flash_latch[(index as usize % FLASH_PAGE_WORDS) * 2] = value;
                0x00
            }
            [opcodes::LOAD_FLASH_HIGH, _, index, value] => {
                self.flash_latch[(index as usize % FLASH_PAGE_WORDS) * 2 + 1] = value;
                0x00
            }
            [opcodes::WRITE_FLASH_PAGE, _, _, _] => {
                self.commit_flash_page(addr);
                0x00
            }
            [opcodes::LOAD_EXTENDED_ADDRESS, _, value, _] => {
                self.extended_address = value;
                0x00
            }
            _ => {
                log::warn!("dummy: unknown instruction {:02X?}", frame);
                0x00
            }
        }
    }
}

#[cfg(feature = "alloc")]
impl IspLink for DummyTarget {
    fn transfer(&mut self, byte: u8) -> u8 {
        // A running target ignores the bus and MISO floats high
        if !self.in_reset {
            return 0xFF;
        }

        let position = self.position;
        self.frame[position] = byte;
        self.position = (position + 1) % 4;

        match position {
            0 => 0x00,
            1 => self.frame[0],
            2 => {
                if self.frame[..2] != [opcodes::WRITE_CONTROL, opcodes::PROGRAMMING_ENABLE] {
                    return self.frame[1];
                }
                if self.sync_failures > 0 {
                    self.sync_failures -= 1;
                    log::debug!("dummy: dropping programming enable");
                    return 0x00;
                }
                self.programming = true;
                opcodes::PROGRAMMING_ENABLE
            }
            _ => {
                if self.programming {
                    self.execute(self.frame)
                } else {
                    0xFF
                }
            }
        }
    }

    fn set_reset(&mut self, asserted: bool) {
        if !asserted {
            self.programming = false;
        }
        if asserted {
            self.released = false;
        }
        self.in_reset = asserted;
        self.position = 0;
    }

    fn delay_ms(&mut self, _ms: u32) {
        // Write cycles are counted in polls, not time
    }

    fn reset_pulse(&mut self) {
        self.reset_pulses += 1;
        self.set_reset(false);
        self.set_reset(true);
    }

    fn release(&mut self) {
        self.in_reset = false;
        self.programming = false;
        self.position = 0;
        self.released = true;
    }
}
