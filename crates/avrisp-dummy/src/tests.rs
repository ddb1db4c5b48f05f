use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::string::{String, ToString};

use avrisp_core::chip::{DeviceSignature, FuseKind, MemoryRegion, FLASH_SIZE};
use avrisp_core::error::{Error, ParseError, Result};
use avrisp_core::hex::{self, RecordType};
use avrisp_core::io::{LineSink, LineSource, Storage};
use avrisp_core::memory::{self, PageBuffer};
use avrisp_core::orchestrator::{self, NoProgress, SessionOptions};
use avrisp_core::protocol::{IspSession, SessionState, SYNC_ATTEMPTS};

use super::*;

const SCENARIO_A: &str = ":10000000214601360121470136007EFE09D2190141\r\n:00000001FF\r\n";
const SCENARIO_A_DATA: [u8; 16] = [
    0x21, 0x46, 0x01, 0x36, 0x01, 0x21, 0x47, 0x01, 0x36, 0x00, 0x7E, 0xFE, 0x09, 0xD2, 0x19, 0x01,
];
const SCENARIO_C: &str = "LB:FF\nL:E2;H:D9;E:FD\n";

fn session_with(config: DummyConfig) -> IspSession<DummyTarget> {
    let mut session = IspSession::new(DummyTarget::new(config));
    session.begin().unwrap();
    session
}

fn session() -> IspSession<DummyTarget> {
    session_with(DummyConfig::default())
}

/// Build a HEX file from data records, terminated by the end record
fn hex_file(records: &[(u16, &[u8])]) -> String {
    let mut text = String::new();
    for (addr, data) in records {
        text.push_str(&hex::encode_data_record(*addr, data).unwrap().to_string());
        text.push_str("\r\n");
    }
    text.push_str(hex::END_RECORD);
    text.push_str("\r\n");
    text
}

fn frames_with(target: &DummyTarget, opcode: u8) -> Vec<Frame> {
    target
        .frames()
        .iter()
        .filter(|f| f[0] == opcode)
        .copied()
        .collect()
}

fn fuse_writes(target: &DummyTarget) -> Vec<u8> {
    target
        .frames()
        .iter()
        .filter(|f| f[0] == opcodes::WRITE_CONTROL && f[1] != opcodes::PROGRAMMING_ENABLE)
        .map(|f| f[1])
        .collect()
}

#[test]
fn test_read_signature_frames() {
    let mut session = session();
    session.link_mut().clear_frames();

    let signature = memory::read_signature(&mut session).unwrap();
    assert_eq!(signature, DeviceSignature([0x1E, 0x95, 0x0F]));
    assert!(signature.is_supported());
    assert_eq!(
        session.link().frames(),
        &[
            [0x30, 0x00, 0x00, 0x00],
            [0x30, 0x00, 0x01, 0x00],
            [0x30, 0x00, 0x02, 0x00],
        ]
    );
}

#[test]
fn test_target_ignores_bus_outside_reset() {
    let mut target = DummyTarget::new_default();
    assert_eq!(target.transfer(opcodes::WRITE_CONTROL), 0xFF);
    assert_eq!(target.transfer(opcodes::PROGRAMMING_ENABLE), 0xFF);
    assert!(!target.is_programming());
}

#[test]
fn test_sync_retries_with_reset_pulses() {
    let session = session_with(DummyConfig {
        sync_failures: 3,
        ..DummyConfig::default()
    });
    assert_eq!(session.state(), SessionState::Programming);
    assert_eq!(session.link().reset_pulses(), 3);
}

#[test]
fn test_sync_failure_is_fatal() {
    let mut session = IspSession::new(DummyTarget::new(DummyConfig {
        sync_failures: SYNC_ATTEMPTS,
        ..DummyConfig::default()
    }));
    assert_eq!(session.begin(), Err(Error::SyncFailed));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(memory::read_signature(&mut session), Err(Error::SyncFailed));
    assert!(session.link().frames().is_empty());
}

#[test]
fn test_scenario_a_program_flash() {
    let mut session = session();
    let stats =
        orchestrator::program_flash(&mut session, SCENARIO_A.as_bytes(), &mut NoProgress).unwrap();

    assert_eq!(stats.records, 2);
    assert_eq!(stats.pages_written, 1);
    assert_eq!(stats.bytes_written, 128);

    let target = session.link();
    assert_eq!(&target.flash()[..16], &SCENARIO_A_DATA);
    assert!(target.flash()[16..].iter().all(|&b| b == 0xFF));
    assert_eq!(target.protocol_violations(), 0);
}

#[test]
fn test_scenario_b_wrong_checksum() {
    let mut session = session();
    let input = ":10000000214601360121470136007EFE09D2190140\r\n:00000001FF\r\n";
    assert_eq!(
        orchestrator::program_flash(&mut session, input.as_bytes(), &mut NoProgress),
        Err(Error::Parse {
            line: 1,
            kind: ParseError::WrongChecksum
        })
    );
    let page_writes = frames_with(session.link(), opcodes::WRITE_FLASH_PAGE);
    assert!(page_writes.is_empty());
}

#[test]
fn test_flash_page_frames() {
    let mut session = session();
    let mut page = PageBuffer::new(MemoryRegion::Flash, 0x0180);
    page.set(0x0180, 0x0C).unwrap();
    page.set(0x0181, 0x94).unwrap();
    memory::erase_chip(&mut session).unwrap();
    session.link_mut().clear_frames();

    memory::write_page(&mut session, &page, false).unwrap();

    let frames = session.link().frames();
    assert_eq!(frames[0], [0x40, 0x00, 0x00, 0x0C]);
    assert_eq!(frames[1], [0x48, 0x00, 0x00, 0x94]);
    assert_eq!(frames[2], [0x40, 0x00, 0x01, 0xFF]);
    assert_eq!(frames[127], [0x48, 0x00, 0x3F, 0xFF]);
    assert_eq!(frames[128], [0x4C, 0x00, 0xC0, 0x00]);
    assert_eq!(frames[129][0], opcodes::POLL_READY);
    assert_eq!(&session.link().flash()[0x180..0x182], &[0x0C, 0x94]);
}

#[test]
fn test_flash_page_needs_erase() {
    let mut session = session();
    let mut page = PageBuffer::new(MemoryRegion::Flash, 0);
    page.set(0, 0x0C).unwrap();
    session.link_mut().clear_frames();

    assert!(!session.is_erased());
    assert_eq!(
        memory::write_page(&mut session, &page, true),
        Err(Error::NotErased)
    );
    assert!(session.link().frames().is_empty());

    memory::erase_chip(&mut session).unwrap();
    assert!(session.is_erased());
    memory::write_page(&mut session, &page, true).unwrap();
    assert_eq!(session.link().flash()[0], 0x0C);
}

#[test]
fn test_erase_reads_erased_value() {
    let mut session = session();
    session.link_mut().flash_mut().fill(0x00);

    memory::erase_chip(&mut session).unwrap();

    let mut buf = [0u8; 64];
    memory::read(&mut session, MemoryRegion::Flash, 0, &mut buf).unwrap();
    assert!(buf.iter().all(|&b| b == 0xFF));
    let tail = (FLASH_SIZE - 64) as u16;
    memory::read(&mut session, MemoryRegion::Flash, tail, &mut buf).unwrap();
    assert!(buf.iter().all(|&b| b == 0xFF));
    assert!(session.link().flash().iter().all(|&b| b == 0xFF));
}

#[test]
fn test_erase_keeps_eeprom_with_eesave() {
    let mut preserved = session_with(DummyConfig {
        high: 0xD1,
        ..DummyConfig::default()
    });
    preserved.link_mut().eeprom_mut()[0] = 0x42;
    memory::erase_chip(&mut preserved).unwrap();
    assert_eq!(preserved.link().eeprom()[0], 0x42);

    let mut cleared = session();
    cleared.link_mut().eeprom_mut()[0] = 0x42;
    memory::erase_chip(&mut cleared).unwrap();
    assert_eq!(cleared.link().eeprom()[0], 0xFF);
}

#[test]
fn test_verify_failure_aborts_pass() {
    let mut session = session();
    session.link_mut().stick_byte(MemoryRegion::Flash, 5, 0x00);

    assert_eq!(
        orchestrator::program_flash(&mut session, SCENARIO_A.as_bytes(), &mut NoProgress),
        Err(Error::Verify {
            region: MemoryRegion::Flash,
            addr: 5,
            expected: 0x21,
            found: 0x00
        })
    );
}

#[test]
fn test_write_page_fails_only_on_mismatch() {
    let mut session = session();
    let mut page = PageBuffer::new(MemoryRegion::Flash, 0);
    page.set(0, 0x0F).unwrap();
    memory::erase_chip(&mut session).unwrap();
    memory::write_page(&mut session, &page, true).unwrap();

    // Rewriting without a second erase can only clear more bits
    page.set(0, 0xF0).unwrap();
    assert_eq!(
        memory::write_page(&mut session, &page, true),
        Err(Error::Verify {
            region: MemoryRegion::Flash,
            addr: 0,
            expected: 0xF0,
            found: 0x00
        })
    );
}

#[test]
fn test_record_out_of_range() {
    let mut session = session();
    let input = hex_file(&[(0x7FF8, &[0u8; 16])]);
    assert_eq!(
        orchestrator::program_flash(&mut session, input.as_bytes(), &mut NoProgress),
        Err(Error::AddressOutOfRange {
            region: MemoryRegion::Flash,
            addr: 0x7FF8,
            len: 16
        })
    );

    let input = hex_file(&[(0x03FE, &[1, 2, 3])]);
    assert_eq!(
        orchestrator::program_eeprom(&mut session, input.as_bytes(), &mut NoProgress),
        Err(Error::AddressOutOfRange {
            region: MemoryRegion::Eeprom,
            addr: 0x03FE,
            len: 3
        })
    );
}

#[test]
fn test_pages_flushed_once_in_first_touched_order() {
    let mut session = session();
    let input = hex_file(&[
        (0x0100, &[1, 2, 3, 4]),
        (0x0104, &[5, 6]),
        (0x0000, &[7, 8]),
        (0x0180, &[9]),
    ]);

    let stats =
        orchestrator::program_flash(&mut session, input.as_bytes(), &mut NoProgress).unwrap();

    assert_eq!(stats.pages_written, 3);
    assert_eq!(
        frames_with(session.link(), opcodes::WRITE_FLASH_PAGE),
        vec![
            [0x4C, 0x00, 0x80, 0x00],
            [0x4C, 0x00, 0x00, 0x00],
            [0x4C, 0x00, 0xC0, 0x00]
        ]
    );
    let flash = session.link().flash();
    assert_eq!(&flash[0x100..0x106], &[1, 2, 3, 4, 5, 6]);
    assert_eq!(&flash[0x000..0x002], &[7, 8]);
    assert_eq!(flash[0x180], 9);
}

#[test]
fn test_record_straddling_pages_is_split() {
    let mut session = session();
    let input = hex_file(&[(0x007C, &[1, 2, 3, 4, 5, 6, 7, 8])]);

    let stats =
        orchestrator::program_flash(&mut session, input.as_bytes(), &mut NoProgress).unwrap();

    assert_eq!(stats.pages_written, 2);
    assert_eq!(
        &session.link().flash()[0x7C..0x84],
        &[1, 2, 3, 4, 5, 6, 7, 8]
    );
}

#[test]
fn test_extended_address_forwarded() {
    let mut session = session();
    let input = std::format!(":020000040001F9\r\n{}", SCENARIO_A);

    orchestrator::program_flash(&mut session, input.as_bytes(), &mut NoProgress).unwrap();

    assert_eq!(session.link().extended_address(), 0x01);
    assert_eq!(
        frames_with(session.link(), opcodes::LOAD_EXTENDED_ADDRESS),
        vec![[0x4D, 0x00, 0x01, 0x00]]
    );
}

#[test]
fn test_record_validation() {
    let mut session = session();

    // End record with a non-zero address
    assert_eq!(
        orchestrator::program_flash(&mut session, &b":00000101FE\r\n"[..], &mut NoProgress),
        Err(Error::MalformedRecord { line: 1 })
    );
    // Extended address record with one data byte
    assert_eq!(
        orchestrator::program_flash(&mut session, &b":0100000400FB\r\n"[..], &mut NoProgress),
        Err(Error::MalformedRecord { line: 1 })
    );
    // Segment address records are not handled
    let input = std::format!("{}:020000021000EC\r\n", &SCENARIO_A[..45]);
    assert_eq!(
        orchestrator::program_flash(&mut session, input.as_bytes(), &mut NoProgress),
        Err(Error::UnexpectedType {
            line: 2,
            record_type: RecordType::ExtendedSegmentAddress
        })
    );
    // No end record at all
    assert_eq!(
        orchestrator::program_flash(&mut session, &SCENARIO_A.as_bytes()[..45], &mut NoProgress),
        Err(Error::UnexpectedEof)
    );
}

#[test]
fn test_program_eeprom_per_byte() {
    let mut session = session();
    let input = hex_file(&[(0x0010, &[0xDE, 0xAD, 0xBE, 0xEF])]);
    session.link_mut().clear_frames();

    let stats =
        orchestrator::program_eeprom(&mut session, input.as_bytes(), &mut NoProgress).unwrap();

    assert_eq!(stats.bytes_written, 4);
    assert_eq!(stats.pages_written, 0);
    assert_eq!(
        &session.link().eeprom()[0x10..0x14],
        &[0xDE, 0xAD, 0xBE, 0xEF]
    );
    assert_eq!(
        frames_with(session.link(), opcodes::WRITE_EEPROM),
        vec![
            [0xC0, 0x00, 0x10, 0xDE],
            [0xC0, 0x00, 0x11, 0xAD],
            [0xC0, 0x00, 0x12, 0xBE],
            [0xC0, 0x00, 0x13, 0xEF]
        ]
    );
    let control_writes = frames_with(session.link(), opcodes::WRITE_CONTROL);
    assert!(control_writes.is_empty());

    // Extended address records have no meaning for EEPROM
    let input = std::format!(":020000040000FA\r\n{}", hex::END_RECORD);
    assert_eq!(
        orchestrator::program_eeprom(&mut session, input.as_bytes(), &mut NoProgress),
        Err(Error::UnexpectedType {
            line: 1,
            record_type: RecordType::ExtendedLinearAddress
        })
    );
}

#[test]
fn test_eeprom_write_byte_verify() {
    let mut session = session();
    session.link_mut().stick_byte(MemoryRegion::Eeprom, 0x20, 0x00);
    memory::write_eeprom_byte(&mut session, 0x21, 0x55, true).unwrap();
    assert!(matches!(
        memory::write_eeprom_byte(&mut session, 0x20, 0x55, true),
        Err(Error::Verify { addr: 0x20, .. })
    ));
    // Without verify the mismatch goes unnoticed
    memory::write_eeprom_byte(&mut session, 0x20, 0x55, false).unwrap();
}

#[test]
fn test_eeprom_page_write() {
    let mut session = session();
    let mut page = PageBuffer::new(MemoryRegion::Eeprom, 0x0009);
    page.set(0x0008, 0x11).unwrap();
    page.set(0x000B, 0x44).unwrap();
    session.link_mut().clear_frames();

    memory::write_page(&mut session, &page, true).unwrap();

    let frames = session.link().frames();
    assert_eq!(
        &frames[..5],
        &[
            [0xC1, 0x00, 0x00, 0x11],
            [0xC1, 0x00, 0x01, 0xFF],
            [0xC1, 0x00, 0x02, 0xFF],
            [0xC1, 0x00, 0x03, 0x44],
            [0xC2, 0x00, 0x08, 0x00]
        ]
    );
    assert_eq!(&session.link().eeprom()[8..12], &[0x11, 0xFF, 0xFF, 0x44]);
}

#[test]
fn test_fuse_frames() {
    let mut session = session();
    session.link_mut().clear_frames();

    let low = memory::read_fuse(&mut session, FuseKind::Low).unwrap();
    let high = memory::read_fuse(&mut session, FuseKind::High).unwrap();
    let extended = memory::read_fuse(&mut session, FuseKind::Extended).unwrap();
    let lock = memory::read_fuse(&mut session, FuseKind::Lock).unwrap();
    assert_eq!([low, high, extended, lock], [0x62, 0xD9, 0xFF, 0xFF]);
    assert_eq!(
        session.link().frames(),
        &[
            [0x50, 0x00, 0x00, 0x00],
            [0x58, 0x08, 0x00, 0x00],
            [0x50, 0x08, 0x00, 0x00],
            [0x58, 0x00, 0x00, 0x00]
        ]
    );

    session.link_mut().clear_frames();
    memory::write_fuse(&mut session, FuseKind::Extended, 0xFD).unwrap();
    assert_eq!(session.link().frames()[0], [0xAC, 0xA4, 0x00, 0xFD]);
    assert_eq!(session.link().fuses().extended, 0xFD);
    assert_eq!(session.link().fuses().low, 0x62);
}

#[test]
fn test_scenario_c_restore_without_lock() {
    let mut session = session();
    session.link_mut().clear_frames();

    let fuses = orchestrator::restore_fuses(&mut session, SCENARIO_C.as_bytes(), false).unwrap();

    assert_eq!((fuses.low, fuses.high, fuses.extended), (0xE2, 0xD9, 0xFD));
    let target = session.link();
    assert_eq!(target.fuses().low, 0xE2);
    assert_eq!(target.fuses().high, 0xD9);
    assert_eq!(target.fuses().extended, 0xFD);
    assert_eq!(target.fuses().lock, 0xFF);
    assert_eq!(fuse_writes(target), vec![0xA0, 0xA8, 0xA4]);
    assert_eq!(target.reset_pulses(), 3);
    assert_eq!(session.state(), SessionState::Programming);
}

#[test]
fn test_restore_with_lock_writes_lock_last() {
    let mut session = session();
    session.link_mut().clear_frames();

    orchestrator::restore_fuses(&mut session, &b"LB:CF\r\nL:E2;H:D9;E:FD\r\n"[..], true).unwrap();

    let target = session.link();
    assert_eq!(fuse_writes(target), vec![0xA0, 0xA8, 0xA4, 0xE0]);
    assert_eq!(target.fuses().lock, 0xCF);
    assert_eq!(target.reset_pulses(), 4);
}

#[test]
fn test_restore_parses_before_writing() {
    let mut session = session();
    session.link_mut().clear_frames();

    assert_eq!(
        orchestrator::restore_fuses(&mut session, &b"LB:FF\nL:E2;H:D9\n"[..], false),
        Err(Error::FuseFormat)
    );
    assert!(session.link().frames().is_empty());
}

#[test]
fn test_backup_fuses_text() {
    let mut session = session();
    let mut text = Vec::new();
    orchestrator::backup_fuses(&mut session, &mut text).unwrap();
    assert_eq!(text, b"LB:FF\r\nL:62;H:D9;E:FF\r\n");
}

#[test]
fn test_scenario_d_round_trip() {
    let mut session = session();
    let original: Vec<u8> = (0..0x7000usize)
        .map(|i| match i {
            0x0040..=0x005F => 0xFF,
            0x0200..=0x6FE0 => 0xFF,
            _ => (i as u8) ^ 0x5A,
        })
        .collect();
    session.link_mut().flash_mut()[..0x7000].copy_from_slice(&original);

    let mut dump = Vec::new();
    let stats = orchestrator::dump_flash(&mut session, &mut dump, &mut NoProgress).unwrap();
    let text = String::from_utf8(dump).unwrap();
    assert!(!text.contains(":10004000"));
    assert!(!text.contains(":10005000"));
    assert!(text.ends_with(":00000001FF\r\n"));
    assert_eq!(stats.lines_emitted, text.lines().count());

    session.link_mut().flash_mut().fill(0x00);
    orchestrator::program_flash(&mut session, text.as_bytes(), &mut NoProgress).unwrap();

    let flash = session.link().flash();
    assert_eq!(&flash[..0x7000], original.as_slice());
    assert!(flash[0x7000..].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_dump_tail_follows_boot_size() {
    let mut session = session_with(DummyConfig {
        high: 0xDE,
        ..DummyConfig::default()
    });
    session.link_mut().flash_mut().fill(0x00);

    let mut dump = Vec::new();
    let stats = orchestrator::dump_flash(&mut session, &mut dump, &mut NoProgress).unwrap();

    assert_eq!(stats.lines_emitted, 0x7E00 / 16 + 1);
    let text = String::from_utf8(dump).unwrap();
    let last_data = text.lines().rev().nth(1).unwrap();
    assert!(last_data.starts_with(":107DF000"));
}

#[test]
fn test_dump_eeprom_skips_erased_lines() {
    let mut session = session();
    session.link_mut().eeprom_mut()[0x23] = 0x42;

    let mut dump = Vec::new();
    let stats = orchestrator::dump_eeprom(&mut session, &mut dump, &mut NoProgress).unwrap();

    assert_eq!(stats.lines_emitted, 2);
    let text = String::from_utf8(dump).unwrap();
    let first = hex::decode_line(text.lines().next().unwrap().as_bytes()).unwrap();
    assert_eq!(first.address, 0x0020);
    assert_eq!(first.data[3], 0x42);
}

#[test]
fn test_no_instruction_while_busy() {
    let mut session = session_with(DummyConfig {
        busy_polls: 5,
        ..DummyConfig::default()
    });
    let input = hex_file(&[(0x0000, &[1; 16]), (0x0200, &[2; 16])]);
    orchestrator::program_flash(&mut session, input.as_bytes(), &mut NoProgress).unwrap();
    orchestrator::restore_fuses(&mut session, SCENARIO_C.as_bytes(), false).unwrap();
    assert_eq!(session.link().protocol_violations(), 0);
}

#[test]
fn test_ready_timeout() {
    let mut session = session_with(DummyConfig {
        busy_polls: 100_000,
        ..DummyConfig::default()
    });
    assert_eq!(memory::erase_chip(&mut session), Err(Error::Timeout));
}

// Session workflow over in-memory files

#[derive(Default)]
struct MemStorage {
    files: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
    read_only: Vec<&'static str>,
}

impl MemStorage {
    fn with(files: &[(&str, &str)]) -> Self {
        let storage = Self::default();
        for (name, text) in files {
            storage
                .files
                .borrow_mut()
                .insert(name.to_string(), text.as_bytes().to_vec());
        }
        storage
    }

    fn text(&self, name: &str) -> Option<String> {
        let files = self.files.borrow();
        files.get(name).map(|data| String::from_utf8_lossy(data).into_owned())
    }
}

struct MemReader {
    data: Vec<u8>,
    pos: usize,
}

impl LineSource for MemReader {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.data.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }
}

struct MemWriter {
    name: String,
    files: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

impl LineSink for MemWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.files
            .borrow_mut()
            .entry(self.name.clone())
            .or_default()
            .extend_from_slice(bytes);
        Ok(())
    }
}

impl Storage for MemStorage {
    type Reader = MemReader;
    type Writer = MemWriter;

    fn exists(&mut self, name: &str) -> bool {
        self.files.borrow().contains_key(name)
    }

    fn open(&mut self, name: &str) -> Result<MemReader> {
        let data = self.files.borrow().get(name).cloned().ok_or(Error::NotFound)?;
        Ok(MemReader { data, pos: 0 })
    }

    fn create(&mut self, name: &str) -> Result<MemWriter> {
        if self.read_only.iter().any(|n| *n == name) {
            return Err(Error::Io);
        }
        self.files.borrow_mut().insert(name.to_string(), Vec::new());
        Ok(MemWriter {
            name: name.to_string(),
            files: Rc::clone(&self.files),
        })
    }
}

#[test]
fn test_session_programs_present_files() {
    let eeprom_hex = hex_file(&[(0x0000, &[0xAA, 0xBB])]);
    let mut storage = MemStorage::with(&[
        (orchestrator::FIRMWARE_INPUT, SCENARIO_A),
        (orchestrator::EEPROM_INPUT, &eeprom_hex),
        (orchestrator::FUSES_INPUT, SCENARIO_C),
    ]);
    let mut session = IspSession::new(DummyTarget::new_default());

    let report = orchestrator::run_session(
        &mut session,
        &mut storage,
        SessionOptions::default(),
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(report.signature, Some(DeviceSignature([0x1E, 0x95, 0x0F])));
    assert!(report.fuses_backed_up && report.eeprom_backed_up && report.firmware_backed_up);
    assert_eq!(report.firmware.map(|s| s.pages_written), Some(1));
    assert_eq!(report.eeprom.map(|s| s.bytes_written), Some(2));
    assert_eq!(report.fuses.map(|f| f.low), Some(0xE2));

    assert_eq!(
        storage.text(orchestrator::FUSES_BACKUP).as_deref(),
        Some("LB:FF\r\nL:62;H:D9;E:FF\r\n")
    );
    assert_eq!(
        storage.text(orchestrator::EEPROM_BACKUP).as_deref(),
        Some(":00000001FF\r\n")
    );
    assert_eq!(
        storage.text(orchestrator::FIRMWARE_BACKUP).as_deref(),
        Some(":00000001FF\r\n")
    );

    let target = session.link();
    assert_eq!(&target.flash()[..16], &SCENARIO_A_DATA);
    assert_eq!(&target.eeprom()[..2], &[0xAA, 0xBB]);
    assert_eq!(target.fuses().extended, 0xFD);
    assert!(target.is_released());
    assert_eq!(target.protocol_violations(), 0);
}

#[test]
fn test_session_skips_missing_inputs() {
    let mut storage = MemStorage::default();
    let mut session = IspSession::new(DummyTarget::new_default());
    session.link_mut().flash_mut()[0] = 0x12;

    let report = orchestrator::run_session(
        &mut session,
        &mut storage,
        SessionOptions::default(),
        &mut NoProgress,
    )
    .unwrap();

    assert!(report.firmware.is_none() && report.eeprom.is_none() && report.fuses.is_none());
    assert!(storage.text(orchestrator::FIRMWARE_BACKUP).unwrap().starts_with(":1000000012"));
    assert_eq!(session.link().flash()[0], 0x12);
    assert!(frames_with(session.link(), opcodes::WRITE_CONTROL)
        .iter()
        .all(|f| f[1] == opcodes::PROGRAMMING_ENABLE));
}

#[test]
fn test_session_rejects_unknown_signature() {
    let mut storage = MemStorage::with(&[(orchestrator::FIRMWARE_INPUT, SCENARIO_A)]);
    let mut session = IspSession::new(DummyTarget::new(DummyConfig {
        signature: [0x1E, 0x95, 0x16],
        ..DummyConfig::default()
    }));

    assert_eq!(
        orchestrator::run_session(
            &mut session,
            &mut storage,
            SessionOptions::default(),
            &mut NoProgress
        ),
        Err(Error::UnsupportedSignature([0x1E, 0x95, 0x16]))
    );
    assert!(storage.text(orchestrator::FUSES_BACKUP).is_none());
    assert!(session.link().is_released());
}

#[test]
fn test_session_stops_at_first_failure() {
    let bad = SCENARIO_A.replace("0141", "0140");
    let eeprom_hex = hex_file(&[(0x0000, &[0xAA])]);
    let mut storage = MemStorage::with(&[
        (orchestrator::FIRMWARE_INPUT, &bad),
        (orchestrator::EEPROM_INPUT, &eeprom_hex),
    ]);
    let mut session = IspSession::new(DummyTarget::new_default());

    assert_eq!(
        orchestrator::run_session(
            &mut session,
            &mut storage,
            SessionOptions::default(),
            &mut NoProgress
        ),
        Err(Error::Parse {
            line: 1,
            kind: ParseError::WrongChecksum
        })
    );
    let eeprom_writes = frames_with(session.link(), opcodes::WRITE_EEPROM);
    assert!(eeprom_writes.is_empty());
    assert!(session.link().is_released());
}

#[test]
fn test_session_backup_failure_not_fatal() {
    let mut storage = MemStorage::with(&[(orchestrator::FIRMWARE_INPUT, SCENARIO_A)]);
    storage.read_only.push(orchestrator::EEPROM_BACKUP);
    let mut session = IspSession::new(DummyTarget::new_default());

    let report = orchestrator::run_session(
        &mut session,
        &mut storage,
        SessionOptions::default(),
        &mut NoProgress,
    )
    .unwrap();

    assert!(report.fuses_backed_up);
    assert!(!report.eeprom_backed_up);
    assert!(report.firmware_backed_up);
    assert!(report.firmware.is_some());
}

#[test]
fn test_session_lock_only_on_request() {
    let mut storage = MemStorage::with(&[(orchestrator::FUSES_INPUT, "LB:CF\nL:E2;H:D9;E:FD\n")]);
    let mut session = IspSession::new(DummyTarget::new_default());
    orchestrator::run_session(
        &mut session,
        &mut storage,
        SessionOptions::default(),
        &mut NoProgress,
    )
    .unwrap();
    assert_eq!(session.link().fuses().lock, 0xFF);

    let mut session = IspSession::new(DummyTarget::new_default());
    orchestrator::run_session(
        &mut session,
        &mut storage,
        SessionOptions { write_lock: true },
        &mut NoProgress,
    )
    .unwrap();
    assert_eq!(session.link().fuses().lock, 0xCF);
}
