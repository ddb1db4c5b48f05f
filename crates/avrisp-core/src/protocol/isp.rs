//! ISP command framing and session state

use crate::error::{Error, Result};
use crate::programmer::IspLink;

use super::opcodes;

/// Programming-enable attempts before giving up
pub const SYNC_ATTEMPTS: u32 = 5;
/// Time the target needs after RESET goes low, in milliseconds
pub const SYNC_SETTLE_MS: u32 = 20;
/// Delay between RDY/BSY polls, in milliseconds
pub const READY_POLL_MS: u32 = 1;
/// Longest write cycle waited for before reporting a timeout, in milliseconds
///
/// Chip erase is the slowest operation at roughly 10 ms.
pub const READY_TIMEOUT_MS: u32 = 500;

/// A 4-byte instruction frame
pub type Frame = [u8; 4];

/// Transfer a frame and return the byte clocked in during the 4th byte
pub fn command<L: IspLink + ?Sized>(link: &mut L, frame: Frame) -> u8 {
    link.transfer(frame[0]);
    link.transfer(frame[1]);
    link.transfer(frame[2]);
    link.transfer(frame[3])
}

/// One programming-enable attempt
///
/// Returns true if the target echoed the second byte during the third,
/// which means it is in sync and accepting instructions.
pub fn try_programming_enable<L: IspLink + ?Sized>(link: &mut L) -> bool {
    link.set_reset(true);
    link.delay_ms(SYNC_SETTLE_MS);
    link.transfer(opcodes::WRITE_CONTROL);
    link.transfer(opcodes::PROGRAMMING_ENABLE);
    let echo = link.transfer(0x00);
    link.transfer(0x00);
    echo == opcodes::PROGRAMMING_ENABLE
}

/// Enter serial programming mode
///
/// Tries [`SYNC_ATTEMPTS`] times, pulsing reset after each failed attempt.
pub fn enter_programming_mode<L: IspLink + ?Sized>(link: &mut L) -> Result<()> {
    for attempt in 1..=SYNC_ATTEMPTS {
        if try_programming_enable(link) {
            log::debug!("isp: in sync after {} attempt(s)", attempt);
            return Ok(());
        }
        log::debug!("isp: no echo on attempt {}/{}", attempt, SYNC_ATTEMPTS);
        link.reset_pulse();
    }
    Err(Error::SyncFailed)
}

/// Poll RDY/BSY until the target finishes its write cycle
pub fn wait_ready<L: IspLink + ?Sized>(link: &mut L) -> Result<()> {
    let max_polls = READY_TIMEOUT_MS / READY_POLL_MS;
    for _ in 0..max_polls {
        let status = command(link, [opcodes::POLL_READY, 0x00, 0x00, 0x00]);
        if status & opcodes::BUSY_BIT == 0 {
            return Ok(());
        }
        link.delay_ms(READY_POLL_MS);
    }
    Err(Error::Timeout)
}

/// Protocol state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Link open, programming mode not entered
    Idle,
    /// Programming-enable retry loop running
    Syncing,
    /// Target in sync and accepting instructions
    Programming,
    /// Synchronisation failed; the session cannot continue
    Failed,
}

/// An ISP session with one target
///
/// Owns the link for the duration of the session. Instructions are only
/// accepted in [`SessionState::Programming`]; a synchronisation failure is
/// terminal. The link is released when the session is released or dropped.
/// Flash pages may only be written once the chip has been erased in this
/// session.
pub struct IspSession<L: IspLink> {
    link: L,
    state: SessionState,
    erased: bool,
    released: bool,
}

impl<L: IspLink> IspSession<L> {
    /// Create a session over a link
    pub fn new(link: L) -> Self {
        Self {
            link,
            state: SessionState::Idle,
            erased: false,
            released: false,
        }
    }

    /// Current protocol state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a chip erase has completed in this session
    pub fn is_erased(&self) -> bool {
        self.erased
    }

    pub(crate) fn mark_erased(&mut self) {
        self.erased = true;
    }

    /// Get a reference to the link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Get a mutable reference to the link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Enter programming mode
    pub fn begin(&mut self) -> Result<()> {
        if self.state == SessionState::Failed {
            return Err(Error::SyncFailed);
        }
        self.state = SessionState::Syncing;
        self.released = false;
        match enter_programming_mode(&mut self.link) {
            Ok(()) => {
                self.state = SessionState::Programming;
                Ok(())
            }
            Err(e) => {
                log::error!("isp: {}", e);
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Pulse reset and enter programming mode again
    ///
    /// Fuse changes only take effect after the target leaves and re-enters
    /// programming mode.
    pub fn resync(&mut self) -> Result<()> {
        self.ensure_programming()?;
        self.link.reset_pulse();
        self.begin()
    }

    /// Issue one instruction and return the reply byte
    pub fn command(&mut self, frame: Frame) -> Result<u8> {
        self.ensure_programming()?;
        log::trace!(
            "isp: {:02X} {:02X} {:02X} {:02X}",
            frame[0],
            frame[1],
            frame[2],
            frame[3]
        );
        Ok(command(&mut self.link, frame))
    }

    /// Wait for the current write cycle to complete
    pub fn wait_ready(&mut self) -> Result<()> {
        self.ensure_programming()?;
        wait_ready(&mut self.link)
    }

    /// Release RESET and put all lines into high impedance
    pub fn release(&mut self) {
        if !self.released {
            self.link.release();
            self.released = true;
        }
        if self.state == SessionState::Programming {
            self.state = SessionState::Idle;
        }
    }

    fn ensure_programming(&self) -> Result<()> {
        match self.state {
            SessionState::Programming => Ok(()),
            SessionState::Failed => Err(Error::SyncFailed),
            SessionState::Idle | SessionState::Syncing => Err(Error::NotSynchronized),
        }
    }
}

impl<L: IspLink> Drop for IspSession<L> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Link that echoes like a target and fails the first N syncs
    struct ScriptedLink {
        sync_failures: u32,
        in_reset: bool,
        last: u8,
        position: usize,
        busy_polls: u32,
        pulses: u32,
        delays: u32,
        released: bool,
    }

    impl ScriptedLink {
        fn new(sync_failures: u32) -> Self {
            Self {
                sync_failures,
                in_reset: false,
                last: 0,
                position: 0,
                busy_polls: 0,
                pulses: 0,
                delays: 0,
                released: false,
            }
        }
    }

    impl IspLink for ScriptedLink {
        fn transfer(&mut self, byte: u8) -> u8 {
            let position = self.position;
            self.position = (self.position + 1) % 4;
            let reply = match position {
                2 if self.sync_failures > 0 => {
                    self.sync_failures -= 1;
                    0xFF
                }
                3 if self.busy_polls > 0 => {
                    self.busy_polls -= 1;
                    0x01
                }
                3 => 0x00,
                _ => self.last,
            };
            self.last = byte;
            if self.in_reset {
                reply
            } else {
                0xFF
            }
        }

        fn set_reset(&mut self, asserted: bool) {
            self.in_reset = asserted;
            self.position = 0;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.delays += ms;
        }

        fn reset_pulse(&mut self) {
            self.pulses += 1;
            self.set_reset(false);
            self.set_reset(true);
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    #[test]
    fn test_sync_first_attempt() {
        let mut link = ScriptedLink::new(0);
        enter_programming_mode(&mut link).unwrap();
        assert_eq!(link.pulses, 0);
        assert_eq!(link.delays, SYNC_SETTLE_MS);
    }

    #[test]
    fn test_sync_retries_with_reset_pulse() {
        let mut link = ScriptedLink::new(4);
        enter_programming_mode(&mut link).unwrap();
        assert_eq!(link.pulses, 4);
    }

    #[test]
    fn test_sync_gives_up() {
        let mut link = ScriptedLink::new(5);
        assert_eq!(enter_programming_mode(&mut link), Err(Error::SyncFailed));
        assert_eq!(link.pulses, SYNC_ATTEMPTS);
    }

    #[test]
    fn test_wait_ready_polls_until_clear() {
        let mut link = ScriptedLink::new(0);
        link.in_reset = true;
        link.busy_polls = 3;
        wait_ready(&mut link).unwrap();
        assert_eq!(link.delays, 3 * READY_POLL_MS);
    }

    #[test]
    fn test_wait_ready_timeout() {
        let mut link = ScriptedLink::new(0);
        link.in_reset = true;
        link.busy_polls = u32::MAX;
        assert_eq!(wait_ready(&mut link), Err(Error::Timeout));
    }

    #[test]
    fn test_session_states() {
        let mut session = IspSession::new(ScriptedLink::new(0));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            session.command([0x30, 0, 0, 0]),
            Err(Error::NotSynchronized)
        );
        session.begin().unwrap();
        assert_eq!(session.state(), SessionState::Programming);
        session.release();
        assert!(session.link().released);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_session_failure_is_terminal() {
        let mut session = IspSession::new(ScriptedLink::new(SYNC_ATTEMPTS));
        assert_eq!(session.begin(), Err(Error::SyncFailed));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.begin(), Err(Error::SyncFailed));
        assert_eq!(session.wait_ready(), Err(Error::SyncFailed));
    }
}
