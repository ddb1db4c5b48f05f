//! Linux GPIO ISP bitbanging device implementation
//!
//! This module provides the `LinuxGpioIsp` struct that implements the
//! `IspLink` trait using Linux's GPIO character device interface (gpiocdev).
//!
//! SCK, MOSI and RESET are driven as outputs and MISO is read as an input.
//! RESET is driven directly: a low level holds the target in reset.

use std::thread;
use std::time::Duration;

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use avrisp_core::programmer::bitbang::{self, BitbangIsp};
use avrisp_core::programmer::IspLink;

/// GPIO line indices
#[derive(Debug, Clone, Copy)]
enum Line {
    Sck = 0,
    Mosi = 1,
    Miso = 2,
    Reset = 3,
}

/// Number of GPIO lines used
const NUM_LINES: usize = 4;

/// Default bit delay in nanoseconds
///
/// Serial programming needs SCK phases longer than two target clock
/// cycles. 5 µs keeps a 1 MHz factory-fused part safe.
const DEFAULT_BIT_DELAY_NS: u64 = 5000;

/// Smallest accepted bit delay in nanoseconds
const MIN_BIT_DELAY_NS: u64 = 500;

/// Configuration for opening a Linux GPIO ISP link
#[derive(Debug, Clone)]
pub struct LinuxGpioIspConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// SCK GPIO line offset
    pub sck: Offset,
    /// MOSI GPIO line offset
    pub mosi: Offset,
    /// MISO GPIO line offset
    pub miso: Offset,
    /// RESET GPIO line offset
    pub reset: Offset,
    /// Delay held at each clock level, in nanoseconds
    pub bit_delay_ns: u64,
}

impl Default for LinuxGpioIspConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            sck: 0,
            mosi: 0,
            miso: 0,
            reset: 0,
            bit_delay_ns: DEFAULT_BIT_DELAY_NS,
        }
    }
}

impl LinuxGpioIspConfig {
    /// Create a new configuration with the given device path and pins
    pub fn new(
        device: impl Into<String>,
        sck: Offset,
        mosi: Offset,
        miso: Offset,
        reset: Offset,
    ) -> Self {
        Self {
            device: device.into(),
            sck,
            mosi,
            miso,
            reset,
            ..Default::default()
        }
    }

    /// Set the bit delay in nanoseconds, clamped to the minimum
    pub fn with_bit_delay_ns(mut self, ns: u64) -> Self {
        self.bit_delay_ns = ns.max(MIN_BIT_DELAY_NS);
        self
    }

    fn offsets(&self) -> [Offset; NUM_LINES] {
        let mut offsets = [0; NUM_LINES];
        offsets[Line::Sck as usize] = self.sck;
        offsets[Line::Mosi as usize] = self.mosi;
        offsets[Line::Miso as usize] = self.miso;
        offsets[Line::Reset as usize] = self.reset;
        offsets
    }
}

/// Line configuration while the target is being programmed
///
/// RESET starts low so the target stops running as soon as the lines are
/// claimed.
fn driven_config(offsets: &[Offset; NUM_LINES]) -> Config {
    let mut config = Config::default();
    config
        .with_line(offsets[Line::Sck as usize])
        .as_output(Value::Inactive);
    config
        .with_line(offsets[Line::Mosi as usize])
        .as_output(Value::Inactive);
    config.with_line(offsets[Line::Miso as usize]).as_input();
    config
        .with_line(offsets[Line::Reset as usize])
        .as_output(Value::Inactive);
    config
}

/// Line configuration once the session is over: everything floats
fn released_config(offsets: &[Offset; NUM_LINES]) -> Config {
    let mut config = Config::default();
    for &offset in offsets {
        config.with_line(offset).as_input();
    }
    config
}

/// Linux GPIO ISP programmer using bitbanging
///
/// Implements `BitbangIsp` for the pin-level primitives and `IspLink` on top
/// of them.
pub struct LinuxGpioIsp {
    /// GPIO line request handle
    request: Request,
    /// GPIO line offsets indexed by Line enum
    offsets: [Offset; NUM_LINES],
    /// Bit delay in nanoseconds
    bit_delay_ns: u64,
    /// Lines are currently inputs
    released: bool,
}

impl LinuxGpioIsp {
    /// Open a Linux GPIO ISP link with the given configuration
    pub fn open(config: &LinuxGpioIspConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }

        let offsets = config.offsets();
        for (i, offset) in offsets.iter().enumerate() {
            if offsets[..i].contains(offset) {
                return Err(LinuxGpioError::DuplicateLine(*offset));
            }
        }

        log::debug!("linux_gpio: Opening device {}", config.device);

        let request = Request::from_config(driven_config(&offsets))
            .on_chip(&config.device)
            .with_consumer("avrisp")
            .request()
            .map_err(LinuxGpioError::LineRequestFailed)?;

        log::info!(
            "linux_gpio: Opened {} (sck={}, mosi={}, miso={}, reset={}, delay={}ns)",
            config.device,
            config.sck,
            config.mosi,
            config.miso,
            config.reset,
            config.bit_delay_ns
        );

        Ok(Self {
            request,
            offsets,
            bit_delay_ns: config.bit_delay_ns.max(MIN_BIT_DELAY_NS),
            released: false,
        })
    }

    fn set_line(&self, line: Line, high: bool, signal: &'static str) {
        let value = if high { Value::Active } else { Value::Inactive };
        if let Err(source) = self.request.set_value(self.offsets[line as usize], value) {
            log::error!("{}", LinuxGpioError::SignalFailed { signal, source });
        }
    }

    /// Drive the lines again after a release
    fn reclaim(&mut self) {
        if let Err(e) = self.request.reconfigure(&driven_config(&self.offsets)) {
            log::error!("{}", LinuxGpioError::ReconfigureFailed(e));
        }
        self.released = false;
    }
}

impl BitbangIsp for LinuxGpioIsp {
    fn set_sck(&mut self, high: bool) {
        self.set_line(Line::Sck, high, "SCK");
    }

    fn set_mosi(&mut self, high: bool) {
        self.set_line(Line::Mosi, high, "MOSI");
    }

    fn get_miso(&self) -> bool {
        match self.request.value(self.offsets[Line::Miso as usize]) {
            Ok(Value::Active) => true,
            Ok(Value::Inactive) => false,
            Err(source) => {
                log::error!(
                    "{}",
                    LinuxGpioError::SignalFailed {
                        signal: "MISO",
                        source
                    }
                );
                false
            }
        }
    }

    fn bit_delay(&self) {
        thread::sleep(Duration::from_nanos(self.bit_delay_ns));
    }
}

impl IspLink for LinuxGpioIsp {
    fn transfer(&mut self, byte: u8) -> u8 {
        bitbang::transfer(self, byte)
    }

    fn set_reset(&mut self, asserted: bool) {
        if self.released {
            self.reclaim();
        }
        // RESET is active low
        self.set_line(Line::Reset, !asserted, "RESET");
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.request.reconfigure(&released_config(&self.offsets)) {
            log::error!("{}", LinuxGpioError::ReconfigureFailed(e));
        }
        self.released = true;
        log::debug!("linux_gpio: Lines released");
    }
}

fn parse_line(name: &'static str, value: &str) -> Result<Offset> {
    value.parse().map_err(|_| LinuxGpioError::InvalidLineNumber {
        name,
        value: value.to_string(),
    })
}

/// Parse programmer options into a configuration
///
/// Accepted keys: `dev`, `gpiochip`, `sck`, `mosi`, `miso`, `reset` and
/// `delay_ns`.
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxGpioIspConfig> {
    let mut config = LinuxGpioIspConfig::default();
    let mut gpiochip: Option<u32> = None;
    let mut sck = None;
    let mut mosi = None;
    let mut miso = None;
    let mut reset = None;

    for (key, value) in options {
        match *key {
            "dev" => config.device = value.to_string(),
            "gpiochip" => {
                gpiochip = Some(value.parse().map_err(|_| {
                    LinuxGpioError::InvalidParameter(format!("gpiochip={}", value))
                })?);
            }
            "sck" => sck = Some(parse_line("sck", value)?),
            "mosi" => mosi = Some(parse_line("mosi", value)?),
            "miso" => miso = Some(parse_line("miso", value)?),
            "reset" | "rst" => reset = Some(parse_line("reset", value)?),
            "delay_ns" => {
                let ns: u64 = value.parse().map_err(|_| {
                    LinuxGpioError::InvalidParameter(format!("delay_ns={}", value))
                })?;
                config = config.with_bit_delay_ns(ns);
            }
            _ => log::warn!("linux_gpio: Unknown option: {}={}", key, value),
        }
    }

    if config.device.is_empty() {
        match gpiochip {
            Some(n) => config.device = format!("/dev/gpiochip{}", n),
            None => return Err(LinuxGpioError::NoDevice),
        }
    } else if gpiochip.is_some() {
        return Err(LinuxGpioError::InvalidParameter(
            "only one of 'dev' or 'gpiochip' can be specified".to_string(),
        ));
    }

    config.sck = sck.ok_or(LinuxGpioError::MissingParameter("sck"))?;
    config.mosi = mosi.ok_or(LinuxGpioError::MissingParameter("mosi"))?;
    config.miso = miso.ok_or(LinuxGpioError::MissingParameter("miso"))?;
    config.reset = reset.ok_or(LinuxGpioError::MissingParameter("reset"))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PINS: [(&str, &str); 4] = [
        ("sck", "11"),
        ("mosi", "10"),
        ("miso", "9"),
        ("reset", "25"),
    ];

    #[test]
    fn test_parse_options_gpiochip() {
        let mut options = vec![("gpiochip", "0")];
        options.extend_from_slice(&PINS);
        let config = parse_options(&options).unwrap();
        assert_eq!(config.device, "/dev/gpiochip0");
        assert_eq!(
            (config.sck, config.mosi, config.miso, config.reset),
            (11, 10, 9, 25)
        );
        assert_eq!(config.bit_delay_ns, DEFAULT_BIT_DELAY_NS);
    }

    #[test]
    fn test_parse_options_delay_clamped() {
        let mut options = vec![("dev", "/dev/gpiochip1"), ("delay_ns", "100")];
        options.extend_from_slice(&PINS);
        let config = parse_options(&options).unwrap();
        assert_eq!(config.device, "/dev/gpiochip1");
        assert_eq!(config.bit_delay_ns, MIN_BIT_DELAY_NS);
    }

    #[test]
    fn test_parse_options_errors() {
        assert!(matches!(
            parse_options(&PINS),
            Err(LinuxGpioError::NoDevice)
        ));
        assert!(matches!(
            parse_options(&[("gpiochip", "0"), PINS[0], PINS[1], PINS[2]]),
            Err(LinuxGpioError::MissingParameter("reset"))
        ));
        assert!(matches!(
            parse_options(&[("gpiochip", "0"), ("sck", "x")]),
            Err(LinuxGpioError::InvalidLineNumber { name: "sck", .. })
        ));
        assert!(matches!(
            parse_options(&[("gpiochip", "0"), ("dev", "/dev/gpiochip0")]),
            Err(LinuxGpioError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_open_rejects_shared_lines() {
        let config = LinuxGpioIspConfig::new("/dev/gpiochip0", 11, 10, 11, 25);
        assert!(matches!(
            LinuxGpioIsp::open(&config),
            Err(LinuxGpioError::DuplicateLine(11))
        ));
    }
}
