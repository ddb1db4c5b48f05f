//! avrisp-linux-gpio - Linux GPIO bitbang ISP link
//!
//! This crate drives an AVR target's serial programming interface from
//! plain GPIO pins using the Linux character device GPIO interface
//! (gpiocdev). No SPI controller is needed, so any board with four free
//! GPIOs (a Raspberry Pi, a BeagleBone) can act as the programmer.
//!
//! # Example
//!
//! ```no_run
//! use avrisp_core::memory;
//! use avrisp_core::protocol::IspSession;
//! use avrisp_linux_gpio::{LinuxGpioIsp, LinuxGpioIspConfig};
//!
//! let config = LinuxGpioIspConfig::new("/dev/gpiochip0", 11, 10, 9, 25);
//! //                                    device          SCK MOSI MISO RESET
//!
//! let mut session = IspSession::new(LinuxGpioIsp::open(&config)?);
//! session.begin()?;
//! println!("Signature: {}", memory::read_signature(&mut session)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with avrisp CLI
//!
//! ```bash
//! avrisp probe -p linux_gpio:gpiochip=0,sck=11,mosi=10,miso=9,reset=25
//!
//! # Slow the clock down for a target running from a 128 kHz oscillator
//! avrisp probe -p linux_gpio:dev=/dev/gpiochip0,sck=11,mosi=10,miso=9,reset=25,delay_ns=40000
//! ```
//!
//! # GPIO Pin Wiring
//!
//! | Target Pin | GPIO Function   | Description |
//! |------------|-----------------|-------------|
//! | SCK (PB5)  | SCK (output)    | Serial clock |
//! | MOSI (PB3) | MOSI (output)   | Data to the target |
//! | MISO (PB4) | MISO (input)    | Data from the target |
//! | RESET (PC6)| RESET (output)  | Held low while programming |
//! | GND        | GND             | Common ground |
//!
//! The target must run at the same logic level as the GPIOs.

pub mod device;
pub mod error;

pub use device::{parse_options, LinuxGpioIsp, LinuxGpioIspConfig};
pub use error::{LinuxGpioError, Result};

/// Open a Linux GPIO ISP link and return it boxed
///
/// This is a convenience function for use in the CLI programmer dispatch.
///
/// # Example Options
///
/// - `dev=/dev/gpiochip0` - GPIO chip device path (or use gpiochip=N)
/// - `gpiochip=0` - GPIO chip number (alternative to dev)
/// - `sck=11`, `mosi=10`, `miso=9`, `reset=25` - line offsets (required)
/// - `delay_ns=5000` - delay per clock level (optional, minimum 500)
pub fn open_linux_gpio_isp(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn avrisp_core::programmer::IspLink>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let link = LinuxGpioIsp::open(&config)?;
    Ok(Box::new(link))
}
