//! Programmer registration and dispatch
//!
//! Programmers are selected with a string of the form
//! `name` or `name:key1=value1,key2=value2`. Each backend is behind a cargo
//! feature, and only the enabled ones are listed or opened.

use avrisp_core::programmer::IspLink;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory ATmega328P emulator for testing (signature=<6 hex digits>)",
    });

    #[cfg(feature = "linux-gpio")]
    programmers.push(ProgrammerInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio", "gpio"],
        description:
            "Linux GPIO bitbang (gpiochip=N,sck=<line>,mosi=<line>,miso=<line>,reset=<line>)",
    });

    programmers
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the primary programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Parsed programmer string
#[derive(Debug, PartialEq, Eq)]
pub struct ProgrammerParams {
    /// Programmer name as given
    pub name: String,
    /// Key-value parameters, in the order given
    pub params: Vec<(String, String)>,
}

impl ProgrammerParams {
    /// Parameters as borrowed pairs, the form the backends take
    pub fn options(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = Vec::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.push((key.to_string(), value.to_string()));
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Open a programmer link by its programmer string
pub fn open_programmer(s: &str) -> Result<Box<dyn IspLink>, Box<dyn std::error::Error>> {
    let params = parse_programmer_params(s)?;
    let name = find_programmer(&params.name).ok_or_else(|| {
        format!(
            "Unknown programmer '{}' [available: {}]",
            params.name,
            programmer_names_short()
        )
    })?;
    log::debug!("Opening programmer {} {:?}", name, params.params);

    #[allow(unused_variables)]
    let options = params.options();
    match name {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&options),
        #[cfg(feature = "linux-gpio")]
        "linux_gpio" => avrisp_linux_gpio::open_linux_gpio_isp(&options),
        _ => Err(format!("Programmer '{}' is not supported in this build", name).into()),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(options: &[(&str, &str)]) -> Result<Box<dyn IspLink>, Box<dyn std::error::Error>> {
    let mut config = avrisp_dummy::DummyConfig::default();
    for (key, value) in options {
        match *key {
            "signature" => config.signature = parse_signature(value)?,
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }
    log::info!(
        "dummy: Emulating target with signature {:02X?}",
        config.signature
    );
    Ok(Box::new(avrisp_dummy::DummyTarget::new(config)))
}

#[cfg(feature = "dummy")]
fn parse_signature(value: &str) -> Result<[u8; 3], Box<dyn std::error::Error>> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.len() != 6 {
        let message = format!("Invalid signature '{}' (expected 6 hex digits)", value);
        return Err(message.into());
    }
    let raw = u32::from_str_radix(digits, 16)
        .map_err(|e| format!("Invalid signature '{}': {}", value, e))?;
    Ok([(raw >> 16) as u8, (raw >> 8) as u8, raw as u8])
}
