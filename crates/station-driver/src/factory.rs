use tokio::time::Duration;

use vendo_core::Robo500;

use crate::comms::Comms;
use crate::serial::SerialComms;
use crate::session::{
    ImmediateSuccessMachine, StructuredMachine, TimeoutOnlyMachine, UnconfiguredMachine,
    VendingMachine,
};
use crate::sim::{ScriptedRoboComms, SilentComms};
use crate::tcp::TcpComms;
use crate::{DriverError, Result};

// ─── Transport resolution ─────────────────────────────────────────────────

/// Which transport class a connection descriptor selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Serial,
    Socket,
    Simulated,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Serial => f.write_str("serial"),
            TransportKind::Socket => f.write_str("socket"),
            TransportKind::Simulated => f.write_str("simulated"),
        }
    }
}

/// Classify a connection descriptor.
///
/// The scheme is informal but fixed: anything mentioning a COM port is
/// serial; an address with both `:` and `.` is a socket; anything mentioning
/// "test" is simulated; the rest is a configuration error.
pub fn classify(address: &str) -> Result<TransportKind> {
    if address.to_uppercase().contains("COM") {
        return Ok(TransportKind::Serial);
    }
    if address.contains(':') && address.contains('.') {
        return Ok(TransportKind::Socket);
    }
    if address.to_lowercase().contains("test") {
        return Ok(TransportKind::Simulated);
    }
    Err(DriverError::CommsNotConfigured(address.to_string()))
}

/// Build the comms link a descriptor describes. `crlf` selects the line
/// ending the attached device expects.
pub fn resolve_comms(address: &str, crlf: bool) -> Result<Box<dyn Comms>> {
    match classify(address)? {
        TransportKind::Serial => Ok(Box::new(SerialComms::new(address, crlf))),
        TransportKind::Socket => {
            let (host, port) = split_host_port(address)?;
            Ok(Box::new(TcpComms::new(host, port, crlf)))
        }
        TransportKind::Simulated => match address.to_lowercase().as_str() {
            "testrobo" => Ok(Box::new(ScriptedRoboComms::new())),
            _ => Ok(Box::new(SilentComms::new())),
        },
    }
}

fn split_host_port(address: &str) -> Result<(String, u16)> {
    let (host, port) = address
        .split_once(':')
        .ok_or_else(|| DriverError::MalformedAddress(address.to_string()))?;
    let port: u16 = port
        .parse()
        .map_err(|_| DriverError::MalformedAddress(address.to_string()))?;
    Ok((host.to_string(), port))
}

// ─── Station resolution ───────────────────────────────────────────────────

/// Watchdog overrides applied to the machines that carry one.
#[derive(Debug, Clone, Copy)]
pub struct WatchdogConfig {
    pub interval: Duration,
    pub max_kicks: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval: crate::supervisor::DEFAULT_INTERVAL,
            max_kicks: crate::supervisor::DEFAULT_MAX_KICKS,
        }
    }
}

/// Resolve the machine for a station by name.
///
/// Unknown names resolve to [`UnconfiguredMachine`], which fails its bins
/// with the standard reason; only comms configuration errors propagate.
pub fn resolve_station(
    name: &str,
    address: &str,
    watchdog: Option<WatchdogConfig>,
) -> Result<Box<dyn VendingMachine>> {
    match name.to_lowercase().as_str() {
        "robo" => {
            let comms = resolve_comms(address, true)?;
            let mut machine = StructuredMachine::new("Robo500", comms, Box::new(Robo500));
            if let Some(cfg) = watchdog {
                machine = machine.with_watchdog(cfg.interval, cfg.max_kicks);
            }
            Ok(Box::new(machine))
        }
        "test1" => Ok(Box::new(ImmediateSuccessMachine::new())),
        "testtimeout" => {
            let mut machine = TimeoutOnlyMachine::new();
            if let Some(cfg) = watchdog {
                machine = machine.with_interval(cfg.interval);
            }
            Ok(Box::new(machine))
        }
        _ => Ok(Box::new(UnconfiguredMachine::new())),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn com_descriptors_are_serial() {
        assert_eq!(classify("COM3").unwrap(), TransportKind::Serial);
        assert_eq!(classify("com12").unwrap(), TransportKind::Serial);
    }

    #[test]
    fn host_port_descriptors_are_sockets() {
        assert_eq!(classify("10.0.0.12:9100").unwrap(), TransportKind::Socket);
        assert_eq!(
            classify("station.local:4000").unwrap(),
            TransportKind::Socket
        );
    }

    #[test]
    fn test_descriptors_are_simulated() {
        assert_eq!(classify("testrobo").unwrap(), TransportKind::Simulated);
        assert_eq!(classify("Test").unwrap(), TransportKind::Simulated);
    }

    #[test]
    fn unknown_descriptors_are_not_configured() {
        assert!(matches!(
            classify("garage"),
            Err(DriverError::CommsNotConfigured(_))
        ));
    }

    #[test]
    fn socket_with_bad_port_is_malformed() {
        assert!(matches!(
            resolve_comms("10.0.0.12:ninety", true),
            Err(DriverError::MalformedAddress(_))
        ));
    }

    #[test]
    fn serial_wins_over_socket_when_both_match() {
        // "COM" is checked first, exactly as the descriptor scheme documents
        assert_eq!(classify("COM1:1.5").unwrap(), TransportKind::Serial);
    }

    #[test]
    fn station_lookup_table() {
        let robo = resolve_station("Robo", "testrobo", None).unwrap();
        assert_eq!(robo.name(), "Robo500");

        let success = resolve_station("test1", "", None).unwrap();
        assert_eq!(success.name(), "TestSuccess");

        let timeout = resolve_station("testtimeout", "", None).unwrap();
        assert_eq!(timeout.name(), "TestTimeout");

        let fallback = resolve_station("anything-else", "", None).unwrap();
        assert_eq!(fallback.name(), "Unconfigured");
    }

    #[test]
    fn robo_with_unresolvable_comms_is_a_config_error() {
        assert!(matches!(
            resolve_station("robo", "garage", None),
            Err(DriverError::CommsNotConfigured(_))
        ));
    }
}
