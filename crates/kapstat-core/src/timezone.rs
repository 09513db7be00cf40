//! Reference-zone handling for walltime bucketing
//!
//! Hour truncation and date extraction operate on walltime in a single
//! reference zone. The zone comes from the CLI (`--timezone` / `--utc`),
//! falling back to the system zone, falling back to UTC. Offset-less input
//! timestamps are a separate concern: those default to UTC at parse time
//! (see [`crate::types::SampleTimestamp::parse`]).

use chrono_tz::Tz;
use std::str::FromStr;
use tracing::debug;

/// The reference zone used for bucketing and date filters
#[derive(Debug, Clone, Copy)]
pub struct TimezoneConfig {
    /// The zone all walltime math happens in
    pub tz: Tz,
    /// Whether the zone is UTC
    pub is_utc: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        let tz = detect_system_timezone();
        Self {
            is_utc: tz == Tz::UTC,
            tz,
        }
    }
}

impl TimezoneConfig {
    /// Resolve the reference zone from CLI arguments
    ///
    /// `--utc` wins over `--timezone`; an unparseable zone name is an
    /// [`InvalidTimezone`](crate::error::KapstatError::InvalidTimezone) error.
    pub fn from_cli(timezone_str: Option<&str>, use_utc: bool) -> crate::error::Result<Self> {
        if use_utc {
            return Ok(Self {
                tz: Tz::UTC,
                is_utc: true,
            });
        }

        match timezone_str {
            Some(tz_str) => {
                let tz = Tz::from_str(tz_str).map_err(|_| {
                    crate::error::KapstatError::InvalidTimezone(format!(
                        "'{tz_str}'. Use an IANA name like 'Europe/Oslo' or 'UTC'"
                    ))
                })?;
                Ok(Self {
                    tz,
                    is_utc: tz == Tz::UTC,
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// Display name for report headers
    pub fn display_name(&self) -> &str {
        if self.is_utc { "UTC" } else { self.tz.name() }
    }
}

/// Detect the system's timezone, falling back to UTC
fn detect_system_timezone() -> Tz {
    if let Ok(tz_str) = std::env::var("TZ")
        && let Ok(tz) = Tz::from_str(&tz_str)
    {
        debug!("Using timezone from TZ environment variable: {}", tz_str);
        return tz;
    }

    match iana_time_zone::get_timezone() {
        Ok(tz_str) => Tz::from_str(&tz_str).unwrap_or_else(|_| {
            debug!("Unparseable system timezone '{}', using UTC", tz_str);
            Tz::UTC
        }),
        Err(e) => {
            debug!("Could not detect system timezone ({e:?}), using UTC");
            Tz::UTC
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_flag() {
        let config = TimezoneConfig::from_cli(None, true).unwrap();
        assert!(config.is_utc);
        assert_eq!(config.tz, Tz::UTC);
        assert_eq!(config.display_name(), "UTC");
    }

    #[test]
    fn test_explicit_zone() {
        let config = TimezoneConfig::from_cli(Some("Europe/Oslo"), false).unwrap();
        assert!(!config.is_utc);
        assert_eq!(config.display_name(), "Europe/Oslo");
    }

    #[test]
    fn test_utc_flag_wins_over_zone() {
        let config = TimezoneConfig::from_cli(Some("Europe/Oslo"), true).unwrap();
        assert!(config.is_utc);
    }

    #[test]
    fn test_invalid_zone() {
        let result = TimezoneConfig::from_cli(Some("Norway/Oslo"), false);
        assert!(result.is_err());
    }

    #[test]
    fn test_utc_via_zone_name() {
        let config = TimezoneConfig::from_cli(Some("UTC"), false).unwrap();
        assert!(config.is_utc);
    }
}
