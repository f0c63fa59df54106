//! Parsing helpers for individual configuration values.

use std::net::IpAddr;
use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};
use crate::model::LogOutput;

/// Parse a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for any other value.
pub fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid(field, "not_a_boolean", value)),
    }
}

/// Parse a listener port in `1..=65535`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric or out-of-range values.
pub fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    let port = value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::invalid(field, "not_a_port", value))?;
    if port == 0 {
        return Err(ConfigError::invalid(field, "zero", value));
    }
    Ok(port)
}

/// Parse an IP address.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an IP address.
pub fn parse_ip(field: &'static str, value: &str) -> ConfigResult<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not_an_ip_address", value))
}

/// Parse an absolute directory path.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for relative paths.
pub fn parse_absolute_path(field: &'static str, value: &str) -> ConfigResult<PathBuf> {
    let path = PathBuf::from(value.trim());
    if !path.is_absolute() {
        return Err(ConfigError::invalid(field, "not_absolute", value));
    }
    Ok(path)
}

/// Normalise an `http(s)://host[:port]` origin, trimming trailing slashes.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the scheme is missing or the host
/// part is empty.
pub fn parse_origin(field: &'static str, value: &str) -> ConfigResult<String> {
    let trimmed = value.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| ConfigError::invalid(field, "missing_scheme", value))?;
    if host.is_empty() {
        return Err(ConfigError::invalid(field, "missing_host", value));
    }
    Ok(trimmed.to_string())
}

/// Parse a log output name.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for names other than `json` and `pretty`.
pub fn parse_log_output(field: &'static str, value: &str) -> ConfigResult<LogOutput> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogOutput::Json),
        "pretty" => Ok(LogOutput::Pretty),
        _ => Err(ConfigError::invalid(field, "unknown_log_format", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        for value in ["1", "true", "YES", " on "] {
            assert!(parse_flag("flag", value).expect("flag"), "{value}");
        }
        for value in ["0", "false", "No", "off", ""] {
            assert!(!parse_flag("flag", value).expect("flag"), "{value}");
        }
        assert!(parse_flag("flag", "maybe").is_err());
    }

    #[test]
    fn ports_reject_zero_and_overflow() {
        assert_eq!(parse_port("port", "8090").expect("port"), 8090);
        assert!(parse_port("port", "0").is_err());
        assert!(parse_port("port", "65536").is_err());
        assert!(parse_port("port", "http").is_err());
    }

    #[test]
    fn origins_are_normalised() {
        assert_eq!(
            parse_origin("host", "http://media.lan:8090/").expect("origin"),
            "http://media.lan:8090"
        );
        assert!(parse_origin("host", "media.lan").is_err());
        assert!(parse_origin("host", "https://").is_err());
    }

    #[test]
    fn paths_must_be_absolute() {
        assert!(parse_absolute_path("root", "relative/dir").is_err());
        assert_eq!(
            parse_absolute_path("root", "/srv/library").expect("path"),
            PathBuf::from("/srv/library")
        );
    }
}
