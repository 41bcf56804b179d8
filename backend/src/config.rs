//! Environment-driven settings.
//!
//! Values are read from the process environment after loading `.env` (if
//! present). Unparseable values fall back to their defaults with a warning.
//!
//! | Variable                    | Default          |
//! |-----------------------------|------------------|
//! | `PLATEMAP_PORT`             | `3000`           |
//! | `PLATEMAP_HEADER_SCAN_ROWS` | `20`             |
//! | `PLATEMAP_PREVIEW_ROWS`     | `20`             |
//! | `PLATEMAP_DEFAULT_MODE`     | `96-well layout` |

use std::env;
use std::str::FromStr;

use crate::api::logs::log_warning;
use crate::models::ViewMode;
use crate::parser::DEFAULT_HEADER_SCAN_ROWS;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// HTTP server port
    pub port: u16,
    /// Rows searched for the header row
    pub header_scan_rows: usize,
    /// Rows returned by previews
    pub preview_rows: usize,
    /// View mode used when a request does not name one
    pub default_mode: ViewMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            default_mode: ViewMode::Layout96,
        }
    }
}

impl Settings {
    /// Load settings from `.env` and the environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            port: read_var(&lookup, "PLATEMAP_PORT", defaults.port),
            header_scan_rows: read_var(&lookup, "PLATEMAP_HEADER_SCAN_ROWS", defaults.header_scan_rows),
            preview_rows: read_var(&lookup, "PLATEMAP_PREVIEW_ROWS", defaults.preview_rows),
            default_mode: read_var(&lookup, "PLATEMAP_DEFAULT_MODE", defaults.default_mode),
        }
    }
}

fn read_var<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log_warning(format!("Ignoring invalid {}={:?}", key, raw));
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.header_scan_rows, 20);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("PLATEMAP_PORT", "8080"),
            ("PLATEMAP_HEADER_SCAN_ROWS", " 50 "),
            ("PLATEMAP_DEFAULT_MODE", "384-well layout"),
        ]));

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.header_scan_rows, 50);
        assert_eq!(settings.default_mode, ViewMode::Layout384);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[
            ("PLATEMAP_PORT", "not-a-port"),
            ("PLATEMAP_DEFAULT_MODE", "1536"),
        ]));

        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.default_mode, ViewMode::Layout96);
    }
}
