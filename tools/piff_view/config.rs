// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::ValueEnum;

use crate::Cli;

/// How payload bytes are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DumpFormat {
    Hex,
    Base64,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Path(PathBuf),
    Stdin,
}

/// How much of each payload the viewer needs from the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadAccess {
    Skip,
    Prefix(u32),
    Full,
}

#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub input: Input,
    pub dump: DumpFormat,
    pub max_bytes: Option<usize>,
    pub index: bool,
    pub chunk: Option<usize>,
    pub digest: bool,
    pub json: bool,
    pub log_filter: String,
}

impl ViewConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            input: Input::Stdin,
            dump: var("PIFF_VIEW_DUMP")
                .and_then(|s| <DumpFormat as ValueEnum>::from_str(&s, true).ok())
                .unwrap_or(DumpFormat::Hex),
            max_bytes: var("PIFF_VIEW_MAX_BYTES").and_then(|s| s.parse().ok()),
            index: false,
            chunk: None,
            digest: false,
            json: false,
            log_filter: var("PIFF_VIEW_LOG")
                .or_else(|| var("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Command-line flags win over the environment
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        match cli.path.as_ref().or(cli.filename.as_ref()) {
            Some(path) if path.as_os_str() != "-" => self.input = Input::Path(path.clone()),
            _ => self.input = Input::Stdin,
        }
        if let Some(dump) = cli.dump {
            self.dump = dump;
        }
        if cli.max_bytes.is_some() {
            self.max_bytes = cli.max_bytes;
        }
        if let Some(filter) = &cli.log {
            self.log_filter = filter.clone();
        }
        self.index = cli.index;
        self.chunk = cli.chunk;
        self.digest = cli.digest;
        self.json = cli.json;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.input == Input::Stdin && (self.index || self.chunk.is_some()) {
            return Err("--index and --chunk need a seekable file, not stdin".to_string());
        }

        if self.max_bytes == Some(0) {
            return Err("--max-bytes must be at least 1".to_string());
        }

        Ok(())
    }

    pub fn payload_access(&self, payload_len: u32) -> PayloadAccess {
        if self.digest {
            return PayloadAccess::Full;
        }
        match (self.dump, self.max_bytes) {
            (DumpFormat::None, _) => PayloadAccess::Skip,
            (_, Some(max)) => {
                let max = u32::try_from(max).unwrap_or(u32::MAX);
                PayloadAccess::Prefix(max.min(payload_len))
            }
            (_, None) => PayloadAccess::Full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ViewConfig::from_vars(vars(&[]));
        assert_eq!(config.dump, DumpFormat::Hex);
        assert_eq!(config.max_bytes, None);
        assert_eq!(config.log_filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_values() {
        let config = ViewConfig::from_vars(vars(&[
            ("PIFF_VIEW_DUMP", "Base64"),
            ("PIFF_VIEW_MAX_BYTES", "32"),
            ("RUST_LOG", "debug"),
        ]));
        assert_eq!(config.dump, DumpFormat::Base64);
        assert_eq!(config.max_bytes, Some(32));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_unknown_env_dump_falls_back() {
        let config = ViewConfig::from_vars(vars(&[("PIFF_VIEW_DUMP", "octal")]));
        assert_eq!(config.dump, DumpFormat::Hex);
    }

    #[test]
    fn test_cli_overrides_env() {
        let cli = Cli::parse_from(["piff-view", "--dump", "none", "--index", "rec.piff"]);
        let config = ViewConfig::from_vars(vars(&[("PIFF_VIEW_DUMP", "hex")])).apply_cli(&cli);
        assert_eq!(config.dump, DumpFormat::None);
        assert_eq!(config.input, Input::Path(PathBuf::from("rec.piff")));
        assert!(config.index);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_filename_flag() {
        let cli = Cli::parse_from(["piff-view", "--filename", "a.piff"]);
        let config = ViewConfig::from_vars(vars(&[])).apply_cli(&cli);
        assert_eq!(config.input, Input::Path(PathBuf::from("a.piff")));
    }

    #[test]
    fn test_stdin_rejects_random_access() {
        let cli = Cli::parse_from(["piff-view", "--chunk", "2", "-"]);
        let config = ViewConfig::from_vars(vars(&[])).apply_cli(&cli);
        assert_eq!(config.input, Input::Stdin);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_bytes_rejected() {
        let config = ViewConfig {
            max_bytes: Some(0),
            ..ViewConfig::from_vars(vars(&[]))
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_payload_access() {
        let mut config = ViewConfig::from_vars(vars(&[]));
        assert_eq!(config.payload_access(100), PayloadAccess::Full);

        config.max_bytes = Some(16);
        assert_eq!(config.payload_access(100), PayloadAccess::Prefix(16));
        assert_eq!(config.payload_access(4), PayloadAccess::Prefix(4));

        config.dump = DumpFormat::None;
        assert_eq!(config.payload_access(100), PayloadAccess::Skip);

        config.digest = true;
        assert_eq!(config.payload_access(100), PayloadAccess::Full);
    }
}
