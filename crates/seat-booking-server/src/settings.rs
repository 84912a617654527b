//! Server settings: defaults, `booking.toml`, then environment overrides
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use eyre::{eyre, Result, WrapErr};
use seat_booking_core::Config;
use serde::Deserialize;

/// Name of the settings file searched for in the working directory and its
/// parents
pub const SETTINGS_FILE: &str = "booking.toml";

/// Lowest port the server agrees to listen on
pub const MIN_PORT: u16 = 1500;

#[derive(Clone, Deserialize, Debug)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Address for the HTTP server to listen on
    pub host: String,
    /// Port for the HTTP server to listen on
    pub port: u16,
    /// Number of threads accepting connections
    pub acceptor_threads: u32,
    /// Directory static files are served from
    pub root: PathBuf,

    /// Configuration of the seat booking system
    pub booking: Config,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8080,
            acceptor_threads: 4,
            root: PathBuf::from("."),
            booking: Config::default(),
        }
    }
}

impl Settings {
    /// Load the settings
    ///
    /// Reads `path` if given, otherwise the nearest [`SETTINGS_FILE`] if there
    /// is one, and applies the `BOOKING_*` environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => find_settings_file()?,
        };
        let mut settings = match file {
            Some(file) => Self::from_file(&file)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read {}", path.display()))?;
        Self::from_toml(&contents, path.parent())
            .wrap_err_with(|| format!("invalid {}", path.display()))
    }

    /// Parse settings; a relative `root` set in the file is taken relative to
    /// `dir`, the file's directory
    fn from_toml(contents: &str, dir: Option<&Path>) -> Result<Self> {
        let table: toml::Table = contents.parse()?;
        let sets_root = table.contains_key("root");
        let mut settings: Settings = toml::Value::Table(table).try_into()?;

        if let Some(dir) = dir.filter(|_| sets_root && settings.root.is_relative()) {
            settings.root = dir.join(&settings.root);
        }
        Ok(settings)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("BOOKING_SEATS") {
            self.booking.seats = v.parse().wrap_err("BOOKING_SEATS takes a decimal u32")?;
        }
        if let Some(v) = var("BOOKING_WORKERS") {
            self.booking.workers = v.parse().wrap_err("BOOKING_WORKERS takes a decimal u32")?;
        }
        if let Some(v) = var("BOOKING_PORT") {
            self.port = v.parse().wrap_err("BOOKING_PORT takes a decimal u16")?;
        }
        Ok(())
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.port < MIN_PORT {
            return Err(eyre!(
                "invalid port number {}; can't be < {MIN_PORT}",
                self.port
            ));
        }
        if self.acceptor_threads == 0 {
            return Err(eyre!("at least one acceptor thread is required"));
        }
        if self.booking.workers == 0 {
            return Err(eyre!("at least one worker thread is required"));
        }
        Ok(())
    }
}

/// Search the working directory and its parents for [`SETTINGS_FILE`]
fn find_settings_file() -> Result<Option<PathBuf>> {
    let mut path = std::env::current_dir()?;
    loop {
        path.push(SETTINGS_FILE);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => return Ok(Some(path)),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        path.pop();
        if !path.pop() {
            return Ok(None);
        }
    }
}
