use serde::{Deserialize, Serialize};
use std::{
    env,
    fs::File,
    io::{BufReader, ErrorKind, Read},
    net::{Ipv4Addr, SocketAddr},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::i18n::Lang;

const DEFAULT_SETTINGS_PATH: &str = "core/settings.json";
const SETTINGS_PATH_VAR: &str = "NOMADICODE_SETTINGS";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not read settings file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Settings file {path} is malformed: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("{name} has an invalid value \"{value}\"")]
    Invalid { name: String, value: String },

    #[error("{0} must be set")]
    Missing(String),
}

/// Process configuration. Each setting is named after the environment
/// variable that overrides it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Settings {
    pub ipv4_addr: Ipv4Setting,
    pub port: U16Setting,
    pub supabase_url: StrSetting,
    pub supabase_anon_key: StrSetting,
    pub ga_measurement_id: StrSetting,
    pub default_lang: StrSetting,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StrSetting {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct U16Setting {
    pub name: String,
    pub value: u16,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Ipv4Setting {
    pub name: String,
    pub value: Ipv4Addr,
}

impl Settings {
    /// Defaults, then the settings file if one exists, then the environment.
    pub fn load() -> Result<Self, SettingsError> {
        let path =
            env::var(SETTINGS_PATH_VAR).unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
        let mut settings = match Settings::from_file(&path)? {
            Some(settings) => {
                info!(path, "Loaded settings file");
                settings
            }
            None => Settings::new(),
        };
        settings.apply_overrides(|name| env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads `path`, or `None` when there is no such file.
    pub fn from_file(path: &str) -> Result<Option<Self>, SettingsError> {
        match File::open(path) {
            Ok(file) => {
                let mut buffer = Vec::new();
                let mut reader = BufReader::new(file);
                match reader.read_to_end(&mut buffer) {
                    Ok(_) => match serde_json::from_slice::<Settings>(&buffer) {
                        Ok(settings) => Ok(Some(settings)),
                        Err(source) => Err(SettingsError::Parse {
                            path: path.to_string(),
                            source,
                        }),
                    },
                    Err(source) => Err(SettingsError::Read {
                        path: path.to_string(),
                        source,
                    }),
                }
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SettingsError::Read {
                path: path.to_string(),
                source,
            }),
        }
    }

    pub fn new() -> Self {
        Settings {
            ipv4_addr: Ipv4Setting {
                name: "NOMADICODE_HOST".to_string(),
                value: Ipv4Addr::new(127, 0, 0, 1),
            },
            port: U16Setting {
                name: "NOMADICODE_PORT".to_string(),
                value: 4010,
            },
            supabase_url: StrSetting {
                name: "SUPABASE_URL".to_string(),
                value: String::new(),
            },
            supabase_anon_key: StrSetting {
                name: "SUPABASE_ANON_KEY".to_string(),
                value: String::new(),
            },
            ga_measurement_id: StrSetting {
                name: "GA_MEASUREMENT_ID".to_string(),
                value: String::new(),
            },
            default_lang: StrSetting {
                name: "NOMADICODE_DEFAULT_LANG".to_string(),
                value: "en".to_string(),
            },
        }
    }

    /// Replaces every setting for which `lookup` returns a value.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        if let Some(value) = lookup(&self.ipv4_addr.name) {
            self.ipv4_addr.value = value.parse().map_err(|_| SettingsError::Invalid {
                name: self.ipv4_addr.name.clone(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(&self.port.name) {
            self.port.value = value.parse().map_err(|_| SettingsError::Invalid {
                name: self.port.name.clone(),
                value: value.clone(),
            })?;
        }
        for setting in [
            &mut self.supabase_url,
            &mut self.supabase_anon_key,
            &mut self.ga_measurement_id,
            &mut self.default_lang,
        ] {
            if let Some(value) = lookup(&setting.name) {
                setting.value = value;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for setting in [&self.supabase_url, &self.supabase_anon_key] {
            if setting.value.trim().is_empty() {
                return Err(SettingsError::Missing(setting.name.clone()));
            }
        }
        let url = &self.supabase_url.value;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SettingsError::Invalid {
                name: self.supabase_url.name.clone(),
                value: self.supabase_url.value.clone(),
            });
        }
        if self.default_lang.value.parse::<Lang>().is_err() {
            return Err(SettingsError::Invalid {
                name: self.default_lang.name.clone(),
                value: self.default_lang.value.clone(),
            });
        }
        if self.analytics_id().is_none() {
            warn!("{} is not set, analytics disabled", self.ga_measurement_id.name);
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((self.ipv4_addr.value, self.port.value))
    }

    /// Language used when a request expresses no supported preference.
    pub fn fallback_lang(&self) -> Lang {
        self.default_lang.value.parse().unwrap_or_default()
    }

    pub fn analytics_id(&self) -> Option<&str> {
        let id = self.ga_measurement_id.value.trim();
        (!id.is_empty()).then_some(id)
    }
}
