use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// =============================================================================
// Unified config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   config.toml:     [session]
//                    port = 1234
//
//   env var:         RSCOPE_SESSION__PORT=1234   (double underscore = nesting)
//
//   (single underscore stays within field names: RSCOPE_VIEW__FULL_INTERACTIVE_RATIO)

/// Named configuration presets.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// host=127.0.0.1, full interactive ratio (high-DPI development)
    Local,
    /// defaults: half-resolution interactive ratio to save bandwidth
    Production,
}

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub session: SessionFileConfig,
    #[serde(default)]
    pub view: ViewFileConfig,
}

/// Session endpoint tunables (lives under `[session]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionFileConfig {
    /// Remote application to initialize after connect.
    #[serde(default = "default_application")]
    pub application: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for SessionFileConfig {
    fn default() -> Self {
        Self {
            application: default_application(),
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// View tunables (lives under `[view]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewFileConfig {
    /// Render interactive updates at full resolution instead of the default
    /// half. The half-resolution default produces oversized labels on
    /// high-DPI screens, so local development wants this on.
    #[serde(default)]
    pub full_interactive_ratio: bool,
}

impl Default for ViewFileConfig {
    fn default() -> Self {
        Self {
            full_interactive_ratio: false,
        }
    }
}

fn default_application() -> String {
    "Cone".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    1234
}
fn default_ws_path() -> String {
    "/ws".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    10
}

/// Build a figment that layers: defaults → profile defaults → config.toml →
/// RSCOPE_* env vars.
///
/// Profile defaults sit above struct defaults but below config.toml/env.
/// The CLI profile takes priority over the config file profile.
///
/// Env vars use double-underscore for nesting into sections:
///   `RSCOPE_SESSION__PORT=8080`  →  `session.port = 8080`
pub fn load_config(config_dir: &Path, cli_profile: Option<&Profile>) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    // Pass 1: peek at profile from config.toml/env (CLI overrides file)
    let base = Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_dir.join("config.toml")))
        .merge(Env::prefixed("RSCOPE_").split("__"));

    let profile: Option<Profile> = cli_profile
        .cloned()
        .or_else(|| base.extract_inner("profile").ok());

    // Pass 2: rebuild with profile defaults as a layer between defaults and config.toml
    let profile_layer = profile_to_file_config(profile.as_ref());

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Serialized::defaults(profile_layer))
        .merge(Toml::file(config_dir.join("config.toml")))
        .merge(Env::prefixed("RSCOPE_").split("__"))
}

/// Convert a profile into a `FileConfig` with the profile's default values
/// filled in. Fields not set by the profile remain at their struct defaults
/// so figment does not override explicit user values from config.toml / env.
fn profile_to_file_config(profile: Option<&Profile>) -> FileConfig {
    match profile {
        Some(Profile::Local) => FileConfig {
            profile: Some(Profile::Local),
            session: SessionFileConfig {
                host: "127.0.0.1".to_string(),
                ..Default::default()
            },
            view: ViewFileConfig {
                full_interactive_ratio: true,
            },
        },
        Some(Profile::Production) => FileConfig {
            profile: Some(Profile::Production),
            session: Default::default(),
            view: Default::default(),
        },
        None => FileConfig::default(),
    }
}

// =============================================================================
// Runtime config structs (derived from FileConfig, used throughout the link)
// =============================================================================

/// Resolved session link configuration (runtime view).
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// Remote application to initialize after connect.
    pub application: String,
    pub host: String,
    pub port: u16,
    pub ws_path: String,
    /// How long the connect handshake may take before it counts as failed.
    pub connect_timeout: Duration,
}

impl LinkConfig {
    pub fn from_file(fc: &SessionFileConfig) -> Self {
        Self {
            application: fc.application.clone(),
            host: fc.host.clone(),
            port: fc.port,
            ws_path: fc.ws_path.clone(),
            connect_timeout: Duration::from_secs(fc.connect_timeout_secs),
        }
    }

    /// The WebSocket endpoint the session handshake runs against.
    pub fn session_url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.ws_path)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::from_file(&SessionFileConfig::default())
    }
}

/// Resolved view configuration (runtime view).
#[derive(Clone, Copy, Debug)]
pub struct ViewConfig {
    /// Interactive-quality ratio: 1.0 full resolution, 0.5 half.
    pub interactive_ratio: f64,
}

impl ViewConfig {
    pub fn from_file(fc: &ViewFileConfig) -> Self {
        Self {
            interactive_ratio: if fc.full_interactive_ratio { 1.0 } else { 0.5 },
        }
    }
}
