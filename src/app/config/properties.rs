use super::ConfigError;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

pub const KEY_URL: &str = "url";
pub const KEY_ITEM_ID: &str = "item_id";
pub const KEY_CLIENT_KEY: &str = "client_key";
pub const KEY_USERNAME: &str = "username";
pub const KEY_PASSWORD: &str = "password";
pub const KEY_NETWORKING_TOOL: &str = "networkingTool";

/// Keys that must be present and non-empty.
pub const REQUIRED_KEYS: [&str; 5] = [
    KEY_URL,
    KEY_ITEM_ID,
    KEY_CLIENT_KEY,
    KEY_USERNAME,
    KEY_PASSWORD,
];

/// Exact length of a valid `client_key`.
pub const CLIENT_KEY_LEN: usize = 40;

/// Raw `key=value` pairs read from a properties-style blob.
///
/// Lines without `=` are skipped; a line splits on its first `=` only and
/// neither side is trimmed or unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: BTreeMap<String, String>,
}

impl PropertyMap {
    pub fn parse(text: &str) -> Self {
        let entries = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Self { entries }
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self, ConfigError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| ConfigError::ReadFailed {
                source_name: "stream".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::parse(&text))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::parse(&text))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A property map that passed validation, in typed form.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub url: String,
    pub item_id: String,
    pub client_key: String,
    pub username: String,
    pub password: String,
    pub networking_tool: Option<String>,
}

impl ValidatedConfig {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self, Vec<ConfigError>> {
        let errors = properties.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let required = |key: &str| properties.get(key).unwrap_or_default().to_string();

        Ok(Self {
            url: required(KEY_URL),
            item_id: required(KEY_ITEM_ID),
            client_key: required(KEY_CLIENT_KEY),
            username: required(KEY_USERNAME),
            password: required(KEY_PASSWORD),
            networking_tool: properties
                .get(KEY_NETWORKING_TOOL)
                .map(ToString::to_string),
        })
    }
}

// Credentials stay out of logs.
impl std::fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("url", &self.url)
            .field("item_id", &self.item_id)
            .field("client_key", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("networking_tool", &self.networking_tool)
            .finish()
    }
}
