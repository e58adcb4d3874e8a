use super::ConfigError;
use super::properties::{CLIENT_KEY_LEN, KEY_CLIENT_KEY, PropertyMap, REQUIRED_KEYS};

/// Fewest entries a usable map can have.
pub const MIN_ENTRIES: usize = 5;

impl PropertyMap {
    /// Returns every problem with the map; empty means it is good.
    ///
    /// Checks do not short-circuit so the user sees all of them at once.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.len() < MIN_ENTRIES {
            errors.push(ConfigError::TooFewEntries {
                found: self.len(),
                required: MIN_ENTRIES,
            });
        }

        for key in REQUIRED_KEYS {
            match self.get(key) {
                None => errors.push(ConfigError::MissingKey(key.to_string())),
                Some("") => errors.push(ConfigError::EmptyValue(key.to_string())),
                Some(_) => {}
            }
        }

        if let Some(client_key) = self.get(KEY_CLIENT_KEY)
            && !client_key.is_empty()
        {
            let length = client_key.chars().count();
            if length != CLIENT_KEY_LEN {
                errors.push(ConfigError::ClientKeyLength {
                    length,
                    expected: CLIENT_KEY_LEN,
                });
            }
        }

        errors
    }

    pub fn is_good(&self) -> bool {
        self.validate().is_empty()
    }
}
