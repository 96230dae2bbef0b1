// Configuration module
// Reads INI-style configuration files, section-aware, with environment
// variable override. Section-awareness matters here: the realm process
// reads an arbitrary number of `[world1]`, `[world2]`, ... sections that
// share the same key names, which a flat key-value store cannot represent.

use configparser::ini::Ini;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Global configuration singleton (equivalent to the `sConfig` macro).
static CONFIG: once_cell::sync::Lazy<Mutex<Config>> =
    once_cell::sync::Lazy::new(|| Mutex::new(Config::new()));

pub fn get_config() -> &'static Mutex<Config> {
    &CONFIG
}

/// Section-aware configuration file parser.
pub struct Config {
    sections: HashMap<String, HashMap<String, String>>,
    filename: String,
    env_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Config {
            sections: HashMap::new(),
            filename: String::new(),
            env_prefix: String::new(),
        }
    }

    /// Load configuration from a file. `env_prefix` names the environment
    /// variable prefix used for overrides (e.g. "REALMD_").
    pub fn set_source(&mut self, filename: &str, env_prefix: &str) -> bool {
        self.filename = filename.to_string();
        self.env_prefix = env_prefix.to_string();
        self.reload()
    }

    /// Reload the configuration file from its last-set source path.
    pub fn reload(&mut self) -> bool {
        self.sections.clear();

        let mut ini = Ini::new();
        let loaded = match ini.load(&self.filename) {
            Ok(map) => map,
            Err(_) => return false,
        };

        for (section, keys) in loaded {
            let mut flat = HashMap::new();
            for (key, value) in keys {
                if let Some(value) = value {
                    flat.insert(key, value);
                }
            }
            self.sections.insert(section, flat);
        }

        true
    }

    /// Names of every section whose name starts with `prefix`
    /// (case-insensitive, matching `configparser`'s own lowercasing),
    /// sorted so `world1`, `world2`, ... are read in a stable order.
    pub fn section_names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        let mut names: Vec<String> = self
            .sections
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn is_set(&self, section: &str, key: &str) -> bool {
        self.get_env_or_config(section, key).is_some()
    }

    pub fn get_string_default(&self, section: &str, key: &str, default: &str) -> String {
        self.get_env_or_config(section, key)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_string(&self, section: &str, key: &str) -> String {
        self.get_string_default(section, key, "")
    }

    pub fn get_bool_default(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get_env_or_config(section, key) {
            Some(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"),
            None => default,
        }
    }

    pub fn get_int_default(&self, section: &str, key: &str, default: i32) -> i32 {
        match self.get_env_or_config(section, key) {
            Some(val) => val.parse().unwrap_or(default),
            None => default,
        }
    }

    pub fn get_float_default(&self, section: &str, key: &str, default: f32) -> f32 {
        match self.get_env_or_config(section, key) {
            Some(val) => val.parse().unwrap_or(default),
            None => default,
        }
    }

    /// Environment override first (`{prefix}{SECTION}_{KEY}`), config file second.
    fn get_env_or_config(&self, section: &str, key: &str) -> Option<String> {
        if !self.env_prefix.is_empty() {
            let env_key = format!(
                "{}{}_{}",
                self.env_prefix,
                section.to_uppercase(),
                key.to_uppercase()
            );
            if let Ok(val) = std::env::var(&env_key) {
                return Some(val);
            }
        }

        self.sections
            .get(&section.to_lowercase())
            .and_then(|kv| kv.get(&key.to_lowercase()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.get_int_default("net", "nonexistent", 42), 42);
        assert_eq!(
            config.get_string_default("net", "nonexistent", "hello"),
            "hello"
        );
        assert!(config.get_bool_default("net", "nonexistent", true));
        assert!(config.section_names_with_prefix("world").is_empty());
    }

    #[test]
    fn test_missing_file_fails_reload() {
        let mut config = Config::new();
        assert!(!config.set_source("/nonexistent/path.conf", ""));
    }
}
