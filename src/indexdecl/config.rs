// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

/// Connection settings, read from the same variables the services use.
#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri:  Option<String>,
    pub mongo_user: Option<String>,
    pub mongo_pwd:  Option<String>,
    pub manifest:   Option<PathBuf>,
}

impl Default for Config {

    fn default() -> Self {
        Config {
            mongo_uri:  None,
            mongo_user: None,
            mongo_pwd:  None,
            manifest:   None,
        }
    }

}

impl Config {

    pub fn from_env() -> Config {
        Config::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F: Fn(&str) -> Option<String>>(var: F) -> Config {
        let get = |key: &str| var(key).filter(|value| !value.is_empty());
        Config {
            mongo_uri:  get("MONGO_URI"),
            mongo_user: get("MONGO_USER"),
            mongo_pwd:  get("MONGO_PWD"),
            manifest:   get("INDEXDECL_MANIFEST").map(PathBuf::from),
        }
    }

    /// Username and password, only when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.mongo_user, &self.mongo_pwd) {
            (Some(user), Some(pwd)) => Some((user.as_str(), pwd.as_str())),
            _ => None,
        }
    }

}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use crate::config::Config;

    fn config_of(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default() {
        let config = Config::default();
        assert!(config.mongo_uri.is_none());
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_credentials_need_both() {
        let config = config_of(&[("MONGO_URI", "mongodb://db:27017"), ("MONGO_USER", "admin")]);
        assert_eq!(config.mongo_uri.as_deref(), Some("mongodb://db:27017"));
        assert!(config.credentials().is_none());

        let config = config_of(&[("MONGO_USER", "admin"), ("MONGO_PWD", "secret")]);
        assert_eq!(config.credentials(), Some(("admin", "secret")));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config_of(&[("MONGO_URI", ""), ("INDEXDECL_MANIFEST", "/etc/indexes.json")]);
        assert!(config.mongo_uri.is_none());
        assert_eq!(config.manifest.unwrap().to_str(), Some("/etc/indexes.json"));
    }
}
