use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{CONFIG_FILE_NAME, CONFIG_PATH_ENV};
use crate::topic_url::parse_topic_url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "{} must contain forums in the TOML format:\n\
         [forums.\"https://some.discourse.domain\"]\n\
         username = \"your-username\"\n\
         key = \"your-key\"",
        path.display()
    )]
    NoForums { path: PathBuf },
    #[error("cannot read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{} has invalid forum URL: {url:?}", path.display())]
    InvalidUrl { path: PathBuf, url: String },
    #[error("{} lists forum {url} more than once", path.display())]
    DuplicateForum { path: PathBuf, url: String },
    #[error("{} misses username or key for forum {url}", path.display())]
    IncompleteCredentials { path: PathBuf, url: String },
    #[error("{} misses username and key for forum {url}", path.display())]
    UnknownForum { path: PathBuf, url: String },
    #[error("{} lists several forums; use a full topic URL to pick one", path.display())]
    AmbiguousForum { path: PathBuf },
    #[error("cannot determine home directory; set DISCEDIT_CONFIG")]
    NoHome,
}

/// API credentials for one forum.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    forums: BTreeMap<String, Credentials>,
}

/// User configuration: credentials per forum base URL.
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    forums: BTreeMap<String, Credentials>,
}

impl Config {
    /// Location of the configuration file: `$DISCEDIT_CONFIG`, else `~/.discedit`.
    ///
    /// # Errors
    ///
    /// Returns an error if no override is set and the home directory is unknown.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoHome)
    }

    /// Read and validate the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unparsable, lists no forums,
    /// or has an invalid entry.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NoForums {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(path, &content)
    }

    /// Parse configuration text; `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if raw.forums.is_empty() {
            return Err(ConfigError::NoForums {
                path: path.to_path_buf(),
            });
        }

        let mut forums = BTreeMap::new();
        for (url, credentials) in raw.forums {
            let clean = url.trim_end_matches('/').to_string();
            let valid = parse_topic_url(&format!("{clean}/t/123"))
                .is_ok_and(|target| target.base_url == clean);
            if !valid {
                return Err(ConfigError::InvalidUrl {
                    path: path.to_path_buf(),
                    url,
                });
            }
            if credentials.username.is_empty() || credentials.key.is_empty() {
                return Err(ConfigError::IncompleteCredentials {
                    path: path.to_path_buf(),
                    url,
                });
            }
            if forums.contains_key(&clean) {
                return Err(ConfigError::DuplicateForum {
                    path: path.to_path_buf(),
                    url: clean,
                });
            }
            forums.insert(clean, credentials);
        }

        Ok(Self {
            path: path.to_path_buf(),
            forums,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find the forum and credentials for `base_url`.
    ///
    /// An empty `base_url` (a bare topic id was given) resolves to the only
    /// configured forum.
    ///
    /// # Errors
    ///
    /// Returns an error if the forum is not configured, or if `base_url` is
    /// empty and more than one forum is configured.
    pub fn forum(&self, base_url: &str) -> Result<(&str, &Credentials), ConfigError> {
        if base_url.is_empty() {
            if self.forums.len() > 1 {
                return Err(ConfigError::AmbiguousForum {
                    path: self.path.clone(),
                });
            }
            if let Some((url, credentials)) = self.forums.iter().next() {
                return Ok((url.as_str(), credentials));
            }
        }

        self.forums
            .get_key_value(base_url)
            .map(|(url, credentials)| (url.as_str(), credentials))
            .ok_or_else(|| ConfigError::UnknownForum {
                path: self.path.clone(),
                url: base_url.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Config, ConfigError> {
        Config::parse(Path::new("/home/me/.discedit"), content)
    }

    #[test]
    fn test_parse_normalizes_trailing_slash() {
        let config = parse(
            r#"
            [forums."https://forum.example.com/"]
            username = "alice"
            key = "secret"
            "#,
        )
        .unwrap();

        let (url, credentials) = config.forum("https://forum.example.com").unwrap();
        assert_eq!(url, "https://forum.example.com");
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.key, "secret");
    }

    #[test]
    fn test_parse_rejects_empty_config() {
        assert!(matches!(parse(""), Err(ConfigError::NoForums { .. })));
        assert!(matches!(parse("[forums]"), Err(ConfigError::NoForums { .. })));
    }

    #[test]
    fn test_parse_rejects_invalid_url() {
        let err = parse(
            r#"
            [forums."ftp://forum.example.com"]
            username = "alice"
            key = "secret"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { ref url, .. } if url == "ftp://forum.example.com"));

        let err = parse(
            r#"
            [forums."https://example.com/forum"]
            username = "alice"
            key = "secret"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        let err = parse(
            r#"
            [forums."https://forum.example.com"]
            username = "alice"
            "#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "/home/me/.discedit misses username or key for forum https://forum.example.com"
        );
    }

    #[test]
    fn test_parse_rejects_same_forum_twice() {
        let err = parse(
            r#"
            [forums."https://forum.example.com/"]
            username = "alice"
            key = "a"

            [forums."https://forum.example.com"]
            username = "bob"
            key = "b"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateForum { ref url, .. } if url == "https://forum.example.com"));
        assert_eq!(
            err.to_string(),
            "/home/me/.discedit lists forum https://forum.example.com more than once"
        );
    }

    #[test]
    fn test_forum_lookup() {
        let config = parse(
            r#"
            [forums."https://one.example.com"]
            username = "alice"
            key = "a"

            [forums."https://two.example.com"]
            username = "bob"
            key = "b"
            "#,
        )
        .unwrap();

        assert_eq!(config.forum("https://two.example.com").unwrap().1.username, "bob");
        assert!(matches!(
            config.forum("https://three.example.com"),
            Err(ConfigError::UnknownForum { .. })
        ));
        assert!(matches!(config.forum(""), Err(ConfigError::AmbiguousForum { .. })));
    }

    #[test]
    fn test_bare_id_uses_single_forum() {
        let config = parse(
            r#"
            [forums."https://one.example.com"]
            username = "alice"
            key = "a"
            "#,
        )
        .unwrap();
        assert_eq!(config.forum("").unwrap().0, "https://one.example.com");
    }

    #[test]
    fn test_load_missing_file_explains_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".discedit");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NoForums { .. }));
        assert!(err.to_string().contains("username = \"your-username\""));
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let credentials = Credentials {
            username: "alice".to_string(),
            key: "secret".to_string(),
        };
        let printed = format!("{credentials:?}");
        assert!(printed.contains("alice"));
        assert!(!printed.contains("secret"));
    }
}
