use serde::{de::Visitor, Deserialize};
use std::{
    net::SocketAddr,
    ops::Deref,
    path::{Path, PathBuf},
};

#[derive(Deserialize, Debug, Default)]
pub struct DbConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Deserialize, Debug)]
pub struct NetConfig {
    pub bind: SocketAddr,
}

#[derive(Deserialize, Debug)]
pub struct ContentConfig {
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: PathBuf,
    #[serde(default = "default_key")]
    pub key: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        ContentConfig {
            snapshot_file: default_snapshot_file(),
            key: default_key(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct UploadConfig {
    pub dir: ValidPath,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Unlimited when unset.
    pub max_bytes: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RestoreConfig {
    pub secret: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    pub net: NetConfig,
    #[serde(default)]
    pub content: ContentConfig,
    pub uploads: UploadConfig,
    #[serde(default)]
    pub restore: RestoreConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Config::parse(&text)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// `DATABASE_URL` and `RESTORE_SECRET` win over the file.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("DATABASE_URL").filter(|url| !url.is_empty()) {
            self.db.url = Some(url);
        }
        if let Some(secret) = var("RESTORE_SECRET").filter(|secret| !secret.is_empty()) {
            self.restore.secret = Some(secret);
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_snapshot_file() -> PathBuf {
    PathBuf::from("data/site-data.json")
}

fn default_key() -> String {
    String::from("site_data")
}

fn default_url_prefix() -> String {
    String::from("/uploads")
}

#[derive(Debug, Clone)]
pub struct ValidPath(PathBuf);

impl<'de> Deserialize<'de> for ValidPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ValidPathVisitor;
        impl Visitor<'_> for ValidPathVisitor {
            type Value = ValidPath;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "a path to an existing directory")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let path = PathBuf::from(v).canonicalize().map_err(E::custom)?;
                if !path.is_dir() {
                    return Err(E::custom(format!("{} is not a directory", path.display())));
                }
                Ok(ValidPath(path))
            }
        }

        deserializer.deserialize_str(ValidPathVisitor)
    }
}

impl Deref for ValidPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.0.as_path()
    }
}

impl From<ValidPath> for PathBuf {
    fn from(value: ValidPath) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(dir: &Path) -> String {
        format!(
            "[net]\nbind = \"127.0.0.1:3000\"\n\n[uploads]\ndir = \"{}\"\n",
            dir.display()
        )
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::parse(&minimal(dir.path())).unwrap();

        assert_eq!(config.db.url, None);
        assert_eq!(config.db.max_connections, 5);
        assert_eq!(config.content.key, "site_data");
        assert_eq!(config.content.snapshot_file, PathBuf::from("data/site-data.json"));
        assert_eq!(config.uploads.url_prefix, "/uploads");
        assert_eq!(config.uploads.max_bytes, None);
        assert_eq!(config.restore.secret, None);
        assert_eq!(&*config.uploads.dir, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn missing_upload_dir_is_rejected() {
        let text = "[net]\nbind = \"127.0.0.1:3000\"\n\n[uploads]\ndir = \"/definitely/not/here\"\n";
        assert!(matches!(Config::parse(text), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::parse(&format!(
            "{}\n[db]\nurl = \"postgres://file\"\n\n[restore]\nsecret = \"from-file\"\n",
            minimal(dir.path())
        ))
        .unwrap();

        config.apply_env(|key| match key {
            "DATABASE_URL" => Some(String::from("postgres://env")),
            "RESTORE_SECRET" => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.db.url.as_deref(), Some("postgres://env"));
        assert_eq!(config.restore.secret.as_deref(), Some("from-file"));
    }
}
