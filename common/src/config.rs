use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use hocon::{Hocon, HoconLoader};

/// Reads settings from a HOCON file. Keys are looked up in the configured scope first and then at
/// the top level. Environment variables with the same name take precedence over the file.
#[derive(Debug)]
pub struct ConfigLoader {
    hocon: Hocon,
    env: HashMap<String, String>,
    scope: String,
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(path: impl AsRef<Path>, scope: String) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(anyhow!("The config file {:?} was not found", path));
        }

        let env = std::env::vars().collect::<HashMap<_, _>>();

        let hocon = HoconLoader::new()
            .load_file(path)
            .with_context(|| format!("Failed to find or load config file at: {:?}", path))?
            .hocon()?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            hocon,
            env,
            scope,
            base_dir,
        })
    }

    /// A loader without any file, every lookup falls back to the environment only.
    pub fn empty(scope: String) -> Self {
        Self {
            hocon: Hocon::Hash(Default::default()),
            env: std::env::vars().collect(),
            scope,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.env.get(name) {
            return Some(Value::String(value.clone()));
        }

        let scope = &self.hocon[self.scope.as_str()];
        if matches!(scope, Hocon::Hash(_)) {
            if let Some(value) = Self::map_hocon(scope, name) {
                return Some(value);
            }
        }

        Self::map_hocon(&self.hocon, name)
    }

    /// Resolves a path valued key relative to the directory of the config file.
    pub fn get_relative_path(&self, name: &str) -> Result<PathBuf> {
        let value = self
            .get(name)
            .and_then(|v| v.as_string())
            .ok_or_else(|| anyhow!("Config value {} is not set", name))?;

        Ok(self.base_dir.join(value))
    }

    pub fn load<T: Config>(&self) -> Result<T> {
        let res = T::load(self)?;
        Ok(res)
    }

    fn map_hocon(hocon: &Hocon, name: &str) -> Option<Value> {
        match &hocon[name] {
            Hocon::Real(f64) => Some(Value::Float(*f64 as f32)),
            Hocon::Integer(i64) => Some(Value::Integer(*i64)),
            Hocon::String(string) => Some(Value::String(string.clone())),
            Hocon::Boolean(bool) => Some(Value::Boolean(*bool)),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f32),
    Boolean(bool),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(val) => Some(*val),
            Value::String(val) => Hocon::String(val.clone()).as_bool(),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Integer(val) => usize::try_from(*val).ok(),
            Value::String(val) => val.parse::<usize>().ok(),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(val) => i32::try_from(*val).ok(),
            Value::String(val) => val.parse::<i32>().ok(),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::Integer(val) => u8::try_from(*val).ok(),
            Value::String(val) => val.parse::<u8>().ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(val) => Some(*val),
            Value::Integer(val) => Some(*val as f32),
            Value::String(val) => val.parse::<f32>().ok(),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(val) => Some(val.clone()),
            Value::Boolean(true) => Some("true".to_string()),
            Value::Boolean(false) => Some("false".to_string()),
            Value::Float(val) => Some(val.to_string()),
            Value::Integer(val) => Some(val.to_string()),
        }
    }
}

pub trait Config {
    fn load(config: &ConfigLoader) -> Result<Self>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.conf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_scoped_value_wins_over_top_level() {
        let (_dir, path) = write_config(
            r#"
            book_test_level = 3
            book_scope { book_test_level = 7 }
            "#,
        );

        let config = ConfigLoader::new(&path, "book_scope".to_string()).unwrap();
        let level = config.get("book_test_level").and_then(|v| v.as_u8());

        assert_eq!(level, Some(7));
    }

    #[test]
    fn test_falls_back_to_top_level() {
        let (_dir, path) = write_config(
            r#"
            book_test_error = 4
            book_scope { }
            "#,
        );

        let config = ConfigLoader::new(&path, "book_scope".to_string()).unwrap();
        let error = config.get("book_test_error").and_then(|v| v.as_i32());

        assert_eq!(error, Some(4));
    }

    #[test]
    fn test_relative_path_is_based_on_config_dir() {
        let (dir, path) = write_config(r#"book_test_file = "books/main.gz""#);

        let config = ConfigLoader::new(&path, "book".to_string()).unwrap();
        let book_path = config.get_relative_path("book_test_file").unwrap();

        assert_eq!(book_path, dir.path().join("books/main.gz"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ConfigLoader::new("/definitely/not/here.conf", "book".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_loader_falls_back_to_defaults_and_env() {
        std::env::set_var("COMMON_TEST_EMPTY_LEVEL", "9");
        let config = ConfigLoader::empty("book".to_string());

        let level = config
            .get("common_test_empty_missing")
            .and_then(|v| v.as_u8())
            .unwrap_or(5);
        assert_eq!(level, 5);
        assert!(config.get_relative_path("common_test_empty_file").is_err());

        let from_env = config.get("COMMON_TEST_EMPTY_LEVEL").and_then(|v| v.as_u8());
        assert_eq!(from_env, Some(9));
    }

    #[test]
    fn test_negative_integer_is_not_usize() {
        assert_eq!(Value::Integer(-3).as_usize(), None);
        assert_eq!(Value::Integer(-3).as_i32(), Some(-3));
    }
}
