use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use hocon::{Hocon, HoconLoader};
use log::debug;

use super::FsExt;

#[derive(Debug)]
pub struct ConfigLoader {
    hocon: Hocon,
    env: HashMap<String, String>,
    scope: String,
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

        debug!("Loaded config {:?} with scope {}", path, scope);

        Ok(Self { hocon, env, scope })
    }

    /// Looks up a key, preferring an environment variable of the same name,
    /// then the scoped section, then the top level of the file.
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

    pub fn get_relative_path(&self, name: &str) -> Result<PathBuf> {
        self.get(name)
            .and_then(|v| v.as_string())
            .ok_or_else(|| anyhow!("Missing config value: {}", name))?
            .relative_to_cwd()
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

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(val) => u64::try_from(*val).ok(),
            Value::String(val) => val.parse::<u64>().ok(),
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

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".conf")
            .tempfile()
            .unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_scoped_value_wins_over_top_level() {
        let file = write_config(
            r#"
            test_config_epochs = 10
            fake_train {
                test_config_epochs = 20
            }
            "#,
        );

        let config = ConfigLoader::new(file.path(), "fake_train".to_string()).unwrap();

        assert_eq!(
            config.get("test_config_epochs").and_then(|v| v.as_usize()),
            Some(20)
        );
    }

    #[test]
    fn test_falls_back_to_top_level() {
        let file = write_config(
            r#"
            test_config_l2_beta = 0.5
            fake_train {
                test_config_epochs = 20
            }
            "#,
        );

        let config = ConfigLoader::new(file.path(), "fake_train".to_string()).unwrap();

        assert_eq!(
            config.get("test_config_l2_beta").and_then(|v| v.as_f32()),
            Some(0.5)
        );
        assert!(config.get("test_config_missing").is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ConfigLoader::new("./does/not/exist.conf", "any".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::String("12".to_string()).as_usize(), Some(12));
        assert_eq!(Value::Integer(-1).as_usize(), None);
        assert_eq!(Value::Integer(3).as_f32(), Some(3.0));
        assert_eq!(Value::Boolean(true).as_string(), Some("true".to_string()));
        assert_eq!(Value::String("true".to_string()).as_bool(), Some(true));
    }
}
