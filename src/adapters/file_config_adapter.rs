//! INI file configuration adapter.

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| EngineError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, EngineError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| EngineError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[data]
source = csv
csv_dir = /var/data/prices

[strategy]
name = Mean Reversion
lookback_window = 20
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "csv_dir"),
            Some("/var/data/prices".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("Mean Reversion".to_string())
        );
        assert_eq!(adapter.get_integer("strategy", "lookback_window").unwrap(), Some(20));
    }

    #[test]
    fn missing_keys_and_sections() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nworkers = 4\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_integer("backtest", "missing").unwrap(), None);
    }

    #[test]
    fn get_integer_rejects_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nworkers = many\nbatch_size =\n").unwrap();
        assert!(matches!(
            adapter.get_integer("backtest", "workers"),
            Err(EngineError::ConfigInvalid { ref key, .. }) if key == "workers"
        ));
        assert_eq!(adapter.get_integer("backtest", "batch_size").unwrap(), None);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("backtest", "a", false));
        assert!(adapter.get_bool("backtest", "b", false));
        assert!(adapter.get_bool("backtest", "c", false));
        assert!(!adapter.get_bool("backtest", "d", true));
        assert!(!adapter.get_bool("backtest", "e", true));
        assert!(!adapter.get_bool("backtest", "f", true));
        assert!(adapter.get_bool("backtest", "g", true));
        assert!(!adapter.get_bool("backtest", "missing", false));
    }

    #[test]
    fn get_decimal_parses_exactly() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\nbuy_threshold = -0.05\nfee_rate = 1e-3\nbad = ten\nempty =\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_decimal("strategy", "buy_threshold").unwrap(),
            Some(dec!(-0.05))
        );
        assert_eq!(
            adapter.get_decimal("strategy", "fee_rate").unwrap(),
            Some(dec!(0.001))
        );
        assert_eq!(adapter.get_decimal("strategy", "missing").unwrap(), None);
        assert_eq!(adapter.get_decimal("strategy", "empty").unwrap(), None);
        let err = adapter.get_decimal("strategy", "bad").unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid { ref key, .. } if key == "bad"));
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter =
            FileConfigAdapter::from_string("[filter]\nexclude = AAA, BBB ,,CCC\n").unwrap();
        assert_eq!(adapter.get_list("filter", "exclude"), vec!["AAA", "BBB", "CCC"]);
        assert!(adapter.get_list("filter", "include").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[report]\nformat = json\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("report", "format"), Some("json".to_string()));
    }

    #[test]
    fn from_file_missing_is_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse { .. }));
    }
}
