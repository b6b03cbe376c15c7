use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level as written in the config file.
    ///
    /// Accepts level names case-insensitively as well as the legacy numeric
    /// levels (`1` = error, `2` = warn, `3` = info, `4` = debug). Anything
    /// else falls back to info.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "4" => LogLevel::Debug,
            "info" | "3" => LogLevel::Info,
            "warn" | "warning" | "2" => LogLevel::Warn,
            "error" | "1" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Older configs store the level as a number, newer ones as a string.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => LogLevel::parse_lenient(&s),
            Raw::Number(n) => LogLevel::parse_lenient(&n.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(LogLevel::parse_lenient("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::parse_lenient("Warning"), LogLevel::Warn);
        assert_eq!(LogLevel::parse_lenient("warn"), LogLevel::Warn);
        assert_eq!(LogLevel::parse_lenient("error"), LogLevel::Error);
        assert_eq!(LogLevel::parse_lenient("debug"), LogLevel::Debug);
    }

    #[test]
    fn test_parse_legacy_numbers() {
        assert_eq!(LogLevel::parse_lenient("1"), LogLevel::Error);
        assert_eq!(LogLevel::parse_lenient("2"), LogLevel::Warn);
        assert_eq!(LogLevel::parse_lenient("3"), LogLevel::Info);
        assert_eq!(LogLevel::parse_lenient("4"), LogLevel::Debug);
    }

    #[test]
    fn test_parse_unknown_falls_back_to_info() {
        assert_eq!(LogLevel::parse_lenient("verbose"), LogLevel::Info);
        assert_eq!(LogLevel::parse_lenient(""), LogLevel::Info);
    }

    #[test]
    fn test_deserialize_string_and_number() {
        let level: LogLevel = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(level, LogLevel::Error);
        let level: LogLevel = serde_json::from_str("2").unwrap();
        assert_eq!(level, LogLevel::Warn);
    }
}
