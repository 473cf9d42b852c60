//! Output format selection for subcommands.

use clap::ValueEnum;

/// Values accepted by the persistent `--format` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Plain,
}

impl OutputFormat {
    /// Parses the raw `--format` value. Unset (empty) means plain.
    pub fn from_flag(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Ok(Self::Plain);
        }
        <Self as ValueEnum>::from_str(raw, false).map_err(|_| {
            let expected: Vec<String> = Self::value_variants()
                .iter()
                .filter_map(|v| v.to_possible_value())
                .map(|v| v.get_name().to_string())
                .collect();
            format!(
                "invalid format '{raw}', expected one of: {}",
                expected.join(", ")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::OutputFormat;

    #[test]
    fn test_from_flag_accepts_known_values() {
        assert_eq!(OutputFormat::from_flag("json"), Ok(OutputFormat::Json));
        assert_eq!(OutputFormat::from_flag("plain"), Ok(OutputFormat::Plain));
        assert_eq!(OutputFormat::from_flag(""), Ok(OutputFormat::Plain));
    }

    #[test]
    fn test_from_flag_rejects_unknown_value() {
        assert_eq!(
            OutputFormat::from_flag("yaml"),
            Err("invalid format 'yaml', expected one of: json, plain".to_string())
        );
    }
}
