//! The `fs` subsystem command tree.

use std::io::Write;

use curve_cli_core::{
    BuildError, CommandNode, FORMAT_FLAG, HandlerError, Invocation, Runnable,
    SubsystemCommandFactory,
};
use serde::Serialize;

use crate::output::OutputFormat;

/// Builds `curve fs` and its subcommands.
pub struct FsCommandFactory {
    version: String,
}

impl FsCommandFactory {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
        }
    }
}

impl SubsystemCommandFactory for FsCommandFactory {
    fn build_command_tree(&self) -> Result<CommandNode, BuildError> {
        let mut fs = CommandNode::new("fs", "", "Manage curvefs cluster");
        fs.add_child(
            CommandNode::new("version", "", "Show the curvefs tool version").with_handler(
                VersionCommand {
                    version: self.version.clone(),
                },
            ),
        )?;
        Ok(fs)
    }
}

#[derive(Debug, Serialize)]
struct VersionReport<'a> {
    program: &'a str,
    subsystem: &'a str,
    version: &'a str,
}

struct VersionCommand {
    version: String,
}

impl Runnable for VersionCommand {
    fn execute(&self, invocation: &Invocation, out: &mut dyn Write) -> Result<(), HandlerError> {
        if let Some(extra) = invocation.args.first() {
            return Err(format!(
                "{}: unexpected argument '{extra}'",
                invocation.command_path()
            )
            .into());
        }

        let format = OutputFormat::from_flag(invocation.get_str(FORMAT_FLAG).unwrap_or(""))?;
        let report = VersionReport {
            program: invocation.path.first().map(String::as_str).unwrap_or("curve"),
            subsystem: "fs",
            version: &self.version,
        };
        match format {
            OutputFormat::Json => {
                let raw = serde_json::to_string_pretty(&report)
                    .map_err(|err| format!("JSON serialization failed: {err}"))?;
                writeln!(out, "{raw}")?;
            }
            OutputFormat::Plain => writeln!(out, "curvefs {}", report.version)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use curve_cli_core::{ExitStatus, RootConfig, VersionProvider};

    use super::*;

    struct Fixed;

    impl VersionProvider for Fixed {
        fn version(&self) -> &str {
            "9.9.9"
        }
    }

    fn run(args: &[&str]) -> (ExitStatus, String, String) {
        let config = RootConfig::new("curve", &Fixed);
        let fs = FsCommandFactory::new(&config.version);
        let dispatcher = curve_cli_core::Dispatcher::new(config, &[&fs]).unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let status = dispatcher.run(args, &mut out, &mut err);
        (
            status,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_tree_shape() {
        let tree = FsCommandFactory::new("1.0.0").build_command_tree().unwrap();
        assert_eq!(tree.outline(), vec!["fs", "fs version"]);
        assert!(tree.handler().is_none());
    }

    #[test]
    fn test_version_plain_by_default() {
        let (status, out, err) = run(&["fs", "version"]);
        assert_eq!(status, ExitStatus::Success);
        assert_eq!(out, "curvefs 9.9.9\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_version_json() {
        let (status, out, _) = run(&["fs", "version", "--format", "json"]);
        assert_eq!(status, ExitStatus::Success);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["program"], "curve");
        assert_eq!(parsed["subsystem"], "fs");
        assert_eq!(parsed["version"], "9.9.9");
    }

    #[test]
    fn test_version_rejects_unknown_format() {
        let (status, out, err) = run(&["-f", "xml", "fs", "version"]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(out.is_empty());
        assert_eq!(err, "invalid format 'xml', expected one of: json, plain\n");
    }

    #[test]
    fn test_version_rejects_extra_arguments() {
        let (status, _, err) = run(&["fs", "version", "now"]);
        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(err, "curve fs version: unexpected argument 'now'\n");
    }
}
