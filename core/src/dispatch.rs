//! Root command construction and dispatch.
//!
//! [`Dispatcher::run`] is the whole life of one invocation: match the
//! arguments, decide on a terminal [`Outcome`], write it out and hand back an
//! [`ExitStatus`].

use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;

use tracing::debug;

use crate::matcher::{Invocation, InvocationResult, ParseError, match_args};
use crate::present::{HelpContext, help_text, usage_text, version_text};
use crate::registrar::{SubsystemCommandFactory, register_subsystems};
use crate::types::{CommandNode, FORMAT_FLAG, FlagSpec, HELP_FLAG, Runnable, VERSION_FLAG};
use crate::validate::BuildError;

/// Usage line of the root command.
pub const ROOT_USAGE: &str = "curve fs|bs [OPTIONS] COMMAND [ARGS...]";

/// Short description of the root command.
pub const ROOT_SHORT: &str = "curve is a tool for managing curvefs and curvebs";

/// Read-only, process-wide version string.
pub trait VersionProvider {
    fn version(&self) -> &str;
}

/// Inputs for building the root command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConfig {
    /// Root command name, also used in version and error text.
    pub program: String,
    pub version: String,
}

impl RootConfig {
    pub fn new(program: &str, provider: &dyn VersionProvider) -> Self {
        Self {
            program: program.to_string(),
            version: provider.version().to_string(),
        }
    }
}

/// Process exit status of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Builds the root command: global flags first, then the subsystems.
///
/// Calling this twice with the same factories yields trees with the same
/// [`outline`](CommandNode::outline).
pub fn build_root_command(
    config: &RootConfig,
    factories: &[&dyn SubsystemCommandFactory],
) -> Result<CommandNode, BuildError> {
    let mut root = CommandNode::new(&config.program, ROOT_USAGE, ROOT_SHORT);
    root.add_flag(
        FlagSpec::boolean(VERSION_FLAG, Some('v'))
            .with_description(&format!("Print {} version", config.program)),
    )?;
    root.add_flag(
        FlagSpec::boolean(HELP_FLAG, Some('h'))
            .with_description("Print usage")
            .persistent(),
    )?;
    root.add_flag(
        FlagSpec::string(FORMAT_FLAG, Some('f'))
            .with_description("Output format(json|plain)")
            .persistent(),
    )?;

    register_subsystems(&mut root, factories)?;
    Ok(root)
}

/// Terminal state chosen for one invocation.
pub enum Outcome<'a> {
    /// Write help for the node at the end of `chain` to the error stream.
    ShowHelp {
        chain: Vec<&'a CommandNode>,
        status: ExitStatus,
    },
    /// Write `error` to the error stream, followed by usage if requested.
    ReportError {
        chain: Vec<&'a CommandNode>,
        error: ParseError,
        show_usage: bool,
    },
    /// Write the version line to the output stream.
    ShowVersion,
    /// Run the matched node's handler.
    Dispatch {
        handler: &'a dyn Runnable,
        invocation: Invocation,
    },
}

impl fmt::Debug for Outcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShowHelp { chain, status } => f
                .debug_struct("ShowHelp")
                .field("path", &chain_path(chain))
                .field("status", status)
                .finish(),
            Self::ReportError {
                chain,
                error,
                show_usage,
            } => f
                .debug_struct("ReportError")
                .field("path", &chain_path(chain))
                .field("error", error)
                .field("show_usage", show_usage)
                .finish(),
            Self::ShowVersion => f.write_str("ShowVersion"),
            Self::Dispatch { invocation, .. } => f
                .debug_struct("Dispatch")
                .field("invocation", invocation)
                .finish_non_exhaustive(),
        }
    }
}

fn chain_path(chain: &[&CommandNode]) -> String {
    chain.iter().map(|n| n.name()).collect::<Vec<_>>().join(" ")
}

/// Owns the root command tree for one process run.
pub struct Dispatcher {
    root: CommandNode,
    config: RootConfig,
}

impl Dispatcher {
    pub fn new(
        config: RootConfig,
        factories: &[&dyn SubsystemCommandFactory],
    ) -> Result<Self, BuildError> {
        let root = build_root_command(&config, factories)?;
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &CommandNode {
        &self.root
    }

    /// Matches `args` (program name excluded) and picks the terminal state.
    ///
    /// Precedence: help, then parse errors, then `--version` on the bare
    /// root, then the handler, then the missing/unknown subcommand fallback.
    pub fn decide<S: AsRef<str>>(&self, args: &[S]) -> Outcome<'_> {
        let InvocationResult {
            invocation,
            help_requested,
            error,
        } = match_args(&self.root, args);
        let chain = self.root.resolve_path(invocation.path.as_slice());

        if help_requested {
            return Outcome::ShowHelp {
                chain,
                status: ExitStatus::Success,
            };
        }

        if let Some(error) = error {
            return Outcome::ReportError {
                chain,
                error,
                show_usage: true,
            };
        }

        let node = chain[chain.len() - 1];
        if chain.len() == 1 && invocation.get_bool(VERSION_FLAG) {
            return Outcome::ShowVersion;
        }

        if let Some(handler) = node.handler() {
            return Outcome::Dispatch {
                handler,
                invocation,
            };
        }

        match invocation.args.first() {
            None => Outcome::ShowHelp {
                chain,
                status: ExitStatus::Failure,
            },
            Some(token) => Outcome::ReportError {
                error: ParseError::UnknownCommand {
                    path: invocation.command_path(),
                    token: token.clone(),
                },
                chain,
                show_usage: false,
            },
        }
    }

    /// Runs one invocation, writing command output to `out` and help, usage
    /// and errors to `err`.
    pub fn run<S: AsRef<str>>(
        &self,
        args: &[S],
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> ExitStatus {
        match self.execute(self.decide(args), out, err) {
            Ok(status) => status,
            Err(io_err) => {
                debug!(error = %io_err, "failed to write command output");
                ExitStatus::Failure
            }
        }
    }

    fn execute(
        &self,
        outcome: Outcome<'_>,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<ExitStatus> {
        match outcome {
            Outcome::ShowHelp { chain, status } => {
                debug!(path = %path_of(&chain), ?status, "showing help");
                if let Some(ctx) = HelpContext::from_chain(&chain) {
                    err.write_all(help_text(&ctx).as_bytes())?;
                }
                Ok(status)
            }
            Outcome::ReportError {
                chain,
                error,
                show_usage,
            } => {
                debug!(path = %path_of(&chain), %error, "reporting error");
                writeln!(err, "{error}")?;
                if show_usage {
                    if let Some(ctx) = HelpContext::from_chain(&chain) {
                        err.write_all(usage_text(&ctx).as_bytes())?;
                    }
                }
                Ok(ExitStatus::Failure)
            }
            Outcome::ShowVersion => {
                out.write_all(version_text(&self.config.program, &self.config.version).as_bytes())?;
                Ok(ExitStatus::Success)
            }
            Outcome::Dispatch {
                handler,
                invocation,
            } => {
                debug!(path = %invocation.command_path(), args = ?invocation.args, "dispatching");
                match handler.execute(&invocation, out) {
                    Ok(()) => Ok(ExitStatus::Success),
                    Err(handler_err) => {
                        writeln!(err, "{handler_err}")?;
                        Ok(ExitStatus::Failure)
                    }
                }
            }
        }
    }
}

fn path_of(chain: &[&CommandNode]) -> String {
    chain.iter().map(|n| n.name()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use crate::types::HandlerError;

    use super::*;

    struct FixedVersion;

    impl VersionProvider for FixedVersion {
        fn version(&self) -> &str {
            "1.2.3"
        }
    }

    struct Fs;

    impl SubsystemCommandFactory for Fs {
        fn build_command_tree(&self) -> Result<CommandNode, BuildError> {
            let mut fs = CommandNode::new("fs", "", "Manage curvefs cluster");
            let echo = CommandNode::new("echo", "", "Echo arguments").with_handler(
                |inv: &Invocation, out: &mut dyn Write| -> Result<(), HandlerError> {
                    writeln!(out, "{} [{}]", inv.args.join(","), inv.get_str("format").unwrap_or(""))?;
                    Ok(())
                },
            );
            let fail = CommandNode::new("fail", "", "Always fails").with_handler(
                |_: &Invocation, _: &mut dyn Write| -> Result<(), HandlerError> {
                    Err("cluster unreachable".into())
                },
            );
            fs.add_child(echo)?;
            fs.add_child(fail)?;
            Ok(fs)
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(RootConfig::new("curve", &FixedVersion), &[&Fs]).unwrap()
    }

    fn run(args: &[&str]) -> (ExitStatus, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let status = dispatcher().run(args, &mut out, &mut err);
        (
            status,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_no_args_shows_help_and_fails() {
        let (status, out, err) = run(&[]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(out.is_empty());
        assert!(err.starts_with(ROOT_SHORT));
        assert!(err.contains("Usage:  curve fs|bs [OPTIONS] COMMAND [ARGS...]"));
    }

    #[test]
    fn test_unknown_command_message_is_exact() {
        let (status, out, err) = run(&["bogus"]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(out.is_empty());
        assert_eq!(err, "curve: 'bogus' is not a curve command.\nSee 'curve --help'\n");
    }

    #[test]
    fn test_version_flag() {
        for flag in ["--version", "-v"] {
            let (status, out, err) = run(&[flag]);
            assert_eq!(status, ExitStatus::Success);
            assert_eq!(out, "curve 1.2.3\n");
            assert!(err.is_empty());
        }
    }

    #[test]
    fn test_help_beats_version() {
        let (status, out, err) = run(&["--version", "--help"]);
        assert_eq!(status, ExitStatus::Success);
        assert!(out.is_empty());
        assert!(err.contains("Usage:"));
    }

    #[test]
    fn test_subsystem_help() {
        let (status, _, err) = run(&["fs", "--help"]);
        assert_eq!(status, ExitStatus::Success);
        assert!(err.starts_with("Manage curvefs cluster\n"));
        assert!(err.contains("Usage:  curve fs [OPTIONS] COMMAND [ARGS...]"));
    }

    #[test]
    fn test_help_short_circuits_handler() {
        let (status, out, err) = run(&["fs", "echo", "a", "-h"]);
        assert_eq!(status, ExitStatus::Success);
        assert!(out.is_empty());
        assert!(err.starts_with("Echo arguments\n"));
    }

    #[test]
    fn test_help_short_circuits_flag_errors() {
        let (status, _, err) = run(&["fs", "--nope", "--help"]);
        assert_eq!(status, ExitStatus::Success);
        assert!(!err.contains("unknown flag"));
    }

    #[test]
    fn test_handler_receives_args_and_persistent_flags() {
        let (status, out, err) = run(&["-f", "json", "fs", "echo", "a", "b"]);
        assert_eq!(status, ExitStatus::Success);
        assert_eq!(out, "a,b [json]\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_handler_error_is_reported_without_usage() {
        let (status, out, err) = run(&["fs", "fail"]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(out.is_empty());
        assert_eq!(err, "cluster unreachable\n");
    }

    #[test]
    fn test_flag_error_shows_usage() {
        let (status, _, err) = run(&["fs", "--nope"]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(err.starts_with("unknown flag: --nope\nUsage:  curve fs"));
    }

    #[test]
    fn test_version_not_accepted_below_root() {
        let (status, out, err) = run(&["fs", "--version"]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(out.is_empty());
        assert!(err.starts_with("unknown flag: --version\n"));
    }

    #[test]
    fn test_subsystem_without_subcommand() {
        let (status, _, err) = run(&["fs"]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(err.starts_with("Manage curvefs cluster\n"));

        let (status, _, err) = run(&["fs", "bogus"]);
        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(
            err,
            "curve fs: 'bogus' is not a curve fs command.\nSee 'curve fs --help'\n"
        );
    }

    #[test]
    fn test_decide_dispatch_carries_invocation() {
        let dispatcher = dispatcher();
        match dispatcher.decide(&["fs", "echo", "x"]) {
            Outcome::Dispatch { invocation, .. } => {
                assert_eq!(invocation.path, ["curve", "fs", "echo"]);
                assert_eq!(invocation.args, ["x"]);
            }
            _ => panic!("expected dispatch"),
        }
    }

    #[test]
    fn test_local_root_flag_before_subcommand_is_rejected() {
        for flag in ["-v", "--version"] {
            let (status, out, err) = run(&[flag, "fs", "echo"]);
            assert_eq!(status, ExitStatus::Failure, "{flag}");
            assert!(out.is_empty());
            assert!(err.starts_with(&format!("unknown flag: {flag}
Usage:  curve fs")));
        }
    }

    #[test]
    fn test_help_after_flag_error_targets_later_subcommand() {
        let (status, _, err) = run(&["--bogus", "fs", "--help"]);
        assert_eq!(status, ExitStatus::Success);
        assert!(err.starts_with("Manage curvefs cluster
"));

        let (status, _, err) = run(&["--bogus", "--help=1"]);
        assert_eq!(status, ExitStatus::Success);
        assert!(err.starts_with(ROOT_SHORT));
    }

    #[test]
    fn test_short_help_set_false() {
        let (status, out, err) = run(&["-h=false", "fs", "echo", "a"]);
        assert_eq!(status, ExitStatus::Success);
        assert_eq!(out, "a []\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_outcome_debug() {
        let dispatcher = dispatcher();
        let rendered = format!("{:?}", dispatcher.decide(&["fs", "echo", "x"]));
        assert!(rendered.starts_with("Dispatch { invocation: Invocation {"));
        assert!(rendered.ends_with(", .. }"));

        let rendered = format!("{:?}", dispatcher.decide(&["fs", "--nope"]));
        assert!(rendered.starts_with("ReportError { path: \"curve fs\", error: UnknownFlag("));

        assert_eq!(format!("{:?}", dispatcher.decide(&["-v"])), "ShowVersion");
    }

    #[test]
    fn test_build_is_repeatable() {
        let config = RootConfig::new("curve", &FixedVersion);
        let first = build_root_command(&config, &[&Fs]).unwrap();
        let second = build_root_command(&config, &[&Fs]).unwrap();
        assert_eq!(first.outline(), second.outline());
        assert_eq!(
            first.outline(),
            vec!["curve", "curve fs", "curve fs echo", "curve fs fail"]
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::Failure.code(), 1);
    }
}
