//! Command tree and root dispatch for the `curve` administration tool.
//!
//! This crate holds everything between the raw process arguments and a
//! subsystem handler:
//!
//! - [`CommandNode`] / [`FlagSpec`] — the command tree and its flags, with
//!   local and persistent scopes.
//! - [`match_args`] — greedy matching of arguments against the tree.
//! - [`register_subsystems`] — attaches subsystem subtrees supplied by
//!   [`SubsystemCommandFactory`] implementations.
//! - [`HelpContext`], [`help_text`], [`usage_text`], [`version_text`] — pure
//!   text rendering.
//! - [`Dispatcher`] — builds the root command and maps one invocation to an
//!   [`ExitStatus`].
//!
//! Tree construction errors ([`BuildError`]) are fatal at startup; parse
//! errors ([`ParseError`]) and handler errors end the invocation with
//! [`ExitStatus::Failure`].
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//!
//! use curve_cli_core::*;
//!
//! struct Version;
//!
//! impl VersionProvider for Version {
//!     fn version(&self) -> &str {
//!         "2.5.0"
//!     }
//! }
//!
//! struct Fs;
//!
//! impl SubsystemCommandFactory for Fs {
//!     fn build_command_tree(&self) -> Result<CommandNode, BuildError> {
//!         let mut fs = CommandNode::new("fs", "", "Manage curvefs cluster");
//!         fs.add_child(CommandNode::new("status", "", "Show cluster status").with_handler(
//!             |_: &Invocation, out: &mut dyn Write| -> Result<(), HandlerError> {
//!                 writeln!(out, "ok")?;
//!                 Ok(())
//!             },
//!         ))?;
//!         Ok(fs)
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new(RootConfig::new("curve", &Version), &[&Fs]).unwrap();
//! let (mut out, mut err) = (Vec::new(), Vec::new());
//!
//! assert_eq!(dispatcher.run(&["fs", "status"], &mut out, &mut err), ExitStatus::Success);
//! assert_eq!(out, b"ok\n");
//!
//! out.clear();
//! assert_eq!(dispatcher.run(&["--version"], &mut out, &mut err), ExitStatus::Success);
//! assert_eq!(out, b"curve 2.5.0\n");
//!
//! assert_eq!(dispatcher.run(&["bogus"], &mut out, &mut err), ExitStatus::Failure);
//! ```

mod dispatch;
mod matcher;
mod present;
mod registrar;
mod types;
mod validate;

pub use dispatch::{
    Dispatcher, ExitStatus, Outcome, ROOT_SHORT, ROOT_USAGE, RootConfig, VersionProvider,
    build_root_command,
};
pub use matcher::{Invocation, InvocationResult, ParseError, match_args};
pub use present::{CommandEntry, FlagLine, HelpContext, help_text, usage_text, version_text};
pub use registrar::{SubsystemCommandFactory, register_subsystems};
pub use types::*;
pub use validate::BuildError;
