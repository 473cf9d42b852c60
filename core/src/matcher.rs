//! Argument matching against the command tree.
//!
//! Matching is a single greedy pass: positional tokens descend into children
//! while they name one, flags are consumed at whatever depth they appear, and
//! everything else is left for the matched node's handler.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;

use crate::types::{CommandNode, FlagKind, FlagSpec, FlagValue, HELP_FLAG, visible_flags};

/// Parse-level errors, reported with the usage of the node reached so far.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Flag is not declared on the matched node or its ancestors.
    #[error("unknown flag: {0}")]
    UnknownFlag(String),
    /// String flag given as the last token with no value.
    #[error("flag needs an argument: {0}")]
    MissingFlagValue(String),
    /// Bool flag given an inline value other than true/false.
    #[error("invalid argument \"{value}\" for \"{flag}\" flag")]
    InvalidBoolValue { flag: String, value: String },
    /// First positional token below a node without a handler names no child.
    #[error("{path}: '{token}' is not a {path} command.\nSee '{path} --help'")]
    UnknownCommand { path: String, token: String },
}

/// What a handler gets to see: the matched path, the unconsumed arguments and
/// every flag visible at the matched node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Names from the root down to the matched node.
    pub path: Vec<String>,
    /// Positional arguments not consumed by command matching.
    pub args: Vec<String>,
    values: BTreeMap<String, FlagValue>,
    changed: BTreeSet<String>,
}

impl Invocation {
    /// Path joined with spaces, e.g. `curve fs version`.
    pub fn command_path(&self) -> String {
        self.path.join(" ")
    }

    /// Value of a flag, `None` if it is not visible at the matched node.
    pub fn flag(&self, long: &str) -> Option<&FlagValue> {
        self.values.get(long)
    }

    /// Bool flag value; `false` if unknown or not a bool.
    pub fn get_bool(&self, long: &str) -> bool {
        matches!(self.values.get(long), Some(FlagValue::Bool(true)))
    }

    /// String flag value; `None` if unknown or not a string.
    pub fn get_str(&self, long: &str) -> Option<&str> {
        match self.values.get(long) {
            Some(FlagValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether the flag was given on the command line.
    pub fn is_set(&self, long: &str) -> bool {
        self.changed.contains(long)
    }
}

/// Result of matching one argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub invocation: Invocation,
    /// `--help` was given anywhere before `--`, even if matching failed.
    pub help_requested: bool,
    pub error: Option<ParseError>,
}

impl InvocationResult {
    pub fn matched_path(&self) -> &[String] {
        &self.invocation.path
    }

    pub fn remaining_args(&self) -> &[String] {
        &self.invocation.args
    }
}

/// Matches `args` (program name excluded) against the tree rooted at `root`.
///
/// # Examples
///
/// ```
/// use curve_cli_core::{CommandNode, FlagSpec, match_args};
///
/// let mut root = CommandNode::new("curve", "", "");
/// root.add_flag(FlagSpec::string("format", Some('f')).persistent()).unwrap();
/// root.add_child(CommandNode::new("fs", "", "")).unwrap();
///
/// let result = match_args(&root, &["-f", "json", "fs", "extra"]);
/// assert!(result.error.is_none());
/// assert_eq!(result.matched_path(), ["curve", "fs"]);
/// assert_eq!(result.remaining_args(), ["extra"]);
/// assert_eq!(result.invocation.get_str("format"), Some("json"));
/// ```
pub fn match_args<S: AsRef<str>>(root: &CommandNode, args: &[S]) -> InvocationResult {
    let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
    let mut matcher = Matcher::new(root);
    let error = matcher.consume(&args).err();
    let result = matcher.finish(error);
    debug!(
        path = %result.invocation.command_path(),
        remaining = result.invocation.args.len(),
        help = result.help_requested,
        error = ?result.error,
        "matched arguments"
    );
    result
}

struct Matcher<'a> {
    chain: Vec<&'a CommandNode>,
    args: Vec<String>,
    values: BTreeMap<String, FlagValue>,
    changed: BTreeSet<String>,
    /// Flag token as typed on the command line, keyed by long name.
    given: BTreeMap<String, String>,
    help_seen: bool,
}

impl<'a> Matcher<'a> {
    fn new(root: &'a CommandNode) -> Self {
        Self {
            chain: vec![root],
            args: Vec::new(),
            values: BTreeMap::new(),
            changed: BTreeSet::new(),
            given: BTreeMap::new(),
            help_seen: false,
        }
    }

    fn consume(&mut self, args: &[String]) -> Result<(), ParseError> {
        let mut pos = 0;
        while pos < args.len() {
            match self.step(args, pos) {
                Ok(next) => pos = next,
                Err(err) => {
                    self.recover_help(args, pos);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Consumes the token at `pos` (plus a flag value if needed) and returns
    /// the position of the next unread token.
    fn step(&mut self, args: &[String], pos: usize) -> Result<usize, ParseError> {
        let token = args[pos].as_str();
        if token == "--" {
            self.args.extend(args[pos + 1..].iter().cloned());
            return Ok(args.len());
        }
        if let Some(body) = token.strip_prefix("--") {
            return self.long_flag(body, args, pos);
        }
        if let Some(cluster) = token.strip_prefix('-') {
            if !cluster.is_empty() {
                return self.short_flags(cluster, args, pos);
            }
        }
        self.positional(token)?;
        Ok(pos + 1)
    }

    fn long_flag(&mut self, body: &str, args: &[String], pos: usize) -> Result<usize, ParseError> {
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let spec = self
            .lookup(|f| f.matches_long(name))
            .ok_or_else(|| ParseError::UnknownFlag(format!("--{name}")))?;
        let display = format!("--{name}");

        match spec.kind() {
            FlagKind::Bool => {
                let value = match inline {
                    Some(raw) => parse_bool(&display, raw)?,
                    None => true,
                };
                self.set(spec, &display, FlagValue::Bool(value));
                Ok(pos + 1)
            }
            FlagKind::String => match inline {
                Some(value) => {
                    self.set(spec, &display, FlagValue::Str(value.to_string()));
                    Ok(pos + 1)
                }
                None => {
                    let value = args
                        .get(pos + 1)
                        .ok_or_else(|| ParseError::MissingFlagValue(display.clone()))?;
                    self.set(spec, &display, FlagValue::Str(value.clone()));
                    Ok(pos + 2)
                }
            },
        }
    }

    /// Handles `-x`, `-xvalue`, `-x value`, `-x=true` and bool clusters
    /// like `-hv`.
    fn short_flags(
        &mut self,
        cluster: &str,
        args: &[String],
        pos: usize,
    ) -> Result<usize, ParseError> {
        for (idx, c) in cluster.char_indices() {
            let display = format!("-{c}");
            let spec = self
                .lookup(|f| f.matches_short(c))
                .ok_or_else(|| ParseError::UnknownFlag(display.clone()))?;
            let rest = &cluster[idx + c.len_utf8()..];

            if spec.kind() == FlagKind::Bool {
                if let Some(raw) = rest.strip_prefix('=') {
                    let value = parse_bool(&display, raw)?;
                    self.set(spec, &display, FlagValue::Bool(value));
                    return Ok(pos + 1);
                }
                self.set(spec, &display, FlagValue::Bool(true));
                continue;
            }

            let rest = rest.strip_prefix('=').unwrap_or(rest);
            if !rest.is_empty() {
                self.set(spec, &display, FlagValue::Str(rest.to_string()));
                return Ok(pos + 1);
            }
            let value = args
                .get(pos + 1)
                .ok_or_else(|| ParseError::MissingFlagValue(display.clone()))?;
            self.set(spec, &display, FlagValue::Str(value.clone()));
            return Ok(pos + 2);
        }
        Ok(pos + 1)
    }

    /// Descends into a child when `token` names one, otherwise keeps it as an
    /// argument. Flags already given must still be accepted by the child.
    fn positional(&mut self, token: &str) -> Result<(), ParseError> {
        if self.args.is_empty() {
            let current = self.current();
            if let Some(child) = current.find_child(token) {
                self.chain.push(child);
                return self.check_given_flags();
            }
        }
        self.args.push(token.to_string());
        Ok(())
    }

    fn check_given_flags(&self) -> Result<(), ParseError> {
        let visible = visible_flags(&self.chain);
        for (long, token) in &self.given {
            if !visible.iter().any(|f| f.matches_long(long)) {
                return Err(ParseError::UnknownFlag(token.clone()));
            }
        }
        Ok(())
    }

    fn current(&self) -> &'a CommandNode {
        self.chain[self.chain.len() - 1]
    }

    fn lookup(&self, pred: impl Fn(&FlagSpec) -> bool) -> Option<&'a FlagSpec> {
        visible_flags(&self.chain).into_iter().find(|f| pred(*f))
    }

    fn set(&mut self, spec: &FlagSpec, token: &str, value: FlagValue) {
        let long = spec.long().to_string();
        self.values.insert(long.clone(), value);
        self.changed.insert(long.clone());
        self.given.insert(long, token.to_string());
    }

    /// Scans the tokens from the failing one onwards for a help request
    /// once matching has failed. When help is asked for, child names further
    /// along are still followed so help is shown for the command the user
    /// was after.
    fn recover_help(&mut self, args: &[String], failed: usize) {
        let rest: Vec<&str> = args[failed..]
            .iter()
            .map(String::as_str)
            .take_while(|token| *token != "--")
            .collect();
        if !rest.iter().any(|token| self.asks_for_help(token)) {
            return;
        }
        self.help_seen = true;

        let mut tokens = rest.iter().skip(1);
        while let Some(token) = tokens.next() {
            if let Some(body) = token.strip_prefix("--") {
                let takes_value = !body.contains('=')
                    && self
                        .lookup(|f| f.matches_long(body))
                        .is_some_and(|f| f.kind() == FlagKind::String);
                if takes_value {
                    tokens.next();
                }
            } else if let Some(cluster) = token.strip_prefix('-').filter(|c| !c.is_empty()) {
                if self.cluster_awaits_value(cluster) {
                    tokens.next();
                }
            } else if !self.args.is_empty() {
                break;
            } else if let Some(child) = self.current().find_child(token) {
                self.chain.push(child);
            } else {
                break;
            }
        }
    }

    /// Whether one token sets the help flag to true at the current node.
    fn asks_for_help(&self, token: &str) -> bool {
        if let Some(body) = token.strip_prefix("--") {
            return match body.split_once('=') {
                Some((name, raw)) => name == HELP_FLAG && parse_bool(token, raw) == Ok(true),
                None => body == HELP_FLAG,
            };
        }
        let Some(cluster) = token.strip_prefix('-') else {
            return false;
        };
        let Some(help_short) = self.lookup(|f| f.matches_long(HELP_FLAG)).and_then(FlagSpec::short)
        else {
            return false;
        };
        for (idx, c) in cluster.char_indices() {
            let rest = &cluster[idx + c.len_utf8()..];
            if c == help_short {
                return match rest.strip_prefix('=') {
                    Some(raw) => parse_bool(token, raw) == Ok(true),
                    None => true,
                };
            }
            if self
                .lookup(|f| f.matches_short(c))
                .is_some_and(|f| f.kind() == FlagKind::String)
            {
                return false;
            }
        }
        false
    }

    /// Whether a short cluster ends in a string flag whose value is the next
    /// token.
    fn cluster_awaits_value(&self, cluster: &str) -> bool {
        for (idx, c) in cluster.char_indices() {
            if self
                .lookup(|f| f.matches_short(c))
                .is_some_and(|f| f.kind() == FlagKind::String)
            {
                return cluster[idx + c.len_utf8()..].is_empty();
            }
        }
        false
    }

    fn finish(self, error: Option<ParseError>) -> InvocationResult {
        let visible = visible_flags(&self.chain);
        let mut values = BTreeMap::new();
        let mut changed = BTreeSet::new();
        for flag in visible {
            let long = flag.long();
            let value = self
                .values
                .get(long)
                .cloned()
                .unwrap_or_else(|| flag.default_value().clone());
            if self.changed.contains(long) {
                changed.insert(long.to_string());
            }
            values.insert(long.to_string(), value);
        }

        let help_requested =
            self.help_seen || matches!(values.get(HELP_FLAG), Some(FlagValue::Bool(true)));

        InvocationResult {
            invocation: Invocation {
                path: self.chain.iter().map(|n| n.name().to_string()).collect(),
                args: self.args,
                values,
                changed,
            },
            help_requested,
            error,
        }
    }
}

fn parse_bool(flag: &str, raw: &str) -> Result<bool, ParseError> {
    match raw {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ParseError::InvalidBoolValue {
            flag: flag.to_string(),
            value: raw.to_string(),
        }),
    }
}
