//! Command tree type definitions.
//!
//! A curve invocation is matched against a tree of [`CommandNode`]s. Each node
//! owns its flags ([`FlagSpec`]), its children in registration order, and an
//! optional [`Runnable`] handler. Nodes are assembled once during setup and
//! only read afterwards.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::matcher::Invocation;
use crate::validate::{BuildError, check_command_name, check_flag};

/// Long name of the flag that short-circuits any invocation into help output.
pub const HELP_FLAG: &str = "help";

/// Long name of the root-only flag that prints the program version.
pub const VERSION_FLAG: &str = "version";

/// Long name of the persistent output format flag read by subcommands.
pub const FORMAT_FLAG: &str = "format";

/// Opaque error returned by a subcommand handler.
///
/// The dispatcher writes its `Display` text unchanged and maps it to a
/// failing exit status.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Executable action bound to a command node.
///
/// Normal command output goes to `out`; the handler never sees the error
/// stream, failures are reported by returning an error.
pub trait Runnable {
    fn execute(&self, invocation: &Invocation, out: &mut dyn Write) -> Result<(), HandlerError>;
}

impl<F> Runnable for F
where
    F: Fn(&Invocation, &mut dyn Write) -> Result<(), HandlerError>,
{
    fn execute(&self, invocation: &Invocation, out: &mut dyn Write) -> Result<(), HandlerError> {
        self(invocation, out)
    }
}

/// Kind of value a flag carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Present/absent switch, optionally `--name=false`.
    Bool,
    /// Takes a string value.
    String,
}

/// Value of a flag after matching (or its default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    Str(String),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::Bool(_) => FlagKind::Bool,
            Self::Str(_) => FlagKind::String,
        }
    }
}

/// Visibility of a flag within the command tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagScope {
    /// Only the declaring node accepts the flag (the default).
    #[default]
    Local,
    /// The declaring node and every descendant accept the flag.
    Persistent,
}

/// Declaration of a command flag.
///
/// # Examples
///
/// ```
/// use curve_cli_core::{FlagKind, FlagScope, FlagSpec};
///
/// let format = FlagSpec::string("format", Some('f'))
///     .with_description("Output format(json|plain)")
///     .persistent();
/// assert_eq!(format.kind(), FlagKind::String);
/// assert_eq!(format.scope(), FlagScope::Persistent);
/// assert!(format.matches_short('f'));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    long: String,
    short: Option<char>,
    kind: FlagKind,
    default: FlagValue,
    description: String,
    scope: FlagScope,
}

impl FlagSpec {
    /// Creates a local boolean flag defaulting to `false`.
    pub fn boolean(long: &str, short: Option<char>) -> Self {
        Self {
            long: long.to_string(),
            short,
            kind: FlagKind::Bool,
            default: FlagValue::Bool(false),
            description: String::new(),
            scope: FlagScope::Local,
        }
    }

    /// Creates a local string flag defaulting to the empty string.
    pub fn string(long: &str, short: Option<char>) -> Self {
        Self {
            long: long.to_string(),
            short,
            kind: FlagKind::String,
            default: FlagValue::Str(String::new()),
            description: String::new(),
            scope: FlagScope::Local,
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    /// Replaces the default value. A default of the wrong kind is rejected
    /// when the flag is registered.
    pub fn with_default(mut self, default: FlagValue) -> Self {
        self.default = default;
        self
    }

    /// Makes the flag visible to all descendants of the declaring node.
    pub fn persistent(mut self) -> Self {
        self.scope = FlagScope::Persistent;
        self
    }

    pub fn long(&self) -> &str {
        &self.long
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn kind(&self) -> FlagKind {
        self.kind
    }

    pub fn default_value(&self) -> &FlagValue {
        &self.default
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn scope(&self) -> FlagScope {
        self.scope
    }

    pub fn matches_long(&self, name: &str) -> bool {
        self.long == name
    }

    pub fn matches_short(&self, c: char) -> bool {
        self.short == Some(c)
    }
}

/// A node of the command tree.
///
/// Children keep registration order, which is also the order they are listed
/// in help output. Sibling names and flag names on one node are unique; both
/// are enforced by [`add_child`](CommandNode::add_child) and
/// [`add_flag`](CommandNode::add_flag).
///
/// # Examples
///
/// ```
/// use curve_cli_core::{BuildError, CommandNode, FlagSpec};
///
/// let mut root = CommandNode::new("curve", "", "curve admin tool");
/// root.add_flag(FlagSpec::boolean("help", Some('h')).persistent()).unwrap();
/// root.add_child(CommandNode::new("fs", "", "Manage curvefs cluster")).unwrap();
///
/// let err = root.add_child(CommandNode::new("fs", "", "again")).unwrap_err();
/// assert!(matches!(err, BuildError::DuplicateName { .. }));
/// assert_eq!(root.child_names(), vec!["fs"]);
/// ```
#[derive(Clone)]
pub struct CommandNode {
    name: String,
    usage: String,
    short: String,
    flags: Vec<FlagSpec>,
    children: Vec<CommandNode>,
    handler: Option<Arc<dyn Runnable>>,
}

impl CommandNode {
    /// Creates a node with no flags, children or handler.
    ///
    /// An empty `usage` lets the help renderer derive one from the tree.
    pub fn new(name: &str, usage: &str, short: &str) -> Self {
        Self {
            name: name.to_string(),
            usage: usage.to_string(),
            short: short.to_string(),
            flags: Vec::new(),
            children: Vec::new(),
            handler: None,
        }
    }

    /// Binds a handler, replacing any previous one.
    pub fn with_handler<R>(mut self, handler: R) -> Self
    where
        R: Runnable + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Attaches `child` after the existing children.
    pub fn add_child(&mut self, child: CommandNode) -> Result<(), BuildError> {
        check_command_name(&child.name)?;
        if self.find_child(&child.name).is_some() {
            return Err(BuildError::DuplicateName {
                parent: self.name.clone(),
                child: child.name,
            });
        }
        self.children.push(child);
        Ok(())
    }

    /// Declares a flag on this node.
    pub fn add_flag(&mut self, spec: FlagSpec) -> Result<(), BuildError> {
        check_flag(&spec)?;
        if self.flags.iter().any(|f| f.matches_long(&spec.long)) {
            return Err(BuildError::DuplicateFlag {
                command: self.name.clone(),
                flag: format!("--{}", spec.long),
            });
        }
        if let Some(c) = spec.short {
            if self.flags.iter().any(|f| f.matches_short(c)) {
                return Err(BuildError::DuplicateFlag {
                    command: self.name.clone(),
                    flag: format!("-{c}"),
                });
            }
        }
        self.flags.push(spec);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn short_description(&self) -> &str {
        &self.short
    }

    pub fn flags(&self) -> &[FlagSpec] {
        &self.flags
    }

    pub fn children(&self) -> &[CommandNode] {
        &self.children
    }

    pub fn handler(&self) -> Option<&dyn Runnable> {
        self.handler.as_deref()
    }

    /// Finds a direct child by name.
    pub fn find_child(&self, name: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Gets all child names in registration order.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }

    /// Follows `path` from this node and returns every node on the way.
    ///
    /// `path[0]` names this node; resolution stops at the first segment that
    /// does not name a child, so the result is never empty.
    pub fn resolve_path<S: AsRef<str>>(&self, path: &[S]) -> Vec<&CommandNode> {
        let mut chain = vec![self];
        let mut current = self;
        for segment in path.iter().skip(1) {
            match current.find_child(segment.as_ref()) {
                Some(child) => {
                    chain.push(child);
                    current = child;
                }
                None => break,
            }
        }
        chain
    }

    /// Lists the full path of every node, depth first, in registration order.
    ///
    /// Two trees with equal outlines have the same shape and child order.
    pub fn outline(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_outline(&mut Vec::new(), &mut out);
        out
    }

    fn collect_outline<'a>(&'a self, prefix: &mut Vec<&'a str>, out: &mut Vec<String>) {
        prefix.push(&self.name);
        out.push(prefix.join(" "));
        for child in &self.children {
            child.collect_outline(prefix, out);
        }
        prefix.pop();
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("short", &self.short)
            .field("flags", &self.flags)
            .field("children", &self.children)
            .field("runnable", &self.handler.is_some())
            .finish()
    }
}

/// Returns the flags accepted at the last node of `chain`, nearest first.
///
/// The last node contributes all of its flags, ancestors only their
/// persistent ones. A name declared closer to the end shadows the same name
/// further up.
pub(crate) fn visible_flags<'a>(chain: &[&'a CommandNode]) -> Vec<&'a FlagSpec> {
    let mut flags: Vec<&'a FlagSpec> = Vec::new();
    for (depth, node) in chain.iter().copied().rev().enumerate() {
        for flag in node.flags() {
            if depth > 0 && flag.scope() != FlagScope::Persistent {
                continue;
            }
            if flags.iter().any(|f| f.long() == flag.long()) {
                continue;
            }
            flags.push(flag);
        }
    }
    flags
}
