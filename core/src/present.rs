//! Help, usage and version text.
//!
//! Rendering works on a [`HelpContext`], a plain record extracted from the
//! tree for one matched path. The functions here only build strings; callers
//! pick the output stream.

use crate::types::{CommandNode, FlagKind, FlagScope, FlagSpec};

/// Formats the version line, e.g. `curve 2.5.0\n`.
pub fn version_text(program: &str, version: &str) -> String {
    format!("{program} {version}\n")
}

/// One row of the `Commands:` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub name: String,
    pub short: String,
}

/// One row of a flag listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagLine {
    pub long: String,
    pub short: Option<char>,
    /// Value placeholder shown after the long name, `None` for bool flags.
    pub value_hint: Option<&'static str>,
    pub description: String,
}

impl FlagLine {
    fn from_spec(spec: &FlagSpec) -> Self {
        Self {
            long: spec.long().to_string(),
            short: spec.short(),
            value_hint: match spec.kind() {
                FlagKind::Bool => None,
                FlagKind::String => Some("string"),
            },
            description: spec.description().to_string(),
        }
    }

    fn label(&self) -> String {
        let mut label = match self.short {
            Some(c) => format!("-{c}, --{}", self.long),
            None => format!("    --{}", self.long),
        };
        if let Some(hint) = self.value_hint {
            label.push(' ');
            label.push_str(hint);
        }
        label
    }
}

/// Everything help and usage output needs to know about one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpContext {
    /// Names from the root down, joined with spaces.
    pub command_path: String,
    /// Usage line; derived from the tree when the node declares none.
    pub usage: String,
    pub short: String,
    pub commands: Vec<CommandEntry>,
    /// Flags declared on the command itself, sorted by long name.
    pub flags: Vec<FlagLine>,
    /// Persistent flags inherited from ancestors, sorted by long name.
    pub global_flags: Vec<FlagLine>,
}

impl HelpContext {
    /// Builds the context for the last node of `chain` (root first).
    ///
    /// Returns `None` for an empty chain.
    pub fn from_chain(chain: &[&CommandNode]) -> Option<Self> {
        let (node, ancestors) = chain.split_last()?;
        let command_path = chain
            .iter()
            .map(|n| n.name())
            .collect::<Vec<_>>()
            .join(" ");

        let mut flags: Vec<FlagLine> = node.flags().iter().map(FlagLine::from_spec).collect();
        flags.sort_by(|a, b| a.long.cmp(&b.long));

        let mut global_flags: Vec<FlagLine> = Vec::new();
        for ancestor in ancestors.iter().rev() {
            for spec in ancestor.flags() {
                if spec.scope() != FlagScope::Persistent {
                    continue;
                }
                let shadowed = flags.iter().any(|f| f.long == spec.long())
                    || global_flags.iter().any(|f| f.long == spec.long());
                if !shadowed {
                    global_flags.push(FlagLine::from_spec(spec));
                }
            }
        }
        global_flags.sort_by(|a, b| a.long.cmp(&b.long));

        let usage = if node.usage().is_empty() {
            default_usage(&command_path, node, !flags.is_empty() || !global_flags.is_empty())
        } else {
            node.usage().to_string()
        };

        Some(Self {
            command_path,
            usage,
            short: node.short_description().to_string(),
            commands: node
                .children()
                .iter()
                .map(|c| CommandEntry {
                    name: c.name().to_string(),
                    short: c.short_description().to_string(),
                })
                .collect(),
            flags,
            global_flags,
        })
    }
}

fn default_usage(path: &str, node: &CommandNode, has_flags: bool) -> String {
    let mut usage = path.to_string();
    if has_flags {
        usage.push_str(" [OPTIONS]");
    }
    if node.children().is_empty() {
        usage.push_str(" [ARGS...]");
    } else {
        usage.push_str(" COMMAND [ARGS...]");
    }
    usage
}

/// Renders the usage block shown on `--help` and after flag errors.
pub fn usage_text(ctx: &HelpContext) -> String {
    let mut out = format!("Usage:  {}\n", ctx.usage);

    if !ctx.commands.is_empty() {
        let width = ctx.commands.iter().map(|c| c.name.len()).max().unwrap_or(0);
        out.push_str("\nCommands:\n");
        for command in &ctx.commands {
            out.push_str(&format!(
                "  {:<width$}   {}\n",
                command.name,
                command.short,
                width = width
            ));
        }
    }

    let width = ctx
        .flags
        .iter()
        .chain(&ctx.global_flags)
        .map(|f| f.label().len())
        .max()
        .unwrap_or(0);
    push_flag_section(&mut out, "Flags", &ctx.flags, width);
    push_flag_section(&mut out, "Global Flags", &ctx.global_flags, width);

    if !ctx.commands.is_empty() {
        out.push_str(&format!(
            "\nRun '{} COMMAND --help' for more information on a command.\n",
            ctx.command_path
        ));
    }
    out
}

fn push_flag_section(out: &mut String, title: &str, flags: &[FlagLine], width: usize) {
    if flags.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}:\n"));
    for flag in flags {
        let line = format!("  {:<width$}   {}", flag.label(), flag.description, width = width);
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

/// Renders full help: the short description followed by the usage block.
pub fn help_text(ctx: &HelpContext) -> String {
    if ctx.short.is_empty() {
        return usage_text(ctx);
    }
    format!("{}\n\n{}", ctx.short, usage_text(ctx))
}
