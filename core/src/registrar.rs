//! Attaching subsystem command trees to the root.

use tracing::debug;

use crate::types::CommandNode;
use crate::validate::BuildError;

/// Supplies one subsystem's complete command subtree (e.g. `fs`).
///
/// The registrar attaches the returned node as-is and never looks inside it.
pub trait SubsystemCommandFactory {
    fn build_command_tree(&self) -> Result<CommandNode, BuildError>;
}

/// Attaches every subsystem subtree under `root`, in slice order.
///
/// Fails on the first name collision with an existing root child; subtrees
/// registered before the failure stay attached.
pub fn register_subsystems(
    root: &mut CommandNode,
    factories: &[&dyn SubsystemCommandFactory],
) -> Result<(), BuildError> {
    for factory in factories {
        let subtree = factory.build_command_tree()?;
        debug!(subsystem = subtree.name(), "registering subsystem");
        root.add_child(subtree)?;
    }
    Ok(())
}
