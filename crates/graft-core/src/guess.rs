//! Target-guess engine
//!
//! Proposes destination attach points for addition tree nodes by matching
//! names under the parent's target. Explicitly pinned targets are never
//! overwritten by a guess.

use crate::errors::Result;
use crate::model::{AdditionNodeId, AdditionTree, NodeId};
use crate::ops::TreeView;

impl AdditionTree {
    /// Pin `id` to `target` and re-guess everything below it
    ///
    /// # Errors
    ///
    /// Returns `AdditionNodeNotFound` for a foreign id, or a lookup error if
    /// `target` does not resolve in `view`.
    pub fn set_remap_target(
        &mut self,
        id: AdditionNodeId,
        target: NodeId,
        view: &dyn TreeView,
    ) -> Result<()> {
        view.node_name(target)?;
        let node = self.get_mut(id)?;
        node.remap_target = Some(target);
        node.remap_target_is_guess = false;
        self.guess_child_targets(id, view)
    }

    /// Unpin `id` and re-guess from the nearest ancestor that has a target
    ///
    /// Falls back to the root when no ancestor has one.
    pub fn clear_remap_target(&mut self, id: AdditionNodeId, view: &dyn TreeView) -> Result<()> {
        let node = self.get_mut(id)?;
        node.remap_target = None;
        node.remap_target_is_guess = true;

        let mut anchor = self.get(id)?.parent;
        while let Some(ancestor) = anchor {
            let node = self.get(ancestor)?;
            if node.remap_target.is_some() {
                return self.guess_child_targets(ancestor, view);
            }
            anchor = node.parent;
        }
        let root = self.root();
        self.guess_child_targets(root, view)
    }

    /// Fill in guessed targets for every unpinned descendant of `id`
    pub fn guess_child_targets(&mut self, id: AdditionNodeId, view: &dyn TreeView) -> Result<()> {
        let mut stack = vec![id];
        while let Some(parent) = stack.pop() {
            let parent_node = self.get(parent)?;
            let parent_target = parent_node.remap_target;
            let children = parent_node.children.clone();

            for child in children {
                let node = self.get(child)?;
                if node.remap_target_is_guess {
                    let guess = if node.is_addition() {
                        parent_target
                    } else {
                        match parent_target {
                            Some(target) => view.find_child(target, &node.name)?,
                            None => None,
                        }
                    };
                    self.get_mut(child)?.remap_target = guess;
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}
