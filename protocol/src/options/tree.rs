//! The hierarchical option container.
//!
//! Options live in an arena owned by the tree. A node refers to its parent by
//! index, so moving a node between parents never involves shared pointers.
//! Removed slots are never reused, which keeps stale `OptionId`s harmless.

use std::fmt;

use thiserror::Error;

use super::{DhcpOption, OptionCode};

/// An index of an option node within its `OptionTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(usize);

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The owner of an attached option node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// The message itself.
    Root,
    Option(OptionId),
}

/// Logic faults while mutating an `OptionTree`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("Option {0} is already owned by {1:?}")]
    AlreadyOwned(OptionId, Parent),
    #[error("Option {0} does not belong to this tree")]
    UnknownOption(OptionId),
    #[error("Option {0} ({1}) cannot own sub-options")]
    NotAContainer(OptionId, OptionCode),
    #[error("Option {0} cannot be appended to its own subtree")]
    Cycle(OptionId),
    #[error("{code} with IAID {iaid} is already present in the message")]
    DuplicateIaid { code: OptionCode, iaid: u32 },
    #[error("Option {0} has a parent reference that does not match its owner")]
    Dangling(OptionId),
    #[error("Option {0} ({1}) cannot be placed under {2:?}")]
    Misplaced(OptionId, OptionCode, Parent),
}

#[derive(Debug, Clone)]
struct Node {
    option: DhcpOption,
    /// `None` while the node is detached.
    parent: Option<Parent>,
    children: Vec<OptionId>,
}

/// Options of one message with their parent/child ownership.
#[derive(Debug, Clone, Default)]
pub struct OptionTree {
    nodes: Vec<Option<Node>>,
    roots: Vec<OptionId>,
}

impl OptionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the top-level options of `source` with their subtrees,
    /// skipping the options `exclude` returns `true` for.
    ///
    /// # Errors
    /// `ConsistencyError` if `source` itself is inconsistent.
    pub fn build<F>(source: &OptionTree, exclude: F) -> Result<Self, ConsistencyError>
    where
        F: Fn(&DhcpOption) -> bool,
    {
        let mut tree = OptionTree::new();
        for &id in source.roots.iter() {
            match source.get(id) {
                Some(option) if exclude(option) => continue,
                Some(_) => {
                    tree.copy_subtree(Parent::Root, source, id)?;
                }
                None => return Err(ConsistencyError::UnknownOption(id)),
            }
        }
        Ok(tree)
    }

    /// Creates a detached node. It must be `append`ed to become a part of the message.
    pub fn insert(&mut self, option: DhcpOption) -> OptionId {
        self.nodes.push(Some(Node {
            option,
            parent: None,
            children: Vec::new(),
        }));
        OptionId(self.nodes.len() - 1)
    }

    /// Transfers the ownership of a detached node to `parent`.
    ///
    /// Appending a node to its current parent is a no-op.
    ///
    /// # Errors
    /// `ConsistencyError` if the node is owned by another parent, if the parent
    /// cannot own sub-options, if the node would become its own descendant, if
    /// the option is not allowed at that level (see `OptionCode::may_be_owned_by`)
    /// or if an identity association with the same IAID is already present.
    pub fn append(&mut self, parent: Parent, id: OptionId) -> Result<(), ConsistencyError> {
        let node = self.node(id)?;
        match node.parent {
            Some(owner) if owner == parent => return Ok(()),
            Some(owner) => return Err(ConsistencyError::AlreadyOwned(id, owner)),
            None => {}
        }
        let code = node.option.code();
        let iaid = node.option.iaid();

        match parent {
            Parent::Root => {
                if !code.may_be_owned_by(None) {
                    return Err(ConsistencyError::Misplaced(id, code, parent));
                }
                if let Some(iaid) = iaid {
                    if self.find_ia(code, iaid).is_some() {
                        return Err(ConsistencyError::DuplicateIaid { code, iaid });
                    }
                }
                self.roots.push(id);
            }
            Parent::Option(owner) => {
                let owner_code = self.node(owner)?.option.code();
                if !owner_code.is_container() {
                    return Err(ConsistencyError::NotAContainer(owner, owner_code));
                }
                if self.is_ancestor(id, owner) {
                    return Err(ConsistencyError::Cycle(id));
                }
                if !code.may_be_owned_by(Some(owner_code)) {
                    return Err(ConsistencyError::Misplaced(id, code, parent));
                }
                self.node_mut(owner)?.children.push(id);
            }
        }

        self.node_mut(id)?.parent = Some(parent);
        Ok(())
    }

    /// Creates a node and appends it to `parent`.
    pub fn push(
        &mut self,
        parent: Parent,
        option: DhcpOption,
    ) -> Result<OptionId, ConsistencyError> {
        let id = self.insert(option);
        if let Err(error) = self.append(parent, id) {
            self.free(id);
            return Err(error);
        }
        Ok(id)
    }

    /// Deep-copies the `id` subtree of `source` and appends the copy to `parent`.
    pub fn copy_subtree(
        &mut self,
        parent: Parent,
        source: &OptionTree,
        id: OptionId,
    ) -> Result<OptionId, ConsistencyError> {
        let copy = self.clone_detached(source, id)?;
        if let Err(error) = self.append(parent, copy) {
            self.free(copy);
            return Err(error);
        }
        Ok(copy)
    }

    /// Releases the node from its parent. The node keeps its own subtree.
    pub fn detach(&mut self, id: OptionId) -> Result<(), ConsistencyError> {
        match self.node(id)?.parent {
            Some(Parent::Root) => self.roots.retain(|&root| root != id),
            Some(Parent::Option(owner)) => {
                self.node_mut(owner)?.children.retain(|&child| child != id)
            }
            None => return Ok(()),
        }
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    /// Deletes the node with its whole subtree.
    pub fn remove(&mut self, id: OptionId) -> Result<DhcpOption, ConsistencyError> {
        self.detach(id)?;
        let children = self.node(id)?.children.clone();
        for child in children {
            self.free(child);
        }
        self.nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .map(|node| node.option)
            .ok_or(ConsistencyError::UnknownOption(id))
    }

    /// Deletes all direct children of `parent` with the `code`, preserving the sibling order.
    ///
    /// Returns the number of removed options.
    pub fn remove_all(&mut self, parent: Parent, code: OptionCode) -> usize {
        let doomed = self.find_all(parent, code);
        for &id in doomed.iter() {
            let _ = self.remove(id);
        }
        doomed.len()
    }

    /// The first direct child of `parent` with the `code`.
    pub fn find(&self, parent: Parent, code: OptionCode) -> Option<OptionId> {
        self.children(parent)
            .iter()
            .cloned()
            .find(|&id| self.code(id) == Some(code))
    }

    /// All direct children of `parent` with the `code` in order.
    pub fn find_all(&self, parent: Parent, code: OptionCode) -> Vec<OptionId> {
        self.children(parent)
            .iter()
            .cloned()
            .filter(|&id| self.code(id) == Some(code))
            .collect()
    }

    /// The top-level identity association with the `code` and `iaid`.
    pub fn find_ia(&self, code: OptionCode, iaid: u32) -> Option<OptionId> {
        self.roots.iter().cloned().find(|&id| match self.get(id) {
            Some(option) => option.code() == code && option.iaid() == Some(iaid),
            None => false,
        })
    }

    /// The top-level option payload with the `code`.
    pub fn get_root(&self, code: OptionCode) -> Option<&DhcpOption> {
        self.find(Parent::Root, code).and_then(|id| self.get(id))
    }

    pub fn children(&self, parent: Parent) -> &[OptionId] {
        match parent {
            Parent::Root => self.roots.as_slice(),
            Parent::Option(id) => match self.node(id) {
                Ok(node) => node.children.as_slice(),
                Err(_) => &[],
            },
        }
    }

    pub fn roots(&self) -> &[OptionId] {
        self.roots.as_slice()
    }

    pub fn get(&self, id: OptionId) -> Option<&DhcpOption> {
        self.node(id).ok().map(|node| &node.option)
    }

    pub fn get_mut(&mut self, id: OptionId) -> Option<&mut DhcpOption> {
        self.node_mut(id).ok().map(|node| &mut node.option)
    }

    pub fn code(&self, id: OptionId) -> Option<OptionCode> {
        self.get(id).map(DhcpOption::code)
    }

    /// `None` for detached or unknown nodes.
    pub fn parent(&self, id: OptionId) -> Option<Parent> {
        self.node(id).ok().and_then(|node| node.parent)
    }

    /// The number of live nodes including detached ones.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    /// Whether the message has no top-level options.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Verifies that every attached node is owned exactly once and that its
    /// parent reference matches the owner.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        let mut owners = vec![0usize; self.nodes.len()];
        let mut visit = |owner: Parent, children: &[OptionId]| -> Result<(), ConsistencyError> {
            for &child in children {
                if self.parent(child) != Some(owner) {
                    return Err(ConsistencyError::Dangling(child));
                }
                owners[child.0] += 1;
                if owners[child.0] > 1 {
                    return Err(ConsistencyError::AlreadyOwned(child, owner));
                }
            }
            Ok(())
        };

        visit(Parent::Root, &self.roots)?;
        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(node) = node {
                visit(Parent::Option(OptionId(index)), &node.children)?;
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(node) = node {
                if node.parent.is_some() && owners[index] != 1 {
                    return Err(ConsistencyError::Dangling(OptionId(index)));
                }
            }
        }
        Ok(())
    }

    fn node(&self, id: OptionId) -> Result<&Node, ConsistencyError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(ConsistencyError::UnknownOption(id))
    }

    fn node_mut(&mut self, id: OptionId) -> Result<&mut Node, ConsistencyError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(ConsistencyError::UnknownOption(id))
    }

    /// Whether `ancestor` is `id` or lies on the path from `id` to the root.
    fn is_ancestor(&self, ancestor: OptionId, mut id: OptionId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(Parent::Option(owner)) => id = owner,
                _ => return false,
            }
        }
    }

    fn clone_detached(
        &mut self,
        source: &OptionTree,
        id: OptionId,
    ) -> Result<OptionId, ConsistencyError> {
        let node = source.node(id)?;
        let copy = self.insert(node.option.clone());
        for &child in node.children.iter() {
            let child = self.clone_detached(source, child)?;
            self.node_mut(child)?.parent = Some(Parent::Option(copy));
            self.node_mut(copy)?.children.push(child);
        }
        Ok(copy)
    }

    /// Drops a node and its subtree without touching the parent's child list.
    fn free(&mut self, id: OptionId) {
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) {
            for child in node.children {
                self.free(child);
            }
        }
    }
}
