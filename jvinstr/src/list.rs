//! Ordered instruction lists with stable node identities.
//!
//! [`InsnList`] is a doubly linked list whose nodes live in a [`SlotMap`]. A
//! node is identified by an [`InsnRef`] that stays valid while other nodes are
//! inserted or removed around it, so passes can hold references to nodes
//! (worklists, recorded emission sites) across edits.
//!
//! A removed node's reference is never reused for another node, and an
//! [`InsnRef`] records the list that created it: using a removed node, or a
//! node of another list, is reported as [`Error::UnknownNode`].
use std::{
    collections::BTreeSet,
    sync::atomic::{AtomicU32, Ordering},
};

use log::trace;
use slotmap::{SlotMap, new_key_type};

use crate::{
    insn::{Insn, Instruction, LabelId, LabelInsn},
    utils::Error,
};

new_key_type! {
    struct NodeKey;
}

static NEXT_LIST_ID: AtomicU32 = AtomicU32::new(0);

/// Identity of a node inside an [`InsnList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InsnRef {
    list: u32,
    key: NodeKey,
}

#[derive(Debug, Clone)]
struct Node {
    insn: Insn,
    prev: Option<NodeKey>,
    next: Option<NodeKey>,
}

/// Ordered, mutable sequence of instruction nodes.
///
/// A clone keeps the identity of its source: node references of the source
/// address the corresponding nodes of the clone.
///
/// Example:
/// ```rust
/// # use jvinstr::{insn::{Insn, SimpleInsn, TypeInsn}, list::InsnList, opcodes::Opcode};
/// let mut list = InsnList::new();
/// let check = list.push_back(TypeInsn::new(Opcode::Instanceof, "java/util/List").into());
/// list.push_back(SimpleInsn::new(Opcode::Ireturn).into());
/// let nop = list.insert_before(check, SimpleInsn::new(Opcode::Nop).into()).unwrap();
/// assert_eq!(list.first(), Some(nop));
/// assert_eq!(list.next(nop), Some(check));
/// assert_eq!(list.len(), 3);
///
/// let other = InsnList::new();
/// assert!(!other.contains(check));
/// ```
#[derive(Debug, Clone)]
pub struct InsnList {
    id: u32,
    nodes: SlotMap<NodeKey, Node>,
    head: Option<NodeKey>,
    tail: Option<NodeKey>,
    next_label: u32,
}

impl Default for InsnList {
    fn default() -> Self {
        Self {
            id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
            nodes: SlotMap::with_key(),
            head: None,
            tail: None,
            next_label: 0,
        }
    }
}

impl InsnList {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_ref(&self, key: NodeKey) -> InsnRef {
        InsnRef { list: self.id, key }
    }

    /// Key of `node` in this list, `None` for removed or foreign nodes.
    fn key(&self, node: InsnRef) -> Option<NodeKey> {
        (node.list == self.id && self.nodes.contains_key(node.key)).then_some(node.key)
    }

    /// Number of nodes, labels included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `node` currently belongs to this list.
    pub fn contains(&self, node: InsnRef) -> bool {
        self.key(node).is_some()
    }

    pub fn get(&self, node: InsnRef) -> Option<&Insn> {
        let key = self.key(node)?;
        Some(&self.nodes[key].insn)
    }

    /// Mutable access to a node's instruction. The node keeps its identity and
    /// position.
    pub fn get_mut(&mut self, node: InsnRef) -> Option<&mut Insn> {
        let key = self.key(node)?;
        Some(&mut self.nodes[key].insn)
    }

    /// Replace the instruction held by `node`, returning the previous one.
    pub fn set(&mut self, node: InsnRef, insn: Insn) -> Result<Insn, Error> {
        let slot = self.get_mut(node).ok_or(Error::UnknownNode(node))?;
        Ok(std::mem::replace(slot, insn))
    }

    pub fn first(&self) -> Option<InsnRef> {
        self.head.map(|key| self.node_ref(key))
    }

    pub fn last(&self) -> Option<InsnRef> {
        self.tail.map(|key| self.node_ref(key))
    }

    pub fn next(&self, node: InsnRef) -> Option<InsnRef> {
        let key = self.key(node)?;
        self.nodes[key].next.map(|key| self.node_ref(key))
    }

    pub fn prev(&self, node: InsnRef) -> Option<InsnRef> {
        let key = self.key(node)?;
        self.nodes[key].prev.map(|key| self.node_ref(key))
    }

    /// Allocate a label identifier not used by any label of this list yet.
    ///
    /// Identifiers saturate at `u32::MAX`.
    pub fn new_label(&mut self) -> LabelId {
        let label = LabelId(self.next_label);
        self.next_label = self.next_label.saturating_add(1);
        label
    }

    /// Account for a label that was allocated elsewhere, so that
    /// [`Self::new_label`] never hands it out again.
    fn reserve_label(&mut self, insn: &Insn) {
        let label = insn.placed_label().or_else(|| insn.jump_target());
        if let Some(LabelId(id)) = label {
            self.next_label = self.next_label.max(id.saturating_add(1));
        }
    }

    /// Append `insn` at the end of the list.
    pub fn push_back(&mut self, insn: Insn) -> InsnRef {
        self.reserve_label(&insn);
        let tail = self.tail;
        let key = self.nodes.insert(Node {
            insn,
            prev: tail,
            next: None,
        });
        match tail {
            Some(tail) => self.nodes[tail].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        self.node_ref(key)
    }

    /// Prepend `insn` at the start of the list.
    pub fn push_front(&mut self, insn: Insn) -> InsnRef {
        match self.head {
            Some(head) => self.link_before(head, insn),
            None => self.push_back(insn),
        }
    }

    /// Place a new label node at the end of the list and return its label.
    pub fn push_label(&mut self) -> LabelId {
        let label = self.new_label();
        self.push_back(LabelInsn { label }.into());
        label
    }

    fn link_before(&mut self, anchor: NodeKey, insn: Insn) -> InsnRef {
        self.reserve_label(&insn);
        let prev = self.nodes[anchor].prev;
        let key = self.nodes.insert(Node {
            insn,
            prev,
            next: Some(anchor),
        });
        self.nodes[anchor].prev = Some(key);
        match prev {
            Some(prev) => self.nodes[prev].next = Some(key),
            None => self.head = Some(key),
        }
        self.node_ref(key)
    }

    /// Insert `insn` immediately before `anchor`. `anchor` and every other node
    /// keep their identity.
    pub fn insert_before(&mut self, anchor: InsnRef, insn: Insn) -> Result<InsnRef, Error> {
        let key = self.key(anchor).ok_or(Error::UnknownNode(anchor))?;
        let node = self.link_before(key, insn);
        trace!("Inserted node {:?} before {:?}", node, anchor);
        Ok(node)
    }

    /// Insert `insn` immediately after `anchor`.
    pub fn insert_after(&mut self, anchor: InsnRef, insn: Insn) -> Result<InsnRef, Error> {
        let key = self.key(anchor).ok_or(Error::UnknownNode(anchor))?;
        let node = match self.nodes[key].next {
            Some(next) => self.link_before(next, insn),
            None => self.push_back(insn),
        };
        trace!("Inserted node {:?} after {:?}", node, anchor);
        Ok(node)
    }

    /// Unlink `node` from the list and return its instruction. The
    /// neighbours of `node` become adjacent.
    pub fn remove(&mut self, node: InsnRef) -> Result<Insn, Error> {
        let key = self.key(node).ok_or(Error::UnknownNode(node))?;
        let Node { insn, prev, next } = self.nodes.remove(key).ok_or(Error::UnknownNode(node))?;
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }
        trace!("Removed node {:?}", node);
        Ok(insn)
    }

    /// Iterate over `(node, instruction)` pairs in list order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Iterate over instructions in list order.
    pub fn insns(&self) -> impl Iterator<Item = &Insn> {
        self.iter().map(|(_, insn)| insn)
    }

    /// Node references in list order. The returned vector is a snapshot: it
    /// is safe to edit the list while walking it.
    pub fn refs(&self) -> Vec<InsnRef> {
        self.iter().map(|(node, _)| node).collect()
    }

    /// Zero-based position of `node` in the list (linear scan).
    pub fn position(&self, node: InsnRef) -> Option<usize> {
        self.iter().position(|(candidate, _)| candidate == node)
    }

    /// Node placing `label`, if any (linear scan).
    pub fn label_node(&self, label: LabelId) -> Option<InsnRef> {
        self.iter()
            .find(|(_, insn)| insn.placed_label() == Some(label))
            .map(|(node, _)| node)
    }

    /// Check that every label is placed at most once and that every jump
    /// targets a placed label.
    pub fn verify_labels(&self) -> Result<(), Error> {
        let mut placed = BTreeSet::new();
        for insn in self.insns() {
            if let Some(label) = insn.placed_label() {
                if !placed.insert(label) {
                    return Err(Error::DuplicateLabel(label));
                }
            }
        }

        for insn in self.insns() {
            if let Some(target) = insn.jump_target() {
                if !placed.contains(&target) {
                    return Err(Error::UnresolvedLabel(target));
                }
            }
        }

        Ok(())
    }

    /// Clone the instructions into a vector, in list order.
    pub fn to_vec(&self) -> Vec<Insn> {
        self.insns().cloned().collect()
    }
}

/// Iterator over the nodes of an [`InsnList`], see [`InsnList::iter`].
pub struct Iter<'a> {
    list: &'a InsnList,
    cursor: Option<NodeKey>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (InsnRef, &'a Insn);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cursor?;
        let entry = &self.list.nodes[key];
        self.cursor = entry.next;
        Some((self.list.node_ref(key), &entry.insn))
    }
}

impl<'a> IntoIterator for &'a InsnList {
    type Item = (InsnRef, &'a Insn);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Insn> for InsnList {
    fn from_iter<T: IntoIterator<Item = Insn>>(iter: T) -> Self {
        let mut list = InsnList::new();
        list.extend(iter);
        list
    }
}

impl Extend<Insn> for InsnList {
    fn extend<T: IntoIterator<Item = Insn>>(&mut self, iter: T) {
        for insn in iter {
            self.push_back(insn);
        }
    }
}
