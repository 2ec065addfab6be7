use crate::memory::{FrameId, PageRef, VirtualPage};

use super::PolicyState;

/// Handle to a node in a [`PageList`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    page: PageRef,
    frame: Option<FrameId>,
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

/// Doubly linked list of pages stored in an arena.
///
/// A node is allocated once per virtual page and linked only while the page
/// is resident, so unlink and relink are O(1) through the handle the page
/// carries in its overhead.
#[derive(Debug, Default)]
pub(super) struct PageList {
    slots: Vec<Option<Node>>,
    vacant: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl PageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an unlinked node for `page`
    pub fn alloc(&mut self, page: PageRef) -> NodeId {
        let node = Node {
            page,
            frame: None,
            prev: None,
            next: None,
            linked: false,
        };
        match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Drop a node, unlinking it first if it is queued
    pub fn release(&mut self, id: NodeId) {
        if self.node(id).linked {
            self.unlink(id);
        }
        self.slots[id.0] = None;
        self.vacant.push(id.0);
    }

    /// Append at the tail (newest end)
    pub fn push_back(&mut self, id: NodeId, frame: FrameId) {
        let tail = self.tail;
        let node = self.node_mut(id);
        assert!(!node.linked, "{} is already queued", node.page);
        node.frame = Some(frame);
        node.prev = tail;
        node.next = None;
        node.linked = true;

        match tail {
            Some(t) => self.node_mut(NodeId(t)).next = Some(id.0),
            None => self.head = Some(id.0),
        }
        self.tail = Some(id.0);
        self.len += 1;
    }

    pub fn unlink(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        assert!(node.linked, "{} is not queued", node.page);
        let (prev, next) = (node.prev.take(), node.next.take());
        node.linked = false;

        match prev {
            Some(p) => self.node_mut(NodeId(p)).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(NodeId(n)).prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
    }

    /// Move a queued node to the tail
    pub fn move_to_back(&mut self, id: NodeId) {
        let Some(frame) = self.node(id).frame else {
            panic!("{} was never loaded", self.node(id).page);
        };
        self.unlink(id);
        self.push_back(id, frame);
    }

    /// Unlink the head (oldest end) and return its frame
    pub fn pop_front(&mut self) -> Option<FrameId> {
        let id = NodeId(self.head?);
        let frame = self.node(id).frame;
        self.unlink(id);
        frame
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Frames of queued nodes, head first
    pub fn frames(&self) -> Vec<FrameId> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.node(NodeId(idx));
            out.extend(node.frame);
            cursor = node.next;
        }
        out
    }

    fn node(&self, id: NodeId) -> &Node {
        match self.slots.get(id.0).and_then(Option::as_ref) {
            Some(node) => node,
            None => panic!("stale policy handle {:?}", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.slots.get_mut(id.0).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("stale policy handle {:?}", id),
        }
    }
}

/// The list handle stored in `page`'s overhead
pub(super) fn node_of(page: &VirtualPage) -> NodeId {
    match page.overhead {
        PolicyState::ListNode(id) => id,
        PolicyState::Empty => panic!("{} has no list overhead", page.page_ref()),
    }
}

/// The frame `page` occupies; list policies only track resident pages
pub(super) fn resident_frame(page: &VirtualPage) -> FrameId {
    match page.current_frame() {
        Some(frame) => frame,
        None => panic!("{} is not resident", page.page_ref()),
    }
}
