//! Index-linked task lists
//!
//! Ready lists, wait lists and the delay list all thread through the task
//! arena by slot index instead of pointers. Each TCB carries two link pairs:
//! one for the ready/wait list it sits on and one for the delay list, so a
//! bounded wait can be on a wait list and the delay list at the same time.

/// Previous/next slot indices of one list membership
///
/// `linked` is what tells a lone list member (no neighbours) apart from a
/// node on no list at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Links {
    pub prev: Option<u8>,
    pub next: Option<u8>,
    pub linked: bool,
}

impl Links {
    pub const NONE: Links = Links {
        prev: None,
        next: None,
        linked: false,
    };

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

/// Which link pair a list threads through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Ready list or object wait list
    Sched,
    /// Delay/timeout list
    Tick,
}

/// Arena element that can be linked into a [`TaskList`]
pub trait Linked {
    fn links(&self, kind: LinkKind) -> &Links;
    fn links_mut(&mut self, kind: LinkKind) -> &mut Links;
}

/// Doubly-linked list of arena slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskList {
    head: Option<u8>,
    tail: Option<u8>,
    len: u8,
    kind: LinkKind,
}

impl TaskList {
    pub const fn new(kind: LinkKind) -> Self {
        TaskList {
            head: None,
            tail: None,
            len: 0,
            kind,
        }
    }

    #[inline]
    pub fn head(&self) -> Option<usize> {
        self.head.map(usize::from)
    }

    #[inline]
    pub fn tail(&self) -> Option<usize> {
        self.tail.map(usize::from)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append at the tail (FIFO order)
    pub fn push_back<N: Linked>(&mut self, nodes: &mut [N], idx: usize) {
        let kind = self.kind;
        let slot = idx as u8;
        crate::kassert!(!nodes[idx].links(kind).linked, "node already on a list");
        *nodes[idx].links_mut(kind) = Links {
            prev: self.tail,
            next: None,
            linked: true,
        };

        match self.tail {
            Some(tail) => nodes[tail as usize].links_mut(kind).next = Some(slot),
            None => self.head = Some(slot),
        }

        self.tail = Some(slot);
        self.len += 1;
    }

    /// Insert before the first node for which `goes_before(new, node)` holds
    ///
    /// With a strict comparison, nodes that compare equal keep arrival order.
    pub fn insert_ordered<N, F>(&mut self, nodes: &mut [N], idx: usize, goes_before: F)
    where
        N: Linked,
        F: Fn(&N, &N) -> bool,
    {
        let kind = self.kind;
        crate::kassert!(!nodes[idx].links(kind).linked, "node already on a list");
        let mut cursor = self.head;
        while let Some(cur) = cursor {
            if goes_before(&nodes[idx], &nodes[cur as usize]) {
                break;
            }
            cursor = nodes[cur as usize].links(kind).next;
        }

        let Some(next) = cursor else {
            self.push_back(nodes, idx);
            return;
        };

        let slot = idx as u8;
        let prev = nodes[next as usize].links(kind).prev;
        *nodes[idx].links_mut(kind) = Links {
            prev,
            next: Some(next),
            linked: true,
        };
        nodes[next as usize].links_mut(kind).prev = Some(slot);

        match prev {
            Some(p) => nodes[p as usize].links_mut(kind).next = Some(slot),
            None => self.head = Some(slot),
        }

        self.len += 1;
    }

    /// Unlink a node; it must be on this list
    pub fn remove<N: Linked>(&mut self, nodes: &mut [N], idx: usize) {
        let kind = self.kind;
        let Links { prev, next, linked } = *nodes[idx].links(kind);
        crate::kassert!(linked, "node not on a list");

        match prev {
            Some(p) => nodes[p as usize].links_mut(kind).next = next,
            None => self.head = next,
        }

        match next {
            Some(n) => nodes[n as usize].links_mut(kind).prev = prev,
            None => self.tail = prev,
        }

        *nodes[idx].links_mut(kind) = Links::NONE;
        self.len = self.len.saturating_sub(1);
    }

    /// Remove and return the head
    pub fn pop_front<N: Linked>(&mut self, nodes: &mut [N]) -> Option<usize> {
        let head = self.head()?;
        self.remove(nodes, head);
        Some(head)
    }

    /// Slot following `idx` on this list
    #[inline]
    pub fn next_of<N: Linked>(&self, nodes: &[N], idx: usize) -> Option<usize> {
        nodes[idx].links(self.kind).next.map(usize::from)
    }

    /// Walk the list from head to tail
    pub fn iter<'a, N: Linked>(&self, nodes: &'a [N]) -> impl Iterator<Item = usize> + 'a {
        let kind = self.kind;
        let mut cursor = self.head;
        core::iter::from_fn(move || {
            let cur = cursor?;
            cursor = nodes[cur as usize].links(kind).next;
            Some(cur as usize)
        })
    }
}
