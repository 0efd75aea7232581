//! Arena-backed ordered map.
//!
//! This module defines [`AvlTree`], an AVL tree whose nodes
//! live in an [`ObjectArena`] and carry threaded `prev`/`next`
//! links, giving O(1) in-order stepping from any node. The
//! simplifier uses one instance as a priority queue of segment
//! chains and another as its overlap-count index.
//!
//! The comparator is supplied at construction and fixed for
//! the lifetime of the tree; there is no trait object anywhere
//! on the lookup path.

use std::cmp::Ordering;

use crate::error::TreeSeqResult;
use crate::object_arena::{ArenaId, ObjectArena};

/// Index of a node in an [`AvlTree`].
pub type AvlNodeId = ArenaId;

struct AvlNode<T> {
    item: T,
    left: Option<AvlNodeId>,
    right: Option<AvlNodeId>,
    parent: Option<AvlNodeId>,
    prev: Option<AvlNodeId>,
    next: Option<AvlNodeId>,
    // height(right subtree) - height(left subtree)
    balance: i8,
}

/// An ordered collection of items, with in-order threading.
///
/// Duplicate keys are rejected: [`AvlTree::insert`] returns
/// `Ok(None)` and leaves the tree unchanged when an equal item
/// is already present.
///
/// ```
/// use treeseq_tables::avl::AvlTree;
///
/// let mut t = AvlTree::new(i32::cmp as fn(&i32, &i32) -> std::cmp::Ordering, 16).unwrap();
/// for x in [5, 1, 3] {
///     t.insert(x).unwrap();
/// }
/// let mut sorted = vec![];
/// let mut n = t.head();
/// while let Some(i) = n {
///     sorted.push(*t.item(i));
///     n = t.next(i);
/// }
/// assert_eq!(sorted, vec![1, 3, 5]);
/// ```
pub struct AvlTree<T, F> {
    arena: ObjectArena<AvlNode<T>>,
    root: Option<AvlNodeId>,
    head: Option<AvlNodeId>,
    tail: Option<AvlNodeId>,
    count: usize,
    cmp: F,
}

impl<T, F> AvlTree<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Create an empty tree.
    ///
    /// `block_size` sizes the chunks of the internal node
    /// arena. Errors as [`ObjectArena::new`].
    pub fn new(cmp: F, block_size: usize) -> TreeSeqResult<Self> {
        Ok(AvlTree {
            arena: ObjectArena::new(block_size)?,
            root: None,
            head: None,
            tail: None,
            count: 0,
            cmp,
        })
    }

    /// Number of items in the tree.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The node holding the smallest item.
    pub fn head(&self) -> Option<AvlNodeId> {
        self.head
    }

    /// The node holding the largest item.
    pub fn tail(&self) -> Option<AvlNodeId> {
        self.tail
    }

    /// In-order successor.
    pub fn next(&self, id: AvlNodeId) -> Option<AvlNodeId> {
        self.arena.get(id).next
    }

    /// In-order predecessor.
    pub fn prev(&self, id: AvlNodeId) -> Option<AvlNodeId> {
        self.arena.get(id).prev
    }

    pub fn item(&self, id: AvlNodeId) -> &T {
        &self.arena.get(id).item
    }

    /// Mutable access to a stored item.
    ///
    /// The caller must not change the item in a way that alters
    /// its ordering relative to its neighbors.
    pub fn item_mut(&mut self, id: AvlNodeId) -> &mut T {
        &mut self.arena.get_mut(id).item
    }

    /// Number of live nodes in the internal arena. Used by
    /// state-checking assertions.
    pub fn arena_allocated(&self) -> usize {
        self.arena.num_allocated()
    }

    /// Find the node whose item compares equal to `probe`.
    pub fn search(&self, probe: &T) -> Option<AvlNodeId> {
        let mut cur = self.root;
        while let Some(c) = cur {
            match (self.cmp)(probe, &self.arena.get(c).item) {
                Ordering::Equal => return Some(c),
                Ordering::Less => cur = self.arena.get(c).left,
                Ordering::Greater => cur = self.arena.get(c).right,
            }
        }
        None
    }

    /// Find the node nearest to `probe`.
    ///
    /// Returns the last node visited during the descent and how
    /// `probe` compares to its item. `Ordering::Greater` means
    /// the returned node holds the largest item below `probe`,
    /// so callers wanting an inclusive predecessor step to
    /// [`AvlTree::prev`] only on `Ordering::Less`.
    pub fn search_closest(&self, probe: &T) -> Option<(AvlNodeId, Ordering)> {
        let mut cur = self.root?;
        loop {
            match (self.cmp)(probe, &self.arena.get(cur).item) {
                Ordering::Equal => return Some((cur, Ordering::Equal)),
                Ordering::Less => match self.arena.get(cur).left {
                    Some(c) => cur = c,
                    None => return Some((cur, Ordering::Less)),
                },
                Ordering::Greater => match self.arena.get(cur).right {
                    Some(c) => cur = c,
                    None => return Some((cur, Ordering::Greater)),
                },
            }
        }
    }

    /// Insert an item.
    ///
    /// Returns the new node's id, or `None` if an equal item is
    /// already present.
    pub fn insert(&mut self, item: T) -> TreeSeqResult<Option<AvlNodeId>> {
        // Locate the attachment point before allocating so a
        // duplicate key costs nothing.
        let mut parent = None;
        let mut go_left = false;
        let mut cur = self.root;
        while let Some(c) = cur {
            match (self.cmp)(&item, &self.arena.get(c).item) {
                Ordering::Equal => return Ok(None),
                Ordering::Less => {
                    parent = Some(c);
                    go_left = true;
                    cur = self.arena.get(c).left;
                }
                Ordering::Greater => {
                    parent = Some(c);
                    go_left = false;
                    cur = self.arena.get(c).right;
                }
            }
        }
        let node = self.arena.alloc(AvlNode {
            item,
            left: None,
            right: None,
            parent,
            prev: None,
            next: None,
            balance: 0,
        })?;
        self.count += 1;
        let p = match parent {
            None => {
                self.root = Some(node);
                self.head = Some(node);
                self.tail = Some(node);
                return Ok(Some(node));
            }
            Some(p) => p,
        };
        if go_left {
            self.arena.get_mut(p).left = Some(node);
            let before = self.arena.get(p).prev;
            self.arena.get_mut(node).prev = before;
            self.arena.get_mut(node).next = Some(p);
            self.arena.get_mut(p).prev = Some(node);
            match before {
                Some(q) => self.arena.get_mut(q).next = Some(node),
                None => self.head = Some(node),
            }
        } else {
            self.arena.get_mut(p).right = Some(node);
            let after = self.arena.get(p).next;
            self.arena.get_mut(node).next = after;
            self.arena.get_mut(node).prev = Some(p);
            self.arena.get_mut(p).next = Some(node);
            match after {
                Some(q) => self.arena.get_mut(q).prev = Some(node),
                None => self.tail = Some(node),
            }
        }
        self.rebalance_after_insert(node, p);
        Ok(Some(node))
    }

    /// Remove a node from the tree and recycle its slot.
    ///
    /// `id` must not be used after this call.
    pub fn unlink(&mut self, id: AvlNodeId) {
        let node_prev = self.arena.get(id).prev;
        let node_next = self.arena.get(id).next;
        match node_prev {
            Some(q) => self.arena.get_mut(q).next = node_next,
            None => self.head = node_next,
        }
        match node_next {
            Some(q) => self.arena.get_mut(q).prev = node_prev,
            None => self.tail = node_prev,
        }

        let nl = self.arena.get(id).left;
        let nr = self.arena.get(id).right;
        if nl.is_some() && nr.is_some() {
            // Two children: structurally replace the node with
            // its in-order successor, which has no left child.
            let s = node_next.expect("interior node lacks a successor");
            debug_assert!(self.arena.get(s).left.is_none());
            let sp = self.arena.get(s).parent.expect("successor lacks a parent");
            let s_right = self.arena.get(s).right;
            let retrace_parent;
            let retrace_from_right;
            if sp == id {
                // The successor is the node's right child and
                // keeps its own right subtree.
                retrace_parent = s;
                retrace_from_right = true;
            } else {
                self.arena.get_mut(sp).left = s_right;
                if let Some(c) = s_right {
                    self.arena.get_mut(c).parent = Some(sp);
                }
                let r = nr.expect("checked above");
                self.arena.get_mut(s).right = Some(r);
                self.arena.get_mut(r).parent = Some(s);
                retrace_parent = sp;
                retrace_from_right = false;
            }
            let l = nl.expect("checked above");
            self.arena.get_mut(s).left = Some(l);
            self.arena.get_mut(l).parent = Some(s);
            let npar = self.arena.get(id).parent;
            self.arena.get_mut(s).parent = npar;
            self.replace_child(npar, id, Some(s));
            let b = self.arena.get(id).balance;
            self.arena.get_mut(s).balance = b;
            self.retrace_after_unlink(retrace_parent, retrace_from_right);
        } else {
            let child = nl.or(nr);
            let npar = self.arena.get(id).parent;
            let from_right = npar.map(|p| self.arena.get(p).right == Some(id));
            if let Some(c) = child {
                self.arena.get_mut(c).parent = npar;
            }
            self.replace_child(npar, id, child);
            if let (Some(p), Some(r)) = (npar, from_right) {
                self.retrace_after_unlink(p, r);
            }
        }
        self.arena.free(id);
        self.count -= 1;
    }

    fn replace_child(&mut self, parent: Option<AvlNodeId>, old: AvlNodeId, new: Option<AvlNodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let pn = self.arena.get_mut(p);
                if pn.left == Some(old) {
                    pn.left = new;
                } else {
                    debug_assert_eq!(pn.right, Some(old));
                    pn.right = new;
                }
            }
        }
    }

    fn rebalance_after_insert(&mut self, mut child: AvlNodeId, mut parent: AvlNodeId) {
        loop {
            let from_right = self.arena.get(parent).right == Some(child);
            let b = {
                let p = self.arena.get_mut(parent);
                p.balance += if from_right { 1 } else { -1 };
                p.balance
            };
            match b {
                0 => break,
                1 | -1 => match self.arena.get(parent).parent {
                    None => break,
                    Some(g) => {
                        child = parent;
                        parent = g;
                    }
                },
                _ => {
                    // The subtree height is restored by the
                    // rotation, so retracing stops here.
                    self.rotate_for_insert(parent, b);
                    break;
                }
            }
        }
    }

    fn rotate_for_insert(&mut self, p: AvlNodeId, b: i8) {
        if b == 2 {
            let y = self.arena.get(p).right.expect("right-heavy node lacks right child");
            if self.arena.get(y).balance > 0 {
                self.rotate_left(p);
                self.arena.get_mut(p).balance = 0;
                self.arena.get_mut(y).balance = 0;
            } else {
                let w = self.arena.get(y).left.expect("double rotation lacks pivot");
                self.rotate_right(y);
                self.rotate_left(p);
                self.set_double_rotation_balances(p, y, w);
            }
        } else {
            let y = self.arena.get(p).left.expect("left-heavy node lacks left child");
            if self.arena.get(y).balance < 0 {
                self.rotate_right(p);
                self.arena.get_mut(p).balance = 0;
                self.arena.get_mut(y).balance = 0;
            } else {
                let w = self.arena.get(y).right.expect("double rotation lacks pivot");
                self.rotate_left(y);
                self.rotate_right(p);
                self.set_double_rotation_balances(y, p, w);
            }
        }
    }

    fn retrace_after_unlink(&mut self, mut parent: AvlNodeId, mut from_right: bool) {
        loop {
            let b = {
                let p = self.arena.get_mut(parent);
                p.balance += if from_right { -1 } else { 1 };
                p.balance
            };
            match b {
                1 | -1 => break, // subtree height unchanged
                0 => match self.arena.get(parent).parent {
                    None => break,
                    Some(g) => {
                        from_right = self.arena.get(g).right == Some(parent);
                        parent = g;
                    }
                },
                _ => {
                    let (subtree_root, shrunk) = self.rotate_for_unlink(parent, b);
                    if !shrunk {
                        break;
                    }
                    match self.arena.get(subtree_root).parent {
                        None => break,
                        Some(g) => {
                            from_right = self.arena.get(g).right == Some(subtree_root);
                            parent = g;
                        }
                    }
                }
            }
        }
    }

    // Returns the new subtree root and whether the subtree lost
    // a level of height.
    fn rotate_for_unlink(&mut self, p: AvlNodeId, b: i8) -> (AvlNodeId, bool) {
        if b == 2 {
            let y = self.arena.get(p).right.expect("right-heavy node lacks right child");
            let yb = self.arena.get(y).balance;
            if yb < 0 {
                let w = self.arena.get(y).left.expect("double rotation lacks pivot");
                self.rotate_right(y);
                self.rotate_left(p);
                self.set_double_rotation_balances(p, y, w);
                (w, true)
            } else {
                self.rotate_left(p);
                if yb == 0 {
                    self.arena.get_mut(p).balance = 1;
                    self.arena.get_mut(y).balance = -1;
                    (y, false)
                } else {
                    self.arena.get_mut(p).balance = 0;
                    self.arena.get_mut(y).balance = 0;
                    (y, true)
                }
            }
        } else {
            let y = self.arena.get(p).left.expect("left-heavy node lacks left child");
            let yb = self.arena.get(y).balance;
            if yb > 0 {
                let w = self.arena.get(y).right.expect("double rotation lacks pivot");
                self.rotate_left(y);
                self.rotate_right(p);
                self.set_double_rotation_balances(y, p, w);
                (w, true)
            } else {
                self.rotate_right(p);
                if yb == 0 {
                    self.arena.get_mut(p).balance = -1;
                    self.arena.get_mut(y).balance = 1;
                    (y, false)
                } else {
                    self.arena.get_mut(p).balance = 0;
                    self.arena.get_mut(y).balance = 0;
                    (y, true)
                }
            }
        }
    }

    // After a double rotation, `w` is the subtree root with
    // `left_child` and `right_child` beneath it. The final
    // balance factors depend only on which side of `w` carried
    // the extra height.
    fn set_double_rotation_balances(
        &mut self,
        left_child: AvlNodeId,
        right_child: AvlNodeId,
        w: AvlNodeId,
    ) {
        let (lb, rb) = match self.arena.get(w).balance {
            1 => (-1, 0),
            -1 => (0, 1),
            _ => (0, 0),
        };
        self.arena.get_mut(left_child).balance = lb;
        self.arena.get_mut(right_child).balance = rb;
        self.arena.get_mut(w).balance = 0;
    }

    fn rotate_left(&mut self, p: AvlNodeId) {
        let y = self.arena.get(p).right.expect("rotate_left lacks right child");
        let y_left = self.arena.get(y).left;
        let pp = self.arena.get(p).parent;
        self.arena.get_mut(p).right = y_left;
        if let Some(c) = y_left {
            self.arena.get_mut(c).parent = Some(p);
        }
        self.arena.get_mut(y).left = Some(p);
        self.arena.get_mut(p).parent = Some(y);
        self.arena.get_mut(y).parent = pp;
        self.replace_child(pp, p, Some(y));
    }

    fn rotate_right(&mut self, p: AvlNodeId) {
        let y = self.arena.get(p).left.expect("rotate_right lacks left child");
        let y_right = self.arena.get(y).right;
        let pp = self.arena.get(p).parent;
        self.arena.get_mut(p).left = y_right;
        if let Some(c) = y_right {
            self.arena.get_mut(c).parent = Some(p);
        }
        self.arena.get_mut(y).right = Some(p);
        self.arena.get_mut(p).parent = Some(y);
        self.arena.get_mut(y).parent = pp;
        self.replace_child(pp, p, Some(y));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type IntTree = AvlTree<i32, fn(&i32, &i32) -> Ordering>;

    fn make_tree() -> IntTree {
        AvlTree::new(i32::cmp as fn(&i32, &i32) -> Ordering, 8).unwrap()
    }

    fn in_order(t: &IntTree) -> Vec<i32> {
        let mut rv = vec![];
        let mut n = t.head();
        while let Some(i) = n {
            rv.push(*t.item(i));
            n = t.next(i);
        }
        rv
    }

    fn in_reverse_order(t: &IntTree) -> Vec<i32> {
        let mut rv = vec![];
        let mut n = t.tail();
        while let Some(i) = n {
            rv.push(*t.item(i));
            n = t.prev(i);
        }
        rv
    }

    // Recompute heights from scratch and compare against the
    // stored balance factors.
    fn check_structure(t: &IntTree, node: Option<AvlNodeId>) -> i32 {
        match node {
            None => 0,
            Some(n) => {
                let hl = check_structure(t, t.arena.get(n).left);
                let hr = check_structure(t, t.arena.get(n).right);
                assert_eq!((hr - hl) as i8, t.arena.get(n).balance);
                assert!((hr - hl).abs() <= 1);
                if let Some(c) = t.arena.get(n).left {
                    assert_eq!(t.arena.get(c).parent, Some(n));
                }
                if let Some(c) = t.arena.get(n).right {
                    assert_eq!(t.arena.get(c).parent, Some(n));
                }
                1 + hl.max(hr)
            }
        }
    }

    fn check(t: &IntTree) {
        check_structure(t, t.root);
        let fwd = in_order(t);
        let mut sorted = fwd.clone();
        sorted.sort_unstable();
        assert_eq!(fwd, sorted);
        let mut rev = in_reverse_order(t);
        rev.reverse();
        assert_eq!(fwd, rev);
        assert_eq!(fwd.len(), t.len());
        assert_eq!(t.arena_allocated(), t.len());
    }

    #[test]
    fn test_insert_orders() {
        for values in [
            vec![1, 2, 3, 4, 5, 6, 7],
            vec![7, 6, 5, 4, 3, 2, 1],
            vec![4, 2, 6, 1, 3, 5, 7],
            vec![1, 7, 2, 6, 3, 5, 4],
        ] {
            let mut t = make_tree();
            for v in &values {
                assert!(t.insert(*v).unwrap().is_some());
                check(&t);
            }
            assert_eq!(in_order(&t), vec![1, 2, 3, 4, 5, 6, 7]);
        }
    }

    #[test]
    fn test_duplicate_insert() {
        let mut t = make_tree();
        assert!(t.insert(1).unwrap().is_some());
        assert!(t.insert(1).unwrap().is_none());
        assert_eq!(t.len(), 1);
        check(&t);
    }

    #[test]
    fn test_search() {
        let mut t = make_tree();
        for v in [10, 20, 30, 40] {
            t.insert(v).unwrap();
        }
        assert!(t.search(&30).is_some());
        assert!(t.search(&31).is_none());
    }

    #[test]
    fn test_search_closest() {
        let mut t = make_tree();
        for v in [10, 20, 30] {
            t.insert(v).unwrap();
        }
        let (n, rel) = t.search_closest(&20).unwrap();
        assert_eq!(rel, Ordering::Equal);
        assert_eq!(*t.item(n), 20);

        // Probe between stored values: the result plus the
        // relation identifies the inclusive predecessor.
        let (n, rel) = t.search_closest(&25).unwrap();
        let pred = match rel {
            Ordering::Less => t.prev(n).unwrap(),
            _ => n,
        };
        assert_eq!(*t.item(pred), 20);

        let (n, rel) = t.search_closest(&5).unwrap();
        assert_eq!(rel, Ordering::Less);
        assert_eq!(*t.item(n), 10);
        assert!(t.prev(n).is_none());
    }

    #[test]
    fn test_search_closest_empty() {
        let t = make_tree();
        assert!(t.search_closest(&1).is_none());
    }

    #[test]
    fn test_unlink_head_drains_in_order() {
        let mut t = make_tree();
        for v in [5, 3, 8, 1, 4, 7, 9, 2, 6] {
            t.insert(v).unwrap();
        }
        let mut drained = vec![];
        while let Some(h) = t.head() {
            drained.push(*t.item(h));
            t.unlink(h);
            check(&t);
        }
        assert_eq!(drained, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert!(t.is_empty());
        assert_eq!(t.arena_allocated(), 0);
    }

    #[test]
    fn test_unlink_interior() {
        let mut t = make_tree();
        for v in 0..32 {
            t.insert(v).unwrap();
        }
        // Remove the evens in an arbitrary order.
        for v in [16, 0, 30, 8, 2, 24, 4, 28, 6, 22, 10, 26, 12, 18, 14, 20] {
            let n = t.search(&v).unwrap();
            t.unlink(n);
            check(&t);
        }
        assert_eq!(in_order(&t), (0..32).filter(|x| x % 2 == 1).collect::<Vec<_>>());
    }

    #[test]
    fn test_mixed_insert_unlink() {
        // Deterministic pseudo-random workload.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        let mut t = make_tree();
        let mut present = std::collections::BTreeSet::new();
        for _ in 0..500 {
            let v = (next() % 64) as i32;
            if present.contains(&v) {
                let n = t.search(&v).unwrap();
                t.unlink(n);
                present.remove(&v);
            } else {
                assert!(t.insert(v).unwrap().is_some());
                present.insert(v);
            }
            check(&t);
        }
        assert_eq!(in_order(&t), present.iter().copied().collect::<Vec<_>>());
    }
}
