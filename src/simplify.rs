//! Table simplification.
//!
//! [`simplify`] reduces a table collection to the minimal
//! equivalent tree sequence describing the ancestry of a set
//! of sample nodes.
//!
//! The algorithm streams the (sorted) input edgesets one
//! parent at a time. Each input node owns a singly linked
//! chain of [`Segment`]s recording which output node currently
//! represents each part of its genome. Processing a parent
//! first extracts the overlapping pieces of its children's
//! chains into a priority queue keyed by `(left, node)`, then
//! merges the queued chains: wherever two or more segments
//! coincide the parent coalesces and is recorded in the output
//! tables. An ordered index of overlap counts tracks how many
//! ancestral segments still cover each coordinate so the merge
//! knows where coalescence completes.
//!
//! All per-run small objects live in [`ObjectArena`]s and are
//! recycled or dropped wholesale when the run ends.

use std::cmp::Ordering;

use crate::avl::AvlTree;
use crate::error::{TreeSeqError, TreeSeqResult};
use crate::object_arena::{ArenaId, ObjectArena};
use crate::tables::{EdgesetTable, MigrationTable, MutationTable, NodeTable, SiteTable};
use crate::tsdef::{NodeFlags, NodeId, Position, SimplificationFlags};

/// Index of a segment in the simplifier's segment arena.
type SegmentId = ArenaId;

// A genomic interval currently mapped to one output node.
// Chains are linked through the segment arena and satisfy
// left < right within a segment and right <= next.left between
// neighbors.
#[derive(Clone, Copy, Debug)]
struct Segment {
    left: Position,
    right: Position,
    node: NodeId,
    next: Option<SegmentId>,
}

// Merge-queue entry: the head of a segment chain, keyed by
// (left, node). The key is copied at insertion time; a segment
// is never mutated while it sits in the queue.
#[derive(Clone, Copy, Debug)]
struct QueueItem {
    left: Position,
    node: NodeId,
    seg: SegmentId,
}

// One step of the overlap-count step function: `count`
// ancestral segments cover [start, next start).
#[derive(Clone, Copy, Debug)]
struct OverlapCount {
    start: Position,
    count: u32,
}

// Buffered output row used for edgeset squashing.
struct PendingEdgeset {
    left: Position,
    right: Position,
    parent: NodeId,
    children: Vec<NodeId>,
}

fn cmp_queue_item(a: &QueueItem, b: &QueueItem) -> Ordering {
    a.left
        .total_cmp(&b.left)
        .then_with(|| a.node.cmp(&b.node))
}

fn cmp_overlap_count(a: &OverlapCount, b: &OverlapCount) -> Ordering {
    a.start.total_cmp(&b.start)
}

type MergeQueue = AvlTree<QueueItem, fn(&QueueItem, &QueueItem) -> Ordering>;
type OverlapCounts = AvlTree<OverlapCount, fn(&OverlapCount, &OverlapCount) -> Ordering>;

/// The simplification engine.
///
/// A simplifier exclusively owns its arenas and maps for one
/// run; the table handles are borrowed and become the output
/// tables. Use [`simplify`] unless you need to hold the
/// engine itself.
pub struct Simplifier<'a> {
    sequence_length: Position,
    // output handles
    nodes: &'a mut NodeTable,
    edgesets: &'a mut EdgesetTable,
    sites: &'a mut SiteTable,
    mutations: &'a mut MutationTable,
    // the inputs, taken out of the handles above
    input_nodes: NodeTable,
    input_edgesets: EdgesetTable,
    node_name_offset: Vec<usize>,
    // per-run state
    segments: ObjectArena<Segment>,
    ancestor_map: Vec<Option<SegmentId>>,
    merge_queue: MergeQueue,
    overlap_counts: OverlapCounts,
    last_edgeset: Option<PendingEdgeset>,
    segment_buffer: Vec<SegmentId>,
    children_buffer: Vec<NodeId>,
}

impl<'a> Simplifier<'a> {
    /// Set up a run over the given tables.
    ///
    /// The node and edgeset tables must be sorted (see
    /// [`sort_tables`](crate::sort_tables)). Their contents are
    /// moved into the simplifier; on success the handles are
    /// empty output tables seeded with one node per sample, in
    /// the caller-supplied order. `flags` is currently
    /// informational.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nodes: &'a mut NodeTable,
        edgesets: &'a mut EdgesetTable,
        _migrations: &mut MigrationTable,
        sites: &'a mut SiteTable,
        mutations: &'a mut MutationTable,
        samples: &[NodeId],
        sequence_length: Position,
        _flags: SimplificationFlags,
    ) -> TreeSeqResult<Self> {
        if samples.len() < 2 || nodes.num_rows() == 0 || edgesets.num_rows() == 0 {
            return Err(TreeSeqError::BadParam);
        }
        let input_nodes = nodes.take();
        let input_edgesets = edgesets.take();
        let num_input_nodes = input_nodes.num_rows();

        let mut node_name_offset = Vec::with_capacity(num_input_nodes);
        let mut offset = 0;
        for j in 0..num_input_nodes {
            node_name_offset.push(offset);
            offset += input_nodes.name_length()[j] as usize;
        }

        // The number of input edgesets is a reasonable first
        // guess for the arena block sizes.
        let block_size = input_edgesets.num_rows();
        let mut simplifier = Simplifier {
            sequence_length,
            nodes,
            edgesets,
            sites,
            mutations,
            input_nodes,
            input_edgesets,
            node_name_offset,
            segments: ObjectArena::new(block_size)?,
            ancestor_map: vec![None; num_input_nodes],
            merge_queue: AvlTree::new(
                cmp_queue_item as fn(&QueueItem, &QueueItem) -> Ordering,
                block_size,
            )?,
            overlap_counts: AvlTree::new(
                cmp_overlap_count as fn(&OverlapCount, &OverlapCount) -> Ordering,
                block_size,
            )?,
            last_edgeset: None,
            segment_buffer: vec![],
            children_buffer: vec![],
        };

        for j in 0..samples.len() {
            let input_node = samples[j];
            if input_node < 0 || input_node as usize >= num_input_nodes {
                return Err(TreeSeqError::OutOfBounds);
            }
            let flags = simplifier.input_nodes.flags()[input_node as usize];
            if !NodeFlags::from_bits_truncate(flags).contains(NodeFlags::IS_SAMPLE) {
                return Err(TreeSeqError::BadSamples);
            }
            if simplifier.ancestor_map[input_node as usize].is_some() {
                return Err(TreeSeqError::DuplicateSample);
            }
            let output_id = simplifier.nodes.num_rows() as NodeId;
            let seg = simplifier.segments.alloc(Segment {
                left: 0.0,
                right: sequence_length,
                node: output_id,
                next: None,
            })?;
            simplifier.ancestor_map[input_node as usize] = Some(seg);
            simplifier.record_node(input_node)?;
        }

        let num_samples = samples.len() as u32;
        simplifier.insert_overlap_count(0.0, num_samples)?;
        // Sentinel bound: the overlap walk never runs past the
        // end of the genome.
        simplifier.insert_overlap_count(sequence_length, num_samples + 1)?;

        simplifier.sites.reset();
        simplifier.mutations.reset();
        Ok(simplifier)
    }

    /// Run the simplification, refilling the output tables.
    pub fn run(&mut self) -> TreeSeqResult<()> {
        let num_input_edgesets = self.input_edgesets.num_rows();
        let mut children_offset = 0;
        let mut current_parent = self.input_edgesets.parent()[0];

        for j in 0..num_input_edgesets {
            let parent = self.input_edgesets.parent()[j];
            let left = self.input_edgesets.left()[j];
            let right = self.input_edgesets.right()[j];
            let children_length = self.input_edgesets.children_length()[j] as usize;
            if parent < 0 || parent as usize >= self.input_nodes.num_rows() {
                return Err(TreeSeqError::OutOfBounds);
            }

            if parent != current_parent {
                self.merge_ancestors(current_parent)?;
                debug_assert!(self.merge_queue.is_empty());
                // The sort should have established this; bad
                // input reaching here is reported, not UB.
                if self.input_nodes.time()[current_parent as usize]
                    > self.input_nodes.time()[parent as usize]
                {
                    return Err(TreeSeqError::RecordsNotTimeSorted);
                }
                current_parent = parent;
            }

            for k in 0..children_length {
                let child = self.input_edgesets.children()[children_offset + k];
                if child < 0 || child as usize >= self.ancestor_map.len() {
                    return Err(TreeSeqError::OutOfBounds);
                }
                if self.ancestor_map[child as usize].is_some() {
                    self.remove_ancestry(left, right, child)?;
                    #[cfg(debug_assertions)]
                    self.check_state();
                }
            }
            children_offset += children_length;
        }
        self.merge_ancestors(current_parent)?;
        debug_assert!(self.merge_queue.is_empty());
        #[cfg(debug_assertions)]
        self.check_state();

        if let Some(last) = self.last_edgeset.take() {
            self.edgesets
                .add_row(last.left, last.right, last.parent, &last.children)?;
        }
        Ok(())
    }

    // Copy an input node's row into the output node table.
    fn record_node(&mut self, input_id: NodeId) -> TreeSeqResult<()> {
        let j = input_id as usize;
        let start = self.node_name_offset[j];
        let len = self.input_nodes.name_length()[j] as usize;
        let name = &self.input_nodes.name()[start..start + len];
        self.nodes.add_row(
            self.input_nodes.flags()[j],
            self.input_nodes.time()[j],
            self.input_nodes.population()[j],
            name,
        )?;
        Ok(())
    }

    fn alloc_segment(
        &mut self,
        left: Position,
        right: Position,
        node: NodeId,
        next: Option<SegmentId>,
    ) -> TreeSeqResult<SegmentId> {
        self.segments.alloc(Segment {
            left,
            right,
            node,
            next,
        })
    }

    fn queue_insert(&mut self, seg: SegmentId) -> TreeSeqResult<()> {
        let s = *self.segments.get(seg);
        let inserted = self.merge_queue.insert(QueueItem {
            left: s.left,
            node: s.node,
            seg,
        })?;
        debug_assert!(inserted.is_some());
        Ok(())
    }

    fn insert_overlap_count(&mut self, start: Position, count: u32) -> TreeSeqResult<()> {
        let inserted = self.overlap_counts.insert(OverlapCount { start, count })?;
        debug_assert!(inserted.is_some());
        Ok(())
    }

    // Materialize an overlap-count breakpoint at `start`,
    // copying the count from the inclusive predecessor. The
    // step function itself is unchanged.
    fn copy_overlap_count(&mut self, start: Position) -> TreeSeqResult<()> {
        let probe = OverlapCount { start, count: 0 };
        let (nearest, relation) = self
            .overlap_counts
            .search_closest(&probe)
            .ok_or(TreeSeqError::Generic)?;
        let nearest = if relation == Ordering::Less {
            self.overlap_counts
                .prev(nearest)
                .ok_or(TreeSeqError::Generic)?
        } else {
            nearest
        };
        let count = self.overlap_counts.item(nearest).count;
        self.insert_overlap_count(start, count)
    }

    // Extract the part of `input_id`'s chain overlapping
    // [left, right) and enqueue it for merging; the remainder
    // is spliced back together.
    fn remove_ancestry(
        &mut self,
        left: Position,
        right: Position,
        input_id: NodeId,
    ) -> TreeSeqResult<()> {
        let mut x = self.ancestor_map[input_id as usize];
        let mut head = x;
        let mut last: Option<SegmentId> = None;

        // Skip the segments wholly before the interval.
        while let Some(xi) = x {
            if self.segments.get(xi).right <= left {
                last = Some(xi);
                x = self.segments.get(xi).next;
            } else {
                break;
            }
        }
        if let Some(xi) = x {
            let seg = *self.segments.get(xi);
            if seg.left < left {
                // The left edge of x overhangs. Keep the excess
                // in the chain as a new segment.
                let y = self.alloc_segment(seg.left, left, seg.node, None)?;
                self.segments.get_mut(xi).left = left;
                if let Some(l) = last {
                    self.segments.get_mut(l).next = Some(y);
                }
                if x == head {
                    head = Some(y);
                }
                last = Some(y);
            }
        }
        if let Some(xi) = x {
            if self.segments.get(xi).left < right {
                // x starts the extracted chain.
                self.queue_insert(xi)?;
                let mut x_prev: Option<SegmentId> = None;
                let mut cursor = x;
                while let Some(ci) = cursor {
                    if self.segments.get(ci).right <= right {
                        x_prev = Some(ci);
                        cursor = self.segments.get(ci).next;
                    } else {
                        break;
                    }
                }
                match cursor {
                    Some(ci) if self.segments.get(ci).left < right => {
                        // Right-hand overhang: split and
                        // terminate the extracted chain.
                        let seg = *self.segments.get(ci);
                        let y = self.alloc_segment(right, seg.right, seg.node, seg.next)?;
                        let s = self.segments.get_mut(ci);
                        s.right = right;
                        s.next = None;
                        cursor = Some(y);
                    }
                    _ => {
                        if let Some(p) = x_prev {
                            self.segments.get_mut(p).next = None;
                        }
                    }
                }
                x = cursor;
            }
        }
        // x is now the first segment after the interval.
        match last {
            None => head = x,
            Some(l) => self.segments.get_mut(l).next = x,
        }
        self.ancestor_map[input_id as usize] = head;
        Ok(())
    }

    // Resolve every queued chain fragment into the new chain
    // for `input_id`, emitting output rows at coalescences.
    fn merge_ancestors(&mut self, input_id: NodeId) -> TreeSeqResult<()> {
        let mut coalescence = false;
        let mut z: Option<SegmentId> = None;
        let mut heads = std::mem::take(&mut self.segment_buffer);

        while !self.merge_queue.is_empty() {
            // Gather the chains whose heads share the minimal
            // left coordinate.
            heads.clear();
            let first = self.merge_queue.head().ok_or(TreeSeqError::Generic)?;
            let l = self.merge_queue.item(first).left;
            let mut r_max = self.sequence_length;
            while let Some(q) = self.merge_queue.head() {
                let entry = *self.merge_queue.item(q);
                if entry.left != l {
                    break;
                }
                self.merge_queue.unlink(q);
                r_max = r_max.min(self.segments.get(entry.seg).right);
                heads.push(entry.seg);
            }
            let next_l = self.merge_queue.head().map(|q| self.merge_queue.item(q).left);
            if let Some(nl) = next_l {
                r_max = r_max.min(nl);
            }
            let h = heads.len();
            let mut alpha: Option<SegmentId> = None;

            if h == 1 {
                // Single coverage: the interval passes through
                // unchanged, no coalescence at this parent.
                let x = heads[0];
                let seg = *self.segments.get(x);
                match next_l {
                    Some(nl) if nl < seg.right => {
                        alpha = Some(self.alloc_segment(seg.left, nl, seg.node, None)?);
                        self.segments.get_mut(x).left = nl;
                        self.queue_insert(x)?;
                    }
                    _ => {
                        alpha = Some(x);
                        self.segments.get_mut(x).next = None;
                        if let Some(n) = seg.next {
                            self.queue_insert(n)?;
                        }
                    }
                }
            } else {
                if !coalescence {
                    coalescence = true;
                    self.record_node(input_id)?;
                }
                let v = (self.nodes.num_rows() - 1) as NodeId;

                // Make sure breakpoints exist at both bounds.
                let probe = OverlapCount { start: l, count: 0 };
                if self.overlap_counts.search(&probe).is_none() {
                    self.copy_overlap_count(l)?;
                }
                let probe = OverlapCount {
                    start: r_max,
                    count: 0,
                };
                if self.overlap_counts.search(&probe).is_none() {
                    self.copy_overlap_count(r_max)?;
                }

                // Walk the overlap counts to find where this
                // coalescence resolves.
                let probe = OverlapCount { start: l, count: 0 };
                let mut oc = self
                    .overlap_counts
                    .search(&probe)
                    .ok_or(TreeSeqError::Generic)?;
                let r;
                if self.overlap_counts.item(oc).count == h as u32 {
                    // Everything overlapping here coalesced:
                    // the ancestry above this interval is fully
                    // accounted for, so no new segment is
                    // produced.
                    self.overlap_counts.item_mut(oc).count = 0;
                    let next = self.overlap_counts.next(oc).ok_or(TreeSeqError::Generic)?;
                    r = self.overlap_counts.item(next).start;
                } else {
                    let mut walked = l;
                    while self.overlap_counts.item(oc).count != h as u32 && walked < r_max {
                        self.overlap_counts.item_mut(oc).count -= h as u32 - 1;
                        oc = self.overlap_counts.next(oc).ok_or(TreeSeqError::Generic)?;
                        walked = self.overlap_counts.item(oc).start;
                    }
                    r = walked;
                    alpha = Some(self.alloc_segment(l, r, v, None)?);
                }

                // Emit the edgeset and put the trimmed chains
                // back on the queue.
                let mut children = std::mem::take(&mut self.children_buffer);
                children.clear();
                for j in 0..h {
                    let xj = heads[j];
                    let seg = *self.segments.get(xj);
                    children.push(seg.node);
                    let mut remainder = Some(xj);
                    if seg.right == r {
                        self.segments.free(xj);
                        remainder = seg.next;
                    } else if seg.right > r {
                        self.segments.get_mut(xj).left = r;
                    }
                    if let Some(ri) = remainder {
                        self.queue_insert(ri)?;
                    }
                }
                self.record_edgeset(l, r, v, &mut children)?;
                self.children_buffer = children;
            }

            // Append alpha to the new chain.
            if let Some(a) = alpha {
                match z {
                    None => self.ancestor_map[input_id as usize] = Some(a),
                    Some(zi) => self.segments.get_mut(zi).next = Some(a),
                }
                z = Some(a);
            }
        }
        self.segment_buffer = heads;
        Ok(())
    }

    // Buffer an output edgeset, squashing it into the previous
    // one when they abut with identical parent and children.
    fn record_edgeset(
        &mut self,
        left: Position,
        right: Position,
        parent: NodeId,
        children: &mut Vec<NodeId>,
    ) -> TreeSeqResult<()> {
        children.sort_unstable();
        match &mut self.last_edgeset {
            None => {
                self.last_edgeset = Some(PendingEdgeset {
                    left,
                    right,
                    parent,
                    children: children.clone(),
                });
            }
            Some(last) => {
                let squash = last.right == left
                    && last.parent == parent
                    && last.children == *children;
                if squash {
                    last.right = right;
                } else {
                    self.edgesets
                        .add_row(last.left, last.right, last.parent, &last.children)?;
                    last.left = left;
                    last.right = right;
                    last.parent = parent;
                    last.children.clear();
                    last.children.extend_from_slice(children);
                }
            }
        }
        Ok(())
    }

    // Verify chain ordering and arena accounting. Quadratic in
    // the live state; only wired in for debug builds.
    #[cfg(debug_assertions)]
    fn check_state(&self) {
        let mut total_segments = 0;
        for j in 0..self.ancestor_map.len() {
            let mut u = self.ancestor_map[j];
            while let Some(ui) = u {
                let seg = self.segments.get(ui);
                assert!(seg.left < seg.right);
                if let Some(ni) = seg.next {
                    assert!(seg.right <= self.segments.get(ni).left);
                }
                total_segments += 1;
                u = seg.next;
            }
        }
        let mut queue_entries = 0;
        let mut q = self.merge_queue.head();
        while let Some(qi) = q {
            queue_entries += 1;
            let mut u = Some(self.merge_queue.item(qi).seg);
            while let Some(ui) = u {
                let seg = self.segments.get(ui);
                assert!(seg.left < seg.right);
                if let Some(ni) = seg.next {
                    assert!(seg.right <= self.segments.get(ni).left);
                }
                total_segments += 1;
                u = seg.next;
            }
            q = self.merge_queue.next(qi);
        }
        assert_eq!(total_segments, self.segments.num_allocated());
        assert_eq!(queue_entries, self.merge_queue.len());
        assert_eq!(self.merge_queue.arena_allocated(), self.merge_queue.len());
        assert_eq!(
            self.overlap_counts.arena_allocated(),
            self.overlap_counts.len()
        );
    }
}

/// Simplify the tables to the ancestry of `samples`.
///
/// The tables must be sorted (see
/// [`sort_tables`](crate::sort_tables)). On success the node
/// table holds the used nodes in the order they were first
/// recorded (samples first) and the edgeset table the minimal
/// equivalent edgesets; sites and mutations are reset and
/// `migrations` passes through untouched.
///
/// # Errors
///
/// * [`TreeSeqError::BadParam`] — fewer than two samples, or
///   empty node/edgeset tables.
/// * [`TreeSeqError::OutOfBounds`] — a sample, parent, or child
///   id does not index the node table.
/// * [`TreeSeqError::BadSamples`] — a sample lacks
///   [`NodeFlags::IS_SAMPLE`].
/// * [`TreeSeqError::DuplicateSample`] — a repeated sample id.
/// * [`TreeSeqError::RecordsNotTimeSorted`] — parent times
///   decrease along the edgeset table.
///
/// On error the output tables may hold partial results; reset
/// them before reuse.
#[allow(clippy::too_many_arguments)]
pub fn simplify(
    nodes: &mut NodeTable,
    edgesets: &mut EdgesetTable,
    migrations: &mut MigrationTable,
    sites: &mut SiteTable,
    mutations: &mut MutationTable,
    samples: &[NodeId],
    sequence_length: Position,
    flags: SimplificationFlags,
) -> TreeSeqResult<()> {
    let mut simplifier = Simplifier::new(
        nodes,
        edgesets,
        migrations,
        sites,
        mutations,
        samples,
        sequence_length,
        flags,
    )?;
    simplifier.run()
}
