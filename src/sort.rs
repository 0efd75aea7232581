//! In-place table sorting.
//!
//! [`sort_tables`] reorders a table collection so that
//! simplification sees its required input order: edgesets
//! ascending by `(parent time, parent, left)` with sorted
//! children lists, sites ascending by position, and mutations
//! grouped by their (remapped) site.

use crate::error::{TreeSeqError, TreeSeqResult};
use crate::tables::{EdgesetTable, MigrationTable, MutationTable, NodeTable, SiteTable};
use crate::tsdef::{NodeId, Position, SiteId, Time};

struct EdgesetSortRow {
    left: Position,
    right: Position,
    parent: NodeId,
    time: Time,
    children_start: usize,
    children_len: u16,
}

struct SiteSortRow {
    id: SiteId,
    position: Position,
    state_start: usize,
    state_len: u32,
}

struct MutationSortRow {
    site: SiteId,
    node: NodeId,
    state_start: usize,
    state_len: u16,
}

fn try_copy<T: Copy>(src: &[T]) -> TreeSeqResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(src.len())
        .map_err(|_| TreeSeqError::NoMemory)?;
    v.extend_from_slice(src);
    Ok(v)
}

fn sort_edgesets(nodes: &NodeTable, edgesets: &mut EdgesetTable) -> TreeSeqResult<()> {
    let num_rows = edgesets.num_rows();
    let mut children_mem = try_copy(edgesets.children())?;
    let mut rows = Vec::new();
    rows.try_reserve_exact(num_rows)
        .map_err(|_| TreeSeqError::NoMemory)?;

    let mut offset = 0;
    for j in 0..num_rows {
        let parent = edgesets.parent()[j];
        if parent < 0 || parent as usize >= nodes.num_rows() {
            return Err(TreeSeqError::OutOfBounds);
        }
        let children_len = edgesets.children_length()[j];
        rows.push(EdgesetSortRow {
            left: edgesets.left()[j],
            right: edgesets.right()[j],
            parent,
            time: nodes.time()[parent as usize],
            children_start: offset,
            children_len,
        });
        offset += children_len as usize;
    }
    rows.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| a.parent.cmp(&b.parent))
            .then_with(|| a.left.total_cmp(&b.left))
    });

    let mut left = Vec::with_capacity(num_rows);
    let mut right = Vec::with_capacity(num_rows);
    let mut parent = Vec::with_capacity(num_rows);
    let mut children_length = Vec::with_capacity(num_rows);
    let mut children = Vec::with_capacity(children_mem.len());
    for row in &rows {
        left.push(row.left);
        right.push(row.right);
        parent.push(row.parent);
        children_length.push(row.children_len);
        let span =
            &mut children_mem[row.children_start..row.children_start + row.children_len as usize];
        span.sort_unstable();
        children.extend_from_slice(span);
    }
    edgesets.set_columns(&left, &right, &parent, &children, &children_length)
}

// Sorts sites by position and returns the old-id → new-id map.
fn sort_sites(sites: &mut SiteTable) -> TreeSeqResult<Vec<SiteId>> {
    let num_rows = sites.num_rows();
    let state_mem = try_copy(sites.ancestral_state())?;
    let mut rows = Vec::new();
    rows.try_reserve_exact(num_rows)
        .map_err(|_| TreeSeqError::NoMemory)?;

    let mut offset = 0;
    for j in 0..num_rows {
        let state_len = sites.ancestral_state_length()[j];
        rows.push(SiteSortRow {
            id: j as SiteId,
            position: sites.position()[j],
            state_start: offset,
            state_len,
        });
        offset += state_len as usize;
    }
    rows.sort_by(|a, b| a.position.total_cmp(&b.position));

    let mut site_id_map = vec![0 as SiteId; num_rows];
    let mut position = Vec::with_capacity(num_rows);
    let mut state_length = Vec::with_capacity(num_rows);
    let mut state = Vec::with_capacity(state_mem.len());
    for (new_id, row) in rows.iter().enumerate() {
        site_id_map[row.id as usize] = new_id as SiteId;
        position.push(row.position);
        state_length.push(row.state_len);
        state.extend_from_slice(&state_mem[row.state_start..row.state_start + row.state_len as usize]);
    }
    sites.set_columns(&position, &state, &state_length)?;
    Ok(site_id_map)
}

fn sort_mutations(
    nodes: &NodeTable,
    sites: &SiteTable,
    mutations: &mut MutationTable,
    site_id_map: &[SiteId],
) -> TreeSeqResult<()> {
    let num_rows = mutations.num_rows();
    let state_mem = try_copy(mutations.derived_state())?;
    let mut rows = Vec::new();
    rows.try_reserve_exact(num_rows)
        .map_err(|_| TreeSeqError::NoMemory)?;

    let mut offset = 0;
    for j in 0..num_rows {
        let site = mutations.site()[j];
        if site < 0 || site as usize >= sites.num_rows() {
            return Err(TreeSeqError::OutOfBounds);
        }
        let node = mutations.node()[j];
        if node < 0 || node as usize >= nodes.num_rows() {
            return Err(TreeSeqError::OutOfBounds);
        }
        let state_len = mutations.derived_state_length()[j];
        rows.push(MutationSortRow {
            site: site_id_map[site as usize],
            node,
            state_start: offset,
            state_len,
        });
        offset += state_len as usize;
    }
    // Stable sort; mutations at the same site stay an unordered
    // set and keep their input order.
    rows.sort_by(|a, b| a.site.cmp(&b.site));

    let mut site = Vec::with_capacity(num_rows);
    let mut node = Vec::with_capacity(num_rows);
    let mut state_length = Vec::with_capacity(num_rows);
    let mut state = Vec::with_capacity(state_mem.len());
    for row in &rows {
        site.push(row.site);
        node.push(row.node);
        state_length.push(row.state_len);
        state.extend_from_slice(&state_mem[row.state_start..row.state_start + row.state_len as usize]);
    }
    mutations.set_columns(&site, &node, &state, &state_length)
}

/// Sort the tables into the order required by
/// [`simplify`](crate::simplify).
///
/// `migrations` is accepted for interface parity and left
/// untouched. Sites and mutations are optional, but providing
/// sites without mutations is
/// [`TreeSeqError::BadParam`]; when both are given, mutation
/// site ids are remapped through the new site ordering.
pub fn sort_tables(
    nodes: &NodeTable,
    edgesets: &mut EdgesetTable,
    _migrations: &mut MigrationTable,
    sites: Option<&mut SiteTable>,
    mutations: Option<&mut MutationTable>,
) -> TreeSeqResult<()> {
    if sites.is_some() && mutations.is_none() {
        return Err(TreeSeqError::BadParam);
    }
    sort_edgesets(nodes, edgesets)?;
    if let (Some(sites), Some(mutations)) = (sites, mutations) {
        let site_id_map = sort_sites(sites)?;
        sort_mutations(nodes, sites, mutations, &site_id_map)?;
    }
    Ok(())
}
