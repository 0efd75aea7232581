//! Column-oriented tables describing a tree sequence.
//!
//! Each table stores its rows as parallel column vectors, with
//! variable-length payloads (node names, edgeset children,
//! mutation states) packed into a single buffer addressed by a
//! per-row length column; offsets are implicit prefix sums.
//!
//! Tables grow by caller-configured increments. Growth is
//! additive rather than geometric, so memory behavior with
//! large increments stays predictable, and a failed
//! reservation surfaces as [`TreeSeqError::NoMemory`].

use std::io::{self, Write};

use crate::error::{TreeSeqError, TreeSeqResult};
use crate::tsdef::{NodeId, PopulationId, Position, SiteId, Time, NULL_POPULATION};

const TABLE_SEP: &str = "-----------------------------------------";

fn reserve_rows<T>(col: &mut Vec<T>, increment: usize) -> TreeSeqResult<()> {
    if col.len() == col.capacity() {
        col.try_reserve_exact(increment)
            .map_err(|_| TreeSeqError::NoMemory)?;
    }
    Ok(())
}

// Payloads can exceed one increment in a single append, so the
// target capacity is stepped up until the append fits.
fn reserve_payload<T>(col: &mut Vec<T>, additional: usize, increment: usize) -> TreeSeqResult<()> {
    let mut wanted = col.capacity();
    while col.len() + additional > wanted {
        wanted += increment;
    }
    if wanted > col.capacity() {
        col.try_reserve_exact(wanted - col.len())
            .map_err(|_| TreeSeqError::NoMemory)?;
    }
    Ok(())
}

fn assign_column<T: Copy>(col: &mut Vec<T>, data: &[T]) -> TreeSeqResult<()> {
    col.clear();
    if data.len() > col.capacity() {
        col.try_reserve_exact(data.len())
            .map_err(|_| TreeSeqError::NoMemory)?;
    }
    col.extend_from_slice(data);
    Ok(())
}

fn fill_column<T: Copy>(col: &mut Vec<T>, value: T, n: usize) -> TreeSeqResult<()> {
    col.clear();
    if n > col.capacity() {
        col.try_reserve_exact(n)
            .map_err(|_| TreeSeqError::NoMemory)?;
    }
    col.resize(n, value);
    Ok(())
}

/// The nodes (ancestors) of a tree sequence.
///
/// Columns: `flags`, `time`, `population`, and a variable
/// length UTF-8 `name` payload addressed by `name_length`.
pub struct NodeTable {
    max_rows_increment: usize,
    max_name_length_increment: usize,
    flags: Vec<u32>,
    time: Vec<Time>,
    population: Vec<PopulationId>,
    name_length: Vec<u32>,
    name: Vec<u8>,
}

impl NodeTable {
    /// Create a table growing by the given row and name-buffer
    /// increments.
    ///
    /// # Errors
    ///
    /// [`TreeSeqError::BadParam`] if either increment is zero.
    pub fn new(max_rows_increment: usize, max_name_length_increment: usize) -> TreeSeqResult<Self> {
        if max_rows_increment == 0 || max_name_length_increment == 0 {
            return Err(TreeSeqError::BadParam);
        }
        Ok(NodeTable {
            max_rows_increment,
            max_name_length_increment,
            flags: vec![],
            time: vec![],
            population: vec![],
            name_length: vec![],
            name: vec![],
        })
    }

    pub fn num_rows(&self) -> usize {
        self.flags.len()
    }

    /// Append one row, returning the new row's id.
    pub fn add_row(
        &mut self,
        flags: u32,
        time: Time,
        population: PopulationId,
        name: &[u8],
    ) -> TreeSeqResult<NodeId> {
        reserve_rows(&mut self.flags, self.max_rows_increment)?;
        reserve_rows(&mut self.time, self.max_rows_increment)?;
        reserve_rows(&mut self.population, self.max_rows_increment)?;
        reserve_rows(&mut self.name_length, self.max_rows_increment)?;
        reserve_payload(&mut self.name, name.len(), self.max_name_length_increment)?;
        let name_length = u32::try_from(name.len()).map_err(|_| TreeSeqError::OutOfBounds)?;
        self.flags.push(flags);
        self.time.push(time);
        self.population.push(population);
        self.name_length.push(name_length);
        self.name.extend_from_slice(name);
        Ok((self.num_rows() - 1) as NodeId)
    }

    /// Replace the table contents from column slices.
    ///
    /// `flags` and `time` are required and must agree on the
    /// number of rows. An absent `population` column fills with
    /// [`NULL_POPULATION`](crate::NULL_POPULATION); an absent
    /// name pair clears the name payload and zeroes the
    /// lengths. The name pair must satisfy
    /// `name_length.iter().sum() == name.len()`.
    pub fn set_columns(
        &mut self,
        flags: &[u32],
        time: &[Time],
        population: Option<&[PopulationId]>,
        name: Option<(&[u8], &[u32])>,
    ) -> TreeSeqResult<()> {
        let num_rows = flags.len();
        if time.len() != num_rows {
            return Err(TreeSeqError::BadParam);
        }
        if let Some(p) = population {
            if p.len() != num_rows {
                return Err(TreeSeqError::BadParam);
            }
        }
        if let Some((name, name_length)) = name {
            if name_length.len() != num_rows {
                return Err(TreeSeqError::BadParam);
            }
            let total: usize = name_length.iter().map(|x| *x as usize).sum();
            if total != name.len() {
                return Err(TreeSeqError::BadParam);
            }
        }
        assign_column(&mut self.flags, flags)?;
        assign_column(&mut self.time, time)?;
        match population {
            Some(p) => assign_column(&mut self.population, p)?,
            None => fill_column(&mut self.population, NULL_POPULATION, num_rows)?,
        }
        match name {
            Some((name, name_length)) => {
                assign_column(&mut self.name, name)?;
                assign_column(&mut self.name_length, name_length)?;
            }
            None => {
                self.name.clear();
                fill_column(&mut self.name_length, 0, num_rows)?;
            }
        }
        Ok(())
    }

    /// Logically clear the table, keeping capacity.
    pub fn reset(&mut self) {
        self.flags.clear();
        self.time.clear();
        self.population.clear();
        self.name_length.clear();
        self.name.clear();
    }

    pub fn flags(&self) -> &[u32] {
        &self.flags
    }

    pub fn time(&self) -> &[Time] {
        &self.time
    }

    pub fn population(&self) -> &[PopulationId] {
        &self.population
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn name_length(&self) -> &[u32] {
        &self.name_length
    }

    // Move the contents out, leaving an empty table with the
    // same growth parameters.
    pub(crate) fn take(&mut self) -> Self {
        NodeTable {
            max_rows_increment: self.max_rows_increment,
            max_name_length_increment: self.max_name_length_increment,
            flags: std::mem::take(&mut self.flags),
            time: std::mem::take(&mut self.time),
            population: std::mem::take(&mut self.population),
            name_length: std::mem::take(&mut self.name_length),
            name: std::mem::take(&mut self.name),
        }
    }

    /// Write a tab-separated dump of the table.
    pub fn print_state<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "node_table:")?;
        writeln!(
            out,
            "num_rows          = {}\tmax = {}\tincrement = {}",
            self.num_rows(),
            self.flags.capacity(),
            self.max_rows_increment
        )?;
        writeln!(
            out,
            "total_name_length = {}\tmax = {}\tincrement = {}",
            self.name.len(),
            self.name.capacity(),
            self.max_name_length_increment
        )?;
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "index\tflags\ttime\tpopulation\tname_length\tname")?;
        let mut offset = 0;
        for j in 0..self.num_rows() {
            let len = self.name_length[j] as usize;
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}",
                j,
                self.flags[j],
                self.time[j],
                self.population[j],
                len,
                String::from_utf8_lossy(&self.name[offset..offset + len])
            )?;
            offset += len;
        }
        Ok(())
    }
}

/// The edgesets of a tree sequence: parent → children
/// transmissions over half-open genomic intervals.
pub struct EdgesetTable {
    max_rows_increment: usize,
    max_children_length_increment: usize,
    left: Vec<Position>,
    right: Vec<Position>,
    parent: Vec<NodeId>,
    children_length: Vec<u16>,
    children: Vec<NodeId>,
}

/// Iterator over edgeset rows, resolving the children payload
/// offsets.
pub struct EdgesetRows<'a> {
    table: &'a EdgesetTable,
    row: usize,
    offset: usize,
}

impl<'a> Iterator for EdgesetRows<'a> {
    type Item = (Position, Position, NodeId, &'a [NodeId]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.table.num_rows() {
            return None;
        }
        let j = self.row;
        let len = self.table.children_length[j] as usize;
        let children = &self.table.children[self.offset..self.offset + len];
        self.row += 1;
        self.offset += len;
        Some((self.table.left[j], self.table.right[j], self.table.parent[j], children))
    }
}

impl EdgesetTable {
    /// Create a table growing by the given row and
    /// children-buffer increments.
    ///
    /// # Errors
    ///
    /// [`TreeSeqError::BadParam`] if either increment is zero.
    pub fn new(
        max_rows_increment: usize,
        max_children_length_increment: usize,
    ) -> TreeSeqResult<Self> {
        if max_rows_increment == 0 || max_children_length_increment == 0 {
            return Err(TreeSeqError::BadParam);
        }
        Ok(EdgesetTable {
            max_rows_increment,
            max_children_length_increment,
            left: vec![],
            right: vec![],
            parent: vec![],
            children_length: vec![],
            children: vec![],
        })
    }

    pub fn num_rows(&self) -> usize {
        self.parent.len()
    }

    pub fn total_children_length(&self) -> usize {
        self.children.len()
    }

    /// Append one row.
    ///
    /// # Errors
    ///
    /// [`TreeSeqError::BadParam`] when `children` is empty or
    /// the interval is not `left < right`.
    pub fn add_row(
        &mut self,
        left: Position,
        right: Position,
        parent: NodeId,
        children: &[NodeId],
    ) -> TreeSeqResult<()> {
        if children.is_empty() || left >= right {
            return Err(TreeSeqError::BadParam);
        }
        let children_length =
            u16::try_from(children.len()).map_err(|_| TreeSeqError::OutOfBounds)?;
        reserve_rows(&mut self.left, self.max_rows_increment)?;
        reserve_rows(&mut self.right, self.max_rows_increment)?;
        reserve_rows(&mut self.parent, self.max_rows_increment)?;
        reserve_rows(&mut self.children_length, self.max_rows_increment)?;
        reserve_payload(
            &mut self.children,
            children.len(),
            self.max_children_length_increment,
        )?;
        self.left.push(left);
        self.right.push(right);
        self.parent.push(parent);
        self.children_length.push(children_length);
        self.children.extend_from_slice(children);
        Ok(())
    }

    /// Replace the table contents from column slices. All
    /// columns are required; `children_length` must sum to the
    /// children payload length.
    pub fn set_columns(
        &mut self,
        left: &[Position],
        right: &[Position],
        parent: &[NodeId],
        children: &[NodeId],
        children_length: &[u16],
    ) -> TreeSeqResult<()> {
        let num_rows = left.len();
        if right.len() != num_rows || parent.len() != num_rows || children_length.len() != num_rows
        {
            return Err(TreeSeqError::BadParam);
        }
        let total: usize = children_length.iter().map(|x| *x as usize).sum();
        if total != children.len() {
            return Err(TreeSeqError::BadParam);
        }
        assign_column(&mut self.left, left)?;
        assign_column(&mut self.right, right)?;
        assign_column(&mut self.parent, parent)?;
        assign_column(&mut self.children, children)?;
        assign_column(&mut self.children_length, children_length)?;
        Ok(())
    }

    /// Logically clear the table, keeping capacity.
    pub fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.parent.clear();
        self.children_length.clear();
        self.children.clear();
    }

    pub fn left(&self) -> &[Position] {
        &self.left
    }

    pub fn right(&self) -> &[Position] {
        &self.right
    }

    pub fn parent(&self) -> &[NodeId] {
        &self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn children_length(&self) -> &[u16] {
        &self.children_length
    }

    /// Iterate `(left, right, parent, children)` rows.
    pub fn iter_rows(&self) -> EdgesetRows<'_> {
        EdgesetRows {
            table: self,
            row: 0,
            offset: 0,
        }
    }

    pub(crate) fn take(&mut self) -> Self {
        EdgesetTable {
            max_rows_increment: self.max_rows_increment,
            max_children_length_increment: self.max_children_length_increment,
            left: std::mem::take(&mut self.left),
            right: std::mem::take(&mut self.right),
            parent: std::mem::take(&mut self.parent),
            children_length: std::mem::take(&mut self.children_length),
            children: std::mem::take(&mut self.children),
        }
    }

    /// Write a tab-separated dump of the table.
    pub fn print_state<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "edgeset_table:")?;
        writeln!(
            out,
            "num_rows              = {}\tmax = {}\tincrement = {}",
            self.num_rows(),
            self.parent.capacity(),
            self.max_rows_increment
        )?;
        writeln!(
            out,
            "total_children_length = {}\tmax = {}\tincrement = {}",
            self.children.len(),
            self.children.capacity(),
            self.max_children_length_increment
        )?;
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "index\tleft\tright\tparent\tchildren_length\tchildren")?;
        for (j, (left, right, parent, children)) in self.iter_rows().enumerate() {
            let list = children
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(",");
            writeln!(
                out,
                "{}\t{:.3}\t{:.3}\t{}\t{}\t{}",
                j,
                left,
                right,
                parent,
                children.len(),
                list
            )?;
        }
        Ok(())
    }
}

/// The sites of a tree sequence: genomic positions with an
/// ancestral state payload.
pub struct SiteTable {
    max_rows_increment: usize,
    max_ancestral_state_length_increment: usize,
    position: Vec<Position>,
    ancestral_state_length: Vec<u32>,
    ancestral_state: Vec<u8>,
}

impl SiteTable {
    /// Create a table growing by the given row and state-buffer
    /// increments.
    ///
    /// # Errors
    ///
    /// [`TreeSeqError::BadParam`] if either increment is zero.
    pub fn new(
        max_rows_increment: usize,
        max_ancestral_state_length_increment: usize,
    ) -> TreeSeqResult<Self> {
        if max_rows_increment == 0 || max_ancestral_state_length_increment == 0 {
            return Err(TreeSeqError::BadParam);
        }
        Ok(SiteTable {
            max_rows_increment,
            max_ancestral_state_length_increment,
            position: vec![],
            ancestral_state_length: vec![],
            ancestral_state: vec![],
        })
    }

    pub fn num_rows(&self) -> usize {
        self.position.len()
    }

    /// Append one row, returning the new row's id.
    pub fn add_row(&mut self, position: Position, ancestral_state: &[u8]) -> TreeSeqResult<SiteId> {
        reserve_rows(&mut self.position, self.max_rows_increment)?;
        reserve_rows(&mut self.ancestral_state_length, self.max_rows_increment)?;
        reserve_payload(
            &mut self.ancestral_state,
            ancestral_state.len(),
            self.max_ancestral_state_length_increment,
        )?;
        let state_length =
            u32::try_from(ancestral_state.len()).map_err(|_| TreeSeqError::OutOfBounds)?;
        self.position.push(position);
        self.ancestral_state_length.push(state_length);
        self.ancestral_state.extend_from_slice(ancestral_state);
        Ok((self.num_rows() - 1) as SiteId)
    }

    /// Replace the table contents from column slices.
    pub fn set_columns(
        &mut self,
        position: &[Position],
        ancestral_state: &[u8],
        ancestral_state_length: &[u32],
    ) -> TreeSeqResult<()> {
        let num_rows = position.len();
        if ancestral_state_length.len() != num_rows {
            return Err(TreeSeqError::BadParam);
        }
        let total: usize = ancestral_state_length.iter().map(|x| *x as usize).sum();
        if total != ancestral_state.len() {
            return Err(TreeSeqError::BadParam);
        }
        assign_column(&mut self.position, position)?;
        assign_column(&mut self.ancestral_state, ancestral_state)?;
        assign_column(&mut self.ancestral_state_length, ancestral_state_length)?;
        Ok(())
    }

    /// Compare logical contents.
    pub fn equal(&self, other: &SiteTable) -> bool {
        self.position == other.position
            && self.ancestral_state_length == other.ancestral_state_length
            && self.ancestral_state == other.ancestral_state
    }

    /// Logically clear the table, keeping capacity.
    pub fn reset(&mut self) {
        self.position.clear();
        self.ancestral_state_length.clear();
        self.ancestral_state.clear();
    }

    pub fn position(&self) -> &[Position] {
        &self.position
    }

    pub fn ancestral_state(&self) -> &[u8] {
        &self.ancestral_state
    }

    pub fn ancestral_state_length(&self) -> &[u32] {
        &self.ancestral_state_length
    }

    /// Write a tab-separated dump of the table.
    pub fn print_state<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "site_table:")?;
        writeln!(
            out,
            "num_rows = {}\tmax = {}\tincrement = {}",
            self.num_rows(),
            self.position.capacity(),
            self.max_rows_increment
        )?;
        writeln!(
            out,
            "total_ancestral_state_length = {}\tmax = {}\tincrement = {}",
            self.ancestral_state.len(),
            self.ancestral_state.capacity(),
            self.max_ancestral_state_length_increment
        )?;
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "index\tposition\tancestral_state_length\tancestral_state")?;
        let mut offset = 0;
        for j in 0..self.num_rows() {
            let len = self.ancestral_state_length[j] as usize;
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                j,
                self.position[j],
                len,
                String::from_utf8_lossy(&self.ancestral_state[offset..offset + len])
            )?;
            offset += len;
        }
        Ok(())
    }
}

/// The mutations of a tree sequence.
pub struct MutationTable {
    max_rows_increment: usize,
    max_derived_state_length_increment: usize,
    site: Vec<SiteId>,
    node: Vec<NodeId>,
    derived_state_length: Vec<u16>,
    derived_state: Vec<u8>,
}

impl MutationTable {
    /// Create a table growing by the given row and state-buffer
    /// increments.
    ///
    /// # Errors
    ///
    /// [`TreeSeqError::BadParam`] if either increment is zero.
    pub fn new(
        max_rows_increment: usize,
        max_derived_state_length_increment: usize,
    ) -> TreeSeqResult<Self> {
        if max_rows_increment == 0 || max_derived_state_length_increment == 0 {
            return Err(TreeSeqError::BadParam);
        }
        Ok(MutationTable {
            max_rows_increment,
            max_derived_state_length_increment,
            site: vec![],
            node: vec![],
            derived_state_length: vec![],
            derived_state: vec![],
        })
    }

    pub fn num_rows(&self) -> usize {
        self.site.len()
    }

    /// Append one row.
    pub fn add_row(
        &mut self,
        site: SiteId,
        node: NodeId,
        derived_state: &[u8],
    ) -> TreeSeqResult<()> {
        reserve_rows(&mut self.site, self.max_rows_increment)?;
        reserve_rows(&mut self.node, self.max_rows_increment)?;
        reserve_rows(&mut self.derived_state_length, self.max_rows_increment)?;
        reserve_payload(
            &mut self.derived_state,
            derived_state.len(),
            self.max_derived_state_length_increment,
        )?;
        let state_length =
            u16::try_from(derived_state.len()).map_err(|_| TreeSeqError::OutOfBounds)?;
        self.site.push(site);
        self.node.push(node);
        self.derived_state_length.push(state_length);
        self.derived_state.extend_from_slice(derived_state);
        Ok(())
    }

    /// Replace the table contents from column slices.
    pub fn set_columns(
        &mut self,
        site: &[SiteId],
        node: &[NodeId],
        derived_state: &[u8],
        derived_state_length: &[u16],
    ) -> TreeSeqResult<()> {
        let num_rows = site.len();
        if node.len() != num_rows || derived_state_length.len() != num_rows {
            return Err(TreeSeqError::BadParam);
        }
        let total: usize = derived_state_length.iter().map(|x| *x as usize).sum();
        if total != derived_state.len() {
            return Err(TreeSeqError::BadParam);
        }
        assign_column(&mut self.site, site)?;
        assign_column(&mut self.node, node)?;
        assign_column(&mut self.derived_state, derived_state)?;
        assign_column(&mut self.derived_state_length, derived_state_length)?;
        Ok(())
    }

    /// Compare logical contents.
    pub fn equal(&self, other: &MutationTable) -> bool {
        self.site == other.site
            && self.node == other.node
            && self.derived_state_length == other.derived_state_length
            && self.derived_state == other.derived_state
    }

    /// Logically clear the table, keeping capacity.
    pub fn reset(&mut self) {
        self.site.clear();
        self.node.clear();
        self.derived_state_length.clear();
        self.derived_state.clear();
    }

    pub fn site(&self) -> &[SiteId] {
        &self.site
    }

    pub fn node(&self) -> &[NodeId] {
        &self.node
    }

    pub fn derived_state(&self) -> &[u8] {
        &self.derived_state
    }

    pub fn derived_state_length(&self) -> &[u16] {
        &self.derived_state_length
    }

    /// Write a tab-separated dump of the table.
    pub fn print_state<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "mutation_table:")?;
        writeln!(
            out,
            "num_rows = {}\tmax = {}\tincrement = {}",
            self.num_rows(),
            self.site.capacity(),
            self.max_rows_increment
        )?;
        writeln!(
            out,
            "total_derived_state_length = {}\tmax = {}\tincrement = {}",
            self.derived_state.len(),
            self.derived_state.capacity(),
            self.max_derived_state_length_increment
        )?;
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "index\tsite\tnode\tderived_state_length\tderived_state")?;
        let mut offset = 0;
        for j in 0..self.num_rows() {
            let len = self.derived_state_length[j] as usize;
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                j,
                self.site[j],
                self.node[j],
                len,
                String::from_utf8_lossy(&self.derived_state[offset..offset + len])
            )?;
            offset += len;
        }
        Ok(())
    }
}

/// Migration records. These pass through simplification
/// untouched.
pub struct MigrationTable {
    max_rows_increment: usize,
    left: Vec<Position>,
    right: Vec<Position>,
    node: Vec<NodeId>,
    source: Vec<PopulationId>,
    dest: Vec<PopulationId>,
    time: Vec<Time>,
}

impl MigrationTable {
    /// Create a table growing by the given row increment.
    ///
    /// # Errors
    ///
    /// [`TreeSeqError::BadParam`] if the increment is zero.
    pub fn new(max_rows_increment: usize) -> TreeSeqResult<Self> {
        if max_rows_increment == 0 {
            return Err(TreeSeqError::BadParam);
        }
        Ok(MigrationTable {
            max_rows_increment,
            left: vec![],
            right: vec![],
            node: vec![],
            source: vec![],
            dest: vec![],
            time: vec![],
        })
    }

    pub fn num_rows(&self) -> usize {
        self.node.len()
    }

    /// Append one row.
    pub fn add_row(
        &mut self,
        left: Position,
        right: Position,
        node: NodeId,
        source: PopulationId,
        dest: PopulationId,
        time: Time,
    ) -> TreeSeqResult<()> {
        reserve_rows(&mut self.left, self.max_rows_increment)?;
        reserve_rows(&mut self.right, self.max_rows_increment)?;
        reserve_rows(&mut self.node, self.max_rows_increment)?;
        reserve_rows(&mut self.source, self.max_rows_increment)?;
        reserve_rows(&mut self.dest, self.max_rows_increment)?;
        reserve_rows(&mut self.time, self.max_rows_increment)?;
        self.left.push(left);
        self.right.push(right);
        self.node.push(node);
        self.source.push(source);
        self.dest.push(dest);
        self.time.push(time);
        Ok(())
    }

    /// Replace the table contents from column slices.
    pub fn set_columns(
        &mut self,
        left: &[Position],
        right: &[Position],
        node: &[NodeId],
        source: &[PopulationId],
        dest: &[PopulationId],
        time: &[Time],
    ) -> TreeSeqResult<()> {
        let num_rows = left.len();
        if right.len() != num_rows
            || node.len() != num_rows
            || source.len() != num_rows
            || dest.len() != num_rows
            || time.len() != num_rows
        {
            return Err(TreeSeqError::BadParam);
        }
        assign_column(&mut self.left, left)?;
        assign_column(&mut self.right, right)?;
        assign_column(&mut self.node, node)?;
        assign_column(&mut self.source, source)?;
        assign_column(&mut self.dest, dest)?;
        assign_column(&mut self.time, time)?;
        Ok(())
    }

    /// Logically clear the table, keeping capacity.
    pub fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.node.clear();
        self.source.clear();
        self.dest.clear();
        self.time.clear();
    }

    pub fn left(&self) -> &[Position] {
        &self.left
    }

    pub fn right(&self) -> &[Position] {
        &self.right
    }

    pub fn node(&self) -> &[NodeId] {
        &self.node
    }

    pub fn source(&self) -> &[PopulationId] {
        &self.source
    }

    pub fn dest(&self) -> &[PopulationId] {
        &self.dest
    }

    pub fn time(&self) -> &[Time] {
        &self.time
    }

    /// Write a tab-separated dump of the table.
    pub fn print_state<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "migration_table:")?;
        writeln!(
            out,
            "num_rows = {}\tmax = {}\tincrement = {}",
            self.num_rows(),
            self.node.capacity(),
            self.max_rows_increment
        )?;
        writeln!(out, "{}", TABLE_SEP)?;
        writeln!(out, "index\tleft\tright\tnode\tsource\tdest\ttime")?;
        for j in 0..self.num_rows() {
            writeln!(
                out,
                "{}\t{:.3}\t{:.3}\t{}\t{}\t{}\t{}",
                j, self.left[j], self.right[j], self.node[j], self.source[j], self.dest[j],
                self.time[j]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_tables {
    use super::*;
    use crate::tsdef::NULL_POPULATION;

    #[test]
    fn test_zero_increment() {
        let _ = NodeTable::new(0, 1)
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
        let _ = EdgesetTable::new(1, 0)
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
        let _ = SiteTable::new(0, 0)
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
        let _ = MutationTable::new(0, 1)
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
        let _ = MigrationTable::new(0)
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
    }

    #[test]
    fn test_node_table_add_row() {
        let mut nodes = NodeTable::new(1, 1).unwrap();
        let id = nodes.add_row(1, 0.5, 2, b"n0").unwrap();
        assert_eq!(id, 0);
        let id = nodes.add_row(0, 1.5, NULL_POPULATION, b"").unwrap();
        assert_eq!(id, 1);
        assert_eq!(nodes.num_rows(), 2);
        assert_eq!(nodes.flags(), &[1, 0]);
        assert_eq!(nodes.time(), &[0.5, 1.5]);
        assert_eq!(nodes.population(), &[2, NULL_POPULATION]);
        assert_eq!(nodes.name_length(), &[2, 0]);
        assert_eq!(nodes.name(), b"n0");
    }

    #[test]
    fn test_node_table_set_columns_defaults() {
        let mut nodes = NodeTable::new(1, 1).unwrap();
        nodes
            .set_columns(&[0, 1, 0], &[0.0, 0.0, 1.0], None, None)
            .unwrap();
        assert_eq!(nodes.num_rows(), 3);
        assert_eq!(nodes.population(), &[NULL_POPULATION; 3]);
        assert_eq!(nodes.name_length(), &[0, 0, 0]);
        assert!(nodes.name().is_empty());
    }

    #[test]
    fn test_node_table_set_columns_bad_input() {
        let mut nodes = NodeTable::new(1, 1).unwrap();
        let _ = nodes
            .set_columns(&[0, 1], &[0.0], None, None)
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
        let _ = nodes
            .set_columns(&[0], &[0.0], Some(&[0, 1]), None)
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
        // name lengths not summing to the payload length
        let _ = nodes
            .set_columns(&[0], &[0.0], None, Some((b"abc", &[2])))
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
    }

    #[test]
    fn test_node_table_round_trip() {
        let mut nodes = NodeTable::new(3, 7).unwrap();
        nodes.add_row(1, 0.0, 0, b"a").unwrap();
        nodes.add_row(1, 0.0, 1, b"bc").unwrap();
        nodes.add_row(0, 2.0, NULL_POPULATION, b"").unwrap();

        let mut copy = NodeTable::new(1, 1).unwrap();
        copy.set_columns(
            nodes.flags(),
            nodes.time(),
            Some(nodes.population()),
            Some((nodes.name(), nodes.name_length())),
        )
        .unwrap();
        assert_eq!(copy.flags(), nodes.flags());
        assert_eq!(copy.time(), nodes.time());
        assert_eq!(copy.population(), nodes.population());
        assert_eq!(copy.name(), nodes.name());
        assert_eq!(copy.name_length(), nodes.name_length());
    }

    #[test]
    fn test_edgeset_table_add_row() {
        let mut edgesets = EdgesetTable::new(1, 1).unwrap();
        edgesets.add_row(0.0, 1.0, 2, &[0, 1]).unwrap();
        edgesets.add_row(0.5, 1.0, 3, &[2]).unwrap();
        assert_eq!(edgesets.num_rows(), 2);
        assert_eq!(edgesets.total_children_length(), 3);
        let rows: Vec<_> = edgesets.iter_rows().collect();
        assert_eq!(rows[0], (0.0, 1.0, 2, &[0, 1][..]));
        assert_eq!(rows[1], (0.5, 1.0, 3, &[2][..]));
    }

    #[test]
    fn test_edgeset_table_bad_rows() {
        let mut edgesets = EdgesetTable::new(1, 1).unwrap();
        let _ = edgesets
            .add_row(0.0, 1.0, 2, &[])
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
        let _ = edgesets
            .add_row(1.0, 1.0, 2, &[0])
            .map_or_else(|x| assert_eq!(x, TreeSeqError::BadParam), |_| panic!());
    }

    #[test]
    fn test_edgeset_table_round_trip() {
        let mut edgesets = EdgesetTable::new(5, 5).unwrap();
        edgesets.add_row(0.0, 0.5, 4, &[0, 1, 2]).unwrap();
        edgesets.add_row(0.5, 1.0, 4, &[0, 3]).unwrap();

        let mut copy = EdgesetTable::new(1, 1).unwrap();
        copy.set_columns(
            edgesets.left(),
            edgesets.right(),
            edgesets.parent(),
            edgesets.children(),
            edgesets.children_length(),
        )
        .unwrap();
        assert_eq!(copy.left(), edgesets.left());
        assert_eq!(copy.right(), edgesets.right());
        assert_eq!(copy.parent(), edgesets.parent());
        assert_eq!(copy.children(), edgesets.children());
        assert_eq!(copy.children_length(), edgesets.children_length());
    }

    #[test]
    fn test_reset_keeps_nothing_logical() {
        let mut edgesets = EdgesetTable::new(1, 1).unwrap();
        edgesets.add_row(0.0, 1.0, 2, &[0, 1]).unwrap();
        edgesets.reset();
        assert_eq!(edgesets.num_rows(), 0);
        assert_eq!(edgesets.total_children_length(), 0);
        edgesets.add_row(0.0, 1.0, 5, &[3]).unwrap();
        assert_eq!(edgesets.parent(), &[5]);
    }

    #[test]
    fn test_site_table_equal() {
        let mut a = SiteTable::new(1, 1).unwrap();
        let mut b = SiteTable::new(8, 8).unwrap();
        a.add_row(0.5, b"A").unwrap();
        b.add_row(0.5, b"A").unwrap();
        assert!(a.equal(&b));
        b.add_row(0.75, b"T").unwrap();
        assert!(!a.equal(&b));
    }

    #[test]
    fn test_site_table_round_trip() {
        let mut sites = SiteTable::new(2, 2).unwrap();
        sites.add_row(0.1, b"AC").unwrap();
        sites.add_row(0.9, b"").unwrap();
        let mut copy = SiteTable::new(1, 1).unwrap();
        copy.set_columns(
            sites.position(),
            sites.ancestral_state(),
            sites.ancestral_state_length(),
        )
        .unwrap();
        assert!(copy.equal(&sites));
    }

    #[test]
    fn test_mutation_table_equal_and_round_trip() {
        let mut muts = MutationTable::new(2, 2).unwrap();
        muts.add_row(0, 5, b"T").unwrap();
        muts.add_row(1, 3, b"GG").unwrap();
        let mut copy = MutationTable::new(1, 1).unwrap();
        copy.set_columns(
            muts.site(),
            muts.node(),
            muts.derived_state(),
            muts.derived_state_length(),
        )
        .unwrap();
        assert!(copy.equal(&muts));
        copy.reset();
        assert!(!copy.equal(&muts));
        assert_eq!(copy.num_rows(), 0);
    }

    #[test]
    fn test_migration_table() {
        let mut migrations = MigrationTable::new(1).unwrap();
        migrations.add_row(0.0, 1.0, 3, 0, 1, 0.25).unwrap();
        assert_eq!(migrations.num_rows(), 1);
        let mut copy = MigrationTable::new(4).unwrap();
        copy.set_columns(
            migrations.left(),
            migrations.right(),
            migrations.node(),
            migrations.source(),
            migrations.dest(),
            migrations.time(),
        )
        .unwrap();
        assert_eq!(copy.node(), migrations.node());
        assert_eq!(copy.time(), migrations.time());
    }

    #[test]
    fn test_print_state_smoke() {
        let mut nodes = NodeTable::new(1, 1).unwrap();
        nodes.add_row(1, 0.0, 0, b"x").unwrap();
        let mut edgesets = EdgesetTable::new(1, 1).unwrap();
        edgesets.add_row(0.0, 1.0, 0, &[1, 2]).unwrap();
        let mut out = Vec::new();
        nodes.print_state(&mut out).unwrap();
        edgesets.print_state(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("node_table:"));
        assert!(text.contains("edgeset_table:"));
        assert!(text.contains("1,2"));
    }
}
