use bitflags::bitflags;

/// Integer type used to refer to rows of a node table.
/// Negative values are sentinels.
pub type NodeId = i32;
/// Integer type used to refer to rows of a site table.
pub type SiteId = i32;
/// Integer type used to refer to populations.
pub type PopulationId = i32;
/// A coordinate along a genome.
pub type Position = f64;
/// A node birth time.
pub type Time = f64;

/// Equals -1 (minus one).
/// Primary use is to indicate a null [`NodeId`].
pub const NULL_ID: NodeId = -1;

/// All bits set. Marks a node as belonging to no population.
pub const NULL_POPULATION: PopulationId = -1;

bitflags! {
    /// Per-node boolean flags stored in the `flags` column
    /// of a [`NodeTable`](crate::NodeTable).
    #[derive(Default)]
    pub struct NodeFlags: u32 {
        /// The node is a sample.
        const IS_SAMPLE = 1 << 0;
    }
}

bitflags! {
    /// Boolean flags affecting simplification behavior.
    ///
    /// Currently, this is unused, and exists
    /// as a placeholder for the future.
    #[derive(Default)]
    pub struct SimplificationFlags: u32 {
        const NONE = 0;
    }
}
