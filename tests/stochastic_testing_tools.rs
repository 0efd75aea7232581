use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use treeseq_tables::*;

pub struct Ancestry {
    pub nodes: NodeTable,
    pub edgesets: EdgesetTable,
    pub samples: Vec<NodeId>,
    pub sequence_length: Position,
}

struct Transmission {
    left: Position,
    right: Position,
    child: NodeId,
}

/// Generate a random discrete-generation breeding structure.
///
/// Each individual in a generation inherits its genome from one
/// parent, or from two parents split at a random breakpoint.
/// Per-parent transmissions are converted to edgeset rows over
/// the atomic intervals between breakpoints. Rows are appended
/// in no particular order, so the result needs
/// [`sort_tables`] before simplification. The final generation
/// carries the sample flag.
pub fn breeding_ancestry(
    seed: u64,
    num_generations: usize,
    popsize: usize,
    sequence_length: Position,
) -> Ancestry {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut nodes = NodeTable::new(256, 64).unwrap();
    let mut edgesets = EdgesetTable::new(256, 512).unwrap();

    // Generation 0 is the oldest; the node id of individual i
    // in generation g is g * popsize + i.
    for g in 0..=num_generations {
        let time = (num_generations - g) as Time;
        let flags = if g == num_generations {
            NodeFlags::IS_SAMPLE.bits()
        } else {
            0
        };
        for _ in 0..popsize {
            nodes.add_row(flags, time, 0, b"").unwrap();
        }
    }

    for g in 1..=num_generations {
        let mut transmissions: Vec<Vec<Transmission>> = (0..popsize).map(|_| vec![]).collect();
        for i in 0..popsize {
            let child = (g * popsize + i) as NodeId;
            let p1 = rng.gen_range(0..popsize);
            let p2 = rng.gen_range(0..popsize);
            if p1 == p2 || rng.gen_bool(0.5) {
                transmissions[p1].push(Transmission {
                    left: 0.0,
                    right: sequence_length,
                    child,
                });
            } else {
                let x = rng.gen_range(0.1..0.9) * sequence_length;
                transmissions[p1].push(Transmission {
                    left: 0.0,
                    right: x,
                    child,
                });
                transmissions[p2].push(Transmission {
                    left: x,
                    right: sequence_length,
                    child,
                });
            }
        }
        for (i, parent_transmissions) in transmissions.iter().enumerate() {
            if parent_transmissions.is_empty() {
                continue;
            }
            let parent = ((g - 1) * popsize + i) as NodeId;
            let mut breaks: Vec<Position> = vec![];
            for t in parent_transmissions {
                breaks.push(t.left);
                breaks.push(t.right);
            }
            breaks.sort_by(|a, b| a.total_cmp(b));
            breaks.dedup();
            for window in breaks.windows(2) {
                let (left, right) = (window[0], window[1]);
                let mut children: Vec<NodeId> = parent_transmissions
                    .iter()
                    .filter(|t| t.left < right && left < t.right)
                    .map(|t| t.child)
                    .collect();
                if children.is_empty() {
                    continue;
                }
                children.sort_unstable();
                edgesets.add_row(left, right, parent, &children).unwrap();
            }
        }
    }

    let samples: Vec<NodeId> = (0..popsize)
        .map(|i| (num_generations * popsize + i) as NodeId)
        .collect();
    Ancestry {
        nodes,
        edgesets,
        samples,
        sequence_length,
    }
}
