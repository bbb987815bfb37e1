use std::collections::HashMap;

use kdtree::KdTree;
use kdtree::distance::squared_euclidean;
use petgraph::{
    algo::astar,
    graph::{EdgeReference, NodeIndex, UnGraph},
    visit::EdgeRef,
};

use crate::geo::{haversine_m, path_distance_m};
use crate::models::{Coordinate, PathwayRequest, PathwayRoute};

/// Furthest a request endpoint may be from a pathway node.
const MAX_SNAP_DISTANCE_M: f64 = 500.0;

/// One walkway with its lighting, cover and safety ratings in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathwaySegment {
    pub from: Coordinate,
    pub to: Coordinate,
    pub lighting: f64,
    pub covered: f64,
    pub safety: f64,
}

const fn segment(
    from: (f64, f64),
    to: (f64, f64),
    lighting: f64,
    covered: f64,
    safety: f64,
) -> PathwaySegment {
    PathwaySegment {
        from: Coordinate::new(from.0, from.1),
        to: Coordinate::new(to.0, to.1),
        lighting,
        covered,
        safety,
    }
}

/// Simplified campus walkway network. The heuristic
/// [`RouteCalculator`](crate::routing::RouteCalculator) does not consult it.
pub const CAMPUS_PATHWAYS: [PathwaySegment; 12] = [
    // main pathways
    segment((12.9915936, 80.2336832), (12.992, 80.234), 0.9, 0.2, 0.95),
    segment((12.992, 80.234), (12.9925, 80.2335), 0.85, 0.1, 0.92),
    segment((12.9925, 80.2335), (12.991, 80.235), 0.8, 0.3, 0.88),
    segment((12.991, 80.235), (12.9905, 80.2345), 0.9, 0.4, 0.91),
    segment((12.9905, 80.2345), (12.993, 80.233), 0.75, 0.2, 0.87),
    // hostel area
    segment((12.99, 80.232), (12.9895, 80.2315), 0.7, 0.1, 0.85),
    segment((12.9895, 80.2315), (12.989, 80.231), 0.75, 0.15, 0.84),
    segment((12.989, 80.231), (12.9885, 80.2305), 0.8, 0.2, 0.86),
    // sports area
    segment((12.985, 80.239), (12.9845, 80.2395), 0.85, 0.1, 0.89),
    segment((12.9845, 80.2395), (12.984, 80.24), 0.8, 0.05, 0.87),
    // main building to facilities
    segment((12.9915936, 80.2336832), (12.991, 80.233), 0.95, 0.6, 0.94),
    segment((12.991, 80.233), (12.9905, 80.2345), 0.9, 0.5, 0.93),
];

/// Routing over a walkway graph.
///
/// Implementations return `None` when an endpoint cannot be matched to the
/// network or when no connected path exists.
pub trait PathFinder: Send + Sync {
    fn find_path(&self, req: &PathwayRequest) -> Option<PathwayRoute>;
}

#[derive(Debug, thiserror::Error)]
pub enum PathwayError {
    #[error("pathway network has no segments")]
    EmptyNetwork,
}

#[derive(Clone, Copy, Debug)]
struct EdgeData {
    length_m: f64,
    lighting: f64,
    covered: f64,
    safety: f64,
}

#[derive(Clone)]
pub struct PathwayNetwork {
    graph: UnGraph<Coordinate, EdgeData>,
    spatial_index: KdTree<f64, usize, [f64; 2]>,
}

impl PathFinder for PathwayNetwork {
    fn find_path(&self, req: &PathwayRequest) -> Option<PathwayRoute> {
        PathwayNetwork::find_path(self, req)
    }
}

impl PathwayNetwork {
    pub fn campus() -> Self {
        // the built-in table is never empty
        match Self::from_segments(&CAMPUS_PATHWAYS) {
            Ok(network) => network,
            Err(err) => unreachable!("campus pathways: {err}"),
        }
    }

    pub fn from_segments(segments: &[PathwaySegment]) -> Result<Self, PathwayError> {
        if segments.is_empty() {
            return Err(PathwayError::EmptyNetwork);
        }

        let mut graph = UnGraph::new_undirected();
        let mut node_ids: HashMap<(u64, u64), NodeIndex> = HashMap::new();
        let mut node_for = |graph: &mut UnGraph<Coordinate, EdgeData>, coord: Coordinate| {
            *node_ids
                .entry((coord.lat.to_bits(), coord.lng.to_bits()))
                .or_insert_with(|| graph.add_node(coord))
        };

        for segment in segments {
            let from = node_for(&mut graph, segment.from);
            let to = node_for(&mut graph, segment.to);
            graph.update_edge(
                from,
                to,
                EdgeData {
                    length_m: haversine_m(segment.from, segment.to),
                    lighting: segment.lighting,
                    covered: segment.covered,
                    safety: segment.safety,
                },
            );
        }

        let mut spatial_index = KdTree::new(2);
        for idx in graph.node_indices() {
            let coord = graph[idx];
            let _ = spatial_index.add([coord.lng, coord.lat], idx.index());
        }

        tracing::debug!(
            "pathway network: {} nodes, {} segments",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(Self {
            graph,
            spatial_index,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// A* over the walkway graph.
    ///
    /// Edge cost is `length × (1 + w_lighting × (1 − lighting) + w_covered × (1 − covered))`,
    /// so with non-negative weights the straight-line distance stays an
    /// admissible heuristic.
    pub fn find_path(&self, req: &PathwayRequest) -> Option<PathwayRoute> {
        let start = self.closest_node(req.from)?;
        let end = self.closest_node(req.to)?;
        let target = self.graph[end];
        let w_lighting = req.w_lighting.max(0.0);
        let w_covered = req.w_covered.max(0.0);

        let edge_cost = |edge: EdgeReference<EdgeData>| {
            let data = edge.weight();
            data.length_m
                * (1.0 + w_lighting * (1.0 - data.lighting) + w_covered * (1.0 - data.covered))
        };

        let (_cost, nodes) = astar(
            &self.graph,
            start,
            |finish| finish == end,
            edge_cost,
            |idx| haversine_m(self.graph[idx], target),
        )?;

        let points: Vec<Coordinate> = nodes.iter().map(|&idx| self.graph[idx]).collect();
        let edges: Vec<EdgeData> = nodes
            .windows(2)
            .filter_map(|pair| self.graph.find_edge(pair[0], pair[1]))
            .map(|edge| self.graph[edge])
            .collect();

        let mean = |value: fn(&EdgeData) -> f64| {
            if edges.is_empty() {
                0.0
            } else {
                edges.iter().map(value).sum::<f64>() / edges.len() as f64
            }
        };

        tracing::debug!(
            "pathway route with {} nodes from {:?} to {:?}",
            points.len(),
            req.from,
            req.to
        );

        Some(PathwayRoute {
            distance_m: path_distance_m(&points),
            mean_lighting: mean(|e| e.lighting),
            mean_covered: mean(|e| e.covered),
            mean_safety: mean(|e| e.safety),
            points,
        })
    }

    /// Nearest node within snapping distance, via the KD-tree.
    pub fn closest_node(&self, target: Coordinate) -> Option<NodeIndex> {
        let nearest = self
            .spatial_index
            .nearest(&[target.lng, target.lat], 1, &squared_euclidean)
            .ok()?;
        let (_, &idx) = nearest.first()?;
        let node = NodeIndex::new(idx);
        (haversine_m(self.graph[node], target) <= MAX_SNAP_DISTANCE_M).then_some(node)
    }
}
