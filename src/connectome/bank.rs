//! A connectome-wide collection of exemplars keyed by edge.

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::exemplar::{Exemplar, FinalizeDiagnostics};
use super::node::NodePair;
use super::options::ExemplarOptions;
use super::streamline::InputStreamline;
use super::ExemplarError;
use crate::geom::Point3;

/// Exemplars of every edge in a connectome.
///
/// Edges are stored under their canonical pair, so lookups and streamline
/// routing work in either orientation. Each exemplar keeps the orientation it
/// was registered with.
#[derive(Debug)]
pub struct ExemplarBank {
    options: ExemplarOptions,
    exemplars: BTreeMap<NodePair, Exemplar>,
}

impl ExemplarBank {
    /// An empty bank whose exemplars all use `options`.
    ///
    /// # Errors
    /// Any error from [`ExemplarOptions::validate`].
    pub fn new(options: ExemplarOptions) -> Result<Self, ExemplarError> {
        options.validate()?;
        Ok(Self {
            options,
            exemplars: BTreeMap::new(),
        })
    }

    /// A bank with one exemplar for every node pair `(i, j)` with `i <= j`,
    /// self-connections included, where node `i` has centroid `centroids[i]`.
    ///
    /// # Errors
    /// Any error from [`ExemplarOptions::validate`].
    pub fn from_centroids(
        centroids: &[Point3],
        options: ExemplarOptions,
    ) -> Result<Self, ExemplarError> {
        let mut bank = Self::new(options)?;
        for (i, &first_com) in (0_u32..).zip(centroids) {
            for (j, &second_com) in (i..).zip(&centroids[i as usize..]) {
                bank.insert_edge(NodePair::new(i, j), (first_com, second_com))?;
            }
        }
        log::debug!(
            "exemplar bank: {} nodes, {} edges, resolution {}",
            centroids.len(),
            bank.len(),
            options.resolution
        );
        Ok(bank)
    }

    #[must_use]
    pub const fn options(&self) -> &ExemplarOptions {
        &self.options
    }

    /// Registers the exemplar for `nodes`, whose centroids are `node_coms`.
    ///
    /// # Errors
    /// [`ExemplarError::DuplicateEdge`] if the edge exists in either orientation.
    pub fn insert_edge(
        &mut self,
        nodes: NodePair,
        node_coms: (Point3, Point3),
    ) -> Result<(), ExemplarError> {
        let key = nodes.canonical();
        if self.exemplars.contains_key(&key) {
            return Err(ExemplarError::DuplicateEdge(nodes));
        }
        let exemplar = Exemplar::with_options(nodes, node_coms, self.options)?;
        self.exemplars.insert(key, exemplar);
        Ok(())
    }

    /// The exemplar of `nodes`, in either orientation.
    #[must_use]
    pub fn get(&self, nodes: NodePair) -> Option<&Exemplar> {
        self.exemplars.get(&nodes.canonical())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exemplars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }

    /// Exemplars ordered by canonical pair.
    pub fn iter(&self) -> impl Iterator<Item = &Exemplar> {
        self.exemplars.values()
    }

    /// Sum of the weights accumulated by every exemplar.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.exemplars.values().map(Exemplar::weight).sum()
    }

    /// Routes `streamline` to the exemplar of its edge.
    ///
    /// # Errors
    /// [`ExemplarError::UnknownEdge`] when the edge is not registered, plus any
    /// error from [`Exemplar::add`].
    pub fn add(&self, streamline: &InputStreamline) -> Result<(), ExemplarError> {
        let nodes = streamline.nodes();
        self.get(nodes)
            .ok_or(ExemplarError::UnknownEdge(nodes))?
            .add(streamline)
    }

    /// Finalizes every exemplar with the same step size.
    ///
    /// Diagnostics come back ordered by canonical pair. On error the first
    /// failure is returned; exemplars finalized before it stay finalized.
    ///
    /// # Errors
    /// Any error from [`Exemplar::finalize`].
    pub fn finalize_all(&self, step_size: f64) -> Result<Vec<FinalizeDiagnostics>, ExemplarError> {
        let exemplars: Vec<&Exemplar> = self.exemplars.values().collect();
        let diagnostics = finalize_each(&exemplars, step_size)?;
        let degenerate = diagnostics
            .iter()
            .filter(|diag| diag.degenerate.is_some())
            .count();
        log::info!(
            "finalized {} exemplars ({} degenerate) with step {}",
            diagnostics.len(),
            degenerate,
            step_size
        );
        Ok(diagnostics)
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallel")] {
        fn finalize_each(
            exemplars: &[&Exemplar],
            step_size: f64,
        ) -> Result<Vec<FinalizeDiagnostics>, ExemplarError> {
            exemplars
                .par_iter()
                .map(|exemplar| exemplar.finalize(step_size))
                .collect()
        }
    } else {
        fn finalize_each(
            exemplars: &[&Exemplar],
            step_size: f64,
        ) -> Result<Vec<FinalizeDiagnostics>, ExemplarError> {
            exemplars
                .iter()
                .map(|exemplar| exemplar.finalize(step_size))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centroids() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ]
    }

    #[test]
    fn from_centroids_registers_upper_triangle() {
        let bank = ExemplarBank::from_centroids(&centroids(), ExemplarOptions::new(8)).unwrap();
        assert_eq!(bank.len(), 6);
        let pairs: Vec<NodePair> = bank.iter().map(Exemplar::nodes).collect();
        assert_eq!(
            pairs,
            vec![
                NodePair::new(0, 0),
                NodePair::new(0, 1),
                NodePair::new(0, 2),
                NodePair::new(1, 1),
                NodePair::new(1, 2),
                NodePair::new(2, 2),
            ]
        );
        let edge = bank.get(NodePair::new(2, 1)).unwrap();
        assert_eq!(edge.nodes(), NodePair::new(1, 2));
        assert_eq!(
            edge.node_coms(),
            (Point3::new(10.0, 0.0, 0.0), Point3::new(0.0, 10.0, 0.0))
        );
    }

    #[test]
    fn insert_rejects_either_orientation_twice() {
        let mut bank = ExemplarBank::new(ExemplarOptions::new(4)).unwrap();
        let coms = (Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0));
        bank.insert_edge(NodePair::new(3, 1), coms).unwrap();
        assert_eq!(
            bank.insert_edge(NodePair::new(1, 3), coms),
            Err(ExemplarError::DuplicateEdge(NodePair::new(1, 3)))
        );
        assert_eq!(bank.get(NodePair::new(1, 3)).unwrap().nodes(), NodePair::new(3, 1));
    }

    #[test]
    fn add_routes_by_edge() {
        let bank = ExemplarBank::from_centroids(&centroids(), ExemplarOptions::new(4)).unwrap();
        let streamline = InputStreamline::new(
            vec![Point3::new(10.0, 0.0, 0.0), Point3::ORIGIN],
            2.0,
            NodePair::new(1, 0),
        )
        .unwrap();
        bank.add(&streamline).unwrap();
        assert_eq!(bank.get(NodePair::new(0, 1)).unwrap().weight(), 2.0);
        assert_eq!(bank.total_weight(), 2.0);

        let stray = InputStreamline::new(
            vec![Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0)],
            1.0,
            NodePair::new(0, 7),
        )
        .unwrap();
        assert_eq!(
            bank.add(&stray),
            Err(ExemplarError::UnknownEdge(NodePair::new(0, 7)))
        );
    }

    #[test]
    fn finalize_all_reports_every_edge_in_order() {
        let bank = ExemplarBank::from_centroids(&centroids(), ExemplarOptions::new(4)).unwrap();
        let diagnostics = bank.finalize_all(1.0).unwrap();
        assert_eq!(diagnostics.len(), 6);
        assert!(diagnostics.windows(2).all(|pair| pair[0].nodes < pair[1].nodes));
        assert!(diagnostics.iter().all(|diag| diag.degenerate.is_some()));
        assert!(bank.iter().all(Exemplar::is_finalized));
        assert!(matches!(
            bank.finalize_all(1.0),
            Err(ExemplarError::InvalidState { .. })
        ));
    }

    #[test]
    fn invalid_options_are_rejected() {
        assert_eq!(
            ExemplarBank::new(ExemplarOptions::new(0)).unwrap_err(),
            ExemplarError::InvalidResolution(0)
        );
    }
}
