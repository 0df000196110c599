use connectome_exemplar::connectome::{DegenerateReason, ExemplarOperation};
use connectome_exemplar::parse::{read_header, resolve_data_file};
use connectome_exemplar::{
    Exemplar, ExemplarBank, ExemplarError, ExemplarOptions, InputStreamline, NodePair, Point3,
    Tolerance,
};
use pretty_assertions::assert_eq;

fn line(xs: &[f64]) -> Vec<Point3> {
    xs.iter().map(|&x| Point3::new(x, 0.0, 0.0)).collect()
}

/// A bundle of arcs bowing out in +y between two centroids on the x axis.
fn arc(offset: f64, samples: usize) -> Vec<Point3> {
    (0..samples)
        .map(|i| {
            let t = i as f64 / (samples - 1) as f64;
            let angle = std::f64::consts::PI * t;
            Point3::new(-30.0 * angle.cos(), 10.0 * angle.sin() + offset, offset)
        })
        .collect()
}

#[test]
fn four_slot_edge_produces_expected_curve() {
    let nodes = NodePair::new(1, 2);
    let coms = (Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
    let exemplar = Exemplar::new(nodes, coms, 4).unwrap();
    exemplar
        .add(&InputStreamline::new(line(&[0.0, 2.0, 5.0, 8.0, 10.0]), 1.0, nodes).unwrap())
        .unwrap();

    let diagnostics = exemplar.finalize(2.5).unwrap();
    assert_eq!(
        exemplar.points(),
        line(&[0.0, 2.4921875, 5.0, 7.5390625, 10.0])
    );
    assert_eq!(diagnostics.nodes, nodes);
    assert_eq!(diagnostics.weight, 1.0);
    assert_eq!(diagnostics.slot_count, 4);
    assert_eq!(diagnostics.bisection_count, 2);
}

#[test]
fn empty_and_self_edges_fall_back_to_centroid_segment() {
    let a = Point3::new(1.0, 2.0, 3.0);
    let b = Point3::new(4.0, 6.0, 3.0);

    let empty = Exemplar::new(NodePair::new(0, 5), (a, b), 32).unwrap();
    let diag = empty.finalize(1.0).unwrap();
    assert_eq!(empty.points(), vec![a, b]);
    assert_eq!(diag.degenerate, Some(DegenerateReason::NoWeight));
    assert_eq!(diag.output_length, 5.0);

    let diagonal = Exemplar::new(NodePair::new(5, 5), (b, b), 32).unwrap();
    diagonal
        .add(&InputStreamline::new(arc(0.0, 20), 1.0, NodePair::new(5, 5)).unwrap())
        .unwrap();
    diagonal.finalize(1.0).unwrap();
    assert_eq!(diagonal.points(), vec![b, b]);
}

#[test]
fn finalize_happens_once() {
    let nodes = NodePair::new(4, 9);
    let exemplar = Exemplar::new(nodes, (Point3::ORIGIN, Point3::new(0.0, 0.0, 9.0)), 8).unwrap();
    exemplar.finalize(1.0).unwrap();
    assert!(exemplar.is_finalized());
    assert_eq!(
        exemplar.finalize(1.0),
        Err(ExemplarError::InvalidState {
            nodes,
            operation: ExemplarOperation::Finalize,
        })
    );
}

#[test]
fn bundle_exemplar_follows_the_bundle() {
    let nodes = NodePair::new(1, 2);
    let coms = (Point3::new(-30.0, 0.0, 0.0), Point3::new(30.0, 0.0, 0.0));
    let options = ExemplarOptions::new(40).with_converge_fraction(0.1);
    let exemplar = Exemplar::with_options(nodes, coms, options).unwrap();

    for (k, offset) in [-1.0, -0.5, 0.0, 0.5, 1.0].into_iter().enumerate() {
        let points = arc(offset, 30 + 7 * k);
        let streamline = InputStreamline::new(points, 1.0, nodes).unwrap();
        // Alternate orientations as tracking would.
        let streamline = if k % 2 == 0 {
            streamline
        } else {
            streamline.reversed()
        };
        exemplar.add(&streamline).unwrap();
    }

    let diag = exemplar.finalize(2.0).unwrap();
    let curve = exemplar.curve().unwrap();
    assert_eq!(curve.weight(), 5.0);
    assert_eq!(curve.points().first().copied(), Some(coms.0));
    assert_eq!(curve.points().last().copied(), Some(coms.1));
    assert_eq!(diag.output_point_count, curve.len());

    // Apex of the mean arc sits near y = 10, z = 0.
    let apex = curve
        .points()
        .iter()
        .copied()
        .fold(Point3::ORIGIN, |best, p| if p.y > best.y { p } else { best });
    assert!((apex.y - 10.0).abs() < 0.5, "apex {apex:?}");
    assert!(apex.z.abs() < 1e-6);

    // Interior spacing equals the step up to the bisection error.
    let points = curve.points();
    for pair in points[1..points.len() - 1].windows(2) {
        let spacing = pair[0].distance_to(pair[1]);
        assert!((spacing - 2.0).abs() < 0.2, "spacing {spacing}");
    }
}

#[test]
fn concurrent_adds_match_sequential_accumulation() {
    let nodes = NodePair::new(10, 20);
    let coms = (Point3::new(-30.0, 0.0, 0.0), Point3::new(30.0, 0.0, 0.0));
    let streamlines: Vec<InputStreamline> = (0..64)
        .map(|i| {
            let offset = f64::from(i % 9) * 0.25 - 1.0;
            let streamline =
                InputStreamline::new(arc(offset, 12 + i as usize % 5), 0.5 + f64::from(i % 3), nodes)
                    .unwrap();
            if i % 2 == 0 {
                streamline
            } else {
                streamline.reversed()
            }
        })
        .collect();

    let sequential = Exemplar::new(nodes, coms, 24).unwrap();
    for streamline in &streamlines {
        sequential.add(streamline).unwrap();
    }

    let shared = Exemplar::new(nodes, coms, 24).unwrap();
    std::thread::scope(|scope| {
        for chunk in streamlines.chunks(8) {
            let shared = &shared;
            scope.spawn(move || {
                for streamline in chunk {
                    shared.add(streamline).unwrap();
                }
            });
        }
    });

    let tol = Tolerance::LOOSE;
    assert!(tol.approx_eq_f64(shared.weight(), sequential.weight()));
    for (a, b) in shared.points().iter().zip(sequential.points()) {
        assert!(tol.approx_eq_point3(*a, b), "{a:?} vs {b:?}");
    }
}

#[test]
fn bank_from_parcellation_header() {
    let header_text = "mrtrix image
dim: 10,10,10
vox: 2,2,2
layout: +0,+1,+2
datatype: UInt16LE
transform: 1,0,0,-10
transform: 0,1,0,-10
transform: 0,0,1,-10
file: nodes.dat
END
";
    let mut header = read_header("/atlas/nodes.mih", header_text).unwrap();
    let data = resolve_data_file(&mut header, "file").unwrap();
    assert_eq!(data.path, std::path::PathBuf::from("/atlas/nodes.dat"));

    let centroids: Vec<Point3> = [[1.0, 5.0, 5.0], [8.0, 5.0, 5.0], [5.0, 8.0, 5.0]]
        .into_iter()
        .map(|voxel| header.voxel_to_scanner(voxel))
        .collect();
    assert_eq!(centroids[0], Point3::new(-8.0, 0.0, 0.0));

    let bank = ExemplarBank::from_centroids(&centroids, ExemplarOptions::new(16)).unwrap();
    assert_eq!(bank.len(), 6);

    let track = |from: Point3, to: Point3| -> Vec<Point3> {
        (0..=20).map(|i| from.lerp(to, f64::from(i) / 20.0)).collect()
    };
    let forward = InputStreamline::new(track(centroids[0], centroids[1]), 1.0, NodePair::new(0, 1)).unwrap();
    bank.add(&forward).unwrap();
    bank.add(&forward.reversed()).unwrap();
    let across =
        InputStreamline::new(track(centroids[2], centroids[1]), 2.0, NodePair::new(2, 1)).unwrap();
    bank.add(&across).unwrap();
    assert!(matches!(
        bank.add(&InputStreamline::new(track(centroids[0], centroids[1]), 1.0, NodePair::new(0, 3)).unwrap()),
        Err(ExemplarError::UnknownEdge(_))
    ));
    assert_eq!(bank.total_weight(), 4.0);

    let diagnostics = bank.finalize_all(1.0).unwrap();
    let pairs: Vec<NodePair> = diagnostics.iter().map(|diag| diag.nodes).collect();
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
    let degenerate = diagnostics
        .iter()
        .filter(|diag| diag.degenerate.is_some())
        .count();
    assert_eq!(degenerate, 4);

    let edge = bank.get(NodePair::new(1, 0)).unwrap().curve().unwrap();
    assert_eq!(edge.points().first().copied(), Some(centroids[0]));
    assert_eq!(edge.points().last().copied(), Some(centroids[1]));
    assert!(edge.points().iter().all(|p| p.y.abs() < 1e-9 && p.z.abs() < 1e-9));
}
