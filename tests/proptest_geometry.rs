//! Property tests for edge outlines.
//!
//! 1. Undirected outlines are mirror images of themselves across the edge.
//! 2. Undirected outlines contain the edge midpoint and reach both ends.
//! 3. Directed tips stop exactly one node radius short of the target.
//! 4. Lanes of a bundle never overlap.
//! 5. Coincident endpoints are rejected.

use proptest::prelude::*;
use topology_canvas::components::network_map::geometry::{EdgeShape, GeometryError, Gizmo, Vec2, arrow_path};

const TOLERANCE: f64 = 1e-6;

fn point() -> impl Strategy<Value = Vec2> {
	(-1_000.0f64..1_000.0, -1_000.0f64..1_000.0).prop_map(|(x, y)| Vec2::new(x, y))
}

/// Endpoints at least `min` apart.
fn edge(min: f64) -> impl Strategy<Value = (Vec2, Vec2)> {
	(point(), min..800.0f64, 0.0f64..std::f64::consts::TAU).prop_map(|(from, length, angle)| {
		(from, from + Vec2::new(length * angle.cos(), length * angle.sin()))
	})
}

fn gizmo() -> impl Strategy<Value = Gizmo> {
	prop_oneof![Just(Gizmo::None), Just(Gizmo::Circle), Just(Gizmo::Diamond)]
}

fn reflect(point: Vec2, from: Vec2, to: Vec2) -> Vec2 {
	let axis = (to - from) * (1.0 / from.distance(to));
	let along = (point - from).dot(axis);
	let foot = from + axis * along;
	foot * 2.0 - point
}

proptest! {
	#[test]
	fn undirected_outline_is_symmetric(
		(from, to) in edge(1.0),
		half_width in 0.5f64..4.0,
		gizmo in gizmo(),
	) {
		let shape = EdgeShape { half_width, gizmo, ..EdgeShape::default() };
		let path = arrow_path(from, to, &shape).unwrap();
		let scale = 1.0 + from.length().max(to.length());
		for p in &path.points {
			let mirrored = reflect(*p, from, to);
			prop_assert!(
				path.points.iter().any(|q| q.distance(mirrored) < TOLERANCE * scale),
				"no mirror image for {p:?}"
			);
		}
	}

	#[test]
	fn undirected_outline_spans_the_edge(
		(from, to) in edge(1.0),
		half_width in 0.5f64..4.0,
	) {
		let shape = EdgeShape { half_width, ..EdgeShape::default() };
		let path = arrow_path(from, to, &shape).unwrap();
		prop_assert!(path.contains(from.lerp(to, 0.5)));
		let forward = (to - from).normalized().unwrap();
		let reach = path.points.iter().map(|p| (*p - from).dot(forward));
		let (low, high) = reach.fold((f64::MAX, f64::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)));
		prop_assert!(low <= TOLERANCE);
		prop_assert!(high >= from.distance(to) - TOLERANCE * (1.0 + from.distance(to)));
	}

	#[test]
	fn directed_tip_stops_before_target(
		(from, to) in edge(100.0),
		node_radius in 1.0f64..40.0,
		half_width in 0.5f64..4.0,
	) {
		let shape = EdgeShape { half_width, node_radius, directed: true, ..EdgeShape::default() };
		let path = arrow_path(from, to, &shape).unwrap();
		let tip = path.tip.unwrap();
		let scale = 1.0 + from.length().max(to.length());
		prop_assert!(tip.distance(to) >= node_radius - TOLERANCE * scale);
		prop_assert!(tip.distance(from) < from.distance(to));
		prop_assert!(path.points.iter().all(|p| (*p - from).dot((to - from).normalized().unwrap()) <= from.distance(to) - node_radius + TOLERANCE * scale));
	}

	#[test]
	fn bundle_lanes_do_not_overlap(
		(from, to) in edge(120.0),
		size in 2usize..5,
	) {
		let spacing = 14.0;
		let paths: Vec<_> = (0..size)
			.map(|slot| {
				let shape = EdgeShape {
					gizmo: Gizmo::for_slot(slot),
					lane_offset: (slot as f64 - (size as f64 - 1.0) / 2.0) * spacing,
					..EdgeShape::default()
				};
				arrow_path(from, to, &shape).unwrap()
			})
			.collect();
		for (i, a) in paths.iter().enumerate() {
			for b in paths.iter().skip(i + 1) {
				prop_assert!(a.points.iter().all(|p| !b.contains(*p)));
			}
		}
	}

	#[test]
	fn coincident_endpoints_are_rejected(at in point(), directed in any::<bool>(), gizmo in gizmo()) {
		let shape = EdgeShape { directed, gizmo, node_radius: 21.0, ..EdgeShape::default() };
		prop_assert_eq!(arrow_path(at, at, &shape), Err(GeometryError::DegenerateEdge));
	}
}
