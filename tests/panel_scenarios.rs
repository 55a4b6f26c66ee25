//! End-to-end behavior of one map panel, driven without a browser.

use pretty_assertions::assert_eq;
use topology_canvas::components::network_map::config::MapConfig;
use topology_canvas::components::network_map::geometry::Vec2;
use topology_canvas::components::network_map::interaction::PointerButton;
use topology_canvas::components::network_map::simulation::ForceParams;
use topology_canvas::components::network_map::sync::FetchTicket;
use topology_canvas::components::network_map::types::{GraphPayload, NodeId};
use topology_canvas::components::network_map::{MapEvent, MapPanel, MapStatus};

const PANEL: &str = "deviceDetailNav:network_map";

const STAR: &str = r#"{
	"nodes": [
		{"name": "core", "path": "/zport/dmd/Devices/core", "highlight": true},
		{"name": "edge1", "path": "/zport/dmd/Devices/edge1"},
		{"name": "edge2", "path": "/zport/dmd/Devices/edge2"}
	],
	"links": [
		{"source": 0, "target": 1, "layers": ["layer2"]},
		{"source": 0, "target": 2, "layers": ["layer3"]}
	]
}"#;

const BUNDLE: &str = r#"{
	"nodes": [
		{"name": "a", "path": "/zport/dmd/Devices/a"},
		{"name": "b", "path": "/zport/dmd/Devices/b"}
	],
	"links": [
		{"source": 0, "target": 1, "layers": ["layer2"]},
		{"source": 0, "target": 1, "layers": ["vlan10"]}
	]
}"#;

fn payload(json: &str) -> GraphPayload {
	serde_json::from_str(json).unwrap()
}

fn panel() -> MapPanel {
	MapPanel::new(MapConfig::default())
}

/// Runs frames until nothing moves, starting at `start_ms`.
fn settle(panel: &mut MapPanel, start_ms: f64) {
	let mut now = start_ms;
	while panel.frame(now) {
		now += 16.0;
		assert!(now - start_ms < 200_000.0, "simulation never settled");
	}
}

fn due(panel: &mut MapPanel, now_ms: f64) -> FetchTicket {
	panel.poll_fetch(now_ms).expect("a fetch should be due")
}

fn show(json: &str) -> MapPanel {
	let mut panel = panel();
	panel.re_root("/zport/dmd/Devices/core", 0.0);
	let ticket = due(&mut panel, 1_000.0);
	assert!(panel.receive(ticket.token, Ok(payload(json)), 1_000.0));
	settle(&mut panel, 1_000.0);
	panel
}

fn node_id(locator: &str) -> NodeId {
	NodeId::new(locator)
}

#[test]
fn slow_response_never_overwrites_a_newer_one() {
	let mut panel = panel();
	panel.re_root("/zport/dmd/Devices/x", 0.0);
	let first = due(&mut panel, 1_000.0);
	panel.re_root("/zport/dmd/Devices/core", 1_000.0);
	let second = due(&mut panel, 2_000.0);
	assert_eq!(second.state.root_id, "/zport/dmd/Devices/core");

	assert!(panel.receive(second.token, Ok(payload(STAR)), 2_100.0));
	assert!(!panel.receive(first.token, Ok(payload(BUNDLE)), 2_200.0));

	assert_eq!(panel.status(), &MapStatus::Ready);
	assert_eq!(panel.scene().nodes().len(), 3);
	assert!(panel.scene().node(&node_id("/zport/dmd/Devices/a")).is_none());
}

#[test]
fn applying_the_same_state_twice_is_a_no_op() {
	let mut panel = panel();
	let state = panel.view_state().with_root("/zport/dmd/Devices/core");

	let Some(MapEvent::HistoryPush { fragment }) = panel.apply(state.clone(), 0.0) else {
		panic!("first apply should push history");
	};
	assert!(fragment.starts_with(PANEL));
	assert_eq!(panel.apply(state, 10.0), None);
	// The host echoing our own push back is not a change either.
	assert!(!panel.on_location_change(&format!("#{fragment}"), 20.0));

	assert!(panel.poll_fetch(100.0).is_none());
	due(&mut panel, 1_000.0);
	assert!(panel.poll_fetch(5_000.0).is_none());
}

#[test]
fn burst_of_edits_yields_one_fetch_of_the_last_state() {
	let mut panel = panel();
	for (i, root) in ["a", "b", "c"].into_iter().enumerate() {
		panel.re_root(&format!("/zport/dmd/Devices/{root}"), i as f64 * 50.0);
	}
	assert!(panel.poll_fetch(200.0).is_none());
	let ticket = due(&mut panel, 400.0);
	assert_eq!(ticket.state.root_id, "/zport/dmd/Devices/c");
	assert!(panel.poll_fetch(1_000.0).is_none());
}

#[test]
fn empty_result_clears_the_map() {
	let mut panel = show(STAR);
	panel.refresh(50_000.0);
	let ticket = due(&mut panel, 60_000.0);
	panel.receive(ticket.token, Ok(payload(r#"{"nodes": [], "links": []}"#)), 60_000.0);

	assert_eq!(panel.status(), &MapStatus::Empty);
	assert_eq!(
		panel.status().placeholder().as_deref(),
		Some("No data for this selection")
	);
	assert!(panel.scene().is_empty());
	assert!(!panel.simulation().is_running());
}

#[test]
fn parallel_links_get_their_own_lanes() {
	let panel = show(BUNDLE);
	let links = panel.scene().links();
	assert_eq!(links.len(), 2);
	assert_eq!(links[0].color, "#4682b4");
	assert_eq!(links[1].color, "#2ca02c");
	assert_ne!(links[0].gizmo, links[1].gizmo);
	assert!(links.iter().all(|link| link.bundle_size == 2));

	let (Some(first), Some(second)) = (&links[0].path, &links[1].path) else {
		panic!("both links should have an outline");
	};
	assert!(first.points.iter().all(|p| !second.contains(*p)));
	assert!(second.points.iter().all(|p| !first.contains(*p)));
}

#[test]
fn out_of_range_depth_is_clamped() {
	for (raw, expected) in [("0", 1), ("abc", 1), ("2.5", 1), ("", 3), ("99", 15), ("7", 7)] {
		let mut panel = panel();
		assert!(panel.on_location_change(
			&format!("#{PANEL}&root_id=%2Fzport%2Fdmd%2FDevices%2Fcore&depth={raw}"),
			0.0
		));
		assert_eq!(panel.view_state().depth, expected, "depth={raw}");
		assert!(panel.fragment().unwrap().contains(&format!("depth={expected}")));
	}
}

#[test]
fn repulsion_rescales_forces_and_reheats() {
	let mut panel = show(STAR);
	assert!(!panel.simulation().is_running());

	panel.set_repulsion(300.0);
	assert_eq!(panel.simulation().params(), ForceParams::from_repulsion(300.0));
	assert_eq!(panel.simulation().params().link_distance, 300.0);
	assert!(panel.simulation().is_running());
}

#[test]
fn dragged_node_stays_where_it_was_dropped() {
	let mut panel = show(STAR);
	let id = node_id("/zport/dmd/Devices/edge1");
	let start = panel.scene().node(&id).unwrap().position;
	let press = panel.viewport().world_to_screen(start);
	let release = press + Vec2::new(40.0, -25.0);

	assert_eq!(panel.pointer_down(press, PointerButton::Primary), None);
	assert_eq!(panel.pointer_move(press + Vec2::new(20.0, -10.0)), None);
	assert_eq!(panel.pointer_up(release), None);
	let dropped = panel.viewport().screen_to_world(release);

	assert!(panel.simulation().is_fixed(&id));
	assert!(panel.scene().node(&id).unwrap().fixed);
	settle(&mut panel, 100_000.0);
	assert!(panel.scene().node(&id).unwrap().position.distance(dropped) < 1e-9);
	assert!(!panel.viewport().is_suspended());
}

#[test]
fn reload_keeps_element_identity() {
	let mut panel = show(STAR);
	let before: Vec<_> = panel
		.scene()
		.nodes()
		.iter()
		.map(|node| (node.id.clone(), node.element, node.position))
		.collect();

	let grown = STAR.replace(
		r#"{"name": "edge2", "path": "/zport/dmd/Devices/edge2"}"#,
		r#"{"name": "edge2", "path": "/zport/dmd/Devices/edge2"},
		{"name": "edge3", "path": "/zport/dmd/Devices/edge3"}"#,
	);
	panel.refresh(50_000.0);
	let ticket = due(&mut panel, 60_000.0);
	panel.receive(ticket.token, Ok(payload(&grown)), 60_000.0);

	assert_eq!(panel.scene().nodes().len(), 4);
	for (id, element, position) in before {
		let node = panel.scene().node(&id).unwrap();
		assert_eq!(node.element, element);
		assert_eq!(node.position, position);
	}
	assert_eq!(panel.scene().handlers_attached(), 4);
}

#[test]
fn backend_query_errors_replace_the_map() {
	let mut panel = show(STAR);
	panel.refresh(50_000.0);
	let ticket = due(&mut panel, 60_000.0);
	panel.receive(ticket.token, Ok(payload(r#"{"error": "Unknown device"}"#)), 60_000.0);
	assert_eq!(panel.status(), &MapStatus::QueryFailed("Unknown device".into()));
	assert!(!panel.status().shows_graph());
}
