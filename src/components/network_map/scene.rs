//! Retained scene: one persistent element per node and per link.
//!
//! [`Scene::reconcile`] maps a new dataset onto the existing elements by
//! identity. Elements for ids present in both datasets are updated in place
//! and keep their [`ElementId`] and pointer handlers, so a node that is
//! being dragged, hovered or pinned is not disturbed by a refresh.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, error};

use super::geometry::{EdgePath, EdgeShape, GeometryError, Gizmo, Vec2, arrow_path};
use super::simulation::TickFrame;
use super::types::{Graph, Link, Node, NodeId};

/// Characters kept by the short label.
pub const LABEL_BUDGET: usize = 20;
/// Appended to a truncated short label.
pub const ELLIPSIS: &str = " ...";

/// Identity of a visual element, never reused within one scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

/// Drawing layers, bottom first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneLayer {
	/// Edge bands.
	Links,
	/// Node glyphs and labels.
	Nodes,
}

/// Layers in painting order.
pub const DRAW_ORDER: [SceneLayer; 2] = [SceneLayer::Links, SceneLayer::Nodes];

/// Node label with both representations kept side by side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeLabel {
	full: String,
	short: String,
}

impl NodeLabel {
	/// Keeps `full` and a copy cut after `budget` characters.
	pub fn new(full: &str, budget: usize) -> Self {
		let short = match full.char_indices().nth(budget) {
			Some((cut, _)) => format!("{}{ELLIPSIS}", &full[..cut]),
			None => full.to_owned(),
		};
		Self {
			full: full.to_owned(),
			short,
		}
	}

	/// The untruncated name, shown on hover.
	pub fn full(&self) -> &str {
		&self.full
	}

	/// The name as normally drawn.
	pub fn short(&self) -> &str {
		&self.short
	}

	/// Whether the short form lost characters.
	pub fn is_truncated(&self) -> bool {
		self.short != self.full
	}
}

/// Drawn glyph of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeElement {
	/// Kept for as long as the node stays in the dataset.
	pub element: ElementId,
	/// The node drawn.
	pub id: NodeId,
	/// Center in world space.
	pub position: Vec2,
	/// Canvas fill style.
	pub fill: String,
	/// Full and truncated name.
	pub label: NodeLabel,
	/// Drawn with the root ring.
	pub highlighted: bool,
	/// Icon URL.
	pub icon: Option<String>,
	/// Resource path, `None` for dangling nodes.
	pub locator: Option<String>,
	/// Pinned; drawn with a dashed ring.
	pub fixed: bool,
	/// Glyph radius, larger for the root.
	pub radius: f64,
}

/// Identity of a link: its endpoints, its layer set, and how many equal
/// links came before it in the dataset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LinkKey {
	/// Start node.
	pub source: NodeId,
	/// End node.
	pub target: NodeId,
	/// Comma-joined sorted layer tags.
	pub layers: String,
	/// Zero for the first such link.
	pub occurrence: usize,
}

/// Drawn band of one link.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkElement {
	/// Kept for as long as the link stays in the dataset.
	pub element: ElementId,
	/// Identity across reloads.
	pub key: LinkKey,
	/// Ends in an arrowhead.
	pub directed: bool,
	/// Canvas fill style.
	pub color: String,
	/// Layer tags of the link.
	pub layers: BTreeSet<String>,
	/// Position within the bundle of links joining the same pair.
	pub slot: usize,
	/// Links joining the same pair, in either direction.
	pub bundle_size: usize,
	/// Midpoint shape telling bundled links apart.
	pub gizmo: Gizmo,
	/// Sideways shift from the center line.
	pub lane_offset: f64,
	/// `None` while the outline cannot be drawn (overlapping endpoints).
	pub path: Option<EdgePath>,
}

impl LinkElement {
	/// Start node.
	pub fn source(&self) -> &NodeId {
		&self.key.source
	}

	/// End node.
	pub fn target(&self) -> &NodeId {
		&self.key.target
	}
}

/// Sizes used when building elements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneStyle {
	/// Glyph radius of ordinary nodes.
	pub node_radius: f64,
	/// Glyph radius of the traversal root.
	pub root_radius: f64,
	/// Half the thickness of a link band.
	pub link_half_width: f64,
	/// Radius of bundle gizmos.
	pub gizmo_radius: f64,
	/// Distance between neighbouring lanes of a bundle.
	pub lane_spacing: f64,
	/// Characters kept by short labels.
	pub label_budget: usize,
}

impl Default for SceneStyle {
	fn default() -> Self {
		Self {
			node_radius: 21.0,
			root_radius: 25.0,
			link_half_width: 1.5,
			gizmo_radius: 6.0,
			lane_spacing: 14.0,
			label_budget: LABEL_BUDGET,
		}
	}
}

/// Counts of one reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	/// New node elements.
	pub nodes_entered: usize,
	/// Node elements kept and updated in place.
	pub nodes_updated: usize,
	/// Node elements removed.
	pub nodes_exited: usize,
	/// New link elements.
	pub links_entered: usize,
	/// Link elements kept and updated in place.
	pub links_updated: usize,
	/// Link elements removed.
	pub links_exited: usize,
}

/// Every element currently drawn, keyed by identity.
pub struct Scene {
	style: SceneStyle,
	nodes: Vec<NodeElement>,
	node_index: HashMap<NodeId, usize>,
	links: Vec<LinkElement>,
	handlers: HashSet<ElementId>,
	handlers_attached: u64,
	next_element: u64,
}

impl Scene {
	/// An empty scene.
	pub fn new(style: SceneStyle) -> Self {
		Self {
			style,
			nodes: Vec::new(),
			node_index: HashMap::new(),
			links: Vec::new(),
			handlers: HashSet::new(),
			handlers_attached: 0,
			next_element: 0,
		}
	}

	/// Node elements in dataset order.
	pub fn nodes(&self) -> &[NodeElement] {
		&self.nodes
	}

	/// Link elements in dataset order.
	pub fn links(&self) -> &[LinkElement] {
		&self.links
	}

	/// No node elements.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Element drawing `id`.
	pub fn node(&self, id: &NodeId) -> Option<&NodeElement> {
		self.node_index.get(id).map(|&i| &self.nodes[i])
	}

	/// Whether pointer handlers are attached to `element`.
	pub fn has_handlers(&self, element: ElementId) -> bool {
		self.handlers.contains(&element)
	}

	/// Total handler attachments since the scene was created.
	pub fn handlers_attached(&self) -> u64 {
		self.handlers_attached
	}

	fn allocate(&mut self) -> ElementId {
		self.next_element += 1;
		ElementId(self.next_element)
	}

	/// Enter/update/exit pass against `graph`.
	pub fn reconcile(&mut self, graph: &Graph) -> ReconcileReport {
		let mut report = ReconcileReport::default();

		let mut previous: HashMap<NodeId, NodeElement> = self
			.nodes
			.drain(..)
			.map(|element| (element.id.clone(), element))
			.collect();
		self.node_index.clear();

		for node in &graph.nodes {
			let element = match previous.remove(&node.id) {
				Some(mut element) => {
					self.update_node(&mut element, node);
					report.nodes_updated += 1;
					element
				}
				None => {
					let element = self.create_node(node);
					self.handlers.insert(element.element);
					self.handlers_attached += 1;
					report.nodes_entered += 1;
					element
				}
			};
			self.node_index.insert(element.id.clone(), self.nodes.len());
			self.nodes.push(element);
		}
		for (_, element) in previous {
			self.handlers.remove(&element.element);
			report.nodes_exited += 1;
		}

		self.reconcile_links(&graph.links, &mut report);
		self.rebuild_paths();
		debug!("scene reconciled: {report:?}");
		report
	}

	fn create_node(&mut self, node: &Node) -> NodeElement {
		let element = self.allocate();
		let mut created = NodeElement {
			element,
			id: node.id.clone(),
			position: node.position.unwrap_or(Vec2::ZERO),
			fill: String::new(),
			label: NodeLabel::new("", 0),
			highlighted: false,
			icon: None,
			locator: None,
			fixed: node.fixed,
			radius: self.style.node_radius,
		};
		self.update_node(&mut created, node);
		created
	}

	fn update_node(&self, element: &mut NodeElement, node: &Node) {
		element.fill = node.color.fill().to_owned();
		if element.label.full() != node.name {
			element.label = NodeLabel::new(&node.name, self.style.label_budget);
		}
		element.highlighted = node.highlighted;
		element.radius = if node.highlighted {
			self.style.root_radius
		} else {
			self.style.node_radius
		};
		element.icon = node.icon.clone();
		element.locator = node.locator.clone();
	}

	fn reconcile_links(&mut self, links: &[Link], report: &mut ReconcileReport) {
		let mut previous: HashMap<LinkKey, LinkElement> = self
			.links
			.drain(..)
			.map(|element| (element.key.clone(), element))
			.collect();

		let mut occurrences: HashMap<(NodeId, NodeId, String), usize> = HashMap::new();
		let mut bundles: HashMap<(NodeId, NodeId), usize> = HashMap::new();
		let mut slots = Vec::with_capacity(links.len());
		for link in links {
			let pair = canonical_pair(&link.source, &link.target);
			let slot = bundles.entry(pair).or_insert(0);
			slots.push(*slot);
			*slot += 1;
		}

		for (link, slot) in links.iter().zip(slots) {
			let layers = link.layers.iter().cloned().collect::<Vec<_>>().join(",");
			let occurrence = occurrences
				.entry((link.source.clone(), link.target.clone(), layers.clone()))
				.or_insert(0);
			let key = LinkKey {
				source: link.source.clone(),
				target: link.target.clone(),
				layers,
				occurrence: *occurrence,
			};
			*occurrence += 1;

			let bundle_size = bundles
				.get(&canonical_pair(&link.source, &link.target))
				.copied()
				.unwrap_or(1);
			let mut element = match previous.remove(&key) {
				Some(element) => {
					report.links_updated += 1;
					element
				}
				None => {
					report.links_entered += 1;
					LinkElement {
						element: self.allocate(),
						key,
						directed: false,
						color: String::new(),
						layers: BTreeSet::new(),
						slot: 0,
						bundle_size: 1,
						gizmo: Gizmo::None,
						lane_offset: 0.0,
						path: None,
					}
				}
			};
			element.directed = link.directed;
			element.color.clone_from(&link.color);
			element.layers.clone_from(&link.layers);
			element.slot = slot;
			element.bundle_size = bundle_size;
			element.gizmo = if bundle_size > 1 {
				Gizmo::for_slot(slot)
			} else {
				Gizmo::None
			};
			element.lane_offset = self.lane_offset(&link.source, &link.target, slot, bundle_size);
			self.links.push(element);
		}
		report.links_exited += previous.len();
	}

	/// Lanes are laid out relative to the canonical pair order, so a link
	/// and its reverse end up on different sides.
	fn lane_offset(&self, source: &NodeId, target: &NodeId, slot: usize, size: usize) -> f64 {
		if size <= 1 {
			return 0.0;
		}
		let centered = slot as f64 - (size as f64 - 1.0) / 2.0;
		let offset = centered * self.style.lane_spacing;
		if source <= target { offset } else { -offset }
	}

	/// Copies simulation positions onto the node elements and redraws links.
	pub fn sync_positions(&mut self, frame: TickFrame<'_>) {
		for sim_node in frame.nodes {
			if let Some(&i) = self.node_index.get(&sim_node.id) {
				let element = &mut self.nodes[i];
				element.position = sim_node.position;
				element.fixed = sim_node.fixed;
			}
		}
		self.rebuild_paths();
	}

	/// Moves one node element, e.g. while it is dragged.
	pub fn set_position(&mut self, id: &NodeId, position: Vec2) {
		if let Some(&i) = self.node_index.get(id) {
			self.nodes[i].position = position;
		}
	}

	/// Updates the pin marker of one node element.
	pub fn set_fixed(&mut self, id: &NodeId, fixed: bool) {
		if let Some(&i) = self.node_index.get(id) {
			self.nodes[i].fixed = fixed;
		}
	}

	/// Recomputes every link outline from the current node positions.
	pub fn rebuild_paths(&mut self) {
		let style = self.style;
		for link in &mut self.links {
			let (Some(&source), Some(&target)) = (
				self.node_index.get(&link.key.source),
				self.node_index.get(&link.key.target),
			) else {
				link.path = None;
				continue;
			};
			let (from, to) = (&self.nodes[source], &self.nodes[target]);
			let shape = EdgeShape {
				half_width: style.link_half_width,
				node_radius: to.radius,
				directed: link.directed,
				gizmo: link.gizmo,
				gizmo_radius: style.gizmo_radius,
				lane_offset: link.lane_offset,
			};
			link.path = match arrow_path(from.position, to.position, &shape) {
				Ok(path) => Some(path),
				Err(GeometryError::EdgeTooShort { .. }) => None,
				Err(err) => {
					error!("cannot draw link {} -> {}: {err}", link.key.source, link.key.target);
					None
				}
			};
		}
	}

	/// Top-most node whose glyph contains `world` and that accepts pointer input.
	pub fn node_at(&self, world: Vec2) -> Option<&NodeElement> {
		self.nodes
			.iter()
			.rev()
			.filter(|element| self.handlers.contains(&element.element))
			.find(|element| element.position.distance(world) <= element.radius)
	}
}

fn canonical_pair(a: &NodeId, b: &NodeId) -> (NodeId, NodeId) {
	if a <= b {
		(a.clone(), b.clone())
	} else {
		(b.clone(), a.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::network_map::palette::{NodeColor, Severity};

	fn graph(nodes: &[&str], links: &[(&str, &str)]) -> Graph {
		Graph::new(
			nodes.iter().map(|id| Node::new(*id, id.to_uppercase())).collect(),
			links.iter().map(|(a, b)| Link::new(a, b)).collect(),
		)
	}

	fn place(scene: &mut Scene, positions: &[(&str, f64, f64)]) {
		for (id, x, y) in positions {
			scene.set_position(&(*id).into(), Vec2::new(*x, *y));
		}
		scene.rebuild_paths();
	}

	#[test]
	fn persisting_nodes_keep_their_element() {
		let mut scene = Scene::new(SceneStyle::default());
		let first = scene.reconcile(&graph(&["a", "b"], &[("a", "b")]));
		assert_eq!(first.nodes_entered, 2);
		let a = scene.node(&"a".into()).unwrap().element;
		let b = scene.node(&"b".into()).unwrap().element;

		let second = scene.reconcile(&graph(&["a", "c"], &[("a", "c")]));
		assert_eq!(
			second,
			ReconcileReport {
				nodes_entered: 1,
				nodes_updated: 1,
				nodes_exited: 1,
				links_entered: 1,
				links_updated: 0,
				links_exited: 1,
			}
		);
		assert_eq!(scene.node(&"a".into()).unwrap().element, a);
		assert!(scene.node(&"b".into()).is_none());
		assert!(!scene.has_handlers(b));
		assert!(scene.has_handlers(a));
		assert_eq!(scene.handlers_attached(), 3);
	}

	#[test]
	fn updates_are_applied_in_place() {
		let mut scene = Scene::new(SceneStyle::default());
		scene.reconcile(&graph(&["a"], &[]));
		scene.set_position(&"a".into(), Vec2::new(10.0, 20.0));

		let mut node = Node::new("a", "renamed");
		node.highlighted = true;
		node.color = NodeColor::Severity(Severity::Critical);
		node.icon = Some("/img/router.png".into());
		scene.reconcile(&Graph::new(vec![node], vec![]));

		let element = scene.node(&"a".into()).unwrap();
		assert_eq!(element.label.full(), "renamed");
		assert!(element.highlighted);
		assert_eq!(element.radius, 25.0);
		assert_eq!(element.fill, "#ff0000");
		assert_eq!(element.icon.as_deref(), Some("/img/router.png"));
		assert_eq!(element.position, Vec2::new(10.0, 20.0));
	}

	#[test]
	fn labels_truncate_to_budget() {
		let label = NodeLabel::new("core-switch-frankfurt-01.example.net", LABEL_BUDGET);
		assert_eq!(label.short(), "core-switch-frankfur ...");
		assert_eq!(label.full(), "core-switch-frankfurt-01.example.net");
		assert!(label.is_truncated());

		let exact = NodeLabel::new("abcdefghijklmnopqrst", LABEL_BUDGET);
		assert_eq!(exact.short(), "abcdefghijklmnopqrst");
		assert!(!exact.is_truncated());

		let wide = NodeLabel::new(&"ß".repeat(21), LABEL_BUDGET);
		assert_eq!(wide.short(), format!("{}{ELLIPSIS}", "ß".repeat(20)));
	}

	#[test]
	fn parallel_links_are_bundled_on_separate_lanes() {
		let mut scene = Scene::new(SceneStyle::default());
		let g = Graph::new(
			vec![Node::new("a", "A"), Node::new("b", "B")],
			vec![
				Link::new("a", "b").with_layers(["layer2"]),
				Link::new("a", "b").with_layers(["vlan10"]),
			],
		);
		scene.reconcile(&g);
		place(&mut scene, &[("a", 0.0, 0.0), ("b", 200.0, 0.0)]);

		let links = scene.links();
		assert_eq!(links.len(), 2);
		assert_eq!(links[0].gizmo, Gizmo::None);
		assert_eq!(links[1].gizmo, Gizmo::Circle);
		assert_ne!(links[0].color, links[1].color);
		assert_eq!(links[0].lane_offset, -links[1].lane_offset);

		let (p0, p1) = (links[0].path.as_ref().unwrap(), links[1].path.as_ref().unwrap());
		assert!(p0.points.iter().all(|p| !p1.contains(*p)));
		assert!(p1.points.iter().all(|p| !p0.contains(*p)));
	}

	#[test]
	fn reverse_links_share_a_bundle() {
		let mut scene = Scene::new(SceneStyle::default());
		scene.reconcile(&graph(&["a", "b"], &[("a", "b"), ("b", "a")]));
		let links = scene.links();
		assert_eq!(links[0].bundle_size, 2);
		assert_eq!(links[1].slot, 1);
		// The reversed link also has a flipped perpendicular, so equal offsets
		// still put the two lanes on opposite sides.
		assert_eq!(links[0].lane_offset, links[1].lane_offset);
	}

	#[test]
	fn persisting_links_keep_their_element() {
		let mut scene = Scene::new(SceneStyle::default());
		scene.reconcile(&graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		let ab = scene.links()[0].element;
		scene.reconcile(&graph(&["a", "b"], &[("a", "b")]));
		assert_eq!(scene.links().len(), 1);
		assert_eq!(scene.links()[0].element, ab);
	}

	#[test]
	fn hit_test_prefers_topmost_node() {
		let mut scene = Scene::new(SceneStyle::default());
		scene.reconcile(&graph(&["a", "b"], &[]));
		place(&mut scene, &[("a", 0.0, 0.0), ("b", 10.0, 0.0)]);
		assert_eq!(scene.node_at(Vec2::new(5.0, 0.0)).map(|n| n.id.as_str()), Some("b"));
		assert!(scene.node_at(Vec2::new(100.0, 100.0)).is_none());
	}

	#[test]
	fn overlapping_nodes_hide_the_link_glyph() {
		let mut scene = Scene::new(SceneStyle::default());
		scene.reconcile(&graph(&["a", "b"], &[("a", "b")]));
		place(&mut scene, &[("a", 5.0, 5.0), ("b", 5.0, 5.0)]);
		assert!(scene.links()[0].path.is_none());
	}

	#[test]
	fn empty_dataset_exits_everything() {
		let mut scene = Scene::new(SceneStyle::default());
		scene.reconcile(&graph(&["a", "b"], &[("a", "b")]));
		let report = scene.reconcile(&Graph::default());
		assert_eq!(report.nodes_exited, 2);
		assert_eq!(report.links_exited, 1);
		assert!(scene.is_empty());
		assert!(scene.links().is_empty());
	}
}
