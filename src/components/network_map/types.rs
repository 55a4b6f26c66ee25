//! Inbound payload types and the validated graph model.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use log::warn;
use serde::Deserialize;

use super::geometry::Vec2;
use super::palette::{NodeColor, link_color};

/// Graph payload returned by the topology query endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphPayload {
	/// Nodes in backend order.
	#[serde(default)]
	pub nodes: Vec<PayloadNode>,
	/// Links refer to nodes by index or by id.
	#[serde(default)]
	pub links: Vec<PayloadLink>,
	/// Query-level failure reported by the backend.
	#[serde(default)]
	pub error: Option<String>,
}

/// One node as sent by the backend.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PayloadNode {
	/// Stable key. Falls back to `path`, then `name`.
	#[serde(default)]
	pub id: Option<String>,
	/// Display name.
	#[serde(default)]
	pub name: String,
	/// Navigable resource locator; absent for dangling nodes.
	#[serde(default)]
	pub path: Option<String>,
	/// Icon URL.
	#[serde(default, alias = "icon")]
	pub image: Option<String>,
	/// Severity class (`severity_error`) or CSS color.
	#[serde(default)]
	pub color: Option<String>,
	/// Set on the traversal root.
	#[serde(default, alias = "highlighted")]
	pub highlight: bool,
	/// Pinned at `x`, `y`; ignored without both coordinates.
	#[serde(default)]
	pub fixed: bool,
	/// Last known position.
	#[serde(default)]
	pub x: Option<f64>,
	/// Last known position.
	#[serde(default)]
	pub y: Option<f64>,
}

/// A link endpoint, either a node key or a position in the node list.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
	/// Position in [`GraphPayload::nodes`].
	Index(usize),
	/// A node key.
	Id(String),
}

/// One link as sent by the backend.
#[derive(Clone, Debug, Deserialize)]
pub struct PayloadLink {
	/// Start node.
	pub source: Endpoint,
	/// End node.
	pub target: Endpoint,
	/// Drawn with an arrowhead.
	#[serde(default)]
	pub directed: bool,
	/// Layer tags such as `layer2` or `vlan10`.
	#[serde(default)]
	pub layers: Vec<String>,
	/// Precomputed display color, overriding the palette.
	#[serde(default)]
	pub color: Option<String>,
}

/// One entry of the layer list endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LayerOption {
	/// Checkbox caption.
	#[serde(rename = "boxLabel", alias = "label")]
	pub label: String,
	/// Tag sent back in the `layers` query.
	#[serde(rename = "inputValue", alias = "value")]
	pub value: String,
	/// DOM id suggested by the host.
	#[serde(default)]
	pub id: Option<String>,
}

/// Stable node identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
	/// Wraps a node key.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The key as sent by the backend.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for NodeId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// A node of the validated graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	/// Unique within one graph.
	pub id: NodeId,
	/// Display name.
	pub name: String,
	/// Fill color.
	pub color: NodeColor,
	/// Icon URL.
	pub icon: Option<String>,
	/// Marks the traversal root.
	pub highlighted: bool,
	/// Resource path, `None` for dangling nodes.
	pub locator: Option<String>,
	/// Pinned at `position`.
	pub fixed: bool,
	/// Position supplied by the backend.
	pub position: Option<Vec2>,
}

impl Node {
	/// A plain node with the default color.
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			id: NodeId::new(id),
			name: name.into(),
			color: NodeColor::parse(None),
			icon: None,
			highlighted: false,
			locator: None,
			fixed: false,
			position: None,
		}
	}
}

/// A link between two nodes of the same graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
	/// Start node.
	pub source: NodeId,
	/// End node.
	pub target: NodeId,
	/// Drawn with an arrowhead.
	pub directed: bool,
	/// Trimmed, non-empty layer tags.
	pub layers: BTreeSet<String>,
	/// Display color.
	pub color: String,
}

impl Link {
	/// An undirected link without layers.
	pub fn new(source: &str, target: &str) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			directed: false,
			layers: BTreeSet::new(),
			color: link_color(std::iter::empty::<&str>()).to_owned(),
		}
	}

	/// Sets the layers and picks the matching palette color.
	pub fn with_layers<'a>(mut self, layers: impl IntoIterator<Item = &'a str>) -> Self {
		self.layers = layers.into_iter().map(str::to_owned).collect();
		self.color = link_color(self.layers.iter().map(String::as_str)).to_owned();
		self
	}

	/// Marks the link as directed.
	pub fn directed(mut self) -> Self {
		self.directed = true;
		self
	}
}

/// A validated dataset: unique node ids, links between two distinct known
/// nodes only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
	/// Nodes in backend order.
	pub nodes: Vec<Node>,
	/// Links in backend order.
	pub links: Vec<Link>,
}

impl Graph {
	/// Drops duplicate nodes, links with unknown endpoints and self loops.
	pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
		let mut graph = Self::default();
		let mut seen = HashSet::new();
		for node in nodes {
			if !seen.insert(node.id.clone()) {
				warn!("dropping duplicate node {}", node.id);
				continue;
			}
			graph.nodes.push(node);
		}
		for link in links {
			if !seen.contains(&link.source) || !seen.contains(&link.target) {
				warn!("dropping link {} -> {} with unknown endpoint", link.source, link.target);
				continue;
			}
			if link.source == link.target {
				warn!("dropping self loop on {}", link.source);
				continue;
			}
			graph.links.push(link);
		}
		graph
	}

	/// Resolves endpoints, layer colors and node keys, then validates.
	pub fn from_payload(payload: GraphPayload) -> Self {
		let ids: Vec<NodeId> = payload.nodes.iter().map(payload_node_id).collect();
		let resolve = |endpoint: &Endpoint| match endpoint {
			Endpoint::Index(index) => ids.get(*index).cloned(),
			Endpoint::Id(id) => Some(NodeId::new(id.as_str())),
		};

		let mut links = Vec::with_capacity(payload.links.len());
		for link in &payload.links {
			let (Some(source), Some(target)) = (resolve(&link.source), resolve(&link.target))
			else {
				warn!("dropping link with out-of-range endpoint {:?} -> {:?}", link.source, link.target);
				continue;
			};
			let layers: BTreeSet<String> = link
				.layers
				.iter()
				.map(|layer| layer.trim())
				.filter(|layer| !layer.is_empty())
				.map(str::to_owned)
				.collect();
			let color = match link.color.as_deref().map(str::trim) {
				Some(color) if !color.is_empty() => color.to_owned(),
				_ => link_color(layers.iter().map(String::as_str)).to_owned(),
			};
			links.push(Link {
				source,
				target,
				directed: link.directed,
				layers,
				color,
			});
		}

		let nodes = payload
			.nodes
			.into_iter()
			.zip(ids)
			.map(|(node, id)| {
				let position = match (node.x, node.y) {
					(Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Vec2::new(x, y)),
					_ => None,
				};
				Node {
					id,
					name: node.name,
					color: NodeColor::parse(node.color.as_deref()),
					icon: node.image.filter(|image| !image.is_empty()),
					highlighted: node.highlight,
					locator: node.path.filter(|path| !path.is_empty()),
					fixed: node.fixed && position.is_some(),
					position,
				}
			})
			.collect();

		Self::new(nodes, links)
	}

	/// No nodes at all.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

fn payload_node_id(node: &PayloadNode) -> NodeId {
	let key = [node.id.as_deref(), node.path.as_deref()]
		.into_iter()
		.flatten()
		.find(|key| !key.is_empty())
		.unwrap_or(&node.name);
	NodeId::new(key)
}
