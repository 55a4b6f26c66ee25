//! Force-directed layout.
//!
//! A small position-Verlet simulation: springs pull linked nodes toward a
//! target distance, every pair of nodes closer than the charge cutoff
//! repels, and a weak gravity pulls everything toward the center. The
//! simulation cools (`alpha` decays) until it settles; any change to the
//! dataset or the parameters reheats it.

use std::collections::HashMap;
use std::f64::consts::PI;

use super::geometry::{EPSILON, Vec2};
use super::types::{Graph, NodeId};

/// Alpha after a (re)start.
pub const ALPHA_START: f64 = 0.1;
/// Alpha below which the simulation is considered settled.
pub const ALPHA_MIN: f64 = 0.005;
const ALPHA_DECAY: f64 = 0.99;
/// Spacing of freshly seeded nodes on the spiral.
const SEED_SPACING: f64 = 10.0;
const GOLDEN_ANGLE: f64 = PI * 0.763_932_022_500_210_3;

/// Force constants of one layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceParams {
	/// Rest length of link springs.
	pub link_distance: f64,
	/// Negative values repel.
	pub charge: f64,
	/// Pairs farther apart than this exert no charge on each other.
	pub charge_distance: f64,
	/// Pull toward the center, per unit of distance.
	pub gravity: f64,
	/// Velocity retained per step.
	pub friction: f64,
}

impl ForceParams {
	/// Scales link distance, charge and cutoff together from one
	/// user-facing repulsion value.
	pub fn from_repulsion(value: f64) -> Self {
		let value = if value.is_finite() { value.max(1.0) } else { 100.0 };
		Self {
			link_distance: value,
			charge: -5.0 * value,
			charge_distance: 4.0 * value,
			gravity: 0.05,
			friction: 0.9,
		}
	}
}

impl Default for ForceParams {
	fn default() -> Self {
		Self::from_repulsion(100.0)
	}
}

/// Layout state of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
	/// Node the state belongs to.
	pub id: NodeId,
	/// Current position in world space.
	pub position: Vec2,
	/// Position before the last step; `position - previous` is the velocity.
	pub previous: Vec2,
	/// Pinned; never moved by the forces.
	pub fixed: bool,
	/// Number of links touching this node.
	pub degree: usize,
}

/// Snapshot handed to the per-tick callback.
#[derive(Clone, Copy, Debug)]
pub struct TickFrame<'a> {
	/// Every node in dataset order.
	pub nodes: &'a [SimNode],
}

impl TickFrame<'_> {
	/// Node ids with their positions.
	pub fn iter(&self) -> impl Iterator<Item = (&NodeId, Vec2)> {
		self.nodes.iter().map(|node| (&node.id, node.position))
	}
}

/// Position-Verlet layout of one graph.
pub struct ForceSimulation {
	nodes: Vec<SimNode>,
	index: HashMap<NodeId, usize>,
	links: Vec<(usize, usize)>,
	params: ForceParams,
	center: Vec2,
	alpha: f64,
}

impl ForceSimulation {
	/// An empty, settled simulation pulling toward `center`.
	pub fn new(params: ForceParams, center: Vec2) -> Self {
		Self {
			nodes: Vec::new(),
			index: HashMap::new(),
			links: Vec::new(),
			params,
			center,
			alpha: 0.0,
		}
	}

	/// Force constants in use.
	pub fn params(&self) -> ForceParams {
		self.params
	}

	/// Every node in dataset order.
	pub fn nodes(&self) -> &[SimNode] {
		&self.nodes
	}

	/// Whether another tick would move anything.
	pub fn is_running(&self) -> bool {
		self.alpha >= ALPHA_MIN
	}

	/// Reheats the simulation.
	pub fn restart(&mut self) {
		self.alpha = ALPHA_START;
	}

	/// Settles immediately.
	pub fn stop(&mut self) {
		self.alpha = 0.0;
	}

	/// Moves the gravity target, e.g. after a resize.
	pub fn set_center(&mut self, center: Vec2) {
		self.center = center;
	}

	/// Rescales the forces and reheats the simulation.
	pub fn set_repulsion(&mut self, value: f64) {
		self.params = ForceParams::from_repulsion(value);
		self.restart();
	}

	/// Replaces the dataset. Nodes that persist by id keep their position,
	/// velocity and pin; the link list is rebuilt from scratch.
	pub fn set_graph(&mut self, graph: &Graph) {
		let mut previous: HashMap<NodeId, SimNode> = self
			.nodes
			.drain(..)
			.map(|node| (node.id.clone(), node))
			.collect();
		self.index.clear();

		for (i, node) in graph.nodes.iter().enumerate() {
			let sim_node = match previous.remove(&node.id) {
				Some(mut existing) => {
					existing.degree = 0;
					existing
				}
				None => {
					let position = node.position.unwrap_or_else(|| self.seed_position(i));
					SimNode {
						id: node.id.clone(),
						position,
						previous: position,
						fixed: node.fixed,
						degree: 0,
					}
				}
			};
			self.index.insert(sim_node.id.clone(), self.nodes.len());
			self.nodes.push(sim_node);
		}

		self.links.clear();
		for link in &graph.links {
			let (Some(&source), Some(&target)) = (self.index.get(&link.source), self.index.get(&link.target))
			else {
				continue;
			};
			if source == target {
				continue;
			}
			self.nodes[source].degree += 1;
			self.nodes[target].degree += 1;
			self.links.push((source, target));
		}

		self.restart();
	}

	fn seed_position(&self, i: usize) -> Vec2 {
		let radius = SEED_SPACING * ((i as f64) + 0.5).sqrt();
		let angle = i as f64 * GOLDEN_ANGLE;
		self.center + Vec2::new(radius * angle.cos(), radius * angle.sin())
	}

	/// Current position of `id`.
	pub fn position(&self, id: &NodeId) -> Option<Vec2> {
		self.index.get(id).map(|&i| self.nodes[i].position)
	}

	/// Whether `id` is pinned.
	pub fn is_fixed(&self, id: &NodeId) -> bool {
		self.index.get(id).is_some_and(|&i| self.nodes[i].fixed)
	}

	/// Pins a node at `position`; it keeps repelling others but no longer
	/// moves. Returns `false` for unknown ids.
	pub fn pin(&mut self, id: &NodeId, position: Vec2) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		let node = &mut self.nodes[i];
		node.fixed = true;
		node.position = position;
		node.previous = position;
		true
	}

	/// Releases a pin and reheats. Returns `false` for unknown ids.
	pub fn unpin(&mut self, id: &NodeId) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		self.nodes[i].fixed = false;
		self.restart();
		true
	}

	/// One step, then `on_tick` with the new positions. Returns `false`
	/// once settled, in which case nothing moves and `on_tick` is not run.
	pub fn tick_with(&mut self, on_tick: impl FnOnce(TickFrame<'_>)) -> bool {
		if !self.is_running() {
			self.alpha = 0.0;
			return false;
		}
		self.step();
		self.alpha *= ALPHA_DECAY;
		on_tick(TickFrame { nodes: &self.nodes });
		true
	}

	/// Current positions without stepping.
	pub fn frame(&self) -> TickFrame<'_> {
		TickFrame { nodes: &self.nodes }
	}

	/// [`ForceSimulation::tick_with`] without a callback.
	pub fn tick(&mut self) -> bool {
		self.tick_with(|_| {})
	}

	fn step(&mut self) {
		let alpha = self.alpha;
		let params = self.params;

		for &(source, target) in &self.links {
			let delta = self.nodes[target].position - self.nodes[source].position;
			let distance = delta.length();
			if distance <= EPSILON {
				continue;
			}
			let stretch = alpha * (distance - params.link_distance) / distance;
			let correction = delta * stretch;
			let (source_degree, target_degree) = (self.nodes[source].degree, self.nodes[target].degree);
			// The better connected end moves less.
			let share = source_degree as f64 / (source_degree + target_degree).max(1) as f64;
			let (source_fixed, target_fixed) = (self.nodes[source].fixed, self.nodes[target].fixed);
			let (source_share, target_share) = match (source_fixed, target_fixed) {
				(true, true) => (0.0, 0.0),
				(true, false) => (0.0, 1.0),
				(false, true) => (1.0, 0.0),
				(false, false) => (1.0 - share, share),
			};
			self.nodes[target].position -= correction * target_share;
			self.nodes[source].position += correction * source_share;
		}

		let pull = alpha * params.gravity;
		if pull > 0.0 {
			for node in self.nodes.iter_mut().filter(|node| !node.fixed) {
				node.position += (self.center - node.position) * pull;
			}
		}

		let cutoff_sq = params.charge_distance * params.charge_distance;
		let strength = alpha * params.charge;
		for i in 0..self.nodes.len() {
			if self.nodes[i].fixed {
				continue;
			}
			let mut push = Vec2::ZERO;
			for j in 0..self.nodes.len() {
				if i == j {
					continue;
				}
				let delta = self.nodes[j].position - self.nodes[i].position;
				let distance_sq = delta.length_sq();
				if distance_sq <= EPSILON || distance_sq >= cutoff_sq {
					continue;
				}
				push += delta * (strength / distance_sq);
			}
			// Charge acts on the previous position, i.e. on velocity.
			self.nodes[i].previous -= push;
		}

		let friction = params.friction;
		for node in &mut self.nodes {
			if node.fixed {
				node.position = node.previous;
				continue;
			}
			let velocity = (node.previous - node.position) * friction;
			node.previous = node.position;
			node.position -= velocity;
			if !node.position.is_finite() {
				node.position = node.previous;
			}
		}
	}
}
