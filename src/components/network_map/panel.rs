//! One network map instance.
//!
//! [`MapPanel`] owns everything a single view needs: view sync, simulation,
//! scene, viewport and pointer routing. It has no DOM access; the component
//! feeds it timestamps, pointer positions and fetch results and acts on the
//! [`MapEvent`]s it returns.

use log::{info, warn};

use super::config::MapConfig;
use super::error::LoadError;
use super::geometry::Vec2;
use super::interaction::{ContextAction, ContextRequest, InteractionEvent, InteractionRouter, PointerButton};
use super::scene::{ReconcileReport, Scene};
use super::simulation::{ForceParams, ForceSimulation};
use super::sync::{Applied, FetchTicket, RequestToken, ViewSync};
use super::types::{Graph, GraphPayload, NodeId};
use super::view_state::ViewState;
use super::viewport::Viewport;

const DEFAULT_SIZE: Vec2 = Vec2::new(800.0, 600.0);

/// What the panel currently shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapStatus {
	/// Nothing requested yet.
	Idle,
	/// A fetch is in flight.
	Loading,
	/// A graph is on the canvas.
	Ready,
	/// The query matched no nodes.
	Empty,
	/// The backend rejected the query.
	QueryFailed(String),
	/// The request or its decoding failed.
	TransportFailed(String),
}

impl MapStatus {
	/// Whether the canvas should be visible.
	pub fn shows_graph(&self) -> bool {
		matches!(self, Self::Ready | Self::Loading)
	}

	/// Placeholder text shown instead of the canvas.
	pub fn placeholder(&self) -> Option<String> {
		match self {
			Self::Idle => Some("Set the UID of device or component".to_owned()),
			Self::Empty => Some("No data for this selection".to_owned()),
			Self::QueryFailed(msg) | Self::TransportFailed(msg) => Some(msg.clone()),
			Self::Loading | Self::Ready => None,
		}
	}
}

/// Requests for the host page.
#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
	/// Open the page for a clicked node.
	Navigate {
		/// Locator of the node.
		locator: String,
		/// Resolved page.
		url: String,
	},
	/// Open the context menu for a node.
	ContextMenu(ContextRequest),
	/// Push `fragment` onto the location history.
	HistoryPush {
		/// Encoded view state.
		fragment: String,
	},
	/// Show the detail overlay for `locator` near `at`.
	Inspect {
		/// Locator of the node.
		locator: String,
		/// Screen point of the request.
		at: Vec2,
	},
	/// Open the page for a node in a new browsing context.
	OpenInNewContext {
		/// Locator of the node.
		locator: String,
		/// Resolved page.
		url: String,
	},
	/// A user visible message.
	Notice(String),
}

/// State and behavior of one map panel.
pub struct MapPanel {
	config: MapConfig,
	sync: ViewSync,
	simulation: ForceSimulation,
	scene: Scene,
	viewport: Viewport,
	router: InteractionRouter,
	status: MapStatus,
	size: Vec2,
}

impl MapPanel {
	/// An idle panel with nothing requested.
	pub fn new(config: MapConfig) -> Self {
		let params = ForceParams::from_repulsion(config.initial_repulsion());
		Self {
			sync: ViewSync::new(config.panel_token.clone(), config.debounce_ms),
			simulation: ForceSimulation::new(params, DEFAULT_SIZE * 0.5),
			scene: Scene::new(config.scene_style()),
			viewport: config.viewport(),
			router: InteractionRouter::new(config.device_prefix.clone()),
			status: MapStatus::Idle,
			size: DEFAULT_SIZE,
			config,
		}
	}

	/// Settings the panel was built with.
	pub fn config(&self) -> &MapConfig {
		&self.config
	}

	/// Current status.
	pub fn status(&self) -> &MapStatus {
		&self.status
	}

	/// Elements to draw.
	pub fn scene(&self) -> &Scene {
		&self.scene
	}

	/// Pan and zoom state.
	pub fn viewport(&self) -> &Viewport {
		&self.viewport
	}

	/// Force layout.
	pub fn simulation(&self) -> &ForceSimulation {
		&self.simulation
	}

	/// Current selection.
	pub fn view_state(&self) -> &ViewState {
		self.sync.state()
	}

	/// Encoded selection, once one was applied.
	pub fn fragment(&self) -> Option<&str> {
		self.sync.fragment()
	}

	/// Node under the pointer.
	pub fn hovered(&self) -> Option<&NodeId> {
		self.router.hovered()
	}

	/// Canvas size in pixels.
	pub fn size(&self) -> Vec2 {
		self.size
	}

	/// Applies a state edited through the controls.
	pub fn apply(&mut self, state: ViewState, now_ms: f64) -> Option<MapEvent> {
		match self.sync.apply(state, now_ms) {
			Applied::Changed { fragment } => Some(MapEvent::HistoryPush { fragment }),
			Applied::Unchanged => None,
		}
	}

	/// Follows a location change. Returns whether the selection changed.
	pub fn on_location_change(&mut self, fragment: &str, now_ms: f64) -> bool {
		self.sync.on_location_change(fragment, now_ms)
	}

	/// Keeps every other setting and moves the map root.
	pub fn re_root(&mut self, root_id: &str, now_ms: f64) -> Option<MapEvent> {
		let state = self.sync.state().with_root(root_id);
		self.apply(state, now_ms)
	}

	/// Fetches the current state again without a history entry.
	pub fn refresh(&mut self, now_ms: f64) {
		self.sync.refresh(now_ms);
	}

	/// Returns the fetch to start now, if one is due.
	pub fn poll_fetch(&mut self, now_ms: f64) -> Option<FetchTicket> {
		let ticket = self.sync.poll(now_ms)?;
		self.status = MapStatus::Loading;
		Some(ticket)
	}

	/// Takes a fetch result. Results of superseded requests are dropped and
	/// `false` is returned.
	pub fn receive(
		&mut self,
		token: RequestToken,
		result: Result<GraphPayload, LoadError>,
		now_ms: f64,
	) -> bool {
		if !self.sync.accept(token) {
			warn!("discarding stale response {token:?}");
			return false;
		}
		let payload = match result {
			Ok(payload) => payload,
			Err(LoadError::Query(msg)) => {
				self.simulation.stop();
				self.status = MapStatus::QueryFailed(msg);
				return true;
			}
			Err(err) => {
				self.simulation.stop();
				self.status = MapStatus::TransportFailed(err.to_string());
				return true;
			}
		};
		if let Some(msg) = payload.error.as_deref().filter(|msg| !msg.is_empty()) {
			self.simulation.stop();
			self.status = MapStatus::QueryFailed(msg.to_owned());
			return true;
		}

		let graph = Graph::from_payload(payload);
		self.show(&graph, now_ms);
		true
	}

	fn show(&mut self, graph: &Graph, now_ms: f64) -> ReconcileReport {
		self.simulation.set_graph(graph);
		let report = self.scene.reconcile(graph);
		if graph.is_empty() {
			self.simulation.stop();
			self.status = MapStatus::Empty;
			return report;
		}
		self.scene.sync_positions(self.simulation.frame());
		self.viewport.center(now_ms);
		self.status = MapStatus::Ready;
		info!("network map: {} nodes, {} links", graph.nodes.len(), graph.links.len());
		report
	}

	/// Advances the viewport transition and the simulation by one frame.
	/// Returns whether anything moved.
	pub fn frame(&mut self, now_ms: f64) -> bool {
		let moved_view = self.viewport.advance(now_ms);
		let scene = &mut self.scene;
		let moved_nodes = self.simulation.tick_with(|frame| scene.sync_positions(frame));
		moved_view || moved_nodes
	}

	/// Pointer pressed at screen point `at`.
	pub fn pointer_down(&mut self, at: Vec2, button: PointerButton) -> Option<MapEvent> {
		let event = self.router.pointer_down(&self.scene, &mut self.viewport, at, button)?;
		self.handle(event)
	}

	/// Pointer moved to screen point `at`.
	pub fn pointer_move(&mut self, at: Vec2) -> Option<MapEvent> {
		self.router.hover(&self.scene, &self.viewport, at);
		let event = self.router.pointer_move(&mut self.viewport, at)?;
		self.handle(event)
	}

	/// Pointer released at screen point `at`.
	pub fn pointer_up(&mut self, at: Vec2) -> Option<MapEvent> {
		let event = self.router.pointer_up(&mut self.viewport, at)?;
		self.handle(event)
	}

	/// Pointer lost, ending any gesture.
	pub fn pointer_cancel(&mut self) -> Option<MapEvent> {
		let event = self.router.pointer_cancel(&mut self.viewport)?;
		self.handle(event)
	}

	/// Zooms around `at`. Returns whether the scale changed.
	pub fn wheel(&mut self, at: Vec2, delta_y: f64) -> bool {
		self.router.wheel(&mut self.viewport, at, delta_y)
	}

	fn handle(&mut self, event: InteractionEvent) -> Option<MapEvent> {
		match event {
			InteractionEvent::Click { node } => self.navigate(&node),
			InteractionEvent::DragMoved { node, world } | InteractionEvent::DragEnded { node, world } => {
				self.pin(&node, world);
				None
			}
			InteractionEvent::Context(request) => Some(MapEvent::ContextMenu(request)),
		}
	}

	fn pin(&mut self, node: &NodeId, world: Vec2) {
		if self.simulation.pin(node, world) {
			self.scene.set_position(node, world);
			self.scene.set_fixed(node, true);
			self.scene.rebuild_paths();
			self.simulation.restart();
		}
	}

	fn navigate(&self, node: &NodeId) -> Option<MapEvent> {
		let element = self.scene.node(node)?;
		let Some(locator) = element.locator.clone() else {
			return Some(MapEvent::Notice(format!(
				"{} has no additional info attached.",
				element.label.full()
			)));
		};
		match self.config.resolve_locator(&locator) {
			Some(url) => Some(MapEvent::Navigate { locator, url }),
			None => Some(MapEvent::Notice(format!("{locator} has no additional info attached."))),
		}
	}

	/// Runs an entry of the context menu opened for `request`.
	pub fn context_action(
		&mut self,
		request: &ContextRequest,
		action: ContextAction,
		now_ms: f64,
	) -> Option<MapEvent> {
		if !request.is_enabled(action) {
			return None;
		}
		match action {
			ContextAction::TogglePin => {
				if self.simulation.is_fixed(&request.node) {
					self.simulation.unpin(&request.node);
					self.scene.set_fixed(&request.node, false);
				} else if let Some(position) = self.simulation.position(&request.node) {
					self.pin(&request.node, position);
				}
				None
			}
			ContextAction::ReRoot => {
				let root = request.locator.as_deref()?;
				self.re_root(root, now_ms)
			}
			ContextAction::OpenDetail => Some(MapEvent::Inspect {
				locator: request.locator.clone()?,
				at: request.at,
			}),
			ContextAction::OpenInNewContext => {
				let locator = request.locator.clone()?;
				match self.config.resolve_locator(&locator) {
					Some(url) => Some(MapEvent::OpenInNewContext { locator, url }),
					None => Some(MapEvent::Notice(format!("{locator} has no additional info attached."))),
				}
			}
		}
	}

	/// Moves the repulsion slider.
	pub fn set_repulsion(&mut self, value: f64) {
		self.simulation.set_repulsion(value);
	}

	/// Starts the animated center on the graph.
	pub fn center(&mut self, now_ms: f64) {
		self.viewport.center(now_ms);
	}

	/// Takes a new canvas size; empty sizes are ignored.
	pub fn resize(&mut self, width: f64, height: f64) {
		if width > 0.0 && height > 0.0 {
			self.size = Vec2::new(width, height);
			self.simulation.set_center(self.size * 0.5);
		}
	}

	/// Halts the simulation, e.g. when the view is hidden or dropped.
	pub fn stop(&mut self) {
		self.simulation.stop();
		self.router.pointer_cancel(&mut self.viewport);
	}
}
