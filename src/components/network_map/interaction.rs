//! Pointer gesture routing: node drag vs click vs context, background pan.

use super::geometry::Vec2;
use super::scene::Scene;
use super::types::NodeId;
use super::viewport::{Gesture, Viewport};

/// Screen distance a press may travel before it becomes a drag.
pub const DRAG_THRESHOLD: f64 = 3.0;
const WHEEL_ZOOM_IN: f64 = 1.1;
const WHEEL_ZOOM_OUT: f64 = 0.9;

/// Mouse button of a press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
	/// Usually the left button.
	Primary,
	/// Usually the right button; opens the context menu.
	Secondary,
	/// Anything else, ignored.
	Other,
}

impl PointerButton {
	/// Maps a DOM `MouseEvent.button` value.
	pub fn from_dom(button: i16) -> Self {
		match button {
			0 => Self::Primary,
			2 => Self::Secondary,
			_ => Self::Other,
		}
	}
}

/// Everything an external context menu needs to build itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextRequest {
	/// Node under the pointer.
	pub node: NodeId,
	/// Its resource path.
	pub locator: Option<String>,
	/// The node carries a resolvable locator.
	pub navigable: bool,
	/// The locator points at something the detail view can show.
	pub inspectable: bool,
	/// Pinned when the menu opened.
	pub fixed: bool,
	/// Pointer position in screen coordinates.
	pub at: Vec2,
}

/// Entries of the node context menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextAction {
	/// Pin the node where it is, or release it.
	TogglePin,
	/// Make the node the map root.
	ReRoot,
	/// Show the detail overlay.
	OpenDetail,
	/// Open the node's page in a new tab.
	OpenInNewContext,
}

impl ContextAction {
	/// Menu order.
	pub const ALL: [ContextAction; 4] = [
		Self::TogglePin,
		Self::ReRoot,
		Self::OpenDetail,
		Self::OpenInNewContext,
	];

	/// Menu caption; the pin entry depends on the node's state.
	pub fn label(self, fixed: bool) -> &'static str {
		match self {
			Self::TogglePin if fixed => "Unpin",
			Self::TogglePin => "Pin down",
			Self::ReRoot => "Put map center here",
			Self::OpenDetail => "Device info",
			Self::OpenInNewContext => "Open in new tab",
		}
	}
}

impl ContextRequest {
	/// Whether `action` applies to this node.
	pub fn is_enabled(&self, action: ContextAction) -> bool {
		match action {
			ContextAction::TogglePin => true,
			ContextAction::ReRoot | ContextAction::OpenInNewContext => self.navigable,
			ContextAction::OpenDetail => self.inspectable,
		}
	}
}

/// Outcome of a pointer gesture.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
	/// Press and release without crossing the drag threshold.
	Click {
		/// Node pressed.
		node: NodeId,
	},
	/// A dragged node moved to `world`.
	DragMoved {
		/// Node dragged.
		node: NodeId,
		/// New position in world space.
		world: Vec2,
	},
	/// The node should be pinned at `world`.
	DragEnded {
		/// Node dragged.
		node: NodeId,
		/// Drop position in world space.
		world: Vec2,
	},
	/// Secondary press on a node.
	Context(ContextRequest),
}

#[derive(Clone, Debug, Default, PartialEq)]
enum RouterState {
	#[default]
	Idle,
	Pressed {
		node: NodeId,
		origin: Vec2,
		/// Node position minus the pointer's world position at press time.
		grab: Vec2,
	},
	Dragging {
		node: NodeId,
		grab: Vec2,
		last: Vec2,
	},
	Panning {
		last: Vec2,
	},
}

/// Turns raw pointer input into [`InteractionEvent`]s and viewport gestures.
#[derive(Clone, Debug, Default)]
pub struct InteractionRouter {
	state: RouterState,
	hovered: Option<NodeId>,
	device_prefix: String,
}

impl InteractionRouter {
	/// `device_prefix` marks locators the detail view can show.
	pub fn new(device_prefix: impl Into<String>) -> Self {
		Self {
			device_prefix: device_prefix.into(),
			..Self::default()
		}
	}

	/// A node is being dragged.
	pub fn is_dragging(&self) -> bool {
		matches!(self.state, RouterState::Dragging { .. })
	}

	/// The background is being dragged.
	pub fn is_panning(&self) -> bool {
		matches!(self.state, RouterState::Panning { .. })
	}

	/// Node under the pointer, if any.
	pub fn hovered(&self) -> Option<&NodeId> {
		self.hovered.as_ref()
	}

	/// Starts a gesture at screen point `at`.
	pub fn pointer_down(
		&mut self,
		scene: &Scene,
		viewport: &mut Viewport,
		at: Vec2,
		button: PointerButton,
	) -> Option<InteractionEvent> {
		let world = viewport.screen_to_world(at);
		let hit = scene.node_at(world);
		match (button, hit) {
			(PointerButton::Secondary, Some(node)) => {
				self.state = RouterState::Idle;
				let locator = node.locator.clone();
				let navigable = locator.as_deref().is_some_and(|l| l.starts_with('/'));
				let inspectable = !self.device_prefix.is_empty()
					&& locator.as_deref().is_some_and(|l| l.starts_with(&self.device_prefix));
				Some(InteractionEvent::Context(ContextRequest {
					node: node.id.clone(),
					locator,
					navigable,
					inspectable,
					fixed: node.fixed,
					at,
				}))
			}
			(PointerButton::Primary, Some(node)) => {
				viewport.suspend();
				self.state = RouterState::Pressed {
					node: node.id.clone(),
					origin: at,
					grab: node.position - world,
				};
				None
			}
			(PointerButton::Primary, None) => {
				self.state = RouterState::Panning { last: at };
				None
			}
			_ => None,
		}
	}

	/// Continues a drag or pan, promoting a press past the threshold.
	pub fn pointer_move(&mut self, viewport: &mut Viewport, at: Vec2) -> Option<InteractionEvent> {
		let world = viewport.screen_to_world(at);
		match &mut self.state {
			RouterState::Idle => None,
			RouterState::Pressed { node, origin, grab } => {
				if origin.distance(at) <= DRAG_THRESHOLD {
					return None;
				}
				let (node, grab) = (node.clone(), *grab);
				let position = world + grab;
				self.state = RouterState::Dragging {
					node: node.clone(),
					grab,
					last: position,
				};
				Some(InteractionEvent::DragMoved { node, world: position })
			}
			RouterState::Dragging { node, grab, last } => {
				*last = world + *grab;
				Some(InteractionEvent::DragMoved {
					node: node.clone(),
					world: *last,
				})
			}
			RouterState::Panning { last } => {
				let delta = at - *last;
				*last = at;
				viewport.on_gesture(Gesture::Pan(delta));
				None
			}
		}
	}

	/// Ends the gesture: a click, the end of a drag, or nothing.
	pub fn pointer_up(&mut self, viewport: &mut Viewport, at: Vec2) -> Option<InteractionEvent> {
		let world = viewport.screen_to_world(at);
		let event = match std::mem::take(&mut self.state) {
			RouterState::Pressed { node, .. } => Some(InteractionEvent::Click { node }),
			RouterState::Dragging { node, grab, .. } => Some(InteractionEvent::DragEnded {
				node,
				world: world + grab,
			}),
			RouterState::Idle | RouterState::Panning { .. } => None,
		};
		viewport.resume();
		event
	}

	/// Pointer left the surface or the gesture was aborted. A running drag
	/// still ends at its last position; gestures are always resumed.
	pub fn pointer_cancel(&mut self, viewport: &mut Viewport) -> Option<InteractionEvent> {
		let event = match std::mem::take(&mut self.state) {
			RouterState::Dragging { node, last, .. } => {
				Some(InteractionEvent::DragEnded { node, world: last })
			}
			_ => None,
		};
		self.hovered = None;
		viewport.resume();
		event
	}

	/// Wheel zoom around the pointer. Returns whether the viewport changed.
	pub fn wheel(&mut self, viewport: &mut Viewport, at: Vec2, delta_y: f64) -> bool {
		if delta_y == 0.0 {
			return false;
		}
		let factor = if delta_y > 0.0 {
			WHEEL_ZOOM_OUT
		} else {
			WHEEL_ZOOM_IN
		};
		viewport.on_gesture(Gesture::Zoom { anchor: at, factor })
	}

	/// Tracks the node under the pointer. Returns whether it changed.
	pub fn hover(&mut self, scene: &Scene, viewport: &Viewport, at: Vec2) -> bool {
		if self.is_dragging() {
			return false;
		}
		let hovered = scene.node_at(viewport.screen_to_world(at)).map(|node| node.id.clone());
		if hovered == self.hovered {
			return false;
		}
		self.hovered = hovered;
		true
	}
}
