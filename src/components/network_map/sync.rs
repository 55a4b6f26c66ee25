//! Keeps the view state, the location fragment and the data fetch in step.
//!
//! Every change is first written to the fragment, which stays the
//! canonical copy. Fetches are debounced, so a burst of changes yields a
//! single request, and each request carries a [`RequestToken`] so a slow
//! response can never overwrite a newer one.

use log::debug;

use super::view_state::{ViewState, decode_fragment, encode_fragment};

/// Identity of one fetch. Later tokens compare greater.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Hands out tokens and remembers the latest.
#[derive(Clone, Debug, Default)]
pub struct RequestSequencer {
	latest: u64,
}

impl RequestSequencer {
	/// Token for a new request, superseding all earlier ones.
	pub fn begin(&mut self) -> RequestToken {
		self.latest += 1;
		RequestToken(self.latest)
	}

	/// Whether `token` is the latest handed out.
	pub fn is_current(&self, token: RequestToken) -> bool {
		token.0 == self.latest
	}
}

/// Outcome of [`ViewSync::apply`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
	/// Same fragment as before; nothing to push, nothing to fetch.
	Unchanged,
	/// The host should push `fragment` onto its history.
	Changed {
		/// Encoded new state.
		fragment: String,
	},
}

/// A fetch that is due now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
	/// Must be passed back with the response.
	pub token: RequestToken,
	/// State to query for.
	pub state: ViewState,
}

/// View state, fragment and fetch schedule of one panel.
#[derive(Clone, Debug)]
pub struct ViewSync {
	panel: String,
	debounce_ms: f64,
	state: ViewState,
	fragment: Option<String>,
	deadline: Option<f64>,
	sequencer: RequestSequencer,
}

impl ViewSync {
	/// Starts at the default state with nothing scheduled.
	pub fn new(panel: impl Into<String>, debounce_ms: f64) -> Self {
		Self {
			panel: panel.into(),
			debounce_ms: debounce_ms.max(0.0),
			state: ViewState::default(),
			fragment: None,
			deadline: None,
			sequencer: RequestSequencer::default(),
		}
	}

	/// Current state.
	pub fn state(&self) -> &ViewState {
		&self.state
	}

	/// Last fragment written or followed.
	pub fn fragment(&self) -> Option<&str> {
		self.fragment.as_deref()
	}

	/// Whether a fetch is scheduled.
	pub fn is_pending(&self) -> bool {
		self.deadline.is_some()
	}

	/// Applies a state coming from the controls.
	pub fn apply(&mut self, state: ViewState, now_ms: f64) -> Applied {
		let fragment = encode_fragment(&state, &self.panel);
		if self.fragment.as_deref() == Some(fragment.as_str()) {
			return Applied::Unchanged;
		}
		self.adopt(state, fragment.clone(), now_ms);
		Applied::Changed { fragment }
	}

	/// Follows a location change made outside the panel (back button, link,
	/// first load). Fragments of other panels and echoes of our own pushes
	/// are ignored. Returns whether the state changed.
	pub fn on_location_change(&mut self, fragment: &str, now_ms: f64) -> bool {
		let Some(state) = decode_fragment(fragment, &self.panel) else {
			debug!("ignoring fragment of another panel: {fragment}");
			return false;
		};
		let canonical = encode_fragment(&state, &self.panel);
		if self.fragment.as_deref() == Some(canonical.as_str()) {
			return false;
		}
		self.adopt(state, canonical, now_ms);
		true
	}

	/// Schedules a fetch of the current state without touching history.
	pub fn refresh(&mut self, now_ms: f64) {
		self.deadline = Some(now_ms + self.debounce_ms);
	}

	fn adopt(&mut self, state: ViewState, fragment: String, now_ms: f64) {
		self.state = state;
		self.fragment = Some(fragment);
		self.deadline = Some(now_ms + self.debounce_ms);
	}

	/// Hands out the fetch once the debounce window has passed.
	pub fn poll(&mut self, now_ms: f64) -> Option<FetchTicket> {
		match self.deadline {
			Some(deadline) if now_ms >= deadline => {
				self.deadline = None;
				let token = self.sequencer.begin();
				debug!("fetch {token:?} for {:?}", self.fragment);
				Some(FetchTicket {
					token,
					state: self.state.clone(),
				})
			}
			_ => None,
		}
	}

	/// Whether a response for `token` may still be shown.
	pub fn accept(&self, token: RequestToken) -> bool {
		self.sequencer.is_current(token)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const PANEL: &str = "deviceDetailNav:network_map";

	fn state(root: &str) -> ViewState {
		ViewState::default().with_root(root)
	}

	#[test]
	fn applying_the_same_state_twice_is_a_no_op() {
		let mut sync = ViewSync::new(PANEL, 250.0);
		assert!(matches!(sync.apply(state("sw1"), 0.0), Applied::Changed { .. }));
		assert!(sync.poll(300.0).is_some());
		assert_eq!(sync.apply(state("sw1"), 400.0), Applied::Unchanged);
		assert!(sync.poll(10_000.0).is_none());
	}

	#[test]
	fn bursts_are_coalesced_into_one_fetch() {
		let mut sync = ViewSync::new(PANEL, 250.0);
		sync.apply(state("a"), 0.0);
		sync.apply(state("b"), 100.0);
		sync.apply(state("c"), 200.0);
		assert!(sync.poll(300.0).is_none());
		let ticket = sync.poll(450.0).unwrap();
		assert_eq!(ticket.state.root_id, "c");
		assert!(sync.poll(1_000.0).is_none());
	}

	#[test]
	fn only_the_latest_token_is_accepted() {
		let mut sync = ViewSync::new(PANEL, 0.0);
		sync.apply(state("x"), 0.0);
		let x = sync.poll(0.0).unwrap().token;
		sync.apply(state("y"), 1.0);
		let y = sync.poll(1.0).unwrap().token;
		assert!(y > x);
		assert!(sync.accept(y));
		assert!(!sync.accept(x));
	}

	#[test]
	fn echoes_of_our_own_push_are_ignored() {
		let mut sync = ViewSync::new(PANEL, 0.0);
		let Applied::Changed { fragment } = sync.apply(state("sw1"), 0.0) else {
			panic!("expected a change");
		};
		sync.poll(0.0);
		assert!(!sync.on_location_change(&format!("#{fragment}"), 5.0));
		assert!(!sync.is_pending());

		assert!(sync.on_location_change(&format!("{PANEL}&root_id=sw2"), 6.0));
		assert_eq!(sync.state().root_id, "sw2");
		assert!(!sync.on_location_change("deviceDetailNav:events", 7.0));
		assert_eq!(sync.state().root_id, "sw2");
	}
}
