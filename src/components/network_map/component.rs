use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, error};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Event, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::config::{MapConfig, load_config};
use super::fetch::{GraphQuery, LayerGroups, fetch_graph, fetch_layer_options, group_layer_options};
use super::geometry::Vec2;
use super::interaction::{ContextAction, ContextRequest, PointerButton};
use super::legend::Legend;
use super::panel::{MapEvent, MapPanel, MapStatus};
use super::render::{self, IconCache};
use super::sync::FetchTicket;
use super::types::LayerOption;
use super::view_state::{ViewState, parse_depth};

fn now_ms() -> f64 {
	web_sys::window()
		.and_then(|window| window.performance())
		.map(|performance| performance.now())
		.unwrap_or(0.0)
}

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Vec2> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Vec2::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Sizes the canvas to its container.
fn fit_canvas(canvas: &HtmlCanvasElement) -> (f64, f64) {
	let (w, h) = canvas
		.parent_element()
		.map(|parent| (parent.client_width() as f64, parent.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0));
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);
	(w, h)
}

/// Where map events end up: the context menu and notice live in this
/// component, everything else goes to the host or the browser.
#[derive(Clone, Copy)]
struct Sinks {
	notice: RwSignal<Option<String>>,
	menu: RwSignal<Option<ContextRequest>>,
	on_event: Option<Callback<MapEvent>>,
}

impl Sinks {
	fn dispatch(self, event: MapEvent) {
		match &event {
			MapEvent::ContextMenu(request) => return self.menu.set(Some(request.clone())),
			MapEvent::Notice(msg) => return self.notice.set(Some(msg.clone())),
			_ => {}
		}
		if let Some(on_event) = self.on_event {
			on_event.run(event);
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		let result = match event {
			MapEvent::Navigate { url, .. } => window.location().set_href(&url),
			MapEvent::OpenInNewContext { url, .. } => window.open_with_url_and_target(&url, "_blank").map(|_| ()),
			MapEvent::HistoryPush { fragment } => window.location().set_hash(&fragment),
			other => {
				debug!("unhandled map event {other:?}");
				Ok(())
			}
		};
		if let Err(err) = result {
			error!("map event failed: {err:?}");
		}
	}
}

fn start_fetch(panel: Rc<RefCell<MapPanel>>, ticket: FetchTicket, endpoint: String) {
	spawn_local(async move {
		let query = GraphQuery::from_state(&ticket.state);
		let result = fetch_graph(&endpoint, &query).await;
		panel.borrow_mut().receive(ticket.token, result, now_ms());
	});
}

/// Interactive network map with its controls and legend.
#[component]
pub fn NetworkMap(
	/// Read from the host page when absent.
	#[prop(optional)]
	config: Option<MapConfig>,
	/// Receives navigation, history and detail requests. Without it the
	/// browser location is used.
	#[prop(optional)]
	on_event: Option<Callback<MapEvent>>,
) -> impl IntoView {
	let config = config.unwrap_or_else(load_config);
	let panel = Rc::new(RefCell::new(MapPanel::new(config.clone())));
	let icons = Rc::new(RefCell::new(IconCache::default()));
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let alive = Arc::new(AtomicBool::new(true));

	let status = RwSignal::new(MapStatus::Idle);
	let readout = RwSignal::new(panel.borrow().viewport().readout().to_owned());
	let form = RwSignal::new(ViewState::default());
	let layer_groups = RwSignal::new(LayerGroups::default());
	let repulsion = RwSignal::new(config.initial_repulsion());
	let edits = RwSignal::new(None::<ViewState>);
	let actions = RwSignal::new(None::<(ContextRequest, ContextAction)>);
	let sinks = Sinks {
		notice: RwSignal::new(None),
		menu: RwSignal::new(None),
		on_event,
	};
	let (notice, menu) = (sinks.notice, sinks.menu);

	let alive_cleanup = alive.clone();
	on_cleanup(move || alive_cleanup.store(false, Ordering::Relaxed));

	let layers_endpoint = config.layers_endpoint.clone();
	spawn_local(async move {
		match fetch_layer_options(&layers_endpoint).await {
			Ok(options) => layer_groups.set(group_layer_options(options)),
			Err(err) => notice.set(Some(err.to_string())),
		}
	});

	let panel_edit = panel.clone();
	Effect::new(move |_| {
		let Some(state) = edits.get() else {
			return;
		};
		let event = panel_edit.borrow_mut().apply(state, now_ms());
		form.set(panel_edit.borrow().view_state().clone());
		if let Some(event) = event {
			sinks.dispatch(event);
		}
	});

	let panel_action = panel.clone();
	Effect::new(move |_| {
		let Some((request, action)) = actions.get() else {
			return;
		};
		let event = panel_action.borrow_mut().context_action(&request, action, now_ms());
		form.set(panel_action.borrow().view_state().clone());
		if let Some(event) = event {
			sinks.dispatch(event);
		}
	});

	let (panel_init, icons_init, alive_init) = (panel.clone(), icons.clone(), alive.clone());
	let graph_endpoint = config.graph_endpoint.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			error!("network map: no 2d canvas context");
			return;
		};
		let (w, h) = fit_canvas(&canvas);
		panel_init.borrow_mut().resize(w, h);

		let (panel_resize, canvas_resize) = (panel_init.clone(), canvas.clone());
		let resize_cb: Closure<dyn FnMut()> = Closure::new(move || {
			let (w, h) = fit_canvas(&canvas_resize);
			panel_resize.borrow_mut().resize(w, h);
		});
		let _ = window.add_event_listener_with_callback("resize", resize_cb.as_ref().unchecked_ref());

		let panel_hash = panel_init.clone();
		let on_hash = move || {
			let hash = web_sys::window()
				.and_then(|window| window.location().hash().ok())
				.unwrap_or_default();
			let mut panel = panel_hash.borrow_mut();
			if panel.on_location_change(&hash, now_ms()) {
				form.set(panel.view_state().clone());
			}
		};
		on_hash();
		let hash_cb: Closure<dyn FnMut()> = Closure::new(on_hash);
		let _ = window.add_event_listener_with_callback("hashchange", hash_cb.as_ref().unchecked_ref());

		let listeners = Rc::new(RefCell::new(Some((resize_cb, hash_cb))));
		let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
		let animate_inner = animate.clone();
		let (panel_anim, icons_anim, alive_anim) = (panel_init.clone(), icons_init.clone(), alive_init.clone());
		let endpoint = graph_endpoint.clone();
		*animate.borrow_mut() = Some(Closure::new(move || {
			let Some(window) = web_sys::window() else {
				return;
			};
			if !alive_anim.load(Ordering::Relaxed) {
				panel_anim.borrow_mut().stop();
				if let Some((resize_cb, hash_cb)) = listeners.borrow_mut().take() {
					let _ = window.remove_event_listener_with_callback("resize", resize_cb.as_ref().unchecked_ref());
					let _ = window.remove_event_listener_with_callback("hashchange", hash_cb.as_ref().unchecked_ref());
				}
				// The closure owns `animate_inner`; free it once this call has returned.
				let slot = animate_inner.clone();
				spawn_local(async move {
					let _ = slot.borrow_mut().take();
				});
				return;
			}

			let now = now_ms();
			let ticket = panel_anim.borrow_mut().poll_fetch(now);
			if let Some(ticket) = ticket {
				start_fetch(panel_anim.clone(), ticket, endpoint.clone());
			}
			{
				let mut panel = panel_anim.borrow_mut();
				panel.frame(now);
				render::render(&panel, &ctx, &mut icons_anim.borrow_mut());
				if status.with_untracked(|current| current != panel.status()) {
					status.set(panel.status().clone());
				}
				if readout.with_untracked(|current| current != panel.viewport().readout()) {
					readout.set(panel.viewport().readout().to_owned());
				}
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let panel_md = panel.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(at) = pointer(canvas_ref, &ev) else {
			return;
		};
		let button = PointerButton::from_dom(ev.button());
		if button == PointerButton::Primary {
			menu.set(None);
		}
		let event = panel_md.borrow_mut().pointer_down(at, button);
		if let Some(event) = event {
			sinks.dispatch(event);
		}
	};

	let panel_mm = panel.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(at) = pointer(canvas_ref, &ev) else {
			return;
		};
		let event = panel_mm.borrow_mut().pointer_move(at);
		if let Some(event) = event {
			sinks.dispatch(event);
		}
	};

	let panel_mu = panel.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some(at) = pointer(canvas_ref, &ev) else {
			return;
		};
		let event = panel_mu.borrow_mut().pointer_up(at);
		if let Some(event) = event {
			sinks.dispatch(event);
		}
	};

	let panel_ml = panel.clone();
	let on_mouseleave = move |_: MouseEvent| {
		let event = panel_ml.borrow_mut().pointer_cancel();
		if let Some(event) = event {
			sinks.dispatch(event);
		}
	};

	let panel_wh = panel.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some(at) = pointer(canvas_ref, &ev) {
			panel_wh.borrow_mut().wheel(at, ev.delta_y());
		}
	};

	let panel_rp = panel.clone();
	let on_repulsion = move |ev: Event| {
		let Ok(value) = event_target_value(&ev).parse::<f64>() else {
			return;
		};
		repulsion.set(value);
		panel_rp.borrow_mut().set_repulsion(value);
	};

	let panel_center = panel.clone();
	let on_center = move |_: MouseEvent| panel_center.borrow_mut().center(now_ms());

	let panel_refresh = panel.clone();
	let on_refresh = move |_: MouseEvent| panel_refresh.borrow_mut().refresh(now_ms());

	let edit = move |change: &dyn Fn(&mut ViewState)| {
		let mut state = form.get_untracked();
		change(&mut state);
		edits.set(Some(state));
	};

	let layer_box = move |option: LayerOption| {
		let (value, checked) = (option.value.clone(), option.value);
		view! {
			<label class="network-map-layer">
				<input
					type="checkbox"
					prop:checked=move || form.with(|state| state.layers.contains(&checked))
					on:change=move |_| {
						let known: Vec<String> = layer_groups
							.with_untracked(|groups| groups.values().map(str::to_owned).collect());
						edit(&|state: &mut ViewState| state.layers.toggle(&value, known.iter().map(String::as_str)));
					}
				/>
				{option.label}
			</label>
		}
	};

	let (min_repulsion, max_repulsion) = config.repulsion_range;

	view! {
		<div class="network-map">
			<form class="network-map-controls" on:submit=|ev| ev.prevent_default()>
				<input
					type="text"
					placeholder="UID of device or component"
					prop:value=move || form.with(|state| state.root_id.clone())
					on:change=move |ev| {
						let root = event_target_value(&ev).trim().to_owned();
						edit(&|state: &mut ViewState| state.root_id.clone_from(&root));
					}
				/>
				<label>
					"Depth "
					<input
						type="number"
						min="1"
						max="15"
						prop:value=move || form.with(|state| state.depth.to_string())
						on:change=move |ev| {
							let depth = parse_depth(Some(&event_target_value(&ev)));
							edit(&|state: &mut ViewState| state.depth = depth);
						}
					/>
				</label>
				<label>
					<input
						type="checkbox"
						prop:checked=move || form.with(|state| state.show_macs)
						on:change=move |ev| {
							let on = event_target_checked(&ev);
							edit(&|state: &mut ViewState| state.show_macs = on);
						}
					/>
					"Show MAC addresses"
				</label>
				<label>
					<input
						type="checkbox"
						prop:checked=move || form.with(|state| state.show_dangling)
						on:change=move |ev| {
							let on = event_target_checked(&ev);
							edit(&|state: &mut ViewState| state.show_dangling = on);
						}
					/>
					"Show dangling connections"
				</label>
				<fieldset class="network-map-layers">
					<legend>"Layers"</legend>
					{move || {
						let groups = layer_groups.get();
						view! {
							{groups.plain.into_iter().map(layer_box).collect_view()}
							{(!groups.vlans.is_empty())
								.then(|| {
									view! {
										<h4>"VLANs"</h4>
										{groups.vlans.into_iter().map(layer_box).collect_view()}
									}
								})}
							{(!groups.vxlans.is_empty())
								.then(|| {
									view! {
										<h4>"VXLANs"</h4>
										{groups.vxlans.into_iter().map(layer_box).collect_view()}
									}
								})}
						}
					}}
				</fieldset>
				<label>
					"Repulsion "
					<input
						type="range"
						min=min_repulsion.to_string()
						max=max_repulsion.to_string()
						prop:value=move || repulsion.get().to_string()
						on:input=on_repulsion
					/>
				</label>
				<button type="button" on:click=on_refresh>"Refresh"</button>
				<button type="button" on:click=on_center>"Center"</button>
				<span class="network-map-scale">{move || readout.get()}</span>
			</form>

			<div class="network-map-surface">
				<canvas
					node_ref=canvas_ref
					class="network-map-canvas"
					style:display=move || if status.with(MapStatus::shows_graph) { "block" } else { "none" }
					on:mousedown=on_mousedown
					on:mousemove=on_mousemove
					on:mouseup=on_mouseup
					on:mouseleave=on_mouseleave
					on:wheel=on_wheel
					on:contextmenu=|ev: MouseEvent| ev.prevent_default()
				/>
				{move || {
					status
						.with(MapStatus::placeholder)
						.map(|text| view! { <div class="network-map-placeholder">{text}</div> })
				}}
				{move || {
					menu.get()
						.map(|request| {
							let style = format!("left: {}px; top: {}px;", request.at.x, request.at.y);
							let items = ContextAction::ALL
								.into_iter()
								.map(|action| {
									let enabled = request.is_enabled(action);
									let chosen = request.clone();
									view! {
										<li
											class:disabled=!enabled
											on:click=move |_| {
												if enabled {
													actions.set(Some((chosen.clone(), action)));
												}
												menu.set(None);
											}
										>
											{action.label(request.fixed)}
										</li>
									}
								})
								.collect_view();
							view! { <ul class="network-map-menu" style=style>{items}</ul> }
						})
				}}
				{move || {
					notice.get()
						.map(|msg| {
							view! {
								<div class="network-map-notice" on:click=move |_| notice.set(None)>
									{msg}
								</div>
							}
						})
				}}
			</div>

			<Legend />
		</div>
	}
}
