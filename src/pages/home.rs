use leptos::prelude::*;

use crate::components::network_map::NetworkMap;

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="network-map-page">
				<h1>"Network Map"</h1>
				<p class="subtitle">
					"Click a node to open it, right-click for more. Drag nodes to pin them. Scroll to zoom."
				</p>
				<NetworkMap />
			</div>
		</ErrorBoundary>
	}
}
