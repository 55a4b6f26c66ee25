use leptos::prelude::*;

use super::palette::LEGEND;

/// Static color key: severity tiers and the map root.
#[component]
pub fn Legend() -> impl IntoView {
	view! {
		<ul class="network-map-legend">
			{LEGEND
				.iter()
				.map(|(color, label)| {
					view! {
						<li>
							<span class="swatch" style=format!("background-color: {color};") />
							{*label}
						</li>
					}
				})
				.collect_view()}
		</ul>
	}
}
