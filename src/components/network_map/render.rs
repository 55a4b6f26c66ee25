use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement, Path2d};

use super::palette::{NODE_RING, ROOT_RING};
use super::panel::MapPanel;
use super::scene::{DRAW_ORDER, LinkElement, NodeElement, SceneLayer};

const BACKGROUND: &str = "#ffffff";
const LABEL_COLOR: &str = "#222222";
const LABEL_FONT: &str = "11px sans-serif";
const ICON_SCALE: f64 = 1.2;

/// Node icons by URL, loaded on first use.
#[derive(Default)]
pub struct IconCache {
	images: HashMap<String, HtmlImageElement>,
}

impl IconCache {
	/// The image for `url` once it has finished loading.
	fn get(&mut self, url: &str) -> Option<&HtmlImageElement> {
		if !self.images.contains_key(url) {
			let image = HtmlImageElement::new().ok()?;
			image.set_src(url);
			self.images.insert(url.to_owned(), image);
		}
		self.images
			.get(url)
			.filter(|image| image.complete() && image.natural_width() > 0)
	}
}

pub fn render(panel: &MapPanel, ctx: &CanvasRenderingContext2d, icons: &mut IconCache) {
	let size = panel.size();
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, size.x, size.y);
	if !panel.status().shows_graph() {
		return;
	}

	let transform = panel.viewport().transform();
	ctx.save();
	let _ = ctx.translate(transform.translate.x, transform.translate.y);
	let _ = ctx.scale(transform.scale, transform.scale);
	for layer in DRAW_ORDER {
		match layer {
			SceneLayer::Links => panel.scene().links().iter().for_each(|link| draw_link(link, ctx)),
			SceneLayer::Nodes => {
				let hovered = panel.hovered();
				for node in panel.scene().nodes() {
					draw_node(node, hovered == Some(&node.id), ctx, icons);
				}
			}
		}
	}
	ctx.restore();
}

fn draw_link(link: &LinkElement, ctx: &CanvasRenderingContext2d) {
	let Some(path) = &link.path else {
		return;
	};
	let Ok(outline) = Path2d::new_with_path_string(&path.to_svg()) else {
		return;
	};
	ctx.set_fill_style_str(&link.color);
	ctx.fill_with_path_2d(&outline);
}

fn draw_node(node: &NodeElement, hovered: bool, ctx: &CanvasRenderingContext2d, icons: &mut IconCache) {
	let (x, y, r) = (node.position.x, node.position.y, node.radius);

	ctx.begin_path();
	let _ = ctx.arc(x, y, r, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&node.fill);
	ctx.fill();
	if node.highlighted {
		ctx.set_stroke_style_str(ROOT_RING);
		ctx.set_line_width(4.0);
	} else {
		ctx.set_stroke_style_str(NODE_RING);
		ctx.set_line_width(1.5);
	}
	ctx.stroke();

	if node.fixed {
		ctx.begin_path();
		let _ = ctx.arc(x, y, r + 3.0, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(NODE_RING);
		ctx.set_line_width(1.0);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(&JsValue::from_f64(2.0), &JsValue::from_f64(2.0)));
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}

	if let Some(image) = node.icon.as_deref().and_then(|url| icons.get(url)) {
		let side = r * ICON_SCALE;
		let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
			image,
			x - side / 2.0,
			y - side / 2.0,
			side,
			side,
		);
	}

	let label = if hovered {
		node.label.full()
	} else {
		node.label.short()
	};
	ctx.set_font(LABEL_FONT);
	ctx.set_text_align("center");
	ctx.set_fill_style_str(LABEL_COLOR);
	let _ = ctx.fill_text(label, x, y + r + 13.0);
}
