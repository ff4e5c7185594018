//! Markup rewriter
//! Parses HTML into an rcdom tree, rewrites src/poster/srcset attributes in
//! place, and serializes back. When nothing needed rewriting the original
//! string is returned untouched.

use html5ever::interface::Attribute;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::TendrilSink;
use html5ever::{namespace_url, ns, parse_document, LocalName, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::classifier::{is_local_resource, is_optimized_image, is_valid_image};
use crate::path_resolver::extract_path;
use crate::rewriter::{ImageRewriter, RewriteOutcome};

pub(crate) fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    if let NodeData::Element { ref attrs, .. } = node.data {
        for attr in attrs.borrow().iter() {
            if attr.name.local.as_ref() == attr_name {
                return Some(attr.value.to_string());
            }
        }
    }
    None
}

pub(crate) fn set_node_attr(node: &Handle, attr_name: &str, value: &str) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        let mut attrs = attrs.borrow_mut();
        for attr in attrs.iter_mut() {
            if attr.name.local.as_ref() == attr_name {
                attr.value = value.into();
                return;
            }
        }
        attrs.push(Attribute {
            name: QualName::new(None, ns!(), LocalName::from(attr_name)),
            value: value.into(),
        });
    }
}

impl ImageRewriter<'_> {
    /// Rewrite img src, video poster, and img srcset references in a
    /// document. Parse or serialize failure returns the input unchanged;
    /// so does a document with nothing to rewrite.
    pub fn rewrite_html(&mut self, html: &str) -> String {
        let mut input = html.as_bytes();
        let dom = match parse_document(RcDom::default(), ParseOpts::default())
            .from_utf8()
            .read_from(&mut input)
        {
            Ok(dom) => dom,
            Err(e) => {
                tracing::debug!("HTML parse failed, returning input unchanged: {}", e);
                return html.to_string();
            }
        };

        let mut changed = false;
        self.rewrite_node(&dom.document, &mut changed);

        if !changed {
            return html.to_string();
        }

        let mut out = Vec::new();
        let document: SerializableHandle = dom.document.clone().into();
        match serialize(&mut out, &document, SerializeOpts::default()) {
            Ok(()) => String::from_utf8(out).unwrap_or_else(|_| html.to_string()),
            Err(e) => {
                tracing::warn!("HTML serialization failed, returning input unchanged: {}", e);
                html.to_string()
            }
        }
    }

    fn rewrite_node(&mut self, node: &Handle, changed: &mut bool) {
        if let NodeData::Element { ref name, .. } = node.data {
            match name.local.as_ref() {
                "img" => {
                    if self.rewrite_element(node, "src", true) {
                        *changed = true;
                    }
                }
                "video" => {
                    if self.rewrite_element(node, "poster", false) {
                        *changed = true;
                    }
                }
                _ => {}
            }
        }

        for child in node.children.borrow().iter() {
            self.rewrite_node(child, changed);
        }
    }

    /// Rewrite one element's source attribute (and srcset for images).
    /// Returns whether anything was mutated.
    fn rewrite_element(&mut self, node: &Handle, src_name: &str, with_srcset: bool) -> bool {
        let Some(src) = get_node_attr(node, src_name) else {
            return false;
        };
        if src.is_empty()
            || !is_local_resource(self.settings, &src)
            || is_optimized_image(&src)
            || !is_valid_image(self.settings, &src)
        {
            return false;
        }

        let width = get_node_attr(node, "width").and_then(|v| v.trim().parse::<u32>().ok());
        let height = get_node_attr(node, "height").and_then(|v| v.trim().parse::<u32>().ok());
        // height alone is not enough to size the transform
        let (width, height) = match (width, height) {
            (Some(w), Some(h)) => (Some(w), Some(h)),
            (Some(w), None) => (Some(w), None),
            _ => (None, None),
        };

        let cf_url = match self.rewrite_reference(&src, width, height, "dom") {
            RewriteOutcome::Rewritten(url) => url,
            RewriteOutcome::Skipped => return false,
            RewriteOutcome::Failed(reason) => {
                self.events.rewrite_error("dom", &src, &reason);
                return false;
            }
        };
        set_node_attr(node, src_name, &cf_url);

        if with_srcset {
            if let Some(srcset) = get_node_attr(node, "srcset") {
                if !srcset.is_empty() {
                    let rewritten = self.rewrite_srcset(&srcset);
                    set_node_attr(node, "srcset", &rewritten);
                }
            }
        }

        true
    }

    /// Rewrite a srcset attribute value entry by entry. A malformed
    /// descriptor stops processing of the remaining entries; whatever was
    /// already rewritten is kept.
    fn rewrite_srcset(&mut self, srcset: &str) -> String {
        let mut entries: Vec<String> = Vec::new();

        for source in srcset.split(',') {
            let mut parts = source.split_whitespace();
            let (Some(entry_url), Some(width_descriptor)) = (parts.next(), parts.next()) else {
                break;
            };
            let Ok(entry_width) = width_descriptor.trim_end_matches('w').parse::<u32>() else {
                break;
            };

            let entry_path = extract_path(self.settings, entry_url);
            if entry_path.is_empty() {
                continue;
            }
            let cf_url = self.cloudflare_uri(&entry_path, Some(entry_width), None, "dom");
            entries.push(format!("{} {}w", cf_url, entry_width));
        }

        entries.join(", ")
    }
}
