#[cfg(test)]
mod tests {
    use crate::dimensions::testing::MemoryStore;
    use crate::events::testing::RecordingSink;
    use crate::rewriter::ImageRewriter;
    use crate::settings::ResizerSettings;

    fn settings() -> ResizerSettings {
        ResizerSettings::new("https://example.com", "/var/www/html")
    }

    #[test]
    fn test_full_document_pass() {
        let settings = settings();
        let store = MemoryStore::new().with_image("/wp-content/uploads/hero.jpg", 2400, 1200);
        let sink = RecordingSink::new();
        let mut rewriter = ImageRewriter::new(&settings, &store, &sink);

        let html = r#"<!DOCTYPE html><html><head><style>.hero{background: url('/wp-content/uploads/hero.jpg')}</style></head>
<body>
<img src="/wp-content/uploads/a-300x200.jpg" width="300" height="200" srcset="/wp-content/uploads/a-300x200.jpg 300w, /wp-content/uploads/a-600x400.jpg 600w">
<img src="data:image/png;base64,iVBORw0KGgo=">
<img src="https://thirdparty.example.net/banner.png">
<video poster="/wp-content/uploads/cover-640x360.jpg"></video>
</body></html>"#;

        let after_html = rewriter.rewrite_html(html);
        let after_css = rewriter.rewrite_css_urls(&after_html);

        // local references rewritten
        assert!(after_css.contains("https://example.com/cdn-cgi/image/"));
        assert!(after_css.contains("width%3D300%2Cheight%3D200"));
        assert!(after_css.contains("width%3D640%2Cheight%3D360"));
        // srcset widths preserved per entry
        assert!(after_css.contains(" 300w, "));
        assert!(after_css.contains(" 600w"));
        // data URI and third-party image untouched
        assert!(after_css.contains("data:image/png;base64,iVBORw0KGgo="));
        assert!(after_css.contains("https://thirdparty.example.net/banner.png"));
        // background URL rewritten with the natural size clamped to max_width
        assert!(after_css.contains("width%3D1600%2Cheight%3D800"));
        assert_eq!(sink.max_size_events.get(), 1);
        assert!(sink.errors.borrow().is_empty());
    }

    #[test]
    fn test_cache_shared_across_html_and_css_scans() {
        let settings = settings();
        let store = MemoryStore::new().with_image("/wp-content/uploads/big.jpg", 3200, 1600);
        let sink = RecordingSink::new();
        let mut rewriter = ImageRewriter::new(&settings, &store, &sink);

        let html = r#"<html><head><style>div{background:url(/wp-content/uploads/big.jpg)}</style></head>
<body><img src="/wp-content/uploads/big.jpg"></body></html>"#;

        let after_html = rewriter.rewrite_html(html);
        let after = rewriter.rewrite_css_urls(&after_html);
        // both scans resolved the same (path, 0, 0) key; the clamp fired once
        assert_eq!(sink.max_size_events.get(), 1);
        assert_eq!(after.matches("/cdn-cgi/image/").count(), 2);
    }

    #[test]
    fn test_already_optimized_document_is_stable() {
        let settings = settings();
        let store = MemoryStore::new();
        let sink = RecordingSink::new();
        let mut rewriter = ImageRewriter::new(&settings, &store, &sink);

        let html = r#"<html><head></head><body><img src="/wp-content/uploads/a-20x10.gif"></body></html>"#;
        let first = rewriter.rewrite_html(html);
        assert!(first.contains("/cdn-cgi/image/"));

        // a second pass over already-rewritten output changes nothing
        let mut second_pass = ImageRewriter::new(&settings, &store, &sink);
        assert_eq!(second_pass.rewrite_html(&first), first);
        assert_eq!(second_pass.rewrite_count(), 0);
    }

    #[test]
    fn test_disabled_extension_not_rewritten() {
        let mut settings = settings();
        settings.image_types.remove("svg");
        let store = MemoryStore::new();
        let sink = RecordingSink::new();
        let mut rewriter = ImageRewriter::new(&settings, &store, &sink);

        let html = r#"<html><head></head><body><img src="/wp-content/uploads/logo.svg"></body></html>"#;
        assert_eq!(rewriter.rewrite_html(html), html);
    }

    #[test]
    fn test_cross_origin_css_reference_passes_through() {
        let settings = settings();
        let store = MemoryStore::new();
        let sink = RecordingSink::new();
        let mut rewriter = ImageRewriter::new(&settings, &store, &sink);

        let css = "div{background-image: url(https://cdn.elsewhere.io/bg.png)}";
        assert_eq!(rewriter.rewrite_css_urls(css), css);
    }
}
