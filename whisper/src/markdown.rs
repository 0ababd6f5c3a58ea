use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

/// Render model output to HTML for display.
///
/// Raw HTML in the source is emitted as escaped text, never as markup. Link
/// and image targets other than http(s), mailto or relative paths become `#`.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });
    let mut html_output = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut html_output, parser);
    html_output
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let trimmed = url.trim();
    let allowed = match trimmed.find(':') {
        None => true,
        // a colon after a path, query or fragment start is not a scheme
        Some(i) if trimmed[..i].contains(['/', '?', '#']) => true,
        Some(i) => matches!(trimmed[..i].to_ascii_lowercase().as_str(), "http" | "https" | "mailto"),
    };
    if allowed {
        url
    } else {
        CowStr::Borrowed("#")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_renders_nothing() {
        assert!(render_markdown("").is_empty());
    }

    #[test]
    fn headings_lists_and_emphasis() {
        let out = render_markdown("# Bakery Site\n\n- **Menu** page\n- *Order* form");
        assert!(out.contains("<h1>Bakery Site</h1>"));
        assert!(out.contains("<ul>"));
        assert!(out.contains("<strong>Menu</strong>"));
        assert!(out.contains("<em>Order</em>"));
    }

    #[test]
    fn tables_are_enabled() {
        let out = render_markdown("| Page | Goal |\n|---|---|\n| Home | Sell |");
        assert!(out.contains("<table>"));
        assert!(out.contains("<td>Home</td>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let out = render_markdown("<script>alert(1)</script>\n\nhi <b>there</b>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
        assert!(!out.contains("<b>"));
    }

    #[test]
    fn script_link_targets_are_neutralized() {
        let out = render_markdown(
            "[menu](javascript:alert(1)) [x](JavaScript:void(0)) ![img](data:text/html,hi) [site](https://bakery.example/menu) [top](#order)",
        );
        assert!(!out.to_ascii_lowercase().contains("javascript:"));
        assert!(!out.contains("data:"));
        assert!(out.contains(r##"<a href="#">menu</a>"##));
        assert!(out.contains(r#"href="https://bakery.example/menu""#));
        assert!(out.contains(r##"href="#order""##));
    }
}
