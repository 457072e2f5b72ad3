//! Lightweight regex-driven HTML reading for Apple's documentation pages.
//!
//! The pages are server-rendered and regular enough that a handful of
//! tag-level patterns recover everything the extractors need: anchors,
//! headings, paragraphs, class-selected blocks and the `<main>` region.

use once_cell::sync::Lazy;
use regex::Regex;

static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap());
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});
static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h([1-4])\b[^>]*>(.*?)</h[1-4]\s*>").unwrap());
static PARAGRAPH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").unwrap());
static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)</li\s*>").unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());
static LINK_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link\b([^>]*)>").unwrap());
static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->").unwrap()
});
static BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static NUMERIC_ENTITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Parsed attribute list of an opening tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn parse(raw: &str) -> Self {
        let attrs = ATTR_RE
            .captures_iter(raw)
            .map(|cap| {
                let name = cap[1].to_lowercase();
                let value = cap
                    .get(2)
                    .or_else(|| cap.get(3))
                    .or_else(|| cap.get(4))
                    .map(|m| decode_entities(m.as_str()))
                    .unwrap_or_default();
                (name, value)
            })
            .collect();
        Self(attrs)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn has_all_classes(&self, classes: &[&str]) -> bool {
        classes.iter().all(|c| self.has_class(c))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
    pub attrs: Attributes,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A balanced element: its attributes, inner HTML and byte span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    pub attrs: Attributes,
    pub inner: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Every `<a href>` in `html`, with visible text.
pub fn anchors(html: &str) -> Vec<Anchor> {
    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|cap| {
            let attrs = Attributes::parse(&cap[1]);
            let href = attrs.get("href")?.trim().to_string();
            if href.is_empty() {
                return None;
            }
            Some(Anchor {
                href,
                text: text_of(&cap[2]),
                offset: cap.get(0).map(|m| m.start()).unwrap_or(0),
                attrs,
            })
        })
        .collect()
}

/// h1–h4 headings in document order.
pub fn headings(html: &str) -> Vec<Heading> {
    HEADING_RE
        .captures_iter(html)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let level = cap[1].parse().ok()?;
            Some(Heading {
                level,
                text: text_of(&cap[2]),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Paragraph texts with the byte offset at which each paragraph starts.
pub fn paragraphs(html: &str) -> Vec<(usize, String)> {
    PARAGRAPH_RE
        .captures_iter(html)
        .filter_map(|cap| {
            let start = cap.get(0)?.start();
            let text = text_of(&cap[1]);
            (!text.is_empty()).then_some((start, text))
        })
        .collect()
}

pub fn list_items(html: &str) -> Vec<String> {
    LIST_ITEM_RE
        .captures_iter(html)
        .map(|cap| text_of(&cap[1]))
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn page_title(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .map(|cap| text_of(&cap[1]))
        .filter(|t| !t.is_empty())
}

pub fn canonical_url(html: &str) -> Option<String> {
    LINK_TAG_RE.captures_iter(html).find_map(|cap| {
        let attrs = Attributes::parse(&cap[1]);
        if attrs.get("rel").map(|r| r.eq_ignore_ascii_case("canonical")).unwrap_or(false) {
            attrs.get("href").map(str::to_string)
        } else {
            None
        }
    })
}

/// All `tag` elements carrying every class in `classes`, with nested
/// same-name tags balanced. An empty class list selects every `tag`.
pub fn elements<'a>(html: &'a str, tag: &str, classes: &[&str]) -> Vec<Element<'a>> {
    let Ok(tag_re) = Regex::new(&format!(r"(?is)<(/?){}\b([^>]*)>", regex::escape(tag))) else {
        return Vec::new();
    };

    let tokens: Vec<_> = tag_re
        .captures_iter(html)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let closing = !cap[1].is_empty();
            let self_closing = cap[2].trim_end().ends_with('/');
            Some((whole.start(), whole.end(), closing, self_closing, cap[2].to_string()))
        })
        .collect();

    let mut found = Vec::new();
    for (i, (start, open_end, closing, self_closing, raw_attrs)) in tokens.iter().enumerate() {
        if *closing || *self_closing {
            continue;
        }
        let attrs = Attributes::parse(raw_attrs);
        if !attrs.has_all_classes(classes) {
            continue;
        }

        let mut depth = 0usize;
        let mut close = None;
        for (tok_start, tok_end, tok_closing, tok_self_closing, _) in &tokens[i + 1..] {
            if *tok_self_closing {
                continue;
            }
            if *tok_closing {
                if depth == 0 {
                    close = Some((*tok_start, *tok_end));
                    break;
                }
                depth -= 1;
            } else {
                depth += 1;
            }
        }

        let (inner_end, end) = close.unwrap_or((html.len(), html.len()));
        found.push(Element {
            attrs,
            inner: &html[*open_end..inner_end],
            start: *start,
            end,
        });
    }
    found
}

pub fn first_element<'a>(html: &'a str, tag: &str, classes: &[&str]) -> Option<Element<'a>> {
    elements(html, tag, classes).into_iter().next()
}

/// The `<main>` region, or the whole document when there is none.
pub fn main_region(html: &str) -> &str {
    first_element(html, "main", &[]).map(|e| e.inner).unwrap_or(html)
}

/// Visible text of an HTML fragment with whitespace collapsed.
pub fn text_of(fragment: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(fragment, " ");
    let stripped = TAG_RE.replace_all(&without_scripts, " ");
    let decoded = decode_entities(&stripped);
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Text of a code listing. Line structure is preserved.
pub fn code_text(fragment: &str) -> String {
    let with_breaks = BREAK_RE.replace_all(fragment, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    decode_entities(&stripped).trim_matches('\n').to_string()
}

pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let numeric = NUMERIC_ENTITY_RE.replace_all(text, |cap: &regex::Captures| {
        let raw = &cap[1];
        let code = if let Some(hex) = raw.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()
        } else {
            raw.parse::<u32>().ok()
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| cap[0].to_string())
    });

    numeric
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><head><title>Hello &amp; Welcome</title>
<link rel="canonical" href="https://developer.apple.com/documentation/visionos/world"></head>
<body>
<nav><a href="/documentation/visionos/a">A</a></nav>
<main>
  <div class="documentation-title"><h1>Hello World</h1></div>
  <div class="abstract"><p>Use <code>windows</code> &amp; volumes.</p></div>
  <h2>Overview</h2>
  <p>First paragraph.</p>
  <div class="code-listing" data-syntax="swift"><div class="inner"><pre><code>import SwiftUI
struct A: View {}</code></pre></div></div>
  <a class="button-cta sample-download" href="https://docs-assets.developer.apple.com/a.zip">Download</a>
</main>
</body></html>"#;

    #[test]
    fn test_anchors_with_classes() {
        let anchors = anchors(PAGE);
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].href, "/documentation/visionos/a");
        assert_eq!(anchors[0].text, "A");
        assert!(anchors[1].attrs.has_all_classes(&["button-cta", "sample-download"]));
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let heads = headings(PAGE);
        assert_eq!(heads.len(), 2);
        assert_eq!(heads[0].level, 1);
        assert_eq!(heads[1].text, "Overview");

        let paras = paragraphs(PAGE);
        assert_eq!(paras[0].1, "Use windows & volumes.");
    }

    #[test]
    fn test_balanced_elements() {
        let listings = elements(PAGE, "div", &["code-listing"]);
        assert_eq!(listings.len(), 1);
        assert!(listings[0].inner.contains("</code></pre></div>"));
        assert_eq!(listings[0].attrs.get("data-syntax"), Some("swift"));
    }

    #[test]
    fn test_code_text_keeps_lines() {
        let listing = first_element(PAGE, "div", &["code-listing"]).unwrap();
        let code = first_element(listing.inner, "code", &[]).map(|e| code_text(e.inner)).unwrap();
        assert_eq!(code, "import SwiftUI\nstruct A: View {}");
    }

    #[test]
    fn test_main_region_and_meta() {
        assert!(!main_region(PAGE).contains("<nav>"));
        assert_eq!(page_title(PAGE).as_deref(), Some("Hello & Welcome"));
        assert_eq!(
            canonical_url(PAGE).as_deref(),
            Some("https://developer.apple.com/documentation/visionos/world")
        );
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#39;c&#x27; &amp;lt;"), "a <b> 'c' &lt;");
    }

    #[test]
    fn test_list_items() {
        let items = list_items("<ul><li>one - first</li><li> </li><li>two</li></ul>");
        assert_eq!(items, vec!["one - first".to_string(), "two".to_string()]);
    }
}
