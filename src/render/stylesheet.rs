//! Stylesheet generation.
//!
//! Stylesheets depend only on configuration, never on content, so the same
//! configuration always yields the same stylesheet.

use super::options::{EpubConfig, PageNumberPosition, PdfConfig};

/// Shared rules for inline constructs.
const INLINE_RULES: &str = r#"sup, sub {
    font-size: 0.75em;
    line-height: 0;
}

sup { vertical-align: super; }
sub { vertical-align: sub; }

del {
    text-decoration: line-through;
}

.page-break {
    page-break-after: always;
}
"#;

/// Generates the EPUB stylesheet.
pub fn epub_stylesheet(config: &EpubConfig) -> String {
    let mut css = String::new();

    css.push_str(&format!(
        r#"/* Default EPUB Stylesheet */

body {{
    font-family: Georgia, "Times New Roman", serif;
    font-size: {};
    line-height: 1.6;
    margin: 1em;
    text-align: justify;
}}
"#,
        config.font_size
    ));

    css.push_str(
        r#"
h1, h2, h3, h4, h5, h6 {
    font-family: "Helvetica Neue", Helvetica, Arial, sans-serif;
    font-weight: bold;
    line-height: 1.2;
    margin-top: 1.5em;
    margin-bottom: 0.5em;
    text-align: left;
}

h1 {
    font-size: 2em;
    margin-top: 2em;
    page-break-before: always;
}

h2 { font-size: 1.5em; }
h3 { font-size: 1.25em; }
h4 { font-size: 1.1em; }

p {
    margin: 0;
    text-indent: 1.5em;
}

p:first-of-type,
h1 + p, h2 + p, h3 + p, h4 + p,
blockquote + p,
figure + p {
    text-indent: 0;
}

blockquote {
    margin: 1em 2em;
    font-style: italic;
    border-left: 3px solid #ccc;
    padding-left: 1em;
}

figure, .figure {
    margin: 1em 0;
    text-align: center;
}

span.figure, span.caption {
    display: block;
}

figure img, .figure img {
    max-width: 100%;
    height: auto;
}

figcaption, .caption {
    font-size: 0.9em;
    font-style: italic;
    margin-top: 0.5em;
    color: #666;
}

table {
    width: 100%;
    border-collapse: collapse;
    margin: 1em 0;
}

th, td {
    border: 1px solid #ccc;
    padding: 0.5em;
    text-align: left;
}

a {
    color: #0066cc;
    text-decoration: none;
}

.footnote {
    font-size: 0.85em;
    margin-top: 1em;
}

.footnote-ref {
    text-decoration: none;
}

code {
    font-family: "Courier New", Courier, monospace;
    font-size: 0.9em;
    background-color: #f5f5f5;
    padding: 0.1em 0.3em;
}

pre {
    font-family: "Courier New", Courier, monospace;
    font-size: 0.85em;
    background-color: #f5f5f5;
    padding: 1em;
    white-space: pre-wrap;
}

"#,
    );

    css.push_str(INLINE_RULES);
    css
}

/// Generates the print stylesheet with `@page` rules and running headers.
pub fn print_stylesheet(config: &PdfConfig) -> String {
    let margins = &config.margins;
    let mut css = String::from("/* Print CSS for book layout */\n\n");

    css.push_str(&format!(
        "@page {{\n    size: {};\n    margin: {} {} {} {};\n",
        config.page_size, margins.top, margins.outside, margins.bottom, margins.inside
    ));
    if let Some(bleed) = &config.bleed {
        css.push_str(&format!("    bleed: {};\n", bleed));
        if config.crop_marks {
            css.push_str("    marks: crop cross;\n");
        }
    }
    if config.show_page_numbers && config.page_number_position == PageNumberPosition::BottomCenter
    {
        css.push_str(&margin_box("bottom-center", "counter(page)", "10pt", false));
    }
    css.push_str("}\n\n");

    let outside_numbers = config.show_page_numbers
        && config.page_number_position == PageNumberPosition::BottomOutside;
    for (side, outer, inner, header) in [
        ("left", &margins.outside, &margins.inside, "chapter-title"),
        ("right", &margins.inside, &margins.outside, "book-title"),
    ] {
        css.push_str(&format!(
            "@page :{} {{\n    margin-left: {};\n    margin-right: {};\n",
            side, outer, inner
        ));
        if outside_numbers {
            css.push_str(&margin_box(
                &format!("bottom-{}", side),
                "counter(page)",
                "10pt",
                false,
            ));
        }
        if config.show_running_headers {
            css.push_str(&margin_box(
                &format!("top-{}", side),
                &format!("string({})", header),
                "9pt",
                true,
            ));
        }
        css.push_str("}\n\n");
    }

    css.push_str(PAGE_SUPPRESSION_RULES);

    css.push_str(&format!(
        r#"
/* Base typography */
body {{
    font-family: {};
    font-size: {};
    line-height: {};
    text-align: justify;
    hyphens: auto;
}}
"#,
        config.font_family, config.font_size, config.line_height
    ));

    css.push_str(PRINT_BODY_RULES);
    css.push_str(INLINE_RULES);
    css
}

fn margin_box(name: &str, content: &str, size: &str, italic: bool) -> String {
    let style = if italic {
        "        font-style: italic;\n"
    } else {
        ""
    };
    format!(
        "\n    @{} {{\n        content: {};\n        font-family: sans-serif;\n        font-size: {};\n{}    }}\n",
        name, content, size, style
    )
}

const PAGE_SUPPRESSION_RULES: &str = r#"@page :first {
    @top-left { content: none; }
    @top-right { content: none; }
    @bottom-left { content: none; }
    @bottom-right { content: none; }
    @bottom-center { content: none; }
}

@page title-page {
    @top-left { content: none; }
    @top-right { content: none; }
    @bottom-left { content: none; }
    @bottom-right { content: none; }
    @bottom-center { content: none; }
}

@page chapter-start {
    @top-left { content: none; }
    @top-right { content: none; }
}
"#;

const PRINT_BODY_RULES: &str = r#"
.running-title {
    string-set: book-title content();
    height: 0;
    margin: 0;
    overflow: hidden;
    font-size: 0;
}

/* Title page */
.title-page {
    page: title-page;
    page-break-after: always;
    text-align: center;
    padding-top: 30%;
}

.title-page .book-title {
    font-size: 2.5em;
    margin-bottom: 0.5em;
}

.title-page .subtitle {
    font-size: 1.5em;
    font-style: italic;
    margin-bottom: 2em;
}

.title-page .author {
    font-size: 1.3em;
    margin-bottom: 0.5em;
}

.title-page .publisher {
    font-size: 1em;
    margin-top: 3em;
}

/* Copyright page */
.copyright-page {
    page: title-page;
    page-break-after: always;
    font-size: 0.9em;
    padding-top: 60%;
}

/* Table of contents */
.toc {
    page-break-after: always;
}

.toc h2 {
    font-size: 1.5em;
    margin-bottom: 1em;
}

.toc ol {
    list-style: none;
    padding: 0;
}

.toc li {
    margin: 0.5em 0;
}

.toc a {
    text-decoration: none;
    color: inherit;
}

.toc a::after {
    content: leader('.') target-counter(attr(href), page);
}

/* Chapters */
.chapter, .front-matter, .back-matter {
    page-break-before: always;
}

.chapter-title {
    font-size: 2em;
    margin-top: 2in;
    margin-bottom: 1.5em;
    text-align: center;
    page: chapter-start;
    string-set: chapter-title content();
}

/* Untitled sections clear the running chapter title */
.chapter.untitled {
    string-set: chapter-title "";
}

/* Headings */
h1, h2, h3, h4, h5, h6 {
    font-family: sans-serif;
    page-break-after: avoid;
    margin-top: 1.5em;
    margin-bottom: 0.5em;
}

h2 { font-size: 1.4em; }
h3 { font-size: 1.2em; }
h4 { font-size: 1.1em; }

/* Paragraphs */
p {
    margin: 0;
    text-indent: 1.5em;
    widows: 2;
    orphans: 2;
}

p:first-of-type,
h1 + p, h2 + p, h3 + p, h4 + p,
blockquote + p,
figure + p {
    text-indent: 0;
}

blockquote {
    margin: 1em 2em;
    font-style: italic;
}

/* Images */
figure, .figure {
    margin: 1.5em auto;
    text-align: center;
    page-break-inside: avoid;
}

span.figure, span.caption {
    display: block;
}

figure img, .figure img {
    max-width: 100%;
    max-height: 6in;
    height: auto;
}

figcaption {
    font-size: 0.9em;
    font-style: italic;
    margin-top: 0.5em;
}

/* Tables */
table {
    width: 100%;
    border-collapse: collapse;
    margin: 1em 0;
    page-break-inside: avoid;
}

th, td {
    border: 0.5pt solid #333;
    padding: 0.4em 0.6em;
    text-align: left;
}

/* Footnotes */
.footnote {
    float: footnote;
    font-size: 0.8em;
    text-indent: 0;
}

.footnote::footnote-call {
    content: counter(footnote);
    vertical-align: super;
    font-size: 0.75em;
    line-height: 0;
}

/* Code */
code {
    font-family: "Courier New", Courier, monospace;
    font-size: 0.9em;
}

pre {
    font-family: "Courier New", Courier, monospace;
    font-size: 0.85em;
    background-color: #f5f5f5;
    padding: 1em;
    page-break-inside: avoid;
    white-space: pre-wrap;
}

a {
    color: inherit;
    text-decoration: none;
}

hr {
    border: none;
    border-top: 0.5pt solid #333;
    margin: 2em auto;
    width: 30%;
}

"#;
