//! Output formatting for synthesized documents.
//!
//! Markdown is written as-is. HTML is a minimal escaped rendering that keeps
//! headings, lists, paragraphs, code fences and inline emphasis. JSON is the
//! section map keyed by the canonical section names.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::docs::SECTION_FILES;
use crate::types::{DocumentSet, OutputFormat, Result};

/// One file ready to be written to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub file_name: String,
    pub content: String,
}

pub fn format_documents(documents: &DocumentSet, format: OutputFormat) -> Result<Vec<RenderedFile>> {
    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = documents
                .sections()
                .iter()
                .map(|(key, content)| (key.to_string(), serde_json::Value::from(*content)))
                .collect();
            Ok(vec![RenderedFile {
                file_name: "documents.json".to_string(),
                content: serde_json::to_string_pretty(&map)?,
            }])
        }
        OutputFormat::Markdown | OutputFormat::Html => Ok(documents
            .sections()
            .iter()
            .map(|(key, content)| {
                let stem = section_file_stem(key);
                let content = match format {
                    OutputFormat::Html => markdown_to_html(stem, content),
                    _ => content.to_string(),
                };
                RenderedFile {
                    file_name: format!("{}.{}", stem, format.extension()),
                    content,
                }
            })
            .collect()),
    }
}

/// Write rendered files into `dir`, creating it if needed
pub fn write_documents(dir: &Path, files: &[RenderedFile]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    files
        .iter()
        .map(|file| {
            let path = dir.join(&file.file_name);
            fs::write(&path, &file.content)?;
            Ok(path)
        })
        .collect()
}

fn section_file_stem(key: &str) -> &'static str {
    SECTION_FILES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, stem)| *stem)
        .unwrap_or("SECTION")
}

// =============================================================================
// Minimal markdown to HTML
// =============================================================================

fn markdown_to_html(title: &str, markdown: &str) -> String {
    let mut body = String::new();
    let mut in_list = false;
    let mut code_close: Option<&str> = None;
    let mut paragraph: Vec<String> = Vec::new();

    for line in markdown.lines() {
        if let Some(lang) = line.trim_start().strip_prefix("```") {
            flush_paragraph(&mut body, &mut paragraph);
            close_list(&mut body, &mut in_list);
            if let Some(close) = code_close.take() {
                body.push_str(close);
            } else if lang.trim() == "mermaid" {
                body.push_str("<pre class=\"mermaid\">");
                code_close = Some("</pre>\n");
            } else {
                body.push_str("<pre><code>");
                code_close = Some("</code></pre>\n");
            }
            continue;
        }
        if code_close.is_some() {
            body.push_str(&escape(line));
            body.push('\n');
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush_paragraph(&mut body, &mut paragraph);
            close_list(&mut body, &mut in_list);
        } else if let Some((level, text)) = heading(trimmed) {
            flush_paragraph(&mut body, &mut paragraph);
            close_list(&mut body, &mut in_list);
            body.push_str(&format!("<h{0}>{1}</h{0}>\n", level, inline(text)));
        } else if let Some(item) = trimmed.strip_prefix("- ") {
            flush_paragraph(&mut body, &mut paragraph);
            if !in_list {
                body.push_str("<ul>\n");
                in_list = true;
            }
            let nested = line.starts_with("  ");
            let class = if nested { " class=\"nested\"" } else { "" };
            body.push_str(&format!("<li{}>{}</li>\n", class, inline(item)));
        } else {
            close_list(&mut body, &mut in_list);
            paragraph.push(inline(trimmed));
        }
    }
    flush_paragraph(&mut body, &mut paragraph);
    close_list(&mut body, &mut in_list);
    if let Some(close) = code_close {
        body.push_str(close);
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        body
    )
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&level) {
        line[level..].strip_prefix(' ').map(|text| (level, text.trim()))
    } else {
        None
    }
}

fn flush_paragraph(body: &mut String, paragraph: &mut Vec<String>) {
    if !paragraph.is_empty() {
        body.push_str(&format!("<p>{}</p>\n", paragraph.join(" ")));
        paragraph.clear();
    }
}

fn close_list(body: &mut String, in_list: &mut bool) {
    if *in_list {
        body.push_str("</ul>\n");
        *in_list = false;
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escape, then translate `code`, **strong** and _em_ spans
fn inline(text: &str) -> String {
    let escaped = escape(text);
    let code = wrap_pairs(&escaped, "`", "code");
    let strong = wrap_pairs(&code, "**", "strong");
    wrap_pairs(&strong, "_(", "em")
}

/// Replace paired `marker` delimiters with `<tag>`; an unpaired marker is kept
fn wrap_pairs(text: &str, marker: &str, tag: &str) -> String {
    let (open, close) = if marker == "_(" { ("_(", ")_") } else { (marker, marker) };
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(open) {
        let after = &rest[start + open.len()..];
        let Some(end) = after.find(close) else {
            break;
        };
        out.push_str(&rest[..start]);
        if marker == "_(" {
            out.push_str(&format!("<{0}>({1})</{0}>", tag, &after[..end]));
        } else {
            out.push_str(&format!("<{0}>{1}</{0}>", tag, &after[..end]));
        }
        rest = &after[end + close.len()..];
    }
    out.push_str(rest);
    out
}
