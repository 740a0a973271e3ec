//! Markdown outline used by the documentation structure rules.
//!
//! Only what the rules need: ATX headings (`#` .. `######`) and images,
//! both markdown (`![alt](src)`) and inline HTML (`<img alt="..">`).
//! Fenced code blocks are skipped.

use std::sync::LazyLock;

use regex::Regex;

static MD_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]*)[^)]*\)").expect("valid regex"));

static HTML_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("valid regex"));

static HTML_ALT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\balt\s*=\s*["']([^"']*)["']"#).expect("valid regex"));

static HTML_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']*)["']"#).expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub title: String,
    /// 1-based
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub alt: String,
    pub src: String,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocOutline {
    pub headings: Vec<Heading>,
    pub images: Vec<ImageRef>,
}

impl DocOutline {
    pub fn parse(content: &str) -> Self {
        let mut outline = Self::default();
        let mut fence: Option<&str> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim_start();
            let line_no = idx + 1;

            if let Some(marker) = fence {
                if line.starts_with(marker) {
                    fence = None;
                }
                continue;
            }
            if line.starts_with("```") {
                fence = Some("```");
                continue;
            }
            if line.starts_with("~~~") {
                fence = Some("~~~");
                continue;
            }

            if let Some(heading) = parse_heading(line, line_no) {
                outline.headings.push(heading);
                continue;
            }

            for caps in MD_IMAGE.captures_iter(line) {
                outline.images.push(ImageRef {
                    alt: caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
                    src: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                    line: line_no,
                });
            }
            for tag in HTML_IMAGE.find_iter(line) {
                let attr = |re: &Regex| {
                    re.captures(tag.as_str())
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_default()
                };
                outline.images.push(ImageRef {
                    alt: attr(&HTML_ALT),
                    src: attr(&HTML_SRC),
                    line: line_no,
                });
            }
        }
        outline
    }

    /// Lower-cased heading titles
    pub fn section_titles(&self) -> Vec<String> {
        self.headings.iter().map(|h| h.title.to_lowercase()).collect()
    }
}

fn parse_heading(line: &str, line_no: usize) -> Option<Heading> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim().to_string();
    Some(Heading {
        level,
        title,
        line: line_no,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_fences() {
        let doc = "# Project\n\n## Install ##\n```sh\n# not a heading\n```\n#hashtag\n### Usage";
        let outline = DocOutline::parse(doc);
        let levels: Vec<(usize, &str)> = outline
            .headings
            .iter()
            .map(|h| (h.level, h.title.as_str()))
            .collect();
        assert_eq!(levels, vec![(1, "Project"), (2, "Install"), (3, "Usage")]);
        assert_eq!(outline.headings[1].line, 3);
    }

    #[test]
    fn test_images() {
        let doc = "![Architecture](docs/arch.png)\n![](shot.png \"title\")\n<img src=\"logo.svg\" width=\"80\">";
        let outline = DocOutline::parse(doc);
        assert_eq!(outline.images.len(), 3);
        assert_eq!(outline.images[0].alt, "Architecture");
        assert_eq!(outline.images[1].alt, "");
        assert_eq!(outline.images[1].src, "shot.png");
        assert_eq!(outline.images[2].src, "logo.svg");
        assert_eq!(outline.images[2].alt, "");
    }
}
