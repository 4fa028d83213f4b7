//! `llms.txt` index parsing.
//!
//! An index is plain markdown where each document is listed on its own line
//! as `- [Title](https://host/path.md): short description`.

use serde::{Deserialize, Serialize};

/// One entry of the index, before the document itself is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDoc {
    pub title: String,
    pub link: String,
    pub description: String,
}

/// Extract every linked document from an index.
///
/// With a `base_url`, only links starting with it are kept; without one any
/// http(s) link qualifies. Lines without a markdown link are ignored.
pub fn parse_llms_txt(text: &str, base_url: Option<&str>) -> Vec<RawDoc> {
    text.lines()
        .filter_map(parse_line)
        .filter(|doc| match base_url {
            Some(base) => doc.link.starts_with(base),
            None => doc.link.starts_with("http://") || doc.link.starts_with("https://"),
        })
        .collect()
}

fn parse_line(line: &str) -> Option<RawDoc> {
    let link_start = line.find("](")? + 2;
    let link_end = link_start + line[link_start..].find(')')?;
    let link = line[link_start..link_end].trim();
    if link.is_empty() {
        return None;
    }
    let title_start = line.find('[').map(|i| i + 1).unwrap_or(0);
    let title = line.get(title_start..link_start - 2).unwrap_or_default().trim();
    let description = line[link_end..].strip_prefix("):").unwrap_or_default().trim();
    Some(RawDoc { title: title.to_string(), link: link.to_string(), description: description.to_string() })
}

/// Raw entries for documents that are not listed in the index but must stay
/// reachable by id. The title comes from the file name.
pub fn reference_raw_docs<S: AsRef<str>>(urls: &[S]) -> Vec<RawDoc> {
    urls.iter()
        .map(|url| {
            let url = url.as_ref();
            let file = url.rsplit('/').next().filter(|f| !f.is_empty()).unwrap_or("unknown.md");
            let title = file.strip_suffix(".md").unwrap_or(file).replace('-', " ");
            RawDoc { title, link: url.to_string(), description: String::new() }
        })
        .collect()
}
