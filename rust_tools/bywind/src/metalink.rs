use crate::error::{BywindError, Result};
use log::debug;

const METALINK_NS: &str = "urn:ietf:params:xml:ns:metalink";

/// One downloadable file announced by a Metalink v4 manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetalinkFile {
    pub name: String,
    pub url: String,
}

/// Parse a Metalink document into (file name, first mirror URL) entries, in document order
pub fn parse_metalink(xml: &str) -> Result<Vec<MetalinkFile>> {
    let doc = roxmltree::Document::parse(xml)?;

    let files = doc
        .root_element()
        .children()
        .filter(|node| node.has_tag_name((METALINK_NS, "file")))
        .enumerate()
        .map(|(index, file)| {
            let name = file
                .attribute("name")
                .ok_or(BywindError::InvalidMetalinkEntry(index, "name attribute"))?;

            let url = file
                .children()
                .find(|node| node.has_tag_name((METALINK_NS, "url")))
                .and_then(|node| node.text())
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .ok_or(BywindError::InvalidMetalinkEntry(index, "url element"))?;

            Ok(MetalinkFile {
                name: name.to_string(),
                url: url.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Metalink lists {} files", files.len());
    Ok(files)
}
