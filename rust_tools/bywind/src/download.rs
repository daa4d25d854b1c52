use crate::error::Result;
use log::{debug, info};
use std::fs;
use std::io::Read;
use std::path::Path;

/// GET a URL and return the body as text. Non-2xx responses are errors.
pub fn fetch_text(url: &str) -> Result<String> {
    debug!("GET {}", url);
    let response = ureq::get(url).call()?;
    read_body(response)
}

/// POST form fields to a URL and return the body as text
pub fn post_form(url: &str, fields: &[(&str, &str)]) -> Result<String> {
    debug!("POST {}", url);
    let response = ureq::post(url).send_form(fields)?;
    read_body(response)
}

/// Download `url` to `dir/name`, or return the cached copy if it is already there
pub fn download_file(name: &str, url: &str, dir: &Path) -> Result<String> {
    fs::create_dir_all(dir)?;
    let file_path = dir.join(name);

    if file_path.exists() {
        info!("Skip downloading: {}", file_path.display());
        return Ok(fs::read_to_string(&file_path)?);
    }

    let body = fetch_text(url)?;
    fs::write(&file_path, &body)?;
    info!("Successfully downloaded: {}", name);

    Ok(body)
}

// `into_string` caps bodies at 10 MB, CityGML tiles exceed that
fn read_body(response: ureq::Response) -> Result<String> {
    let mut body = String::new();
    response.into_reader().read_to_string(&mut body)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_file_uses_cached_copy() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cached.gml"), "<cached/>").unwrap();

        // The URL is never contacted because the file already exists
        let body = download_file("cached.gml", "http://127.0.0.1:9/unreachable", dir.path()).unwrap();
        assert_eq!(body, "<cached/>");
    }

    #[test]
    fn test_download_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("GML");

        assert!(download_file("missing.gml", "http://127.0.0.1:9/unreachable", &target).is_err());
        assert!(target.is_dir());
        assert!(!target.join("missing.gml").exists());
    }
}
