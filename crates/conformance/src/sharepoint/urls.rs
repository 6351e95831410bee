//! URL helpers shared by the SharePoint suites and the simulator

use anyhow::{Result, anyhow, bail};
use url::Url;
use uuid::Uuid;

/// Placeholder in destination URL patterns
pub const FILE_NAME_PLACEHOLDER: &str = "{FileName}";

/// Check that `url` is an absolute http(s) URL naming a file and return
/// the file name
pub fn validate_file_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| anyhow!("invalid file URL {url}: {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("file URL {url} is not http or https");
    }
    let file_name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    if file_name.is_empty() || !file_name.contains('.') {
        bail!("URL {url} does not point to a file");
    }
    Ok(file_name.to_string())
}

/// Fill the `{FileName}` placeholder of `pattern`
///
/// The pattern is matched case-insensitively and lowercased, and the
/// placeholder must come after the site part.
pub fn destination_from_pattern(pattern: &str, file_name: &str) -> Result<String> {
    let lowered = pattern.to_lowercase();
    let placeholder = FILE_NAME_PLACEHOLDER.to_lowercase();
    match lowered.find(&placeholder) {
        Some(index) if index > 0 => {
            let url = lowered.replacen(&placeholder, file_name, 1);
            validate_file_url(&url)?;
            Ok(url)
        }
        _ => bail!("URL pattern {pattern} must contain the {FILE_NAME_PLACEHOLDER} placeholder"),
    }
}

/// Everything before the last '/'
pub fn parent(url: &str) -> &str {
    url.rfind('/').map(|i| &url[..i]).unwrap_or(url)
}

/// Same file name inside a folder that does not exist
pub fn invalid_folder_url(file_url: &str) -> Result<String> {
    let file_name = validate_file_url(file_url)?;
    Ok(format!(
        "{}{}/{}",
        parent(file_url),
        Uuid::new_v4().simple(),
        file_name
    ))
}

/// URL in the same folder whose file name is not a valid IRI segment
pub fn malformed_file_url(file_url: &str) -> Result<String> {
    validate_file_url(file_url)?;
    Ok(format!("{}/Invalid%File&Name.txt", parent(file_url)))
}

/// True when `url` does not parse or carries a bad percent escape
pub fn is_malformed_iri(url: &str) -> bool {
    if Url::parse(url).is_err() {
        return true;
    }
    let bytes = url.as_bytes();
    bytes.iter().enumerate().any(|(i, b)| {
        *b == b'%'
            && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    })
}

/// Path part of a site URL, not counting scheme and authority
pub fn url_path(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_url() {
        assert_eq!(
            validate_file_url("http://sut/sites/docs/Shared%20Documents/a.txt").unwrap(),
            "a.txt"
        );
        assert!(validate_file_url("http://sut/sites/docs/").is_err());
        assert!(validate_file_url("ftp://sut/a.txt").is_err());
        assert!(validate_file_url("not a url").is_err());
    }

    #[test]
    fn test_destination_from_pattern() {
        let url = destination_from_pattern("http://SUT/Lib/{FileName}", "x.txt").unwrap();
        assert_eq!(url, "http://sut/lib/x.txt");
        assert!(destination_from_pattern("{FileName}", "x.txt").is_err());
        assert!(destination_from_pattern("http://sut/lib/", "x.txt").is_err());
    }

    #[test]
    fn test_invalid_folder_url_keeps_file_name() {
        let url = invalid_folder_url("http://sut/lib/a.txt").unwrap();
        assert!(url.starts_with("http://sut/lib"));
        assert!(url.ends_with("/a.txt"));
        assert_ne!(parent(&url), "http://sut/lib");
    }

    #[test]
    fn test_malformed_file_url() {
        let url = malformed_file_url("http://sut/lib/a.txt").unwrap();
        assert_eq!(url, "http://sut/lib/Invalid%File&Name.txt");
        assert!(is_malformed_iri(&url));
        assert!(!is_malformed_iri("http://sut/lib/a%20b.txt"));
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("http://sut:8080/sites/x").as_deref(), Some("/sites/x"));
        assert_eq!(url_path("sites/x"), None);
    }
}
