/// Maps the attachment types the composer accepts to their MIME types.
/// Anything else is sent as an opaque byte stream.
pub fn mime_for_name(name: &str) -> String {
    let extension = name.rsplit('.').next().unwrap_or_default().to_lowercase();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// The display name of a file the backend serialized as a URL or path.
pub fn name_from_path(path: &str) -> String {
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_extensions_map_to_their_mime_types() {
        assert_eq!(mime_for_name("report.pdf"), "application/pdf");
        assert_eq!(mime_for_name("photo.JPG"), "image/jpeg");
        assert_eq!(mime_for_name("shot.png"), "image/png");
        assert_eq!(mime_for_name("archive.tar.gz"), "application/octet-stream");
    }

    #[test]
    fn file_urls_reduce_to_their_last_segment() {
        assert_eq!(
            name_from_path("http://localhost:8000/media/uploads/notes.pdf"),
            "notes.pdf"
        );
        assert_eq!(name_from_path("plain.png"), "plain.png");
    }
}
