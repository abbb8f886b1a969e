//! Upload filename rules and the extension → MIME type table.
//!
//! Uploaded documents are addressed in the bucket as
//! `<user_id>/<uuid>-<file_name>`, so the file name itself must be a single
//! path segment.

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum length of an uploaded file name, in characters.
pub const MAX_FILE_NAME_LEN: usize = 63;

/// Allowed extensions (lowercase, without the dot) and their content types.
pub const CONTENT_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
];

/// Return the lowercase extension of `file_name`, if any.
///
/// A leading dot (`.env`) does not start an extension.
pub fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Look up the content type for a file name by its extension.
pub fn content_type_for(file_name: &str) -> Option<&'static str> {
    let ext = extension(file_name)?;
    CONTENT_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, mime)| *mime)
}

/// Validate a single upload file name and return its content type.
pub fn validate_upload_filename(file_name: &str) -> Result<&'static str, CoreError> {
    if file_name.trim().is_empty() {
        return Err(CoreError::Validation("file name must not be empty".into()));
    }
    if file_name.chars().count() > MAX_FILE_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "file name '{file_name}' exceeds {MAX_FILE_NAME_LEN} characters"
        )));
    }
    if file_name.contains(['/', '\\']) || file_name == "." || file_name == ".." {
        return Err(CoreError::Validation(format!(
            "file name '{file_name}' must not contain path separators"
        )));
    }
    if extension(file_name).is_none() {
        return Err(CoreError::Validation(format!(
            "file '{file_name}' has no extension"
        )));
    }
    content_type_for(file_name).ok_or_else(|| {
        let allowed: Vec<&str> = CONTENT_TYPES.iter().map(|(ext, _)| *ext).collect();
        CoreError::Validation(format!(
            "file type for '{file_name}' is not allowed, allowed extensions are: {}",
            allowed.join(",")
        ))
    })
}

/// Validate every file name in an upload request.
pub fn validate_upload_batch(files: &[String]) -> Result<(), CoreError> {
    if files.is_empty() {
        return Err(CoreError::Validation(
            "at least one file name is required".into(),
        ));
    }
    for file_name in files {
        validate_upload_filename(file_name)?;
    }
    Ok(())
}

/// Build the bucket object key for a new upload.
pub fn object_key(user_id: DbId, file_name: &str) -> String {
    format!("{user_id}/{}-{file_name}", uuid::Uuid::new_v4())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension("archive.tar.csv").as_deref(), Some("csv"));
    }

    #[test]
    fn dotfiles_and_bare_names_have_no_extension() {
        assert_eq!(extension(".env"), None);
        assert_eq!(extension("README"), None);
        assert_eq!(extension("trailing."), None);
    }

    #[test]
    fn known_extensions_map_to_mime_types() {
        assert_eq!(content_type_for("a.pdf"), Some("application/pdf"));
        assert_eq!(content_type_for("notes.MD"), Some("text/markdown"));
        assert_eq!(content_type_for("page.htm"), Some("text/html"));
        assert_eq!(content_type_for("image.png"), None);
    }

    #[test]
    fn valid_filename_returns_content_type() {
        assert_eq!(validate_upload_filename("data.csv").unwrap(), "text/csv");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert_matches!(
            validate_upload_filename("photo.png"),
            Err(CoreError::Validation(msg)) if msg.contains("not allowed")
        );
    }

    #[test]
    fn missing_extension_is_rejected() {
        assert_matches!(
            validate_upload_filename("README"),
            Err(CoreError::Validation(msg)) if msg.contains("no extension")
        );
    }

    #[test]
    fn path_separators_are_rejected() {
        assert!(validate_upload_filename("../etc/passwd.txt").is_err());
        assert!(validate_upload_filename("dir\\file.txt").is_err());
    }

    #[test]
    fn overlong_names_are_rejected() {
        let name = format!("{}.txt", "a".repeat(MAX_FILE_NAME_LEN));
        assert!(validate_upload_filename(&name).is_err());
        let ok = format!("{}.txt", "a".repeat(MAX_FILE_NAME_LEN - 4));
        assert!(validate_upload_filename(&ok).is_ok());
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(validate_upload_batch(&[]).is_err());
    }

    #[test]
    fn batch_fails_on_first_bad_name() {
        let files = vec!["ok.pdf".to_string(), "bad.exe".to_string()];
        assert_matches!(
            validate_upload_batch(&files),
            Err(CoreError::Validation(msg)) if msg.contains("bad.exe")
        );
    }

    #[test]
    fn object_key_is_scoped_to_user() {
        let key = object_key(42, "doc.pdf");
        assert!(key.starts_with("42/"));
        assert!(key.ends_with("-doc.pdf"));
        assert_ne!(object_key(42, "doc.pdf"), key);
    }
}
