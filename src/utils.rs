// src/utils.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Resume upload formats the analysis service accepts.
pub const RESUME_EXTENSIONS: [&str; 3] = ["pdf", "docx", "txt"];

/// Get file extension in lowercase
pub fn get_file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Validate file extension against allowed types
pub fn validate_file_extension(filename: &str, allowed: &[&str]) -> Result<()> {
    let ext = get_file_extension(filename)
        .ok_or_else(|| anyhow::anyhow!("File has no extension: {}", filename))?;

    if !allowed.contains(&ext.as_str()) {
        anyhow::bail!(
            "Unsupported file extension: {}. Allowed: {:?}",
            ext,
            allowed
        );
    }

    Ok(())
}

/// Check that a path points at an uploadable resume file.
pub fn validate_resume_file(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Resume file not found: {}", path.display());
    }
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid resume file name: {}", path.display()))?;
    validate_file_extension(filename, &RESUME_EXTENSIONS)
}

/// MIME type for an upload by file name.
pub fn content_type_for(file_name: &str) -> Result<&'static str> {
    let lower_name = file_name.to_lowercase();
    if lower_name.ends_with(".pdf") {
        Ok("application/pdf")
    } else if lower_name.ends_with(".docx") {
        Ok("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
    } else if lower_name.ends_with(".txt") {
        Ok("text/plain")
    } else {
        anyhow::bail!("Unsupported file format: {}", file_name)
    }
}

/// Ensure directory exists
pub async fn ensure_directory(path: &PathBuf) -> Result<()> {
    if !path.exists() {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Build the output path for a downloaded PDF
pub fn pdf_output_path(base: &Path, analysis_id: &str, template: &str) -> PathBuf {
    base.join(format!(
        "{}_{}_{}.pdf",
        analysis_id,
        template,
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_file_extension() {
        assert_eq!(get_file_extension("test.pdf"), Some("pdf".to_string()));
        assert_eq!(
            get_file_extension("document.DOCX"),
            Some("docx".to_string())
        );
        assert_eq!(get_file_extension("noext"), None);
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension("test.pdf", &RESUME_EXTENSIONS).is_ok());
        assert!(validate_file_extension("notes.txt", &RESUME_EXTENSIONS).is_ok());
        assert!(validate_file_extension("photo.png", &RESUME_EXTENSIONS).is_err());
        assert!(validate_file_extension("noext", &RESUME_EXTENSIONS).is_err());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("cv.pdf").unwrap(), "application/pdf");
        assert_eq!(content_type_for("cv.txt").unwrap(), "text/plain");
        assert!(content_type_for("cv.odt").is_err());
    }

    #[test]
    fn test_pdf_output_path_shape() {
        let path = pdf_output_path(Path::new("out"), "an_42", "modern");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("an_42_modern_"));
        assert!(name.ends_with(".pdf"));
    }
}
