//! OCR fallback for PDF pages without a usable text layer
//!
//! The page is rendered to PNG with an external renderer and recognized with
//! the Tesseract CLI. Both run as child processes, so the scheduler thread is
//! never blocked while they work.

use crate::config::OcrConfig;
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use thiserror::Error;
use tokio::process::Command;

/// Errors raised while OCR'ing a page
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} exited with {status}: {stderr}")]
    Tool {
        tool: String,
        status: String,
        stderr: String,
    },
}

/// Recognizes the text of a single PDF page
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// # Arguments
    ///
    /// * `pdf` - The whole PDF document
    /// * `page` - 1-based page number
    async fn recognize_page(&self, pdf: &[u8], page: usize) -> Result<String, OcrError>;
}

/// `pdftoppm` + `tesseract` command-line OCR
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    renderer: String,
    tesseract: String,
    dpi: u32,
    languages: String,
}

impl TesseractOcr {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            renderer: config.renderer.clone(),
            tesseract: config.tesseract.clone(),
            dpi: config.dpi,
            languages: config.languages.clone(),
        }
    }

    async fn render_page(&self, pdf_path: &Path, page: usize, prefix: &Path) -> Result<(), OcrError> {
        let output = Command::new(&self.renderer)
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg("-singlefile")
            .arg(pdf_path)
            .arg(prefix)
            .output()
            .await?;
        check_status(&self.renderer, &output)
    }

    async fn recognize_image(&self, image_path: &Path) -> Result<String, OcrError> {
        // PSM 6: assume a single uniform block of text
        let output = Command::new(&self.tesseract)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg("6")
            .output()
            .await?;
        check_status(&self.tesseract, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn check_status(tool: &str, output: &Output) -> Result<(), OcrError> {
    if output.status.success() {
        return Ok(());
    }
    Err(OcrError::Tool {
        tool: tool.to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize_page(&self, pdf: &[u8], page: usize) -> Result<String, OcrError> {
        let workdir = tempfile::tempdir()?;
        let pdf_path = workdir.path().join("document.pdf");
        let prefix = workdir.path().join("page");
        tokio::fs::write(&pdf_path, pdf).await?;

        self.render_page(&pdf_path, page, &prefix).await?;
        let text = self.recognize_image(&prefix.with_extension("png")).await?;

        tracing::debug!("OCR recognized {} chars on page {}", text.trim().len(), page);
        Ok(text)
    }
}
