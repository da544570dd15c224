use crate::config::types::{ChunkingConfig, Config, CrawlerConfig, OcrConfig, OutputConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_chunking_config(&config.chunking)?;
    validate_ocr_config(&config.ocr)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.max_concurrent < 1 || config.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent must be between 1 and 100, got {}",
            config.max_concurrent
        )));
    }

    if config.connect_timeout_secs == 0 || config.read_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect and read timeouts must be at least 1 second".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates chunking configuration
fn validate_chunking_config(config: &ChunkingConfig) -> Result<(), ConfigError> {
    validate_window("tokens", config.window_tokens, config.overlap_tokens)?;
    validate_window("chars", config.window_chars, config.overlap_chars)?;
    Ok(())
}

/// Validates a single window/overlap pair
///
/// An overlap equal to the window is tolerated (the chunker falls back to a
/// step of one full window), but a larger overlap is almost certainly a typo.
fn validate_window(unit: &str, window: usize, overlap: usize) -> Result<(), ConfigError> {
    if window == 0 {
        return Err(ConfigError::Validation(format!(
            "window-{} must be greater than 0",
            unit
        )));
    }

    if overlap > window {
        return Err(ConfigError::Validation(format!(
            "overlap-{} ({}) must not exceed window-{} ({})",
            unit, overlap, unit, window
        )));
    }

    Ok(())
}

/// Validates OCR configuration
fn validate_ocr_config(config: &OcrConfig) -> Result<(), ConfigError> {
    if config.dpi < 300 {
        return Err(ConfigError::Validation(format!(
            "ocr dpi must be >= 300, got {}",
            config.dpi
        )));
    }

    if config.languages.trim().is_empty() {
        return Err(ConfigError::Validation(
            "ocr languages cannot be empty".to_string(),
        ));
    }

    if config.enabled && (config.renderer.trim().is_empty() || config.tesseract.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "ocr renderer and tesseract executables must be set when OCR is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
