use super::ExtractionError;

/// Decodes a response body into text
///
/// Tries strict UTF-8, then ISO-8859-1, then lossy UTF-8; the first decoder
/// that succeeds wins. The lossy step accepts any input.
///
/// # Arguments
///
/// * `bytes` - Raw response body
///
/// # Returns
///
/// * `Ok(String)` - Decoded text
/// * `Err(ExtractionError::Decode)` - No decoder accepted the body
pub fn decode_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let decoders: [fn(&[u8]) -> Option<String>; 3] = [decode_utf8, decode_latin1, decode_lossy];
    decoders
        .iter()
        .find_map(|decode| decode(bytes))
        .ok_or_else(|| ExtractionError::Decode("no decoder accepted the body".to_string()))
}

fn decode_utf8(bytes: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?;
    Some(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

/// Every byte maps to the code point of the same value
fn decode_latin1(bytes: &[u8]) -> Option<String> {
    Some(bytes.iter().map(|&b| b as char).collect())
}

fn decode_lossy(bytes: &[u8]) -> Option<String> {
    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// Collapses every run of whitespace to a single space and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
