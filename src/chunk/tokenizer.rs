use tiktoken_rs::CoreBPE;

/// Converts text to token ids and back
///
/// The chunker slides its window over token ids so chunk sizes line up with
/// the embedding model's limits.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Decodes a token window; None if the window cannot be turned back into text
    fn decode(&self, tokens: &[u32]) -> Option<String>;
}

/// `cl100k_base` byte-pair encoding
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    /// Loads the encoding tables
    ///
    /// # Returns
    ///
    /// * `Ok(Cl100kTokenizer)` - Encoding is ready
    /// * `Err(String)` - Tables could not be loaded; callers fall back to character chunking
    pub fn load() -> Result<Self, String> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| e.to_string())?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_ordinary(text)
            .into_iter()
            .map(|t| t as u32)
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> Option<String> {
        if let Ok(text) = self.bpe.decode(tokens.iter().map(|&t| t as _).collect()) {
            return Some(text);
        }

        // A window boundary can split a multi-byte character. Keep every
        // token that decodes on its own and drop the partial ones.
        let mut text = String::new();
        for &t in tokens {
            if let Ok(piece) = self.bpe.decode(vec![t as _]) {
                text.push_str(&piece);
            }
        }
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
