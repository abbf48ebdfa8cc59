use encoding_rs::Encoding;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum EncodingError {
    #[error("unknown codepage label: {0}")]
    UnknownLabel(String),
    #[error("text contains characters not representable in {encoding}: {preview}")]
    Unmappable {
        encoding: &'static str,
        preview: String,
    },
    #[error("byte sequence is not valid {encoding}")]
    Malformed { encoding: &'static str },
}

// Converts between the tracker's UTF-8 storage and the host shell's locale
// encoding. Strict in both directions; callers opt into lossy decoding.
#[derive(Debug, Clone)]
pub(crate) struct TextCodec {
    encoding: &'static Encoding,
}

impl TextCodec {
    pub(crate) fn for_label(label: &str) -> Result<Self, EncodingError> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
    }

    pub(crate) fn name(&self) -> &'static str {
        self.encoding.name()
    }

    pub(crate) fn encode(&self, text: &str) -> Result<Vec<u8>, EncodingError> {
        let (bytes, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(EncodingError::Unmappable {
                encoding: self.encoding.name(),
                preview: preview(text),
            });
        }
        Ok(bytes.into_owned())
    }

    pub(crate) fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(EncodingError::Malformed {
                encoding: self.encoding.name(),
            });
        }
        Ok(text.into_owned())
    }

    pub(crate) fn decode_lossy(&self, bytes: &[u8]) -> String {
        self.encoding.decode_without_bom_handling(bytes).0.into_owned()
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(32).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out
}
