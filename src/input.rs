/// Bytes to parse plus the URL they came from.
///
/// The URL is used for relative link resolution and for error reports. It is
/// never fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput {
    pub url: String,
    pub bytes: Vec<u8>,
}

impl RawInput {
    pub fn new(url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            bytes: bytes.into(),
        }
    }
}
