use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataUriError {
    #[error("missing `data:` scheme")]
    MissingScheme,
    #[error("missing `,` separator")]
    MissingSeparator,
    #[error("only base64 data URIs are supported")]
    NotBase64,
    #[error("invalid MIME type `{0}`")]
    InvalidMimeType(String),
    #[error("empty payload")]
    EmptyPayload,
    #[error("payload is not valid base64")]
    InvalidPayload,
}

/// A self-describing inline image: `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    data: String,
}

impl DataUri {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into().to_ascii_lowercase(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Wraps an already encoded payload, checking that it decodes.
    pub fn from_base64(
        mime_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Result<Self, DataUriError> {
        let mime_type = mime_type.into().to_ascii_lowercase();
        if !is_mime_type(&mime_type) {
            return Err(DataUriError::InvalidMimeType(mime_type));
        }
        let data = data.into();
        if data.is_empty() {
            return Err(DataUriError::EmptyPayload);
        }
        STANDARD
            .decode(data.as_bytes())
            .map_err(|_| DataUriError::InvalidPayload)?;
        Ok(Self { mime_type, data })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The base64 payload without the header.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn decode(&self) -> Result<Vec<u8>, DataUriError> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|_| DataUriError::InvalidPayload)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

fn is_mime_type(value: &str) -> bool {
    match value.split_once('/') {
        Some((kind, subtype)) => {
            let valid = |s: &str| {
                !s.is_empty()
                    && s.chars()
                        .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
            };
            valid(kind) && valid(subtype)
        }
        None => false,
    }
}

impl FromStr for DataUri {
    type Err = DataUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .trim()
            .strip_prefix("data:")
            .ok_or(DataUriError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingSeparator)?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default();
        if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
            return Err(DataUriError::NotBase64);
        }

        DataUri::from_base64(mime_type, payload)
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

impl Serialize for DataUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn parses_base64_data_uri() {
        let uri: DataUri = PNG.parse().unwrap();
        assert_eq!(uri.mime_type(), "image/png");
        assert_eq!(uri.data(), "iVBORw0KGgo=");
        assert_eq!(uri.to_string(), PNG);
        assert!(uri.is_image());
    }

    #[test]
    fn keeps_extra_parameters_out_of_the_mime_type() {
        let uri: DataUri = "data:IMAGE/JPEG;name=plan.jpg;base64,/9j/4AA="
            .parse()
            .unwrap();
        assert_eq!(uri.mime_type(), "image/jpeg");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            "image/png;base64,AAAA".parse::<DataUri>(),
            Err(DataUriError::MissingScheme)
        );
        assert_eq!(
            "data:image/png;base64".parse::<DataUri>(),
            Err(DataUriError::MissingSeparator)
        );
        assert_eq!(
            "data:image/png,rawtext".parse::<DataUri>(),
            Err(DataUriError::NotBase64)
        );
        assert_eq!(
            "data:image/png;base64,".parse::<DataUri>(),
            Err(DataUriError::EmptyPayload)
        );
        assert_eq!(
            "data:image/png;base64,not base64!".parse::<DataUri>(),
            Err(DataUriError::InvalidPayload)
        );
        assert!(matches!(
            "data:png;base64,AAAA".parse::<DataUri>(),
            Err(DataUriError::InvalidMimeType(_))
        ));
    }

    #[test]
    fn encodes_raw_bytes() {
        let uri = DataUri::from_bytes("image/gif", b"GIF89a");
        assert_eq!(uri.to_string(), "data:image/gif;base64,R0lGODlh");
        assert_eq!(uri.decode().unwrap(), b"GIF89a");
    }

    #[test]
    fn any_image_subtype_counts_as_an_image() {
        let heic: DataUri = "data:image/heic;base64,AAAA".parse().unwrap();
        assert!(heic.is_image());

        let pdf: DataUri = "data:application/pdf;base64,JVBERi0=".parse().unwrap();
        assert!(!pdf.is_image());
    }

    #[test]
    fn serializes_as_a_string() {
        let uri: DataUri = PNG.parse().unwrap();
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, format!("\"{}\"", PNG));
        let back: DataUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
    }
}
