use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::{DecodeError, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{from_value, Value};

/// URL-safe base64 engine that decodes with or without trailing `=` padding.
///
/// Identity providers disagree on whether JWT segments are padded, and some emit non-canonical
/// trailing bits; both are accepted on decode.
pub(crate) fn base64_url_safe_no_pad() -> GeneralPurpose {
    GeneralPurpose::new(
        &URL_SAFE,
        GeneralPurposeConfig::new()
            .with_encode_padding(false)
            .with_decode_padding_mode(DecodePaddingMode::Indifferent)
            .with_decode_allow_trailing_bits(true),
    )
}

/// Decodes a base64url segment the way lenient JWT consumers do: symbols outside the base64
/// alphabets (including `.` and `=`) are skipped, and the standard alphabet's `+` and `/` are
/// read as `-` and `_`.
///
/// A segment left with a length of one more than a multiple of four still fails.
pub(crate) fn decode_base64_url_lenient(segment: &str) -> Result<Vec<u8>, DecodeError> {
    let symbols = segment
        .chars()
        .filter_map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' => Some(c),
            '+' => Some('-'),
            '/' => Some('_'),
            _ => None,
        })
        .collect::<String>();
    base64_url_safe_no_pad().decode(symbols)
}

pub(crate) fn deserialize_string_or_vec_opt<'de, T, D>(
    deserializer: D,
) -> Result<Option<Vec<T>>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Value = Deserialize::deserialize(deserializer)?;
    match from_value::<Option<Vec<T>>>(value.clone()) {
        Ok(val) => Ok(val),
        Err(_) => {
            let single_val: T = from_value(value).map_err(Error::custom)?;
            Ok(Some(vec![single_val]))
        }
    }
}

// Some providers return boolean claims as strings.
#[cfg(feature = "accept-string-booleans")]
pub(crate) fn bool_claim(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(not(feature = "accept-string-booleans"))]
pub(crate) fn bool_claim(value: &Value) -> Option<bool> {
    value.as_bool()
}

/// Returns the claim as a string slice when it is a JSON string.
pub(crate) fn str_claim<'a>(
    claims: &'a serde_json::Map<String, Value>,
    name: &str,
) -> Option<&'a str> {
    claims.get(name).and_then(Value::as_str)
}
