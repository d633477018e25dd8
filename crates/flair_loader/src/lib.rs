//! The extraction loader.
//!
//! Extracted styles travel to the CSS pipeline inside a request query, `?css=<base64>`.
//! [`load`] recovers the stylesheet bytes, [`extraction_request`] builds such a request.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use url::form_urlencoded;

const CSS_PARAM: &str = "css";

const DECODE_CONFIG: GeneralPurposeConfig =
  GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, DECODE_CONFIG);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, DECODE_CONFIG);

/// Decode the `css` query parameter of `resource`.
///
/// `resource` is either `path?query` or a bare query. A missing or malformed parameter
/// yields an empty stylesheet.
pub fn load(resource: &str) -> Vec<u8> {
  let query = match resource.split_once('?') {
    Some((_, query)) => query,
    None => resource,
  };

  let Some(encoded) = form_urlencoded::parse(query.as_bytes())
    .find(|(key, _)| key == CSS_PARAM)
    .map(|(_, value)| value.replace(' ', "+"))
  else {
    tracing::debug!(resource, "Extraction request without css parameter");
    return Vec::new();
  };

  match STANDARD
    .decode(&encoded)
    .or_else(|_| URL_SAFE.decode(&encoded))
  {
    Ok(css) => css,
    Err(error) => {
      tracing::debug!(resource, %error, "Malformed css parameter");
      Vec::new()
    }
  }
}

/// Append `css` to `resource` as the query parameter [`load`] reads.
pub fn extraction_request(resource: &str, css: &[u8]) -> String {
  let query = form_urlencoded::Serializer::new(String::new())
    .append_pair(CSS_PARAM, &base64::prelude::BASE64_STANDARD.encode(css))
    .finish();

  let separator = if resource.contains('?') { '&' } else { '?' };
  format!("{resource}{separator}{query}")
}
