//! Link normalisation: magnet URIs, bare info-hashes, and remote metainfo URLs.

use data_encoding::BASE32;

use crate::error::{TorrentError, TorrentResult};
use crate::model::{InfoHash, TorrentSpec};

const MAGNET_PREFIX: &str = "magnet:?";
const BTIH: &str = "btih";
const BASE32_HASH_LEN: usize = 32;

/// Outcome of parsing a user-supplied link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLink {
    /// Link already describes the torrent.
    Spec(TorrentSpec),
    /// Link points at a `.torrent` document that must be downloaded first.
    Remote(String),
}

/// Undo the HTML entity escaping some clients apply to query strings.
#[must_use]
pub fn decode_html_entities(raw: &str) -> String {
    raw.replace("&amp;", "&")
}

/// Parse a magnet URI, a bare 40-character info-hash, or an `http(s)` URL.
///
/// # Errors
///
/// Returns [`TorrentError::InvalidSpec`] when the link matches none of the
/// supported forms or a magnet URI lacks a usable `btih` topic.
pub fn parse_link(raw: &str) -> TorrentResult<ParsedLink> {
    let link = decode_html_entities(raw.trim());
    if link.is_empty() {
        return Err(TorrentError::InvalidSpec {
            reason: "empty_link",
            detail: None,
        });
    }

    let lower = link.to_ascii_lowercase();
    if lower.starts_with(MAGNET_PREFIX) {
        let normalized = format!("{MAGNET_PREFIX}{}", &link[MAGNET_PREFIX.len()..]);
        return parse_magnet(&normalized).map(ParsedLink::Spec);
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(ParsedLink::Remote(link));
    }
    if let Ok(info_hash) = link.parse::<InfoHash>() {
        return Ok(ParsedLink::Spec(TorrentSpec {
            info_hash,
            display_name: None,
            trackers: Vec::new(),
            metainfo: None,
        }));
    }

    Err(TorrentError::invalid_spec("unsupported_link", link))
}

fn parse_magnet(link: &str) -> TorrentResult<TorrentSpec> {
    let magnet = magnet_url::Magnet::new(link)
        .map_err(|err| TorrentError::invalid_spec("invalid_magnet", err.to_string()))?;

    let topic = magnet
        .hash_type()
        .map(|kind| kind.trim_start_matches("urn:"))
        .filter(|kind| kind.eq_ignore_ascii_case(BTIH));
    let hash = topic
        .and(magnet.hash())
        .ok_or_else(|| TorrentError::invalid_spec("missing_info_hash", link))?;

    Ok(TorrentSpec {
        info_hash: topic_hash(&decode_component(hash))?,
        display_name: magnet
            .display_name()
            .map(decode_component)
            .filter(|name| !name.trim().is_empty()),
        trackers: magnet
            .trackers()
            .iter()
            .map(|tracker| decode_component(tracker))
            .collect(),
        metainfo: None,
    })
}

/// Accepts the hex form or the 32-character base32 form of a `btih` topic.
fn topic_hash(hash: &str) -> TorrentResult<InfoHash> {
    if hash.len() == BASE32_HASH_LEN {
        let bytes = BASE32
            .decode(hash.to_ascii_uppercase().as_bytes())
            .ok()
            .and_then(|bytes| <[u8; 20]>::try_from(bytes).ok())
            .ok_or_else(|| TorrentError::invalid_spec("invalid_base32_hash", hash))?;
        return Ok(InfoHash::from_bytes(bytes));
    }
    hash.parse()
        .map_err(|_| TorrentError::invalid_spec("invalid_info_hash", hash))
}

fn decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    urlencoding::decode(&spaced).map_or_else(|_| spaced.clone(), std::borrow::Cow::into_owned)
}
