//! `.torrent` decoding on top of `librqbit-core`.
//!
//! Only the fields the library needs are kept: the info-hash, the torrent
//! name, the file list, and announce URLs.

use librqbit_core::torrent_metainfo::{TorrentMetaV1Owned, torrent_from_bytes};

use crate::error::{TorrentError, TorrentResult};
use crate::model::{InfoHash, Metainfo, MetainfoFile, TorrentSpec};

const fn malformed(reason: &'static str) -> TorrentError {
    TorrentError::InvalidSpec {
        reason,
        detail: None,
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Decode a `.torrent` payload into a spec that carries its metainfo.
///
/// # Errors
///
/// Returns [`TorrentError::InvalidSpec`] for malformed bencode, a missing
/// `info` dictionary, or an info dictionary without a name or files.
pub fn parse_metainfo(bytes: &[u8]) -> TorrentResult<TorrentSpec> {
    let torrent: TorrentMetaV1Owned = torrent_from_bytes(bytes)
        .map_err(|err| TorrentError::invalid_spec("malformed_metainfo", format!("{err:#}")))?;
    let info = &torrent.info;

    let name = info
        .name
        .as_ref()
        .map(|name| text(name.as_ref()))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| malformed("missing_name"))?;

    let files = match info.files.as_ref() {
        Some(entries) if entries.is_empty() => return Err(malformed("missing_files")),
        Some(entries) => entries
            .iter()
            .map(|entry| {
                if entry.path.is_empty() {
                    return Err(malformed("missing_path"));
                }
                let segments: Vec<String> =
                    entry.path.iter().map(|part| text(part.as_ref())).collect();
                Ok(MetainfoFile {
                    path: segments.join("/"),
                    length: entry.length,
                })
            })
            .collect::<TorrentResult<Vec<_>>>()?,
        None => {
            let length = info.length.ok_or_else(|| malformed("missing_length"))?;
            vec![MetainfoFile {
                path: name.clone(),
                length,
            }]
        }
    };

    let info_hash: InfoHash = torrent
        .info_hash
        .as_string()
        .parse()
        .map_err(|_| malformed("invalid_info_hash"))?;

    let mut trackers: Vec<String> = Vec::new();
    let announce = torrent.announce.iter();
    let tiers = torrent.announce_list.iter().flatten();
    for url in announce.chain(tiers).map(|url| text(url.as_ref())) {
        if !url.is_empty() && !trackers.contains(&url) {
            trackers.push(url);
        }
    }

    Ok(TorrentSpec {
        info_hash,
        display_name: Some(name.clone()),
        trackers,
        metainfo: Some(Metainfo { name, files }),
    })
}
