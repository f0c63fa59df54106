//! Request and response bodies exchanged over HTTP.

use serde::{Deserialize, Serialize};

/// RFC9457 problem document returned for every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short, human-readable summary.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Occurrence-specific explanation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

/// Envelope for `POST /torrents`, discriminated by the `action` field.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum TorrentAction {
    /// Register a torrent from a link.
    Add(AddTorrentBody),
    /// Fetch the status of one torrent.
    Get(HashBody),
    /// Change descriptive fields.
    Set(SetTorrentBody),
    /// Remove a torrent together with its library entries.
    Rem(HashBody),
    /// List every torrent.
    List,
    /// Evict a torrent from the engine, keeping stored state.
    Drop(HashBody),
    /// Remove every torrent.
    Wipe,
}

impl TorrentAction {
    /// Lowercase action name, used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Get(_) => "get",
            Self::Set(_) => "set",
            Self::Rem(_) => "rem",
            Self::List => "list",
            Self::Drop(_) => "drop",
            Self::Wipe => "wipe",
        }
    }
}

/// Fields accepted by the add action and the media-server endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AddTorrentBody {
    /// Magnet URI, bare info-hash, or `.torrent` URL. Required.
    pub link: Option<String>,
    /// Explicit title.
    pub title: Option<String>,
    /// Category label.
    pub category: Option<String>,
    /// Poster URL.
    pub poster: Option<String>,
    /// Free-form client payload.
    pub data: Option<String>,
    /// Library sub-directory placed between the category and the torrent.
    #[serde(alias = "strm_dir")]
    pub custom_dir: Option<String>,
    /// Write the record to the store once metadata arrives.
    #[serde(alias = "save_to_db")]
    pub persist: bool,
}

/// Body carrying only the identifying hash.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HashBody {
    /// Info-hash of the target torrent. Required.
    pub hash: Option<String>,
}

/// Fields accepted by the set action.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SetTorrentBody {
    /// Info-hash of the target torrent. Required.
    pub hash: Option<String>,
    /// New title.
    pub title: Option<String>,
    /// New category label.
    pub category: Option<String>,
    /// New poster URL.
    pub poster: Option<String>,
    /// New client payload.
    pub data: Option<String>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Build identifier.
    pub build: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_decode_by_tag() {
        let add: TorrentAction = serde_json::from_str(
            r#"{"action":"add","link":"magnet:?xt=urn:btih:abc","strm_dir":"Kids","save_to_db":true}"#,
        )
        .expect("add decodes");
        let TorrentAction::Add(body) = add else {
            panic!("expected add action");
        };
        assert_eq!(body.custom_dir.as_deref(), Some("Kids"));
        assert!(body.persist);
        assert!(body.title.is_none());

        let list: TorrentAction =
            serde_json::from_str(r#"{"action":"list","hash":"ignored"}"#).expect("list decodes");
        assert_eq!(list, TorrentAction::List);

        let rem: TorrentAction = serde_json::from_str(r#"{"action":"rem"}"#).expect("rem decodes");
        assert_eq!(rem, TorrentAction::Rem(HashBody { hash: None }));
        assert_eq!(rem.name(), "rem");
    }

    #[test]
    fn unknown_actions_are_rejected() {
        assert!(serde_json::from_str::<TorrentAction>(r#"{"action":"explode"}"#).is_err());
        assert!(serde_json::from_str::<TorrentAction>(r#"{"hash":"abc"}"#).is_err());
    }

    #[test]
    fn problem_details_omit_missing_detail() {
        let problem = ProblemDetails {
            kind: "https://torrlib.dev/problems/not-found".to_string(),
            title: "resource not found".to_string(),
            status: 404,
            detail: None,
        };
        let json = serde_json::to_value(&problem).expect("serialize");
        assert_eq!(json["type"], "https://torrlib.dev/problems/not-found");
        assert!(json.get("detail").is_none());
    }
}
