//! Shared HTTP constants (headers, problem URIs, upload limits).

pub(crate) const HEADER_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub(crate) const DEFAULT_SCHEME: &str = "http";

pub(crate) const PROBLEM_INTERNAL: &str = "https://torrlib.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://torrlib.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://torrlib.dev/problems/not-found";

pub(crate) const MAX_METAINFO_BYTES: usize = 5 * 1024 * 1024;
