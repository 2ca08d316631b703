use stagecraft_auth::request_id_or_new;

/// Correlation id for a request.
///
/// Present on every request, authenticated or not; echoed in the envelope and
/// the `x-request-id` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// The caller's id when present, else a fresh one.
    pub fn from_header(header: Option<&str>) -> Self {
        Self(request_id_or_new(header))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
