//! Response classification.

use tracing::warn;

use crate::error::HostDbError;
use crate::http::HttpResponse;

/// Header carrying the server's diagnostic token on failing responses.
pub const TRACE_HEADER: &str = "Calltrace";

/// Detail of the most recent failing call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastStatus {
    pub code: u16,
    /// Status line, e.g. `404 Not Found`.
    pub message: String,
    /// Value of the `Calltrace` header, empty when the server sent none.
    pub trace: String,
}

impl LastStatus {
    /// Status detail carried by `response`.
    pub(crate) fn of(response: &HttpResponse) -> Self {
        Self {
            code: response.status,
            message: response.status_line(),
            trace: response.header(TRACE_HEADER).unwrap_or_default().to_string(),
        }
    }
}

/// Turn a response into its body text.
///
/// 200 and 201 succeed. Anything else overwrites `last_status` and yields
/// `RequestFailed`; a success leaves `last_status` untouched.
pub fn decode(response: HttpResponse, last_status: &mut LastStatus) -> Result<String, HostDbError> {
    if matches!(response.status, 200 | 201) {
        return Ok(response.body);
    }
    *last_status = LastStatus::of(&response);
    warn!(
        code = last_status.code,
        trace = %last_status.trace,
        "HostDB request failed"
    );
    Err(HostDbError::RequestFailed)
}
