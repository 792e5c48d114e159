// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error and Result implementations.

use std::fmt;

use reqwest::Error as HttpClientError;
use reqwest::StatusCode;

/// Kind of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Invalid management configuration.
    ///
    /// Reported at client construction time: malformed or missing BMC URL
    /// components, an unsupported driver type or missing credentials.
    InvalidConfig,

    /// Authentication failure.
    ///
    /// Maps to HTTP 401.
    AuthenticationFailed,

    /// Access denied.
    ///
    /// Maps to HTTP 403.
    AccessDenied,

    /// Requested resource was not found.
    ///
    /// Maps to HTTP 404 and 410, and to a selector matching no host where
    /// exactly one is required.
    ResourceNotFound,

    /// Request returned more items than expected.
    ///
    /// Reported by `select_one` when a selector is ambiguous.
    TooManyItems,

    /// A batch operation resolved its selector to an empty host set.
    NoHostsMatched,

    /// Invalid value passed to one of parameters.
    ///
    /// May be result of HTTP 400.
    InvalidInput,

    /// No mapping from the requested operation identifier to a client call.
    UnsupportedOperation,

    /// Protocol-level error reported by the underlying HTTP library.
    ProtocolError,

    /// Response received from the BMC is malformed.
    InvalidResponse,

    /// Internal server error.
    ///
    /// Maps to HTTP 5xx codes.
    InternalServerError,

    /// Polling budget exhausted without observing the target state.
    ///
    /// Distinct from `ProtocolError`: every poll succeeded, the hardware
    /// state did not converge.
    RetriesExceeded,

    /// The batch was cancelled before all hosts completed.
    Cancelled,

    /// One or more hosts in a batch failed.
    ///
    /// The per-host errors are available via [`Error::host_failures`].
    OperationFailed,
}

/// Error from an out-of-band management call.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    status: Option<StatusCode>,
    message: Option<String>,
    host: Option<String>,
    failures: Vec<Error>,
}

/// A result of an out-of-band management call.
pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    /// Create a new error of the given kind with the given message.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Error {
        Error {
            kind,
            status: None,
            message: Some(message.into()),
            host: None,
            failures: Vec::new(),
        }
    }

    pub(crate) fn new_with_details(
        kind: ErrorKind,
        status: Option<StatusCode>,
        message: Option<String>,
    ) -> Error {
        Error {
            kind,
            status,
            message,
            host: None,
            failures: Vec::new(),
        }
    }

    /// Aggregate per-host failures into one batch error.
    pub(crate) fn new_operation_failed(failures: Vec<Error>) -> Error {
        Error {
            kind: ErrorKind::OperationFailed,
            status: None,
            message: Some(format!("operation failed on {} host(s)", failures.len())),
            host: None,
            failures,
        }
    }

    /// Attach the identity of the host the error happened on.
    pub(crate) fn with_host<S: Into<String>>(mut self, host: S) -> Error {
        self.host = Some(host.into());
        self
    }

    pub(crate) fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status code, if the error was caused by a non-success response.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Name of the host the error happened on (for errors out of a batch).
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Per-host errors behind an `OperationFailed` aggregate.
    ///
    /// Empty for any other kind.
    pub fn host_failures(&self) -> &[Error] {
        &self.failures
    }
}

impl ErrorKind {
    /// Short description of the error kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::InvalidConfig => "Invalid management configuration",
            ErrorKind::AuthenticationFailed => "Failed to authenticate",
            ErrorKind::AccessDenied => "Access to the resource is denied",
            ErrorKind::ResourceNotFound => "Requested resource was not found",
            ErrorKind::TooManyItems => "Request returned too many items",
            ErrorKind::NoHostsMatched => "No hosts matched the selector",
            ErrorKind::InvalidInput => "Input value(s) are invalid or missing",
            ErrorKind::UnsupportedOperation => "Requested operation is not supported",
            ErrorKind::ProtocolError => "Error when accessing the BMC",
            ErrorKind::InvalidResponse => "Received invalid response",
            ErrorKind::InternalServerError => "Internal server error or bad gateway",
            ErrorKind::RetriesExceeded => "Retry budget exhausted waiting for the operation",
            ErrorKind::Cancelled => "Operation was cancelled",
            ErrorKind::OperationFailed => "Requested operation has failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref host) = self.host {
            write!(f, "{}: ", host)?;
        }

        write!(f, "{}", self.kind)?;

        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }

        if let Some(ref msg) = self.message {
            write!(f, ": {}", msg)?;
        }

        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }

        Ok(())
    }
}

impl ::std::error::Error for Error {}

impl From<HttpClientError> for Error {
    fn from(value: HttpClientError) -> Error {
        let msg = value.to_string();
        let kind = match value.status() {
            Some(status) => kind_from_status(status),
            None => ErrorKind::ProtocolError,
        };

        Error::new_with_details(kind, value.status(), Some(msg))
    }
}

/// Map a non-success HTTP status to an error kind.
pub(crate) fn kind_from_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED => ErrorKind::AuthenticationFailed,
        StatusCode::FORBIDDEN => ErrorKind::AccessDenied,
        StatusCode::NOT_FOUND | StatusCode::GONE => ErrorKind::ResourceNotFound,
        c if c.is_client_error() => ErrorKind::InvalidInput,
        c if c.is_server_error() => ErrorKind::InternalServerError,
        _ => ErrorKind::InvalidResponse,
    }
}

#[cfg(test)]
mod test {
    use super::{Error, ErrorKind};

    #[test]
    fn test_display_with_host_and_status() {
        let e = Error::new_with_details(
            ErrorKind::InternalServerError,
            Some(reqwest::StatusCode::BAD_GATEWAY),
            Some("bad gateway".into()),
        )
        .with_host("master-0");
        let s = e.to_string();
        assert!(s.starts_with("master-0: "));
        assert!(s.contains("502"));
        assert!(s.contains("bad gateway"));
    }

    #[test]
    fn test_aggregate_keeps_typed_failures() {
        let inner = Error::new(ErrorKind::RetriesExceeded, "never powered off").with_host("node-1");
        let agg = Error::new_operation_failed(vec![inner]);
        assert_eq!(agg.kind(), ErrorKind::OperationFailed);
        assert_eq!(agg.host_failures().len(), 1);
        assert_eq!(agg.host_failures()[0].kind(), ErrorKind::RetriesExceeded);
        assert_eq!(agg.host_failures()[0].host(), Some("node-1"));
    }
}
