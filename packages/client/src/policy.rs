//! Response classification.
//!
//! Which status codes count as success depends on the kind of operation.
//! Rather than special-casing 404 and 409 at each call site, every request
//! carries a [`ResponsePolicy`] that maps a status to a [`Disposition`]:
//!
//! | Policy | 2xx | 404 | 409 | other |
//! |--------|-----|-----|-----|-------|
//! | `Lookup` | decode | absent | fail | fail |
//! | `Transaction` | decode | fail | decode | fail |
//! | `Strict` | decode | fail | fail | fail |

use reqwest::StatusCode;

/// How a request's response statuses are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponsePolicy {
    /// Reads and deletes: a 404 means "not there" and yields no payload.
    #[default]
    Lookup,
    /// `/v1/txn`: a 409 carries the rolled-back result and is decoded.
    Transaction,
    /// Anything but 2xx is a failure.
    Strict,
}

/// What to do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Decode the body into the expected type.
    Decode,
    /// Accepted, with no payload.
    Absent,
    /// Read the body as text and report a status failure.
    Fail,
}

impl ResponsePolicy {
    pub fn classify(self, status: StatusCode) -> Disposition {
        if status.is_success() {
            return Disposition::Decode;
        }
        match (self, status) {
            (ResponsePolicy::Lookup, StatusCode::NOT_FOUND) => Disposition::Absent,
            (ResponsePolicy::Transaction, StatusCode::CONFLICT) => Disposition::Decode,
            _ => Disposition::Fail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: [(ResponsePolicy, [Disposition; 4]); 3] = [
        (
            ResponsePolicy::Lookup,
            [Disposition::Decode, Disposition::Absent, Disposition::Fail, Disposition::Fail],
        ),
        (
            ResponsePolicy::Transaction,
            [Disposition::Decode, Disposition::Fail, Disposition::Decode, Disposition::Fail],
        ),
        (
            ResponsePolicy::Strict,
            [Disposition::Decode, Disposition::Fail, Disposition::Fail, Disposition::Fail],
        ),
    ];

    #[test]
    fn classification_table() {
        let statuses = [
            StatusCode::OK,
            StatusCode::NOT_FOUND,
            StatusCode::CONFLICT,
            StatusCode::INTERNAL_SERVER_ERROR,
        ];
        for (policy, expected) in ROWS {
            for (status, want) in statuses.iter().zip(expected) {
                assert_eq!(policy.classify(*status), want, "{policy:?} {status}");
            }
        }
    }

    #[test]
    fn any_2xx_decodes() {
        assert_eq!(ResponsePolicy::Strict.classify(StatusCode::NO_CONTENT), Disposition::Decode);
        assert_eq!(ResponsePolicy::Lookup.classify(StatusCode::CREATED), Disposition::Decode);
    }

    #[test]
    fn other_client_errors_fail_everywhere() {
        for policy in [ResponsePolicy::Lookup, ResponsePolicy::Transaction, ResponsePolicy::Strict] {
            assert_eq!(policy.classify(StatusCode::FORBIDDEN), Disposition::Fail);
            assert_eq!(policy.classify(StatusCode::BAD_REQUEST), Disposition::Fail);
        }
    }
}
