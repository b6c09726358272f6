//! Maps transport status codes onto domain errors.

use tracing::info;

use super::HttpResponse;
use crate::error::{Error, Result};

/// 401 is an authentication failure, anything but 200/201 is a request failure.
pub fn classify(response: HttpResponse) -> Result<HttpResponse> {
    match response.status {
        200 | 201 => Ok(response),
        401 => {
            info!(body = %response.body, "request rejected: invalid API key");
            Err(Error::AuthenticationInvalid)
        }
        status => {
            info!(status, body = %response.body, "request failed");
            Err(Error::RequestFailed {
                status,
                body: response.body,
            })
        }
    }
}
