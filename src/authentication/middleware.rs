use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use super::jwt::{Session, SessionKeys};
use crate::error::ApiError;

pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Missing and invalid tokens are rejected the same way.
pub fn with_session(
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (Session,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            header
                .as_deref()
                .and_then(bearer_token)
                .and_then(|token| keys.verify(token))
                .map(Session::from)
                .ok_or_else(|| Rejection::from(ApiError::Unauthorized))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_bearer_headers_carry_tokens() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("abc.def.ghi"), None);
    }
}
