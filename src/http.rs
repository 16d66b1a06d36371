//! Shared HTTP plumbing: client construction and response classification.

use reqwest::{Client, Response, StatusCode};

use crate::{Error, Result};

/// Outcome of a remote call that did not fail fatally.
#[derive(Debug)]
pub enum Probe<T> {
    Found(T),
    /// The server answered 404; callers may try elsewhere.
    NotFound,
}

impl<T> Probe<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Probe<U> {
        match self {
            Probe::Found(v) => Probe::Found(f(v)),
            Probe::NotFound => Probe::NotFound,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Probe::Found(v) => Some(v),
            Probe::NotFound => None,
        }
    }
}

/// Build the client used for every request of one run.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("fedora-fetch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))
}

/// Sort a response into found / not found / fatal.
pub fn classify(url: &str, resp: Response) -> Result<Probe<Response>> {
    classify_status(url, resp.status()).map(|probe| probe.map(|()| resp))
}

fn classify_status(url: &str, status: StatusCode) -> Result<Probe<()>> {
    if status.is_success() {
        Ok(Probe::Found(()))
    } else if status == StatusCode::NOT_FOUND {
        Ok(Probe::NotFound)
    } else {
        Err(Error::Status {
            url: url.to_string(),
            status,
        })
    }
}

/// GET `url` and classify the answer.  Transport failures are fatal.
pub async fn get(client: &Client, url: &str) -> Result<Probe<Response>> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::transport(url, e))?;
    classify(url, resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_found() {
        assert!(matches!(
            classify_status("u", StatusCode::OK),
            Ok(Probe::Found(()))
        ));
    }

    #[test]
    fn not_found_is_recoverable() {
        assert!(matches!(
            classify_status("u", StatusCode::NOT_FOUND),
            Ok(Probe::NotFound)
        ));
    }

    #[test]
    fn other_statuses_are_fatal() {
        for status in [
            StatusCode::FORBIDDEN,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
        ] {
            let err = classify_status("https://example.test/x", status).unwrap_err();
            assert!(err.to_string().contains("https://example.test/x"), "{err}");
        }
    }

    #[test]
    fn probe_helpers() {
        assert_eq!(Probe::Found(2).map(|v| v * 2).found(), Some(4));
        assert_eq!(Probe::<i32>::NotFound.found(), None);
    }
}
