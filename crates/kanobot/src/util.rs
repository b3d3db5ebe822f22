use crate::prelude::*;

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct DebugShim<T>(pub T);

impl<T> fmt::Debug for DebugShim<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

impl<T> From<T> for DebugShim<T> {
    fn from(val: T) -> Self { Self(val) }
}

fn client_builder(connect_timeout: Duration) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .connect_timeout(connect_timeout)
}

/// An HTTP client bounding every request by `timeout`
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    client_builder(timeout)
        .timeout(timeout)
        .build()
        .context("Error building HTTP client")
}

/// An HTTP client with no total request timeout, for long-lived streams
pub fn stream_client(connect_timeout: Duration) -> Result<reqwest::Client> {
    client_builder(connect_timeout)
        .build()
        .context("Error building streaming HTTP client")
}
