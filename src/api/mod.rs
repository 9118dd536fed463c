pub mod ip_lookup;
pub mod programs;
pub mod submissions;

use serde::de::DeserializeOwned;

use crate::client::Client;
use crate::error::IntiError;

/// Join `segments` onto the API base URL, percent-encoding each one.
fn endpoint_url(base: &str, segments: &[&str]) -> Result<reqwest::Url, IntiError> {
    let invalid = |detail: String| IntiError::InvalidArgument(format!("Invalid API URL '{base}': {detail}"));
    let mut url = reqwest::Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl Client {
    /// Authenticated GET against the API, decoding the JSON body into `T`.
    ///
    /// Any status above 399 is reported as [`IntiError::HttpStatus`].
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T, IntiError> {
        let token = self.authenticate().await?;

        let mut url = endpoint_url(self.api_url(), segments)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let request = self
            .http()
            .inner()
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .build()
            .map_err(|e| IntiError::transport(format!("could not create {what} request"), e))?;

        let response = self
            .http()
            .execute(request, Some(&token.access_token))
            .await
            .map_err(|e| IntiError::transport(format!("could not get {what}"), e))?;

        if response.status.as_u16() > 399 {
            return Err(IntiError::HttpStatus {
                status: response.status.as_u16(),
                url: url.to_string(),
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| IntiError::decode(format!("could not decode {what}"), e))
    }
}
