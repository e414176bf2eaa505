use std::time::Duration;
use ureq::Agent;
use crate::errors::FetchError;

/// Transport used to GET a JSON document from the upstream API
pub trait HttpSource {
    /// Performs a GET request and returns the response body
    ///
    /// # Arguments
    ///
    /// * 'url' - the url, excluding the query
    /// * 'query' - query parameters
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<String, FetchError>;
}

/// HttpSource backed by a ureq agent
pub struct UreqSource {
    agent: Agent,
}

impl UreqSource {
    /// Returns a new UreqSource
    ///
    /// # Arguments
    ///
    /// * 'timeout' - global timeout for each request
    pub fn new(timeout: Duration) -> UreqSource {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        let agent = config.into();

        UreqSource { agent }
    }
}

impl HttpSource for UreqSource {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<String, FetchError> {
        let mut req = self.agent.get(url);
        for (k, v) in query {
            req = req.query(k, v);
        }

        let json = req
            .call()?
            .body_mut()
            .read_to_string()?;

        Ok(json)
    }
}
