use crate::client::Client;
use crate::error::IntiError;
use crate::types::Program;

const PROGRAMS_PATH: &[&str] = &["company", "v2", "programs"];

impl Client {
    /// List every program of the company.
    pub async fn programs(&self) -> Result<Vec<Program>, IntiError> {
        self.get_json(PROGRAMS_PATH, &[], "programs").await
    }
}
