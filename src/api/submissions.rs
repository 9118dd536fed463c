use crate::client::Client;
use crate::error::IntiError;
use crate::types::Submission;

const SUBMISSIONS_PATH: &[&str] = &["company", "v2", "submissions"];

fn program_submissions_path(program_id: &str) -> [&str; 5] {
    ["company", "v2", "programs", program_id, "submissions"]
}

impl Client {
    /// List submissions across all programs.
    pub async fn submissions(&self) -> Result<Vec<Submission>, IntiError> {
        self.get_json(SUBMISSIONS_PATH, &[], "submissions").await
    }

    /// List submissions of a single program.
    pub async fn program_submissions(&self, program_id: &str) -> Result<Vec<Submission>, IntiError> {
        let program_id = program_id.trim();
        if program_id.is_empty() {
            return Err(IntiError::InvalidArgument(format!(
                "Invalid program id '{program_id}'"
            )));
        }
        tracing::debug!(program_id, "listing submissions for program");
        self.get_json(&program_submissions_path(program_id), &[], "submissions")
            .await
    }
}
