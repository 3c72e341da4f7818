//! Delivery of deferred interaction results through Discord's webhook API

use tracing::debug;

use crate::shifts::Reply;

#[derive(Clone)]
pub struct FollowupClient {
    http: reqwest::Client,
    api_base: String,
}

impl FollowupClient {
    pub fn new(api_base: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Replace the "thinking..." placeholder left by a deferred response.
    pub async fn edit_original(
        &self,
        application_id: &str,
        interaction_token: &str,
        reply: &Reply,
    ) -> anyhow::Result<()> {
        let url = format!(
            "{}/webhooks/{}/{}/messages/@original",
            self.api_base, application_id, interaction_token
        );
        debug!("Sending follow-up for application {}", application_id);

        let response = self
            .http
            .patch(&url)
            .json(&serde_json::json!({ "embeds": [reply.embed_json()] }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Follow-up rejected with {}: {}",
                status,
                error_text
            ));
        }
        Ok(())
    }
}
