//! Ingestion job queue.

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;

use crate::error::CloudError;

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Publish one message body.
    async fn publish(&self, body: &str) -> Result<(), CloudError>;
}

/// [`JobQueue`] backed by an SQS queue.
#[derive(Clone)]
pub struct SqsJobQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsJobQueue {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl JobQueue for SqsJobQueue {
    async fn publish(&self, body: &str) -> Result<(), CloudError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                let err = CloudError::Queue(DisplayErrorContext(e).to_string());
                tracing::error!(error = %err, "Failed to send queue message");
                err
            })?;

        tracing::debug!(message_id = ?output.message_id(), "Queue message sent");
        Ok(())
    }
}
