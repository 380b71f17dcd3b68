//! Slack notifications through an incoming webhook.

use async_trait::async_trait;
use jobrun_core::{Context, JobError, Middleware, Next};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::SlackError;

const USERNAME: &str = "JobRun";
const PAYLOAD_FIELD: &str = "payload";
const INSTANCE_PLACEHOLDER: &str = "###instance_name###";

const COLOR_FAILED: &str = "#F35A00";
const COLOR_SKIPPED: &str = "#FFA500";
const COLOR_SUCCESSFUL: &str = "#7CD197";

/// Settings of the Slack middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SlackConfig {
    /// Incoming webhook URL. Notifications are disabled when empty.
    pub slack_webhook: String,

    /// Only notify about failed runs.
    pub slack_only_on_error: bool,

    /// Link to the run logs. `###instance_name###` is replaced by the run's
    /// instance suffix.
    pub slack_logs_url: String,
}

/// Message posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackMessage {
    pub text: String,
    pub username: String,
    pub attachments: Vec<SlackAttachment>,
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackAttachment {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub text: String,
}

/// Posts the outcome of every run (or only failed ones) to Slack.
pub struct Slack {
    config: SlackConfig,
    http: reqwest::Client,
}

impl Slack {
    /// Create the middleware, or `None` when no webhook is configured.
    pub fn new(config: SlackConfig) -> Option<Self> {
        if config.slack_webhook.is_empty() {
            return None;
        }

        Some(Self {
            config,
            http: reqwest::Client::new(),
        })
    }

    /// Message describing the closed execution of `ctx`.
    pub fn build_message(&self, ctx: &Context) -> SlackMessage {
        let execution = &ctx.execution;
        let text = format!(
            "Job *{}* finished in *{:?}*\n```{}```",
            ctx.job.name(),
            execution.duration.unwrap_or_default(),
            ctx.job.command()
        );

        let attachment = if execution.failed {
            let mut text = execution
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            if !self.config.slack_logs_url.is_empty() {
                text.push_str(&format!(
                    "\n<{}|show logs>",
                    self.logs_url(&ctx.instance_name)
                ));
            }
            SlackAttachment {
                color: COLOR_FAILED.to_string(),
                title: "Execution failed".to_string(),
                text,
            }
        } else if execution.skipped {
            SlackAttachment {
                color: COLOR_SKIPPED.to_string(),
                title: "Execution skipped".to_string(),
                text: String::new(),
            }
        } else {
            SlackAttachment {
                color: COLOR_SUCCESSFUL.to_string(),
                title: "Execution successful".to_string(),
                text: String::new(),
            }
        };

        SlackMessage {
            text,
            username: USERNAME.to_string(),
            attachments: vec![attachment],
            icon_url: String::new(),
        }
    }

    /// Logs link for `instance_name`, whose `<name>_` prefix is dropped.
    fn logs_url(&self, instance_name: &str) -> String {
        let suffix = instance_name
            .split_once('_')
            .map(|(_, rest)| rest)
            .unwrap_or(instance_name);
        self.config
            .slack_logs_url
            .replacen(INSTANCE_PLACEHOLDER, suffix, 1)
    }

    async fn push_message(&self, message: &SlackMessage) -> Result<(), SlackError> {
        let payload = serde_json::to_string(message)?;
        let response = self
            .http
            .post(&self.config.slack_webhook)
            .form(&[(PAYLOAD_FIELD, payload)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Middleware for Slack {
    fn name(&self) -> &str {
        "slack"
    }

    fn continue_on_stop(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), JobError> {
        let result = next.run(ctx).await;
        ctx.stop(result.clone());

        if ctx.execution.failed || !self.config.slack_only_on_error {
            let message = self.build_message(ctx);
            match self.push_message(&message).await {
                Ok(()) => debug!(parent: &ctx.span, "Slack notification sent"),
                Err(e) => error!(
                    parent: &ctx.span,
                    webhook = %self.config.slack_webhook,
                    error = %e,
                    "Slack notification failed"
                ),
            }
        }

        result
    }
}
