//! Builds runnable jobs from validated rules.

use std::sync::Arc;

use stupid_notify::email::EmailChannel;
use stupid_notify::file::FileChannel;
use stupid_notify::templating::TemplateRenderer;
use stupid_notify::webhook::WebhookChannel;
use stupid_notify::{Alert, Channel, NotifyError};
use stupid_rules::schema::OutputConfig;
use stupid_rules::Rule;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::job::{JobError, RuleJob};
use crate::leadership::Leadership;
use crate::search::SearchEngine;
use crate::state::ScheduleStateStore;

/// Collaborators shared by every job.
#[derive(Clone)]
pub struct JobContext {
    pub search: Arc<dyn SearchEngine>,
    pub state: Arc<dyn ScheduleStateStore>,
    pub leadership: Arc<dyn Leadership>,
}

pub struct JobFactory {
    context: JobContext,
    alerts: mpsc::Sender<Alert>,
    renderer: Arc<TemplateRenderer>,
    client: reqwest::Client,
}

impl JobFactory {
    pub fn new(context: JobContext, alerts: mpsc::Sender<Alert>) -> Self {
        Self {
            context,
            alerts,
            renderer: Arc::new(TemplateRenderer::new()),
            client: reqwest::Client::new(),
        }
    }

    /// Build the job for one rule.
    pub fn build(&self, rule: Rule) -> Result<RuleJob, JobError> {
        let channels = self.channels(&rule)?;
        RuleJob::new(
            rule,
            channels,
            Arc::clone(&self.context.search),
            Arc::clone(&self.context.state),
            Arc::clone(&self.context.leadership),
            self.alerts.clone(),
        )
    }

    /// Build a job per rule, logging and skipping rules that cannot run.
    pub fn build_all(&self, rules: &[Rule]) -> Vec<RuleJob> {
        let mut jobs = Vec::with_capacity(rules.len());
        for rule in rules {
            match self.build(rule.clone()) {
                Ok(job) => jobs.push(job),
                Err(e) => error!(rule = %rule.name, error = %e, "rule job not started"),
            }
        }
        info!(built = jobs.len(), total = rules.len(), "rule jobs built");
        jobs
    }

    /// Instantiate the rule's output channels.
    pub fn channels(&self, rule: &Rule) -> Result<Vec<Arc<dyn Channel>>, JobError> {
        if rule.outputs.is_empty() {
            return Err(JobError::NoChannels {
                rule: rule.name.clone(),
            });
        }
        rule.outputs
            .iter()
            .map(|output| {
                self.channel(output).map_err(|source| JobError::Channel {
                    rule: rule.name.clone(),
                    kind: output.kind(),
                    source,
                })
            })
            .collect()
    }

    fn channel(&self, output: &OutputConfig) -> Result<Arc<dyn Channel>, NotifyError> {
        let channel: Arc<dyn Channel> = match output {
            OutputConfig::File { file } => Arc::new(FileChannel::new(file)?),
            OutputConfig::Webhook {
                url,
                method,
                headers,
                body_template,
            } => Arc::new(WebhookChannel::from_config(
                url.clone(),
                method.clone(),
                headers.clone(),
                body_template.clone(),
                Arc::clone(&self.renderer),
                self.client.clone(),
            )?),
            OutputConfig::Email {
                smtp_host,
                smtp_port,
                tls,
                from,
                to,
                subject,
            } => Arc::new(EmailChannel::from_config(
                smtp_host,
                *smtp_port,
                *tls,
                from,
                to,
                subject.clone(),
                Arc::clone(&self.renderer),
            )?),
        };
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leadership::AlwaysLeader;
    use crate::state::MemoryStateStore;
    use crate::testing::{rule, ScriptedSearch};

    fn factory() -> (JobFactory, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(1);
        let context = JobContext {
            search: ScriptedSearch::new(vec![]),
            state: Arc::new(MemoryStateStore::new()),
            leadership: Arc::new(AlwaysLeader),
        };
        (JobFactory::new(context, tx), rx)
    }

    #[test]
    fn builds_one_channel_per_output() {
        let (factory, _rx) = factory();
        let mut r = rule("multi");
        r.outputs.push(OutputConfig::Webhook {
            url: "https://hooks.example.com/alerts".to_string(),
            method: Some("put".to_string()),
            headers: Default::default(),
            body_template: None,
        });
        r.outputs.push(OutputConfig::Email {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: Some(587),
            tls: Some(true),
            from: "alerts@example.com".to_string(),
            to: vec!["ops@example.com".to_string()],
            subject: None,
        });

        let names: Vec<String> = factory
            .channels(&r)
            .unwrap()
            .iter()
            .map(|c| c.channel_name().to_string())
            .collect();
        assert_eq!(names, vec!["file", "webhook", "email"]);
    }

    #[test]
    fn bad_output_names_rule_and_kind() {
        let (factory, _rx) = factory();
        let mut r = rule("broken email");
        r.outputs = vec![OutputConfig::Email {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: None,
            tls: None,
            from: "not an address".to_string(),
            to: vec!["ops@example.com".to_string()],
            subject: None,
        }];

        let err = factory.build(r).err().unwrap();
        match err {
            JobError::Channel { rule, kind, .. } => {
                assert_eq!(rule, "broken email");
                assert_eq!(kind, "email");
            }
            other => panic!("expected Channel error, got {other:?}"),
        }
    }

    #[test]
    fn build_all_skips_unbuildable_rules() {
        let (factory, _rx) = factory();
        let mut no_outputs = rule("no outputs");
        no_outputs.outputs.clear();
        let mut bad_cron = rule("bad cron");
        bad_cron.schedule = "61 * * * *".to_string();

        let jobs = factory.build_all(&[rule("ok"), no_outputs, bad_cron]);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].rule().name, "ok");
    }
}
