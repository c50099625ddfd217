use tracing::debug;

use leadflow_core::{
    Lead, LeadUpdate, MessageChannel, StepAction, StepDirective, TemplateId, TenantId,
    TimelineEntry, TimelineEntryKind, lead_variables, render_template,
};
use leadflow_email::OutboundMessage;

use crate::engine::AutomationEngine;
use crate::error::HandlerError;

impl AutomationEngine {
    /// Run one step's action against a lead.
    ///
    /// Side effects (lead mutation, message send, timeline entries)
    /// happen synchronously before the directive is returned. The
    /// match is exhaustive over the closed action set; there is no
    /// unknown-action fallback.
    pub(crate) async fn run_action(
        &self,
        action: &StepAction,
        lead: &Lead,
        tenant: &TenantId,
    ) -> Result<StepDirective, HandlerError> {
        match action {
            StepAction::SendMessage {
                template_id,
                channel,
            } => {
                self.send_message(template_id, *channel, lead, tenant).await?;
                Ok(StepDirective::Advance)
            }

            StepAction::AssignUser { user_id, method } => {
                let Some(user_id) = user_id else {
                    // Round-robin resolution lives outside the engine;
                    // without a resolved user id both methods no-op.
                    debug!(method = ?method, "assign_user without user id, no-op");
                    return Ok(StepDirective::Advance);
                };

                self.leads
                    .update(
                        &lead.id,
                        LeadUpdate {
                            assigned_user_id: Some(user_id.clone()),
                            ..LeadUpdate::default()
                        },
                    )
                    .await?;

                self.record_timeline(
                    TimelineEntry::new(
                        tenant.clone(),
                        lead.id.clone(),
                        TimelineEntryKind::Assignment,
                        "Lead assigned via automation",
                    )
                    .with_metadata(serde_json::json!({ "to_user": user_id.as_str() })),
                )
                .await;
                Ok(StepDirective::Advance)
            }

            StepAction::MoveStage { stage_id } => {
                let Some(stage_id) = stage_id else {
                    return Ok(StepDirective::Advance);
                };

                self.leads
                    .update(
                        &lead.id,
                        LeadUpdate {
                            stage_id: Some(stage_id.clone()),
                            ..LeadUpdate::default()
                        },
                    )
                    .await?;

                self.record_timeline(
                    TimelineEntry::new(
                        tenant.clone(),
                        lead.id.clone(),
                        TimelineEntryKind::StageChange,
                        "Stage changed via automation",
                    )
                    .with_metadata(serde_json::json!({ "to_stage": stage_id.as_str() })),
                )
                .await;
                Ok(StepDirective::Advance)
            }

            StepAction::ChangeStatus { status } => {
                let Some(status) = status else {
                    return Ok(StepDirective::Advance);
                };

                self.leads
                    .update(
                        &lead.id,
                        LeadUpdate {
                            status: Some(*status),
                            ..LeadUpdate::default()
                        },
                    )
                    .await?;

                self.record_timeline(TimelineEntry::new(
                    tenant.clone(),
                    lead.id.clone(),
                    TimelineEntryKind::StatusChange,
                    format!("Status changed to {status} via automation"),
                ))
                .await;
                Ok(StepDirective::Advance)
            }

            StepAction::AddTag { tag } => {
                if !lead.tags.iter().any(|t| t == tag) {
                    let mut tags = lead.tags.clone();
                    tags.push(tag.clone());
                    self.leads
                        .update(
                            &lead.id,
                            LeadUpdate {
                                tags: Some(tags),
                                ..LeadUpdate::default()
                            },
                        )
                        .await?;
                }
                Ok(StepDirective::Advance)
            }

            StepAction::RemoveTag { tag } => {
                if lead.tags.iter().any(|t| t == tag) {
                    let tags = lead.tags.iter().filter(|t| *t != tag).cloned().collect();
                    self.leads
                        .update(
                            &lead.id,
                            LeadUpdate {
                                tags: Some(tags),
                                ..LeadUpdate::default()
                            },
                        )
                        .await?;
                }
                Ok(StepDirective::Advance)
            }

            StepAction::Wait { delay_minutes } => match delay_minutes {
                Some(minutes) if *minutes > 0 => Ok(StepDirective::AdvanceAfter {
                    delay_minutes: *minutes,
                }),
                // Absent or zero delay: a no-op wait.
                _ => Ok(StepDirective::Advance),
            },

            StepAction::Stop => Ok(StepDirective::Stop),
        }
    }

    /// Render a template against the lead and deliver it.
    async fn send_message(
        &self,
        template_id: &TemplateId,
        channel: MessageChannel,
        lead: &Lead,
        tenant: &TenantId,
    ) -> Result<(), HandlerError> {
        let address = match channel {
            MessageChannel::Email => lead.email.clone(),
            MessageChannel::Sms => lead.phone.clone(),
        };
        let Some(address) = address.filter(|a| !a.is_empty()) else {
            return Err(HandlerError::MissingAddress { channel });
        };

        let template = self
            .templates
            .get(template_id)
            .await?
            .filter(|t| t.active)
            .ok_or_else(|| HandlerError::TemplateNotFound(template_id.clone()))?;

        if self.messenger.channel() != channel {
            return Err(HandlerError::ChannelUnavailable { channel });
        }

        let variables = lead_variables(lead);
        let subject = render_template(&template.subject, &variables);
        let html = render_template(&template.body_html, &variables);
        let text = template
            .body_text
            .as_deref()
            .map(|t| render_template(t, &variables));

        self.messenger
            .send(&OutboundMessage {
                to: address,
                subject: subject.clone(),
                html,
                text,
            })
            .await?;

        let (entry_kind, content) = match channel {
            MessageChannel::Email => (
                TimelineEntryKind::EmailSent,
                format!("Email sent: {subject}"),
            ),
            MessageChannel::Sms => (TimelineEntryKind::SmsSent, format!("SMS sent: {subject}")),
        };
        self.record_timeline(
            TimelineEntry::new(tenant.clone(), lead.id.clone(), entry_kind, content)
                .with_metadata(serde_json::json!({ "subject": subject })),
        )
        .await;

        Ok(())
    }
}
