use serde::{Deserialize, Serialize};

use crate::lead::LeadStatus;
use crate::types::{StageId, TemplateId, UserId};

/// Delivery channel for a message step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageChannel {
    Email,
    Sms,
}

impl MessageChannel {
    /// Return the wire representation of this channel.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

impl std::fmt::Display for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an assign-user step picks its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    /// Assign the configured user id.
    #[default]
    Specific,
    /// Rotate through a candidate pool. The pool lives outside the
    /// engine; without a resolved user id this behaves as a no-op.
    RoundRobin,
}

/// One unit of work within an automation.
///
/// A closed set: every kind carries its own typed configuration, and
/// the step executor dispatches through a single exhaustive match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Render a template against the lead and send it on a channel.
    SendMessage {
        template_id: TemplateId,
        #[serde(default = "default_channel")]
        channel: MessageChannel,
    },
    /// Set the lead's assigned user. No-op if `user_id` is absent.
    AssignUser {
        user_id: Option<UserId>,
        #[serde(default)]
        method: AssignmentMethod,
    },
    /// Move the lead to a pipeline stage. No-op if absent.
    MoveStage { stage_id: Option<StageId> },
    /// Change the lead's status. No-op if absent.
    ChangeStatus { status: Option<LeadStatus> },
    /// Add a tag to the lead's tag set (idempotent).
    AddTag { tag: String },
    /// Remove a tag from the lead's tag set if present.
    RemoveTag { tag: String },
    /// Suspend the enrollment for a delay; no lead mutation.
    Wait { delay_minutes: Option<u32> },
    /// Halt the enrollment.
    Stop,
}

fn default_channel() -> MessageChannel {
    MessageChannel::Email
}

impl StepAction {
    /// Short name of this action kind, for logs and timeline metadata.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "send_message",
            Self::AssignUser { .. } => "assign_user",
            Self::MoveStage { .. } => "move_stage",
            Self::ChangeStatus { .. } => "change_status",
            Self::AddTag { .. } => "add_tag",
            Self::RemoveTag { .. } => "remove_tag",
            Self::Wait { .. } => "wait",
            Self::Stop => "stop_automation",
        }
    }
}

/// A handler's instruction to the executor about what to schedule next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirective {
    /// Enqueue the next step immediately.
    Advance,
    /// Enqueue the next step after the given number of minutes.
    AdvanceAfter { delay_minutes: u32 },
    /// Terminate the enrollment as stopped; enqueue nothing.
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serde_tagged() {
        let action = StepAction::SendMessage {
            template_id: TemplateId::new("tpl-1"),
            channel: MessageChannel::Email,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "send_message");
        assert_eq!(json["template_id"], "tpl-1");

        let back: StepAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn send_message_channel_defaults_to_email() {
        let json = serde_json::json!({
            "action": "send_message",
            "template_id": "tpl-2"
        });
        let action: StepAction = serde_json::from_value(json).unwrap();
        assert_eq!(
            action,
            StepAction::SendMessage {
                template_id: TemplateId::new("tpl-2"),
                channel: MessageChannel::Email,
            }
        );
    }

    #[test]
    fn assignment_method_defaults_to_specific() {
        let json = serde_json::json!({
            "action": "assign_user",
            "user_id": "u1"
        });
        let action: StepAction = serde_json::from_value(json).unwrap();
        let StepAction::AssignUser { method, .. } = action else {
            panic!("wrong variant");
        };
        assert_eq!(method, AssignmentMethod::Specific);
    }

    #[test]
    fn action_names() {
        assert_eq!(StepAction::Stop.name(), "stop_automation");
        assert_eq!(
            StepAction::Wait {
                delay_minutes: Some(5)
            }
            .name(),
            "wait"
        );
    }
}
