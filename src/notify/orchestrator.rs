//! Lead-creation notification fan-out.
//!
//! Three outbound calls fire for a freshly created lead: a welcome message
//! to the lead's contact, the brochure document to the same contact, and a
//! fixed-recipient internal alert. The recipient channels are independent,
//! so each step is caught independently (one failure must not prevent the
//! remaining steps) and the overall operation is reported successful if
//! any step succeeded.

use serde::Serialize;

use super::{CampaignConfig, CampaignMedia, CampaignRequest, CampaignSender, NotifyError};
use crate::db::DbLead;

pub const WELCOME_CAMPAIGN: &str = "lead_welcome";
pub const BROCHURE_CAMPAIGN: &str = "lead_brochure";
pub const INTERNAL_ALERT_CAMPAIGN: &str = "internal_new_lead";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationStep {
    Welcome,
    Brochure,
    InternalAlert,
}

/// Outcome of one notification step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step: NotificationStep,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-step results of the lead-creation fan-out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadCreatedNotifications {
    pub steps: Vec<StepResult>,
}

impl LeadCreatedNotifications {
    /// Overall success: any step got through.
    pub fn any_success(&self) -> bool {
        self.steps.iter().any(|s| s.success)
    }

    pub fn step(&self, step: NotificationStep) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.step == step)
    }
}

fn lead_destination(lead: &DbLead) -> Result<String, NotifyError> {
    if lead.phone.trim().is_empty() {
        return Err(NotifyError::MissingField("phone"));
    }
    Ok(lead.phone.clone())
}

fn welcome_request(lead: &DbLead, config: &CampaignConfig) -> Result<CampaignRequest, NotifyError> {
    Ok(CampaignRequest {
        api_key: config.api_key.clone(),
        campaign_name: WELCOME_CAMPAIGN.to_string(),
        destination: lead_destination(lead)?,
        user_name: lead.parent_name.clone(),
        template_params: vec![lead.parent_name.clone()],
        media: None,
    })
}

fn brochure_request(lead: &DbLead, config: &CampaignConfig) -> Result<CampaignRequest, NotifyError> {
    let url = config
        .brochure_url
        .clone()
        .ok_or(NotifyError::MissingField("brochureUrl"))?;
    let filename = url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("brochure.pdf")
        .to_string();
    Ok(CampaignRequest {
        api_key: config.api_key.clone(),
        campaign_name: BROCHURE_CAMPAIGN.to_string(),
        destination: lead_destination(lead)?,
        user_name: lead.parent_name.clone(),
        template_params: vec![lead.parent_name.clone()],
        media: Some(CampaignMedia { url, filename }),
    })
}

fn internal_request(lead: &DbLead, config: &CampaignConfig) -> Result<CampaignRequest, NotifyError> {
    if config.internal_recipient.trim().is_empty() {
        return Err(NotifyError::MissingField("internalRecipient"));
    }
    Ok(CampaignRequest {
        api_key: config.api_key.clone(),
        campaign_name: INTERNAL_ALERT_CAMPAIGN.to_string(),
        destination: config.internal_recipient.clone(),
        user_name: lead.parent_name.clone(),
        template_params: vec![
            lead.parent_name.clone(),
            lead.phone.clone(),
            lead.stage.clone(),
        ],
        media: None,
    })
}

async fn run_step(
    step: NotificationStep,
    request: Result<CampaignRequest, NotifyError>,
    sender: &dyn CampaignSender,
) -> StepResult {
    let outcome = match request {
        Ok(req) => sender.send(&req).await,
        // A validation failure blocks only this step.
        Err(e) => Err(e),
    };
    match outcome {
        Ok(()) => StepResult {
            step,
            success: true,
            error: None,
        },
        Err(e) => {
            log::warn!("notification step {step:?} failed: {e}");
            StepResult {
                step,
                success: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Fire the lead-creation notification sequence. The steps are logically
/// independent and are issued concurrently; their ordering among themselves
/// is not load-bearing. The caller must have persisted the lead already;
/// the lead id feeds history logging upstream.
pub async fn on_lead_created(
    lead: &DbLead,
    config: &CampaignConfig,
    sender: &dyn CampaignSender,
) -> LeadCreatedNotifications {
    let (welcome, brochure, internal) = tokio::join!(
        run_step(NotificationStep::Welcome, welcome_request(lead, config), sender),
        run_step(NotificationStep::Brochure, brochure_request(lead, config), sender),
        run_step(
            NotificationStep::InternalAlert,
            internal_request(lead, config),
            sender
        ),
    );

    LeadCreatedNotifications {
        steps: vec![welcome, brochure, internal],
    }
}
