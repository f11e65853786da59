use crate::domain::Provider;
use crate::domain::Submission;
use crate::domain::SubscriptionOutcome;
use crate::domain::SubscriptionRequest;
use crate::domain::SERVER_ERROR;
use crate::providers::interpret;
use crate::providers::ProviderClients;
use crate::providers::SubmitRequest;
use crate::settings::SettingsStore;

/// Routes one visitor submission to the configured provider and translates
/// the provider's answer into a `SubscriptionOutcome`.
#[derive(Clone)]
pub struct SubscriptionDispatcher {
    settings: SettingsStore,
    clients: ProviderClients,
}

impl SubscriptionDispatcher {
    pub fn new(
        settings: SettingsStore,
        clients: ProviderClients,
    ) -> Self {
        Self { settings, clients }
    }

    /// Validate raw form fields, then dispatch. Invalid input never reaches
    /// a provider.
    pub async fn handle(
        &self,
        submission: Submission,
    ) -> SubscriptionOutcome {
        match SubscriptionRequest::try_from(submission) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => SubscriptionOutcome::error(e.to_string()),
        }
    }

    #[tracing::instrument(
        name = "Dispatching subscription",
        skip_all,
        fields(provider = %request.provider, list = %request.list)
    )]
    pub async fn dispatch(
        &self,
        request: SubscriptionRequest,
    ) -> SubscriptionOutcome {
        let Some(client) = self.clients.get(request.provider) else {
            // the browser should have posted to the custom form action
            return SubscriptionOutcome::error(format!(
                "The {} service does not accept submissions here.",
                request.provider.label()
            ));
        };

        let credential = match self.settings.credential(request.provider).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                tracing::warn!("no api key stored for provider");
                return SubscriptionOutcome::error(format!(
                    "{} is not configured yet.",
                    request.provider.label()
                ));
            }
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, error.message = %e, "Failed to read credential");
                return SubscriptionOutcome::error(SERVER_ERROR);
            }
        };
        let double_opt_in = match request.provider {
            Provider::MailChimp => self.settings.double_opt_in().await.unwrap_or_else(|e| {
                tracing::warn!(error.cause_chain = ?e, "Failed to read double opt-in, assuming off");
                false
            }),
            _ => false,
        };

        let submitted = client
            .submit(
                &credential,
                SubmitRequest {
                    list: &request.list,
                    email: &request.email,
                    name: request.name.as_ref(),
                    double_opt_in,
                },
            )
            .await;
        let raw = match submitted {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, error.message = %e, "Provider call failed");
                return SubscriptionOutcome::error(SERVER_ERROR);
            }
        };

        let outcome = interpret(request.provider, &raw.body);
        tracing::info!(status = raw.status, outcome = ?outcome, "Provider answered");
        outcome
    }
}
