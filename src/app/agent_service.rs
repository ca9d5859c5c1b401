//! Live, uncached lookups through the Emergent Agent proxy.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::domain::{
    AgentBalance, AgentHealth, AppError, ChainId, ExplorerClient, HealthStatus, NativeToken,
    PriceOracle, TransactionRecord, UpstreamError, wei_to_native,
};

const SERVICE_NAME: &str = "emergent-agent";

/// Alternative Ethereum explorer path. Every call goes upstream.
pub struct AgentService {
    agent: Arc<dyn ExplorerClient>,
    price_oracle: Arc<dyn PriceOracle>,
}

impl AgentService {
    #[must_use]
    pub fn new(agent: Arc<dyn ExplorerClient>, price_oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            agent,
            price_oracle,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_balance(&self, address: &str) -> Result<AgentBalance, AppError> {
        let balance_wei = self.agent.get_balance(address, ChainId::ETHEREUM).await?;
        let balance_eth = wei_to_native(&balance_wei).ok_or_else(|| {
            UpstreamError::unexpected(SERVICE_NAME, format!("non-numeric balance: {}", balance_wei))
        })?;
        let usd_estimate = self
            .price_oracle
            .get_price(NativeToken::Eth.symbol())
            .await
            .map(|price| balance_eth * price);

        Ok(AgentBalance {
            status: "ok".to_string(),
            address: address.to_string(),
            balance_wei,
            balance_eth,
            usd_estimate,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_transactions(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        if limit == 0 {
            return Ok(vec![]);
        }
        self.agent
            .get_transactions(address, ChainId::ETHEREUM, limit)
            .await
    }

    /// Check the agent. Failures are reported in the body, never raised.
    pub async fn health_check(&self) -> AgentHealth {
        match self.agent.health_check().await {
            Ok(()) => agent_health(HealthStatus::Healthy, "ok".to_string()),
            Err(e) => {
                warn!(error = %e, "Emergent Agent health check failed");
                agent_health(HealthStatus::Unhealthy, e.to_string())
            }
        }
    }
}

/// Health body reported when no agent is wired in
#[must_use]
pub fn agent_not_configured() -> AgentHealth {
    agent_health(
        HealthStatus::Unhealthy,
        "Emergent Agent is not configured".to_string(),
    )
}

fn agent_health(status: HealthStatus, message: String) -> AgentHealth {
    AgentHealth {
        service: SERVICE_NAME.to_string(),
        status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        ExplorerFailure, MockExplorerClient, MockPriceOracle, sample_transactions,
    };

    fn service(
        agent: MockExplorerClient,
        oracle: MockPriceOracle,
    ) -> (AgentService, Arc<MockExplorerClient>) {
        let agent = Arc::new(agent);
        let service = AgentService::new(
            Arc::clone(&agent) as Arc<dyn ExplorerClient>,
            Arc::new(oracle) as Arc<dyn PriceOracle>,
        );
        (service, agent)
    }

    #[tokio::test]
    async fn test_balance_with_usd_estimate() {
        let (service, _) = service(
            MockExplorerClient::new().with_balance("2000000000000000000"),
            MockPriceOracle::with_price(1500.0),
        );

        let balance = service.get_balance("0xabc").await.unwrap();

        assert_eq!(balance.status, "ok");
        assert_eq!(balance.address, "0xabc");
        assert_eq!(balance.balance_wei, "2000000000000000000");
        assert_eq!(balance.balance_eth, 2.0);
        assert_eq!(balance.usd_estimate, Some(3000.0));
    }

    #[tokio::test]
    async fn test_every_call_goes_upstream() {
        let (service, agent) = service(
            MockExplorerClient::new().with_balance("1"),
            MockPriceOracle::unavailable(),
        );

        let first = service.get_balance("0xabc").await.unwrap();
        service.get_balance("0xabc").await.unwrap();

        assert_eq!(first.usd_estimate, None);
        assert_eq!(agent.balance_calls(), 2);
    }

    #[tokio::test]
    async fn test_transactions_pass_limit_through() {
        let (service, agent) = service(
            MockExplorerClient::new().with_transactions(sample_transactions(5)),
            MockPriceOracle::unavailable(),
        );

        assert_eq!(service.get_transactions("0xabc", 2).await.unwrap().len(), 2);
        assert!(service.get_transactions("0xabc", 0).await.unwrap().is_empty());
        assert_eq!(agent.requested_tx_limits(), vec![2]);
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let (service, _) = service(
            MockExplorerClient::failing(ExplorerFailure::Upstream("NOTOK".into())),
            MockPriceOracle::with_price(1.0),
        );
        assert!(matches!(
            service.get_balance("0xabc").await,
            Err(AppError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_health_reports_instead_of_failing() {
        let (service, agent) = service(MockExplorerClient::new(), MockPriceOracle::unavailable());

        let health = service.health_check().await;
        assert_eq!(health.service, "emergent-agent");
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.message, "ok");

        agent.set_healthy(false);
        let health = service.health_check().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(health.message.contains("Unhealthy"));

        assert_eq!(agent_not_configured().status, HealthStatus::Unhealthy);
    }
}
