//! HTTP-based integration tests for the Etherscan, Emergent Agent and
//! CoinGecko adapters.
//!
//! Uses `wiremock` to serve canned upstream responses.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param, query_param_is_missing},
};

use chain_data_gateway::domain::{
    AppError, ChainId, ConfigError, ExplorerClient, PriceOracle, TransportError, UpstreamError,
};
use chain_data_gateway::infra::{CoinGeckoPriceOracle, EmergentAgentClient, EtherscanClient};

// ============================================================================
// ETHERSCAN CLIENT TESTS
// ============================================================================

mod etherscan_tests {
    use super::*;

    const ADDRESS: &str = "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae";

    fn client_for(server: &MockServer) -> EtherscanClient {
        EtherscanClient::new(
            Some(SecretString::from("test-key".to_string())),
            Some(format!("{}/v2/api", server.uri())),
        )
        .unwrap()
    }

    fn raw_tx(hash: &str, timestamp: u64) -> serde_json::Value {
        json!({
            "hash": hash,
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x2222222222222222222222222222222222222222",
            "value": "250000000000000000",
            "timeStamp": timestamp.to_string(),
            "blockNumber": "19000000",
            "gasUsed": "21000",
            "nonce": "7"
        })
    }

    #[tokio::test]
    async fn test_balance_bare_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/api"))
            .and(query_param("module", "account"))
            .and(query_param("action", "balance"))
            .and(query_param("address", ADDRESS))
            .and(query_param("chainid", "1"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "message": "OK",
                "result": "1500000000000000000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let wei = client_for(&server)
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap();
        assert_eq!(wei, "1500000000000000000");
    }

    #[tokio::test]
    async fn test_balance_nested_shape_and_numeric_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("chainid", "80002"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1,
                "result": {"balance": "42"}
            })))
            .mount(&server)
            .await;

        let wei = client_for(&server)
            .get_balance(ADDRESS, ChainId::POLYGON_AMOY)
            .await
            .unwrap();
        assert_eq!(wei, "42");
    }

    #[tokio::test]
    async fn test_balance_without_status_field_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "7"})))
            .mount(&server)
            .await;

        let wei = client_for(&server)
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap();
        assert_eq!(wei, "7");
    }

    #[tokio::test]
    async fn test_balance_logical_error_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "0",
                "message": "NOTOK",
                "result": "Invalid address format"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_balance("0xnope", ChainId::ETHEREUM)
            .await
            .unwrap_err();
        match err {
            AppError::Upstream(UpstreamError::Api { message, .. }) => {
                assert_eq!(message, "NOTOK: Invalid address format");
            }
            other => panic!("expected upstream api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_balance_unexpected_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "result": [1, 2, 3]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Upstream(UpstreamError::UnexpectedShape { .. })
        ));
    }

    #[tokio::test]
    async fn test_balance_non_numeric_wei_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "result": "12.5"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_http_error_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap_err();
        match err {
            AppError::Transport(TransportError::HttpStatus { status, .. }) => {
                assert_eq!(status, 502)
            }
            other => panic!("expected HTTP status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Upstream(UpstreamError::UnexpectedShape { .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "1", "result": "1"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = EtherscanClient::with_timeout(
            Some(SecretString::from("test-key".to_string())),
            Some(format!("{}/v2/api", server.uri())),
            Duration::from_millis(50),
        )
        .unwrap();

        let err = client
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_missing_api_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = EtherscanClient::new(None, Some(format!("{}/v2/api", server.uri()))).unwrap();
        let err = client
            .get_transactions(ADDRESS, ChainId::ETHEREUM, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Missing(_))));
    }

    #[tokio::test]
    async fn test_transactions_bare_shape_sorted_and_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "txlist"))
            .and(query_param("offset", "2"))
            .and(query_param("sort", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "message": "OK",
                "result": [
                    raw_tx("0xold", 1_700_000_000),
                    raw_tx("0xnew", 1_700_000_600),
                    raw_tx("0xmid", 1_700_000_300)
                ]
            })))
            .mount(&server)
            .await;

        let txs = client_for(&server)
            .get_transactions(ADDRESS, ChainId::ETHEREUM, 2)
            .await
            .unwrap();

        let hashes: Vec<_> = txs.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xnew", "0xmid"]);
        assert_eq!(txs[0].value_native, 0.25);
        assert_eq!(txs[0].timestamp.timestamp(), 1_700_000_600);
        assert_eq!(txs[0].gas_used, "21000");
    }

    #[tokio::test]
    async fn test_transactions_nested_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "result": {"transactions": [raw_tx("0xa", 1_700_000_000)]}
            })))
            .mount(&server)
            .await;

        let txs = client_for(&server)
            .get_transactions(ADDRESS, ChainId::ETHEREUM, 10)
            .await
            .unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[tokio::test]
    async fn test_contract_creation_has_empty_to_address() {
        let server = MockServer::start().await;
        let mut tx = raw_tx("0xdeploy", 1_700_000_000);
        tx["to"] = json!("");
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "1", "result": [tx]})),
            )
            .mount(&server)
            .await;

        let txs = client_for(&server)
            .get_transactions(ADDRESS, ChainId::ETHEREUM, 10)
            .await
            .unwrap();
        assert_eq!(txs[0].to_address, "");
    }

    #[tokio::test]
    async fn test_no_transactions_found_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "0",
                "message": "No transactions found",
                "result": []
            })))
            .mount(&server)
            .await;

        let txs = client_for(&server)
            .get_transactions(ADDRESS, ChainId::ETHEREUM, 3)
            .await
            .unwrap();
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_transaction_entry_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "result": [{"hash": "0xa"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_transactions(ADDRESS, ChainId::ETHEREUM, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_health_check_queries_zero_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("address", "0x0000000000000000000000000000000000000000"))
            .and(query_param("chainid", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "1", "result": "0"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).health_check().await.unwrap();
    }
}

// ============================================================================
// EMERGENT AGENT CLIENT TESTS
// ============================================================================

mod emergent_agent_tests {
    use super::*;

    const ADDRESS: &str = "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae";

    fn client_for(server: &MockServer) -> EmergentAgentClient {
        EmergentAgentClient::new(Some(server.uri())).unwrap()
    }

    fn raw_tx(hash: &str, timestamp: u64) -> serde_json::Value {
        json!({
            "hash": hash,
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x2222222222222222222222222222222222222222",
            "value": "1000000000000000000",
            "timeStamp": timestamp.to_string(),
            "blockNumber": "19000000",
            "gasUsed": "21000"
        })
    }

    #[tokio::test]
    async fn test_balance_without_chain_or_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("module", "account"))
            .and(query_param("action", "balance"))
            .and(query_param("address", ADDRESS))
            .and(query_param("tag", "latest"))
            .and(query_param_is_missing("chainid"))
            .and(query_param_is_missing("apikey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "message": "OK",
                "result": "2500000000000000000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let wei = client_for(&server)
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap();
        assert_eq!(wei, "2500000000000000000");
    }

    #[tokio::test]
    async fn test_numeric_or_missing_status_is_rejected() {
        for body in [json!({"status": 1, "result": "1"}), json!({"result": "1"})] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;

            let err = client_for(&server)
                .get_balance(ADDRESS, ChainId::ETHEREUM)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Upstream(UpstreamError::Api { .. })));
        }
    }

    #[tokio::test]
    async fn test_logical_error_carries_agent_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "0",
                "message": "Max rate limit reached"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Max rate limit reached"));
    }

    #[tokio::test]
    async fn test_http_error_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Transport(TransportError::HttpStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "1", "result": "1"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client =
            EmergentAgentClient::with_timeout(Some(server.uri()), Duration::from_millis(50)).unwrap();
        let err = client
            .get_balance(ADDRESS, ChainId::ETHEREUM)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_transactions_truncated_to_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "txlist"))
            .and(query_param("offset", "2"))
            .and(query_param("sort", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "message": "OK",
                "result": [raw_tx("0xc", 300), raw_tx("0xb", 200), raw_tx("0xa", 100)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let txs = client_for(&server)
            .get_transactions(ADDRESS, ChainId::ETHEREUM, 2)
            .await
            .unwrap();
        let hashes: Vec<_> = txs.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xc", "0xb"]);
        assert_eq!(txs[0].value_native, 1.0);
    }

    #[tokio::test]
    async fn test_no_transactions_found_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "0",
                "message": "No transactions found",
                "result": []
            })))
            .mount(&server)
            .await;

        let txs = client_for(&server)
            .get_transactions(ADDRESS, ChainId::ETHEREUM, 5)
            .await
            .unwrap();
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn test_other_chains_make_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_transactions(ADDRESS, ChainId::POLYGON_AMOY, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_health_check_queries_zero_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("address", "0x0000000000000000000000000000000000000000"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "1", "result": "0"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).health_check().await.unwrap();
    }
}

// ============================================================================
// COINGECKO PRICE ORACLE TESTS
// ============================================================================

mod coingecko_tests {
    use super::*;

    fn oracle_for(server: &MockServer) -> CoinGeckoPriceOracle {
        CoinGeckoPriceOracle::new(Some(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_eth_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", "ethereum"))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ethereum": {"usd": 3012.55}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(oracle_for(&server).get_price("ETH").await, Some(3012.55));
    }

    #[tokio::test]
    async fn test_matic_price_symbol_case_insensitive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("ids", "matic-network"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"matic-network": {"usd": 0.42}})),
            )
            .mount(&server)
            .await;

        assert_eq!(oracle_for(&server).get_price("matic").await, Some(0.42));
    }

    #[tokio::test]
    async fn test_error_status_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .mount(&server)
            .await;

        assert_eq!(oracle_for(&server).get_price("ETH").await, None);
    }

    #[tokio::test]
    async fn test_missing_or_non_numeric_price_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("ids", "ethereum"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ethereum": {}})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("ids", "matic-network"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"matic-network": {"usd": "cheap"}})),
            )
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        assert_eq!(oracle.get_price("ETH").await, None);
        assert_eq!(oracle.get_price("MATIC").await, None);
    }

    #[tokio::test]
    async fn test_invalid_json_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert_eq!(oracle_for(&server).get_price("ETH").await, None);
    }

    #[tokio::test]
    async fn test_unknown_symbol_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert_eq!(oracle_for(&server).get_price("DOGE").await, None);
    }

    #[tokio::test]
    async fn test_timeout_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ethereum": {"usd": 1.0}}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let oracle =
            CoinGeckoPriceOracle::with_timeout(Some(server.uri()), Duration::from_millis(50))
                .unwrap();
        assert_eq!(oracle.get_price("ETH").await, None);
    }
}
