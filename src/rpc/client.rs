use ethers_core::types::Address;
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{Deserialize, Serialize};
use std::{num::NonZeroU32, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("rpc request failed: {0}")]
    Network(#[from] reqwest_middleware::Error),
    #[error("cannot parse rpc response: {0}")]
    InvalidResponse(#[from] reqwest::Error),
    #[error("rpc node returned error: {message} (code {code})")]
    Rpc { code: i64, message: String },
    #[error("rpc response contains neither result nor error")]
    MissingResult,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u32,
    method: &'static str,
    params: (&'a str, &'a str),
}

#[derive(Debug, Deserialize)]
struct Response {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// JSON-RPC client retrieving deployed bytecode from a chain node.
pub struct Client {
    url: Url,
    reqwest_client: ClientWithMiddleware,
}

impl Client {
    /// Initializes a new client for the node at `url`.
    ///
    /// Transient transport failures are retried up to `request_attempts`
    /// times with exponential backoff; every request is bounded by
    /// `request_timeout` seconds.
    pub fn new(
        url: Url,
        request_timeout: u64,
        request_attempts: NonZeroU32,
    ) -> Result<Self, reqwest::Error> {
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(request_attempts.get());
        let reqwest_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()?;
        let reqwest_client = reqwest_middleware::ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            url,
            reqwest_client,
        })
    }

    /// Retrieves the code deployed at `address` at the current chain head.
    ///
    /// An empty code response (`"0x"`) means no contract is deployed at the
    /// address; it is a valid result, not an error.
    pub async fn fetch_code(&self, address: Address) -> Result<String, Error> {
        let address = format!("{address:#x}");
        let request = Request {
            jsonrpc: "2.0",
            id: 1,
            method: "eth_getCode",
            params: (address.as_str(), "latest"),
        };
        let response: Response = self
            .reqwest_client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .json()
            .await
            .map_err(Error::InvalidResponse)?;

        if let Some(error) = response.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response.result.ok_or(Error::MissingResult)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn address() -> Address {
        Address::from_str("0x04C8E2582fb0f276EBDc79E6e5b30C3C881D0Fff").unwrap()
    }

    async fn client(mock_server: &MockServer) -> Client {
        Client::new(
            Url::parse(&mock_server.uri()).unwrap(),
            10,
            NonZeroU32::new(1).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_deployed_code() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "method": "eth_getCode",
                "params": ["0x04c8e2582fb0f276ebdc79e6e5b30c3c881d0fff", "latest"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "0x6080604052"
            })))
            .mount(&mock_server)
            .await;

        let code = client(&mock_server).await.fetch_code(address()).await.unwrap();
        assert_eq!(code, "0x6080604052");
    }

    #[tokio::test]
    async fn empty_code_is_a_valid_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "0x"
            })))
            .mount(&mock_server)
            .await;

        let code = client(&mock_server).await.fetch_code(address()).await.unwrap();
        assert_eq!(code, "0x");
    }

    #[tokio::test]
    async fn node_error_is_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32602, "message": "invalid argument"}
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).await.fetch_code(address()).await.unwrap_err();
        match err {
            Error::Rpc { code, message } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "invalid argument");
            }
            _ => panic!("expected rpc error, got: {err:?}"),
        }
    }
}
