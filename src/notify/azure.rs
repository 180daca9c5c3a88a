//! Email delivery through the Azure Communication Services REST API.
//!
//! A message is submitted with `POST /emails:send`, which answers with a
//! long-running operation. The operation is then polled until it settles.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};

use crate::config::EmailConfig;
use crate::errors::NotifyError;
use crate::notify::{EmailMessage, MessageId, Notifier};
use crate::utils::acs_auth::AcsCredentials;

const API_VERSION: &str = "2023-03-31";
const OPERATION_LOCATION: &str = "operation-location";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender_address: &'a str,
    recipients: Recipients<'a>,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Recipients<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Address<'a> {
    address: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize, Debug)]
struct OperationStatus {
    id: String,
    status: String,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Deserialize, Debug)]
struct OperationError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct AzureEmailNotifier {
    client: Client,
    connection_string: Option<String>,
    poll_interval: Duration,
    max_polls: u32,
}

impl AzureEmailNotifier {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            client: Client::new(),
            connection_string: config.connection_string.clone(),
            poll_interval: config.poll_interval,
            max_polls: config.max_polls,
        }
    }

    fn credentials(&self) -> Result<AcsCredentials, NotifyError> {
        let raw = self
            .connection_string
            .as_deref()
            .ok_or_else(|| NotifyError::Configuration("CONNECTION_STRING is not set".into()))?;
        AcsCredentials::from_connection_string(raw)
    }

    async fn signed(
        &self,
        credentials: &AcsCredentials,
        method: reqwest::Method,
        url: Url,
        body: Vec<u8>,
    ) -> Result<Response, NotifyError> {
        let headers = credentials.sign(method.as_str(), &url, &body, Utc::now())?;
        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if !body.is_empty() {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        Ok(request.send().await?)
    }

    async fn poll(
        &self,
        credentials: &AcsCredentials,
        operation_url: Url,
        operation_id: String,
    ) -> Result<MessageId, NotifyError> {
        for _ in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .signed(credentials, reqwest::Method::GET, operation_url.clone(), Vec::new())
                .await?;
            let operation: OperationStatus =
                rejected_unless_success(response).await?.json().await?;

            match operation.status.as_str() {
                "Succeeded" => return Ok(MessageId(operation.id)),
                "Failed" | "Canceled" => {
                    let reason = operation
                        .error
                        .and_then(|e| e.message.or(e.code))
                        .unwrap_or_else(|| "no reason given".into());
                    return Err(NotifyError::Failed {
                        id: operation.id,
                        status: operation.status,
                        reason,
                    });
                }
                _ => continue,
            }
        }

        warn!("Email operation {} did not settle in time", operation_id);
        Err(NotifyError::Timeout {
            id: operation_id,
            polls: self.max_polls,
        })
    }
}

#[async_trait]
impl Notifier for AzureEmailNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<MessageId, NotifyError> {
        let credentials = self.credentials()?;

        let mut url = credentials.endpoint.clone();
        url.set_path(&format!(
            "{}/emails:send",
            credentials.endpoint.path().trim_end_matches('/')
        ));
        url.set_query(Some(&format!("api-version={}", API_VERSION)));

        let payload = SendEmailRequest {
            sender_address: &message.sender,
            recipients: Recipients {
                to: message
                    .recipients
                    .iter()
                    .map(|address| Address {
                        address: address.as_str(),
                    })
                    .collect(),
            },
            content: Content {
                subject: &message.subject,
                html: &message.html,
            },
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|e| NotifyError::Configuration(format!("Cannot encode email: {}", e)))?;

        info!(
            "Sending email from {} to {:?}",
            message.sender, message.recipients
        );
        let response = self
            .signed(&credentials, reqwest::Method::POST, url, body)
            .await?;
        let response = rejected_unless_success(response).await?;

        let location = response
            .headers()
            .get(OPERATION_LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Url::parse(value).ok());
        let accepted: OperationStatus = response.json().await?;

        if accepted.status == "Succeeded" {
            return Ok(MessageId(accepted.id));
        }

        let operation_url = match location {
            Some(url) => url,
            None => {
                let mut url = credentials.endpoint.clone();
                url.set_path(&format!(
                    "{}/emails/operations/{}",
                    credentials.endpoint.path().trim_end_matches('/'),
                    accepted.id
                ));
                url.set_query(Some(&format!("api-version={}", API_VERSION)));
                url
            }
        };

        let id = self.poll(&credentials, operation_url, accepted.id).await?;
        info!("Email sent. ID: {}", id);
        Ok(id)
    }
}

async fn rejected_unless_success(response: Response) -> Result<Response, NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config_for(server: &MockServer) -> EmailConfig {
        EmailConfig {
            connection_string: Some(format!(
                "endpoint={}/;accesskey=c2VjcmV0LWtleQ==",
                server.uri()
            )),
            sender_address: Some("alerts@example.com".into()),
            recipients: vec!["one@example.com".into(), "two@example.com".into()],
            poll_interval: Duration::from_millis(5),
            max_polls: 3,
        }
    }

    fn message(config: &EmailConfig) -> EmailMessage {
        EmailMessage::compose(config, "Alerta de ubicación recibida", "<pre>body</pre>").unwrap()
    }

    async fn mount_accepting_send(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/emails:send"))
            .and(query_param("api-version", API_VERSION))
            .and(header_exists("authorization"))
            .and(header_exists("x-ms-date"))
            .and(header_exists("x-ms-content-sha256"))
            .and(body_partial_json(json!({
                "senderAddress": "alerts@example.com",
                "recipients": { "to": [
                    { "address": "one@example.com" },
                    { "address": "two@example.com" }
                ]},
                "content": {
                    "subject": "Alerta de ubicación recibida",
                    "html": "<pre>body</pre>"
                }
            })))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header(
                        OPERATION_LOCATION,
                        format!(
                            "{}/emails/operations/op-1?api-version={}",
                            server.uri(),
                            API_VERSION
                        ),
                    )
                    .set_body_json(json!({ "id": "op-1", "status": "Running" })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sends_and_waits_for_success() {
        let server = MockServer::start().await;
        mount_accepting_send(&server).await;

        Mock::given(method("GET"))
            .and(path("/emails/operations/op-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "op-1", "status": "Running" })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/emails/operations/op-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "op-1", "status": "Succeeded" })),
            )
            .mount(&server)
            .await;

        let config = config_for(&server);
        let id = AzureEmailNotifier::new(&config)
            .send(&message(&config))
            .await
            .unwrap();

        assert_eq!(id, MessageId("op-1".into()));
    }

    #[tokio::test]
    async fn failed_operation_is_reported() {
        let server = MockServer::start().await;
        mount_accepting_send(&server).await;

        Mock::given(method("GET"))
            .and(path("/emails/operations/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "op-1",
                "status": "Failed",
                "error": { "code": "InvalidRecipient", "message": "Recipient rejected" }
            })))
            .mount(&server)
            .await;

        let config = config_for(&server);
        let err = AzureEmailNotifier::new(&config)
            .send(&message(&config))
            .await
            .unwrap_err();

        match err {
            NotifyError::Failed { id, status, reason } => {
                assert_eq!(id, "op-1");
                assert_eq!(status, "Failed");
                assert_eq!(reason, "Recipient rejected");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn gives_up_after_max_polls() {
        let server = MockServer::start().await;
        mount_accepting_send(&server).await;

        Mock::given(method("GET"))
            .and(path("/emails/operations/op-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "op-1", "status": "Running" })),
            )
            .expect(3)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let err = AzureEmailNotifier::new(&config)
            .send(&message(&config))
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::Timeout { polls: 3, .. }));
    }

    #[tokio::test]
    async fn rejected_submission_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails:send"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Denied by HMAC"))
            .mount(&server)
            .await;

        let config = config_for(&server);
        let err = AzureEmailNotifier::new(&config)
            .send(&message(&config))
            .await
            .unwrap_err();

        match err {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Denied by HMAC");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn missing_connection_string_fails_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.connection_string = None;
        let err = AzureEmailNotifier::new(&config)
            .send(&message(&config))
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::Configuration(_)));
        assert_eq!(err.to_string(), "CONNECTION_STRING is not set");
    }
}
