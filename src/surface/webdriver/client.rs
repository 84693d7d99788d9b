use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use super::error::WebDriverError;
use super::types::{
    Capabilities, ElementRef, Envelope, ErrorValue, FindRequest, Navigate, NewSession,
    NewSessionRequest, SendKeys,
};

/// One WebDriver session over HTTP.
pub struct WebDriverClient {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverClient {
    /// Opens a session against the remote end at `base_url`.
    pub async fn connect(base_url: &str, capabilities: Value) -> Result<Self, WebDriverError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let request = NewSessionRequest {
            capabilities: Capabilities {
                always_match: capabilities,
            },
        };
        let response = client
            .post(format!("{base_url}/session"))
            .json(&request)
            .send()
            .await?;
        let session: NewSession = decode(response).await?;
        debug!(session = %session.session_id, "webdriver session started");

        Ok(Self {
            client,
            base_url,
            session_id: session.session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn close(self) -> Result<(), WebDriverError> {
        let _: Value = self.command(Method::DELETE, "", None::<&()>).await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<(), WebDriverError> {
        let _: Value = self
            .command(Method::POST, "/url", Some(&Navigate { url }))
            .await?;
        Ok(())
    }

    pub async fn find(&self, selector: &str) -> Result<ElementRef, WebDriverError> {
        self.command(
            Method::POST,
            "/element",
            Some(&FindRequest::for_selector(selector)),
        )
        .await
    }

    pub async fn find_all(&self, selector: &str) -> Result<Vec<ElementRef>, WebDriverError> {
        self.command(
            Method::POST,
            "/elements",
            Some(&FindRequest::for_selector(selector)),
        )
        .await
    }

    pub async fn find_all_within(
        &self,
        parent: &ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, WebDriverError> {
        self.command(
            Method::POST,
            &format!("/element/{}/elements", parent.id),
            Some(&FindRequest::for_selector(selector)),
        )
        .await
    }

    pub async fn click(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        let _: Value = self
            .command(
                Method::POST,
                &format!("/element/{}/click", element.id),
                Some(&json!({})),
            )
            .await?;
        Ok(())
    }

    pub async fn clear(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        let _: Value = self
            .command(
                Method::POST,
                &format!("/element/{}/clear", element.id),
                Some(&json!({})),
            )
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), WebDriverError> {
        let _: Value = self
            .command(
                Method::POST,
                &format!("/element/{}/value", element.id),
                Some(&SendKeys { text }),
            )
            .await?;
        Ok(())
    }

    pub async fn text(&self, element: &ElementRef) -> Result<String, WebDriverError> {
        self.command(Method::GET, &format!("/element/{}/text", element.id), None::<&()>)
            .await
    }

    pub async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, WebDriverError> {
        self.command(
            Method::GET,
            &format!("/element/{}/attribute/{name}", element.id),
            None::<&()>,
        )
        .await
    }

    pub async fn is_displayed(&self, element: &ElementRef) -> Result<bool, WebDriverError> {
        self.command(
            Method::GET,
            &format!("/element/{}/displayed", element.id),
            None::<&()>,
        )
        .await
    }

    async fn command<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, WebDriverError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/session/{}{path}", self.base_url, self.session_id);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, WebDriverError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<Envelope<ErrorValue>>(&body) {
            Ok(envelope) => WebDriverError::Protocol {
                status: status.as_u16(),
                code: envelope.value.error,
                message: envelope.value.message,
            },
            Err(_) => WebDriverError::Http {
                status: status.as_u16(),
                body,
            },
        });
    }

    serde_json::from_str::<Envelope<T>>(&body)
        .map(|envelope| envelope.value)
        .map_err(|e| WebDriverError::UnexpectedResponse(format!("{e}: {body}")))
}
