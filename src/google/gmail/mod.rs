//! Gmail REST client and the actions the HTTP API exposes.

use std::collections::BTreeMap;

use reqwest::Method;
use tracing::debug;

use crate::{
    core::{AuthorizedAction, AuthorizedClient},
    error::RemoteError,
    google::utils::check_status,
};

pub mod mime;
pub mod model;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// How many message ids `ListMessages` returns.
pub const RECENT_MESSAGES: usize = 5;

#[derive(Debug, Clone)]
pub struct Gmail {
    pub client: reqwest::Client,
    pub base_url: String,
}

impl Gmail {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: GMAIL_API_BASE.to_owned(),
        }
    }

    fn build_request(
        &self,
        auth: &AuthorizedClient,
        method: Method,
        path: &str,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        auth.sign(self.client.request(method, url))
    }

    async fn exec(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RemoteError> {
        let res = builder.send().await?;
        let res = check_status(res).await?;
        Ok(res)
    }

    async fn parse_json<T>(res: reqwest::Response) -> Result<T, RemoteError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let body = res.bytes().await?;
        serde_json::from_slice(&body).map_err(RemoteError::Decode)
    }

    pub async fn list_labels(
        &self,
        auth: &AuthorizedClient,
    ) -> Result<model::LabelList, RemoteError> {
        let res = self
            .exec(self.build_request(auth, Method::GET, "/labels"))
            .await?;
        Self::parse_json(res).await
    }

    pub async fn profile(&self, auth: &AuthorizedClient) -> Result<model::Profile, RemoteError> {
        let res = self
            .exec(self.build_request(auth, Method::GET, "/profile"))
            .await?;
        Self::parse_json(res).await
    }

    pub async fn list_messages(
        &self,
        auth: &AuthorizedClient,
        max_results: usize,
    ) -> Result<model::MessageList, RemoteError> {
        let builder = self
            .build_request(auth, Method::GET, "/messages")
            .query(&[
                ("maxResults", max_results.to_string()),
                ("includeSpamTrash", "false".to_owned()),
            ]);
        let res = self.exec(builder).await?;
        let mut list: model::MessageList = Self::parse_json(res).await?;
        list.messages.truncate(max_results);
        Ok(list)
    }

    pub async fn send(
        &self,
        auth: &AuthorizedClient,
        raw: String,
    ) -> Result<model::SentMessage, RemoteError> {
        let builder = self
            .build_request(auth, Method::POST, "/messages/send")
            .json(&model::SendRequest { raw });
        let res = self.exec(builder).await?;
        Self::parse_json(res).await
    }
}

/// Label names keyed by their position in the API response.
pub type LabelNames = BTreeMap<usize, String>;

pub struct ListLabels {
    pub gmail: Gmail,
}

#[async_trait::async_trait]
impl AuthorizedAction for ListLabels {
    type Output = LabelNames;

    async fn perform(self, client: AuthorizedClient) -> Result<LabelNames, RemoteError> {
        let list = self.gmail.list_labels(&client).await?;
        let names: LabelNames = list
            .labels
            .into_iter()
            .map(|label| label.name)
            .enumerate()
            .collect();
        debug!(message = "Listed labels", count = names.len());
        Ok(names)
    }
}

pub struct GetProfile {
    pub gmail: Gmail,
}

#[async_trait::async_trait]
impl AuthorizedAction for GetProfile {
    type Output = model::Profile;

    async fn perform(self, client: AuthorizedClient) -> Result<model::Profile, RemoteError> {
        self.gmail.profile(&client).await
    }
}

pub struct ListMessages {
    pub gmail: Gmail,
    pub max_results: usize,
}

impl ListMessages {
    pub fn recent(gmail: Gmail) -> Self {
        Self {
            gmail,
            max_results: RECENT_MESSAGES,
        }
    }
}

#[async_trait::async_trait]
impl AuthorizedAction for ListMessages {
    type Output = model::MessageList;

    async fn perform(self, client: AuthorizedClient) -> Result<model::MessageList, RemoteError> {
        self.gmail.list_messages(&client, self.max_results).await
    }
}

pub struct SendMessage {
    pub gmail: Gmail,
    pub mail: mime::OutgoingMail,
}

#[async_trait::async_trait]
impl AuthorizedAction for SendMessage {
    type Output = model::SentMessage;

    async fn perform(self, client: AuthorizedClient) -> Result<model::SentMessage, RemoteError> {
        let sent = self.gmail.send(&client, self.mail.to_raw()).await?;
        debug!(message = "Message sent", id = %sent.id, thread_id = %sent.thread_id);
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wiremock::{
        matchers::{body_partial_json, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::google::auth::{scope_set, ClientCredentials, Token};

    fn authorized() -> AuthorizedClient {
        let credentials = ClientCredentials {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            redirect_uri: "http://localhost".into(),
        };
        let token = Token::expiring_in("ya29.test".into(), None, 3600, scope_set(), Utc::now());
        AuthorizedClient::new(credentials, token)
    }

    fn gmail(server: &MockServer) -> Gmail {
        Gmail {
            base_url: server.uri(),
            ..Gmail::new(reqwest::Client::new())
        }
    }

    #[tokio::test]
    async fn labels_are_indexed_in_response_order() {
        let server = MockServer::start().await;
        let labels: Vec<_> = (0..12)
            .map(|i| {
                serde_json::json!({
                    "id": format!("Label_{i}"),
                    "name": format!("name-{i}"),
                    "type": "user"
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/labels"))
            .and(header("authorization", "Bearer ya29.test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "labels": labels })),
            )
            .mount(&server)
            .await;

        let names = ListLabels { gmail: gmail(&server) }
            .perform(authorized())
            .await
            .unwrap();

        assert_eq!(names.len(), 12);
        assert_eq!(names[&0], "name-0");
        assert_eq!(names[&11], "name-11");
        let json = serde_json::to_value(&names).unwrap();
        assert_eq!(json["10"], "name-10");
    }

    #[tokio::test]
    async fn list_messages_asks_for_five_and_caps_the_result() {
        let server = MockServer::start().await;
        let messages: Vec<_> = (0..8)
            .map(|i| serde_json::json!({"id": format!("m{i}"), "threadId": format!("t{i}")}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/messages"))
            .and(query_param("maxResults", "5"))
            .and(query_param("includeSpamTrash", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": messages,
                "nextPageToken": "next",
                "resultSizeEstimate": 8
            })))
            .expect(1)
            .mount(&server)
            .await;

        let list = ListMessages::recent(gmail(&server))
            .perform(authorized())
            .await
            .unwrap();

        assert_eq!(list.messages.len(), RECENT_MESSAGES);
        assert_eq!(list.messages[0].thread_id, "t0");
        assert_eq!(list.next_page_token.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn empty_mailbox_lists_no_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "resultSizeEstimate": 0 })),
            )
            .mount(&server)
            .await;

        let list = ListMessages::recent(gmail(&server))
            .perform(authorized())
            .await
            .unwrap();
        assert!(list.messages.is_empty());
    }

    #[tokio::test]
    async fn profile_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "emailAddress": "me@example.com",
                "messagesTotal": 42,
                "threadsTotal": 40,
                "historyId": "1234"
            })))
            .mount(&server)
            .await;

        let profile = GetProfile { gmail: gmail(&server) }
            .perform(authorized())
            .await
            .unwrap();
        assert_eq!(profile.email_address, "me@example.com");
        assert_eq!(
            serde_json::to_value(&profile).unwrap()["messagesTotal"],
            42
        );
    }

    #[tokio::test]
    async fn send_posts_raw_message() {
        let server = MockServer::start().await;
        let mail = mime::OutgoingMail {
            to: "someone@example.com".into(),
            from: None,
            subject: "Hi".into(),
            body: "Body".into(),
            attachment: None,
        };
        Mock::given(method("POST"))
            .and(path("/messages/send"))
            .and(body_partial_json(serde_json::json!({ "raw": mail.to_raw() })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "sent-1",
                "threadId": "thread-1",
                "labelIds": ["SENT"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sent = SendMessage { gmail: gmail(&server), mail }
            .perform(authorized())
            .await
            .unwrap();
        assert_eq!(sent.id, "sent-1");
        assert_eq!(sent.label_ids, vec!["SENT"]);
    }

    #[tokio::test]
    async fn api_failures_are_remote_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/profile"))
            .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scope"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = GetProfile { gmail: gmail(&server) }
            .perform(authorized())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Status(ref e) if e.status_code == 403));

        let err = ListLabels { gmail: gmail(&server) }
            .perform(authorized())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)));
    }
}
