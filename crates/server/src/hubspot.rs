//! HubSpot contact directory over the CRM v3 objects API.
//!
//! One request per call, no retries. Failures surface as [`CrmError`] and the
//! pipeline records them on the submission.

use std::time::Duration;

use async_trait::async_trait;
use leadquote_core::config::CrmConfig;
use leadquote_core::domain::submission::{ContactId, ContactProperties};
use leadquote_core::enum_schema::PROPERTY_EMAIL;
use leadquote_core::errors::CrmError;
use leadquote_core::pipeline::ContactDirectory;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const CONTACTS_PATH: &str = "/crm/v3/objects/contacts";
const SEARCH_PATH: &str = "/crm/v3/objects/contacts/search";

#[derive(Clone)]
pub struct HubSpotContactDirectory {
    client: Client,
    base_url: String,
    access_token: SecretString,
}

#[derive(Debug, Deserialize)]
struct HubSpotContact {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<HubSpotContact>,
}

#[derive(Debug, Serialize)]
struct ContactWrite<'a> {
    properties: &'a ContactProperties,
}

impl HubSpotContactDirectory {
    pub fn new(config: &CrmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.hubspot_access_token.clone(),
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, CrmError> {
        let response = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| CrmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Rejected { status: status.as_u16(), body });
        }

        response.json::<T>().await.map_err(|error| CrmError::Decode(error.to_string()))
    }
}

pub fn search_by_email_request(email: &str) -> Value {
    json!({
        "filterGroups": [
            { "filters": [{ "propertyName": PROPERTY_EMAIL, "operator": "EQ", "value": email }] }
        ],
        "properties": [PROPERTY_EMAIL],
        "limit": 1,
    })
}

#[async_trait]
impl ContactDirectory for HubSpotContactDirectory {
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<ContactId>, CrmError> {
        let response: SearchResponse =
            self.send(Method::POST, SEARCH_PATH, &search_by_email_request(email)).await?;
        Ok(response.results.into_iter().next().map(|contact| ContactId(contact.id)))
    }

    async fn create_contact(
        &self,
        properties: &ContactProperties,
    ) -> Result<ContactId, CrmError> {
        let contact: HubSpotContact =
            self.send(Method::POST, CONTACTS_PATH, &ContactWrite { properties }).await?;
        Ok(ContactId(contact.id))
    }

    async fn update_contact(
        &self,
        id: &ContactId,
        properties: &ContactProperties,
    ) -> Result<ContactId, CrmError> {
        let path = format!("{CONTACTS_PATH}/{id}");
        let contact: HubSpotContact =
            self.send(Method::PATCH, &path, &ContactWrite { properties }).await?;
        Ok(ContactId(contact.id))
    }
}
