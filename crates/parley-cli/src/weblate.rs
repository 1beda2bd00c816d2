//! Weblate-backed translation overlay.
//!
//! String ids are mapped to Weblate unit ids through a [`WeblateIndex`];
//! each lookup fetches `GET {base}/api/units/{unit}/` with a
//! `Authorization: Token <key>` header. Answers (including "not found") are
//! cached for the lifetime of the client, so a choice shown twice costs one
//! request.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use parley_core::config::WeblateConfig;
use parley_core::model::StringId;
use parley_core::overlay::{OverlayError, OverlayProvider, TranslationUnit, WeblateIndex};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Weblate API tokens are 40 ASCII alphanumerics.
const TOKEN_LEN: usize = 40;

pub struct WeblateClient {
    base_url: String,
    project: String,
    component: String,
    language: String,
    token: Option<String>,
    index: WeblateIndex,
    agent: ureq::Agent,
    cache: RefCell<HashMap<StringId, Option<TranslationUnit>>>,
    requests: Cell<usize>,
}

impl std::fmt::Debug for WeblateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeblateClient")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .field("indexed", &self.index.len())
            .field("requests", &self.requests.get())
            .finish_non_exhaustive()
    }
}

/// Outcome of `parley auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthStatus {
    Authenticated,
    MissingToken,
    /// The token does not look like a Weblate key at all.
    MalformedToken,
    Rejected { http_status: u16 },
    Unreachable { reason: String },
}

impl AuthStatus {
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Authenticated => "authenticated",
            Self::MissingToken => "no API token configured",
            Self::MalformedToken => "API token is malformed (expected 40 letters or digits)",
            Self::Rejected { .. } => "authentication failed",
            Self::Unreachable { .. } => "translation server unreachable",
        }
    }
}

impl WeblateClient {
    pub fn new(base_url: &str, settings: &WeblateConfig, index: WeblateIndex) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project: settings.project.clone(),
            component: settings.component.clone(),
            language: settings.language.clone(),
            token: settings
                .token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            index,
            agent,
            cache: RefCell::new(HashMap::new()),
            requests: Cell::new(0),
        }
    }

    /// Number of HTTP requests issued so far.
    pub fn request_count(&self) -> usize {
        self.requests.get()
    }

    /// Check the configured token against the project endpoint.
    #[instrument(skip(self), fields(project = %self.project))]
    pub fn test_auth(&self) -> AuthStatus {
        let url = format!("{}/api/projects/{}/", self.base_url, self.project);
        match self.request(&url).call() {
            Ok(_) => AuthStatus::Authenticated,
            Err(ureq::Error::Status(status, _)) => self
                .token_problem()
                .unwrap_or(AuthStatus::Rejected {
                    http_status: status,
                }),
            Err(err) => self.token_problem().unwrap_or(AuthStatus::Unreachable {
                reason: err.to_string(),
            }),
        }
    }

    fn token_problem(&self) -> Option<AuthStatus> {
        match self.token.as_deref() {
            None => Some(AuthStatus::MissingToken),
            Some(token) if !is_well_formed_token(token) => Some(AuthStatus::MalformedToken),
            Some(_) => None,
        }
    }

    fn request(&self, url: &str) -> ureq::Request {
        self.requests.set(self.requests.get() + 1);
        let mut request = self
            .agent
            .get(url)
            .set("Accept", "application/json")
            .set("User-Agent", "parley-cli");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Token {token}"));
        }
        request
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, OverlayError> {
        let response = self.request(url).call().map_err(|err| match err {
            ureq::Error::Status(401 | 403, _) => OverlayError::Unauthorized,
            ureq::Error::Status(status, _) => OverlayError::Status { status },
            ureq::Error::Transport(transport) => OverlayError::Transport(transport.to_string()),
        })?;
        response
            .into_json::<T>()
            .map_err(|err| OverlayError::Decode(err.to_string()))
    }
}

impl OverlayProvider for WeblateClient {
    fn lookup(&self, id: StringId) -> Result<Option<TranslationUnit>, OverlayError> {
        if let Some(cached) = self.cache.borrow().get(&id) {
            return Ok(cached.clone());
        }

        let unit = match self.index.get(id) {
            None => None,
            Some(entry) => {
                let url = format!("{}/api/units/{}/", self.base_url, entry.unit_id);
                debug!(string = id.get(), unit = entry.unit_id, "fetching translation unit");
                Some(self.get_json::<TranslationUnit>(&url)?)
            }
        };

        self.cache.borrow_mut().insert(id, unit.clone());
        Ok(unit)
    }

    fn editor_link(&self, id: StringId) -> Option<String> {
        self.index.get(id).map(|entry| {
            format!(
                "{}/translate/{}/{}/{}/?offset={}",
                self.base_url, self.project, self.component, self.language, entry.position
            )
        })
    }
}

fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.chars().all(|c| c.is_ascii_alphanumeric())
}
