use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::{ClientError, Result};
use crate::task::{
    AuthResponse, Label, LabelCreate, LabelPatch, Signup, Task, TaskCreate, TaskPatch, User,
};
use crate::token::TokenStore;

/// The remote task backend. `ApiClient` is the production implementation;
/// controllers are generic over this trait so tests can drive them against
/// an in-memory fake.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn signup(&self, signup: &Signup) -> Result<User>;

    /// Form-encoded per the OAuth2 password flow; every other call sends JSON.
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse>;

    async fn logout(&self) -> Result<()>;

    async fn current_user(&self) -> Result<User>;

    /// Filtering happens server-side; only confirmed values are sent.
    async fn list_tasks(&self, label: Option<&str>, completed: Option<bool>) -> Result<Vec<Task>>;

    async fn get_task(&self, id: &str) -> Result<Task>;

    async fn create_task(&self, create: &TaskCreate) -> Result<Task>;

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task>;

    async fn delete_task(&self, id: &str) -> Result<()>;

    async fn list_labels(&self) -> Result<Vec<Label>>;

    async fn get_label(&self, id: &str) -> Result<Label>;

    async fn create_label(&self, create: &LabelCreate) -> Result<Label>;

    async fn update_label(&self, id: &str, patch: &LabelPatch) -> Result<Label>;

    async fn delete_label(&self, id: &str) -> Result<()>;
}

/// Single point of HTTP access to the backend; no business logic. Errors
/// are classified into [`ClientError`] and never retried.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attaches `Authorization: Bearer <token>` when a token is present in
    /// the store; omits the header otherwise. The server decides validity.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = self.tokens.load() {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(ClientError::from_response(status.as_u16(), &body))
    }

    /// A 2xx body that fails to parse is a server contract violation, not
    /// a transport failure; `Network` is reserved for never hearing back.
    fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
        serde_json::from_str(body).map_err(|err| ClientError::Api {
            status,
            message: format!("malformed response body: {err}"),
        })
    }

    async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        let resp = Self::check(resp).await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Self::decode_body(status, &body)
    }

    async fn send_empty(req: RequestBuilder) -> Result<()> {
        let resp = req.send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for ApiClient {
    #[instrument(skip(self, signup), fields(email = %signup.email))]
    async fn signup(&self, signup: &Signup) -> Result<User> {
        Self::send_json(self.request(Method::POST, "/auth/signup").json(signup)).await
    }

    #[instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let form = [("username", username), ("password", password)];
        Self::send_json(self.request(Method::POST, "/auth/login").form(&form)).await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<()> {
        Self::send_empty(self.request(Method::POST, "/auth/logout")).await
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<User> {
        Self::send_json(self.request(Method::GET, "/users/me")).await
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self, label: Option<&str>, completed: Option<bool>) -> Result<Vec<Task>> {
        let mut req = self.request(Method::GET, "/tasks");
        if let Some(label) = label {
            req = req.query(&[("label", label)]);
        }
        if let Some(completed) = completed {
            req = req.query(&[("completed", completed)]);
        }
        Self::send_json(req).await
    }

    #[instrument(skip(self))]
    async fn get_task(&self, id: &str) -> Result<Task> {
        Self::send_json(self.request(Method::GET, &format!("/tasks/{id}"))).await
    }

    #[instrument(skip(self, create), fields(title = %create.title))]
    async fn create_task(&self, create: &TaskCreate) -> Result<Task> {
        Self::send_json(self.request(Method::POST, "/tasks").json(create)).await
    }

    #[instrument(skip(self, patch))]
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        Self::send_json(self.request(Method::PUT, &format!("/tasks/{id}")).json(patch)).await
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: &str) -> Result<()> {
        Self::send_empty(self.request(Method::DELETE, &format!("/tasks/{id}"))).await
    }

    #[instrument(skip(self))]
    async fn list_labels(&self) -> Result<Vec<Label>> {
        Self::send_json(self.request(Method::GET, "/labels")).await
    }

    #[instrument(skip(self))]
    async fn get_label(&self, id: &str) -> Result<Label> {
        Self::send_json(self.request(Method::GET, &format!("/labels/{id}"))).await
    }

    #[instrument(skip(self, create), fields(name = %create.name))]
    async fn create_label(&self, create: &LabelCreate) -> Result<Label> {
        Self::send_json(self.request(Method::POST, "/labels").json(create)).await
    }

    #[instrument(skip(self, patch))]
    async fn update_label(&self, id: &str, patch: &LabelPatch) -> Result<Label> {
        Self::send_json(self.request(Method::PUT, &format!("/labels/{id}")).json(patch)).await
    }

    #[instrument(skip(self))]
    async fn delete_label(&self, id: &str) -> Result<()> {
        Self::send_empty(self.request(Method::DELETE, &format!("/labels/{id}"))).await
    }
}
