use crate::{RepoInitErr, RepoInitResult};
use crate::sheet::{GatewayError, GatewayResult, Row, SheetGateway, Table};
use error_stack::{Report, ResultExt};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Talks to a remote sheet service over its JSON API.
#[derive(Debug, Clone)]
pub struct HttpSheet {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RowsBody {
    rows: Vec<Row>,
}

#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    values: &'a [String],
}

#[derive(Debug, Serialize)]
struct CellBody<'a> {
    value: &'a str,
}

impl HttpSheet {
    /// `timeout` bounds every request, connection included.
    pub fn connect(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> RepoInitResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .change_context(RepoInitErr)
            .attach("could not build the sheet http client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!("using sheet service at {base_url}");

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn rows_url(&self, table: Table) -> String {
        format!("{}/tables/{table}/rows", self.base_url)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request.send().await.map_err(transport_failure)?;
        check_status(response)
    }
}

fn transport_failure(err: reqwest::Error) -> Report<GatewayError> {
    let context = if err.is_timeout() {
        GatewayError::TimedOut
    } else if err.is_connect() {
        GatewayError::Unavailable
    } else {
        GatewayError::Interrupted
    };
    Report::new(err).change_context(context)
}

fn check_status(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // a proxy may answer 5xx after the sheet applied the request
    let context = if status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::Unavailable
    } else if status.is_server_error() {
        GatewayError::Interrupted
    } else {
        GatewayError::Rejected
    };
    Err(Report::new(context).attach(format!("sheet service responded with {status}")))
}

impl SheetGateway for HttpSheet {
    #[instrument(skip(self), err(Debug))]
    async fn read_rows(&self, table: Table) -> GatewayResult<Vec<Row>> {
        let response = self
            .send(self.request(Method::GET, self.rows_url(table)))
            .await?;

        let body = response.json::<RowsBody>().await.map_err(|e| {
            if e.is_timeout() {
                Report::new(e).change_context(GatewayError::TimedOut)
            } else {
                Report::new(e).change_context(GatewayError::Malformed)
            }
        })?;
        Ok(body.rows)
    }

    #[instrument(skip(self, row), err(Debug))]
    async fn append_row(&self, table: Table, row: Row) -> GatewayResult<()> {
        self.send(
            self.request(Method::POST, self.rows_url(table))
                .json(&AppendBody { values: &row }),
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self, value), err(Debug))]
    async fn update_cell(
        &self,
        table: Table,
        row: usize,
        column: usize,
        value: String,
    ) -> GatewayResult<()> {
        let url = format!("{}/{row}/cells/{column}", self.rows_url(table));
        self.send(
            self.request(Method::PUT, url)
                .json(&CellBody { value: &value }),
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self), err(Debug))]
    async fn delete_row(&self, table: Table, row: usize) -> GatewayResult<()> {
        let url = format!("{}/{row}", self.rows_url(table));
        self.send(self.request(Method::DELETE, url))
            .await
            .map(|_| ())
    }
}
