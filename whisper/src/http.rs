use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;
use std::time::Duration;

use crate::error::{Error, Result};

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder().timeout(timeout).build().map_err(Error::Client)
}

/// POST a JSON body and decode the JSON reply.
///
/// `decorate` adds per-service headers (API keys, `Prefer`, ...) before sending.
pub fn post_json<T, B, F>(client: &Client, url: &str, body: &B, decorate: F) -> Result<T>
where
    T: DeserializeOwned,
    B: Serialize,
    F: FnOnce(RequestBuilder) -> RequestBuilder,
{
    let text = send(client, url, body, decorate)?;
    from_str::<T>(&text).map_err(|e| Error::Decode(format!("POST {} : {} | {}", redact(url), e, text)))
}

/// POST a JSON body and ignore the reply body.
pub fn post_json_no_content<B, F>(client: &Client, url: &str, body: &B, decorate: F) -> Result<()>
where
    B: Serialize,
    F: FnOnce(RequestBuilder) -> RequestBuilder,
{
    send(client, url, body, decorate).map(|_| ())
}

fn send<B, F>(client: &Client, url: &str, body: &B, decorate: F) -> Result<String>
where
    B: Serialize,
    F: FnOnce(RequestBuilder) -> RequestBuilder,
{
    let req = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .json(body);
    let resp = decorate(req).send().map_err(|source| Error::Transport {
        method: "POST",
        url: redact(url),
        source: source.without_url(),
    })?;
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    if !status.is_success() {
        return Err(Error::Status {
            method: "POST",
            url: redact(url),
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(text)
}

// Gemini takes its key as a query parameter; keep it out of errors and logs.
fn redact(url: &str) -> String {
    match url.split_once("key=") {
        Some((head, tail)) => {
            let rest = tail.find('&').map(|i| &tail[i..]).unwrap_or("");
            format!("{}key=***{}", head, rest)
        }
        None => url.to_string(),
    }
}
