//! Terminal user agent for the OAuth flow.
//!
//! Prints the consent URL, then waits for the user to paste the URL their
//! browser was redirected to. An empty line or Ctrl-C cancels.

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;
use tuckbox_client::auth::{AgentResponse, AuthError, UserAgent};
use url::Url;

/// Prompts on stderr and reads the redirect from stdin.
#[derive(Debug, Default)]
pub struct TerminalAgent;

#[async_trait]
impl UserAgent for TerminalAgent {
    async fn authorize(
        &self,
        authorization_url: &Url,
        callback_uri: &Url,
    ) -> Result<AgentResponse, AuthError> {
        prompt(&mut std::io::stderr().lock(), authorization_url, callback_uri)
            .map_err(|e| AuthError::UserAgent(e.to_string()))?;

        let mut stdin = BufReader::new(tokio::io::stdin());
        tokio::select! {
            line = read_redirect(&mut stdin) => line,
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted while waiting for redirect");
                Ok(AgentResponse::Cancelled)
            }
        }
    }
}

fn prompt(out: &mut impl Write, authorization_url: &Url, callback_uri: &Url) -> std::io::Result<()> {
    writeln!(out, "Open this URL in your browser to sign in:")?;
    writeln!(out)?;
    writeln!(out, "  {authorization_url}")?;
    writeln!(out)?;
    writeln!(
        out,
        "When the browser is sent to {}://..., paste that full address here.",
        callback_uri.scheme()
    )?;
    write!(out, "Redirect URL (empty to cancel): ")?;
    out.flush()
}

/// Read one line and turn it into an agent response.
async fn read_redirect<R>(input: &mut R) -> Result<AgentResponse, AuthError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .await
        .map_err(|e| AuthError::UserAgent(e.to_string()))?;

    let line = line.trim();
    if read == 0 || line.is_empty() {
        return Ok(AgentResponse::Cancelled);
    }
    Url::parse(line)
        .map(AgentResponse::Redirected)
        .map_err(|e| AuthError::UserAgent(format!("not a URL: {e}")))
}
