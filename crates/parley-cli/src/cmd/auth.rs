//! `parley auth`: check the Weblate token before a translated session.

use std::io::Write;

use parley_core::ErrorCode;
use parley_core::overlay::WeblateIndex;

use crate::output::{CliError, fail, render};
use crate::project::Project;
use crate::weblate::{AuthStatus, WeblateClient};

/// # Errors
///
/// No `weblate.base_url` configured, or the server did not accept the token.
pub fn run_auth(project: &Project) -> anyhow::Result<()> {
    let output = project.output;
    let settings = &project.effective.config.weblate;
    let Some(base_url) = settings.base_url.as_deref() else {
        return fail(
            output,
            &CliError::with_code("weblate.base_url is not set", ErrorCode::OverlayUnavailable)
                .suggest("parley config set weblate.base_url https://weblate.example.org"),
        );
    };

    let client = WeblateClient::new(base_url, settings, WeblateIndex::default());
    let status = client.test_auth();

    render(output, &status, |status, w| match status {
        AuthStatus::Rejected { http_status } => {
            writeln!(w, "{} (HTTP {http_status})", status.describe())
        }
        AuthStatus::Unreachable { reason } => writeln!(w, "{}: {reason}", status.describe()),
        _ => writeln!(w, "{}", status.describe()),
    })?;

    if status.is_ok() {
        Ok(())
    } else {
        let code = match status {
            AuthStatus::Unreachable { .. } => ErrorCode::OverlayUnavailable,
            _ => ErrorCode::OverlayAuthFailed,
        };
        fail(output, &CliError::with_code(status.describe(), code))
    }
}
