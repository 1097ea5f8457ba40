//! HTML pages for the OAuth callback flow.
//!
//! All interpolated values are HTML-escaped.

/// Render the post-authorization success page.
///
/// Shows only a masked token suffix; the full token never appears in a
/// response body.
pub fn render_success_page(masked_token: &str, token_type: &str, scope: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>OAuth Success</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
.success {{ color: #2e7d32; background: #e8f5e9; padding: 20px; border-radius: 4px; }}
.info {{ background: #f5f5f5; padding: 15px; margin: 20px 0; border-radius: 4px; }}
code {{ background: #263238; color: #aed581; padding: 2px 6px; border-radius: 3px; }}
</style>
</head>
<body>
<h1>OAuth Authorization Successful</h1>
<div class="success">
<strong>Success!</strong> You have been authenticated with GitHub.
</div>
<div class="info">
<p><strong>Token Information:</strong></p>
<ul>
<li>Access Token: <code>{masked_token}</code></li>
<li>Token Type: <code>{token_type}</code></li>
<li>Scopes: <code>{scope}</code></li>
</ul>
</div>
<p>You can now close this window and use the MCP server with authentication.</p>
<p>The server has stored your access token and will use it for GitHub API requests.</p>
</body>
</html>"#,
        masked_token = html_escape(masked_token),
        token_type = html_escape(token_type),
        scope = html_escape(if scope.is_empty() { "N/A" } else { scope }),
    )
}

/// Render an error page for a failed authorization attempt.
pub fn render_error_page(title: &str, message: &str, hint: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>OAuth Error</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
.error {{ color: #d32f2f; background: #ffebee; padding: 20px; border-radius: 4px; }}
</style>
</head>
<body>
<h1>{title}</h1>
<div class="error">
<strong>Error:</strong> {message}
</div>
<p>{hint}</p>
</body>
</html>"#,
        title = html_escape(title),
        message = html_escape(message),
        hint = html_escape(hint),
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
