//! HTML for the single assistant page.

use crate::assistant::{InteractionState, Outcome};

pub const PAGE_TITLE: &str = "I-TECH Generative AI Assistant";
pub const PAGE_ICON: &str = "🤖";

const THEME_CSS: &str = r#"
body{margin:0;font-family:"Source Sans Pro",-apple-system,BlinkMacSystemFont,"Segoe UI",sans-serif;color:#31333f}
.main{background-color:#F0F8FF;padding:2rem;min-height:100vh;box-sizing:border-box}
.layout-wide{max-width:none}
.question-form label{display:block;margin-bottom:.5rem}
.question-form input[type=text]{width:100%;box-sizing:border-box;padding:.6rem .8rem;border:1px solid #d6d6d9;border-radius:6px;background-color:#ffffff;color:#333333;font-size:1rem}
.header{color:#4a4a4a;padding:1rem 0}
.info-box{background-color:#e8f4fc;border-radius:10px;padding:1.5rem;margin-bottom:2rem}
.response-box{background-color:#ffffff;border-radius:10px;padding:1.5rem;margin-top:1rem;box-shadow:0 2px 4px rgba(0,0,0,0.1)}
.error-box{background-color:#ffebee;color:#7d1a1a;border-radius:10px;padding:1rem 1.5rem;margin-top:1rem}
.logo{display:flex;align-items:center;margin-bottom:1rem}
.logo img{height:60px;margin-right:15px}
.busy{margin-top:1rem;color:#4a4a4a}
.footer{text-align:center;color:#666666;font-size:0.9rem}
"#;

const INFO_BANNER: &str = r#"<div class='info-box'>
  <h2>Welcome to the Future of AI Conversations</h2>
  <p>This assistant is powered by I-Tech AI, one of the most advanced generative AI models available today.</p>
  <p>Ask anything - from technical questions to creative brainstorming!</p>
</div>"#;

const FOOTER: &str = r#"<hr>
<div class='footer'>
  <p>Powered by © 2023 I-TECH AI Solutions</p>
</div>"#;

// Shows the busy indicator while the browser waits for the answer.
const BUSY_SCRIPT: &str = r#"<script>
document.getElementById("question-form").addEventListener("submit", function () {
  document.getElementById("busy").hidden = false;
});
</script>"#;

/// Escape text for use in HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Response region. The model text is inserted as-is, markup included.
pub fn response_region(text: &str) -> String {
    format!(
        "<div class='response-box'>\n  <h3>AI Response:</h3>\n  <p>{text}</p>\n</div>"
    )
}

/// Error region holding an escaped message.
pub fn error_region(message: &str) -> String {
    format!(
        "<div class='error-box' role='alert'>{}</div>",
        escape_html(message)
    )
}

/// Render the page after an interaction. `Idle` and `Pending` show neither region.
pub fn render_page(question: &str, state: &InteractionState) -> String {
    let region = match state {
        InteractionState::Idle | InteractionState::Pending => String::new(),
        InteractionState::Settled(Outcome::Response(text)) => response_region(text),
        InteractionState::Settled(Outcome::Failure(message)) => error_region(message),
    };
    render_shell(question, &region)
}

/// Render the page with `message` in the error region, for failures the
/// interaction itself does not handle.
pub fn render_error_page(question: &str, message: &str) -> String {
    render_shell(question, &error_region(message))
}

fn render_shell(question: &str, region: &str) -> String {
    let value = escape_html(question);

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{PAGE_TITLE}</title>
<link rel="icon" href="data:image/svg+xml,<svg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 100 100%22><text y=%22.9em%22 font-size=%2290%22>{PAGE_ICON}</text></svg>">
<style>{THEME_CSS}</style>
</head>
<body>
<div class="main layout-wide">
<div class='logo'>
  <img src="/logo" alt="I-TECH logo" width="200">
  <h1 class='header'>{PAGE_TITLE}</h1>
</div>
{INFO_BANNER}
<form id="question-form" class="question-form" method="get" action="/">
  <label for="question">Enter your question here:</label>
  <input type="text" id="question" name="question" value="{value}" placeholder="Type your question and press Enter..." autocomplete="off" autofocus>
</form>
<div id="busy" class="busy" hidden>Generating response...</div>
{region}
{FOOTER}
</div>
{BUSY_SCRIPT}
</body>
</html>
"##
    )
}
