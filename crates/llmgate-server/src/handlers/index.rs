//! Landing page.

use axum::{extract::State, response::Html};

use crate::state::AppState;

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Static page linking the model card on the Hugging Face hub.
pub async fn handle_index(State(state): State<AppState>) -> Html<String> {
    let model = state.model.config();
    Html(format!(
        r#"<html>
    <head>
        <title>llmgate</title>
    </head>
    <body style="background-color:black">
        <h2 style="font-family:system-ui"><a href="https://huggingface.co/{name}">{name}</a></h2>
        <p style="font-family:system-ui;color:gray">{file}</p>
    </body>
</html>
"#,
        name = escape_html(&model.name),
        file = escape_html(&model.file),
    ))
}
