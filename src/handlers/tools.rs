//! Site tools.

use crate::context::RequestScope;
use crate::error::AppError;
use crate::lifecycle::VIEW_LOG_TITLE;
use crate::state::AppState;
use axum::{extract::State, http::header, response::IntoResponse};

/// Lines of the log returned by the viewer.
pub const LOG_TAIL_LINES: usize = 200;

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

/// GET /tools/view_log
pub async fn view_log(State(state): State<AppState>, scope: RequestScope) -> Result<impl IntoResponse, AppError> {
    {
        let ctx = scope.lock().await;
        if !ctx.admin()?.has_access(VIEW_LOG_TITLE) {
            return Err(AppError::Forbidden(VIEW_LOG_TITLE.into()));
        }
    }
    let path = state
        .config
        .log_file_path
        .as_ref()
        .ok_or_else(|| AppError::NotFound("no log file configured".into()))?;
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("log file {}", path.display())));
        }
        Err(e) => return Err(e.into()),
    };
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        tail(&text, LOG_TAIL_LINES),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
        assert_eq!(tail("", 5), "");
    }
}
