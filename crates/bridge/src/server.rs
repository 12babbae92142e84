use crate::handlers::BridgeState;
use crate::http::{read_request, HttpRequest, HttpResponse, READ_DEADLINE};
use crate::request::{BridgeRequest, Route};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

/// Routes one framed request to its handler.
pub async fn dispatch(state: &BridgeState, request: HttpRequest) -> HttpResponse {
    if request.method == "OPTIONS" {
        return HttpResponse::no_content();
    }
    let Some(route) = Route::resolve(&request.method, &request.path) else {
        return HttpResponse::json(
            404,
            json!({ "error": "Not found", "path": request.path }),
        );
    };
    state.handle(BridgeRequest::decode(route, &request.body)).await
}

/// Serves one connection: read one request, answer it, close.
pub async fn serve_connection(state: Arc<BridgeState>, mut stream: TcpStream, peer: SocketAddr) {
    let response = match read_request(&mut stream, READ_DEADLINE).await {
        Ok(Some(request)) => {
            log::debug!("{peer} {} {}", request.method, request.path);
            dispatch(&state, request).await
        }
        Ok(None) => return,
        Err(err) => {
            log::debug!("{peer} rejected: {}", err.message());
            HttpResponse::error(err.status(), err.message())
        }
    };
    if let Err(err) = stream.write_all(&response.to_bytes()).await {
        log::debug!("{peer} write failed: {err}");
        return;
    }
    if let Err(err) = stream.shutdown().await {
        log::trace!("{peer} shutdown failed: {err}");
    }
}

/// Accepts connections until `shutdown` resolves, one task per connection.
pub async fn serve<F>(listener: TcpListener, state: Arc<BridgeState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Bridge shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(serve_connection(Arc::clone(&state), stream, peer));
                    }
                    Err(err) => log::warn!("Accept failed: {err}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LocalEditorHost;
    use crate::phase_detector::PhrasePhaseDetector;
    use crate::phase_store::MemoryPhaseRepository;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::fs;

    fn state(root: &std::path::Path) -> BridgeState {
        BridgeState::new(
            Arc::new(LocalEditorHost::new(root, None)),
            Arc::new(MemoryPhaseRepository::default()),
            Box::new(PhrasePhaseDetector),
        )
    }

    fn request(method: &str, path: &str, body: &str) -> HttpRequest {
        HttpRequest {
            method: method.to_string(),
            path: path.to_string(),
            query: None,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn unknown_routes_are_404_with_path() {
        let temp = tempfile::tempdir().unwrap();
        let state = state(temp.path());
        for (method, path) in [("GET", "/nope"), ("POST", "/status"), ("GET", "/run")] {
            let response = dispatch(&state, request(method, path, "")).await;
            assert_eq!(response.status, 404);
            assert_eq!(response.body.unwrap()["path"], Value::from(path));
        }
    }

    #[tokio::test]
    async fn every_route_answers() {
        let temp = tempfile::tempdir().unwrap();
        let state = state(temp.path());
        for route in Route::ALL {
            let response = dispatch(&state, request(route.method(), route.path(), "")).await;
            assert_eq!(response.status, 200, "{route:?}");
        }
    }

    #[tokio::test]
    async fn options_is_preflight() {
        let temp = tempfile::tempdir().unwrap();
        let response = dispatch(&state(temp.path()), request("OPTIONS", "/anything", "")).await;
        assert_eq!(response, HttpResponse::no_content());
    }

    #[tokio::test]
    async fn log_line_moves_phase() {
        let temp = tempfile::tempdir().unwrap();
        let state = state(temp.path());
        let body = r#"{"message": "Phase 3: Core Mechanics started"}"#;
        let response = dispatch(&state, request("POST", "/log", body)).await;
        assert_eq!(response.body.unwrap()["ok"], Value::Bool(true));

        let phase = state.phases.current();
        assert_eq!(phase.phase_number, 3);
        assert_eq!(phase.phase_name, "Core Mechanics");
        let kinds: Vec<String> = state.events.recent().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec!["log", "phase"]);
    }

    #[tokio::test]
    async fn log_line_cannot_complete_a_phase() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("broken.gd"), "func f():\n\tvar a = [1\n").unwrap();
        let state = state(temp.path());
        let body = r#"{"phase_number": 5, "phase_name": "Polish", "status": "in_progress"}"#;
        dispatch(&state, request("POST", "/phase", body)).await;

        let response = dispatch(&state, request("POST", "/log", r#"{"message": "Phase 5 complete"}"#)).await;
        assert_eq!(response.status, 200);

        let phase = dispatch(&state, request("GET", "/phase", "")).await.body.unwrap();
        assert_eq!(phase["phase_number"], json!(5));
        assert_eq!(phase["phase_name"], json!("Polish"));
        assert_eq!(phase["status"], json!("in_progress"));
    }

    #[tokio::test]
    async fn bad_phase_fields_fall_back_to_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let state = state(temp.path());

        let response = dispatch(
            &state,
            request("POST", "/phase", r#"{"phase_number": -1, "status": "started"}"#),
        )
        .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body.unwrap()["phase"]["phase_number"], json!(0));

        let response = dispatch(
            &state,
            request("POST", "/phase", r#"{"phase_number": "5", "phase_name": "Polish"}"#),
        )
        .await;
        assert_eq!(response.status, 200);
        let phase = state.phases.current();
        assert_eq!(phase.phase_number, 5);
        assert_eq!(phase.phase_name, "Polish");
    }

    #[tokio::test]
    async fn run_without_main_scene_is_soft_failure() {
        let temp = tempfile::tempdir().unwrap();
        let response = dispatch(&state(temp.path()), request("POST", "/run", "{}")).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body.unwrap()["ok"], Value::Bool(false));
    }
}
