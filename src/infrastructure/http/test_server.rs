//! Canned-response HTTP server for client tests

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

struct Canned {
    responses: Vec<(u16, String)>,
    served: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

pub struct TestServer {
    pub base_url: String,
    state: Arc<Canned>,
}

impl TestServer {
    /// Serve `responses` in order, one per request; the last one repeats.
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        assert!(!responses.is_empty());
        let state = Arc::new(Canned {
            responses,
            served: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(respond).with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Every request seen so far as `METHOD /path?query` followed by the body on the next line
    pub async fn requests(&self) -> Vec<String> {
        self.state.requests.lock().await.clone()
    }
}

async fn respond(
    State(state): State<Arc<Canned>>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    state.requests.lock().await.push(format!("{} {}\n{}", method, uri, body));

    let index = state.served.fetch_add(1, Ordering::SeqCst).min(state.responses.len() - 1);
    let (status, body) = state.responses[index].clone();
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_in_order_and_records_requests() {
        let server = TestServer::start(vec![(500, "{}".to_string()), (200, "[]".to_string())]).await;
        let client = reqwest::Client::builder().no_proxy().build().unwrap();

        let mut statuses = Vec::new();
        for path in ["/a", "/b?x=1", "/c"] {
            let response = client.post(format!("{}{}", server.base_url, path)).body("hi").send().await.unwrap();
            statuses.push(response.status().as_u16());
        }

        assert_eq!(statuses, vec![500, 200, 200]);
        let requests = server.requests().await;
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1], "POST /b?x=1\nhi");
    }
}
