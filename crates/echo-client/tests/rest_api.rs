//! `HttpSongApi` against a small axum stand-in for the Echo server.

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use echo_client::api::{AuthError, FetchError, HttpSongApi, SongApi};
use echo_proto::protocol::AccessLevel;
use serde_json::{json, Value};

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match (body["username"].as_str(), body["password"].as_str()) {
        (Some("router"), Some("pw")) => (
            StatusCode::OK,
            Json(json!({"status": "success", "nivel": "Router"})),
        ),
        (Some("band"), Some("pw")) => (
            StatusCode::OK,
            Json(json!({"status": "success", "nivel": "Musico"})),
        ),
        (Some("banned"), _) => (
            StatusCode::FORBIDDEN,
            Json(json!({"status": "error", "message": "Acesso negado"})),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": "error", "message": "Credenciais invalidas"})),
        ),
    }
}

fn row(id: i64, titulo: &str, banda: &str) -> Value {
    json!({
        "id": id,
        "titulo": titulo,
        "banda": banda,
        "tom": "G",
        "letra": "la la",
        "cifra": "G D",
        "created_at": "2024-05-01 12:00:00"
    })
}

async fn songs() -> Json<Value> {
    Json(json!([row(1, "Echo of Time", "The Hollow"), row(2, "Wild Night", "Van Morrison")]))
}

async fn song(Path(id): Path<i64>) -> Result<Json<Value>, StatusCode> {
    match id {
        1 => Ok(Json(row(1, "Echo of Time", "The Hollow"))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn serve() -> String {
    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/songs", get(songs))
        .route("/api/song/:id", get(song));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_login_reports_access_level() {
    let endpoint = serve().await;
    let api = HttpSongApi::new();

    let level = api.login(&endpoint, "router", "pw").await.unwrap();
    assert_eq!(level, Some(AccessLevel::Router));

    let level = api.login(&endpoint, "band", "pw").await.unwrap();
    assert_eq!(level, Some(AccessLevel::Other("Musico".into())));
}

#[tokio::test]
async fn test_login_rejections_are_auth_errors() {
    let endpoint = serve().await;
    let api = HttpSongApi::new();

    let err = api.login(&endpoint, "router", "nope").await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(401)));

    let err = api.login(&endpoint, "banned", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(403)));
}

#[tokio::test]
async fn test_catalog_and_single_song() {
    let endpoint = serve().await;
    let api = HttpSongApi::new();

    let songs = api.fetch_catalog(&endpoint).await.unwrap();
    let titles: Vec<&str> = songs.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Echo of Time", "Wild Night"]);

    // Trailing slash on the endpoint must not break the path.
    let song = api.fetch_song(&format!("{endpoint}/"), 1).await.unwrap();
    assert_eq!(song.band, "The Hollow");
    assert_eq!(song.chords, "G D");

    let err = api.fetch_song(&endpoint, 42).await.unwrap_err();
    assert!(matches!(err, FetchError::Status(404)));
}
