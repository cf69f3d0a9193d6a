use std::fs;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use multibox_core::Catalog;
use multibox_infra::{FocusOutcome, WindowError, WindowManager};
use multibox_server::{router, AppState, ServerSettings};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::tempdir;

struct FakeDesktop {
    supported: bool,
    titles: Vec<String>,
    focus: FocusOutcome,
    closed: Mutex<Vec<String>>,
}

impl FakeDesktop {
    fn with_titles(titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            titles: titles.iter().map(|t| t.to_string()).collect(),
            focus: FocusOutcome::NotFound,
            closed: Mutex::new(Vec::new()),
        })
    }

    fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            titles: Vec::new(),
            focus: FocusOutcome::NotFound,
            closed: Mutex::new(Vec::new()),
        })
    }
}

impl WindowManager for FakeDesktop {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn visible_window_titles(&self) -> Result<Vec<String>, WindowError> {
        Ok(self.titles.clone())
    }

    fn focus_window(&self, _title: &str) -> Result<FocusOutcome, WindowError> {
        Ok(self.focus.clone())
    }

    fn close_windows(&self, titles: &[String]) -> Result<usize, WindowError> {
        let mut closed = self.closed.lock().unwrap();
        let mut count = 0;
        for title in titles {
            if self.titles.contains(title) {
                closed.push(title.clone());
                count += 1;
            }
        }
        Ok(count)
    }
}

async fn start(settings: ServerSettings, windows: Arc<dyn WindowManager>) -> String {
    let state = AppState::new(settings, Arc::new(Catalog::builtin()), windows);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post(base: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let res = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

fn write(path: &Utf8Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn roster() -> Value {
    json!([
        { "accountName": "alpha", "characters": [{ "characterName": "Nanomage" }] },
        { "accountName": "beta", "characters": [{ "characterName": "Doctor" }] }
    ])
}

#[tokio::test]
async fn catalog_is_listed_in_order() {
    let base = start(ServerSettings::default(), FakeDesktop::unsupported()).await;
    let items: Value = reqwest::get(format!("{base}/preference_items"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let ids: Vec<&str> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            "char_cfg",
            "prefs_xml",
            "shortcut_bars",
            "containers",
            "dock_areas",
            "chat_windows"
        ]
    );
    assert_eq!(items[0]["kind"], "file");
    assert_eq!(items[2]["kind"], "glob_set");
}

#[tokio::test]
async fn copy_preferences_copies_and_backs_up() {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    write(&root.join("alpha/Char1001/Char.cfg"), "new cfg");
    write(&root.join("beta/Char2002/Char.cfg"), "old cfg");

    let base = start(ServerSettings::default(), FakeDesktop::unsupported()).await;
    let (status, report) = post(
        &base,
        "/copy_preferences",
        json!({
            "preferencesRoot": root.as_str(),
            "sourceAccount": "alpha",
            "sourceCharacterId": 1001,
            "targets": [{ "accountName": "beta", "characterId": 2002 }],
            "items": ["char_cfg"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "success");
    assert_eq!(report["targets"][0]["copiedPaths"], json!(["Char.cfg"]));
    assert_eq!(report["targets"][0]["backedUpPaths"], json!(["Char.cfg"]));
    assert_eq!(
        fs::read_to_string(root.join("beta/Char2002/Char.cfg")).unwrap(),
        "new cfg"
    );

    let folder = report["backupFolderName"].as_str().unwrap();
    assert!(folder.starts_with("PrefsBackup_"));
    assert_eq!(
        fs::read_to_string(root.join("beta/Char2002").join(folder).join("Char.cfg")).unwrap(),
        "old cfg"
    );
}

#[tokio::test]
async fn copy_preferences_falls_back_to_the_configured_root() {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    write(&root.join("alpha/Char1/Prefs.xml"), "<prefs/>");
    fs::create_dir_all(root.join("alpha/Char2")).unwrap();

    let settings = ServerSettings {
        preferences_root: Some(root.clone()),
        ..ServerSettings::default()
    };
    let base = start(settings, FakeDesktop::unsupported()).await;
    let (status, report) = post(
        &base,
        "/copy_preferences",
        json!({
            "sourceAccount": "alpha",
            "sourceCharacterId": "1",
            "targets": [{ "accountName": "alpha", "characterId": "2" }],
            "items": ["prefs_xml"],
            "makeBackup": false
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "success");
    assert!(report["backupFolderName"].is_null());
    assert!(root.join("alpha/Char2/Prefs.xml").is_file());
}

#[tokio::test]
async fn copy_preferences_rejects_invalid_requests() {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let base = start(ServerSettings::default(), FakeDesktop::unsupported()).await;

    let (status, body) = post(
        &base,
        "/copy_preferences",
        json!({
            "preferencesRoot": root.as_str(),
            "sourceAccount": "alpha",
            "sourceCharacterId": "1",
            "targets": [{ "accountName": "beta", "characterId": "2" }],
            "items": ["char_cfg"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Source character folder not found"));

    let (status, body) = post(&base, "/copy_preferences", json!({ "items": ["char_cfg"] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Preferences folder is required");
}

#[tokio::test]
async fn a_target_missing_its_id_fails_alone() {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    write(&root.join("alpha/Char1/Char.cfg"), "shared cfg");
    fs::create_dir_all(root.join("beta/Char2")).unwrap();

    let base = start(ServerSettings::default(), FakeDesktop::unsupported()).await;
    let (status, report) = post(
        &base,
        "/copy_preferences",
        json!({
            "preferencesRoot": root.as_str(),
            "sourceAccount": "alpha",
            "sourceCharacterId": 1,
            "targets": [
                { "accountName": "beta", "characterId": 2 },
                { "accountName": "gamma" }
            ],
            "items": ["char_cfg"],
            "makeBackup": false
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "partial_success");
    assert_eq!(report["targets"][0]["copiedPaths"], json!(["Char.cfg"]));
    assert_eq!(
        fs::read_to_string(root.join("beta/Char2/Char.cfg")).unwrap(),
        "shared cfg"
    );
    assert!(report["targets"][1]["errors"][0]
        .as_str()
        .unwrap()
        .starts_with("Invalid target"));
}

#[tokio::test]
async fn unparseable_bodies_get_an_error_status() {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    write(&root.join("alpha/Char1/Char.cfg"), "cfg");
    let base = start(ServerSettings::default(), FakeDesktop::unsupported()).await;

    // A null source id leaves the source without an id.
    let (status, body) = post(
        &base,
        "/copy_preferences",
        json!({
            "preferencesRoot": root.as_str(),
            "sourceAccount": "alpha",
            "sourceCharacterId": null,
            "targets": [{ "accountName": "beta", "characterId": 2 }],
            "items": ["char_cfg"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, body) = post(
        &base,
        "/copy_preferences",
        json!({
            "preferencesRoot": root.as_str(),
            "sourceAccount": "alpha",
            "sourceCharacterId": 1,
            "targets": [{ "accountName": "beta", "characterId": true }],
            "items": ["char_cfg"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));

    let (status, body) = post(
        &base,
        "/launch",
        json!({ "characters": [{ "accountName": "a", "characterId": -5 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    for path in ["/copy_preferences", "/check_and_focus_window", "/close_running_instances"] {
        let res = reqwest::Client::new()
            .post(format!("{base}{path}"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "error", "{path}");
    }
}

#[tokio::test]
async fn conflict_check_reports_selected_accounts_only() {
    let desktop = FakeDesktop::with_titles(&[
        "Anarchy Online - Nanomage",
        "Anarchy Online - Doctor",
        "Notepad",
    ]);
    let base = start(ServerSettings::default(), desktop).await;

    let (status, body) = post(
        &base,
        "/check_and_focus_window",
        json!({ "allAccounts": roster(), "selectedAccounts": ["alpha"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "conflicts_found");
    assert_eq!(body["conflictedAccounts"], json!(["alpha"]));
    assert_eq!(body["conflicts"][0]["character"], "Nanomage");
    assert_eq!(body["conflicts"][0]["type"], "account_conflict");
    assert_eq!(body["runningCharacters"], json!(["Nanomage", "Doctor"]));

    let (status, body) = post(&base, "/check_and_focus_window", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn window_routes_report_unsupported_platforms() {
    let base = start(ServerSettings::default(), FakeDesktop::unsupported()).await;
    let accounts = json!({ "allAccounts": roster(), "selectedAccounts": ["alpha"] });

    let (status, body) = post(&base, "/check_and_focus_window", accounts.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unsupported");

    let (_, body) = post(&base, "/close_running_instances", accounts).await;
    assert_eq!(body["status"], "unsupported");

    let (_, body) = post(&base, "/focus_launcher_window", json!({})).await;
    assert_eq!(body["status"], "unsupported");
}

#[tokio::test]
async fn close_running_instances_targets_selected_accounts() {
    let desktop = FakeDesktop::with_titles(&["Anarchy Online - Nanomage", "Anarchy Online - Doctor"]);
    let base = start(ServerSettings::default(), desktop.clone()).await;

    let (status, body) = post(
        &base,
        "/close_running_instances",
        json!({ "allAccounts": roster(), "selectedAccounts": ["beta"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["closed"], 1);
    assert_eq!(
        *desktop.closed.lock().unwrap(),
        vec!["Anarchy Online - Doctor".to_string()]
    );
}

#[tokio::test]
async fn focus_launcher_window_maps_outcomes() {
    let focused = Arc::new(FakeDesktop {
        supported: true,
        titles: Vec::new(),
        focus: FocusOutcome::Focused,
        closed: Mutex::new(Vec::new()),
    });
    let base = start(ServerSettings::default(), focused).await;
    let (_, body) = post(&base, "/focus_launcher_window", json!({})).await;
    assert_eq!(body["status"], "success");

    let base = start(ServerSettings::default(), FakeDesktop::with_titles(&[])).await;
    let (_, body) = post(&base, "/focus_launcher_window", json!({})).await;
    assert_eq!(body["status"], "not_found");
}

#[tokio::test]
async fn launch_validates_before_spawning() {
    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let base = start(ServerSettings::default(), FakeDesktop::unsupported()).await;
    let character = json!([{ "accountName": "alpha", "password": "pw", "characterId": 1 }]);

    let (status, body) = post(&base, "/launch", json!({ "characters": character })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required data.");

    let (status, body) = post(
        &base,
        "/launch",
        json!({
            "gameFolder": root.join("game").as_str(),
            "dllFolder": root.as_str(),
            "characters": character
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().starts_with("DLL not found at: "));
}

#[tokio::test]
async fn index_is_served_from_the_static_folder() {
    let base = start(ServerSettings::default(), FakeDesktop::unsupported()).await;
    let res = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    fs::write(root.join("index.html"), "<h1>panel</h1>").unwrap();
    let settings = ServerSettings {
        static_dir: Some(root),
        ..ServerSettings::default()
    };
    let base = start(settings, FakeDesktop::unsupported()).await;
    let res = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "<h1>panel</h1>");
}
