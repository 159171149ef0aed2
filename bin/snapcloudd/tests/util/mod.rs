#![allow(dead_code)]
use std::sync::{Arc, Once};

use anyhow::{anyhow, ensure, Result};

use protocol::files::{FileInfo, UploadResponse};

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};

use snapcloud_auth::UserIdentity;
use snapcloudd::config::{HttpParameters, ServerSetting};
use snapcloudd::{Config, Server};

use tempfile::TempDir;

pub const ADMIN_PASSWORD: &str = "password";

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        xecute::logging::init_logger(&None).ok();
    });
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

pub struct SnapCloud {
    server: Option<Server>,
    pub root_directory: TempDir,
    pub url: String,
    pub config: Config,
    pub client: reqwest::Client,
}

impl SnapCloud {
    pub async fn new() -> Result<Self> {
        init_logger();
        let root_directory = TempDir::new()?;

        const SNAPCLOUDD_CONFIG: &str = include_str!("../data/snapcloudd_http.toml");

        let mut cfg = Config::from_toml_string(SNAPCLOUDD_CONFIG)?;
        cfg.node.db_path = root_directory.path().join("db");

        let port = portpicker::pick_unused_port().ok_or_else(|| anyhow!("no free port"))?;
        cfg.server = ServerSetting::Http(HttpParameters { port });

        let node = Arc::new(snapcloudd::make_node(&cfg)?);
        let server = Server::new(cfg.clone(), node).await?;

        Ok(Self {
            server: Some(server),
            root_directory,
            url: format!("http://localhost:{}", port),
            config: cfg,
            client: reqwest::Client::new(),
        })
    }

    pub fn token(&self, username: &str) -> Result<String> {
        snapcloud_auth::make_token(
            &self.config.node.encryption_key,
            &UserIdentity {
                username: username.into(),
                admin: false,
            },
        )
    }

    pub fn admin_token(&self) -> Result<String> {
        snapcloud_auth::make_token(
            &self.config.node.encryption_key,
            &UserIdentity {
                username: String::from("admin"),
                admin: true,
            },
        )
    }

    pub fn url<S: AsRef<str>>(&self, path: S) -> String {
        format!("{}{}", self.url, path.as_ref())
    }

    pub async fn upload_form(&self, token: &str, form: Form) -> Result<Response> {
        Ok(self
            .client
            .post(self.url("/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?)
    }

    pub async fn upload(&self, token: &str, file_name: &str, body: Vec<u8>) -> Result<FileInfo> {
        let form = Form::new().part("file", Part::bytes(body).file_name(file_name.to_string()));
        let response = self.upload_form(token, form).await?;
        ensure!(
            response.status() == StatusCode::OK,
            "upload failed: {}",
            response.status()
        );

        let payload: UploadResponse = response.json().await?;
        ensure!(payload.ok, "upload not ok");
        Ok(payload.file)
    }

    pub async fn stream(&self, token: &str, id: &str, range: Option<&str>) -> Result<Response> {
        let mut request = self
            .client
            .get(self.url(format!("/stream/{}", id)))
            .bearer_auth(token);
        if let Some(range) = range {
            request = request.header("range", range);
        }
        Ok(request.send().await?)
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(server) = self.server.take() {
            server.stop().await?;
        }
        Ok(())
    }
}
