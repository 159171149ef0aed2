use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TokenRequest {
    pub username: String,
    pub admin_password: String,

    #[serde(default)]
    pub admin: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
