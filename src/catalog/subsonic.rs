//! Subsonic/Navidrome server catalog.
//!
//! Every request carries token auth: a fresh random salt and
//! `md5(password + salt)`, so the password itself never goes over the wire.
//! Calls are blocking; the [`Reporter`](super::Reporter) runs them on the
//! blocking pool.

use super::Catalog;
use crate::error::CatalogError;
use crate::model::Track;
use md5::{Digest, Md5};
use rand::Rng;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

pub const API_VERSION: &str = "1.16.1";
pub const CLIENT_NAME: &str = "naviplay";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct SubsonicCatalog {
    base: Url,
    username: String,
    password: String,
}

impl SubsonicCatalog {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self, CatalogError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| CatalogError::Request(format!("bad server url '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(CatalogError::Request(format!("bad server url '{}'", base_url)));
        }
        Ok(Self {
            base,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn auth_params(&self, salt: &str) -> [(&'static str, String); 6] {
        [
            ("u", self.username.clone()),
            ("t", auth_token(&self.password, salt)),
            ("s", salt.to_string()),
            ("v", API_VERSION.to_string()),
            ("c", CLIENT_NAME.to_string()),
            ("f", "json".to_string()),
        ]
    }

    /// `<base>/rest/<endpoint>` with auth and `params` in the query string.
    fn endpoint_url(&self, endpoint: &str, params: &[(&str, &str)], salt: &str) -> Url {
        let mut url = self.base.clone();
        let path = format!("{}/rest/{}", self.base.path().trim_end_matches('/'), endpoint);
        url.set_path(&path);
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in self.auth_params(salt) {
                query.append_pair(key, &value);
            }
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    fn call(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<ApiResponse, CatalogError> {
        let url = self.endpoint_url(endpoint, params, &random_salt());
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Request(e.to_string()))?;
        let body = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    CatalogError::Unavailable
                } else {
                    CatalogError::Request(e.to_string())
                }
            })?;
        parse_response(&body)
    }

    /// Look up one song's metadata.
    pub fn song(&self, id: &str) -> Result<Track, CatalogError> {
        self.call("getSong.view", &[("id", id)])?
            .song
            .map(ApiSong::into_track)
            .ok_or_else(|| CatalogError::Request(format!("no song in reply for '{}'", id)))
    }

    pub fn ping(&self) -> Result<(), CatalogError> {
        self.call("ping.view", &[]).map(|_| ())
    }

    fn scrobble(&self, track_id: &str, submission: bool) -> Result<(), CatalogError> {
        let submission = if submission { "true" } else { "false" };
        self.call("scrobble.view", &[("id", track_id), ("submission", submission)])
            .map(|_| ())
    }
}

impl Catalog for SubsonicCatalog {
    fn stream_url(&self, track: &Track) -> String {
        self.endpoint_url(
            "stream.view",
            &[("id", track.id.as_str()), ("format", "raw")],
            &random_salt(),
        )
        .to_string()
    }

    fn report_now_playing(&self, track_id: &str) -> Result<(), CatalogError> {
        self.scrobble(track_id, false)
    }

    fn report_played(&self, track_id: &str) -> Result<(), CatalogError> {
        self.scrobble(track_id, true)
    }
}

fn auth_token(password: &str, salt: &str) -> String {
    format!("{:x}", Md5::digest(format!("{}{}", password, salt).as_bytes()))
}

/// 16 random bytes, hex encoded.
fn random_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "subsonic-response")]
    response: ApiResponse,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    song: Option<ApiSong>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSong {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    album: Option<String>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default)]
    bit_rate: Option<u32>,
}

impl ApiSong {
    fn into_track(self) -> Track {
        let mut track = Track::new(
            &self.id,
            self.title.as_deref().unwrap_or("Unknown"),
            self.duration.unwrap_or(0),
        );
        if let Some(artist) = &self.artist {
            track = track.with_artist(artist);
        }
        if let Some(album) = &self.album {
            track = track.with_album(album);
        }
        track.suffix = self.suffix.filter(|s| !s.is_empty());
        track.bitrate = self.bit_rate.filter(|&b| b > 0);
        track
    }
}

fn parse_response(body: &str) -> Result<ApiResponse, CatalogError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| CatalogError::Request(format!("unreadable reply: {}", e)))?;
    let response = envelope.response;
    if response.status == "failed" {
        let error = response.error.unwrap_or(ApiError {
            code: -1,
            message: "Unknown error".to_string(),
        });
        return Err(CatalogError::Server {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response)
}
