use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::gateway::Gateway;

pub mod analysis;

pub const ME: &str = "/me";
pub const PLAYLISTS: &str = "/me/playlists";
pub const TOP_TRACKS: &str = "/me/top/tracks";
pub const TOP_ARTISTS: &str = "/me/top/artists";
pub const RECENTLY_PLAYED: &str = "/me/player/recently-played";
pub const SAVED_TRACKS: &str = "/me/tracks";

const MAX_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<TrackArtist>,
    #[serde(default)]
    pub popularity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistoryItem {
    pub track: Track,
}

pub async fn get_user_profile(gateway: &Gateway) -> Result<UserProfile> {
    let value = gateway.authorized_request(Method::GET, ME, &[]).await?;
    decode(value)
}

pub async fn get_top_tracks(
    gateway: &Gateway,
    time_range: TimeRange,
    limit: u32,
) -> Result<Page<Track>> {
    let limit = limit.min(MAX_PAGE_LIMIT).to_string();
    let value = gateway
        .authorized_request(
            Method::GET,
            TOP_TRACKS,
            &[("time_range", time_range.as_str()), ("limit", &limit)],
        )
        .await?;
    decode(value)
}

pub async fn get_top_artists(
    gateway: &Gateway,
    time_range: TimeRange,
    limit: u32,
) -> Result<Page<Artist>> {
    let limit = limit.min(MAX_PAGE_LIMIT).to_string();
    let value = gateway
        .authorized_request(
            Method::GET,
            TOP_ARTISTS,
            &[("time_range", time_range.as_str()), ("limit", &limit)],
        )
        .await?;
    decode(value)
}

pub async fn get_recently_played(gateway: &Gateway, limit: u32) -> Result<Page<PlayHistoryItem>> {
    let limit = limit.min(MAX_PAGE_LIMIT).to_string();
    let value = gateway
        .authorized_request(Method::GET, RECENTLY_PLAYED, &[("limit", &limit)])
        .await?;
    decode(value)
}

pub async fn get_saved_tracks(gateway: &Gateway, limit: u32) -> Result<Page<SavedTrackItem>> {
    let limit = limit.min(MAX_PAGE_LIMIT).to_string();
    let value = gateway
        .authorized_request(Method::GET, SAVED_TRACKS, &[("limit", &limit)])
        .await?;
    decode(value)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrackItem {
    pub track: Track,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    pub name: String,
    #[serde(default)]
    pub public: Option<bool>,
}

pub async fn get_playlists(gateway: &Gateway, limit: u32) -> Result<Page<Playlist>> {
    let limit = limit.min(MAX_PAGE_LIMIT).to_string();
    let value = gateway
        .authorized_request(Method::GET, PLAYLISTS, &[("limit", &limit)])
        .await?;
    decode(value)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}
