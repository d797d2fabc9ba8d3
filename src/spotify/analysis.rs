use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{
    get_recently_played, get_top_artists, get_top_tracks, get_user_profile, Artist, TimeRange,
    Track,
};
use crate::error::Result;
use crate::gateway::Gateway;

const ANALYSIS_SAMPLE_SIZE: u32 = 20;
const TOP_GENRE_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MusicDiversity {
    pub total_genres: usize,
    pub average_genres_per_artist: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PopularityCategory {
    Underground,
    Indie,
    Popular,
    Mainstream,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopularityScore {
    pub score: i64,
    pub category: PopularityCategory,
}

/// The listening statistics handed to the roast generator.
#[derive(Debug, Clone, Serialize)]
pub struct ListeningProfile {
    pub display_name: Option<String>,
    pub top_genres: Vec<GenreCount>,
    pub diversity: MusicDiversity,
    pub popularity: PopularityScore,
    pub recent_activity: usize,
    pub top_artists: Vec<String>,
    pub top_tracks: Vec<String>,
}

pub fn top_genres(artists: &[Artist]) -> Vec<GenreCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for artist in artists {
        for genre in &artist.genres {
            *counts.entry(genre.as_str()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre: genre.to_string(),
            count,
        })
        .collect();
    // ties break alphabetically so the output is stable
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
    ranked.truncate(TOP_GENRE_COUNT);
    ranked
}

pub fn music_diversity(artists: &[Artist]) -> MusicDiversity {
    let unique: HashSet<&str> = artists
        .iter()
        .flat_map(|a| a.genres.iter().map(String::as_str))
        .collect();

    let average = if artists.is_empty() {
        0.0
    } else {
        artists.iter().map(|a| a.genres.len()).sum::<usize>() as f64 / artists.len() as f64
    };

    MusicDiversity {
        total_genres: unique.len(),
        average_genres_per_artist: average,
    }
}

pub fn popularity_score(tracks: &[Track]) -> PopularityScore {
    let score = if tracks.is_empty() {
        0
    } else {
        (tracks.iter().map(|t| t.popularity).sum::<i64>() as f64 / tracks.len() as f64).round()
            as i64
    };

    let category = if score < 30 {
        PopularityCategory::Underground
    } else if score < 60 {
        PopularityCategory::Indie
    } else if score < 80 {
        PopularityCategory::Popular
    } else {
        PopularityCategory::Mainstream
    };

    PopularityScore { score, category }
}

/// Fetches the user's statistics concurrently and condenses them into a
/// `ListeningProfile`. All calls go through the gateway, so an expired
/// token costs a single refresh for the whole batch.
pub async fn analyze(gateway: &Gateway) -> Result<ListeningProfile> {
    let (profile, top_tracks, top_artists, recent) = tokio::try_join!(
        get_user_profile(gateway),
        get_top_tracks(gateway, TimeRange::MediumTerm, ANALYSIS_SAMPLE_SIZE),
        get_top_artists(gateway, TimeRange::MediumTerm, ANALYSIS_SAMPLE_SIZE),
        get_recently_played(gateway, ANALYSIS_SAMPLE_SIZE),
    )?;

    Ok(ListeningProfile {
        display_name: profile.display_name,
        top_genres: top_genres(&top_artists.items),
        diversity: music_diversity(&top_artists.items),
        popularity: popularity_score(&top_tracks.items),
        recent_activity: recent.items.len(),
        top_artists: top_artists.items.iter().map(|a| a.name.clone()).collect(),
        top_tracks: top_tracks.items.iter().map(track_label).collect(),
    })
}

fn track_label(track: &Track) -> String {
    match track.artists.first() {
        Some(artist) => format!("{} - {}", track.name, artist.name),
        None => track.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artist(name: &str, genres: &[&str], popularity: i64) -> Artist {
        Artist {
            name: name.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            popularity,
        }
    }

    fn track(name: &str, popularity: i64) -> Track {
        Track {
            name: name.to_string(),
            artists: vec![],
            popularity,
        }
    }

    #[test]
    fn top_genres_ranks_by_count_and_keeps_five() {
        let artists = vec![
            artist("A", &["pop", "rock"], 50),
            artist("B", &["pop", "indie"], 50),
            artist("C", &["pop", "jazz", "metal", "folk"], 50),
        ];

        let ranked = top_genres(&artists);
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].genre, "pop");
        assert_eq!(ranked[0].count, 3);
    }

    #[test]
    fn diversity_counts_unique_genres() {
        let artists = vec![
            artist("A", &["pop", "rock"], 50),
            artist("B", &["pop"], 50),
        ];

        let diversity = music_diversity(&artists);
        assert_eq!(diversity.total_genres, 2);
        assert!((diversity.average_genres_per_artist - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn diversity_of_no_artists_is_zero() {
        let diversity = music_diversity(&[]);
        assert_eq!(diversity.total_genres, 0);
        assert_eq!(diversity.average_genres_per_artist, 0.0);
    }

    #[test]
    fn popularity_categories_follow_thresholds() {
        assert_eq!(
            popularity_score(&[track("a", 10)]).category,
            PopularityCategory::Underground
        );
        assert_eq!(
            popularity_score(&[track("a", 45)]).category,
            PopularityCategory::Indie
        );
        assert_eq!(
            popularity_score(&[track("a", 70)]).category,
            PopularityCategory::Popular
        );
        assert_eq!(
            popularity_score(&[track("a", 95)]).category,
            PopularityCategory::Mainstream
        );
    }

    #[test]
    fn popularity_score_averages_and_rounds() {
        let score = popularity_score(&[track("a", 50), track("b", 61)]);
        assert_eq!(score.score, 56);
    }
}
