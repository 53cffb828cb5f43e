//! Song catalog with a derived, always-consistent filtered view.

use crate::protocol::{Song, SongId};

/// Case-insensitive substring match on title OR band. An empty query matches
/// everything.
pub fn song_matches(song: &Song, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    song.title.to_lowercase().contains(&needle) || song.band.to_lowercase().contains(&needle)
}

/// The subsequence of `songs` matching `query`, in catalog order.
pub fn filter<'a>(songs: &'a [Song], query: &str) -> Vec<&'a Song> {
    songs.iter().filter(|s| song_matches(s, query)).collect()
}

/// Fetched songs plus the current search query.
///
/// `visible` holds indices into `songs` and is rebuilt synchronously whenever
/// either the songs or the query change, so it can never name a song that is
/// not in the catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    songs: Vec<Song>,
    query: String,
    visible: Vec<usize>,
}

impl Catalog {
    pub fn new(songs: Vec<Song>) -> Self {
        let mut catalog = Self {
            songs,
            ..Default::default()
        };
        catalog.rebuild();
        catalog
    }

    /// Replace the songs after a fetch. The current query stays applied.
    pub fn replace(&mut self, songs: Vec<Song>) {
        self.songs = songs;
        self.rebuild();
    }

    pub fn set_filter(&mut self, query: &str) {
        self.query = query.to_string();
        self.rebuild();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Number of songs passing the filter.
    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Song> + '_ {
        self.visible.iter().map(|&i| &self.songs[i])
    }

    /// The n-th visible song.
    pub fn visible_at(&self, pos: usize) -> Option<&Song> {
        self.visible.get(pos).map(|&i| &self.songs[i])
    }

    /// Position of a song id within the visible list.
    pub fn visible_position(&self, id: SongId) -> Option<usize> {
        self.visible.iter().position(|&i| self.songs[i].id == id)
    }

    pub fn get(&self, id: SongId) -> Option<&Song> {
        self.songs.iter().find(|s| s.id == id)
    }

    fn rebuild(&mut self) {
        let query = self.query.as_str();
        self.visible = self
            .songs
            .iter()
            .enumerate()
            .filter(|(_, s)| song_matches(s, query))
            .map(|(i, _)| i)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: SongId, title: &str, band: &str) -> Song {
        Song {
            id,
            title: title.to_string(),
            band: band.to_string(),
            key: "C".to_string(),
            lyrics: String::new(),
            chords: String::new(),
        }
    }

    fn sample() -> Vec<Song> {
        vec![
            song(1, "Echo of Time", "The Hollow"),
            song(2, "Wild Night", "Van Morrison"),
            song(3, "Night Echoes", "Aurora"),
            song(4, "Quiet", "echo chamber"),
        ]
    }

    #[test]
    fn test_empty_query_is_identity() {
        let songs = sample();
        let all: Vec<SongId> = filter(&songs, "").iter().map(|s| s.id).collect();
        assert_eq!(all, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_uppercase_query_matches_title() {
        let songs = vec![song(1, "Echo of Time", "A"), song(2, "Wild Night", "B")];
        let hits: Vec<&str> = filter(&songs, "ECHO").iter().map(|s| s.title.as_str()).collect();
        assert_eq!(hits, vec!["Echo of Time"]);
    }

    #[test]
    fn test_query_matches_title_or_band_in_order() {
        let songs = sample();
        let hits: Vec<SongId> = filter(&songs, "echo").iter().map(|s| s.id).collect();
        assert_eq!(hits, vec![1, 3, 4]);
    }

    #[test]
    fn test_filter_is_subsequence_for_many_queries() {
        let songs = sample();
        for q in ["", "e", "NIGHT", "van", "zzz", "o", " "] {
            let hits = filter(&songs, q);
            let mut it = songs.iter();
            for hit in &hits {
                assert!(it.any(|s| s.id == hit.id), "{q:?} broke catalog order");
            }
            let expected = songs
                .iter()
                .filter(|s| {
                    s.title.to_lowercase().contains(&q.to_lowercase())
                        || s.band.to_lowercase().contains(&q.to_lowercase())
                })
                .count();
            assert_eq!(hits.len(), expected);
        }
    }

    #[test]
    fn test_catalog_reapplies_query_on_replace() {
        let mut catalog = Catalog::new(sample());
        catalog.set_filter("night");
        assert_eq!(catalog.visible_len(), 2);

        catalog.replace(vec![song(9, "Nightfall", "X"), song(10, "Day", "Y")]);
        let ids: Vec<SongId> = catalog.visible().map(|s| s.id).collect();
        assert_eq!(ids, vec![9]);
        assert_eq!(catalog.query(), "night");
    }

    #[test]
    fn test_clearing_query_restores_everything() {
        let mut catalog = Catalog::new(sample());
        catalog.set_filter("zzz");
        assert_eq!(catalog.visible_len(), 0);
        catalog.set_filter("");
        assert_eq!(catalog.visible_len(), catalog.len());
    }

    #[test]
    fn test_visible_position_tracks_filter() {
        let mut catalog = Catalog::new(sample());
        catalog.set_filter("echo");
        assert_eq!(catalog.visible_position(3), Some(1));
        assert_eq!(catalog.visible_position(2), None);
        assert_eq!(catalog.visible_at(2).map(|s| s.id), Some(4));
    }
}
