use serde_json::Value;
use tabled::Table;

use crate::{
    info,
    state::{Feature, Snapshot},
    types::{ArtistTableRow, PlaylistTableRow, TrackTableRow},
    warning,
};

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn saved_mark(value: &Value) -> String {
    if value.get("saved").and_then(Value::as_bool).unwrap_or(false) {
        "♥".to_string()
    } else {
        String::new()
    }
}

fn items<'a>(snapshot: &'a Snapshot, key: &str) -> &'a [Value] {
    snapshot
        .attribute(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn artist_table(entries: &[Value]) -> Table {
    let rows: Vec<ArtistTableRow> = entries
        .iter()
        .map(|a| ArtistTableRow {
            name: text(a, "name"),
            this_is: text(a, "artist_playlist_name"),
            radio: text(a, "artist_radio_name"),
        })
        .collect();
    Table::new(rows)
}

fn track_table(entries: &[Value]) -> Table {
    let rows: Vec<TrackTableRow> = entries
        .iter()
        .map(|t| TrackTableRow {
            name: text(t, "trackname"),
            artist: text(t, "trackartist"),
            saved: saved_mark(t),
        })
        .collect();
    Table::new(rows)
}

fn playlist_table(entries: &[Value]) -> Table {
    let rows: Vec<PlaylistTableRow> = entries
        .iter()
        .map(|p| PlaylistTableRow {
            name: text(p, "name"),
            owner: text(p, "owner"),
            tracks: number(p, "tracks"),
            energy: number(p, "avgEnergy") as u32,
            valence: number(p, "avgValence") as u32,
        })
        .collect();
    Table::new(rows)
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => warning!("Cannot render attributes: {}", e),
    }
}

/// Prints a snapshot: list features as a table, everything else as its
/// state followed by the attributes as pretty JSON.
pub fn print_snapshot(snapshot: &Snapshot) {
    if !snapshot.available {
        warning!("{} is currently unavailable, showing last known state", snapshot.feature);
    }
    info!("{}: {}", snapshot.feature, snapshot.state);

    match snapshot.feature {
        Feature::MyArtists => println!("{}", artist_table(items(snapshot, "my_artists"))),
        Feature::TopArtists => println!("{}", artist_table(items(snapshot, "top_artists"))),
        Feature::Playlists => println!("{}", playlist_table(items(snapshot, "playlists"))),
        Feature::Extras => {
            info!("Queue");
            println!("{}", track_table(items(snapshot, "queue")));
            info!("Recently played");
            println!("{}", track_table(items(snapshot, "recent")));
        }
        _ => print_json(&snapshot.attributes),
    }
}
