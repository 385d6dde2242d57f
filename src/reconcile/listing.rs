//! Catalog merge: `(id, name)` pairs from a profile listing.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use super::{MergeCounts, Reconciler};
use crate::domain::GameId;
use crate::vdf::Node;

static APP_FRAGMENT_REGEX: OnceLock<Regex> = OnceLock::new();

fn app_fragment_regex() -> &'static Regex {
    APP_FRAGMENT_REGEX.get_or_init(|| {
        Regex::new(r#""appid":([0-9]+),"name":"([^"]+)""#)
            .unwrap_or_else(|e| panic!("bad regex: {}", e))
    })
}

impl<'a> Reconciler<'a> {
    /// Merge one listing entry.
    ///
    /// Returns `None` if the id is ignored, otherwise whether a new title was
    /// created.
    pub fn integrate_game(&mut self, id: GameId, name: &str) -> Option<bool> {
        if self.is_ignored(id) {
            debug!(id, name, "Skipped integrating game");
            return None;
        }

        let is_new = self
            .library
            .set_game_name(id, name, self.options.overwrite_names);
        debug!(id, name, is_new, "Integrated game into library");
        Some(is_new)
    }

    /// Merge any sequence of `(id, name)` pairs
    pub fn integrate_app_list<I, S>(&mut self, apps: I) -> MergeCounts
    where
        I: IntoIterator<Item = (GameId, S)>,
        S: AsRef<str>,
    {
        let mut counts = MergeCounts::default();

        for (id, name) in apps {
            if let Some(is_new) = self.integrate_game(id, name.as_ref()) {
                counts.processed += 1;
                if is_new {
                    counts.new_items += 1;
                }
            }
        }

        counts
    }

    /// Merge a profile games page: every `"appid":N,"name":"..."` fragment,
    /// with `\uXXXX` escapes in names decoded
    #[instrument(skip(self, page), fields(bytes = page.len()))]
    pub fn integrate_html_listing(&mut self, page: &str) -> MergeCounts {
        let apps: Vec<(GameId, String)> = app_fragment_regex()
            .captures_iter(page)
            .filter_map(|caps| {
                let id = caps.get(1)?.as_str().parse::<GameId>().ok()?;
                let name = decode_unicode_escapes(caps.get(2)?.as_str());
                Some((id, name))
            })
            .collect();

        let counts = self.integrate_app_list(apps);
        info!(
            processed = counts.processed,
            new_items = counts.new_items,
            "Integrated HTML data into game list"
        );
        counts
    }

    /// Merge a structured listing: the `games` node (or the root when there
    /// is none) holds one block per title with `appID` and `name` leaves.
    /// Records missing either, or with a non-numeric id, are skipped.
    #[instrument(skip(self, root))]
    pub fn integrate_tree_listing(&mut self, root: &Node) -> MergeCounts {
        let games = root.get("games").unwrap_or(root);

        let apps: Vec<(GameId, &str)> = games
            .iter()
            .filter_map(|(_, record)| {
                let id = record.get("appID")?.as_str()?.trim().parse::<GameId>().ok()?;
                let name = record.get("name")?.as_str()?;
                Some((id, name))
            })
            .collect();

        let counts = self.integrate_app_list(apps);
        info!(
            processed = counts.processed,
            new_items = counts.new_items,
            "Integrated structured data into game list"
        );
        counts
    }
}

/// Replace `\uXXXX` escapes with the characters they encode.
///
/// Consecutive escapes are decoded together so surrogate pairs combine;
/// unpaired surrogates become U+FFFD. Anything that is not a well-formed
/// escape is kept as-is.
pub fn decode_unicode_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut units: Vec<u16> = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        if let Some(unit) = escape_at(rest) {
            units.push(unit);
            rest = &rest[6..];
            continue;
        }

        flush_units(&mut units, &mut out);

        let Some(ch) = rest.chars().next() else {
            break;
        };
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    flush_units(&mut units, &mut out);
    out
}

/// Code unit of a `\uXXXX` escape at the start of `s`
fn escape_at(s: &str) -> Option<u16> {
    let hex = s.strip_prefix("\\u")?.get(..4)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

fn flush_units(units: &mut Vec<u16>, out: &mut String) {
    if units.is_empty() {
        return;
    }
    out.extend(
        char::decode_utf16(units.drain(..)).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}
