// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Location extraction from inbound messages.
//!
//! A fixed chain of parsers is tried in order: native location payload, maps
//! link, raw `lat, lng` text, then a base64 media blob holding either of the
//! textual forms or a `geo:` URI. Only plausible coordinates are accepted.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fieldops_core::types::{Coordinate, InboundMessage, MediaBlob};
use regex::Regex;

const NUM: &str = r"(-?\d{1,3}(?:\.\d+)?)";

static MAPS_AT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(&format!(r"@{NUM},\s*{NUM}")).ok());
static MAPS_QUERY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(r"[?&](?:q|ll|query)=(?:loc:)?{NUM}(?:,|%2C)\s*{NUM}")).ok()
});
static RAW_PAIR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(&format!(r"^\s*{NUM}\s*[,;]\s*{NUM}\s*$")).ok());
static GEO_URI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(&format!(r"geo:{NUM},{NUM}")).ok());

type Parser = fn(&InboundMessage) -> Option<Coordinate>;

const CHAIN: &[Parser] = &[from_native, from_maps_link, from_raw_text, from_media];

/// First plausible coordinate found by the parser chain.
pub fn extract_location(msg: &InboundMessage) -> Option<Coordinate> {
    CHAIN.iter().find_map(|parse| parse(msg).filter(Coordinate::is_plausible))
}

fn capture_pair(re: &LazyLock<Option<Regex>>, text: &str) -> Option<Coordinate> {
    let caps = re.as_ref()?.captures(text)?;
    let lat = caps.get(1)?.as_str().parse().ok()?;
    let lng = caps.get(2)?.as_str().parse().ok()?;
    Some(Coordinate::new(lat, lng))
}

fn from_native(msg: &InboundMessage) -> Option<Coordinate> {
    msg.location
}

/// `https://maps.google.com/?q=-23.5,-46.6`, `.../@-23.5,-46.6,17z`, `ll=`, `query=`.
pub fn parse_maps_link(text: &str) -> Option<Coordinate> {
    capture_pair(&MAPS_QUERY, text).or_else(|| capture_pair(&MAPS_AT, text))
}

fn from_maps_link(msg: &InboundMessage) -> Option<Coordinate> {
    parse_maps_link(msg.text.as_deref()?)
}

/// A message consisting only of `lat, lng`.
pub fn parse_raw_pair(text: &str) -> Option<Coordinate> {
    capture_pair(&RAW_PAIR, text)
}

fn from_raw_text(msg: &InboundMessage) -> Option<Coordinate> {
    parse_raw_pair(msg.text.as_deref()?)
}

/// Decode a media blob and look for a `geo:` URI or one of the textual forms.
pub fn parse_media(blob: &MediaBlob) -> Option<Coordinate> {
    let bytes = STANDARD.decode(blob.data.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    capture_pair(&GEO_URI, &text)
        .or_else(|| parse_maps_link(&text))
        .or_else(|| parse_raw_pair(&text))
}

fn from_media(msg: &InboundMessage) -> Option<Coordinate> {
    parse_media(msg.media.as_ref()?)
}
