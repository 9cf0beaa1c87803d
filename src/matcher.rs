//! Cross-venue event matching: recognizes when two markets on different
//! venues describe the same underlying bet, so a `CrossVenueOpportunity`
//! can be built from their combined legs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

const MIN_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub enum Direction {
    Above,
    Below,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    Directional15m,
    CryptoPrice,
    Other(String),
}

/// Entities pulled out of a free-text market name.
#[derive(Debug, Clone)]
pub struct MarketEntity {
    pub asset: Option<String>,
    pub price_target: Option<i64>,
    pub direction: Option<Direction>,
    pub date: Option<DateTime<Utc>>,
    pub event_type: Option<EventType>,
}

const ASSET_KEYWORDS: &[(&str, &str)] = &[
    ("btc", "BTC"),
    ("bitcoin", "BTC"),
    ("eth", "ETH"),
    ("ethereum", "ETH"),
    ("sol", "SOL"),
    ("solana", "SOL"),
    ("xrp", "XRP"),
    ("ripple", "XRP"),
    ("doge", "DOGE"),
    ("dogecoin", "DOGE"),
    ("ada", "ADA"),
    ("cardano", "ADA"),
    ("bnb", "BNB"),
    ("binance coin", "BNB"),
];

// Order matters: more specific phrases are matched first.
const EVENT_TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("up or down", "directional_15m"),
    ("price up", "directional_15m"),
    ("up in next", "directional_15m"),
    ("15 min", "directional_15m"),
    ("s&p", "sp500"),
    ("sp500", "sp500"),
    ("dow jones", "dow"),
    ("nasdaq", "nasdaq"),
    ("fed", "fed_rate"),
    ("federal reserve", "fed_rate"),
    ("interest rate", "fed_rate"),
    ("fomc", "fed_rate"),
    ("cpi", "inflation"),
    ("inflation", "inflation"),
    ("gdp", "gdp"),
    ("unemployment", "employment"),
    ("election", "election"),
    ("president", "election"),
    ("senate", "election"),
    ("congress", "election"),
];

const ABOVE_WORDS: &[&str] = &["above", "over", "exceeds", "higher than", "reaches", "hits"];
const BELOW_WORDS: &[&str] = &["below", "under", "less than", "drops", "falls", "lower than"];

static PRICE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\$?([\d,]+)\s*k\b").unwrap(),
        Regex::new(r"(?i)\$?(\d{1,3}(?:,\d{3})+)").unwrap(),
        Regex::new(r"(?i)\$?(\d{4,})\b").unwrap(),
        Regex::new(r"(?i)above\s*\$?([\d,]+)").unwrap(),
        Regex::new(r"(?i)below\s*\$?([\d,]+)").unwrap(),
        Regex::new(r"(?i)over\s*\$?([\d,]+)").unwrap(),
        Regex::new(r"(?i)under\s*\$?([\d,]+)").unwrap(),
    ]
});

pub fn extract_entities(name: &str, end_date: Option<DateTime<Utc>>) -> MarketEntity {
    let lower = name.to_ascii_lowercase();
    let asset = extract_asset(&lower);
    let event_type = extract_event_type(&lower, asset.is_some());
    MarketEntity {
        asset,
        price_target: extract_price(&lower),
        direction: extract_direction(&lower),
        date: end_date,
        event_type,
    }
}

fn extract_asset(lower: &str) -> Option<String> {
    ASSET_KEYWORDS
        .iter()
        .find(|(kw, _)| lower.contains(kw))
        .map(|(_, asset)| asset.to_string())
}

fn extract_price(lower: &str) -> Option<i64> {
    for pattern in PRICE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(lower) {
            let whole = caps.get(0).unwrap();
            let digits: String = caps[1].chars().filter(|c| *c != ',').collect();
            let mut price: i64 = digits.parse().ok()?;
            if whole.as_str().to_ascii_lowercase().contains('k') {
                price *= 1000;
            }
            if (1000..=1_000_000).contains(&price) {
                return Some(price);
            }
        }
    }
    None
}

fn extract_direction(lower: &str) -> Option<Direction> {
    if ABOVE_WORDS.iter().any(|w| lower.contains(w)) {
        return Some(Direction::Above);
    }
    if BELOW_WORDS.iter().any(|w| lower.contains(w)) {
        return Some(Direction::Below);
    }
    None
}

fn extract_event_type(lower: &str, has_asset: bool) -> Option<EventType> {
    for (kw, ty) in EVENT_TYPE_KEYWORDS {
        if lower.contains(kw) {
            return Some(if *ty == "directional_15m" {
                EventType::Directional15m
            } else {
                EventType::Other(ty.to_string())
            });
        }
    }
    if has_asset {
        return Some(EventType::CryptoPrice);
    }
    None
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Additive scoring across asset, price, direction, and date, with hard
/// rejects on any present-but-mismatched component, and a
/// completeness requirement for the two event types that get boosted.
pub fn calculate_match_score(a: &MarketEntity, b: &MarketEntity) -> MatchResult {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    if let (Some(aa), Some(ba)) = (&a.asset, &b.asset) {
        if aa == ba {
            score += 0.3;
            reasons.push("asset".to_string());
        } else {
            return MatchResult { score: 0.0, reasons: vec!["asset mismatch".into()] };
        }
    }

    if let (Some(ap), Some(bp)) = (a.price_target, b.price_target) {
        if ap == bp {
            score += 0.3;
            reasons.push("price".to_string());
        } else {
            let diff_pct = (ap - bp).unsigned_abs() as f64 / ap as f64;
            if diff_pct < 0.01 {
                score += 0.2;
                reasons.push("price".to_string());
            } else {
                return MatchResult { score: 0.0, reasons: vec!["price mismatch".into()] };
            }
        }
    }

    if let (Some(ad), Some(bd)) = (&a.direction, &b.direction) {
        if ad == bd {
            score += 0.2;
            reasons.push("direction".to_string());
        } else {
            return MatchResult { score: 0.0, reasons: vec!["direction mismatch".into()] };
        }
    }

    let is_15m = matches!(a.event_type, Some(EventType::Directional15m))
        || matches!(b.event_type, Some(EventType::Directional15m));

    if let (Some(ad), Some(bd)) = (a.date, b.date) {
        if is_15m {
            let diff_secs = (ad - bd).num_seconds().abs();
            if diff_secs <= 300 {
                score += 0.3;
                reasons.push("time".to_string());
            } else {
                return MatchResult { score: 0.0, reasons: vec!["time mismatch".into()] };
            }
        } else if ad.date_naive() == bd.date_naive() {
            score += 0.2;
            reasons.push("date".to_string());
        } else {
            return MatchResult { score: 0.0, reasons: vec!["date mismatch".into()] };
        }
    }

    if let (Some(at), Some(bt)) = (&a.event_type, &b.event_type) {
        if event_type_eq(at, bt) {
            score += 0.1;
            reasons.push("type".to_string());
        }
    }

    if reasons.is_empty() {
        return MatchResult { score: 0.0, reasons: vec!["no matching components".into()] };
    }

    if is_15m {
        let have: HashSet<&str> = reasons.iter().map(|s| s.as_str()).collect();
        let required = ["asset", "time", "type"];
        if required.iter().any(|r| !have.contains(r)) {
            return MatchResult { score: 0.0, reasons: vec!["missing for 15m".into()] };
        }
        score = (score + 0.2).min(1.0);
    } else if matches!(a.event_type, Some(EventType::CryptoPrice)) {
        let have: HashSet<&str> = reasons.iter().map(|s| s.as_str()).collect();
        let required = ["asset", "price", "direction", "date"];
        if required.iter().any(|r| !have.contains(r)) {
            return MatchResult { score: 0.0, reasons: vec!["missing for crypto_price".into()] };
        }
    }

    MatchResult { score, reasons }
}

fn event_type_eq(a: &EventType, b: &EventType) -> bool {
    match (a, b) {
        (EventType::Directional15m, EventType::Directional15m) => true,
        (EventType::CryptoPrice, EventType::CryptoPrice) => true,
        (EventType::Other(x), EventType::Other(y)) => x == y,
        _ => false,
    }
}

/// A pair of markets recognized as describing the same event.
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub market_a_id: String,
    pub market_b_id: String,
    pub confidence: f64,
}

/// Matches every market in `a` against every market in `b`, keeping pairs
/// scoring at or above `min_confidence` (minus a floating-point epsilon).
/// Order-independent: results depend only on the entity content, not the
/// order markets were supplied in.
pub fn match_markets(
    a: &[(String, MarketEntity)],
    b: &[(String, MarketEntity)],
    min_confidence: f64,
) -> Vec<MatchedPair> {
    let mut matches = Vec::new();
    for (id_a, ent_a) in a {
        for (id_b, ent_b) in b {
            let result = calculate_match_score(ent_a, ent_b);
            if result.score >= min_confidence - 0.001 {
                matches.push(MatchedPair {
                    market_a_id: id_a.clone(),
                    market_b_id: id_b.clone(),
                    confidence: result.score,
                });
            }
        }
    }
    matches.sort_by(|x, y| y.confidence.partial_cmp(&x.confidence).unwrap());
    matches
}

pub fn default_min_confidence() -> f64 {
    MIN_CONFIDENCE
}
