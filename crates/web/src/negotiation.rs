//! Content negotiation between a client's `Accept` preferences and the media types
//! resources declare.
//!
//! The weight of a type that would be served comes from the most specific accept range
//! compatible with it, so `text/html;q=0, */*` refuses `text/html` and `*/*, text/html`
//! weighs `text/html` by its own range. Types whose weight is `0` are never selected.
//!
//! Selection is deterministic. Among all acceptable (candidate, produced type) pairs the
//! winner has, in order:
//!
//! 1. the highest accept weight
//! 2. the most specific accept range (`a/b` over `a/*` over `*/*`)
//! 3. the most specific produced type
//! 4. the earliest accept range
//! 5. the earliest registered candidate
//! 6. the earliest declared produced type

use std::cmp::Reverse;

use http::header::ACCEPT;
use http::HeaderMap;
use tracing::debug;

use crate::media_type::MediaType;

/// The parsed media ranges of a request, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptRanges {
    ranges: Vec<MediaType>,
}

impl Default for AcceptRanges {
    fn default() -> Self {
        Self::any()
    }
}

impl AcceptRanges {
    /// Accepts anything, as a request without `Accept` does.
    pub fn any() -> Self {
        Self { ranges: vec![MediaType::any()] }
    }

    /// Parses every `Accept` header value in order; an absent header means `*/*`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = headers.get_all(ACCEPT).iter().peekable();
        if values.peek().is_none() {
            return Self::any();
        }

        Self::parse(values.filter_map(|value| match value.to_str() {
            Ok(value) => Some(value),
            Err(_) => {
                debug!("skip non-ascii accept header");
                None
            }
        }))
    }

    /// Parses header values, skipping ranges that are not valid media types.
    pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let ranges = values
            .into_iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|range| !range.is_empty())
            .filter_map(|range| match MediaType::parse(range) {
                Ok(media_type) => Some(media_type),
                Err(e) => {
                    debug!(cause = %e, "skip unparseable accept range");
                    None
                }
            })
            .collect();
        Self { ranges }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaType> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The most specific range compatible with `media_type` and its position, the earliest
    /// one on a tie. Its weight is the weight the client gives `media_type`.
    pub fn most_specific_for(&self, media_type: &MediaType) -> Option<(usize, &MediaType)> {
        self.ranges
            .iter()
            .enumerate()
            .filter(|(_, range)| range.is_compatible(media_type))
            .min_by_key(|(order, range)| (Reverse(range.specificity()), *order))
    }
}

/// The outcome of a successful negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Index of the winning candidate
    pub candidate: usize,
    /// Index of the winning type in the candidate's produced list
    pub produced: usize,
    /// The response content type
    pub content_type: MediaType,
}

/// Picks the best produced type across `candidates`, given in registration order.
///
/// A candidate with an empty produced list produces `*/*`. Returns `None` when no
/// candidate produces anything the client accepts.
pub fn negotiate<'a, I>(accept: &AcceptRanges, candidates: I) -> Option<Selection>
where
    I: IntoIterator<Item = &'a [MediaType]>,
{
    let any = [MediaType::any()];
    let mut best: Option<(SelectionKey, Selection)> = None;

    for (candidate, produces) in candidates.into_iter().enumerate() {
        let produces = if produces.is_empty() { any.as_slice() } else { produces };

        for (produced, produced_type) in produces.iter().enumerate() {
            for range in accept.iter().filter(|range| produced_type.is_compatible(range)) {
                let content_type = response_type(produced_type, range);
                let Some((order, effective)) = accept.most_specific_for(&content_type) else {
                    continue;
                };
                if !effective.is_acceptable() {
                    continue;
                }

                let key = (
                    Reverse(effective.quality()),
                    Reverse(effective.specificity()),
                    Reverse(produced_type.specificity()),
                    order,
                    candidate,
                    produced,
                );
                if best.as_ref().is_some_and(|(best_key, _)| *best_key <= key) {
                    continue;
                }
                best = Some((key, Selection { candidate, produced, content_type }));
            }
        }
    }

    best.map(|(_, selection)| selection)
}

type SelectionKey = (Reverse<u16>, Reverse<u8>, Reverse<u8>, usize, usize, usize);

fn response_type(produced: &MediaType, range: &MediaType) -> MediaType {
    if produced.is_concrete() {
        produced.clone()
    } else if range.is_concrete() {
        MediaType::from(range.mime().clone())
    } else {
        MediaType::octet_stream()
    }
}

/// Whether a request body of `content_type` can be consumed by a resource declaring
/// `consumes`.
///
/// A request without `Content-Type` is always consumable; an empty `consumes` list
/// accepts anything. An unparseable content type is never consumable.
pub fn can_consume(consumes: &[MediaType], content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    if consumes.is_empty() {
        return true;
    }

    match MediaType::parse(content_type) {
        Ok(content_type) => consumes.iter().any(|consumed| consumed.is_compatible(&content_type)),
        Err(e) => {
            debug!(cause = %e, "unparseable request content type");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn types(value: &str) -> Vec<MediaType> {
        MediaType::parse_list(value).unwrap()
    }

    fn accept(value: &str) -> AcceptRanges {
        AcceptRanges::parse([value])
    }

    fn winner(accept_value: &str, candidates: &[Vec<MediaType>]) -> Option<(usize, String)> {
        negotiate(&accept(accept_value), candidates.iter().map(Vec::as_slice))
            .map(|selection| (selection.candidate, selection.content_type.to_string()))
    }

    #[test]
    fn images_and_json() {
        let candidates = [types("image/jpeg, image/gif, image/png"), types("application/json")];

        assert_eq!(winner("image/gif", &candidates), Some((0, "image/gif".into())));
        assert_eq!(winner("image/jpeg", &candidates), Some((0, "image/jpeg".into())));
        assert_eq!(winner("image/png", &candidates), Some((0, "image/png".into())));
        assert_eq!(winner("image/png, application/text", &candidates), Some((0, "image/png".into())));
        assert_eq!(winner("text/plain", &candidates), None);
        assert_eq!(winner("application/json", &candidates), Some((1, "application/json".into())));
    }

    #[test]
    fn negotiation_is_deterministic() {
        let candidates = [types("text/html, application/json"), types("application/json, text/html")];
        let first = winner("*/*", &candidates);
        for _ in 0..32 {
            assert_eq!(winner("*/*", &candidates), first);
        }
        assert_eq!(first, Some((0, "text/html".into())));
    }

    #[test]
    fn weight_beats_order() {
        let candidates = [types("text/html"), types("application/json")];
        assert_eq!(winner("text/html;q=0.5, application/json", &candidates), Some((1, "application/json".into())));
        assert_eq!(winner("text/html;q=0, application/json;q=0.1", &candidates), Some((1, "application/json".into())));
        assert_eq!(winner("text/html;q=0", &candidates), None);
    }

    #[test]
    fn explicit_range_beats_wildcard_of_equal_weight() {
        let candidates = [types("text/html"), types("application/json")];
        assert_eq!(winner("*/*, application/json", &candidates), Some((1, "application/json".into())));
        assert_eq!(winner("text/*, */*, text/html", &candidates), Some((0, "text/html".into())));
        assert_eq!(winner("*/*;q=0.9, application/json;q=0.5", &candidates), Some((0, "text/html".into())));
    }

    #[test]
    fn refused_type_is_not_rescued_by_wildcard() {
        assert_eq!(winner("text/html;q=0, */*", &[types("text/html")]), None);
        assert_eq!(winner("text/*;q=0, */*", &[types("text/plain")]), None);

        let candidates = [types("text/html"), types("application/json")];
        assert_eq!(winner("text/html;q=0, */*;q=0.1", &candidates), Some((1, "application/json".into())));
        assert_eq!(winner("*/*, text/plain;q=0", &[types("text/html, text/plain")]), Some((0, "text/html".into())));
    }

    #[test]
    fn most_specific_range_sets_the_weight() {
        let ranges = accept("*/*;q=0.1, text/*;q=0.5, text/html;q=0.8");
        let html: MediaType = "text/html".parse().unwrap();
        let plain: MediaType = "text/plain".parse().unwrap();
        let png: MediaType = "image/png".parse().unwrap();

        assert_eq!(ranges.most_specific_for(&html).map(|(order, range)| (order, range.quality())), Some((2, 800)));
        assert_eq!(ranges.most_specific_for(&plain).map(|(order, range)| (order, range.quality())), Some((1, 500)));
        assert_eq!(ranges.most_specific_for(&png).map(|(order, range)| (order, range.quality())), Some((0, 100)));
        assert_eq!(accept("text/html").most_specific_for(&png), None);
    }

    #[test]
    fn specific_produced_type_beats_wildcard() {
        let candidates = [types("*/*"), types("text/*"), types("text/plain")];
        assert_eq!(winner("text/plain", &candidates), Some((2, "text/plain".into())));
    }

    #[test]
    fn accept_order_breaks_ties() {
        let candidates = [types("application/json"), types("text/plain")];
        assert_eq!(winner("text/plain, application/json", &candidates), Some((1, "text/plain".into())));
    }

    #[test]
    fn wildcard_producers_use_accept_or_octet_stream() {
        let candidates = [Vec::new()];
        assert_eq!(winner("text/csv", &candidates), Some((0, "text/csv".into())));
        assert_eq!(winner("*/*", &candidates), Some((0, "application/octet-stream".into())));
        assert_eq!(winner("text/csv;q=0.4", &candidates), Some((0, "text/csv".into())));
    }

    #[test]
    fn accept_headers_concatenate() {
        let mut headers = HeaderMap::new();
        assert_eq!(AcceptRanges::from_headers(&headers), AcceptRanges::any());

        headers.append(ACCEPT, HeaderValue::from_static("text/html, bogus"));
        headers.append(ACCEPT, HeaderValue::from_static("application/json;q=0.9"));
        let ranges: Vec<String> = AcceptRanges::from_headers(&headers).iter().map(ToString::to_string).collect();
        assert_eq!(ranges, ["text/html", "application/json; q=0.9"]);
    }

    #[test]
    fn consumes() {
        let json = types("application/json");
        assert!(can_consume(&json, None));
        assert!(can_consume(&json, Some("application/json; charset=utf-8")));
        assert!(!can_consume(&json, Some("text/plain")));
        assert!(!can_consume(&json, Some("garbage")));
        assert!(can_consume(&[], Some("text/plain")));
    }
}
