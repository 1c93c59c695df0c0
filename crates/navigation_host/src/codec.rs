//! URL encodings for pane navigation state.
//!
//! Two formats are supported:
//! - query: `<base>?pane=<activePane>&data=<percent-encoded JSON panes>`
//! - hash: `#/<activePane>?data=<percent-encoded JSON panes>`
//!
//! Only the current route travels through a URL. States recovered from a URL always carry a
//! single-entry history.

use serde::Deserialize;
use thiserror::Error;

use crate::model::{ActivePane, NavigationRoute, NavigationState, PaneParams};

const PANE_PARAM: &str = "pane";
const DATA_PARAM: &str = "data";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Reasons a URL does not carry a usable navigation state.
pub enum UrlStateError {
    /// No pane parameter or hash path segment.
    #[error("missing active pane")]
    MissingPane,
    /// The pane token is not one of the four pane slots.
    #[error("unknown pane `{0}`")]
    UnknownPane(String),
    /// No `data` parameter.
    #[error("missing data parameter")]
    MissingData,
    /// `data` parameter present but empty.
    #[error("empty data parameter")]
    EmptyData,
    /// `data` is not valid percent-encoded UTF-8.
    #[error("invalid percent-encoding in data parameter")]
    InvalidEncoding,
    /// `data` does not decode into the pane parameter shape.
    #[error("invalid pane data: {0}")]
    InvalidJson(String),
    /// Pane parameters could not be serialized.
    #[error("pane data serialization failed: {0}")]
    Serialize(String),
}

fn encode_panes<P: PaneParams>(panes: &P) -> Result<String, UrlStateError> {
    let json = serde_json::to_string(panes).map_err(|e| UrlStateError::Serialize(e.to_string()))?;
    Ok(urlencoding::encode(&json).into_owned())
}

/// Builds the query-string URL for `route` under `base_path`.
///
/// # Errors
///
/// Returns [`UrlStateError::Serialize`] when the pane parameters cannot be serialized.
pub fn encode_query_url<P: PaneParams>(
    base_path: &str,
    route: &NavigationRoute<P>,
) -> Result<String, UrlStateError> {
    Ok(format!(
        "{base_path}?{PANE_PARAM}={}&{DATA_PARAM}={}",
        route.active_pane.token(),
        encode_panes(&route.panes)?
    ))
}

/// Builds the hash fragment (including `#`) for `route`.
///
/// # Errors
///
/// Returns [`UrlStateError::Serialize`] when the pane parameters cannot be serialized.
pub fn encode_hash<P: PaneParams>(route: &NavigationRoute<P>) -> Result<String, UrlStateError> {
    Ok(format!(
        "#/{}?{DATA_PARAM}={}",
        route.active_pane.token(),
        encode_panes(&route.panes)?
    ))
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| match pair.split_once('=') {
            Some((key, value)) => Some((key, value)),
            None if !pair.is_empty() => Some((pair, "")),
            None => None,
        })
        .find_map(|(key, value)| (key == name).then_some(value))
}

fn parse_pane(token: &str) -> Result<ActivePane, UrlStateError> {
    if token.is_empty() {
        return Err(UrlStateError::MissingPane);
    }
    ActivePane::from_token(token).ok_or_else(|| UrlStateError::UnknownPane(token.to_string()))
}

fn decode_panes<P: PaneParams>(raw: Option<&str>) -> Result<P, UrlStateError> {
    let raw = raw.ok_or(UrlStateError::MissingData)?;
    if raw.is_empty() {
        return Err(UrlStateError::EmptyData);
    }
    let spaced = raw.replace('+', " ");
    let json = urlencoding::decode(&spaced).map_err(|_| UrlStateError::InvalidEncoding)?;
    serde_json::from_str(&json).map_err(|e| UrlStateError::InvalidJson(e.to_string()))
}

/// Parses a query string (leading `?` optional) into the active pane and pane parameters.
///
/// # Errors
///
/// Returns the first [`UrlStateError`] found; nothing is partially populated.
pub fn decode_query<P: PaneParams>(search: &str) -> Result<(ActivePane, P), UrlStateError> {
    let query = search.strip_prefix('?').unwrap_or(search);
    let pane = parse_pane(query_param(query, PANE_PARAM).ok_or(UrlStateError::MissingPane)?)?;
    let panes = decode_panes(query_param(query, DATA_PARAM))?;
    Ok((pane, panes))
}

/// Parses a hash fragment (leading `#` optional) into the active pane and pane parameters.
///
/// # Errors
///
/// Returns the first [`UrlStateError`] found; nothing is partially populated.
pub fn decode_hash<P: PaneParams>(hash: &str) -> Result<(ActivePane, P), UrlStateError> {
    let fragment = hash.strip_prefix('#').unwrap_or(hash);
    let fragment = fragment.strip_prefix('/').unwrap_or(fragment);
    let (segment, query) = match fragment.split_once('?') {
        Some((segment, query)) => (segment, Some(query)),
        None => (fragment, None),
    };
    let pane = parse_pane(segment)?;
    let panes = decode_panes(query.and_then(|query| query_param(query, DATA_PARAM)))?;
    Ok((pane, panes))
}

/// Recovers a navigation state from a query string, or `None` when it carries none.
pub fn state_from_query<P: PaneParams>(search: &str) -> Option<NavigationState<P>> {
    decode_query(search)
        .ok()
        .map(|(pane, panes)| NavigationState::from_url_route(pane, panes))
}

/// Recovers a navigation state from a hash fragment, or `None` when it carries none.
pub fn state_from_hash<P: PaneParams>(hash: &str) -> Option<NavigationState<P>> {
    decode_hash(hash)
        .ok()
        .map(|(pane, panes)| NavigationState::from_url_route(pane, panes))
}

/// Reads a navigation state stored as a history state object, or `None` when it is not one.
pub fn state_from_value<P: PaneParams>(value: &serde_json::Value) -> Option<NavigationState<P>> {
    NavigationState::deserialize(value).ok()
}

/// Serializes a navigation state into a history state object.
///
/// # Errors
///
/// Returns [`UrlStateError::Serialize`] when the pane parameters cannot be serialized.
pub fn state_to_value<P: PaneParams>(
    state: &NavigationState<P>,
) -> Result<serde_json::Value, UrlStateError> {
    serde_json::to_value(state).map_err(|e| UrlStateError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::fixtures::*;

    #[test]
    fn query_url_round_trips_route() {
        let route = NavigationRoute::new(3, ActivePane::Detail, panes("sent & archived", Some("42")));
        let url = encode_query_url("/mail", &route).expect("encode");
        assert!(url.starts_with("/mail?pane=detail&data=%7B"));

        let search = url.split_once('?').expect("query").1;
        let state: NavigationState<MailPanes> = state_from_query(search).expect("state");
        assert_eq!(state.route.active_pane, ActivePane::Detail);
        assert_eq!(state.route.panes, route.panes);
        assert_eq!(state.route.index, 0);
        assert_eq!(state.history, vec![state.route.clone()]);
    }

    #[test]
    fn hash_round_trips_route() {
        let route = NavigationRoute::new(0, ActivePane::Tail, panes("inbox", None));
        let hash = encode_hash(&route).expect("encode");
        assert!(hash.starts_with("#/tail?data="));

        let (pane, decoded) = decode_hash::<MailPanes>(&hash).expect("decode");
        assert_eq!(pane, ActivePane::Tail);
        assert_eq!(decoded, route.panes);
    }

    #[test]
    fn decodes_encode_uri_component_output() {
        let search = "?pane=list&data=%7B%22rail%22%3A%7B%7D%2C%22list%22%3A%7B%22folder%22%3A%22a(b)!%22%7D%2C%22detail%22%3A%7B%22user_id%22%3Anull%7D%2C%22tail%22%3A%7B%7D%7D";
        let (pane, decoded) = decode_query::<MailPanes>(search).expect("decode");
        assert_eq!(pane, ActivePane::List);
        assert_eq!(decoded.list.folder, "a(b)!");
    }

    #[test]
    fn query_failures_resolve_to_none() {
        let data = encode_panes(&panes("inbox", None)).expect("encode");
        assert_eq!(
            decode_query::<MailPanes>(&format!("?data={data}")),
            Err(UrlStateError::MissingPane)
        );
        assert_eq!(
            decode_query::<MailPanes>("?pane=list"),
            Err(UrlStateError::MissingData)
        );
        assert_eq!(
            decode_query::<MailPanes>("?pane=list&data="),
            Err(UrlStateError::EmptyData)
        );
        assert!(matches!(
            decode_query::<MailPanes>("?pane=list&data=%7Bnot-json"),
            Err(UrlStateError::InvalidJson(_))
        ));
        assert_eq!(
            decode_query::<MailPanes>(&format!("?pane=home&data={data}")),
            Err(UrlStateError::UnknownPane("home".to_string()))
        );
        assert!(state_from_query::<MailPanes>("").is_none());
    }

    #[test]
    fn hash_failures_resolve_to_none() {
        let data = encode_panes(&panes("inbox", None)).expect("encode");
        assert!(state_from_hash::<MailPanes>("").is_none());
        assert!(state_from_hash::<MailPanes>("#").is_none());
        assert!(state_from_hash::<MailPanes>("#/list?data=").is_none());
        assert!(state_from_hash::<MailPanes>("#/list?data=%7B%22rail").is_none());
        assert!(state_from_hash::<MailPanes>(&format!("#/?data={data}")).is_none());
        assert!(state_from_hash::<MailPanes>("#/list").is_none());
        assert!(state_from_hash::<MailPanes>(&format!("#/list?data={data}")).is_some());
    }

    #[test]
    fn ignores_unrelated_query_parameters() {
        let data = encode_panes(&panes("inbox", None)).expect("encode");
        let search = format!("?utm=x&flag&pane=rail&data={data}&z=1");
        let (pane, _) = decode_query::<MailPanes>(&search).expect("decode");
        assert_eq!(pane, ActivePane::Rail);
    }
}
