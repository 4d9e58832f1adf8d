//! Site and current-entity info
//!
//! The info is not fetched. It is received once, either through
//! `receiveSiteInfo` or by the resolver from [`SiteBootstrap`] data, and
//! every selector below reads from it.

use crate::config::SiteBootstrap;
use crate::validation::{id_segment, is_truthy};
use reqwest::Url;
use serde_json::{Map, Value, json};
use sitekit_data_core::error::require;
use sitekit_data_core::routine::{Step, select_then, sequence};
use sitekit_data_core::{Action, Routine, State, StoreError, StoreFragment};

/// Stores the site info
pub const RECEIVE_SITE_INFO: &str = "RECEIVE_SITE_INFO";

const SITE_INFO_KEYS: [&str; 11] = [
    "adminURL",
    "ampMode",
    "currentEntityID",
    "currentEntityTitle",
    "currentEntityType",
    "currentEntityURL",
    "homeURL",
    "referenceSiteURL",
    "siteName",
    "timezone",
    "usingProxy",
];

/// Selectors that read a single member of the site info
const PROPERTY_SELECTORS: [(&str, &str); 10] = [
    ("getAMPMode", "ampMode"),
    ("getCurrentEntityID", "currentEntityID"),
    ("getCurrentEntityTitle", "currentEntityTitle"),
    ("getCurrentEntityType", "currentEntityType"),
    ("getCurrentEntityURL", "currentEntityURL"),
    ("getHomeURL", "homeURL"),
    ("getReferenceSiteURL", "referenceSiteURL"),
    ("getSiteName", "siteName"),
    ("getTimezone", "timezone"),
    ("isUsingProxy", "usingProxy"),
];

/// Selectors computed from the site info
const DERIVED_SELECTORS: [&str; 5] = [
    "getAdminURL",
    "getCurrentReferenceURL",
    "isAMP",
    "isPrimaryAMP",
    "isSecondaryAMP",
];

fn receive_site_info(args: &[Value]) -> Result<Action, StoreError> {
    let site_info = args.first().cloned().unwrap_or(Value::Null);
    require(is_truthy(&site_info), "siteInfo is required.")?;

    Ok(Action::new(RECEIVE_SITE_INFO, json!({ "siteInfo": site_info })))
}

/// Leading integer of `value`, the way entity IDs arrive as strings
fn parse_entity_id(value: &Value) -> Value {
    match value {
        Value::Number(n) => n.as_i64().map_or(Value::Null, Value::from),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits.bytes().take_while(u8::is_ascii_digit).count();
            digits[..end]
                .parse::<i64>()
                .map_or(Value::Null, |id| Value::from(sign * id))
        },
        _ => Value::Null,
    }
}

fn reduce_site_info(mut state: State, action: &Action) -> State {
    if action.kind != RECEIVE_SITE_INFO {
        return state;
    }

    let received = action.payload_field("siteInfo");
    let mut site_info: Map<String, Value> = SITE_INFO_KEYS
        .iter()
        .map(|key| {
            let value = received.and_then(|info| info.get(key)).cloned().unwrap_or(Value::Null);
            ((*key).to_string(), value)
        })
        .collect();
    let entity_id = parse_entity_id(site_info.get("currentEntityID").unwrap_or(&Value::Null));
    site_info.insert("currentEntityID".to_string(), entity_id);

    state.insert("siteInfo".to_string(), Value::Object(site_info));
    state
}

/// The site info, or `None` while it has not been received
fn site_info(state: &State) -> Option<&Map<String, Value>> {
    state.get("siteInfo").and_then(Value::as_object)
}

fn property(state: &State, key: &str) -> Value {
    site_info(state)
        .and_then(|info| info.get(key))
        .cloned()
        .unwrap_or(Value::Null)
}

/// `getAdminURL(page, args)`.
///
/// Without a page this is the plain admin URL. A bare page name targets
/// `admin.php?page=<page>`; a full `file.php?page=<page>` keeps its file
/// and must carry a `page` parameter, or the plain admin URL is returned.
/// Extra `args` are appended after `page`, which they cannot override.
fn admin_url(state: &State, args: &[Value]) -> Value {
    let Some(admin_url) = site_info(state).and_then(|info| info.get("adminURL")).and_then(Value::as_str) else {
        return Value::Null;
    };
    let Some(page) = args.first().and_then(Value::as_str) else {
        return Value::String(admin_url.to_string());
    };

    let base = if admin_url.ends_with('/') {
        admin_url.to_string()
    } else {
        format!("{admin_url}/")
    };

    let (php_file, page_arg) = if page.contains(".php?") {
        let php_file = page.split('?').next().unwrap_or_default();
        let query = page.rsplit('?').next().unwrap_or_default();
        let page_arg = Url::parse(&format!("http://localhost/?{query}"))
            .ok()
            .and_then(|url| url.query_pairs().find(|(key, _)| key == "page").map(|(_, value)| value.into_owned()))
            .filter(|page_arg| !page_arg.is_empty());
        match page_arg {
            Some(page_arg) => (php_file.to_string(), page_arg),
            None => return Value::String(admin_url.to_string()),
        }
    } else {
        ("admin.php".to_string(), page.to_string())
    };

    let Ok(mut url) = Url::parse(&format!("{base}{php_file}")) else {
        return Value::String(admin_url.to_string());
    };
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("page", &page_arg);
        if let Some(extra) = args.get(1).and_then(Value::as_object) {
            for (key, value) in extra.iter().filter(|(key, _)| key.as_str() != "page") {
                query.append_pair(key, &id_segment(value));
            }
        }
    }

    Value::String(url.into())
}

fn amp_mode_is(state: &State, check: impl Fn(&Value) -> bool) -> Value {
    site_info(state).map_or(Value::Null, |info| {
        Value::Bool(check(info.get("ampMode").unwrap_or(&Value::Null)))
    })
}

fn derived(selector: &str, state: &State, args: &[Value]) -> Value {
    match selector {
        "getAdminURL" => admin_url(state, args),
        "getCurrentReferenceURL" => site_info(state).map_or(Value::Null, |info| {
            match info.get("currentEntityURL") {
                Some(url) if !url.is_null() => url.clone(),
                _ => info.get("referenceSiteURL").cloned().unwrap_or(Value::Null),
            }
        }),
        "isAMP" => amp_mode_is(state, is_truthy),
        "isPrimaryAMP" => amp_mode_is(state, |mode| mode == "primary"),
        "isSecondaryAMP" => amp_mode_is(state, |mode| mode == "secondary"),
        _ => Value::Null,
    }
}

/// Receive the bootstrap info unless some info is already in state
fn resolve_site_info(bootstrap: Option<Value>) -> Box<dyn Routine> {
    select_then("getSiteInfo", vec![], move |existing| {
        if !existing.is_null() {
            return None;
        }

        let Some(info) = bootstrap else {
            tracing::error!("Could not load core/site info.");
            return None;
        };
        match receive_site_info(&[info]) {
            Ok(action) => Some(sequence(vec![Step::Yield(action)])),
            Err(error) => {
                tracing::error!(%error, "Could not load core/site info.");
                None
            },
        }
    })
}

/// `receiveSiteInfo(siteInfo)`, `getSiteInfo()` and the selectors built on it.
///
/// Every selector resolves through the same bootstrap loader, so reading any
/// of them loads the info.
pub(super) fn fragment(bootstrap: &SiteBootstrap) -> StoreFragment {
    let info = bootstrap.site_info();

    let mut fragment = StoreFragment::new()
        .with_initial_state("siteInfo", Value::Null)
        .with_action("receiveSiteInfo", receive_site_info)
        .with_reducer(reduce_site_info)
        .with_selector("getSiteInfo", |state, _| property_map(state));

    let selectors = std::iter::once("getSiteInfo")
        .chain(PROPERTY_SELECTORS.iter().map(|(selector, _)| *selector))
        .chain(DERIVED_SELECTORS);
    for selector in selectors {
        let info = info.clone();
        fragment = fragment.with_resolver(selector, move |_| resolve_site_info(info.clone()));
    }

    for (selector, key) in PROPERTY_SELECTORS {
        fragment = fragment.with_selector(selector, move |state, _| property(state, key));
    }
    for selector in DERIVED_SELECTORS {
        fragment = fragment.with_selector(selector, move |state, args| derived(selector, state, args));
    }

    fragment
}

fn property_map(state: &State) -> Value {
    site_info(state).map_or(Value::Null, |info| Value::Object(info.clone()))
}
