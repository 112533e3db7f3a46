//! `SubscriptionPlanner`: template topics → the minimal set of MQTT
//! wildcard subscriptions that cover them.
//!
//! The bridge's subscription wildcard syntax (`+`) is distinct from the
//! `{name}` template syntax used for matching: the broker routes messages
//! to the client using `+`, the trie then binds concrete values using
//! `{name}`.

use std::collections::BTreeSet;

use crate::path::{Segment, TemplatePath};

/// Compute the minimal set of MQTT `SUBSCRIBE` topics covering the given
/// template topics, replacing every dynamic segment with a single-level
/// `+` wildcard and de-duplicating the results.
pub fn plan_subscriptions<'a>(templates: impl IntoIterator<Item = &'a TemplatePath>) -> BTreeSet<String> {
    templates.into_iter().map(to_wildcard_topic).collect()
}

fn to_wildcard_topic(template: &TemplatePath) -> String {
    template
        .segments
        .iter()
        .map(|s| match s {
            Segment::Static(literal) => literal.as_str(),
            Segment::Dynamic { .. } => "+",
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(s: &str) -> TemplatePath {
        TemplatePath::parse(s).unwrap()
    }

    #[test]
    fn replaces_dynamic_segments_with_plus() {
        let templates = vec![tp("wlan-pi/d1/api/v1/iface/{name}/stats/get")];
        let subs = plan_subscriptions(&templates);
        assert_eq!(
            subs.into_iter().collect::<Vec<_>>(),
            vec!["wlan-pi/d1/api/v1/iface/+/stats/get".to_string()]
        );
    }

    #[test]
    fn deduplicates_identical_wildcard_forms() {
        let templates = vec![
            tp("wlan-pi/d1/api/v1/iface/{a}/stats/get"),
            tp("wlan-pi/d1/api/v1/iface/{b}/stats/get"),
        ];
        let subs = plan_subscriptions(&templates);
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn output_size_never_exceeds_input_size() {
        let templates = vec![
            tp("a/b/get"),
            tp("a/{x}/get"),
            tp("a/b/{y}/get"),
        ];
        let subs = plan_subscriptions(&templates);
        assert!(subs.len() <= templates.len());
    }

    #[test]
    fn static_templates_pass_through_unchanged() {
        let templates = vec![tp("wlan-pi/d1/api/v1/health/get")];
        let subs = plan_subscriptions(&templates);
        assert_eq!(
            subs.into_iter().next().unwrap(),
            "wlan-pi/d1/api/v1/health/get"
        );
    }
}
