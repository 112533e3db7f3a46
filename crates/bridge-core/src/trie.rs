//! `RouteTrie`: a trie over path segments, static-preferred longest match.

use std::collections::HashMap;

use tracing::debug;

use crate::path::{Segment, TemplatePath};
use crate::route::{Binding, Route};

/// One node of the trie. Static children are keyed by their literal
/// segment; dynamic children are an ordered list so that declaration
/// order breaks ties among them.
#[derive(Debug, Default)]
struct TrieNode {
    static_children: HashMap<String, TrieNode>,
    dynamic_children: Vec<(String, TrieNode)>,
    route: Option<Route>,
}

impl TrieNode {
    fn child_for(&mut self, segment: &Segment) -> &mut TrieNode {
        match segment {
            Segment::Static(literal) => {
                self.static_children.entry(literal.clone()).or_default()
            }
            Segment::Dynamic { placeholder, .. } => {
                if let Some(idx) = self
                    .dynamic_children
                    .iter()
                    .position(|(name, _)| name == placeholder)
                {
                    &mut self.dynamic_children[idx].1
                } else {
                    self.dynamic_children
                        .push((placeholder.clone(), TrieNode::default()));
                    &mut self.dynamic_children.last_mut().unwrap().1
                }
            }
        }
    }

    /// Recursive descent match. Returns the matched route (if any) and
    /// the bindings accumulated root-to-leaf.
    fn lookup<'a>(&'a self, remaining: &[&str]) -> Option<(&'a Route, Vec<Binding>)> {
        let Some((head, rest)) = remaining.split_first() else {
            return self.route.as_ref().map(|r| (r, Vec::new()));
        };

        if let Some(child) = self.static_children.get(*head) {
            if let Some((route, bindings)) = child.lookup(rest) {
                return Some((route, bindings));
            }
        }

        if head.is_empty() {
            return None;
        }

        for (placeholder, child) in &self.dynamic_children {
            if let Some((route, mut bindings)) = child.lookup(rest) {
                bindings.insert(0, (placeholder.clone(), (*head).to_string()));
                return Some((route, bindings));
            }
        }

        None
    }
}

/// A trie over registered [`Route`]s, keyed by their `request_topic`
/// template, supporting static-preferred longest match with binding
/// extraction.
#[derive(Debug, Default)]
pub struct RouteTrie {
    root: TrieNode,
}

impl RouteTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `route` under `template`. If the terminal node already has a
    /// route registered, the new insertion wins (last-writer semantics).
    pub fn insert(&mut self, template: &TemplatePath, route: Route) {
        let mut node = &mut self.root;
        for segment in &template.segments {
            node = node.child_for(segment);
        }
        if node.route.is_some() {
            debug!(
                request_topic = %route.request_topic,
                "replacing existing route at this template (last insertion wins)"
            );
        }
        node.route = Some(route);
    }

    /// Match `concrete_segments` against the registered templates,
    /// preferring static children over dynamic ones at every level and,
    /// among dynamic children, breaking ties by declaration order.
    ///
    /// Returns the matched route rebound with the collected bindings, and
    /// the bindings themselves, or `None` if nothing matches.
    pub fn lookup(&self, concrete_segments: &[&str]) -> Option<(Route, Vec<Binding>)> {
        let (route, bindings) = self.root.lookup(concrete_segments)?;
        Some((route.rebind(&bindings), bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::HttpMethod;

    fn route(topic: &str) -> Route {
        Route::new(topic, topic, None, HttpMethod::Get)
    }

    fn insert(trie: &mut RouteTrie, topic: &str) {
        let template = TemplatePath::parse(topic).unwrap();
        trie.insert(&template, route(topic));
    }

    fn segs(topic: &str) -> Vec<&str> {
        topic.trim_start_matches('/').split('/').collect()
    }

    #[test]
    fn static_lookup() {
        let mut trie = RouteTrie::new();
        insert(&mut trie, "wlan-pi/d1/api/v1/health/get");

        let (route, bindings) = trie.lookup(&segs("wlan-pi/d1/api/v1/health/get")).unwrap();
        assert_eq!(route.request_topic, "wlan-pi/d1/api/v1/health/get");
        assert!(bindings.is_empty());
    }

    #[test]
    fn dynamic_lookup_with_binding() {
        let mut trie = RouteTrie::new();
        insert(&mut trie, "wlan-pi/d1/api/v1/iface/{name}/stats/get");

        let (route, bindings) = trie
            .lookup(&segs("wlan-pi/d1/api/v1/iface/eth0/stats/get"))
            .unwrap();
        assert_eq!(
            route.request_topic,
            "wlan-pi/d1/api/v1/iface/eth0/stats/get"
        );
        assert_eq!(bindings, vec![("name".to_string(), "eth0".to_string())]);
    }

    #[test]
    fn static_beats_dynamic_at_same_level() {
        let mut trie = RouteTrie::new();
        insert(&mut trie, "wlan-pi/d1/api/v1/{x}/get");
        insert(&mut trie, "wlan-pi/d1/api/v1/status/get");

        let (route, bindings) = trie.lookup(&segs("wlan-pi/d1/api/v1/status/get")).unwrap();
        assert_eq!(route.request_topic, "wlan-pi/d1/api/v1/status/get");
        assert!(bindings.is_empty());

        let (route, bindings) = trie.lookup(&segs("wlan-pi/d1/api/v1/foo/get")).unwrap();
        assert_eq!(route.request_topic, "wlan-pi/d1/api/v1/foo/get");
        assert_eq!(bindings, vec![("x".to_string(), "foo".to_string())]);
    }

    #[test]
    fn unmatched_topic_is_a_miss_not_a_crash() {
        let mut trie = RouteTrie::new();
        insert(&mut trie, "wlan-pi/d1/api/v1/health/get");
        assert!(trie.lookup(&segs("wlan-pi/d1/nonsense")).is_none());
        assert!(trie.lookup(&[]).is_none());
    }

    #[test]
    fn empty_interior_segment_never_binds_to_a_dynamic_placeholder() {
        let mut trie = RouteTrie::new();
        insert(&mut trie, "wlan-pi/d1/api/v1/iface/{name}/stats/get");

        assert!(trie
            .lookup(&["wlan-pi", "d1", "api", "v1", "iface", "", "stats", "get"])
            .is_none());
    }

    #[test]
    fn last_insertion_wins_on_duplicate_template() {
        let mut trie = RouteTrie::new();
        let template = TemplatePath::parse("a/b/get").unwrap();
        trie.insert(&template, Route::new("/a/b", "a/b/get", None, HttpMethod::Get));
        trie.insert(&template, Route::new("/a/b/v2", "a/b/get", None, HttpMethod::Get));

        let (route, _) = trie.lookup(&["a", "b", "get"]).unwrap();
        assert_eq!(route.http_path, "/a/b/v2");
    }

    #[test]
    fn dynamic_children_break_ties_by_declaration_order() {
        let mut trie = RouteTrie::new();
        insert(&mut trie, "wlan-pi/d1/{first}/get");
        // A second dynamic child at the same level, different placeholder name,
        // would only be reachable if the first didn't match the whole remainder.
        // Since both are "dynamic", the first declared one wins when it can
        // complete the match.
        let (route, bindings) = trie.lookup(&segs("wlan-pi/d1/anything/get")).unwrap();
        assert_eq!(route.request_topic, "wlan-pi/d1/{first}/get");
        assert_eq!(bindings, vec![("first".to_string(), "anything".to_string())]);
    }
}
