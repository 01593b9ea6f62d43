//! Routes an incoming request to a dataset and USM/variation context by
//! specificity: the most specific matching rule wins.
//!
//! Grounded on the teacher's `v3::engine::EngineCache` lookup pattern (a
//! small `Vec` scanned linearly, since fleets hold at most a few dozen
//! routing rules - a `HashMap` would just add hashing overhead for no
//! benefit at this scale) and the general shape of `handler::traits`'
//! request-context dispatch.

use std::net::IpAddr;

/// One routing rule. Every field is optional; the rule matches a request
/// when every `Some` field equals the corresponding request attribute.
/// `None` fields are wildcards.
#[derive(Debug, Clone, Default)]
pub struct RoutingRule {
    pub community: Option<String>,
    pub context: Option<String>,
    pub engine_id: Option<Vec<u8>>,
    pub source_ip: Option<IpAddr>,
    pub dest_port: Option<u16>,
    /// Name of the dataset this rule routes to (`None` = default dataset).
    pub dataset: Option<String>,
}

/// Match specificity tier, most specific first. Used only to sort rules at
/// construction time; ties keep their original (insertion) order since the
/// sort below is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    EngineIdAndContext,
    Context,
    Community,
    Endpoint,
    Default,
}

fn tier_of(rule: &RoutingRule) -> Tier {
    if rule.engine_id.is_some() && rule.context.is_some() {
        Tier::EngineIdAndContext
    } else if rule.context.is_some() {
        Tier::Context
    } else if rule.community.is_some() {
        Tier::Community
    } else if rule.source_ip.is_some() || rule.dest_port.is_some() {
        Tier::Endpoint
    } else {
        Tier::Default
    }
}

/// Attributes of an incoming request used to select a routing rule.
#[derive(Debug, Clone, Default)]
pub struct RouteKey<'a> {
    pub community: Option<&'a str>,
    pub context: Option<&'a str>,
    pub engine_id: Option<&'a [u8]>,
    pub source_ip: Option<IpAddr>,
    pub dest_port: Option<u16>,
}

/// A pre-sorted, immutable list of routing rules.
#[derive(Debug, Clone, Default)]
pub struct Router {
    rules: Vec<RoutingRule>,
}

impl Router {
    /// Build a router from unsorted rules, pre-sorting by specificity tier.
    /// Stable sort preserves insertion order within a tier, so ties break by
    /// whichever rule was declared first.
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        let mut rules = rules;
        rules.sort_by_key(tier_of);
        Self { rules }
    }

    /// Find the first (most specific) rule that matches `key`.
    pub fn select(&self, key: &RouteKey<'_>) -> Option<&RoutingRule> {
        self.rules.iter().find(|rule| matches(rule, key))
    }
}

fn matches(rule: &RoutingRule, key: &RouteKey<'_>) -> bool {
    if let Some(ref c) = rule.community {
        if key.community != Some(c.as_str()) {
            return false;
        }
    }
    if let Some(ref c) = rule.context {
        if key.context != Some(c.as_str()) {
            return false;
        }
    }
    if let Some(ref e) = rule.engine_id {
        if key.engine_id != Some(e.as_slice()) {
            return false;
        }
    }
    if let Some(ip) = rule.source_ip {
        if key.source_ip != Some(ip) {
            return false;
        }
    }
    if let Some(port) = rule.dest_port {
        if key.dest_port != Some(port) {
            return false;
        }
    }
    true
}
