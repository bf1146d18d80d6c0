use hqos_wire::Dscp;

/// Every rule covers this many consecutive destination ports, starting at its first port.
pub const PORT_RANGE_WIDTH: u32 = 100;

/// Marks UDP traffic towards `[port_range_start, port_range_start + 100)` with `dscp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkingRule {
    port_range_start: u16,
    dscp: Dscp,
}

impl MarkingRule {
    pub const fn new(port_range_start: u16, dscp: Dscp) -> Self {
        Self { port_range_start, dscp }
    }

    #[inline]
    pub const fn port_range_start(&self) -> u16 {
        self.port_range_start
    }

    #[inline]
    pub const fn dscp(&self) -> Dscp {
        self.dscp
    }

    /// Whether `port` falls in this rule's range. Ranges near the top of the port space are
    /// clipped at 65535.
    #[inline]
    pub const fn matches(&self, port: u16) -> bool {
        let start = self.port_range_start as u32;
        let port = port as u32;
        port >= start && port < start + PORT_RANGE_WIDTH
    }
}

/// An ordered rule table. Lookups scan in insertion order and the first match wins, so
/// overlapping ranges resolve to whichever rule was added first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkingRules(Vec<MarkingRule>);

impl Default for MarkingRules {
    /// Port 8080 → EF, port 8081 → DSCP 4.
    fn default() -> Self {
        Self(vec![MarkingRule::new(8080, Dscp::EF), MarkingRule::new(8081, Dscp::from_bits(4))])
    }
}

impl MarkingRules {
    /// An empty table: every item gets the default class.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn with_rule(mut self, port_range_start: u16, dscp: Dscp) -> Self {
        self.push(MarkingRule::new(port_range_start, dscp));
        self
    }

    pub fn push(&mut self, rule: MarkingRule) {
        self.0.push(rule);
    }

    /// The first rule whose range contains `port`.
    pub fn lookup(&self, port: u16) -> Option<&MarkingRule> {
        self.0.iter().find(|rule| rule.matches(port))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkingRule> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<MarkingRule> for MarkingRules {
    fn from_iter<I: IntoIterator<Item = MarkingRule>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<MarkingRule>> for MarkingRules {
    fn from(rules: Vec<MarkingRule>) -> Self {
        Self(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_range() {
        let rule = MarkingRule::new(8080, Dscp::EF);

        assert!(!rule.matches(8079));
        assert!(rule.matches(8080));
        assert!(rule.matches(8179));
        assert!(!rule.matches(8180));

        let top = MarkingRule::new(65_500, Dscp::CS1);
        assert!(top.matches(u16::MAX));
    }

    #[test]
    fn first_match_wins() {
        let rules = MarkingRules::empty().with_rule(8080, Dscp::EF).with_rule(8081, Dscp::CS1);

        // 8081 is in both ranges; the earlier rule takes it.
        assert_eq!(rules.lookup(8081).unwrap().dscp(), Dscp::EF);
        assert_eq!(rules.lookup(8180).unwrap().dscp(), Dscp::CS1);
        assert!(rules.lookup(8181).is_none());
    }
}
