//! Field selection rules.
//!
//! A rule is `keep <pattern>` or `drop <pattern>`, where the pattern is a glob
//! over field names (`*` matches any run of characters, `?` exactly one).
//! Rules are evaluated in order and the last one that matches decides; a name
//! no rule matches is dropped.
use regex::Regex;

use crate::error::{Error, Result};
use crate::record::FieldDescriptor;

#[derive(Debug, Clone)]
struct Rule {
    keep: bool,
    pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct SelectionRules {
    rules: Vec<Rule>,
    keep_unmatched: bool,
}

impl SelectionRules {
    pub fn parse<S: AsRef<str>>(rules: &[S]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|r| Self::parse_rule(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules, keep_unmatched: false })
    }

    /// Rules that keep every field.
    pub fn keep_all() -> Self {
        Self { rules: Vec::new(), keep_unmatched: true }
    }

    fn parse_rule(rule: &str) -> Result<Rule> {
        let mut parts = rule.split_whitespace();
        let (Some(action), Some(pattern), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::InvalidSelectionRule(rule.to_string()));
        };
        let keep = match action {
            "keep" => true,
            "drop" => false,
            _ => return Err(Error::InvalidSelectionRule(rule.to_string())),
        };
        let pattern =
            glob_to_regex(pattern).map_err(|_| Error::InvalidSelectionRule(rule.to_string()))?;
        Ok(Rule { keep, pattern })
    }

    pub fn selects(&self, name: &str) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|r| r.pattern.is_match(name))
            .map_or(self.keep_unmatched, |r| r.keep)
    }

    pub fn filter_schema(&self, schema: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
        schema.into_iter().filter(|d| self.selects(&d.name)).collect()
    }
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self::keep_all()
    }
}

fn glob_to_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }
    re.push('$');
    Regex::new(&re)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldId, FieldScope};

    #[test]
    fn last_matching_rule_wins() {
        let rules =
            SelectionRules::parse(&["keep *", "drop *Digis*", "keep ecalDigis_barrel"]).unwrap();
        assert!(rules.selects("recoTracks"));
        assert!(!rules.selects("hcalDigis"));
        assert!(rules.selects("ecalDigis_barrel"));
    }

    #[test]
    fn unmatched_names_are_dropped() {
        let rules = SelectionRules::parse(&["keep muon?"]).unwrap();
        assert!(rules.selects("muon1"));
        assert!(!rules.selects("muon12"));
        assert!(!rules.selects("electrons"));
    }

    #[test]
    fn glob_escapes_regex_metacharacters() {
        let rules = SelectionRules::parse(&["keep a.b+c"]).unwrap();
        assert!(rules.selects("a.b+c"));
        assert!(!rules.selects("aXbbc"));
    }

    #[test]
    fn keep_all_selects_everything() {
        let rules = SelectionRules::keep_all();
        assert!(rules.selects("anything"));
        assert!(rules.selects(""));
    }

    #[test]
    fn malformed_rules_are_rejected() {
        for bad in ["keep", "retain *", "keep a b", ""] {
            let err = SelectionRules::parse(&[bad]).err();
            assert!(matches!(err, Some(Error::InvalidSelectionRule(_))), "{bad:?}");
        }
    }

    #[test]
    fn filter_schema_keeps_order() {
        let d = |id, name: &str| FieldDescriptor {
            id: FieldId(id),
            name: name.into(),
            scope: FieldScope::Record,
        };
        let rules = SelectionRules::parse(&["keep *", "drop b*"]).unwrap();
        let out = rules.filter_schema(vec![d(3, "a"), d(1, "bx"), d(2, "c")]);
        assert_eq!(out.iter().map(|d| d.id.0).collect::<Vec<_>>(), vec![3, 2]);
    }
}
