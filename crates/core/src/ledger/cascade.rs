use std::collections::BTreeMap;

use crate::domain::TrackedField;

/// A secondary ledger update triggered by a committed update to another field.
pub trait CascadeRule: Send + Sync {
    /// Field whose updates trigger this rule.
    fn trigger(&self) -> TrackedField;

    /// Derived `(field, value)` that receives the same delta, if any.
    fn derive(&self, value: &str) -> Option<(TrackedField, String)>;
}

/// Static `email -> nick` derivation table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyMap {
    nicks: BTreeMap<String, String>,
}

impl FamilyMap {
    pub fn from_pairs<I, E, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (E, N)>,
        E: Into<String>,
        N: Into<String>,
    {
        Self {
            nicks: pairs
                .into_iter()
                .map(|(e, n)| (e.into(), n.into()))
                .collect(),
        }
    }

    pub fn lookup(&self, email: &str) -> Option<&str> {
        self.nicks.get(email).map(String::as_str)
    }

    /// Nick stored on a record: the family nick, else the e-mail local part.
    pub fn nick_for(&self, email: &str) -> String {
        match self.lookup(email) {
            Some(nick) => nick.to_string(),
            None => email.split('@').next().unwrap_or_default().to_string(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nicks.iter().map(|(e, n)| (e.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.nicks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nicks.is_empty()
    }
}

/// Keeps `nick` counters in step with `email` counters for family members.
pub struct NickFromEmail {
    family: FamilyMap,
}

impl NickFromEmail {
    pub fn new(family: FamilyMap) -> Self {
        Self { family }
    }
}

impl CascadeRule for NickFromEmail {
    fn trigger(&self) -> TrackedField {
        TrackedField::Email
    }

    fn derive(&self, value: &str) -> Option<(TrackedField, String)> {
        self.family
            .lookup(value)
            .map(|nick| (TrackedField::Nick, nick.to_string()))
    }
}

/// Rules installed by default for a given family map.
pub fn default_rules(family: FamilyMap) -> Vec<Box<dyn CascadeRule>> {
    vec![Box::new(NickFromEmail::new(family))]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> FamilyMap {
        FamilyMap::from_pairs([("ana.devic@example.com", "ana")])
    }

    #[test]
    fn test_nick_from_email_derives_mapped() {
        let rule = NickFromEmail::new(family());
        assert_eq!(rule.trigger(), TrackedField::Email);
        assert_eq!(
            rule.derive("ana.devic@example.com"),
            Some((TrackedField::Nick, "ana".to_string()))
        );
    }

    #[test]
    fn test_nick_from_email_ignores_unmapped() {
        let rule = NickFromEmail::new(family());
        assert_eq!(rule.derive("stranger@example.com"), None);
    }

    #[test]
    fn test_nick_for_falls_back_to_local_part() {
        let family = family();
        assert_eq!(family.nick_for("ana.devic@example.com"), "ana");
        assert_eq!(family.nick_for("stranger@example.com"), "stranger");
        assert_eq!(family.nick_for(""), "");
    }
}
