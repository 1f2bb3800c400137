// The name resolution cascade.
//
// Each strategy looks at the candidate records (the records that pass the
// filter, in dataset order) and returns the index of the first one it accepts.
// Strategies are tried in order and the first hit wins.

use std::collections::HashSet;

use log::debug;

use crate::config::*;
use crate::parsing::{normalize_name, uninvert_name};
use crate::tables::Lookups;

/// Substring matching is only attempted when both names have at least this
/// many characters once normalized.
pub const MIN_SUBSTRING_LEN: usize = 4;

pub(crate) struct Candidate<'a> {
    pub record: &'a DatasetRecord,
    pub territory: &'a str,
    normalized: String,
    uninverted: String,
}

impl<'a> Candidate<'a> {
    pub fn new(record: &'a DatasetRecord, territory: &'a str) -> Candidate<'a> {
        Candidate {
            record,
            territory,
            normalized: normalize_name(territory),
            uninverted: normalize_name(&uninvert_name(territory)),
        }
    }

    fn has_name(&self, normalized: &str) -> bool {
        self.normalized == normalized || self.uninverted == normalized
    }
}

struct Target<'t> {
    raw: &'t str,
    normalized: String,
    uninverted: String,
}

type Matcher = fn(&Target, &[Candidate], &Lookups) -> Option<usize>;

const STRATEGIES: &[(MatchStrategy, Matcher)] = &[
    (MatchStrategy::Code, match_code),
    (MatchStrategy::Exact, match_exact),
    (MatchStrategy::Alias, match_alias),
    (MatchStrategy::Substring, match_substring),
    (MatchStrategy::SpecialCase, match_special_case),
];

/// The records of a dataset that pass the filter, in dataset order.
pub(crate) fn candidates<'a>(dataset: &'a Dataset, filter: &RecordFilter) -> Vec<Candidate<'a>> {
    dataset
        .records
        .iter()
        .filter(|r| dataset.matches(r, filter))
        .filter_map(|r| {
            dataset
                .territory(r)
                .filter(|t| !t.is_empty())
                .map(|t| Candidate::new(r, t))
        })
        .collect()
}

/// Runs the cascade. Returns the index of the accepted candidate and the strategy that found it.
pub(crate) fn find_first(
    name: &str,
    cands: &[Candidate],
    lookups: &Lookups,
) -> Option<(usize, MatchStrategy)> {
    let target = Target {
        raw: name,
        normalized: normalize_name(name),
        uninverted: normalize_name(&uninvert_name(name)),
    };
    if target.normalized.is_empty() {
        return None;
    }
    for (strategy, matcher) in STRATEGIES.iter() {
        if let Some(idx) = matcher(&target, cands, lookups) {
            debug!(
                "find_first: {:?} -> {:?} ({:?})",
                name, cands[idx].territory, strategy
            );
            return Some((idx, *strategy));
        }
    }
    debug!("find_first: no match for {:?}", name);
    None
}

fn match_code(target: &Target, cands: &[Candidate], lookups: &Lookups) -> Option<usize> {
    let codes: Vec<(&RegionCode, HashSet<String>)> = lookups
        .codes_for(target.raw)
        .into_iter()
        .map(|code| (code, lookups.names_of_code(code)))
        .collect();
    if codes.is_empty() {
        return None;
    }
    cands.iter().position(|c| {
        codes.iter().any(|(code, names)| {
            c.territory.eq_ignore_ascii_case(&code.code)
                || names.contains(&c.normalized)
                || names.contains(&c.uninverted)
        })
    })
}

fn match_exact(target: &Target, cands: &[Candidate], _lookups: &Lookups) -> Option<usize> {
    cands
        .iter()
        .position(|c| c.has_name(&target.normalized) || c.has_name(&target.uninverted))
}

fn match_alias(target: &Target, cands: &[Candidate], lookups: &Lookups) -> Option<usize> {
    let mut entries = lookups.aliases_matching(&target.normalized);
    if target.uninverted != target.normalized {
        entries.extend(lookups.aliases_matching(&target.uninverted));
    }
    for alias in entries {
        for variant in alias.variants() {
            let nv = normalize_name(variant);
            if let Some(idx) = cands.iter().position(|c| c.has_name(&nv)) {
                return Some(idx);
            }
        }
    }
    None
}

fn match_substring(target: &Target, cands: &[Candidate], _lookups: &Lookups) -> Option<usize> {
    let t = &target.normalized;
    if t.chars().count() < MIN_SUBSTRING_LEN {
        return None;
    }
    cands.iter().position(|c| {
        let n = &c.normalized;
        n.chars().count() >= MIN_SUBSTRING_LEN && (n.contains(t.as_str()) || t.contains(n.as_str()))
    })
}

fn match_special_case(target: &Target, cands: &[Candidate], lookups: &Lookups) -> Option<usize> {
    for sc in lookups.special_cases() {
        if !sc.matches(&target.normalized) {
            continue;
        }
        if let Some(idx) = cands.iter().position(|c| sc.matches(&c.normalized)) {
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(names: &[&str]) -> Dataset {
        Dataset {
            name: "test".to_string(),
            schema: DatasetSchema::default(),
            records: names
                .iter()
                .map(|n| DatasetRecord::from_pairs(&[("geo", n), ("TIME_PERIOD", "2023")]))
                .collect(),
        }
    }

    fn find(name: &str, names: &[&str]) -> Option<(String, MatchStrategy)> {
        let ds = dataset(names);
        let cands = candidates(&ds, &RecordFilter::default());
        find_first(name, &cands, &Lookups::builtin())
            .map(|(idx, s)| (cands[idx].territory.to_string(), s))
    }

    #[test]
    fn cascade_order() {
        let names = ["ES30", "Madrid"];
        // The code strategy comes before the exact name.
        assert_eq!(
            find("Madrid", &names),
            Some(("ES30".to_string(), MatchStrategy::Code))
        );
        assert_eq!(
            find("Galicia", &["Galicia"]),
            Some(("Galicia".to_string(), MatchStrategy::Code))
        );
        assert_eq!(
            find("Atlantida", &["Atlántida"]),
            Some(("Atlántida".to_string(), MatchStrategy::Exact))
        );
    }

    #[test]
    fn alias_lookup() {
        let lookups = Lookups::empty().with_aliases(vec![EntityAlias::new(
            "Zazpiak Bat",
            "Siete Provincias",
            "Seven Provinces",
        )]);
        let ds = dataset(&["Other", "Seven Provinces"]);
        let cands = candidates(&ds, &RecordFilter::default());
        assert_eq!(
            find_first("zazpiak bat", &cands, &lookups),
            Some((1, MatchStrategy::Alias))
        );
    }

    #[test]
    fn substring_is_length_gated() {
        let lookups = Lookups::empty();
        let ds = dataset(&["Région Île-de-France", "Ile"]);
        let cands = candidates(&ds, &RecordFilter::default());
        assert_eq!(
            find_first("Île-de-France", &cands, &lookups),
            Some((0, MatchStrategy::Substring))
        );
        // Too short: "Ile" is contained in the first name but is never a substring match.
        let ds = dataset(&["Région Île-de-France"]);
        let cands = candidates(&ds, &RecordFilter::default());
        assert_eq!(find_first("Ile", &cands, &lookups), None);
    }

    #[test]
    fn special_cases() {
        let lookups = Lookups::builtin();
        let ds = dataset(&["Balears (Illes)", "Canarias (Islas)"]);
        let cands = candidates(&ds, &RecordFilter::default());
        assert_eq!(
            find_first("Islas Baleares", &cands, &lookups),
            Some((0, MatchStrategy::SpecialCase))
        );
        assert_eq!(
            find_first("Canary Islands", &cands, &lookups),
            Some((1, MatchStrategy::SpecialCase))
        );
    }

    #[test]
    fn inverted_names() {
        assert_eq!(
            find("Comunidad Foral de Navarra", &["Navarra, Comunidad Foral de"]),
            Some((
                "Navarra, Comunidad Foral de".to_string(),
                MatchStrategy::Code
            ))
        );
        let lookups = Lookups::empty();
        let ds = dataset(&["Rioja, La"]);
        let cands = candidates(&ds, &RecordFilter::default());
        assert_eq!(
            find_first("La Rioja", &cands, &lookups),
            Some((0, MatchStrategy::Exact))
        );
    }

    #[test]
    fn empty_names_never_match() {
        assert_eq!(find("", &["Galicia"]), None);
        assert_eq!(find("   ", &["Galicia"]), None);
        assert_eq!(find("Galicia", &[]), None);
    }
}
