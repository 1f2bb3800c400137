/*!
Name resolution and choropleth color scales for R&D statistics.

The datasets behind an R&D atlas (expenditure, researchers, patents) come from
different publishers, and each of them names territories in its own way:
`Comunidad de Madrid`, `Madrid, Comunidad de`, `ES30`, `Community of Madrid`.
This crate finds, for a name taken from a map feature, the matching row of a
dataset, and turns the values of a selection into map colors.

```
use idi_atlas::*;

let mut builder = builder::Builder::new("gasto_idi")?;
builder.add_observation("Madrid", "2023", "_T", "1.85")?;
builder.add_observation("Madrid", "2022", "_T", "1.70")?;
let dataset = builder.build();
let lookups = Lookups::builtin();

let filter = RecordFilter::year("2023").with_sector("_T");
let cmp = resolve_with_delta("Comunidad de Madrid", &dataset, &filter, &lookups).unwrap();
assert_eq!(cmp.current.value, Some(1.85));
assert!((cmp.delta.unwrap() - 8.8235).abs() < 1e-3);
# Ok::<(), AtlasErrors>(())
```

See the [manual] for the details of the matching rules and of the color scale.
*/

mod config;
mod parsing;
mod resolver;
mod scale;
mod tables;

pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::HashSet;

pub use crate::config::*;
pub use crate::parsing::{is_missing, normalize_name, parse_value, uninvert_name};
pub use crate::resolver::MIN_SUBSTRING_LEN;
pub use crate::scale::*;
pub use crate::tables::{Lookups, SpecialCase};

/// Finds the first record of the dataset that passes the filter and designates
/// the given entity.
///
/// Arguments:
/// * `name` the name to look for: a display name in any language, an alias or a code
/// * `dataset` the records to search, in order
/// * `filter` the year, sector and measure of the records to consider
/// * `lookups` the alias, code and special case tables
pub fn resolve<'a>(
    name: &str,
    dataset: &'a Dataset,
    filter: &RecordFilter,
    lookups: &Lookups,
) -> Option<Observation<'a>> {
    let cands = resolver::candidates(dataset, filter);
    let (idx, strategy) = resolver::find_first(name, &cands, lookups)?;
    let c = &cands[idx];
    Some(Observation {
        record: c.record,
        territory: c.territory,
        year: dataset.year(c.record),
        value: dataset.value(c.record),
        flag: dataset.flag(c.record),
        strategy,
    })
}

/// The year before, for numeric years.
pub fn previous_year(year: &str) -> Option<String> {
    year.trim().parse::<i64>().ok().map(|y| (y - 1).to_string())
}

/// Percentage change between two values.
///
/// Unavailable when one of them is missing or when the previous value is zero.
pub fn year_over_year(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(c), Some(p)) if p != 0.0 => Some((c - p) / p * 100.0),
        _ => None,
    }
}

/// Resolves an entity for the year of the filter and for the year before,
/// and computes the change between both.
pub fn resolve_with_delta<'a>(
    name: &str,
    dataset: &'a Dataset,
    filter: &RecordFilter,
    lookups: &Lookups,
) -> Option<YearComparison<'a>> {
    let current = resolve(name, dataset, filter, lookups)?;
    let previous = filter
        .year
        .as_deref()
        .and_then(previous_year)
        .and_then(|y| resolve(name, dataset, &filter.clone().with_year(Some(y)), lookups));
    let delta = year_over_year(current.value, previous.as_ref().and_then(|p| p.value));
    Some(YearComparison {
        current,
        previous,
        delta,
    })
}

/// All the values of an entity over the years of the dataset, in increasing year order.
///
/// The year of the filter is ignored.
pub fn resolve_series(
    name: &str,
    dataset: &Dataset,
    filter: &RecordFilter,
    lookups: &Lookups,
) -> Vec<SeriesPoint> {
    dataset
        .years()
        .into_iter()
        .filter_map(|year| {
            let f = filter.clone().with_year(Some(year.clone()));
            resolve(name, dataset, &f, lookups).map(|obs| SeriesPoint {
                year,
                value: obs.value,
                flag: obs.flag.map(|s| s.to_string()),
            })
        })
        .collect()
}

/// The entities a value is compared with: the records of the selection,
/// one per territory, without the aggregates. When the selection contains
/// regions, national totals are left out as well.
fn peer_group<'a>(
    dataset: &'a Dataset,
    filter: &RecordFilter,
    lookups: &Lookups,
) -> Vec<(&'a str, Option<f64>)> {
    let cands = resolver::candidates(dataset, filter);
    let kinds: Vec<Option<EntityKind>> = cands.iter().map(|c| lookups.kind_of(c.territory)).collect();
    let regional = kinds.iter().any(|k| *k == Some(EntityKind::Region));
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<(&'a str, Option<f64>)> = Vec::new();
    for (c, kind) in cands.iter().zip(kinds) {
        let keep = match kind {
            Some(EntityKind::Aggregate) => false,
            Some(EntityKind::Country) => !regional,
            _ => true,
        };
        if keep && seen.insert(normalize_name(c.territory)) {
            res.push((c.territory, dataset.value(c.record)));
        } else if !keep {
            debug!("peer_group: leaving out {:?}", c.territory);
        }
    }
    res
}

/// Range statistics of the peer group. Zeros and missing values are not part of it.
pub fn peer_range(dataset: &Dataset, filter: &RecordFilter, lookups: &Lookups) -> Option<ValueRange> {
    let values: Vec<f64> = peer_group(dataset, filter, lookups)
        .into_iter()
        .filter_map(|(_, v)| v)
        .filter(|v| *v != 0.0)
        .collect();
    ValueRange::from_values(&values)
}

/// The peer group sorted by decreasing value, for ranked bar charts.
/// Entities without data are not ranked.
pub fn rank_entities(dataset: &Dataset, filter: &RecordFilter, lookups: &Lookups) -> Vec<RankedEntry> {
    let mut entries: Vec<(&str, f64)> = peer_group(dataset, filter, lookups)
        .into_iter()
        .filter_map(|(t, v)| v.map(|x| (t, x)))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let mut res: Vec<RankedEntry> = Vec::with_capacity(entries.len());
    for (idx, (territory, value)) in entries.iter().enumerate() {
        let position = match res.last() {
            Some(prev) if prev.value == *value => prev.position,
            _ => idx + 1,
        };
        res.push(RankedEntry {
            position,
            territory: territory.to_string(),
            value: *value,
        });
    }
    res
}

/// The contribution of each sector to the sum of the listed sectors, for pie charts.
///
/// The sector of the filter is ignored.
pub fn sector_shares(
    name: &str,
    dataset: &Dataset,
    filter: &RecordFilter,
    sectors: &[&str],
    lookups: &Lookups,
) -> Vec<SectorShare> {
    let values: Vec<(String, Option<f64>)> = sectors
        .iter()
        .map(|s| {
            let f = filter.clone().with_sector(s);
            let v = resolve(name, dataset, &f, lookups).and_then(|obs| obs.value);
            (s.to_string(), v)
        })
        .collect();
    let total: f64 = values.iter().filter_map(|(_, v)| *v).sum();
    values
        .into_iter()
        .map(|(sector, value)| SectorShare {
            sector,
            value,
            share: value.filter(|_| total > 0.0).map(|v| v / total * 100.0),
        })
        .collect()
}

/// Colors every feature of a map for one selection.
///
/// Arguments:
/// * `features` the names of the map features, in the order of the map
/// * `dataset` the data to show
/// * `filter` the year, sector and measure to show
/// * `palette` the colors of the selection
/// * `lookups` the alias, code and special case tables
pub fn build_choropleth(
    features: &[String],
    dataset: &Dataset,
    filter: &RecordFilter,
    palette: &ColorPalette,
    lookups: &Lookups,
) -> Choropleth {
    info!(
        "build_choropleth: {} features, dataset {:?} ({} records), filter: {:?}",
        features.len(),
        dataset.name,
        dataset.records.len(),
        filter
    );
    let range = peer_range(dataset, filter, lookups);
    let scale = ColorScale::new(*palette, range);
    let ranking = rank_entities(dataset, filter, lookups);
    info!("build_choropleth: range {:?}, mode {:?}", range, scale.mode());

    let mut res: Vec<FeatureColor> = Vec::with_capacity(features.len());
    for feature in features.iter() {
        let fc = match resolve_with_delta(feature, dataset, filter, lookups) {
            Some(cmp) => {
                let territory = normalize_name(cmp.current.territory);
                let rank = ranking
                    .iter()
                    .find(|e| normalize_name(&e.territory) == territory)
                    .map(|e| e.position);
                FeatureColor {
                    feature: feature.clone(),
                    territory: Some(cmp.current.territory.to_string()),
                    strategy: Some(cmp.current.strategy),
                    value: cmp.current.value,
                    flag: cmp.current.flag.map(|s| s.to_string()),
                    previous_value: cmp.previous.as_ref().and_then(|p| p.value),
                    delta: cmp.delta,
                    rank,
                    color: scale.color(cmp.current.value),
                }
            }
            None => {
                debug!("build_choropleth: no data for feature {:?}", feature);
                FeatureColor {
                    feature: feature.clone(),
                    territory: None,
                    strategy: None,
                    value: None,
                    flag: None,
                    previous_value: None,
                    delta: None,
                    rank: None,
                    color: scale.color(None),
                }
            }
        };
        res.push(fc);
    }
    let missing = res.iter().filter(|f| f.territory.is_none()).count();
    if missing > 0 {
        info!("build_choropleth: {} features without a matching record", missing);
    }
    Choropleth {
        mode: scale.mode(),
        range,
        palette: *palette,
        features: res,
        ranking,
    }
}
