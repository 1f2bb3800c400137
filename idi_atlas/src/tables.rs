use std::collections::{HashMap, HashSet};

use crate::config::*;
use crate::parsing::{normalize_name, uninvert_name};

// (key, Spanish, English)
const BUILTIN_ALIASES: &[(&str, &str, &str)] = &[
    // Autonomous communities and cities
    ("Andalucía", "Andalucía", "Andalusia"),
    ("Aragón", "Aragón", "Aragon"),
    ("Principado de Asturias", "Asturias", "Asturias"),
    ("Illes Balears", "Islas Baleares", "Balearic Islands"),
    ("Canarias", "Canarias", "Canary Islands"),
    ("Cantabria", "Cantabria", "Cantabria"),
    ("Castilla y León", "Castilla y León", "Castile and León"),
    ("Castilla-La Mancha", "Castilla-La Mancha", "Castile-La Mancha"),
    ("Catalunya", "Cataluña", "Catalonia"),
    ("Comunitat Valenciana", "Comunidad Valenciana", "Valencian Community"),
    ("Extremadura", "Extremadura", "Extremadura"),
    ("Galicia", "Galicia", "Galicia"),
    ("Comunidad de Madrid", "Madrid", "Community of Madrid"),
    ("Región de Murcia", "Murcia", "Region of Murcia"),
    ("Comunidad Foral de Navarra", "Navarra", "Navarre"),
    ("Euskadi", "País Vasco", "Basque Country"),
    ("La Rioja", "La Rioja", "La Rioja"),
    ("Ciudad Autónoma de Ceuta", "Ceuta", "Ceuta"),
    ("Ciudad Autónoma de Melilla", "Melilla", "Melilla"),
    ("Total Nacional", "Total nacional", "National total"),
    // Countries
    ("España", "España", "Spain"),
    ("Deutschland", "Alemania", "Germany"),
    ("France", "Francia", "France"),
    ("Italia", "Italia", "Italy"),
    ("Portugal", "Portugal", "Portugal"),
    ("België", "Bélgica", "Belgium"),
    ("Nederland", "Países Bajos", "Netherlands"),
    ("Luxembourg", "Luxemburgo", "Luxembourg"),
    ("Österreich", "Austria", "Austria"),
    ("Danmark", "Dinamarca", "Denmark"),
    ("Sverige", "Suecia", "Sweden"),
    ("Suomi", "Finlandia", "Finland"),
    ("Éire", "Irlanda", "Ireland"),
    ("Ελλάδα", "Grecia", "Greece"),
    ("Polska", "Polonia", "Poland"),
    ("Česko", "Chequia", "Czechia"),
    ("Slovensko", "Eslovaquia", "Slovakia"),
    ("Slovenija", "Eslovenia", "Slovenia"),
    ("Magyarország", "Hungría", "Hungary"),
    ("România", "Rumanía", "Romania"),
    ("България", "Bulgaria", "Bulgaria"),
    ("Hrvatska", "Croacia", "Croatia"),
    ("Eesti", "Estonia", "Estonia"),
    ("Latvija", "Letonia", "Latvia"),
    ("Lietuva", "Lituania", "Lithuania"),
    ("Κύπρος", "Chipre", "Cyprus"),
    ("Malta", "Malta", "Malta"),
    ("Norge", "Noruega", "Norway"),
    ("Ísland", "Islandia", "Iceland"),
    ("Schweiz", "Suiza", "Switzerland"),
    ("United Kingdom", "Reino Unido", "United Kingdom"),
    ("Türkiye", "Turquía", "Türkiye"),
    ("Северна Македонија", "Macedonia del Norte", "North Macedonia"),
    ("Србија", "Serbia", "Serbia"),
    ("Crna Gora", "Montenegro", "Montenegro"),
    ("Shqipëria", "Albania", "Albania"),
    ("Bosna i Hercegovina", "Bosnia y Herzegovina", "Bosnia and Herzegovina"),
    // Aggregates
    ("Unión Europea", "Unión Europea", "European Union"),
    ("Zona del euro", "Zona del euro", "Euro area"),
];

// (code, alias key, kind)
const BUILTIN_CODES: &[(&str, &str, EntityKind)] = &[
    // ISO 3166-2
    ("ES-AN", "Andalucía", EntityKind::Region),
    ("ES-AR", "Aragón", EntityKind::Region),
    ("ES-AS", "Principado de Asturias", EntityKind::Region),
    ("ES-IB", "Illes Balears", EntityKind::Region),
    ("ES-CN", "Canarias", EntityKind::Region),
    ("ES-CB", "Cantabria", EntityKind::Region),
    ("ES-CL", "Castilla y León", EntityKind::Region),
    ("ES-CM", "Castilla-La Mancha", EntityKind::Region),
    ("ES-CT", "Catalunya", EntityKind::Region),
    ("ES-VC", "Comunitat Valenciana", EntityKind::Region),
    ("ES-EX", "Extremadura", EntityKind::Region),
    ("ES-GA", "Galicia", EntityKind::Region),
    ("ES-MD", "Comunidad de Madrid", EntityKind::Region),
    ("ES-MC", "Región de Murcia", EntityKind::Region),
    ("ES-NC", "Comunidad Foral de Navarra", EntityKind::Region),
    ("ES-PV", "Euskadi", EntityKind::Region),
    ("ES-RI", "La Rioja", EntityKind::Region),
    ("ES-CE", "Ciudad Autónoma de Ceuta", EntityKind::Region),
    ("ES-ML", "Ciudad Autónoma de Melilla", EntityKind::Region),
    // NUTS 2
    ("ES61", "Andalucía", EntityKind::Region),
    ("ES24", "Aragón", EntityKind::Region),
    ("ES12", "Principado de Asturias", EntityKind::Region),
    ("ES53", "Illes Balears", EntityKind::Region),
    ("ES70", "Canarias", EntityKind::Region),
    ("ES13", "Cantabria", EntityKind::Region),
    ("ES41", "Castilla y León", EntityKind::Region),
    ("ES42", "Castilla-La Mancha", EntityKind::Region),
    ("ES51", "Catalunya", EntityKind::Region),
    ("ES52", "Comunitat Valenciana", EntityKind::Region),
    ("ES43", "Extremadura", EntityKind::Region),
    ("ES11", "Galicia", EntityKind::Region),
    ("ES30", "Comunidad de Madrid", EntityKind::Region),
    ("ES62", "Región de Murcia", EntityKind::Region),
    ("ES22", "Comunidad Foral de Navarra", EntityKind::Region),
    ("ES21", "Euskadi", EntityKind::Region),
    ("ES23", "La Rioja", EntityKind::Region),
    ("ES63", "Ciudad Autónoma de Ceuta", EntityKind::Region),
    ("ES64", "Ciudad Autónoma de Melilla", EntityKind::Region),
    // Eurostat geo codes
    ("ES", "España", EntityKind::Country),
    ("DE", "Deutschland", EntityKind::Country),
    ("FR", "France", EntityKind::Country),
    ("IT", "Italia", EntityKind::Country),
    ("PT", "Portugal", EntityKind::Country),
    ("BE", "België", EntityKind::Country),
    ("NL", "Nederland", EntityKind::Country),
    ("LU", "Luxembourg", EntityKind::Country),
    ("AT", "Österreich", EntityKind::Country),
    ("DK", "Danmark", EntityKind::Country),
    ("SE", "Sverige", EntityKind::Country),
    ("FI", "Suomi", EntityKind::Country),
    ("IE", "Éire", EntityKind::Country),
    ("EL", "Ελλάδα", EntityKind::Country),
    ("GR", "Ελλάδα", EntityKind::Country),
    ("PL", "Polska", EntityKind::Country),
    ("CZ", "Česko", EntityKind::Country),
    ("SK", "Slovensko", EntityKind::Country),
    ("SI", "Slovenija", EntityKind::Country),
    ("HU", "Magyarország", EntityKind::Country),
    ("RO", "România", EntityKind::Country),
    ("BG", "България", EntityKind::Country),
    ("HR", "Hrvatska", EntityKind::Country),
    ("EE", "Eesti", EntityKind::Country),
    ("LV", "Latvija", EntityKind::Country),
    ("LT", "Lietuva", EntityKind::Country),
    ("CY", "Κύπρος", EntityKind::Country),
    ("MT", "Malta", EntityKind::Country),
    ("NO", "Norge", EntityKind::Country),
    ("IS", "Ísland", EntityKind::Country),
    ("CH", "Schweiz", EntityKind::Country),
    ("UK", "United Kingdom", EntityKind::Country),
    ("GB", "United Kingdom", EntityKind::Country),
    ("TR", "Türkiye", EntityKind::Country),
    ("MK", "Северна Македонија", EntityKind::Country),
    ("RS", "Србија", EntityKind::Country),
    ("ME", "Crna Gora", EntityKind::Country),
    ("AL", "Shqipëria", EntityKind::Country),
    ("BA", "Bosna i Hercegovina", EntityKind::Country),
    // Totals
    ("EU27_2020", "Unión Europea", EntityKind::Aggregate),
    ("EU28", "Unión Europea", EntityKind::Aggregate),
    ("EU27_2007", "Unión Europea", EntityKind::Aggregate),
    ("EA20", "Zona del euro", EntityKind::Aggregate),
    ("EA19", "Zona del euro", EntityKind::Aggregate),
    ("ES00", "Total Nacional", EntityKind::Aggregate),
];

// Entities whose names vary too much between sources for the other
// strategies. A name belongs to a group if it contains every fragment of one
// of the group's patterns.
const BUILTIN_SPECIAL_CASES: &[(&str, &[&[&str]])] = &[
    ("Ceuta", &[&["ceuta"]]),
    ("Melilla", &[&["melilla"]]),
    ("Illes Balears", &[&["balear"], &["illes", "balears"]]),
    ("Canarias", &[&["canari"], &["canary"]]),
    (
        "Castilla-La Mancha",
        &[&["castilla", "mancha"], &["castile", "mancha"]],
    ),
    (
        "Castilla y León",
        &[&["castilla", "leon"], &["castile", "leon"]],
    ),
    ("Euskadi", &[&["vasco"], &["euskadi"], &["basque"]]),
    ("Comunitat Valenciana", &[&["valencia"]]),
    ("Comunidad Foral de Navarra", &[&["navarr"]]),
    ("Principado de Asturias", &[&["asturias"]]),
    ("Región de Murcia", &[&["murcia"]]),
    ("La Rioja", &[&["rioja"]]),
    ("Česko", &[&["czech"], &["chequia"], &["republica", "checa"]]),
    ("Северна Македонија", &[&["macedonia"]]),
    ("Türkiye", &[&["turkiye"], &["turkey"], &["turquia"]]),
    ("Deutschland", &[&["germany"], &["alemania"], &["deutschland"]]),
    ("United Kingdom", &[&["united", "kingdom"], &["reino", "unido"]]),
    ("Kosovo", &[&["kosovo"]]),
];

/// A group of keyword patterns for an entity with irregular naming.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SpecialCase {
    pub label: String,
    /// Normalized fragments. A name matches if it contains all the fragments of one pattern.
    pub patterns: Vec<Vec<String>>,
}

impl SpecialCase {
    pub fn new(label: &str, patterns: &[&[&str]]) -> SpecialCase {
        SpecialCase {
            label: label.to_string(),
            patterns: patterns
                .iter()
                .map(|p| p.iter().map(|f| normalize_name(f)).collect())
                .collect(),
        }
    }

    /// `normalized` must already go through `normalize_name`.
    pub fn matches(&self, normalized: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| !p.is_empty() && p.iter().all(|f| normalized.contains(f.as_str())))
    }
}

/// The immutable lookup tables used to resolve names: aliases, codes,
/// special cases and flags.
///
/// Built once at startup and passed to every resolution.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    aliases: Vec<EntityAlias>,
    codes: Vec<RegionCode>,
    special_cases: Vec<SpecialCase>,
    // Keyed by normalized name
    flags: HashMap<String, String>,
}

impl Lookups {
    pub fn empty() -> Lookups {
        Lookups::default()
    }

    /// The tables for the Spanish autonomous communities and the European countries.
    pub fn builtin() -> Lookups {
        Lookups {
            aliases: BUILTIN_ALIASES
                .iter()
                .map(|(k, es, en)| EntityAlias::new(k, es, en))
                .collect(),
            codes: BUILTIN_CODES
                .iter()
                .map(|(code, name, kind)| RegionCode {
                    code: code.to_string(),
                    name: name.to_string(),
                    kind: *kind,
                })
                .collect(),
            special_cases: BUILTIN_SPECIAL_CASES
                .iter()
                .map(|(label, patterns)| SpecialCase::new(label, patterns))
                .collect(),
            flags: HashMap::new(),
        }
    }

    pub fn with_aliases(self, extra: Vec<EntityAlias>) -> Lookups {
        let mut aliases = self.aliases;
        aliases.extend(extra);
        Lookups { aliases, ..self }
    }

    pub fn with_codes(self, extra: Vec<RegionCode>) -> Lookups {
        let mut codes = self.codes;
        codes.extend(extra);
        Lookups { codes, ..self }
    }

    pub fn with_special_cases(self, extra: Vec<SpecialCase>) -> Lookups {
        let mut special_cases = self.special_cases;
        special_cases.extend(extra);
        Lookups {
            special_cases,
            ..self
        }
    }

    pub fn with_flags(self, flags: &[(String, String)]) -> Lookups {
        let mut all_flags = self.flags;
        for (name, url) in flags.iter() {
            all_flags.insert(normalize_name(name), url.clone());
        }
        Lookups {
            flags: all_flags,
            ..self
        }
    }

    pub fn aliases(&self) -> &[EntityAlias] {
        &self.aliases
    }

    pub fn codes(&self) -> &[RegionCode] {
        &self.codes
    }

    pub fn special_cases(&self) -> &[SpecialCase] {
        &self.special_cases
    }

    /// All the alias entries that list `normalized` as key or localized variant.
    pub(crate) fn aliases_matching(&self, normalized: &str) -> Vec<&EntityAlias> {
        self.aliases
            .iter()
            .filter(|a| a.variants().iter().any(|v| normalize_name(v) == normalized))
            .collect()
    }

    pub fn alias_of(&self, name: &str) -> Option<&EntityAlias> {
        let normalized = normalize_name(name);
        let uninverted = normalize_name(&uninvert_name(name));
        self.aliases.iter().find(|a| {
            a.variants().iter().any(|v| {
                let nv = normalize_name(v);
                nv == normalized || nv == uninverted
            })
        })
    }

    // The normalized forms under which an entity may be known.
    fn equivalent_names(&self, name: &str) -> HashSet<String> {
        let mut names: HashSet<String> = HashSet::new();
        names.insert(normalize_name(name));
        names.insert(normalize_name(&uninvert_name(name)));
        let found: Vec<String> = names
            .iter()
            .flat_map(|n| self.aliases_matching(n))
            .flat_map(|a| a.variants().map(normalize_name))
            .collect();
        names.extend(found);
        names
    }

    /// The codes designating the given name. The name may be a code itself.
    pub fn codes_for(&self, name: &str) -> Vec<&RegionCode> {
        let trimmed = name.trim();
        let by_code: Vec<&RegionCode> = self
            .codes
            .iter()
            .filter(|c| c.code.eq_ignore_ascii_case(trimmed))
            .collect();
        if !by_code.is_empty() {
            return by_code;
        }
        let names = self.equivalent_names(name);
        self.codes
            .iter()
            .filter(|c| names.contains(&normalize_name(&c.name)))
            .collect()
    }

    /// The normalized names of the entity designated by a code entry.
    pub(crate) fn names_of_code(&self, code: &RegionCode) -> HashSet<String> {
        self.equivalent_names(&code.name)
    }

    pub fn kind_of(&self, name: &str) -> Option<EntityKind> {
        self.codes_for(name).first().map(|c| c.kind)
    }

    /// Supranational or national totals, which never belong to a peer group.
    pub fn is_aggregate(&self, name: &str) -> bool {
        self.kind_of(name) == Some(EntityKind::Aggregate)
    }

    /// The name to show for an entity, in the requested language.
    pub fn display_name(&self, name: &str, locale: Locale) -> String {
        if let Some(alias) = self.alias_of(name) {
            return alias.localized(locale).to_string();
        }
        if let Some(code) = self.codes_for(name).first() {
            if let Some(alias) = self.alias_of(&code.name) {
                return alias.localized(locale).to_string();
            }
            return code.name.clone();
        }
        name.trim().to_string()
    }

    /// The flag image for an entity: an explicit entry of the flag table, or
    /// for countries the image of their two-letter code.
    pub fn flag(&self, name: &str) -> Option<String> {
        for n in self.equivalent_names(name).iter() {
            if let Some(url) = self.flags.get(n) {
                return Some(url.clone());
            }
        }
        let code = self
            .codes_for(name)
            .into_iter()
            .find(|c| c.kind == EntityKind::Country && c.code.len() == 2)?;
        let iso = match code.code.as_str() {
            "EL" => "gr".to_string(),
            "UK" => "gb".to_string(),
            c => c.to_lowercase(),
        };
        Some(format!("https://flagcdn.com/w40/{}.png", iso))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_by_code_and_by_name() {
        let lookups = Lookups::builtin();
        let c = lookups.codes_for("es30");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].name, "Comunidad de Madrid");

        let codes: Vec<&str> = lookups
            .codes_for("Community of Madrid")
            .iter()
            .map(|c| c.code.as_str())
            .collect();
        assert_eq!(codes, vec!["ES-MD", "ES30"]);

        let greece: Vec<&str> = lookups
            .codes_for("Grecia")
            .iter()
            .map(|c| c.code.as_str())
            .collect();
        assert_eq!(greece, vec!["EL", "GR"]);
    }

    #[test]
    fn aggregates() {
        let lookups = Lookups::builtin();
        assert!(lookups.is_aggregate("EU27_2020"));
        assert!(lookups.is_aggregate("European Union"));
        assert!(lookups.is_aggregate("Total Nacional"));
        assert!(lookups.is_aggregate("Nacional, Total"));
        assert!(!lookups.is_aggregate("Spain"));
        assert!(!lookups.is_aggregate("Galicia"));
        assert_eq!(lookups.kind_of("Spain"), Some(EntityKind::Country));
        assert_eq!(lookups.kind_of("Galicia"), Some(EntityKind::Region));
        assert_eq!(lookups.kind_of("Atlantis"), None);
    }

    #[test]
    fn display_names() {
        let lookups = Lookups::builtin();
        assert_eq!(lookups.display_name("Catalunya", Locale::En), "Catalonia");
        assert_eq!(lookups.display_name("catalonia", Locale::Es), "Cataluña");
        assert_eq!(lookups.display_name("DE", Locale::Es), "Alemania");
        assert_eq!(lookups.display_name("Madrid, Comunidad de", Locale::En), "Community of Madrid");
        assert_eq!(lookups.display_name(" Atlantis ", Locale::En), "Atlantis");
    }

    #[test]
    fn flags() {
        let lookups = Lookups::builtin()
            .with_flags(&[("Alemania".to_string(), "flags/de.svg".to_string())]);
        assert_eq!(lookups.flag("Germany"), Some("flags/de.svg".to_string()));
        assert_eq!(
            lookups.flag("Grecia"),
            Some("https://flagcdn.com/w40/gr.png".to_string())
        );
        assert_eq!(lookups.flag("Galicia"), None);
    }

    #[test]
    fn special_case_patterns() {
        let sc = SpecialCase::new("Castilla-La Mancha", &[&["Castilla", "Mancha"]]);
        assert!(sc.matches("castilla la mancha"));
        assert!(sc.matches("castilla mancha (comunidad)"));
        assert!(!sc.matches("castilla y leon"));
    }
}
